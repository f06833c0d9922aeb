//! Photo and clip booth: live camera capture, ordered colour filters, clip
//! recording and a persisted gallery.

pub mod booth;
pub mod capture;
pub mod config;
pub mod error;
pub mod filters;
pub mod gallery;
pub mod recorder;
pub mod render;
pub mod viewer;

pub use booth::Booth;
pub use error::{BoothError, BoothResult};
