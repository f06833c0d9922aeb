pub type BoothResult<T> = Result<T, BoothError>;

/// Errors surfaced to the user. None of them end the session; the user can
/// retry the action that triggered them.
#[derive(thiserror::Error, Debug)]
pub enum BoothError {
    /// Permission denied or no such device
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// No recordable encoding is supported by any backend
    #[error("no supported recording format (tried: {0})")]
    UnsupportedFormat(String),

    /// Save or record attempted before any frame exists
    #[error("nothing captured yet: {0}")]
    EmptyCapture(String),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("encoding error: {0}")]
    Encode(String),

    #[error("invalid artifact payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoothError {
    pub fn camera_unavailable(msg: impl Into<String>) -> Self {
        Self::CameraUnavailable(msg.into())
    }

    pub fn empty_capture(msg: impl Into<String>) -> Self {
        Self::EmptyCapture(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }
}
