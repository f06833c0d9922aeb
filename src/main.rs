use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use photo_booth::capture::{CameraSession, FacingMode, NokhwaProvider};
use photo_booth::config::{self, BoothConfig};
use photo_booth::filters::{FilterKind, FilterState};
use photo_booth::gallery::{FileStorage, GalleryStore};
use photo_booth::recorder::{MediaRecorder, RecorderEvent};
use photo_booth::viewer::Viewer;
use photo_booth::Booth;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gallery storage file (defaults to the platform data directory)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Canvas width
    #[arg(long, global = true, default_value_t = config::DEFAULT_CANVAS_WIDTH)]
    width: u32,

    /// Canvas height
    #[arg(long, global = true, default_value_t = config::DEFAULT_CANVAS_HEIGHT)]
    height: u32,

    /// Recording frames per second
    #[arg(long, global = true, default_value_t = config::DEFAULT_FPS)]
    fps: u32,

    /// Webcam device index used as the front camera
    #[arg(long, global = true, default_value_t = 0)]
    front_device: u32,

    /// Webcam device index used as the back camera
    #[arg(long, global = true, default_value_t = 1)]
    back_device: u32,

    /// Camera to start with (front or back)
    #[arg(long, global = true, default_value = "front")]
    facing: FacingMode,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Filter values in percent
#[derive(clap::Args, Debug, Clone)]
struct FilterArgs {
    #[arg(long, default_value_t = 100.0)]
    brightness: f32,

    #[arg(long, default_value_t = 100.0)]
    contrast: f32,

    #[arg(long, default_value_t = 100.0)]
    saturation: f32,

    #[arg(long, default_value_t = 0.0)]
    grayscale: f32,

    #[arg(long, default_value_t = 0.0)]
    sepia: f32,

    #[arg(long, default_value_t = 0.0)]
    invert: f32,
}

impl FilterArgs {
    fn to_state(&self) -> FilterState {
        let mut state = FilterState::new();
        state.set(FilterKind::Brightness, self.brightness);
        state.set(FilterKind::Contrast, self.contrast);
        state.set(FilterKind::Saturation, self.saturation);
        state.set(FilterKind::Grayscale, self.grayscale);
        state.set(FilterKind::Sepia, self.sepia);
        state.set(FilterKind::Invert, self.invert);

        for (kind, value) in state.out_of_range() {
            let (min, max) = kind.input_range();
            tracing::warn!("{} {}% is outside the {}..{}% control range", kind, value, min, max);
        }
        state
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a still, apply filters and save it to the gallery
    Capture {
        #[command(flatten)]
        filters: FilterArgs,

        /// Frames to discard while the camera adjusts exposure
        #[arg(long, default_value_t = 5)]
        warmup: u32,

        /// Also write the filtered preview to this PNG file
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Record a filtered clip and save it to the gallery
    Record {
        #[command(flatten)]
        filters: FilterArgs,

        /// Clip length in seconds
        #[arg(long, default_value_t = 3.0)]
        seconds: f32,
    },

    /// List gallery entries
    List {
        /// Write grid thumbnails into this directory
        #[arg(long)]
        thumbnails: Option<PathBuf>,
    },

    /// Delete the entry at a position
    Delete { index: usize },

    /// Export an entry as webart-<index>.<ext>
    Export {
        index: usize,

        /// Destination directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Open an entry in the lightbox and step through the gallery
    View {
        index: usize,

        /// Steps forward (wraps around)
        #[arg(long, default_value_t = 0)]
        next: u32,

        /// Steps back (wraps around)
        #[arg(long, default_value_t = 0)]
        prev: u32,

        /// Export the entry the lightbox ends on into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = BoothConfig {
        storage_path: args.storage.clone().unwrap_or_else(config::default_storage_path),
        canvas_width: args.width,
        canvas_height: args.height,
        fps: args.fps,
        front_device: args.front_device,
        back_device: args.back_device,
        facing: args.facing,
    };
    tracing::debug!("Storage: {}", config.storage_path.display());

    let gallery = GalleryStore::new(FileStorage::new(&config.storage_path));

    match args.command {
        Command::Capture {
            filters,
            warmup,
            preview,
        } => run_capture(&config, gallery, filters.to_state(), warmup, preview),
        Command::Record { filters, seconds } => {
            run_record(&config, gallery, filters.to_state(), seconds)
        }
        Command::List { thumbnails } => run_list(&gallery, thumbnails),
        Command::Delete { index } => {
            gallery
                .delete_at(index)
                .with_context(|| format!("Failed to delete entry {index}"))?;
            println!("{} entries left", gallery.len()?);
            Ok(())
        }
        Command::Export { index, out } => {
            let path = gallery
                .export(index, &out)
                .with_context(|| format!("Failed to export entry {index}"))?;
            println!("{}", path.display());
            Ok(())
        }
        Command::View {
            index,
            next,
            prev,
            out,
        } => run_view(&gallery, index, next, prev, out),
    }
}

fn open_booth(
    config: &BoothConfig,
    gallery: GalleryStore<FileStorage>,
    filters: FilterState,
) -> Result<Booth<NokhwaProvider, FileStorage>> {
    tracing::info!("Photo booth starting");
    tracing::info!("Canvas: {}x{}", config.canvas_width, config.canvas_height);

    let provider = NokhwaProvider::new(config.front_device, config.back_device);
    let camera = CameraSession::new(provider, config.canvas_width, config.canvas_height);
    let recorder = MediaRecorder::with_default_backends(config.record_settings());

    let mut booth = Booth::new(camera, recorder, gallery);
    booth.set_filters(filters);
    booth
        .start_camera(config.facing)
        .context("Failed to start camera")?;
    Ok(booth)
}

fn run_capture(
    config: &BoothConfig,
    gallery: GalleryStore<FileStorage>,
    filters: FilterState,
    warmup: u32,
    preview: Option<PathBuf>,
) -> Result<()> {
    let mut booth = open_booth(config, gallery, filters)?;

    for _ in 0..warmup {
        booth.live_preview().context("Failed to read warm-up frame")?;
    }

    booth.capture().context("Failed to capture frame")?;
    booth.stop_camera();

    if let Some(path) = preview {
        booth
            .preview()?
            .save(&path)
            .with_context(|| format!("Failed to write preview to {}", path.display()))?;
        tracing::info!("Preview written to {}", path.display());
    }

    booth.save().context("Failed to save still")?;
    if let Some(position) = booth.last_saved() {
        println!("Saved entry {} ({})", position, booth.filters());
    }
    Ok(())
}

fn run_record(
    config: &BoothConfig,
    gallery: GalleryStore<FileStorage>,
    filters: FilterState,
    seconds: f32,
) -> Result<()> {
    let mut booth = open_booth(config, gallery, filters)?;

    let RecorderEvent::Started(encoding) = booth.toggle_recording()? else {
        anyhow::bail!("recorder did not start");
    };
    tracing::info!("Recording {:.1}s as {}", seconds, encoding.mime);

    let frame_duration = Duration::from_secs_f32(1.0 / config.fps.max(1) as f32);
    let deadline = Instant::now() + Duration::from_secs_f32(seconds.max(0.0));
    let mut frame_count = 0u64;
    let mut total_frame_time = Duration::ZERO;

    while Instant::now() < deadline {
        let loop_start = Instant::now();

        if let Err(e) = booth.record_frame() {
            // Finalize what we have before reporting
            match booth.toggle_recording() {
                Ok(RecorderEvent::Stopped(clip)) => {
                    if let Some(position) = booth.last_saved() {
                        println!(
                            "Saved partial clip as entry {} ({} frames, {})",
                            position,
                            frame_count,
                            clip.mime()
                        );
                    }
                }
                Ok(RecorderEvent::Started(_)) => {}
                Err(stop_err) => tracing::warn!("Failed to finalize partial clip: {}", stop_err),
            }
            return Err(e).context("Failed to record frame");
        }

        let elapsed = loop_start.elapsed();
        total_frame_time += elapsed;
        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_ms = total_frame_time.as_secs_f64() * 1000.0 / frame_count as f64;
            tracing::info!(
                "Frame {}: render+encode={:.1}ms, buffered chunks={}",
                frame_count,
                avg_ms,
                booth.recorder().buffered_chunks()
            );
        }

        // Frame rate limiting
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }

    let RecorderEvent::Stopped(clip) = booth.toggle_recording()? else {
        anyhow::bail!("recorder did not stop");
    };
    booth.stop_camera();
    if let Some(position) = booth.last_saved() {
        println!(
            "Saved entry {} ({} frames, {})",
            position,
            frame_count,
            clip.mime()
        );
    }
    Ok(())
}

fn run_list(gallery: &GalleryStore<FileStorage>, thumbnails: Option<PathBuf>) -> Result<()> {
    let viewer = Viewer::load(gallery).context("Failed to read gallery")?;
    if viewer.is_empty() {
        println!("Gallery is empty");
        return Ok(());
    }

    for (index, artifact) in viewer.entries().iter().enumerate() {
        println!(
            "{:>4}  {:<5}  {:<22}  {} bytes",
            index,
            format!("{:?}", artifact.kind).to_lowercase(),
            artifact.mime(),
            artifact.decode_bytes().map(|b| b.len()).unwrap_or(0)
        );
    }

    if let Some(dir) = thumbnails {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for thumb in viewer.thumbnails() {
            if let Some(image) = thumb.image {
                let path = dir.join(format!("thumb-{}.png", thumb.index));
                image
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }
        tracing::info!("Thumbnails written to {}", dir.display());
    }
    Ok(())
}

fn run_view(
    gallery: &GalleryStore<FileStorage>,
    index: usize,
    next: u32,
    prev: u32,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut viewer = Viewer::load(gallery).context("Failed to read gallery")?;
    if viewer.open(index).is_none() {
        println!("No entry at position {} ({} in gallery)", index, viewer.len());
        return Ok(());
    }

    for _ in 0..next {
        viewer.next();
    }
    for _ in 0..prev {
        viewer.prev();
    }

    let Some((position, artifact)) = viewer.current() else {
        return Ok(());
    };
    println!(
        "Showing {} of {}: {} ({})",
        position + 1,
        viewer.len(),
        photo_booth::gallery::export_file_name(position, artifact),
        artifact.mime()
    );

    if let Some(dir) = out {
        let path = gallery.export(position, &dir)?;
        println!("{}", path.display());
    }
    Ok(())
}
