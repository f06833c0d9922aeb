use super::{ClipEncoder, RecordSettings, RecorderBackend};
use crate::error::{BoothError, BoothResult};
use image::RgbImage;
use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

/// Size of the reads delivered as chunks
const CHUNK_SIZE: usize = 64 * 1024;

/// (mime, ffmpeg encoder, muxer)
const CODECS: [(&str, &str, &str); 3] = [
    ("video/webm;codecs=vp9", "libvpx-vp9", "webm"),
    ("video/webm;codecs=vp8", "libvpx", "webm"),
    ("video/mp4;codecs=avc1", "libx264", "mp4"),
];

/// Video recording through the system `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    encoders: Vec<String>,
}

impl FfmpegBackend {
    /// Ask the installed ffmpeg which encoders it has. `None` when ffmpeg
    /// is missing from PATH.
    pub fn probe() -> Option<Self> {
        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let backend = Self::from_encoder_listing(&String::from_utf8_lossy(&output.stdout));
        tracing::info!("ffmpeg encoders available: {:?}", backend.encoders);
        Some(backend)
    }

    /// Parse `ffmpeg -encoders` output, keeping only the encoders we use
    pub fn from_encoder_listing(listing: &str) -> Self {
        let encoders = listing
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let flags = fields.next()?;
                let name = fields.next()?;
                // Video encoder rows look like " V....D libx264  ..."
                (flags.starts_with('V') && CODECS.iter().any(|(_, enc, _)| *enc == name))
                    .then(|| name.to_string())
            })
            .collect();
        Self { encoders }
    }

    fn codec_for(mime: &str) -> Option<(&'static str, &'static str)> {
        CODECS
            .iter()
            .find(|(m, _, _)| *m == mime)
            .map(|(_, encoder, muxer)| (*encoder, *muxer))
    }
}

impl RecorderBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn is_type_supported(&self, mime: &str) -> bool {
        Self::codec_for(mime).is_some_and(|(encoder, _)| self.encoders.iter().any(|e| e == encoder))
    }

    fn start(&mut self, mime: &str, settings: RecordSettings) -> BoothResult<Box<dyn ClipEncoder>> {
        let Some((encoder, muxer)) = Self::codec_for(mime) else {
            return Err(BoothError::UnsupportedFormat(mime.to_string()));
        };
        Ok(Box::new(FfmpegClipEncoder::spawn(encoder, muxer, settings)?))
    }
}

struct FfmpegClipEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    chunks: Receiver<Vec<u8>>,
    reader: Option<JoinHandle<()>>,
    width: u32,
    height: u32,
    finished: bool,
}

impl FfmpegClipEncoder {
    fn spawn(encoder: &str, muxer: &str, settings: RecordSettings) -> BoothResult<Self> {
        let RecordSettings { width, height, fps } = settings;
        if width % 2 != 0 || height % 2 != 0 {
            return Err(BoothError::encode(format!(
                "video size must be even for yuv420p output, got {width}x{height}"
            )));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{width}x{height}"),
            "-r",
            &fps.max(1).to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            encoder,
            "-pix_fmt",
            "yuv420p",
        ]);
        match muxer {
            // mp4 needs a fragmented layout to be written to a pipe
            "mp4" => cmd.args(["-movflags", "frag_keyframe+empty_moov"]),
            _ => cmd.args(["-deadline", "realtime"]),
        };
        cmd.args(["-f", muxer, "pipe:1"]);

        tracing::debug!("Spawning {:?}", cmd);
        let mut child = cmd
            .spawn()
            .map_err(|e| BoothError::encode(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BoothError::encode("failed to open ffmpeg stdin"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| BoothError::encode("failed to open ffmpeg stdout"))?;

        // Drain stdout on its own thread so ffmpeg never blocks on a full pipe
        let (tx, rx) = mpsc::channel();
        let reader = std::thread::spawn(move || {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::warn!("ffmpeg output read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            chunks: rx,
            reader: Some(reader),
            width,
            height,
            finished: false,
        })
    }
}

impl ClipEncoder for FfmpegClipEncoder {
    fn push_frame(&mut self, frame: &RgbImage) -> BoothResult<Vec<Vec<u8>>> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(BoothError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(BoothError::encode("ffmpeg encoder is already finalized"));
        };
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| BoothError::encode(format!("failed to write frame to ffmpeg: {e}")))?;

        Ok(self.chunks.try_iter().collect())
    }

    fn finish(mut self: Box<Self>) -> BoothResult<Vec<Vec<u8>>> {
        drop(self.stdin.take());

        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::warn!("ffmpeg reader thread panicked");
            }
        }
        let tail: Vec<Vec<u8>> = self.chunks.try_iter().collect();

        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = self
            .child
            .wait()
            .map_err(|e| BoothError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        self.finished = true;

        if !status.success() {
            return Err(BoothError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        Ok(tail)
    }
}

impl Drop for FfmpegClipEncoder {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.stdin.take());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
