use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use image::RgbImage;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

use super::frame::Frame;
use super::FrameSource;

/// Nominal rate assumed when ffprobe reports no usable frame rate.
const FALLBACK_FPS: u32 = 30;

fn source_error(path: &Path, reason: impl ToString) -> Error {
    Error::invalid_source(path.display().to_string(), reason)
}

/// Video metadata obtained by probing with ffprobe.
struct ProbeResult {
    width: u32,
    height: u32,
    fps: f64,
}

fn probe(path: &Path) -> Result<ProbeResult> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            source_error(path, format!("failed to run ffprobe ({e}); is ffmpeg installed?"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        return Err(source_error(path, format!("ffprobe failed: {}", stderr.trim())));
    }

    // Output format: "width,height,num/den"
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parts: Vec<&str> = stdout.trim().split(',').collect();
    if parts.len() < 3 {
        error!(%stdout, "unexpected ffprobe output format, expected width,height,fps");
        return Err(source_error(path, format!("unexpected ffprobe output: {stdout}")));
    }

    let width: u32 = parts[0].parse().map_err(|_| {
        source_error(path, format!("ffprobe reported a non-numeric width: {}", parts[0]))
    })?;
    let height: u32 = parts[1].parse().map_err(|_| {
        source_error(path, format!("ffprobe reported a non-numeric height: {}", parts[1]))
    })?;

    let fps = if let Some((num, den)) = parts[2].split_once('/') {
        let num: f64 = num.parse().unwrap_or(0.0);
        let den: f64 = den.parse().unwrap_or(0.0);
        if den > 0.0 { num / den } else { 0.0 }
    } else {
        parts[2].parse().unwrap_or(0.0)
    };

    info!(width, height, fps, "probe completed");
    Ok(ProbeResult { width, height, fps })
}

/// Decodes video frames by piping raw RGB24 data from the ffmpeg CLI.
///
/// A stream that ends mid-frame is treated as exhausted rather than failed,
/// so a truncated or corrupt tail still yields every frame decoded before it.
pub struct FfmpegFrameSource {
    child: Child,
    width: u32,
    height: u32,
    nominal_fps: u32,
    frame_count: u32,
    frame_bytes: usize,
}

impl FfmpegFrameSource {
    /// Open a video file for decoding.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(source_error(path, "file does not exist"));
        }

        let info = probe(path)?;
        if info.width == 0 || info.height == 0 {
            return Err(source_error(
                path,
                format!("invalid video dimensions: {}x{}", info.width, info.height),
            ));
        }

        let nominal_fps = if info.fps > 0.0 {
            (info.fps.round() as u32).max(1)
        } else {
            warn!(
                fps = info.fps,
                fallback = FALLBACK_FPS,
                ?path,
                "no usable frame rate reported, assuming fallback"
            );
            FALLBACK_FPS
        };

        info!(?path, "spawning ffmpeg decoder process");

        let child = Command::new("ffmpeg")
            .args(["-i"])
            .arg(path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-v", "error",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                source_error(path, format!("failed to spawn ffmpeg ({e}); is ffmpeg installed?"))
            })?;

        let frame_bytes = (info.width as usize) * (info.height as usize) * 3;

        info!(
            width = info.width,
            height = info.height,
            nominal_fps,
            frame_bytes,
            "video decoder opened"
        );

        Ok(Self {
            child,
            width: info.width,
            height: info.height,
            nominal_fps,
            frame_count: 0,
            frame_bytes,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn nominal_fps(&self) -> u32 {
        self.nominal_fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(stdout) = self.child.stdout.as_mut() else {
            warn!("ffmpeg stdout not available, treating stream as ended");
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match stdout.read(&mut buf[read..]) {
                Ok(0) => {
                    if read == 0 {
                        info!(total_frames = self.frame_count, "video stream ended");
                    } else {
                        warn!(
                            read_bytes = read,
                            expected_bytes = self.frame_bytes,
                            frame = self.frame_count,
                            "stream ended mid-frame, finalizing with the frames decoded so far"
                        );
                    }
                    return Ok(None);
                }
                Ok(n) => read += n,
                Err(e) => {
                    warn!(frame = self.frame_count, %e, "ffmpeg pipe read failed, treating stream as ended");
                    return Ok(None);
                }
            }
        }

        let Some(image) = RgbImage::from_raw(self.width, self.height, buf) else {
            warn!(frame = self.frame_count, "raw frame buffer has unexpected size, treating stream as ended");
            return Ok(None);
        };

        let frame_number = self.frame_count;
        let timestamp_ms = frame_number as u64 * 1000 / self.nominal_fps as u64;
        self.frame_count += 1;

        debug!(frame_number, timestamp_ms, "decoded frame");

        Ok(Some(Frame {
            image,
            frame_number,
            timestamp_ms,
        }))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        info!(total_frames = self.frame_count, "closing video decoder");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
