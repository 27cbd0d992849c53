//! Frame sources and sinks.
//!
//! [`PngSequence`] treats a directory of PNG files as a video. [`Ffmpeg`]
//! drives the `ffmpeg`/`ffprobe` binaries for real containers, always through
//! a lossless intermediate so no pixel value changes on the way in or out.

use crate::error::{Result, StegoError};
use crate::frame::{check_frame_limit, Frame, FrameSink, FrameSource};
use image::ImageReader;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info, warn};

const FRAME_PATTERN: &str = "frame_%06d.png";
const DEFAULT_FPS: &str = "30";

/// Directory removed with everything in it when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh, uniquely named directory under `parent`.
    pub fn new_in(parent: &Path, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(parent)?;
        let path = parent.join(format!("{}-{:016x}", prefix, rand::random::<u64>()));
        std::fs::create_dir(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!("Failed to remove scratch dir {}: {}", self.path.display(), e);
        }
    }
}

fn frame_file_name(index: usize) -> String {
    format!("frame_{:06}.png", index)
}

/// Load every `*.png` in `dir`, sorted by file name. With a `limit`, the
/// files are counted first and nothing is decoded when there are too many.
fn read_png_dir(dir: &Path, limit: Option<usize>) -> Result<Vec<Frame>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();
    if let Some(limit) = limit {
        check_frame_limit(paths.len(), limit)?;
    }

    paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| -> Result<Frame> {
            let image = ImageReader::open(path)?.decode()?.to_rgb8();
            Ok(Frame::new(index, image))
        })
        .collect()
}

fn write_png_dir(frames: &[Frame], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    frames.par_iter().enumerate().try_for_each(|(i, frame)| {
        frame.image.save(dir.join(frame_file_name(i)))?;
        Ok::<(), StegoError>(())
    })
}

/// A directory of PNG frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngSequence;

impl FrameSource for PngSequence {
    fn extract(&self, video: &Path) -> Result<Vec<Frame>> {
        let frames = read_png_dir(video, None)?;
        debug!("Loaded {} PNG frames from {}", frames.len(), video.display());
        Ok(frames)
    }

    fn extract_bounded(&self, video: &Path, limit: usize) -> Result<Vec<Frame>> {
        let frames = read_png_dir(video, Some(limit))?;
        debug!("Loaded {} PNG frames from {}", frames.len(), video.display());
        Ok(frames)
    }
}

impl FrameSink for PngSequence {
    fn assemble(&self, frames: &[Frame], _reference: &Path, output: &Path) -> Result<()> {
        write_png_dir(frames, output)?;
        debug!("Wrote {} PNG frames to {}", frames.len(), output.display());
        Ok(())
    }
}

/// `ffmpeg`-backed container I/O. Scratch frames live under `work_dir`.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub work_dir: PathBuf,
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        let ffmpeg = ffmpeg.into();
        // ffprobe sits next to ffmpeg, or on PATH when ffmpeg is a bare name.
        let ffprobe = ffmpeg.with_file_name(if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" });
        Self {
            ffmpeg,
            ffprobe,
            work_dir: work_dir.into(),
        }
    }

    /// Frame rate of the first video stream as ffmpeg's rational string,
    /// falling back to 30 when probing fails.
    pub fn frame_rate(&self, video: &Path) -> String {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=r_frame_rate",
                "-of",
                "csv=p=0",
            ])
            .arg(video)
            .output();
        match output {
            Ok(out) if out.status.success() => {
                let rate = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if rate.is_empty() || rate.starts_with('0') {
                    DEFAULT_FPS.to_string()
                } else {
                    rate
                }
            }
            Ok(out) => {
                warn!(
                    "ffprobe failed on {}: {}",
                    video.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                DEFAULT_FPS.to_string()
            }
            Err(e) => {
                warn!("Failed to execute ffprobe: {}", e);
                DEFAULT_FPS.to_string()
            }
        }
    }

    fn run(&self, what: &str, cmd: &mut Command) -> Result<()> {
        debug!("Running {:?}", cmd);
        let output = cmd
            .output()
            .map_err(|e| StegoError::Media(format!("failed to execute ffmpeg: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(target: "stegoframe::media", "{} failed: {}", what, stderr.trim());
            return Err(StegoError::Media(format!("{} failed", what)));
        }
        Ok(())
    }

    /// Best-effort lossy H.264 copy for playback. The hidden payload is not
    /// expected to survive it.
    pub fn transcode_preview(&self, lossless: &Path, output: &Path) -> Result<()> {
        self.run(
            "preview transcode",
            Command::new(&self.ffmpeg)
                .args(["-y", "-loglevel", "error", "-i"])
                .arg(lossless)
                .args([
                    "-c:v", "libx264", "-preset", "veryfast", "-crf", "23", "-pix_fmt", "yuv420p",
                    "-c:a", "aac", "-movflags", "+faststart",
                ])
                .arg(output),
        )?;
        info!("Wrote playback copy {}", output.display());
        Ok(())
    }

    /// Decode `video` to PNGs in a scratch dir and load them. With a `limit`,
    /// ffmpeg stops one frame past it so oversized videos fail early.
    fn extract_frames(&self, video: &Path, limit: Option<usize>) -> Result<Vec<Frame>> {
        let scratch = ScratchDir::new_in(&self.work_dir, "extract")?;
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-loglevel", "error", "-i"])
            .arg(video)
            .args(["-map", "0:v:0", "-vsync", "0", "-pix_fmt", "rgb24"]);
        if let Some(limit) = limit {
            cmd.arg("-frames:v").arg(limit.saturating_add(1).to_string());
        }
        cmd.arg(scratch.path().join(FRAME_PATTERN));
        self.run("frame extraction", &mut cmd)?;

        let frames = read_png_dir(scratch.path(), limit)?;
        info!("Extracted {} frames from {}", frames.len(), video.display());
        Ok(frames)
    }
}

impl FrameSource for Ffmpeg {
    fn extract(&self, video: &Path) -> Result<Vec<Frame>> {
        self.extract_frames(video, None)
    }

    fn extract_bounded(&self, video: &Path, limit: usize) -> Result<Vec<Frame>> {
        self.extract_frames(video, Some(limit))
    }
}

impl FrameSink for Ffmpeg {
    /// Mux with FFV1 in RGB so the container is pixel-exact; audio is copied
    /// from `reference` when it is a file with an audio stream.
    fn assemble(&self, frames: &[Frame], reference: &Path, output: &Path) -> Result<()> {
        let scratch = ScratchDir::new_in(&self.work_dir, "assemble")?;
        write_png_dir(frames, scratch.path())?;
        let rate = self.frame_rate(reference);

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-loglevel", "error", "-framerate", rate.as_str(), "-i"])
            .arg(scratch.path().join(FRAME_PATTERN));
        if reference.is_file() {
            cmd.arg("-i")
                .arg(reference)
                .args(["-map", "0:v:0", "-map", "1:a?", "-c:a", "copy", "-shortest"]);
        }
        cmd.args(["-c:v", "ffv1", "-level", "3", "-pix_fmt", "bgr0"])
            .arg(output);
        self.run("lossless assembly", &mut cmd)?;
        info!(
            "Assembled {} frames into {} at {} fps",
            frames.len(),
            output.display(),
            rate
        );
        Ok(())
    }
}
