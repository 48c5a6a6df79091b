//! External tool capabilities: OCR, media probing, frame extraction.
//!
//! Each capability is a trait so the pipeline's degradation behavior is
//! testable without the real binaries installed. Production implementations
//! shell out to `tesseract`, `ffprobe`, and `ffmpeg`, guarded by binary
//! discovery and a wall-clock timeout. A timeout or missing binary is
//! reported as `Unavailable` — never a pipeline failure.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::config::Config;

/// Result of invoking an external tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Tool ran successfully; payload is its stdout (or the produced path
    /// for frame extraction).
    Output(String),
    /// Binary not installed, or the call exceeded its time limit.
    Unavailable,
    /// Tool ran but exited non-zero or could not be spawned.
    Failed(String),
}

/// Optical character recognition over an image file.
#[async_trait]
pub trait OpticalReader: Send + Sync {
    async fn read_text(&self, path: &Path) -> ToolOutcome;
}

/// Container/stream metadata probing for a media file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> ToolOutcome;
}

/// Extraction of a single representative frame from a video.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_first_frame(&self, path: &Path, destination: &Path) -> ToolOutcome;
}

/// Stand-in used by tests and `tools.enabled = false` configs: every tool
/// reports itself unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTools;

#[async_trait]
impl OpticalReader for DisabledTools {
    async fn read_text(&self, _path: &Path) -> ToolOutcome {
        ToolOutcome::Unavailable
    }
}

#[async_trait]
impl MediaProber for DisabledTools {
    async fn probe(&self, _path: &Path) -> ToolOutcome {
        ToolOutcome::Unavailable
    }
}

#[async_trait]
impl FrameExtractor for DisabledTools {
    async fn extract_first_frame(&self, _path: &Path, _destination: &Path) -> ToolOutcome {
        ToolOutcome::Unavailable
    }
}

/// `tesseract <image> stdout`
#[derive(Debug, Clone)]
pub struct TesseractReader {
    timeout: Duration,
}

impl TesseractReader {
    pub fn new(config: &Config) -> TesseractReader {
        TesseractReader {
            timeout: Duration::from_secs(config.tools.timeout_secs),
        }
    }
}

#[async_trait]
impl OpticalReader for TesseractReader {
    async fn read_text(&self, path: &Path) -> ToolOutcome {
        let args = vec![path.display().to_string(), "stdout".to_string()];
        run_tool("tesseract", &args, self.timeout).await
    }
}

/// `ffprobe -v error -print_format json -show_format -show_streams <video>`
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(config: &Config) -> FfprobeProber {
        FfprobeProber {
            timeout: Duration::from_secs(config.tools.timeout_secs),
        }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> ToolOutcome {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_entries".to_string(),
            "format=format_name,duration,size:stream=codec_name,width,height".to_string(),
            path.display().to_string(),
        ];
        run_tool("ffprobe", &args, self.timeout).await
    }
}

/// `ffmpeg -y -i <video> -vf select=eq(n\,0) -q:v 2 <destination>`
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    timeout: Duration,
}

impl FfmpegFrameExtractor {
    pub fn new(config: &Config) -> FfmpegFrameExtractor {
        FfmpegFrameExtractor {
            timeout: Duration::from_secs(config.tools.timeout_secs),
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_first_frame(&self, path: &Path, destination: &Path) -> ToolOutcome {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            path.display().to_string(),
            "-vf".to_string(),
            r"select=eq(n\,0)".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            destination.display().to_string(),
        ];
        match run_tool("ffmpeg", &args, self.timeout).await {
            ToolOutcome::Output(_) if destination.exists() => {
                ToolOutcome::Output(destination.display().to_string())
            }
            ToolOutcome::Output(_) => {
                ToolOutcome::Failed("ffmpeg exited cleanly but produced no frame".to_string())
            }
            other => other,
        }
    }
}

async fn run_tool(binary: &str, args: &[String], timeout: Duration) -> ToolOutcome {
    if which::which(binary).is_err() {
        return ToolOutcome::Unavailable;
    }
    tracing::debug!(binary, ?args, "invoking external tool");
    let mut command = tokio::process::Command::new(binary);
    command.args(args).kill_on_drop(true);
    match tokio::time::timeout(timeout, command.output()).await {
        // a hung tool is treated the same as a missing one
        Err(_) => ToolOutcome::Unavailable,
        Ok(Err(err)) => ToolOutcome::Failed(err.to_string()),
        Ok(Ok(output)) => {
            if output.status.success() {
                ToolOutcome::Output(String::from_utf8_lossy(&output.stdout).into_owned())
            } else {
                ToolOutcome::Failed(String::from_utf8_lossy(&output.stderr).into_owned())
            }
        }
    }
}
