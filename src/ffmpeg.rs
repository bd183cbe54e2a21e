use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Suffix appended to the input path to name the fast-start output.
pub const FAST_START_SUFFIX: &str = ".processing";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to execute ffprobe: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffprobe failed: {0}")]
    Failed(String),

    #[error("failed to parse ffprobe output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no video streams found in {0}")]
    NoVideoStream(PathBuf),

    #[error("invalid video height: 0")]
    ZeroHeight,
}

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("failed to execute ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg failed to process video for fast start: {0}")]
    Failed(String),
}

/// Width and height of the first video stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<Geometry, ProbeError>;
}

/// Rewrites container metadata so playback can start before the download
/// completes. The input is left untouched; the returned path is a new file
/// owned by the caller.
#[async_trait]
pub trait Remuxer: Send + Sync {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError>;
}

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

/// Parse `ffprobe -print_format json -show_entries stream=width,height` output.
///
/// Streams without geometry (audio, data) are skipped; the first stream
/// reporting a width and height wins.
pub fn parse_probe_output(stdout: &[u8], path: &Path) -> Result<Geometry, ProbeError> {
    let output: FfprobeOutput = serde_json::from_slice(stdout)?;

    let stream = output
        .streams
        .iter()
        .find(|s| s.width.is_some() && s.height.is_some())
        .ok_or_else(|| ProbeError::NoVideoStream(path.to_path_buf()))?;

    let width = stream.width.unwrap_or_default();
    let height = stream.height.unwrap_or_default();
    if height == 0 {
        return Err(ProbeError::ZeroHeight);
    }

    Ok(Geometry { width, height })
}

pub fn fast_start_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(FAST_START_SUFFIX);
    PathBuf::from(name)
}

#[derive(Clone, Debug)]
pub struct FfprobeProber {
    program: String,
}

impl FfprobeProber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<Geometry, ProbeError> {
        let output = Command::new(&self.program)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_entries")
            .arg("stream=width,height")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Failed(stderr.trim().to_string()));
        }

        parse_probe_output(&output.stdout, path)
    }
}

#[derive(Clone, Debug)]
pub struct FfmpegRemuxer {
    program: String,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        let output_path = fast_start_output_path(input);

        let output = Command::new(&self.program)
            .arg("-i")
            .arg(input)
            .arg("-c")
            .arg("copy")
            .arg("-movflags")
            .arg("faststart")
            .arg("-f")
            .arg("mp4")
            .arg("-y")
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(RemuxError::Spawn)?;

        if !output.status.success() {
            // ffmpeg may have created a partial file before failing
            let _ = tokio::fs::remove_file(&output_path).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemuxError::Failed(stderr.trim().to_string()));
        }

        Ok(output_path)
    }
}

/// First line of `<program> -version`, if the tool can be executed.
pub async fn tool_version(program: &str) -> Option<String> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.to_string())
}
