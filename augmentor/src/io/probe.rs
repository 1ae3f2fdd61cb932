//! Frame extraction from source videos via ffprobe/ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::io::process::run_captured_with_timeout;

/// Limits applied to probe commands.
#[derive(Debug, Clone, Copy)]
pub struct ProbeLimits {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Extracted frames; the backing temp directory lives as long as this value.
#[derive(Debug)]
pub struct FrameSet {
    _dir: TempDir,
    pub frames: Vec<PathBuf>,
}

/// Video duration in seconds, via ffprobe.
pub fn video_duration(video: &Path, limits: ProbeLimits) -> Result<f64> {
    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "quiet",
        "-show_entries",
        "format=duration",
        "-of",
        "csv=p=0",
    ])
    .arg(video);

    let output = run_captured_with_timeout(cmd, limits.timeout, limits.output_limit_bytes)
        .context("run ffprobe")?;
    if !output.status.success() {
        return Err(anyhow!(
            "ffprobe failed for {} (exit {:?})",
            video.display(),
            output.status.code()
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_duration(&text).with_context(|| format!("bad duration for {}", video.display()))
}

/// Parse an ffprobe duration line, rejecting non-positive values.
fn parse_duration(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let duration: f64 = trimmed
        .parse()
        .with_context(|| format!("invalid duration '{trimmed}'"))?;
    if duration <= 0.0 {
        return Err(anyhow!("invalid video duration {duration}"));
    }
    Ok(duration)
}

/// Extract `num_frames` equally spaced JPEG frames from a video.
///
/// Individual frame failures are skipped; only a fully empty result is an
/// error.
pub fn extract_frames(video: &Path, num_frames: u32, limits: ProbeLimits) -> Result<FrameSet> {
    let duration = video_duration(video, limits)?;
    let dir = TempDir::new().context("create frame temp dir")?;

    let mut frames = Vec::new();
    for i in 0..num_frames {
        let time_pos = f64::from(i) * duration / f64::from(num_frames);
        let frame_path = dir.path().join(format!("frame_{i:03}.jpg"));

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-ss")
            .arg(time_pos.to_string())
            .args(["-vframes", "1", "-q:v", "2"])
            .arg(&frame_path);

        let output = run_captured_with_timeout(cmd, limits.timeout, limits.output_limit_bytes)
            .context("run ffmpeg")?;
        if output.status.success() && frame_path.exists() {
            frames.push(frame_path);
        } else {
            warn!(
                time_pos,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "ffmpeg failed to extract frame"
            );
        }
    }

    if frames.is_empty() {
        return Err(anyhow!("could not extract any frames from {}", video.display()));
    }
    debug!(count = frames.len(), video = %video.display(), "extracted frames");
    Ok(FrameSet { _dir: dir, frames })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parses_with_whitespace() {
        let duration = parse_duration("12.48\n").expect("parse");
        assert!((duration - 12.48).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_duration_is_rejected() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("N/A").is_err());
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("0.0").is_err());
        assert!(parse_duration("-3.5").is_err());
    }
}
