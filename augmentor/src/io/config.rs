//! Augmentor configuration stored in `augment.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::invocation::BlurStrength;

/// Augmentor configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to the values the launch script shipped
/// with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AugmentConfig {
    pub launcher: LauncherConfig,
    pub inference: InferenceConfig,
    pub datasets: DatasetConfig,
    pub describe: DescribeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Multi-process launcher program.
    pub program: String,

    /// Inference entry-point script, relative to `workdir`.
    pub entrypoint: PathBuf,

    /// Working directory the launcher runs in (also becomes `PYTHONPATH`).
    pub workdir: PathBuf,

    /// Wall-clock budget for one inference launch in seconds.
    pub launch_timeout_secs: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program: "torchrun".to_string(),
            entrypoint: PathBuf::from("cosmos_transfer1/diffusion/inference/transfer.py"),
            workdir: PathBuf::from("/root/cosmos-transfer1"),
            launch_timeout_secs: 4 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Controlnet spec file handed to the external program (opaque schema).
    pub controlnet_specs: PathBuf,

    /// Default output folder for single launches.
    pub video_save_folder: PathBuf,

    pub offload_text_encoder_model: bool,
    pub offload_guardrail_models: bool,
    pub offload_prompt_upsampler: bool,

    /// Diffusion step count; `None` leaves the external default in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_steps: Option<u32>,

    pub blur_strength: BlurStrength,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            controlnet_specs: PathBuf::from("assets/augment.json"),
            video_save_folder: PathBuf::from("outputs"),
            offload_text_encoder_model: true,
            offload_guardrail_models: true,
            offload_prompt_upsampler: true,
            num_steps: Some(20),
            blur_strength: BlurStrength::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    /// Base directory holding one subdirectory per dataset.
    pub base: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            base: PathBuf::from("./datasets"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DescribeConfig {
    /// Vision model used to describe source videos.
    pub model: String,

    /// Equally spaced frames extracted per source video.
    pub num_frames: u32,

    /// Prompt used when description fails or no API key is configured.
    pub fallback_prompt: String,

    /// Timeout for ffprobe/ffmpeg probe commands in seconds.
    pub probe_timeout_secs: u64,

    /// Truncate probe command output beyond this many bytes.
    pub probe_output_limit_bytes: usize,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            num_frames: 6,
            fallback_prompt: "a video sequence with robotic manipulation tasks".to_string(),
            probe_timeout_secs: 60,
            probe_output_limit_bytes: 1_000_000,
        }
    }
}

impl AugmentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.launcher.program.trim().is_empty() {
            return Err(anyhow!("launcher.program must not be empty"));
        }
        if self.launcher.entrypoint.as_os_str().is_empty() {
            return Err(anyhow!("launcher.entrypoint must not be empty"));
        }
        if self.launcher.launch_timeout_secs == 0 {
            return Err(anyhow!("launcher.launch_timeout_secs must be > 0"));
        }
        if self.describe.num_frames == 0 {
            return Err(anyhow!("describe.num_frames must be > 0"));
        }
        if self.describe.probe_timeout_secs == 0 {
            return Err(anyhow!("describe.probe_timeout_secs must be > 0"));
        }
        if self.describe.probe_output_limit_bytes == 0 {
            return Err(anyhow!("describe.probe_output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AugmentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AugmentConfig> {
    if !path.exists() {
        let cfg = AugmentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AugmentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AugmentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AugmentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("augment.toml");
        let mut cfg = AugmentConfig::default();
        cfg.inference.blur_strength = BlurStrength::Medium;
        cfg.inference.num_steps = Some(35);
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = AugmentConfig::default();
        cfg.launcher.launch_timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_program_is_rejected() {
        let mut cfg = AugmentConfig::default();
        cfg.launcher.program = "  ".to_string();
        assert!(cfg.validate().is_err());
    }
}
