//! Argument-list construction for one inference launch.
//!
//! The external contract is positional: the launcher takes its distributed
//! flags first, then the entry-point script, then the inference flags in a
//! fixed order. Boolean offload flags are presence-only, never `true`/`false`
//! values.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Edge-blur strength applied by the external transfer model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum BlurStrength {
    VeryLow,
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

impl BlurStrength {
    pub fn as_str(self) -> &'static str {
        match self {
            BlurStrength::VeryLow => "very_low",
            BlurStrength::Low => "low",
            BlurStrength::Medium => "medium",
            BlurStrength::High => "high",
            BlurStrength::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for BlurStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully resolved invocation of the external multi-process launcher.
///
/// `num_gpus` is carried as a string: it comes from `NUM_GPU` unvalidated and
/// is substituted into both the launcher's `--nproc_per_node` and the
/// inference `--num_gpus` flag as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub entrypoint: PathBuf,
    pub master_port: u16,
    pub num_gpus: String,
    pub prompt: String,
    pub checkpoint_dir: String,
    pub video_save_folder: PathBuf,
    pub video_save_name: Option<String>,
    pub input_video_path: PathBuf,
    pub controlnet_specs: PathBuf,
    pub offload_text_encoder_model: bool,
    pub offload_guardrail_models: bool,
    pub offload_prompt_upsampler: bool,
    pub num_steps: Option<u32>,
    pub blur_strength: BlurStrength,
}

impl Invocation {
    /// Build the ordered argument list (everything after the program name).
    ///
    /// The five required path/value flags (`--prompt`, `--checkpoint_dir`,
    /// `--video_save_folder`, `--input_video_path`, `--controlnet_specs`)
    /// always appear in that order, regardless of any optional flags.
    pub fn argv(&self) -> Vec<String> {
        let mut args = vec![
            format!("--nproc_per_node={}", self.num_gpus),
            "--nnodes=1".to_string(),
            "--node_rank=0".to_string(),
            format!("--master_port={}", self.master_port),
            self.entrypoint.display().to_string(),
            "--prompt".to_string(),
            self.prompt.clone(),
            "--checkpoint_dir".to_string(),
            self.checkpoint_dir.clone(),
            "--video_save_folder".to_string(),
            self.video_save_folder.display().to_string(),
        ];
        if let Some(name) = &self.video_save_name {
            args.push("--video_save_name".to_string());
            args.push(name.clone());
        }
        args.push("--input_video_path".to_string());
        args.push(self.input_video_path.display().to_string());
        args.push("--controlnet_specs".to_string());
        args.push(self.controlnet_specs.display().to_string());
        if self.offload_text_encoder_model {
            args.push("--offload_text_encoder_model".to_string());
        }
        if self.offload_guardrail_models {
            args.push("--offload_guardrail_models".to_string());
        }
        if self.offload_prompt_upsampler {
            args.push("--offload_prompt_upsampler".to_string());
        }
        if let Some(steps) = self.num_steps {
            args.push("--num_steps".to_string());
            args.push(steps.to_string());
        }
        args.push("--num_gpus".to_string());
        args.push(self.num_gpus.clone());
        args.push("--blur_strength".to_string());
        args.push(self.blur_strength.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> Invocation {
        Invocation {
            program: "torchrun".to_string(),
            entrypoint: PathBuf::from("inference/transfer.py"),
            master_port: 29500,
            num_gpus: "1".to_string(),
            prompt: "a robot arm stacks rings".to_string(),
            checkpoint_dir: "./checkpoints".to_string(),
            video_save_folder: PathBuf::from("outputs"),
            video_save_name: None,
            input_video_path: PathBuf::from("input.mp4"),
            controlnet_specs: PathBuf::from("assets/augment.json"),
            offload_text_encoder_model: true,
            offload_guardrail_models: true,
            offload_prompt_upsampler: true,
            num_steps: None,
            blur_strength: BlurStrength::Low,
        }
    }

    fn position(args: &[String], flag: &str) -> usize {
        args.iter()
            .position(|a| a == flag)
            .unwrap_or_else(|| panic!("missing {flag}"))
    }

    #[test]
    fn required_flags_keep_fixed_order() {
        let args = invocation().argv();
        let order = [
            "--prompt",
            "--checkpoint_dir",
            "--video_save_folder",
            "--input_video_path",
            "--controlnet_specs",
        ];
        let positions: Vec<usize> = order.iter().map(|f| position(&args, f)).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn offload_flags_are_presence_only() {
        let args = invocation().argv();
        let idx = position(&args, "--offload_text_encoder_model");
        assert!(args[idx + 1].starts_with("--"), "flag must not carry a value");
        assert!(!args.contains(&"true".to_string()));
        assert!(!args.contains(&"false".to_string()));
    }

    #[test]
    fn disabled_offload_flags_are_absent() {
        let mut inv = invocation();
        inv.offload_prompt_upsampler = false;
        let args = inv.argv();
        assert!(!args.contains(&"--offload_prompt_upsampler".to_string()));
    }

    #[test]
    fn num_gpus_substitutes_into_both_flags() {
        let mut inv = invocation();
        inv.num_gpus = "4".to_string();
        let args = inv.argv();
        assert_eq!(args[0], "--nproc_per_node=4");
        let idx = position(&args, "--num_gpus");
        assert_eq!(args[idx + 1], "4");
    }

    #[test]
    fn save_name_and_steps_are_optional() {
        let mut inv = invocation();
        let args = inv.argv();
        assert!(!args.contains(&"--video_save_name".to_string()));
        assert!(!args.contains(&"--num_steps".to_string()));

        inv.video_save_name = Some("episode_000003".to_string());
        inv.num_steps = Some(20);
        let args = inv.argv();
        let idx = position(&args, "--video_save_name");
        assert_eq!(args[idx + 1], "episode_000003");
        let idx = position(&args, "--num_steps");
        assert_eq!(args[idx + 1], "20");
    }

    #[test]
    fn blur_strength_renders_snake_case() {
        let mut inv = invocation();
        inv.blur_strength = BlurStrength::VeryHigh;
        let args = inv.argv();
        let idx = position(&args, "--blur_strength");
        assert_eq!(args[idx + 1], "very_high");
    }
}
