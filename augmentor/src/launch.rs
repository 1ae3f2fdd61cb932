//! Orchestration for a single inference launch.
//!
//! The [`Launcher`] trait decouples orchestration from the actual
//! multi-process launcher (currently `torchrun`). Tests use scripted
//! launchers that return predetermined exit codes without spawning anything.
//!
//! Failure semantics follow the external contract: the child's exit status is
//! propagated unchanged, with no retry and no translation.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::env::LaunchEnv;
use crate::core::invocation::Invocation;
use crate::io::config::AugmentConfig;
use crate::io::outputs::verify_output;
use crate::io::process::{exit_code, run_inherited_with_timeout};

/// Per-launch parameters on top of the shared config.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub prompt: String,
    pub input_video_path: PathBuf,
    pub video_save_folder: PathBuf,
    /// Save-name stem without extension; `None` lets the external program
    /// pick its own name (output verification is skipped in that case).
    pub video_save_name: Option<String>,
}

/// Everything needed to spawn one launch, fully resolved.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub invocation: Invocation,
    pub env: Vec<(String, String)>,
    pub workdir: PathBuf,
    pub timeout: Duration,
}

/// Exit state of one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub exit_code: i32,
    pub timed_out: bool,
}

impl LaunchOutcome {
    pub fn success(self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Outcome plus the verified output file, when one was expected and found.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub outcome: LaunchOutcome,
    pub output: Option<PathBuf>,
}

/// Resolve config, environment, and per-launch parameters into a plan.
pub fn plan_launch(
    cfg: &AugmentConfig,
    env: &LaunchEnv,
    spec: &LaunchSpec,
    master_port: u16,
) -> LaunchPlan {
    let invocation = Invocation {
        program: cfg.launcher.program.clone(),
        entrypoint: cfg.launcher.entrypoint.clone(),
        master_port,
        num_gpus: env.num_gpu.clone(),
        prompt: spec.prompt.clone(),
        checkpoint_dir: env.checkpoint_dir.clone(),
        video_save_folder: spec.video_save_folder.clone(),
        video_save_name: spec.video_save_name.clone(),
        input_video_path: spec.input_video_path.clone(),
        controlnet_specs: cfg.inference.controlnet_specs.clone(),
        offload_text_encoder_model: cfg.inference.offload_text_encoder_model,
        offload_guardrail_models: cfg.inference.offload_guardrail_models,
        offload_prompt_upsampler: cfg.inference.offload_prompt_upsampler,
        num_steps: cfg.inference.num_steps,
        blur_strength: cfg.inference.blur_strength,
    };
    LaunchPlan {
        env: env.child_env(&cfg.launcher.workdir),
        workdir: cfg.launcher.workdir.clone(),
        timeout: Duration::from_secs(cfg.launcher.launch_timeout_secs),
        invocation,
    }
}

/// Abstraction over multi-process launcher backends.
pub trait Launcher {
    fn launch(&self, plan: &LaunchPlan) -> Result<LaunchOutcome>;
}

/// Launcher that spawns the configured program (`torchrun` by default) with
/// inherited stdio.
pub struct TorchrunLauncher;

impl Launcher for TorchrunLauncher {
    #[instrument(skip_all, fields(program = %plan.invocation.program))]
    fn launch(&self, plan: &LaunchPlan) -> Result<LaunchOutcome> {
        let mut cmd = Command::new(&plan.invocation.program);
        cmd.args(plan.invocation.argv())
            .current_dir(&plan.workdir)
            .envs(plan.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let waited = run_inherited_with_timeout(cmd, plan.timeout)?;
        Ok(LaunchOutcome {
            exit_code: exit_code(waited.status),
            timed_out: waited.timed_out,
        })
    }
}

/// Run one launch and verify its output file.
///
/// Verification only runs for a zero exit with a known save name; it repairs
/// double-extension outputs and cleans up sidecar text files along the way.
pub fn execute<L: Launcher>(launcher: &L, plan: &LaunchPlan) -> Result<LaunchReport> {
    info!(
        input = %plan.invocation.input_video_path.display(),
        save_folder = %plan.invocation.video_save_folder.display(),
        "starting inference launch"
    );
    let outcome = launcher.launch(plan)?;

    let output = if outcome.success() {
        match &plan.invocation.video_save_name {
            Some(stem) => verify_output(&plan.invocation.video_save_folder, stem)?,
            None => None,
        }
    } else {
        None
    };

    info!(
        exit_code = outcome.exit_code,
        timed_out = outcome.timed_out,
        output = ?output,
        "inference launch finished"
    );
    Ok(LaunchReport { outcome, output })
}
