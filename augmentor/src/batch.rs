//! Dataset-level orchestration: generate synthetic episodes across datasets.
//!
//! For each requested dataset this validates the source episodes, copies
//! parquet sidecars for the new episode numbers, then runs one inference
//! launch per (episode, camera). Individual launch failures are logged and
//! counted, not fatal; a dataset only succeeds when every attempted launch
//! produced a verified output.

use anyhow::{Context, Result, anyhow, bail};
use tracing::{error, info, warn};

use crate::core::env::LaunchEnv;
use crate::core::episode::{episode_stem, episode_video_name};
use crate::io::config::AugmentConfig;
use crate::io::dataset::{
    DatasetLayout, copy_parquet, next_episode_in, validate_source_episodes,
};
use crate::io::describe::PromptSource;
use crate::io::port::free_port;
use crate::launch::{LaunchSpec, Launcher, execute, plan_launch};

/// One `name:episodes` request from the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub name: String,
    pub episodes: u32,
}

/// Parse a `name:episodes` spec.
pub fn parse_dataset_spec(raw: &str) -> Result<DatasetSpec> {
    let (name, count) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid dataset spec '{raw}': expected name:episodes"))?;
    if name.trim().is_empty() {
        bail!("invalid dataset spec '{raw}': empty dataset name");
    }
    let episodes: u32 = count
        .parse()
        .with_context(|| format!("invalid episode count in '{raw}'"))?;
    if episodes == 0 {
        bail!("episode count must be positive in '{raw}'");
    }
    Ok(DatasetSpec {
        name: name.to_string(),
        episodes,
    })
}

/// Aggregated counters for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub datasets: usize,
    pub datasets_ok: usize,
    pub launches: usize,
    pub launches_ok: usize,
}

impl BatchSummary {
    pub fn all_ok(&self) -> bool {
        self.datasets_ok == self.datasets
    }
}

/// Process every requested dataset, continuing past per-dataset failures.
pub fn run_datasets<L: Launcher, P: PromptSource>(
    launcher: &L,
    prompts: &P,
    cfg: &AugmentConfig,
    env: &LaunchEnv,
    specs: &[DatasetSpec],
) -> Result<BatchSummary> {
    let mut summary = BatchSummary {
        datasets: specs.len(),
        ..BatchSummary::default()
    };

    for spec in specs {
        info!(dataset = %spec.name, episodes = spec.episodes, "processing dataset");
        match process_dataset(launcher, prompts, cfg, env, spec) {
            Ok((attempted, succeeded)) => {
                summary.launches += attempted;
                summary.launches_ok += succeeded;
                if attempted == succeeded {
                    summary.datasets_ok += 1;
                    info!(dataset = %spec.name, succeeded, "dataset completed");
                } else {
                    error!(
                        dataset = %spec.name,
                        succeeded,
                        attempted,
                        "dataset completed with failures"
                    );
                }
            }
            Err(err) => {
                error!(dataset = %spec.name, err = %err, "dataset failed");
            }
        }
    }

    info!(
        datasets = summary.datasets,
        datasets_ok = summary.datasets_ok,
        launches = summary.launches,
        launches_ok = summary.launches_ok,
        "batch finished"
    );
    Ok(summary)
}

/// Generate `spec.episodes` new synthetic episodes for one dataset.
///
/// Returns `(attempted, succeeded)` launch counts.
fn process_dataset<L: Launcher, P: PromptSource>(
    launcher: &L,
    prompts: &P,
    cfg: &AugmentConfig,
    env: &LaunchEnv,
    spec: &DatasetSpec,
) -> Result<(usize, usize)> {
    let layout = DatasetLayout::discover(&cfg.datasets.base, &spec.name)?;
    let cameras = layout.camera_dirs()?;
    if cameras.is_empty() {
        bail!("no camera folders found in {}", layout.videos_dir.display());
    }

    validate_source_episodes(&layout.data_dir, spec.episodes)?;

    // New episode numbers continue after the highest in the first camera
    // folder; every camera shares the same numbering.
    let next_episode = next_episode_in(&cameras[0])?;
    for i in 0..spec.episodes {
        copy_parquet(&layout.data_dir, i, next_episode + i)?;
    }

    let mut attempted = 0usize;
    let mut succeeded = 0usize;

    for i in 0..spec.episodes {
        let dest_episode = next_episode + i;
        for camera in &cameras {
            let src_video = camera.join(episode_video_name(i));
            if !src_video.exists() {
                warn!(src = %src_video.display(), "source video not found, skipping");
                continue;
            }
            attempted += 1;

            let prompt = prompts.prompt_for(&src_video);
            let launch_spec = LaunchSpec {
                prompt,
                input_video_path: src_video.clone(),
                video_save_folder: camera.clone(),
                video_save_name: Some(episode_stem(dest_episode)),
            };
            let port = free_port()?;
            let plan = plan_launch(cfg, env, &launch_spec, port);

            match execute(launcher, &plan) {
                Ok(report) if report.outcome.success() && report.output.is_some() => {
                    succeeded += 1;
                }
                Ok(report) => {
                    error!(
                        src = %src_video.display(),
                        exit_code = report.outcome.exit_code,
                        timed_out = report.outcome.timed_out,
                        output_found = report.output.is_some(),
                        "launch failed"
                    );
                }
                Err(err) => {
                    error!(src = %src_video.display(), err = %err, "launch errored");
                }
            }
        }
    }

    Ok((attempted, succeeded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_spec() {
        let spec = parse_dataset_spec("stack_rings_blue:3").expect("parse");
        assert_eq!(
            spec,
            DatasetSpec {
                name: "stack_rings_blue".to_string(),
                episodes: 3
            }
        );
    }

    #[test]
    fn parse_rejects_missing_colon() {
        assert!(parse_dataset_spec("stack_rings_blue").is_err());
    }

    #[test]
    fn parse_rejects_bad_counts() {
        assert!(parse_dataset_spec("ds:zero").is_err());
        assert!(parse_dataset_spec("ds:0").is_err());
        assert!(parse_dataset_spec(":3").is_err());
    }
}
