//! Launcher CLI for video diffusion transfer inference.
//!
//! Wraps an external multi-process launcher (`torchrun` targeting a transfer
//! inference entry point) with environment-default resolution, fixed argument
//! construction, and dataset-level batch orchestration. The exit status of a
//! completed inference launch is propagated unchanged.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use augmentor::batch::{DatasetSpec, parse_dataset_spec, run_datasets};
use augmentor::core::env::LaunchEnv;
use augmentor::core::invocation::BlurStrength;
use augmentor::exit_codes;
use augmentor::io::config::{AugmentConfig, load_config, write_config};
use augmentor::io::describe::Describer;
use augmentor::io::port::free_port;
use augmentor::launch::{LaunchSpec, TorchrunLauncher, execute, plan_launch};
use augmentor::logging;

#[derive(Parser)]
#[command(
    name = "augmentor",
    version,
    about = "Launch video diffusion transfer inference over robot datasets"
)]
struct Cli {
    /// Path to the TOML config file (missing file means defaults).
    #[arg(long, global = true, default_value = "augment.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `augment.toml` if missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the resolved launch invocation and environment without spawning.
    Plan {
        #[command(flatten)]
        launch: LaunchArgs,
        /// Rendezvous port to show; defaults to a freshly discovered one.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one inference launch and exit with the child's status.
    Launch {
        #[command(flatten)]
        launch: LaunchArgs,
    },
    /// Generate synthetic episodes for datasets (`name:episodes` specs).
    Dataset {
        /// Dataset specs, e.g. `stack_rings_blue:3 so101_test:2`.
        #[arg(required = true)]
        specs: Vec<String>,
    },
}

#[derive(Debug, clap::Args)]
struct LaunchArgs {
    /// Text prompt for the transfer model.
    #[arg(long)]
    prompt: String,

    /// Input video file.
    #[arg(long)]
    input: PathBuf,

    /// Output folder; defaults to the configured one.
    #[arg(long)]
    output_folder: Option<PathBuf>,

    /// Save-name stem (no extension); when set, the output file is verified
    /// after the launch.
    #[arg(long)]
    name: Option<String>,

    /// Override the configured blur strength.
    #[arg(long, value_enum)]
    blur_strength: Option<BlurStrength>,
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => match u8::try_from(code) {
            Ok(code) => ExitCode::from(code),
            // Out-of-range codes cannot be represented; treat as failure.
            Err(_) => ExitCode::from(exit_codes::INVALID as u8),
        },
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(exit_codes::INVALID as u8)
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Plan { launch, port } => cmd_plan(&cli.config, &launch, port),
        Command::Launch { launch } => cmd_launch(&cli.config, &launch),
        Command::Dataset { specs } => cmd_dataset(&cli.config, &specs),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        println!("config exists: {}", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &AugmentConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn resolved_spec(cfg: &AugmentConfig, args: &LaunchArgs) -> LaunchSpec {
    LaunchSpec {
        prompt: args.prompt.clone(),
        input_video_path: args.input.clone(),
        video_save_folder: args
            .output_folder
            .clone()
            .unwrap_or_else(|| cfg.inference.video_save_folder.clone()),
        video_save_name: args.name.clone(),
    }
}

fn apply_overrides(cfg: &mut AugmentConfig, args: &LaunchArgs) {
    if let Some(blur) = args.blur_strength {
        cfg.inference.blur_strength = blur;
    }
}

fn cmd_plan(config_path: &Path, args: &LaunchArgs, port: Option<u16>) -> Result<i32> {
    let mut cfg = load_config(config_path)?;
    apply_overrides(&mut cfg, args);
    let env = LaunchEnv::from_process_env();
    let port = match port {
        Some(port) => port,
        None => free_port()?,
    };
    let plan = plan_launch(&cfg, &env, &resolved_spec(&cfg, args), port);

    println!("workdir: {}", plan.workdir.display());
    for (key, value) in &plan.env {
        println!("env: {key}={value}");
    }
    println!("{}", plan.invocation.program);
    for arg in plan.invocation.argv() {
        println!("  {arg}");
    }
    Ok(exit_codes::OK)
}

fn cmd_launch(config_path: &Path, args: &LaunchArgs) -> Result<i32> {
    let mut cfg = load_config(config_path)?;
    apply_overrides(&mut cfg, args);
    let env = LaunchEnv::from_process_env();
    let port = free_port()?;
    let plan = plan_launch(&cfg, &env, &resolved_spec(&cfg, args), port);

    let report = execute(&TorchrunLauncher, &plan)?;
    // The child's exit status is the command's exit status, unchanged.
    Ok(report.outcome.exit_code)
}

fn cmd_dataset(config_path: &Path, raw_specs: &[String]) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let specs: Vec<DatasetSpec> = raw_specs
        .iter()
        .map(|raw| parse_dataset_spec(raw))
        .collect::<Result<_>>()?;

    let env = LaunchEnv::from_process_env();
    let prompts = Describer::new(cfg.describe.clone());
    let summary = run_datasets(&TorchrunLauncher, &prompts, &cfg, &env, &specs)?;

    println!(
        "summary: datasets={}/{} launches={}/{}",
        summary.datasets_ok, summary.datasets, summary.launches_ok, summary.launches
    );
    if summary.all_ok() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::INVALID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan() {
        let cli = Cli::parse_from([
            "augmentor", "plan", "--prompt", "a robot", "--input", "in.mp4",
        ]);
        assert!(matches!(cli.command, Command::Plan { .. }));
        assert_eq!(cli.config, PathBuf::from("augment.toml"));
    }

    #[test]
    fn parse_dataset_specs() {
        let cli = Cli::parse_from(["augmentor", "dataset", "stack_rings_blue:3", "so101_test:2"]);
        match cli.command {
            Command::Dataset { specs } => assert_eq!(specs.len(), 2),
            _ => panic!("expected dataset command"),
        }
    }

    #[test]
    fn parse_launch_with_overrides() {
        let cli = Cli::parse_from([
            "augmentor",
            "launch",
            "--prompt",
            "a robot",
            "--input",
            "in.mp4",
            "--name",
            "episode_000002",
            "--blur-strength",
            "high",
        ]);
        match cli.command {
            Command::Launch { launch } => {
                assert_eq!(launch.name.as_deref(), Some("episode_000002"));
                assert_eq!(launch.blur_strength, Some(BlurStrength::High));
            }
            _ => panic!("expected launch command"),
        }
    }
}
