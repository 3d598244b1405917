use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ewma_simulationengine::{RawExperimentConfig, SimulationEngine, SimulationTelemetry};
use serde_json::json;
use shared_logging::{JsonLogger, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "diepred", version, about = "EWMA biased-die prediction experiment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the experiment and prints the success-rate summary.
    Run(RunArgs),
    /// Prints the default configuration as TOML.
    Defaults,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML file with experiment parameters; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Independent epochs to run.
    #[arg(long, allow_negative_numbers = true)]
    experiments: Option<i64>,
    /// Scored trials per epoch (multiple of 10).
    #[arg(long, allow_negative_numbers = true)]
    trials: Option<i64>,
    /// Decay factor in (0, 1].
    #[arg(long, allow_negative_numbers = true)]
    decay: Option<f64>,
    /// Warm-up observations per epoch.
    #[arg(long, allow_negative_numbers = true)]
    warmup: Option<i64>,
    /// Master seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Run epochs in parallel.
    #[arg(long, overrides_with = "no_parallel")]
    parallel: bool,
    /// Run epochs serially, even if the config file enables parallelism.
    #[arg(long, overrides_with = "parallel")]
    no_parallel: bool,
    /// Print the full report, including plot series, as JSON.
    #[arg(long)]
    json: bool,
    /// Append JSON log lines to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Minimum log level: debug, info, warn or error.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl RunArgs {
    fn resolve_config(&self) -> Result<RawExperimentConfig> {
        let mut raw = match &self.config {
            Some(path) => RawExperimentConfig::load(path)?,
            None => RawExperimentConfig::default(),
        };
        if let Some(experiments) = self.experiments {
            raw.experiment_count = experiments;
        }
        if let Some(trials) = self.trials {
            raw.trial_count = trials;
        }
        if let Some(decay) = self.decay {
            raw.decay_factor = decay;
        }
        if let Some(warmup) = self.warmup {
            raw.warmup_count = warmup;
        }
        if self.seed.is_some() {
            raw.seed = self.seed;
        }
        if self.parallel {
            raw.parallel = true;
        } else if self.no_parallel {
            raw.parallel = false;
        }
        Ok(raw)
    }

    fn telemetry(&self) -> Result<SimulationTelemetry> {
        let level: LogLevel = self.log_level.parse()?;
        let logger = match &self.log_file {
            Some(path) => JsonLogger::new(path)
                .with_context(|| format!("opening log file {}", path.display()))?,
            None => JsonLogger::stderr(),
        };
        SimulationTelemetry::builder("diepred")
            .logger(logger)
            .min_level(level)
            .build()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Defaults => {
            print!("{}", RawExperimentConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn handle_run(args: &RunArgs) -> Result<()> {
    let telemetry = args.telemetry()?;
    let raw = args.resolve_config()?;
    let config = raw.validate().context("invalid experiment configuration")?;
    let _ = telemetry.log(
        LogLevel::Info,
        "cli.config.resolved",
        json!({ "config": config, "source": args.config }),
    );

    let engine = SimulationEngine::builder().telemetry(telemetry).build()?;
    let report = engine.run(&config)?;
    if args.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print!("{report}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["diepred", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Run(args) => args,
            Commands::Defaults => panic!("expected run"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let raw = run_args(&["--trials", "300", "--decay", "0.75", "--seed", "3", "--parallel"])
            .resolve_config()
            .unwrap();
        assert_eq!(raw.trial_count, 300);
        assert!((raw.decay_factor - 0.75).abs() < f64::EPSILON);
        assert_eq!(raw.seed, Some(3));
        assert!(raw.parallel);
        assert_eq!(raw.experiment_count, 250);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("experiment.toml");
        std::fs::write(&path, "experiment_count = 7\nwarmup_count = 5\n").unwrap();
        let raw = run_args(&["--config", path.to_str().unwrap(), "--warmup", "9"])
            .resolve_config()
            .unwrap();
        assert_eq!(raw.experiment_count, 7);
        assert_eq!(raw.warmup_count, 9);
    }

    #[test]
    fn parallel_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("experiment.toml");
        std::fs::write(&path, "parallel = true\n").unwrap();
        let config = path.to_str().unwrap();

        assert!(run_args(&["--config", config]).resolve_config().unwrap().parallel);
        let raw = run_args(&["--config", config, "--no-parallel"])
            .resolve_config()
            .unwrap();
        assert!(!raw.parallel);
        // the last of the pair wins
        let raw = run_args(&["--no-parallel", "--parallel"]).resolve_config().unwrap();
        assert!(raw.parallel);
    }

    #[test]
    fn negative_values_reach_validation() {
        let raw = run_args(&["--warmup", "-4"]).resolve_config().unwrap();
        assert_eq!(raw.warmup_count, -4);
        assert!(raw.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(run_args(&["--log-level", "loud"]).telemetry().is_err());
    }
}
