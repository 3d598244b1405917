use rayon::prelude::*;
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    config::ExperimentConfig,
    die_source::BiasedDie,
    error::SimulationError,
    helper::{epoch_seed, random_seed, SimulationTelemetry},
    predictor::{EpochParams, EpochResult, EstimatorLoop, SAMPLE_INTERVAL},
    statistics::{SeriesStats, SummaryStats},
};

/// Epoch results of a run together with their aggregate statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// Master seed the epochs were derived from.
    pub seed: u64,
    /// Scored trials per epoch.
    pub trial_count: usize,
    /// Per-epoch results in epoch order.
    pub epochs: Vec<EpochResult>,
    /// Statistics of per-epoch success rates (`total_correct / trial_count`).
    pub success: SummaryStats,
    /// Pointwise mean/std of the running success-rate series.
    pub curve: SeriesStats,
}

impl AggregateResult {
    /// Aggregates finished epochs.
    pub fn from_epochs(
        epochs: Vec<EpochResult>,
        trial_count: usize,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        if trial_count == 0 {
            return Err(SimulationError::config("trial_count must be positive"));
        }
        let totals: Vec<f64> = epochs.iter().map(|e| e.total_correct as f64).collect();
        let success = SummaryStats::from_samples(&totals)?.scaled(trial_count as f64);
        let curve = SeriesStats::pointwise(epochs.iter().map(|e| e.success_series.as_slice()))?;
        Ok(Self {
            seed,
            trial_count,
            epochs,
            success,
            curve,
        })
    }

    /// Correct-prediction count of each epoch.
    #[must_use]
    pub fn totals(&self) -> Vec<usize> {
        self.epochs.iter().map(|e| e.total_correct).collect()
    }

    /// Trial numbers at which the curve is sampled: 10, 20, ...
    #[must_use]
    pub fn sample_points(&self) -> Vec<usize> {
        (1..=self.curve.len()).map(|k| k * SAMPLE_INTERVAL).collect()
    }
}

/// Runs many independent epochs and aggregates them.
#[derive(Debug, Clone, Default)]
pub struct ExperimentRunner {
    telemetry: Option<SimulationTelemetry>,
}

impl ExperimentRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new(telemetry: Option<SimulationTelemetry>) -> Self {
        Self { telemetry }
    }

    /// Runs `config.experiment_count()` epochs and aggregates them.
    ///
    /// Epoch `i` draws from its own die seeded with `seed + i`, so serial and
    /// parallel runs with the same master seed agree exactly.
    pub fn run(&self, config: &ExperimentConfig) -> Result<AggregateResult, SimulationError> {
        let params = config.epoch_params();
        params.validate()?;
        let seed = config.seed().unwrap_or_else(random_seed);
        let count = config.experiment_count();

        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Info,
                "experiment.start",
                json!({
                    "seed": seed,
                    "experiments": count,
                    "trials": params.trial_count,
                    "decay_factor": params.decay_factor,
                    "warmup": params.warmup_count,
                    "parallel": config.parallel(),
                }),
            );
        }

        let epochs: Vec<EpochResult> = if config.parallel() {
            (0..count)
                .into_par_iter()
                .map(|i| run_single_epoch(&params, epoch_seed(seed, i)))
                .collect::<Result<Vec<_>, SimulationError>>()?
        } else {
            (0..count)
                .map(|i| run_single_epoch(&params, epoch_seed(seed, i)))
                .collect::<Result<Vec<_>, SimulationError>>()?
        };

        if let Some(tel) = self.telemetry.as_ref().filter(|t| t.enabled(LogLevel::Debug)) {
            for (index, epoch) in epochs.iter().enumerate() {
                let _ = tel.log(
                    LogLevel::Debug,
                    "experiment.epoch.completed",
                    json!({
                        "epoch": index,
                        "seed": epoch_seed(seed, index),
                        "total_correct": epoch.total_correct,
                    }),
                );
            }
        }

        let aggregate = AggregateResult::from_epochs(epochs, params.trial_count, seed)?;
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Info,
                "experiment.completed",
                json!({
                    "seed": seed,
                    "mean": aggregate.success.mean,
                    "max": aggregate.success.max,
                    "min": aggregate.success.min,
                    "std_dev": aggregate.success.std_dev,
                }),
            );
        }
        Ok(aggregate)
    }
}

fn run_single_epoch(params: &EpochParams, seed: u64) -> Result<EpochResult, SimulationError> {
    EstimatorLoop::new(BiasedDie::seeded(seed)).run_epoch(params)
}
