use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::SimulationError,
    predictor::{EpochParams, SAMPLE_INTERVAL},
};

/// Default number of independent epochs.
pub const DEFAULT_EXPERIMENT_COUNT: i64 = 250;
/// Default scored trials per epoch.
pub const DEFAULT_TRIAL_COUNT: i64 = 600;
/// Default EWMA decay factor.
pub const DEFAULT_DECAY_FACTOR: f64 = 0.9;
/// Default warm-up observations per epoch.
pub const DEFAULT_WARMUP_COUNT: i64 = 100;

/// Unvalidated configuration as read from TOML or assembled from CLI flags.
///
/// Counts are signed so that negative input reaches validation instead of
/// failing inside the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawExperimentConfig {
    /// Independent epochs to run.
    pub experiment_count: i64,
    /// Scored trials per epoch.
    pub trial_count: i64,
    /// EWMA decay factor.
    pub decay_factor: f64,
    /// Warm-up observations per epoch.
    pub warmup_count: i64,
    /// Master seed; random when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Run epochs on the rayon pool.
    pub parallel: bool,
}

impl Default for RawExperimentConfig {
    fn default() -> Self {
        Self {
            experiment_count: DEFAULT_EXPERIMENT_COUNT,
            trial_count: DEFAULT_TRIAL_COUNT,
            decay_factor: DEFAULT_DECAY_FACTOR,
            warmup_count: DEFAULT_WARMUP_COUNT,
            seed: None,
            parallel: false,
        }
    }
}

impl RawExperimentConfig {
    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading experiment config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Validates into an `ExperimentConfig`.
    pub fn validate(self) -> Result<ExperimentConfig, SimulationError> {
        ExperimentConfig::try_from(self)
    }
}

/// Validated experiment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExperimentConfig {
    experiment_count: usize,
    trial_count: usize,
    decay_factor: f64,
    warmup_count: usize,
    seed: Option<u64>,
    parallel: bool,
}

impl ExperimentConfig {
    /// Independent epochs to run.
    #[must_use]
    pub const fn experiment_count(&self) -> usize {
        self.experiment_count
    }

    /// Scored trials per epoch.
    #[must_use]
    pub const fn trial_count(&self) -> usize {
        self.trial_count
    }

    /// EWMA decay factor.
    #[must_use]
    pub const fn decay_factor(&self) -> f64 {
        self.decay_factor
    }

    /// Warm-up observations per epoch.
    #[must_use]
    pub const fn warmup_count(&self) -> usize {
        self.warmup_count
    }

    /// Master seed, if fixed.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Whether epochs run in parallel.
    #[must_use]
    pub const fn parallel(&self) -> bool {
        self.parallel
    }

    /// Pins the master seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Toggles parallel epoch execution.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Per-epoch parameters.
    #[must_use]
    pub const fn epoch_params(&self) -> EpochParams {
        EpochParams {
            trial_count: self.trial_count,
            decay_factor: self.decay_factor,
            warmup_count: self.warmup_count,
        }
    }
}

impl TryFrom<RawExperimentConfig> for ExperimentConfig {
    type Error = SimulationError;

    fn try_from(raw: RawExperimentConfig) -> Result<Self, Self::Error> {
        let experiment_count = positive("experiment_count", raw.experiment_count)?;
        let trial_count = positive("trial_count", raw.trial_count)?;
        if trial_count % SAMPLE_INTERVAL != 0 {
            return Err(SimulationError::config(format!(
                "trial_count must be a multiple of {SAMPLE_INTERVAL}, got {trial_count}"
            )));
        }
        let warmup_count = usize::try_from(raw.warmup_count).map_err(|_| {
            SimulationError::config(format!(
                "warmup_count must be non-negative, got {}",
                raw.warmup_count
            ))
        })?;
        let config = Self {
            experiment_count,
            trial_count,
            decay_factor: raw.decay_factor,
            warmup_count,
            seed: raw.seed,
            parallel: raw.parallel,
        };
        config.epoch_params().validate()?;
        Ok(config)
    }
}

fn positive(name: &str, value: i64) -> Result<usize, SimulationError> {
    usize::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| SimulationError::config(format!("{name} must be positive, got {value}")))
}
