use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde_json::Value;
use shared_logging::{JsonLogger, LogLevel, LogRecord};

/// Telemetry builder for the simulation engine.
pub struct SimulationTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    logger: Option<JsonLogger>,
    min_level: LogLevel,
}

impl SimulationTelemetryBuilder {
    /// Creates a new builder scoped to a module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            logger: None,
            min_level: LogLevel::Info,
        }
    }

    /// Writes records to an append-only file.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Uses a prepared logger; takes precedence over `log_path`.
    #[must_use]
    pub fn logger(mut self, logger: JsonLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the minimum level written.
    #[must_use]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Builds telemetry.
    pub fn build(self) -> Result<SimulationTelemetry> {
        let logger = match (self.logger, self.log_path) {
            (Some(logger), _) => Some(logger),
            (None, Some(path)) => Some(JsonLogger::new(path)?),
            (None, None) => None,
        };
        Ok(SimulationTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger: logger.map(|l| l.with_min_level(self.min_level)),
            }),
        })
    }
}

/// Telemetry handle shared across simulation components.
#[derive(Clone)]
pub struct SimulationTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for SimulationTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationTelemetry")
            .field("module", &self.inner.module)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
}

impl SimulationTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> SimulationTelemetryBuilder {
        SimulationTelemetryBuilder::new(module)
    }

    /// Whether a record at `level` would be written.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.inner
            .logger
            .as_ref()
            .is_some_and(|logger| logger.enabled(level))
    }

    /// Logs an event with JSON object metadata.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let mut record = LogRecord::new(&self.inner.module, level, message);
            if let Value::Object(obj) = metadata {
                record.metadata = obj;
            }
            logger.log(&record)?;
        }
        Ok(())
    }
}

/// Generates a random master seed for a run.
#[must_use]
pub fn random_seed() -> u64 {
    rand::thread_rng().gen()
}

/// Returns a reproducible RNG.
#[must_use]
pub fn seeded_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// Seed for epoch `index` of a run; independent of execution order.
#[must_use]
pub const fn epoch_seed(master: u64, index: usize) -> u64 {
    master.wrapping_add(index as u64)
}
