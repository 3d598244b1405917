use anyhow::{Context, Result};

use crate::{
    config::{ExperimentConfig, RawExperimentConfig},
    helper::SimulationTelemetry,
    report::{ExperimentReport, ExperimentReportBuilder},
    simulator::{AggregateResult, ExperimentRunner},
};

/// High-level engine: validates configuration, runs the experiment and builds the report.
pub struct SimulationEngine {
    telemetry: Option<SimulationTelemetry>,
    runner: ExperimentRunner,
}

impl SimulationEngine {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> SimulationEngineBuilder {
        SimulationEngineBuilder::default()
    }

    /// Runs the experiment and returns the raw aggregate.
    pub fn run_aggregate(&self, config: &ExperimentConfig) -> Result<AggregateResult> {
        self.runner
            .run(config)
            .context("running EWMA prediction experiment")
    }

    /// Runs the experiment and returns the report.
    pub fn run(&self, config: &ExperimentConfig) -> Result<ExperimentReport> {
        let aggregate = self.run_aggregate(config)?;
        Ok(ExperimentReportBuilder::new(*config, &aggregate).build())
    }

    /// Validates a raw configuration, then runs it.
    pub fn run_raw(&self, raw: RawExperimentConfig) -> Result<ExperimentReport> {
        let config = raw.validate().context("validating experiment config")?;
        self.run(&config)
    }

    /// Returns telemetry handle.
    #[must_use]
    pub const fn telemetry(&self) -> Option<&SimulationTelemetry> {
        self.telemetry.as_ref()
    }
}

/// Builder for `SimulationEngine`.
#[derive(Default)]
pub struct SimulationEngineBuilder {
    telemetry: Option<SimulationTelemetry>,
}

impl SimulationEngineBuilder {
    /// Sets telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: SimulationTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the engine.
    pub fn build(self) -> Result<SimulationEngine> {
        let runner = ExperimentRunner::new(self.telemetry.clone());
        Ok(SimulationEngine {
            telemetry: self.telemetry,
            runner,
        })
    }
}
