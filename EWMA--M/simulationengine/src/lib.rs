#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! EWMA simulation engine: predicts the next roll of a biased die from decaying
//! face frequencies and aggregates prediction accuracy over many epochs.

/// Error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// Telemetry and RNG helpers.
#[path = "../helper.rs"]
pub mod helper;

/// Faces, the biased population and outcome sources.
#[path = "../die_source.rs"]
pub mod die_source;

/// Decaying frequency state and the per-epoch prediction loop.
#[path = "../predictor.rs"]
pub mod predictor;

/// Summary and pointwise series statistics.
#[path = "../statistics.rs"]
pub mod statistics;

/// Experiment configuration and validation.
#[path = "../config.rs"]
pub mod config;

/// Multi-epoch experiment runner.
#[path = "../simulator.rs"]
pub mod simulator;

/// Console and plot-ready reporting.
#[path = "../report.rs"]
pub mod report;

/// Runtime entry & CLI hooks.
#[path = "../main.rs"]
pub mod runtime;

pub use config::{ExperimentConfig, RawExperimentConfig};
pub use die_source::{BiasedDie, Face, OutcomeSource, ScriptedSource, REFERENCE_POPULATION};
pub use error::SimulationError;
pub use helper::{SimulationTelemetry, SimulationTelemetryBuilder};
pub use predictor::{EpochParams, EpochResult, EstimatorLoop, FrequencyState};
pub use report::{ExperimentReport, ExperimentReportBuilder};
pub use runtime::{SimulationEngine, SimulationEngineBuilder};
pub use simulator::{AggregateResult, ExperimentRunner};
