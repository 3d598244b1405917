use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::ExperimentConfig,
    die_source::{population_probabilities, Face, REFERENCE_POPULATION},
    simulator::AggregateResult,
    statistics::SummaryStats,
};

/// Success rate drawn as the horizontal reference line.
pub const REFERENCE_SUCCESS_RATE: f64 = 0.5;

/// Plot-ready series: x axis, mean curve and the ±1 std envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    /// Trial numbers 10, 20, ..., trial_count.
    pub trials: Vec<usize>,
    /// Mean running success rate.
    pub mean: Vec<f64>,
    /// Mean minus one standard deviation.
    pub lower: Vec<f64>,
    /// Mean plus one standard deviation.
    pub upper: Vec<f64>,
    /// Constant reference line.
    pub reference: f64,
}

/// Structured report summarizing one experiment.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Report id, also usable to correlate log lines.
    pub run_id: Uuid,
    /// Resolved configuration.
    pub config: ExperimentConfig,
    /// Master seed actually used.
    pub seed: u64,
    /// Success-rate statistics across epochs.
    pub summary: SummaryStats,
    /// Most likely face of the die.
    pub dominant_face: Face,
    /// Its probability, the long-run ceiling for always guessing it.
    pub dominant_probability: f64,
    /// Series for an external plotter.
    pub plot: PlotSeries,
    /// Timestamp.
    pub generated_at: DateTime<Utc>,
}

impl ExperimentReport {
    /// The four console summary lines, rates as percentages.
    #[must_use]
    pub fn summary_lines(&self) -> [String; 4] {
        [
            format!("Average success rate: {}", percent(self.summary.mean)),
            format!("Best run success rate: {}", percent(self.summary.max)),
            format!("Worst run success rate: {}", percent(self.summary.min)),
            format!("Standard deviation: {}", percent(self.summary.std_dev)),
        ]
    }

    /// Pretty JSON rendering.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ExperimentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.summary_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Builder for `ExperimentReport` over a finished aggregate.
pub struct ExperimentReportBuilder<'a> {
    config: ExperimentConfig,
    aggregate: &'a AggregateResult,
}

impl<'a> ExperimentReportBuilder<'a> {
    /// Creates builder.
    #[must_use]
    pub const fn new(config: ExperimentConfig, aggregate: &'a AggregateResult) -> Self {
        Self { config, aggregate }
    }

    /// Builds the report.
    #[must_use]
    pub fn build(self) -> ExperimentReport {
        let probabilities = population_probabilities(&REFERENCE_POPULATION);
        let mut dominant = Face::ALL[0];
        for face in Face::ALL {
            if probabilities[face.index()] > probabilities[dominant.index()] {
                dominant = face;
            }
        }

        let agg = self.aggregate;
        ExperimentReport {
            run_id: Uuid::new_v4(),
            config: self.config,
            seed: agg.seed,
            summary: agg.success,
            dominant_face: dominant,
            dominant_probability: probabilities[dominant.index()],
            plot: PlotSeries {
                trials: agg.sample_points(),
                mean: agg.curve.mean.clone(),
                lower: agg.curve.lower(),
                upper: agg.curve.upper(),
                reference: REFERENCE_SUCCESS_RATE,
            },
            generated_at: Utc::now(),
        }
    }
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}
