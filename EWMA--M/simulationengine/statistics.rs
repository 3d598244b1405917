use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Mean, extremes and population standard deviation of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Largest sample.
    pub max: f64,
    /// Smallest sample.
    pub min: f64,
    /// Population (ddof = 0) standard deviation.
    pub std_dev: f64,
}

impl SummaryStats {
    /// Summarizes a non-empty sample.
    pub fn from_samples(samples: &[f64]) -> Result<Self, SimulationError> {
        if samples.is_empty() {
            return Err(SimulationError::EmptyAggregate);
        }
        let (mean, std_dev) = mean_and_std(samples.iter().copied(), samples.len());
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        Ok(Self {
            mean,
            max,
            min,
            std_dev,
        })
    }

    /// Divides every statistic by `scale`.
    #[must_use]
    pub fn scaled(self, scale: f64) -> Self {
        Self {
            mean: self.mean / scale,
            max: self.max / scale,
            min: self.min / scale,
            std_dev: self.std_dev / scale,
        }
    }
}

/// Pointwise mean and standard deviation across equally long series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Mean at each sample point.
    pub mean: Vec<f64>,
    /// Population standard deviation at each sample point.
    pub std_dev: Vec<f64>,
}

impl SeriesStats {
    /// Aggregates `series` column by column.
    ///
    /// Every series must match the first one's length.
    pub fn pointwise<'a, I>(series: I) -> Result<Self, SimulationError>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let rows: Vec<&[f64]> = series.into_iter().collect();
        let Some(first) = rows.first() else {
            return Err(SimulationError::EmptyAggregate);
        };
        let width = first.len();
        if let Some((epoch, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(SimulationError::ShapeMismatch {
                epoch,
                expected: width,
                found: row.len(),
            });
        }

        let (mean, std_dev) = (0..width)
            .map(|col| mean_and_std(rows.iter().map(|row| row[col]), rows.len()))
            .unzip();
        Ok(Self { mean, std_dev })
    }

    /// Number of sample points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// True when there are no sample points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Mean minus one standard deviation.
    #[must_use]
    pub fn lower(&self) -> Vec<f64> {
        self.mean
            .iter()
            .zip(&self.std_dev)
            .map(|(m, s)| m - s)
            .collect()
    }

    /// Mean plus one standard deviation.
    #[must_use]
    pub fn upper(&self) -> Vec<f64> {
        self.mean
            .iter()
            .zip(&self.std_dev)
            .map(|(m, s)| m + s)
            .collect()
    }
}

fn mean_and_std(values: impl Iterator<Item = f64> + Clone, n: usize) -> (f64, f64) {
    let n = n as f64;
    let mean = values.clone().sum::<f64>() / n;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
