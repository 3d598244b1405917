use thiserror::Error;

/// Errors raised by the simulation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Parameters rejected before any simulation runs.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Value outside the die's face range 1..=6.
    #[error("invalid face value {0}, expected 1..=6")]
    InvalidFace(i64),
    /// Per-epoch success series disagree in length during aggregation.
    #[error("series shape mismatch at epoch {epoch}: expected {expected} samples, found {found}")]
    ShapeMismatch {
        /// Epoch index whose series differs.
        epoch: usize,
        /// Length of the first epoch's series.
        expected: usize,
        /// Offending length.
        found: usize,
    },
    /// Aggregation was asked to summarize zero epochs.
    #[error("cannot aggregate an empty set of epochs")]
    EmptyAggregate,
}

impl SimulationError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
