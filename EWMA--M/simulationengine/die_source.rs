use std::fmt;

use rand::{rngs::SmallRng, seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{error::SimulationError, helper::seeded_rng};

/// Number of faces on the die.
pub const FACE_COUNT: usize = 6;

/// One face of the die, always in `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Face(u8);

impl Face {
    /// All faces in ascending order; this is also the tie-break order.
    pub const ALL: [Self; FACE_COUNT] = [Self(1), Self(2), Self(3), Self(4), Self(5), Self(6)];

    /// Checked constructor.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= 1 && value <= 6 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Pip count.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Zero-based slot in per-face arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<i64> for Face {
    type Error = SimulationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(SimulationError::InvalidFace(value))
    }
}

impl From<Face> for u8 {
    fn from(face: Face) -> Self {
        face.0
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference population; face 4 is five times as likely as any other face.
pub const REFERENCE_POPULATION: [Face; 10] = [
    Face(1),
    Face(2),
    Face(3),
    Face(4),
    Face(4),
    Face(4),
    Face(4),
    Face(4),
    Face(5),
    Face(6),
];

/// Per-face probability implied by sampling `population` uniformly with replacement.
#[must_use]
pub fn population_probabilities(population: &[Face]) -> [f64; FACE_COUNT] {
    let mut probabilities = [0.0; FACE_COUNT];
    if population.is_empty() {
        return probabilities;
    }
    for face in population {
        probabilities[face.index()] += 1.0;
    }
    let size = population.len() as f64;
    for p in &mut probabilities {
        *p /= size;
    }
    probabilities
}

/// Anything that yields one die outcome per call.
pub trait OutcomeSource {
    /// Draws the next outcome.
    fn next_face(&mut self) -> Face;
}

impl<T: OutcomeSource + ?Sized> OutcomeSource for &mut T {
    fn next_face(&mut self) -> Face {
        (**self).next_face()
    }
}

/// Biased die drawing i.i.d. from the reference population.
#[derive(Debug, Clone)]
pub struct BiasedDie<R = SmallRng> {
    population: &'static [Face],
    rng: R,
}

impl BiasedDie<SmallRng> {
    /// Die backed by a `SmallRng` seeded with `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(seeded_rng(seed))
    }
}

impl<R: Rng> BiasedDie<R> {
    /// Die over the reference population using the injected generator.
    #[must_use]
    pub const fn new(rng: R) -> Self {
        Self {
            population: &REFERENCE_POPULATION,
            rng,
        }
    }

    /// Population the die samples from.
    #[must_use]
    pub const fn population(&self) -> &'static [Face] {
        self.population
    }

    /// Theoretical probability of each face.
    #[must_use]
    pub fn face_probabilities(&self) -> [f64; FACE_COUNT] {
        population_probabilities(self.population)
    }
}

impl<R: Rng> OutcomeSource for BiasedDie<R> {
    fn next_face(&mut self) -> Face {
        // population is never empty
        self.population
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(REFERENCE_POPULATION[0])
    }
}

/// Replays a fixed outcome sequence, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    outcomes: Vec<Face>,
    cursor: usize,
}

impl ScriptedSource {
    /// Creates a source from a non-empty outcome list.
    pub fn new(outcomes: Vec<Face>) -> Result<Self, SimulationError> {
        if outcomes.is_empty() {
            return Err(SimulationError::config(
                "scripted source needs at least one outcome",
            ));
        }
        Ok(Self {
            outcomes,
            cursor: 0,
        })
    }

    /// Creates a source from raw pip values.
    pub fn from_values(values: &[u8]) -> Result<Self, SimulationError> {
        let outcomes = values
            .iter()
            .map(|&v| Face::try_from(i64::from(v)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(outcomes)
    }

    /// Number of outcomes drawn so far.
    #[must_use]
    pub const fn drawn(&self) -> usize {
        self.cursor
    }
}

impl OutcomeSource for ScriptedSource {
    fn next_face(&mut self) -> Face {
        let face = self.outcomes[self.cursor % self.outcomes.len()];
        self.cursor += 1;
        face
    }
}
