use serde::{Deserialize, Serialize};

use crate::{
    die_source::{Face, OutcomeSource, FACE_COUNT},
    error::SimulationError,
};

/// Trials between two samples of the running success rate.
pub const SAMPLE_INTERVAL: usize = 10;

/// Decaying per-face observation counts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrequencyState {
    counts: [f64; FACE_COUNT],
}

impl FrequencyState {
    /// All-zero state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counts: [0.0; FACE_COUNT],
        }
    }

    /// Raw counts indexed by `Face::index`.
    #[must_use]
    pub const fn counts(&self) -> &[f64; FACE_COUNT] {
        &self.counts
    }

    /// Count for one face.
    #[must_use]
    pub const fn count(&self, face: Face) -> f64 {
        self.counts[face.index()]
    }

    /// Adds one observation of `face`.
    pub fn observe(&mut self, face: Face) {
        self.counts[face.index()] += 1.0;
    }

    /// Multiplies every count by `factor`.
    pub fn decay(&mut self, factor: f64) {
        for count in &mut self.counts {
            *count *= factor;
        }
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Normalized distribution, or `None` before any observation.
    #[must_use]
    pub fn distribution(&self) -> Option<Distribution> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        let mut probabilities = self.counts;
        for p in &mut probabilities {
            *p /= total;
        }
        Some(Distribution { probabilities })
    }
}

/// Probability per face derived from a `FrequencyState`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    probabilities: [f64; FACE_COUNT],
}

impl Distribution {
    /// Probabilities indexed by `Face::index`.
    #[must_use]
    pub const fn probabilities(&self) -> &[f64; FACE_COUNT] {
        &self.probabilities
    }

    /// Probability of one face.
    #[must_use]
    pub const fn probability(&self, face: Face) -> f64 {
        self.probabilities[face.index()]
    }

    /// Most probable face. Ties go to the lowest face.
    #[must_use]
    pub fn mode(&self) -> Face {
        let mut best = 0;
        for idx in 1..FACE_COUNT {
            if self.probabilities[idx] > self.probabilities[best] {
                best = idx;
            }
        }
        Face::ALL[best]
    }
}

/// Parameters of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochParams {
    /// Scored trials.
    pub trial_count: usize,
    /// Multiplier applied to every count before each observation, in `(0, 1]`.
    pub decay_factor: f64,
    /// Unscored observations used to seed the counts.
    pub warmup_count: usize,
}

impl EpochParams {
    /// Rejects a decay factor outside `(0, 1]`, NaN included.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.decay_factor > 0.0 && self.decay_factor <= 1.0 {
            Ok(())
        } else {
            Err(SimulationError::config(format!(
                "decay_factor must lie in (0, 1], got {}",
                self.decay_factor
            )))
        }
    }
}

/// What happened on a single scored trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialRecord {
    /// Zero-based trial index.
    pub index: usize,
    /// Observed outcome.
    pub outcome: Face,
    /// Predicted face after folding in the outcome.
    pub prediction: Face,
    /// Whether prediction matched the outcome.
    pub hit: bool,
    /// Correct predictions so far, this trial included.
    pub running_correct: usize,
}

/// Outcome of one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochResult {
    /// Scored trials in the epoch.
    pub trial_count: usize,
    /// Correct predictions.
    pub total_correct: usize,
    /// Running success rate sampled every `SAMPLE_INTERVAL` trials.
    pub success_series: Vec<f64>,
    /// Every observed face, warm-up first. Empty unless the loop records history.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<Face>,
}

impl EpochResult {
    /// Fraction of trials predicted correctly.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.trial_count == 0 {
            0.0
        } else {
            self.total_correct as f64 / self.trial_count as f64
        }
    }
}

/// Adaptive predictor: EWMA frequency tracking over an outcome source.
#[derive(Debug, Clone)]
pub struct EstimatorLoop<S> {
    source: S,
    state: FrequencyState,
    record_history: bool,
}

impl<S: OutcomeSource> EstimatorLoop<S> {
    /// Creates a loop drawing from `source`.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            source,
            state: FrequencyState::new(),
            record_history: false,
        }
    }

    /// Keeps every drawn face in `EpochResult::observations`.
    #[must_use]
    pub fn recording_history(mut self) -> Self {
        self.record_history = true;
        self
    }

    /// Counts left by the most recent epoch.
    #[must_use]
    pub const fn state(&self) -> &FrequencyState {
        &self.state
    }

    /// Gives the source back.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Runs warm-up plus `trial_count` scored trials on fresh counts.
    pub fn run_epoch(&mut self, params: &EpochParams) -> Result<EpochResult, SimulationError> {
        self.run_epoch_with(params, |_, _| {})
    }

    /// Like `run_epoch`, calling `observer` after every scored trial.
    pub fn run_epoch_with<F>(
        &mut self,
        params: &EpochParams,
        mut observer: F,
    ) -> Result<EpochResult, SimulationError>
    where
        F: FnMut(&TrialRecord, &FrequencyState),
    {
        params.validate()?;
        self.state = FrequencyState::new();
        let mut observations = if self.record_history {
            Vec::with_capacity(params.warmup_count + params.trial_count)
        } else {
            Vec::new()
        };

        // warm-up seeds counts without decay or scoring
        for _ in 0..params.warmup_count {
            let face = self.source.next_face();
            self.state.observe(face);
            if self.record_history {
                observations.push(face);
            }
        }

        let mut total_correct = 0;
        let mut running_correct = 0;
        let mut success_series = Vec::with_capacity(params.trial_count / SAMPLE_INTERVAL);
        for index in 0..params.trial_count {
            self.state.decay(params.decay_factor);
            let outcome = self.source.next_face();
            self.state.observe(outcome);
            if self.record_history {
                observations.push(outcome);
            }

            // total is at least 1 right after an observation
            let prediction = self
                .state
                .distribution()
                .map_or(outcome, |dist| dist.mode());
            let hit = prediction == outcome;
            if hit {
                total_correct += 1;
                running_correct += 1;
            }

            let elapsed = index + 1;
            if elapsed % SAMPLE_INTERVAL == 0 {
                success_series.push(running_correct as f64 / elapsed as f64);
            }

            observer(
                &TrialRecord {
                    index,
                    outcome,
                    prediction,
                    hit,
                    running_correct,
                },
                &self.state,
            );
        }

        Ok(EpochResult {
            trial_count: params.trial_count,
            total_correct,
            success_series,
            observations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::die_source::{BiasedDie, ScriptedSource};

    fn face(v: u8) -> Face {
        Face::new(v).unwrap()
    }

    fn params(trial_count: usize, decay_factor: f64, warmup_count: usize) -> EpochParams {
        EpochParams {
            trial_count,
            decay_factor,
            warmup_count,
        }
    }

    #[test]
    fn empty_state_has_no_distribution() {
        assert!(FrequencyState::new().distribution().is_none());
    }

    #[test]
    fn decay_then_observe() {
        let mut state = FrequencyState::new();
        state.observe(face(4));
        state.observe(face(4));
        state.decay(0.5);
        state.observe(face(1));
        assert!((state.count(face(4)) - 1.0).abs() < 1e-12);
        assert!((state.count(face(1)) - 1.0).abs() < 1e-12);
        assert!((state.total() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn mode_breaks_ties_toward_lowest_face() {
        let mut state = FrequencyState::new();
        state.observe(face(5));
        state.observe(face(2));
        state.observe(face(6));
        assert_eq!(state.distribution().unwrap().mode(), face(2));
        state.observe(face(6));
        assert_eq!(state.distribution().unwrap().mode(), face(6));
    }

    #[test]
    fn rejects_decay_outside_unit_interval() {
        let mut estimator = EstimatorLoop::new(ScriptedSource::from_values(&[1]).unwrap());
        for decay in [0.0, -0.2, 1.01, f64::NAN] {
            let err = estimator.run_epoch(&params(10, decay, 0)).unwrap_err();
            assert!(matches!(err, SimulationError::InvalidConfiguration(_)));
        }
        // nothing was drawn before rejection
        assert_eq!(estimator.into_source().drawn(), 0);
    }

    #[test]
    fn pure_frequency_counting_matches_hand_histogram() {
        let source = ScriptedSource::from_values(&[4, 4, 1, 4, 2]).unwrap();
        let mut estimator = EstimatorLoop::new(source);
        let mut seen = Vec::new();
        let result = estimator
            .run_epoch_with(&params(5, 1.0, 0), |trial, state| {
                seen.push((trial.outcome, trial.prediction, *state.counts()));
            })
            .unwrap();

        // after trial 3 (outcome 1): counts {4: 2, 1: 1}
        let (_, prediction, counts) = seen[2];
        assert_eq!(counts[face(4).index()], 2.0);
        assert_eq!(counts[face(1).index()], 1.0);
        assert_eq!(prediction, face(4));
        assert_eq!(seen[3].1, face(4));
        let predictions: Vec<u8> = seen.iter().map(|(_, p, _)| p.value()).collect();
        assert_eq!(predictions, vec![4, 4, 4, 4, 4]);
        assert_eq!(result.total_correct, 3);
    }

    #[test]
    fn first_trial_with_no_warmup_predicts_its_own_outcome() {
        let mut estimator = EstimatorLoop::new(ScriptedSource::from_values(&[3]).unwrap());
        let result = estimator.run_epoch(&params(10, 0.9, 0)).unwrap();
        assert_eq!(result.total_correct, 10);
        assert_eq!(result.success_series, vec![1.0]);
    }

    #[test]
    fn warmup_is_not_decayed() {
        let mut source = ScriptedSource::from_values(&[2]).unwrap();
        let mut estimator = EstimatorLoop::new(&mut source);
        estimator.run_epoch(&params(0, 0.5, 4)).unwrap();
        assert_eq!(estimator.state().count(face(2)), 4.0);
        assert_eq!(source.drawn(), 4);
    }

    #[test]
    fn series_drops_partial_window() {
        let mut estimator = EstimatorLoop::new(BiasedDie::seeded(3));
        let result = estimator.run_epoch(&params(25, 0.9, 5)).unwrap();
        assert_eq!(result.success_series.len(), 2);
    }

    #[test]
    fn history_is_kept_only_when_requested() {
        let plain = EstimatorLoop::new(BiasedDie::seeded(3))
            .run_epoch(&params(25, 0.9, 5))
            .unwrap();
        assert!(plain.observations.is_empty());

        let mut recording = EstimatorLoop::new(ScriptedSource::from_values(&[2, 5]).unwrap())
            .recording_history();
        let result = recording.run_epoch(&params(3, 0.9, 2)).unwrap();
        let drawn: Vec<u8> = result.observations.iter().map(|f| f.value()).collect();
        assert_eq!(drawn, vec![2, 5, 2, 5, 2]);
        assert_eq!(result.total_correct, 3);
    }

    #[test]
    fn each_epoch_starts_from_fresh_counts() {
        let mut estimator = EstimatorLoop::new(ScriptedSource::from_values(&[6]).unwrap());
        estimator.run_epoch(&params(0, 1.0, 3)).unwrap();
        estimator.run_epoch(&params(0, 1.0, 2)).unwrap();
        assert_eq!(estimator.state().count(face(6)), 2.0);
    }

    #[test]
    fn reference_epoch_lands_near_dominant_probability() {
        let mut estimator = EstimatorLoop::new(BiasedDie::seeded(2024));
        let result = estimator.run_epoch(&params(600, 0.9, 100)).unwrap();
        let rate = result.success_rate();
        assert!((0.3..=0.7).contains(&rate), "success rate {rate}");
        assert_eq!(result.success_series.len(), 60);
        assert!((result.success_series[59] - rate).abs() < 1e-12);
    }
}
