//! Property-based tests for the EWMA estimator and aggregation.

use proptest::prelude::*;

use ewma_simulationengine::{
    die_source::{Face, ScriptedSource},
    predictor::{EpochParams, EstimatorLoop, FrequencyState},
    simulator::AggregateResult,
    BiasedDie, EpochResult,
};

/// Strategy: a non-empty outcome script of valid faces.
fn outcomes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1..=6u8, 1..40)
}

/// Strategy: decay factor in (0, 1].
fn decay_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(1.0), 0.001..1.0f64]
}

proptest! {
    // 1. Counts stay non-negative and the distribution sums to 1 on every trial
    #[test]
    fn counts_non_negative_and_distribution_normalized(
        script in outcomes_strategy(),
        decay in decay_strategy(),
        warmup in 0..20usize,
    ) {
        let source = ScriptedSource::from_values(&script).unwrap();
        let params = EpochParams { trial_count: script.len() * 3, decay_factor: decay, warmup_count: warmup };
        let mut failures = Vec::new();
        EstimatorLoop::new(source)
            .run_epoch_with(&params, |trial, state| {
                if state.counts().iter().any(|&c| c < 0.0) {
                    failures.push(format!("negative count at trial {}", trial.index));
                }
                let dist = state.distribution().expect("observed at least once");
                let sum: f64 = dist.probabilities().iter().sum();
                if (sum - 1.0).abs() > 1e-9 {
                    failures.push(format!("distribution sums to {sum} at trial {}", trial.index));
                }
            })
            .unwrap();
        prop_assert!(failures.is_empty(), "{failures:?}");
    }

    // 2. Equal maximal counts always resolve to the lowest face
    #[test]
    fn tie_break_picks_lowest_face(tied in prop::collection::btree_set(1..=6u8, 1..=3), reps in 1..5usize) {
        let mut state = FrequencyState::new();
        for &v in &tied {
            for _ in 0..reps {
                state.observe(Face::new(v).unwrap());
            }
        }
        let lowest = *tied.iter().next().unwrap();
        prop_assert_eq!(state.distribution().unwrap().mode().value(), lowest);
    }

    // 3. Running success rates stay in [0, 1] and correct counts never drop
    #[test]
    fn success_series_bounded(seed in any::<u64>(), windows in 1..30usize, decay in decay_strategy()) {
        let params = EpochParams { trial_count: windows * 10, decay_factor: decay, warmup_count: 10 };
        let mut last_correct = 0;
        let mut monotone = true;
        let result = EstimatorLoop::new(BiasedDie::seeded(seed))
            .run_epoch_with(&params, |trial, _| {
                monotone &= trial.running_correct >= last_correct;
                last_correct = trial.running_correct;
            })
            .unwrap();
        prop_assert!(monotone);
        prop_assert_eq!(result.success_series.len(), windows);
        for (k, rate) in result.success_series.iter().enumerate() {
            prop_assert!((0.0..=1.0).contains(rate));
            // numerator is an integer count over trials elapsed
            let numerator = rate * ((k + 1) * 10) as f64;
            prop_assert!((numerator - numerator.round()).abs() < 1e-9);
        }
    }

    // 4. Without decay or warm-up the prediction is the running histogram's mode
    #[test]
    fn no_decay_predicts_histogram_mode(script in outcomes_strategy()) {
        let source = ScriptedSource::from_values(&script).unwrap();
        let params = EpochParams { trial_count: script.len(), decay_factor: 1.0, warmup_count: 0 };
        let mut histogram = [0usize; 6];
        let mut mismatches = 0;
        EstimatorLoop::new(source)
            .run_epoch_with(&params, |trial, _| {
                histogram[trial.outcome.index()] += 1;
                let max = *histogram.iter().max().unwrap();
                let expected = histogram.iter().position(|&c| c == max).unwrap() + 1;
                if usize::from(trial.prediction.value()) != expected {
                    mismatches += 1;
                }
            })
            .unwrap();
        prop_assert_eq!(mismatches, 0);
    }

    // 5. Aggregate mean/max/min are the literal statistics of the totals
    #[test]
    fn aggregate_matches_totals(totals in prop::collection::vec(0..=60usize, 1..25)) {
        let epochs: Vec<EpochResult> = totals
            .iter()
            .map(|&t| EpochResult {
                trial_count: 60,
                total_correct: t,
                success_series: vec![t as f64 / 60.0],
                observations: Vec::new(),
            })
            .collect();
        let agg = AggregateResult::from_epochs(epochs, 60, 0).unwrap();
        let mean = totals.iter().sum::<usize>() as f64 / totals.len() as f64 / 60.0;
        prop_assert!((agg.success.mean - mean).abs() < 1e-12);
        prop_assert!((agg.success.max - *totals.iter().max().unwrap() as f64 / 60.0).abs() < 1e-12);
        prop_assert!((agg.success.min - *totals.iter().min().unwrap() as f64 / 60.0).abs() < 1e-12);
        prop_assert!(agg.success.std_dev >= 0.0);
    }
}
