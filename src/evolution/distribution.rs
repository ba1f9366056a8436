//! Fitness-proportionate discrete distributions used for parent selection.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Discrete distribution over a set of outcomes.
///
/// Weights that are negative or not finite count as zero. When every weight
/// is zero the distribution falls back to uniform, so sampling always
/// terminates.
#[derive(Debug, Clone)]
pub struct DiscreteDistribution {
    /// Outcome labels, in weight order.
    outcomes: Vec<usize>,
    weights: Vec<f64>,
    /// `None` when all weights are zero.
    sampler: Option<WeightedIndex<f64>>,
}

impl DiscreteDistribution {
    /// Distribution over outcomes `0..weights.len()`.
    pub fn new(weights: &[f64]) -> Self {
        Self::with_outcomes((0..weights.len()).collect(), weights)
    }

    fn with_outcomes(outcomes: Vec<usize>, weights: &[f64]) -> Self {
        let weights: Vec<f64> = weights
            .iter()
            .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
            .collect();
        let sampler = WeightedIndex::new(&weights).ok();
        Self {
            outcomes,
            weights,
            sampler,
        }
    }

    /// Number of outcomes that can still be drawn.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True when every weight is zero (uniform fallback).
    pub fn is_uniform_fallback(&self) -> bool {
        self.sampler.is_none()
    }

    /// Probability of drawing `outcome`.
    pub fn probability(&self, outcome: usize) -> f64 {
        let Some(pos) = self.outcomes.iter().position(|&o| o == outcome) else {
            return 0.0;
        };
        if self.sampler.is_none() {
            return 1.0 / self.outcomes.len() as f64;
        }
        let total: f64 = self.weights.iter().sum();
        self.weights[pos] / total
    }

    /// Draw an outcome. The distribution must not be empty.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        debug_assert!(!self.is_empty(), "sampling an empty distribution");
        let idx = match &self.sampler {
            Some(sampler) => sampler.sample(rng),
            None => rng.gen_range(0..self.outcomes.len()),
        };
        self.outcomes[idx]
    }

    /// Copy of this distribution with `outcome` excluded.
    pub fn remove_outcome(&self, outcome: usize) -> Self {
        let (outcomes, weights): (Vec<usize>, Vec<f64>) = self
            .outcomes
            .iter()
            .zip(&self.weights)
            .filter(|&(&o, _)| o != outcome)
            .map(|(&o, &w)| (o, w))
            .unzip();
        Self::with_outcomes(outcomes, &weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_sampling_frequencies() {
        let dist = DiscreteDistribution::new(&[2.0, 2.0, 4.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 4];
        for _ in 0..100_000 {
            counts[dist.sample(&mut rng)] += 1;
        }

        assert_eq!(counts[3], 0);
        // Expected 25k / 25k / 50k
        let ratio01 = counts[0] as f64 / counts[1] as f64;
        assert!((ratio01 - 1.0).abs() < 0.05, "ratio {ratio01}");
        let ratio02 = counts[0] as f64 / counts[2] as f64;
        assert!((ratio02 - 0.5).abs() < 0.03, "ratio {ratio02}");
    }

    #[test]
    fn test_all_zero_falls_back_to_uniform() {
        let dist = DiscreteDistribution::new(&[0.0, 0.0, 0.0]);
        assert!(dist.is_uniform_fallback());
        assert!((dist.probability(1) - 1.0 / 3.0).abs() < 1e-12);

        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[dist.sample(&mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_remove_outcome() {
        let dist = DiscreteDistribution::new(&[1.0, 3.0, 0.0]);
        let removed = dist.remove_outcome(1);
        assert_eq!(removed.len(), 2);
        // Only outcome 0 carries weight now
        assert_eq!(removed.probability(0), 1.0);
        assert_eq!(removed.probability(1), 0.0);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert_eq!(removed.sample(&mut rng), 0);
        }
    }

    #[test]
    fn test_remove_outcome_to_all_zero_never_returns_removed() {
        let dist = DiscreteDistribution::new(&[5.0, 0.0, 0.0]);
        let removed = dist.remove_outcome(0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            assert_ne!(removed.sample(&mut rng), 0);
        }
    }

    #[test]
    fn test_negative_and_nan_weights_ignored() {
        let dist = DiscreteDistribution::new(&[-1.0, f64::NAN, 2.0]);
        assert_eq!(dist.probability(2), 1.0);
    }

    proptest! {
        #[test]
        fn prop_zero_weight_never_sampled(
            weights in prop::collection::vec(0.0f64..10.0, 2..12),
            zero_at in 0usize..12,
            seed in any::<u64>(),
        ) {
            let mut weights = weights;
            let zero_at = zero_at % weights.len();
            weights[zero_at] = 0.0;
            prop_assume!(weights.iter().any(|&w| w > 0.0));

            let dist = DiscreteDistribution::new(&weights);
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..200 {
                let outcome = dist.sample(&mut rng);
                prop_assert!(outcome < weights.len());
                prop_assert_ne!(outcome, zero_at);
            }
        }
    }
}
