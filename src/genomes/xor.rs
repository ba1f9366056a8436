//! Two-input XOR task for recurrent networks.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::evolution::{FitnessInfo, PhenomeEvaluator};

use super::network::Network;

const CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Scores a network as `4 - sum of squared errors` over the truth table.
///
/// The behavior vector is the four outputs in table order. The stop
/// condition is met once any network rounds every case correctly.
#[derive(Debug, Default)]
pub struct XorEvaluator {
    solved: AtomicBool,
}

impl XorEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_solved(&self) -> bool {
        self.solved.load(Ordering::Relaxed)
    }
}

impl PhenomeEvaluator<Network> for XorEvaluator {
    fn evaluate(&self, network: &mut Network, _generation: u64) -> FitnessInfo {
        let mut outputs = Vec::with_capacity(CASES.len());
        let mut squared_error = 0.0;
        let mut all_correct = true;

        for (inputs, expected) in CASES {
            network.reset();
            let output = network.activate(&inputs).first().copied().unwrap_or(0.0);
            squared_error += (output - expected).powi(2);
            all_correct &= (output >= 0.5) == (expected >= 0.5);
            outputs.push(output);
        }

        if all_correct {
            self.solved.store(true, Ordering::Relaxed);
        }

        FitnessInfo::new((4.0 - squared_error).max(0.0)).with_behavior(outputs)
    }

    fn stop_condition_satisfied(&self) -> bool {
        self.is_solved()
    }

    fn reset(&mut self) {
        self.solved.store(false, Ordering::Relaxed);
    }
}
