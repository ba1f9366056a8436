//! Running statistics helpers.

use std::collections::VecDeque;

use super::genome::Genome;
use super::speciation::Specie;

/// Fixed-window moving average.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.window
            && let Some(old) = self.values.pop_front()
        {
            self.sum -= old;
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Fitness and complexity summary of a population.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PopulationSummary {
    pub max_fitness: f64,
    pub mean_fitness: f64,
    pub min_complexity: f64,
    pub max_complexity: f64,
    pub mean_complexity: f64,
}

pub(crate) fn summarize<G: Genome>(population: &[G]) -> PopulationSummary {
    if population.is_empty() {
        return PopulationSummary::default();
    }
    let n = population.len() as f64;
    let mut summary = PopulationSummary {
        max_fitness: f64::NEG_INFINITY,
        min_complexity: f64::INFINITY,
        max_complexity: f64::NEG_INFINITY,
        ..Default::default()
    };
    for genome in population {
        let complexity = genome.complexity();
        summary.max_fitness = summary.max_fitness.max(genome.fitness());
        summary.mean_fitness += genome.fitness();
        summary.min_complexity = summary.min_complexity.min(complexity);
        summary.max_complexity = summary.max_complexity.max(complexity);
        summary.mean_complexity += complexity;
    }
    summary.mean_fitness /= n;
    summary.mean_complexity /= n;
    summary
}

/// Mean of the species champions' fitness.
pub(crate) fn mean_champion_fitness(species: &[Specie]) -> f64 {
    let populated: Vec<f64> = species
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.champion_fitness)
        .collect();
    if populated.is_empty() {
        0.0
    } else {
        populated.iter().sum::<f64>() / populated.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::test_support::TestGenome;

    #[test]
    fn test_moving_average_window() {
        let mut ma = MovingAverage::new(3);
        assert_eq!(ma.mean(), 0.0);
        ma.push(3.0);
        ma.push(6.0);
        assert_eq!(ma.mean(), 4.5);
        ma.push(9.0);
        ma.push(12.0);
        // 3.0 fell out of the window
        assert_eq!(ma.mean(), 9.0);
        ma.clear();
        assert_eq!(ma.mean(), 0.0);
    }

    #[test]
    fn test_summarize() {
        let population = vec![
            TestGenome::with_fitness(0, 0, 1.0).complexity_of(2.0),
            TestGenome::with_fitness(1, 0, 3.0).complexity_of(6.0),
        ];
        let summary = summarize(&population);
        assert_eq!(summary.max_fitness, 3.0);
        assert_eq!(summary.mean_fitness, 2.0);
        assert_eq!(summary.min_complexity, 2.0);
        assert_eq!(summary.max_complexity, 6.0);
        assert_eq!(summary.mean_complexity, 4.0);
        assert_eq!(summarize::<TestGenome>(&[]), PopulationSummary::default());
    }
}
