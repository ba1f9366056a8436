//! Novelty archive with an adaptive admission threshold.

use std::collections::HashSet;

use log::debug;

use crate::schema::NoveltyArchiveConfig;

use super::genome::Genome;

/// Distance between two behavior characterizations.
pub trait BehaviorDistance: Send + Sync {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;
}

/// Euclidean distance over the shared prefix of two behaviors.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanBehaviorDistance;

impl BehaviorDistance for EuclideanBehaviorDistance {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

impl<F> BehaviorDistance for F
where
    F: Fn(&[f64], &[f64]) -> f64 + Send + Sync,
{
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self(a, b)
    }
}

/// A behavior exemplar admitted to the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub genome_id: u64,
    pub birth_generation: u64,
    pub fitness: f64,
    pub behavior: Vec<f64>,
}

/// Append-only store of behaviorally novel genomes.
pub struct NoveltyArchive {
    config: NoveltyArchiveConfig,
    distance: Box<dyn BehaviorDistance>,
    entries: Vec<ArchiveEntry>,
    threshold: f64,
    additions_in_window: u32,
    windows_without_addition: u32,
}

impl NoveltyArchive {
    pub fn new(config: NoveltyArchiveConfig) -> Self {
        Self {
            threshold: config.initial_threshold,
            config,
            distance: Box::new(EuclideanBehaviorDistance),
            entries: Vec::new(),
            additions_in_window: 0,
            windows_without_addition: 0,
        }
    }

    /// Replace the behavior distance.
    pub fn with_distance(mut self, distance: impl BehaviorDistance + 'static) -> Self {
        self.distance = Box::new(distance);
        self
    }

    /// Mean distance from `candidate` to its k nearest neighbours among the
    /// union of the population and the archive. The candidate itself and
    /// genomes with no behavior are skipped. Infinite when there are no neighbours.
    pub fn novelty_score<G: Genome>(&self, candidate: &G, population: &[G]) -> f64 {
        let behavior = &candidate.evaluation_info().behavior;
        let id = candidate.id();

        let population_behaviors = population
            .iter()
            .filter(|g| g.id() != id)
            .map(|g| g.evaluation_info().behavior.as_slice());
        // Archived genomes still alive are already counted via the population
        let alive: HashSet<u64> = population.iter().map(Genome::id).collect();
        let archive_behaviors = self
            .entries
            .iter()
            .filter(|e| e.genome_id != id && !alive.contains(&e.genome_id))
            .map(|e| e.behavior.as_slice());

        let mut distances: Vec<f64> = population_behaviors
            .chain(archive_behaviors)
            .filter(|b| !b.is_empty())
            .map(|b| self.distance.distance(behavior, b))
            .collect();

        if distances.is_empty() {
            return f64::INFINITY;
        }
        let k = self.config.k_nearest.min(distances.len());
        distances.select_nth_unstable_by(k - 1, f64::total_cmp);
        distances[..k].iter().sum::<f64>() / k as f64
    }

    /// Admit `candidate` if its novelty exceeds the current threshold.
    /// Non-viable candidates and candidates without a behavior are never
    /// admitted.
    pub fn test_and_add<G: Genome>(&mut self, candidate: &G, population: &[G]) -> bool {
        let info = candidate.evaluation_info();
        if !info.viable || info.behavior.is_empty() {
            return false;
        }
        let score = self.novelty_score(candidate, population);
        if score <= self.threshold {
            return false;
        }

        self.entries.push(ArchiveEntry {
            genome_id: candidate.id(),
            birth_generation: candidate.birth_generation(),
            fitness: info.fitness,
            behavior: info.behavior.clone(),
        });
        self.additions_in_window += 1;
        true
    }

    /// Close the current window and adapt the threshold.
    pub fn update_threshold_parameters(&mut self) {
        if self.additions_in_window == 0 {
            self.windows_without_addition += 1;
        } else {
            self.windows_without_addition = 0;
        }

        if self.windows_without_addition > self.config.max_generations_without_addition {
            self.threshold *= self.config.threshold_decrease_multiplier;
            self.windows_without_addition = 0;
            debug!("Novelty threshold lowered to {:.4}", self.threshold);
        } else if self.additions_in_window > self.config.max_generational_additions {
            self.threshold *= self.config.threshold_increase_multiplier;
            debug!(
                "{} archive additions in window; novelty threshold raised to {:.4}",
                self.additions_in_window, self.threshold
            );
        }
        self.additions_in_window = 0;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Clear all entries and restore the initial threshold.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.threshold = self.config.initial_threshold;
        self.additions_in_window = 0;
        self.windows_without_addition = 0;
    }
}
