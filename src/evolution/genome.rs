//! Genome abstraction shared by every evolvable encoding.
//!
//! The engine never looks inside a genome's genes. It only needs identity,
//! age, the evaluation record, a complexity measure and a position in
//! genotype space for clustering. Offspring are produced by a
//! [`GenomeFactory`], which owns id generation and the mutation operators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use rand::Rng;

use crate::schema::{ComplexityRegulationMode, RankingFitness};

use super::evaluator::FitnessInfo;

/// Mutable evaluation record attached to every genome.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationInfo {
    /// Primary fitness, always >= 0.
    pub fitness: f64,
    /// Auxiliary fitness values (e.g. objective fitness during a novelty search).
    pub auxiliary_fitness: Vec<f64>,
    /// Behavior characterization.
    pub behavior: Vec<f64>,
    /// False when the genome failed to decode or failed the minimal criterion.
    pub viable: bool,
    /// Number of times this genome has been evaluated.
    pub evaluation_count: u64,
}

impl Default for EvaluationInfo {
    fn default() -> Self {
        Self {
            fitness: 0.0,
            auxiliary_fitness: Vec::new(),
            behavior: Vec::new(),
            viable: true,
            evaluation_count: 0,
        }
    }
}

impl EvaluationInfo {
    /// Store the outcome of an evaluation.
    pub fn record(&mut self, info: FitnessInfo) {
        self.fitness = if info.fitness.is_finite() {
            info.fitness.max(0.0)
        } else {
            0.0
        };
        self.auxiliary_fitness = info.auxiliary_fitness;
        self.behavior = info.behavior;
        self.viable = info.viable;
        self.evaluation_count += 1;
    }

    /// Fitness used to rank genomes for removal.
    pub fn ranking_fitness(&self, source: RankingFitness) -> f64 {
        match source {
            RankingFitness::Primary => self.fitness,
            RankingFitness::Auxiliary { index } => self
                .auxiliary_fitness
                .get(index)
                .copied()
                .unwrap_or(self.fitness),
        }
    }
}

/// Sparse position in genotype space, keyed by innovation id.
///
/// Entries are kept sorted by id so distance metrics can merge two vectors
/// in a single pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinateVector {
    coords: Vec<(u64, f64)>,
}

impl CoordinateVector {
    /// Build from unsorted `(id, value)` pairs. Duplicate ids are summed.
    pub fn new(mut coords: Vec<(u64, f64)>) -> Self {
        coords.sort_by_key(|&(id, _)| id);
        coords.dedup_by(|next, prev| {
            if next.0 == prev.0 {
                prev.1 += next.1;
                true
            } else {
                false
            }
        });
        Self { coords }
    }

    /// Sorted coordinate entries.
    pub fn coords(&self) -> &[(u64, f64)] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Memoized genome position: unset until first access, cleared on mutation.
#[derive(Debug, Clone, Default)]
pub struct PositionCache(OnceLock<CoordinateVector>);

impl PositionCache {
    /// Return the cached position, computing it on first access.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> CoordinateVector) -> &CoordinateVector {
        self.0.get_or_init(compute)
    }

    /// Drop the cached value. Must be called whenever genes change.
    pub fn invalidate(&mut self) {
        self.0 = OnceLock::new();
    }

    pub fn is_computed(&self) -> bool {
        self.0.get().is_some()
    }
}

/// A member of the evolving population.
pub trait Genome: Clone + Send + Sync + 'static {
    /// Unique, monotonically assigned id.
    fn id(&self) -> u64;

    /// Generation in which the genome was created.
    fn birth_generation(&self) -> u64;

    fn evaluation_info(&self) -> &EvaluationInfo;

    fn evaluation_info_mut(&mut self) -> &mut EvaluationInfo;

    /// Structural size (e.g. gene count).
    fn complexity(&self) -> f64;

    /// Position in genotype space, used only for clustering.
    fn position(&self) -> &CoordinateVector;

    /// Species index assigned by the last speciation.
    fn specie_idx(&self) -> Option<usize>;

    fn set_specie_idx(&mut self, idx: Option<usize>);

    /// Primary fitness.
    fn fitness(&self) -> f64 {
        self.evaluation_info().fitness
    }
}

/// Creates genomes: the initial population and all offspring.
///
/// Offspring are mutated as part of creation, so a genome is never mutated
/// after it joins the population.
pub trait GenomeFactory<G: Genome>: Send {
    /// Create `count` random genomes.
    fn create_genome_list<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        birth_generation: u64,
        rng: &mut R,
    ) -> Vec<G>;

    /// Copy a parent and mutate the copy.
    fn create_offspring<R: Rng + ?Sized>(
        &mut self,
        parent: &G,
        birth_generation: u64,
        rng: &mut R,
    ) -> G;

    /// Merge two parents' genes and mutate the result.
    fn create_sexual_offspring<R: Rng + ?Sized>(
        &mut self,
        parent1: &G,
        parent2: &G,
        birth_generation: u64,
        rng: &mut R,
    ) -> G;

    /// Switch between structure-adding and structure-removing mutation regimes.
    fn set_complexity_mode(&mut self, _mode: ComplexityRegulationMode) {}
}

/// Thread-safe monotonically increasing id source.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: Arc<AtomicU64>,
}

impl IdGenerator {
    /// Create a generator whose first id is `start`.
    pub fn new(start: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Take the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
