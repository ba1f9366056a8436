//! Run state, statistics and progress types reported by the evolution algorithm.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an evolution algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RunState {
    /// No population yet.
    #[default]
    Uninitialized,
    /// Seed population evaluated and speciated; not yet running.
    Ready,
    /// The generation loop is executing.
    Running,
    /// Paused at a generation boundary.
    Paused,
    /// A stop condition was reached. Terminal until reset.
    Stopped,
}

/// Reason the algorithm stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached maximum evaluations.
    MaxEvaluations,
    /// The evaluator reported its stop condition.
    StopConditionSatisfied,
}

/// Current genetic complexity regime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ComplexityRegulationMode {
    /// Structure-adding mutations enabled.
    #[default]
    Complexifying,
    /// Structure-removing mutations favoured.
    Simplifying,
}

/// Running statistics, recomputed at the end of every generation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionStats {
    /// Current generation.
    pub generation: u64,
    /// Total counted evaluations.
    pub total_evaluation_count: u64,
    /// Evaluations per second over the last generation.
    pub evaluations_per_sec: f64,
    /// Best fitness in the current population.
    pub max_fitness: f64,
    /// Mean fitness of the current population.
    pub mean_fitness: f64,
    /// Mean of the per-species champion fitnesses.
    pub mean_specie_champ_fitness: f64,
    /// Smallest genome complexity.
    pub min_complexity: f64,
    /// Largest genome complexity.
    pub max_complexity: f64,
    /// Mean genome complexity.
    pub mean_complexity: f64,
    /// Moving average of `max_fitness`.
    pub best_fitness_ma: f64,
    /// Moving average of `mean_specie_champ_fitness`.
    pub mean_specie_champ_fitness_ma: f64,
    /// Moving average of `mean_complexity`.
    pub complexity_ma: f64,
    /// `complexity_ma` as of the previous generation.
    pub prev_complexity_ma: f64,
    /// Number of non-empty species.
    pub specie_count: usize,
    /// Novelty archive size (0 when disabled).
    pub archive_size: usize,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Mean fitness per generation.
    pub mean_fitness: Vec<f64>,
    /// Mean complexity per generation.
    pub mean_complexity: Vec<f64>,
    /// Species count per generation.
    pub specie_count: Vec<usize>,
}

/// Progress update passed to the progress callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Run state at the time of the update. `Paused` marks the pause event.
    pub state: RunState,
    /// Current statistics.
    pub stats: EvolutionStats,
    /// Complexity regime in effect.
    pub mode: ComplexityRegulationMode,
    /// Id of the best genome found so far.
    pub best_genome_id: Option<u64>,
    /// Fitness of the best genome found so far.
    pub best_fitness: f64,
}

/// One row of per-generation statistics for a statistics sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRecord {
    pub generation: u64,
    pub population_size: usize,
    pub specie_count: usize,
    pub evaluation_count: u64,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub min_complexity: f64,
    pub max_complexity: f64,
    pub mean_complexity: f64,
    pub mode: ComplexityRegulationMode,
}
