//! Evolution configuration types for speciated NEAT-style search.
//!
//! This module provides types for configuring the evolution algorithm: the
//! generational policy, speciation, complexity regulation, the optional
//! novelty archive, evaluation and statistics.

use serde::{Deserialize, Serialize};

/// Top-level configuration for an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population size and stop limits.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Generational policy to use.
    #[serde(default)]
    pub policy: SearchPolicy,
    /// Speciation (genetic clustering) settings.
    #[serde(default)]
    pub speciation: SpeciationConfig,
    /// Complexity regulation strategy.
    #[serde(default)]
    pub complexity: ComplexityRegulationConfig,
    /// Novelty archive settings. Disabled when absent.
    #[serde(default)]
    pub novelty: Option<NoveltyArchiveConfig>,
    /// Evaluation settings (parallelism, phenome caching).
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Statistics and update reporting.
    #[serde(default)]
    pub statistics: StatisticsConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            policy: SearchPolicy::default(),
            speciation: SpeciationConfig::default(),
            complexity: ComplexityRegulationConfig::default(),
            novelty: None,
            evaluation: EvaluationConfig::default(),
            statistics: StatisticsConfig::default(),
            random_seed: None,
        }
    }
}

/// Population size and stop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Target number of genomes in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Stop after this many generations.
    #[serde(default)]
    pub max_generations: Option<u64>,
    /// Stop after this many counted evaluations.
    ///
    /// Checked between generations, so a run may overshoot by up to one
    /// batch, or by the whole population plus a batch under steady-state
    /// relative evaluation.
    #[serde(default)]
    pub max_evaluations: Option<u64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: None,
            max_evaluations: None,
        }
    }
}

fn default_population_size() -> usize {
    150
}

/// Generational policy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchPolicy {
    /// Steady-state, speciated, complexifying batches with fitness sharing.
    SteadyState(SteadyStateConfig),
    /// Unspeciated FIFO queue where survival is driven by age.
    /// Used for minimal-criteria and novelty searches.
    Queueing(QueueingConfig),
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self::SteadyState(SteadyStateConfig::default())
    }
}

impl SearchPolicy {
    /// Offspring produced per generation.
    pub fn batch_size(&self) -> usize {
        match self {
            Self::SteadyState(c) => c.batch_size,
            Self::Queueing(c) => c.batch_size,
        }
    }

    /// Whether the policy partitions the population into species.
    pub fn is_speciated(&self) -> bool {
        matches!(self, Self::SteadyState(_))
    }
}

/// Steady-state policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteadyStateConfig {
    /// Offspring produced (and genomes removed) per generation.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Re-evaluate and fully re-speciate the population every N generations.
    #[serde(default = "default_population_evaluation_frequency")]
    pub population_evaluation_frequency: u64,
    /// Proportion of offspring produced asexually (0.0-1.0).
    #[serde(default = "default_offspring_asexual_proportion")]
    pub offspring_asexual_proportion: f64,
    /// Proportion of sexual reproductions drawing the second parent from another species.
    #[serde(default = "default_interspecies_mating_proportion")]
    pub interspecies_mating_proportion: f64,
    /// Evaluate offspring together with the whole population
    /// (for relative or competitive fitness measures).
    #[serde(default)]
    pub relative_evaluation: bool,
    /// Fitness signal used to rank genomes for removal.
    #[serde(default)]
    pub ranking_fitness: RankingFitness,
}

impl Default for SteadyStateConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            population_evaluation_frequency: default_population_evaluation_frequency(),
            offspring_asexual_proportion: default_offspring_asexual_proportion(),
            interspecies_mating_proportion: default_interspecies_mating_proportion(),
            relative_evaluation: false,
            ranking_fitness: RankingFitness::default(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_population_evaluation_frequency() -> u64 {
    100
}
fn default_offspring_asexual_proportion() -> f64 {
    0.5
}
fn default_interspecies_mating_proportion() -> f64 {
    0.01
}

/// Queueing policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueingConfig {
    /// Parents dequeued (one asexual offspring each) per generation.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for QueueingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Which fitness value drives removal ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "source")]
pub enum RankingFitness {
    /// Primary fitness.
    #[default]
    Primary,
    /// An entry of the auxiliary fitness vector (falls back to primary when missing).
    Auxiliary { index: usize },
}

/// Speciation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciationConfig {
    /// Target number of species.
    #[serde(default = "default_specie_count")]
    pub specie_count: usize,
    /// Maximum k-means relocation passes per speciation.
    #[serde(default = "default_max_kmeans_iterations")]
    pub max_iterations: usize,
    /// Distance metric over genome positions.
    #[serde(default)]
    pub metric: DistanceMetricConfig,
    /// Run the nearest-centroid assignment in parallel.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            specie_count: default_specie_count(),
            max_iterations: default_max_kmeans_iterations(),
            metric: DistanceMetricConfig::default(),
            parallel: false,
        }
    }
}

fn default_specie_count() -> usize {
    10
}
fn default_max_kmeans_iterations() -> usize {
    5
}

/// Distance metric over coordinate vectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DistanceMetricConfig {
    /// Weighted Manhattan distance.
    Manhattan {
        /// Coefficient for coordinates present in both vectors.
        #[serde(default = "default_matching_coefficient")]
        matching_coefficient: f64,
        /// Coefficient for coordinates present in only one vector.
        #[serde(default)]
        mismatch_coefficient: f64,
        /// Constant added per mismatched coordinate.
        #[serde(default = "default_mismatch_constant")]
        mismatch_constant: f64,
    },
    /// Weighted Euclidean distance.
    Euclidean {
        #[serde(default = "default_matching_coefficient")]
        matching_coefficient: f64,
        #[serde(default)]
        mismatch_coefficient: f64,
        #[serde(default = "default_mismatch_constant")]
        mismatch_constant: f64,
    },
}

impl Default for DistanceMetricConfig {
    fn default() -> Self {
        Self::Manhattan {
            matching_coefficient: default_matching_coefficient(),
            mismatch_coefficient: 0.0,
            mismatch_constant: default_mismatch_constant(),
        }
    }
}

fn default_matching_coefficient() -> f64 {
    1.0
}
fn default_mismatch_constant() -> f64 {
    10.0
}

/// Complexity regulation strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum ComplexityRegulationConfig {
    /// Always complexifying.
    #[default]
    Null,
    /// Switch to simplifying above a complexity ceiling, with hysteresis.
    Threshold {
        /// Complexity ceiling.
        ceiling: ComplexityCeiling,
        /// Mean complexity must fall this far below the ceiling before
        /// complexifying resumes.
        #[serde(default = "default_complexity_margin")]
        margin: f64,
        /// Minimum generations spent simplifying before switching back.
        #[serde(default = "default_min_simplification_generations")]
        min_simplification_generations: u64,
    },
}

fn default_complexity_margin() -> f64 {
    5.0
}
fn default_min_simplification_generations() -> u64 {
    10
}

/// Complexity ceiling type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum ComplexityCeiling {
    /// Fixed mean-complexity ceiling.
    Absolute { value: f64 },
    /// Ceiling set relative to the mean complexity at the last switch to complexifying.
    Relative { value: f64 },
}

/// Novelty archive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoveltyArchiveConfig {
    /// Initial admission threshold.
    #[serde(default = "default_novelty_threshold")]
    pub initial_threshold: f64,
    /// Number of nearest neighbors for novelty calculation.
    #[serde(default = "default_k_nearest")]
    pub k_nearest: usize,
    /// Threshold multiplier applied after a dry spell (< 1).
    #[serde(default = "default_threshold_decrease_multiplier")]
    pub threshold_decrease_multiplier: f64,
    /// Threshold multiplier applied after too many additions (> 1).
    #[serde(default = "default_threshold_increase_multiplier")]
    pub threshold_increase_multiplier: f64,
    /// Windows without any addition tolerated before loosening.
    #[serde(default = "default_max_generations_without_addition")]
    pub max_generations_without_addition: u32,
    /// Additions per window tolerated before tightening.
    #[serde(default = "default_max_generational_additions")]
    pub max_generational_additions: u32,
}

impl Default for NoveltyArchiveConfig {
    fn default() -> Self {
        Self {
            initial_threshold: default_novelty_threshold(),
            k_nearest: default_k_nearest(),
            threshold_decrease_multiplier: default_threshold_decrease_multiplier(),
            threshold_increase_multiplier: default_threshold_increase_multiplier(),
            max_generations_without_addition: default_max_generations_without_addition(),
            max_generational_additions: default_max_generational_additions(),
        }
    }
}

fn default_novelty_threshold() -> f64 {
    1.0
}
fn default_k_nearest() -> usize {
    15
}
fn default_threshold_decrease_multiplier() -> f64 {
    0.95
}
fn default_threshold_increase_multiplier() -> f64 {
    1.3
}
fn default_max_generations_without_addition() -> u32 {
    10
}
fn default_max_generational_additions() -> u32 {
    4
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Evaluate genomes of a batch in parallel.
    #[serde(default = "default_parallel_evaluation")]
    pub parallel: bool,
    /// Number of parallel evaluation workers (0 = auto-detect).
    #[serde(default)]
    pub parallel_workers: usize,
    /// Keep decoded phenomes of surviving genomes between evaluations.
    #[serde(default)]
    pub phenome_caching: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel_evaluation(),
            parallel_workers: 0,
            phenome_caching: false,
        }
    }
}

fn default_parallel_evaluation() -> bool {
    true
}

/// Statistics and update reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Window for the best-fitness and champion-fitness moving averages.
    #[serde(default = "default_fitness_window")]
    pub fitness_window: usize,
    /// Window for the mean-complexity moving average.
    #[serde(default = "default_complexity_window")]
    pub complexity_window: usize,
    /// Fire the progress callback every N generations.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            fitness_window: default_fitness_window(),
            complexity_window: default_complexity_window(),
            update_interval: default_update_interval(),
        }
    }
}

fn default_fitness_window() -> usize {
    100
}
fn default_complexity_window() -> usize {
    10
}
fn default_update_interval() -> u64 {
    1
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),
    #[error("Invalid proportion: {0}")]
    InvalidProportion(String),
    #[error("Specie count must be at least 1")]
    InvalidSpecieCount,
    #[error("Invalid complexity regulation: {0}")]
    InvalidComplexity(String),
    #[error("Invalid novelty archive settings: {0}")]
    InvalidNovelty(String),
    #[error("Invalid statistics settings: {0}")]
    InvalidStatistics(String),
    #[error("Invalid genome settings: {0}")]
    InvalidGenome(String),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        let size = self.population.size;
        if size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }

        match &self.policy {
            SearchPolicy::SteadyState(c) => {
                if c.batch_size == 0 || c.batch_size >= size {
                    return Err(EvolutionConfigError::InvalidBatchSize(format!(
                        "batch size {} must be in 1..{}",
                        c.batch_size, size
                    )));
                }
                if c.population_evaluation_frequency == 0 {
                    return Err(EvolutionConfigError::InvalidBatchSize(
                        "population evaluation frequency must be positive".to_string(),
                    ));
                }
                check_proportion(c.offspring_asexual_proportion, "offspring_asexual_proportion")?;
                check_proportion(
                    c.interspecies_mating_proportion,
                    "interspecies_mating_proportion",
                )?;
            }
            SearchPolicy::Queueing(c) => {
                if c.batch_size == 0 {
                    return Err(EvolutionConfigError::InvalidBatchSize(
                        "batch size must be positive".to_string(),
                    ));
                }
            }
        }

        if self.speciation.specie_count == 0 {
            return Err(EvolutionConfigError::InvalidSpecieCount);
        }

        if let ComplexityRegulationConfig::Threshold {
            ceiling, margin, ..
        } = &self.complexity
        {
            let value = match ceiling {
                ComplexityCeiling::Absolute { value } | ComplexityCeiling::Relative { value } => {
                    *value
                }
            };
            if value <= 0.0 {
                return Err(EvolutionConfigError::InvalidComplexity(format!(
                    "ceiling {value} must be positive"
                )));
            }
            if *margin < 0.0 {
                return Err(EvolutionConfigError::InvalidComplexity(format!(
                    "margin {margin} must be non-negative"
                )));
            }
        }

        if let Some(novelty) = &self.novelty {
            if novelty.k_nearest == 0 {
                return Err(EvolutionConfigError::InvalidNovelty(
                    "k_nearest must be positive".to_string(),
                ));
            }
            if !(novelty.threshold_decrease_multiplier > 0.0
                && novelty.threshold_decrease_multiplier < 1.0)
            {
                return Err(EvolutionConfigError::InvalidNovelty(format!(
                    "decrease multiplier {} must be in (0, 1)",
                    novelty.threshold_decrease_multiplier
                )));
            }
            if novelty.threshold_increase_multiplier <= 1.0 {
                return Err(EvolutionConfigError::InvalidNovelty(format!(
                    "increase multiplier {} must be greater than 1",
                    novelty.threshold_increase_multiplier
                )));
            }
        }

        if self.statistics.fitness_window == 0 || self.statistics.complexity_window == 0 {
            return Err(EvolutionConfigError::InvalidStatistics(
                "moving average windows must be positive".to_string(),
            ));
        }
        if self.statistics.update_interval == 0 {
            return Err(EvolutionConfigError::InvalidStatistics(
                "update interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

pub(crate) fn check_proportion(value: f64, name: &str) -> Result<(), EvolutionConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EvolutionConfigError::InvalidProportion(format!(
            "{name} ({value}) must be within 0.0-1.0"
        )))
    }
}
