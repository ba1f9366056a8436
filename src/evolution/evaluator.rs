//! Genome evaluation: decoding genomes into phenomes and scoring them.
//!
//! Domains plug in a [`GenomeDecoder`] and a [`PhenomeEvaluator`]. The
//! [`GenomeEvaluator`] combines them into the [`GenomeListEvaluator`] the
//! evolution algorithm consumes, running evaluations serially or on a rayon
//! pool and optionally caching decoded phenomes between generations.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::schema::EvaluationConfig;

use super::error::EvolutionError;
use super::genome::Genome;

/// Outcome of evaluating one phenome.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessInfo {
    pub fitness: f64,
    pub auxiliary_fitness: Vec<f64>,
    pub behavior: Vec<f64>,
    pub viable: bool,
}

impl FitnessInfo {
    /// A viable result with the given primary fitness.
    pub fn new(fitness: f64) -> Self {
        Self {
            fitness,
            auxiliary_fitness: Vec::new(),
            behavior: Vec::new(),
            viable: true,
        }
    }

    /// Result for a genome that failed to decode or was rejected.
    pub fn non_viable() -> Self {
        Self {
            fitness: 0.0,
            auxiliary_fitness: Vec::new(),
            behavior: Vec::new(),
            viable: false,
        }
    }

    pub fn with_behavior(mut self, behavior: Vec<f64>) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_auxiliary(mut self, auxiliary_fitness: Vec<f64>) -> Self {
        self.auxiliary_fitness = auxiliary_fitness;
        self
    }
}

/// Converts a genome into an executable phenome.
pub trait GenomeDecoder<G: Genome>: Send + Sync {
    type Phenome: Send;

    /// Decode a genome. `None` marks the genome as non-viable.
    fn decode(&self, genome: &G) -> Option<Self::Phenome>;
}

/// Scores a decoded phenome.
///
/// `evaluate` takes `&self` because it runs concurrently on worker threads;
/// any state it shares must be synchronized by the implementation.
pub trait PhenomeEvaluator<P>: Send + Sync {
    fn evaluate(&self, phenome: &mut P, generation: u64) -> FitnessInfo;

    /// True once the experiment's goal has been reached.
    fn stop_condition_satisfied(&self) -> bool {
        false
    }

    fn initialize(&mut self) {}

    fn reset(&mut self) {}

    /// Called once per generation with the current population.
    fn update<G: Genome>(&mut self, _population: &[G]) {}
}

/// Per-dimension bounds a behavior must fall within to count as viable.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimalCriterion {
    bounds: Vec<(f64, f64)>,
}

impl MinimalCriterion {
    /// Inclusive `(min, max)` bounds, one per behavior dimension.
    pub fn new(bounds: Vec<(f64, f64)>) -> Self {
        Self { bounds }
    }

    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    /// Check a behavior against the bounds.
    pub fn is_satisfied(&self, behavior: &[f64]) -> Result<bool, EvolutionError> {
        if behavior.len() != self.bounds.len() {
            return Err(EvolutionError::BehaviorDimensionMismatch {
                expected: self.bounds.len(),
                actual: behavior.len(),
            });
        }
        Ok(behavior
            .iter()
            .zip(&self.bounds)
            .all(|(&v, &(lo, hi))| v >= lo && v <= hi))
    }
}

/// Evaluates a whole batch of genomes. This is what the evolution
/// algorithm talks to.
pub trait GenomeListEvaluator<G: Genome>: Send {
    /// Evaluate genomes, counting each against the evaluation budget.
    fn evaluate(&mut self, genomes: &mut [G], generation: u64) -> Result<(), EvolutionError>;

    /// Evaluate genomes without counting them.
    fn reevaluate(&mut self, genomes: &mut [G], generation: u64) -> Result<(), EvolutionError>;

    /// Total counted evaluations since the last reset.
    fn evaluation_count(&self) -> u64;

    fn stop_condition_satisfied(&self) -> bool;

    fn initialize(&mut self) {}

    fn reset(&mut self);

    /// Called once per generation with the current population.
    fn update(&mut self, _population: &[G]) {}

    /// Drop any per-genome state for genomes no longer in `population`.
    fn retain_phenomes(&mut self, _population: &[G]) {}
}

/// Borrowed evaluation state shared by all workers of one batch.
struct EvalContext<'a, D, E> {
    decoder: &'a D,
    evaluator: &'a E,
    criterion: Option<&'a MinimalCriterion>,
    counter: Option<&'a AtomicU64>,
    generation: u64,
}

impl<D, E> EvalContext<'_, D, E> {
    fn evaluate<G>(
        &self,
        genome: &mut G,
        cached: Option<D::Phenome>,
    ) -> Result<(u64, Option<D::Phenome>), EvolutionError>
    where
        G: Genome,
        D: GenomeDecoder<G>,
        E: PhenomeEvaluator<D::Phenome>,
    {
        let mut phenome = cached.or_else(|| self.decoder.decode(genome));

        let info = match phenome.as_mut() {
            None => FitnessInfo::non_viable(),
            Some(p) => {
                let mut info = self.evaluator.evaluate(p, self.generation);
                if let Some(criterion) = self.criterion
                    && info.viable
                    && !criterion.is_satisfied(&info.behavior)?
                {
                    info.viable = false;
                    info.fitness = 0.0;
                }
                info
            }
        };

        genome.evaluation_info_mut().record(info);
        if let Some(counter) = self.counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        Ok((genome.id(), phenome))
    }
}

/// Standard [`GenomeListEvaluator`]: decoder + phenome evaluator, serial or
/// parallel, with optional phenome caching and minimal criterion.
pub struct GenomeEvaluator<G, D, E>
where
    G: Genome,
    D: GenomeDecoder<G>,
{
    decoder: D,
    phenome_evaluator: E,
    parallel: bool,
    pool: Option<ThreadPool>,
    /// Decoded phenomes keyed by genome id; `None` when caching is off.
    cache: Option<HashMap<u64, D::Phenome>>,
    minimal_criterion: Option<MinimalCriterion>,
    evaluation_count: AtomicU64,
    _genome: PhantomData<fn() -> G>,
}

impl<G, D, E> GenomeEvaluator<G, D, E>
where
    G: Genome,
    D: GenomeDecoder<G>,
    E: PhenomeEvaluator<D::Phenome>,
{
    /// Parallel evaluator on the global rayon pool, without caching.
    pub fn new(decoder: D, phenome_evaluator: E) -> Self {
        Self {
            decoder,
            phenome_evaluator,
            parallel: true,
            pool: None,
            cache: None,
            minimal_criterion: None,
            evaluation_count: AtomicU64::new(0),
            _genome: PhantomData,
        }
    }

    /// Build an evaluator from configuration.
    pub fn from_config(
        decoder: D,
        phenome_evaluator: E,
        config: &EvaluationConfig,
    ) -> Result<Self, EvolutionError> {
        let mut evaluator = Self::new(decoder, phenome_evaluator)
            .parallel(config.parallel)
            .with_phenome_caching(config.phenome_caching);
        if config.parallel && config.parallel_workers > 0 {
            evaluator.pool = Some(
                ThreadPoolBuilder::new()
                    .num_threads(config.parallel_workers)
                    .build()?,
            );
        }
        Ok(evaluator)
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Keep decoded phenomes across generations, keyed by genome id.
    pub fn with_phenome_caching(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(HashMap::new);
        self
    }

    pub fn with_minimal_criterion(mut self, criterion: MinimalCriterion) -> Self {
        self.minimal_criterion = Some(criterion);
        self
    }

    pub fn phenome_evaluator(&self) -> &E {
        &self.phenome_evaluator
    }

    /// Number of cached phenomes.
    pub fn cached_phenomes(&self) -> usize {
        self.cache.as_ref().map_or(0, HashMap::len)
    }

    fn run_batch(
        &mut self,
        genomes: &mut [G],
        generation: u64,
        counted: bool,
    ) -> Result<(), EvolutionError> {
        let mut cache = self.cache.take();
        let items: Vec<(&mut G, Option<D::Phenome>)> = genomes
            .iter_mut()
            .map(|genome| {
                let cached = cache.as_mut().and_then(|c| c.remove(&genome.id()));
                (genome, cached)
            })
            .collect();

        let ctx = EvalContext {
            decoder: &self.decoder,
            evaluator: &self.phenome_evaluator,
            criterion: self.minimal_criterion.as_ref(),
            counter: counted.then_some(&self.evaluation_count),
            generation,
        };

        let results: Vec<_> = if self.parallel {
            let run = || {
                items
                    .into_par_iter()
                    .map(|(genome, cached)| ctx.evaluate(genome, cached))
                    .collect::<Vec<_>>()
            };
            match &self.pool {
                Some(pool) => pool.install(run),
                None => run(),
            }
        } else {
            items
                .into_iter()
                .map(|(genome, cached)| ctx.evaluate(genome, cached))
                .collect()
        };

        let mut first_error = None;
        for result in results {
            match result {
                Ok((id, Some(phenome))) => {
                    if let Some(cache) = cache.as_mut() {
                        cache.insert(id, phenome);
                    }
                }
                Ok((_, None)) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        self.cache = cache;
        first_error.map_or(Ok(()), Err)
    }
}

impl<G, D, E> GenomeListEvaluator<G> for GenomeEvaluator<G, D, E>
where
    G: Genome,
    D: GenomeDecoder<G>,
    E: PhenomeEvaluator<D::Phenome>,
{
    fn evaluate(&mut self, genomes: &mut [G], generation: u64) -> Result<(), EvolutionError> {
        self.run_batch(genomes, generation, true)
    }

    fn reevaluate(&mut self, genomes: &mut [G], generation: u64) -> Result<(), EvolutionError> {
        self.run_batch(genomes, generation, false)
    }

    fn evaluation_count(&self) -> u64 {
        self.evaluation_count.load(Ordering::Relaxed)
    }

    fn stop_condition_satisfied(&self) -> bool {
        self.phenome_evaluator.stop_condition_satisfied()
    }

    fn initialize(&mut self) {
        self.phenome_evaluator.initialize();
    }

    fn reset(&mut self) {
        self.evaluation_count.store(0, Ordering::Relaxed);
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
        self.phenome_evaluator.reset();
    }

    fn update(&mut self, population: &[G]) {
        self.phenome_evaluator.update(population);
    }

    fn retain_phenomes(&mut self, population: &[G]) {
        if let Some(cache) = self.cache.as_mut() {
            let alive: HashSet<u64> = population.iter().map(Genome::id).collect();
            cache.retain(|id, _| alive.contains(id));
        }
    }
}
