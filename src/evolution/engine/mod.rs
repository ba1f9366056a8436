//! The evolution algorithm: population lifecycle and the generation loop.

mod control;
mod queueing;
mod steady_state;

pub use control::RunControl;

use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::schema::{
    ComplexityRegulationMode, EvolutionConfig, EvolutionHistory, EvolutionProgress,
    EvolutionStats, GenerationRecord, RunState, SearchPolicy, StopReason,
};

use super::complexity::{ComplexityRegulationStrategy, complexity_regulation_from_config};
use super::error::EvolutionError;
use super::evaluator::GenomeListEvaluator;
use super::genome::{Genome, GenomeFactory};
use super::novelty::NoveltyArchive;
use super::sink::StatisticsSink;
use super::speciation::{KMeansSpeciation, SpeciationStrategy, Specie};
use super::stats::{MovingAverage, mean_champion_fitness, summarize};

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&EvolutionProgress) + Send + Sync>;

/// NEAT-style evolution algorithm over genomes `G`, produced by factory `F`
/// and scored by evaluator `E`.
///
/// The search policy (steady-state speciated or queueing) is taken from the
/// configuration. The generation loop runs on the thread that calls
/// [`start_continue`](Self::start_continue); other threads interact with it
/// through the [`RunControl`] returned by [`control`](Self::control).
pub struct EvolutionAlgorithm<G, F, E>
where
    G: Genome,
    F: GenomeFactory<G>,
    E: GenomeListEvaluator<G>,
{
    config: EvolutionConfig,
    factory: F,
    evaluator: E,
    speciation: Box<dyn SpeciationStrategy<G>>,
    complexity: Box<dyn ComplexityRegulationStrategy>,
    archive: Option<NoveltyArchive>,
    sink: Option<Box<dyn StatisticsSink>>,
    callback: Option<ProgressCallback>,
    rng: StdRng,
    population: Vec<G>,
    species: Vec<Specie>,
    best_genome: Option<G>,
    generation: u64,
    mode: ComplexityRegulationMode,
    stats: EvolutionStats,
    history: EvolutionHistory,
    best_fitness_ma: MovingAverage,
    champion_fitness_ma: MovingAverage,
    complexity_ma: MovingAverage,
    stop_reason: Option<StopReason>,
    control: RunControl,
}

impl<G, F, E> EvolutionAlgorithm<G, F, E>
where
    G: Genome,
    F: GenomeFactory<G>,
    E: GenomeListEvaluator<G>,
{
    /// Create an algorithm. The configuration is validated here.
    pub fn new(config: EvolutionConfig, factory: F, evaluator: E) -> Result<Self, EvolutionError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let speciation = Box::new(KMeansSpeciation::from_config(&config.speciation));
        let complexity = complexity_regulation_from_config(&config.complexity);
        let archive = config.novelty.clone().map(NoveltyArchive::new);
        let stats_config = &config.statistics;

        Ok(Self {
            speciation,
            complexity,
            archive,
            sink: None,
            callback: None,
            rng: StdRng::seed_from_u64(seed),
            population: Vec::new(),
            species: Vec::new(),
            best_genome: None,
            generation: 0,
            mode: ComplexityRegulationMode::Complexifying,
            stats: EvolutionStats::default(),
            history: EvolutionHistory::default(),
            best_fitness_ma: MovingAverage::new(stats_config.fitness_window),
            champion_fitness_ma: MovingAverage::new(stats_config.fitness_window),
            complexity_ma: MovingAverage::new(stats_config.complexity_window),
            stop_reason: None,
            control: RunControl::default(),
            factory,
            evaluator,
            config,
        })
    }

    /// Replace the speciation strategy.
    pub fn with_speciation(mut self, speciation: impl SpeciationStrategy<G> + 'static) -> Self {
        self.speciation = Box::new(speciation);
        self
    }

    /// Replace the complexity regulation strategy.
    pub fn with_complexity_regulation(
        mut self,
        strategy: impl ComplexityRegulationStrategy + 'static,
    ) -> Self {
        self.complexity = Box::new(strategy);
        self
    }

    /// Replace the novelty archive (e.g. to use a custom behavior distance).
    pub fn with_novelty_archive(mut self, archive: NoveltyArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Record one [`GenerationRecord`] per generation. A sink error stops
    /// the run with [`EvolutionError::Sink`].
    pub fn with_statistics_sink(mut self, sink: impl StatisticsSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Receive progress updates every `statistics.update_interval`
    /// generations and on pause or stop.
    pub fn with_callback<C>(mut self, callback: C) -> Self
    where
        C: Fn(&EvolutionProgress) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Evaluate and speciate a seed population.
    ///
    /// A seed smaller than the configured population size is topped up with
    /// mutated copies of randomly chosen seed genomes; a larger one is
    /// truncated.
    pub fn initialize(&mut self, seed: Vec<G>) -> Result<(), EvolutionError> {
        self.require_state("initialize", &[RunState::Uninitialized])?;
        if seed.is_empty() {
            return Err(EvolutionError::EmptySeedPopulation);
        }

        let size = self.config.population.size;
        let mut population = seed;
        if population.len() > size {
            warn!(
                "Seed population of {} exceeds population size {}; truncating",
                population.len(),
                size
            );
            population.truncate(size);
        }
        let seed_len = population.len();
        while population.len() < size {
            let parent_idx = self.rng.gen_range(0..seed_len);
            let offspring = self
                .factory
                .create_offspring(&population[parent_idx], 0, &mut self.rng);
            population.push(offspring);
        }

        self.generation = 0;
        self.evaluator.initialize();
        self.evaluator.evaluate(&mut population, 0)?;
        self.population = population;

        if self.config.policy.is_speciated() {
            self.species = self
                .speciation
                .speciate(&mut self.population, self.config.speciation.specie_count);
            self.sort_species();
        } else {
            self.population.sort_by_key(Genome::birth_generation);
        }

        self.update_best_genome();
        self.update_stats(0, Instant::now());
        self.control.set_state(RunState::Ready);
        info!(
            "Initialized population of {} genomes in {} species",
            self.population.len(),
            self.species.len()
        );
        Ok(())
    }

    /// Initialize with a random population from the genome factory.
    pub fn initialize_random(&mut self) -> Result<(), EvolutionError> {
        let seed = self
            .factory
            .create_genome_list(self.config.population.size, 0, &mut self.rng);
        self.initialize(seed)
    }

    /// Run generations on the calling thread until a pause is requested or
    /// a stop condition holds. Returns the state the loop ended in.
    pub fn start_continue(&mut self) -> Result<RunState, EvolutionError> {
        self.require_state("start", &[RunState::Ready, RunState::Paused])?;
        self.control.clear_pause_request();
        self.control.set_state(RunState::Running);
        info!("Evolution running from generation {}", self.generation);

        loop {
            if let Some(reason) = self.should_stop() {
                self.stop_reason = Some(reason);
                self.control.set_state(RunState::Stopped);
                info!(
                    "Evolution stopped at generation {}: {:?}",
                    self.generation, reason
                );
                self.flush_sink()?;
                self.emit_progress(RunState::Stopped);
                return Ok(RunState::Stopped);
            }

            if self.control.take_pause_request() {
                self.control.set_state(RunState::Paused);
                info!("Evolution paused at generation {}", self.generation);
                self.flush_sink()?;
                self.emit_progress(RunState::Paused);
                return Ok(RunState::Paused);
            }

            if let Err(err) = self.step_generation() {
                self.control.set_state(RunState::Stopped);
                if let Err(flush_err) = self.flush_sink() {
                    warn!("Failed to flush statistics sink: {}", flush_err);
                }
                return Err(err);
            }

            let interval = self.config.statistics.update_interval.max(1);
            if self.generation % interval == 0 {
                info!(
                    "Generation {}: best {:.4}, mean {:.4}, species {}, complexity {:.2} ({:?})",
                    self.generation,
                    self.stats.max_fitness,
                    self.stats.mean_fitness,
                    self.stats.specie_count,
                    self.stats.mean_complexity,
                    self.mode
                );
                self.emit_progress(RunState::Running);
            }
        }
    }

    /// Return to `Uninitialized`, dropping all population state.
    pub fn reset(&mut self) -> Result<(), EvolutionError> {
        if self.control.run_state() == RunState::Running {
            return Err(EvolutionError::InvalidState {
                operation: "reset",
                state: RunState::Running,
            });
        }

        self.population.clear();
        self.species.clear();
        self.best_genome = None;
        self.generation = 0;
        self.mode = ComplexityRegulationMode::Complexifying;
        self.stats = EvolutionStats::default();
        self.history = EvolutionHistory::default();
        self.best_fitness_ma.clear();
        self.champion_fitness_ma.clear();
        self.complexity_ma.clear();
        self.stop_reason = None;
        self.complexity.reset();
        self.factory.set_complexity_mode(self.mode);
        if let Some(archive) = self.archive.as_mut() {
            archive.reset();
        }
        self.evaluator.reset();
        self.control.clear_pause_request();
        self.control.set_state(RunState::Uninitialized);
        debug!("Evolution algorithm reset");
        Ok(())
    }

    /// Handle for pausing from another thread.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn run_state(&self) -> RunState {
        self.control.run_state()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Counted evaluations since the last reset.
    pub fn evaluation_count(&self) -> u64 {
        self.evaluator.evaluation_count()
    }

    /// Fittest genome seen since initialization.
    pub fn best_genome(&self) -> Option<&G> {
        self.best_genome.as_ref()
    }

    pub fn population(&self) -> &[G] {
        &self.population
    }

    /// Species of the last speciation; empty under the queueing policy.
    pub fn species(&self) -> &[Specie] {
        &self.species
    }

    pub fn stats(&self) -> &EvolutionStats {
        &self.stats
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    pub fn complexity_mode(&self) -> ComplexityRegulationMode {
        self.mode
    }

    pub fn archive(&self) -> Option<&NoveltyArchive> {
        self.archive.as_ref()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Snapshot for progress reporting.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            state: self.control.run_state(),
            stats: self.stats.clone(),
            mode: self.mode,
            best_genome_id: self.best_genome.as_ref().map(Genome::id),
            best_fitness: self.best_genome.as_ref().map_or(0.0, Genome::fitness),
        }
    }

    fn require_state(
        &self,
        operation: &'static str,
        allowed: &[RunState],
    ) -> Result<(), EvolutionError> {
        let state = self.control.run_state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(EvolutionError::InvalidState { operation, state })
        }
    }

    fn should_stop(&self) -> Option<StopReason> {
        let limits = &self.config.population;
        if let Some(max) = limits.max_generations
            && self.generation >= max
        {
            return Some(StopReason::MaxGenerations);
        }
        if let Some(max) = limits.max_evaluations
            && self.evaluator.evaluation_count() >= max
        {
            return Some(StopReason::MaxEvaluations);
        }
        if self.evaluator.stop_condition_satisfied() {
            return Some(StopReason::StopConditionSatisfied);
        }
        None
    }

    fn step_generation(&mut self) -> Result<(), EvolutionError> {
        self.generation += 1;
        let started = Instant::now();
        let evaluations_before = self.evaluator.evaluation_count();

        match self.config.policy.clone() {
            SearchPolicy::SteadyState(policy) => self.step_steady_state(&policy)?,
            SearchPolicy::Queueing(policy) => self.step_queueing(&policy)?,
        }

        self.update_best_genome();
        self.update_stats(evaluations_before, started);

        self.mode = self.complexity.determine_mode(&self.stats);
        self.factory.set_complexity_mode(self.mode);
        self.record_generation()?;
        self.evaluator.update(&self.population);

        debug_assert_eq!(
            self.population.len(),
            self.config.population.size,
            "population size drifted"
        );
        Ok(())
    }

    /// Sort every species' members and refresh its statistics.
    fn sort_species(&mut self) {
        for specie in &mut self.species {
            specie.sort_members(&self.population);
            specie.update_statistics(&self.population);
        }
    }

    fn update_best_genome(&mut self) {
        let champion = if self.species.is_empty() {
            self.population
                .iter()
                .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
        } else {
            // Members are sorted, so champions are first
            self.species
                .iter()
                .filter_map(|s| s.members.first())
                .map(|&i| &self.population[i])
                .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
        };

        if let Some(champion) = champion
            && self
                .best_genome
                .as_ref()
                .is_none_or(|best| champion.fitness() > best.fitness())
        {
            self.best_genome = Some(champion.clone());
        }
    }

    fn update_stats(&mut self, evaluations_before: u64, started: Instant) {
        let summary = summarize(&self.population);
        let total_evaluations = self.evaluator.evaluation_count();
        let elapsed = started.elapsed().as_secs_f64();
        let champion_fitness = mean_champion_fitness(&self.species);

        self.best_fitness_ma.push(summary.max_fitness);
        self.champion_fitness_ma.push(champion_fitness);
        let prev_complexity_ma = self.complexity_ma.mean();
        self.complexity_ma.push(summary.mean_complexity);

        self.stats = EvolutionStats {
            generation: self.generation,
            total_evaluation_count: total_evaluations,
            evaluations_per_sec: if elapsed > 0.0 {
                total_evaluations.saturating_sub(evaluations_before) as f64 / elapsed
            } else {
                0.0
            },
            max_fitness: summary.max_fitness,
            mean_fitness: summary.mean_fitness,
            mean_specie_champ_fitness: champion_fitness,
            min_complexity: summary.min_complexity,
            max_complexity: summary.max_complexity,
            mean_complexity: summary.mean_complexity,
            best_fitness_ma: self.best_fitness_ma.mean(),
            mean_specie_champ_fitness_ma: self.champion_fitness_ma.mean(),
            complexity_ma: self.complexity_ma.mean(),
            prev_complexity_ma,
            specie_count: self.species.iter().filter(|s| !s.is_empty()).count(),
            archive_size: self.archive.as_ref().map_or(0, NoveltyArchive::len),
        };

        self.history.best_fitness.push(summary.max_fitness);
        self.history.mean_fitness.push(summary.mean_fitness);
        self.history.mean_complexity.push(summary.mean_complexity);
        self.history.specie_count.push(self.stats.specie_count);
    }

    fn record_generation(&mut self) -> Result<(), EvolutionError> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let record = GenerationRecord {
            generation: self.generation,
            population_size: self.population.len(),
            specie_count: self.stats.specie_count,
            evaluation_count: self.stats.total_evaluation_count,
            best_fitness: self.stats.max_fitness,
            mean_fitness: self.stats.mean_fitness,
            min_complexity: self.stats.min_complexity,
            max_complexity: self.stats.max_complexity,
            mean_complexity: self.stats.mean_complexity,
            mode: self.mode,
        };
        sink.record(&record)?;
        Ok(())
    }

    fn flush_sink(&mut self) -> Result<(), EvolutionError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    fn emit_progress(&self, state: RunState) {
        if let Some(callback) = &self.callback {
            let mut progress = self.progress();
            progress.state = state;
            callback(&progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::evaluator::GenomeEvaluator;
    use crate::evolution::test_support::{HashFitness, IdDecoder, TestFactory, TestGenome};
    use crate::schema::{QueueingConfig, SteadyStateConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type TestAlgorithm =
        EvolutionAlgorithm<TestGenome, TestFactory, GenomeEvaluator<TestGenome, IdDecoder, HashFitness>>;

    fn config(size: usize, batch_size: usize) -> EvolutionConfig {
        let mut config = EvolutionConfig::default();
        config.population.size = size;
        config.speciation.specie_count = 4;
        config.random_seed = Some(42);
        config.policy = SearchPolicy::SteadyState(SteadyStateConfig {
            batch_size,
            population_evaluation_frequency: 5,
            ..Default::default()
        });
        config
    }

    fn algorithm(config: EvolutionConfig) -> TestAlgorithm {
        let evaluator = GenomeEvaluator::new(IdDecoder, HashFitness::default());
        EvolutionAlgorithm::new(config, TestFactory::default(), evaluator).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let evaluator = GenomeEvaluator::new(IdDecoder, HashFitness::default());
        let result = EvolutionAlgorithm::new(config(10, 10), TestFactory::default(), evaluator);
        assert!(matches!(result, Err(EvolutionError::Config(_))));
    }

    #[test]
    fn test_state_transitions() {
        let mut config = config(20, 4);
        config.population.max_generations = Some(3);
        let mut algo = algorithm(config);

        assert_eq!(algo.run_state(), RunState::Uninitialized);
        assert!(matches!(
            algo.start_continue(),
            Err(EvolutionError::InvalidState { .. })
        ));

        algo.initialize_random().unwrap();
        assert_eq!(algo.run_state(), RunState::Ready);
        assert!(matches!(
            algo.initialize_random(),
            Err(EvolutionError::InvalidState { .. })
        ));

        assert_eq!(algo.start_continue().unwrap(), RunState::Stopped);
        assert_eq!(algo.stop_reason(), Some(StopReason::MaxGenerations));
        assert_eq!(algo.generation(), 3);
        assert!(algo.start_continue().is_err());

        algo.reset().unwrap();
        assert_eq!(algo.run_state(), RunState::Uninitialized);
        assert!(algo.population().is_empty());
        assert_eq!(algo.evaluation_count(), 0);
        algo.initialize_random().unwrap();
        assert_eq!(algo.population().len(), 20);
    }

    #[test]
    fn test_empty_seed_rejected() {
        let mut algo = algorithm(config(20, 4));
        assert!(matches!(
            algo.initialize(Vec::new()),
            Err(EvolutionError::EmptySeedPopulation)
        ));
        assert_eq!(algo.run_state(), RunState::Uninitialized);
    }

    #[test]
    fn test_small_seed_topped_up() {
        let mut algo = algorithm(config(20, 4));
        let seed = vec![TestGenome::at(1000, &[(1, 1.0)]), TestGenome::at(1001, &[(2, 1.0)])];
        algo.initialize(seed).unwrap();
        assert_eq!(algo.population().len(), 20);
        assert_eq!(algo.evaluation_count(), 20);
        assert_eq!(algo.factory().asexual, 18);
    }

    #[test]
    fn test_steady_state_generations() {
        let mut config = config(40, 8);
        config.population.max_generations = Some(12);
        let mut algo = algorithm(config);
        algo.initialize_random().unwrap();
        let initial_evaluations = algo.evaluation_count();

        algo.start_continue().unwrap();

        assert_eq!(algo.population().len(), 40);
        // Offspring are the only counted evaluations after initialization
        assert_eq!(algo.evaluation_count(), initial_evaluations + 12 * 8);
        assert!(!algo.species().is_empty());
        assert!(algo.species().iter().all(|s| !s.is_empty()));
        let members: usize = algo.species().iter().map(Specie::len).sum();
        assert_eq!(members, 40);
        assert_eq!(algo.history().best_fitness.len(), 13);

        let best = algo.best_genome().unwrap();
        assert!(algo.population().iter().all(|g| g.fitness() <= best.fitness()));
    }

    #[test]
    fn test_max_evaluations_stop() {
        let mut config = config(20, 5);
        config.population.max_evaluations = Some(40);
        let mut algo = algorithm(config);
        algo.initialize_random().unwrap();
        assert_eq!(algo.start_continue().unwrap(), RunState::Stopped);
        assert_eq!(algo.stop_reason(), Some(StopReason::MaxEvaluations));
        assert_eq!(algo.evaluation_count(), 40);
        assert_eq!(algo.generation(), 4);
    }

    #[test]
    fn test_evaluator_stop_condition() {
        let config = config(20, 5);
        let evaluator = GenomeEvaluator::new(IdDecoder, HashFitness::stop_at(3));
        let mut algo =
            EvolutionAlgorithm::new(config, TestFactory::default(), evaluator).unwrap();
        algo.initialize_random().unwrap();
        algo.start_continue().unwrap();
        assert_eq!(algo.stop_reason(), Some(StopReason::StopConditionSatisfied));
        assert_eq!(algo.generation(), 3);
    }

    #[test]
    fn test_sink_failure_stops_run() {
        use crate::evolution::sink::StatisticsSink;
        use crate::schema::GenerationRecord;

        struct FailAfter(usize);

        impl StatisticsSink for FailAfter {
            fn record(&mut self, _record: &GenerationRecord) -> std::io::Result<()> {
                if self.0 == 0 {
                    return Err(std::io::Error::other("disk full"));
                }
                self.0 -= 1;
                Ok(())
            }
        }

        let mut config = config(20, 4);
        config.population.max_generations = Some(10);
        let mut algo = algorithm(config).with_statistics_sink(FailAfter(2));
        algo.initialize_random().unwrap();

        let result = algo.start_continue();
        assert!(matches!(result, Err(EvolutionError::Sink(_))));
        assert_eq!(algo.run_state(), RunState::Stopped);
        assert_eq!(algo.generation(), 3);
    }

    #[test]
    fn test_callback_and_sink() {
        let mut config = config(20, 5);
        config.population.max_generations = Some(6);
        config.statistics.update_interval = 2;

        let updates = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&updates);
        let records = Arc::new(Mutex::new(Vec::new()));

        let mut algo = algorithm(config)
            .with_callback(move |_| {
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .with_statistics_sink(crate::evolution::test_support::CollectingSink(Arc::clone(
                &records,
            )));
        algo.initialize_random().unwrap();
        algo.start_continue().unwrap();

        // Generations 2, 4, 6 plus the stop event
        assert_eq!(updates.load(Ordering::Relaxed), 4);
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[5].generation, 6);
        assert!(records.iter().all(|r| r.population_size == 20));
    }

    #[test]
    fn test_complexity_mode_pushed_to_factory() {
        use crate::schema::{ComplexityCeiling, ComplexityRegulationConfig};

        let mut config = config(20, 5);
        config.population.max_generations = Some(2);
        // Test genomes have complexity >= 1, so this ceiling is always exceeded
        config.complexity = ComplexityRegulationConfig::Threshold {
            ceiling: ComplexityCeiling::Absolute { value: 0.5 },
            margin: 0.1,
            min_simplification_generations: 0,
        };
        let mut algo = algorithm(config);
        algo.initialize_random().unwrap();
        algo.start_continue().unwrap();
        assert_eq!(algo.complexity_mode(), ComplexityRegulationMode::Simplifying);
        assert_eq!(
            algo.factory().modes.last(),
            Some(&ComplexityRegulationMode::Simplifying)
        );
    }

    #[test]
    fn test_queueing_policy_keeps_size() {
        let mut config = config(15, 4);
        config.policy = SearchPolicy::Queueing(QueueingConfig { batch_size: 4 });
        config.population.max_generations = Some(10);
        let mut algo = algorithm(config);
        algo.initialize_random().unwrap();
        algo.start_continue().unwrap();
        assert_eq!(algo.population().len(), 15);
        assert!(algo.species().is_empty());
        assert_eq!(algo.stats().specie_count, 0);
    }

    #[test]
    fn test_pause_from_callback_thread() {
        let mut config = config(20, 5);
        config.population.max_generations = Some(1000);
        let mut algo = algorithm(config);
        let control = algo.control();
        algo = algo.with_callback(move |progress| {
            if progress.stats.generation == 3 {
                control.request_pause();
            }
        });
        algo.initialize_random().unwrap();

        assert_eq!(algo.start_continue().unwrap(), RunState::Paused);
        assert_eq!(algo.generation(), 3);
        assert_eq!(algo.run_state(), RunState::Paused);

        // Resuming continues from the same generation
        let control = algo.control();
        algo = algo.with_callback(move |progress| {
            if progress.stats.generation == 5 {
                control.request_pause();
            }
        });
        assert_eq!(algo.start_continue().unwrap(), RunState::Paused);
        assert_eq!(algo.generation(), 5);
    }
}
