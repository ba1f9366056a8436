//! NEAT-style evolution engine.
//!
//! This module provides:
//! - The [`Genome`] / [`GenomeFactory`] abstraction
//! - k-means speciation over genome positions
//! - Complexity regulation and the novelty archive
//! - Serial and parallel genome evaluation
//! - The [`EvolutionAlgorithm`] with steady-state and queueing policies

mod complexity;
mod distance;
mod distribution;
mod engine;
mod error;
mod evaluator;
mod genome;
mod novelty;
mod sink;
mod speciation;
mod stats;

pub use complexity::{
    ComplexityRegulationStrategy, NullComplexityRegulation, ThresholdComplexityRegulation,
    complexity_regulation_from_config,
};
pub use distance::{DistanceMetric, EuclideanDistance, ManhattanDistance, mean_centroid, metric_from_config};
pub use distribution::DiscreteDistribution;
pub use engine::{EvolutionAlgorithm, ProgressCallback, RunControl};
pub use error::EvolutionError;
pub use evaluator::{
    FitnessInfo, GenomeDecoder, GenomeEvaluator, GenomeListEvaluator, MinimalCriterion,
    PhenomeEvaluator,
};
pub use genome::{
    CoordinateVector, EvaluationInfo, Genome, GenomeFactory, IdGenerator, PositionCache,
};
pub use novelty::{ArchiveEntry, BehaviorDistance, EuclideanBehaviorDistance, NoveltyArchive};
pub use sink::{JsonLinesSink, StatisticsSink};
pub use speciation::{KMeansSpeciation, SpeciationStrategy, Specie};
pub use stats::MovingAverage;

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal genome, factory and evaluator for unit tests.

    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use rand::Rng;

    use super::*;
    use crate::schema::{ComplexityRegulationMode, GenerationRecord};

    #[derive(Debug, Clone)]
    pub struct TestGenome {
        id: u64,
        birth_generation: u64,
        info: EvaluationInfo,
        complexity: f64,
        coords: Vec<(u64, f64)>,
        position: PositionCache,
        specie_idx: Option<usize>,
    }

    impl TestGenome {
        pub fn new(id: u64, birth_generation: u64, coords: Vec<(u64, f64)>) -> Self {
            Self {
                id,
                birth_generation,
                info: EvaluationInfo::default(),
                complexity: coords.len().max(1) as f64,
                coords,
                position: PositionCache::default(),
                specie_idx: None,
            }
        }

        pub fn at(id: u64, coords: &[(u64, f64)]) -> Self {
            Self::new(id, 0, coords.to_vec())
        }

        pub fn with_fitness(id: u64, birth_generation: u64, fitness: f64) -> Self {
            let mut genome = Self::new(id, birth_generation, vec![(0, id as f64)]);
            genome.info.fitness = fitness;
            genome
        }

        pub fn with_behavior(id: u64, behavior: Vec<f64>) -> Self {
            let mut genome = Self::with_fitness(id, 0, 1.0);
            genome.info.behavior = behavior;
            genome
        }

        pub fn complexity_of(mut self, complexity: f64) -> Self {
            self.complexity = complexity;
            self
        }
    }

    impl Genome for TestGenome {
        fn id(&self) -> u64 {
            self.id
        }

        fn birth_generation(&self) -> u64 {
            self.birth_generation
        }

        fn evaluation_info(&self) -> &EvaluationInfo {
            &self.info
        }

        fn evaluation_info_mut(&mut self) -> &mut EvaluationInfo {
            &mut self.info
        }

        fn complexity(&self) -> f64 {
            self.complexity
        }

        fn position(&self) -> &CoordinateVector {
            self.position
                .get_or_compute(|| CoordinateVector::new(self.coords.clone()))
        }

        fn specie_idx(&self) -> Option<usize> {
            self.specie_idx
        }

        fn set_specie_idx(&mut self, idx: Option<usize>) {
            self.specie_idx = idx;
        }
    }

    /// Jitters parent coordinates; records every reproduction.
    #[derive(Debug)]
    pub struct TestFactory {
        ids: IdGenerator,
        pub asexual: usize,
        pub sexual: usize,
        pub mates: Vec<(u64, u64)>,
        pub modes: Vec<ComplexityRegulationMode>,
    }

    impl Default for TestFactory {
        fn default() -> Self {
            Self {
                ids: IdGenerator::new(1),
                asexual: 0,
                sexual: 0,
                mates: Vec::new(),
                modes: Vec::new(),
            }
        }
    }

    impl TestFactory {
        fn jitter<R: Rng + ?Sized>(coords: &[(u64, f64)], rng: &mut R) -> Vec<(u64, f64)> {
            coords
                .iter()
                .map(|&(k, v)| (k, v + rng.gen_range(-1.0..1.0)))
                .collect()
        }
    }

    impl GenomeFactory<TestGenome> for TestFactory {
        fn create_genome_list<R: Rng + ?Sized>(
            &mut self,
            count: usize,
            birth_generation: u64,
            rng: &mut R,
        ) -> Vec<TestGenome> {
            (0..count)
                .map(|_| {
                    let coords = vec![
                        (1, rng.gen_range(-20.0..20.0)),
                        (2, rng.gen_range(-20.0..20.0)),
                    ];
                    TestGenome::new(self.ids.next_id(), birth_generation, coords)
                })
                .collect()
        }

        fn create_offspring<R: Rng + ?Sized>(
            &mut self,
            parent: &TestGenome,
            birth_generation: u64,
            rng: &mut R,
        ) -> TestGenome {
            self.asexual += 1;
            let coords = Self::jitter(&parent.coords, rng);
            TestGenome::new(self.ids.next_id(), birth_generation, coords)
        }

        fn create_sexual_offspring<R: Rng + ?Sized>(
            &mut self,
            parent1: &TestGenome,
            parent2: &TestGenome,
            birth_generation: u64,
            rng: &mut R,
        ) -> TestGenome {
            self.sexual += 1;
            self.mates.push((parent1.id, parent2.id));
            let mut coords = parent1.coords.clone();
            coords.extend(parent2.coords.iter().map(|&(k, v)| (k + 100, v)));
            let coords = Self::jitter(&coords, rng);
            TestGenome::new(self.ids.next_id(), birth_generation, coords)
        }

        fn set_complexity_mode(&mut self, mode: ComplexityRegulationMode) {
            self.modes.push(mode);
        }
    }

    /// Decodes every genome to its id.
    pub struct IdDecoder;

    impl GenomeDecoder<TestGenome> for IdDecoder {
        type Phenome = u64;

        fn decode(&self, genome: &TestGenome) -> Option<u64> {
            Some(genome.id())
        }
    }

    /// Deterministic pseudo-random fitness in [0, 1) derived from the id.
    #[derive(Default)]
    pub struct HashFitness {
        updates: AtomicU64,
        stop_after: Option<u64>,
    }

    impl HashFitness {
        /// Report the stop condition after `updates` generations.
        pub fn stop_at(updates: u64) -> Self {
            Self {
                updates: AtomicU64::new(0),
                stop_after: Some(updates),
            }
        }
    }

    pub fn hash_fitness(id: u64) -> f64 {
        // splitmix64
        let mut z = id.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    impl PhenomeEvaluator<u64> for HashFitness {
        fn evaluate(&self, phenome: &mut u64, _generation: u64) -> FitnessInfo {
            let fitness = hash_fitness(*phenome);
            FitnessInfo::new(fitness).with_behavior(vec![fitness])
        }

        fn stop_condition_satisfied(&self) -> bool {
            self.stop_after
                .is_some_and(|limit| self.updates.load(Ordering::Relaxed) >= limit)
        }

        fn reset(&mut self) {
            self.updates.store(0, Ordering::Relaxed);
        }

        fn update<G: Genome>(&mut self, _population: &[G]) {
            self.updates.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Collects records into a shared vector.
    pub struct CollectingSink(pub Arc<Mutex<Vec<GenerationRecord>>>);

    impl StatisticsSink for CollectingSink {
        fn record(&mut self, record: &GenerationRecord) -> std::io::Result<()> {
            if let Ok(mut records) = self.0.lock() {
                records.push(record.clone());
            }
            Ok(())
        }
    }
}
