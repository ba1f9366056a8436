//! Queueing policy: an unspeciated FIFO population with age-driven turnover.

use log::debug;

use crate::schema::QueueingConfig;

use super::EvolutionAlgorithm;
use crate::evolution::error::EvolutionError;
use crate::evolution::evaluator::GenomeListEvaluator;
use crate::evolution::genome::{Genome, GenomeFactory};

impl<G, F, E> EvolutionAlgorithm<G, F, E>
where
    G: Genome,
    F: GenomeFactory<G>,
    E: GenomeListEvaluator<G>,
{
    pub(super) fn step_queueing(&mut self, policy: &QueueingConfig) -> Result<(), EvolutionError> {
        let generation = self.generation;
        let count = policy.batch_size.min(self.population.len());

        // Oldest genomes are at the front
        let parents: Vec<G> = self.population.drain(..count).collect();
        let mut offspring: Vec<G> = parents
            .iter()
            .map(|parent| self.factory.create_offspring(parent, generation, &mut self.rng))
            .collect();
        self.population.extend(parents);

        self.evaluator.evaluate(&mut offspring, generation)?;
        let produced = offspring.len();
        offspring.retain(|g| g.evaluation_info().viable);
        if offspring.len() < produced {
            debug!(
                "Generation {}: discarded {} non-viable offspring",
                generation,
                produced - offspring.len()
            );
        }

        let excess = (self.population.len() + offspring.len())
            .saturating_sub(self.config.population.size);
        remove_oldest(&mut self.population, excess);

        let first_new = self.population.len();
        self.population.append(&mut offspring);
        if let Some(archive) = self.archive.as_mut() {
            for candidate in &self.population[first_new..] {
                archive.test_and_add(candidate, &self.population);
            }
            archive.update_threshold_parameters();
        }
        self.evaluator.retain_phenomes(&self.population);
        Ok(())
    }
}

/// Remove the `count` oldest genomes by birth generation. Among genomes of
/// the same age, those nearer the front of the queue go first.
pub(crate) fn remove_oldest<G: Genome>(population: &mut Vec<G>, count: usize) {
    if count == 0 {
        return;
    }
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by_key(|&i| (population[i].birth_generation(), i));

    let mut keep = vec![true; population.len()];
    for &idx in order.iter().take(count) {
        keep[idx] = false;
    }
    let mut flags = keep.into_iter();
    population.retain(|_| flags.next().unwrap_or(true));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::evaluator::GenomeEvaluator;
    use crate::evolution::test_support::{HashFitness, IdDecoder, TestFactory, TestGenome};
    use crate::schema::{EvolutionConfig, SearchPolicy};

    #[test]
    fn test_remove_oldest() {
        let mut population = vec![
            TestGenome::with_fitness(0, 3, 0.0),
            TestGenome::with_fitness(1, 1, 0.0),
            TestGenome::with_fitness(2, 1, 0.0),
            TestGenome::with_fitness(3, 0, 0.0),
        ];
        remove_oldest(&mut population, 2);
        let ids: Vec<u64> = population.iter().map(|g| g.id()).collect();
        assert_eq!(ids, vec![0, 2]);

        remove_oldest(&mut population, 0);
        assert_eq!(population.len(), 2);
    }

    #[test]
    fn test_queue_order_after_generation() {
        let mut config = EvolutionConfig::default();
        config.population.size = 6;
        config.policy = SearchPolicy::Queueing(QueueingConfig { batch_size: 2 });
        config.random_seed = Some(5);
        config.population.max_generations = Some(1);

        let evaluator = GenomeEvaluator::new(IdDecoder, HashFitness::default());
        let mut algo = EvolutionAlgorithm::new(config, TestFactory::default(), evaluator).unwrap();
        let seed: Vec<TestGenome> = (0..6).map(|i| TestGenome::at(100 + i, &[(1, i as f64)])).collect();
        algo.initialize(seed).unwrap();
        algo.start_continue().unwrap();

        let ids: Vec<u64> = algo.population().iter().map(|g| g.id()).collect();
        // 100, 101 were parents and went to the back; 102, 103 aged out
        assert_eq!(&ids[..4], &[104, 105, 100, 101]);
        let births: Vec<u64> = algo.population().iter().map(|g| g.birth_generation()).collect();
        assert_eq!(births, vec![0, 0, 0, 0, 1, 1]);
    }
}
