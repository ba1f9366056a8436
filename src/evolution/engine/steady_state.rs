//! Steady-state, speciated policy: one batch of offspring per generation.

use log::debug;
use rand::Rng;

use crate::schema::{RankingFitness, SteadyStateConfig};

use super::EvolutionAlgorithm;
use crate::evolution::distribution::DiscreteDistribution;
use crate::evolution::error::EvolutionError;
use crate::evolution::evaluator::GenomeListEvaluator;
use crate::evolution::genome::{Genome, GenomeFactory};
use crate::evolution::speciation::Specie;

impl<G, F, E> EvolutionAlgorithm<G, F, E>
where
    G: Genome,
    F: GenomeFactory<G>,
    E: GenomeListEvaluator<G>,
{
    pub(super) fn step_steady_state(
        &mut self,
        policy: &SteadyStateConfig,
    ) -> Result<(), EvolutionError> {
        let generation = self.generation;

        if generation % policy.population_evaluation_frequency == 0 {
            self.evaluator.reevaluate(&mut self.population, generation)?;
            self.species = self
                .speciation
                .speciate(&mut self.population, self.config.speciation.specie_count);
            self.sort_species();
            if let Some(archive) = self.archive.as_mut() {
                archive.update_threshold_parameters();
            }
            debug!(
                "Generation {}: population re-evaluated into {} species",
                generation,
                self.species.len()
            );
        }

        let mut offspring = create_offspring_batch(
            &self.population,
            &self.species,
            &mut self.factory,
            policy,
            policy.batch_size,
            generation,
            &mut self.rng,
        );

        if policy.relative_evaluation {
            let population_len = self.population.len();
            let mut combined = std::mem::take(&mut self.population);
            combined.append(&mut offspring);
            let result = self.evaluator.evaluate(&mut combined, generation);
            offspring = combined.split_off(population_len);
            self.population = combined;
            result?;
        } else {
            self.evaluator.evaluate(&mut offspring, generation)?;
        }

        let removed = remove_worst(
            &mut self.population,
            &self.species,
            offspring.len(),
            policy.ranking_fitness,
        );
        debug_assert_eq!(removed, offspring.len(), "removal/insertion imbalance");

        let first_new = self.population.len();
        self.population.append(&mut offspring);
        if let Some(archive) = self.archive.as_mut() {
            for candidate in &self.population[first_new..] {
                archive.test_and_add(candidate, &self.population);
            }
        }
        self.evaluator.retain_phenomes(&self.population);

        self.speciation.respeciate(&mut self.population, &mut self.species);
        self.sort_species();
        Ok(())
    }
}

/// Produce `count` offspring by fitness-proportionate selection.
///
/// A species is sampled by mean fitness, then a parent within it by genome
/// fitness. Species that cannot supply two distinct parents with positive
/// fitness always reproduce asexually.
pub(crate) fn create_offspring_batch<G, F, R>(
    population: &[G],
    species: &[Specie],
    factory: &mut F,
    policy: &SteadyStateConfig,
    count: usize,
    generation: u64,
    rng: &mut R,
) -> Vec<G>
where
    G: Genome,
    F: GenomeFactory<G>,
    R: Rng + ?Sized,
{
    let specie_weights: Vec<f64> = species.iter().map(|s| s.mean_fitness).collect();
    let specie_dist = DiscreteDistribution::new(&specie_weights);
    let genome_dists: Vec<DiscreteDistribution> = species
        .iter()
        .map(|s| {
            let weights: Vec<f64> = s.members.iter().map(|&i| population[i].fitness()).collect();
            DiscreteDistribution::new(&weights)
        })
        .collect();

    let mut offspring = Vec::with_capacity(count);
    for _ in 0..count {
        let specie_idx = specie_dist.sample(rng);
        let specie = &species[specie_idx];
        let parent_pos = genome_dists[specie_idx].sample(rng);
        let parent1 = &population[specie.members[parent_pos]];

        let asexual = rng.r#gen::<f64>() < policy.offspring_asexual_proportion
            || !specie.is_reproductively_viable(population);
        if asexual {
            offspring.push(factory.create_offspring(parent1, generation, rng));
            continue;
        }

        let parent2 = if rng.r#gen::<f64>() < policy.interspecies_mating_proportion {
            let other_idx = specie_dist.sample(rng);
            let other = &species[other_idx];
            &population[other.members[genome_dists[other_idx].sample(rng)]]
        } else {
            let mate_pos = genome_dists[specie_idx].remove_outcome(parent_pos).sample(rng);
            &population[specie.members[mate_pos]]
        };
        offspring.push(factory.create_sexual_offspring(parent1, parent2, generation, rng));
    }
    offspring
}

/// Remove the `count` genomes with the lowest fitness divided by their
/// species size, oldest first among ties. Returns the number removed.
pub(crate) fn remove_worst<G: Genome>(
    population: &mut Vec<G>,
    species: &[Specie],
    count: usize,
    ranking: RankingFitness,
) -> usize {
    let adjusted: Vec<f64> = population
        .iter()
        .map(|g| {
            let specie_size = g
                .specie_idx()
                .and_then(|idx| species.get(idx))
                .map_or(1, Specie::len)
                .max(1);
            g.evaluation_info().ranking_fitness(ranking) / specie_size as f64
        })
        .collect();

    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| {
        adjusted[a]
            .total_cmp(&adjusted[b])
            .then_with(|| population[a].birth_generation().cmp(&population[b].birth_generation()))
            .then(a.cmp(&b))
    });

    let count = count.min(population.len());
    let mut keep = vec![true; population.len()];
    for &idx in &order[..count] {
        keep[idx] = false;
    }
    let mut flags = keep.into_iter();
    population.retain(|_| flags.next().unwrap_or(true));
    count
}
