//! Speciation: k-means clustering of genomes in genotype space.

use log::{debug, warn};
use rayon::prelude::*;

use crate::schema::SpeciationConfig;

use super::distance::{DistanceMetric, ManhattanDistance, metric_from_config};
use super::genome::{CoordinateVector, Genome};

/// A niche of genetically similar genomes.
///
/// Members are indices into the population the species was built from.
/// They are only valid until the population is next modified; every
/// respeciation rebuilds them.
#[derive(Debug, Clone)]
pub struct Specie {
    /// Position in the species list.
    pub idx: usize,
    /// Cluster centroid.
    pub centroid: CoordinateVector,
    /// Population indices, fittest first once sorted.
    pub members: Vec<usize>,
    /// Mean member fitness.
    pub mean_fitness: f64,
    /// Fitness of the first (fittest) member.
    pub champion_fitness: f64,
}

impl Specie {
    /// Create an empty species around a centroid.
    pub fn new(idx: usize, centroid: CoordinateVector) -> Self {
        Self {
            idx,
            centroid,
            members: Vec::new(),
            mean_fitness: 0.0,
            champion_fitness: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sort members fittest first, youngest first among equals.
    pub fn sort_members<G: Genome>(&mut self, population: &[G]) {
        self.members.sort_by(|&a, &b| {
            let (ga, gb) = (&population[a], &population[b]);
            gb.fitness()
                .total_cmp(&ga.fitness())
                .then_with(|| gb.birth_generation().cmp(&ga.birth_generation()))
        });
    }

    /// Recompute mean and champion fitness. Assumes members are sorted.
    pub fn update_statistics<G: Genome>(&mut self, population: &[G]) {
        if self.members.is_empty() {
            self.mean_fitness = 0.0;
            self.champion_fitness = 0.0;
            return;
        }
        let total: f64 = self.members.iter().map(|&i| population[i].fitness()).sum();
        self.mean_fitness = total / self.members.len() as f64;
        self.champion_fitness = population[self.members[0]].fitness();
    }

    /// A species can only reproduce sexually when it has at least two
    /// members with strictly positive fitness.
    pub fn is_reproductively_viable<G: Genome>(&self, population: &[G]) -> bool {
        self.members.len() >= 2
            && self
                .members
                .iter()
                .filter(|&&i| population[i].fitness() > 0.0)
                .nth(1)
                .is_some()
    }
}

/// Partitions a genome collection into species.
pub trait SpeciationStrategy<G: Genome>: Send {
    /// Cluster `genomes` into (at most) `specie_count` non-empty species.
    fn speciate(&self, genomes: &mut [G], specie_count: usize) -> Vec<Specie>;

    /// Re-cluster `genomes` starting from the centroids of existing species.
    fn respeciate(&self, genomes: &mut [G], species: &mut Vec<Specie>);
}

/// k-means speciation with a pluggable distance metric.
pub struct KMeansSpeciation {
    metric: Box<dyn DistanceMetric>,
    max_iterations: usize,
    parallel: bool,
}

impl Default for KMeansSpeciation {
    fn default() -> Self {
        Self::new(Box::new(ManhattanDistance::default()), 5)
    }
}

impl KMeansSpeciation {
    /// Create a strategy with an iteration cap.
    pub fn new(metric: Box<dyn DistanceMetric>, max_iterations: usize) -> Self {
        Self {
            metric,
            max_iterations,
            parallel: false,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &SpeciationConfig) -> Self {
        Self::new(metric_from_config(&config.metric), config.max_iterations).parallel(config.parallel)
    }

    /// Run the nearest-centroid assignment on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn nearest(&self, position: &CoordinateVector, species: &[Specie]) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (idx, specie) in species.iter().enumerate() {
            let d = self.metric.distance(position, &specie.centroid);
            if d < best_distance {
                best_distance = d;
                best = idx;
            }
        }
        best
    }

    /// Nearest centroid for every genome.
    fn assign<G: Genome>(&self, genomes: &[G], species: &[Specie]) -> Vec<usize> {
        if self.parallel {
            genomes
                .par_iter()
                .map(|g| self.nearest(g.position(), species))
                .collect()
        } else {
            genomes
                .iter()
                .map(|g| self.nearest(g.position(), species))
                .collect()
        }
    }

    fn centroid_of<G: Genome>(&self, genomes: &[G], members: &[usize]) -> CoordinateVector {
        let points: Vec<&CoordinateVector> = members.iter().map(|&i| genomes[i].position()).collect();
        self.metric.centroid(&points)
    }

    /// Rebuild member lists from an assignment, fill empty species and
    /// recompute every centroid.
    fn rebuild<G: Genome>(&self, genomes: &[G], species: &mut [Specie], assignment: &mut [usize]) {
        for specie in species.iter_mut() {
            specie.members.clear();
        }
        for (genome_idx, &specie_idx) in assignment.iter().enumerate() {
            species[specie_idx].members.push(genome_idx);
        }
        for specie in species.iter_mut() {
            if !specie.is_empty() {
                specie.centroid = self.centroid_of(genomes, &specie.members);
            }
        }
        self.fill_empty_species(genomes, species, assignment);
    }

    /// Move the genome furthest from its own centroid into each empty
    /// species. Donors always keep at least one member.
    fn fill_empty_species<G: Genome>(
        &self,
        genomes: &[G],
        species: &mut [Specie],
        assignment: &mut [usize],
    ) {
        while let Some(empty_idx) = species.iter().position(Specie::is_empty) {
            let mut candidate: Option<(usize, usize, f64)> = None;
            for (specie_idx, specie) in species.iter().enumerate() {
                if specie.len() < 2 {
                    continue;
                }
                for (pos, &genome_idx) in specie.members.iter().enumerate() {
                    let d = self.metric.distance(genomes[genome_idx].position(), &specie.centroid);
                    if candidate.is_none_or(|(_, _, best)| d > best) {
                        candidate = Some((specie_idx, pos, d));
                    }
                }
            }

            let Some((donor_idx, pos, _)) = candidate else {
                // Fewer genomes than species; callers cap the species count so
                // this cannot happen.
                debug_assert!(false, "no donor species for empty species");
                return;
            };

            let genome_idx = species[donor_idx].members.swap_remove(pos);
            species[donor_idx].centroid = self.centroid_of(genomes, &species[donor_idx].members);
            species[empty_idx].members.push(genome_idx);
            species[empty_idx].centroid = genomes[genome_idx].position().clone();
            assignment[genome_idx] = empty_idx;
        }
    }

    /// Iterative relocation until assignments are stable or the cap is hit.
    fn relocate<G: Genome>(&self, genomes: &mut [G], species: &mut [Specie]) {
        let mut assignment = self.assign(genomes, species);
        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;
            self.rebuild(genomes, species, &mut assignment);
            let next = self.assign(genomes, species);
            if next == assignment {
                break;
            }
            assignment = next;
        }
        self.rebuild(genomes, species, &mut assignment);

        for (genome, &specie_idx) in genomes.iter_mut().zip(&assignment) {
            genome.set_specie_idx(Some(specie_idx));
        }
        debug!(
            "k-means converged after {} iterations into {} species",
            iterations,
            species.len()
        );
        debug_assert!(species.iter().all(|s| !s.is_empty()), "empty species after speciation");
    }
}

impl<G: Genome> SpeciationStrategy<G> for KMeansSpeciation {
    fn speciate(&self, genomes: &mut [G], specie_count: usize) -> Vec<Specie> {
        if genomes.is_empty() {
            return Vec::new();
        }

        let count = specie_count.clamp(1, genomes.len());
        if count < specie_count {
            warn!(
                "Only {} genomes available; reducing species count from {} to {}",
                genomes.len(),
                specie_count,
                count
            );
        }

        // Evenly sampled genomes seed the centroids
        let mut species: Vec<Specie> = (0..count)
            .map(|i| {
                let genome_idx = i * genomes.len() / count;
                Specie::new(i, genomes[genome_idx].position().clone())
            })
            .collect();

        self.relocate(genomes, &mut species);
        species
    }

    fn respeciate(&self, genomes: &mut [G], species: &mut Vec<Specie>) {
        if species.is_empty() {
            // No centroids to start from
            *species = self.speciate(genomes, 1);
            return;
        }
        if genomes.is_empty() {
            species.clear();
            return;
        }
        if species.len() > genomes.len() {
            warn!(
                "Only {} genomes available; dropping {} species",
                genomes.len(),
                species.len() - genomes.len()
            );
            species.truncate(genomes.len());
        }
        for (idx, specie) in species.iter_mut().enumerate() {
            specie.idx = idx;
            specie.members.clear();
        }
        self.relocate(genomes, species);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::test_support::TestGenome;
    use proptest::prelude::*;

    fn clustered_population() -> Vec<TestGenome> {
        // Three well separated clusters along innovation 1
        let mut genomes = Vec::new();
        for (cluster, center) in [0.0, 100.0, 200.0].into_iter().enumerate() {
            for i in 0..5 {
                let id = (cluster * 5 + i) as u64;
                genomes.push(TestGenome::at(id, &[(1, center + i as f64)]));
            }
        }
        genomes
    }

    #[test]
    fn test_speciate_finds_clusters() {
        let mut genomes = clustered_population();
        let strategy = KMeansSpeciation::default();
        let species = strategy.speciate(&mut genomes, 3);

        assert_eq!(species.len(), 3);
        for specie in &species {
            assert_eq!(specie.len(), 5);
            let first = genomes[specie.members[0]].position().coords()[0].1;
            for &m in &specie.members {
                let x = genomes[m].position().coords()[0].1;
                assert!((x - first).abs() < 10.0);
                assert_eq!(genomes[m].specie_idx(), Some(specie.idx));
            }
        }
    }

    #[test]
    fn test_identical_genomes_fill_every_species() {
        // k-means would put everything into one cluster
        let mut genomes: Vec<TestGenome> = (0..12).map(|id| TestGenome::at(id, &[(1, 1.0)])).collect();
        let species = KMeansSpeciation::default().speciate(&mut genomes, 4);
        assert_eq!(species.len(), 4);
        assert!(species.iter().all(|s| !s.is_empty()));
        assert_eq!(species.iter().map(Specie::len).sum::<usize>(), 12);
    }

    #[test]
    fn test_fewer_genomes_than_species() {
        let mut genomes: Vec<TestGenome> = (0..3).map(|id| TestGenome::at(id, &[(id, 1.0)])).collect();
        let species = KMeansSpeciation::default().speciate(&mut genomes, 10);
        assert_eq!(species.len(), 3);
        assert!(species.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn test_respeciate_keeps_species_count() {
        let mut genomes = clustered_population();
        let strategy = KMeansSpeciation::default().parallel(true);
        let mut species = strategy.speciate(&mut genomes, 3);

        // Replace one cluster entirely with new genomes near another
        for g in genomes.iter_mut().take(5) {
            *g = TestGenome::at(g.id() + 100, &[(1, 205.0)]);
        }
        strategy.respeciate(&mut genomes, &mut species);
        assert_eq!(species.len(), 3);
        assert!(species.iter().all(|s| !s.is_empty()));
        assert_eq!(species.iter().map(Specie::len).sum::<usize>(), 15);
    }

    #[test]
    fn test_sort_members_fittest_then_youngest() {
        let mut genomes = vec![
            TestGenome::with_fitness(0, 0, 1.0),
            TestGenome::with_fitness(1, 5, 2.0),
            TestGenome::with_fitness(2, 3, 2.0),
        ];
        let species = KMeansSpeciation::default().speciate(&mut genomes, 1);
        let mut specie = species[0].clone();
        specie.sort_members(&genomes);
        assert_eq!(specie.members, vec![1, 2, 0]);
        specie.update_statistics(&genomes);
        assert_eq!(specie.champion_fitness, 2.0);
        assert!((specie.mean_fitness - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reproductive_viability() {
        let genomes = vec![
            TestGenome::with_fitness(0, 0, 1.0),
            TestGenome::with_fitness(1, 0, 0.0),
            TestGenome::with_fitness(2, 0, 3.0),
        ];
        let mut specie = Specie::new(0, CoordinateVector::default());
        specie.members = vec![0];
        assert!(!specie.is_reproductively_viable(&genomes));
        specie.members = vec![0, 1];
        assert!(!specie.is_reproductively_viable(&genomes));
        specie.members = vec![0, 1, 2];
        assert!(specie.is_reproductively_viable(&genomes));
    }

    proptest! {
        #[test]
        fn prop_speciation_is_a_partition(
            values in prop::collection::vec((0u64..6, -50.0f64..50.0), 1..40),
            specie_count in 1usize..8,
        ) {
            let mut genomes: Vec<TestGenome> = values
                .iter()
                .enumerate()
                .map(|(i, &(key, v))| TestGenome::at(i as u64, &[(key, v)]))
                .collect();
            let species = KMeansSpeciation::default().speciate(&mut genomes, specie_count);

            prop_assert_eq!(species.len(), specie_count.min(genomes.len()));
            prop_assert!(species.iter().all(|s| !s.is_empty()));

            let mut seen = vec![0usize; genomes.len()];
            for specie in &species {
                for &m in &specie.members {
                    seen[m] += 1;
                    prop_assert_eq!(genomes[m].specie_idx(), Some(specie.idx));
                }
            }
            prop_assert!(seen.iter().all(|&c| c == 1));
        }
    }
}
