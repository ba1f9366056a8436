//! Benchmarks for speciation and generation throughput.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use neat_evolution::{
    evolution::{
        EvolutionAlgorithm, GenomeEvaluator, GenomeFactory, KMeansSpeciation, SpeciationStrategy,
    },
    genomes::{ConnectionGenome, ConnectionGenomeFactory, NetworkDecoder, XorEvaluator},
    schema::{ConnectionGenomeConfig, EvolutionConfig, NetworkConfig},
};

fn random_population(size: usize) -> Vec<ConnectionGenome> {
    let mut factory = ConnectionGenomeFactory::new(ConnectionGenomeConfig {
        input_count: 8,
        output_count: 4,
        ..ConnectionGenomeConfig::default()
    });
    let mut rng = StdRng::seed_from_u64(42);
    factory.create_genome_list(size, 0, &mut rng)
}

fn bench_kmeans_speciation(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans_speciation");

    for size in [100, 500, 2000] {
        let mut genomes = random_population(size);

        for parallel in [false, true] {
            let strategy = KMeansSpeciation::default().parallel(parallel);
            let label = if parallel { "parallel" } else { "serial" };

            group.bench_with_input(
                BenchmarkId::new(label, size),
                &size,
                |b, _| {
                    b.iter(|| strategy.speciate(black_box(&mut genomes), 10));
                },
            );
        }
    }

    group.finish();
}

fn bench_steady_state_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_state_generation");

    for size in [150, 600] {
        let mut config = EvolutionConfig::default();
        config.population.size = size;
        config.population.max_generations = Some(1);
        config.random_seed = Some(42);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                || {
                    let factory = ConnectionGenomeFactory::new(ConnectionGenomeConfig::default());
                    let evaluator = GenomeEvaluator::new(
                        NetworkDecoder::new(&NetworkConfig::default()),
                        XorEvaluator::new(),
                    );
                    let mut algorithm =
                        EvolutionAlgorithm::new(config.clone(), factory, evaluator).unwrap();
                    algorithm.initialize_random().unwrap();
                    algorithm
                },
                |mut algorithm| {
                    algorithm.start_continue().unwrap();
                    algorithm
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kmeans_speciation, bench_steady_state_generation);
criterion_main!(benches);
