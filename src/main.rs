//! NEAT evolution CLI - Evolve XOR networks from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use neat_evolution::{
    evolution::{EvolutionAlgorithm, Genome, GenomeEvaluator, JsonLinesSink},
    genomes::{ConnectionGenomeFactory, NetworkDecoder, XorEvaluator},
    schema::{EvolutionProgress, ExperimentConfig},
};

fn print_usage(program: &str) {
    eprintln!("Usage: {} <config.json> [generations] [--stats <file>]", program);
    eprintln!();
    eprintln!("Evolve XOR-solving networks from JSON configuration.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.json     Path to experiment configuration file");
    eprintln!("  generations     Maximum generations (default: 500 unless configured)");
    eprintln!("  --stats <file>  Write one JSON record per generation to <file>");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let mut generations: Option<u64> = None;
    let mut stats_path: Option<PathBuf> = None;

    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        if arg == "--stats" {
            let Some(path) = rest.next() else {
                eprintln!("--stats requires a file path");
                std::process::exit(1);
            };
            stats_path = Some(PathBuf::from(path));
        } else {
            generations = Some(arg.parse().unwrap_or_else(|e| {
                eprintln!("Invalid generation count '{}': {}", arg, e);
                std::process::exit(1);
            }));
        }
    }

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: ExperimentConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(generations) = generations {
        config.evolution.population.max_generations = Some(generations);
    } else if config.evolution.population.max_generations.is_none()
        && config.evolution.population.max_evaluations.is_none()
    {
        config.evolution.population.max_generations = Some(500);
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    println!("NEAT Evolution: XOR");
    println!("===================");
    println!("Population: {}", config.evolution.population.size);
    println!("Species: {}", config.evolution.speciation.specie_count);
    println!("Batch size: {}", config.evolution.policy.batch_size());
    println!(
        "Genome: {} inputs, {} outputs",
        config.genome.input_count, config.genome.output_count
    );
    println!();

    let factory = ConnectionGenomeFactory::new(config.genome.clone());
    let evaluator = GenomeEvaluator::from_config(
        NetworkDecoder::new(&config.network),
        XorEvaluator::new(),
        &config.evolution.evaluation,
    )
    .unwrap_or_else(|e| {
        eprintln!("Error creating evaluator: {}", e);
        std::process::exit(1);
    });

    let mut algorithm = EvolutionAlgorithm::new(config.evolution.clone(), factory, evaluator)
        .unwrap_or_else(|e| {
            eprintln!("Error creating algorithm: {}", e);
            std::process::exit(1);
        })
        .with_callback(print_progress);

    if let Some(path) = &stats_path {
        let sink = JsonLinesSink::create(path).unwrap_or_else(|e| {
            eprintln!("Error creating stats file: {}", e);
            std::process::exit(1);
        });
        algorithm = algorithm.with_statistics_sink(sink);
    }

    if let Err(e) = algorithm.initialize_random() {
        eprintln!("Error initializing population: {}", e);
        std::process::exit(1);
    }

    println!("Running evolution...");
    let start = Instant::now();

    if let Err(e) = algorithm.start_continue() {
        eprintln!("Evolution failed: {}", e);
        std::process::exit(1);
    }

    let elapsed = start.elapsed();
    let stats = algorithm.stats();

    println!();
    println!("Final state:");
    println!("  Generation: {}", stats.generation);
    println!("  Evaluations: {}", stats.total_evaluation_count);
    println!("  Stop reason: {:?}", algorithm.stop_reason());
    println!("  Solved: {}", algorithm.evaluator().phenome_evaluator().is_solved());
    if let Some(best) = algorithm.best_genome() {
        println!(
            "  Best genome: id={} fitness={:.6} connections={} hidden={}",
            best.id(),
            best.fitness(),
            best.connections().len(),
            best.hidden_nodes().len()
        );
    }
    println!(
        "Time: {:.2}s ({:.1} evaluations/s)",
        elapsed.as_secs_f32(),
        stats.total_evaluation_count as f32 / elapsed.as_secs_f32()
    );
}

fn print_progress(progress: &EvolutionProgress) {
    println!(
        "  Generation {}: best={:.4} mean={:.4} species={} complexity={:.2} ({:?})",
        progress.stats.generation,
        progress.best_fitness,
        progress.stats.mean_fitness,
        progress.stats.specie_count,
        progress.stats.mean_complexity,
        progress.mode
    );
}

fn print_example_config() {
    let config = ExperimentConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
