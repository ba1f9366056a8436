//! NEAT-style evolutionary algorithm engine.
//!
//! This crate evolves a population of genomes through speciation,
//! selection and reproduction, with complexity regulation, an optional
//! novelty archive and serial or parallel evaluation.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration, run state and statistics types
//! - `evolution`: The engine (genome abstraction, speciation, evaluation,
//!   search policies)
//! - `genomes`: A reference connection genome, network decoder and XOR task
//!
//! # Example
//!
//! ```rust,no_run
//! use neat_evolution::{
//!     evolution::{EvolutionAlgorithm, GenomeEvaluator},
//!     genomes::{ConnectionGenomeFactory, NetworkDecoder, XorEvaluator},
//!     schema::ExperimentConfig,
//! };
//!
//! let config = ExperimentConfig::default();
//! let factory = ConnectionGenomeFactory::new(config.genome.clone());
//! let evaluator = GenomeEvaluator::new(NetworkDecoder::new(&config.network), XorEvaluator::new());
//!
//! let mut algorithm = EvolutionAlgorithm::new(config.evolution, factory, evaluator)?;
//! algorithm.initialize_random()?;
//! algorithm.start_continue()?;
//!
//! println!("Best fitness: {}", algorithm.stats().max_fitness);
//! # Ok::<(), neat_evolution::evolution::EvolutionError>(())
//! ```

pub mod evolution;
pub mod genomes;
pub mod schema;

// Re-export commonly used types
pub use evolution::{EvolutionAlgorithm, EvolutionError, Genome, GenomeEvaluator, GenomeFactory};
pub use schema::{EvolutionConfig, EvolutionStats, ExperimentConfig, RunState};
