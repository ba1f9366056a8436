//! Reference genome encoding, phenome decoder and evaluator.
//!
//! A minimal NEAT-style connection genome decoded to recurrent networks and
//! scored on XOR, used by the CLI and the integration tests.

mod connection;
mod network;
mod xor;

pub use connection::{ConnectionGene, ConnectionGenome, ConnectionGenomeFactory};
pub use network::{Network, NetworkDecoder};
pub use xor::XorEvaluator;
