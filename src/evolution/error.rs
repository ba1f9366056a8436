//! Runtime errors raised by the evolution algorithm.

use thiserror::Error;

use crate::schema::{EvolutionConfigError, RunState};

/// Errors returned by fallible evolution operations.
#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),

    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: RunState,
    },

    #[error("seed population is empty")]
    EmptySeedPopulation,

    #[error("behavior has {actual} dimensions but the minimal criterion expects {expected}")]
    BehaviorDimensionMismatch { expected: usize, actual: usize },

    #[error("failed to build evaluation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("statistics sink error: {0}")]
    Sink(#[from] std::io::Error),
}
