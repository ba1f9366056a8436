//! Schema module - Configuration, statistics and progress types.

mod evolution;
mod experiment;
mod stats;

pub use evolution::*;
pub use experiment::*;
pub use stats::*;
