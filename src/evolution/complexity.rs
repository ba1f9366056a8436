//! Complexity regulation: deciding between complexifying and simplifying.

use log::debug;

use crate::schema::{
    ComplexityCeiling, ComplexityRegulationConfig, ComplexityRegulationMode, EvolutionStats,
};

/// Decides the mutation regime from the current population statistics.
pub trait ComplexityRegulationStrategy: Send {
    /// Mode to use for the next generation.
    fn determine_mode(&mut self, stats: &EvolutionStats) -> ComplexityRegulationMode;

    /// Forget all history and return to complexifying.
    fn reset(&mut self) {}
}

/// Always complexifying.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullComplexityRegulation;

impl ComplexityRegulationStrategy for NullComplexityRegulation {
    fn determine_mode(&mut self, _stats: &EvolutionStats) -> ComplexityRegulationMode {
        ComplexityRegulationMode::Complexifying
    }
}

/// Ceiling-based regulation with a hysteresis band.
///
/// Simplifying starts once mean complexity exceeds the ceiling and ends only
/// when it has dropped below `ceiling - margin` and at least
/// `min_simplification_generations` have passed.
#[derive(Debug, Clone)]
pub struct ThresholdComplexityRegulation {
    ceiling_type: ComplexityCeiling,
    margin: f64,
    min_simplification_generations: u64,
    /// Resolved ceiling; set lazily for relative ceilings.
    ceiling: Option<f64>,
    mode: ComplexityRegulationMode,
    last_transition_generation: u64,
}

impl ThresholdComplexityRegulation {
    pub fn new(ceiling: ComplexityCeiling, margin: f64, min_simplification_generations: u64) -> Self {
        let resolved = match ceiling {
            ComplexityCeiling::Absolute { value } => Some(value),
            ComplexityCeiling::Relative { .. } => None,
        };
        Self {
            ceiling_type: ceiling,
            margin,
            min_simplification_generations,
            ceiling: resolved,
            mode: ComplexityRegulationMode::Complexifying,
            last_transition_generation: 0,
        }
    }

    /// Current ceiling, if resolved.
    pub fn ceiling(&self) -> Option<f64> {
        self.ceiling
    }

    pub fn mode(&self) -> ComplexityRegulationMode {
        self.mode
    }

    fn rebase_ceiling(&mut self, mean_complexity: f64) {
        if let ComplexityCeiling::Relative { value } = self.ceiling_type {
            self.ceiling = Some(mean_complexity + value);
        }
    }
}

impl ComplexityRegulationStrategy for ThresholdComplexityRegulation {
    fn determine_mode(&mut self, stats: &EvolutionStats) -> ComplexityRegulationMode {
        if self.ceiling.is_none() {
            self.rebase_ceiling(stats.mean_complexity);
        }
        let ceiling = self.ceiling.unwrap_or(f64::INFINITY);

        match self.mode {
            ComplexityRegulationMode::Complexifying => {
                if stats.mean_complexity > ceiling {
                    self.mode = ComplexityRegulationMode::Simplifying;
                    self.last_transition_generation = stats.generation;
                    debug!(
                        "Generation {}: mean complexity {:.2} above ceiling {:.2}, simplifying",
                        stats.generation, stats.mean_complexity, ceiling
                    );
                }
            }
            ComplexityRegulationMode::Simplifying => {
                let elapsed = stats.generation.saturating_sub(self.last_transition_generation);
                if elapsed >= self.min_simplification_generations
                    && stats.mean_complexity < ceiling - self.margin
                {
                    self.mode = ComplexityRegulationMode::Complexifying;
                    self.last_transition_generation = stats.generation;
                    self.rebase_ceiling(stats.mean_complexity);
                    debug!(
                        "Generation {}: mean complexity {:.2} below {:.2}, complexifying",
                        stats.generation,
                        stats.mean_complexity,
                        ceiling - self.margin
                    );
                }
            }
        }
        self.mode
    }

    fn reset(&mut self) {
        *self = Self::new(
            self.ceiling_type,
            self.margin,
            self.min_simplification_generations,
        );
    }
}

/// Build the strategy described by a config.
pub fn complexity_regulation_from_config(
    config: &ComplexityRegulationConfig,
) -> Box<dyn ComplexityRegulationStrategy> {
    match *config {
        ComplexityRegulationConfig::Null => Box::new(NullComplexityRegulation),
        ComplexityRegulationConfig::Threshold {
            ceiling,
            margin,
            min_simplification_generations,
        } => Box::new(ThresholdComplexityRegulation::new(
            ceiling,
            margin,
            min_simplification_generations,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComplexityRegulationMode::{Complexifying, Simplifying};

    fn stats(generation: u64, mean_complexity: f64) -> EvolutionStats {
        EvolutionStats {
            generation,
            mean_complexity,
            ..Default::default()
        }
    }

    #[test]
    fn test_null_always_complexifying() {
        let mut strategy = NullComplexityRegulation;
        assert_eq!(strategy.determine_mode(&stats(1, 1e9)), Complexifying);
    }

    #[test]
    fn test_hysteresis_band() {
        let mut strategy =
            ThresholdComplexityRegulation::new(ComplexityCeiling::Absolute { value: 100.0 }, 10.0, 0);

        assert_eq!(strategy.determine_mode(&stats(1, 90.0)), Complexifying);
        assert_eq!(strategy.determine_mode(&stats(2, 101.0)), Simplifying);
        // Dipping just below the ceiling is not enough
        assert_eq!(strategy.determine_mode(&stats(3, 99.0)), Simplifying);
        assert_eq!(strategy.determine_mode(&stats(4, 95.0)), Simplifying);
        assert_eq!(strategy.determine_mode(&stats(5, 90.0)), Simplifying);
        assert_eq!(strategy.determine_mode(&stats(6, 89.9)), Complexifying);
        // And climbing back between the band and the ceiling stays complexifying
        assert_eq!(strategy.determine_mode(&stats(7, 95.0)), Complexifying);
    }

    #[test]
    fn test_min_simplification_generations() {
        let mut strategy =
            ThresholdComplexityRegulation::new(ComplexityCeiling::Absolute { value: 50.0 }, 5.0, 3);
        assert_eq!(strategy.determine_mode(&stats(10, 60.0)), Simplifying);
        assert_eq!(strategy.determine_mode(&stats(11, 10.0)), Simplifying);
        assert_eq!(strategy.determine_mode(&stats(12, 10.0)), Simplifying);
        assert_eq!(strategy.determine_mode(&stats(13, 10.0)), Complexifying);
    }

    #[test]
    fn test_relative_ceiling_rebases() {
        let mut strategy =
            ThresholdComplexityRegulation::new(ComplexityCeiling::Relative { value: 20.0 }, 2.0, 0);
        assert_eq!(strategy.determine_mode(&stats(1, 10.0)), Complexifying);
        assert_eq!(strategy.ceiling(), Some(30.0));
        assert_eq!(strategy.determine_mode(&stats(2, 31.0)), Simplifying);
        assert_eq!(strategy.determine_mode(&stats(3, 27.0)), Complexifying);
        assert_eq!(strategy.ceiling(), Some(47.0));

        strategy.reset();
        assert_eq!(strategy.ceiling(), None);
        assert_eq!(strategy.mode(), Complexifying);
    }
}
