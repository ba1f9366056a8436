//! Configuration for the reference connection-genome experiment run by the CLI.

use serde::{Deserialize, Serialize};

use super::evolution::{EvolutionConfig, EvolutionConfigError, check_proportion};

/// Complete experiment configuration: the evolution algorithm plus the
/// genome encoding and phenome decoding it operates on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExperimentConfig {
    /// Evolution algorithm settings.
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Connection genome settings.
    #[serde(default)]
    pub genome: ConnectionGenomeConfig,

    /// Network activation settings.
    #[serde(default)]
    pub network: NetworkConfig,
}

impl ExperimentConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.evolution.validate()?;
        self.genome.validate()?;
        if self.network.activation_steps == 0 {
            return Err(EvolutionConfigError::InvalidGenome(
                "activation_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shape and mutation settings for connection genomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionGenomeConfig {
    /// Number of input nodes, excluding the bias node.
    #[serde(default = "default_input_count")]
    pub input_count: u32,

    /// Number of output nodes.
    #[serde(default = "default_output_count")]
    pub output_count: u32,

    /// Proportion of input/output pairs connected in a random genome.
    #[serde(default = "default_initial_connection_proportion")]
    pub initial_connection_proportion: f64,

    /// Weights are kept within `[-weight_range, weight_range]`.
    #[serde(default = "default_weight_range")]
    pub weight_range: f64,

    /// Mutation weights while complexifying.
    #[serde(default = "MutationSettings::complexifying")]
    pub complexifying: MutationSettings,

    /// Mutation weights while simplifying.
    #[serde(default = "MutationSettings::simplifying")]
    pub simplifying: MutationSettings,
}

impl Default for ConnectionGenomeConfig {
    fn default() -> Self {
        Self {
            input_count: default_input_count(),
            output_count: default_output_count(),
            initial_connection_proportion: default_initial_connection_proportion(),
            weight_range: default_weight_range(),
            complexifying: MutationSettings::complexifying(),
            simplifying: MutationSettings::simplifying(),
        }
    }
}

fn default_input_count() -> u32 {
    2
}
fn default_output_count() -> u32 {
    1
}
fn default_initial_connection_proportion() -> f64 {
    1.0
}
fn default_weight_range() -> f64 {
    5.0
}

impl ConnectionGenomeConfig {
    /// Validate genome settings.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        if self.input_count == 0 || self.output_count == 0 {
            return Err(EvolutionConfigError::InvalidGenome(
                "genomes need at least one input and one output".to_string(),
            ));
        }
        check_proportion(
            self.initial_connection_proportion,
            "initial_connection_proportion",
        )?;
        if self.weight_range <= 0.0 {
            return Err(EvolutionConfigError::InvalidGenome(format!(
                "weight range {} must be positive",
                self.weight_range
            )));
        }
        self.complexifying.validate("complexifying")?;
        self.simplifying.validate("simplifying")?;
        Ok(())
    }
}

/// Relative weights of the mutation operators; one operator is applied per
/// offspring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationSettings {
    pub connection_weight: f64,
    pub add_connection: f64,
    pub add_node: f64,
    pub delete_connection: f64,
    /// Proportion of connections perturbed by a weight mutation.
    #[serde(default = "default_weight_gene_proportion")]
    pub weight_gene_proportion: f64,
    /// Standard deviation of weight perturbations.
    #[serde(default = "default_weight_perturbation_scale")]
    pub weight_perturbation_scale: f64,
}

fn default_weight_gene_proportion() -> f64 {
    0.3
}
fn default_weight_perturbation_scale() -> f64 {
    0.5
}

impl MutationSettings {
    /// Structure-growing regime.
    pub fn complexifying() -> Self {
        Self {
            connection_weight: 0.94,
            add_connection: 0.03,
            add_node: 0.02,
            delete_connection: 0.01,
            weight_gene_proportion: default_weight_gene_proportion(),
            weight_perturbation_scale: default_weight_perturbation_scale(),
        }
    }

    /// Structure-pruning regime: no additions.
    pub fn simplifying() -> Self {
        Self {
            connection_weight: 0.6,
            add_connection: 0.0,
            add_node: 0.0,
            delete_connection: 0.4,
            weight_gene_proportion: default_weight_gene_proportion(),
            weight_perturbation_scale: default_weight_perturbation_scale(),
        }
    }

    /// Operator weights in the order weight, add connection, add node, delete.
    pub fn operator_weights(&self) -> [f64; 4] {
        [
            self.connection_weight,
            self.add_connection,
            self.add_node,
            self.delete_connection,
        ]
    }

    fn validate(&self, name: &str) -> Result<(), EvolutionConfigError> {
        let weights = self.operator_weights();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EvolutionConfigError::InvalidGenome(format!(
                "{name} mutation weights must be non-negative"
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(EvolutionConfigError::InvalidGenome(format!(
                "{name} mutation weights must not all be zero"
            )));
        }
        check_proportion(self.weight_gene_proportion, "weight_gene_proportion")
    }
}

/// Settings for decoding genomes into recurrent networks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Signal propagation steps per activation.
    #[serde(default = "default_activation_steps")]
    pub activation_steps: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            activation_steps: default_activation_steps(),
        }
    }
}

fn default_activation_steps() -> usize {
    3
}
