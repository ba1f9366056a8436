//! Recurrent network phenome decoded from a [`ConnectionGenome`].

use std::collections::HashMap;

use crate::evolution::GenomeDecoder;
use crate::schema::NetworkConfig;

use super::connection::ConnectionGenome;

/// Steepened logistic activation.
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-4.9 * x).exp())
}

/// Cyclic network activated for a fixed number of propagation steps.
///
/// Node layout follows the genome: bias, inputs, outputs, then hidden
/// nodes, compacted to dense indices.
#[derive(Debug, Clone)]
pub struct Network {
    input_count: usize,
    output_count: usize,
    /// `(source, target, weight)` over dense node indices.
    connections: Vec<(usize, usize, f64)>,
    activations: Vec<f64>,
    next: Vec<f64>,
    activation_steps: usize,
}

impl Network {
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn node_count(&self) -> usize {
        self.activations.len()
    }

    /// Clear all node state.
    pub fn reset(&mut self) {
        self.activations.fill(0.0);
    }

    /// Propagate `inputs` and return the output activations. Missing inputs
    /// read as zero.
    pub fn activate(&mut self, inputs: &[f64]) -> Vec<f64> {
        let fixed = 1 + self.input_count;
        self.activations[0] = 1.0;
        for (slot, &value) in self.activations[1..fixed].iter_mut().zip(inputs) {
            *slot = value;
        }

        for _ in 0..self.activation_steps {
            self.next.fill(0.0);
            for &(source, target, weight) in &self.connections {
                self.next[target] += self.activations[source] * weight;
            }
            for (node, &sum) in self.next.iter().enumerate().skip(fixed) {
                self.activations[node] = sigmoid(sum);
            }
        }

        self.activations[fixed..fixed + self.output_count].to_vec()
    }
}

/// Decodes connection genomes into [`Network`]s. Genomes without any
/// connection are non-viable.
#[derive(Debug, Clone)]
pub struct NetworkDecoder {
    activation_steps: usize,
}

impl NetworkDecoder {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            activation_steps: config.activation_steps.max(1),
        }
    }
}

impl Default for NetworkDecoder {
    fn default() -> Self {
        Self::new(&NetworkConfig::default())
    }
}

impl GenomeDecoder<ConnectionGenome> for NetworkDecoder {
    type Phenome = Network;

    fn decode(&self, genome: &ConnectionGenome) -> Option<Network> {
        if genome.connections().is_empty() {
            return None;
        }

        let first_hidden = genome.first_hidden_node();
        let hidden: HashMap<u32, usize> = genome
            .hidden_nodes()
            .into_iter()
            .enumerate()
            .map(|(i, node)| (node, first_hidden as usize + i))
            .collect();
        let index = |node: u32| -> usize {
            if node < first_hidden {
                node as usize
            } else {
                hidden[&node]
            }
        };

        let connections = genome
            .connections()
            .iter()
            .map(|c| (index(c.source), index(c.target), c.weight))
            .collect();
        let node_count = first_hidden as usize + hidden.len();

        Some(Network {
            input_count: genome.input_count() as usize,
            output_count: genome.output_count() as usize,
            connections,
            activations: vec![0.0; node_count],
            next: vec![0.0; node_count],
            activation_steps: self.activation_steps,
        })
    }
}
