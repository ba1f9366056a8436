//! Connection-list genome with NEAT innovation tracking.
//!
//! Node ids are laid out as: `0` bias, `1..=inputs` inputs, then outputs,
//! then hidden nodes. Hidden nodes appear only through add-node mutations,
//! and splitting the same connection always yields the same node id.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::evolution::{
    CoordinateVector, DiscreteDistribution, EvaluationInfo, Genome, GenomeFactory, IdGenerator,
    PositionCache,
};
use crate::schema::{ComplexityRegulationMode, ConnectionGenomeConfig, MutationSettings};

/// A weighted connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub innovation_id: u64,
    pub source: u32,
    pub target: u32,
    pub weight: f64,
}

/// Genome made of innovation-sorted connection genes.
#[derive(Debug, Clone)]
pub struct ConnectionGenome {
    id: u64,
    birth_generation: u64,
    input_count: u32,
    output_count: u32,
    connections: Vec<ConnectionGene>,
    info: EvaluationInfo,
    position: PositionCache,
    specie_idx: Option<usize>,
}

impl ConnectionGenome {
    /// Build a genome. Connections are sorted by innovation id.
    pub fn new(
        id: u64,
        birth_generation: u64,
        input_count: u32,
        output_count: u32,
        mut connections: Vec<ConnectionGene>,
    ) -> Self {
        connections.sort_by_key(|c| c.innovation_id);
        Self {
            id,
            birth_generation,
            input_count,
            output_count,
            connections,
            info: EvaluationInfo::default(),
            position: PositionCache::default(),
            specie_idx: None,
        }
    }

    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    pub fn input_count(&self) -> u32 {
        self.input_count
    }

    pub fn output_count(&self) -> u32 {
        self.output_count
    }

    /// First node id available to hidden nodes.
    pub fn first_hidden_node(&self) -> u32 {
        1 + self.input_count + self.output_count
    }

    fn has_connection(&self, source: u32, target: u32) -> bool {
        self.connections
            .iter()
            .any(|c| c.source == source && c.target == target)
    }

    /// Hidden node ids referenced by any connection, ascending.
    pub fn hidden_nodes(&self) -> Vec<u32> {
        let first = self.first_hidden_node();
        let mut nodes: Vec<u32> = self
            .connections
            .iter()
            .flat_map(|c| [c.source, c.target])
            .filter(|&n| n >= first)
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }
}

impl Genome for ConnectionGenome {
    fn id(&self) -> u64 {
        self.id
    }

    fn birth_generation(&self) -> u64 {
        self.birth_generation
    }

    fn evaluation_info(&self) -> &EvaluationInfo {
        &self.info
    }

    fn evaluation_info_mut(&mut self) -> &mut EvaluationInfo {
        &mut self.info
    }

    fn complexity(&self) -> f64 {
        self.connections.len() as f64
    }

    fn position(&self) -> &CoordinateVector {
        self.position.get_or_compute(|| {
            CoordinateVector::new(
                self.connections
                    .iter()
                    .map(|c| (c.innovation_id, c.weight))
                    .collect(),
            )
        })
    }

    fn specie_idx(&self) -> Option<usize> {
        self.specie_idx
    }

    fn set_specie_idx(&mut self, idx: Option<usize>) {
        self.specie_idx = idx;
    }
}

/// Mutation operator picked for an offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    ConnectionWeight,
    AddConnection,
    AddNode,
    DeleteConnection,
}

const MUTATIONS: [Mutation; 4] = [
    Mutation::ConnectionWeight,
    Mutation::AddConnection,
    Mutation::AddNode,
    Mutation::DeleteConnection,
];

/// Creates and mutates [`ConnectionGenome`]s, tracking innovations so that
/// identical structural changes share ids across the population.
#[derive(Debug)]
pub struct ConnectionGenomeFactory {
    config: ConnectionGenomeConfig,
    ids: IdGenerator,
    innovations: HashMap<(u32, u32), u64>,
    next_innovation: u64,
    split_nodes: HashMap<u64, u32>,
    next_node: u32,
    mode: ComplexityRegulationMode,
    complexifying_ops: DiscreteDistribution,
    simplifying_ops: DiscreteDistribution,
}

impl ConnectionGenomeFactory {
    pub fn new(config: ConnectionGenomeConfig) -> Self {
        let next_node = 1 + config.input_count + config.output_count;
        Self {
            complexifying_ops: DiscreteDistribution::new(&config.complexifying.operator_weights()),
            simplifying_ops: DiscreteDistribution::new(&config.simplifying.operator_weights()),
            config,
            ids: IdGenerator::new(0),
            innovations: HashMap::new(),
            next_innovation: 0,
            split_nodes: HashMap::new(),
            next_node,
            mode: ComplexityRegulationMode::Complexifying,
        }
    }

    pub fn config(&self) -> &ConnectionGenomeConfig {
        &self.config
    }

    pub fn mode(&self) -> ComplexityRegulationMode {
        self.mode
    }

    /// Innovation id for a connection, allocating one on first sight.
    pub fn innovation_id(&mut self, source: u32, target: u32) -> u64 {
        let next = &mut self.next_innovation;
        *self.innovations.entry((source, target)).or_insert_with(|| {
            let id = *next;
            *next += 1;
            id
        })
    }

    /// Hidden node created by splitting the connection `innovation_id`.
    fn split_node(&mut self, innovation_id: u64) -> u32 {
        let next = &mut self.next_node;
        *self.split_nodes.entry(innovation_id).or_insert_with(|| {
            let node = *next;
            *next += 1;
            node
        })
    }

    fn random_weight<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(-self.config.weight_range..=self.config.weight_range)
    }

    fn settings(&self) -> &MutationSettings {
        match self.mode {
            ComplexityRegulationMode::Complexifying => &self.config.complexifying,
            ComplexityRegulationMode::Simplifying => &self.config.simplifying,
        }
    }

    fn child(&self, birth_generation: u64, connections: Vec<ConnectionGene>) -> ConnectionGenome {
        ConnectionGenome::new(
            self.ids.next_id(),
            birth_generation,
            self.config.input_count,
            self.config.output_count,
            connections,
        )
    }

    /// Apply one mutation operator, falling back to a weight mutation when
    /// the chosen operator cannot apply.
    fn mutate<R: Rng + ?Sized>(&mut self, genome: &mut ConnectionGenome, rng: &mut R) {
        let ops = match self.mode {
            ComplexityRegulationMode::Complexifying => &self.complexifying_ops,
            ComplexityRegulationMode::Simplifying => &self.simplifying_ops,
        };
        let mutation = MUTATIONS[ops.sample(rng)];
        let applied = match mutation {
            Mutation::ConnectionWeight => false,
            Mutation::AddConnection => self.add_connection(genome, rng),
            Mutation::AddNode => self.add_node(genome, rng),
            Mutation::DeleteConnection => delete_connection(genome, rng),
        };
        if !applied {
            self.mutate_weights(genome, rng);
        }
        genome.connections.sort_by_key(|c| c.innovation_id);
        genome.position.invalidate();
    }

    fn mutate_weights<R: Rng + ?Sized>(&self, genome: &mut ConnectionGenome, rng: &mut R) {
        if genome.connections.is_empty() {
            return;
        }
        let settings = self.settings();
        let (proportion, scale) = (settings.weight_gene_proportion, settings.weight_perturbation_scale);
        let range = self.config.weight_range;

        let forced = rng.gen_range(0..genome.connections.len());
        for (idx, gene) in genome.connections.iter_mut().enumerate() {
            if idx == forced || rng.r#gen::<f64>() < proportion {
                let noise: f64 = rng.sample(StandardNormal);
                gene.weight = (gene.weight + noise * scale).clamp(-range, range);
            }
        }
    }

    fn add_connection<R: Rng + ?Sized>(&mut self, genome: &mut ConnectionGenome, rng: &mut R) -> bool {
        let outputs_start = 1 + genome.input_count;
        let hidden = genome.hidden_nodes();
        let sources: Vec<u32> = (0..outputs_start).chain(hidden.iter().copied()).collect();
        let targets: Vec<u32> = (outputs_start..genome.first_hidden_node())
            .chain(hidden.iter().copied())
            .collect();

        for _ in 0..5 {
            let (Some(&source), Some(&target)) = (sources.choose(rng), targets.choose(rng)) else {
                return false;
            };
            if source == target || genome.has_connection(source, target) {
                continue;
            }
            let gene = ConnectionGene {
                innovation_id: self.innovation_id(source, target),
                source,
                target,
                weight: self.random_weight(rng),
            };
            genome.connections.push(gene);
            return true;
        }
        false
    }

    fn add_node<R: Rng + ?Sized>(&mut self, genome: &mut ConnectionGenome, rng: &mut R) -> bool {
        if genome.connections.is_empty() {
            return false;
        }
        let split_idx = rng.gen_range(0..genome.connections.len());
        let split = genome.connections[split_idx];
        let node = self.split_node(split.innovation_id);
        // The same split may already exist in this genome
        if genome.has_connection(split.source, node) || genome.has_connection(node, split.target) {
            return false;
        }

        genome.connections.swap_remove(split_idx);
        genome.connections.push(ConnectionGene {
            innovation_id: self.innovation_id(split.source, node),
            source: split.source,
            target: node,
            weight: 1.0,
        });
        genome.connections.push(ConnectionGene {
            innovation_id: self.innovation_id(node, split.target),
            source: node,
            target: split.target,
            weight: split.weight,
        });
        true
    }
}

fn delete_connection<R: Rng + ?Sized>(genome: &mut ConnectionGenome, rng: &mut R) -> bool {
    if genome.connections.len() < 2 {
        return false;
    }
    let idx = rng.gen_range(0..genome.connections.len());
    genome.connections.swap_remove(idx);
    true
}

/// NEAT crossover: matching genes are inherited from either parent at
/// random, disjoint and excess genes only from the fitter parent.
fn crossover<R: Rng + ?Sized>(
    fitter: &ConnectionGenome,
    other: &ConnectionGenome,
    rng: &mut R,
) -> Vec<ConnectionGene> {
    let other_genes: HashMap<u64, &ConnectionGene> = other
        .connections
        .iter()
        .map(|c| (c.innovation_id, c))
        .collect();
    fitter
        .connections
        .iter()
        .map(|gene| match other_genes.get(&gene.innovation_id) {
            Some(&matching) if rng.r#gen::<bool>() => *matching,
            _ => *gene,
        })
        .collect()
}

impl GenomeFactory<ConnectionGenome> for ConnectionGenomeFactory {
    fn create_genome_list<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        birth_generation: u64,
        rng: &mut R,
    ) -> Vec<ConnectionGenome> {
        let outputs_start = 1 + self.config.input_count;
        let first_hidden = outputs_start + self.config.output_count;
        let pairs: Vec<(u32, u32)> = (0..outputs_start)
            .flat_map(|source| (outputs_start..first_hidden).map(move |target| (source, target)))
            .collect();

        (0..count)
            .map(|_| {
                let mut connections: Vec<ConnectionGene> = Vec::new();
                for &(source, target) in &pairs {
                    if rng.r#gen::<f64>() < self.config.initial_connection_proportion {
                        connections.push(ConnectionGene {
                            innovation_id: self.innovation_id(source, target),
                            source,
                            target,
                            weight: self.random_weight(rng),
                        });
                    }
                }
                if connections.is_empty()
                    && let Some(&(source, target)) = pairs.choose(rng)
                {
                    connections.push(ConnectionGene {
                        innovation_id: self.innovation_id(source, target),
                        source,
                        target,
                        weight: self.random_weight(rng),
                    });
                }
                self.child(birth_generation, connections)
            })
            .collect()
    }

    fn create_offspring<R: Rng + ?Sized>(
        &mut self,
        parent: &ConnectionGenome,
        birth_generation: u64,
        rng: &mut R,
    ) -> ConnectionGenome {
        let mut child = self.child(birth_generation, parent.connections.clone());
        self.mutate(&mut child, rng);
        child
    }

    fn create_sexual_offspring<R: Rng + ?Sized>(
        &mut self,
        parent1: &ConnectionGenome,
        parent2: &ConnectionGenome,
        birth_generation: u64,
        rng: &mut R,
    ) -> ConnectionGenome {
        let (fitter, other) = if parent2.fitness() > parent1.fitness() {
            (parent2, parent1)
        } else {
            (parent1, parent2)
        };
        let connections = crossover(fitter, other, rng);
        let mut child = self.child(birth_generation, connections);
        self.mutate(&mut child, rng);
        child
    }

    fn set_complexity_mode(&mut self, mode: ComplexityRegulationMode) {
        self.mode = mode;
    }
}
