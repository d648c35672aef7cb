//! Stochastic mutation of population members
//!
//! Each evolution cycle assigns exactly one mutation category per member via
//! a weighted random draw, then applies that category's transformation:
//!
//! - no mutation: the member passes through unchanged
//! - architecture: add/remove a hidden layer or grow/shrink a layer, within
//!   the network's declared bounds
//! - parameters: magnitude-scaled Gaussian noise on a random subset of
//!   weight tensors
//! - activation: swap one hidden layer's nonlinearity
//! - RL hyperparameter: perturb one declared hyperparameter within its
//!   descriptor bounds
//!
//! Out-of-range draws are clamped, never rejected; a validated engine does
//! not fail mid-run. When elitism is on, the elite in slot 0 bypasses
//! mutation entirely.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::agent::EvolvableAgent;
use crate::error::EvolveError;
use crate::net::Activation;

/// Node-count deltas drawn for layer grow/shrink mutations
const NODE_DELTAS: [usize; 3] = [16, 32, 64];

/// Mutation category applied to a population member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    /// Passed through unchanged
    None,
    /// Hidden layer or node-count change
    Architecture,
    /// Gaussian weight noise
    Parameters,
    /// Activation swap on one hidden layer
    Activation,
    /// One RL hyperparameter perturbed
    RlHp,
}

/// Category probabilities and noise scale for the mutation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability of passing a member through unchanged
    pub no_mutation: f64,

    /// Probability of an architecture mutation
    pub architecture: f64,

    /// Within an architecture mutation, probability of a layer add/remove
    /// (otherwise a node-count change is applied)
    pub new_layer_prob: f64,

    /// Probability of Gaussian weight noise
    pub parameters: f64,

    /// Probability of an activation swap
    pub activation: f64,

    /// Probability of an RL-hyperparameter mutation
    pub rl_hp: f64,

    /// Standard deviation of mutation noise
    pub mutation_sd: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            no_mutation: 0.2,
            architecture: 0.2,
            new_layer_prob: 0.2,
            parameters: 0.2,
            activation: 0.2,
            rl_hp: 0.2,
            mutation_sd: 0.1,
        }
    }
}

impl MutationConfig {
    /// Validate probabilities before the run starts
    ///
    /// Category probabilities must be non-negative and sum to 1.
    pub fn validate(&self) -> Result<(), EvolveError> {
        let probs = [
            self.no_mutation,
            self.architecture,
            self.parameters,
            self.activation,
            self.rl_hp,
        ];
        if probs.iter().any(|&p| !(0.0..=1.0).contains(&p)) {
            return Err(EvolveError::Configuration(
                "mutation probabilities must lie in [0, 1]".into(),
            ));
        }
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EvolveError::Configuration(format!(
                "mutation probabilities sum to {}, expected 1",
                sum
            )));
        }
        if !(0.0..=1.0).contains(&self.new_layer_prob) {
            return Err(EvolveError::Configuration(
                "new_layer_prob must lie in [0, 1]".into(),
            ));
        }
        if !self.mutation_sd.is_finite() || self.mutation_sd <= 0.0 {
            return Err(EvolveError::Configuration(
                "mutation_sd must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Mutation engine applying one category per member per cycle
#[derive(Debug, Clone)]
pub struct Mutations {
    config: MutationConfig,
    category_weights: WeightedIndex<f64>,
    noise: Normal<f64>,
}

impl Mutations {
    /// Build an engine from a validated config
    pub fn new(config: MutationConfig) -> Result<Self, EvolveError> {
        config.validate()?;
        let category_weights = WeightedIndex::new([
            config.no_mutation,
            config.architecture,
            config.parameters,
            config.activation,
            config.rl_hp,
        ])
        .map_err(|e| EvolveError::Configuration(format!("mutation weights: {}", e)))?;
        let noise = Normal::new(0.0, config.mutation_sd)
            .map_err(|e| EvolveError::Configuration(format!("mutation_sd: {}", e)))?;
        Ok(Self { config, category_weights, noise })
    }

    /// Engine configuration
    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Mutate a freshly selected generation in place
    ///
    /// Members arrive as independent clones from tournament selection; each
    /// receives one weighted category draw. With `preserve_elite` the member
    /// in slot 0 bypasses mutation entirely. Never fails for a well-formed
    /// population.
    pub fn mutation<A: EvolvableAgent>(
        &self,
        mut population: Vec<A>,
        preserve_elite: bool,
        rng: &mut StdRng,
    ) -> Vec<A> {
        for (slot, agent) in population.iter_mut().enumerate() {
            if preserve_elite && slot == 0 {
                agent.state_mut().last_mutation = MutationKind::None;
                continue;
            }
            let kind = match self.category_weights.sample(rng) {
                0 => MutationKind::None,
                1 => self.architecture_mutation(agent, rng),
                2 => self.parameters_mutation(agent, rng),
                3 => self.activation_mutation(agent, rng),
                _ => self.rl_hp_mutation(agent, rng),
            };
            agent.state_mut().last_mutation = kind;
        }
        population
    }

    /// Add/remove a layer or grow/shrink one, within declared bounds
    ///
    /// A layer edit refused at a bound falls back to a node edit, and a node
    /// edit refused at a bound retries in the opposite direction, so a
    /// member drawn for architecture mutation changes whenever the bounds
    /// leave any room.
    fn architecture_mutation<A: EvolvableAgent>(
        &self,
        agent: &mut A,
        rng: &mut StdRng,
    ) -> MutationKind {
        let changed = {
            let net = agent.actor_mut();
            let mut changed = false;
            if rng.gen::<f64>() < self.config.new_layer_prob {
                changed = if rng.gen_bool(0.5) {
                    net.add_layer(rng)
                } else {
                    net.remove_layer(rng)
                };
            }
            if !changed {
                let idx = rng.gen_range(0..net.num_hidden_layers());
                let count = *NODE_DELTAS.choose(rng).unwrap_or(&NODE_DELTAS[0]);
                changed = if rng.gen_bool(0.5) {
                    net.add_nodes(idx, count, rng) || net.remove_nodes(idx, count, rng)
                } else {
                    net.remove_nodes(idx, count, rng) || net.add_nodes(idx, count, rng)
                };
            }
            changed
        };
        if changed {
            agent.on_architecture_change();
            MutationKind::Architecture
        } else {
            MutationKind::None
        }
    }

    /// Gaussian noise on a random subset of weight tensors
    fn parameters_mutation<A: EvolvableAgent>(
        &self,
        agent: &mut A,
        rng: &mut StdRng,
    ) -> MutationKind {
        let net = agent.actor_mut();
        let num_layers = net.layers().len();
        let sd = self.config.mutation_sd as f32;

        let mut any = false;
        for idx in 0..num_layers {
            if rng.gen_bool(0.5) {
                net.perturb_layer(idx, sd, rng);
                any = true;
            }
        }
        if !any {
            let idx = rng.gen_range(0..num_layers);
            net.perturb_layer(idx, sd, rng);
        }
        MutationKind::Parameters
    }

    /// Swap one hidden layer's nonlinearity, keeping all weights
    ///
    /// Output activations are action-space determined and skipped.
    fn activation_mutation<A: EvolvableAgent>(
        &self,
        agent: &mut A,
        rng: &mut StdRng,
    ) -> MutationKind {
        let net = agent.actor_mut();
        let idx = rng.gen_range(0..net.num_hidden_layers());
        let current = net.hidden_activations()[idx];
        let candidates: Vec<Activation> = Activation::MUTABLE
            .iter()
            .copied()
            .filter(|&a| a != current)
            .collect();
        match candidates.choose(rng) {
            Some(&replacement) if net.set_layer_activation(idx, replacement) => {
                MutationKind::Activation
            }
            _ => MutationKind::None,
        }
    }

    /// Perturb one uniformly chosen declared hyperparameter
    fn rl_hp_mutation<A: EvolvableAgent>(&self, agent: &mut A, rng: &mut StdRng) -> MutationKind {
        let parameter = {
            let params = agent.hp_config().parameters();
            match params.choose(rng) {
                Some(p) => p.clone(),
                None => return MutationKind::None,
            }
        };
        let Some(current) = agent.hp_value(&parameter.name) else {
            return MutationKind::None;
        };
        let mutated = parameter.mutate(current, self.noise.sample(rng));
        if agent.set_hp_value(&parameter.name, mutated) {
            MutationKind::RlHp
        } else {
            MutationKind::None
        }
    }
}
