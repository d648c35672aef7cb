//! Population member capability contract
//!
//! The orchestration loop, tournament selector, and mutation engine are all
//! generic over [`EvolvableAgent`] and never branch on a concrete algorithm.
//! An agent bundles a policy/value network, optimizer state, a mutable
//! hyperparameter set, and running histories of fitness and environment
//! steps. Cloning an agent must produce a deep, independent copy: two
//! generations may never share mutable buffers.

pub mod dqn;

use rand::rngs::StdRng;

use crate::buffer::TransitionBatch;
use crate::env::Environment;
use crate::hpo::mutation::MutationKind;
use crate::hpo::space::HyperparamConfig;
use crate::net::EvolvableMlp;

/// Bookkeeping shared by every population member
#[derive(Debug, Clone)]
pub struct AgentState {
    /// Slot index within the population
    pub index: usize,

    /// Learning rate
    pub lr: f64,

    /// Minibatch size drawn from the replay buffer per update
    pub batch_size: usize,

    /// Environment steps between learning iterations
    pub learn_step: usize,

    /// Evaluation returns, one per evolution cycle
    pub fitness: Vec<f64>,

    /// Rollout episode scores collected during training
    pub scores: Vec<f64>,

    /// Cumulative environment steps, recorded per cycle
    pub steps: Vec<u64>,

    /// Mutation category applied when this member was produced
    pub last_mutation: MutationKind,

    /// Whether the agent is in training mode (exploration on)
    pub training: bool,
}

impl AgentState {
    /// Create fresh bookkeeping for population slot `index`
    pub fn new(index: usize, lr: f64, batch_size: usize, learn_step: usize) -> Self {
        Self {
            index,
            lr,
            batch_size,
            learn_step,
            fitness: Vec::new(),
            scores: Vec::new(),
            steps: Vec::new(),
            last_mutation: MutationKind::None,
            training: true,
        }
    }

    /// Cumulative environment steps taken so far
    pub fn total_steps(&self) -> u64 {
        self.steps.last().copied().unwrap_or(0)
    }
}

/// Capability set of one trainable population member
///
/// `Clone` is required to be a deep copy; the bundled agents hold only owned
/// vectors, so the derived clone satisfies this.
pub trait EvolvableAgent: Clone + Send {
    /// Choose an action for one observation under epsilon exploration
    ///
    /// `epsilon = 0` is the greedy policy used for evaluation. Exploration
    /// applies only while the agent is in training mode; with training mode
    /// off the policy is greedy regardless of epsilon.
    fn get_action(&self, observation: &[f32], epsilon: f64, rng: &mut StdRng) -> i64;

    /// Update parameters from one sampled minibatch
    fn learn(&mut self, batch: &TransitionBatch) -> anyhow::Result<()>;

    /// Policy/value network the mutation engine operates on
    fn actor(&self) -> &EvolvableMlp;

    /// Mutable access to the network for structural mutation
    fn actor_mut(&mut self) -> &mut EvolvableMlp;

    /// React to an architecture change
    ///
    /// Momentum/accumulator buffers sized to the old topology must be
    /// reinitialized here, along with any auxiliary networks (e.g. a target
    /// network) that mirror the actor's shape.
    fn on_architecture_change(&mut self);

    /// Declared mutable hyperparameters for this agent family
    fn hp_config(&self) -> &HyperparamConfig;

    /// Shared bookkeeping
    fn state(&self) -> &AgentState;

    /// Mutable bookkeeping
    fn state_mut(&mut self) -> &mut AgentState;

    /// Resolve a hyperparameter value by descriptor name
    fn hp_value(&self, name: &str) -> Option<f64> {
        match name {
            "lr" => Some(self.state().lr),
            "batch_size" => Some(self.state().batch_size as f64),
            "learn_step" => Some(self.state().learn_step as f64),
            _ => None,
        }
    }

    /// Write a mutated hyperparameter value back by descriptor name
    ///
    /// Returns `false` for names the agent does not recognize.
    fn set_hp_value(&mut self, name: &str, value: f64) -> bool {
        match name {
            "lr" => self.state_mut().lr = value,
            "batch_size" => self.state_mut().batch_size = (value.round() as usize).max(1),
            "learn_step" => self.state_mut().learn_step = (value.round() as usize).max(1),
            _ => return false,
        }
        true
    }

    /// Toggle exploration/training behavior
    fn set_training_mode(&mut self, training: bool) {
        self.state_mut().training = training;
    }

    /// Evaluate the agent greedily and return the mean episode return
    ///
    /// Runs `loops` episodes of at most `max_steps` each with exploration
    /// disabled; the mean return is the agent's fitness sample for the
    /// cycle.
    fn test<E: Environment>(
        &self,
        env: &mut E,
        max_steps: usize,
        loops: usize,
        rng: &mut StdRng,
    ) -> f64 {
        let loops = loops.max(1);
        let mut total = 0.0;
        for _ in 0..loops {
            let mut observation = env.reset();
            let mut episode_return = 0.0;
            for _ in 0..max_steps {
                let action = self.get_action(&observation, 0.0, rng);
                let step = env.step(action);
                episode_return += f64::from(step.reward);
                observation = step.observation;
                if step.terminated || step.truncated {
                    break;
                }
            }
            total += episode_return;
        }
        total / loops as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_histories_start_empty() {
        let state = AgentState::new(3, 1e-3, 64, 4);
        assert_eq!(state.index, 3);
        assert!(state.fitness.is_empty());
        assert_eq!(state.total_steps(), 0);
        assert!(state.training);
    }

    #[test]
    fn test_total_steps_tracks_last_entry() {
        let mut state = AgentState::new(0, 1e-3, 64, 4);
        state.steps.push(100);
        state.steps.push(250);
        assert_eq!(state.total_steps(), 250);
    }
}
