//! DQN-style population member
//!
//! A Q-network agent with epsilon-greedy exploration, a soft-updated target
//! network, and momentum gradient descent over the evolvable MLP. It is the
//! bundled off-policy learner the population trainer and the test suite
//! exercise; anything implementing [`EvolvableAgent`](super::EvolvableAgent)
//! slots into the same loop.

use rand::rngs::StdRng;
use rand::Rng;

use crate::agent::{AgentState, EvolvableAgent};
use crate::buffer::TransitionBatch;
use crate::error::EvolveError;
use crate::hpo::space::HyperparamConfig;
use crate::net::{EvolvableMlp, MlpConfig, MlpGradients, SgdMomentum};

/// Initial scalar hyperparameters for a DQN agent
#[derive(Debug, Clone)]
pub struct DqnHyperparams {
    /// Learning rate
    pub lr: f64,

    /// Replay minibatch size
    pub batch_size: usize,

    /// Environment steps between learning iterations
    pub learn_step: usize,

    /// Discount factor
    pub gamma: f32,

    /// Target network soft-update rate
    pub tau: f32,

    /// Gradient momentum coefficient
    pub momentum: f32,
}

impl Default for DqnHyperparams {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            batch_size: 64,
            learn_step: 4,
            gamma: 0.99,
            tau: 0.01,
            momentum: 0.9,
        }
    }
}

/// Q-learning population member over an evolvable network
#[derive(Debug, Clone)]
pub struct DqnAgent {
    actor: EvolvableMlp,
    target: EvolvableMlp,
    optimizer: SgdMomentum,
    gamma: f32,
    tau: f32,
    hp_config: HyperparamConfig,
    state: AgentState,
}

impl DqnAgent {
    /// Create an agent with a randomly initialized Q-network
    pub fn new(
        obs_dim: usize,
        action_dim: usize,
        net_config: MlpConfig,
        hp_config: HyperparamConfig,
        init: DqnHyperparams,
        index: usize,
        rng: &mut StdRng,
    ) -> Result<Self, EvolveError> {
        hp_config.validate()?;
        if init.batch_size == 0 || init.learn_step == 0 {
            return Err(EvolveError::Configuration(
                "batch_size and learn_step must be positive".into(),
            ));
        }
        let actor = EvolvableMlp::new(obs_dim, action_dim, net_config, rng)?;
        let target = actor.clone();
        let optimizer = SgdMomentum::new(&actor, init.momentum);

        Ok(Self {
            actor,
            target,
            optimizer,
            gamma: init.gamma,
            tau: init.tau,
            hp_config,
            state: AgentState::new(index, init.lr, init.batch_size, init.learn_step),
        })
    }

    /// Number of discrete actions
    pub fn action_dim(&self) -> usize {
        self.actor.output_dim()
    }

    /// Target network tracked by soft updates
    pub fn target(&self) -> &EvolvableMlp {
        &self.target
    }
}

impl EvolvableAgent for DqnAgent {
    fn get_action(&self, observation: &[f32], epsilon: f64, rng: &mut StdRng) -> i64 {
        if self.state.training && epsilon > 0.0 && rng.gen::<f64>() < epsilon {
            rng.gen_range(0..self.actor.output_dim() as i64)
        } else {
            self.actor.argmax(observation)
        }
    }

    fn learn(&mut self, batch: &TransitionBatch) -> anyhow::Result<()> {
        let batch_size = batch.len();
        if batch_size == 0 {
            return Ok(());
        }

        let mut grads = MlpGradients::zeros(&self.actor);
        let scale = 1.0 / batch_size as f32;
        for i in 0..batch_size {
            let q_values = self.actor.forward(&batch.observations[i]);
            let action = batch.actions[i] as usize;

            let next_q = self.target.forward(&batch.next_observations[i]);
            let max_next = next_q.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let not_terminal = if batch.dones[i] { 0.0 } else { 1.0 };
            let td_target = batch.rewards[i] + self.gamma * max_next * not_terminal;

            // MSE gradient on the chosen action's Q-value only.
            let mut output_grad = vec![0.0; q_values.len()];
            output_grad[action] = 2.0 * (q_values[action] - td_target) * scale;
            self.actor.accumulate_gradients(&batch.observations[i], &output_grad, &mut grads);
        }

        self.actor.apply_gradients(&grads, &mut self.optimizer, self.state.lr as f32);
        self.target.soft_update_from(&self.actor, self.tau)?;
        Ok(())
    }

    fn actor(&self) -> &EvolvableMlp {
        &self.actor
    }

    fn actor_mut(&mut self) -> &mut EvolvableMlp {
        &mut self.actor
    }

    fn on_architecture_change(&mut self) {
        // Momentum buffers sized to the old topology are stale, and the
        // target network no longer matches the actor's shape: both are
        // rebuilt rather than carried over.
        self.optimizer.reset(&self.actor);
        self.target = self.actor.clone();
    }

    fn hp_config(&self) -> &HyperparamConfig {
        &self.hp_config
    }

    fn state(&self) -> &AgentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AgentState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Transition;
    use rand::SeedableRng;

    fn agent(rng: &mut StdRng) -> DqnAgent {
        let net_config = MlpConfig { hidden_sizes: vec![32], ..Default::default() };
        let hp = HyperparamConfig::standard(1e-4, 1e-2, 16, 128, 1, 16);
        DqnAgent::new(1, 2, net_config, hp, DqnHyperparams::default(), 0, rng).unwrap()
    }

    fn batch_of(transitions: Vec<Transition>) -> TransitionBatch {
        let buffer = crate::buffer::ReplayBuffer::new(transitions.len()).unwrap();
        buffer.add(transitions);
        let mut rng = StdRng::seed_from_u64(0);
        buffer.sample(64, &mut rng).unwrap()
    }

    #[test]
    fn test_greedy_action_is_argmax() {
        let mut rng = StdRng::seed_from_u64(30);
        let agent = agent(&mut rng);
        let obs = [0.5];

        let expected = agent.actor().argmax(&obs);
        for _ in 0..20 {
            assert_eq!(agent.get_action(&obs, 0.0, &mut rng), expected);
        }
    }

    #[test]
    fn test_full_exploration_covers_actions() {
        let mut rng = StdRng::seed_from_u64(31);
        let agent = agent(&mut rng);

        let mut seen = [false; 2];
        for _ in 0..100 {
            let action = agent.get_action(&[0.0], 1.0, &mut rng);
            seen[action as usize] = true;
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_eval_mode_disables_exploration() {
        let mut rng = StdRng::seed_from_u64(36);
        let mut agent = agent(&mut rng);
        let obs = [0.5];
        let expected = agent.actor().argmax(&obs);

        // Full exploration, but the agent is out of training mode: the
        // policy stays greedy.
        agent.set_training_mode(false);
        for _ in 0..50 {
            assert_eq!(agent.get_action(&obs, 1.0, &mut rng), expected);
        }

        // Back in training mode the same epsilon explores again.
        agent.set_training_mode(true);
        let mut seen = [false; 2];
        for _ in 0..100 {
            seen[agent.get_action(&obs, 1.0, &mut rng) as usize] = true;
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_learn_moves_q_toward_targets() {
        let mut rng = StdRng::seed_from_u64(32);
        let mut agent = agent(&mut rng);

        // Action 1 in state 1.0 always pays 1, action 0 pays nothing.
        let batch = batch_of(vec![
            Transition {
                observation: vec![1.0],
                action: 1,
                reward: 1.0,
                next_observation: vec![1.0],
                done: true,
            },
            Transition {
                observation: vec![1.0],
                action: 0,
                reward: 0.0,
                next_observation: vec![1.0],
                done: true,
            },
        ]);

        let td_error = |agent: &DqnAgent| {
            let q = agent.actor().forward(&[1.0]);
            (q[1] - 1.0).powi(2) + q[0].powi(2)
        };

        let initial = td_error(&agent);
        for _ in 0..200 {
            agent.learn(&batch).unwrap();
        }
        assert!(td_error(&agent) < initial);
    }

    #[test]
    fn test_architecture_change_rebuilds_target() {
        let mut rng = StdRng::seed_from_u64(33);
        let mut agent = agent(&mut rng);

        agent.actor_mut().add_layer(&mut rng);
        agent.on_architecture_change();

        assert_eq!(agent.target(), agent.actor());

        // Learning still works against the new topology.
        let batch = batch_of(vec![Transition {
            observation: vec![0.5],
            action: 0,
            reward: 1.0,
            next_observation: vec![0.5],
            done: false,
        }]);
        agent.learn(&batch).unwrap();
    }

    #[test]
    fn test_hp_values_roundtrip() {
        let mut rng = StdRng::seed_from_u64(34);
        let mut agent = agent(&mut rng);

        assert_eq!(agent.hp_value("lr"), Some(1e-3));
        assert!(agent.set_hp_value("batch_size", 32.0));
        assert_eq!(agent.state().batch_size, 32);
        assert!(!agent.set_hp_value("gamma", 0.5));
        assert_eq!(agent.hp_value("gamma"), None);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut rng = StdRng::seed_from_u64(35);
        let mut agent = agent(&mut rng);
        let snapshot = agent.actor().clone();

        let empty = TransitionBatch {
            observations: vec![],
            actions: vec![],
            rewards: vec![],
            next_observations: vec![],
            dones: vec![],
        };
        agent.learn(&empty).unwrap();
        assert_eq!(agent.actor(), &snapshot);
    }
}
