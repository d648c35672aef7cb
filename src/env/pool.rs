//! Parallel environment pool
//!
//! Steps a fixed set of environment instances across Rayon's thread pool so
//! one population member gathers `num_envs` transitions per vectorized step.
//! Episodes are not auto-reset: the trainer records the terminal observation
//! first and calls [`EnvPool::reset_env`] on the finished slot.

use rayon::prelude::*;

use crate::env::{Environment, SpaceInfo, StepResult};

/// Fixed-size pool of environments stepped in parallel
pub struct EnvPool<E: Environment> {
    envs: Vec<E>,
}

impl<E: Environment> EnvPool<E> {
    /// Build a pool of `num_envs` instances from a factory
    ///
    /// The factory receives each slot index, so environments can be seeded
    /// distinctly (e.g. `|i| ContextualBandit::new(seed + i as u64)`).
    pub fn new<F>(env_fn: F, num_envs: usize) -> Self
    where
        F: Fn(usize) -> E,
    {
        let envs = (0..num_envs).map(env_fn).collect();
        Self { envs }
    }

    /// Reset every environment, returning one observation per slot
    pub fn reset(&mut self) -> Vec<Vec<f32>> {
        self.envs.par_iter_mut().map(|env| env.reset()).collect()
    }

    /// Step every environment with its own action
    ///
    /// # Panics
    ///
    /// Panics if `actions.len()` differs from the pool size.
    pub fn step(&mut self, actions: &[i64]) -> Vec<StepResult> {
        assert_eq!(
            actions.len(),
            self.envs.len(),
            "one action per environment required"
        );
        self.envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, &action)| env.step(action))
            .collect()
    }

    /// Reset a single slot and return its fresh observation
    pub fn reset_env(&mut self, env_id: usize) -> Vec<f32> {
        self.envs[env_id].reset()
    }

    /// Number of environments in the pool
    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    /// Observation space, taken from the first instance
    pub fn observation_space(&self) -> SpaceInfo {
        self.envs[0].observation_space()
    }

    /// Action space, taken from the first instance
    pub fn action_space(&self) -> SpaceInfo {
        self.envs[0].action_space()
    }
}
