//! Two-armed contextual bandit
//!
//! The observation reveals which arm pays this step; matching it earns a
//! reward of 1. An agent that reads the context solves it exactly, so it
//! serves as a fast smoke-test environment for the evolution loop: random
//! play averages 0.5 per step, a trained greedy policy averages 1.0.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::env::{Environment, SpaceInfo, SpaceType, StepResult};

/// Episode length before truncation
const EPISODE_STEPS: u32 = 64;

/// Contextual bandit where the observation names the rewarded action
#[derive(Debug, Clone)]
pub struct ContextualBandit {
    rng: StdRng,
    context: i64,
    steps: u32,
}

impl ContextualBandit {
    /// Create a bandit with its own seeded RNG
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), context: 0, steps: 0 }
    }

    fn draw_context(&mut self) -> i64 {
        i64::from(self.rng.gen_bool(0.5))
    }
}

impl Environment for ContextualBandit {
    fn reset(&mut self) -> Vec<f32> {
        self.steps = 0;
        self.context = self.draw_context();
        vec![self.context as f32]
    }

    fn step(&mut self, action: i64) -> StepResult {
        let reward = if action == self.context { 1.0 } else { 0.0 };
        self.steps += 1;
        self.context = self.draw_context();

        StepResult {
            observation: vec![self.context as f32],
            reward,
            terminated: false,
            truncated: self.steps >= EPISODE_STEPS,
        }
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![1], dtype: SpaceType::Continuous }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![], dtype: SpaceType::Discrete(2) }
    }
}
