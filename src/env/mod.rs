//! Environment interface and built-in environments
//!
//! The trainer interacts with environments exclusively through
//! [`Environment`]: flat `f32` observations in, discrete `i64` actions out.
//! Rollouts run through an [`EnvPool`] that steps many instances in
//! parallel; evaluation uses a single standalone instance.

pub mod bandit;
pub mod pool;

pub use bandit::ContextualBandit;
pub use pool::EnvPool;

/// Discrete-action RL environment with flat observations
pub trait Environment: Send {
    /// Reset the environment and return the initial observation
    fn reset(&mut self) -> Vec<f32>;

    /// Advance one step with the given action
    fn step(&mut self, action: i64) -> StepResult;

    /// Shape of observations
    fn observation_space(&self) -> SpaceInfo;

    /// Shape of the action space
    fn action_space(&self) -> SpaceInfo;
}

/// Result of one environment step
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observation
    pub observation: Vec<f32>,

    /// Reward received
    pub reward: f32,

    /// Whether the episode reached a terminal state
    pub terminated: bool,

    /// Whether the episode was cut off by a step limit
    pub truncated: bool,
}

impl StepResult {
    /// Whether the episode ended this step, for either reason
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Shape and domain of an observation or action space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceInfo {
    /// Shape of the space; empty for scalar actions
    pub shape: Vec<usize>,

    /// Value domain
    pub dtype: SpaceType,
}

impl SpaceInfo {
    /// Flattened dimensionality of the space
    pub fn flat_dim(&self) -> usize {
        self.shape.iter().product::<usize>().max(1)
    }

    /// Number of discrete choices, if the space is discrete
    pub fn discrete_n(&self) -> Option<usize> {
        match self.dtype {
            SpaceType::Discrete(n) => Some(n),
            SpaceType::Continuous => None,
        }
    }
}

/// Value domain of a space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceType {
    /// Discrete space with n options
    Discrete(usize),

    /// Continuous (Box) space
    Continuous,
}
