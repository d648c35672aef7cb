//! Training run configuration
//!
//! Parameters controlling the outer evolution loop: rollout and evaluation
//! budgets per cycle, the epsilon exploration schedule, and the overall
//! step budget. Per-agent hyperparameters (learning rate, batch size, learn
//! step) live on the agents themselves and are subject to mutation; the
//! values here are fixed for the run.

use crate::error::EvolveError;

/// Configuration for one population training run
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Total environment-step budget per population member
    pub max_steps: u64,

    /// Environment steps each member gathers per evolution cycle
    pub evo_steps: usize,

    /// Maximum steps per evaluation episode
    pub eval_steps: usize,

    /// Evaluation episodes per member per cycle
    pub eval_loop: usize,

    /// Buffer insertions required before learning starts
    pub learning_delay: u64,

    /// Initial exploration rate
    pub eps_start: f64,

    /// Exploration rate floor
    pub eps_end: f64,

    /// Multiplicative epsilon decay applied per vectorized step
    pub eps_decay: f64,

    /// Mean evaluation score that ends the run early, when set
    pub target: Option<f64>,

    /// Parallel environments per member rollout
    pub num_envs: usize,

    /// Seed for every random draw in the run
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_steps: 50_000,
            evo_steps: 2_048,
            eval_steps: 500,
            eval_loop: 3,
            learning_delay: 0,
            eps_start: 1.0,
            eps_end: 0.1,
            eps_decay: 0.995,
            target: None,
            num_envs: 4,
            seed: 42,
        }
    }
}

impl TrainConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate parameters before the run starts
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.max_steps == 0 {
            return Err(EvolveError::Configuration("max_steps must be positive".into()));
        }
        if self.evo_steps == 0 {
            return Err(EvolveError::Configuration("evo_steps must be positive".into()));
        }
        if self.eval_steps == 0 {
            return Err(EvolveError::Configuration("eval_steps must be positive".into()));
        }
        if self.eval_loop == 0 {
            return Err(EvolveError::Configuration("eval_loop must be positive".into()));
        }
        if self.num_envs == 0 {
            return Err(EvolveError::Configuration("num_envs must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.eps_start)
            || !(0.0..=1.0).contains(&self.eps_end)
            || self.eps_end > self.eps_start
        {
            return Err(EvolveError::Configuration(
                "epsilon schedule requires 0 <= eps_end <= eps_start <= 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.eps_decay) {
            return Err(EvolveError::Configuration(
                "eps_decay must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Set the per-member step budget
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    /// Set steps gathered per member per cycle
    pub fn evo_steps(mut self, steps: usize) -> Self {
        self.evo_steps = steps;
        self
    }

    /// Set the evaluation episode cap and episode count
    pub fn evaluation(mut self, eval_steps: usize, eval_loop: usize) -> Self {
        self.eval_steps = eval_steps;
        self.eval_loop = eval_loop;
        self
    }

    /// Set buffer insertions required before learning starts
    pub fn learning_delay(mut self, delay: u64) -> Self {
        self.learning_delay = delay;
        self
    }

    /// Set the epsilon exploration schedule
    pub fn epsilon(mut self, start: f64, end: f64, decay: f64) -> Self {
        self.eps_start = start;
        self.eps_end = end;
        self.eps_decay = decay;
        self
    }

    /// Set the early-stop score target
    pub fn target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the number of parallel rollout environments
    pub fn num_envs(mut self, n: usize) -> Self {
        self.num_envs = n;
        self
    }

    /// Set the run seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_chains() {
        let config = TrainConfig::new()
            .max_steps(10_000)
            .evo_steps(512)
            .evaluation(100, 5)
            .epsilon(0.9, 0.05, 0.99)
            .target(195.0)
            .num_envs(8)
            .seed(7);

        assert!(config.validate().is_ok());
        assert_eq!(config.max_steps, 10_000);
        assert_eq!(config.eval_loop, 5);
        assert_eq!(config.target, Some(195.0));
        assert_eq!(config.num_envs, 8);
    }

    #[test]
    fn test_zero_budgets_rejected() {
        assert!(TrainConfig::new().max_steps(0).validate().is_err());
        assert!(TrainConfig::new().evo_steps(0).validate().is_err());
        assert!(TrainConfig::new().evaluation(0, 3).validate().is_err());
        assert!(TrainConfig::new().evaluation(100, 0).validate().is_err());
        assert!(TrainConfig::new().num_envs(0).validate().is_err());
    }

    #[test]
    fn test_inverted_epsilon_schedule_rejected() {
        assert!(TrainConfig::new().epsilon(0.1, 0.9, 0.99).validate().is_err());
        assert!(TrainConfig::new().epsilon(1.0, 0.1, 1.5).validate().is_err());
    }
}
