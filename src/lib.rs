//! # Evolve-RL
//!
//! Evolutionary hyperparameter optimization for off-policy reinforcement
//! learning in pure Rust.
//!
//! A population of agents trains against a shared experience replay buffer.
//! Between training cycles the population undergoes tournament selection and
//! stochastic mutation of network architecture, weights, activations, and RL
//! hyperparameters, searching for high-performing configurations faster than
//! any single agent could.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evolve_rl::agent::dqn::{DqnAgent, DqnHyperparams};
//! use evolve_rl::buffer::ReplayBuffer;
//! use evolve_rl::env::{bandit::ContextualBandit, pool::EnvPool};
//! use evolve_rl::hpo::{
//!     mutation::{MutationConfig, Mutations},
//!     space::HyperparamConfig,
//!     tournament::TournamentSelection,
//! };
//! use evolve_rl::net::MlpConfig;
//! use evolve_rl::train::{train_off_policy, TrainConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let hp = HyperparamConfig::standard(1e-4, 1e-2, 16, 256, 1, 16);
//! let population: Vec<DqnAgent> = (0..4)
//!     .map(|i| {
//!         DqnAgent::new(1, 2, MlpConfig::default(), hp.clone(),
//!                       DqnHyperparams::default(), i, &mut rng).unwrap()
//!     })
//!     .collect();
//!
//! let memory = ReplayBuffer::new(10_000).unwrap();
//! let tournament = TournamentSelection::new(2, true, 4, 2).unwrap();
//! let mutations = Mutations::new(MutationConfig::default()).unwrap();
//! let mut pool = EnvPool::new(|i| ContextualBandit::new(7 + i as u64), 4);
//! let mut eval_env = ContextualBandit::new(11);
//!
//! let config = TrainConfig::new().max_steps(20_000).num_envs(4);
//! let (trained, fitness) = train_off_policy(
//!     &mut pool, &mut eval_env, population, &memory,
//!     &tournament, &mutations, &config,
//! ).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error taxonomy shared across the crate
pub mod error;

/// Shared experience replay buffer
pub mod buffer;

/// Evolvable network substrate (layers, architecture edits, optimizer state)
pub mod net;

/// Hyperparameter optimization: descriptors, mutation engine, tournament
/// selection
pub mod hpo;

/// Population member capability contract and bundled agents
pub mod agent;

/// Environment traits, parallel pool, and built-in test environments
pub mod env;

/// Population training orchestration
pub mod train;

/// Current version of evolve-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
