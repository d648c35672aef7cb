//! Population training loop
//!
//! Orchestrates the evolutionary HPO cycle: each member rolls out against
//! the shared replay buffer and learns, every member is evaluated greedily,
//! then tournament selection and mutation produce the next generation.

pub mod config;
pub mod off_policy;

pub use config::TrainConfig;
pub use off_policy::train_off_policy;
