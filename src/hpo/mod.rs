//! Evolutionary hyperparameter optimization
//!
//! This module holds the machinery that transforms a population between
//! training cycles:
//!
//! - declarative hyperparameter descriptors with bounds and dtypes
//! - the mutation engine (architecture, weight-noise, activation, and
//!   RL-hyperparameter mutation under feasibility constraints)
//! - tournament selection with optional elitism
//!
//! All randomness flows through an explicit seeded generator passed down the
//! call chain, so runs are reproducible given a fixed seed.

pub mod mutation;
pub mod space;
pub mod tournament;

pub use mutation::{MutationConfig, MutationKind, Mutations};
pub use space::{HyperparamConfig, ParamDtype, RlParameter};
pub use tournament::TournamentSelection;
