//! Experience buffers shared across the population
//!
//! Off-policy agents in a population do not keep private experience: every
//! member writes its environment transitions into one bounded
//! [`ReplayBuffer`] and samples training minibatches back out of it. The
//! buffer is the only structure mutated by multiple logical actors, so its
//! concurrency contract lives here too.

pub mod replay;

pub use replay::{ReplayBuffer, Transition, TransitionBatch};
