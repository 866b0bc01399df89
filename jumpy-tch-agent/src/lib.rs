//! Learning core of a model-based categorical DQN, implemented with
//! [tch](https://crates.io/crates/tch).
//!
//! The Q-value of each action is represented as a probability distribution
//! over a fixed grid of candidate values ([`Support`]). Targets are built by
//! projecting the shifted n-step bootstrapped distribution back onto the grid
//! ([`Support::project`]), and a learned transition model is unrolled in
//! latent space for a configurable number of jumps, predicting the reward at
//! each step ([`LatentRollout`]). [`ModelCatDqn`] coordinates the two
//! optimizers, the target network schedule and the priority feedback against
//! an external replay buffer.
mod batch;
mod cat;
mod model;
mod opt;
mod support;
mod util;

pub use batch::{SequenceBatch, StepInputs};
pub use cat::{CatLoss, LatentRollout, ModelCatDqn, ModelCatDqnConfig, OptInfo, EPS};
pub use model::AgentModel;
pub use opt::{Optimizer, OptimizerConfig};
pub use support::Support;
pub use util::{select_at_indexes, track, valid_from_done, valid_mean};

#[cfg(test)]
pub(crate) mod testing;
