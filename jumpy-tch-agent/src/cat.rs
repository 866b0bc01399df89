//! Model-based categorical DQN.
//!
//! A base categorical loss strategy ([`CatLoss`]) plus an optional latent
//! rollout strategy ([`LatentRollout`]), composed by the optimization driver
//! ([`ModelCatDqn`]) and selected through [`ModelCatDqnConfig`].
mod base;
mod config;
mod loss;
mod rollout;
pub use base::{ModelCatDqn, OptInfo};
pub use config::ModelCatDqnConfig;
pub use loss::{CatLoss, EPS};
pub use rollout::LatentRollout;
