#![warn(missing_docs)]
//! Backend-free contracts for the model-based distributional RL learning core.
//!
//! This crate defines the seams between the learning core and its external
//! collaborators: the replay buffer that supplies temporally-aligned
//! transition sequences, the record types used for reporting optimization
//! statistics, and the scheduler for the prioritized-replay importance
//! weight exponent. The tensor implementation of the learning core lives in
//! `jumpy-tch-agent`.
pub mod error;
pub mod record;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase, SequenceBatchBase};

mod iw_scheduler;
pub use iw_scheduler::IwScheduler;
