//! Core contracts.
mod batch;
mod replay_buffer;
pub use batch::SequenceBatchBase;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
