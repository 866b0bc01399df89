//! Scheduling the exponent of importance weight for prioritized replay.
use serde::{Deserialize, Serialize};

/// Linear schedule of the importance-weight exponent beta.
///
/// The optimization driver evaluates the schedule at the current training
/// iteration and pushes the result into the replay buffer.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of beta.
    pub beta_0: f32,

    /// Final value of beta.
    pub beta_final: f32,

    /// Iteration at which beta reaches its final value.
    pub n_final: usize,
}

impl IwScheduler {
    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_final: f32, n_final: usize) -> Self {
        Self {
            beta_0,
            beta_final,
            n_final,
        }
    }

    /// Beta at iteration `n`.
    pub fn beta(&self, n: usize) -> f32 {
        if n >= self.n_final || self.n_final == 0 {
            self.beta_final
        } else {
            let d = self.beta_final - self.beta_0;
            self.beta_0 + d * (n as f32 / self.n_final as f32)
        }
    }
}
