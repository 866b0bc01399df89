//! Batches of transition sequences as tensors.
use jumpy_core::{error::JumpyError, SequenceBatchBase};
use tch::Tensor;

/// A batch of temporally-aligned transition sequences, time-major.
///
/// `all_observation` is `[T, B, ...]`; the scalar fields are `[T, B]`.
/// `action[t]` is the action selected at offset `t` and `reward[t]` the
/// reward it produced; `return_n[t]` and `done_n[t]` describe the n-step
/// segment starting at `t`. Prioritized buffers attach per-sequence
/// importance weights and the sampled indexes for priority feedback.
pub struct SequenceBatch {
    all_observation: Tensor,
    all_action: Tensor,
    all_reward: Tensor,
    done: Tensor,
    done_n: Tensor,
    return_n: Tensor,
    is_weights: Option<Tensor>,
    ixs: Option<Vec<usize>>,
}

/// Per-offset view consumed by the single-step RL loss.
pub struct StepInputs {
    /// Action taken at the offset.
    pub action: Tensor,
    /// n-step bootstrapped return from the offset.
    pub return_n: Tensor,
    /// Termination flag of the n-step segment.
    pub done_n: Tensor,
    /// Action preceding the offset.
    pub prev_action: Tensor,
    /// Reward preceding the offset.
    pub prev_reward: Tensor,
    /// Observation at the bootstrap horizon.
    pub next_obs: Tensor,
    /// Action preceding the bootstrap horizon.
    pub next_prev_action: Tensor,
    /// Reward preceding the bootstrap horizon.
    pub next_prev_reward: Tensor,
    /// Termination flag at the offset, for validity masking.
    pub done: Tensor,
}

impl SequenceBatch {
    /// Builds a batch, validating that every field agrees on `[T, B]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        all_observation: Tensor,
        all_action: Tensor,
        all_reward: Tensor,
        done: Tensor,
        done_n: Tensor,
        return_n: Tensor,
        is_weights: Option<Tensor>,
        ixs: Option<Vec<usize>>,
    ) -> Result<Self, JumpyError> {
        fn lead(t: &Tensor) -> Vec<i64> {
            t.size().iter().take(2).cloned().collect()
        }
        let expected = lead(&all_action);
        if all_action.size().len() != 2 {
            return Err(JumpyError::BatchShape(format!(
                "all_action must be 2-D, got {:?}",
                all_action.size()
            )));
        }
        let fields: [(&str, &Tensor); 5] = [
            ("all_observation", &all_observation),
            ("all_reward", &all_reward),
            ("done", &done),
            ("done_n", &done_n),
            ("return_n", &return_n),
        ];
        for (name, t) in fields.iter() {
            if lead(t) != expected {
                return Err(JumpyError::BatchShape(format!(
                    "{} has leading dims {:?}, expected {:?}",
                    name,
                    lead(t),
                    expected
                )));
            }
        }
        if let Some(w) = &is_weights {
            if w.size() != vec![expected[1]] {
                return Err(JumpyError::BatchShape(format!(
                    "is_weights has shape {:?}, expected [{}]",
                    w.size(),
                    expected[1]
                )));
            }
        }
        Ok(Self {
            all_observation,
            all_action,
            all_reward,
            done,
            done_n,
            return_n,
            is_weights,
            ixs,
        })
    }

    /// Observation at offset `t`.
    pub fn observation(&self, t: usize) -> Tensor {
        self.all_observation.get(t as i64)
    }

    /// Action selected at offset `t`.
    pub fn action(&self, t: usize) -> Tensor {
        self.all_action.get(t as i64)
    }

    /// Reward produced at offset `t`.
    pub fn reward(&self, t: usize) -> Tensor {
        self.all_reward.get(t as i64)
    }

    /// Episode-termination flag at offset `t`.
    pub fn done(&self, t: usize) -> Tensor {
        self.done.get(t as i64)
    }

    /// Termination flag of the n-step segment starting at offset `t`.
    pub fn done_n(&self, t: usize) -> Tensor {
        self.done_n.get(t as i64)
    }

    /// n-step bootstrapped return from offset `t`.
    pub fn return_n(&self, t: usize) -> Tensor {
        self.return_n.get(t as i64)
    }

    /// Importance-sampling weights, when drawn from a prioritized buffer.
    pub fn is_weights(&self) -> Option<&Tensor> {
        self.is_weights.as_ref()
    }

    /// Indexes of the sampled sequences, for priority feedback.
    pub fn indexes(&self) -> &Option<Vec<usize>> {
        &self.ixs
    }

    /// View for the RL loss at jump `j` with an `n_step`-step bootstrap.
    ///
    /// Offsets are anchored at `j + 1`, the time index of the latent after
    /// `j` dynamics steps; the deepest index touched is `j + n_step + 1`.
    pub fn step_inputs(&self, j: usize, n_step: usize) -> StepInputs {
        StepInputs {
            action: self.action(j + 1),
            return_n: self.return_n(j + 1),
            done_n: self.done_n(j + 1),
            prev_action: self.action(j),
            prev_reward: self.reward(j),
            next_obs: self.observation(j + 1 + n_step),
            next_prev_action: self.action(j + n_step),
            next_prev_reward: self.reward(j + n_step),
            done: self.done(j + 1),
        }
    }
}

impl SequenceBatchBase for SequenceBatch {
    fn horizon(&self) -> usize {
        self.all_action.size()[0] as usize
    }

    fn len(&self) -> usize {
        self.all_action.size()[1] as usize
    }
}
