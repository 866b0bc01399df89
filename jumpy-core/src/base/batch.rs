//! Contract for batches of transition sequences.
use crate::error::JumpyError;

/// A batch of temporally-aligned transition sequences.
///
/// Every per-offset field (observation, action, reward, termination flag,
/// n-step return, n-step termination flag) is aligned by the same time index
/// across the batch. A batch carries `horizon()` consecutive offsets for each
/// of its `len()` sequences.
pub trait SequenceBatchBase {
    /// Number of time offsets carried per sequence.
    fn horizon(&self) -> usize;

    /// Number of sequences in the batch.
    fn len(&self) -> usize;

    /// Returns `true` if the batch contains no sequences.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails if the batch carries fewer than `required` time offsets.
    ///
    /// Undersized batches are a precondition violation: silently truncating
    /// would corrupt the n-step bootstrap alignment, so callers must check
    /// before slicing.
    fn check_horizon(&self, required: usize) -> Result<(), JumpyError> {
        if self.horizon() < required {
            Err(JumpyError::BatchHorizon {
                required,
                actual: self.horizon(),
            })
        } else {
            Ok(())
        }
    }
}
