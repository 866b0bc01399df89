//! Replay buffer contracts.
//!
//! The learning core never owns replay storage. It appends freshly collected
//! samples, draws batches of aligned transition sequences, and, when
//! prioritized replay is enabled, pushes error magnitudes back for priority
//! updates. Everything else (indexing, frame stacking, priority trees) is the
//! buffer implementation's business.
use anyhow::Result;

/// Interface for buffers that accept experiences collected from environments.
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the number of experiences currently stored.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experiences.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate training batches.
///
/// Batches are sequences of temporally-aligned transitions; see
/// [`SequenceBatchBase`](crate::SequenceBatchBase) for the shape contract.
pub trait ReplayBufferBase {
    /// Configuration parameters of the buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a replay buffer from the given configuration.
    fn build(config: &Self::Config) -> Self;

    /// Samples a batch of `size` transition sequences.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;

    /// Updates the priorities of previously sampled experiences.
    ///
    /// `ixs` are the indexes reported by the batch that produced `errs`.
    /// Non-prioritized buffers may ignore this call.
    fn update_priority(&mut self, ixs: &Option<Vec<usize>>, errs: &Option<Vec<f32>>);

    /// Sets the exponent of the importance-sampling weight.
    ///
    /// Called by the optimization driver when beta is annealed over training.
    /// Non-prioritized buffers may ignore this call.
    fn set_beta(&mut self, _beta: f32) {}
}
