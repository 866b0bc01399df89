//! Interface of the agent's networks.
use anyhow::Result;
use std::path::Path;
use tch::{nn::VarStore, Tensor};

/// Networks of a model-based categorical agent.
///
/// Implementations own four pieces: a shared encoder ("stem") producing a
/// latent state, a Q-head emitting a probability distribution over the value
/// support per action, a frozen target copy of both, and a transition model
/// advancing the latent one action at a time while predicting the immediate
/// reward as logits over the reward support. The learning core consumes them
/// only through this trait; architectures are not its concern.
pub trait AgentModel {
    /// Action-value distributions `[B, A, P]` for the given observation.
    fn forward(&self, obs: &Tensor, prev_action: &Tensor, prev_reward: &Tensor) -> Tensor;

    /// Like [`AgentModel::forward`], evaluated with the frozen target
    /// parameters.
    fn target_forward(&self, obs: &Tensor, prev_action: &Tensor, prev_reward: &Tensor) -> Tensor;

    /// Encodes an observation into a latent state.
    fn stem_forward(&self, obs: &Tensor, prev_action: &Tensor, prev_reward: &Tensor) -> Tensor;

    /// Action-value distributions `[B, A, P]` from an already-computed latent.
    fn head_forward(&self, latent: &Tensor, prev_action: &Tensor, prev_reward: &Tensor) -> Tensor;

    /// Reward logits `[B, R]` of the transition model's reward head.
    fn reward_logits(&self, latent: &Tensor) -> Tensor;

    /// Advances the latent state by one action.
    ///
    /// Returns the next latent and the reward logits for the step.
    fn step(&self, latent: &Tensor, action: &Tensor) -> (Tensor, Tensor);

    /// Blends the target parameters toward the live ones with coefficient
    /// `tau`.
    ///
    /// The blend must be published as a consistent snapshot: no reader may
    /// observe a half-written target network.
    fn update_target(&mut self, tau: f64);

    /// Parameters trained by the main (representation and Q-head) optimizer.
    fn stem_var_store(&self) -> &VarStore;

    /// Parameters trained by the transition-model optimizer.
    fn transition_var_store(&self) -> &VarStore;

    /// Saves the parameters of all networks under the given directory.
    fn save<T: AsRef<Path>>(&self, path: T) -> Result<()>;

    /// Loads the parameters of all networks from the given directory.
    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()>;
}
