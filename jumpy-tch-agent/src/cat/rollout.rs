//! Latent rollout of the transition model.
use super::loss::CatLoss;
use crate::{batch::SequenceBatch, model::AgentModel, support::Support};
use jumpy_core::error::JumpyError;
use jumpy_core::SequenceBatchBase;
use log::trace;
use tch::{Kind, Tensor};

/// Unrolls the learned dynamics model for a fixed number of jumps.
///
/// The model loss accumulates one reward-prediction cross-entropy per latent
/// (the stem latent plus one per jump) and, per jump, the RL loss of the
/// Q-head applied to the advanced latent. Detaching the stem latent severs
/// gradient flow from the rollout back into the encoder, so the dynamics can
/// be trained by a separate optimizer.
pub struct LatentRollout {
    jumps: usize,
    detach_model: bool,
    reward_support: Support,
}

impl LatentRollout {
    /// Creates the rollout strategy.
    pub fn new(jumps: usize, detach_model: bool, reward_support: Support) -> Self {
        Self {
            jumps,
            detach_model,
            reward_support,
        }
    }

    /// Rollout depth.
    pub fn jumps(&self) -> usize {
        self.jumps
    }

    /// Whether the stem latent is detached before entering the rollout.
    pub fn detach_model(&self) -> bool {
        self.detach_model
    }

    /// Smallest batch horizon the rollout can consume.
    ///
    /// The deepest offset touched is `jumps + n_step + 1`, by the bootstrap
    /// observation of the last jump's RL loss.
    pub fn required_horizon(&self, n_step: usize) -> usize {
        self.jumps + n_step + 2
    }

    /// Per-sample reward cross-entropy `[B]` against the categorical target.
    fn reward_ce(&self, logits: &Tensor, reward: &Tensor) -> Tensor {
        let target = self.reward_support.project_scalars(reward); // [B,R]
        let log_p = logits.log_softmax(-1, Kind::Float);
        -(target * log_p).sum_dim_intlist(-1, false, Kind::Float)
    }

    /// Computes `(rl_loss, kl_divergence, model_loss)` for one batch.
    ///
    /// Fails on a batch whose horizon cannot cover the configured depth;
    /// truncating silently would misalign the n-step bootstrap. Importance
    /// weights scale each term exactly once: the per-jump RL losses are
    /// weighted inside the RL loss, the accumulated reward terms here.
    pub fn loss<M: AgentModel>(
        &self,
        model: &M,
        cat: &CatLoss,
        batch: &SequenceBatch,
    ) -> Result<(Tensor, Tensor, Tensor), JumpyError> {
        trace!("LatentRollout::loss()");
        let n_step = cat.n_step_return();
        batch.check_horizon(self.required_horizon(n_step))?;
        let is_weights = batch.is_weights();

        let latent = model.stem_forward(&batch.observation(1), &batch.action(0), &batch.reward(0));
        let (rl_loss, kl_div) = cat.rl_loss(model, &latent, &batch.step_inputs(0, n_step), is_weights);

        let mut current = if self.detach_model {
            latent.detach()
        } else {
            latent
        };
        let mut reward_ces = self.reward_ce(&model.reward_logits(&current), &batch.reward(0));
        let mut jump_rl: Option<Tensor> = None;

        for j in 1..=self.jumps {
            let (next, pred_rew) = model.step(&current, &batch.action(j - 1));
            current = next;
            let (jump_loss, _) =
                cat.rl_loss(model, &current, &batch.step_inputs(j, n_step), is_weights);
            reward_ces = reward_ces + self.reward_ce(&pred_rew, &batch.reward(j));
            jump_rl = Some(match jump_rl {
                Some(acc) => acc + jump_loss,
                None => jump_loss,
            });
        }

        if let Some(w) = is_weights {
            reward_ces = reward_ces * w;
        }
        let mut model_loss = reward_ces.mean(Kind::Float);
        if let Some(acc) = jump_rl {
            model_loss = model_loss + acc;
        }
        Ok((rl_loss, kl_div, model_loss))
    }
}
