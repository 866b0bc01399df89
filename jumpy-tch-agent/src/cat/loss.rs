//! Single-step categorical RL loss.
use crate::{
    batch::StepInputs,
    model::AgentModel,
    support::Support,
    util::{select_at_indexes, valid_from_done, valid_mean},
};
use log::trace;
use tch::{no_grad, Kind, Tensor};

/// NaN guard applied to probabilities before logarithms and to the reported
/// KL statistic. Not a tunable.
pub const EPS: f64 = 1e-6;

/// Cross-entropy between the projected bootstrapped target distribution and
/// the predicted distribution, plus a KL statistic for prioritization.
pub struct CatLoss {
    support: Support,
    discount: f64,
    n_step_return: usize,
    double_dqn: bool,
    mid_batch_reset: bool,
}

impl CatLoss {
    /// Creates the loss strategy.
    pub fn new(
        support: Support,
        discount: f64,
        n_step_return: usize,
        double_dqn: bool,
        mid_batch_reset: bool,
    ) -> Self {
        Self {
            support,
            discount,
            n_step_return,
            double_dqn,
            mid_batch_reset,
        }
    }

    /// The value support shared by all distributional computations.
    pub fn support(&self) -> &Support {
        &self.support
    }

    /// Number of steps in the bootstrapped return.
    pub fn n_step_return(&self) -> usize {
        self.n_step_return
    }

    fn contraction(&self) -> f64 {
        self.discount.powi(self.n_step_return as i32)
    }

    /// Computes `(loss, kl_divergence_per_sample)` for one time offset.
    ///
    /// No gradient flows through the target branch. The next action is picked
    /// by the target network's own argmax, or by the live network's argmax
    /// when double-DQN is enabled (de-correlating selection from evaluation
    /// to reduce overestimation bias). The KL vector is detached and, when
    /// mid-batch resets are disabled, zeroed at invalid positions so it can
    /// be fed back as priorities unchanged.
    pub fn rl_loss<M: AgentModel>(
        &self,
        model: &M,
        latent: &Tensor,
        inputs: &StepInputs,
        is_weights: Option<&Tensor>,
    ) -> (Tensor, Tensor) {
        trace!("CatLoss::rl_loss()");
        let target_p = no_grad(|| {
            let target_ps = model.target_forward(
                &inputs.next_obs,
                &inputs.next_prev_action,
                &inputs.next_prev_reward,
            ); // [B,A,P']
            let next_a = if self.double_dqn {
                let next_ps = model.forward(
                    &inputs.next_obs,
                    &inputs.next_prev_action,
                    &inputs.next_prev_reward,
                );
                self.support.expected_value(&next_ps).argmax(-1, false)
            } else {
                self.support.expected_value(&target_ps).argmax(-1, false)
            }; // [B]
            let unprojected = select_at_indexes(&next_a, &target_ps); // [B,P']
            self.support.project(
                &inputs.return_n,
                &inputs.done_n,
                &unprojected,
                self.contraction(),
            )
        }); // [B,P]

        let ps = model.head_forward(latent, &inputs.prev_action, &inputs.prev_reward); // [B,A,P]
        let p = select_at_indexes(&inputs.action, &ps).clamp(EPS, 1.0); // NaN-guard.
        let mut losses = -(&target_p * p.log()).sum_dim_intlist(-1, false, Kind::Float);

        if let Some(weights) = is_weights {
            losses = losses * weights;
        }

        let target_p = target_p.clamp(EPS, 1.0);
        let kl_div = (&target_p * (target_p.log() - p.detach().log()))
            .sum_dim_intlist(-1, false, Kind::Float)
            .clamp(EPS, 1.0 / EPS); // Avoid <0 from the NaN-guard.

        if self.mid_batch_reset {
            (losses.mean(Kind::Float), kl_div)
        } else {
            let valid = valid_from_done(&inputs.done);
            (valid_mean(&losses, &valid), kl_div * valid)
        }
    }
}
