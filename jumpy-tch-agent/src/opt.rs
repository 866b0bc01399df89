//! Optimizers.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use tch::{
    nn::{Adam, AdamW, Optimizer as Optimizer_, OptimizerConfig as OptimizerConfig_, VarStore},
    Kind,
};

/// Configures an optimizer for training the agent's networks.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },

    AdamW {
        lr: f64,
        beta1: f64,
        beta2: f64,
        wd: f64,
        eps: f64,
        amsgrad: bool,
    },
}

impl OptimizerConfig {
    /// Constructs an optimizer over the variables of the given store.
    pub fn build(&self, vs: &VarStore) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::Adam { lr } => {
                let opt = Adam::default().build(vs, *lr)?;
                Ok(Optimizer(opt))
            }
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                wd,
                eps,
                amsgrad,
            } => {
                let opt = AdamW {
                    beta1: *beta1,
                    beta2: *beta2,
                    wd: *wd,
                    eps: *eps,
                    amsgrad: *amsgrad,
                }
                .build(vs, *lr)?;
                Ok(Optimizer(opt))
            }
        }
    }
}

/// A thin wrapper of [tch::nn::Optimizer].
///
/// Unlike a fused backward-step helper, the update cycle is exposed piecewise
/// (`zero_grad` / backward on the loss / [`Optimizer::clip_grad_norm`] /
/// [`Optimizer::step`]) because two optimizers may share one backward graph
/// and must be choreographed by the caller.
///
/// [tch::nn::Optimizer]: https://docs.rs/tch/0.16.0/tch/nn/struct.Optimizer.html
pub struct Optimizer(Optimizer_);

impl Optimizer {
    /// Zeroes the gradients of this optimizer's parameter group.
    pub fn zero_grad(&mut self) {
        self.0.zero_grad();
    }

    /// Applies a parameter update from the accumulated gradients.
    pub fn step(&mut self) {
        self.0.step();
    }

    /// Clips the global gradient norm of the parameter group.
    pub fn clip_grad_norm(&mut self, max: f64) {
        self.0.clip_grad_norm(max);
    }

    /// Global L2 norm of the gradients of the parameter group.
    pub fn grad_norm(&self) -> f32 {
        let norm_sq = tch::no_grad(|| {
            self.0
                .trainable_variables()
                .iter()
                .map(|v| {
                    let g = v.grad();
                    if g.defined() {
                        f64::try_from(g.pow_tensor_scalar(2).sum(Kind::Float))
                            .expect("Failed to convert Tensor to f64")
                    } else {
                        0.0
                    }
                })
                .sum::<f64>()
        });
        norm_sq.sqrt() as f32
    }
}
