//! Configuration of [`ModelCatDqn`](super::ModelCatDqn).
use crate::opt::OptimizerConfig;
use anyhow::Result;
use jumpy_core::error::JumpyError;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ModelCatDqn`](super::ModelCatDqn).
///
/// Every field is fixed at construction; [`ModelCatDqnConfig::validate`] runs
/// once when the agent is built.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelCatDqnConfig {
    /// Lower bound of the value support.
    pub v_min: f64,
    /// Upper bound of the value support.
    pub v_max: f64,
    /// Number of atoms of the value support.
    pub n_atoms: i64,
    /// Discount factor.
    pub discount: f64,
    /// Number of steps of the bootstrapped return.
    pub n_step_return: usize,
    /// Rollout depth of the transition model.
    pub jumps: usize,
    /// Enables the latent rollout and the transition-model optimizer.
    pub learn_model: bool,
    /// Detaches the stem latent before the rollout, decoupling the dynamics
    /// gradient from the encoder.
    pub detach_model: bool,
    /// Selects the bootstrap action with the live network instead of the
    /// target network.
    pub double_dqn: bool,
    /// Whether batches carry importance weights and priority feedback.
    pub prioritized_replay: bool,
    /// Sampling exponent of the prioritized buffer. Consumed by the buffer
    /// construction of the embedding application, not by the driver.
    pub pri_alpha: f32,
    /// Initial importance-weight exponent.
    pub pri_beta_init: f32,
    /// Final importance-weight exponent.
    pub pri_beta_final: f32,
    /// Number of iterations over which beta is annealed.
    pub pri_beta_steps: usize,
    /// When set, sequences never span an episode boundary and losses are
    /// plain means; otherwise samples past a termination flag are masked.
    pub mid_batch_reset: bool,
    /// Number of updates between target-network refreshes.
    pub target_update_interval: usize,
    /// Mixing coefficient of the target-network blend.
    pub target_update_tau: f64,
    /// Maximum global gradient norm per optimizer.
    pub clip_grad_norm: f64,
    /// Number of sequences per training batch.
    pub batch_size: usize,
    /// Number of gradient updates per call to `optimize`.
    pub updates_per_optimize: usize,
    /// Number of iterations before learning starts.
    pub min_itr_learn: usize,
    /// Stride of the TD-error downsample recorded for observability.
    pub td_err_stride: usize,
    /// Half-width of the categorical reward support; the support has
    /// `2 * reward_limit + 1` atoms.
    pub reward_limit: i64,
    /// Optimizer shared by the main and the transition-model parameter
    /// groups.
    pub opt_config: OptimizerConfig,
}

impl Default for ModelCatDqnConfig {
    fn default() -> Self {
        Self {
            v_min: -10.0,
            v_max: 10.0,
            n_atoms: 51,
            discount: 0.99,
            n_step_return: 1,
            jumps: 0,
            learn_model: false,
            detach_model: true,
            double_dqn: false,
            prioritized_replay: false,
            pri_alpha: 0.6,
            pri_beta_init: 0.4,
            pri_beta_final: 1.0,
            pri_beta_steps: 50_000,
            mid_batch_reset: true,
            target_update_interval: 312,
            target_update_tau: 1.0,
            clip_grad_norm: 10.0,
            batch_size: 32,
            updates_per_optimize: 1,
            min_itr_learn: 0,
            td_err_stride: 8,
            reward_limit: 1,
            opt_config: OptimizerConfig::Adam { lr: 2.5e-4 },
        }
    }
}

impl ModelCatDqnConfig {
    /// Sets the value support.
    pub fn support(mut self, v_min: f64, v_max: f64, n_atoms: i64) -> Self {
        self.v_min = v_min;
        self.v_max = v_max;
        self.n_atoms = n_atoms;
        self
    }

    /// Sets the discount factor.
    pub fn discount(mut self, v: f64) -> Self {
        self.discount = v;
        self
    }

    /// Sets the number of steps of the bootstrapped return.
    pub fn n_step_return(mut self, v: usize) -> Self {
        self.n_step_return = v;
        self
    }

    /// Sets the rollout depth.
    pub fn jumps(mut self, v: usize) -> Self {
        self.jumps = v;
        self
    }

    /// Enables or disables the latent rollout.
    pub fn learn_model(mut self, v: bool) -> Self {
        self.learn_model = v;
        self
    }

    /// Enables or disables detaching the stem latent before the rollout.
    pub fn detach_model(mut self, v: bool) -> Self {
        self.detach_model = v;
        self
    }

    /// Enables or disables double-DQN action selection.
    pub fn double_dqn(mut self, v: bool) -> Self {
        self.double_dqn = v;
        self
    }

    /// Enables or disables prioritized-replay handling.
    pub fn prioritized_replay(mut self, v: bool) -> Self {
        self.prioritized_replay = v;
        self
    }

    /// Sets the importance-weight schedule.
    pub fn pri_beta(mut self, init: f32, fin: f32, steps: usize) -> Self {
        self.pri_beta_init = init;
        self.pri_beta_final = fin;
        self.pri_beta_steps = steps;
        self
    }

    /// Sets the mid-batch-reset masking policy.
    pub fn mid_batch_reset(mut self, v: bool) -> Self {
        self.mid_batch_reset = v;
        self
    }

    /// Sets the target-network refresh interval.
    pub fn target_update_interval(mut self, v: usize) -> Self {
        self.target_update_interval = v;
        self
    }

    /// Sets the target-network mixing coefficient.
    pub fn target_update_tau(mut self, v: f64) -> Self {
        self.target_update_tau = v;
        self
    }

    /// Sets the gradient-norm clip.
    pub fn clip_grad_norm(mut self, v: f64) -> Self {
        self.clip_grad_norm = v;
        self
    }

    /// Sets the training batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the number of gradient updates per optimization call.
    pub fn updates_per_optimize(mut self, v: usize) -> Self {
        self.updates_per_optimize = v;
        self
    }

    /// Sets the warm-up threshold.
    pub fn min_itr_learn(mut self, v: usize) -> Self {
        self.min_itr_learn = v;
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Checks the configuration invariants.
    pub fn validate(&self) -> Result<(), JumpyError> {
        if self.n_atoms < 2 {
            return Err(JumpyError::Config(format!(
                "n_atoms must be >= 2, got {}",
                self.n_atoms
            )));
        }
        if self.v_min >= self.v_max {
            return Err(JumpyError::Config(format!(
                "v_min must be < v_max, got [{}, {}]",
                self.v_min, self.v_max
            )));
        }
        if self.n_step_return == 0 {
            return Err(JumpyError::Config("n_step_return must be >= 1".into()));
        }
        if self.target_update_interval == 0 {
            return Err(JumpyError::Config(
                "target_update_interval must be >= 1".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(JumpyError::Config("batch_size must be >= 1".into()));
        }
        if self.updates_per_optimize == 0 {
            return Err(JumpyError::Config(
                "updates_per_optimize must be >= 1".into(),
            ));
        }
        if self.td_err_stride == 0 {
            return Err(JumpyError::Config("td_err_stride must be >= 1".into()));
        }
        if self.reward_limit < 1 {
            return Err(JumpyError::Config(format!(
                "reward_limit must be >= 1, got {}",
                self.reward_limit
            )));
        }
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(JumpyError::Config(format!(
                "discount must be in (0, 1], got {}",
                self.discount
            )));
        }
        Ok(())
    }

    /// Constructs [`ModelCatDqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ModelCatDqnConfig`] to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of ModelCatDqn agent into {:?}", file);
        Ok(())
    }
}
