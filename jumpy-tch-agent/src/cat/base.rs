//! Optimization driver of the model-based categorical DQN.
use super::{config::ModelCatDqnConfig, loss::CatLoss, rollout::LatentRollout};
use crate::{batch::SequenceBatch, model::AgentModel, opt::Optimizer, support::Support};
use anyhow::Result;
use jumpy_core::{
    record::{Record, RecordValue},
    ExperienceBufferBase, IwScheduler, ReplayBufferBase, SequenceBatchBase,
};
use log::{info, trace};
use std::{convert::TryFrom, fs, marker::PhantomData, path::Path};
use tch::Tensor;

/// Scalars collected over one optimization call, one entry per update.
#[derive(Debug, Default)]
pub struct OptInfo {
    /// Training loss.
    pub loss: Vec<f32>,
    /// Post-clip gradient norm of the main parameter group.
    pub grad_norm: Vec<f32>,
    /// Strided downsample of the absolute TD-like errors.
    pub td_abs_err: Vec<f32>,
}

impl OptInfo {
    /// Returns `true` when the call performed no updates.
    pub fn is_empty(&self) -> bool {
        self.loss.is_empty()
    }

    /// Summarizes the collected scalars as a record.
    pub fn to_record(&self) -> Record {
        fn mean(v: &[f32]) -> f32 {
            v.iter().sum::<f32>() / v.len().max(1) as f32
        }
        Record::from_slice(&[
            ("loss", RecordValue::Scalar(mean(&self.loss))),
            ("grad_norm", RecordValue::Scalar(mean(&self.grad_norm))),
            ("td_abs_err", RecordValue::Array1(self.td_abs_err.clone())),
        ])
    }
}

/// Model-based categorical DQN.
///
/// Owns the single-step loss strategy, the optional latent rollout and the
/// optimizers of the two parameter groups. When the rollout is enabled and
/// the stem latent is detached, the main and the transition-model losses get
/// independent backward passes; when trained jointly there is one combined
/// backward through both groups.
pub struct ModelCatDqn<M, R>
where
    M: AgentModel,
    R: ExperienceBufferBase + ReplayBufferBase<Batch = SequenceBatch>,
{
    model: M,
    cat_loss: CatLoss,
    rollout: Option<LatentRollout>,
    optimizer: Optimizer,
    model_optimizer: Option<Optimizer>,
    iw_scheduler: Option<IwScheduler>,
    prioritized_replay: bool,
    clip_grad_norm: f64,
    batch_size: usize,
    updates_per_optimize: usize,
    min_itr_learn: usize,
    target_update_interval: usize,
    target_update_tau: f64,
    td_err_stride: usize,
    update_counter: usize,
    target_version: usize,
    phantom: PhantomData<R>,
}

impl<M, R> ModelCatDqn<M, R>
where
    M: AgentModel,
    R: ExperienceBufferBase + ReplayBufferBase<Batch = SequenceBatch>,
{
    /// Constructs the agent, validating the configuration once.
    pub fn build(config: ModelCatDqnConfig, model: M) -> Result<Self> {
        config.validate()?;
        let support = Support::new(config.v_min, config.v_max, config.n_atoms)?;
        let cat_loss = CatLoss::new(
            support,
            config.discount,
            config.n_step_return,
            config.double_dqn,
            config.mid_batch_reset,
        );
        let optimizer = config.opt_config.build(model.stem_var_store())?;
        let (rollout, model_optimizer) = if config.learn_model {
            let limit = config.reward_limit as f64;
            let reward_support = Support::new(-limit, limit, 2 * config.reward_limit + 1)?;
            (
                Some(LatentRollout::new(
                    config.jumps,
                    config.detach_model,
                    reward_support,
                )),
                Some(config.opt_config.build(model.transition_var_store())?),
            )
        } else {
            (None, None)
        };
        let iw_scheduler = match config.prioritized_replay {
            true => Some(IwScheduler::new(
                config.pri_beta_init,
                config.pri_beta_final,
                config.pri_beta_steps,
            )),
            false => None,
        };

        Ok(Self {
            model,
            cat_loss,
            rollout,
            optimizer,
            model_optimizer,
            iw_scheduler,
            prioritized_replay: config.prioritized_replay,
            clip_grad_norm: config.clip_grad_norm,
            batch_size: config.batch_size,
            updates_per_optimize: config.updates_per_optimize,
            min_itr_learn: config.min_itr_learn,
            target_update_interval: config.target_update_interval,
            target_update_tau: config.target_update_tau,
            td_err_stride: config.td_err_stride,
            update_counter: 0,
            target_version: 0,
            phantom: PhantomData,
        })
    }

    /// Number of gradient updates performed so far.
    pub fn update_counter(&self) -> usize {
        self.update_counter
    }

    /// Number of target-network refreshes performed so far.
    pub fn target_version(&self) -> usize {
        self.target_version
    }

    /// The model being trained.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// One gradient update. Returns `(loss, kl_divergence, grad_norm)`.
    fn update(&mut self, batch: &SequenceBatch) -> Result<(Tensor, Tensor, f32)> {
        trace!("ModelCatDqn::update()");
        match (&self.rollout, &mut self.model_optimizer) {
            (Some(rollout), Some(model_opt)) => {
                let (rl_loss, kl_div, model_loss) =
                    rollout.loss(&self.model, &self.cat_loss, batch)?;
                if !rollout.detach_model() {
                    // Joint training: one backward through both groups.
                    let loss = rl_loss + model_loss;
                    self.optimizer.zero_grad();
                    model_opt.zero_grad();
                    loss.backward();
                    self.optimizer.clip_grad_norm(self.clip_grad_norm);
                    model_opt.clip_grad_norm(self.clip_grad_norm);
                    let grad_norm = self.optimizer.grad_norm();
                    self.optimizer.step();
                    model_opt.step();
                    Ok((loss, kl_div, grad_norm))
                } else {
                    // Decoupled: the main group steps before the model loss is
                    // backed so the second pass cannot disturb consumed
                    // gradients. The detached latent keeps the graphs apart.
                    self.optimizer.zero_grad();
                    rl_loss.backward();
                    self.optimizer.clip_grad_norm(self.clip_grad_norm);
                    let grad_norm = self.optimizer.grad_norm();
                    self.optimizer.step();
                    model_opt.zero_grad();
                    model_loss.backward();
                    model_opt.clip_grad_norm(self.clip_grad_norm);
                    model_opt.step();
                    Ok((rl_loss, kl_div, grad_norm))
                }
            }
            _ => {
                let n_step = self.cat_loss.n_step_return();
                batch.check_horizon(n_step + 2)?;
                let latent = self.model.stem_forward(
                    &batch.observation(1),
                    &batch.action(0),
                    &batch.reward(0),
                );
                let (loss, kl_div) = self.cat_loss.rl_loss(
                    &self.model,
                    &latent,
                    &batch.step_inputs(0, n_step),
                    batch.is_weights(),
                );
                self.optimizer.zero_grad();
                loss.backward();
                self.optimizer.clip_grad_norm(self.clip_grad_norm);
                let grad_norm = self.optimizer.grad_norm();
                self.optimizer.step();
                Ok((loss, kl_div, grad_norm))
            }
        }
    }

    /// Appends freshly collected samples, then trains.
    ///
    /// Returns an empty [`OptInfo`] while `itr` is below the warm-up
    /// threshold. Otherwise runs the configured number of updates, feeds
    /// KL-derived priorities back into the buffer, refreshes the target
    /// network at the configured interval and applies the beta schedule.
    pub fn optimize(
        &mut self,
        itr: usize,
        new_samples: Option<R::Item>,
        buffer: &mut R,
    ) -> Result<OptInfo> {
        if let Some(samples) = new_samples {
            buffer.push(samples)?;
        }
        let mut opt_info = OptInfo::default();
        if itr < self.min_itr_learn {
            return Ok(opt_info);
        }

        for _ in 0..self.updates_per_optimize {
            let batch = buffer.batch(self.batch_size)?;
            let (loss, kl_div, grad_norm) = self.update(&batch)?;

            let td_abs_errs = Vec::<f32>::try_from(&kl_div.abs())?;
            if self.prioritized_replay {
                buffer.update_priority(batch.indexes(), &Some(td_abs_errs.clone()));
            }
            opt_info.loss.push(f32::try_from(&loss)?);
            opt_info.grad_norm.push(grad_norm);
            opt_info
                .td_abs_err
                .extend(td_abs_errs.iter().step_by(self.td_err_stride));

            self.update_counter += 1;
            if self.update_counter % self.target_update_interval == 0 {
                trace!("Update target network");
                self.model.update_target(self.target_update_tau);
                self.target_version += 1;
            }
        }

        self.update_itr_hyperparams(itr, buffer);
        Ok(opt_info)
    }

    fn update_itr_hyperparams(&self, itr: usize, buffer: &mut R) {
        if let Some(sched) = &self.iw_scheduler {
            buffer.set_beta(sched.beta(itr));
        }
    }

    /// Saves the model parameters under the given directory.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        fs::create_dir_all(&path)?;
        self.model.save(&path)?;
        info!("Saved the model in {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the model parameters from the given directory.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.model.load(&path)?;
        info!("Loaded the model from {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ModelCatDqn;
    use crate::{
        cat::ModelCatDqnConfig,
        testing::{TestBuffer, TinyModel},
    };

    const OBS_DIM: i64 = 4;
    const LATENT_DIM: i64 = 8;
    const N_ACTIONS: i64 = 2;
    const N_ATOMS: i64 = 11;

    fn config() -> ModelCatDqnConfig {
        ModelCatDqnConfig::default()
            .support(-10.0, 10.0, N_ATOMS)
            .batch_size(6)
            .target_update_interval(2)
    }

    fn agent(config: ModelCatDqnConfig) -> ModelCatDqn<TinyModel, TestBuffer> {
        let model = TinyModel::new(OBS_DIM, LATENT_DIM, N_ACTIONS, N_ATOMS);
        ModelCatDqn::build(config, model).unwrap()
    }

    #[test]
    fn test_build_rejects_bad_config() {
        let model = TinyModel::new(OBS_DIM, LATENT_DIM, N_ACTIONS, N_ATOMS);
        let config = config().support(10.0, -10.0, N_ATOMS);
        assert!(ModelCatDqn::<TinyModel, TestBuffer>::build(config, model).is_err());
    }

    #[test]
    fn test_warmup_gate() {
        let mut agent = agent(config().min_itr_learn(5));
        let mut buffer = TestBuffer::new(3, OBS_DIM, N_ACTIONS, false);
        let info = agent.optimize(4, Some(()), &mut buffer).unwrap();
        assert!(info.is_empty());
        assert_eq!(buffer.batches_drawn, 0);
        assert_eq!(buffer.pushed, 1);

        let info = agent.optimize(5, None, &mut buffer).unwrap();
        assert!(!info.is_empty());
        assert_eq!(buffer.batches_drawn, 1);
    }

    #[test]
    fn test_update_and_target_refresh_counters() {
        let mut agent = agent(config().updates_per_optimize(3));
        let mut buffer = TestBuffer::new(3, OBS_DIM, N_ACTIONS, false);
        let info = agent.optimize(0, None, &mut buffer).unwrap();

        assert_eq!(info.loss.len(), 3);
        assert_eq!(info.grad_norm.len(), 3);
        assert!(info.grad_norm.iter().all(|g| g.is_finite()));
        assert_eq!(agent.update_counter(), 3);
        // The interval is 2: one refresh after three updates.
        assert_eq!(agent.target_version(), 1);
        assert_eq!(buffer.priority_updates, 0);
        assert!(buffer.beta.is_none());
    }

    #[test]
    fn test_priority_feedback_and_beta() {
        let config = config()
            .updates_per_optimize(2)
            .prioritized_replay(true)
            .pri_beta(0.4, 1.0, 100);
        let mut agent = agent(config);
        let mut buffer = TestBuffer::new(3, OBS_DIM, N_ACTIONS, true);
        let info = agent.optimize(50, None, &mut buffer).unwrap();

        assert_eq!(buffer.priority_updates, 2);
        assert!((buffer.beta.unwrap() - 0.7).abs() < 1e-6);
        // Batch size 6, stride 8: one strided error per update.
        assert_eq!(info.td_abs_err.len(), 2);
    }

    #[test]
    fn test_joint_model_training() {
        let config = config().learn_model(true).detach_model(false).jumps(1);
        let mut agent = agent(config);
        let mut buffer = TestBuffer::new(5, OBS_DIM, N_ACTIONS, false);
        let info = agent.optimize(0, None, &mut buffer).unwrap();
        assert_eq!(info.loss.len(), 1);
        assert!(info.loss[0].is_finite());
    }

    #[test]
    fn test_decoupled_model_training() {
        let config = config().learn_model(true).detach_model(true).jumps(1);
        let mut agent = agent(config);
        let mut buffer = TestBuffer::new(5, OBS_DIM, N_ACTIONS, false);
        let info = agent.optimize(0, None, &mut buffer).unwrap();
        assert_eq!(info.loss.len(), 1);
        assert!(info.loss[0].is_finite());
    }

    #[test]
    fn test_undersized_horizon_fails() {
        // jumps = 2 with n_step = 1 needs a horizon of 5; the buffer
        // delivers 4.
        let config = config().learn_model(true).jumps(2);
        let mut agent = agent(config);
        let mut buffer = TestBuffer::new(4, OBS_DIM, N_ACTIONS, false);
        assert!(agent.optimize(0, None, &mut buffer).is_err());
    }

    #[test]
    fn test_opt_info_record() {
        let info = super::OptInfo {
            loss: vec![1.0, 3.0],
            grad_norm: vec![0.5, 1.5],
            td_abs_err: vec![0.1, 0.2],
        };
        let record = info.to_record();
        assert_eq!(record.get_scalar("loss").unwrap(), 2.0);
        assert_eq!(record.get_scalar("grad_norm").unwrap(), 1.0);
        assert_eq!(record.get_array1("td_abs_err").unwrap(), vec![0.1, 0.2]);
    }
}
