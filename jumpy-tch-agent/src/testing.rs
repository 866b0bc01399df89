//! Fixtures shared by the unit tests.
use crate::{batch::SequenceBatch, model::AgentModel, util::track};
use anyhow::Result;
use jumpy_core::{ExperienceBufferBase, ReplayBufferBase};
use std::path::Path;
use tch::{
    nn,
    nn::{Module, VarStore},
    Device, Kind, Tensor,
};

/// One-hot distribution at `ix`, `[b, p]`.
pub(crate) fn one_hot(b: i64, p: i64, ix: i64) -> Tensor {
    let mut v = vec![0f32; p as usize];
    v[ix as usize] = 1.0;
    Tensor::from_slice(&v).view([1, p]).expand([b, p], false)
}

/// Stacks per-action distributions (each `[1, p]`) into `[b, a, p]`.
pub(crate) fn action_dists(b: i64, dists: &[Tensor]) -> Tensor {
    let a = dists.len() as i64;
    let p = dists[0].size()[1];
    Tensor::cat(dists, 0)
        .view([1, a, p])
        .expand([b, a, p], false)
}

/// All-zero batch with `[horizon, b, obs_dim]` observations.
pub(crate) fn zero_batch(horizon: i64, b: i64, obs_dim: i64) -> SequenceBatch {
    let done = Tensor::zeros(&[horizon, b], (Kind::Float, Device::Cpu));
    zero_batch_with(horizon, b, obs_dim, done, None)
}

/// All-zero batch with explicit termination flags and importance weights.
pub(crate) fn zero_batch_with(
    horizon: i64,
    b: i64,
    obs_dim: i64,
    done: Tensor,
    is_weights: Option<Tensor>,
) -> SequenceBatch {
    let float = (Kind::Float, Device::Cpu);
    SequenceBatch::new(
        Tensor::zeros(&[horizon, b, obs_dim], float),
        Tensor::zeros(&[horizon, b], (Kind::Int64, Device::Cpu)),
        Tensor::zeros(&[horizon, b], float),
        done,
        Tensor::zeros(&[horizon, b], float),
        Tensor::zeros(&[horizon, b], float),
        is_weights,
        None,
    )
    .unwrap()
}

/// Model returning fixed distributions, for exercising the loss math.
///
/// The latent is the observation itself; the reward head emits uniform
/// zero logits over three atoms.
pub(crate) struct StubModel {
    live: Tensor,
    target: Tensor,
    stem_vs: VarStore,
    trans_vs: VarStore,
}

impl StubModel {
    pub fn new(live: Tensor, target: Tensor) -> Self {
        Self {
            live,
            target,
            stem_vs: VarStore::new(Device::Cpu),
            trans_vs: VarStore::new(Device::Cpu),
        }
    }

    fn reward_logits_like(&self, latent: &Tensor) -> Tensor {
        Tensor::zeros(&[latent.size()[0], 3], (Kind::Float, Device::Cpu))
    }
}

impl AgentModel for StubModel {
    fn forward(&self, _obs: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        self.live.shallow_clone()
    }

    fn target_forward(&self, _obs: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        self.target.shallow_clone()
    }

    fn stem_forward(&self, obs: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        obs.shallow_clone()
    }

    fn head_forward(&self, _latent: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        self.live.shallow_clone()
    }

    fn reward_logits(&self, latent: &Tensor) -> Tensor {
        self.reward_logits_like(latent)
    }

    fn step(&self, latent: &Tensor, _action: &Tensor) -> (Tensor, Tensor) {
        (latent.shallow_clone(), self.reward_logits_like(latent))
    }

    fn update_target(&mut self, _tau: f64) {}

    fn stem_var_store(&self) -> &VarStore {
        &self.stem_vs
    }

    fn transition_var_store(&self) -> &VarStore {
        &self.trans_vs
    }

    fn save<T: AsRef<Path>>(&self, _path: T) -> Result<()> {
        Ok(())
    }

    fn load<T: AsRef<Path>>(&mut self, _path: T) -> Result<()> {
        Ok(())
    }
}

/// Small linear networks, for exercising the optimization driver end to end.
pub(crate) struct TinyModel {
    stem_vs: VarStore,
    target_vs: VarStore,
    trans_vs: VarStore,
    stem: nn::Linear,
    head: nn::Linear,
    target_stem: nn::Linear,
    target_head: nn::Linear,
    dynamics: nn::Linear,
    reward_head: nn::Linear,
    n_actions: i64,
    n_atoms: i64,
}

impl TinyModel {
    pub fn new(obs_dim: i64, latent_dim: i64, n_actions: i64, n_atoms: i64) -> Self {
        let stem_vs = VarStore::new(Device::Cpu);
        let (stem, head) = {
            let root = stem_vs.root();
            (
                nn::linear(&root / "stem", obs_dim, latent_dim, Default::default()),
                nn::linear(&root / "head", latent_dim, n_actions * n_atoms, Default::default()),
            )
        };
        let mut target_vs = VarStore::new(Device::Cpu);
        let (target_stem, target_head) = {
            let root = target_vs.root();
            (
                nn::linear(&root / "stem", obs_dim, latent_dim, Default::default()),
                nn::linear(&root / "head", latent_dim, n_actions * n_atoms, Default::default()),
            )
        };
        target_vs.copy(&stem_vs).unwrap();
        let trans_vs = VarStore::new(Device::Cpu);
        let (dynamics, reward_head) = {
            let root = trans_vs.root();
            (
                nn::linear(&root / "dynamics", latent_dim, latent_dim, Default::default()),
                nn::linear(&root / "reward", latent_dim, 3, Default::default()),
            )
        };
        Self {
            stem_vs,
            target_vs,
            trans_vs,
            stem,
            head,
            target_stem,
            target_head,
            dynamics,
            reward_head,
            n_actions,
            n_atoms,
        }
    }

    fn dist(&self, latent: &Tensor, head: &nn::Linear) -> Tensor {
        head.forward(latent)
            .view([-1, self.n_actions, self.n_atoms])
            .softmax(-1, Kind::Float)
    }
}

impl AgentModel for TinyModel {
    fn forward(&self, obs: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        self.dist(&self.stem.forward(obs), &self.head)
    }

    fn target_forward(&self, obs: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        self.dist(&self.target_stem.forward(obs), &self.target_head)
    }

    fn stem_forward(&self, obs: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        self.stem.forward(obs)
    }

    fn head_forward(&self, latent: &Tensor, _prev_action: &Tensor, _prev_reward: &Tensor) -> Tensor {
        self.dist(latent, &self.head)
    }

    fn reward_logits(&self, latent: &Tensor) -> Tensor {
        self.reward_head.forward(latent)
    }

    fn step(&self, latent: &Tensor, _action: &Tensor) -> (Tensor, Tensor) {
        let next = self.dynamics.forward(latent);
        let rew = self.reward_head.forward(&next);
        (next, rew)
    }

    fn update_target(&mut self, tau: f64) {
        track(&mut self.target_vs, &self.stem_vs, tau);
    }

    fn stem_var_store(&self) -> &VarStore {
        &self.stem_vs
    }

    fn transition_var_store(&self) -> &VarStore {
        &self.trans_vs
    }

    fn save<T: AsRef<Path>>(&self, _path: T) -> Result<()> {
        Ok(())
    }

    fn load<T: AsRef<Path>>(&mut self, _path: T) -> Result<()> {
        Ok(())
    }
}

/// Buffer returning freshly generated random batches and counting the calls
/// made by the optimization driver.
pub(crate) struct TestBuffer {
    horizon: i64,
    obs_dim: i64,
    n_actions: i64,
    prioritized: bool,
    pub pushed: usize,
    pub batches_drawn: usize,
    pub priority_updates: usize,
    pub beta: Option<f32>,
}

impl TestBuffer {
    pub fn new(horizon: i64, obs_dim: i64, n_actions: i64, prioritized: bool) -> Self {
        Self {
            horizon,
            obs_dim,
            n_actions,
            prioritized,
            pushed: 0,
            batches_drawn: 0,
            priority_updates: 0,
            beta: None,
        }
    }
}

impl ExperienceBufferBase for TestBuffer {
    type Item = ();

    fn push(&mut self, _tr: ()) -> Result<()> {
        self.pushed += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.pushed
    }
}

impl ReplayBufferBase for TestBuffer {
    type Config = ();
    type Batch = SequenceBatch;

    fn build(_config: &Self::Config) -> Self {
        unimplemented!()
    }

    fn batch(&mut self, size: usize) -> Result<SequenceBatch> {
        self.batches_drawn += 1;
        let (t, b) = (self.horizon, size as i64);
        let float = (Kind::Float, Device::Cpu);
        let (is_weights, ixs) = if self.prioritized {
            (
                Some(Tensor::ones(&[b], float)),
                Some((0..size).collect::<Vec<_>>()),
            )
        } else {
            (None, None)
        };
        Ok(SequenceBatch::new(
            Tensor::randn(&[t, b, self.obs_dim], float),
            Tensor::randint(self.n_actions, &[t, b], (Kind::Int64, Device::Cpu)),
            Tensor::randn(&[t, b], float),
            Tensor::zeros(&[t, b], float),
            Tensor::zeros(&[t, b], float),
            Tensor::randn(&[t, b], float),
            is_weights,
            ixs,
        )?)
    }

    fn update_priority(&mut self, ixs: &Option<Vec<usize>>, errs: &Option<Vec<f32>>) {
        assert!(ixs.is_some());
        assert!(errs.is_some());
        self.priority_updates += 1;
    }

    fn set_beta(&mut self, beta: f32) {
        self.beta = Some(beta);
    }
}
