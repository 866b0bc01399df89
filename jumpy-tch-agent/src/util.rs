//! Utilities.
use log::trace;
use tch::{nn::VarStore, Kind, Tensor};

/// Applies a soft update on target network variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
///
/// The blended values are computed under `no_grad` before being written, so
/// the target store is never observed mid-blend by the single driver thread
/// that reads it.
pub fn track(dest: &mut VarStore, src: &VarStore, tau: f64) {
    let src = src.variables();
    let mut dest = dest.variables();
    debug_assert_eq!(src.len(), dest.len());

    tch::no_grad(|| {
        for (name, src) in src.iter() {
            let dest = dest.get_mut(name).unwrap();
            dest.copy_(&(tau * src + (1.0 - tau) * &*dest));
        }
    });
    trace!("soft update");
}

/// Valid mask derived from termination flags.
///
/// An entry at or after the first set flag is invalid: its loss must not
/// contribute to the aggregate and its priority signal is zeroed.
pub fn valid_from_done(done: &Tensor) -> Tensor {
    let done = done.to_kind(Kind::Float);
    1 - done.cumsum(0, Kind::Float).clamp(0.0, 1.0)
}

/// Mean restricted to valid entries.
///
/// The denominator is clamped at one so a fully-invalid batch yields zero
/// instead of NaN.
pub fn valid_mean(values: &Tensor, valid: &Tensor) -> Tensor {
    let n = valid.sum(Kind::Float).clamp_min(1.0);
    (values * valid).sum(Kind::Float) / n
}

/// Picks the distribution at the given per-sample index.
///
/// `indexes` is `[B]`, `t` is `[B, A, P]`; returns `[B, P]`.
pub fn select_at_indexes(indexes: &Tensor, t: &Tensor) -> Tensor {
    let dims = t.size();
    let p = dims[dims.len() - 1];
    let ix = indexes
        .to_kind(Kind::Int64)
        .view([-1, 1, 1])
        .expand([-1, 1, p], false);
    t.gather(1, &ix, false).squeeze_dim(1)
}
