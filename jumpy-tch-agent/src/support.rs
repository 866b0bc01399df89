//! Fixed categorical support and distribution projection.
use jumpy_core::error::JumpyError;
use tch::{Device, Kind, Tensor};

/// A fixed discrete grid of candidate values.
///
/// The grid spans `[v_min, v_max]` with `n_atoms` evenly spaced bins and is
/// shared by every distributional computation of the agent. Constructed once
/// at agent setup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Support {
    v_min: f64,
    v_max: f64,
    n_atoms: i64,
}

impl Support {
    /// Creates a support grid, validating its bounds.
    pub fn new(v_min: f64, v_max: f64, n_atoms: i64) -> Result<Self, JumpyError> {
        if n_atoms < 2 {
            return Err(JumpyError::Config(format!(
                "n_atoms must be >= 2, got {}",
                n_atoms
            )));
        }
        if !(v_min < v_max) {
            return Err(JumpyError::Config(format!(
                "v_min must be < v_max, got [{}, {}]",
                v_min, v_max
            )));
        }
        Ok(Self {
            v_min,
            v_max,
            n_atoms,
        })
    }

    /// Lower bound of the grid.
    pub fn v_min(&self) -> f64 {
        self.v_min
    }

    /// Upper bound of the grid.
    pub fn v_max(&self) -> f64 {
        self.v_max
    }

    /// Number of bins.
    pub fn n_atoms(&self) -> i64 {
        self.n_atoms
    }

    /// Distance between neighboring atoms.
    pub fn bin_width(&self) -> f64 {
        (self.v_max - self.v_min) / (self.n_atoms - 1) as f64
    }

    /// The grid of candidate values, shape `[P]`.
    pub fn atoms(&self, device: Device) -> Tensor {
        Tensor::linspace(self.v_min, self.v_max, self.n_atoms, (Kind::Float, device))
    }

    /// Expected value of distributions carried on the last dimension.
    pub fn expected_value(&self, probs: &Tensor) -> Tensor {
        let z = self.atoms(probs.device());
        (probs * z).sum_dim_intlist(-1, false, Kind::Float)
    }

    /// Projects a bootstrapped target distribution back onto the grid.
    ///
    /// `return_n` and `done_n` are `[B]`, `probs` is `[B, P']` (the target
    /// distribution selected at the greedy action), and `contraction` is
    /// `discount^n_step_return`. The contracted grid is zeroed where the
    /// n-step segment terminated, shifted by the return, clamped into
    /// `[v_min, v_max]`, and its mass is redistributed with a triangular
    /// kernel: each shifted atom feeds at most two neighboring bins,
    /// proportional to proximity. The result sums to 1 wherever `probs` does.
    pub fn project(
        &self,
        return_n: &Tensor,
        done_n: &Tensor,
        probs: &Tensor,
        contraction: f64,
    ) -> Tensor {
        let delta_z = self.bin_width();
        let z = self.atoms(probs.device());

        let next_z = &z * contraction; // [P']
        let next_z = (1.0f64 - done_n.to_kind(Kind::Float)).outer(&next_z); // [B,P']
        let next_z = (return_n.to_kind(Kind::Float).unsqueeze(1) + next_z)
            .clamp(self.v_min, self.v_max); // [B,P']

        // coeffs is [B,P,P']: dim-1 indexes the fixed grid, dim-2 the shifted
        // atoms summed out by the projection. Most entries are zero.
        let z_bc = z.view([1, -1, 1]);
        let next_z_bc = next_z.unsqueeze(1);
        let coeffs = (1.0f64 - (next_z_bc - z_bc).abs() / delta_z).clamp(0.0, 1.0);

        (probs.unsqueeze(1) * coeffs).sum_dim_intlist(-1, false, Kind::Float)
    }

    /// Projects scalar values onto the grid as categorical distributions.
    ///
    /// Degenerate single-point case of [`Support::project`], used to turn
    /// actual rewards into targets for the reward head: the value is clamped
    /// into range and its unit mass split between its two neighboring bins.
    pub fn project_scalars(&self, values: &Tensor) -> Tensor {
        let z = self.atoms(values.device());
        let v = values
            .to_kind(Kind::Float)
            .clamp(self.v_min, self.v_max)
            .unsqueeze(-1); // [B,1]
        (1.0f64 - (v - z).abs() / self.bin_width()).clamp(0.0, 1.0)
    }
}
