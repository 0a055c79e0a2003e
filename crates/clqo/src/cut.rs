//! Cutting planes from non-PSD cores.
//!
//! A `Cut` reads `Σ_k coeffs[k] · X_k >= constant`, where `X_k` is the pairwise
//! variable with local packed index `k + 1` inside the core (pair `(a, b)`,
//! `a > b`, refers to `core[a]`, `core[b]`).
//!
//! `EigenCutGenerator` takes the unit eigenvector `v` of the most negative
//! eigenvalue. Every realizable `X = x xᵀ` with `x ∈ {±1}^k` satisfies
//! `vᵀ X v = (v·x)² >= β`, i.e. `Σ_{a>b} 2 v_a v_b X_ab >= β − |v|²`.
//! `β = min_x (v·x)²` by enumeration for small cores, else `β = 0`.

use nalgebra::{DMatrix, DVector};

use crate::cfg::SolveCfg;
use crate::index::{IndexError, PairIndex};
use crate::psd::min_eigenpair;

/// Linear inequality over the pairwise variables of a core.
#[derive(Clone, Debug, PartialEq)]
pub struct Cut {
    pub constant: f64,
    pub coeffs: Vec<f64>,
}

impl Cut {
    /// Left-hand side evaluated on a core-local correlation matrix.
    pub fn lhs(&self, local: &DMatrix<f64>) -> Result<f64, IndexError> {
        let idx = PairIndex::new(local.nrows());
        let mut s = 0.0;
        for (k, c) in self.coeffs.iter().enumerate() {
            let (a, b) = idx.to_pair(k + 1)?;
            s += c * local[(a, b)];
        }
        Ok(s)
    }

    /// `constant − lhs`; positive means the matrix violates the cut.
    pub fn violation(&self, local: &DMatrix<f64>) -> Result<f64, IndexError> {
        Ok(self.constant - self.lhs(local)?)
    }

    /// Map local coefficients to `(global column, coefficient)` in local order.
    pub fn to_global(
        &self,
        core: &[usize],
        global: &PairIndex,
    ) -> Result<Vec<(usize, f64)>, IndexError> {
        let local = PairIndex::new(core.len());
        self.coeffs
            .iter()
            .enumerate()
            .map(|(k, &c)| {
                let (a, b) = local.to_pair(k + 1)?;
                Ok((global.column(core[a], core[b])?, c))
            })
            .collect()
    }
}

/// Source of separating inequalities for a non-PSD core matrix.
///
/// `None` means no separating inequality was found; the caller may retry with
/// another core.
pub trait CutGenerator {
    fn generate(&mut self, core_matrix: &DMatrix<f64>) -> Option<Cut>;
}

/// Eigenvector cut with an integrally strengthened right-hand side.
#[derive(Clone, Copy, Debug)]
pub struct EigenCutGenerator {
    pub psd_tol: f64,
    pub min_violation: f64,
    pub exhaustive_limit: usize,
}

impl EigenCutGenerator {
    /// Generator sharing the separation tolerance and cut thresholds of `cfg`.
    pub fn from_cfg(cfg: &SolveCfg) -> Self {
        Self {
            psd_tol: cfg.psd_tol,
            min_violation: cfg.min_cut_violation,
            exhaustive_limit: cfg.exhaustive_core_limit,
        }
    }
}

impl Default for EigenCutGenerator {
    fn default() -> Self {
        Self::from_cfg(&SolveCfg::default())
    }
}

impl CutGenerator for EigenCutGenerator {
    fn generate(&mut self, core_matrix: &DMatrix<f64>) -> Option<Cut> {
        let k = core_matrix.nrows();
        if k < 2 {
            return None;
        }
        let (lambda, v) = min_eigenpair(core_matrix)?;
        if lambda >= -self.psd_tol {
            return None;
        }
        let beta = if k <= self.exhaustive_limit {
            min_signed_square(&v)
        } else {
            0.0
        };
        let idx = PairIndex::new(k);
        let mut coeffs = Vec::with_capacity(idx.len());
        for p in 1..=idx.len() {
            let (a, b) = idx.to_pair(p).ok()?;
            coeffs.push(2.0 * v[a] * v[b]);
        }
        let cut = Cut {
            constant: beta - v.norm_squared(),
            coeffs,
        };
        if !(cut.constant.is_finite() && cut.coeffs.iter().all(|c| c.is_finite())) {
            return None;
        }
        let violation = cut.violation(core_matrix).ok()?;
        if violation < self.min_violation {
            return None;
        }
        Some(cut)
    }
}

/// `min (v·x)²` over `x ∈ {±1}^k` with `x_0 = +1`.
fn min_signed_square(v: &DVector<f64>) -> f64 {
    let k = v.len();
    if k == 0 {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    for mask in 0u64..(1u64 << (k - 1)) {
        let mut dot = v[0];
        for i in 1..k {
            if (mask >> (i - 1)) & 1 == 1 {
                dot -= v[i];
            } else {
                dot += v[i];
            }
        }
        best = best.min(dot * dot);
    }
    best
}
