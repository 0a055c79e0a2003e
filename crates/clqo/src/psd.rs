//! PSD separation oracle: inclusion-minimal non-PSD variable subsets.
//!
//! Growth then shrink
//! - Grow a subset in random order until its correlation matrix has an
//!   eigenvalue below `-tol`. If all `n` variables fit, the full matrix is PSD
//!   and the empty core is returned.
//! - One pass over the grown subset in insertion order: drop each index whose
//!   removal keeps the matrix non-PSD, reinsert (at the back) those whose
//!   removal restores PSD-ness. The result is minimal, not minimum.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::index::IndexError;
use crate::relaxation::RelaxationState;

/// Smallest eigenvalue of a symmetric matrix; `+∞` for the empty matrix.
pub fn min_eigenvalue(m: &DMatrix<f64>) -> f64 {
    if m.nrows() == 0 {
        return f64::INFINITY;
    }
    m.symmetric_eigenvalues()
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// PSD within tolerance: no eigenvalue below `-tol`.
#[inline]
pub fn is_psd(m: &DMatrix<f64>, tol: f64) -> bool {
    min_eigenvalue(m) >= -tol
}

/// Most negative eigenvalue and its unit eigenvector.
pub fn min_eigenpair(m: &DMatrix<f64>) -> Option<(f64, DVector<f64>)> {
    if m.nrows() == 0 || m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let eig = SymmetricEigen::new(m.clone());
    let (k, &lambda) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let v = eig.eigenvectors.column(k).into_owned();
    let norm = v.norm();
    if !(lambda.is_finite() && norm.is_finite()) || norm < 1e-12 {
        return None;
    }
    Some((lambda, v / norm))
}

/// Find an inclusion-minimal subset whose correlation matrix is not PSD.
///
/// Returns the empty vector when the full matrix is PSD within `tol`.
pub fn find_core<R: Rng + ?Sized>(
    state: &RelaxationState,
    tol: f64,
    rng: &mut R,
) -> Result<Vec<usize>, IndexError> {
    let mut pool: Vec<usize> = (0..state.n()).collect();
    pool.shuffle(rng);

    let mut core: Vec<usize> = Vec::with_capacity(pool.len());
    loop {
        let Some(next) = pool.pop() else {
            return Ok(Vec::new());
        };
        core.push(next);
        if !is_psd(&state.build_matrix(&core)?, tol) {
            break;
        }
    }

    let grown = core.len();
    for _ in 0..grown {
        let removed = core.remove(0);
        if is_psd(&state.build_matrix(&core)?, tol) {
            core.push(removed);
        }
    }
    Ok(core)
}
