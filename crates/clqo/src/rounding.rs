//! Randomized hyperplane rounding from a relaxation point.
//!
//! The full correlation matrix `M` may be indefinite. With `m = λ_min(M) − shift`
//! the affine map `M ↦ (M − m I)/(1 − m)` keeps the unit diagonal and makes
//! every eigenvalue `(λ − m)/(1 − m) > 0`, so a Cholesky factor `L` exists.
//! Each trial draws `g ~ N(0, I)` with `g_0 >= 0`, and takes `sign(L g)`.

use nalgebra::{Cholesky, DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;

use crate::index::IndexError;
use crate::problem::Problem;
use crate::psd::min_eigenvalue;
use crate::relaxation::{sign, RelaxationState};

#[derive(Debug, Clone, PartialEq)]
pub enum RoundingError {
    Index(IndexError),
    /// The shifted matrix was not numerically positive definite.
    Factorization { min_eigenvalue: f64 },
}

impl fmt::Display for RoundingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(e) => write!(f, "rounding: {e}"),
            Self::Factorization { min_eigenvalue } => write!(
                f,
                "Cholesky factorization failed (smallest eigenvalue {min_eigenvalue})"
            ),
        }
    }
}

impl std::error::Error for RoundingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Index(e) => Some(e),
            Self::Factorization { .. } => None,
        }
    }
}

impl From<IndexError> for RoundingError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

/// Result of a rounding run.
#[derive(Clone, Debug)]
pub struct RoundingReport {
    /// Smallest eigenvalue of the unshifted full matrix.
    pub min_eigenvalue: f64,
    /// Score of each trial, in draw order.
    pub trial_scores: Vec<f64>,
    /// Best trial (first one on ties); `None` only when no trial ran.
    pub best: Option<(DVector<f64>, f64)>,
}

/// Shift/scale a unit-diagonal symmetric matrix to be positive definite.
///
/// Returns the adjusted matrix and the smallest eigenvalue of the input.
pub fn shift_to_psd(m: &DMatrix<f64>, shift: f64) -> (DMatrix<f64>, f64) {
    let n = m.nrows();
    let lambda = min_eigenvalue(m);
    let lo = lambda.min(1.0) - shift.max(0.0);
    let mut adjusted = m * (-1.0 / (lo - 1.0));
    adjusted += DMatrix::identity(n, n) * (lo / (lo - 1.0));
    (adjusted, lambda)
}

/// Run `trials` hyperplane roundings of the current relaxation point.
pub fn round<R: Rng + ?Sized>(
    problem: &Problem,
    state: &RelaxationState,
    trials: usize,
    shift: f64,
    rng: &mut R,
) -> Result<RoundingReport, RoundingError> {
    let n = state.n();
    let full = state.build_full_matrix()?;
    let (adjusted, lambda) = shift_to_psd(&full, shift);
    let l = Cholesky::new(adjusted)
        .ok_or(RoundingError::Factorization {
            min_eigenvalue: lambda,
        })?
        .l();

    let mut trial_scores = Vec::with_capacity(trials);
    let mut best: Option<(DVector<f64>, f64)> = None;
    for _ in 0..trials {
        let mut g = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));
        if n > 0 {
            g[0] = g[0].abs();
        }
        let x = (&l * g).map(sign);
        let score = problem.score(&x);
        trial_scores.push(score);
        if best.as_ref().is_none_or(|(_, b)| score > *b) {
            best = Some((x, score));
        }
    }
    Ok(RoundingReport {
        min_eigenvalue: lambda,
        trial_scores,
        best,
    })
}
