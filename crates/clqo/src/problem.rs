//! Binary quadratic problem over ±1 variables.
//!
//! Objective: `score(x) = c + Σ_{i<j} w_ij x_i x_j` for `x ∈ {±1}^n`.
//! The coefficient matrix is symmetric; its diagonal is ignored.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use std::fmt;

/// Symmetry tolerance for `w_ij` vs `w_ji` at construction.
const SYM_EPS: f64 = 1e-9;
/// Largest `n` accepted by `exhaustive_optimum`.
pub const EXHAUSTIVE_MAX_N: usize = 24;

#[derive(Debug, Clone, PartialEq)]
pub enum ProblemError {
    NotSquare { rows: usize, cols: usize },
    NonFinite { i: usize, j: usize },
    Asymmetric { i: usize, j: usize, diff: f64 },
}

impl fmt::Display for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSquare { rows, cols } => {
                write!(f, "coefficient matrix must be square, got {rows}x{cols}")
            }
            Self::NonFinite { i, j } => write!(f, "coefficient ({i}, {j}) is not finite"),
            Self::Asymmetric { i, j, diff } => {
                write!(f, "coefficients ({i}, {j}) and ({j}, {i}) differ by {diff}")
            }
        }
    }
}

impl std::error::Error for ProblemError {}

/// Quadratic ±1 maximization problem.
#[derive(Clone, Debug)]
pub struct Problem {
    coeffs: DMatrix<f64>,
    constant: f64,
}

impl Problem {
    pub fn new(coeffs: DMatrix<f64>, constant: f64) -> Result<Self, ProblemError> {
        let (rows, cols) = coeffs.shape();
        if rows != cols {
            return Err(ProblemError::NotSquare { rows, cols });
        }
        if !constant.is_finite() {
            return Err(ProblemError::NonFinite { i: rows, j: cols });
        }
        for i in 0..rows {
            for j in (i + 1)..cols {
                let (a, b) = (coeffs[(i, j)], coeffs[(j, i)]);
                if !a.is_finite() {
                    return Err(ProblemError::NonFinite { i, j });
                }
                if !b.is_finite() {
                    return Err(ProblemError::NonFinite { i: j, j: i });
                }
                let diff = (a - b).abs();
                if diff > SYM_EPS * (1.0 + a.abs().max(b.abs())) {
                    return Err(ProblemError::Asymmetric { i, j, diff });
                }
            }
        }
        Ok(Self { coeffs, constant })
    }

    /// Build from the strict upper triangle; `upper[(i, j)]` for `i < j` is used.
    pub fn from_upper(upper: &DMatrix<f64>, constant: f64) -> Result<Self, ProblemError> {
        let n = upper.nrows();
        let coeffs = DMatrix::from_fn(n, n, |i, j| match i.cmp(&j) {
            std::cmp::Ordering::Less => upper[(i, j)],
            std::cmp::Ordering::Greater => upper[(j, i)],
            std::cmp::Ordering::Equal => 0.0,
        });
        Self::new(coeffs, constant)
    }

    /// Random problem with each pair present with probability `density` and
    /// weight uniform in `[-1, 1]`.
    pub fn random<R: Rng>(n: usize, density: f64, rng: &mut R) -> Self {
        let p = density.clamp(0.0, 1.0);
        let mut coeffs = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                if rng.gen::<f64>() < p {
                    let w = rng.gen_range(-1.0..=1.0);
                    coeffs[(i, j)] = w;
                    coeffs[(j, i)] = w;
                }
            }
        }
        Self {
            coeffs,
            constant: 0.0,
        }
    }

    /// Number of ±1 variables.
    #[inline]
    pub fn n(&self) -> usize {
        self.coeffs.nrows()
    }

    #[inline]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Pair weight `w_ij` (symmetric).
    #[inline]
    pub fn coeff(&self, i: usize, j: usize) -> f64 {
        self.coeffs[(i, j)]
    }

    pub fn coeffs(&self) -> &DMatrix<f64> {
        &self.coeffs
    }

    /// Objective value of a sign vector. Entries are used as given (callers pass ±1).
    pub fn score(&self, x: &DVector<f64>) -> f64 {
        let n = self.n();
        debug_assert_eq!(x.len(), n, "sign vector length mismatch");
        let mut s = self.constant;
        for i in 0..n {
            for j in (i + 1)..n {
                s += self.coeffs[(i, j)] * x[i] * x[j];
            }
        }
        s
    }

    /// Trivial bound `c + Σ_{i<j} |w_ij|`, valid for every sign vector.
    pub fn naive_upper_bound(&self) -> f64 {
        let n = self.n();
        let mut ub = self.constant;
        for i in 0..n {
            for j in (i + 1)..n {
                ub += self.coeffs[(i, j)].abs();
            }
        }
        ub
    }

    /// Brute-force optimum with `x_0 = +1`; `None` if `n > EXHAUSTIVE_MAX_N`.
    pub fn exhaustive_optimum(&self) -> Option<(DVector<f64>, f64)> {
        let n = self.n();
        if n > EXHAUSTIVE_MAX_N {
            return None;
        }
        if n == 0 {
            return Some((DVector::zeros(0), self.constant));
        }
        let mut best: Option<(DVector<f64>, f64)> = None;
        for mask in 0u64..(1u64 << (n - 1)) {
            let x = DVector::from_fn(n, |i, _| {
                if i > 0 && (mask >> (i - 1)) & 1 == 1 {
                    -1.0
                } else {
                    1.0
                }
            });
            let s = self.score(&x);
            if best.as_ref().is_none_or(|(_, b)| s > *b) {
                best = Some((x, s));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dmatrix;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn triangle(w: f64) -> Problem {
        Problem::new(
            dmatrix![0.0, w, w; w, 0.0, w; w, w, 0.0],
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn score_all_ones_triangle() {
        let p = triangle(1.0);
        assert!((p.score(&DVector::from_element(3, 1.0)) - 3.0).abs() < 1e-12);
        assert!((p.naive_upper_bound() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn frustrated_triangle_optimum_is_one() {
        let p = triangle(-1.0);
        let (x, s) = p.exhaustive_optimum().unwrap();
        assert!((s - 1.0).abs() < 1e-12);
        assert_eq!(x[0], 1.0);
    }

    #[test]
    fn construction_rejects_bad_matrices() {
        assert!(matches!(
            Problem::new(DMatrix::zeros(2, 3), 0.0),
            Err(ProblemError::NotSquare { rows: 2, cols: 3 })
        ));
        assert!(matches!(
            Problem::new(dmatrix![0.0, 1.0; 2.0, 0.0], 0.0),
            Err(ProblemError::Asymmetric { i: 0, j: 1, .. })
        ));
        assert!(matches!(
            Problem::new(dmatrix![0.0, f64::NAN; f64::NAN, 0.0], 0.0),
            Err(ProblemError::NonFinite { .. })
        ));
        // Diagonal is not used and not validated for symmetry.
        assert!(Problem::new(dmatrix![5.0, 1.0; 1.0, -3.0], 0.0).is_ok());
    }

    #[test]
    fn from_upper_mirrors() {
        let upper = dmatrix![9.0, 2.0; 7.0, 9.0];
        let p = Problem::from_upper(&upper, 1.5).unwrap();
        assert_eq!(p.coeff(1, 0), 2.0);
        assert_eq!(p.coeff(0, 0), 0.0);
        assert!((p.naive_upper_bound() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn random_is_symmetric_and_seeded() {
        let a = Problem::random(7, 0.6, &mut StdRng::seed_from_u64(3));
        let b = Problem::random(7, 0.6, &mut StdRng::seed_from_u64(3));
        assert_eq!(a.coeffs(), b.coeffs());
        assert!(Problem::new(a.coeffs().clone(), 0.0).is_ok());
    }

    proptest! {
        #[test]
        fn naive_bound_dominates_every_assignment(
            n in 1usize..=8,
            seed in any::<u64>(),
            constant in -5.0f64..5.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let base = Problem::random(n, 0.8, &mut rng);
            let p = Problem::new(base.coeffs().clone(), constant).unwrap();
            let ub = p.naive_upper_bound();
            for mask in 0u32..(1u32 << n) {
                let x = DVector::from_fn(n, |i, _| if (mask >> i) & 1 == 1 { -1.0 } else { 1.0 });
                prop_assert!(p.score(&x) <= ub + 1e-12);
            }
        }
    }
}
