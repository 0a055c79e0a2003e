//! Relaxation state and correlation-matrix builders.
//!
//! - `point`: current LP values of the pairwise variables, indexed by column
//!   (packed index − 1), each in `[-1, 1]`.
//! - Bounds: `lower_bound` is the score of `best`; `upper_bound` never increases.
//! - Matrices built here have unit diagonal and `X_ij = point[col(i, j)]` off it.

use nalgebra::{DMatrix, DVector};

use crate::index::{IndexError, PairIndex};
use crate::problem::Problem;

#[derive(Clone, Debug)]
pub struct RelaxationState {
    index: PairIndex,
    point: Vec<f64>,
    lower_bound: f64,
    upper_bound: f64,
    best: DVector<f64>,
}

impl RelaxationState {
    /// Seed bounds from the all-ones assignment and the naive coefficient bound.
    pub fn new(problem: &Problem) -> Self {
        let n = problem.n();
        let index = PairIndex::new(n);
        let best = DVector::from_element(n, 1.0);
        Self {
            index,
            point: vec![0.0; index.len()],
            lower_bound: problem.score(&best),
            upper_bound: problem.naive_upper_bound(),
            best,
        }
    }

    #[inline]
    pub fn index(&self) -> PairIndex {
        self.index
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.index.n()
    }

    #[inline]
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Overwrite the point from per-column values `f(col)`.
    pub fn refresh_point(&mut self, mut f: impl FnMut(usize) -> f64) {
        for (col, v) in self.point.iter_mut().enumerate() {
            *v = f(col);
        }
    }

    /// Current value of the pairwise variable for `{x, y}`.
    pub fn value(&self, x: usize, y: usize) -> Result<f64, IndexError> {
        Ok(self.point[self.index.column(x, y)?])
    }

    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn best(&self) -> &DVector<f64> {
        &self.best
    }

    /// `upper_bound = min(upper_bound, candidate)`; returns the new bound.
    pub fn tighten_upper_bound(&mut self, candidate: f64) -> f64 {
        if candidate < self.upper_bound {
            self.upper_bound = candidate;
        }
        self.upper_bound
    }

    /// Keep `x` as the incumbent if it beats the lower bound.
    pub fn offer_solution(&mut self, x: &DVector<f64>, score: f64) -> bool {
        if score > self.lower_bound {
            self.lower_bound = score;
            self.best = x.clone();
            true
        } else {
            false
        }
    }

    /// Replace the incumbent unconditionally (exact-optimum path).
    pub fn set_solution(&mut self, x: DVector<f64>, score: f64) {
        self.lower_bound = score;
        self.best = x;
    }

    /// Objective of the relaxation point: `c + Σ_{i<j} w_ij X_ij`.
    pub fn objective(&self, problem: &Problem) -> Result<f64, IndexError> {
        let n = self.n();
        let mut s = problem.constant();
        for i in 0..n {
            for j in (i + 1)..n {
                s += self.value(i, j)? * problem.coeff(i, j);
            }
        }
        Ok(s)
    }

    /// Correlation matrix induced by `subset` (in the given order).
    pub fn build_matrix(&self, subset: &[usize]) -> Result<DMatrix<f64>, IndexError> {
        let k = subset.len();
        let mut m = DMatrix::identity(k, k);
        for i in 0..k {
            for j in (i + 1)..k {
                let v = self.value(subset[i], subset[j])?;
                m[(i, j)] = v;
                m[(j, i)] = v;
            }
        }
        Ok(m)
    }

    /// Correlation matrix over all `n` variables.
    pub fn build_full_matrix(&self) -> Result<DMatrix<f64>, IndexError> {
        let all: Vec<usize> = (0..self.n()).collect();
        self.build_matrix(&all)
    }

    /// Sign vector read off row 0: `x_0 = +1`, `x_i = sign(X_0i)` (ties to `+1`).
    pub fn sign_vector(&self) -> Result<DVector<f64>, IndexError> {
        let n = self.n();
        let mut x = DVector::from_element(n, 1.0);
        for i in 1..n {
            x[i] = sign(self.value(0, i)?);
        }
        Ok(x)
    }
}

/// `+1` for non-negative input (including `-0.0`), `-1` otherwise.
#[inline]
pub(crate) fn sign(v: f64) -> f64 {
    if v >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dmatrix;

    fn state_with(problem: &Problem, values: &[f64]) -> RelaxationState {
        let mut s = RelaxationState::new(problem);
        s.refresh_point(|c| values[c]);
        s
    }

    fn zero_problem(n: usize) -> Problem {
        Problem::new(DMatrix::zeros(n, n), 0.0).unwrap()
    }

    #[test]
    fn initial_bounds_from_all_ones_and_naive_sum() {
        let p = Problem::new(dmatrix![0.0, -2.0, 1.0; -2.0, 0.0, 0.5; 1.0, 0.5, 0.0], 1.0).unwrap();
        let s = RelaxationState::new(&p);
        assert!((s.lower_bound() - 0.5).abs() < 1e-12);
        assert!((s.upper_bound() - 4.5).abs() < 1e-12);
        assert_eq!(s.best().len(), 3);
        assert!(s.point().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn submatrix_uses_packed_values_in_subset_order() {
        // columns: (1,0)=0.1 (2,0)=0.2 (2,1)=0.3 (3,0)=0.4 (3,1)=0.5 (3,2)=0.6
        let p = zero_problem(4);
        let s = state_with(&p, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let m = s.build_matrix(&[3, 1]).unwrap();
        assert_eq!(m, dmatrix![1.0, 0.5; 0.5, 1.0]);
        let full = s.build_full_matrix().unwrap();
        assert_eq!(full[(2, 3)], 0.6);
        assert_eq!(full[(3, 2)], 0.6);
        assert_eq!(full[(1, 0)], 0.1);
        assert!((0..4).all(|i| full[(i, i)] == 1.0));
        assert_eq!(s.build_matrix(&[]).unwrap().nrows(), 0);
    }

    #[test]
    fn repeated_subset_index_is_an_error() {
        let p = zero_problem(3);
        let s = state_with(&p, &[0.0; 3]);
        assert!(matches!(
            s.build_matrix(&[1, 1]),
            Err(IndexError::SelfPair { x: 1 })
        ));
    }

    #[test]
    fn upper_bound_only_decreases() {
        let p = Problem::new(dmatrix![0.0, 1.0; 1.0, 0.0], 0.0).unwrap();
        let mut s = RelaxationState::new(&p);
        assert_eq!(s.tighten_upper_bound(0.5), 0.5);
        assert_eq!(s.tighten_upper_bound(0.8), 0.5);
    }

    #[test]
    fn sign_vector_rounds_row_zero() {
        let p = zero_problem(4);
        let s = state_with(&p, &[-0.9, 0.0, 0.2, 0.7, -0.1, 0.3]);
        let x = s.sign_vector().unwrap();
        assert_eq!(x.as_slice(), &[1.0, -1.0, 1.0, 1.0]);
    }

    #[test]
    fn objective_matches_score_on_rank_one_point() {
        let p = Problem::new(dmatrix![0.0, 2.0, -1.0; 2.0, 0.0, 3.0; -1.0, 3.0, 0.0], 0.25).unwrap();
        let x = DVector::from_vec(vec![1.0, -1.0, 1.0]);
        let mut s = RelaxationState::new(&p);
        let idx = s.index();
        s.refresh_point(|c| {
            let (a, b) = idx.to_pair(c + 1).unwrap();
            x[a] * x[b]
        });
        assert!((s.objective(&p).unwrap() - p.score(&x)).abs() < 1e-12);
        assert_eq!(s.sign_vector().unwrap(), x);
    }
}
