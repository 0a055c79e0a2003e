//! Linear-program engine seam.
//!
//! The cutting-plane loop owns one engine: a maximization LP with one bounded
//! column per pairwise variable and a changing set of `>=` rows (cuts).
//! Columns and rows are zero-based; deleting a row shifts later rows down.

mod ipm;

pub use ipm::ClarabelEngine;

use std::fmt;

/// Outcome of one LP solve.
#[derive(Clone, Debug, PartialEq)]
pub enum LpStatus {
    Optimal,
    /// Solver stalled numerically; the last iterate is still readable.
    Unstable { detail: String },
    Failed { detail: String },
}

impl fmt::Display for LpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Unstable { detail } => write!(f, "unstable ({detail})"),
            Self::Failed { detail } => write!(f, "failed ({detail})"),
        }
    }
}

/// Maximization LP with dynamic `>=` rows.
pub trait LpEngine {
    /// Append a column with bounds `[lower, upper]` and objective weight; returns its index.
    fn add_column(&mut self, lower: f64, upper: f64, objective: f64) -> usize;

    /// Append the row `Σ coeff · x[col] >= lower`; returns its index.
    fn add_row(&mut self, coeffs: &[(usize, f64)], lower: f64) -> usize;

    /// Delete the listed rows.
    fn delete_rows(&mut self, rows: &[usize]);

    fn num_columns(&self) -> usize;

    fn num_rows(&self) -> usize;

    fn solve(&mut self) -> LpStatus;

    /// Primal value of a column at the last solve (0 before any solve).
    fn column_primal(&self, col: usize) -> f64;

    /// Row activity `Σ coeff · x[col]` at the last solve.
    fn row_primal(&self, row: usize) -> f64;

    fn row_lower_bound(&self, row: usize) -> f64;
}
