//! Cutting-plane solver for ±1 quadratic maximization with SDP-style certificates.
//!
//! Maximize `c + Σ_{i<j} w_ij x_i x_j` over `x ∈ {±1}^n` by relaxing every
//! product `x_i x_j` to an LP variable in `[-1, 1]` and adding cuts until the
//! relaxation point forms a PSD correlation matrix.
//!
//! Layout
//! - `index`: packed pair indices. `relaxation`: current point and bounds.
//! - `psd`: minimal non-PSD core search. `cut`: separating inequalities.
//! - `lp`: LP engine seam and the Clarabel-backed engine.
//! - `rounding`: hyperplane rounding fallback. `solver`: the solve loop.

pub mod cfg;
pub mod cut;
pub mod index;
pub mod lp;
pub mod problem;
pub mod psd;
pub mod relaxation;
pub mod rounding;
pub mod solver;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use cfg::SolveCfg;
pub use problem::Problem;
pub use solver::{solve_with_defaults, SolveError, SolveOutcome, Solver, Termination};

/// Common exports for callers.
pub mod prelude {
    pub use crate::cfg::SolveCfg;
    pub use crate::cut::{Cut, CutGenerator, EigenCutGenerator};
    pub use crate::index::{IndexError, PairIndex};
    pub use crate::lp::{ClarabelEngine, LpEngine, LpStatus};
    pub use crate::problem::{Problem, ProblemError};
    pub use crate::psd::{find_core, is_psd, min_eigenvalue};
    pub use crate::relaxation::RelaxationState;
    pub use crate::rounding::{round, RoundingReport};
    pub use crate::solver::{solve_with_defaults, SolveError, SolveOutcome, Solver, Termination};
    pub use nalgebra::{DMatrix, DVector};
}
