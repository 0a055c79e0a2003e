//! Tolerances and limits for the cutting-plane loop.
//!
//! Policy
//! - Defaults are fixed constants matching the reference behavior. Callers that
//!   need to tune them build a `SolveCfg` with struct-update syntax.

/// Eigenvalues below `-PSD_TOL` count as a genuine PSD violation.
pub const PSD_TOL: f64 = 1e-5;
/// Number of randomized hyperplane roundings in the fallback.
pub const ROUNDING_TRIALS: usize = 20;
/// Consecutive empty cut results before giving up on cutting planes.
pub const CUT_FAIL_LIMIT: usize = 5;
/// Rows whose slack exceeds this fraction of their bound are pruned.
pub const ROW_REMOVAL_SLACK: f64 = 0.99;
/// Shift applied below the smallest eigenvalue so the fallback matrix is strictly PD.
pub const ROUNDING_SHIFT: f64 = 1e-5;
/// Hard cap on LP solves per run.
pub const MAX_LP_SOLVES: usize = 10_000;
/// Minimum violation (rhs − lhs at the current point) for a cut to be accepted.
pub const MIN_CUT_VIOLATION: f64 = 1e-7;
/// Largest core for which the cut right-hand side is strengthened by enumeration.
pub const EXHAUSTIVE_CORE_LIMIT: usize = 16;
/// Gap under which a complete run is reported as certified.
pub const CERTIFY_TOL: f64 = 1e-6;

/// Solver configuration (tolerances and limits).
#[derive(Clone, Copy, Debug)]
pub struct SolveCfg {
    pub psd_tol: f64,
    pub rounding_trials: usize,
    pub cut_fail_limit: usize,
    /// Fraction of `max(|bound|, 1)` above which a row's slack marks it non-binding.
    pub row_removal_slack: f64,
    pub rounding_shift: f64,
    pub max_lp_solves: usize,
    pub min_cut_violation: f64,
    pub exhaustive_core_limit: usize,
    pub certify_tol: f64,
}

impl Default for SolveCfg {
    fn default() -> Self {
        Self {
            psd_tol: PSD_TOL,
            rounding_trials: ROUNDING_TRIALS,
            cut_fail_limit: CUT_FAIL_LIMIT,
            row_removal_slack: ROW_REMOVAL_SLACK,
            rounding_shift: ROUNDING_SHIFT,
            max_lp_solves: MAX_LP_SOLVES,
            min_cut_violation: MIN_CUT_VIOLATION,
            exhaustive_core_limit: EXHAUSTIVE_CORE_LIMIT,
            certify_tol: CERTIFY_TOL,
        }
    }
}
