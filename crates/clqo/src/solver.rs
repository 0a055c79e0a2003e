//! Cutting-plane solve loop.
//!
//! States: `SolveLp → FindCore → {Complete | ApplyCut → SolveLp | RoundFallback}`.
//! - `SolveLp`: re-solve, refresh the point, tighten the upper bound.
//! - `FindCore`: empty core → `Complete`; otherwise ask the cut generator.
//!   `cut_fail_limit` consecutive empty answers → `RoundFallback`.
//! - `ApplyCut`: prune slack rows, translate the cut to global columns, add it.
//! - `Complete`: the full matrix is PSD; read the sign vector off row 0.
//! - `RoundFallback`: hyperplane rounding; the best trial is kept if it improves
//!   the incumbent. No optimality certificate.

use nalgebra::DVector;
use rand::Rng;
use std::fmt;
use std::time::Instant;

use crate::cfg::SolveCfg;
use crate::cut::{CutGenerator, EigenCutGenerator};
use crate::index::IndexError;
use crate::lp::{ClarabelEngine, LpEngine, LpStatus};
use crate::problem::Problem;
use crate::psd::find_core;
use crate::relaxation::RelaxationState;
use crate::rounding::{round, RoundingError, RoundingReport};

#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    Index(IndexError),
    /// The LP engine reported a non-recoverable status.
    SolverFailure { status: LpStatus },
    Rounding(RoundingError),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(e) => write!(f, "index mapping: {e}"),
            Self::SolverFailure { status } => write!(f, "LP solve {status}"),
            Self::Rounding(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Index(e) => Some(e),
            Self::Rounding(e) => Some(e),
            Self::SolverFailure { .. } => None,
        }
    }
}

impl From<IndexError> for SolveError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

impl From<RoundingError> for SolveError {
    fn from(e: RoundingError) -> Self {
        Self::Rounding(e)
    }
}

/// How the loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Full matrix PSD; solution read off the relaxation point.
    Complete,
    /// The cut generator came back empty `cut_fail_limit` times in a row.
    CutsExhausted,
    /// `max_lp_solves` reached.
    IterationLimit,
}

#[derive(Clone, Debug)]
pub struct SolveOutcome {
    pub termination: Termination,
    /// Best sign vector found (`x_0 = +1`).
    pub best: DVector<f64>,
    /// Score of `best`.
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Upper bound after each LP solve.
    pub upper_bound_history: Vec<f64>,
    pub lp_solves: usize,
    pub cuts_added: usize,
    pub rows_pruned: usize,
    pub rounding: Option<RoundingReport>,
    /// `Complete` and the gap is within `certify_tol`.
    pub certified: bool,
}

impl SolveOutcome {
    pub fn gap(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

#[derive(Debug)]
enum Phase {
    SolveLp,
    FindCore,
    Done(Termination),
}

/// Solve with the Clarabel engine, eigenvector cuts and default tolerances.
pub fn solve_with_defaults<R: Rng + ?Sized>(
    problem: &Problem,
    rng: &mut R,
) -> Result<SolveOutcome, SolveError> {
    let cfg = SolveCfg::default();
    Solver::new(
        problem,
        ClarabelEngine::new(),
        EigenCutGenerator::from_cfg(&cfg),
        cfg,
    )?
    .run(rng)
}

/// Orchestrator owning the relaxation state and the LP engine.
pub struct Solver<'p, E, G> {
    problem: &'p Problem,
    engine: E,
    cuts: G,
    cfg: SolveCfg,
    state: RelaxationState,
    history: Vec<f64>,
    lp_solves: usize,
    cuts_added: usize,
    rows_pruned: usize,
    lp_time: f64,
    core_time: f64,
}

impl<'p, E: LpEngine, G: CutGenerator> Solver<'p, E, G> {
    /// Set up bounds and one `[-1, 1]` column per pair, weighted by `w_xy`.
    pub fn new(
        problem: &'p Problem,
        mut engine: E,
        cuts: G,
        cfg: SolveCfg,
    ) -> Result<Self, SolveError> {
        let state = RelaxationState::new(problem);
        let idx = state.index();
        for col in 0..idx.len() {
            let (x, y) = idx.to_pair(col + 1)?;
            let added = engine.add_column(-1.0, 1.0, problem.coeff(y, x));
            debug_assert_eq!(added, col, "engine must start without columns");
        }
        Ok(Self {
            problem,
            engine,
            cuts,
            cfg,
            state,
            history: Vec::new(),
            lp_solves: 0,
            cuts_added: 0,
            rows_pruned: 0,
            lp_time: 0.0,
            core_time: 0.0,
        })
    }

    pub fn state(&self) -> &RelaxationState {
        &self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Drive the state machine to a terminal state.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SolveOutcome, SolveError> {
        tracing::info!(
            n = self.state.n(),
            lower = self.state.lower_bound(),
            upper = self.state.upper_bound(),
            "initial bounds"
        );
        let mut phase = if self.state.index().is_empty() {
            Phase::Done(Termination::Complete)
        } else {
            Phase::SolveLp
        };
        let mut failures = 0usize;
        loop {
            phase = match phase {
                Phase::SolveLp => self.solve_lp()?,
                Phase::FindCore => self.find_core(rng, &mut failures)?,
                Phase::Done(Termination::Complete) => return self.complete(),
                Phase::Done(reason) => return self.round_fallback(reason, rng),
            };
        }
    }

    fn solve_lp(&mut self) -> Result<Phase, SolveError> {
        if self.lp_solves >= self.cfg.max_lp_solves {
            tracing::warn!(lp_solves = self.lp_solves, "LP solve limit reached");
            return Ok(Phase::Done(Termination::IterationLimit));
        }
        let t0 = Instant::now();
        let status = self.engine.solve();
        let dt = t0.elapsed().as_secs_f64();
        self.lp_time += dt;
        self.lp_solves += 1;
        match status {
            LpStatus::Optimal => {}
            LpStatus::Unstable { ref detail } => {
                tracing::warn!(detail = %detail, "LP numerically unstable; using last iterate");
            }
            LpStatus::Failed { .. } => return Err(SolveError::SolverFailure { status }),
        }
        let engine = &self.engine;
        self.state
            .refresh_point(|col| engine.column_primal(col).clamp(-1.0, 1.0));
        let relaxed = self.state.objective(self.problem)?;
        let upper = self.state.tighten_upper_bound(relaxed);
        self.history.push(upper);
        tracing::debug!(
            relaxed,
            upper,
            rows = self.engine.num_rows(),
            lp_time = dt,
            "LP solved"
        );
        Ok(Phase::FindCore)
    }

    fn find_core<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        failures: &mut usize,
    ) -> Result<Phase, SolveError> {
        let t0 = Instant::now();
        let core = find_core(&self.state, self.cfg.psd_tol, rng)?;
        if core.is_empty() {
            self.core_time += t0.elapsed().as_secs_f64();
            return Ok(Phase::Done(Termination::Complete));
        }
        let local = self.state.build_matrix(&core)?;
        let cut = self.cuts.generate(&local);
        self.core_time += t0.elapsed().as_secs_f64();
        let Some(cut) = cut else {
            *failures += 1;
            tracing::debug!(core = ?core, failures = *failures, "no cut for core");
            if *failures >= self.cfg.cut_fail_limit {
                return Ok(Phase::Done(Termination::CutsExhausted));
            }
            return Ok(Phase::FindCore);
        };
        *failures = 0;

        self.prune_slack_rows();
        let coeffs = cut.to_global(&core, &self.state.index())?;
        let row = self.engine.add_row(&coeffs, cut.constant);
        self.cuts_added += 1;
        tracing::debug!(
            row,
            core_size = core.len(),
            cuts_added = self.cuts_added,
            core_time = self.core_time,
            lp_time = self.lp_time,
            "applied cut"
        );
        Ok(Phase::SolveLp)
    }

    /// Drop rows whose slack exceeds `row_removal_slack · max(|bound|, 1)`.
    fn prune_slack_rows(&mut self) {
        let rows = self.engine.num_rows();
        for r in (0..rows).rev() {
            let lower = self.engine.row_lower_bound(r);
            let slack = self.engine.row_primal(r) - lower;
            if slack > self.cfg.row_removal_slack * lower.abs().max(1.0) {
                tracing::debug!(row = r, rows, slack, "deleting non-binding row");
                self.engine.delete_rows(&[r]);
                self.rows_pruned += 1;
            }
        }
    }

    fn complete(&mut self) -> Result<SolveOutcome, SolveError> {
        let x = self.state.sign_vector()?;
        let score = self.problem.score(&x);
        self.state.offer_solution(&x, score);
        let certified =
            self.state.upper_bound() - self.state.lower_bound() <= self.cfg.certify_tol;
        tracing::info!(
            score,
            upper = self.state.upper_bound(),
            certified,
            lp_solves = self.lp_solves,
            "relaxation point is PSD"
        );
        Ok(self.outcome(Termination::Complete, None, certified))
    }

    fn round_fallback<R: Rng + ?Sized>(
        &mut self,
        reason: Termination,
        rng: &mut R,
    ) -> Result<SolveOutcome, SolveError> {
        tracing::info!(reason = ?reason, "rounding off the relaxation point");
        let report = round(
            self.problem,
            &self.state,
            self.cfg.rounding_trials,
            self.cfg.rounding_shift,
            rng,
        )?;
        if let Some((x, score)) = &report.best {
            if self.state.offer_solution(x, *score) {
                tracing::info!(score = *score, "rounding improved the incumbent");
            }
        }
        Ok(self.outcome(reason, Some(report), false))
    }

    fn outcome(
        &self,
        termination: Termination,
        rounding: Option<RoundingReport>,
        certified: bool,
    ) -> SolveOutcome {
        SolveOutcome {
            termination,
            best: self.state.best().clone(),
            lower_bound: self.state.lower_bound(),
            // The LP bound is only accurate to solver tolerance.
            upper_bound: self.state.upper_bound().max(self.state.lower_bound()),
            upper_bound_history: self.history.clone(),
            lp_solves: self.lp_solves,
            cuts_added: self.cuts_added,
            rows_pruned: self.rows_pruned,
            rounding,
            certified,
        }
    }
}
