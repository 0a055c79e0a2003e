//! `LpEngine` backed by the Clarabel interior-point solver.
//!
//! Clarabel solves `min ½xᵀPx + qᵀx  s.t.  Ax + s = b, s ∈ K`. We rebuild the
//! data on every solve: `P = 0`, `q = −c` (maximization), and one nonnegative
//! cone row per finite column bound and per `>=` row.
//!
//! `NumericalError`, `MaxIterations`, `InsufficientProgress` and `AlmostSolved`
//! map to `LpStatus::Unstable` and keep the last iterate, unless that iterate is
//! not finite. Infeasibility certificates map to `LpStatus::Failed`.

use super::{LpEngine, LpStatus};

#[derive(Clone, Copy, Debug)]
struct Column {
    lower: f64,
    upper: f64,
    objective: f64,
}

#[derive(Clone, Debug)]
struct Row {
    coeffs: Vec<(usize, f64)>,
    lower: f64,
}

/// Interior-point LP engine. Holds the model and the last primal iterate.
#[derive(Clone, Debug, Default)]
pub struct ClarabelEngine {
    columns: Vec<Column>,
    rows: Vec<Row>,
    x: Vec<f64>,
    objective_value: f64,
}

impl ClarabelEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objective `cᵀx` at the last iterate.
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// Column-major constraint data: `(per-column (row, value) entries, b)`.
    fn constraint_data(&self) -> (Vec<Vec<(usize, f64)>>, Vec<f64>) {
        let n = self.columns.len();
        let mut by_col: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut b = Vec::new();
        for (j, col) in self.columns.iter().enumerate() {
            if col.upper.is_finite() {
                by_col[j].push((b.len(), 1.0));
                b.push(col.upper);
            }
            if col.lower.is_finite() {
                by_col[j].push((b.len(), -1.0));
                b.push(-col.lower);
            }
        }
        for row in &self.rows {
            let r = b.len();
            for &(j, a) in &row.coeffs {
                by_col[j].push((r, -a));
            }
            b.push(-row.lower);
        }
        for entries in &mut by_col {
            entries.sort_by_key(|&(r, _)| r);
            entries.dedup_by(|later, kept| {
                if later.0 == kept.0 {
                    kept.1 += later.1;
                    true
                } else {
                    false
                }
            });
        }
        (by_col, b)
    }
}

impl LpEngine for ClarabelEngine {
    fn add_column(&mut self, lower: f64, upper: f64, objective: f64) -> usize {
        self.columns.push(Column {
            lower,
            upper,
            objective,
        });
        self.x.push(0.0);
        self.columns.len() - 1
    }

    fn add_row(&mut self, coeffs: &[(usize, f64)], lower: f64) -> usize {
        debug_assert!(coeffs.iter().all(|&(j, _)| j < self.columns.len()));
        self.rows.push(Row {
            coeffs: coeffs.to_vec(),
            lower,
        });
        self.rows.len() - 1
    }

    fn delete_rows(&mut self, rows: &[usize]) {
        let mut doomed = rows.to_vec();
        doomed.sort_unstable();
        doomed.dedup();
        for &r in doomed.iter().rev() {
            if r < self.rows.len() {
                self.rows.remove(r);
            }
        }
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn solve(&mut self) -> LpStatus {
        use ::clarabel::algebra::*;
        use ::clarabel::solver::*;

        let n = self.columns.len();
        if n == 0 {
            self.objective_value = 0.0;
            return LpStatus::Optimal;
        }
        let (by_col, b) = self.constraint_data();
        let m = b.len();

        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for entries in by_col {
            for (r, v) in entries {
                rowval.push(r);
                nzval.push(v);
            }
            colptr.push(rowval.len());
        }
        let a = CscMatrix::new(m, n, colptr, rowval, nzval);
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let q: Vec<f64> = self.columns.iter().map(|c| -c.objective).collect();
        let cones = [NonnegativeConeT(m)];
        let settings = DefaultSettings {
            verbose: false,
            ..DefaultSettings::default()
        };

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let mut outcome = lp_status(&solver.solution.status);
        if matches!(outcome, LpStatus::Unstable { .. })
            && solver.solution.x.iter().any(|v| !v.is_finite())
        {
            outcome = LpStatus::Failed {
                detail: format!("{:?} with non-finite iterate", solver.solution.status),
            };
        }
        if !matches!(outcome, LpStatus::Failed { .. }) {
            self.x.clear();
            self.x.extend_from_slice(&solver.solution.x);
            self.objective_value = self
                .columns
                .iter()
                .zip(&self.x)
                .map(|(c, v)| c.objective * v)
                .sum();
        }
        outcome
    }

    fn column_primal(&self, col: usize) -> f64 {
        self.x.get(col).copied().unwrap_or(0.0)
    }

    fn row_primal(&self, row: usize) -> f64 {
        self.rows.get(row).map_or(0.0, |r| {
            r.coeffs
                .iter()
                .map(|&(j, a)| a * self.column_primal(j))
                .sum()
        })
    }

    fn row_lower_bound(&self, row: usize) -> f64 {
        self.rows.get(row).map_or(f64::NEG_INFINITY, |r| r.lower)
    }
}

/// Clarabel termination codes. Anything that still leaves an iterate
/// (iteration caps, stalls, numerical trouble) is recoverable.
fn lp_status(status: &::clarabel::solver::SolverStatus) -> LpStatus {
    use ::clarabel::solver::SolverStatus;
    match status {
        SolverStatus::Solved => LpStatus::Optimal,
        SolverStatus::AlmostSolved
        | SolverStatus::InsufficientProgress
        | SolverStatus::MaxIterations
        | SolverStatus::NumericalError => LpStatus::Unstable {
            detail: format!("{status:?}"),
        },
        _ => LpStatus::Failed {
            detail: format!("{status:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_only_maximization_hits_bounds() {
        let mut lp = ClarabelEngine::new();
        lp.add_column(-1.0, 1.0, 2.0);
        lp.add_column(-1.0, 1.0, -1.0);
        assert_eq!(lp.solve(), LpStatus::Optimal);
        assert!((lp.column_primal(0) - 1.0).abs() < 1e-6);
        assert!((lp.column_primal(1) + 1.0).abs() < 1e-6);
        assert!((lp.objective_value() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn rows_bind_and_delete() {
        // max -x0 - x1 - x2  s.t.  x0 + x1 + x2 >= -1
        let mut lp = ClarabelEngine::new();
        for _ in 0..3 {
            lp.add_column(-1.0, 1.0, -1.0);
        }
        let r = lp.add_row(&[(0, 1.0), (1, 1.0), (2, 1.0)], -1.0);
        assert_eq!(lp.num_rows(), 1);
        assert_eq!(lp.solve(), LpStatus::Optimal);
        assert!((lp.objective_value() - 1.0).abs() < 1e-6);
        assert!((lp.row_primal(r) - lp.row_lower_bound(r)).abs() < 1e-6);

        lp.delete_rows(&[r]);
        assert_eq!(lp.num_rows(), 0);
        assert_eq!(lp.solve(), LpStatus::Optimal);
        assert!((lp.objective_value() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn infeasible_rows_fail() {
        let mut lp = ClarabelEngine::new();
        lp.add_column(-1.0, 1.0, 1.0);
        lp.add_row(&[(0, 1.0)], 2.0);
        assert!(matches!(lp.solve(), LpStatus::Failed { .. }));
    }

    #[test]
    fn duplicate_row_entries_are_merged() {
        let mut lp = ClarabelEngine::new();
        lp.add_column(-1.0, 1.0, -1.0);
        lp.add_row(&[(0, 1.0), (0, 1.0)], 1.0);
        assert_eq!(lp.solve(), LpStatus::Optimal);
        assert!((lp.column_primal(0) - 0.5).abs() < 1e-6);
        assert!((lp.row_primal(0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_model_is_trivially_optimal() {
        let mut lp = ClarabelEngine::new();
        assert_eq!(lp.solve(), LpStatus::Optimal);
        assert_eq!(lp.column_primal(3), 0.0);
    }

    #[test]
    fn numerical_trouble_is_recoverable() {
        use ::clarabel::solver::SolverStatus;
        for status in [
            SolverStatus::NumericalError,
            SolverStatus::MaxIterations,
            SolverStatus::InsufficientProgress,
            SolverStatus::AlmostSolved,
        ] {
            assert!(matches!(lp_status(&status), LpStatus::Unstable { .. }));
        }
        assert_eq!(lp_status(&SolverStatus::Solved), LpStatus::Optimal);
        for status in [
            SolverStatus::PrimalInfeasible,
            SolverStatus::DualInfeasible,
        ] {
            assert!(matches!(lp_status(&status), LpStatus::Failed { .. }));
        }
    }
}
