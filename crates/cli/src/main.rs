use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clqo::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

mod provenance;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Cutting-plane solver for ±1 quadratic problems")]
struct Cmd {
    /// Optional run label; stored in run records
    #[arg(long)]
    tag: Option<String>,

    /// Log per-iteration progress (bounds, cuts, pruned rows)
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Solve a problem file and write the result as JSON
    Solve {
        #[arg(long)]
        input: PathBuf,
        /// Result path; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Seed for the core search order and the rounding trials
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = clqo::cfg::PSD_TOL)]
        psd_tol: f64,
        #[arg(long, default_value_t = clqo::cfg::ROUNDING_TRIALS)]
        trials: usize,
        #[arg(long, default_value_t = clqo::cfg::MAX_LP_SOLVES)]
        max_lp_solves: usize,
        /// Also brute-force the optimum (small n only)
        #[arg(long)]
        verify: bool,
    },
    /// Write a random problem file
    Random {
        #[arg(long)]
        n: usize,
        #[arg(long, default_value_t = 1.0)]
        density: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the solver version, code revision and default configuration
    Report,
}

/// On-disk problem: full symmetric coefficient rows plus a constant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct ProblemFile {
    #[serde(default)]
    constant: f64,
    coeffs: Vec<Vec<f64>>,
}

impl ProblemFile {
    fn from_problem(p: &Problem) -> Self {
        let n = p.n();
        Self {
            constant: p.constant(),
            coeffs: (0..n)
                .map(|i| (0..n).map(|j| p.coeff(i, j)).collect())
                .collect(),
        }
    }

    fn into_problem(self) -> Result<Problem> {
        let n = self.coeffs.len();
        if let Some((i, row)) = self.coeffs.iter().enumerate().find(|(_, r)| r.len() != n) {
            bail!("row {i} has {} entries, expected {n}", row.len());
        }
        let m = DMatrix::from_fn(n, n, |i, j| self.coeffs[i][j]);
        Ok(Problem::new(m, self.constant)?)
    }
}

#[derive(Serialize, Debug)]
struct SolveReport {
    termination: String,
    certified: bool,
    lower_bound: f64,
    upper_bound: f64,
    gap: f64,
    best: Vec<f64>,
    lp_solves: usize,
    cuts_added: usize,
    rows_pruned: usize,
    rounding_scores: Option<Vec<f64>>,
    exhaustive_optimum: Option<f64>,
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = if cmd.verbose { Level::DEBUG } else { Level::INFO };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    match cmd.action {
        Action::Solve {
            input,
            out,
            seed,
            psd_tol,
            trials,
            max_lp_solves,
            verify,
        } => {
            let cfg = SolveCfg {
                psd_tol,
                rounding_trials: trials,
                max_lp_solves,
                ..SolveCfg::default()
            };
            solve(&input, out.as_deref(), seed, cfg, verify, cmd.tag)
        }
        Action::Random {
            n,
            density,
            seed,
            out,
        } => random(n, density, seed, &out),
        Action::Report => report(cmd.tag),
    }
}

fn load_problem(path: &Path) -> Result<Problem> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading problem {}", path.display()))?;
    let file: ProblemFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing problem {}", path.display()))?;
    file.into_problem()
        .with_context(|| format!("invalid problem {}", path.display()))
}

fn solve(
    input: &Path,
    out: Option<&Path>,
    seed: u64,
    cfg: SolveCfg,
    verify: bool,
    tag: Option<String>,
) -> Result<()> {
    let problem = load_problem(input)?;
    tracing::info!(input = %input.display(), n = problem.n(), seed, "solve");
    let report = run_solver(&problem, seed, cfg, verify)?;
    tracing::info!(
        termination = %report.termination,
        lower = report.lower_bound,
        upper = report.upper_bound,
        certified = report.certified,
        "done"
    );
    let body = serde_json::to_vec_pretty(&report)?;
    match out {
        Some(out) => {
            ensure_parent(out)?;
            std::fs::write(out, &body).with_context(|| format!("writing {}", out.display()))?;
            let record = provenance::RunRecord::new(
                provenance::InputDigest::of(input, &problem),
                &cfg,
                seed,
                out,
                tag,
            );
            let path = provenance::write_record(out, &record)?;
            tracing::debug!(record = %path.display(), "run record");
        }
        None => println!("{}", String::from_utf8_lossy(&body)),
    }
    Ok(())
}

fn run_solver(problem: &Problem, seed: u64, cfg: SolveCfg, verify: bool) -> Result<SolveReport> {
    let mut solver = Solver::new(
        problem,
        ClarabelEngine::new(),
        EigenCutGenerator::from_cfg(&cfg),
        cfg,
    )?;
    let outcome = solver.run(&mut StdRng::seed_from_u64(seed))?;
    let exhaustive_optimum = if verify {
        let found = problem.exhaustive_optimum().map(|(_, s)| s);
        if found.is_none() {
            tracing::warn!(n = problem.n(), "too many variables for --verify; skipped");
        }
        found
    } else {
        None
    };
    Ok(SolveReport {
        termination: format!("{:?}", outcome.termination),
        certified: outcome.certified,
        lower_bound: outcome.lower_bound,
        upper_bound: outcome.upper_bound,
        gap: outcome.gap(),
        best: outcome.best.iter().copied().collect(),
        lp_solves: outcome.lp_solves,
        cuts_added: outcome.cuts_added,
        rows_pruned: outcome.rows_pruned,
        rounding_scores: outcome.rounding.map(|r| r.trial_scores),
        exhaustive_optimum,
    })
}

fn random(n: usize, density: f64, seed: u64, out: &Path) -> Result<()> {
    tracing::info!(n, density, seed, out = %out.display(), "random");
    let problem = Problem::random(n, density, &mut StdRng::seed_from_u64(seed));
    ensure_parent(out)?;
    std::fs::write(
        out,
        serde_json::to_vec_pretty(&ProblemFile::from_problem(&problem))?,
    )
    .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn report(tag: Option<String>) -> Result<()> {
    let obj = serde_json::json!({
        "solver_version": clqo::VERSION,
        "code_rev": provenance::code_rev(),
        "tag": tag,
        "default_cfg": provenance::CfgRecord::from(&SolveCfg::default()),
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
