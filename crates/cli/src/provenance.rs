//! Run records written next to solve results.
//!
//! `out.json` gets an `out.run.json` companion holding the code revision, the
//! full solver configuration, the seed, and a digest of the input problem, so a
//! result can be regenerated from the record alone.

use anyhow::{Context, Result};
use clqo::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Shape of the input problem at solve time.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InputDigest {
    pub path: String,
    pub n: usize,
    pub constant: f64,
    pub nonzero_pairs: usize,
    pub naive_upper_bound: f64,
}

impl InputDigest {
    pub fn of(path: &Path, problem: &Problem) -> Self {
        let n = problem.n();
        let nonzero_pairs = (0..n)
            .flat_map(|x| (0..x).map(move |y| (x, y)))
            .filter(|&(x, y)| problem.coeff(x, y) != 0.0)
            .count();
        Self {
            path: path.to_string_lossy().into_owned(),
            n,
            constant: problem.constant(),
            nonzero_pairs,
            naive_upper_bound: problem.naive_upper_bound(),
        }
    }
}

/// Serializable mirror of `SolveCfg`; the library stays serde-free.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct CfgRecord {
    pub psd_tol: f64,
    pub rounding_trials: usize,
    pub cut_fail_limit: usize,
    pub row_removal_slack: f64,
    pub rounding_shift: f64,
    pub max_lp_solves: usize,
    pub min_cut_violation: f64,
    pub exhaustive_core_limit: usize,
    pub certify_tol: f64,
}

impl From<&SolveCfg> for CfgRecord {
    fn from(cfg: &SolveCfg) -> Self {
        Self {
            psd_tol: cfg.psd_tol,
            rounding_trials: cfg.rounding_trials,
            cut_fail_limit: cfg.cut_fail_limit,
            row_removal_slack: cfg.row_removal_slack,
            rounding_shift: cfg.rounding_shift,
            max_lp_solves: cfg.max_lp_solves,
            min_cut_violation: cfg.min_cut_violation,
            exhaustive_core_limit: cfg.exhaustive_core_limit,
            certify_tol: cfg.certify_tol,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RunRecord {
    pub solver_version: &'static str,
    pub code_rev: String,
    pub tag: Option<String>,
    pub seed: u64,
    pub input: InputDigest,
    pub cfg: CfgRecord,
    pub result: String,
}

impl RunRecord {
    pub fn new(
        input: InputDigest,
        cfg: &SolveCfg,
        seed: u64,
        result: &Path,
        tag: Option<String>,
    ) -> Self {
        Self {
            solver_version: clqo::VERSION,
            code_rev: code_rev(),
            tag,
            seed,
            input,
            cfg: CfgRecord::from(cfg),
            result: result.to_string_lossy().into_owned(),
        }
    }
}

/// Write the record next to `result` and return its path.
pub fn write_record(result: &Path, record: &RunRecord) -> Result<PathBuf> {
    let path = record_path(result);
    fs::write(&path, serde_json::to_vec_pretty(record)?)
        .with_context(|| format!("writing run record {}", path.display()))?;
    Ok(path)
}

/// `dir/out.json` -> `dir/out.run.json`.
fn record_path(result: &Path) -> PathBuf {
    let stem = result
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string());
    result.with_file_name(format!("{stem}.run.json"))
}

/// `CLQO_CODE_REV` if set, else `git describe --always --dirty`, else "unknown".
pub fn code_rev() -> String {
    if let Some(rev) = std::env::var("CLQO_CODE_REV").ok().filter(|r| !r.is_empty()) {
        return rev;
    }
    Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_sits_beside_the_result() {
        assert_eq!(
            record_path(Path::new("/tmp/runs/tri.json")),
            Path::new("/tmp/runs/tri.run.json")
        );
        assert_eq!(record_path(Path::new("bare")), Path::new("bare.run.json"));
    }

    #[test]
    fn digest_counts_nonzero_pairs() {
        let p = Problem::new(
            DMatrix::from_row_slice(3, 3, &[0.0, 2.0, 0.0, 2.0, 0.0, -1.0, 0.0, -1.0, 0.0]),
            0.5,
        )
        .unwrap();
        let d = InputDigest::of(Path::new("p.json"), &p);
        assert_eq!(d.n, 3);
        assert_eq!(d.nonzero_pairs, 2);
        assert_eq!(d.constant, 0.5);
        assert_eq!(d.naive_upper_bound, p.naive_upper_bound());
    }

    #[test]
    fn record_carries_full_cfg_and_seed() {
        let dir = tempdir().unwrap();
        let result = dir.path().join("out.json");
        let p = Problem::new(DMatrix::zeros(2, 2), 0.0).unwrap();
        let cfg = SolveCfg {
            psd_tol: 1e-8,
            ..SolveCfg::default()
        };
        let record = RunRecord::new(
            InputDigest::of(Path::new("in.json"), &p),
            &cfg,
            42,
            &result,
            Some("nightly".into()),
        );
        let path = write_record(&result, &record).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(parsed["seed"], 42);
        assert_eq!(parsed["tag"], "nightly");
        assert_eq!(parsed["cfg"]["psd_tol"], 1e-8);
        assert_eq!(parsed["cfg"]["exhaustive_core_limit"], cfg.exhaustive_core_limit);
        assert_eq!(parsed["input"]["n"], 2);
        assert_eq!(parsed["solver_version"], clqo::VERSION);
    }
}
