//! End-to-end runs of the cutting-plane loop on the Clarabel engine.

use clqo::prelude::*;
use nalgebra::dmatrix;
use rand::{rngs::StdRng, SeedableRng};

fn run(problem: &Problem, cfg: SolveCfg, seed: u64) -> (SolveOutcome, Vec<f64>) {
    let mut solver = Solver::new(
        problem,
        ClarabelEngine::new(),
        EigenCutGenerator::from_cfg(&cfg),
        cfg,
    )
    .expect("solver setup");
    let out = solver
        .run(&mut StdRng::seed_from_u64(seed))
        .expect("solve succeeds");
    (out, solver.state().point().to_vec())
}

#[test]
fn all_positive_triangle_completes_at_first_lp() {
    let p = Problem::new(dmatrix![0.0, 1.0, 1.0; 1.0, 0.0, 1.0; 1.0, 1.0, 0.0], 0.0).unwrap();
    let (out, point) = run(&p, SolveCfg::default(), 0);
    assert_eq!(out.termination, Termination::Complete);
    assert_eq!(out.lp_solves, 1);
    assert_eq!(out.cuts_added, 0);
    assert!(point.iter().all(|&v| (v - 1.0).abs() < 1e-5));
    assert_eq!(out.best.as_slice(), &[1.0, 1.0, 1.0]);
    assert!((out.lower_bound - 3.0).abs() < 1e-12);
    assert!((out.upper_bound - 3.0).abs() < 1e-6);
    assert!(out.certified);
}

#[test]
fn frustrated_triangle_needs_one_cut() {
    let p = Problem::new(
        dmatrix![0.0, -1.0, -1.0; -1.0, 0.0, -1.0; -1.0, -1.0, 0.0],
        0.0,
    )
    .unwrap();
    let (out, _) = run(&p, SolveCfg::default(), 7);
    assert!(out.cuts_added >= 1);
    assert!((out.upper_bound - 1.0).abs() < 1e-4);
    assert!((out.lower_bound - 1.0).abs() < 1e-12);
    assert_eq!(out.best[0], 1.0);
    assert!((p.score(&out.best) - 1.0).abs() < 1e-12);
}

#[test]
fn solve_with_defaults_matches_exhaustive_optimum_bounds() {
    let p = Problem::new(
        dmatrix![
            0.0, 0.5, -1.0, 0.25;
            0.5, 0.0, 0.75, -0.5;
            -1.0, 0.75, 0.0, 1.0;
            0.25, -0.5, 1.0, 0.0
        ],
        0.5,
    )
    .unwrap();
    let (_, opt) = p.exhaustive_optimum().unwrap();
    let out = solve_with_defaults(&p, &mut StdRng::seed_from_u64(1)).unwrap();
    assert!(out.lower_bound <= opt + 1e-12);
    assert!(out.upper_bound >= opt - 1e-5);
    assert!((p.score(&out.best) - out.lower_bound).abs() < 1e-12);
}

#[test]
fn random_problems_keep_valid_bounds() {
    let cfg = SolveCfg {
        max_lp_solves: 300,
        ..SolveCfg::default()
    };
    for (n, seed) in [(4usize, 11u64), (5, 12), (5, 13)] {
        let p = Problem::random(n, 1.0, &mut StdRng::seed_from_u64(seed));
        let (_, opt) = p.exhaustive_optimum().unwrap();
        let (out, point) = run(&p, cfg, seed);
        assert!(out.lower_bound <= opt + 1e-12, "n={n} seed={seed}");
        assert!(out.upper_bound >= opt - 1e-5, "n={n} seed={seed}");
        assert!(out.upper_bound <= p.naive_upper_bound() + 1e-9);
        assert!(out
            .upper_bound_history
            .windows(2)
            .all(|w| w[1] <= w[0]));
        assert_eq!(out.best[0], 1.0);
        assert!(point.iter().all(|v| (-1.0..=1.0).contains(v)));
        if out.certified {
            assert!((out.lower_bound - opt).abs() < 1e-5);
        }
    }
}
