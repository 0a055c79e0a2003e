//! Timing run: certify (or round) a random instance and compare with brute force.
//!
//! Usage: `cargo run -p clqo --example certify_random -- [n] [seed]`

use std::time::Instant;

use clqo::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

fn main() {
    let mut args = std::env::args().skip(1);
    let n: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(10);
    let seed: u64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(1);

    let problem = Problem::random(n, 0.7, &mut StdRng::seed_from_u64(seed));

    let t0 = Instant::now();
    let out = solve_with_defaults(&problem, &mut StdRng::seed_from_u64(seed ^ 0x5eed))
        .expect("solve succeeds");
    let solve_ms = t0.elapsed().as_secs_f64() * 1e3;

    println!(
        "n={n} seed={seed} termination={:?} certified={}",
        out.termination, out.certified
    );
    println!(
        "lower={:.9} upper={:.9} gap={:.3e}",
        out.lower_bound,
        out.upper_bound,
        out.gap()
    );
    println!(
        "lp_solves={} cuts_added={} rows_pruned={} solve_time_ms={solve_ms:.3}",
        out.lp_solves, out.cuts_added, out.rows_pruned
    );

    if let Some((_, opt)) = problem.exhaustive_optimum() {
        println!("exhaustive_optimum={opt:.9}");
    }
}
