//! Runs one seeded gas under every threading strategy.
//! Reports throughput and checks that all strategies end in the same state.

use std::str::FromStr;
use std::time::Instant;

use chamber_core::{ChamberConfig, DIM, Metrics, Parallelism};
use chamber_physics::procgen::{self, GasSpec, Half};
use chamber_sim::{Chamber, SimError};

/// Atoms per cubic nanometre in the generated box
const DENSITY: f64 = 2.0;

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn build(parallelism: Parallelism, atoms: usize, threads: usize) -> Result<Chamber, SimError> {
    let side = (atoms as f64 / DENSITY).cbrt().max(1.0) * 1e-9;
    let config = ChamberConfig {
        box_size: [side; DIM],
        parallelism,
        workers: threads,
        ..ChamberConfig::default()
    };
    let box_size = config.box_size;
    let mut chamber = Chamber::new(config)?;

    let heavy = atoms / 4;
    chamber.populate(
        atoms - heavy,
        procgen::half_gas(box_size, GasSpec::helium(2e3), Half::Lower, procgen::seeded_rng(11)),
    )?;
    chamber.populate(
        heavy,
        procgen::half_gas(box_size, GasSpec::xenon(3e2), Half::Upper, procgen::seeded_rng(12)),
    )?;
    Ok(chamber)
}

struct Run {
    parallelism: Parallelism,
    ticks_per_second: f64,
    collisions: usize,
    drift: f64,
    last: Metrics,
}

fn measure(parallelism: Parallelism, atoms: usize, ticks: usize, threads: usize) -> Result<Run, SimError> {
    let mut chamber = build(parallelism, atoms, threads)?;
    let initial = chamber.snapshot().total_kinetic();

    let mut collisions = 0;
    let start = Instant::now();
    for _ in 0..ticks {
        chamber.step()?;
        collisions += chamber.collisions().len();
    }
    let elapsed = start.elapsed().as_secs_f64();

    let last = chamber.snapshot();
    let drift = if initial > 0.0 {
        (last.total_kinetic() - initial).abs() / initial
    } else {
        0.0
    };
    Ok(Run {
        parallelism,
        ticks_per_second: ticks as f64 / elapsed.max(f64::EPSILON),
        collisions,
        drift,
        last,
    })
}

fn main() -> Result<(), SimError> {
    let atoms: usize = env_or("CHAMBER_ATOMS", 20_000);
    let ticks: usize = env_or("CHAMBER_TICKS", 200);
    // 0 picks the hardware concurrency
    let threads: usize = env_or("CHAMBER_THREADS", 0);

    eprintln!("{} atoms, {} ticks, threads: {}", atoms, ticks, threads);

    let mut runs = Vec::new();
    for parallelism in [
        Parallelism::Sequential,
        Parallelism::DataParallel,
        Parallelism::WorkerPool,
    ] {
        eprint!("  {:?}...\r", parallelism);
        runs.push(measure(parallelism, atoms, ticks, threads)?);
    }

    println!();
    println!("{:14} {:>12} {:>12} {:>12}", "strategy", "ticks/s", "candidates", "energy drift");
    for run in &runs {
        println!(
            "{:14} {:>12.1} {:>12} {:>12.2e}",
            format!("{:?}", run.parallelism),
            run.ticks_per_second,
            run.collisions,
            run.drift
        );
    }
    println!();

    let reference = &runs[0].last;
    let mismatched: Vec<_> = runs[1..]
        .iter()
        .filter(|run| run.last.atoms != reference.atoms || run.last.pressure != reference.pressure)
        .map(|run| run.parallelism)
        .collect();
    if mismatched.is_empty() {
        println!("All strategies agree after {} ticks.", ticks);
    } else {
        println!("MISMATCH against Sequential: {:?}", mismatched);
        std::process::exit(1);
    }
    Ok(())
}
