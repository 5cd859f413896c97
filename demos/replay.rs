//! Replay the genotypes stored in a configuration file.
//!
//! ```text
//! cargo run --example replay -- demos/bridge.cfg [results.txt]
//! ```
//!
//! Prints a report for each stored genotype. With a results path, the
//! best-scoring genotype is appended there as a best-of-run block.

use std::process::ExitCode;

use truss_fitness::{append_best_of_run, load_config, replay, Sense};

const DEFAULT_CONFIG: &str = "demos/bridge.cfg";

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let results_path = args.next();

    let parsed = match load_config(&config_path) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let results = replay(&parsed.config, &parsed.genotypes);
    for (n, (genotype, evaluation)) in results.iter().enumerate() {
        println!("── design {} ──", n + 1);
        println!("{genotype}");
        println!("{evaluation}");
        println!(
            "solver: {} iterations, converged = {}, |Af - b| = {:.3e}",
            evaluation.solver.iterations,
            evaluation.solver.converged,
            evaluation.solver.residual_norm
        );
        println!();
    }

    let best = results.iter().reduce(|best, candidate| {
        if Sense::Maximize.is_better(candidate.1.fitness, best.1.fitness) {
            candidate
        } else {
            best
        }
    });

    match (best, results_path) {
        (Some((genotype, evaluation)), Some(path)) => {
            if let Err(err) = append_best_of_run(&path, std::slice::from_ref(genotype)) {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
            println!("best fitness {:.3} appended to {path}", evaluation.fitness);
        }
        (Some((_, evaluation)), None) => {
            println!("best fitness {:.3}", evaluation.fitness);
        }
        (None, _) => println!("no replayable genotypes in {config_path}"),
    }

    ExitCode::SUCCESS
}
