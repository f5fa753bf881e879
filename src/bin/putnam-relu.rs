//! Command-line front end for the `putnam-relu` decision procedure.

use std::fs;
use std::io::{self, Read};
use std::process;

use clap::Parser;

use putnam_relu::parser::parse;
use putnam_relu::solver::orchestrator::{dpll_t, DpllTOutcome, OrchestratorConfig};
use putnam_relu::solver::reluplex::ReluplexConfig;

/// Decide satisfiability of a linear-real-arithmetic-plus-ReLU formula.
#[derive(Parser, Debug)]
#[command(name = "putnam-relu", version, about)]
struct Cli {
    /// Formula in the surface DSL. Omit to read from `--file` or stdin.
    formula: Option<String>,

    /// Read the formula from a file instead of the positional argument
    /// (`-` reads from stdin).
    #[arg(long)]
    file: Option<String>,

    /// Seed for Reluplex's repair-direction shuffling, for reproducible runs.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Maximum DPLL(T) refinement rounds before conservatively returning UNSAT.
    #[arg(long, default_value_t = 1000)]
    max_rounds: usize,

    /// Maximum Simplex pivots per feasibility check.
    #[arg(long, default_value_t = 10_000)]
    max_iter: usize,

    /// Maximum Reluplex case-split recursion depth.
    #[arg(long, default_value_t = 50)]
    max_recursion: usize,

    /// Raise logging verbosity (can be repeated).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn read_source(cli: &Cli) -> io::Result<String> {
    if let Some(path) = &cli.file {
        if path == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return fs::read_to_string(path);
    }
    if let Some(formula) = &cli.formula {
        return Ok(formula.clone());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();

    let source = match read_source(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error reading input: {}", e);
            process::exit(1);
        }
    };

    let formula = match parse(&source) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let config = OrchestratorConfig {
        max_rounds: cli.max_rounds,
        reluplex: ReluplexConfig {
            max_recursion: cli.max_recursion,
            simplex_max_iter: cli.max_iter,
            seed: cli.seed,
            ..ReluplexConfig::default()
        },
    };

    match dpll_t(&formula, &config) {
        DpllTOutcome::Sat(assignment) => {
            println!("SAT");
            let mut vars: Vec<&String> = assignment.keys().collect();
            vars.sort();
            for var in vars {
                println!("{} = {}", var, assignment[var]);
            }
            process::exit(10);
        }
        DpllTOutcome::Unsat => {
            println!("UNSAT");
            process::exit(20);
        }
    }
}
