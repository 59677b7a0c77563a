//! Kirchhoff - circuit equation solver
//!
//! Solves the DC operating point of a netlist, or its small-signal response at
//! one frequency, and prints every unknown as CSV on stdout.
//!
//! # Usage
//!
//! ```bash
//! kirchhoff divider.cir
//! kirchhoff filter.cir --frequency 1k --print-matrix
//! ```

use std::path::PathBuf;

use clap::Parser;
use kirchhoff_core::{
    circuit::{validate_circuit, Circuit},
    error::Result,
    netlist, Network, NetworkConfig,
};

/// Sparse circuit equation solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file
    #[arg(value_name = "NETLIST")]
    netlist_file: PathBuf,

    /// Run an AC analysis at this frequency in Hz (SI suffixes allowed)
    #[arg(short, long, value_parser = parse_frequency)]
    frequency: Option<f64>,

    /// Print the factored matrix to stderr
    #[arg(long)]
    print_matrix: bool,

    /// Relative pivot threshold
    #[arg(long, default_value_t = kirchhoff_core::sparse::DEFAULT_REL_THRESHOLD)]
    rel_threshold: f64,

    /// Absolute pivot threshold
    #[arg(long, default_value_t = kirchhoff_core::sparse::DEFAULT_ABS_THRESHOLD)]
    abs_threshold: f64,
}

fn parse_frequency(s: &str) -> std::result::Result<f64, String> {
    netlist::parse_value(s).ok_or_else(|| format!("invalid frequency '{}'", s))
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse and build the circuit
    let ast = netlist::parse_file(&args.netlist_file)?;
    let circuit = Circuit::from_ast(ast)?;
    validate_circuit(&circuit)?;

    if let Some(title) = &circuit.title {
        tracing::info!(title = %title, "netlist loaded");
    }

    let config = NetworkConfig::new()
        .with_rel_threshold(args.rel_threshold)
        .with_abs_threshold(args.abs_threshold);
    let mut network = Network::with_config(circuit, config)?;

    match args.frequency {
        None => {
            let solution = network.solve_dc()?.to_vec();
            println!("unknown,value");
            for (index, value) in solution.iter().enumerate().skip(1) {
                println!("{},{:.9e}", network.unknown_name(index), value);
            }
        }
        Some(frequency) => {
            let solution = network.solve_ac(frequency)?.to_vec();
            println!("unknown,magnitude,phase_deg");
            for (index, value) in solution.iter().enumerate().skip(1) {
                println!(
                    "{},{:.9e},{:.6}",
                    network.unknown_name(index),
                    value.norm(),
                    value.arg().to_degrees()
                );
            }
        }
    }

    if args.print_matrix {
        eprint!("{}", network.matrix());
    }

    Ok(())
}
