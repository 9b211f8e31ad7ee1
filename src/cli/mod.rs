//! Command-line interface for otu-reassign.
//!
//! Available commands:
//!
//! - **run**: Classify sample reads end to end, from raw reads to OTU hits
//! - **reassign**: Reassign an existing VTA file and write its report
//! - **config**: Print the default (or a validated) configuration as JSON
//!
//! ## Usage
//!
//! ```text
//! # Full run against a reference and host index
//! otu-reassign run --reads sample.fq.gz --reference reference.json.gz \
//!     --index ref/reference --host host/host --work-dir run_1
//!
//! # Reassign alignments produced elsewhere, with coverage
//! otu-reassign reassign --vta to_isolates.vta --work-dir out --lengths isolates.fa
//!
//! # Start from the defaults when writing a config file
//! otu-reassign config > config.json
//! ```

use clap::{Parser, Subcommand};

pub mod config;
pub mod reassign;
pub mod run;

#[derive(Parser)]
#[command(name = "otu-reassign")]
#[command(version)]
#[command(about = "Classify metagenomic reads against an OTU reference")]
#[command(
    long_about = "otu-reassign finds which OTUs in a reference are supported by a set of sequencing reads.\n\nReads are mapped against the reference, the matching OTUs are re-indexed and mapped against again allowing multiple alignments, host-derived reads are subtracted, and ambiguous reads are reassigned by expectation-maximization. Each hit reports:\n- Final and initial abundance estimates\n- Best-hit read counts at two confidence levels\n- Coverage and depth over the reference sequence"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full classification pipeline
    Run(run::RunArgs),

    /// Reassign reads from an existing VTA file
    Reassign(reassign::ReassignArgs),

    /// Print configuration as JSON
    Config(config::ConfigArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
