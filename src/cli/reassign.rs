use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::core::config::PipelineConfig;
use crate::core::hit::HitSummary;
use crate::coverage::{calculate_coverage, CoverageSummary, CoverageTable};
use crate::parsing::fasta::read_fasta_lengths;
use crate::reassign::reassign;
use crate::report::{write_report, ReportRow};

#[derive(Args)]
pub struct ReassignArgs {
    /// VTA file of candidate alignments (read_id,reference_id,position,read_length,score)
    #[arg(long)]
    pub vta: PathBuf,

    /// Directory for reassigned.vta and report.tsv
    #[arg(short, long)]
    pub work_dir: PathBuf,

    /// FASTA of the reference sequences; enables coverage and depth
    #[arg(long)]
    pub lengths: Option<PathBuf>,

    /// JSON config file; only the `em` section is used
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum reassignment iterations (overrides config)
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Convergence tolerance (overrides config)
    #[arg(long)]
    pub tolerance: Option<f64>,
}

#[derive(Serialize)]
struct ReferenceSummary<'a> {
    id: &'a str,
    #[serde(rename = "final")]
    final_stats: &'a HitSummary,
    #[serde(rename = "initial")]
    initial_stats: &'a HitSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<CoverageSummary>,
}

#[derive(Serialize)]
struct ReassignOutput<'a> {
    read_count: usize,
    converged: bool,
    iterations: usize,
    references: Vec<ReferenceSummary<'a>>,
}

/// Execute the reassign command
///
/// # Errors
///
/// Returns an error if the inputs cannot be read or the outputs written.
pub fn run(args: ReassignArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(max_iterations) = args.max_iterations {
        config.em.max_iterations = max_iterations;
    }
    if let Some(tolerance) = args.tolerance {
        config.em.tolerance = tolerance;
    }
    config.validate()?;

    std::fs::create_dir_all(&args.work_dir)?;
    let reassigned_path = args.work_dir.join("reassigned.vta");
    let report_path = args.work_dir.join("report.tsv");

    let result = reassign(&args.vta, &reassigned_path, &config.em)?;
    let rows = write_report(&report_path, &result)?;

    if verbose {
        eprintln!("Wrote report to {}", report_path.display());
    }

    let coverage = match &args.lengths {
        Some(path) => {
            let lengths = read_fasta_lengths(path)?;
            Some(calculate_coverage(&reassigned_path, &lengths)?)
        }
        None => None,
    };

    match format {
        OutputFormat::Text => print_text_results(&rows, coverage.as_ref(), result.read_count),
        OutputFormat::Json => {
            let output = ReassignOutput {
                read_count: result.read_count,
                converged: result.converged,
                iterations: result.iterations,
                references: rows
                    .iter()
                    .map(|row| ReferenceSummary {
                        id: &row.reference_id,
                        final_stats: &row.final_stats,
                        initial_stats: &row.initial_stats,
                        coverage: lookup(coverage.as_ref(), &row.reference_id),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => print_tsv_results(&rows, coverage.as_ref()),
    }

    Ok(())
}

fn lookup(coverage: Option<&CoverageTable>, id: &str) -> Option<CoverageSummary> {
    coverage.map(|table| table.get(id).copied().unwrap_or_default())
}

fn print_text_results(rows: &[ReportRow], coverage: Option<&CoverageTable>, read_count: usize) {
    println!("Reads: {read_count}");
    println!("References: {}", rows.len());
    println!();

    for row in rows {
        print!(
            "{:<24} pi={:.4} best={:.4} reads={}",
            row.reference_id, row.final_stats.pi, row.final_stats.best, row.final_stats.reads
        );
        match lookup(coverage, &row.reference_id) {
            Some(summary) => println!(" coverage={:.3} depth={}", summary.coverage, summary.depth),
            None => println!(),
        }
    }
}

fn print_tsv_results(rows: &[ReportRow], coverage: Option<&CoverageTable>) {
    println!("reference_id\tpi\tbest_hit\tbest_hit_reads\tlevel_1\tlevel_2\tinitial_pi\tcoverage\tdepth");
    for row in rows {
        let (cov, depth) = match lookup(coverage, &row.reference_id) {
            Some(summary) => (summary.coverage.to_string(), summary.depth.to_string()),
            None => (String::new(), String::new()),
        };
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.reference_id,
            row.final_stats.pi,
            row.final_stats.best,
            row.final_stats.reads,
            row.final_stats.level_1,
            row.final_stats.level_2,
            row.initial_stats.pi,
            cov,
            depth
        );
    }
}
