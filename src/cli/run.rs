use std::path::PathBuf;

use clap::Args;

use crate::aligner::Bowtie2;
use crate::catalog::OtuCatalog;
use crate::cli::OutputFormat;
use crate::core::config::PipelineConfig;
use crate::core::hit::Hit;
use crate::pipeline::{AnalysisResults, Pipeline, RunInputs};

#[derive(Args)]
pub struct RunArgs {
    /// Sample read file (FASTQ, optionally gzipped). Repeat for several files
    #[arg(short, long = "reads", required = true)]
    pub reads: Vec<PathBuf>,

    /// OTU reference JSON (optionally gzipped)
    #[arg(long)]
    pub reference: PathBuf,

    /// Aligner index prefix built from the whole reference
    #[arg(long)]
    pub index: PathBuf,

    /// Aligner index prefix of the host genome
    #[arg(long)]
    pub host: PathBuf,

    /// Working directory for intermediate files; kept after the run
    #[arg(short, long)]
    pub work_dir: PathBuf,

    /// JSON config file (defaults are used for missing keys)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Aligner threads (overrides config)
    #[arg(short = 'p', long)]
    pub threads: Option<usize>,

    /// Minimum alignment score (0-1, overrides config)
    #[arg(long)]
    pub score_cutoff: Option<f64>,

    /// Maximum reassignment iterations (overrides config)
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Also write the hits as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load_from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(cutoff) = self.score_cutoff {
            config.score_cutoff = cutoff;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.em.max_iterations = max_iterations;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Execute the run command
///
/// # Errors
///
/// Returns an error if configuration or the reference cannot be loaded, or
/// any pipeline stage fails.
pub fn run(args: RunArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = args.load_config()?;

    let catalog = OtuCatalog::load_from_file(&args.reference)?;
    if verbose {
        eprintln!("Loaded reference with {} OTUs", catalog.len());
    }

    let aligner = Bowtie2::new(config.aligner.clone(), config.threads);
    let inputs = RunInputs {
        reads: args.reads.clone(),
        reference_index: args.index.clone(),
        host_index: args.host.clone(),
        work_dir: args.work_dir.clone(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let results = rt.block_on(async {
        let pipeline = Pipeline::new(&aligner, &catalog, &config);

        // Dropping the pipeline future kills any running aligner
        tokio::select! {
            result = pipeline.run(&inputs) => result.map_err(anyhow::Error::from),
            _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("Interrupted")),
        }
    })?;

    if let Some(output) = &args.output {
        std::fs::write(output, serde_json::to_string_pretty(&results.hits)?)?;
        if verbose {
            eprintln!("Wrote {} hits to {}", results.hits.len(), output.display());
        }
    }

    match format {
        OutputFormat::Text => print_text_results(&results, verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Tsv => print_tsv_results(&results.hits),
    }

    Ok(())
}

fn print_text_results(results: &AnalysisResults, verbose: bool) {
    println!("Reads reassigned: {}", results.read_count);
    println!("Reads subtracted: {}", results.subtracted_count);
    if !results.converged {
        println!(
            "Reassignment stopped after {} iterations without converging",
            results.iterations
        );
    } else if verbose {
        println!("Reassignment converged after {} iterations", results.iterations);
    }
    println!();

    if results.hits.is_empty() {
        println!("No hits.");
        return;
    }

    println!(
        "{:<24} {:<20} {:>10} {:>8} {:>8} {:>6}",
        "Sequence", "OTU", "Abundance", "Reads", "Coverage", "Depth"
    );
    for hit in &results.hits {
        println!(
            "{:<24} {:<20} {:>10.4} {:>8} {:>8.3} {:>6}",
            hit.id,
            format!("{} (v{})", hit.otu.id, hit.otu.version),
            hit.pi,
            hit.best_hit_reads,
            hit.coverage,
            hit.depth
        );
    }
}

fn print_tsv_results(hits: &[Hit]) {
    println!("sequence_id\totu_id\totu_version\tpi\tbest_hit_reads\tbest_hit_score\tlevel_1\tlevel_2\tinitial_pi\tcoverage\tdepth");
    for hit in hits {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            hit.id,
            hit.otu.id,
            hit.otu.version,
            hit.pi,
            hit.best_hit_reads,
            hit.best_hit_score,
            hit.final_stats.level_1,
            hit.final_stats.level_2,
            hit.initial_stats.pi,
            hit.coverage,
            hit.depth
        );
    }
}
