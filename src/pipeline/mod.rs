//! The read classification pipeline.
//!
//! A run moves through these stages in order, each consuming what the
//! previous one produced:
//!
//! 1. [`candidates`]: map sample reads against the full reference and collect
//!    every reference hit at least once
//! 2. [`isolates`]: write every sequence of the OTUs owning those references
//!    to a reduced FASTA and index it
//! 3. [`targeted`]: map sample reads against the reduced index allowing
//!    multiple alignments per read
//! 4. [`host`]: map the reads that aligned in step 3 against the host and
//!    record each read's best host score
//! 5. subtraction, reassignment, report, and coverage (see [`crate::reassign`],
//!    [`crate::report`], [`crate::coverage`])
//!
//! Aligner output is consumed as it is produced. CPU-bound stages run on the
//! blocking pool and are awaited before the next stage starts.

pub mod candidates;
pub mod host;
pub mod isolates;
pub mod targeted;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::aligner::{Aligner, AlignerError, MapMode, MapRequest};
use crate::catalog::{CatalogError, ReferenceResolver};
use crate::core::config::PipelineConfig;
use crate::core::hit::Hit;
use crate::coverage::calculate_coverage;
use crate::parsing::sam::{AlignmentFilter, LocalAlignmentScore, ParseError, ScoreExtractor};
use crate::reassign::{reassign, subtract};
use crate::report::{build_hits, write_report};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Aligner(#[from] AlignerError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reads aligned to the reference; there are no candidate references")]
    NoCandidates,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Files a run reads from
#[derive(Debug, Clone)]
pub struct RunInputs {
    /// Sample read files
    pub reads: Vec<PathBuf>,

    /// Aligner index of the full reference
    pub reference_index: PathBuf,

    /// Aligner index of the host genome
    pub host_index: PathBuf,

    /// Directory owned by this run
    pub work_dir: PathBuf,
}

/// Locations of every artifact a run writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPaths {
    pub isolate_dir: PathBuf,
    pub isolate_fasta: PathBuf,
    pub isolate_index: PathBuf,
    pub isolate_vta: PathBuf,
    pub mapped_fastq: PathBuf,
    pub reassigned_vta: PathBuf,
    pub report: PathBuf,
}

impl WorkPaths {
    pub fn new(work_dir: &Path) -> Self {
        let isolate_dir = work_dir.join("isolates");
        Self {
            isolate_fasta: isolate_dir.join("isolate_index.fa"),
            isolate_index: isolate_dir.join("isolates"),
            isolate_vta: isolate_dir.join("to_isolates.vta"),
            mapped_fastq: isolate_dir.join("mapped.fastq"),
            reassigned_vta: isolate_dir.join("reassigned.vta"),
            report: isolate_dir.join("report.tsv"),
            isolate_dir,
        }
    }

    /// Create the directories artifacts are written to
    ///
    /// # Errors
    ///
    /// Returns an IO error if a directory cannot be created.
    pub fn create(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.isolate_dir)
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    /// Reads that took part in reassignment
    pub read_count: usize,

    /// Reads removed because they aligned at least as well to the host
    pub subtracted_count: usize,

    pub converged: bool,
    pub iterations: usize,

    /// One entry per reference, in report order
    pub hits: Vec<Hit>,
}

/// State shared by every stage of one run
pub struct PipelineContext {
    pub paths: WorkPaths,

    /// Filter for sample-read passes, applies the score cutoff
    pub sample_filter: AlignmentFilter,

    /// Filter for the host pass, no cutoff
    pub host_filter: AlignmentFilter,
}

impl PipelineContext {
    pub fn new(work_dir: &Path, config: &PipelineConfig) -> Self {
        let extractor: Arc<dyn ScoreExtractor> = Arc::new(LocalAlignmentScore::new(&config.scoring));
        Self {
            paths: WorkPaths::new(work_dir),
            sample_filter: AlignmentFilter::new(Arc::clone(&extractor)).with_cutoff(config.score_cutoff),
            host_filter: AlignmentFilter::new(extractor),
        }
    }
}

/// Runs every stage against one aligner and reference source
pub struct Pipeline<'a, A, R> {
    aligner: &'a A,
    resolver: &'a R,
    config: &'a PipelineConfig,
}

impl<'a, A: Aligner, R: ReferenceResolver> Pipeline<'a, A, R> {
    pub fn new(aligner: &'a A, resolver: &'a R, config: &'a PipelineConfig) -> Self {
        Self {
            aligner,
            resolver,
            config,
        }
    }

    /// Run the pipeline from sample reads to hits.
    ///
    /// Artifacts are left in the working directory whether or not the run
    /// succeeds. Dropping the returned future stops any running aligner.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if an aligner fails, no candidate references are
    /// found, a candidate is unknown to the resolver, or an artifact cannot be
    /// read or written.
    pub async fn run(&self, inputs: &RunInputs) -> Result<AnalysisResults, PipelineError> {
        let context = PipelineContext::new(&inputs.work_dir, self.config);
        context.paths.create()?;

        let candidates = candidates::find_candidates(
            self.aligner,
            &context.sample_filter,
            &MapRequest {
                index: inputs.reference_index.clone(),
                reads: inputs.reads.clone(),
                mode: MapMode::Discovery,
            },
        )
        .await?;

        let isolate_index =
            isolates::build_isolate_index(self.aligner, self.resolver, &candidates, &context.paths)
                .await?;

        let targeted = targeted::map_isolates(
            self.aligner,
            &context.sample_filter,
            &MapRequest {
                index: isolate_index.prefix.clone(),
                reads: inputs.reads.clone(),
                mode: MapMode::Isolates {
                    max_alignments: self.config.max_alignments,
                },
            },
            &context.paths,
        )
        .await?;

        let host_scores = if targeted.mapped_reads == 0 {
            info!("No reads aligned to isolates, skipping host mapping");
            Default::default()
        } else {
            host::map_host(
                self.aligner,
                &context.host_filter,
                &MapRequest {
                    index: inputs.host_index.clone(),
                    reads: vec![context.paths.mapped_fastq.clone()],
                    mode: MapMode::Host,
                },
            )
            .await?
        };

        let vta = context.paths.isolate_vta.clone();
        let subtracted_count =
            tokio::task::spawn_blocking(move || subtract(&vta, &host_scores)).await??;

        let vta = context.paths.isolate_vta.clone();
        let reassigned = context.paths.reassigned_vta.clone();
        let report_path = context.paths.report.clone();
        let em = self.config.em.clone();
        let (result, rows) = tokio::task::spawn_blocking(move || -> Result<_, PipelineError> {
            let result = reassign(&vta, &reassigned, &em)?;
            let rows = write_report(&report_path, &result)?;
            Ok((result, rows))
        })
        .await??;

        // The reassignment task has returned, so reassigned.vta is complete
        let reassigned = context.paths.reassigned_vta.clone();
        let lengths = isolate_index.lengths;
        let coverage =
            tokio::task::spawn_blocking(move || calculate_coverage(&reassigned, &lengths)).await??;

        let hits = build_hits(&rows, &coverage, self.resolver)?;

        info!(
            "Found {} hits from {} reads ({} subtracted)",
            hits.len(),
            result.read_count,
            subtracted_count
        );

        Ok(AnalysisResults {
            read_count: result.read_count,
            subtracted_count,
            converged: result.converged,
            iterations: result.iterations,
            hits,
        })
    }
}
