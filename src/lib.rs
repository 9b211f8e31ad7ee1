//! # otu-reassign
//!
//! A library for classifying metagenomic sequencing reads against a reference of
//! operational taxonomic units (OTUs).
//!
//! Reads that align equally well to several related sequences are common when a
//! reference holds many isolates of the same virus. Rather than counting such
//! reads everywhere or nowhere, `otu-reassign` estimates how much of the sample
//! each reference sequence explains and distributes ambiguous reads accordingly.
//!
//! ## Features
//!
//! - **Streaming alignment filtering**: aligner output is parsed and scored as it
//!   is produced
//! - **Targeted re-mapping**: only OTUs hit in a first pass are re-indexed for the
//!   multi-mapping pass
//! - **Host subtraction**: reads explained at least as well by the host are removed
//! - **EM reassignment**: ambiguous reads are shared out by estimated abundance,
//!   with deterministic tie-breaking
//! - **Coverage and depth** for every reported sequence
//!
//! ## Example
//!
//! ```rust
//! use otu_reassign::core::config::EmConfig;
//! use otu_reassign::reassign::reassign_records;
//! use otu_reassign::AlignmentRecord;
//!
//! let records = vec![
//!     AlignmentRecord::new("r1", "OTU1", 0, 50, 0.9),
//!     AlignmentRecord::new("r2", "OTU1", 20, 50, 0.8),
//!     AlignmentRecord::new("r2", "OTU2", 30, 50, 0.79),
//! ];
//!
//! let result = reassign_records(&records, &EmConfig::default());
//! assert!(result.pi[0] > result.pi[1]);
//! ```
//!
//! ## Modules
//!
//! - [`aligner`]: The aligner interface, bowtie2 driver, and SAM output streams
//! - [`catalog`]: OTU reference loading and sequence lookups
//! - [`core`]: Core data types and configuration
//! - [`parsing`]: SAM filtering and VTA, FASTA, FASTQ reading and writing
//! - [`pipeline`]: The staged run from sample reads to hits
//! - [`reassign`]: Host subtraction and EM reassignment
//! - [`coverage`]: Per-base coverage and depth
//! - [`report`]: The TSV report and hit list
//! - [`cli`]: Command-line interface implementation

pub mod aligner;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod coverage;
pub mod parsing;
pub mod pipeline;
pub mod reassign;
pub mod report;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::aligner::{Aligner, AlignmentStream, Bowtie2, MapMode, MapRequest};
pub use crate::catalog::{OtuCatalog, ReferenceResolver};
pub use crate::core::config::PipelineConfig;
pub use crate::core::hit::Hit;
pub use crate::core::types::{
    AlignmentRecord, CandidateSet, CoverageArray, HostScoreTable, ReferenceLengths,
};
pub use crate::pipeline::{AnalysisResults, Pipeline, PipelineError, RunInputs};
pub use crate::reassign::ReassignmentResult;
