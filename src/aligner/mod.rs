//! External short-read aligner integration.
//!
//! The pipeline treats the aligner and its index format as opaque. It only
//! needs to build an index from a FASTA file and to stream SAM text for a
//! mapping run. [`Aligner`] captures those two capabilities; [`Bowtie2`] is
//! the production implementation.
//!
//! Mapping output is consumed through [`AlignmentStream`], which reads the
//! child's stdout line by line while the process is still running.

use std::path::PathBuf;

use thiserror::Error;

pub mod bowtie2;
pub mod stream;

pub use bowtie2::Bowtie2;
pub use stream::AlignmentStream;

#[derive(Error, Debug)]
pub enum AlignerError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} exited with {}", describe_status(.status))]
    Process { tool: String, status: Option<i32> },

    #[error("IO error while reading {tool} output: {source}")]
    Io {
        tool: String,
        source: std::io::Error,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// How a mapping run reports alignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Sample reads against the full reference; one alignment per read
    Discovery,

    /// Sample reads against the isolate index; up to `max_alignments` per read
    Isolates { max_alignments: u32 },

    /// Mapped reads against the host; best alignment only
    Host,
}

/// One mapping run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRequest {
    /// Aligner index prefix
    pub index: PathBuf,

    /// Read files, mapped together as unpaired reads
    pub reads: Vec<PathBuf>,

    pub mode: MapMode,
}

/// Index construction and read mapping.
///
/// Futures returned by these methods are polled on the coordinating task only,
/// so they are not required to be `Send`.
#[allow(async_fn_in_trait)]
pub trait Aligner {
    /// Build an index at `prefix` from a FASTA file
    async fn build_index(&self, fasta: &std::path::Path, prefix: &std::path::Path) -> Result<(), AlignerError>;

    /// Start a mapping run and return its SAM output stream
    fn map(&self, request: &MapRequest) -> Result<AlignmentStream, AlignerError>;
}
