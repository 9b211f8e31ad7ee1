use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use crate::aligner::Aligner;
use crate::catalog::{CatalogError, ReferenceResolver};
use crate::core::types::{CandidateSet, ReferenceLengths};
use crate::parsing::fasta::write_fasta_file;
use crate::pipeline::{PipelineError, WorkPaths};

/// The reduced reference built from candidate OTUs
#[derive(Debug, Clone)]
pub struct IsolateIndex {
    pub fasta: PathBuf,

    /// Aligner index prefix
    pub prefix: PathBuf,

    /// Length of every sequence in the index
    pub lengths: ReferenceLengths,
}

/// Every sequence of every OTU owning a candidate reference, OTUs in id order.
///
/// # Errors
///
/// Returns `CatalogError::UnknownSequence` for a candidate with no owning OTU,
/// `CatalogError::UnknownOtu` if the resolver cannot list an OTU's sequences,
/// or `CatalogError::EmptyOtu` if an OTU has none.
pub fn isolate_sequences<'r, R: ReferenceResolver>(
    resolver: &'r R,
    candidates: &CandidateSet,
) -> Result<Vec<(&'r str, &'r [u8])>, CatalogError> {
    let otu_ids = candidates
        .iter()
        .map(|id| {
            resolver
                .otu_id_for_sequence(id)
                .ok_or_else(|| CatalogError::UnknownSequence(id.clone()))
        })
        .collect::<Result<BTreeSet<&str>, _>>()?;

    let mut sequences = Vec::new();
    for otu_id in otu_ids {
        let otu_sequences = resolver
            .otu_sequences(otu_id)
            .ok_or_else(|| CatalogError::UnknownOtu(otu_id.to_string()))?;

        if otu_sequences.is_empty() {
            return Err(CatalogError::EmptyOtu(otu_id.to_string()));
        }
        sequences.extend(otu_sequences);
    }

    Ok(sequences)
}

/// Write the isolate FASTA and build its aligner index
///
/// # Errors
///
/// Returns `PipelineError` if a candidate cannot be resolved, the FASTA cannot
/// be written, or the index build fails.
pub async fn build_isolate_index<A: Aligner, R: ReferenceResolver>(
    aligner: &A,
    resolver: &R,
    candidates: &CandidateSet,
    paths: &WorkPaths,
) -> Result<IsolateIndex, PipelineError> {
    let sequences = isolate_sequences(resolver, candidates)?;
    let lengths = write_fasta_file(&paths.isolate_fasta, sequences)?;

    info!(
        "Wrote {} isolate sequences to {}",
        lengths.len(),
        paths.isolate_fasta.display()
    );

    aligner
        .build_index(&paths.isolate_fasta, &paths.isolate_index)
        .await?;

    Ok(IsolateIndex {
        fasta: paths.isolate_fasta.clone(),
        prefix: paths.isolate_index.clone(),
        lengths,
    })
}
