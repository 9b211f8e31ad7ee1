use tracing::info;

use crate::aligner::{Aligner, MapRequest};
use crate::core::types::CandidateSet;
use crate::parsing::sam::{AlignmentFilter, FilterStats};
use crate::pipeline::PipelineError;

/// Map reads against the full reference and collect every reference with at
/// least one accepted alignment.
///
/// # Errors
///
/// Returns `PipelineError::NoCandidates` if nothing aligned, or an aligner
/// error if the mapping run fails.
pub async fn find_candidates<A: Aligner>(
    aligner: &A,
    filter: &AlignmentFilter,
    request: &MapRequest,
) -> Result<CandidateSet, PipelineError> {
    info!("Mapping reads to reference index {}", request.index.display());

    let mut stream = aligner.map(request)?;
    let mut stats = FilterStats::default();
    let mut candidates = CandidateSet::new();

    while let Some(alignment) = stream.next_accepted(filter, &mut stats).await? {
        candidates.insert(alignment.reference_id);
    }
    stream.finish().await?;
    stats.log("discovery");

    if candidates.is_empty() {
        return Err(PipelineError::NoCandidates);
    }

    info!(
        "Found {} candidate references from {} alignments",
        candidates.len(),
        stats.accepted
    );

    Ok(candidates)
}
