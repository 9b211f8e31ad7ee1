use tracing::info;

use crate::aligner::{Aligner, MapRequest};
use crate::core::types::HostScoreTable;
use crate::parsing::sam::{AlignmentFilter, FilterStats};
use crate::pipeline::PipelineError;

/// Keep the higher of the stored and new score for a read. Equal scores keep
/// the stored value.
pub fn record_host_score(table: &mut HostScoreTable, read_id: &str, score: f64) {
    match table.get_mut(read_id) {
        Some(best) => {
            if score > *best {
                *best = score;
            }
        }
        None => {
            table.insert(read_id.to_string(), score);
        }
    }
}

/// Map the mapped reads against the host and record each read's best host score.
///
/// Reads without an accepted host alignment are absent from the table.
///
/// # Errors
///
/// Returns an aligner error if the mapping run fails.
pub async fn map_host<A: Aligner>(
    aligner: &A,
    filter: &AlignmentFilter,
    request: &MapRequest,
) -> Result<HostScoreTable, PipelineError> {
    info!("Mapping reads to host index {}", request.index.display());

    let mut stream = aligner.map(request)?;
    let mut stats = FilterStats::default();
    let mut scores = HostScoreTable::new();

    while let Some(alignment) = stream.next_accepted(filter, &mut stats).await? {
        record_host_score(&mut scores, &alignment.read_id, alignment.score);
    }
    stream.finish().await?;
    stats.log("host");

    info!("{} reads aligned to the host", scores.len());

    Ok(scores)
}
