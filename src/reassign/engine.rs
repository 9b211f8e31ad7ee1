use std::path::Path;

use tracing::info;

use crate::core::config::EmConfig;
use crate::core::types::AlignmentRecord;
use crate::parsing::sam::ParseError;
use crate::parsing::vta::{read_vta_file, VtaWriter};
use crate::reassign::best_hit::HitStatistics;
use crate::reassign::em::{is_tied, run_em};
use crate::reassign::matrix::ReadMatrix;

/// Outcome of reassigning a set of alignments
#[derive(Debug, Clone)]
pub struct ReassignmentResult {
    /// Reference ids in lexicographic order; every per-reference vector is
    /// indexed the same way
    pub references: Vec<String>,

    /// Distinct reads that took part
    pub read_count: usize,

    pub init_pi: Vec<f64>,

    /// Final abundance, sums to 1 when any reads were present
    pub pi: Vec<f64>,

    pub initial_stats: HitStatistics,
    pub final_stats: HitStatistics,

    pub iterations: usize,
    pub converged: bool,

    /// One record per read for its most probable reference, in read order
    pub assignments: Vec<AlignmentRecord>,
}

impl ReassignmentResult {
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn reference_index(&self, reference_id: &str) -> Option<usize> {
        self.references
            .binary_search_by(|r| r.as_str().cmp(reference_id))
            .ok()
    }
}

/// Reassign ambiguous reads across references
#[must_use]
pub fn reassign_records(records: &[AlignmentRecord], config: &EmConfig) -> ReassignmentResult {
    let matrix = ReadMatrix::build(records);
    let outcome = run_em(&matrix, config);

    let initial_stats = HitStatistics::compute(&matrix, &outcome.initial_responsibilities);
    let final_stats = HitStatistics::compute(&matrix, &outcome.responsibilities);

    let assignments = matrix
        .reads
        .iter()
        .zip(&outcome.responsibilities)
        .filter_map(|(candidates, weights)| {
            let best = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            candidates
                .iter()
                .zip(weights)
                .find(|(_, w)| is_tied(**w, best))
                .map(|(c, _)| records[c.record].clone())
        })
        .collect();

    ReassignmentResult {
        read_count: matrix.read_count(),
        references: matrix.references,
        init_pi: outcome.init_pi,
        pi: outcome.pi,
        initial_stats,
        final_stats,
        iterations: outcome.iterations,
        converged: outcome.converged,
        assignments,
    }
}

/// Reassign the records of a VTA file and write the retained assignments.
///
/// `reassigned_path` is flushed and synced before this returns, so coverage
/// may be computed from it immediately.
///
/// # Errors
///
/// Returns `ParseError` if the input cannot be read or parsed, or the output
/// cannot be written.
pub fn reassign(
    vta_path: &Path,
    reassigned_path: &Path,
    config: &EmConfig,
) -> Result<ReassignmentResult, ParseError> {
    let records = read_vta_file(vta_path)?;
    let result = reassign_records(&records, config);

    let mut writer = VtaWriter::create(reassigned_path)?;
    for record in &result.assignments {
        writer.write_record(record)?;
    }
    let written = writer.finish_and_sync()?;

    info!(
        "Reassigned {} reads across {} references in {} iterations",
        result.read_count,
        result.reference_count(),
        result.iterations
    );
    info!("Wrote {} retained alignments to {}", written, reassigned_path.display());

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scenario_a() -> Vec<AlignmentRecord> {
        vec![
            AlignmentRecord::new("r1", "OTU1", 0, 50, 0.9),
            AlignmentRecord::new("r2", "OTU1", 20, 50, 0.8),
            AlignmentRecord::new("r2", "OTU2", 30, 50, 0.79),
        ]
    }

    #[test]
    fn test_scenario_a_prefers_supported_reference() {
        let result = reassign_records(&scenario_a(), &EmConfig::default());

        assert_eq!(result.references, vec!["OTU1", "OTU2"]);
        assert_eq!(result.read_count, 2);
        assert!(result.pi[0] > result.pi[1]);
        assert!(result.final_stats.best_hit_reads[0] >= 1);
        assert!((result.pi.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        assert_eq!(result.assignments.len(), 2);
        assert_eq!(result.assignments[1].reference_id, "OTU1");
        assert_eq!(result.assignments[1].position, 20);
    }

    #[test]
    fn test_unique_reads_fully_assigned() {
        let records = vec![
            AlignmentRecord::new("r1", "A", 0, 50, 0.4),
            AlignmentRecord::new("r2", "B", 0, 50, 0.9),
            AlignmentRecord::new("r2", "A", 0, 50, 0.1),
        ];
        let result = reassign_records(&records, &EmConfig::default());
        let a = result.reference_index("A").unwrap();

        assert_eq!(result.initial_stats.best_hit_reads[a], 1);
        assert_eq!(result.final_stats.best_hit_reads[a], 1);
        assert_eq!(result.final_stats.level_2_reads[a], 1);
    }

    #[test]
    fn test_tied_read_assigned_lexicographically() {
        let records = vec![
            AlignmentRecord::new("r1", "OTU_B", 0, 50, 0.5),
            AlignmentRecord::new("r1", "OTU_A", 0, 50, 0.5),
        ];
        let result = reassign_records(&records, &EmConfig::default());

        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments[0].reference_id, "OTU_A");
        assert_eq!(result.final_stats.level_1_reads, vec![1, 0]);
        assert_eq!(result.final_stats.level_2_reads, vec![1, 1]);
    }

    #[test]
    fn test_reassign_writes_one_record_per_read() {
        let dir = TempDir::new().unwrap();
        let vta = dir.path().join("to_isolates.vta");
        let out = dir.path().join("reassigned.vta");

        let mut writer = VtaWriter::create(&vta).unwrap();
        for record in scenario_a() {
            writer.write_record(&record).unwrap();
        }
        writer.finish_and_sync().unwrap();

        let result = reassign(&vta, &out, &EmConfig::default()).unwrap();
        let written = read_vta_file(&out).unwrap();

        assert_eq!(written, result.assignments);
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let result = reassign_records(&[], &EmConfig::default());
        assert_eq!(result.read_count, 0);
        assert!(result.pi.is_empty());
        assert!(result.converged);
    }
}
