//! Reassignment report and hit list.
//!
//! The report is a tab-separated table with one row per reference, ordered by
//! final abundance (descending, ties by reference id):
//!
//! ```text
//! Total Number of Aligned Reads:	3
//! Total Number of Mapped Genomes:	2
//! Genome	Final Guess	Final Best Hit	Final Best Hit Read Numbers	...
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::catalog::{CatalogError, ReferenceResolver};
use crate::core::hit::{Hit, HitSummary, OtuRef};
use crate::coverage::CoverageTable;
use crate::reassign::{HitStatistics, ReassignmentResult};

const COLUMNS: [&str; 11] = [
    "Genome",
    "Final Guess",
    "Final Best Hit",
    "Final Best Hit Read Numbers",
    "Final High Confidence Hits",
    "Final Low Confidence Hits",
    "Initial Guess",
    "Initial Best Hit",
    "Initial Best Hit Read Numbers",
    "Initial High Confidence Hits",
    "Initial Low Confidence Hits",
];

/// One report row
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub reference_id: String,
    pub final_stats: HitSummary,
    pub initial_stats: HitSummary,
}

fn summarize(pi: f64, stats: &HitStatistics, reference: usize) -> HitSummary {
    HitSummary {
        pi,
        best: stats.best_hit(reference),
        reads: stats.best_hit_reads[reference],
        level_1: stats.level_1(reference),
        level_2: stats.level_2(reference),
    }
}

/// Report rows for every reference in the result, in report order
#[must_use]
pub fn build_report(result: &ReassignmentResult) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = result
        .references
        .iter()
        .enumerate()
        .map(|(i, id)| ReportRow {
            reference_id: id.clone(),
            final_stats: summarize(result.pi[i], &result.final_stats, i),
            initial_stats: summarize(result.init_pi[i], &result.initial_stats, i),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.final_stats
            .pi
            .total_cmp(&a.final_stats.pi)
            .then_with(|| a.reference_id.cmp(&b.reference_id))
    });

    rows
}

/// Write report rows as TSV
///
/// # Errors
///
/// Returns an IO error if writing fails.
pub fn write_report_to<W: Write>(
    writer: &mut W,
    read_count: usize,
    rows: &[ReportRow],
) -> std::io::Result<()> {
    writeln!(writer, "Total Number of Aligned Reads:\t{read_count}")?;
    writeln!(writer, "Total Number of Mapped Genomes:\t{}", rows.len())?;
    writeln!(writer, "{}", COLUMNS.join("\t"))?;

    for row in rows {
        let f = &row.final_stats;
        let i = &row.initial_stats;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.reference_id,
            f.pi,
            f.best,
            f.reads,
            f.level_1,
            f.level_2,
            i.pi,
            i.best,
            i.reads,
            i.level_1,
            i.level_2
        )?;
    }

    Ok(())
}

/// Build the report for `result`, write it to `path`, and return its rows.
/// An existing file is overwritten.
///
/// # Errors
///
/// Returns an IO error if the file cannot be created or written.
pub fn write_report(path: &Path, result: &ReassignmentResult) -> std::io::Result<Vec<ReportRow>> {
    let rows = build_report(result);

    let mut writer = BufWriter::new(File::create(path)?);
    write_report_to(&mut writer, result.read_count, &rows)?;
    writer.flush()?;

    Ok(rows)
}

/// Join report rows with coverage and OTU identity, keeping row order.
///
/// References absent from `coverage` get zero coverage and depth.
///
/// # Errors
///
/// Returns `CatalogError::UnknownSequence` if a reference has no owning OTU,
/// or `CatalogError::UnknownOtu` if the OTU has no version.
pub fn build_hits<R: ReferenceResolver>(
    rows: &[ReportRow],
    coverage: &CoverageTable,
    resolver: &R,
) -> Result<Vec<Hit>, CatalogError> {
    rows.iter()
        .map(|row| {
            let otu_id = resolver
                .otu_id_for_sequence(&row.reference_id)
                .ok_or_else(|| CatalogError::UnknownSequence(row.reference_id.clone()))?;
            let version = resolver
                .otu_version(otu_id)
                .ok_or_else(|| CatalogError::UnknownOtu(otu_id.to_string()))?;
            let summary = coverage.get(&row.reference_id).copied().unwrap_or_default();

            Ok(Hit {
                id: row.reference_id.clone(),
                otu: OtuRef {
                    id: otu_id.to_string(),
                    version,
                },
                coverage: summary.coverage,
                depth: summary.depth,
                pi: row.final_stats.pi,
                best_hit_reads: row.final_stats.reads,
                best_hit_score: row.final_stats.best,
                final_stats: row.final_stats.clone(),
                initial_stats: row.initial_stats.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EmConfig;
    use crate::core::types::AlignmentRecord;
    use crate::coverage::CoverageSummary;
    use crate::reassign::reassign_records;
    use std::collections::HashMap;

    struct FixedResolver {
        otus: HashMap<&'static str, &'static str>,
    }

    impl ReferenceResolver for FixedResolver {
        fn otu_id_for_sequence(&self, sequence_id: &str) -> Option<&str> {
            self.otus.get(sequence_id).copied()
        }

        fn otu_version(&self, _otu_id: &str) -> Option<u32> {
            Some(3)
        }

        fn otu_sequences(&self, _otu_id: &str) -> Option<Vec<(&str, &[u8])>> {
            None
        }
    }

    fn result() -> ReassignmentResult {
        let records = vec![
            AlignmentRecord::new("r1", "seq_b", 0, 50, 0.9),
            AlignmentRecord::new("r2", "seq_b", 20, 50, 0.8),
            AlignmentRecord::new("r2", "seq_a", 30, 50, 0.79),
            AlignmentRecord::new("r3", "seq_a", 30, 50, 0.5),
        ];
        reassign_records(&records, &EmConfig::default())
    }

    #[test]
    fn test_rows_ordered_by_final_pi() {
        let rows = build_report(&result());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reference_id, "seq_b");
        assert!(rows[0].final_stats.pi >= rows[1].final_stats.pi);
        assert_eq!(rows[1].final_stats.reads, 1);
    }

    #[test]
    fn test_write_report_layout() {
        let result = result();
        let rows = build_report(&result);
        let mut buffer = Vec::new();
        write_report_to(&mut buffer, result.read_count, &rows).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Total Number of Aligned Reads:\t3");
        assert_eq!(lines[1], "Total Number of Mapped Genomes:\t2");
        assert!(lines[2].starts_with("Genome\tFinal Guess"));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3].split('\t').count(), 11);
    }

    #[test]
    fn test_build_hits_joins_coverage_and_otu() {
        let rows = build_report(&result());
        let mut coverage = CoverageTable::new();
        coverage.insert(
            "seq_b".to_string(),
            CoverageSummary {
                coverage: 0.5,
                depth: 2,
            },
        );

        let resolver = FixedResolver {
            otus: HashMap::from([("seq_a", "otu_1"), ("seq_b", "otu_2")]),
        };
        let hits = build_hits(&rows, &coverage, &resolver).unwrap();

        assert_eq!(hits[0].id, "seq_b");
        assert_eq!(hits[0].otu.id, "otu_2");
        assert_eq!(hits[0].otu.version, 3);
        assert_eq!(hits[0].depth, 2);
        assert_eq!(hits[1].depth, 0);
        assert!((hits[1].coverage).abs() < f64::EPSILON);
    }

    #[test]
    fn test_build_hits_unknown_sequence() {
        let rows = build_report(&result());
        let resolver = FixedResolver {
            otus: HashMap::new(),
        };
        let err = build_hits(&rows, &CoverageTable::new(), &resolver).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownSequence(_)));
    }
}
