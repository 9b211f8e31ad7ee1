//! Per-base coverage of reference sequences from retained alignments.
//!
//! Every retained record adds one to each position of
//! `[position, position + read_length)` on its reference, clipped to the
//! reference length. Each reference is then summarized as the fraction of
//! covered positions and the rounded mean depth.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::core::types::{count_to_f64, AlignmentRecord, CoverageArray, ReferenceLengths};
use crate::parsing::sam::ParseError;
use crate::parsing::vta::parse_vta_line;

/// Breadth and depth for one reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CoverageSummary {
    /// Fraction of positions with non-zero depth, rounded to 3 decimals
    pub coverage: f64,

    /// Mean depth over all positions, rounded to the nearest integer (halves to even)
    pub depth: u64,
}

impl CoverageSummary {
    /// Summarize a depth array. An empty array yields zero coverage and depth.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_depths(depths: &[u32]) -> Self {
        if depths.is_empty() {
            return Self::default();
        }

        let length = count_to_f64(depths.len());
        let zeros = depths.iter().filter(|&&d| d == 0).count();
        let total: u64 = depths.iter().map(|&d| u64::from(d)).sum();

        #[allow(clippy::cast_precision_loss)]
        let mean = total as f64 / length;

        Self {
            coverage: round_to(1.0 - count_to_f64(zeros) / length, 3),
            depth: mean.round_ties_even() as u64,
        }
    }
}

/// Coverage summaries keyed by reference id
pub type CoverageTable = BTreeMap<String, CoverageSummary>;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Accumulates depth arrays as records arrive
#[derive(Debug)]
pub struct CoverageAccumulator<'a> {
    lengths: &'a ReferenceLengths,
    arrays: HashMap<String, CoverageArray>,
    skipped: usize,
}

impl<'a> CoverageAccumulator<'a> {
    pub fn new(lengths: &'a ReferenceLengths) -> Self {
        Self {
            lengths,
            arrays: HashMap::new(),
            skipped: 0,
        }
    }

    /// Add one alignment. Records for references without a known length are
    /// skipped and counted.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add(&mut self, record: &AlignmentRecord) {
        let Some(&length) = self.lengths.get(&record.reference_id) else {
            self.skipped += 1;
            return;
        };

        let depths = self
            .arrays
            .entry(record.reference_id.clone())
            .or_insert_with(|| vec![0; length as usize]);

        let span = record.span();
        let start = span.start.min(length) as usize;
        let end = span.end.min(length) as usize;

        for depth in &mut depths[start..end] {
            *depth = depth.saturating_add(1);
        }
    }

    /// Summarize every reference in the length table
    #[must_use]
    pub fn finish(self) -> CoverageTable {
        if self.skipped > 0 {
            warn!(
                "Skipped {} alignments to references with no known length",
                self.skipped
            );
        }

        self.lengths
            .keys()
            .map(|id| {
                let summary = self
                    .arrays
                    .get(id)
                    .map(|depths| CoverageSummary::from_depths(depths))
                    .unwrap_or_default();
                (id.clone(), summary)
            })
            .collect()
    }
}

/// Coverage of every reference in `lengths` from in-memory records
#[must_use]
pub fn coverage_from_records(records: &[AlignmentRecord], lengths: &ReferenceLengths) -> CoverageTable {
    let mut accumulator = CoverageAccumulator::new(lengths);
    for record in records {
        accumulator.add(record);
    }
    accumulator.finish()
}

/// Coverage of every reference in `lengths` from a VTA file, streamed line by line
///
/// # Errors
///
/// Returns `ParseError` if the file cannot be read or a line is malformed.
pub fn calculate_coverage(path: &Path, lengths: &ReferenceLengths) -> Result<CoverageTable, ParseError> {
    let reader = BufReader::new(File::open(path)?);
    let mut accumulator = CoverageAccumulator::new(lengths);

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        accumulator.add(&parse_vta_line(&line, i + 1)?);
    }

    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::vta::VtaWriter;
    use tempfile::TempDir;

    fn lengths(entries: &[(&str, u64)]) -> ReferenceLengths {
        entries.iter().map(|(id, len)| ((*id).to_string(), *len)).collect()
    }

    #[test]
    fn test_summary_from_depths() {
        let summary = CoverageSummary::from_depths(&[0, 1, 2, 3]);
        assert!((summary.coverage - 0.75).abs() < f64::EPSILON);
        assert_eq!(summary.depth, 2);
    }

    #[test]
    fn test_depth_rounds_halves_to_even() {
        assert_eq!(CoverageSummary::from_depths(&[5, 0]).depth, 2);
        assert_eq!(CoverageSummary::from_depths(&[1, 0]).depth, 0);
        assert_eq!(CoverageSummary::from_depths(&[3, 0]).depth, 2);
    }

    #[test]
    fn test_coverage_rounds_to_three_decimals() {
        let summary = CoverageSummary::from_depths(&[1, 0, 0]);
        assert!((summary.coverage - 0.333).abs() < f64::EPSILON);
        assert_eq!(summary.depth, 0);
    }

    #[test]
    fn test_zero_length_reference() {
        let lengths = lengths(&[("OTU3", 0)]);
        let records = vec![AlignmentRecord::new("r1", "OTU3", 0, 50, 0.9)];

        let table = coverage_from_records(&records, &lengths);
        assert_eq!(table["OTU3"], CoverageSummary::default());
    }

    #[test]
    fn test_alignments_clipped_to_reference() {
        let lengths = lengths(&[("OTU1", 100)]);
        let records = vec![
            AlignmentRecord::new("r1", "OTU1", 0, 50, 0.9),
            AlignmentRecord::new("r2", "OTU1", 80, 50, 0.9),
            AlignmentRecord::new("r3", "OTU1", 200, 50, 0.9),
        ];

        let summary = coverage_from_records(&records, &lengths)["OTU1"];
        assert!((summary.coverage - 0.7).abs() < f64::EPSILON);
        assert!((0.0..=1.0).contains(&summary.coverage));
        assert_eq!(summary.depth, 1);
    }

    #[test]
    fn test_missing_references() {
        let lengths = lengths(&[("OTU1", 10), ("OTU2", 10)]);
        let records = vec![
            AlignmentRecord::new("r1", "OTU1", 0, 10, 0.9),
            AlignmentRecord::new("r2", "unknown", 0, 10, 0.9),
        ];

        let table = coverage_from_records(&records, &lengths);
        assert_eq!(table.len(), 2);
        assert!((table["OTU1"].coverage - 1.0).abs() < f64::EPSILON);
        assert_eq!(table["OTU2"], CoverageSummary::default());
    }

    #[test]
    fn test_calculate_coverage_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reassigned.vta");

        let mut writer = VtaWriter::create(&path).unwrap();
        writer
            .write_record(&AlignmentRecord::new("r1", "OTU1", 5, 5, 0.9))
            .unwrap();
        writer.finish_and_sync().unwrap();

        let table = calculate_coverage(&path, &lengths(&[("OTU1", 10)])).unwrap();
        assert!((table["OTU1"].coverage - 0.5).abs() < f64::EPSILON);
        assert_eq!(table["OTU1"].depth, 0);
    }
}
