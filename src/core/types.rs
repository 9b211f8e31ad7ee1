use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// A single accepted alignment of a read against a reference sequence.
///
/// This is the record persisted one-per-line in VTA files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    /// Read name (QNAME)
    pub read_id: String,

    /// Reference sequence id (RNAME)
    pub reference_id: String,

    /// 0-based leftmost reference position of the alignment
    pub position: u64,

    /// Length of the aligned read sequence
    pub read_length: u64,

    /// Score produced by the active score extractor
    pub score: f64,
}

impl AlignmentRecord {
    pub fn new(
        read_id: impl Into<String>,
        reference_id: impl Into<String>,
        position: u64,
        read_length: u64,
        score: f64,
    ) -> Self {
        Self {
            read_id: read_id.into(),
            reference_id: reference_id.into(),
            position,
            read_length,
            score,
        }
    }

    /// Half-open reference interval covered by this alignment
    #[must_use]
    pub fn span(&self) -> std::ops::Range<u64> {
        self.position..self.position.saturating_add(self.read_length)
    }
}

/// Distinct reference ids that received an accepted first-pass alignment.
///
/// Ordered so that downstream iteration is deterministic.
pub type CandidateSet = BTreeSet<String>;

/// Best host alignment score per read id
pub type HostScoreTable = HashMap<String, f64>;

/// Sequence length per reference id
pub type ReferenceLengths = BTreeMap<String, u64>;

/// Per-position depth counts for one reference
pub type CoverageArray = Vec<u32>;

/// Safely convert a count to f64 for fraction calculations
#[inline]
pub(crate) fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_is_half_open() {
        let record = AlignmentRecord::new("r1", "NC_001", 10, 5, 0.9);
        assert_eq!(record.span(), 10..15);
        assert!(!record.span().contains(&15));
    }
}
