use crate::core::types::count_to_f64;
use crate::reassign::em::is_tied;
use crate::reassign::matrix::ReadMatrix;

/// Per-reference best-hit read counts for one set of responsibilities.
///
/// - `best_hit`: reads whose maximum responsibility is at this reference alone
/// - `level_1`: reads whose primary best is this reference, ties going to the
///   lexicographically first reference
/// - `level_2`: reads where this reference is tied for the maximum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitStatistics {
    pub best_hit_reads: Vec<u64>,
    pub level_1_reads: Vec<u64>,
    pub level_2_reads: Vec<u64>,
    read_count: usize,
}

impl HitStatistics {
    /// Tally statistics from per-read responsibilities aligned with `matrix.reads`
    #[must_use]
    pub fn compute(matrix: &ReadMatrix, responsibilities: &[Vec<f64>]) -> Self {
        let n = matrix.reference_count();
        let mut stats = Self {
            best_hit_reads: vec![0; n],
            level_1_reads: vec![0; n],
            level_2_reads: vec![0; n],
            read_count: matrix.read_count(),
        };

        for (candidates, weights) in matrix.reads.iter().zip(responsibilities) {
            let best = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let tied: Vec<usize> = candidates
                .iter()
                .zip(weights)
                .filter(|(_, w)| is_tied(**w, best))
                .map(|(c, _)| c.reference)
                .collect();

            // Candidates are sorted by reference index, which is lexicographic order
            let Some(&primary) = tied.first() else {
                continue;
            };

            if tied.len() == 1 {
                stats.best_hit_reads[primary] += 1;
            }
            stats.level_1_reads[primary] += 1;
            for reference in tied {
                stats.level_2_reads[reference] += 1;
            }
        }

        stats
    }

    pub fn read_count(&self) -> usize {
        self.read_count
    }

    /// Fraction of reads that are a unique best hit for `reference`
    pub fn best_hit(&self, reference: usize) -> f64 {
        self.fraction(self.best_hit_reads[reference])
    }

    pub fn level_1(&self, reference: usize) -> f64 {
        self.fraction(self.level_1_reads[reference])
    }

    pub fn level_2(&self, reference: usize) -> f64 {
        self.fraction(self.level_2_reads[reference])
    }

    #[allow(clippy::cast_precision_loss)]
    fn fraction(&self, count: u64) -> f64 {
        if self.read_count == 0 {
            0.0
        } else {
            count as f64 / count_to_f64(self.read_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AlignmentRecord;

    fn build(records: &[(&str, &str, f64)]) -> ReadMatrix {
        let records: Vec<AlignmentRecord> = records
            .iter()
            .map(|(read, reference, score)| AlignmentRecord::new(*read, *reference, 0, 10, *score))
            .collect();
        ReadMatrix::build(&records)
    }

    #[test]
    fn test_unique_reads_count_everywhere() {
        let matrix = build(&[("r1", "A", 0.9)]);
        let stats = HitStatistics::compute(&matrix, &[vec![1.0]]);

        assert_eq!(stats.best_hit_reads, vec![1]);
        assert_eq!(stats.level_1_reads, vec![1]);
        assert_eq!(stats.level_2_reads, vec![1]);
        assert!((stats.best_hit(0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_three_way_tie() {
        let matrix = build(&[("r1", "C", 0.5), ("r1", "A", 0.5), ("r1", "B", 0.5)]);
        let third = 1.0 / 3.0;
        let stats = HitStatistics::compute(&matrix, &[vec![third, third, third]]);

        assert_eq!(stats.best_hit_reads, vec![0, 0, 0]);
        // Lexicographically first reference takes level 1
        assert_eq!(stats.level_1_reads, vec![1, 0, 0]);
        assert_eq!(stats.level_2_reads, vec![1, 1, 1]);
    }

    #[test]
    fn test_fractions_over_all_reads() {
        let matrix = build(&[
            ("r1", "A", 0.9),
            ("r2", "A", 0.8),
            ("r2", "B", 0.2),
            ("r3", "B", 0.7),
            ("r4", "B", 0.7),
        ]);
        let stats = HitStatistics::compute(
            &matrix,
            &[vec![1.0], vec![0.8, 0.2], vec![1.0], vec![1.0]],
        );

        assert_eq!(stats.read_count(), 4);
        assert!((stats.best_hit(0) - 0.5).abs() < 1e-12);
        assert!((stats.level_2(1) - 0.5).abs() < 1e-12);
        assert!((stats.level_1(1) - 0.5).abs() < 1e-12);
    }
}
