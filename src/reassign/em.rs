//! Expectation-maximization over ambiguous read assignments.
//!
//! Each read distributes one unit of support over its candidate references.
//! A read's responsibility for reference `r` is proportional to
//! `score(read, r) * pi[r]`; `pi[r]` is then the share of all responsibility
//! held by `r`. Reads with a single candidate always give it full support and
//! are left out of the iteration.

use tracing::{debug, warn};

use crate::core::config::EmConfig;
use crate::core::types::count_to_f64;
use crate::reassign::matrix::{Candidate, ReadMatrix};

/// Relative difference under which two values count as tied
pub const TIE_TOLERANCE: f64 = 1e-12;

/// Whether `value` ties `max`
#[inline]
pub fn is_tied(value: f64, max: f64) -> bool {
    (max - value).abs() <= TIE_TOLERANCE * max.abs().max(1.0)
}

/// Output of an EM run
#[derive(Debug, Clone)]
pub struct EmOutcome {
    /// Abundance before the first iteration
    pub init_pi: Vec<f64>,

    /// Abundance after the last iteration
    pub pi: Vec<f64>,

    /// Score-proportional responsibilities per read, before iterating
    pub initial_responsibilities: Vec<Vec<f64>>,

    /// Responsibilities per read from the last E-step
    pub responsibilities: Vec<Vec<f64>>,

    pub iterations: usize,

    /// False when the iteration bound was hit before the tolerance was met
    pub converged: bool,
}

/// Each reference's share of best-scoring reads.
///
/// A read whose best score is tied between `k` references gives `1/k` to each.
pub fn initial_abundance(matrix: &ReadMatrix) -> Vec<f64> {
    let mut shares = vec![0.0; matrix.reference_count()];

    for candidates in &matrix.reads {
        let best = max_score(candidates);
        let tied: Vec<&Candidate> = candidates.iter().filter(|c| is_tied(c.score, best)).collect();
        let share = 1.0 / count_to_f64(tied.len());
        for candidate in tied {
            shares[candidate.reference] += share;
        }
    }

    normalize(&mut shares, count_to_f64(matrix.read_count()));
    shares
}

/// Responsibilities proportional to score alone, uniform when every score is zero
pub fn score_responsibilities(candidates: &[Candidate]) -> Vec<f64> {
    let total: f64 = candidates.iter().map(|c| c.score).sum();

    if total > 0.0 && total.is_finite() {
        candidates.iter().map(|c| c.score / total).collect()
    } else {
        vec![1.0 / count_to_f64(candidates.len()); candidates.len()]
    }
}

/// Run EM to convergence or to the iteration bound, whichever comes first
pub fn run_em(matrix: &ReadMatrix, config: &EmConfig) -> EmOutcome {
    let reference_count = matrix.reference_count();
    let read_total = count_to_f64(matrix.read_count());

    let init_pi = initial_abundance(matrix);
    let initial_responsibilities: Vec<Vec<f64>> = matrix
        .reads
        .iter()
        .map(|c| score_responsibilities(c))
        .collect();

    let mut unique_support = vec![0.0; reference_count];
    for candidate in matrix.unique_reads() {
        unique_support[candidate.reference] += 1.0;
    }

    let ambiguous = matrix.ambiguous_reads();
    let mut responsibilities = initial_responsibilities.clone();
    let mut pi = init_pi.clone();
    let mut iterations = 0;
    let mut converged = ambiguous.is_empty();

    while !converged && iterations < config.max_iterations {
        iterations += 1;

        // E-step
        let mut support = unique_support.clone();
        for &read in &ambiguous {
            let candidates = &matrix.reads[read];
            let weights = expected_responsibilities(candidates, &pi);

            for (candidate, weight) in candidates.iter().zip(&weights) {
                support[candidate.reference] += weight;
            }
            responsibilities[read] = weights;
        }

        // M-step
        normalize(&mut support, read_total);

        let delta: f64 = support.iter().zip(&pi).map(|(new, old)| (new - old).abs()).sum();
        pi = support;

        debug!(iteration = iterations, delta, "EM iteration");

        if delta <= config.tolerance {
            converged = true;
        }
    }

    if !converged {
        warn!(
            iterations,
            tolerance = config.tolerance,
            "Reassignment stopped at the iteration bound before converging"
        );
    }

    EmOutcome {
        init_pi,
        pi,
        initial_responsibilities,
        responsibilities,
        iterations,
        converged,
    }
}

/// E-step for one read. Falls back to score-proportional weights when every
/// candidate's abundance has collapsed to zero, so the read still adds one unit.
fn expected_responsibilities(candidates: &[Candidate], pi: &[f64]) -> Vec<f64> {
    let weights: Vec<f64> = candidates.iter().map(|c| c.score * pi[c.reference]).collect();
    let total: f64 = weights.iter().sum();

    if total > 0.0 && total.is_finite() {
        weights.into_iter().map(|w| w / total).collect()
    } else {
        score_responsibilities(candidates)
    }
}

fn max_score(candidates: &[Candidate]) -> f64 {
    candidates
        .iter()
        .map(|c| c.score)
        .fold(f64::NEG_INFINITY, f64::max)
}

fn normalize(values: &mut [f64], total: f64) {
    if total > 0.0 {
        for value in values.iter_mut() {
            *value /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AlignmentRecord;

    fn matrix(records: &[(&str, &str, f64)]) -> ReadMatrix {
        let records: Vec<AlignmentRecord> = records
            .iter()
            .map(|(read, reference, score)| AlignmentRecord::new(*read, *reference, 0, 10, *score))
            .collect();
        ReadMatrix::build(&records)
    }

    fn assert_simplex(pi: &[f64]) {
        assert!(pi.iter().all(|&p| p >= 0.0));
        assert!((pi.iter().sum::<f64>() - 1.0).abs() < 1e-9, "sum was {}", pi.iter().sum::<f64>());
    }

    #[test]
    fn test_initial_abundance_splits_ties() {
        let m = matrix(&[
            ("r1", "A", 0.9),
            ("r2", "A", 0.5),
            ("r2", "B", 0.5),
        ]);
        let init = initial_abundance(&m);
        assert!((init[0] - 0.75).abs() < 1e-12);
        assert!((init[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_em_favours_supported_reference() {
        let m = matrix(&[
            ("r1", "OTU1", 0.9),
            ("r2", "OTU1", 0.8),
            ("r2", "OTU2", 0.79),
        ]);

        let outcome = run_em(&m, &EmConfig::default());
        assert_simplex(&outcome.pi);
        assert!(outcome.converged);

        let r2 = &outcome.responsibilities[0];
        assert!(r2[0] > r2[1]);
        assert!(outcome.pi[0] > outcome.pi[1]);
    }

    #[test]
    fn test_unique_reads_only_converges_immediately() {
        let m = matrix(&[("r1", "A", 0.9), ("r2", "B", 0.4), ("r3", "B", 0.2)]);
        let outcome = run_em(&m, &EmConfig::default());

        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 0);
        assert!((outcome.pi[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((outcome.pi[1] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(outcome.responsibilities[0], vec![1.0]);
    }

    #[test]
    fn test_iteration_bound_is_not_an_error() {
        let m = matrix(&[
            ("r1", "A", 0.9),
            ("r2", "A", 0.6),
            ("r2", "B", 0.6),
            ("r3", "B", 0.3),
            ("r3", "C", 0.31),
        ]);

        let config = EmConfig {
            max_iterations: 1,
            tolerance: 1e-15,
        };
        let outcome = run_em(&m, &config);

        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 1);
        assert_simplex(&outcome.pi);
    }

    #[test]
    fn test_zero_scores_still_form_simplex() {
        let m = matrix(&[("r1", "A", 0.0), ("r1", "B", 0.0), ("r2", "A", 0.0)]);
        let outcome = run_em(&m, &EmConfig::default());
        assert_simplex(&outcome.pi);
        assert_simplex(&outcome.init_pi);
    }

    #[test]
    fn test_is_tied() {
        assert!(is_tied(0.5, 0.5));
        assert!(is_tied(0.1 + 0.2, 0.3));
        assert!(!is_tied(0.4999, 0.5));
    }
}
