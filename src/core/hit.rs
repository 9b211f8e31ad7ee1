use serde::{Deserialize, Serialize};

/// OTU identity attached to a hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtuRef {
    pub id: String,
    pub version: u32,
}

/// Reassignment statistics for one reference at one stage (initial or final)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitSummary {
    /// Abundance estimate
    pub pi: f64,

    /// Fraction of reads whose best hit is uniquely this reference
    pub best: f64,

    /// Number of reads whose best hit is uniquely this reference
    pub reads: u64,

    /// Fraction of reads whose primary best hit is this reference
    pub level_1: f64,

    /// Fraction of reads where this reference is tied for best
    pub level_2: f64,
}

/// A final report entry for one reference sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Reference sequence id
    pub id: String,

    pub otu: OtuRef,

    /// Fraction of reference positions with non-zero depth, in `[0, 1]`
    pub coverage: f64,

    /// Mean depth, rounded
    pub depth: u64,

    /// Final abundance
    pub pi: f64,

    pub best_hit_reads: u64,

    /// Final best-hit fraction
    pub best_hit_score: f64,

    #[serde(rename = "final")]
    pub final_stats: HitSummary,

    #[serde(rename = "initial")]
    pub initial_stats: HitSummary,
}
