use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config::ScoringConfig;
use crate::core::types::AlignmentRecord;
use crate::utils::validation::{validate_identifier, ValidationError};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record format on line {line}: {reason}")]
    InvalidFormat { line: usize, reason: String },

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),
}

/// SAM FLAG bit: segment unmapped
pub const FLAG_UNMAPPED: u16 = 0x4;

/// SAM FLAG bit: sequence is reverse complemented
pub const FLAG_REVERSE: u16 = 0x10;

/// Number of mandatory SAM columns
const MANDATORY_FIELDS: usize = 11;

/// Borrowed view over the tab-separated fields of one SAM alignment line
#[derive(Debug, Clone)]
pub struct SamFields<'a> {
    fields: Vec<&'a str>,
    flag: u16,
}

impl<'a> SamFields<'a> {
    /// Split a SAM line into fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if mandatory columns are missing
    /// or the FLAG column is not an integer.
    pub fn parse(line: &'a str) -> Result<Self, String> {
        let fields: Vec<&str> = line.trim_end_matches(['\n', '\r']).split('\t').collect();

        if fields.len() < MANDATORY_FIELDS {
            return Err(format!(
                "expected at least {MANDATORY_FIELDS} fields, found {}",
                fields.len()
            ));
        }

        let flag = fields[1]
            .parse::<u16>()
            .map_err(|_| format!("invalid FLAG '{}'", fields[1]))?;

        Ok(Self { fields, flag })
    }

    pub fn read_id(&self) -> &'a str {
        self.fields[0]
    }

    pub fn flag(&self) -> u16 {
        self.flag
    }

    pub fn is_unmapped(&self) -> bool {
        self.flag & FLAG_UNMAPPED != 0
    }

    pub fn is_reverse(&self) -> bool {
        self.flag & FLAG_REVERSE != 0
    }

    pub fn reference_id(&self) -> &'a str {
        self.fields[2]
    }

    /// 1-based leftmost mapping position, if parseable
    pub fn position(&self) -> Option<u64> {
        self.fields[3].parse().ok()
    }

    pub fn sequence(&self) -> &'a str {
        self.fields[9]
    }

    pub fn quality(&self) -> &'a str {
        self.fields[10]
    }

    /// Length of SEQ, or 0 when SEQ is absent (`*`)
    pub fn read_length(&self) -> usize {
        match self.sequence() {
            "*" => 0,
            seq => seq.len(),
        }
    }

    /// Value of an optional `TAG:TYPE:VALUE` field
    pub fn tag(&self, tag: &str) -> Option<&'a str> {
        self.fields[MANDATORY_FIELDS..].iter().copied().find_map(|field| {
            let mut parts = field.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(_), Some(value)) if name == tag => Some(value),
                _ => None,
            }
        })
    }
}

/// Computes a per-alignment score from the fields of one aligner record.
///
/// Implementations must be deterministic and must not depend on record order.
/// Returning `None` marks the record as malformed.
pub trait ScoreExtractor: Send + Sync {
    fn score(&self, record: &SamFields<'_>) -> Option<f64>;
}

/// Fraction of the best attainable local alignment score.
///
/// In local mode every matching base earns `match_bonus`, so a perfect
/// alignment of a read of length `L` scores `match_bonus * L`. The extractor
/// returns `AS / (match_bonus * L)` clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct LocalAlignmentScore {
    match_bonus: f64,
}

impl LocalAlignmentScore {
    #[must_use]
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            match_bonus: config.match_bonus,
        }
    }
}

impl Default for LocalAlignmentScore {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl ScoreExtractor for LocalAlignmentScore {
    fn score(&self, record: &SamFields<'_>) -> Option<f64> {
        let alignment_score: i64 = record.tag("AS")?.parse().ok()?;
        let read_length = record.read_length();

        if read_length == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let max_score = self.match_bonus * read_length as f64;
        #[allow(clippy::cast_precision_loss)]
        let score = alignment_score as f64 / max_score;

        Some(score.clamp(0.0, 1.0))
    }
}

/// An aligner record that passed every filter
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedAlignment {
    pub read_id: String,
    pub reference_id: String,
    /// 0-based leftmost position
    pub position: u64,
    pub score: f64,
    pub reverse: bool,
    pub sequence: String,
    pub quality: String,
}

impl AcceptedAlignment {
    pub fn read_length(&self) -> u64 {
        match self.sequence.as_str() {
            "*" => 0,
            seq => seq.len() as u64,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> AlignmentRecord {
        AlignmentRecord::new(
            self.read_id.clone(),
            self.reference_id.clone(),
            self.position,
            self.read_length(),
            self.score,
        )
    }
}

/// Why a line was not accepted
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Empty line
    Blank,
    /// `@` or `#` header line
    Header,
    /// FLAG has the unmapped bit set
    Unmapped,
    /// RNAME is `*`
    NoReference,
    /// Score below the active cutoff
    BelowCutoff(f64),
    /// Line could not be interpreted
    Malformed(String),
}

/// Result of filtering one line
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered {
    Accept(AcceptedAlignment),
    Reject(Rejection),
}

/// Decides which aligner output lines become alignment records
#[derive(Clone)]
pub struct AlignmentFilter {
    extractor: Arc<dyn ScoreExtractor>,
    cutoff: Option<f64>,
}

impl std::fmt::Debug for AlignmentFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentFilter")
            .field("cutoff", &self.cutoff)
            .finish_non_exhaustive()
    }
}

impl AlignmentFilter {
    /// Create a filter without a score cutoff
    pub fn new(extractor: Arc<dyn ScoreExtractor>) -> Self {
        Self {
            extractor,
            cutoff: None,
        }
    }

    /// Reject alignments scoring below `cutoff`
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    /// Classify one line of aligner output
    pub fn classify(&self, line: &str) -> Filtered {
        if line.trim().is_empty() {
            return Filtered::Reject(Rejection::Blank);
        }

        if line.starts_with('@') || line.starts_with('#') {
            return Filtered::Reject(Rejection::Header);
        }

        let fields = match SamFields::parse(line) {
            Ok(fields) => fields,
            Err(reason) => return Filtered::Reject(Rejection::Malformed(reason)),
        };

        if fields.is_unmapped() {
            return Filtered::Reject(Rejection::Unmapped);
        }

        if fields.reference_id() == "*" {
            return Filtered::Reject(Rejection::NoReference);
        }

        // Ids must survive the comma-separated VTA layout
        if let Err(e) = validate_identifier(fields.read_id())
            .and_then(|_| validate_identifier(fields.reference_id()))
        {
            return Filtered::Reject(Rejection::Malformed(e.to_string()));
        }

        let Some(position) = fields.position().filter(|&pos| pos > 0) else {
            return Filtered::Reject(Rejection::Malformed(format!(
                "invalid POS '{}'",
                fields.fields[3]
            )));
        };

        let Some(score) = self.extractor.score(&fields) else {
            return Filtered::Reject(Rejection::Malformed(
                "no alignment score could be extracted".to_string(),
            ));
        };

        if let Some(cutoff) = self.cutoff {
            if score < cutoff {
                return Filtered::Reject(Rejection::BelowCutoff(score));
            }
        }

        Filtered::Accept(AcceptedAlignment {
            read_id: fields.read_id().to_string(),
            reference_id: fields.reference_id().to_string(),
            position: position - 1,
            score,
            reverse: fields.is_reverse(),
            sequence: fields.sequence().to_string(),
            quality: fields.quality().to_string(),
        })
    }
}

/// Per-reason line counts for one mapping pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub accepted: usize,
    pub headers: usize,
    pub unmapped: usize,
    pub no_reference: usize,
    pub below_cutoff: usize,
    pub malformed: usize,
}

impl FilterStats {
    /// Count a filtering outcome, logging malformed lines
    pub fn record(&mut self, outcome: &Filtered, line_number: usize) {
        match outcome {
            Filtered::Accept(_) => self.accepted += 1,
            Filtered::Reject(Rejection::Blank | Rejection::Header) => self.headers += 1,
            Filtered::Reject(Rejection::Unmapped) => self.unmapped += 1,
            Filtered::Reject(Rejection::NoReference) => self.no_reference += 1,
            Filtered::Reject(Rejection::BelowCutoff(_)) => self.below_cutoff += 1,
            Filtered::Reject(Rejection::Malformed(reason)) => {
                warn!(line = line_number, %reason, "Skipping malformed alignment line");
                self.malformed += 1;
            }
        }
    }

    pub fn log(&self, stage: &str) {
        debug!(
            stage,
            accepted = self.accepted,
            headers = self.headers,
            unmapped = self.unmapped,
            no_reference = self.no_reference,
            below_cutoff = self.below_cutoff,
            malformed = self.malformed,
            "Alignment filter summary"
        );
    }
}
