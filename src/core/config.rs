//! Run configuration.
//!
//! Every knob has a default matching the standard workflow. A configuration can be
//! loaded from a JSON file, where missing keys fall back to these defaults:
//!
//! ```json
//! {
//!   "score_cutoff": 0.01,
//!   "max_alignments": 100,
//!   "em": { "max_iterations": 30, "tolerance": 1e-7 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::validation::{
    validate_iterations, validate_positive, validate_unit_interval, ValidationError,
};

/// Minimum score for an alignment to be accepted by the mapping passes
pub const DEFAULT_SCORE_CUTOFF: f64 = 0.01;

/// Maximum alignments reported per read by the targeted pass
pub const DEFAULT_MAX_ALIGNMENTS: u32 = 100;

/// Default EM iteration bound
pub const DEFAULT_MAX_ITERATIONS: usize = 30;

/// Default EM convergence tolerance (L1 change of the abundance vector)
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {source}")]
    Invalid {
        field: &'static str,
        source: ValidationError,
    },
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Alignments scoring below this are discarded
    pub score_cutoff: f64,

    /// `-k` value for the targeted isolate pass
    pub max_alignments: u32,

    /// Threads handed to the aligner
    pub threads: usize,

    pub aligner: AlignerSettings,

    pub scoring: ScoringConfig,

    pub em: EmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            score_cutoff: DEFAULT_SCORE_CUTOFF,
            max_alignments: DEFAULT_MAX_ALIGNMENTS,
            threads: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            aligner: AlignerSettings::default(),
            scoring: ScoringConfig::default(),
            em: EmConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::ParseError` for invalid JSON, or `ConfigError::Invalid`
    /// if a value is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` for invalid JSON or
    /// `ConfigError::Invalid` if a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check that every value is in range
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field| move |source| ConfigError::Invalid { field, source };

        validate_unit_interval(self.score_cutoff).map_err(invalid("score_cutoff"))?;
        validate_iterations(self.max_alignments as usize).map_err(invalid("max_alignments"))?;
        validate_iterations(self.threads).map_err(invalid("threads"))?;
        validate_positive(self.scoring.match_bonus).map_err(invalid("scoring.match_bonus"))?;
        validate_iterations(self.em.max_iterations).map_err(invalid("em.max_iterations"))?;
        validate_positive(self.em.tolerance).map_err(invalid("em.tolerance"))?;

        Ok(())
    }
}

/// Aligner executables and the scoring flags shared by every mapping pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerSettings {
    pub executable: PathBuf,
    pub build_executable: PathBuf,

    /// `--score-min` function (local mode)
    pub score_min: String,

    /// `-N`: mismatches allowed in a seed
    pub seed_mismatches: u8,

    /// `-L`: seed length
    pub seed_length: u8,
}

impl Default for AlignerSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("bowtie2"),
            build_executable: PathBuf::from("bowtie2-build"),
            score_min: "L,20,1.0".to_string(),
            seed_mismatches: 0,
            seed_length: 15,
        }
    }
}

/// Parameters of the default alignment score extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Local-mode bonus per matching base (bowtie2 `--ma`)
    pub match_bonus: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { match_bonus: 2.0 }
    }
}

/// Reassignment iteration controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmConfig {
    /// Hard iteration bound; reaching it is not an error
    pub max_iterations: usize,

    /// Stop once the summed absolute change of the abundance vector is at or below this
    pub tolerance: f64,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}
