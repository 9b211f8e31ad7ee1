//! Core data types for read classification.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`AlignmentRecord`](types::AlignmentRecord): One accepted alignment, the unit of VTA files
//! - [`CandidateSet`](types::CandidateSet), [`HostScoreTable`](types::HostScoreTable),
//!   [`ReferenceLengths`](types::ReferenceLengths): Intermediate tables passed between stages
//! - [`Hit`](hit::Hit): A final per-reference report entry
//! - [`PipelineConfig`](config::PipelineConfig): Run configuration
//!
//! ## Coordinates
//!
//! Aligner output uses 1-based positions. Records store the 0-based leftmost
//! position so an alignment covers `[position, position + read_length)`.

pub mod config;
pub mod hit;
pub mod types;
