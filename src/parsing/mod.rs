//! Parsers and writers for the files exchanged between pipeline stages.
//!
//! This module provides:
//!
//! - **SAM lines** ([`sam`]): Field access, score extraction and the alignment filter
//!   applied to every mapping pass
//! - **VTA files** ([`vta`]): Compact per-alignment records
//! - **FASTA** ([`fasta`]): Isolate reference output and sequence length recovery
//! - **FASTQ** ([`fastq`]): Mapped-read capture for the host pass
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use otu_reassign::parsing::sam::{AlignmentFilter, Filtered, LocalAlignmentScore};
//!
//! let filter = AlignmentFilter::new(Arc::new(LocalAlignmentScore::default())).with_cutoff(0.01);
//!
//! let line = "r1\t0\tNC_001836\t1\t42\t4M\t*\t0\t0\tACGT\tIIII\tAS:i:8";
//! assert!(matches!(filter.classify(line), Filtered::Accept(_)));
//! ```

pub mod fasta;
pub mod fastq;
pub mod sam;
pub mod vta;
