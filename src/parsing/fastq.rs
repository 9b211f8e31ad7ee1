//! Capture of mapped reads as FASTQ.
//!
//! The targeted pass keeps every read that produced an accepted alignment so
//! the host pass only has to look at those. Reads are rebuilt from the
//! alignment record itself, restoring the original orientation of
//! reverse-strand alignments.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use noodles::fastq;
use tracing::warn;

use crate::parsing::sam::AcceptedAlignment;

/// Reverse complement a nucleotide sequence in place.
///
/// IUPAC ambiguity codes are complemented; anything unknown is left as is.
pub fn reverse_complement(sequence: &mut [u8]) {
    sequence.reverse();
    for base in sequence.iter_mut() {
        *base = match *base {
            b'A' => b'T',
            b'T' | b'U' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            b'a' => b't',
            b't' | b'u' => b'a',
            b'c' => b'g',
            b'g' => b'c',
            b'R' => b'Y',
            b'Y' => b'R',
            b'K' => b'M',
            b'M' => b'K',
            b'B' => b'V',
            b'V' => b'B',
            b'D' => b'H',
            b'H' => b'D',
            other => other,
        };
    }
}

/// Writes one FASTQ record per mapped read
pub struct MappedReadWriter<W: Write> {
    inner: BufWriter<W>,
    written: usize,
}

impl MappedReadWriter<File> {
    /// Create (or truncate) a FASTQ file
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be created.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }

    /// Flush buffered records and sync the file to disk
    ///
    /// # Errors
    ///
    /// Returns an IO error if flushing or syncing fails.
    pub fn finish_and_sync(self) -> std::io::Result<usize> {
        let written = self.written;
        let file = self
            .inner
            .into_inner()
            .map_err(std::io::IntoInnerError::into_error)?;
        file.sync_all()?;
        Ok(written)
    }
}

impl<W: Write> MappedReadWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            written: 0,
        }
    }

    /// Write the read behind an accepted alignment in sequencing orientation
    ///
    /// # Errors
    ///
    /// Returns an IO error on write failure.
    pub fn write(&mut self, alignment: &AcceptedAlignment) -> std::io::Result<()> {
        let mut sequence = match alignment.sequence.as_str() {
            "*" => Vec::new(),
            seq => seq.as_bytes().to_vec(),
        };
        let mut quality = match alignment.quality.as_str() {
            "*" => Vec::new(),
            qual => qual.as_bytes().to_vec(),
        };

        if sequence.is_empty() {
            warn!(read = %alignment.read_id, "Mapped read has no stored sequence");
        }

        if quality.len() != sequence.len() {
            // Aligners may omit QUAL; fill with the lowest Phred score so the record stays valid
            quality = vec![b'!'; sequence.len()];
        }

        if alignment.reverse {
            reverse_complement(&mut sequence);
            quality.reverse();
        }

        let record = fastq::Record::new(
            fastq::record::Definition::new(alignment.read_id.as_str(), ""),
            sequence,
            quality,
        );

        fastq::io::Writer::new(&mut self.inner).write_record(&record)?;
        self.written += 1;

        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer
    ///
    /// # Errors
    ///
    /// Returns an IO error if the final flush fails.
    pub fn finish(self) -> std::io::Result<W> {
        self.inner.into_inner().map_err(std::io::IntoInnerError::into_error)
    }
}
