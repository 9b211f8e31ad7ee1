//! Reader and writer for VTA alignment files.
//!
//! A VTA file holds one accepted alignment per line as five comma-separated
//! fields:
//!
//! ```text
//! read_id,reference_id,position,read_length,score
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::core::types::AlignmentRecord;
use crate::parsing::sam::ParseError;
use crate::utils::validation::validate_identifier;

/// Parse one VTA line. `line_number` is 1-based and only used for errors.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if the line does not have five fields
/// or a numeric field cannot be parsed.
pub fn parse_vta_line(line: &str, line_number: usize) -> Result<AlignmentRecord, ParseError> {
    let invalid = |reason: String| ParseError::InvalidFormat {
        line: line_number,
        reason,
    };

    let fields: Vec<&str> = line.trim_end().split(',').collect();
    if fields.len() != 5 {
        return Err(invalid(format!(
            "expected 5 comma-separated fields, found {}",
            fields.len()
        )));
    }

    let position = fields[2]
        .parse()
        .map_err(|_| invalid(format!("invalid position '{}'", fields[2])))?;
    let read_length = fields[3]
        .parse()
        .map_err(|_| invalid(format!("invalid read length '{}'", fields[3])))?;
    let score: f64 = fields[4]
        .parse()
        .map_err(|_| invalid(format!("invalid score '{}'", fields[4])))?;

    if !score.is_finite() {
        return Err(invalid(format!("non-finite score '{}'", fields[4])));
    }

    Ok(AlignmentRecord::new(
        fields[0],
        fields[1],
        position,
        read_length,
        score,
    ))
}

/// Read every record from a VTA file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read or
/// `ParseError::InvalidFormat` for an unparsable line.
pub fn read_vta_file(path: &Path) -> Result<Vec<AlignmentRecord>, ParseError> {
    let file = File::open(path)?;
    read_vta(BufReader::new(file))
}

/// Read every record from a VTA stream, skipping blank lines
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure or `ParseError::InvalidFormat`
/// for an unparsable line.
pub fn read_vta<R: BufRead>(reader: R) -> Result<Vec<AlignmentRecord>, ParseError> {
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_vta_line(&line, i + 1)?);
    }

    Ok(records)
}

/// Buffered VTA record writer
pub struct VtaWriter<W: Write> {
    inner: BufWriter<W>,
    written: usize,
}

impl VtaWriter<File> {
    /// Create (or truncate) a VTA file
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
        let file = self.finish()?;
        file.sync_all()?;
        Ok(written)
    }
}

impl<W: Write> VtaWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            written: 0,
        }
    }

    /// Append one record
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidIdentifier` if an id would break the
    /// comma-separated layout, or `ParseError::Io` on write failure.
    pub fn write_record(&mut self, record: &AlignmentRecord) -> Result<(), ParseError> {
        validate_identifier(&record.read_id)?;
        validate_identifier(&record.reference_id)?;

        writeln!(
            self.inner,
            "{},{},{},{},{}",
            record.read_id, record.reference_id, record.position, record.read_length, record.score
        )?;
        self.written += 1;

        Ok(())
    }

    /// Number of records written so far
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
