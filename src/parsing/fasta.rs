//! FASTA reading and writing using noodles.
//!
//! The isolate reference written for the reduced index goes through
//! [`write_fasta`]. Sequence lengths can be recovered from any FASTA with
//! [`read_fasta_lengths`], which supports both uncompressed and gzip/bgzip
//! compressed files.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;

use crate::core::types::ReferenceLengths;
use crate::parsing::sam::ParseError;

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub(crate) fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Write `(id, sequence)` pairs as FASTA and return the length of each sequence.
///
/// # Errors
///
/// Returns `ParseError::Io` on write failure or `ParseError::InvalidFormat`
/// if an id is repeated.
pub fn write_fasta<'a, W, I>(writer: &mut W, sequences: I) -> Result<ReferenceLengths, ParseError>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut lengths = ReferenceLengths::new();
    let mut fasta_writer = fasta::io::Writer::new(writer);

    for (i, (id, sequence)) in sequences.into_iter().enumerate() {
        if lengths.insert(id.to_string(), sequence.len() as u64).is_some() {
            return Err(ParseError::InvalidFormat {
                line: i + 1,
                reason: format!("duplicate sequence id '{id}'"),
            });
        }

        let record = fasta::Record::new(
            fasta::record::Definition::new(id, None),
            fasta::record::Sequence::from(sequence.to_vec()),
        );
        fasta_writer.write_record(&record)?;
    }

    Ok(lengths)
}

/// Write a FASTA file and sync it to disk.
///
/// # Errors
///
/// See [`write_fasta`].
pub fn write_fasta_file<'a, I>(path: &Path, sequences: I) -> Result<ReferenceLengths, ParseError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut buffered = BufWriter::new(File::create(path)?);
    let lengths = write_fasta(&mut buffered, sequences)?;

    let file = buffered
        .into_inner()
        .map_err(std::io::IntoInnerError::into_error)?;
    file.sync_all()?;

    Ok(lengths)
}

/// Read sequence lengths from a FASTA file.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, or `ParseError::InvalidFormat` if no sequences are found.
pub fn read_fasta_lengths(path: &Path) -> Result<ReferenceLengths, ParseError> {
    let file = File::open(path)?;

    if is_gzipped(path) {
        let reader = BufReader::new(MultiGzDecoder::new(file));
        read_lengths(&mut fasta::io::Reader::new(reader))
    } else {
        read_lengths(&mut fasta::io::Reader::new(BufReader::new(file)))
    }
}

fn read_lengths<R: BufRead>(reader: &mut fasta::io::Reader<R>) -> Result<ReferenceLengths, ParseError> {
    let mut lengths = ReferenceLengths::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        let name = String::from_utf8_lossy(record.name()).to_string();
        lengths.insert(name, record.sequence().len() as u64);
    }

    if lengths.is_empty() {
        return Err(ParseError::InvalidFormat {
            line: 0,
            reason: "No sequences found in FASTA file".to_string(),
        });
    }

    Ok(lengths)
}
