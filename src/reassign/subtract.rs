use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::core::types::{AlignmentRecord, HostScoreTable};
use crate::parsing::sam::ParseError;
use crate::parsing::vta::{parse_vta_line, VtaWriter};

/// Whether a record is explained at least as well by the host
#[inline]
fn explained_by_host(record: &AlignmentRecord, host_scores: &HostScoreTable) -> bool {
    host_scores
        .get(&record.read_id)
        .is_some_and(|&host| host >= record.score)
}

/// Rewrite a VTA file in place without records whose read aligned to the
/// host at least as well. Returns the number of distinct reads dropped.
///
/// Survivors are streamed to a temporary file beside `vta_path`, which then
/// replaces the original. A failure part way leaves the original untouched.
///
/// # Errors
///
/// Returns `ParseError` if the file cannot be read, a line is malformed, or the
/// replacement cannot be written.
pub fn subtract(vta_path: &Path, host_scores: &HostScoreTable) -> Result<usize, ParseError> {
    let dir = vta_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(dir)?;

    let reader = BufReader::new(File::open(vta_path)?);
    let mut writer = VtaWriter::new(temp.as_file());
    let mut dropped = HashSet::new();
    let mut total = 0usize;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = parse_vta_line(&line, i + 1)?;
        total += 1;

        if explained_by_host(&record, host_scores) {
            dropped.insert(record.read_id);
        } else {
            writer.write_record(&record)?;
        }
    }

    let kept = writer.written();
    writer.finish()?;
    temp.as_file().sync_all()?;
    temp.persist(vta_path).map_err(std::io::Error::from)?;

    info!(
        "Subtracted {} reads ({} of {} records kept)",
        dropped.len(),
        kept,
        total
    );

    Ok(dropped.len())
}
