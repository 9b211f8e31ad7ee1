use std::collections::HashSet;

use tracing::info;

use crate::aligner::{Aligner, MapRequest};
use crate::parsing::fastq::MappedReadWriter;
use crate::parsing::sam::{AlignmentFilter, FilterStats};
use crate::parsing::vta::VtaWriter;
use crate::pipeline::{PipelineError, WorkPaths};

/// Counts from the targeted pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetedOutput {
    /// Alignment records written to the VTA file
    pub records: usize,

    /// Distinct reads written to the mapped-read FASTQ
    pub mapped_reads: usize,
}

/// Map reads against the isolate index, allowing several alignments per read.
///
/// Every accepted alignment goes to `to_isolates.vta`. The first accepted
/// alignment of each read also puts the read in `mapped.fastq` for the host
/// pass. Both files are synced before returning.
///
/// # Errors
///
/// Returns `PipelineError` if the mapping run fails or an output cannot be written.
pub async fn map_isolates<A: Aligner>(
    aligner: &A,
    filter: &AlignmentFilter,
    request: &MapRequest,
    paths: &WorkPaths,
) -> Result<TargetedOutput, PipelineError> {
    info!("Mapping reads to isolate index {}", request.index.display());

    let mut stream = aligner.map(request)?;
    let mut stats = FilterStats::default();
    let mut vta = VtaWriter::create(&paths.isolate_vta)?;
    let mut fastq = MappedReadWriter::create(&paths.mapped_fastq)?;
    let mut seen: HashSet<String> = HashSet::new();

    while let Some(alignment) = stream.next_accepted(filter, &mut stats).await? {
        vta.write_record(&alignment.to_record())?;

        if !seen.contains(&alignment.read_id) {
            fastq.write(&alignment)?;
            seen.insert(alignment.read_id);
        }
    }
    stream.finish().await?;
    stats.log("isolates");

    // Per-record writes are buffered; only the final flush and fsync go off-thread
    let (records, mapped_reads) =
        tokio::task::spawn_blocking(move || -> std::io::Result<(usize, usize)> {
            Ok((vta.finish_and_sync()?, fastq.finish_and_sync()?))
        })
        .await??;
    let output = TargetedOutput {
        records,
        mapped_reads,
    };

    info!(
        "Wrote {} isolate alignments for {} reads",
        output.records, output.mapped_reads
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Arc;

    use crate::aligner::{AlignerError, AlignmentStream, MapMode};
    use crate::core::config::ScoringConfig;
    use crate::parsing::sam::LocalAlignmentScore;
    use crate::parsing::vta::read_vta_file;

    struct FixedOutput(String);

    impl Aligner for FixedOutput {
        async fn build_index(&self, _fasta: &Path, _prefix: &Path) -> Result<(), AlignerError> {
            Ok(())
        }

        fn map(&self, _request: &MapRequest) -> Result<AlignmentStream, AlignerError> {
            Ok(AlignmentStream::from_reader(
                "fixed",
                Cursor::new(self.0.clone().into_bytes()),
            ))
        }
    }

    fn sam(read: &str, reference: &str, alignment_score: u32) -> String {
        format!(
            "{read}\t0\t{reference}\t1\t42\t4M\t*\t0\t0\tACGT\tIIII\tAS:i:{alignment_score}\n"
        )
    }

    #[tokio::test]
    async fn test_map_isolates_writes_every_alignment_and_each_read_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = WorkPaths::new(dir.path());
        paths.create().unwrap();

        let output = format!(
            "@HD\tVN:1.6\n{}{}{}",
            sam("r1", "seq1", 8),
            sam("r1", "seq2", 6),
            sam("r2", "seq2", 8)
        );
        let filter = AlignmentFilter::new(Arc::new(LocalAlignmentScore::new(
            &ScoringConfig::default(),
        )))
        .with_cutoff(0.01);
        let request = MapRequest {
            index: paths.isolate_index.clone(),
            reads: vec![dir.path().join("reads.fq")],
            mode: MapMode::Isolates { max_alignments: 10 },
        };

        let counts = map_isolates(&FixedOutput(output), &filter, &request, &paths)
            .await
            .unwrap();

        assert_eq!(counts.records, 3);
        assert_eq!(counts.mapped_reads, 2);
        assert_eq!(read_vta_file(&paths.isolate_vta).unwrap().len(), 3);
        let fastq = std::fs::read_to_string(&paths.mapped_fastq).unwrap();
        assert_eq!(fastq.lines().filter(|l| l.starts_with("@r")).count(), 2);
    }
}
