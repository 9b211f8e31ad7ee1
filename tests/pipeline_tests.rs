//! End-to-end pipeline tests.
//!
//! A scripted aligner replays fixed SAM output for each mapping mode, so every
//! stage after the aligner runs for real against a temporary working directory.

use std::io::Cursor;
use std::path::Path;

use otu_reassign::aligner::AlignerError;
use otu_reassign::parsing::vta::read_vta_file;
use otu_reassign::{
    Aligner, AlignmentStream, MapMode, MapRequest, OtuCatalog, Pipeline, PipelineConfig,
    PipelineError, RunInputs,
};
use tempfile::TempDir;

const READ_LENGTH: usize = 50;

struct ScriptedAligner {
    discovery: String,
    isolates: String,
    host: String,
}

impl ScriptedAligner {
    fn new(discovery: &[String], isolates: &[String], host: &[String]) -> Self {
        let script = |lines: &[String]| {
            let mut text = String::from("@HD\tVN:1.6\tSO:unsorted\n");
            for line in lines {
                text.push_str(line);
                text.push('\n');
            }
            text
        };

        Self {
            discovery: script(discovery),
            isolates: script(isolates),
            host: script(host),
        }
    }
}

impl Aligner for ScriptedAligner {
    async fn build_index(&self, fasta: &Path, _prefix: &Path) -> Result<(), AlignerError> {
        assert!(fasta.exists(), "index built before FASTA was written");
        Ok(())
    }

    fn map(&self, request: &MapRequest) -> Result<AlignmentStream, AlignerError> {
        let output = match request.mode {
            MapMode::Discovery => &self.discovery,
            MapMode::Isolates { .. } => &self.isolates,
            MapMode::Host => &self.host,
        };
        Ok(AlignmentStream::from_reader(
            "scripted",
            Cursor::new(output.clone().into_bytes()),
        ))
    }
}

/// A SAM record for a 50bp read whose normalized local score is `score`
fn sam(read: &str, flag: u16, reference: &str, pos: u64, score: f64) -> String {
    let sequence = "ACGT".repeat(13)[..READ_LENGTH].to_string();
    let quality = "I".repeat(READ_LENGTH);
    #[allow(clippy::cast_possible_truncation)]
    let alignment_score = (score * 2.0 * READ_LENGTH as f64).round() as i64;
    format!("{read}\t{flag}\t{reference}\t{pos}\t42\t50M\t*\t0\t0\t{sequence}\t{quality}\tAS:i:{alignment_score}")
}

fn unmapped(read: &str) -> String {
    let sequence = "A".repeat(READ_LENGTH);
    let quality = "I".repeat(READ_LENGTH);
    format!("{read}\t4\t*\t0\t0\t*\t*\t0\t0\t{sequence}\t{quality}\tYT:Z:UU")
}

fn catalog() -> OtuCatalog {
    let seq = "ACGT".repeat(50);
    let json = format!(
        r#"{{
            "otus": [
                {{"id": "otu_a", "name": "Virus A", "version": 4, "isolates": [
                    {{"id": "iso_a1", "default": true, "sequences": [{{"id": "seq1", "sequence": "{seq}"}}]}},
                    {{"id": "iso_a2", "sequences": [{{"id": "seq1b", "sequence": "{seq}"}}]}}
                ]}},
                {{"id": "otu_b", "name": "Virus B", "version": 1, "isolates": [
                    {{"id": "iso_b1", "sequences": [{{"id": "seq2", "sequence": "{seq}"}}]}}
                ]}},
                {{"id": "otu_c", "name": "Virus C", "version": 7, "isolates": [
                    {{"id": "iso_c1", "sequences": [{{"id": "seq3", "sequence": "{seq}"}}]}}
                ]}}
            ]
        }}"#
    );
    OtuCatalog::from_json(&json).unwrap()
}

fn inputs(dir: &TempDir) -> RunInputs {
    RunInputs {
        reads: vec![dir.path().join("reads.fq")],
        reference_index: dir.path().join("reference"),
        host_index: dir.path().join("host"),
        work_dir: dir.path().join("work"),
    }
}

fn scenario_a() -> ScriptedAligner {
    ScriptedAligner::new(
        &[
            sam("r1", 0, "seq1", 1, 0.9),
            sam("r2", 0, "seq2", 31, 0.79),
            unmapped("r9"),
        ],
        &[
            sam("r1", 0, "seq1", 1, 0.9),
            sam("r2", 0, "seq1", 21, 0.8),
            sam("r2", 256, "seq2", 31, 0.79),
        ],
        &[],
    )
}

#[tokio::test]
async fn test_scenario_a_ambiguous_read_favours_supported_reference() {
    let dir = TempDir::new().unwrap();
    let inputs = inputs(&dir);
    let catalog = catalog();
    let config = PipelineConfig::default();
    let aligner = scenario_a();

    let results = Pipeline::new(&aligner, &catalog, &config)
        .run(&inputs)
        .await
        .unwrap();

    assert_eq!(results.read_count, 2);
    assert_eq!(results.subtracted_count, 0);
    assert!(results.converged);
    assert_eq!(results.hits.len(), 2);

    let seq1 = &results.hits[0];
    let seq2 = &results.hits[1];
    assert_eq!(seq1.id, "seq1");
    assert_eq!(seq1.otu.id, "otu_a");
    assert_eq!(seq1.otu.version, 4);
    assert_eq!(seq2.otu.id, "otu_b");
    assert!(seq1.pi > seq2.pi);
    assert!(seq1.final_stats.reads >= 1);
    assert!((seq1.pi + seq2.pi - 1.0).abs() < 1e-9);

    // r1 covers [0, 50) and r2 was retained on seq1 at [20, 70)
    assert!((seq1.coverage - 0.35).abs() < 1e-9);
    assert!((seq2.coverage).abs() < 1e-9);
    assert_eq!(seq2.depth, 0);

    let isolate_dir = inputs.work_dir.join("isolates");
    let fasta = std::fs::read_to_string(isolate_dir.join("isolate_index.fa")).unwrap();
    assert!(fasta.contains(">seq1b"));
    assert!(!fasta.contains(">seq3"));

    let targeted = read_vta_file(&isolate_dir.join("to_isolates.vta")).unwrap();
    assert_eq!(targeted.len(), 3);

    let reassigned = read_vta_file(&isolate_dir.join("reassigned.vta")).unwrap();
    assert_eq!(reassigned.len(), 2);
    assert!(reassigned.iter().all(|r| r.reference_id == "seq1"));

    let fastq = std::fs::read_to_string(isolate_dir.join("mapped.fastq")).unwrap();
    assert_eq!(fastq.lines().filter(|l| l.starts_with('@')).count(), 2);

    let report = std::fs::read_to_string(isolate_dir.join("report.tsv")).unwrap();
    assert!(report.starts_with("Total Number of Aligned Reads:\t2\n"));
}

#[tokio::test]
async fn test_scenario_b_host_read_is_subtracted() {
    let dir = TempDir::new().unwrap();
    let inputs = inputs(&dir);
    let catalog = catalog();
    let config = PipelineConfig::default();
    let aligner = ScriptedAligner::new(
        &[sam("r1", 0, "seq1", 1, 0.9), sam("r3", 0, "seq1", 1, 0.5)],
        &[
            sam("r1", 0, "seq1", 1, 0.9),
            sam("r3", 0, "seq1", 101, 0.5),
        ],
        &[sam("r3", 0, "chr1", 1000, 0.6), sam("r1", 0, "chr2", 10, 0.2)],
    );

    let results = Pipeline::new(&aligner, &catalog, &config)
        .run(&inputs)
        .await
        .unwrap();

    assert_eq!(results.subtracted_count, 1);
    assert_eq!(results.read_count, 1);
    assert_eq!(results.hits.len(), 1);
    assert_eq!(results.hits[0].final_stats.reads, 1);

    let isolate_dir = inputs.work_dir.join("isolates");
    let remaining = read_vta_file(&isolate_dir.join("to_isolates.vta")).unwrap();
    assert!(remaining.iter().all(|r| r.read_id != "r3"));

    // r3 started at 100; with it gone only [0, 50) is covered
    assert!((results.hits[0].coverage - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn test_scenario_d_iteration_bound_still_returns_simplex() {
    let dir = TempDir::new().unwrap();
    let inputs = inputs(&dir);
    let catalog = catalog();
    let mut config = PipelineConfig::default();
    config.em.max_iterations = 1;
    config.em.tolerance = 1e-15;

    let aligner = ScriptedAligner::new(
        &[
            sam("r1", 0, "seq1", 1, 0.9),
            sam("r2", 0, "seq2", 1, 0.6),
            sam("r3", 0, "seq3", 1, 0.31),
        ],
        &[
            sam("r1", 0, "seq1", 1, 0.9),
            sam("r2", 0, "seq1", 1, 0.6),
            sam("r2", 256, "seq2", 1, 0.6),
            sam("r3", 0, "seq2", 1, 0.3),
            sam("r3", 256, "seq3", 1, 0.31),
        ],
        &[],
    );

    let results = Pipeline::new(&aligner, &catalog, &config)
        .run(&inputs)
        .await
        .unwrap();

    assert!(!results.converged);
    assert_eq!(results.iterations, 1);

    let total: f64 = results.hits.iter().map(|h| h.pi).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(results.hits.iter().all(|h| h.pi >= 0.0));
}

#[tokio::test]
async fn test_no_candidates_is_fatal() {
    let dir = TempDir::new().unwrap();
    let inputs = inputs(&dir);
    let catalog = catalog();
    let config = PipelineConfig::default();
    let aligner = ScriptedAligner::new(&[unmapped("r1"), unmapped("r2")], &[], &[]);

    let err = Pipeline::new(&aligner, &catalog, &config)
        .run(&inputs)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoCandidates));
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let inputs = inputs(&dir);
    let catalog = catalog();
    let config = PipelineConfig::default();
    let aligner = ScriptedAligner::new(
        &["garbage".to_string(), sam("r1", 0, "seq1", 1, 0.9)],
        &[
            sam("r1", 0, "seq1", 1, 0.9),
            "r2\tnot_a_flag\tseq1".to_string(),
        ],
        &[],
    );

    let results = Pipeline::new(&aligner, &catalog, &config)
        .run(&inputs)
        .await
        .unwrap();

    assert_eq!(results.read_count, 1);
    assert_eq!(results.hits.len(), 1);
}

#[tokio::test]
async fn test_read_id_with_comma_is_skipped() {
    let dir = TempDir::new().unwrap();
    let inputs = inputs(&dir);
    let catalog = catalog();
    let config = PipelineConfig::default();
    let aligner = ScriptedAligner::new(
        &[sam("r1", 0, "seq1", 1, 0.9)],
        &[
            sam("r1", 0, "seq1", 1, 0.9),
            sam("weird,read", 0, "seq1", 11, 0.8),
        ],
        &[],
    );

    let results = Pipeline::new(&aligner, &catalog, &config)
        .run(&inputs)
        .await
        .unwrap();

    assert_eq!(results.read_count, 1);
    assert_eq!(results.hits.len(), 1);

    let targeted = read_vta_file(&inputs.work_dir.join("isolates").join("to_isolates.vta")).unwrap();
    assert_eq!(targeted.len(), 1);
    assert_eq!(targeted[0].read_id, "r1");
}

#[tokio::test]
async fn test_rerun_produces_identical_results() {
    let dir = TempDir::new().unwrap();
    let inputs = inputs(&dir);
    let catalog = catalog();
    let config = PipelineConfig::default();
    let aligner = scenario_a();
    let pipeline = Pipeline::new(&aligner, &catalog, &config);
    let report_path = inputs.work_dir.join("isolates").join("report.tsv");

    let first = pipeline.run(&inputs).await.unwrap();
    let first_report = std::fs::read_to_string(&report_path).unwrap();

    let second = pipeline.run(&inputs).await.unwrap();
    let second_report = std::fs::read_to_string(&report_path).unwrap();

    assert_eq!(first.hits, second.hits);
    assert_eq!(first_report, second_report);
}
