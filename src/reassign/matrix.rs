use std::collections::{BTreeSet, HashMap};

use crate::core::types::AlignmentRecord;

/// One reference a read aligned to
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index into [`ReadMatrix::references`]
    pub reference: usize,

    /// Best score of the read against this reference
    pub score: f64,

    /// Index of the record that produced `score`
    pub record: usize,
}

/// Reads against the references they aligned to.
///
/// References are indexed in lexicographic order of id, so "lowest index"
/// doubles as the deterministic tie-break. Reads keep their order of first
/// appearance in the input.
#[derive(Debug, Clone, Default)]
pub struct ReadMatrix {
    pub references: Vec<String>,
    pub read_ids: Vec<String>,

    /// Candidates per read, sorted by reference index
    pub reads: Vec<Vec<Candidate>>,
}

impl ReadMatrix {
    /// Build from alignment records. When a read aligns to the same reference
    /// more than once, only its highest-scoring record is kept (first seen on ties).
    pub fn build(records: &[AlignmentRecord]) -> Self {
        let references: Vec<String> = records
            .iter()
            .map(|r| r.reference_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let reference_index: HashMap<&str, usize> = references
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut read_index: HashMap<&str, usize> = HashMap::new();
        let mut read_ids = Vec::new();
        let mut reads: Vec<Vec<Candidate>> = Vec::new();

        for (record_idx, record) in records.iter().enumerate() {
            let read = *read_index.entry(record.read_id.as_str()).or_insert_with(|| {
                read_ids.push(record.read_id.clone());
                reads.push(Vec::new());
                reads.len() - 1
            });

            let reference = reference_index[record.reference_id.as_str()];
            let candidates = &mut reads[read];

            match candidates.iter_mut().find(|c| c.reference == reference) {
                Some(existing) => {
                    if record.score > existing.score {
                        existing.score = record.score;
                        existing.record = record_idx;
                    }
                }
                None => candidates.push(Candidate {
                    reference,
                    score: record.score,
                    record: record_idx,
                }),
            }
        }

        for candidates in &mut reads {
            candidates.sort_by_key(|c| c.reference);
        }

        Self {
            references,
            read_ids,
            reads,
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Reads with exactly one candidate reference
    pub fn unique_reads(&self) -> impl Iterator<Item = &Candidate> {
        self.reads
            .iter()
            .filter(|c| c.len() == 1)
            .map(|c| &c[0])
    }

    /// Indices of reads with more than one candidate reference
    pub fn ambiguous_reads(&self) -> Vec<usize> {
        self.reads
            .iter()
            .enumerate()
            .filter(|(_, c)| c.len() > 1)
            .map(|(i, _)| i)
            .collect()
    }
}
