use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::resolver::ReferenceResolver;
use crate::parsing::fasta::is_gzipped;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Sequence '{0}' is not part of any OTU in the reference")]
    UnknownSequence(String),

    #[error("OTU '{0}' is not in the reference")]
    UnknownOtu(String),

    #[error("OTU '{0}' has no sequences")]
    EmptyOtu(String),

    #[error("Sequence id '{0}' appears more than once in the reference")]
    DuplicateSequence(String),
}

/// A reference sequence belonging to an isolate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(alias = "_id")]
    pub id: String,

    pub sequence: String,
}

/// One isolate of an OTU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Isolate {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

/// An operational taxonomic unit and its isolates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Otu {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Manifest version of this OTU
    pub version: u32,

    #[serde(default)]
    pub isolates: Vec<Isolate>,
}

impl Otu {
    /// Every sequence across all isolates, in file order
    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.isolates.iter().flat_map(|isolate| isolate.sequences.iter())
    }
}

/// Serializable reference format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub otus: Vec<Otu>,
}

/// OTU reference with sequence-id and OTU-id indexes
#[derive(Debug, Default)]
pub struct OtuCatalog {
    /// All OTUs
    pub otus: Vec<Otu>,

    /// Index: OTU id -> index in otus vec
    id_to_index: HashMap<String, usize>,

    /// Index: sequence id -> index of the owning OTU
    sequence_to_otu: HashMap<String, usize>,
}

impl OtuCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON file, gzip-compressed when the name ends in `.gz`
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` if the file cannot be read,
    /// `CatalogError::ParseError` for invalid JSON, or
    /// `CatalogError::DuplicateSequence` if a sequence id is reused.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let mut content = String::new();
        let file = std::fs::File::open(path)?;

        if is_gzipped(path) {
            MultiGzDecoder::new(file).read_to_string(&mut content)?;
        } else {
            std::io::BufReader::new(file).read_to_string(&mut content)?;
        }

        Self::from_json(&content)
    }

    /// Parse catalog from JSON string
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` for invalid JSON or
    /// `CatalogError::DuplicateSequence` if a sequence id is reused.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: ReferenceData = serde_json::from_str(json)?;

        let mut catalog = Self::new();
        for otu in data.otus {
            catalog.add_otu(otu)?;
        }

        Ok(catalog)
    }

    /// Add an OTU to the catalog
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateSequence` if one of its sequence ids is
    /// already indexed. The catalog is left unchanged in that case.
    pub fn add_otu(&mut self, otu: Otu) -> Result<(), CatalogError> {
        let index = self.otus.len();

        let mut seen = std::collections::HashSet::new();
        for sequence in otu.sequences() {
            if self.sequence_to_otu.contains_key(&sequence.id) || !seen.insert(&sequence.id) {
                return Err(CatalogError::DuplicateSequence(sequence.id.clone()));
            }
        }

        // Index by ID
        self.id_to_index.insert(otu.id.clone(), index);

        // Index by sequence ID
        for sequence in otu.sequences() {
            self.sequence_to_otu.insert(sequence.id.clone(), index);
        }

        self.otus.push(otu);
        Ok(())
    }

    /// Get an OTU by ID
    pub fn get(&self, id: &str) -> Option<&Otu> {
        self.id_to_index.get(id).map(|&idx| &self.otus[idx])
    }

    /// Export catalog to JSON
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let data = ReferenceData {
            name: None,
            otus: self.otus.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Number of OTUs in catalog
    pub fn len(&self) -> usize {
        self.otus.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.otus.is_empty()
    }
}

impl ReferenceResolver for OtuCatalog {
    fn otu_id_for_sequence(&self, sequence_id: &str) -> Option<&str> {
        self.sequence_to_otu
            .get(sequence_id)
            .map(|&idx| self.otus[idx].id.as_str())
    }

    fn otu_version(&self, otu_id: &str) -> Option<u32> {
        self.get(otu_id).map(|otu| otu.version)
    }

    fn otu_sequences(&self, otu_id: &str) -> Option<Vec<(&str, &[u8])>> {
        self.get(otu_id).map(|otu| {
            otu.sequences()
                .map(|s| (s.id.as_str(), s.sequence.as_bytes()))
                .collect()
        })
    }
}
