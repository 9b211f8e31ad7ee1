/// Lookup of OTU identity and sequences by id.
///
/// The pipeline only needs these three questions answered, so any reference
/// source (a catalog file, a database client, a test fixture) can stand in.
pub trait ReferenceResolver {
    /// The OTU owning a reference sequence
    fn otu_id_for_sequence(&self, sequence_id: &str) -> Option<&str>;

    /// Current manifest version of an OTU
    fn otu_version(&self, otu_id: &str) -> Option<u32>;

    /// Every `(sequence_id, sequence)` of an OTU across all of its isolates
    fn otu_sequences(&self, otu_id: &str) -> Option<Vec<(&str, &[u8])>>;
}
