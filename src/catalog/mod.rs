//! OTU reference storage and lookup.
//!
//! The reference describes every OTU the sample can be classified against:
//! its manifest version, its isolates and their sequences. It is loaded from a
//! JSON file, optionally gzip-compressed:
//!
//! ```json
//! {
//!   "otus": [
//!     {
//!       "_id": "otu_tmv",
//!       "version": 10,
//!       "isolates": [
//!         { "id": "iso_a", "sequences": [ { "_id": "NC_001367", "sequence": "ACGT" } ] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use otu_reassign::catalog::{OtuCatalog, ReferenceResolver};
//! use std::path::Path;
//!
//! let catalog = OtuCatalog::load_from_file(Path::new("reference.json.gz")).unwrap();
//! let otu = catalog.otu_id_for_sequence("NC_001367");
//! ```

pub mod resolver;
pub mod store;

pub use resolver::ReferenceResolver;
pub use store::{CatalogError, OtuCatalog};
