//! Host subtraction and probabilistic reassignment of multi-mapped reads.
//!
//! The targeted alignment file first loses every record its read explains at
//! least as well against the host ([`subtract`]). The survivors are then
//! reassigned with expectation-maximization ([`engine::reassign`]), which
//! estimates a per-reference abundance and keeps one record per read for its
//! most probable reference.

pub mod best_hit;
pub mod em;
pub mod engine;
pub mod matrix;
pub mod subtract;

pub use best_hit::HitStatistics;
pub use engine::{reassign, reassign_records, ReassignmentResult};
pub use subtract::subtract;
