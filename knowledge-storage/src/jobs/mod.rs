//! One-shot maintenance jobs
//!
//! - [`migrate`]: SRD JSON files → catalog rows, tracked in
//!   `migration_history`
//! - [`index`]: catalog rows → embedding vectors
//! - [`verify`]: schema and content sanity report

pub mod index;
pub mod migrate;
pub mod verify;

pub use index::IndexSummary;
pub use migrate::MigrationSummary;
pub use verify::VerifyReport;
