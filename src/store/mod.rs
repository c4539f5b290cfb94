//! Saved macros
//!
//! Each macro is a pretty-printed JSON file named after the macro inside the
//! macros directory. Files are replaced atomically on save.

pub mod schema;
mod sequence_store;

pub use schema::{Sequence, SequenceStats, SequenceSummary};
pub use sequence_store::SequenceStore;
