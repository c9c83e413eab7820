//! `dialsight-io` — source loaders for the reconciliation engine.
//!
//! File reading with encoding tolerance, delimiter sniffing, and the
//! degrade-to-empty policy: a missing, empty, unreadable, or schema-failing
//! source becomes an empty canonical table and a warning, never an error.

pub mod loader;
pub mod table;

pub use loader::{load_call_log, load_roster, load_validation};
