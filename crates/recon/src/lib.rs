//! `dialsight-recon` — Call-activity reconciliation and metrics engine.
//!
//! Pure engine crate: receives pre-loaded raw tables, returns serializable
//! results. No file paths or CLI dependencies. Empty inputs are a first-class
//! state throughout; every operation returns a structurally complete result
//! for any combination of missing sources.

pub mod config;
pub mod cooldown;
pub mod error;
pub mod join;
pub mod metrics;
pub mod model;
pub mod schema;

pub use config::EngineConfig;
pub use error::EngineError;
pub use join::reconcile;
pub use model::{CallLogTable, CrossReference, RosterTable, ValidationTable};
pub use schema::{normalize_phone, RawTable};
