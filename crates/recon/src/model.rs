use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Canonical tables
// ---------------------------------------------------------------------------

/// Which validation feed a record came from. Diagnostic only; the join never
/// filters on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    WithLive,
    WithoutLive,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithLive => write!(f, "with_live"),
            Self::WithoutLive => write!(f, "without_live"),
        }
    }
}

/// One call attempt from the call-event log.
#[derive(Debug, Clone)]
pub struct CallEvent {
    pub to_number: Option<String>,
    /// Normalized last-10-digit key; `None` when the raw value had no digits.
    /// A `None` key keeps the row in the table but out of every join.
    pub phone_key: Option<String>,
    pub disposition: String,
    /// Combined date+time, tolerantly parsed. Unparseable input is `None`.
    pub timestamp: Option<NaiveDateTime>,
    pub agent_name: String,
    pub status: Option<String>,
    pub duration: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CallLogTable {
    pub events: Vec<CallEvent>,
}

impl CallLogTable {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// One validated number from either reachability feed.
#[derive(Debug, Clone)]
pub struct ValidationRecord {
    pub phone_key: Option<String>,
    pub is_reachable: bool,
    pub carrier: String,
    pub risk_level: String,
    pub validation_type: String,
    pub source_feed: FeedKind,
}

/// Concatenation of both feeds. Duplicate phone keys across feeds are legal;
/// the join fans out across them.
#[derive(Debug, Clone, Default)]
pub struct ValidationTable {
    pub records: Vec<ValidationRecord>,
}

impl ValidationTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// One campaign contact from the roster.
#[derive(Debug, Clone)]
pub struct RosterContact {
    pub phone_number: Option<String>,
    pub phone_key: Option<String>,
    pub connected: i64,
    pub attempt_count: i64,
    pub list_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct RosterTable {
    pub contacts: Vec<RosterContact>,
    /// Whether the source file actually carried an attempt-count column.
    /// Distinguishes "all zero attempts" from "attempts never recorded" for
    /// the cooldown-dependent metrics.
    pub has_attempt_counts: bool,
}

impl RosterTable {
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }
}

// ---------------------------------------------------------------------------
// Cross-reference output
// ---------------------------------------------------------------------------

/// One coverage category: row count plus plain-mapping row payloads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Category {
    pub count: usize,
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarrierSummary {
    pub total_validated: usize,
    pub reachable_count: usize,
    pub reachable_pct: f64,
}

/// Result of the three-way reconciliation join.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrossReference {
    pub validated_dialed: Category,
    pub validated_only: Category,
    pub dialed_only: Category,
    pub false_negatives: Category,
    pub carrier_summary: BTreeMap<String, CarrierSummary>,
}

impl CrossReference {
    /// The degenerate shape returned when any input table is empty.
    pub fn empty() -> Self {
        Self::default()
    }
}
