//! Per-source schema normalization: alias-based column mapping, phone-key
//! normalization, and the tolerant coercions that turn a raw delimited table
//! into a canonical one.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{EngineError, SourceKind};
use crate::model::{
    CallEvent, CallLogTable, FeedKind, RosterContact, RosterTable, ValidationRecord,
    ValidationTable,
};

// ---------------------------------------------------------------------------
// Raw table
// ---------------------------------------------------------------------------

/// An unvalidated delimited table: a header row plus data rows. Cells are
/// strings; empty cells are empty strings. Rows shorter than the header are
/// padded so column indexes stay valid.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_csv(data: &str) -> Result<Self, EngineError> {
        Self::from_delimited(data, b',')
    }

    pub fn from_delimited(data: &str, delimiter: u8) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(data.as_bytes());

        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record
                .map_err(|e| EngineError::Io(e.to_string()))?
                .iter()
                .map(|h| h.to_string())
                .collect(),
            None => return Ok(Self::default()),
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(|e| EngineError::Io(e.to_string()))?;
            let mut row: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Phone normalization
// ---------------------------------------------------------------------------

/// Normalize a raw phone string to its matching key: strip non-digits, keep
/// the last 10 digits (or all of them when fewer remain). No digits → `None`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else if digits.len() > 10 {
        Some(digits[digits.len() - 10..].to_string())
    } else {
        Some(digits)
    }
}

// ---------------------------------------------------------------------------
// Alias tables
// ---------------------------------------------------------------------------

type AliasTable = &'static [(&'static str, &'static [&'static str])];

const CALL_LOG_ALIASES: AliasTable = &[
    ("to_number", &["to_number", "to", "phone", "phone_number", "number"]),
    ("disposition", &["disposition", "outcome", "call_outcome", "no_call_outcome"]),
    ("date", &["date", "call_date"]),
    ("time", &["time", "call_time"]),
    ("agent_first_name", &["agent_first_name", "first_name", "agent"]),
    ("agent_last_name", &["agent_last_name", "last_name"]),
    ("status", &["status", "call_status"]),
    ("duration", &["duration", "call_duration"]),
    ("source", &["source", "call_source"]),
];

const VALIDATION_ALIASES: AliasTable = &[
    ("phone", &["phone_e164", "contact_mobile_phone", "phone", "mobile_phone"]),
    ("is_reachable", &["is_reachable", "reachable", "live"]),
    ("carrier", &["carrier", "phone_carrier"]),
    ("risk_level", &["risk_level", "risk"]),
    ("validation_type", &["validation_type", "validation"]),
];

const ROSTER_ALIASES: AliasTable = &[
    ("phone_number", &["phone_number", "phone", "phonenumber"]),
    ("connected", &["connected", "is_connected"]),
    ("attempt_count", &["attempt_count", "attempts", "attempts_count"]),
    ("list_name", &["list_name", "list", "listname", "powerlist_name"]),
];

/// Fixed layout of the headerless legacy call-log export.
const LEGACY_CALL_LOG_COLUMNS: usize = 8;
const LEGACY_DATE: usize = 0;
const LEGACY_TIME: usize = 1;
const LEGACY_AGENT_FIRST: usize = 2;
const LEGACY_AGENT_LAST: usize = 3;
const LEGACY_STATUS: usize = 6;
const LEGACY_DISPOSITION: usize = 7;

/// Case-insensitive, whitespace/hyphen-normalized header form used for alias
/// matching.
fn fold_header(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Map raw headers to canonical field names. Headers are scanned in order;
/// the first header matching an alias claims the canonical field, later
/// contenders are ignored. Unmatched headers are dropped.
fn map_columns(headers: &[String], aliases: AliasTable) -> HashMap<&'static str, usize> {
    let mut mapping: HashMap<&'static str, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let folded = fold_header(header);
        for &(canonical, names) in aliases {
            if names.contains(&folded.as_str()) {
                mapping.entry(canonical).or_insert(idx);
                break;
            }
        }
    }
    mapping
}

fn cell<'a>(row: &'a [String], cols: &HashMap<&'static str, usize>, field: &str) -> Option<&'a str> {
    let idx = *cols.get(field)?;
    let value = row.get(idx)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// Field coercions
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d"];

/// Tolerant date+time parsing. Returns `None` rather than an error: an
/// unparseable timestamp keeps the row, it just can't participate in
/// time-based computations.
pub(crate) fn parse_timestamp(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = date?;
    if let Some(time) = time {
        let combined = format!("{date} {time}");
        for format in DATETIME_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(&combined, format) {
                return Some(ts);
            }
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn agent_name(first: Option<&str>, last: Option<&str>) -> String {
    let first = first.unwrap_or("");
    let last = last.unwrap_or("");
    if first.is_empty() && last.is_empty() {
        "Unknown".into()
    } else {
        format!("{first} {last}").trim().to_string()
    }
}

/// Numeric coercion for roster counters: integer, else float truncated, else 0.
fn coerce_count(value: Option<&str>) -> i64 {
    let Some(value) = value else { return 0 };
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|v| v as i64))
        .unwrap_or(0)
}

fn parse_reachable(value: Option<&str>, default: bool) -> bool {
    match value.map(str::to_lowercase).as_deref() {
        Some("true" | "yes" | "y" | "t" | "1" | "live") => true,
        Some("false" | "no" | "n" | "f" | "0") => false,
        _ => default,
    }
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// The legacy export has no header row: exactly 8 columns, with what would be
/// the first header cell holding a bare date (digits then `/`).
fn is_legacy_call_log(raw: &RawTable) -> bool {
    if raw.headers.len() != LEGACY_CALL_LOG_COLUMNS {
        return false;
    }
    let first = raw.headers[0].trim();
    let digits = first.chars().take_while(char::is_ascii_digit).count();
    digits >= 1 && first[digits..].starts_with('/')
}

pub fn canonicalize_call_log(raw: &RawTable) -> Result<CallLogTable, EngineError> {
    if is_legacy_call_log(raw) {
        return Ok(legacy_call_log(raw));
    }

    let cols = map_columns(&raw.headers, CALL_LOG_ALIASES);
    if !cols.contains_key("disposition") {
        return Err(EngineError::Schema {
            kind: SourceKind::CallLog,
            available: raw.headers.clone(),
        });
    }

    let events = raw
        .rows
        .iter()
        .map(|row| {
            let to_number = cell(row, &cols, "to_number").map(str::to_string);
            let phone_key = to_number.as_deref().and_then(normalize_phone);
            CallEvent {
                to_number,
                phone_key,
                disposition: cell(row, &cols, "disposition").unwrap_or("").to_string(),
                timestamp: parse_timestamp(cell(row, &cols, "date"), cell(row, &cols, "time")),
                agent_name: agent_name(
                    cell(row, &cols, "agent_first_name"),
                    cell(row, &cols, "agent_last_name"),
                ),
                status: cell(row, &cols, "status").map(str::to_string),
                duration: cell(row, &cols, "duration").map(str::to_string),
                source: cell(row, &cols, "source").map(str::to_string),
            }
        })
        .collect();

    Ok(CallLogTable { events })
}

/// Reinterpret the whole file (header row included) as data rows under the
/// fixed legacy layout.
fn legacy_call_log(raw: &RawTable) -> CallLogTable {
    let events = std::iter::once(&raw.headers)
        .chain(raw.rows.iter())
        .map(|row| {
            let get = |idx: usize| -> Option<&str> {
                let value = row.get(idx)?.trim();
                if value.is_empty() {
                    None
                } else {
                    Some(value)
                }
            };
            CallEvent {
                to_number: None,
                phone_key: None,
                disposition: get(LEGACY_DISPOSITION).unwrap_or("").to_string(),
                timestamp: parse_timestamp(get(LEGACY_DATE), get(LEGACY_TIME)),
                agent_name: agent_name(get(LEGACY_AGENT_FIRST), get(LEGACY_AGENT_LAST)),
                status: get(LEGACY_STATUS).map(str::to_string),
                duration: None,
                source: None,
            }
        })
        .collect();

    CallLogTable { events }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn canonicalize_validation(
    raw: &RawTable,
    feed: FeedKind,
) -> Result<ValidationTable, EngineError> {
    let cols = map_columns(&raw.headers, VALIDATION_ALIASES);
    if !cols.contains_key("phone") {
        return Err(EngineError::Schema {
            kind: SourceKind::Validation,
            available: raw.headers.clone(),
        });
    }

    // A feed that never reports reachability is interpreted by provenance:
    // the with-live-transfer feed only contains numbers that answered.
    let default_reachable = feed == FeedKind::WithLive;

    let records = raw
        .rows
        .iter()
        .map(|row| ValidationRecord {
            phone_key: cell(row, &cols, "phone").and_then(normalize_phone),
            is_reachable: parse_reachable(cell(row, &cols, "is_reachable"), default_reachable),
            carrier: cell(row, &cols, "carrier").unwrap_or("Unknown").to_string(),
            risk_level: cell(row, &cols, "risk_level").unwrap_or("Unknown").to_string(),
            validation_type: cell(row, &cols, "validation_type")
                .unwrap_or("Unknown")
                .to_string(),
            source_feed: feed,
        })
        .collect();

    Ok(ValidationTable { records })
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

pub fn canonicalize_roster(raw: &RawTable) -> Result<RosterTable, EngineError> {
    let cols = map_columns(&raw.headers, ROSTER_ALIASES);
    if !cols.contains_key("phone_number") {
        return Err(EngineError::Schema {
            kind: SourceKind::Roster,
            available: raw.headers.clone(),
        });
    }

    let contacts = raw
        .rows
        .iter()
        .map(|row| {
            let phone_number = cell(row, &cols, "phone_number").map(str::to_string);
            let phone_key = phone_number.as_deref().and_then(normalize_phone);
            RosterContact {
                phone_number,
                phone_key,
                connected: coerce_count(cell(row, &cols, "connected")),
                attempt_count: coerce_count(cell(row, &cols, "attempt_count")),
                list_name: cell(row, &cols, "list_name")
                    .unwrap_or("Default List")
                    .to_string(),
            }
        })
        .collect();

    Ok(RosterTable {
        contacts,
        has_attempt_counts: cols.contains_key("attempt_count"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_phone_literals() {
        assert_eq!(normalize_phone("+1234567890").as_deref(), Some("1234567890"));
        assert_eq!(normalize_phone("1-234-567-890").as_deref(), Some("1234567890"));
        assert_eq!(normalize_phone("+1-234-567-890").as_deref(), Some("1234567890"));
        assert_eq!(normalize_phone("1234567890123").as_deref(), Some("4567890123"));
        assert_eq!(normalize_phone("123456789").as_deref(), Some("123456789"));
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("n/a"), None);
    }

    #[test]
    fn normalize_phone_idempotent_on_keys() {
        let key = normalize_phone("+1 (234) 567-8901").unwrap();
        assert_eq!(normalize_phone(&key).as_deref(), Some(key.as_str()));
    }

    #[test]
    fn alias_mapping_is_case_and_separator_insensitive() {
        let raw = RawTable::from_csv(
            "To Number,Call-Outcome,Agent First Name,Agent Last Name\n\
             +1234567890,Connected,Ana,Reyes\n",
        )
        .unwrap();
        let table = canonicalize_call_log(&raw).unwrap();
        assert_eq!(table.len(), 1);
        let event = &table.events[0];
        assert_eq!(event.phone_key.as_deref(), Some("1234567890"));
        assert_eq!(event.disposition, "Connected");
        assert_eq!(event.agent_name, "Ana Reyes");
    }

    #[test]
    fn first_alias_match_wins() {
        // Both headers alias `disposition`; the earlier column claims it.
        let raw = RawTable::from_csv("outcome,disposition\nBusy,Connected\n").unwrap();
        let table = canonicalize_call_log(&raw).unwrap();
        assert_eq!(table.events[0].disposition, "Busy");
    }

    #[test]
    fn call_log_requires_disposition() {
        let raw = RawTable::from_csv("To Number,Date\n+1234567890,1/5/2024\n").unwrap();
        let err = canonicalize_call_log(&raw).unwrap_err();
        assert!(err.to_string().contains("To Number"));
    }

    #[test]
    fn call_log_round_trip_is_noop() {
        let raw = RawTable::from_csv(
            "to_number,disposition,date,time,agent_first_name,agent_last_name\n\
             +1234567890,Connected,1/5/2024,09:30:00,Ana,Reyes\n\
             +1987654321,No Answer,1/6/2024,10:00:00,Ben,Cruz\n",
        )
        .unwrap();
        let table = canonicalize_call_log(&raw).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.events[0].disposition, "Connected");
        assert_eq!(table.events[1].disposition, "No Answer");
        assert_eq!(table.events[0].to_number.as_deref(), Some("+1234567890"));
        assert_eq!(
            table.events[1].timestamp.unwrap().to_string(),
            "2024-01-06 10:00:00"
        );
    }

    #[test]
    fn legacy_layout_detected_and_header_row_recovered() {
        let raw = RawTable::from_csv(
            "7/15/2024,09:30:00,Ana,Reyes,,Outbound,Completed,Connected\n\
             7/15/2024,09:45:00,Ben,Cruz,,Outbound,Completed,No Answer\n",
        )
        .unwrap();
        assert!(is_legacy_call_log(&raw));
        let table = canonicalize_call_log(&raw).unwrap();
        // The would-be header row is data.
        assert_eq!(table.len(), 2);
        assert_eq!(table.events[0].disposition, "Connected");
        assert_eq!(table.events[0].agent_name, "Ana Reyes");
        assert_eq!(table.events[0].status.as_deref(), Some("Completed"));
        assert_eq!(
            table.events[0].timestamp.unwrap().to_string(),
            "2024-07-15 09:30:00"
        );
        assert!(table.events.iter().all(|e| e.phone_key.is_none()));
    }

    #[test]
    fn named_headers_with_eight_columns_stay_on_header_path() {
        let raw = RawTable::from_csv(
            "Date,Time,First Name,Last Name,Empty,Call Type,Status,Disposition\n\
             7/15/2024,09:30:00,Ana,Reyes,,Outbound,Completed,Connected\n",
        )
        .unwrap();
        assert!(!is_legacy_call_log(&raw));
        let table = canonicalize_call_log(&raw).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn timestamp_parsing_is_tolerant() {
        assert!(parse_timestamp(Some("1/5/2024"), Some("09:30:00")).is_some());
        assert!(parse_timestamp(Some("2024-01-05"), None).is_some());
        assert!(parse_timestamp(Some("1/5/2024"), Some("garbage")).is_some()); // date-only fallback
        assert!(parse_timestamp(Some("not a date"), Some("09:30:00")).is_none());
        assert!(parse_timestamp(None, Some("09:30:00")).is_none());
    }

    #[test]
    fn agent_name_defaults_to_unknown() {
        let raw = RawTable::from_csv("disposition\nConnected\n").unwrap();
        let table = canonicalize_call_log(&raw).unwrap();
        assert_eq!(table.events[0].agent_name, "Unknown");
    }

    #[test]
    fn validation_defaults_by_feed() {
        let raw = RawTable::from_csv("phone_e164\n+1234567890\n").unwrap();
        let with_live = canonicalize_validation(&raw, FeedKind::WithLive).unwrap();
        assert!(with_live.records[0].is_reachable);
        let without = canonicalize_validation(&raw, FeedKind::WithoutLive).unwrap();
        assert!(!without.records[0].is_reachable);
        assert_eq!(without.records[0].carrier, "Unknown");
        assert_eq!(without.records[0].risk_level, "Unknown");
    }

    #[test]
    fn validation_requires_phone() {
        let raw = RawTable::from_csv("carrier,risk_level\nVerizon,Low\n").unwrap();
        assert!(canonicalize_validation(&raw, FeedKind::WithLive).is_err());
    }

    #[test]
    fn validation_explicit_reachability_overrides_default() {
        let raw = RawTable::from_csv(
            "phone_e164,is_reachable\n+1234567890,false\n+1987654321,yes\n",
        )
        .unwrap();
        let table = canonicalize_validation(&raw, FeedKind::WithLive).unwrap();
        assert!(!table.records[0].is_reachable);
        assert!(table.records[1].is_reachable);
    }

    #[test]
    fn roster_coercion_and_defaults() {
        let raw = RawTable::from_csv(
            "Phone Number,Connected,Attempt Count\n\
             +1234567890,1,5\n\
             +1987654321,n/a,3.0\n\
             +1555000111,,oops\n",
        )
        .unwrap();
        let table = canonicalize_roster(&raw).unwrap();
        assert!(table.has_attempt_counts);
        assert_eq!(table.contacts[0].attempt_count, 5);
        assert_eq!(table.contacts[1].connected, 0);
        assert_eq!(table.contacts[1].attempt_count, 3);
        assert_eq!(table.contacts[2].attempt_count, 0);
        assert!(table.contacts.iter().all(|c| c.list_name == "Default List"));
    }

    #[test]
    fn roster_without_attempt_column() {
        let raw = RawTable::from_csv("phone\n+1234567890\n").unwrap();
        let table = canonicalize_roster(&raw).unwrap();
        assert!(!table.has_attempt_counts);
        assert_eq!(table.contacts[0].attempt_count, 0);
    }

    #[test]
    fn short_rows_are_padded() {
        let raw = RawTable::from_csv("phone_number,attempt_count,list_name\n+1234567890\n").unwrap();
        let table = canonicalize_roster(&raw).unwrap();
        assert_eq!(table.contacts[0].list_name, "Default List");
        assert_eq!(table.contacts[0].attempt_count, 0);
    }
}
