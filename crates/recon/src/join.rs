//! Three-way reconciliation: roster → validation → call log, left-joined on
//! the normalized phone key and bucketed into coverage categories.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::metrics::round2;
use crate::model::{
    CallEvent, CallLogTable, CarrierSummary, Category, CrossReference, RosterTable,
    ValidationRecord, ValidationTable,
};

/// Cross-reference the three canonical tables.
///
/// Any empty input is the documented degenerate case: every category comes
/// back with `count = 0` and an empty carrier summary. Duplicate phone keys
/// on the validation or call side fan out, one reconciled row per
/// (roster, validation, call) combination.
pub fn reconcile(
    roster: &RosterTable,
    validation: &ValidationTable,
    call_log: &CallLogTable,
    config: &EngineConfig,
) -> CrossReference {
    if roster.is_empty() || validation.is_empty() || call_log.is_empty() {
        return CrossReference::empty();
    }

    let validation_by_key = index_validation(validation);
    let calls_by_key = index_calls(call_log);

    let mut validated_dialed = Vec::new();
    let mut validated_only = Vec::new();
    let mut dialed_only = Vec::new();
    let mut false_negatives = Vec::new();

    for contact in &roster.contacts {
        let key = contact.phone_key.as_deref();
        let validation_matches = key_matches(&validation_by_key, key);
        let call_matches = key_matches(&calls_by_key, key);

        // Expand the left-join chain; a side with no match contributes a
        // single null entry so the roster row survives the join.
        let validation_side: Vec<Option<&ValidationRecord>> = if validation_matches.is_empty() {
            vec![None]
        } else {
            validation_matches
                .iter()
                .map(|&i| Some(&validation.records[i]))
                .collect()
        };
        let call_side: Vec<Option<&CallEvent>> = if call_matches.is_empty() {
            vec![None]
        } else {
            call_matches.iter().map(|&i| Some(&call_log.events[i])).collect()
        };

        for &validated in &validation_side {
            for &called in &call_side {
                // A call only counts as dialed when its timestamp parsed.
                let dialed = called.filter(|c| c.timestamp.is_some());
                match (validated, dialed) {
                    (Some(v), Some(call)) => {
                        validated_dialed.push(json!({
                            "phone_number": contact.phone_number,
                            "list_name": contact.list_name,
                            "is_reachable": v.is_reachable,
                            "carrier": v.carrier,
                            "disposition": call.disposition,
                            "timestamp": format_timestamp(call),
                        }));
                    }
                    (Some(v), None) => {
                        validated_only.push(json!({
                            "phone_number": contact.phone_number,
                            "list_name": contact.list_name,
                            "is_reachable": v.is_reachable,
                            "carrier": v.carrier,
                        }));
                    }
                    (None, Some(call)) => {
                        dialed_only.push(json!({
                            "phone_number": contact.phone_number,
                            "list_name": contact.list_name,
                            "disposition": call.disposition,
                            "timestamp": format_timestamp(call),
                        }));
                    }
                    // Never validated, never dialed: outside this
                    // categorization's purpose.
                    (None, None) => {}
                }

                // A number the feed called unreachable that the log shows
                // was actually engaged.
                if let (Some(v), Some(call)) = (validated, called) {
                    if !v.is_reachable && config.is_connect_outcome(&call.disposition) {
                        false_negatives.push(json!({
                            "phone_number": contact.phone_number,
                            "list_name": contact.list_name,
                            "is_reachable": v.is_reachable,
                            "disposition": call.disposition,
                            "timestamp": format_timestamp(call),
                        }));
                    }
                }
            }
        }
    }

    CrossReference {
        validated_dialed: category(validated_dialed),
        validated_only: category(validated_only),
        dialed_only: category(dialed_only),
        false_negatives: category(false_negatives),
        carrier_summary: carrier_summary(validation),
    }
}

/// Per-carrier reachability breakdown over the whole validation table.
pub fn carrier_summary(validation: &ValidationTable) -> BTreeMap<String, CarrierSummary> {
    let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for record in &validation.records {
        let entry = groups.entry(record.carrier.clone()).or_insert((0, 0));
        entry.0 += 1;
        if record.is_reachable {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(carrier, (total, reachable))| {
            let summary = CarrierSummary {
                total_validated: total,
                reachable_count: reachable,
                // Groups are non-empty by construction.
                reachable_pct: round2(reachable as f64 / total as f64 * 100.0),
            };
            (carrier, summary)
        })
        .collect()
}

fn key_matches(index: &BTreeMap<&str, Vec<usize>>, key: Option<&str>) -> Vec<usize> {
    key.and_then(|k| index.get(k)).cloned().unwrap_or_default()
}

fn index_validation<'a>(validation: &'a ValidationTable) -> BTreeMap<&'a str, Vec<usize>> {
    let mut index: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, record) in validation.records.iter().enumerate() {
        if let Some(key) = record.phone_key.as_deref() {
            index.entry(key).or_default().push(i);
        }
    }
    index
}

fn index_calls<'a>(call_log: &'a CallLogTable) -> BTreeMap<&'a str, Vec<usize>> {
    let mut index: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, event) in call_log.events.iter().enumerate() {
        if let Some(key) = event.phone_key.as_deref() {
            index.entry(key).or_default().push(i);
        }
    }
    index
}

fn format_timestamp(event: &CallEvent) -> Value {
    match event.timestamp {
        Some(ts) => Value::String(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => Value::Null,
    }
}

fn category(data: Vec<Value>) -> Category {
    Category {
        count: data.len(),
        data,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeedKind, RosterContact, ValidationRecord};
    use chrono::NaiveDate;

    fn contact(phone: &str, list: &str) -> RosterContact {
        RosterContact {
            phone_number: Some(phone.to_string()),
            phone_key: crate::schema::normalize_phone(phone),
            connected: 0,
            attempt_count: 0,
            list_name: list.to_string(),
        }
    }

    fn validated(phone: &str, reachable: bool, carrier: &str) -> ValidationRecord {
        ValidationRecord {
            phone_key: crate::schema::normalize_phone(phone),
            is_reachable: reachable,
            carrier: carrier.to_string(),
            risk_level: "Low".to_string(),
            validation_type: "Unknown".to_string(),
            source_feed: FeedKind::WithLive,
        }
    }

    fn call(phone: &str, disposition: &str, day: u32) -> CallEvent {
        CallEvent {
            to_number: Some(phone.to_string()),
            phone_key: crate::schema::normalize_phone(phone),
            disposition: disposition.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            agent_name: "Ana Reyes".to_string(),
            status: None,
            duration: None,
            source: None,
        }
    }

    fn tables(
        contacts: Vec<RosterContact>,
        records: Vec<ValidationRecord>,
        events: Vec<CallEvent>,
    ) -> (RosterTable, ValidationTable, CallLogTable) {
        (
            RosterTable {
                contacts,
                has_attempt_counts: true,
            },
            ValidationTable { records },
            CallLogTable { events },
        )
    }

    #[test]
    fn empty_input_yields_empty_categories() {
        let (roster, validation, call_log) = tables(
            vec![contact("+1234567890", "NAICS")],
            vec![validated("+1234567890", true, "Verizon")],
            vec![],
        );
        let result = reconcile(&roster, &validation, &call_log, &EngineConfig::default());
        assert_eq!(result.validated_dialed.count, 0);
        assert_eq!(result.validated_only.count, 0);
        assert_eq!(result.dialed_only.count, 0);
        assert_eq!(result.false_negatives.count, 0);
        assert!(result.carrier_summary.is_empty());
    }

    #[test]
    fn coverage_categories_are_disjoint() {
        let (roster, validation, call_log) = tables(
            vec![
                contact("+1234567890", "NAICS"), // validated + dialed
                contact("+1987654321", "NAICS"), // validated only
                contact("+1555000111", "Other"), // dialed only
                contact("+1555000222", "Other"), // neither: excluded
            ],
            vec![
                validated("+1234567890", true, "Verizon"),
                validated("+1987654321", true, "AT&T"),
            ],
            vec![
                call("+1234567890", "Connected", 5),
                call("+1555000111", "No Answer", 6),
            ],
        );
        let result = reconcile(&roster, &validation, &call_log, &EngineConfig::default());
        assert_eq!(result.validated_dialed.count, 1);
        assert_eq!(result.validated_only.count, 1);
        assert_eq!(result.dialed_only.count, 1);
        assert_eq!(
            result.validated_dialed.data[0]["disposition"],
            "Connected"
        );
        assert_eq!(result.dialed_only.data[0]["phone_number"], "+1555000111");
    }

    #[test]
    fn duplicate_validation_keys_fan_out() {
        // The same number appears in both feeds; the join must produce one
        // row per (validation, call) combination.
        let (roster, validation, call_log) = tables(
            vec![contact("+1234567890", "NAICS")],
            vec![
                validated("+1234567890", true, "Verizon"),
                validated("+1234567890", false, "Verizon"),
            ],
            vec![
                call("+1234567890", "Connected", 5),
                call("+1234567890", "No Answer", 6),
            ],
        );
        let result = reconcile(&roster, &validation, &call_log, &EngineConfig::default());
        assert_eq!(result.validated_dialed.count, 4);
    }

    #[test]
    fn false_negative_requires_unreachable_and_connect_outcome() {
        let (roster, validation, call_log) = tables(
            vec![contact("+1234567890", "NAICS"), contact("+1987654321", "NAICS")],
            vec![
                validated("+1234567890", false, "Verizon"),
                validated("+1987654321", false, "AT&T"),
            ],
            vec![
                call("+1234567890", "Left voicemail", 5),
                call("+1987654321", "No Answer", 6),
            ],
        );
        let result = reconcile(&roster, &validation, &call_log, &EngineConfig::default());
        assert_eq!(result.false_negatives.count, 1);
        assert_eq!(
            result.false_negatives.data[0]["phone_number"],
            "+1234567890"
        );
    }

    #[test]
    fn null_keys_never_join() {
        let mut unkeyed = contact("+1234567890", "NAICS");
        unkeyed.phone_number = Some("n/a".to_string());
        unkeyed.phone_key = None;
        let (roster, validation, call_log) = tables(
            vec![unkeyed],
            vec![validated("+1234567890", true, "Verizon")],
            vec![call("+1234567890", "Connected", 5)],
        );
        let result = reconcile(&roster, &validation, &call_log, &EngineConfig::default());
        assert_eq!(result.validated_dialed.count, 0);
        assert_eq!(result.validated_only.count, 0);
        assert_eq!(result.dialed_only.count, 0);
    }

    #[test]
    fn call_without_timestamp_counts_as_not_dialed() {
        let mut event = call("+1234567890", "Connected", 5);
        event.timestamp = None;
        let (roster, validation, call_log) = tables(
            vec![contact("+1234567890", "NAICS")],
            vec![validated("+1234567890", true, "Verizon")],
            vec![event],
        );
        let result = reconcile(&roster, &validation, &call_log, &EngineConfig::default());
        assert_eq!(result.validated_dialed.count, 0);
        assert_eq!(result.validated_only.count, 1);
    }

    #[test]
    fn carrier_summary_counts_and_pct() {
        let validation = ValidationTable {
            records: vec![
                validated("+1111111111", true, "Verizon"),
                validated("+2222222222", true, "Verizon"),
                validated("+3333333333", false, "Verizon"),
                validated("+4444444444", true, "AT&T"),
            ],
        };
        let summary = carrier_summary(&validation);
        let verizon = &summary["Verizon"];
        assert_eq!(verizon.total_validated, 3);
        assert_eq!(verizon.reachable_count, 2);
        assert_eq!(verizon.reachable_pct, 66.67);
        assert_eq!(summary["AT&T"].reachable_pct, 100.0);
    }
}
