//! Derived operational metrics over the canonical tables. Pure functions:
//! empty inputs produce zero-filled, fully-keyed shapes, never errors.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::model::{CallLogTable, RosterContact, RosterTable, ValidationTable};

/// Disposition counted as a voicemail in the weekly series.
pub const VOICEMAIL_OUTCOME: &str = "Left voicemail";

/// Fixed seed for the pilot fallback sample, so pilot results are
/// reproducible across runs over the same roster.
pub const PILOT_SAMPLE_SEED: u64 = 42;

/// Upper bound on the pilot fallback sample.
pub const PILOT_SAMPLE_MAX: usize = 100;

/// Nominal pilot duration echoed in the pilot report.
pub const TEST_DURATION_DAYS: u32 = 3;

/// The weekly normalization window for the cooldown-per-day rate.
const COOLDOWN_PERIOD_DAYS: f64 = 7.0;

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct BaselineMetrics {
    pub connect_rate: f64,
    pub answer_event_pct: f64,
    pub avg_attempts_lost_race: f64,
    pub cooldown_per_day: f64,
    pub total_calls: usize,
    pub connected_calls: usize,
}

pub fn baseline_metrics(
    call_log: &CallLogTable,
    roster: &RosterTable,
    config: &EngineConfig,
) -> BaselineMetrics {
    if call_log.is_empty() {
        return BaselineMetrics::default();
    }

    let total_calls = call_log.len();
    let connected_calls = call_log
        .events
        .iter()
        .filter(|e| config.is_connect_outcome(&e.disposition))
        .count();
    let connect_rate = if total_calls > 0 {
        connected_calls as f64 / total_calls as f64 * 100.0
    } else {
        0.0
    };

    // Simultaneous-dial race model: with D lines dialed per answer event,
    // (D-1)/D of attempts are lost-race duplicates that never reach the log.
    let dial_at_a_time = config.dial_at_a_time as f64;
    let logged = total_calls as f64;
    let lost_race = logged * (dial_at_a_time - 1.0) / dial_at_a_time;
    let answer_event_pct = if logged + lost_race > 0.0 {
        logged / (logged + lost_race) * 100.0
    } else {
        0.0
    };

    // Mean non-connect attempts per number, over non-connect rows only.
    let mut lost_race_groups: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &call_log.events {
        if config.is_connect_outcome(&event.disposition) {
            continue;
        }
        if let Some(key) = event.phone_key.as_deref() {
            *lost_race_groups.entry(key).or_insert(0) += 1;
        }
    }
    let avg_attempts_lost_race = if lost_race_groups.is_empty() {
        0.0
    } else {
        lost_race_groups.values().sum::<usize>() as f64 / lost_race_groups.len() as f64
    };

    let cooldown_per_day = if roster.has_attempt_counts {
        contacts_in_cooldown(roster, config) as f64 / COOLDOWN_PERIOD_DAYS
    } else {
        0.0
    };

    BaselineMetrics {
        connect_rate: round2(connect_rate),
        answer_event_pct: round2(answer_event_pct),
        avg_attempts_lost_race: round2(avg_attempts_lost_race),
        cooldown_per_day: round2(cooldown_per_day),
        total_calls,
        connected_calls,
    }
}

fn contacts_in_cooldown(roster: &RosterTable, config: &EngineConfig) -> usize {
    roster
        .contacts
        .iter()
        .filter(|c| c.attempt_count >= config.max_attempts)
        .count()
}

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct PilotMetrics {
    pub sample_size: usize,
    pub target_connect_uplift_pct: f64,
    pub target_connect_rate: f64,
    pub success_connect_uplift_pct: f64,
    pub success_voicemail_uplift_pct: f64,
    pub test_duration_days: u32,
    pub dial_at_a_time: u32,
    pub max_attempts: i64,
}

/// Pilot projection for the configured list. The overrides are echoed back
/// for reporting only; the uplift target always builds on the configured
/// baseline assumptions.
pub fn pilot_metrics(
    call_log: &CallLogTable,
    roster: &RosterTable,
    config: &EngineConfig,
    dial_at_a_time_override: Option<u32>,
    max_attempts_override: Option<i64>,
) -> PilotMetrics {
    let pilot = pilot_slice(roster, &config.pilot_list_name);

    let baseline = baseline_metrics(call_log, roster, config);
    let target_connect_rate =
        round2(baseline.connect_rate * (1.0 + config.target_connect_uplift_pct / 100.0));

    PilotMetrics {
        sample_size: pilot.len(),
        target_connect_uplift_pct: config.target_connect_uplift_pct,
        target_connect_rate,
        success_connect_uplift_pct: config.success_criteria_connect_uplift_pct,
        success_voicemail_uplift_pct: config.success_criteria_voicemail_uplift_pct,
        test_duration_days: TEST_DURATION_DAYS,
        dial_at_a_time: dial_at_a_time_override.unwrap_or(config.dial_at_a_time),
        max_attempts: max_attempts_override.unwrap_or(config.max_attempts),
    }
}

/// The pilot roster slice: contacts on the pilot list, or the deterministic
/// fallback sample when the list matches nothing.
pub(crate) fn pilot_slice<'a>(roster: &'a RosterTable, list_name: &str) -> Vec<&'a RosterContact> {
    let needle = list_name.to_lowercase();
    let on_list: Vec<&RosterContact> = roster
        .contacts
        .iter()
        .filter(|c| c.list_name.to_lowercase().contains(&needle))
        .collect();
    if !on_list.is_empty() {
        return on_list;
    }
    sample_contacts(&roster.contacts, PILOT_SAMPLE_MAX)
}

/// Seeded sample of up to `max` contacts, in roster order.
fn sample_contacts(contacts: &[RosterContact], max: usize) -> Vec<&RosterContact> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(PILOT_SAMPLE_SEED);
    let mut indices: Vec<usize> = (0..contacts.len()).collect();
    indices.shuffle(&mut rng);
    indices.truncate(max);
    indices.sort_unstable();
    indices.into_iter().map(|i| &contacts[i]).collect()
}

// ---------------------------------------------------------------------------
// Weekly trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct WeeklyTrends {
    pub weeks: Vec<String>,
    pub total_calls: Vec<usize>,
    pub connected_calls: Vec<usize>,
    pub voicemail_calls: Vec<usize>,
    pub no_answer_calls: Vec<usize>,
}

/// Per-ISO-week call counts. Rows without a timestamp are skipped; weeks with
/// no calls simply don't appear.
pub fn weekly_trends(call_log: &CallLogTable, config: &EngineConfig) -> WeeklyTrends {
    #[derive(Default)]
    struct WeekAgg {
        total: usize,
        connected: usize,
        voicemail: usize,
        no_answer: usize,
    }

    let mut by_week: BTreeMap<(i32, u32), WeekAgg> = BTreeMap::new();
    for event in &call_log.events {
        let Some(ts) = event.timestamp else { continue };
        let iso = ts.date().iso_week();
        let agg = by_week.entry((iso.year(), iso.week())).or_default();
        agg.total += 1;
        if config.is_connect_outcome(&event.disposition) {
            agg.connected += 1;
        } else {
            agg.no_answer += 1;
        }
        if event.disposition == VOICEMAIL_OUTCOME {
            agg.voicemail += 1;
        }
    }

    let mut trends = WeeklyTrends::default();
    for ((year, week), agg) in by_week {
        trends.weeks.push(format!("{year}-W{week:02}"));
        trends.total_calls.push(agg.total);
        trends.connected_calls.push(agg.connected);
        trends.voicemail_calls.push(agg.voicemail);
        trends.no_answer_calls.push(agg.no_answer);
    }
    trends
}

// ---------------------------------------------------------------------------
// Attempt distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct AttemptDistribution {
    pub attempt_counts: Vec<i64>,
    pub contact_counts: Vec<usize>,
}

/// Contacts per distinct attempt count, ascending, optionally filtered by a
/// case-insensitive list-name substring.
pub fn attempt_distribution(roster: &RosterTable, list_name: Option<&str>) -> AttemptDistribution {
    if roster.is_empty() || !roster.has_attempt_counts {
        return AttemptDistribution::default();
    }

    let needle = list_name.map(str::to_lowercase);
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for contact in &roster.contacts {
        if let Some(ref needle) = needle {
            if !contact.list_name.to_lowercase().contains(needle) {
                continue;
            }
        }
        *counts.entry(contact.attempt_count).or_insert(0) += 1;
    }

    let mut distribution = AttemptDistribution::default();
    for (attempts, contacts) in counts {
        distribution.attempt_counts.push(attempts);
        distribution.contact_counts.push(contacts);
    }
    distribution
}

// ---------------------------------------------------------------------------
// Cooldown metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CooldownMetrics {
    pub cooldown_contacts: usize,
    pub cooldown_days: i64,
    pub reattempt_date: String,
    pub max_attempts: i64,
}

pub fn cooldown_metrics(
    roster: &RosterTable,
    config: &EngineConfig,
    now: NaiveDate,
) -> CooldownMetrics {
    let cooldown_contacts = if roster.has_attempt_counts {
        contacts_in_cooldown(roster, config)
    } else {
        0
    };
    let reattempt_date = now + Duration::days(config.cooldown_days);

    CooldownMetrics {
        cooldown_contacts,
        cooldown_days: config.cooldown_days,
        reattempt_date: reattempt_date.format("%Y-%m-%d").to_string(),
        max_attempts: config.max_attempts,
    }
}

// ---------------------------------------------------------------------------
// Data hygiene
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataHygiene {
    pub total_validated: usize,
    pub reachable_count: usize,
    pub invalid_count: usize,
    pub invalid_pct: f64,
    pub validated_dialed_count: usize,
    pub validated_dialed_pct: f64,
}

/// Reachability ratios for the validation feed, plus how much of it the call
/// log actually exercised (inner-join pair count on the phone key).
pub fn data_hygiene_metrics(validation: &ValidationTable, call_log: &CallLogTable) -> DataHygiene {
    if validation.is_empty() {
        return DataHygiene::default();
    }

    let total_validated = validation.len();
    let reachable_count = validation.records.iter().filter(|r| r.is_reachable).count();
    let invalid_count = total_validated - reachable_count;

    let mut calls_per_key: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &call_log.events {
        if let Some(key) = event.phone_key.as_deref() {
            *calls_per_key.entry(key).or_insert(0) += 1;
        }
    }
    let validated_dialed_count: usize = validation
        .records
        .iter()
        .filter_map(|r| r.phone_key.as_deref())
        .map(|key| calls_per_key.get(key).copied().unwrap_or(0))
        .sum();

    let pct = |part: usize| {
        if total_validated > 0 {
            round2(part as f64 / total_validated as f64 * 100.0)
        } else {
            0.0
        }
    };

    DataHygiene {
        total_validated,
        reachable_count,
        invalid_count,
        invalid_pct: pct(invalid_count),
        validated_dialed_count,
        validated_dialed_pct: pct(validated_dialed_count),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
