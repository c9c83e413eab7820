//! Cooldown evaluation: which roster contacts have exhausted their attempt
//! budget, and what a reattempt pass after the cooldown window could yield.
//!
//! Membership is recomputed from the roster snapshot on every call; nothing
//! is persisted between evaluations.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::model::{RosterContact, RosterTable};

/// Share of cooled-down contacts expected to connect or reach voicemail on
/// reattempt. A placeholder target, not a measurement from historical
/// reattempt outcomes.
pub const REATTEMPT_TARGET_RATE: f64 = 0.15;

/// Owner placeholder attached to cooldown entries until assignment exists.
pub const COOLDOWN_OWNER: &str = "System";

const FEED_STATUS: &str = "In Cooldown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactState {
    Active,
    InCooldown,
}

pub fn contact_state(contact: &RosterContact, config: &EngineConfig) -> ContactState {
    if contact.attempt_count >= config.max_attempts {
        ContactState::InCooldown
    } else {
        ContactState::Active
    }
}

/// A roster contact held out of dialing, with its cooldown window attached.
#[derive(Debug, Clone, Serialize)]
pub struct CooldownContact {
    pub phone_number: Option<String>,
    pub list_name: String,
    pub attempt_count: i64,
    pub cooldown_start: NaiveDate,
    pub cooldown_end: NaiveDate,
    pub owner: String,
    pub review_date: NaiveDate,
}

/// The `InCooldown` subset of the roster. A roster without an attempt-count
/// field has no basis for cooldown membership and yields an empty list.
pub fn identify_cooldown_contacts(
    roster: &RosterTable,
    config: &EngineConfig,
    now: NaiveDate,
) -> Vec<CooldownContact> {
    if !roster.has_attempt_counts {
        return Vec::new();
    }

    let cooldown_end = now + Duration::days(config.cooldown_days);
    roster
        .contacts
        .iter()
        .filter(|c| contact_state(c, config) == ContactState::InCooldown)
        .map(|c| CooldownContact {
            phone_number: c.phone_number.clone(),
            list_name: c.list_name.clone(),
            attempt_count: c.attempt_count,
            cooldown_start: now,
            cooldown_end,
            owner: COOLDOWN_OWNER.to_string(),
            review_date: cooldown_end,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ReattemptProjection {
    pub cooldown_contacts_count: usize,
    pub reattempt_potential: usize,
    pub target_kpi: f64,
    pub cooldown_days: i64,
    pub cooldown_contacts: Vec<Value>,
}

/// Projected reattempt yield at the default target rate.
pub fn reattempt_potential(
    roster: &RosterTable,
    config: &EngineConfig,
    now: NaiveDate,
) -> ReattemptProjection {
    reattempt_potential_with_rate(roster, config, now, REATTEMPT_TARGET_RATE)
}

/// Same projection with an explicit target rate, so the formula can be
/// exercised independently of the placeholder constant.
pub fn reattempt_potential_with_rate(
    roster: &RosterTable,
    config: &EngineConfig,
    now: NaiveDate,
    target_rate: f64,
) -> ReattemptProjection {
    let contacts = identify_cooldown_contacts(roster, config, now);
    let count = contacts.len();

    ReattemptProjection {
        cooldown_contacts_count: count,
        reattempt_potential: (count as f64 * target_rate).floor() as usize,
        target_kpi: target_rate * 100.0,
        cooldown_days: config.cooldown_days,
        cooldown_contacts: contacts
            .iter()
            .map(|c| {
                json!({
                    "phone_number": c.phone_number,
                    "list_name": c.list_name,
                    "attempt_count": c.attempt_count,
                    "cooldown_end": c.cooldown_end.format("%Y-%m-%d").to_string(),
                    "owner": c.owner,
                })
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CooldownFeedEntry {
    pub phone_number: Option<String>,
    pub list_name: String,
    pub attempt_count: i64,
    pub cooldown_start: String,
    pub cooldown_end: String,
    pub owner: String,
    pub review_date: String,
    pub status: String,
}

/// Reviewer-facing feed of every contact currently in cooldown.
pub fn cooldown_feed(
    roster: &RosterTable,
    config: &EngineConfig,
    now: NaiveDate,
) -> Vec<CooldownFeedEntry> {
    identify_cooldown_contacts(roster, config, now)
        .into_iter()
        .map(|c| CooldownFeedEntry {
            phone_number: c.phone_number,
            list_name: c.list_name,
            attempt_count: c.attempt_count,
            cooldown_start: c.cooldown_start.format("%Y-%m-%d").to_string(),
            cooldown_end: c.cooldown_end.format("%Y-%m-%d").to_string(),
            owner: c.owner,
            review_date: c.review_date.format("%Y-%m-%d").to_string(),
            status: FEED_STATUS.to_string(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
