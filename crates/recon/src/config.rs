use serde::Deserialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Engine config
// ---------------------------------------------------------------------------

/// Campaign thresholds and outcome labels consumed by the metrics and
/// cooldown components. Every field has a default, so an empty TOML document
/// is a valid config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simultaneous dials per answer event (the "lost race" divisor).
    pub dial_at_a_time: u32,
    /// Attempt budget before a contact enters cooldown.
    pub max_attempts: i64,
    pub attempts_per_day: u32,
    /// Days a contact is held out of dialing once the budget is exhausted.
    pub cooldown_days: i64,
    /// Case-insensitive substring selecting the pilot roster slice.
    pub pilot_list_name: String,
    pub target_connect_uplift_pct: f64,
    pub success_criteria_connect_uplift_pct: f64,
    pub success_criteria_voicemail_uplift_pct: f64,
    /// Disposition labels counted as a successful contact.
    pub connect_outcomes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dial_at_a_time: 4,
            max_attempts: 10,
            attempts_per_day: 2,
            cooldown_days: 14,
            pilot_list_name: "NAICS".into(),
            target_connect_uplift_pct: 30.0,
            success_criteria_connect_uplift_pct: 25.0,
            success_criteria_voicemail_uplift_pct: 15.0,
            connect_outcomes: vec!["Connected".into(), "Left voicemail".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.dial_at_a_time == 0 {
            return Err(EngineError::ConfigValidation(
                "dial_at_a_time must be at least 1".into(),
            ));
        }
        if self.max_attempts < 1 {
            return Err(EngineError::ConfigValidation(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.connect_outcomes.is_empty() {
            return Err(EngineError::ConfigValidation(
                "connect_outcomes must name at least one disposition".into(),
            ));
        }
        Ok(())
    }

    pub fn is_connect_outcome(&self, disposition: &str) -> bool {
        self.connect_outcomes.iter().any(|o| o == disposition)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config.dial_at_a_time, 4);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.cooldown_days, 14);
        assert_eq!(config.pilot_list_name, "NAICS");
        assert!(config.is_connect_outcome("Connected"));
        assert!(config.is_connect_outcome("Left voicemail"));
        assert!(!config.is_connect_outcome("No Answer"));
    }

    #[test]
    fn parse_overrides() {
        let config = EngineConfig::from_toml(
            r#"
dial_at_a_time = 2
max_attempts = 6
cooldown_days = 7
pilot_list_name = "Northeast"
connect_outcomes = ["Connected"]
"#,
        )
        .unwrap();
        assert_eq!(config.dial_at_a_time, 2);
        assert_eq!(config.max_attempts, 6);
        assert_eq!(config.cooldown_days, 7);
        assert!(!config.is_connect_outcome("Left voicemail"));
    }

    #[test]
    fn reject_zero_dial_group() {
        let err = EngineConfig::from_toml("dial_at_a_time = 0").unwrap_err();
        assert!(err.to_string().contains("dial_at_a_time"));
    }

    #[test]
    fn reject_empty_outcome_set() {
        let err = EngineConfig::from_toml("connect_outcomes = []").unwrap_err();
        assert!(err.to_string().contains("connect_outcomes"));
    }

    #[test]
    fn reject_wrong_type() {
        assert!(EngineConfig::from_toml(r#"max_attempts = "ten""#).is_err());
    }
}
