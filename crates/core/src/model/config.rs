use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed per-session configuration edited by the facilitator UI.
///
/// The request layer derives the countdown duration and team count from the
/// named fields; anything else the editor stores (colors, layout tweaks, …)
/// is preserved verbatim in `extra` so a round trip through the engine never
/// drops unknown keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionConfig {
    /// Total countdown length in seconds (minutes and seconds fields added).
    /// Saturates instead of overflowing on absurd stored values.
    #[must_use]
    pub fn countdown_duration_seconds(&self) -> u32 {
        self.countdown_minutes
            .unwrap_or(0)
            .saturating_mul(60)
            .saturating_add(self.countdown_seconds.unwrap_or(0))
    }

    /// Number of teams starting the exercise, 0 when unset.
    #[must_use]
    pub fn starting_team_count(&self) -> u32 {
        self.team_count.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_combines_minutes_and_seconds() {
        let config = SessionConfig {
            countdown_minutes: Some(10),
            countdown_seconds: Some(30),
            ..SessionConfig::default()
        };
        assert_eq!(config.countdown_duration_seconds(), 630);
        assert_eq!(config.starting_team_count(), 0);
    }

    #[test]
    fn duration_saturates_on_absurd_values() {
        let config = SessionConfig {
            countdown_minutes: Some(u32::MAX),
            countdown_seconds: Some(u32::MAX),
            ..SessionConfig::default()
        };
        assert_eq!(config.countdown_duration_seconds(), u32::MAX);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = r##"{"countdown_minutes": 45, "team_count": 8, "accent_color": "#ff0066"}"##;
        let config: SessionConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.countdown_duration_seconds(), 2700);
        assert_eq!(config.starting_team_count(), 8);
        assert_eq!(
            config.extra.get("accent_color").and_then(Value::as_str),
            Some("#ff0066")
        );

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back.get("accent_color").and_then(Value::as_str), Some("#ff0066"));
    }
}
