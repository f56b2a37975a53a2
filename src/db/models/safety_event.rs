//! Safety-monitoring event data model.
//!
//! One row per fall/inactivity observation. Rows are immutable once stored;
//! the inactivity duration is kept exactly as the device reported it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetyEvent {
    pub row_id: i64,
    pub device_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Post-fall inactivity in seconds, as stored. May be missing or non-numeric.
    pub inactivity_duration: Option<String>,
    pub location: String,
    pub movement_activity: Option<String>,
    pub fall_detected: Option<bool>,
}

impl SafetyEvent {
    pub fn new(
        row_id: i64,
        timestamp: DateTime<Utc>,
        inactivity_duration: Option<&str>,
        location: &str,
    ) -> Self {
        Self {
            row_id,
            device_id: None,
            timestamp,
            inactivity_duration: inactivity_duration.map(str::to_string),
            location: location.to_string(),
            movement_activity: None,
            fall_detected: None,
        }
    }

    /// The inactivity duration as a finite number of seconds, if it parses.
    pub fn inactivity_secs(&self) -> Option<f64> {
        self.inactivity_duration
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(raw: Option<&str>) -> SafetyEvent {
        SafetyEvent::new(1, Utc::now(), raw, "Bedroom")
    }

    #[test]
    fn parses_numeric_durations() {
        assert_eq!(event(Some("120")).inactivity_secs(), Some(120.0));
        assert_eq!(event(Some(" 42.5 ")).inactivity_secs(), Some(42.5));
    }

    #[test]
    fn rejects_missing_and_non_numeric_durations() {
        assert_eq!(event(None).inactivity_secs(), None);
        assert_eq!(event(Some("")).inactivity_secs(), None);
        assert_eq!(event(Some("unknown")).inactivity_secs(), None);
        assert_eq!(event(Some("NaN")).inactivity_secs(), None);
        assert_eq!(event(Some("inf")).inactivity_secs(), None);
    }
}
