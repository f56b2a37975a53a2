use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled reminder. `delivered` flips to true once and never reverts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub row_id: i64,
    pub device_id: Option<String>,
    pub reminder_type: String,
    pub scheduled_time: DateTime<Utc>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Reminder {
    pub fn new(row_id: i64, reminder_type: &str, scheduled_time: DateTime<Utc>) -> Self {
        Self {
            row_id,
            device_id: None,
            reminder_type: reminder_type.to_string(),
            scheduled_time,
            delivered: false,
            delivered_at: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.delivered && self.scheduled_time <= now
    }
}

/// Result of a conditional delivery mark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MarkOutcome {
    /// This call flipped `delivered` from false to true.
    Marked,
    /// The reminder was already delivered; nothing changed.
    AlreadyDelivered,
    /// No reminder with that row id exists.
    NotFound,
}

impl MarkOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkOutcome::Marked => "marked",
            MarkOutcome::AlreadyDelivered => "already delivered",
            MarkOutcome::NotFound => "not found",
        }
    }
}
