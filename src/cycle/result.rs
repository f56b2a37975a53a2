//! Output of one monitoring cycle.
//!
//! Nothing here is persisted; the only durable effect of a cycle is the
//! delivery marks written by the reminder phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{MarkOutcome, Reminder};
use crate::detection::SafetyOutcome;
use crate::vitals::VitalsOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchedReminder {
    pub reminder: Reminder,
    /// `AlreadyDelivered` here means another coordinator claimed it between
    /// the due query and the mark.
    pub outcome: MarkOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryNote {
    pub prompt: String,
    pub text: String,
    /// True when the advisor errored and `text` holds the error instead.
    pub failed: bool,
}

/// Phase outputs in execution order: safety, reminders, vitals, advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleResult {
    pub started_at: DateTime<Utc>,
    pub safety: SafetyOutcome,
    /// Every due reminder this cycle emitted, whatever the mark outcome. With
    /// several coordinators on one store only `delivered_reminders()` is safe
    /// to act on.
    pub reminders: Vec<DispatchedReminder>,
    pub vitals: VitalsOutcome,
    pub advisory: AdvisoryNote,
}

impl CycleResult {
    /// Reminders this cycle actually flipped to delivered.
    pub fn delivered_reminders(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders
            .iter()
            .filter(|d| d.outcome == MarkOutcome::Marked)
            .map(|d| &d.reminder)
    }
}
