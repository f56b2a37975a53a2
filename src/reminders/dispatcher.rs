use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::{Database, MarkOutcome, Reminder};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Selects due reminders and records their delivery.
///
/// Nothing is cached between calls: every `get_due_reminders` re-runs the
/// due predicate against the store.
#[derive(Clone)]
pub struct ReminderDispatcher {
    db: Database,
}

impl ReminderDispatcher {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Undelivered reminders with `scheduled_time <= now`, in store order.
    pub async fn get_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let due = self.db.get_due_reminders(now).await?;
        log_info!("{} reminder(s) due as of {}", due.len(), now.to_rfc3339());
        Ok(due)
    }

    /// Mark one reminder delivered. Already-delivered is a no-op
    /// (`AlreadyDelivered`); an unknown id yields `NotFound`. Neither is an error.
    pub async fn mark_delivered(&self, row_id: i64) -> Result<MarkOutcome> {
        self.mark_delivered_at(row_id, Utc::now()).await
    }

    pub async fn mark_delivered_at(
        &self,
        row_id: i64,
        delivered_at: DateTime<Utc>,
    ) -> Result<MarkOutcome> {
        let outcome = self.db.mark_reminder_delivered(row_id, delivered_at).await?;
        if outcome != MarkOutcome::Marked {
            log_warn!("Reminder {row_id} not marked: {}", outcome.as_str());
        }
        Ok(outcome)
    }
}
