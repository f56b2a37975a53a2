use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_optional_datetime},
    models::{MarkOutcome, Reminder},
};

const REMINDER_COLUMNS: &str =
    "row_id, device_id, reminder_type, scheduled_time, delivered, delivered_at";

fn row_to_reminder(row: &Row) -> Result<Reminder> {
    let scheduled_time: String = row.get("scheduled_time")?;
    let delivered_at: Option<String> = row.get("delivered_at")?;

    Ok(Reminder {
        row_id: row.get("row_id")?,
        device_id: row.get("device_id")?,
        reminder_type: row.get("reminder_type")?,
        scheduled_time: parse_datetime(&scheduled_time, "scheduled_time")?,
        delivered: row.get("delivered")?,
        delivered_at: parse_optional_datetime(delivered_at, "delivered_at")?,
    })
}

impl Database {
    /// Insert-or-replace a batch of reminders keyed by `row_id`.
    pub async fn upsert_reminders(&self, reminders: &[Reminder]) -> Result<()> {
        let reminders = reminders.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            for reminder in &reminders {
                tx.execute(
                    "INSERT OR REPLACE INTO reminders (
                        row_id,
                        device_id,
                        reminder_type,
                        scheduled_time,
                        delivered,
                        delivered_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        reminder.row_id,
                        reminder.device_id,
                        reminder.reminder_type,
                        format_datetime(&reminder.scheduled_time),
                        reminder.delivered,
                        reminder.delivered_at.as_ref().map(format_datetime),
                    ],
                )
                .with_context(|| format!("failed to upsert reminder {}", reminder.row_id))?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Undelivered reminders scheduled at or before `now`, in store order.
    pub async fn get_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS}
                 FROM reminders
                 WHERE scheduled_time <= ?1 AND delivered = 0
                 ORDER BY row_id ASC"
            ))?;

            let mut rows = stmt.query(params![format_datetime(&now)])?;
            let mut reminders = Vec::new();
            while let Some(row) = rows.next()? {
                reminders.push(row_to_reminder(row)?);
            }

            Ok(reminders)
        })
        .await
        .context("failed to query due reminders")
    }

    pub async fn get_reminder(&self, row_id: i64) -> Result<Option<Reminder>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE row_id = ?1"
            ))?;
            let mut rows = stmt.query(params![row_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_reminder(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Flip `delivered` to true, but only if it is still false.
    ///
    /// The conditional `WHERE delivered = 0` means two writers racing on the
    /// same reminder see exactly one `Marked`. The statement autocommits
    /// before the reply is sent.
    pub async fn mark_reminder_delivered(
        &self,
        row_id: i64,
        delivered_at: DateTime<Utc>,
    ) -> Result<MarkOutcome> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE reminders
                 SET delivered = 1,
                     delivered_at = ?1
                 WHERE row_id = ?2 AND delivered = 0",
                params![format_datetime(&delivered_at), row_id],
            )?;

            if rows_affected > 0 {
                return Ok(MarkOutcome::Marked);
            }

            let exists = conn
                .query_row(
                    "SELECT 1 FROM reminders WHERE row_id = ?1",
                    params![row_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            Ok(if exists {
                MarkOutcome::AlreadyDelivered
            } else {
                MarkOutcome::NotFound
            })
        })
        .await
        .with_context(|| format!("failed to mark reminder {row_id} delivered"))
    }
}
