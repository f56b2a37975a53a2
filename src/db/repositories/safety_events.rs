use anyhow::{Context, Result};
use rusqlite::{params, types::Value, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, value_to_text},
    models::SafetyEvent,
};

fn row_to_safety_event(row: &Row) -> Result<SafetyEvent> {
    let timestamp: String = row.get("timestamp")?;
    let inactivity_duration: Value = row.get("inactivity_duration")?;

    Ok(SafetyEvent {
        row_id: row.get("row_id")?,
        device_id: row.get("device_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        inactivity_duration: value_to_text(inactivity_duration),
        location: row.get("location")?,
        movement_activity: row.get("movement_activity")?,
        fall_detected: row.get("fall_detected")?,
    })
}

impl Database {
    /// Insert-or-replace a batch of safety events keyed by `row_id`.
    pub async fn upsert_safety_events(&self, events: &[SafetyEvent]) -> Result<()> {
        let events = events.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            for event in &events {
                tx.execute(
                    "INSERT OR REPLACE INTO safety_events (
                        row_id,
                        device_id,
                        timestamp,
                        inactivity_duration,
                        location,
                        movement_activity,
                        fall_detected
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        event.row_id,
                        event.device_id,
                        format_datetime(&event.timestamp),
                        event.inactivity_duration,
                        event.location,
                        event.movement_activity,
                        event.fall_detected,
                    ],
                )
                .with_context(|| format!("failed to upsert safety event {}", event.row_id))?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// All safety events in store order.
    pub async fn get_safety_events(&self) -> Result<Vec<SafetyEvent>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    row_id,
                    device_id,
                    timestamp,
                    inactivity_duration,
                    location,
                    movement_activity,
                    fall_detected
                FROM safety_events
                ORDER BY row_id ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_safety_event(row)?);
            }

            Ok(events)
        })
        .await
        .context("failed to load safety events")
    }
}
