use anyhow::{Context, Result};
use rusqlite::{params, types::Value, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, value_to_text},
    models::VitalsRecord,
};

fn row_to_vitals(row: &Row) -> Result<VitalsRecord> {
    let timestamp: String = row.get("timestamp")?;

    Ok(VitalsRecord {
        row_id: row.get("row_id")?,
        device_id: row.get("device_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        heart_rate: value_to_text(row.get::<_, Value>("heart_rate")?),
        glucose_level: value_to_text(row.get::<_, Value>("glucose_level")?),
        oxygen_saturation: value_to_text(row.get::<_, Value>("oxygen_saturation")?),
    })
}

impl Database {
    /// Insert-or-replace a batch of vitals records keyed by `row_id`.
    pub async fn upsert_vitals(&self, records: &[VitalsRecord]) -> Result<()> {
        let records = records.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            for record in &records {
                tx.execute(
                    "INSERT OR REPLACE INTO vitals (
                        row_id,
                        device_id,
                        timestamp,
                        heart_rate,
                        glucose_level,
                        oxygen_saturation
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record.row_id,
                        record.device_id,
                        format_datetime(&record.timestamp),
                        record.heart_rate,
                        record.glucose_level,
                        record.oxygen_saturation,
                    ],
                )
                .with_context(|| format!("failed to upsert vitals {}", record.row_id))?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// The most recent vitals record by timestamp, if any.
    pub async fn get_latest_vitals(&self) -> Result<Option<VitalsRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    row_id,
                    device_id,
                    timestamp,
                    heart_rate,
                    glucose_level,
                    oxygen_saturation
                FROM vitals
                ORDER BY timestamp DESC, row_id DESC
                LIMIT 1",
            )?;

            let mut rows = stmt.query(params![])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_vitals(row)?)),
                None => Ok(None),
            }
        })
        .await
        .context("failed to load latest vitals")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::db::{test_support::test_db, VitalsRecord};

    #[tokio::test]
    async fn empty_table_has_no_latest_record() {
        let db = test_db();
        assert!(db.get_latest_vitals().await.expect("latest").is_none());
    }

    #[tokio::test]
    async fn latest_is_chosen_by_timestamp_not_insert_order() {
        let db = test_db();
        let at = Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap();

        let newest = VitalsRecord::new(1, at + Duration::hours(2), 72.0, 110.0, 97.0);
        let older = VitalsRecord::new(2, at, 45.0, 150.0, 95.0);
        db.upsert_vitals(&[newest.clone(), older]).await.expect("upsert");

        let latest = db.get_latest_vitals().await.expect("latest").expect("some");
        assert_eq!(latest.row_id, 1);
        assert_eq!(latest.heart_rate.as_deref(), Some("72"));
    }

    #[tokio::test]
    async fn non_numeric_readings_survive_storage() {
        let db = test_db();
        let mut record = VitalsRecord::new(1, Utc::now(), 80.0, 120.0, 97.5);
        record.glucose_level = Some("sensor error".into());
        record.oxygen_saturation = None;
        db.upsert_vitals(&[record]).await.expect("upsert");

        let latest = db.get_latest_vitals().await.expect("latest").expect("some");
        assert_eq!(latest.heart_rate.as_deref(), Some("80"));
        assert_eq!(latest.glucose_level.as_deref(), Some("sensor error"));
        assert_eq!(latest.oxygen_saturation, None);
    }
}
