use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, VitalsRecord};
use crate::vitals::thresholds::VitalsThresholds;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VitalField {
    HeartRate,
    GlucoseLevel,
    OxygenSaturation,
}

impl VitalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalField::HeartRate => "heart rate",
            VitalField::GlucoseLevel => "glucose level",
            VitalField::OxygenSaturation => "oxygen saturation",
        }
    }
}

/// A reading that could not be read as a finite number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseFailure {
    pub field: VitalField,
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VitalsAlert {
    AbnormalHeartRate { value: f64 },
    HighGlucose { value: f64 },
    LowOxygenSaturation { value: f64 },
    /// One alert covering every field that failed to parse.
    ParseError { failures: Vec<ParseFailure> },
}

impl VitalsAlert {
    pub fn message(&self) -> String {
        match self {
            VitalsAlert::AbnormalHeartRate { value } => format!("Abnormal heart rate ({value} bpm)"),
            VitalsAlert::HighGlucose { value } => format!("High glucose level ({value} mg/dL)"),
            VitalsAlert::LowOxygenSaturation { value } => {
                format!("Low oxygen saturation ({value}%)")
            }
            VitalsAlert::ParseError { failures } => {
                let fields: Vec<String> = failures
                    .iter()
                    .map(|f| match &f.raw {
                        Some(raw) => format!("{} '{raw}'", f.field.as_str()),
                        None => format!("{} missing", f.field.as_str()),
                    })
                    .collect();
                format!("Vitals parsing error: {}", fields.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VitalsOutcome {
    /// The vitals table is empty.
    NoData,
    Normal {
        recorded_at: DateTime<Utc>,
    },
    Alerts {
        recorded_at: DateTime<Utc>,
        alerts: Vec<VitalsAlert>,
    },
}

impl VitalsOutcome {
    pub fn alerts(&self) -> &[VitalsAlert] {
        match self {
            VitalsOutcome::Alerts { alerts, .. } => alerts.as_slice(),
            _ => &[],
        }
    }

    /// Display lines in the order the checks ran.
    pub fn messages(&self) -> Vec<String> {
        match self {
            VitalsOutcome::NoData => vec!["No health data available".to_string()],
            VitalsOutcome::Normal { .. } => vec!["Vitals normal".to_string()],
            VitalsOutcome::Alerts { alerts, .. } => alerts.iter().map(VitalsAlert::message).collect(),
        }
    }
}

fn parse_field(field: VitalField, raw: Option<&str>) -> Result<f64, ParseFailure> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseFailure {
            field,
            raw: raw.map(str::to_string),
        })
}

/// Apply the threshold rules to one record.
///
/// Each field is parsed on its own; a bad reading in one field never stops
/// the other rules from running.
pub fn evaluate(record: &VitalsRecord, thresholds: &VitalsThresholds) -> VitalsOutcome {
    let heart_rate = parse_field(VitalField::HeartRate, record.heart_rate.as_deref());
    let glucose = parse_field(VitalField::GlucoseLevel, record.glucose_level.as_deref());
    let oxygen = parse_field(
        VitalField::OxygenSaturation,
        record.oxygen_saturation.as_deref(),
    );

    let mut alerts = Vec::new();
    let mut failures = Vec::new();

    match heart_rate {
        Ok(value) if value < thresholds.heart_rate_low || value > thresholds.heart_rate_high => {
            alerts.push(VitalsAlert::AbnormalHeartRate { value });
        }
        Ok(_) => {}
        Err(failure) => failures.push(failure),
    }

    match glucose {
        Ok(value) if value > thresholds.glucose_high => {
            alerts.push(VitalsAlert::HighGlucose { value });
        }
        Ok(_) => {}
        Err(failure) => failures.push(failure),
    }

    match oxygen {
        Ok(value) if value < thresholds.oxygen_saturation_low => {
            alerts.push(VitalsAlert::LowOxygenSaturation { value });
        }
        Ok(_) => {}
        Err(failure) => failures.push(failure),
    }

    if !failures.is_empty() {
        alerts.push(VitalsAlert::ParseError { failures });
    }

    if alerts.is_empty() {
        VitalsOutcome::Normal {
            recorded_at: record.timestamp,
        }
    } else {
        VitalsOutcome::Alerts {
            recorded_at: record.timestamp,
            alerts,
        }
    }
}

#[derive(Clone)]
pub struct VitalsEvaluator {
    db: Database,
    thresholds: VitalsThresholds,
}

impl VitalsEvaluator {
    pub fn new(db: Database, thresholds: VitalsThresholds) -> Self {
        Self { db, thresholds }
    }

    pub async fn check_latest_vitals(&self) -> Result<VitalsOutcome> {
        let Some(record) = self.db.get_latest_vitals().await? else {
            log_warn!("No vitals recorded yet");
            return Ok(VitalsOutcome::NoData);
        };

        let outcome = evaluate(&record, &self.thresholds);
        log_info!(
            "Vitals record {} evaluated: {} alert(s)",
            record.row_id,
            outcome.alerts().len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::db::test_support::test_db;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 12, 10, 0, 0).unwrap()
    }

    fn alerts_for(heart_rate: f64, glucose: f64, oxygen: f64) -> Vec<VitalsAlert> {
        let record = VitalsRecord::new(1, at(), heart_rate, glucose, oxygen);
        evaluate(&record, &VitalsThresholds::default())
            .alerts()
            .to_vec()
    }

    #[test]
    fn heart_rate_bounds_are_exclusive() {
        assert!(alerts_for(50.0, 120.0, 97.0).is_empty());
        assert!(alerts_for(100.0, 120.0, 97.0).is_empty());
        assert_eq!(
            alerts_for(49.0, 120.0, 97.0),
            vec![VitalsAlert::AbnormalHeartRate { value: 49.0 }]
        );
        assert_eq!(
            alerts_for(101.0, 120.0, 97.0),
            vec![VitalsAlert::AbnormalHeartRate { value: 101.0 }]
        );
    }

    #[test]
    fn glucose_bound_is_exclusive() {
        assert!(alerts_for(70.0, 180.0, 97.0).is_empty());
        assert_eq!(
            alerts_for(70.0, 181.0, 97.0),
            vec![VitalsAlert::HighGlucose { value: 181.0 }]
        );
    }

    #[test]
    fn oxygen_bound_is_exclusive() {
        assert!(alerts_for(70.0, 120.0, 92.0).is_empty());
        assert_eq!(
            alerts_for(70.0, 120.0, 91.0),
            vec![VitalsAlert::LowOxygenSaturation { value: 91.0 }]
        );
    }

    #[test]
    fn low_heart_rate_alone_yields_one_alert() {
        assert_eq!(
            alerts_for(45.0, 150.0, 95.0),
            vec![VitalsAlert::AbnormalHeartRate { value: 45.0 }]
        );
    }

    #[test]
    fn normal_record_reports_normal() {
        let record = VitalsRecord::new(1, at(), 72.0, 110.0, 98.0);
        let outcome = evaluate(&record, &VitalsThresholds::default());
        assert_eq!(outcome, VitalsOutcome::Normal { recorded_at: at() });
        assert_eq!(outcome.messages(), vec!["Vitals normal".to_string()]);
    }

    #[test]
    fn parse_failure_does_not_block_other_fields() {
        let mut record = VitalsRecord::new(1, at(), 72.0, 250.0, 88.0);
        record.heart_rate = Some("irregular".into());

        let outcome = evaluate(&record, &VitalsThresholds::default());
        assert_eq!(
            outcome.alerts(),
            &[
                VitalsAlert::HighGlucose { value: 250.0 },
                VitalsAlert::LowOxygenSaturation { value: 88.0 },
                VitalsAlert::ParseError {
                    failures: vec![ParseFailure {
                        field: VitalField::HeartRate,
                        raw: Some("irregular".into()),
                    }],
                },
            ]
        );
    }

    #[test]
    fn multiple_parse_failures_collapse_into_one_alert() {
        let mut record = VitalsRecord::new(1, at(), 72.0, 110.0, 98.0);
        record.glucose_level = None;
        record.oxygen_saturation = Some("--".into());

        let outcome = evaluate(&record, &VitalsThresholds::default());
        assert_eq!(outcome.alerts().len(), 1);
        let message = outcome.alerts()[0].message();
        assert!(message.starts_with("Vitals parsing error"));
        assert!(message.contains("glucose level missing"));
        assert!(message.contains("oxygen saturation '--'"));
    }

    #[test]
    fn custom_thresholds_apply() {
        let thresholds = VitalsThresholds {
            glucose_high: 140.0,
            ..VitalsThresholds::default()
        };
        let record = VitalsRecord::new(1, at(), 72.0, 150.0, 98.0);
        assert_eq!(
            evaluate(&record, &thresholds).alerts(),
            &[VitalsAlert::HighGlucose { value: 150.0 }]
        );
    }

    #[tokio::test]
    async fn empty_table_yields_no_data() {
        let evaluator = VitalsEvaluator::new(test_db(), VitalsThresholds::default());
        let outcome = evaluator.check_latest_vitals().await.expect("check");
        assert_eq!(outcome, VitalsOutcome::NoData);
        assert_eq!(outcome.messages(), vec!["No health data available".to_string()]);
    }

    #[tokio::test]
    async fn only_the_latest_record_is_evaluated() {
        let db = test_db();
        let evaluator = VitalsEvaluator::new(db.clone(), VitalsThresholds::default());
        db.upsert_vitals(&[
            VitalsRecord::new(1, at(), 30.0, 400.0, 80.0),
            VitalsRecord::new(2, at() + chrono::Duration::minutes(5), 72.0, 110.0, 98.0),
        ])
        .await
        .expect("seed");

        let outcome = evaluator.check_latest_vitals().await.expect("check");
        assert!(matches!(outcome, VitalsOutcome::Normal { .. }));
    }
}
