use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::db::{Database, SafetyEvent};
use crate::detection::{config::DetectionConfig, forest::IsolationForest};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// A safety event the model flagged as an outlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub row_id: i64,
    pub timestamp: DateTime<Utc>,
    pub inactivity_duration: f64,
    pub location: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SafetyOutcome {
    /// Model was fit; `anomalies` may be empty.
    Anomalies { anomalies: Vec<AnomalyResult> },
    /// Too few numeric durations to fit a model.
    InsufficientData { valid_samples: usize, required: usize },
}

impl SafetyOutcome {
    pub fn anomalies(&self) -> Option<&[AnomalyResult]> {
        match self {
            SafetyOutcome::Anomalies { anomalies } => Some(anomalies.as_slice()),
            SafetyOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Flags unusually long (or short) post-fall inactivity.
///
/// No model state is kept: every call loads the full table and fits a new
/// forest from scratch.
#[derive(Clone)]
pub struct AnomalyDetector {
    db: Database,
    config: DetectionConfig,
}

impl AnomalyDetector {
    pub fn new(db: Database, config: DetectionConfig) -> Self {
        Self { db, config }
    }

    pub async fn detect_anomalies(&self) -> Result<SafetyOutcome> {
        let events = self.db.get_safety_events().await?;
        let config = self.config.clone();

        let outcome = tokio::task::spawn_blocking(move || detect_in_events(&events, &config))
            .await
            .map_err(|err| anyhow!("anomaly fit task panicked: {err}"))??;

        match &outcome {
            SafetyOutcome::Anomalies { anomalies } => {
                log_info!("Safety check flagged {} anomalous event(s)", anomalies.len());
            }
            SafetyOutcome::InsufficientData {
                valid_samples,
                required,
            } => {
                log_warn!(
                    "Safety check skipped: {valid_samples} valid duration(s), need {required}"
                );
            }
        }

        Ok(outcome)
    }
}

/// Fit and score over an in-memory slice of events, preserving their order.
pub fn detect_in_events(events: &[SafetyEvent], config: &DetectionConfig) -> Result<SafetyOutcome> {
    let valid: Vec<(&SafetyEvent, f64)> = events
        .iter()
        .filter_map(|event| event.inactivity_secs().map(|secs| (event, secs)))
        .collect();

    if valid.len() < config.min_samples {
        return Ok(SafetyOutcome::InsufficientData {
            valid_samples: valid.len(),
            required: config.min_samples,
        });
    }

    let samples: Vec<f64> = valid.iter().map(|(_, secs)| *secs).collect();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let forest = IsolationForest::fit(&samples, config, &mut rng)
        .context("failed to fit inactivity model")?;

    let anomalies = valid
        .into_iter()
        .filter_map(|(event, secs)| {
            let score = forest.score(secs);
            (score > forest.threshold()).then(|| AnomalyResult {
                row_id: event.row_id,
                timestamp: event.timestamp,
                inactivity_duration: secs,
                location: event.location.clone(),
                score,
            })
        })
        .collect();

    Ok(SafetyOutcome::Anomalies { anomalies })
}
