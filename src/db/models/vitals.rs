//! Health vitals data model.
//!
//! Readings are kept as stored text so a malformed value surfaces as a parse
//! failure at evaluation time instead of failing the whole row load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalsRecord {
    pub row_id: i64,
    pub device_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: Option<String>,
    pub glucose_level: Option<String>,
    pub oxygen_saturation: Option<String>,
}

impl VitalsRecord {
    pub fn new(
        row_id: i64,
        timestamp: DateTime<Utc>,
        heart_rate: f64,
        glucose_level: f64,
        oxygen_saturation: f64,
    ) -> Self {
        Self {
            row_id,
            device_id: None,
            timestamp,
            heart_rate: Some(heart_rate.to_string()),
            glucose_level: Some(glucose_level.to_string()),
            oxygen_saturation: Some(oxygen_saturation.to_string()),
        }
    }
}
