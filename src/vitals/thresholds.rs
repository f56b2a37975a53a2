use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Clinical limits. Each bound is exclusive: a reading equal to the limit is normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VitalsThresholds {
    /// Beats per minute below this are abnormal.
    pub heart_rate_low: f64,
    /// Beats per minute above this are abnormal.
    pub heart_rate_high: f64,
    /// mg/dL above this is high.
    pub glucose_high: f64,
    /// SpO2 percent below this is low.
    pub oxygen_saturation_low: f64,
}

impl Default for VitalsThresholds {
    fn default() -> Self {
        Self {
            heart_rate_low: 50.0,
            heart_rate_high: 100.0,
            glucose_high: 180.0,
            oxygen_saturation_low: 92.0,
        }
    }
}

impl VitalsThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.heart_rate_low > self.heart_rate_high {
            bail!(
                "heart rate low bound ({}) exceeds high bound ({})",
                self.heart_rate_low,
                self.heart_rate_high
            );
        }
        let all = [
            self.heart_rate_low,
            self.heart_rate_high,
            self.glucose_high,
            self.oxygen_saturation_low,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            bail!("vitals thresholds must be finite numbers");
        }
        Ok(())
    }
}
