use serde::{Deserialize, Serialize};

/// Tunables for the inactivity-duration outlier model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Fewer valid durations than this and no model is fit.
    pub min_samples: usize,

    /// Expected share of outliers; sets the decision boundary.
    pub contamination: f64,

    /// Number of isolation trees in the ensemble.
    pub n_trees: usize,

    /// Sub-sample size drawn (without replacement) for each tree.
    pub max_samples: usize,

    /// Fixed RNG seed for reproducible fits. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            contamination: 0.01,
            n_trees: 100,
            max_samples: 256,
            seed: None,
        }
    }
}
