pub mod config;
pub mod detector;
pub mod forest;

pub use config::DetectionConfig;
pub use detector::{detect_in_events, AnomalyDetector, AnomalyResult, SafetyOutcome};
pub use forest::IsolationForest;
