pub mod evaluator;
pub mod thresholds;

pub use evaluator::{evaluate, ParseFailure, VitalField, VitalsAlert, VitalsEvaluator, VitalsOutcome};
pub use thresholds::VitalsThresholds;
