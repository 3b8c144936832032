//! Post-fusion validation layer
//!
//! # Validators
//! 1. **consistency_calibrator** - margin between top candidates, calibrated confidence
//! 2. **quality_scorer** - estimated accuracy of the final diagnosis

pub mod consistency_calibrator;
pub mod quality_scorer;

pub use consistency_calibrator::{calibrate, consistency_score, Calibration};
pub use quality_scorer::accuracy_score;
