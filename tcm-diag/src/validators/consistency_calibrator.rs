//! Consistency Calibrator
//!
//! Measures how clearly the primary candidate beats its runners-up and turns
//! that margin into a calibrated confidence.
//!
//! # Consistency
//! ```text
//! consistency = (p - max(secondary)) / p     clamped to 0.0-1.0
//! ```
//! - fewer than 2 candidates: 1.0 (nothing disagrees)
//! - p = 0: 0.0
//!
//! # Confidence
//! ```text
//! confidence = p + 0.15 * consistency + min(0.2, 0.1 * source_count)
//! ```
//! clamped to 0.1-0.98. The consistency bonus is only earned when a margin was
//! measured, i.e. with at least two candidates.
//!
//! # Fallback
//! No candidates at all: confidence 0.5, consistency 1.0, no primary label
//! (the engine substitutes the knowledge base's baseline label).

use crate::fusion::FusionOutcome;
use crate::types::Confidence;
use tracing::debug;

pub const CONSISTENCY_BONUS_WEIGHT: f64 = 0.15;
pub const SOURCE_BONUS_PER_CANDIDATE: f64 = 0.1;
pub const SOURCE_BONUS_CAP: f64 = 0.2;
pub const MIN_CONFIDENCE: Confidence = 0.1;
pub const MAX_CONFIDENCE: Confidence = 0.98;
pub const FALLBACK_CONFIDENCE: Confidence = 0.5;

/// Calibrated view of a fusion outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Primary label, `None` when fusion produced no candidates
    pub primary_label: Option<String>,
    pub confidence: Confidence,
    pub consistency_score: f64,
    /// Candidates with fused score above 0.3
    pub source_count: usize,
}

impl Calibration {
    pub fn is_fallback(&self) -> bool {
        self.primary_label.is_none()
    }
}

/// Margin between primary and best runner-up, relative to primary
pub fn consistency_score(outcome: &FusionOutcome) -> f64 {
    let Some(primary) = outcome.primary() else {
        return 1.0;
    };
    if outcome.candidates.len() < 2 {
        return 1.0;
    }

    let p = primary.fused_score;
    if p <= 0.0 {
        return 0.0;
    }

    let best_secondary = outcome
        .secondary()
        .iter()
        .map(|c| c.fused_score)
        .fold(0.0_f64, f64::max);

    ((p - best_secondary) / p).clamp(0.0, 1.0)
}

/// Calibrate confidence for a fusion outcome
pub fn calibrate(outcome: &FusionOutcome) -> Calibration {
    let Some(primary) = outcome.primary() else {
        debug!("No fused candidates, using fallback confidence {}", FALLBACK_CONFIDENCE);
        return Calibration {
            primary_label: None,
            confidence: FALLBACK_CONFIDENCE,
            consistency_score: 1.0,
            source_count: 0,
        };
    };

    let consistency = consistency_score(outcome);
    let source_count = outcome.source_count();

    let consistency_bonus = if outcome.candidates.len() >= 2 {
        consistency * CONSISTENCY_BONUS_WEIGHT
    } else {
        0.0
    };
    let source_bonus = (source_count as f64 * SOURCE_BONUS_PER_CANDIDATE).min(SOURCE_BONUS_CAP);

    let confidence =
        (primary.fused_score + consistency_bonus + source_bonus).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);

    debug!(
        "Calibrated '{}': fused={:.4}, consistency={:.4}, sources={}, confidence={:.4}",
        primary.label, primary.fused_score, consistency, source_count, confidence
    );

    Calibration {
        primary_label: Some(primary.label.clone()),
        confidence,
        consistency_score: consistency,
        source_count,
    }
}
