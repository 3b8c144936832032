//! Multi-Source Fusion
//!
//! Combines independent per-algorithm `(label, confidence)` votes into one
//! scored ranking of labels.
//!
//! # Fusion Strategy
//! 1. Group votes by proposed label
//! 2. Score each label with the confidence-weighted mean of its confidences
//! 3. Rank labels by fused score, descending
//!
//! # Confidence-Weighted Mean
//! Confidences act as both values and weights, so strong votes dominate more
//! than under a plain arithmetic mean:
//! ```text
//! fused = (c1² + c2² + ... + cN²) / (c1 + c2 + ... + cN)
//! ```
//! A label whose votes all carry zero confidence fuses to 0.0.
//!
//! # Example
//! ```rust,ignore
//! use tcm_diag::fusion::fuse_votes;
//! use tcm_diag::types::AlgorithmResult;
//!
//! let votes = vec![
//!     AlgorithmResult::new("tongue", "气虚质", 0.6),
//!     AlgorithmResult::new("pulse", "气虚质", 0.9),
//! ];
//! let outcome = fuse_votes(&votes);
//! // (0.36 + 0.81) / 1.5 = 0.78
//! assert_eq!(outcome.primary().unwrap().label, "气虚质");
//! ```

use crate::types::{AlgorithmResult, FusedCandidate};
use tracing::debug;

/// Maximum number of runner-up candidates reported
pub const MAX_SECONDARY: usize = 3;

/// Fused score above which a candidate counts as a supporting source
pub const SOURCE_SCORE_THRESHOLD: f64 = 0.3;

/// Ranked fusion output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusionOutcome {
    /// All fused candidates, score descending
    pub candidates: Vec<FusedCandidate>,
}

impl FusionOutcome {
    /// Top-ranked candidate
    pub fn primary(&self) -> Option<&FusedCandidate> {
        self.candidates.first()
    }

    /// Up to three runner-up candidates
    pub fn secondary(&self) -> &[FusedCandidate] {
        let end = self.candidates.len().min(1 + MAX_SECONDARY);
        self.candidates.get(1..end).unwrap_or(&[])
    }

    /// Number of candidates whose fused score exceeds 0.3
    pub fn source_count(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.fused_score > SOURCE_SCORE_THRESHOLD)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Fuse votes into a ranked candidate list
///
/// Ties keep the order in which labels first appear among the votes.
pub fn fuse_votes<'a, I>(votes: I) -> FusionOutcome
where
    I: IntoIterator<Item = &'a AlgorithmResult>,
{
    // Vec keeps first-appearance order for the stable tie-break
    let mut grouped: Vec<(String, Vec<f64>)> = Vec::new();
    let mut vote_count = 0usize;

    for vote in votes {
        vote_count += 1;
        match grouped.iter_mut().find(|(label, _)| *label == vote.label) {
            Some((_, confidences)) => confidences.push(vote.confidence),
            None => grouped.push((vote.label.clone(), vec![vote.confidence])),
        }
    }

    let mut candidates: Vec<FusedCandidate> = grouped
        .into_iter()
        .map(|(label, confidences)| FusedCandidate {
            fused_score: confidence_weighted_mean(&confidences),
            label,
        })
        .collect();

    candidates.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));

    debug!(
        "Fused {} votes into {} candidates (primary: {:?})",
        vote_count,
        candidates.len(),
        candidates.first().map(|c| c.label.as_str())
    );

    FusionOutcome { candidates }
}

/// `Σc² / Σc`, or 0.0 when the confidences sum to zero
pub fn confidence_weighted_mean(confidences: &[f64]) -> f64 {
    let sum: f64 = confidences.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    let sum_sq: f64 = confidences.iter().map(|c| c * c).sum();
    sum_sq / sum
}
