//! Core types for the diagnostic engine
//!
//! Everything here is created per request, never mutated after construction,
//! and serializes to the JSON shapes exposed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Confidence score (0.0-1.0)
pub type Confidence = f64;

// ============================================================================
// Inputs
// ============================================================================

/// Raw feature value as supplied by upstream analyzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Numeric value, expected to be pre-scaled into 0.0-1.0
    Number(f64),
    /// Categorical token (heavenly stem, earthly branch, element, constitution)
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// One classification vote from an independent upstream algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm (modality) that produced the vote
    pub source: String,
    /// Proposed label
    pub label: String,
    /// Vote confidence (0.0-1.0)
    pub confidence: Confidence,
}

impl AlgorithmResult {
    /// Create a vote with confidence clamped into 0.0-1.0
    ///
    /// Non-finite confidences carry no information and become 0.0.
    pub fn new(source: impl Into<String>, label: impl Into<String>, confidence: Confidence) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            source: source.into(),
            label: label.into(),
            confidence,
        }
    }
}

// ============================================================================
// Normalized features
// ============================================================================

/// Provenance bucket of a feature, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    /// Birth chart (八字) data
    BirthChart,
    /// Five-movements / six-qi seasonal data
    SeasonalQi,
    /// Time-of-day meridian flow (子午流注)
    Meridian,
    /// Bagua / five-element data
    Bagua,
    /// Everything else (sensor, questionnaire, ...)
    General,
}

impl FeatureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSource::BirthChart => "birth_chart",
            FeatureSource::SeasonalQi => "seasonal_qi",
            FeatureSource::Meridian => "meridian",
            FeatureSource::Bagua => "bagua",
            FeatureSource::General => "general",
        }
    }
}

impl fmt::Display for FeatureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub raw_value: RawValue,
    /// Normalized value (0.0-1.0)
    pub normalized_value: f64,
    /// Knowledge-base weight (default 1.0)
    pub weight: f64,
    /// Per-feature confidence (0.0-1.0)
    pub confidence: Confidence,
    pub source: FeatureSource,
}

// ============================================================================
// Intermediate results
// ============================================================================

/// Outcome of scoring one rule against the present features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub label: String,
    /// Rule score (>= 0.0, may exceed 1.0 when the rule weight does)
    pub score: f64,
    /// Matched required features followed by matched optional features
    pub matched_features: Vec<String>,
    /// Required features that were absent
    pub missing_features: Vec<String>,
    /// Contraindicated features that were present
    #[serde(default)]
    pub contraindicated_features: Vec<String>,
}

/// Fused score for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub label: String,
    pub fused_score: f64,
}

// ============================================================================
// Final result
// ============================================================================

/// Overall risk level derived from the number of risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    MediumLow,
    Medium,
    MediumHigh,
    High,
}

impl RiskLevel {
    /// Map a risk-factor count onto a level
    pub fn from_factor_count(count: usize) -> Self {
        match count {
            0 => RiskLevel::Low,
            1..=2 => RiskLevel::MediumLow,
            3..=4 => RiskLevel::Medium,
            5..=6 => RiskLevel::MediumHigh,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::MediumLow => write!(f, "medium_low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::MediumHigh => write!(f, "medium_high"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Risk assessment summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Number of risk factors
    pub score: usize,
    /// Risk factors per category (categories with zero hits are omitted)
    pub category_distribution: BTreeMap<String, usize>,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            level: RiskLevel::Low,
            score: 0,
            category_distribution: BTreeMap::new(),
        }
    }
}

/// Final calibrated diagnosis
///
/// Every score is clamped into its documented range before construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub primary_label: String,
    /// Calibrated confidence (0.1-0.98)
    pub confidence: Confidence,
    /// Up to three runner-up `(label, fused score)` pairs
    pub secondary_candidates: Vec<(String, f64)>,
    /// Margin between primary and best runner-up (0.0-1.0)
    pub consistency_score: f64,
    /// Estimated accuracy (0.1-0.99)
    pub accuracy_score: f64,
    /// Normalized feature importance (sums to 1.0 when non-zero)
    pub feature_importance: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    /// Ranked syndrome rule matches (top 3)
    #[serde(default)]
    pub syndrome_candidates: Vec<MatchResult>,
    /// Constitution rule matches scoring above 0.3
    #[serde(default)]
    pub constitution_candidates: Vec<MatchResult>,
    #[serde(default)]
    pub risk_assessment: RiskAssessment,
    /// Version of the knowledge base that produced this result
    #[serde(default)]
    pub knowledge_version: String,
    pub timestamp: DateTime<Utc>,
}
