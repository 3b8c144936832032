//! # tcm-diag
//!
//! Diagnostic reasoning and confidence-calibration engine for traditional
//! Chinese medicine signals.
//!
//! Turns categorical chart data, pre-scaled numeric features and independent
//! per-modality classifier votes into one calibrated [`DiagnosisResult`] with
//! feature importance, recommendations and a risk summary.
//!
//! ```rust,ignore
//! use tcm_diag::{DiagnosisEngine, DiagnosisRequest, EngineConfig};
//!
//! let engine = DiagnosisEngine::with_embedded_knowledge(EngineConfig::default())?;
//! let request = DiagnosisRequest::new().with_vote("tongue", "气虚质", 0.8);
//! let result = engine.diagnose_request(&request);
//! assert_eq!(result.primary_label, "气虚质");
//! ```

pub mod engine;
pub mod error;
pub mod fusion;
pub mod importance;
pub mod input;
pub mod knowledge;
pub mod normalizer;
pub mod recommendation;
pub mod rules;
pub mod types;
pub mod validators;

pub use engine::{DiagnosisEngine, EngineConfig, SharedEngine, RULE_VOTE_SOURCE};
pub use error::{DiagnosisError, EngineResult};
pub use input::DiagnosisRequest;
pub use knowledge::KnowledgeBase;
pub use types::{
    AlgorithmResult, Confidence, DiagnosisResult, Feature, FeatureSource, FusedCandidate,
    MatchResult, RawValue, RiskAssessment, RiskLevel,
};
