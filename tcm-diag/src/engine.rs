//! Diagnosis Engine
//!
//! Runs the full pipeline over one request:
//!
//! ```text
//! raw features ─► FeatureNormalizer ─► RuleMatcher ─┐ (best constitution vote)
//!                                                   ▼
//! algorithm votes ───────────────────────────► fuse_votes ─► calibrate
//!                                                               │
//!        feature importance ◄───────────────────────────────────┘
//!              │
//!              ▼
//!        recommend + accuracy_score ─► DiagnosisResult
//! ```
//!
//! The engine owns an immutable knowledge base and holds no per-request state,
//! so one instance can serve any number of threads. Reloading means building a
//! new engine and swapping it in through [`SharedEngine`].

use crate::error::EngineResult;
use crate::fusion::fuse_votes;
use crate::importance::{analyze_importance, top_features, TOP_FEATURE_COUNT};
use crate::input::DiagnosisRequest;
use crate::knowledge::KnowledgeBase;
use crate::normalizer::FeatureNormalizer;
use crate::recommendation::recommend;
use crate::rules::RuleMatcher;
use crate::types::{AlgorithmResult, DiagnosisResult, RawValue};
use crate::validators::{accuracy_score, calibrate};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use tcm_common::EngineToml;
use tracing::{debug, info};

/// Algorithm name under which the rule-derived constitution vote is fused
pub const RULE_VOTE_SOURCE: &str = "rule_matcher";

/// Engine switches
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Turn the best constitution rule match into an extra fusion vote
    pub rule_votes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { rule_votes: true }
    }
}

impl From<&EngineToml> for EngineConfig {
    fn from(toml: &EngineToml) -> Self {
        Self {
            rule_votes: toml.rule_votes,
        }
    }
}

/// Stateless diagnosis engine over an immutable knowledge base
#[derive(Debug, Clone)]
pub struct DiagnosisEngine {
    knowledge: KnowledgeBase,
    config: EngineConfig,
}

impl DiagnosisEngine {
    pub fn new(knowledge: KnowledgeBase, config: EngineConfig) -> Self {
        info!(
            "Diagnosis engine ready: knowledge base v{}, rule votes {}",
            knowledge.version,
            if config.rule_votes { "on" } else { "off" }
        );
        Self { knowledge, config }
    }

    /// Engine over the embedded default knowledge base
    pub fn with_embedded_knowledge(config: EngineConfig) -> EngineResult<Self> {
        Ok(Self::new(KnowledgeBase::embedded()?, config))
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diagnose, stamping the result with the current time
    pub fn diagnose(
        &self,
        raw_features: &BTreeMap<String, RawValue>,
        algorithm_results: &BTreeMap<String, AlgorithmResult>,
    ) -> DiagnosisResult {
        self.diagnose_at(raw_features, algorithm_results, Utc::now())
    }

    /// Diagnose a validated request
    pub fn diagnose_request(&self, request: &DiagnosisRequest) -> DiagnosisResult {
        self.diagnose(&request.raw_features, &request.algorithm_results)
    }

    /// Validate a JSON request document and diagnose it
    pub fn diagnose_json(&self, payload: &str) -> EngineResult<DiagnosisResult> {
        let request = DiagnosisRequest::from_json_str(payload)?;
        Ok(self.diagnose_request(&request))
    }

    /// Diagnose with an explicit timestamp
    ///
    /// Identical inputs and timestamp always give an identical result.
    pub fn diagnose_at(
        &self,
        raw_features: &BTreeMap<String, RawValue>,
        algorithm_results: &BTreeMap<String, AlgorithmResult>,
        timestamp: DateTime<Utc>,
    ) -> DiagnosisResult {
        let kb = &self.knowledge;

        let features = FeatureNormalizer::new(kb).normalize_all(raw_features);

        let present: BTreeSet<String> = raw_features.keys().cloned().collect();
        let matches =
            RuleMatcher::new(&kb.syndrome_rules, &kb.constitution_rules).evaluate(&present);

        let mut votes = algorithm_results.clone();
        if self.config.rule_votes {
            if let Some(best) = matches.best_constitution() {
                // A caller-supplied algorithm with the same name keeps its vote
                votes.entry(RULE_VOTE_SOURCE.to_string()).or_insert_with(|| {
                    debug!(
                        "Rule vote: {} (score {:.4})",
                        best.label, best.score
                    );
                    AlgorithmResult::new(RULE_VOTE_SOURCE, best.label.clone(), best.score.min(1.0))
                });
            }
        }

        let outcome = fuse_votes(votes.values());
        let calibration = calibrate(&outcome);

        let primary_label = match &calibration.primary_label {
            Some(label) => label.clone(),
            None => {
                info!(
                    "No candidates from {} votes, falling back to baseline '{}'",
                    votes.len(),
                    kb.baseline_label
                );
                kb.baseline_label.clone()
            }
        };

        let feature_importance = analyze_importance(&features);
        let top = top_features(&feature_importance, TOP_FEATURE_COUNT);
        let recs = recommend(kb, &primary_label, &top);

        let accuracy = accuracy_score(
            calibration.confidence,
            calibration.consistency_score,
            &feature_importance,
        );

        let secondary_candidates = outcome
            .secondary()
            .iter()
            .map(|c| (c.label.clone(), c.fused_score))
            .collect();

        debug!(
            "Diagnosis: '{}' confidence={:.4} consistency={:.4} accuracy={:.4}",
            primary_label, calibration.confidence, calibration.consistency_score, accuracy
        );

        DiagnosisResult {
            primary_label,
            confidence: calibration.confidence,
            secondary_candidates,
            consistency_score: calibration.consistency_score,
            accuracy_score: accuracy,
            feature_importance,
            recommendations: recs.recommendations,
            risk_factors: recs.risk_factors,
            syndrome_candidates: matches.syndromes,
            constitution_candidates: matches.constitutions,
            risk_assessment: recs.risk_assessment,
            knowledge_version: kb.version.clone(),
            timestamp,
        }
    }
}

/// Shared handle allowing the engine to be replaced while requests run
///
/// Readers clone the inner `Arc` and keep using that engine even if a reload
/// swaps in a new one mid-request.
#[derive(Debug)]
pub struct SharedEngine {
    inner: RwLock<Arc<DiagnosisEngine>>,
}

impl SharedEngine {
    pub fn new(engine: DiagnosisEngine) -> Self {
        Self {
            inner: RwLock::new(Arc::new(engine)),
        }
    }

    /// Engine currently in service
    pub fn current(&self) -> Arc<DiagnosisEngine> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new engine, returning the one it replaced
    pub fn replace(&self, engine: DiagnosisEngine) -> Arc<DiagnosisEngine> {
        let next = Arc::new(engine);
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        info!(
            "Swapping knowledge base v{} -> v{}",
            guard.knowledge().version,
            next.knowledge().version
        );
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine() -> DiagnosisEngine {
        DiagnosisEngine::with_embedded_knowledge(EngineConfig::default()).unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DiagnosisEngine>();
        assert_send_sync::<SharedEngine>();
    }

    #[test]
    fn test_rule_vote_drives_primary_without_algorithms() {
        let mut raw = BTreeMap::new();
        raw.insert("神疲乏力".to_string(), RawValue::Number(1.0));
        raw.insert("气短懒言".to_string(), RawValue::Number(1.0));

        let result = engine().diagnose_at(&raw, &BTreeMap::new(), fixed_time());
        assert_eq!(result.primary_label, "气虚质");
        assert_eq!(result.constitution_candidates[0].label, "气虚质");
        assert_eq!(result.syndrome_candidates[0].label, "气虚证");
    }

    #[test]
    fn test_rule_votes_disabled_falls_back() {
        let engine = DiagnosisEngine::with_embedded_knowledge(EngineConfig { rule_votes: false })
            .unwrap();
        let mut raw = BTreeMap::new();
        raw.insert("神疲乏力".to_string(), RawValue::Number(1.0));

        let result = engine.diagnose_at(&raw, &BTreeMap::new(), fixed_time());
        assert_eq!(result.primary_label, "平和质");
        assert_eq!(result.confidence, 0.5);
        // Rule diagnostics are still reported
        assert!(!result.syndrome_candidates.is_empty());
    }

    #[test]
    fn test_caller_vote_named_rule_matcher_wins() {
        let mut raw = BTreeMap::new();
        raw.insert("神疲乏力".to_string(), RawValue::Number(1.0));
        raw.insert("气短懒言".to_string(), RawValue::Number(1.0));
        let mut votes = BTreeMap::new();
        votes.insert(
            RULE_VOTE_SOURCE.to_string(),
            AlgorithmResult::new(RULE_VOTE_SOURCE, "阴虚质", 0.6),
        );

        let result = engine().diagnose_at(&raw, &votes, fixed_time());
        assert_eq!(result.primary_label, "阴虚质");
        assert!(result.secondary_candidates.is_empty());
    }

    #[test]
    fn test_shared_engine_swap() {
        let shared = SharedEngine::new(engine());
        let before = shared.current();

        let mut kb = KnowledgeBase::embedded().unwrap();
        kb.version = "next".to_string();
        let previous = shared.replace(DiagnosisEngine::new(kb, EngineConfig::default()));

        assert_eq!(previous.knowledge().version, before.knowledge().version);
        assert_eq!(shared.current().knowledge().version, "next");
        // The handle taken before the swap still sees the old tables
        assert_ne!(before.knowledge().version, "next");
    }
}
