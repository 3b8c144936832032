//! Knowledge base: rule tables, feature weights, advice and risk tables
//!
//! The knowledge base is versioned configuration data (TOML), loaded once and
//! read-only afterwards. A default copy ships with the crate and is embedded at
//! compile time so the engine always has something to run against.

use crate::error::{DiagnosisError, EngineResult};
use crate::rules::Rule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Default knowledge base shipped with the crate
pub const EMBEDDED_KNOWLEDGE_BASE: &str = include_str!("../data/knowledge_base.toml");

/// Upper bound accepted for rule and feature weights
pub const MAX_WEIGHT: f64 = 1000.0;

/// Advice and risk tendencies for one constitution label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstitutionProfile {
    #[serde(default)]
    pub advice: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

/// Advice triggered when a top feature name contains one of the patterns
/// (ASCII case-insensitive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicTip {
    pub name: String,
    pub patterns: Vec<String>,
    pub advice: String,
}

impl DynamicTip {
    pub fn matches(&self, feature_name: &str) -> bool {
        let name = feature_name.to_lowercase();
        self.patterns
            .iter()
            .any(|p| name.contains(p.to_lowercase().as_str()))
    }
}

/// Risk category recognised by keyword inside risk-factor text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCategory {
    pub name: String,
    pub keywords: Vec<String>,
    pub advice: String,
}

impl RiskCategory {
    pub fn matches(&self, risk_factor: &str) -> bool {
        let text = risk_factor.to_lowercase();
        self.keywords
            .iter()
            .any(|k| text.contains(k.to_lowercase().as_str()))
    }
}

/// Advice attached to the overall risk level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelAdvice {
    /// Appended for `high`
    #[serde(default)]
    pub high_advice: Vec<String>,
    /// Appended for `medium` and `medium_high`
    #[serde(default)]
    pub elevated_advice: Vec<String>,
}

/// Immutable diagnostic knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub version: String,

    /// Label returned when no candidate survives fusion
    #[serde(default = "default_baseline_label")]
    pub baseline_label: String,

    #[serde(default)]
    pub syndrome_rules: Vec<Rule>,

    #[serde(default)]
    pub constitution_rules: Vec<Rule>,

    #[serde(default)]
    pub feature_weights: BTreeMap<String, f64>,

    #[serde(default)]
    pub constitutions: BTreeMap<String, ConstitutionProfile>,

    #[serde(default)]
    pub dynamic_tips: Vec<DynamicTip>,

    #[serde(default)]
    pub risk_categories: Vec<RiskCategory>,

    #[serde(default)]
    pub risk_levels: RiskLevelAdvice,
}

fn default_baseline_label() -> String {
    "平和质".to_string()
}

impl KnowledgeBase {
    /// Parse and validate the knowledge base embedded in the binary
    pub fn embedded() -> EngineResult<Self> {
        Self::from_toml_str(EMBEDDED_KNOWLEDGE_BASE)
    }

    /// Parse and validate a knowledge base from TOML text
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let parsed: KnowledgeBase = toml::from_str(content)
            .map_err(|e| DiagnosisError::KnowledgeBase(format!("Parse TOML failed: {}", e)))?;
        parsed.validated()
    }

    /// Load a knowledge base from disk
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DiagnosisError::KnowledgeBase(format!("Read {} failed: {}", path.display(), e))
        })?;
        let knowledge = Self::from_toml_str(&content)?;
        info!(
            "Knowledge base v{} loaded from {} ({} syndrome rules, {} constitution rules)",
            knowledge.version,
            path.display(),
            knowledge.syndrome_rules.len(),
            knowledge.constitution_rules.len()
        );
        Ok(knowledge)
    }

    /// Validate and normalise a freshly parsed knowledge base
    ///
    /// Rejects empty labels and negative or non-finite weights; removes
    /// duplicate feature names inside each rule (first occurrence wins).
    pub fn validated(mut self) -> EngineResult<Self> {
        if self.version.trim().is_empty() {
            return Err(DiagnosisError::KnowledgeBase("version must not be empty".to_string()));
        }
        if self.baseline_label.trim().is_empty() {
            return Err(DiagnosisError::KnowledgeBase(
                "baseline_label must not be empty".to_string(),
            ));
        }

        for (family, rules) in [
            ("syndrome", &mut self.syndrome_rules),
            ("constitution", &mut self.constitution_rules),
        ] {
            for (index, rule) in rules.iter_mut().enumerate() {
                validate_rule(family, index, rule)?;
            }
        }

        for (name, weight) in &self.feature_weights {
            if !valid_weight(*weight) {
                return Err(DiagnosisError::KnowledgeBase(format!(
                    "feature weight for '{}' must be between 0 and {}, got {}",
                    name, MAX_WEIGHT, weight
                )));
            }
        }

        debug!(
            "Knowledge base v{} validated: {} constitution profiles, {} dynamic tips, {} risk categories",
            self.version,
            self.constitutions.len(),
            self.dynamic_tips.len(),
            self.risk_categories.len()
        );

        Ok(self)
    }

    /// Weight for a feature name (1.0 when not listed)
    pub fn feature_weight(&self, name: &str) -> f64 {
        self.feature_weights.get(name).copied().unwrap_or(1.0)
    }

    /// Advice/risk profile for a constitution label
    pub fn profile(&self, label: &str) -> Option<&ConstitutionProfile> {
        self.constitutions.get(label)
    }
}

fn validate_rule(family: &str, index: usize, rule: &mut Rule) -> EngineResult<()> {
    if rule.target_label.trim().is_empty() {
        return Err(DiagnosisError::KnowledgeBase(format!(
            "{} rule #{} has an empty target_label",
            family, index
        )));
    }
    if !valid_weight(rule.weight) {
        return Err(DiagnosisError::KnowledgeBase(format!(
            "{} rule '{}' weight must be between 0 and {}, got {}",
            family, rule.target_label, MAX_WEIGHT, rule.weight
        )));
    }

    dedup_in_place(&mut rule.required_features);
    dedup_in_place(&mut rule.optional_features);
    dedup_in_place(&mut rule.contraindicated_features);

    if rule.min_required > rule.required_features.len() {
        warn!(
            "{} rule '{}' needs {} required features but only lists {}; it can never pass its threshold",
            family,
            rule.target_label,
            rule.min_required,
            rule.required_features.len()
        );
    }

    Ok(())
}

fn valid_weight(weight: f64) -> bool {
    weight.is_finite() && (0.0..=MAX_WEIGHT).contains(&weight)
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_knowledge_base_is_valid() {
        let kb = KnowledgeBase::embedded().unwrap();
        assert_eq!(kb.baseline_label, "平和质");
        assert_eq!(kb.syndrome_rules.len(), 5);
        assert_eq!(kb.constitution_rules.len(), 9);
        assert_eq!(kb.constitutions.len(), 9);
        assert_eq!(kb.dynamic_tips.len(), 3);
    }

    #[test]
    fn test_build_stamp_matches_embedded_version() {
        let kb = KnowledgeBase::embedded().unwrap();
        assert_eq!(env!("BUILD_KNOWLEDGE_VERSION"), kb.version);
    }

    #[test]
    fn test_feature_weight_defaults_to_one() {
        let kb = KnowledgeBase::embedded().unwrap();
        assert_eq!(kb.feature_weight("pulse_rate"), 0.9);
        assert_eq!(kb.feature_weight("not_a_listed_feature"), 1.0);
    }

    #[test]
    fn test_minimal_document_uses_defaults() {
        let kb = KnowledgeBase::from_toml_str("version = \"test\"").unwrap();
        assert_eq!(kb.baseline_label, "平和质");
        assert!(kb.syndrome_rules.is_empty());
        assert!(kb.risk_levels.high_advice.is_empty());
    }

    #[test]
    fn test_duplicate_rule_features_are_removed() {
        let kb = KnowledgeBase::from_toml_str(
            r#"
version = "test"

[[syndrome_rules]]
target_label = "X"
required_features = ["a", "b", "a"]
optional_features = ["c", "c"]
"#,
        )
        .unwrap();
        let rule = &kb.syndrome_rules[0];
        assert_eq!(rule.required_features, vec!["a", "b"]);
        assert_eq!(rule.optional_features, vec!["c"]);
    }

    #[test]
    fn test_negative_rule_weight_rejected() {
        let err = KnowledgeBase::from_toml_str(
            r#"
version = "test"

[[constitution_rules]]
target_label = "气虚质"
required_features = ["神疲乏力"]
weight = -1.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DiagnosisError::KnowledgeBase(_)));
    }

    #[test]
    fn test_empty_label_rejected() {
        let err = KnowledgeBase::from_toml_str(
            r#"
version = "test"

[[syndrome_rules]]
target_label = "  "
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty target_label"));
    }

    #[test]
    fn test_missing_version_is_parse_error() {
        let err = KnowledgeBase::from_toml_str("baseline_label = \"平和质\"").unwrap_err();
        assert!(matches!(err, DiagnosisError::KnowledgeBase(_)));
    }

    #[test]
    fn test_dynamic_tip_substring_match() {
        let tip = DynamicTip {
            name: "circadian".to_string(),
            patterns: vec!["ziwu".to_string(), "时辰".to_string()],
            advice: "sleep early".to_string(),
        };
        assert!(tip.matches("current_ziwu_flow"));
        assert!(tip.matches("出生时辰"));
        assert!(!tip.matches("pulse_rate"));
    }

    #[test]
    fn test_dynamic_tip_ignores_ascii_case() {
        let kb = KnowledgeBase::embedded().unwrap();
        let seasonal = kb
            .dynamic_tips
            .iter()
            .find(|t| t.patterns.iter().any(|p| p == "liuqi"))
            .unwrap();
        assert!(seasonal.matches("Current_LiuQi"));
        assert!(seasonal.matches("CURRENT_LIUQI"));
    }

    #[test]
    fn test_huge_weights_rejected() {
        let err = KnowledgeBase::from_toml_str(
            r#"
version = "test"

[feature_weights]
pulse_rate = 1e308
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("pulse_rate"));

        let err = KnowledgeBase::from_toml_str(
            r#"
version = "test"

[[syndrome_rules]]
target_label = "气虚证"
required_features = ["神疲乏力"]
weight = 1e308
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DiagnosisError::KnowledgeBase(_)));

        let kb = KnowledgeBase::from_toml_str(
            r#"
version = "test"

[feature_weights]
pulse_rate = 1000.0
"#,
        )
        .unwrap();
        assert_eq!(kb.feature_weight("pulse_rate"), MAX_WEIGHT);
    }
}
