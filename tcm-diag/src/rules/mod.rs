// Rule Matching - Syndrome and Constitution Rule Families
//
// Both families share one rule shape; they differ only in how a rule that
// misses its required-feature threshold is scored (see matcher.rs).

pub mod matcher;

pub use matcher::{RuleMatcher, RuleMatches};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule family, selecting the scoring policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    /// Pattern-diagnosis (证型) rules: below threshold scores zero
    Syndrome,
    /// Constitution (体质) rules: below threshold earns partial credit
    Constitution,
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFamily::Syndrome => write!(f, "syndrome"),
            RuleFamily::Constitution => write!(f, "constitution"),
        }
    }
}

/// Static rule loaded from the knowledge base
///
/// Feature lists behave as sets (duplicates are removed on load) but keep
/// declaration order so match reports are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub target_label: String,

    #[serde(default)]
    pub required_features: Vec<String>,

    #[serde(default)]
    pub optional_features: Vec<String>,

    #[serde(default)]
    pub contraindicated_features: Vec<String>,

    /// Minimum number of required features that must be present
    #[serde(default = "default_min_required")]
    pub min_required: usize,

    #[serde(default = "default_rule_weight")]
    pub weight: f64,
}

fn default_min_required() -> usize {
    1
}

fn default_rule_weight() -> f64 {
    1.0
}

impl Rule {
    /// Rule with only required features, `min_required = 1`, weight 1.0
    pub fn new<I, S>(target_label: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_label: target_label.into(),
            required_features: required.into_iter().map(Into::into).collect(),
            optional_features: Vec::new(),
            contraindicated_features: Vec::new(),
            min_required: default_min_required(),
            weight: default_rule_weight(),
        }
    }

    pub fn with_optional<I, S>(mut self, optional: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_features = optional.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_contraindicated<I, S>(mut self, contraindicated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contraindicated_features = contraindicated.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_required(mut self, min_required: usize) -> Self {
        self.min_required = min_required;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}
