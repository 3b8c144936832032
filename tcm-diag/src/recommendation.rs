//! Recommendation and risk derivation
//!
//! Assembles advice in a fixed order, then removes duplicates keeping the
//! first occurrence:
//! 1. Constitution profile advice for the primary label
//! 2. Dynamic tips triggered by the top features (substring match)
//! 3. Risk-level advice (`high`, or `medium`/`medium_high`)
//! 4. Advice for every risk category that has at least one hit
//!
//! Risk factors come from the constitution profile alone.

use crate::knowledge::KnowledgeBase;
use crate::types::{RiskAssessment, RiskLevel};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Advice, risk factors and risk summary for one diagnosis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendations {
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub risk_assessment: RiskAssessment,
}

/// Derive recommendations for a primary label and its most important features
pub fn recommend(
    knowledge: &KnowledgeBase,
    primary_label: &str,
    top_features: &[String],
) -> Recommendations {
    let mut advice: Vec<String> = Vec::new();
    let mut risks: Vec<String> = Vec::new();

    match knowledge.profile(primary_label) {
        Some(profile) => {
            advice.extend(profile.advice.iter().cloned());
            risks.extend(profile.risks.iter().cloned());
        }
        None => debug!("No constitution profile for '{}'", primary_label),
    }

    for feature in top_features {
        for tip in knowledge.dynamic_tips.iter().filter(|tip| tip.matches(feature)) {
            advice.push(tip.advice.clone());
        }
    }

    let risk_factors = dedup_preserving_order(risks);
    let risk_assessment = assess_risk(knowledge, &risk_factors);

    match risk_assessment.level {
        RiskLevel::High => advice.extend(knowledge.risk_levels.high_advice.iter().cloned()),
        RiskLevel::Medium | RiskLevel::MediumHigh => {
            advice.extend(knowledge.risk_levels.elevated_advice.iter().cloned())
        }
        RiskLevel::Low | RiskLevel::MediumLow => {}
    }

    for category in &knowledge.risk_categories {
        if risk_assessment.category_distribution.contains_key(&category.name) {
            advice.push(category.advice.clone());
        }
    }

    let recommendations = dedup_preserving_order(advice);

    debug!(
        "Recommendations for '{}': {} advice, {} risk factors, level {}",
        primary_label,
        recommendations.len(),
        risk_factors.len(),
        risk_assessment.level
    );

    Recommendations {
        recommendations,
        risk_factors,
        risk_assessment,
    }
}

/// Summarize risk factors into a level and per-category counts
pub fn assess_risk(knowledge: &KnowledgeBase, risk_factors: &[String]) -> RiskAssessment {
    let mut category_distribution = BTreeMap::new();
    for category in &knowledge.risk_categories {
        let hits = risk_factors.iter().filter(|r| category.matches(r)).count();
        if hits > 0 {
            category_distribution.insert(category.name.clone(), hits);
        }
    }

    RiskAssessment {
        level: RiskLevel::from_factor_count(risk_factors.len()),
        score: risk_factors.len(),
        category_distribution,
    }
}

/// Remove duplicates, keeping the first occurrence of each item
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
