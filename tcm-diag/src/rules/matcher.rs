// Rule Matcher - Feature-Presence Scoring
//
// Only presence matters here; feature values are ignored.
//
// Above threshold (both families):
//   base    = |matched_required| / |required|
//   bonus   = 0.3 * |matched_optional| / |optional|
//   penalty = 0.5 * |matched_contra| / |contra|
//   score   = max(0, (base + bonus - penalty) * weight)
// Below threshold (|matched_required| < min_required):
//   syndrome     -> 0
//   constitution -> 0.3 * |matched_required| / max(1, |required|)

use crate::rules::{Rule, RuleFamily};
use crate::types::MatchResult;
use std::collections::BTreeSet;
use tracing::debug;

const OPTIONAL_BONUS_WEIGHT: f64 = 0.3;
const CONTRA_PENALTY_WEIGHT: f64 = 0.5;
const CONSTITUTION_PARTIAL_CREDIT: f64 = 0.3;

/// Number of syndrome candidates kept after ranking
pub const SYNDROME_TOP_N: usize = 3;

/// Constitution candidates must score strictly above this to be kept
pub const CONSTITUTION_MIN_SCORE: f64 = 0.3;

/// Ranked matches for both rule families
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMatches {
    /// Top syndrome matches, score descending
    pub syndromes: Vec<MatchResult>,
    /// Constitution matches above threshold, score descending
    pub constitutions: Vec<MatchResult>,
}

impl RuleMatches {
    /// Best constitution match, if any survived ranking
    pub fn best_constitution(&self) -> Option<&MatchResult> {
        self.constitutions.first()
    }
}

/// Scores feature-presence sets against the two rule families
pub struct RuleMatcher<'a> {
    syndrome_rules: &'a [Rule],
    constitution_rules: &'a [Rule],
}

impl<'a> RuleMatcher<'a> {
    pub fn new(syndrome_rules: &'a [Rule], constitution_rules: &'a [Rule]) -> Self {
        Self {
            syndrome_rules,
            constitution_rules,
        }
    }

    /// Evaluate every rule and rank each family
    pub fn evaluate(&self, present: &BTreeSet<String>) -> RuleMatches {
        let syndromes = rank_syndromes(
            self.syndrome_rules
                .iter()
                .map(|rule| evaluate_rule(rule, RuleFamily::Syndrome, present))
                .collect(),
        );

        let constitutions = rank_constitutions(
            self.constitution_rules
                .iter()
                .map(|rule| evaluate_rule(rule, RuleFamily::Constitution, present))
                .collect(),
        );

        debug!(
            "Rule matching: {} features present, {} syndrome / {} constitution candidates",
            present.len(),
            syndromes.len(),
            constitutions.len()
        );

        RuleMatches {
            syndromes,
            constitutions,
        }
    }
}

/// Score one rule against the present feature names
pub fn evaluate_rule(rule: &Rule, family: RuleFamily, present: &BTreeSet<String>) -> MatchResult {
    let matched_required = intersect(&rule.required_features, present);
    let matched_optional = intersect(&rule.optional_features, present);
    let matched_contra = intersect(&rule.contraindicated_features, present);

    let missing_features: Vec<String> = rule
        .required_features
        .iter()
        .filter(|f| !present.contains(f.as_str()))
        .cloned()
        .collect();

    let below_threshold = matched_required.len() < rule.min_required;

    let score = if below_threshold {
        match family {
            RuleFamily::Syndrome => 0.0,
            RuleFamily::Constitution => {
                CONSTITUTION_PARTIAL_CREDIT * matched_required.len() as f64
                    / rule.required_features.len().max(1) as f64
            }
        }
    } else {
        let base = ratio(matched_required.len(), rule.required_features.len());
        let bonus = OPTIONAL_BONUS_WEIGHT
            * ratio(matched_optional.len(), rule.optional_features.len());
        let penalty = CONTRA_PENALTY_WEIGHT
            * ratio(matched_contra.len(), rule.contraindicated_features.len());
        ((base + bonus - penalty) * rule.weight).max(0.0)
    };

    let mut matched_features = matched_required;
    matched_features.extend(matched_optional);

    MatchResult {
        label: rule.target_label.clone(),
        score,
        matched_features,
        missing_features,
        contraindicated_features: matched_contra,
    }
}

/// Keep the top three syndromes, score descending, ties in declaration order
pub fn rank_syndromes(mut results: Vec<MatchResult>) -> Vec<MatchResult> {
    sort_by_score(&mut results);
    results.truncate(SYNDROME_TOP_N);
    results
}

/// Keep constitutions scoring above 0.3, score descending, ties in declaration order
pub fn rank_constitutions(mut results: Vec<MatchResult>) -> Vec<MatchResult> {
    results.retain(|r| r.score > CONSTITUTION_MIN_SCORE);
    sort_by_score(&mut results);
    results
}

fn sort_by_score(results: &mut [MatchResult]) {
    // sort_by is stable, so equal scores keep declaration order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

fn intersect(features: &[String], present: &BTreeSet<String>) -> Vec<String> {
    features
        .iter()
        .filter(|f| present.contains(f.as_str()))
        .cloned()
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn full_rule() -> Rule {
        Rule::new("阳虚证", ["畏寒", "四肢不温"])
            .with_optional(["精神萎靡", "舌淡", "脉沉迟"])
            .with_contraindicated(["五心烦热", "舌红少苔"])
            .with_min_required(1)
    }

    #[test]
    fn test_all_required_no_extras() {
        let result = evaluate_rule(&full_rule(), RuleFamily::Syndrome, &present(&["畏寒", "四肢不温"]));
        assert!((result.score - 1.0).abs() < 1e-12);
        assert_eq!(result.matched_features, vec!["畏寒", "四肢不温"]);
        assert!(result.missing_features.is_empty());
    }

    #[test]
    fn test_optional_bonus_and_contra_penalty() {
        // base 0.5, bonus 0.3 * 1/3 = 0.1, penalty 0.5 * 1/2 = 0.25
        let result = evaluate_rule(
            &full_rule(),
            RuleFamily::Syndrome,
            &present(&["畏寒", "舌淡", "五心烦热"]),
        );
        assert!((result.score - 0.35).abs() < 1e-12, "score={}", result.score);
        assert_eq!(result.matched_features, vec!["畏寒", "舌淡"]);
        assert_eq!(result.missing_features, vec!["四肢不温"]);
        assert_eq!(result.contraindicated_features, vec!["五心烦热"]);
    }

    #[test]
    fn test_penalty_never_drives_score_negative() {
        let rule = Rule::new("X", ["a", "b", "c", "d"])
            .with_contraindicated(["z"])
            .with_min_required(1);
        // base 0.25, penalty 0.5
        let result = evaluate_rule(&rule, RuleFamily::Syndrome, &present(&["a", "z"]));
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_syndrome_below_threshold_scores_zero() {
        let rule = full_rule().with_min_required(2);
        let result = evaluate_rule(&rule, RuleFamily::Syndrome, &present(&["畏寒", "舌淡", "脉沉迟"]));
        assert_eq!(result.score, 0.0);
        // Matched list still reported for diagnostics
        assert_eq!(result.matched_features, vec!["畏寒", "舌淡", "脉沉迟"]);
    }

    #[test]
    fn test_constitution_below_threshold_gets_partial_credit() {
        let rule = full_rule().with_min_required(2);
        let result = evaluate_rule(
            &rule,
            RuleFamily::Constitution,
            &present(&["畏寒", "舌淡", "五心烦热"]),
        );
        // 0.3 * 1/2, no bonus or penalty applied
        assert!((result.score - 0.15).abs() < 1e-12, "score={}", result.score);
    }

    #[test]
    fn test_constitution_above_threshold_matches_syndrome_formula() {
        let features = present(&["畏寒", "四肢不温", "舌淡"]);
        let syndrome = evaluate_rule(&full_rule(), RuleFamily::Syndrome, &features);
        let constitution = evaluate_rule(&full_rule(), RuleFamily::Constitution, &features);
        assert_eq!(syndrome.score, constitution.score);
    }

    #[test]
    fn test_empty_sets_contribute_zero() {
        let rule = Rule::new("Empty", Vec::<String>::new()).with_min_required(0);
        let result = evaluate_rule(&rule, RuleFamily::Syndrome, &present(&["anything"]));
        assert_eq!(result.score, 0.0);

        let constitution = evaluate_rule(
            &Rule::new("Empty", Vec::<String>::new()),
            RuleFamily::Constitution,
            &present(&[]),
        );
        assert_eq!(constitution.score, 0.0);
    }

    #[test]
    fn test_weight_can_push_score_above_one() {
        let rule = Rule::new("X", ["a"]).with_optional(["b"]).with_weight(2.0);
        let result = evaluate_rule(&rule, RuleFamily::Syndrome, &present(&["a", "b"]));
        assert!((result.score - 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_syndrome_ranking_top_three_stable() {
        let rules = vec![
            Rule::new("A", ["a"]),
            Rule::new("B", ["b"]),
            Rule::new("C", ["c"]),
            Rule::new("D", ["d"]),
        ];
        let matcher = RuleMatcher::new(&rules, &[]);
        let matches = matcher.evaluate(&present(&["b", "c", "d"]));
        let labels: Vec<&str> = matches.syndromes.iter().map(|m| m.label.as_str()).collect();
        // B, C, D tie at 1.0 and keep declaration order; A drops out
        assert_eq!(labels, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_constitution_ranking_threshold_and_order() {
        let rules = vec![
            Rule::new("Low", ["x", "y"]).with_min_required(2), // partial 0.15 -> dropped
            Rule::new("Mid", ["m", "n"]),                       // 0.5
            Rule::new("High", ["h"]),                           // 1.0
        ];
        let matcher = RuleMatcher::new(&[], &rules);
        let matches = matcher.evaluate(&present(&["x", "m", "h"]));
        let labels: Vec<&str> = matches.constitutions.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["High", "Mid"]);
        assert_eq!(matches.best_constitution().map(|m| m.label.as_str()), Some("High"));
    }

    #[test]
    fn test_constitution_score_at_threshold_is_dropped() {
        let edge = Rule::new("Edge", ["a"]).with_min_required(2);
        let result = evaluate_rule(&edge, RuleFamily::Constitution, &present(&["a"]));
        assert_eq!(result.score, CONSTITUTION_MIN_SCORE);

        let rules = vec![edge, Rule::new("Above", ["b"]).with_weight(0.31)];
        let matcher = RuleMatcher::new(&[], &rules);
        let matches = matcher.evaluate(&present(&["a", "b"]));
        let labels: Vec<&str> = matches.constitutions.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Above"]);
    }

    #[test]
    fn test_unknown_feature_names_are_ignored() {
        let rules = vec![Rule::new("A", ["a"])];
        let matcher = RuleMatcher::new(&rules, &[]);
        let with_noise = matcher.evaluate(&present(&["a", "unknown_1", "unknown_2"]));
        let without = matcher.evaluate(&present(&["a"]));
        assert_eq!(with_noise, without);
    }
}
