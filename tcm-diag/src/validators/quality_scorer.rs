// Quality Scorer - Estimated Diagnostic Accuracy
//
// accuracy = clamp(confidence * consistency + coverage_bonus, 0.1, 0.99)
// coverage_bonus = 0.1 * count(importance > 0.05) / total_feature_count
//
// The bonus is 0 when no features were supplied.

use std::collections::BTreeMap;

pub const MIN_ACCURACY: f64 = 0.1;
pub const MAX_ACCURACY: f64 = 0.99;

const COVERAGE_BONUS_WEIGHT: f64 = 0.1;
const SIGNIFICANT_IMPORTANCE: f64 = 0.05;

/// Estimate accuracy from calibrated confidence, consistency and feature coverage
pub fn accuracy_score(
    confidence: f64,
    consistency: f64,
    feature_importance: &BTreeMap<String, f64>,
) -> f64 {
    let total = feature_importance.len();
    let coverage_bonus = if total == 0 {
        0.0
    } else {
        let significant = feature_importance
            .values()
            .filter(|&&importance| importance > SIGNIFICANT_IMPORTANCE)
            .count();
        COVERAGE_BONUS_WEIGHT * significant as f64 / total as f64
    };

    (confidence * consistency + coverage_bonus).clamp(MIN_ACCURACY, MAX_ACCURACY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_features_no_bonus() {
        let accuracy = accuracy_score(0.9, 1.0, &BTreeMap::new());
        assert!((accuracy - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_coverage_bonus_counts_significant_features() {
        let mut importance = BTreeMap::new();
        importance.insert("a".to_string(), 0.6);
        importance.insert("b".to_string(), 0.36);
        importance.insert("c".to_string(), 0.04);
        importance.insert("d".to_string(), 0.0);
        // 2 of 4 significant -> bonus 0.05
        let accuracy = accuracy_score(0.5, 0.5, &importance);
        assert!((accuracy - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(accuracy_score(0.0, 0.0, &BTreeMap::new()), MIN_ACCURACY);
        let mut importance = BTreeMap::new();
        importance.insert("a".to_string(), 1.0);
        assert_eq!(accuracy_score(0.98, 1.0, &importance), MAX_ACCURACY);
    }
}
