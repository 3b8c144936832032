//! Feature importance analysis
//!
//! ```text
//! importance = weight * confidence * (1 + |normalized_value - 0.5| * 2)
//! ```
//! Values at the neutral midpoint count once; values at either extreme count
//! twice. Importances are normalized to sum to 1.0; when they sum to zero
//! every feature keeps 0.0.

use crate::types::Feature;
use std::collections::BTreeMap;

/// Number of features consulted for dynamic recommendations
pub const TOP_FEATURE_COUNT: usize = 3;

/// Raw (unnormalized) importance of one feature, finite and non-negative
pub fn raw_importance(feature: &Feature) -> f64 {
    let value_factor = (feature.normalized_value - 0.5).abs() * 2.0;
    (feature.weight * feature.confidence * (1.0 + value_factor))
        .max(0.0)
        .min(f64::MAX)
}

/// Normalized importance per feature name
pub fn analyze_importance(features: &[Feature]) -> BTreeMap<String, f64> {
    let raw: Vec<(&str, f64)> = features
        .iter()
        .map(|f| (f.name.as_str(), raw_importance(f)))
        .collect();
    // Scale by the largest value first so the sum stays finite
    let peak = raw.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let scaled: Vec<(&str, f64)> = raw
        .into_iter()
        .map(|(name, value)| (name, if peak > 0.0 { value / peak } else { 0.0 }))
        .collect();
    let total: f64 = scaled.iter().map(|(_, v)| v).sum();

    scaled
        .into_iter()
        .map(|(name, value)| {
            let normalized = if total > 0.0 { value / total } else { 0.0 };
            (name.to_string(), normalized)
        })
        .collect()
}

/// Names of the `n` most important features, importance descending, ties by name
pub fn top_features(importance: &BTreeMap<String, f64>, n: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = importance.iter().map(|(k, v)| (k, *v)).collect();
    // BTreeMap iteration is already name-ordered and sort_by is stable
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().take(n).map(|(name, _)| name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureSource, RawValue};

    fn feature(name: &str, value: f64, weight: f64, confidence: f64) -> Feature {
        Feature {
            name: name.to_string(),
            raw_value: RawValue::Number(value),
            normalized_value: value,
            weight,
            confidence,
            source: FeatureSource::General,
        }
    }

    #[test]
    fn test_extremes_count_double() {
        let neutral = raw_importance(&feature("a", 0.5, 1.0, 0.6));
        let extreme = raw_importance(&feature("b", 1.0, 1.0, 0.6));
        assert!((neutral - 0.6).abs() < 1e-12);
        assert!((extreme - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_sum_is_one() {
        let features = vec![
            feature("a", 0.9, 0.8, 0.6),
            feature("b", 0.1, 1.0, 0.9),
            feature("c", 0.5, 0.5, 0.7),
        ];
        let importance = analyze_importance(&features);
        let sum: f64 = importance.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_stays_zero() {
        let features = vec![feature("a", 0.9, 0.0, 0.6), feature("b", 0.1, 0.0, 0.9)];
        let importance = analyze_importance(&features);
        assert_eq!(importance.len(), 2);
        assert!(importance.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_huge_weights_still_normalize() {
        let features = vec![feature("a", 1.0, 1e308, 1.0), feature("b", 0.0, 1e308, 1.0)];
        let importance = analyze_importance(&features);
        assert!((importance["a"] - 0.5).abs() < 1e-12);
        assert!((importance["b"] - 0.5).abs() < 1e-12);

        let features = vec![feature("a", 1.0, 1e308, 1.0), feature("b", 0.5, 1.0, 1.0)];
        let importance = analyze_importance(&features);
        let sum: f64 = importance.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(importance["a"] > 0.99);
    }

    #[test]
    fn test_top_features_order() {
        let mut importance = BTreeMap::new();
        importance.insert("z".to_string(), 0.3);
        importance.insert("a".to_string(), 0.3);
        importance.insert("m".to_string(), 0.4);
        importance.insert("q".to_string(), 0.0);
        assert_eq!(top_features(&importance, 3), vec!["m", "a", "z"]);
        assert!(top_features(&BTreeMap::new(), 3).is_empty());
    }
}
