//! Feature Normalizer
//!
//! Maps heterogeneous raw inputs onto a common 0.0-1.0 scale and attaches a
//! per-feature confidence and provenance bucket.
//!
//! # Value Mapping
//! - Numbers: clamped into 0.0-1.0 (upstream analyzers already scale them)
//! - Heavenly stems 甲..癸: (i+1)/10
//! - Earthly branches 子..亥: (i+1)/12
//! - Five elements 木火土金水: 0.2, 0.4, 0.6, 0.8, 1.0
//! - Constitution labels: evenly spaced from 1.0 (平和质) down to 0.1 (特禀质)
//! - Anything else (unknown token, NaN, infinity): neutral 0.5
//!
//! # Confidence
//! Derived from the feature name alone:
//! - birth/chart marker: 0.7 + 0.2, capped at 0.95
//! - current/now marker: 0.7
//! - otherwise: 0.7 - 0.1, floored at 0.3

use crate::knowledge::KnowledgeBase;
use crate::types::{Confidence, Feature, FeatureSource, RawValue};
use std::collections::BTreeMap;
use tracing::debug;

/// Value assigned to anything the tables do not recognise
pub const NEUTRAL_VALUE: f64 = 0.5;

const BASE_CONFIDENCE: Confidence = 0.7;
const BIRTH_CONFIDENCE_BONUS: Confidence = 0.2;
const BIRTH_CONFIDENCE_CAP: Confidence = 0.95;
const GENERIC_CONFIDENCE_PENALTY: Confidence = 0.1;
const GENERIC_CONFIDENCE_FLOOR: Confidence = 0.3;

const HEAVENLY_STEMS: [&str; 10] = ["甲", "乙", "丙", "丁", "戊", "己", "庚", "辛", "壬", "癸"];
const EARTHLY_BRANCHES: [&str; 12] = [
    "子", "丑", "寅", "卯", "辰", "巳", "午", "未", "申", "酉", "戌", "亥",
];
const FIVE_ELEMENTS: [&str; 5] = ["木", "火", "土", "金", "水"];
const CONSTITUTIONS: [&str; 9] = [
    "平和质", "气虚质", "阳虚质", "阴虚质", "痰湿质", "湿热质", "血瘀质", "气郁质", "特禀质",
];

const BIRTH_MARKERS: [&str; 6] = ["birth", "bazi", "chart", "出生", "八字", "命盘"];
const CURRENT_MARKERS: [&str; 4] = ["current", "now", "当前", "现在"];
const SEASONAL_MARKERS: [&str; 8] = [
    "wuyun", "liuqi", "season", "solar_term", "运气", "五运", "六气", "节气",
];
const MERIDIAN_MARKERS: [&str; 8] = [
    "ziwu", "liuzhu", "meridian", "hour", "子午", "流注", "经络", "时辰",
];
const BAGUA_MARKERS: [&str; 6] = ["bagua", "element", "wuxing", "八卦", "五行", "卦"];

/// Normalizes raw features using knowledge-base weights
pub struct FeatureNormalizer<'a> {
    knowledge: &'a KnowledgeBase,
}

impl<'a> FeatureNormalizer<'a> {
    pub fn new(knowledge: &'a KnowledgeBase) -> Self {
        Self { knowledge }
    }

    /// Normalize one raw feature
    pub fn normalize(&self, name: &str, raw: &RawValue) -> Feature {
        Feature {
            name: name.to_string(),
            raw_value: raw.clone(),
            normalized_value: normalize_value(raw),
            weight: self.knowledge.feature_weight(name),
            confidence: feature_confidence(name),
            source: feature_source(name),
        }
    }

    /// Normalize every raw feature, in name order
    pub fn normalize_all(&self, raw_features: &BTreeMap<String, RawValue>) -> Vec<Feature> {
        let features: Vec<Feature> = raw_features
            .iter()
            .map(|(name, raw)| self.normalize(name, raw))
            .collect();
        debug!("Normalized {} features", features.len());
        features
    }
}

/// Map a raw value onto 0.0-1.0
pub fn normalize_value(raw: &RawValue) -> f64 {
    match raw {
        RawValue::Number(n) if n.is_finite() => n.clamp(0.0, 1.0),
        RawValue::Number(_) => NEUTRAL_VALUE,
        RawValue::Text(token) => categorical_value(token.trim()).unwrap_or(NEUTRAL_VALUE),
    }
}

fn categorical_value(token: &str) -> Option<f64> {
    if let Some(i) = position(&HEAVENLY_STEMS, token) {
        return Some((i + 1) as f64 / 10.0);
    }
    if let Some(i) = position(&EARTHLY_BRANCHES, token) {
        return Some((i + 1) as f64 / 12.0);
    }
    if let Some(i) = position(&FIVE_ELEMENTS, token) {
        return Some((i + 1) as f64 / 5.0);
    }
    position(&CONSTITUTIONS, token).map(|i| {
        let step = 0.9 / (CONSTITUTIONS.len() - 1) as f64;
        1.0 - i as f64 * step
    })
}

fn position(table: &[&str], token: &str) -> Option<usize> {
    table.iter().position(|entry| *entry == token)
}

/// Confidence implied by the feature name
pub fn feature_confidence(name: &str) -> Confidence {
    let lower = name.to_lowercase();
    if contains_any(&lower, &BIRTH_MARKERS) {
        (BASE_CONFIDENCE + BIRTH_CONFIDENCE_BONUS).min(BIRTH_CONFIDENCE_CAP)
    } else if contains_any(&lower, &CURRENT_MARKERS) {
        BASE_CONFIDENCE
    } else {
        (BASE_CONFIDENCE - GENERIC_CONFIDENCE_PENALTY).max(GENERIC_CONFIDENCE_FLOOR)
    }
}

/// Provenance bucket implied by the feature name (first match wins)
pub fn feature_source(name: &str) -> FeatureSource {
    let lower = name.to_lowercase();
    if contains_any(&lower, &BIRTH_MARKERS) {
        FeatureSource::BirthChart
    } else if contains_any(&lower, &SEASONAL_MARKERS) {
        FeatureSource::SeasonalQi
    } else if contains_any(&lower, &MERIDIAN_MARKERS) {
        FeatureSource::Meridian
    } else if contains_any(&lower, &BAGUA_MARKERS) {
        FeatureSource::Bagua
    } else {
        FeatureSource::General
    }
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| haystack.contains(m))
}
