//! Request boundary
//!
//! JSON payloads are validated once here and turned into typed records; the
//! pipeline behind this point never sees malformed shapes.
//!
//! Accepted shape:
//! ```json
//! {
//!   "raw_features": { "pulse_rate": 0.8, "birth_stem": "丙" },
//!   "algorithm_results": { "tongue": { "label": "气虚质", "confidence": 0.8 } }
//! }
//! ```
//! Either key may be absent or `null` (treated as empty).

use crate::error::{DiagnosisError, EngineResult};
use crate::types::{AlgorithmResult, RawValue};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Validated diagnosis request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosisRequest {
    pub raw_features: BTreeMap<String, RawValue>,
    /// Votes keyed by algorithm name
    pub algorithm_results: BTreeMap<String, AlgorithmResult>,
}

impl DiagnosisRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.raw_features.insert(name.into(), value.into());
        self
    }

    pub fn with_vote(
        mut self,
        algorithm: impl Into<String>,
        label: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let algorithm = algorithm.into();
        let vote = AlgorithmResult::new(algorithm.clone(), label, confidence);
        self.algorithm_results.insert(algorithm, vote);
        self
    }

    /// Parse and validate a JSON request document
    pub fn from_json_str(payload: &str) -> EngineResult<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| invalid(format!("request is not valid JSON: {}", e)))?;
        Self::from_json_value(&value)
    }

    /// Validate an already-parsed JSON request
    pub fn from_json_value(value: &Value) -> EngineResult<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| invalid("request must be a JSON object"))?;

        let raw_features = match optional_object(root, "raw_features")? {
            Some(map) => parse_raw_features(map)?,
            None => BTreeMap::new(),
        };

        let algorithm_results = match optional_object(root, "algorithm_results")? {
            Some(map) => parse_algorithm_results(map)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            raw_features,
            algorithm_results,
        })
    }
}

fn optional_object<'v>(
    root: &'v Map<String, Value>,
    key: &str,
) -> EngineResult<Option<&'v Map<String, Value>>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(invalid(format!(
            "'{}' must be a mapping, got {}",
            key,
            json_kind(other)
        ))),
    }
}

/// Validate a `raw_features` mapping
pub fn parse_raw_features(map: &Map<String, Value>) -> EngineResult<BTreeMap<String, RawValue>> {
    map.iter()
        .map(|(name, value)| {
            let raw = match value {
                Value::Number(n) => n.as_f64().map(RawValue::Number).ok_or_else(|| {
                    invalid(format!("feature '{}' is not representable as a number", name))
                })?,
                Value::String(s) => RawValue::Text(s.clone()),
                other => {
                    return Err(invalid(format!(
                        "feature '{}' must be a number or string, got {}",
                        name,
                        json_kind(other)
                    )))
                }
            };
            Ok((name.clone(), raw))
        })
        .collect()
}

/// Validate an `algorithm_results` mapping
pub fn parse_algorithm_results(
    map: &Map<String, Value>,
) -> EngineResult<BTreeMap<String, AlgorithmResult>> {
    map.iter()
        .map(|(algorithm, value)| {
            let vote = value.as_object().ok_or_else(|| {
                invalid(format!(
                    "algorithm '{}' must be an object with label and confidence, got {}",
                    algorithm,
                    json_kind(value)
                ))
            })?;

            let label = vote
                .get("label")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .ok_or_else(|| {
                    invalid(format!("algorithm '{}' needs a non-empty string label", algorithm))
                })?;

            let confidence = vote
                .get("confidence")
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    invalid(format!("algorithm '{}' needs a numeric confidence", algorithm))
                })?;

            Ok((
                algorithm.clone(),
                AlgorithmResult::new(algorithm.clone(), label, confidence),
            ))
        })
        .collect()
}

fn invalid(message: impl Into<String>) -> DiagnosisError {
    DiagnosisError::InvalidInput(message.into())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
