//! Artifacts produced by the pipeline stages.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Structured requirements produced by the analyst.
///
/// Every field is optional on the wire; keys the model adds beyond the
/// known ones are kept in `extra`. Fields of the wrong shape are coerced
/// rather than failing the whole object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementSpec {
    #[serde(deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(deserialize_with = "lenient_list")]
    pub features: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub constraints: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub edge_cases: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequirementSpec {
    /// Used when the analyst's reply has no decodable object.
    pub fn fallback(requirement: &str) -> Self {
        Self {
            title: "Software Project".to_string(),
            description: requirement.to_string(),
            features: vec!["Core functionality".to_string()],
            constraints: vec!["Python implementation".to_string()],
            edge_cases: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    NeedsRevision,
    /// Any status the reviewer invents.
    #[serde(other)]
    Other,
}

impl ReviewStatus {
    fn from_wire(s: &str) -> Self {
        match s {
            "approved" => ReviewStatus::Approved,
            "needs_revision" => ReviewStatus::NeedsRevision,
            _ => ReviewStatus::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Error,
    Warning,
    Success,
    #[default]
    #[serde(other)]
    Info,
}

impl FindingKind {
    fn from_wire(s: &str) -> Self {
        match s {
            "error" => FindingKind::Error,
            "warning" => FindingKind::Warning,
            "success" => FindingKind::Success,
            _ => FindingKind::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type", default)]
    pub kind: FindingKind,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: String,
}

impl Finding {
    /// A bare string becomes an `info` finding carrying that text.
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => Self {
                kind: map
                    .get("type")
                    .and_then(Value::as_str)
                    .map(FindingKind::from_wire)
                    .unwrap_or_default(),
                message: map.remove("message").map(value_text).unwrap_or_default(),
            },
            other => Self {
                kind: FindingKind::Info,
                message: value_text(other),
            },
        }
    }
}

/// The reviewer's judgment of one code artifact.
///
/// Any syntactically valid object decodes. `status` survives whatever the
/// other fields hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewVerdict {
    #[serde(
        deserialize_with = "lenient_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<ReviewStatus>,
    #[serde(
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<u8>,
    #[serde(
        deserialize_with = "lenient_findings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub findings: Vec<Finding>,
    #[serde(
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub suggestions: Vec<String>,
}

impl ReviewVerdict {
    /// Assumed verdict when the reviewer's reply cannot be decoded.
    pub fn fallback() -> Self {
        Self {
            status: Some(ReviewStatus::Approved),
            score: Some(8),
            ..Default::default()
        }
    }

    /// Only an explicit `approved` status approves. A decoded verdict
    /// without a status counts as a rejection.
    pub fn is_approved(&self) -> bool {
        self.status == Some(ReviewStatus::Approved)
    }
}

/// Object keys that usually hold an entry's human-readable text.
const TEXT_KEYS: [&str; 5] = ["name", "title", "description", "message", "text"];

/// Flatten any JSON value to display text. Objects yield their first
/// text-like field, or their compact JSON.
fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Object(map) => {
            let named = TEXT_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            named.unwrap_or_else(|| Value::Object(map).to_string())
        }
        other => other.to_string(),
    }
}

/// Array entries, or a single bare value as a one-entry list. Nulls drop.
fn value_items(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter(|v| !v.is_null()).collect(),
        Some(other) => vec![other],
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<Value>::deserialize(de)?
        .map(value_text)
        .unwrap_or_default())
}

fn lenient_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(value_items(Option::<Value>::deserialize(de)?)
        .into_iter()
        .map(value_text)
        .collect())
}

fn lenient_findings<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Finding>, D::Error> {
    Ok(value_items(Option::<Value>::deserialize(de)?)
        .into_iter()
        .map(Finding::from_value)
        .collect())
}

/// A non-string status is present but unrecognized.
fn lenient_status<'de, D: Deserializer<'de>>(de: D) -> Result<Option<ReviewStatus>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(ReviewStatus::from_wire(&s)),
        Some(_) => Some(ReviewStatus::Other),
    })
}

/// Scores arrive as integers, floats or numeric strings. Anything else is
/// treated as absent rather than failing the whole verdict.
fn lenient_score<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u8>, D::Error> {
    let raw = Option::<Value>::deserialize(de)?;
    let number = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(0.0, 10.0) as u8))
}

/// Deployment script and when it was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentArtifact {
    pub script: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl DeploymentArtifact {
    pub fn new(script: String) -> Self {
        Self {
            script,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Outputs of one pipeline run, filled in stage order.
///
/// A `None` field means that stage has not completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<RequirementSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentArtifact>,
}

impl PipelineResult {
    /// Names of the completed fields, in execution order.
    pub fn keys(&self) -> Vec<&'static str> {
        [
            ("requirements", self.requirements.is_some()),
            ("code", self.code.is_some()),
            ("review", self.review.is_some()),
            ("final_code", self.final_code.is_some()),
            ("documentation", self.documentation.is_some()),
            ("tests", self.tests.is_some()),
            ("deployment", self.deployment.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, present)| present.then_some(key))
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.keys().len() == 7
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::extract_structured;

    #[test]
    fn requirement_fallback_keeps_input() {
        let spec = RequirementSpec::fallback("test requirement");
        assert_eq!(spec.title, "Software Project");
        assert_eq!(spec.description, "test requirement");
        assert_eq!(spec.features, vec!["Core functionality"]);
        assert_eq!(spec.constraints, vec!["Python implementation"]);
        assert!(spec.edge_cases.is_empty());
    }

    #[test]
    fn partial_requirements_get_field_defaults() {
        let text = r#"{"title":"Calculator","features":["add","subtract"],"stack":"python"}"#;
        let spec = extract_structured(text, RequirementSpec::fallback("x"));
        assert_eq!(spec.title, "Calculator");
        assert_eq!(spec.features, vec!["add", "subtract"]);
        assert!(spec.description.is_empty());
        assert_eq!(spec.extra["stack"], "python");

        let round = serde_json::to_value(&spec).unwrap();
        assert_eq!(round["stack"], "python");
    }

    #[test]
    fn verdict_fallback_is_approved_eight() {
        let v = extract_structured("{incomplete json", ReviewVerdict::fallback());
        assert!(v.is_approved());
        assert_eq!(v.score, Some(8));
    }

    #[test]
    fn verdict_without_status_is_not_approved() {
        let v = extract_structured("{}", ReviewVerdict::fallback());
        assert_eq!(v.status, None);
        assert!(!v.is_approved());
    }

    #[test]
    fn unknown_status_is_other() {
        let v: ReviewVerdict = serde_json::from_str(r#"{"status":"rejected"}"#).unwrap();
        assert_eq!(v.status, Some(ReviewStatus::Other));
        assert!(!v.is_approved());
    }

    #[test]
    fn full_verdict_decodes() {
        let raw = r#"{
            "status": "needs_revision",
            "score": 5,
            "findings": [
                {"type": "error", "message": "division by zero"},
                {"type": "nitpick", "message": "naming"}
            ],
            "suggestions": ["Add error handling"]
        }"#;
        let v: ReviewVerdict = serde_json::from_str(raw).unwrap();
        assert_eq!(v.status, Some(ReviewStatus::NeedsRevision));
        assert_eq!(v.score, Some(5));
        assert_eq!(v.findings[0].kind, FindingKind::Error);
        assert_eq!(v.findings[1].kind, FindingKind::Info);
        assert_eq!(v.suggestions, vec!["Add error handling"]);
    }

    #[test]
    fn string_findings_keep_rejection() {
        let text = r#"{"status":"needs_revision","score":4,"findings":["division by zero unhandled"],"suggestions":["guard the divisor", 3]}"#;
        let v = extract_structured(text, ReviewVerdict::fallback());
        assert_eq!(v.status, Some(ReviewStatus::NeedsRevision));
        assert!(!v.is_approved());
        assert_eq!(v.score, Some(4));
        assert_eq!(v.findings.len(), 1);
        assert_eq!(v.findings[0].kind, FindingKind::Info);
        assert_eq!(v.findings[0].message, "division by zero unhandled");
        assert_eq!(v.suggestions, vec!["guard the divisor", "3"]);
    }

    #[test]
    fn odd_verdict_fields_are_coerced() {
        let raw = r#"{
            "status": "approved",
            "findings": {"type": "warning", "message": {"text": "slow loop"}},
            "suggestions": "add docstrings"
        }"#;
        let v: ReviewVerdict = serde_json::from_str(raw).unwrap();
        assert!(v.is_approved());
        assert_eq!(v.findings[0].kind, FindingKind::Warning);
        assert_eq!(v.findings[0].message, "slow loop");
        assert_eq!(v.suggestions, vec!["add docstrings"]);
    }

    #[test]
    fn non_string_status_is_other() {
        let v: ReviewVerdict = serde_json::from_str(r#"{"status": 1, "score": 9}"#).unwrap();
        assert_eq!(v.status, Some(ReviewStatus::Other));
        assert!(!v.is_approved());
        assert_eq!(v.score, Some(9));
    }

    #[test]
    fn off_shape_requirements_keep_title() {
        let text = r#"{"title":"Calculator","features":[{"name":"add"},{"op":"sub"},null,7],"edge_cases":"division by zero","constraints":null,"description":42}"#;
        let spec = extract_structured(text, RequirementSpec::fallback("x"));
        assert_eq!(spec.title, "Calculator");
        assert_eq!(spec.description, "42");
        assert_eq!(spec.features, vec!["add", r#"{"op":"sub"}"#, "7"]);
        assert_eq!(spec.edge_cases, vec!["division by zero"]);
        assert!(spec.constraints.is_empty());
        assert!(spec.extra.is_empty());
    }

    #[test]
    fn scores_are_lenient() {
        let score = |raw: &str| serde_json::from_str::<ReviewVerdict>(raw).unwrap().score;
        assert_eq!(score(r#"{"score": 8.6}"#), Some(9));
        assert_eq!(score(r#"{"score": "7"}"#), Some(7));
        assert_eq!(score(r#"{"score": 42}"#), Some(10));
        assert_eq!(score(r#"{"score": -3}"#), Some(0));
        assert_eq!(score(r#"{"score": "8/10"}"#), None);
        assert_eq!(score(r#"{"score": null}"#), None);
    }

    #[test]
    fn verdict_serializes_with_wire_names() {
        let json = serde_json::to_value(ReviewVerdict::fallback()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "approved", "score": 8}));
    }

    #[test]
    fn result_keys_follow_execution_order() {
        let mut result = PipelineResult::default();
        assert!(result.keys().is_empty());

        result.requirements = Some(RequirementSpec::fallback("r"));
        result.code = Some("code".into());
        assert_eq!(result.keys(), vec!["requirements", "code"]);
        assert!(!result.is_complete());

        let json = serde_json::to_value(&result).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(json.get("review").is_none());
    }

    #[test]
    fn deployment_timestamp_is_rfc3339() {
        let d = DeploymentArtifact::new("#!/bin/bash".into());
        assert!(chrono::DateTime::parse_from_rfc3339(&d.timestamp).is_ok());
    }
}
