//! Decision parsing: turn the model's text answer into a [`LoanDecision`].
//!
//! The decision is accepted only as a JSON object with exactly four keys:
//! `stance` (boolean) and `insight_1`..`insight_3` (non-empty strings).
//! Anything else fails the evaluation; there is no partial decision.
//!
//! Cleanup applied before parsing, in order:
//! 1. Trim surrounding whitespace
//! 2. Strip an outer ```` ```json ```` fence (models add them despite the prompt)
//! 3. Remove every line break, as the models break lines inside the object

use crate::error::EvaluationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The structured outcome of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDecision {
    /// `true` when the applicant is judged suitable for a loan.
    pub stance: bool,
    pub insight_1: String,
    pub insight_2: String,
    pub insight_3: String,
}

const INSIGHT_FIELDS: [&str; 3] = ["insight_1", "insight_2", "insight_3"];

/// Parse and validate a raw decision answer.
///
/// # Errors
/// * [`EvaluationError::DecisionParse`] — the cleaned text is not JSON
/// * [`EvaluationError::DecisionValidation`] — JSON, but not the decision shape
pub fn parse_decision(raw: &str) -> Result<LoanDecision, EvaluationError> {
    let cleaned = clean_decision_text(raw);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| EvaluationError::DecisionParse {
            reason: e.to_string(),
            raw: raw.to_string(),
        })?;
    validate_decision(value)
}

/// Check a parsed JSON value against the four-field decision shape.
pub fn validate_decision(value: Value) -> Result<LoanDecision, EvaluationError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(invalid(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    if let Some(extra) = map
        .keys()
        .find(|k| *k != "stance" && !INSIGHT_FIELDS.contains(&k.as_str()))
    {
        return Err(invalid(format!("unexpected field `{extra}`")));
    }

    let stance = match map.remove("stance") {
        Some(Value::Bool(b)) => b,
        Some(other) => {
            return Err(invalid(format!(
                "`stance` must be a boolean, got {}",
                json_kind(&other)
            )))
        }
        None => return Err(invalid("missing field `stance`".into())),
    };

    let [insight_1, insight_2, insight_3] = INSIGHT_FIELDS.map(|f| take_insight(&mut map, f));

    Ok(LoanDecision {
        stance,
        insight_1: insight_1?,
        insight_2: insight_2?,
        insight_3: insight_3?,
    })
}

fn take_insight(map: &mut Map<String, Value>, field: &str) -> Result<String, EvaluationError> {
    match map.remove(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(invalid(format!("`{field}` is empty"))),
        Some(other) => Err(invalid(format!(
            "`{field}` must be a string, got {}",
            json_kind(&other)
        ))),
        None => Err(invalid(format!("missing field `{field}`"))),
    }
}

fn invalid(reason: String) -> EvaluationError {
    EvaluationError::DecisionValidation { reason }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Cleanup ──────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

fn clean_decision_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    };
    unfenced.replace(['\n', '\r'], "")
}
