//! Recommendation Response Parsing
//!
//! Generative models rarely return exactly the JSON they were asked for. The
//! parser strips Markdown fences, tolerates field-name drift and skips entries
//! it cannot use instead of rejecting the whole response.

use serde_json::Value;

use super::RecommendError;
use crate::types::{Action, CandidateChange, Confidence, Recommendation};

// ============================================================================
// Public entry point
// ============================================================================

/// Parse raw model output into a [`Recommendation`].
///
/// Fails only when no JSON object can be recovered from the text.
pub fn parse_recommendation(raw: &str) -> Result<Recommendation, RecommendError> {
    let body = strip_code_fences(raw);
    let value: Value = serde_json::from_str(body)
        .or_else(|_| serde_json::from_str(outermost_object(body).unwrap_or(body)))
        .map_err(|e| RecommendError::Malformed(format!("not JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| RecommendError::Malformed("top level is not an object".to_string()))?;

    let recommendations = match obj.get("recommendations") {
        Some(Value::Array(items)) => items.iter().filter_map(parse_change).collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            return Err(RecommendError::Malformed(
                "'recommendations' is not a list".to_string(),
            ))
        }
    };

    let estimated_saving_pct = obj
        .get("estimated_saving_pct")
        .or_else(|| obj.get("estimated_energy_saving_pct"))
        .and_then(as_number);

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(Confidence::parse_lenient);

    let explanation = obj
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Recommendation {
        recommendations,
        estimated_saving_pct,
        confidence,
        explanation,
    })
}

// ============================================================================
// Internal helpers
// ============================================================================

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let inner = trimmed.trim_matches('`').trim();
    match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => inner[4..].trim(),
        _ => inner,
    }
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}

fn parse_change(entry: &Value) -> Option<CandidateChange> {
    let parameter = entry
        .get("parameter")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let new_value = entry.get("new_value").and_then(as_number);

    let (Some(parameter), Some(new_value)) = (parameter, new_value) else {
        tracing::debug!(entry = %entry, "Skipping incomplete recommendation entry");
        return None;
    };

    let raw_action = entry.get("action").and_then(Value::as_str).unwrap_or("");
    let action = Action::parse_lenient(raw_action).unwrap_or_else(|| {
        tracing::warn!(parameter, action = raw_action, "Unknown action, treating as maintain");
        Action::Maintain
    });

    Some(CandidateChange {
        parameter: parameter.to_string(),
        action,
        new_value,
    })
}
