//! Verdict extraction from free-text provider replies.
//!
//! Providers are asked for a bare JSON object but routinely wrap it in prose or markdown
//! fences. The scan below tries every `{` in order and accepts the first complete JSON
//! object carrying a boolean `approved`. No verdict is ever inferred from prose.

use serde_json::{Map, Value};

use super::domain::VerificationResult;

const DEFAULT_CONFIDENCE: f32 = 0.5;
const EXCERPT_LEN: usize = 160;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("reply was empty")]
    EmptyReply,
    #[error("no verdict object found in reply: {excerpt}")]
    NoVerdict { excerpt: String },
    #[error("verdict object has no string `reason`")]
    MissingReason,
}

/// Extracts the first embedded verdict object from `raw`.
pub fn parse_verdict(raw: &str) -> Result<VerificationResult, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyReply);
    }

    for (offset, _) in raw.match_indices('{') {
        let Some(object) = leading_object(&raw[offset..]) else {
            continue;
        };
        let Some(approved) = object.get("approved").and_then(Value::as_bool) else {
            continue;
        };

        let reason = object
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .ok_or(ParseError::MissingReason)?;

        let confidence = object
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|value| value as f32)
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        return Ok(VerificationResult {
            approved,
            reason: reason.to_string(),
            confidence,
        });
    }

    Err(ParseError::NoVerdict {
        excerpt: excerpt(raw),
    })
}

/// Parses one JSON value from the start of `text`, ignoring whatever trails it.
fn leading_object(text: &str) -> Option<Map<String, Value>> {
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Object(object))) => Some(object),
        _ => None,
    }
}

fn excerpt(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
