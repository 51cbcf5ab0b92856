//! Recovering typed stage payloads from free-form model output.
//!
//! Models are asked for bare JSON but routinely wrap it in markdown fences
//! or surround it with commentary. [`extract_json`] narrows the text down
//! to the most likely JSON literal; [`decode`] parses it into a stage type.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CodecError, CodecResult};

const FENCE: &str = "```";

/// Extract the JSON literal from a completion.
///
/// Precedence:
/// 1. The whole trimmed text is a fenced block (optionally tagged `json`):
///    its trimmed inner content.
/// 2. The trimmed text already is a `{...}` or `[...]` literal: verbatim.
/// 3. The span from the first `{` to the last `}`, unless a `[...]` span
///    exists that is not strictly inside it, in which case that bracket span.
/// 4. The trimmed text unchanged; parsing will fail downstream.
pub fn extract_json(completion: &str) -> &str {
    let trimmed = completion.trim();

    if let Some(inner) = fenced_content(trimmed) {
        return inner;
    }

    if is_bracketed(trimmed, '{', '}') || is_bracketed(trimmed, '[', ']') {
        return trimmed;
    }

    let brace = outer_span(trimmed, '{', '}');
    let bracket = outer_span(trimmed, '[', ']');

    match (brace, bracket) {
        (Some((open, close)), Some((b_open, b_close))) if b_open > open && b_close < close => {
            &trimmed[open..=close]
        }
        (_, Some((b_open, b_close))) => &trimmed[b_open..=b_close],
        (Some((open, close)), None) => &trimmed[open..=close],
        (None, None) => trimmed,
    }
}

/// Inner content of a text that is exactly one fenced code block.
fn fenced_content(text: &str) -> Option<&str> {
    if text.len() < FENCE.len() * 2 || !text.starts_with(FENCE) || !text.ends_with(FENCE) {
        return None;
    }

    let inner = &text[FENCE.len()..text.len() - FENCE.len()];
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    Some(inner.trim())
}

fn is_bracketed(text: &str, open: char, close: char) -> bool {
    text.len() >= 2 && text.starts_with(open) && text.ends_with(close)
}

/// Byte offsets of the first `open` and the last `close`, if ordered.
fn outer_span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then_some((start, end))
}

/// Extract and parse a stage payload.
pub fn decode<T: DeserializeOwned>(completion: &str) -> CodecResult<T> {
    if completion.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_str(extract_json(completion))?)
}

/// Like [`decode`], but a JSON array is accepted when its first element is
/// an object; that element is decoded.
pub fn decode_object_or_first<T: DeserializeOwned>(completion: &str) -> CodecResult<T> {
    let value: Value = decode(completion)?;
    let object = match value {
        Value::Object(_) => value,
        Value::Array(items) => match items.into_iter().next() {
            Some(first @ Value::Object(_)) => first,
            _ => {
                return Err(CodecError::Validation {
                    field: "$".to_string(),
                    reason: "array does not start with an object".to_string(),
                })
            }
        },
        other => {
            return Err(CodecError::Validation {
                field: "$".to_string(),
                reason: format!("expected an object, got {}", json_kind(&other)),
            })
        }
    };
    Ok(serde_json::from_value(object)?)
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
