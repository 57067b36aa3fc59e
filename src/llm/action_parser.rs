//! Parser for the action grammar emitted by the phone model:
//!
//!   do(action="Tap", element=[500,300])
//!   do(action="Type", text="hello, world")
//!   finish(message="done")
//!
//! Parsing never fails. Text that matches neither form becomes a `Finish`
//! carrying the text itself, so a confused model ends the task with its own words
//! instead of crashing the session.
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::agent_engine::state::{Action, Field, FieldError, NormalizedPoint};

const DEFAULT_FINISH_MESSAGE: &str = "Task completed";

/// Longest gesture accepted from the model; anything above is treated as garbage.
const MAX_GESTURE_MS: u64 = 60_000;

/// Parse one action fragment into a typed [`Action`].
pub fn parse_action(text: &str) -> Action {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("do(") {
        let inner = rest.strip_suffix(')').unwrap_or(rest);
        let args = parse_keyword_arguments(inner);
        return action_from_args(args);
    }

    if text.starts_with("finish(") {
        return Action::Finish {
            message: extract_finish_message(text),
        };
    }

    tracing::error!(text = %text, "unrecognised action format");
    Action::Finish {
        message: text.to_string(),
    }
}

fn finish_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)finish\(message=["'](.*)["']\)"#).expect("finish regex is valid")
    })
}

fn extract_finish_message(text: &str) -> String {
    if let Some(m) = finish_regex().captures(text).and_then(|c| c.get(1)) {
        if !m.as_str().is_empty() {
            return m.as_str().to_string();
        }
    }

    // Loose fallback: drop the call prefix and every quote, then the closing paren.
    let loose: String = text
        .replacen("finish(message=", "", 1)
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect();
    if !loose.is_empty() && loose != text {
        let mut chars = loose.chars();
        chars.next_back();
        let message = chars.as_str();
        if !message.is_empty() {
            return message.to_string();
        }
    }

    DEFAULT_FINISH_MESSAGE.to_string()
}

/// `key=value` pairs of a `do(...)` argument list. Later duplicates win;
/// segments without `=` are dropped.
pub fn parse_keyword_arguments(args: &str) -> HashMap<String, Value> {
    let mut result = HashMap::new();
    if args.trim().is_empty() {
        return result;
    }

    for param in smart_split(args, ',') {
        let Some((key, value)) = param.split_once('=') else {
            tracing::debug!(segment = %param, "argument without '=' ignored");
            continue;
        };
        result.insert(key.trim().to_string(), parse_value(value));
    }
    result
}

/// Split on `delimiter` only outside quotes and at bracket depth 0.
///
/// A quote opens with `"` or `'` and closes only with the same character, unless
/// preceded by a backslash. An unterminated quote swallows the rest of the input.
/// Empty segments are discarded.
pub fn smart_split(input: &str, delimiter: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth: i32 = 0;
    let mut prev: Option<char> = None;

    for c in input.chars() {
        let escaped = prev == Some('\\');
        match c {
            '"' | '\'' if !escaped => {
                match quote {
                    None => quote = Some(c),
                    Some(open) if open == c => quote = None,
                    Some(_) => {}
                }
                current.push(c);
            }
            '[' if quote.is_none() => {
                depth += 1;
                current.push(c);
            }
            ']' if quote.is_none() => {
                depth -= 1;
                current.push(c);
            }
            c if c == delimiter && quote.is_none() && depth == 0 => {
                push_segment(&mut result, &current);
                current.clear();
            }
            c => current.push(c),
        }
        prev = Some(c);
    }
    push_segment(&mut result, &current);
    result
}

fn push_segment(out: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Coerce one raw argument value: quoted string, JSON array, number, boolean,
/// or the trimmed raw text.
pub fn parse_value(raw: &str) -> Value {
    let value = raw.trim();
    if value.is_empty() {
        return Value::String(String::new());
    }

    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        return Value::String(value[1..value.len() - 1].to_string());
    }

    if value.starts_with('[') && value.ends_with(']') {
        return match serde_json::from_str::<Value>(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(value = %value, error = %e, "array argument is not valid JSON");
                Value::String(value.to_string())
            }
        };
    }

    if let Some(n) = parse_number(value) {
        return n;
    }

    match value {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}

/// Finite decimal number, preferring an integer representation.
fn parse_number(value: &str) -> Option<Value> {
    if let Ok(i) = value.parse::<i64>() {
        return Some(Value::from(i));
    }
    // f64 parsing accepts "inf"/"nan"; only plain digits, sign, dot and exponent count.
    if !value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    let f = value.parse::<f64>().ok().filter(|f| f.is_finite())?;
    serde_json::Number::from_f64(f).map(Value::Number)
}

// ── Argument bag → typed action ──

fn action_from_args(mut args: HashMap<String, Value>) -> Action {
    let name = match args.remove("action") {
        Some(v) => scalar_to_string(&v).unwrap_or_else(|| v.to_string()),
        None => String::new(),
    };

    match name.as_str() {
        "Launch" => Action::Launch {
            app: required_text(&args, "app"),
        },
        "Tap" => Action::Tap {
            element: point_field(&args, "element"),
            message: optional_text(&args, "message"),
        },
        "Double Tap" => Action::DoubleTap {
            element: point_field(&args, "element"),
        },
        "Long Press" => Action::LongPress {
            element: point_field(&args, "element"),
            duration_ms: duration_ms(&args),
        },
        "Swipe" => Action::Swipe {
            start: point_field(&args, "start"),
            end: point_field(&args, "end"),
            duration_ms: duration_ms(&args),
        },
        "Type" | "Type_Name" => Action::Type {
            text: required_text(&args, "text"),
        },
        "Wait" => Action::Wait {
            duration: optional_text(&args, "duration"),
        },
        "Back" => Action::Back,
        "Home" => Action::Home,
        "Note" => Action::Note {
            message: optional_text(&args, "message").unwrap_or_else(|| "True".into()),
        },
        "Call_API" => Action::CallApi {
            instruction: optional_text(&args, "instruction").unwrap_or_default(),
        },
        "Interact" => Action::Interact {
            message: optional_text(&args, "message"),
        },
        "Take_over" => Action::TakeOver {
            message: optional_text(&args, "message")
                .unwrap_or_else(|| "user intervention required".into()),
        },
        _ => Action::Unknown { name },
    }
}

/// Strings, numbers and booleans as text; arrays, objects and null yield `None`.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn optional_text(args: &HashMap<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(scalar_to_string)
}

fn required_text(args: &HashMap<String, Value>, key: &str) -> Field<String> {
    let value = args.get(key).ok_or_else(|| FieldError::missing(key))?;
    match scalar_to_string(value) {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(FieldError::missing(key)),
        None => Err(FieldError::invalid(key, format!("expected text, got {value}"))),
    }
}

fn point_field(args: &HashMap<String, Value>, key: &str) -> Field<NormalizedPoint> {
    let value = args.get(key).ok_or_else(|| FieldError::missing(key))?;
    let Some(items) = value.as_array() else {
        return Err(FieldError::invalid(key, format!("expected [x, y], got {value}")));
    };
    if items.len() != 2 {
        return Err(FieldError::invalid(
            key,
            format!("expected 2 coordinates, got {}", items.len()),
        ));
    }
    match (coordinate(&items[0]), coordinate(&items[1])) {
        (Some(x), Some(y)) => Ok(NormalizedPoint::new(x, y)),
        _ => Err(FieldError::invalid(
            key,
            format!("coordinates must be numbers, got {value}"),
        )),
    }
}

/// A number, or a string holding one (`"500"`).
fn coordinate(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|f| f.is_finite())
}

fn duration_ms(args: &HashMap<String, Value>) -> Option<u64> {
    let value = args.get("duration_ms")?;
    let ms = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f <= MAX_GESTURE_MS as f64)
                .map(|f| f as u64)
        })
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
        .filter(|ms| *ms <= MAX_GESTURE_MS);
    if ms.is_none() {
        tracing::warn!(value = %value, "ignoring unusable duration_ms");
    }
    ms
}
