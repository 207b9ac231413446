// Scalar lexer: classify one raw field fragment from a VALUES tuple.
// NULL, quoted strings (optionally holding JSON), integers, reals, and a
// verbatim fallback. No fragment is rejected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    // Quoted content that parsed as a JSON document, or a non-scalar loaded from JSON.
    Structured(Value),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    // Plain-text rendering used for grouping keys in reports.
    pub fn display_key(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Real(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Structured(v) => v.to_string(),
        }
    }
}

impl From<Value> for ScalarValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::Text(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => match n.as_f64() {
                    Some(f) => Self::Real(f),
                    None => Self::Structured(Value::Number(n)),
                },
            },
            other => Self::Structured(other),
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => s.serialize_unit(),
            Self::Integer(i) => s.serialize_i64(*i),
            Self::Real(f) => s.serialize_f64(*f),
            Self::Text(t) => s.serialize_str(t),
            Self::Structured(v) => v.serialize(s),
        }
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Value::deserialize(d).map(ScalarValue::from)
    }
}

// Classify a fragment. Malformed JSON degrades to Text.
pub fn lex_scalar(fragment: &str) -> ScalarValue {
    lex_scalar_tracked(fragment).0
}

// Same as `lex_scalar`, also reporting whether JSON-looking content failed to parse.
pub fn lex_scalar_tracked(fragment: &str) -> (ScalarValue, bool) {
    let fragment = fragment.trim();

    if fragment.eq_ignore_ascii_case("NULL") {
        return (ScalarValue::Null, false);
    }

    if fragment.len() >= 2 && fragment.starts_with('\'') && fragment.ends_with('\'') {
        let content = unescape(&fragment[1..fragment.len() - 1]);
        let head = content.trim_start();
        if head.starts_with('{') || head.starts_with('[') {
            return match serde_json::from_str::<Value>(&content) {
                Ok(tree) => (ScalarValue::Structured(tree), false),
                Err(_) => (ScalarValue::Text(content), true),
            };
        }
        return (ScalarValue::Text(content), false);
    }

    if is_integer_literal(fragment) {
        if let Ok(i) = fragment.parse::<i64>() {
            return (ScalarValue::Integer(i), false);
        }
    }

    if is_real_literal(fragment) {
        if let Ok(f) = fragment.parse::<f64>() {
            if f.is_finite() {
                return (ScalarValue::Real(f), false);
            }
        }
    }

    (ScalarValue::Text(fragment.to_string()), false)
}

// Single left-to-right pass: `\'` -> `'`, `\\` -> `\`; any other escape is kept as written.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

// Digits with a decimal point and/or exponent; rejects words like `inf` or `nan`.
// Like integers, only a `-` sign may lead, so `+5` stays text.
fn is_real_literal(s: &str) -> bool {
    !s.starts_with('+')
        && s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
}
