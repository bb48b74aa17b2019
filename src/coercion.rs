//! Conversion between the stored textual form of an attribute value and its
//! typed in-memory form.
//!
//! Candidates arrive as JSON values. The JSON kind of a candidate has to match
//! the declared type exactly: the text `"5"` is not an `int`, the integer `5`
//! is not a `float`. Each [`AttributeType`] is served by one [`Coercer`],
//! picked once in [`AttributeType::coercer`].

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::data_types::{AttributeType, AttributeValue};

/// Day/month/year, e.g. `06/06/2006`.
pub const DATETIME_FORMAT: &str = "%d/%m/%Y";

pub const TRUE_LITERAL: &str = "True";
pub const FALSE_LITERAL: &str = "False";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("Expected a value of type {expected}, got {found}")]
    TypeMismatch {
        expected: AttributeType,
        found: String,
    },

    #[error("Stored text {raw:?} doesn't decode as {attr_type}")]
    Undecodable {
        attr_type: AttributeType,
        raw: String,
    },
}

pub trait Coercer: Sync {
    /// Canonical text for a candidate, or `None` if its kind doesn't match.
    fn encode(&self, candidate: &Value) -> Option<String>;

    /// Decode non-empty stored text.
    fn decode(&self, raw: &str) -> Option<AttributeValue>;

    /// Strict parse of caller-supplied text, used by typed filtering.
    fn parse(&self, raw: &str) -> Option<AttributeValue> {
        self.decode(raw)
    }
}

struct StrCoercer;
struct IntCoercer;
struct FloatCoercer;
struct BoolCoercer;
struct DatetimeCoercer;

impl Coercer for StrCoercer {
    fn encode(&self, candidate: &Value) -> Option<String> {
        candidate.as_str().map(str::to_string)
    }

    fn decode(&self, raw: &str) -> Option<AttributeValue> {
        Some(AttributeValue::Str(raw.to_string()))
    }
}

impl Coercer for IntCoercer {
    fn encode(&self, candidate: &Value) -> Option<String> {
        match candidate {
            Value::Number(n) => n.as_i64().map(|i| i.to_string()),
            _ => None,
        }
    }

    fn decode(&self, raw: &str) -> Option<AttributeValue> {
        raw.parse::<i64>().ok().map(AttributeValue::Int)
    }
}

impl Coercer for FloatCoercer {
    fn encode(&self, candidate: &Value) -> Option<String> {
        match candidate {
            Value::Number(n) if n.is_f64() => n.as_f64().map(format_float),
            _ => None,
        }
    }

    fn decode(&self, raw: &str) -> Option<AttributeValue> {
        raw.parse::<f64>().ok().map(AttributeValue::Float)
    }
}

impl Coercer for BoolCoercer {
    fn encode(&self, candidate: &Value) -> Option<String> {
        candidate.as_bool().map(|b| {
            if b {
                TRUE_LITERAL.to_string()
            } else {
                FALSE_LITERAL.to_string()
            }
        })
    }

    // Only the affirmative literal is compared: anything else, malformed
    // tokens included, is false.
    fn decode(&self, raw: &str) -> Option<AttributeValue> {
        Some(AttributeValue::Bool(raw == TRUE_LITERAL))
    }

    fn parse(&self, raw: &str) -> Option<AttributeValue> {
        match raw {
            TRUE_LITERAL | "true" => Some(AttributeValue::Bool(true)),
            FALSE_LITERAL | "false" => Some(AttributeValue::Bool(false)),
            _ => None,
        }
    }
}

impl Coercer for DatetimeCoercer {
    // Native dates never reach this point as such: only text in the
    // day/month/year pattern is accepted.
    fn encode(&self, candidate: &Value) -> Option<String> {
        let text = candidate.as_str()?;
        parse_datetime(text).map(|_| text.to_string())
    }

    fn decode(&self, raw: &str) -> Option<AttributeValue> {
        parse_datetime(raw).map(AttributeValue::Datetime)
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    // chrono takes short years and skips leading spaces: require `d/m/yyyy`
    if !has_date_shape(raw) {
        return None;
    }

    NaiveDate::parse_from_str(raw, DATETIME_FORMAT)
        .ok()?
        .and_hms_opt(0, 0, 0)
}

fn has_date_shape(raw: &str) -> bool {
    let digits = |part: &str, min: usize, max: usize| {
        (min..=max).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    };

    match raw.split('/').collect::<Vec<_>>()[..] {
        [day, month, year] => digits(day, 1, 2) && digits(month, 1, 2) && digits(year, 4, 4),
        _ => false,
    }
}

// Shortest round-trip form that still reads as a float (`5.0`, not `5`).
fn format_float(f: f64) -> String {
    format!("{f:?}")
}

fn describe_kind(candidate: &Value) -> String {
    match candidate {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(n) if n.is_f64() => "a float".to_string(),
        Value::Number(_) => "an integer".to_string(),
        Value::String(s) => format!("the text {s:?}"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

impl AttributeType {
    pub fn coercer(&self) -> &'static dyn Coercer {
        match self {
            AttributeType::Str => &StrCoercer,
            AttributeType::Int => &IntCoercer,
            AttributeType::Float => &FloatCoercer,
            AttributeType::Bool => &BoolCoercer,
            AttributeType::Datetime => &DatetimeCoercer,
        }
    }

    pub fn validate(&self, candidate: &Value) -> bool {
        self.coercer().encode(candidate).is_some()
    }

    /// Validate a candidate and produce the text to store for it.
    pub fn encode(&self, candidate: &Value) -> Result<String, CoercionError> {
        self.coercer()
            .encode(candidate)
            .ok_or_else(|| CoercionError::TypeMismatch {
                expected: *self,
                found: describe_kind(candidate),
            })
    }

    /// Decode stored text. Absent text stays absent; empty text is absent
    /// for every type but `str`.
    pub fn decode(
        &self,
        raw: Option<&str>,
    ) -> Result<Option<AttributeValue>, CoercionError> {
        match raw {
            None => Ok(None),
            Some("") if *self != AttributeType::Str => Ok(None),
            Some(raw) => self.coercer().decode(raw).map(Some).ok_or_else(|| {
                CoercionError::Undecodable {
                    attr_type: *self,
                    raw: raw.to_string(),
                }
            }),
        }
    }

    pub fn parse(&self, raw: &str) -> Option<AttributeValue> {
        self.coercer().parse(raw)
    }
}
