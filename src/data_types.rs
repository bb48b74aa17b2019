use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

pub type TableId = i64;
pub type AttributeId = i64;
pub type Timestamp = i64;

/// Declared type of an attribute. Fixed when the attribute is created.
#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, Hash, EnumString, EnumIter, Display, Clone,
    Copy,
)]
pub enum AttributeType {
    #[serde(rename = "str", alias = "string")]
    #[strum(to_string = "str", serialize = "string")]
    Str,
    #[serde(rename = "int")]
    #[strum(serialize = "int")]
    Int,
    #[serde(rename = "float")]
    #[strum(serialize = "float")]
    Float,
    #[serde(rename = "bool")]
    #[strum(serialize = "bool")]
    Bool,
    #[serde(rename = "datetime")]
    #[strum(serialize = "datetime")]
    Datetime,
}

/// Decoded, typed value of an attribute.
///
/// Serializes untagged so a data view renders plain JSON scalars.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Datetime(NaiveDateTime),
}
