use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::data_types::{AttributeType, AttributeValue, TableId};

/// Definition of one attribute, as submitted when defining a table and as
/// echoed back by the schema view.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub attr_type: AttributeType,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub required: bool,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct TableDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl TableDefinition {
    /// Parse a `{name, fields: [...]}` document. Both keys are mandatory.
    pub fn from_json(value: Value) -> Result<Self, String> {
        let definition: TableDefinition =
            serde_json::from_value(value).map_err(|e| e.to_string())?;

        if definition.name.trim().is_empty() {
            return Err("Table name can't be blank".to_string());
        }
        if let Some(field) = definition.fields.iter().find(|f| f.name.trim().is_empty()) {
            return Err(format!(
                "Field names can't be blank (field of type {})",
                field.attr_type
            ));
        }

        Ok(definition)
    }
}

/// Schema projection of a table: field definitions only, no data.
#[derive(Serialize, Debug, PartialEq, Eq, Clone)]
pub struct SchemaView {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

/// A freshly defined table: its identifier plus the resolved schema.
#[derive(Serialize, Debug, PartialEq, Eq, Clone)]
pub struct CreatedTable {
    pub id: TableId,
    #[serde(flatten)]
    pub schema: SchemaView,
}

/// Data projection of a table: the current value of every attribute, keyed
/// by attribute name, plus the table name under `name`.
///
/// Attributes that were never set are present with an absent (`null`)
/// value. An attribute called `name` is shadowed by the table name.
#[derive(Debug, PartialEq, Clone)]
pub struct DataView {
    pub name: String,
    pub values: Vec<(String, Option<AttributeValue>)>,
}

impl DataView {
    pub fn get(&self, attribute_name: &str) -> Option<&Option<AttributeValue>> {
        self.values
            .iter()
            .find(|(name, _)| name == attribute_name)
            .map(|(_, value)| value)
    }
}

impl Serialize for DataView {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let shadowed = self.values.iter().any(|(name, _)| name == "name");
        let len = self.values.len() + usize::from(!shadowed);

        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.values {
            if name == "name" {
                map.serialize_entry(name, &self.name)?;
            } else {
                map.serialize_entry(name, value)?;
            }
        }
        if !shadowed {
            map.serialize_entry("name", &self.name)?;
        }
        map.end()
    }
}

/// A table in a listing: its identifier and its data view.
#[derive(Serialize, Debug, PartialEq, Clone)]
pub struct TableSummary {
    pub id: TableId,
    pub table: DataView,
}
