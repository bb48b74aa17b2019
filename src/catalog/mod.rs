use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::coercion::CoercionError;
use crate::data_types::{AttributeId, AttributeType, AttributeValue, TableId};
use crate::repository::interface::{AttributeRecord, TableRecord};
use crate::schema::{DataView, FieldDefinition, SchemaView, TableDefinition};

pub mod filter;
pub mod metastore;
mod repository;

pub use filter::{FilterEngine, FilterMode};
pub use repository::{DeletePolicy, RepositoryStore, StoreOptions};

pub type Table = TableRecord;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    // Attribute value errors
    #[error("Attribute type for {name} does not match: {source}")]
    AttributeTypeMismatch {
        name: String,
        #[source]
        source: CoercionError,
    },

    #[error("The attribute {name} is required")]
    MissingRequiredAttribute { name: String },

    #[error("The attribute {name} doesn't exist in this table")]
    UnknownAttribute { name: String },

    #[error("The value of attribute {name} is already used by another table")]
    UniqueAttributeViolation { name: String },

    #[error("Stored value of attribute {name} is corrupt: {source}")]
    CorruptAttributeValue {
        name: String,
        #[source]
        source: CoercionError,
    },

    #[error("Attribute {name} has an unknown type {attr_type:?}")]
    UnknownAttributeType { name: String, attr_type: String },

    // Lookup errors
    #[error("Table {id} doesn't exist")]
    TableNotFound { id: TableId },

    #[error("Attribute {name:?} doesn't exist in table {table_id}")]
    AttributeNotFound { table_id: TableId, name: String },

    // Definition errors
    #[error("Invalid table definition: {reason}")]
    InvalidDefinition { reason: String },

    #[error("Attribute {name:?} is defined more than once")]
    DuplicateAttribute { name: String },

    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    // Metastore implementation errors
    #[error("Internal SQL error: {0:?}")]
    SqlxError(sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// An attribute with its declared type resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: AttributeId,
    pub table_id: TableId,
    pub name: String,
    pub attr_type: AttributeType,
    /// Canonical stored text, absent until the first write
    pub value: Option<String>,
    pub unique: bool,
    pub required: bool,
}

impl TryFrom<AttributeRecord> for Attribute {
    type Error = CatalogError;

    fn try_from(record: AttributeRecord) -> CatalogResult<Self> {
        let attr_type = AttributeType::from_str(&record.attr_type).map_err(|_| {
            CatalogError::UnknownAttributeType {
                name: record.name.clone(),
                attr_type: record.attr_type.clone(),
            }
        })?;

        Ok(Self {
            id: record.id,
            table_id: record.table_id,
            name: record.name,
            attr_type,
            value: record.value,
            unique: record.is_unique,
            required: record.is_required,
        })
    }
}

impl Attribute {
    /// Decode the stored text under the attribute's type.
    pub fn typed_value(&self) -> CatalogResult<Option<AttributeValue>> {
        self.attr_type
            .decode(self.value.as_deref())
            .map_err(|source| CatalogError::CorruptAttributeValue {
                name: self.name.clone(),
                source,
            })
    }

    pub fn definition(&self) -> FieldDefinition {
        FieldDefinition {
            name: self.name.clone(),
            attr_type: self.attr_type,
            unique: self.unique,
            required: self.required,
        }
    }
}

#[async_trait]
pub trait AttributeStore: Sync + Send {
    /// Persist a new attribute of `table_id` with an absent value.
    async fn create(
        &self,
        table_id: TableId,
        field: &FieldDefinition,
    ) -> CatalogResult<Attribute>;

    async fn get(&self, table_id: TableId, name: &str) -> CatalogResult<Attribute>;

    /// Validate `candidate` against the attribute's type and store its
    /// canonical text. On failure the stored value is left untouched.
    async fn set_value(
        &self,
        attribute: &Attribute,
        candidate: &Value,
    ) -> CatalogResult<Attribute>;

    fn get_value(&self, attribute: &Attribute) -> CatalogResult<Option<AttributeValue>> {
        attribute.typed_value()
    }

    /// Attributes called `name` whose decoded value equals `value`, across
    /// all tables unless narrowed to one. Rows whose stored text doesn't
    /// decode never match.
    async fn find_by_name_and_value(
        &self,
        name: &str,
        value: &AttributeValue,
        table_id: Option<TableId>,
    ) -> CatalogResult<Vec<Attribute>>;
}

#[async_trait]
pub trait TableStore: Sync + Send {
    /// Create a table and its attributes, in definition order.
    async fn create_with_attributes(
        &self,
        definition: &TableDefinition,
    ) -> CatalogResult<(Table, Vec<Attribute>)>;

    async fn get(&self, table_id: TableId) -> CatalogResult<Table>;

    /// All active tables, oldest first.
    async fn list(&self) -> CatalogResult<Vec<Table>>;

    async fn attributes(&self, table_id: TableId) -> CatalogResult<Vec<Attribute>>;

    /// Check required attributes, then write every supplied value.
    async fn insert_data(
        &self,
        table_id: TableId,
        values: &Map<String, Value>,
    ) -> CatalogResult<()>;

    async fn schema_view(&self, table: &Table) -> CatalogResult<SchemaView>;

    async fn data_view(&self, table: &Table) -> CatalogResult<DataView>;

    /// Tables owning an attribute that matches any `(name, value)` pair,
    /// each table once.
    async fn filter_by_attributes(
        &self,
        criteria: &[(String, String)],
    ) -> CatalogResult<Vec<Table>>;

    async fn delete(&self, table_id: TableId) -> CatalogResult<()>;
}
