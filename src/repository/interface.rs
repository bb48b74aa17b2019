use std::fmt::Debug;

use async_trait::async_trait;

pub use crate::data_types::{AttributeId, TableId, Timestamp};
use crate::schema::FieldDefinition;

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct TableRecord {
    pub id: TableId,
    pub name: String,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct AttributeRecord {
    pub id: AttributeId,
    pub table_id: TableId,
    pub name: String,
    pub attr_type: String,
    pub value: Option<String>,
    pub is_unique: bool,
    pub is_required: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Wrapper for conversion of database-specific error codes into actual errors
#[derive(Debug)]
pub enum Error {
    UniqueConstraintViolation(sqlx::Error),
    FKConstraintViolation(sqlx::Error),

    // All other errors
    SqlxError(sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The persistence collaborator: rows for tables and their attributes,
/// reachable through inserts, updates and predicate lookups.
#[async_trait]
pub trait Repository: Send + Sync + Debug {
    async fn setup(&self);

    async fn create_table(&self, table_name: &str) -> Result<TableId, Error>;

    async fn create_attribute(
        &self,
        table_id: TableId,
        field: &FieldDefinition,
    ) -> Result<AttributeId, Error>;

    /// Create a table and all its attributes (in order) in one transaction.
    async fn create_table_with_attributes(
        &self,
        table_name: &str,
        fields: &[FieldDefinition],
    ) -> Result<(TableId, Vec<AttributeId>), Error>;

    async fn get_table(&self, table_id: TableId) -> Result<TableRecord, Error>;

    /// All tables, oldest first.
    async fn list_tables(&self, include_inactive: bool) -> Result<Vec<TableRecord>, Error>;

    /// Active tables among `table_ids`, oldest first.
    async fn get_tables_by_ids(
        &self,
        table_ids: &[TableId],
    ) -> Result<Vec<TableRecord>, Error>;

    /// Attributes of a table in definition order.
    async fn get_table_attributes(
        &self,
        table_id: TableId,
    ) -> Result<Vec<AttributeRecord>, Error>;

    async fn get_required_attributes(
        &self,
        table_id: TableId,
    ) -> Result<Vec<AttributeRecord>, Error>;

    async fn get_attribute(
        &self,
        table_id: TableId,
        attribute_name: &str,
    ) -> Result<AttributeRecord, Error>;

    async fn get_attributes_by_name(
        &self,
        attribute_name: &str,
        table_id: Option<TableId>,
    ) -> Result<Vec<AttributeRecord>, Error>;

    async fn update_attribute_value(
        &self,
        attribute_id: AttributeId,
        value: Option<&str>,
    ) -> Result<(), Error>;

    /// Write several attribute values in one transaction.
    async fn update_attribute_values(
        &self,
        values: &[(AttributeId, String)],
    ) -> Result<(), Error>;

    /// Active tables owning at least one attribute whose name and stored text
    /// equal one of the `(name, value)` pairs. Each table appears once.
    async fn find_tables_by_attribute_values(
        &self,
        criteria: &[(String, String)],
    ) -> Result<Vec<TableRecord>, Error>;

    async fn deactivate_table(&self, table_id: TableId) -> Result<(), Error>;

    async fn delete_table(&self, table_id: TableId) -> Result<(), Error>;
}
