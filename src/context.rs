//! The operations exposed to a boundary layer (CLI, HTTP, ...), on top of a
//! [`Metastore`].

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::metastore::Metastore;
use crate::catalog::{CatalogError, CatalogResult, Table};
use crate::data_types::TableId;
use crate::schema::{CreatedTable, DataView, SchemaView, TableDefinition, TableSummary};

#[derive(Clone)]
pub struct EavContext {
    pub metastore: Metastore,
}

impl EavContext {
    pub fn new(metastore: Metastore) -> Self {
        Self { metastore }
    }

    /// Define a table from a `{name, fields: [...]}` document and echo back
    /// its schema with defaults resolved.
    pub async fn define_table(&self, definition: Value) -> CatalogResult<CreatedTable> {
        let definition = TableDefinition::from_json(definition)
            .map_err(|reason| CatalogError::InvalidDefinition { reason })?;

        let (table, _) = self
            .metastore
            .tables
            .create_with_attributes(&definition)
            .await?;
        let schema = self.metastore.tables.schema_view(&table).await?;

        Ok(CreatedTable {
            id: table.id,
            schema,
        })
    }

    /// Insert a `{attribute: value, ...}` document into an existing table.
    pub async fn insert_data(&self, table_id: TableId, values: Value) -> CatalogResult<()> {
        let Value::Object(values) = values else {
            return Err(CatalogError::InvalidPayload {
                reason: "expected an object mapping attribute names to values".to_string(),
            });
        };

        debug!("Inserting {} value(s) into table {table_id}", values.len());
        self.metastore.tables.insert_data(table_id, &values).await
    }

    /// Tables with an attribute matching any of the criteria. No criteria
    /// lists every table.
    pub async fn filter_tables(
        &self,
        criteria: &[(String, String)],
    ) -> CatalogResult<Vec<TableSummary>> {
        if criteria.is_empty() {
            return self.list_tables().await;
        }

        let tables = self
            .metastore
            .tables
            .filter_by_attributes(criteria)
            .await?;
        info!("{} table(s) matched {} criteria", tables.len(), criteria.len());

        self.summarize(tables).await
    }

    pub async fn get_schema(&self, table_id: TableId) -> CatalogResult<SchemaView> {
        let table = self.metastore.tables.get(table_id).await?;
        self.metastore.tables.schema_view(&table).await
    }

    pub async fn get_data(&self, table_id: TableId) -> CatalogResult<DataView> {
        let table = self.metastore.tables.get(table_id).await?;
        self.metastore.tables.data_view(&table).await
    }

    pub async fn list_tables(&self) -> CatalogResult<Vec<TableSummary>> {
        let tables = self.metastore.tables.list().await?;
        self.summarize(tables).await
    }

    pub async fn delete_table(&self, table_id: TableId) -> CatalogResult<()> {
        self.metastore.tables.delete(table_id).await
    }

    async fn summarize(&self, tables: Vec<Table>) -> CatalogResult<Vec<TableSummary>> {
        let mut summaries = Vec::with_capacity(tables.len());
        for table in tables {
            summaries.push(TableSummary {
                id: table.id,
                table: self.metastore.tables.data_view(&table).await?,
            });
        }
        Ok(summaries)
    }
}

pub mod test_utils {
    use std::sync::Arc;

    use super::EavContext;
    use crate::catalog::metastore::Metastore;
    use crate::catalog::StoreOptions;
    use crate::repository::sqlite::testutils::make_in_memory_repository;

    pub async fn in_memory_context_with_options(options: StoreOptions) -> EavContext {
        let repository = Arc::new(make_in_memory_repository().await);
        EavContext::new(Metastore::new_from_repository(repository, options))
    }

    pub async fn in_memory_context() -> EavContext {
        in_memory_context_with_options(StoreOptions::default()).await
    }
}
