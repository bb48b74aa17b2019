use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::catalog::{
    Attribute, AttributeStore, CatalogError, CatalogResult, FilterEngine, FilterMode,
    Table, TableStore,
};
use crate::data_types::{AttributeId, AttributeValue, TableId};
use crate::repository::interface::{Error as RepositoryError, Repository};
use crate::schema::{DataView, FieldDefinition, SchemaView, TableDefinition};

/// What deleting a table does to its rows.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove the table row; its attributes go with it
    #[default]
    Hard,
    /// Only mark the table inactive
    Soft,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct StoreOptions {
    pub filter_mode: FilterMode,
    pub delete_policy: DeletePolicy,
    pub enforce_unique: bool,
}

// The native attribute/table store, backed by a `Repository`.
pub struct RepositoryStore {
    pub repository: Arc<dyn Repository>,
    filter: FilterEngine,
    options: StoreOptions,
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> CatalogError {
        CatalogError::SqlxError(match err {
            RepositoryError::UniqueConstraintViolation(e) => e,
            RepositoryError::FKConstraintViolation(e) => e,
            RepositoryError::SqlxError(e) => e,
        })
    }
}

impl RepositoryStore {
    pub fn new(repository: Arc<dyn Repository>, options: StoreOptions) -> Self {
        let filter = FilterEngine::new(repository.clone(), options.filter_mode);
        Self {
            repository,
            filter,
            options,
        }
    }

    /// Validate a candidate for an attribute and produce the text to store.
    async fn prepare_value(
        &self,
        attribute: &Attribute,
        candidate: &Value,
    ) -> CatalogResult<String> {
        let text = attribute.attr_type.encode(candidate).map_err(|source| {
            CatalogError::AttributeTypeMismatch {
                name: attribute.name.clone(),
                source,
            }
        })?;

        if self.options.enforce_unique && attribute.unique {
            let taken = self
                .repository
                .get_attributes_by_name(&attribute.name, None)
                .await?
                .into_iter()
                .any(|other| {
                    other.table_id != attribute.table_id
                        && other.value.as_deref() == Some(text.as_str())
                });
            if taken {
                return Err(CatalogError::UniqueAttributeViolation {
                    name: attribute.name.clone(),
                });
            }
        }

        Ok(text)
    }

    fn table_not_found(table_id: TableId) -> impl FnOnce(RepositoryError) -> CatalogError {
        move |e| match e {
            RepositoryError::SqlxError(sqlx::Error::RowNotFound) => {
                CatalogError::TableNotFound { id: table_id }
            }
            e => e.into(),
        }
    }
}

#[async_trait]
impl AttributeStore for RepositoryStore {
    async fn create(
        &self,
        table_id: TableId,
        field: &FieldDefinition,
    ) -> CatalogResult<Attribute> {
        let id = self
            .repository
            .create_attribute(table_id, field)
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => {
                    CatalogError::DuplicateAttribute {
                        name: field.name.clone(),
                    }
                }
                RepositoryError::FKConstraintViolation(_) => {
                    CatalogError::TableNotFound { id: table_id }
                }
                e => e.into(),
            })?;

        Ok(Attribute {
            id,
            table_id,
            name: field.name.clone(),
            attr_type: field.attr_type,
            value: None,
            unique: field.unique,
            required: field.required,
        })
    }

    async fn get(&self, table_id: TableId, name: &str) -> CatalogResult<Attribute> {
        self.repository
            .get_attribute(table_id, name)
            .await
            .map_err(|e| match e {
                RepositoryError::SqlxError(sqlx::Error::RowNotFound) => {
                    CatalogError::AttributeNotFound {
                        table_id,
                        name: name.to_string(),
                    }
                }
                e => e.into(),
            })?
            .try_into()
    }

    async fn set_value(
        &self,
        attribute: &Attribute,
        candidate: &Value,
    ) -> CatalogResult<Attribute> {
        let text = self.prepare_value(attribute, candidate).await?;

        self.repository
            .update_attribute_value(attribute.id, Some(text.as_str()))
            .await
            .map_err(|e| match e {
                RepositoryError::SqlxError(sqlx::Error::RowNotFound) => {
                    CatalogError::AttributeNotFound {
                        table_id: attribute.table_id,
                        name: attribute.name.clone(),
                    }
                }
                e => e.into(),
            })?;
        debug!("Set attribute {} ({}) to {text:?}", attribute.name, attribute.id);

        Ok(Attribute {
            value: Some(text),
            ..attribute.clone()
        })
    }

    async fn find_by_name_and_value(
        &self,
        name: &str,
        value: &AttributeValue,
        table_id: Option<TableId>,
    ) -> CatalogResult<Vec<Attribute>> {
        let mut found = vec![];

        // A row that doesn't decode can't be equal to anything: skip it
        // rather than failing the lookup for every other table
        for record in self
            .repository
            .get_attributes_by_name(name, table_id)
            .await?
        {
            let attribute = match Attribute::try_from(record) {
                Ok(attribute) => attribute,
                Err(e) => {
                    warn!("Skipping attribute {name}: {e}");
                    continue;
                }
            };
            match attribute.typed_value() {
                Ok(stored) if stored.as_ref() == Some(value) => found.push(attribute),
                Ok(_) => {}
                Err(e) => warn!(
                    "Skipping attribute {} of table {}: {e}",
                    attribute.id, attribute.table_id
                ),
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl TableStore for RepositoryStore {
    async fn create_with_attributes(
        &self,
        definition: &TableDefinition,
    ) -> CatalogResult<(Table, Vec<Attribute>)> {
        let (table_id, attribute_ids) = self
            .repository
            .create_table_with_attributes(&definition.name, &definition.fields)
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => {
                    // Only the (table, name) constraint can fire here
                    let mut names: Vec<&str> =
                        definition.fields.iter().map(|f| f.name.as_str()).collect();
                    names.sort_unstable();
                    let duplicate = names
                        .windows(2)
                        .find(|w| w[0] == w[1])
                        .map(|w| w[0].to_string())
                        .unwrap_or_default();
                    CatalogError::DuplicateAttribute { name: duplicate }
                }
                e => e.into(),
            })?;

        info!(
            "Created table {:?} ({table_id}) with {} attribute(s)",
            definition.name,
            attribute_ids.len()
        );

        let table = TableStore::get(self, table_id).await?;
        let attributes = attribute_ids
            .into_iter()
            .zip(definition.fields.iter())
            .map(|(id, field): (AttributeId, &FieldDefinition)| Attribute {
                id,
                table_id,
                name: field.name.clone(),
                attr_type: field.attr_type,
                value: None,
                unique: field.unique,
                required: field.required,
            })
            .collect();

        Ok((table, attributes))
    }

    async fn get(&self, table_id: TableId) -> CatalogResult<Table> {
        let table = self
            .repository
            .get_table(table_id)
            .await
            .map_err(Self::table_not_found(table_id))?;

        if !table.active {
            return Err(CatalogError::TableNotFound { id: table_id });
        }

        Ok(table)
    }

    async fn list(&self) -> CatalogResult<Vec<Table>> {
        Ok(self.repository.list_tables(false).await?)
    }

    async fn attributes(&self, table_id: TableId) -> CatalogResult<Vec<Attribute>> {
        self.repository
            .get_table_attributes(table_id)
            .await?
            .into_iter()
            .map(Attribute::try_from)
            .collect()
    }

    async fn insert_data(
        &self,
        table_id: TableId,
        values: &Map<String, Value>,
    ) -> CatalogResult<()> {
        TableStore::get(self, table_id).await?;

        // Every required attribute has to be supplied; report the first one that isn't
        for required in self.repository.get_required_attributes(table_id).await? {
            if !values.contains_key(&required.name) {
                return Err(CatalogError::MissingRequiredAttribute {
                    name: required.name,
                });
            }
        }

        // Resolve and coerce everything before the first write, in payload order
        let mut writes = Vec::with_capacity(values.len());
        for (name, candidate) in values {
            let attribute = AttributeStore::get(self, table_id, name)
                .await
                .map_err(|e| match e {
                    CatalogError::AttributeNotFound { name, .. } => {
                        CatalogError::UnknownAttribute { name }
                    }
                    e => e,
                })?;
            let text = self.prepare_value(&attribute, candidate).await?;
            writes.push((attribute.id, text));
        }

        self.repository.update_attribute_values(&writes).await?;
        info!("Inserted {} value(s) into table {table_id}", writes.len());

        Ok(())
    }

    async fn schema_view(&self, table: &Table) -> CatalogResult<SchemaView> {
        let fields = self
            .attributes(table.id)
            .await?
            .iter()
            .map(Attribute::definition)
            .collect();

        Ok(SchemaView {
            name: table.name.clone(),
            fields,
        })
    }

    async fn data_view(&self, table: &Table) -> CatalogResult<DataView> {
        let mut values = vec![];
        for attribute in self.attributes(table.id).await? {
            let value = attribute.typed_value()?;
            values.push((attribute.name, value));
        }

        Ok(DataView {
            name: table.name.clone(),
            values,
        })
    }

    async fn filter_by_attributes(
        &self,
        criteria: &[(String, String)],
    ) -> CatalogResult<Vec<Table>> {
        self.filter.matching_tables(self, criteria).await
    }

    async fn delete(&self, table_id: TableId) -> CatalogResult<()> {
        // Soft-deleted tables count as gone
        TableStore::get(self, table_id).await?;

        match self.options.delete_policy {
            DeletePolicy::Hard => self.repository.delete_table(table_id).await,
            DeletePolicy::Soft => self.repository.deactivate_table(table_id).await,
        }
        .map_err(Self::table_not_found(table_id))?;
        info!(
            "Deleted table {table_id} ({:?})",
            self.options.delete_policy
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data_types::AttributeType;
    use crate::repository::sqlite::testutils::make_in_memory_repository;

    async fn make_store(options: StoreOptions) -> RepositoryStore {
        RepositoryStore::new(Arc::new(make_in_memory_repository().await), options)
    }

    fn definition(value: Value) -> TableDefinition {
        TableDefinition::from_json(value).unwrap()
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    async fn make_typed_table(store: &RepositoryStore) -> Table {
        let (table, _) = store
            .create_with_attributes(&definition(json!({
                "name": "everything",
                "fields": [
                    {"name": "s", "attr_type": "str"},
                    {"name": "i", "attr_type": "int"},
                    {"name": "f", "attr_type": "float"},
                    {"name": "b", "attr_type": "bool"},
                    {"name": "d", "attr_type": "datetime"},
                ]
            })))
            .await
            .unwrap();
        table
    }

    #[tokio::test]
    async fn test_create_attribute_in_existing_table() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;

        let field = FieldDefinition {
            name: "extra".to_string(),
            attr_type: AttributeType::Int,
            unique: false,
            required: true,
        };
        let attribute = AttributeStore::create(&store, table.id, &field).await.unwrap();
        assert_eq!(attribute.value, None);
        assert_eq!(attribute.definition(), field);

        assert!(matches!(
            AttributeStore::create(&store, table.id, &field).await.unwrap_err(),
            CatalogError::DuplicateAttribute { name } if name == "extra"
        ));
        assert!(matches!(
            AttributeStore::create(&store, 4242, &field).await.unwrap_err(),
            CatalogError::TableNotFound { id: 4242 }
        ));
    }

    #[tokio::test]
    async fn test_set_value_int_is_strict() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;
        let attribute = AttributeStore::get(&store, table.id, "i").await.unwrap();

        let err = store.set_value(&attribute, &json!("5")).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::AttributeTypeMismatch { ref name, .. } if name == "i"
        ));
        let attribute = AttributeStore::get(&store, table.id, "i").await.unwrap();
        assert_eq!(attribute.value, None);

        let attribute = store.set_value(&attribute, &json!(5)).await.unwrap();
        assert_eq!(
            store.get_value(&attribute).unwrap(),
            Some(AttributeValue::Int(5))
        );

        // A failed write keeps the previous value
        assert!(store.set_value(&attribute, &json!(5.5)).await.is_err());
        let attribute = AttributeStore::get(&store, table.id, "i").await.unwrap();
        assert_eq!(attribute.value.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_set_value_datetime_pattern() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;
        let attribute = AttributeStore::get(&store, table.id, "d").await.unwrap();

        assert!(matches!(
            store.set_value(&attribute, &json!("2006-06-06")).await.unwrap_err(),
            CatalogError::AttributeTypeMismatch { .. }
        ));

        let attribute = store.set_value(&attribute, &json!("06/06/2006")).await.unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2006, 6, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            store.get_value(&attribute).unwrap(),
            Some(AttributeValue::Datetime(expected))
        );
    }

    #[tokio::test]
    async fn test_bool_non_canonical_text_decodes_to_false() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;
        let attribute = AttributeStore::get(&store, table.id, "b").await.unwrap();
        assert_eq!(store.get_value(&attribute).unwrap(), None);

        // Written behind the store's back
        store
            .repository
            .update_attribute_value(attribute.id, Some("yes"))
            .await
            .unwrap();

        let attribute = AttributeStore::get(&store, table.id, "b").await.unwrap();
        assert_eq!(
            store.get_value(&attribute).unwrap(),
            Some(AttributeValue::Bool(false))
        );
    }

    #[tokio::test]
    async fn test_corrupt_value_surfaces_on_read() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;
        let attribute = AttributeStore::get(&store, table.id, "i").await.unwrap();

        store
            .repository
            .update_attribute_value(attribute.id, Some("five"))
            .await
            .unwrap();

        assert!(matches!(
            store.data_view(&table).await.unwrap_err(),
            CatalogError::CorruptAttributeValue { name, .. } if name == "i"
        ));
    }

    #[tokio::test]
    async fn test_find_by_name_and_value_compares_decoded_values() {
        let store = make_store(StoreOptions::default()).await;
        let first = make_typed_table(&store).await;
        let second = make_typed_table(&store).await;

        store
            .insert_data(first.id, &payload(json!({"f": 8.5, "s": "x"})))
            .await
            .unwrap();
        store
            .insert_data(second.id, &payload(json!({"f": 8.5})))
            .await
            .unwrap();

        let found = store
            .find_by_name_and_value("f", &AttributeValue::Float(8.5), None)
            .await
            .unwrap();
        assert_eq!(
            found.iter().map(|a| a.table_id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );

        let found = store
            .find_by_name_and_value("f", &AttributeValue::Float(8.5), Some(second.id))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].table_id, second.id);

        // Same text, different type
        assert!(store
            .find_by_name_and_value("f", &AttributeValue::Str("8.5".to_string()), None)
            .await
            .unwrap()
            .is_empty());

        // A corrupt row elsewhere doesn't hide the matching ones
        let third = make_typed_table(&store).await;
        let corrupt = AttributeStore::get(&store, third.id, "f").await.unwrap();
        store
            .repository
            .update_attribute_value(corrupt.id, Some("eight and a half"))
            .await
            .unwrap();
        let found = store
            .find_by_name_and_value("f", &AttributeValue::Float(8.5), None)
            .await
            .unwrap();
        assert_eq!(
            found.iter().map(|a| a.table_id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[tokio::test]
    async fn test_create_with_attributes_and_schema_view() {
        let store = make_store(StoreOptions::default()).await;
        let (table, attributes) = store
            .create_with_attributes(&definition(json!({
                "name": "movies",
                "fields": [
                    {"name": "title", "attr_type": "str", "unique": true, "required": true},
                    {"name": "genre", "attr_type": "str"},
                    {"name": "release_date", "attr_type": "datetime"},
                ]
            })))
            .await
            .unwrap();
        assert_eq!(attributes.len(), 3);

        let schema = store.schema_view(&table).await.unwrap();
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "name": "movies",
                "fields": [
                    {"name": "title", "attr_type": "str", "unique": true, "required": true},
                    {"name": "genre", "attr_type": "str", "unique": false, "required": false},
                    {"name": "release_date", "attr_type": "datetime", "unique": false, "required": false},
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_create_with_duplicate_attribute_names() {
        let store = make_store(StoreOptions::default()).await;
        let err = store
            .create_with_attributes(&definition(json!({
                "name": "movies",
                "fields": [
                    {"name": "title", "attr_type": "str"},
                    {"name": "title", "attr_type": "int"},
                ]
            })))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::DuplicateAttribute { name } if name == "title"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_data_missing_required() {
        let store = make_store(StoreOptions::default()).await;
        let (table, _) = store
            .create_with_attributes(&definition(json!({
                "name": "movies",
                "fields": [
                    {"name": "genre", "attr_type": "str"},
                    {"name": "title", "attr_type": "str", "required": true},
                    {"name": "year", "attr_type": "int", "required": true},
                ]
            })))
            .await
            .unwrap();

        let err = store.insert_data(table.id, &Map::new()).await.unwrap_err();
        assert!(matches!(err, CatalogError::MissingRequiredAttribute { ref name } if name == "title"));
        assert_eq!(err.to_string(), "The attribute title is required");

        // The first missing one in stored order is reported; nothing is written
        let err = store
            .insert_data(table.id, &payload(json!({"genre": "Action", "title": "Heat"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingRequiredAttribute { name } if name == "year"));

        let view = store.data_view(&table).await.unwrap();
        assert!(view.values.iter().all(|(_, value)| value.is_none()));
    }

    #[tokio::test]
    async fn test_insert_data_unknown_attribute_and_mismatch() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;

        let err = store
            .insert_data(table.id, &payload(json!({"s": "ok", "nope": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownAttribute { name } if name == "nope"));

        let err = store
            .insert_data(table.id, &payload(json!({"s": "ok", "i": "5", "f": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::AttributeTypeMismatch { name, .. } if name == "i"));

        // Values preceding the failing one are not left behind either
        let view = store.data_view(&table).await.unwrap();
        assert_eq!(view.get("s"), Some(&None));

        let err = store
            .insert_data(4242, &payload(json!({"s": "ok"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::TableNotFound { id: 4242 }));
    }

    #[tokio::test]
    async fn test_data_view_round_trip() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;

        let view = store.data_view(&table).await.unwrap();
        assert_eq!(view.values.len(), 5);
        assert!(view.values.iter().all(|(_, value)| value.is_none()));

        store
            .insert_data(
                table.id,
                &payload(json!({
                    "s": "Die Hard",
                    "i": 1988,
                    "f": 8.2,
                    "b": true,
                    "d": "20/07/1988",
                })),
            )
            .await
            .unwrap();

        let view = store.data_view(&table).await.unwrap();
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({
                "s": "Die Hard",
                "i": 1988,
                "f": 8.2,
                "b": true,
                "d": "1988-07-20T00:00:00",
                "name": "everything",
            })
        );
    }

    #[tokio::test]
    async fn test_unique_is_only_enforced_when_enabled() {
        for enforce_unique in [false, true] {
            let store = make_store(StoreOptions {
                enforce_unique,
                ..Default::default()
            })
            .await;
            let def = definition(json!({
                "name": "movies",
                "fields": [{"name": "title", "attr_type": "str", "unique": true}]
            }));
            let (first, _) = store.create_with_attributes(&def).await.unwrap();
            let (second, _) = store.create_with_attributes(&def).await.unwrap();

            store
                .insert_data(first.id, &payload(json!({"title": "Heat"})))
                .await
                .unwrap();
            // Rewriting the same value on the same table is fine
            store
                .insert_data(first.id, &payload(json!({"title": "Heat"})))
                .await
                .unwrap();

            let result = store
                .insert_data(second.id, &payload(json!({"title": "Heat"})))
                .await;
            if enforce_unique {
                assert!(matches!(
                    result.unwrap_err(),
                    CatalogError::UniqueAttributeViolation { name } if name == "title"
                ));
            } else {
                result.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_delete_policies() {
        let store = make_store(StoreOptions::default()).await;
        let table = make_typed_table(&store).await;
        TableStore::delete(&store, table.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.attributes(table.id).await.unwrap().is_empty());
        assert!(matches!(
            TableStore::delete(&store, table.id).await.unwrap_err(),
            CatalogError::TableNotFound { .. }
        ));

        let store = make_store(StoreOptions {
            delete_policy: DeletePolicy::Soft,
            ..Default::default()
        })
        .await;
        let table = make_typed_table(&store).await;
        TableStore::delete(&store, table.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(
            TableStore::get(&store, table.id).await.unwrap_err(),
            CatalogError::TableNotFound { .. }
        ));
        // The attributes are kept around
        assert_eq!(store.attributes(table.id).await.unwrap().len(), 5);
    }
}
