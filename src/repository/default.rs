/// Default implementation for a Repository that factors out common
/// query patterns / SQL queries between Postgres and SQLite.
///
/// Usage:
///
/// The struct has to have certain fields, since this macro relies on them:
///
/// ```ignore
/// pub struct MyRepository {
///     pub executor: sqlx::Pool<sqlx::SqlxDatabaseType>
/// }
///
/// impl MyRepository {
///     pub const MIGRATOR: sqlx::Migrator = sqlx::migrate!("my/migrations");
///     pub const QUERIES: RepositoryQueries = RepositoryQueries {
///         cast_timestamp: "...",
///     }
///     pub fn interpret_error(error: sqlx::Error) -> Error {
///         // Interpret the database-specific error code and turn some sqlx errors
///         // into the Error enum values like UniqueConstraintViolation/FKConstraintViolation
///         // ...
///     }
/// }
///
/// implement_repository!(SqliteRepository)
/// ```
///
/// The bodies are shared through a macro rather than generics over `sqlx::Database`:
/// a generic `Pool<Any>` or `where`-bounded implementation runs into
/// https://github.com/launchbadge/sqlx/issues/1978 as soon as a `QueryBuilder` is used,
/// and default trait methods conflict with `#[async_trait]`. This also means queries
/// are not checked at compile time.

/// Queries that are different between SQLite and PG
pub struct RepositoryQueries {
    /// Expression turning `timestamp_column` into seconds since the epoch (INT8)
    pub cast_timestamp: &'static str,
}

impl RepositoryQueries {
    fn cast(&self, column: &str) -> String {
        self.cast_timestamp.replace("timestamp_column", column)
    }

    pub fn table_columns(&self) -> String {
        format!(
            r#""table".id, "table".name, "table".active, {} AS created_at, {} AS updated_at"#,
            self.cast(r#""table".created_at"#),
            self.cast(r#""table".updated_at"#),
        )
    }

    pub fn attribute_columns(&self) -> String {
        format!(
            "attribute.id, attribute.table_id, attribute.name, attribute.attr_type, \
            attribute.value, attribute.is_unique, attribute.is_required, \
            {} AS created_at, {} AS updated_at",
            self.cast("attribute.created_at"),
            self.cast("attribute.updated_at"),
        )
    }
}

#[macro_export]
macro_rules! implement_repository {
    ($repo: ident) => {
#[async_trait]
impl Repository for $repo {
    async fn setup(&self) {
        $repo::MIGRATOR
            .run(&self.executor)
            .await
            .expect("error running migrations");
    }

    async fn create_table(&self, table_name: &str) -> Result<TableId, Error> {
        let id = sqlx::query(r#"INSERT INTO "table" (name) VALUES ($1) RETURNING (id)"#)
            .bind(table_name)
            .fetch_one(&self.executor)
            .await.map_err($repo::interpret_error)?
            .try_get("id").map_err($repo::interpret_error)?;

        Ok(id)
    }

    async fn create_attribute(
        &self,
        table_id: TableId,
        field: &FieldDefinition,
    ) -> Result<AttributeId, Error> {
        let id = sqlx::query(
            r#"INSERT INTO attribute (table_id, name, attr_type, is_unique, is_required)
            VALUES ($1, $2, $3, $4, $5) RETURNING (id)"#,
        )
        .bind(table_id)
        .bind(&field.name)
        .bind(field.attr_type.to_string())
        .bind(field.unique)
        .bind(field.required)
        .fetch_one(&self.executor)
        .await.map_err($repo::interpret_error)?
        .try_get("id").map_err($repo::interpret_error)?;

        Ok(id)
    }

    async fn create_table_with_attributes(
        &self,
        table_name: &str,
        fields: &[FieldDefinition],
    ) -> Result<(TableId, Vec<AttributeId>), Error> {
        let mut tx = self.executor.begin().await.map_err($repo::interpret_error)?;

        let table_id: TableId = sqlx::query(r#"INSERT INTO "table" (name) VALUES ($1) RETURNING (id)"#)
            .bind(table_name)
            .fetch_one(&mut *tx)
            .await.map_err($repo::interpret_error)?
            .try_get("id").map_err($repo::interpret_error)?;

        // One statement per attribute so that the IDs come back in input order
        let mut attribute_ids = Vec::with_capacity(fields.len());
        for field in fields {
            let attribute_id: AttributeId = sqlx::query(
                r#"INSERT INTO attribute (table_id, name, attr_type, is_unique, is_required)
                VALUES ($1, $2, $3, $4, $5) RETURNING (id)"#,
            )
            .bind(table_id)
            .bind(&field.name)
            .bind(field.attr_type.to_string())
            .bind(field.unique)
            .bind(field.required)
            .fetch_one(&mut *tx)
            .await.map_err($repo::interpret_error)?
            .try_get("id").map_err($repo::interpret_error)?;
            attribute_ids.push(attribute_id);
        }

        tx.commit().await.map_err($repo::interpret_error)?;

        Ok((table_id, attribute_ids))
    }

    async fn get_table(&self, table_id: TableId) -> Result<TableRecord, Error> {
        let query = format!(
            r#"SELECT {} FROM "table" WHERE "table".id = $1"#,
            $repo::QUERIES.table_columns()
        );

        let table = sqlx::query_as(&query)
            .bind(table_id)
            .fetch_one(&self.executor)
            .await.map_err($repo::interpret_error)?;

        Ok(table)
    }

    async fn list_tables(&self, include_inactive: bool) -> Result<Vec<TableRecord>, Error> {
        let query = format!(
            r#"SELECT {} FROM "table" {} ORDER BY "table".created_at, "table".id"#,
            $repo::QUERIES.table_columns(),
            if include_inactive { "" } else { r#"WHERE "table".active"# },
        );

        let tables = sqlx::query_as(&query)
            .fetch(&self.executor)
            .try_collect()
            .await
            .map_err($repo::interpret_error)?;

        Ok(tables)
    }

    async fn get_tables_by_ids(
        &self,
        table_ids: &[TableId],
    ) -> Result<Vec<TableRecord>, Error> {
        if table_ids.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            r#"SELECT {} FROM "table" WHERE "table".active AND "table".id IN ("#,
            $repo::QUERIES.table_columns()
        );

        // We have to manually construct the query since SQLite doesn't have the proper Encode trait
        let mut builder: QueryBuilder<_> = QueryBuilder::new(&query);
        let mut separated = builder.separated(", ");
        for table_id in table_ids {
            separated.push_bind(*table_id);
        }
        separated.push_unseparated(r#") ORDER BY "table".created_at, "table".id"#);

        let tables = builder
            .build_query_as()
            .fetch(&self.executor)
            .try_collect()
            .await
            .map_err($repo::interpret_error)?;

        Ok(tables)
    }

    async fn get_table_attributes(
        &self,
        table_id: TableId,
    ) -> Result<Vec<AttributeRecord>, Error> {
        let query = format!(
            "SELECT {} FROM attribute WHERE attribute.table_id = $1 ORDER BY attribute.id",
            $repo::QUERIES.attribute_columns()
        );

        let attributes = sqlx::query_as(&query)
            .bind(table_id)
            .fetch(&self.executor)
            .try_collect()
            .await
            .map_err($repo::interpret_error)?;

        Ok(attributes)
    }

    async fn get_required_attributes(
        &self,
        table_id: TableId,
    ) -> Result<Vec<AttributeRecord>, Error> {
        let query = format!(
            "SELECT {} FROM attribute \
            WHERE attribute.table_id = $1 AND attribute.is_required \
            ORDER BY attribute.id",
            $repo::QUERIES.attribute_columns()
        );

        let attributes = sqlx::query_as(&query)
            .bind(table_id)
            .fetch(&self.executor)
            .try_collect()
            .await
            .map_err($repo::interpret_error)?;

        Ok(attributes)
    }

    async fn get_attribute(
        &self,
        table_id: TableId,
        attribute_name: &str,
    ) -> Result<AttributeRecord, Error> {
        let query = format!(
            "SELECT {} FROM attribute WHERE attribute.table_id = $1 AND attribute.name = $2",
            $repo::QUERIES.attribute_columns()
        );

        let attribute = sqlx::query_as(&query)
            .bind(table_id)
            .bind(attribute_name)
            .fetch_one(&self.executor)
            .await.map_err($repo::interpret_error)?;

        Ok(attribute)
    }

    async fn get_attributes_by_name(
        &self,
        attribute_name: &str,
        table_id: Option<TableId>,
    ) -> Result<Vec<AttributeRecord>, Error> {
        let query = format!(
            "SELECT {} FROM attribute WHERE attribute.name = ",
            $repo::QUERIES.attribute_columns()
        );

        let mut builder: QueryBuilder<_> = QueryBuilder::new(&query);
        builder.push_bind(attribute_name);

        if let Some(table_id) = table_id {
            builder.push(" AND attribute.table_id = ");
            builder.push_bind(table_id);
        }
        builder.push(" ORDER BY attribute.id");

        let attributes = builder
            .build_query_as()
            .fetch(&self.executor)
            .try_collect()
            .await
            .map_err($repo::interpret_error)?;

        Ok(attributes)
    }

    async fn update_attribute_value(
        &self,
        attribute_id: AttributeId,
        value: Option<&str>,
    ) -> Result<(), Error> {
        // RETURNING forces a row not found error if the attribute doesn't exist
        sqlx::query(
            "UPDATE attribute SET value = $1, updated_at = CURRENT_TIMESTAMP \
            WHERE id = $2 RETURNING id",
        )
        .bind(value)
        .bind(attribute_id)
        .fetch_one(&self.executor)
        .await.map_err($repo::interpret_error)?;

        Ok(())
    }

    async fn update_attribute_values(
        &self,
        values: &[(AttributeId, String)],
    ) -> Result<(), Error> {
        let mut tx = self.executor.begin().await.map_err($repo::interpret_error)?;

        for (attribute_id, value) in values {
            sqlx::query(
                "UPDATE attribute SET value = $1, updated_at = CURRENT_TIMESTAMP \
                WHERE id = $2 RETURNING id",
            )
            .bind(value)
            .bind(attribute_id)
            .fetch_one(&mut *tx)
            .await.map_err($repo::interpret_error)?;
        }

        tx.commit().await.map_err($repo::interpret_error)?;

        Ok(())
    }

    async fn find_tables_by_attribute_values(
        &self,
        criteria: &[(String, String)],
    ) -> Result<Vec<TableRecord>, Error> {
        if criteria.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            r#"SELECT {} FROM "table"
            WHERE "table".active AND "table".id IN (
                SELECT attribute.table_id FROM attribute WHERE "#,
            $repo::QUERIES.table_columns()
        );

        let mut builder: QueryBuilder<_> = QueryBuilder::new(&query);
        for (i, (name, value)) in criteria.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push("(attribute.name = ");
            builder.push_bind(name);
            builder.push(" AND attribute.value = ");
            builder.push_bind(value);
            builder.push(")");
        }
        builder.push(r#") ORDER BY "table".created_at, "table".id"#);

        let tables = builder
            .build_query_as()
            .fetch(&self.executor)
            .try_collect()
            .await
            .map_err($repo::interpret_error)?;

        Ok(tables)
    }

    async fn deactivate_table(&self, table_id: TableId) -> Result<(), Error> {
        sqlx::query(
            r#"UPDATE "table" SET active = FALSE, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 RETURNING id"#,
        )
        .bind(table_id)
        .fetch_one(&self.executor)
        .await.map_err($repo::interpret_error)?;

        Ok(())
    }

    // Return the ID back so that we get an error if the table didn't actually exist
    async fn delete_table(&self, table_id: TableId) -> Result<(), Error> {
        sqlx::query(r#"DELETE FROM "table" WHERE id = $1 RETURNING id"#)
            .bind(table_id)
            .fetch_one(&self.executor)
            .await.map_err($repo::interpret_error)?;
        Ok(())
    }
}

};
}
