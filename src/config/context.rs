use std::sync::Arc;

use sqlx::sqlite::SqliteJournalMode;
use tracing::info;

#[cfg(feature = "catalog-postgres")]
use crate::repository::postgres::PostgresRepository;
use crate::{
    catalog::metastore::Metastore,
    context::EavContext,
    repository::{interface::Repository, sqlite::SqliteRepository},
};

use super::schema;

async fn build_metastore(config: &schema::EavConfig) -> Result<Metastore, sqlx::Error> {
    // Initialize the repository
    let repository: Arc<dyn Repository> = match &config.catalog {
        #[cfg(feature = "catalog-postgres")]
        schema::Catalog::Postgres(schema::Postgres { dsn, schema, .. }) => Arc::new(
            PostgresRepository::try_new(dsn.to_string(), schema.to_string()).await?,
        ),
        schema::Catalog::Sqlite(schema::Sqlite { dsn, .. }) => {
            let journal_mode = if dsn.contains(":memory:") {
                SqliteJournalMode::Memory
            } else {
                SqliteJournalMode::Wal
            };
            Arc::new(SqliteRepository::try_new(dsn.to_string(), journal_mode).await?)
        }
    };

    Ok(Metastore::new_from_repository(
        repository,
        config.store_options(),
    ))
}

pub async fn build_context(cfg: schema::EavConfig) -> Result<EavContext, sqlx::Error> {
    let metastore = build_metastore(&cfg).await?;
    info!(
        "Catalog ready ({:?} filter, {:?} delete policy, unique constraints {})",
        cfg.filter.mode,
        cfg.catalog.delete_policy(),
        if cfg.constraints.enforce_unique {
            "enforced"
        } else {
            "not enforced"
        }
    );

    Ok(EavContext::new(metastore))
}
