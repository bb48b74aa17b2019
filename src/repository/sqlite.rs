use std::{fmt::Debug, str::FromStr};

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, QueryBuilder, Row, Sqlite,
};

use crate::implement_repository;
use crate::schema::FieldDefinition;

use super::{
    default::RepositoryQueries,
    interface::{
        AttributeId, AttributeRecord, Error, Repository, Result, TableId, TableRecord,
    },
};

#[derive(Debug)]
pub struct SqliteRepository {
    pub executor: Pool<Sqlite>,
}

impl SqliteRepository {
    pub const MIGRATOR: Migrator = sqlx::migrate!("migrations/sqlite");
    pub const QUERIES: RepositoryQueries = RepositoryQueries {
        cast_timestamp: "CAST(strftime('%s', timestamp_column) AS INTEGER)",
    };

    pub async fn try_new(
        dsn: String,
        journal_mode: SqliteJournalMode,
    ) -> std::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&dsn)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(journal_mode);

        // Every connection to an in-memory database gets its own database, so
        // keep exactly one alive for the lifetime of the pool.
        let pool_options = if dsn.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await?;
        let repo = Self { executor: pool };
        repo.setup().await;
        Ok(repo)
    }

    pub fn interpret_error(error: sqlx::Error) -> Error {
        if let sqlx::Error::Database(ref d) = error {
            // Reference: https://www.sqlite.org/rescode.html
            let message = d.message();

            // For some reason, sqlx doesn't return the proper errcode for FK violations,
            // even though it's calling sqlite3_extended_errcode which is meant to return full codes.
            // Unique constraint violations do return the correct code though.
            if message.contains("FOREIGN KEY constraint failed") {
                return Error::FKConstraintViolation(error);
            }
            if message.contains("UNIQUE constraint failed") {
                return Error::UniqueConstraintViolation(error);
            }
        }
        Error::SqlxError(error)
    }
}

implement_repository!(SqliteRepository);

pub mod testutils {
    use sqlx::sqlite::SqliteJournalMode;

    use super::SqliteRepository;

    pub async fn make_in_memory_repository() -> SqliteRepository {
        SqliteRepository::try_new("sqlite::memory:".to_string(), SqliteJournalMode::Memory)
            .await
            .expect("Error setting up the database")
    }
}
