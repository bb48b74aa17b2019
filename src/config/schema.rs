use std::path::Path;

use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

use crate::catalog::{DeletePolicy, FilterMode, StoreOptions};

pub const DEFAULT_SQLITE_DSN: &str = "sqlite::memory:";
pub const DEFAULT_SQLITE_DB: &str = "eavstore.sqlite";

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct EavConfig {
    pub catalog: Catalog,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub constraints: Constraints,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Catalog {
    #[cfg(feature = "catalog-postgres")]
    Postgres(Postgres),
    Sqlite(Sqlite),
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Postgres {
    pub dsn: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Sqlite {
    pub dsn: String,
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

fn default_schema() -> String {
    "public".to_string()
}

#[derive(Deserialize, Debug, PartialEq, Eq, Default, Clone)]
#[serde(default)]
pub struct Filter {
    pub mode: FilterMode,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Default, Clone)]
#[serde(default)]
pub struct Constraints {
    pub enforce_unique: bool,
}

impl Catalog {
    pub fn dsn(&self) -> &str {
        match self {
            #[cfg(feature = "catalog-postgres")]
            Catalog::Postgres(Postgres { dsn, .. }) => dsn,
            Catalog::Sqlite(Sqlite { dsn, .. }) => dsn,
        }
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        match self {
            #[cfg(feature = "catalog-postgres")]
            Catalog::Postgres(Postgres { delete_policy, .. }) => *delete_policy,
            Catalog::Sqlite(Sqlite { delete_policy, .. }) => *delete_policy,
        }
    }
}

impl EavConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            filter_mode: self.filter.mode,
            delete_policy: self.catalog.delete_policy(),
            enforce_unique: self.constraints.enforce_unique,
        }
    }
}

impl Default for EavConfig {
    // Nothing survives the process
    fn default() -> Self {
        Self {
            catalog: Catalog::Sqlite(Sqlite {
                dsn: DEFAULT_SQLITE_DSN.to_string(),
                delete_policy: DeletePolicy::default(),
            }),
            filter: Filter::default(),
            constraints: Constraints::default(),
        }
    }
}

pub fn validate_config(config: EavConfig) -> Result<EavConfig, ConfigError> {
    if config.catalog.dsn().trim().is_empty() {
        return Err(ConfigError::Message(
            "The catalog DSN can't be empty".to_string(),
        ));
    }

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<EavConfig, ConfigError> {
    let path = path.to_str().ok_or_else(|| {
        ConfigError::Message(format!("Error parsing path {}", path.display()))
    })?;
    let config = Config::builder().add_source(File::with_name(path));

    config.build()?.try_deserialize().and_then(validate_config)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
) -> Result<EavConfig, ConfigError> {
    let config =
        Config::builder().add_source(File::from_str(config_str, FileFormat::Toml));

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
