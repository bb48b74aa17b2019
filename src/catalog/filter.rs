use std::sync::Arc;

use itertools::Itertools;
use serde::Deserialize;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::catalog::{AttributeStore, CatalogResult, Table};
use crate::data_types::{AttributeType, TableId};
use crate::repository::interface::Repository;

/// How criterion values are compared against stored attribute values.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Compare the criterion text with the stored text as-is
    #[default]
    Literal,
    /// Decode both sides under the attribute's type before comparing, so
    /// that e.g. `8.50` matches a stored `8.5`
    Typed,
}

/// Resolves `name = value OR name = value ...` criteria into the distinct
/// tables owning a matching attribute.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    repository: Arc<dyn Repository>,
    mode: FilterMode,
}

impl FilterEngine {
    pub fn new(repository: Arc<dyn Repository>, mode: FilterMode) -> Self {
        Self { repository, mode }
    }

    /// Typed matching looks the criteria up through `attributes`: the
    /// criterion text is parsed once per attribute type and each parsed
    /// value is compared with the decoded stored values of that type.
    pub async fn matching_tables(
        &self,
        attributes: &dyn AttributeStore,
        criteria: &[(String, String)],
    ) -> CatalogResult<Vec<Table>> {
        debug!("Filtering tables by {criteria:?} ({:?})", self.mode);

        match self.mode {
            FilterMode::Literal => Ok(self
                .repository
                .find_tables_by_attribute_values(criteria)
                .await?),
            FilterMode::Typed => {
                let mut table_ids: Vec<TableId> = vec![];
                for (name, raw) in criteria {
                    for value in AttributeType::iter().filter_map(|t| t.parse(raw)) {
                        let found =
                            attributes.find_by_name_and_value(name, &value, None).await?;
                        table_ids.extend(found.iter().map(|a| a.table_id));
                    }
                }

                let table_ids = table_ids.into_iter().unique().collect::<Vec<_>>();
                Ok(self.repository.get_tables_by_ids(&table_ids).await?)
            }
        }
    }
}
