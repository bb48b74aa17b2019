use std::sync::Arc;

use crate::catalog::repository::{RepositoryStore, StoreOptions};
use crate::catalog::{AttributeStore, TableStore};
use crate::repository::interface::Repository;

// This is the main entrypoint to the attribute and table stores.
// The intention is to keep callers de-coupled from the underlying
// persistence mechanism (such as the presently used `Repository`).
#[derive(Clone)]
pub struct Metastore {
    pub tables: Arc<dyn TableStore>,
    pub attributes: Arc<dyn AttributeStore>,
}

impl Metastore {
    pub fn new_from_repository(
        repository: Arc<dyn Repository>,
        options: StoreOptions,
    ) -> Self {
        let repository_store = Arc::new(RepositoryStore::new(repository, options));

        Self {
            tables: repository_store.clone(),
            attributes: repository_store,
        }
    }
}
