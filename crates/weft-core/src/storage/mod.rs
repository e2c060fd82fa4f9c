//! # Knowledge-Store Backends
//!
//! A store keeps one triple document per template, keyed by document URL
//! (the template id without its `#fragment`).
//!
//! - [`MemoryStore`]: process-local, used by tests and one-shot CLI runs
//! - [`RedbStore`]: disk-backed, ACID, survives restarts

mod redb_store;

pub use redb_store::RedbStore;

use crate::triples::TripleGraph;
use crate::types::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document-level access to a knowledge store.
pub trait TemplateStore {
    /// The document stored at `url`, if any.
    fn load_template(&self, url: &str) -> Result<Option<TripleGraph>, StorageError>;

    /// Store (or replace) the document at `url`.
    fn save_template(&mut self, url: &str, graph: &TripleGraph) -> Result<(), StorageError>;

    /// Remove the document at `url`. Returns whether one existed.
    fn delete_template(&mut self, url: &str) -> Result<bool, StorageError>;

    /// Every stored document URL, sorted.
    fn list_templates(&self) -> Result<Vec<String>, StorageError>;

    fn contains_template(&self, url: &str) -> Result<bool, StorageError> {
        Ok(self.load_template(url)?.is_some())
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    documents: BTreeMap<String, TripleGraph>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for MemoryStore {
    fn load_template(&self, url: &str) -> Result<Option<TripleGraph>, StorageError> {
        Ok(self.documents.get(url).cloned())
    }

    fn save_template(&mut self, url: &str, graph: &TripleGraph) -> Result<(), StorageError> {
        self.documents.insert(url.to_string(), graph.clone());
        Ok(())
    }

    fn delete_template(&mut self, url: &str) -> Result<bool, StorageError> {
        Ok(self.documents.remove(url).is_some())
    }

    fn list_templates(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.documents.keys().cloned().collect())
    }

    fn contains_template(&self, url: &str) -> Result<bool, StorageError> {
        Ok(self.documents.contains_key(url))
    }
}
