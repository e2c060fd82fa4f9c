//! # redb-backed Template Store
//!
//! One table maps document URL to the encoded document
//! ([`graph_to_bytes`](crate::formats::graph_to_bytes)). Every write is its
//! own transaction.

use super::TemplateStore;
use crate::formats::{graph_from_bytes, graph_to_bytes};
use crate::triples::TripleGraph;
use crate::types::StorageError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use tracing::debug;

/// Document URL -> encoded triple document.
const TEMPLATES: TableDefinition<&str, &[u8]> = TableDefinition::new("templates");

fn db_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Database(e.to_string())
}

/// A disk-backed template store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let write_txn = db.begin_write().map_err(db_err)?;
        {
            let _ = write_txn.open_table(TEMPLATES).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        debug!(path = %path.as_ref().display(), "opened template store");
        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), StorageError> {
        self.db.compact().map_err(db_err)?;
        Ok(())
    }
}

impl TemplateStore for RedbStore {
    fn load_template(&self, url: &str) -> Result<Option<TripleGraph>, StorageError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(TEMPLATES).map_err(db_err)?;
        match table.get(url).map_err(db_err)? {
            Some(data) => Ok(Some(graph_from_bytes(data.value())?)),
            None => Ok(None),
        }
    }

    fn save_template(&mut self, url: &str, graph: &TripleGraph) -> Result<(), StorageError> {
        let bytes = graph_to_bytes(graph)?;
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(TEMPLATES).map_err(db_err)?;
            table.insert(url, bytes.as_slice()).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    fn delete_template(&mut self, url: &str) -> Result<bool, StorageError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let existed = {
            let mut table = write_txn.open_table(TEMPLATES).map_err(db_err)?;
            table.remove(url).map_err(db_err)?.is_some()
        };
        write_txn.commit().map_err(db_err)?;
        Ok(existed)
    }

    fn list_templates(&self) -> Result<Vec<String>, StorageError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(TEMPLATES).map_err(db_err)?;
        let mut urls = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            urls.push(key.value().to_string());
        }
        Ok(urls)
    }

    fn contains_template(&self, url: &str) -> Result<bool, StorageError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(TEMPLATES).map_err(db_err)?;
        Ok(table.get(url).map_err(db_err)?.is_some())
    }
}
