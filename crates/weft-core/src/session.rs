//! # Session Module
//!
//! A session pairs a knowledge-store backend with a [`TemplateBridge`] and
//! offers template-level operations: load, save, save-as, delete, list and
//! validation snapshots.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`] (fast, volatile)
//! - `Persistent`: [`RedbStore`] (disk-backed, ACID)
//!
//! The `try_*` methods return errors; their plain counterparts log the error
//! and report `false` / `None`.

use crate::bridge::TemplateBridge;
use crate::graph::Template;
use crate::inference::RuleEngine;
use crate::storage::{MemoryStore, RedbStore, TemplateStore};
use crate::triples::TripleGraph;
use crate::types::{WeftError, namespace_of, url_of};
use crate::vocab::{Concept, Vocabulary};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

// =============================================================================
// ERROR LOGGING HELPERS
// =============================================================================

/// Log an error and convert the result to an `Option`.
#[inline]
fn log_and_convert<T>(result: Result<T, WeftError>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(context, error = %e, "store operation failed");
            None
        }
    }
}

/// Log an error and fall back to the default value.
#[inline]
fn log_and_default<T: Default>(result: Result<T, WeftError>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            warn!(context, error = %e, "store operation failed");
            T::default()
        }
    }
}

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    InMemory(MemoryStore),
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn TemplateStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn TemplateStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

// NOTE: Session does not implement Clone; the redb handle cannot be shared.

/// Template operations over one knowledge store.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
    bridge: TemplateBridge,
}

impl Session {
    /// An empty in-memory session with the default vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or create a redb store at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, WeftError> {
        let store = RedbStore::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(store),
            bridge: TemplateBridge::default(),
        })
    }

    /// An in-memory session over existing documents.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
            bridge: TemplateBridge::default(),
        }
    }

    /// The in-memory store, or `None` for a persistent session.
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        match &self.backend {
            StorageBackend::InMemory(store) => Some(store),
            StorageBackend::Persistent(_) => None,
        }
    }

    /// Use `vocab` for every read and write of this session.
    #[must_use]
    pub fn with_vocabulary(mut self, vocab: Vocabulary) -> Self {
        self.bridge = TemplateBridge::new(vocab);
        self
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    #[must_use]
    pub fn bridge(&self) -> &TemplateBridge {
        &self.bridge
    }

    // =========================================================================
    // DOCUMENTS
    // =========================================================================

    /// Store a raw document and return the template it holds.
    ///
    /// The document is read first, so malformed input is rejected before
    /// anything is stored.
    pub fn import_graph(&mut self, graph: &TripleGraph, uri: &str) -> Result<Template, WeftError> {
        let template = self.bridge.read(graph, uri)?;
        self.backend
            .store_mut()
            .save_template(template.url(), graph)?;
        info!(template = template.id(), triples = graph.len(), "imported document");
        Ok(template)
    }

    /// The stored document holding `uri`.
    pub fn export_graph(&self, uri: &str) -> Result<TripleGraph, WeftError> {
        self.backend
            .store()
            .load_template(url_of(uri))?
            .ok_or_else(|| WeftError::TemplateNotFound(uri.to_string()))
    }

    // =========================================================================
    // TEMPLATES
    // =========================================================================

    /// Load a template. Stored documents it imports are merged in first, so
    /// sub-templates referenced by import resolve.
    pub fn try_load(&self, uri: &str) -> Result<Template, WeftError> {
        let mut graph = self.export_graph(uri)?;
        let store = self.backend.store();
        let mut seen: BTreeSet<String> = BTreeSet::from([url_of(uri).to_string()]);
        let mut pending: Vec<String> = graph.imports().map(|(_, i)| i.to_string()).collect();
        while let Some(url) = pending.pop() {
            if !seen.insert(url.clone()) {
                continue;
            }
            if let Some(imported) = store.load_template(&url)? {
                pending.extend(imported.imports().map(|(_, i)| i.to_string()));
                graph.merge(&imported);
            }
        }
        self.bridge.read(&graph, uri)
    }

    /// Load a template. Missing or unreadable templates give `None`.
    pub fn load(&self, uri: &str) -> Option<Template> {
        log_and_convert(self.try_load(uri), "load")
    }

    /// Write `template` (at the latest version) into its document.
    pub fn try_save(&mut self, template: &mut Template) -> Result<(), WeftError> {
        let graph = self.bridge.write(template);
        self.backend
            .store_mut()
            .save_template(template.url(), &graph)?;
        info!(template = template.id(), triples = graph.len(), "saved template");
        Ok(())
    }

    pub fn save(&mut self, template: &mut Template) -> bool {
        log_and_convert(self.try_save(template), "save").is_some()
    }

    /// Store a copy of `template` under `new_id` and return it as stored.
    ///
    /// Every resource in the old namespace moves to the new one; resources
    /// from other documents (components, imported sub-templates) keep their ids.
    pub fn try_save_as(&mut self, template: &Template, new_id: &str) -> Result<Template, WeftError> {
        let old_ns = template.namespace().to_string();
        let new_ns = namespace_of(new_id).to_string();

        let mut renamed = template.clone();
        renamed.set_id(new_id);
        let mut graph = self.bridge.write(&mut renamed);
        graph.rename_namespace(&old_ns, &new_ns);

        let stored = self.bridge.read(&graph, new_id)?;
        self.backend
            .store_mut()
            .save_template(url_of(new_id), &graph)?;
        info!(from = template.id(), to = new_id, "saved template under new id");
        Ok(stored)
    }

    pub fn save_as(&mut self, template: &Template, new_id: &str) -> bool {
        log_and_convert(self.try_save_as(template, new_id), "save_as").is_some()
    }

    /// Remove the document holding `uri`. Returns whether one existed.
    pub fn try_delete(&mut self, uri: &str) -> Result<bool, WeftError> {
        let existed = self.backend.store_mut().delete_template(url_of(uri))?;
        if existed {
            info!(template = uri, "deleted template");
        }
        Ok(existed)
    }

    pub fn delete(&mut self, uri: &str) -> bool {
        log_and_default(self.try_delete(uri), "delete")
    }

    /// Ids of the stored top-level templates, in document order.
    pub fn try_list(&self) -> Result<Vec<String>, WeftError> {
        let class = self.bridge.vocabulary().concept(Concept::WorkflowTemplate);
        let store = self.backend.store();
        let mut ids = Vec::new();
        for url in store.list_templates()? {
            let Some(graph) = store.load_template(&url)? else {
                continue;
            };
            ids.extend(
                graph
                    .instances_of(class)
                    .into_iter()
                    .filter(|id| url_of(id) == url)
                    .map(str::to_string),
            );
        }
        Ok(ids)
    }

    pub fn list(&self) -> Vec<String> {
        log_and_default(self.try_list(), "list")
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// The serialized form of `template`, constraint triples included.
    pub fn snapshot(&self, template: &mut Template) -> TripleGraph {
        self.bridge.write(template)
    }

    /// Validate `template` with `engine`; `None` when it is rejected.
    pub fn apply_rules<'t>(
        &self,
        template: &'t mut Template,
        engine: &impl RuleEngine,
    ) -> Option<&'t Template> {
        self.bridge.apply_rules(template, engine)
    }
}

// =============================================================================
// TESTS
// =============================================================================
