//! # weft-core
//!
//! The workflow template engine for weft.
//!
//! A template is a typed graph of nodes, ports, links and variables. On top
//! of it sits a set-creation-rule algebra that decides how multiple bound
//! values at a node combine for batch execution. Templates map to and from a
//! triple-based knowledge store, nest as sub-templates, and deep-copy.
//!
//! ## Layout
//!
//! - `types`, `binding`, `sets`: the data model
//! - `graph`, `roles`, `rules`, `copy`: template operations
//! - `triples`, `vocab`, `bridge`: the store model and the mapping to it
//! - `constraints`, `inference`: external collaborators behind traits
//! - `formats`, `export`, `storage`, `session`: persistence
//!
//! ## Constraints
//!
//! - Synchronous and single-writer: no async, no locks, no network
//! - Deterministic: ordered collections, counter-based id synthesis

// =============================================================================
// MODULES
// =============================================================================

pub mod binding;
pub mod bridge;
pub mod constraints;
pub mod copy;
pub mod export;
pub mod formats;
pub mod graph;
pub mod inference;
pub mod primitives;
pub mod roles;
pub mod rules;
pub mod session;
pub mod sets;
pub mod storage;
pub mod triples;
pub mod types;
pub mod vocab;

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use binding::{Binding, BindingTree, ValueBinding};
pub use graph::Template;
pub use sets::{
    ComponentSetCreationRule, PortSetCreationRule, SetExpression, SetOperator, SetType,
};
pub use types::{
    ComponentRef, ComponentVariable, Link, LinkId, LinkKind, Literal, Metadata, Node, NodeId,
    Port, PortId, Role, Rules, StorageError, Variable, VariableId, VariableKind, VariableType,
    WeftError, local_name, namespace_of, url_of,
};

// =============================================================================
// RE-EXPORTS: Store Model
// =============================================================================

pub use bridge::TemplateBridge;
pub use constraints::{ConstraintEngine, ConstraintStore};
pub use inference::{RuleEngine, RuleOutcome, strip_rule_comments};
pub use triples::{Triple, TripleGraph, Value};
pub use vocab::{Concept, DEFAULT_ONTOLOGY_URL, Property, Vocabulary};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use export::{
    CanonicalGraph, CanonicalHeader, canonical_checksum, export_canonical, import_canonical,
    verify_canonical,
};
#[cfg(feature = "crypto-hash")]
pub use export::{canonical_crypto_hash, compute_blake3_hash};
pub use formats::{
    PersistenceHeader, graph_from_bytes, graph_to_bytes, store_from_bytes, store_to_bytes,
};
pub use session::{Session, StorageBackend};
pub use storage::{MemoryStore, RedbStore, TemplateStore};
