//! # Triple Graph
//!
//! The object/property model of the knowledge store. A template document is
//! a set of `(subject, predicate, object)` triples plus document imports.
//!
//! Subjects are kept in a `BTreeMap` and each subject's properties in
//! assertion order, so property values (link lists, expression arguments)
//! read back in the order they were written.

use crate::primitives::ANONYMOUS_PREFIX;
use crate::types::Literal;
use crate::vocab::{RDF_TYPE, RDFS_COMMENT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Reference to another resource by id.
    Resource(String),
    Literal(Literal),
    /// Ordered list (used for set bindings).
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn resource(id: impl Into<String>) -> Self {
        Self::Resource(id.into())
    }

    #[must_use]
    pub fn as_resource(&self) -> Option<&str> {
        match self {
            Self::Resource(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Lexical form of a literal.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_literal().map(|l| l.value.as_str())
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_literal().and_then(Literal::as_bool)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        self.as_literal().and_then(Literal::as_int)
    }

    fn rename(&mut self, from: &str, to: &str) {
        match self {
            Self::Resource(id) => rename_id(id, from, to),
            Self::List(items) => items.iter_mut().for_each(|v| v.rename(from, to)),
            Self::Literal(_) => {}
        }
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

/// A single assertion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Value,
}

impl Triple {
    #[must_use]
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Value) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// Whether an id names a blank node.
#[must_use]
pub fn is_anonymous(id: &str) -> bool {
    id.starts_with(ANONYMOUS_PREFIX)
}

fn rename_id(id: &mut String, from: &str, to: &str) {
    if let Some(rest) = id.strip_prefix(from) {
        *id = format!("{to}{rest}");
    }
}

/// An in-memory triple store document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleGraph {
    subjects: BTreeMap<String, Vec<(String, Value)>>,
    imports: BTreeMap<String, BTreeSet<String>>,
}

impl TripleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from triples, keeping their order per subject.
    #[must_use]
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut graph = Self::new();
        graph.add_triples(triples);
        graph
    }

    /// Number of triples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.values().all(Vec::is_empty)
    }

    #[must_use]
    pub fn contains_subject(&self, subject: &str) -> bool {
        self.subjects.contains_key(subject)
    }

    /// Assert a triple. Exact duplicates are ignored.
    pub fn add_property_value(&mut self, subject: &str, predicate: &str, object: Value) {
        let props = self.subjects.entry(subject.to_string()).or_default();
        if !props.iter().any(|(p, o)| p == predicate && o == &object) {
            props.push((predicate.to_string(), object));
        }
    }

    /// Replace every value of `predicate` on `subject` with `object`.
    pub fn set_property_value(&mut self, subject: &str, predicate: &str, object: Value) {
        self.remove_property(subject, predicate);
        self.add_property_value(subject, predicate, object);
    }

    pub fn remove_property(&mut self, subject: &str, predicate: &str) {
        if let Some(props) = self.subjects.get_mut(subject) {
            props.retain(|(p, _)| p != predicate);
        }
    }

    /// First value of `predicate` on `subject`.
    #[must_use]
    pub fn property_value(&self, subject: &str, predicate: &str) -> Option<&Value> {
        self.subjects
            .get(subject)?
            .iter()
            .find(|(p, _)| p == predicate)
            .map(|(_, o)| o)
    }

    /// Every value of `predicate` on `subject`, in assertion order.
    pub fn property_values(&self, subject: &str, predicate: &str) -> Vec<&Value> {
        self.subjects
            .get(subject)
            .map(|props| {
                props
                    .iter()
                    .filter(|(p, _)| p == predicate)
                    .map(|(_, o)| o)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resource values of `predicate` on `subject`.
    pub fn resource_values(&self, subject: &str, predicate: &str) -> Vec<&str> {
        self.property_values(subject, predicate)
            .into_iter()
            .filter_map(Value::as_resource)
            .collect()
    }

    /// Every `(predicate, object)` pair of `subject`.
    pub fn properties(&self, subject: &str) -> &[(String, Value)] {
        self.subjects.get(subject).map_or(&[], Vec::as_slice)
    }

    /// Declare `id` an instance of `class`.
    pub fn create_object_of_class(&mut self, id: &str, class: &str) {
        self.add_property_value(id, RDF_TYPE, Value::resource(class));
    }

    pub fn classes_of(&self, id: &str) -> Vec<&str> {
        self.resource_values(id, RDF_TYPE)
    }

    #[must_use]
    pub fn is_a(&self, id: &str, class: &str) -> bool {
        self.classes_of(id).contains(&class)
    }

    /// Subjects typed `class`, in subject order.
    pub fn instances_of(&self, class: &str) -> Vec<&str> {
        self.subjects
            .keys()
            .filter(|s| self.is_a(s, class))
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn comment(&self, id: &str) -> Option<&str> {
        self.property_value(id, RDFS_COMMENT).and_then(Value::as_str)
    }

    pub fn set_comment(&mut self, id: &str, comment: &str) {
        self.set_property_value(id, RDFS_COMMENT, Literal::plain(comment).into());
    }

    /// Record that document `url` imports document `import`.
    pub fn create_import(&mut self, url: &str, import: &str) {
        self.imports
            .entry(url.to_string())
            .or_default()
            .insert(import.to_string());
    }

    pub fn imports_of(&self, url: &str) -> BTreeSet<&str> {
        self.imports
            .get(url)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every `(document, import)` pair.
    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.imports
            .iter()
            .flat_map(|(url, set)| set.iter().map(move |i| (url.as_str(), i.as_str())))
    }

    pub fn add_triples(&mut self, triples: impl IntoIterator<Item = Triple>) {
        for t in triples {
            self.add_property_value(&t.subject, &t.predicate, t.object);
        }
    }

    /// Every triple, by subject then assertion order.
    pub fn triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.subjects.iter().flat_map(|(s, props)| {
            props
                .iter()
                .map(move |(p, o)| Triple::new(s.clone(), p.clone(), o.clone()))
        })
    }

    /// Merge another graph into this one.
    pub fn merge(&mut self, other: &TripleGraph) {
        self.add_triples(other.triples());
        for (url, import) in other.imports() {
            self.create_import(url, import);
        }
    }

    /// Move every resource id starting with `from` into namespace `to`.
    ///
    /// Subjects, predicates, resource objects and import urls are renamed;
    /// literals are left alone.
    pub fn rename_namespace(&mut self, from: &str, to: &str) {
        if from.is_empty() || from == to {
            return;
        }
        let subjects = std::mem::take(&mut self.subjects);
        for (mut subject, props) in subjects {
            rename_id(&mut subject, from, to);
            for (mut predicate, mut object) in props {
                rename_id(&mut predicate, from, to);
                object.rename(from, to);
                self.add_property_value(&subject, &predicate, object);
            }
        }

        let from_url = from.trim_end_matches('#');
        let to_url = to.trim_end_matches('#');
        let imports = std::mem::take(&mut self.imports);
        for (mut url, set) in imports {
            rename_id(&mut url, from_url, to_url);
            for mut import in set {
                rename_id(&mut import, from_url, to_url);
                self.create_import(&url, &import);
            }
        }
    }
}
