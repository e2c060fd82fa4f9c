//! # Variable Constraints
//!
//! Constraints are arbitrary triples about variables (types, sizes, formats)
//! kept apart from the template structure and merged in when a template is
//! written.

use crate::triples::Triple;
use crate::types::VariableId;
use std::collections::BTreeMap;

/// Boundary to a constraint store keyed by variable id.
pub trait ConstraintEngine {
    /// Every constraint triple whose subject is one of `variables`.
    fn get_constraints(&self, variables: &[VariableId]) -> Vec<Triple>;

    /// Record constraint triples. Exact duplicates are ignored.
    fn add_constraints(&mut self, triples: Vec<Triple>);
}

/// In-memory constraint store, one triple list per variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintStore {
    by_variable: BTreeMap<String, Vec<Triple>>,
}

impl ConstraintStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constraints on a single variable.
    pub fn constraints_for(&self, variable: &VariableId) -> &[Triple] {
        self.by_variable
            .get(variable.as_str())
            .map_or(&[], Vec::as_slice)
    }

    pub fn remove_constraints(&mut self, variable: &VariableId) -> Vec<Triple> {
        self.by_variable
            .remove(variable.as_str())
            .unwrap_or_default()
    }

    /// Total number of constraint triples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_variable.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConstraintEngine for ConstraintStore {
    fn get_constraints(&self, variables: &[VariableId]) -> Vec<Triple> {
        variables
            .iter()
            .flat_map(|v| self.constraints_for(v).iter().cloned())
            .collect()
    }

    fn add_constraints(&mut self, triples: Vec<Triple>) {
        for triple in triples {
            let list = self.by_variable.entry(triple.subject.clone()).or_default();
            if !list.contains(&triple) {
                list.push(triple);
            }
        }
    }
}
