//! # Bindings
//!
//! A binding is either a single value or an ordered set of nested bindings.
//! Data variables and component variables bind to resource identifiers;
//! parameter variables bind to literals.

use crate::types::Literal;
use std::fmt;

/// A value or a (possibly nested) ordered collection of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingTree<T> {
    Value(T),
    Set(Vec<BindingTree<T>>),
}

/// Binding of data and component variables (resource identifiers).
pub type Binding = BindingTree<String>;

/// Binding of parameter variables (literal values).
pub type ValueBinding = BindingTree<Literal>;

impl<T> BindingTree<T> {
    #[must_use]
    pub fn leaf(value: T) -> Self {
        Self::Value(value)
    }

    #[must_use]
    pub fn set(children: Vec<Self>) -> Self {
        Self::Set(children)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Set(_) => None,
        }
    }

    /// Direct children; empty for a single value.
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Set(children) => children,
            Self::Value(_) => &[],
        }
    }

    /// Append a child. Returns `false` (and drops the child) on a single value.
    pub fn push(&mut self, child: Self) -> bool {
        match self {
            Self::Set(children) => {
                children.push(child);
                true
            }
            Self::Value(_) => false,
        }
    }

    /// Nesting depth: 0 for a value, 1 + deepest child for a set.
    #[must_use]
    pub fn dimensionality(&self) -> u32 {
        match self {
            Self::Value(_) => 0,
            Self::Set(children) => {
                1 + children
                    .iter()
                    .map(Self::dimensionality)
                    .max()
                    .unwrap_or(0)
            }
        }
    }

    /// All values, depth-first.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Self::Value(v) => out.push(v),
            Self::Set(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Structure-preserving conversion of every value.
    pub fn map<U>(&self, f: &impl Fn(&T) -> U) -> BindingTree<U> {
        match self {
            Self::Value(v) => BindingTree::Value(f(v)),
            Self::Set(children) => BindingTree::Set(children.iter().map(|c| c.map(f)).collect()),
        }
    }
}

impl<T: fmt::Display> fmt::Display for BindingTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Set(children) => {
                f.write_str("[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("]")
            }
        }
    }
}
