//! # Set-Creation Rules
//!
//! Each node carries two rules that tell the planner how to expand it when its
//! inputs are collections:
//! - a component rule: expand per component (`SType`) or per workflow (`WType`)
//! - a port rule: a set expression over the node's input ports
//!
//! A set expression is a tree. Leaves name an input port; inner nodes combine
//! their children with a set operator.

use crate::types::PortId;
use std::collections::BTreeSet;
use std::fmt;

/// Operator combining the children of a set expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetOperator {
    /// Cross product of the children.
    XProduct,
    /// Element-wise (n-wise) pairing of the children.
    NWise,
    IncreaseDimensionality,
    ReduceDimensionality,
    Shift,
}

impl SetOperator {
    pub const ALL: [Self; 5] = [
        Self::XProduct,
        Self::NWise,
        Self::IncreaseDimensionality,
        Self::ReduceDimensionality,
        Self::Shift,
    ];

    /// Short tag used in display strings and generated expression ids.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::XProduct => "xprod",
            Self::NWise => "nwise",
            Self::IncreaseDimensionality => "dim",
            Self::ReduceDimensionality => "rdim",
            Self::Shift => "shift",
        }
    }
}

/// Set-creation granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SetType {
    /// One workflow per element.
    SType,
    /// One workflow over the whole set.
    #[default]
    WType,
}

/// A set-combination expression over port identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetExpression {
    Leaf {
        operator: SetOperator,
        port: PortId,
    },
    Set {
        operator: SetOperator,
        children: Vec<SetExpression>,
    },
}

impl SetExpression {
    #[must_use]
    pub fn leaf(operator: SetOperator, port: impl Into<PortId>) -> Self {
        Self::Leaf {
            operator,
            port: port.into(),
        }
    }

    /// An empty set node.
    #[must_use]
    pub fn set(operator: SetOperator) -> Self {
        Self::Set {
            operator,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(operator: SetOperator, children: Vec<Self>) -> Self {
        Self::Set { operator, children }
    }

    #[must_use]
    pub fn operator(&self) -> SetOperator {
        match self {
            Self::Leaf { operator, .. } | Self::Set { operator, .. } => *operator,
        }
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set { .. })
    }

    #[must_use]
    pub fn port(&self) -> Option<&PortId> {
        match self {
            Self::Leaf { port, .. } => Some(port),
            Self::Set { .. } => None,
        }
    }

    pub fn children(&self) -> &[Self] {
        match self {
            Self::Set { children, .. } => children,
            Self::Leaf { .. } => &[],
        }
    }

    /// Append a child. Returns `false` on a leaf.
    pub fn push(&mut self, child: Self) -> bool {
        match self {
            Self::Set { children, .. } => {
                children.push(child);
                true
            }
            Self::Leaf { .. } => false,
        }
    }

    /// Ports referenced by the leaves, depth-first.
    pub fn ports(&self) -> Vec<&PortId> {
        let mut out = Vec::new();
        self.collect_ports(&mut out);
        out
    }

    fn collect_ports<'a>(&'a self, out: &mut Vec<&'a PortId>) {
        match self {
            Self::Leaf { port, .. } => out.push(port),
            Self::Set { children, .. } => {
                for child in children {
                    child.collect_ports(out);
                }
            }
        }
    }

    #[must_use]
    pub fn contains_port(&self, id: &PortId) -> bool {
        match self {
            Self::Leaf { port, .. } => port == id,
            Self::Set { children, .. } => children.iter().any(|c| c.contains_port(id)),
        }
    }

    /// Drop every leaf (at any depth) whose port fails `keep`.
    ///
    /// Set nodes emptied this way stay in place.
    pub fn retain_ports(&mut self, keep: &impl Fn(&PortId) -> bool) {
        if let Self::Set { children, .. } = self {
            children.retain(|c| c.port().is_none_or(keep));
            for child in children.iter_mut() {
                child.retain_ports(keep);
            }
        }
    }

    /// Drop every leaf whose port an earlier leaf (depth-first) already
    /// references.
    pub fn dedupe_ports(&mut self) {
        let mut seen = BTreeSet::new();
        self.dedupe_into(&mut seen);
    }

    fn dedupe_into(&mut self, seen: &mut BTreeSet<PortId>) {
        if let Self::Set { children, .. } = self {
            let mut kept = Vec::with_capacity(children.len());
            for mut child in std::mem::take(children) {
                match child.port() {
                    Some(port) => {
                        if seen.insert(port.clone()) {
                            kept.push(child);
                        }
                    }
                    None => {
                        child.dedupe_into(seen);
                        kept.push(child);
                    }
                }
            }
            *children = kept;
        }
    }

    /// Rebuild the expression with every leaf port passed through `resolve`.
    ///
    /// Leaves that do not resolve are dropped; a leaf root that does not
    /// resolve yields `None`.
    pub fn remap(&self, resolve: &impl Fn(&PortId) -> Option<PortId>) -> Option<Self> {
        match self {
            Self::Leaf { operator, port } => resolve(port).map(|port| Self::Leaf {
                operator: *operator,
                port,
            }),
            Self::Set { operator, children } => Some(Self::Set {
                operator: *operator,
                children: children.iter().filter_map(|c| c.remap(resolve)).collect(),
            }),
        }
    }
}

impl fmt::Display for SetExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { port, .. } => f.write_str(port.name()),
            Self::Set { operator, children } => {
                write!(f, "{}(", operator.tag())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Component expansion rule of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentSetCreationRule {
    pub set_type: SetType,
}

impl ComponentSetCreationRule {
    #[must_use]
    pub fn new(set_type: SetType) -> Self {
        Self { set_type }
    }
}

/// Port expansion rule of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortSetCreationRule {
    pub set_type: SetType,
    pub expression: SetExpression,
}

impl PortSetCreationRule {
    #[must_use]
    pub fn new(set_type: SetType, expression: SetExpression) -> Self {
        Self {
            set_type,
            expression,
        }
    }
}

impl Default for PortSetCreationRule {
    /// `WType` over an empty cross product.
    fn default() -> Self {
        Self::new(SetType::WType, SetExpression::set(SetOperator::XProduct))
    }
}
