//! # Core Type Definitions
//!
//! This module contains the building blocks of a workflow template:
//! - Identifiers (`NodeId`, `PortId`, `LinkId`, `VariableId`) and URI helpers
//! - Graph elements (`Port`, `Role`, `Node`, `Link`, `Variable`, `ComponentVariable`)
//! - Template-level records (`Metadata`, `Rules`)
//! - Literal values shared with the triple model (`Literal`)
//! - Error types (`WeftError`, `StorageError`)
//!
//! Identifiers are URI-like strings of the form `<url>#<name>`. Everything that
//! is ordered here is ordered by declaration, never by hash.

use crate::binding::{Binding, ValueBinding};
use crate::graph::Template;
use crate::sets::{ComponentSetCreationRule, PortSetCreationRule};
use crate::vocab::{XSD_BOOLEAN, XSD_DATETIME, XSD_INT, XSD_STRING};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// URI HELPERS
// =============================================================================

/// The local name of an identifier: everything after the last `#`.
///
/// Identifiers without a `#` are their own local name.
#[must_use]
pub fn local_name(id: &str) -> &str {
    id.rfind('#').map_or(id, |pos| &id[pos + 1..])
}

/// The namespace of an identifier, including the trailing `#`.
///
/// Returns an empty string for identifiers without a `#`.
#[must_use]
pub fn namespace_of(id: &str) -> &str {
    id.rfind('#').map_or("", |pos| &id[..=pos])
}

/// The document URL of an identifier (namespace without the `#`).
#[must_use]
pub fn url_of(id: &str) -> &str {
    id.rfind('#').map_or(id, |pos| &id[..pos])
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The full identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The local name (after the last `#`).
            #[must_use]
            pub fn name(&self) -> &str {
                local_name(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a node, unique within a template.
    NodeId
);
string_id!(
    /// Identifier of a port, unique within a template.
    PortId
);
string_id!(
    /// Identifier of a link, unique within a template.
    LinkId
);
string_id!(
    /// Identifier of a data or parameter variable, unique within a template.
    VariableId
);

// =============================================================================
// LITERALS
// =============================================================================

/// A literal value with an optional datatype IRI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form.
    pub value: String,
    /// Datatype IRI (`None` for plain literals).
    pub datatype: Option<String>,
}

impl Literal {
    /// A plain literal without datatype.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
        }
    }

    /// A literal with an explicit datatype IRI.
    #[must_use]
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: Some(datatype.into()),
        }
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::typed(value, XSD_STRING)
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), XSD_BOOLEAN)
    }

    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::typed(value.to_string(), XSD_INT)
    }

    #[must_use]
    pub fn date_time(value: impl Into<String>) -> Self {
        Self::typed(value, XSD_DATETIME)
    }

    /// Interpret the literal as a boolean (`true`/`1`).
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.value.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Interpret the literal as an integer.
    ///
    /// Decimal lexical forms (`"3.0"`) are truncated to their integer part;
    /// older stores wrote the schema version as a float.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        let text = self.value.trim();
        let integral = text.split_once('.').map_or(text, |(head, _)| head);
        integral.parse().ok()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// =============================================================================
// ROLE & PORT
// =============================================================================

/// A role: the catalog-independent identity of a port or boundary variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Resource identifier of the role.
    pub id: String,
    /// Stable role-id string, survives catalog renames.
    pub role_id: Option<String>,
    /// Nested-collection depth (0 = scalar).
    pub dimensionality: u32,
    /// Optional type tag.
    pub role_type: Option<String>,
}

impl Role {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role_id: None,
            dimensionality: 0,
            role_type: None,
        }
    }

    /// Builder-style role-id setter.
    #[must_use]
    pub fn with_role_id(mut self, role_id: impl Into<String>) -> Self {
        self.role_id = Some(role_id.into());
        self
    }

    /// Builder-style dimensionality setter.
    #[must_use]
    pub fn with_dimensionality(mut self, dimensionality: u32) -> Self {
        self.dimensionality = dimensionality;
        self
    }
}

/// An attachment point on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: PortId,
    pub role: Option<Role>,
}

impl Port {
    #[must_use]
    pub fn new(id: impl Into<PortId>) -> Self {
        Self {
            id: id.into(),
            role: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

// =============================================================================
// COMPONENT VARIABLE
// =============================================================================

/// What a node is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRef {
    /// A reference to an external component.
    Component {
        /// Concrete component binding (or a set of them).
        binding: Option<Binding>,
        /// Whether the component is concrete rather than abstract.
        concrete: bool,
    },
    /// A nested template, making the node a sub-workflow.
    Workflow(Box<Template>),
}

/// The single component variable owned by every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentVariable {
    pub id: String,
    pub kind: ComponentRef,
}

impl ComponentVariable {
    /// A component variable pointing at an external component.
    #[must_use]
    pub fn component(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ComponentRef::Component {
                binding: None,
                concrete: false,
            },
        }
    }

    /// A component variable wrapping a nested template. The id is the template id.
    #[must_use]
    pub fn workflow(template: Template) -> Self {
        Self {
            id: template.id().to_string(),
            kind: ComponentRef::Workflow(Box::new(template)),
        }
    }

    #[must_use]
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.set_binding(binding);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        local_name(&self.id)
    }

    #[must_use]
    pub fn is_template(&self) -> bool {
        matches!(self.kind, ComponentRef::Workflow(_))
    }

    #[must_use]
    pub fn template(&self) -> Option<&Template> {
        match &self.kind {
            ComponentRef::Workflow(t) => Some(t),
            ComponentRef::Component { .. } => None,
        }
    }

    pub fn template_mut(&mut self) -> Option<&mut Template> {
        match &mut self.kind {
            ComponentRef::Workflow(t) => Some(t),
            ComponentRef::Component { .. } => None,
        }
    }

    #[must_use]
    pub fn binding(&self) -> Option<&Binding> {
        match &self.kind {
            ComponentRef::Component { binding, .. } => binding.as_ref(),
            ComponentRef::Workflow(_) => None,
        }
    }

    /// Set the component binding. Ignored for sub-workflow nodes.
    pub fn set_binding(&mut self, value: Binding) {
        if let ComponentRef::Component { binding, .. } = &mut self.kind {
            *binding = Some(value);
        }
    }

    #[must_use]
    pub fn is_concrete(&self) -> bool {
        matches!(self.kind, ComponentRef::Component { concrete: true, .. })
    }

    pub fn set_concrete(&mut self, value: bool) {
        if let ComponentRef::Component { concrete, .. } = &mut self.kind {
            *concrete = value;
        }
    }
}

impl fmt::Display for ComponentVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.binding() {
            Some(binding) => write!(f, "{}={}", self.name(), binding),
            None => f.write_str(self.name()),
        }
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A step of the workflow.
///
/// Ports are kept in insertion order (display order) and looked up by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub component: ComponentVariable,
    /// Free text, used by editors to store layout coordinates.
    pub comment: Option<String>,
    input_ports: Vec<Port>,
    output_ports: Vec<Port>,
    component_rule: Option<ComponentSetCreationRule>,
    port_rule: Option<PortSetCreationRule>,
}

impl Node {
    #[must_use]
    pub fn new(id: impl Into<NodeId>, component: ComponentVariable) -> Self {
        Self {
            id: id.into(),
            component,
            comment: None,
            input_ports: Vec::new(),
            output_ports: Vec::new(),
            component_rule: None,
            port_rule: None,
        }
    }

    pub fn input_ports(&self) -> &[Port] {
        &self.input_ports
    }

    pub fn output_ports(&self) -> &[Port] {
        &self.output_ports
    }

    #[must_use]
    pub fn find_input_port(&self, id: &PortId) -> Option<&Port> {
        self.input_ports.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn find_output_port(&self, id: &PortId) -> Option<&Port> {
        self.output_ports.iter().find(|p| &p.id == id)
    }

    /// Add an input port. A port with the same id is kept as is.
    pub fn add_input_port(&mut self, port: Port) {
        if self.find_input_port(&port.id).is_none() {
            self.input_ports.push(port);
        }
    }

    /// Add an output port. A port with the same id is kept as is.
    pub fn add_output_port(&mut self, port: Port) {
        if self.find_output_port(&port.id).is_none() {
            self.output_ports.push(port);
        }
    }

    /// Remove an input port and every port-rule leaf that references it.
    pub fn delete_input_port(&mut self, id: &PortId) -> Option<Port> {
        let pos = self.input_ports.iter().position(|p| &p.id == id)?;
        if let Some(rule) = self.port_rule.as_mut() {
            rule.expression.retain_ports(&|p| p != id);
        }
        Some(self.input_ports.remove(pos))
    }

    pub fn delete_output_port(&mut self, id: &PortId) -> Option<Port> {
        let pos = self.output_ports.iter().position(|p| &p.id == id)?;
        Some(self.output_ports.remove(pos))
    }

    #[must_use]
    pub fn component_rule(&self) -> Option<&ComponentSetCreationRule> {
        self.component_rule.as_ref()
    }

    #[must_use]
    pub fn port_rule(&self) -> Option<&PortSetCreationRule> {
        self.port_rule.as_ref()
    }

    pub fn port_rule_mut(&mut self) -> Option<&mut PortSetCreationRule> {
        self.port_rule.as_mut()
    }

    /// Replace the component set-creation rule (a node holds at most one).
    pub fn set_component_rule(&mut self, rule: ComponentSetCreationRule) {
        self.component_rule = Some(rule);
    }

    /// Replace the port set-creation rule (a node holds at most one).
    pub fn set_port_rule(&mut self, rule: PortSetCreationRule) {
        self.port_rule = Some(rule);
    }
}

// =============================================================================
// LINK
// =============================================================================

/// Classification of a link by the endpoints it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// No origin: feeds a template input into a node.
    Input,
    /// No destination: exposes a node output as a template output.
    Output,
    /// Both endpoints: connects two nodes.
    InOut,
}

/// A data-flow edge. Either endpoint may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub from_node: Option<NodeId>,
    pub from_port: Option<PortId>,
    pub to_node: Option<NodeId>,
    pub to_port: Option<PortId>,
    pub variable: Option<VariableId>,
}

impl Link {
    /// The link's kind, or `None` when both endpoints are missing.
    #[must_use]
    pub fn kind(&self) -> Option<LinkKind> {
        match (&self.from_node, &self.to_node) {
            (None, Some(_)) => Some(LinkKind::Input),
            (Some(_), None) => Some(LinkKind::Output),
            (Some(_), Some(_)) => Some(LinkKind::InOut),
            (None, None) => None,
        }
    }

    #[must_use]
    pub fn is_input_link(&self) -> bool {
        self.kind() == Some(LinkKind::Input)
    }

    #[must_use]
    pub fn is_output_link(&self) -> bool {
        self.kind() == Some(LinkKind::Output)
    }

    #[must_use]
    pub fn is_inout_link(&self) -> bool {
        self.kind() == Some(LinkKind::InOut)
    }

    #[must_use]
    pub fn carries(&self, variable: &VariableId) -> bool {
        self.variable.as_ref() == Some(variable)
    }
}

// =============================================================================
// VARIABLE
// =============================================================================

/// The two kinds of variable, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    Data,
    Parameter,
}

/// Variable kind with its kind-specific binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    /// Bound to data-object identifiers.
    Data { binding: Option<Binding> },
    /// Bound to literal values.
    Parameter { binding: Option<ValueBinding> },
}

/// A data or parameter placeholder carried by links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: VariableId,
    pub kind: VariableKind,
    pub comment: Option<String>,
}

impl Variable {
    /// Create an unbound variable of the given type.
    #[must_use]
    pub fn new(id: impl Into<VariableId>, var_type: VariableType) -> Self {
        let kind = match var_type {
            VariableType::Data => VariableKind::Data { binding: None },
            VariableType::Parameter => VariableKind::Parameter { binding: None },
        };
        Self {
            id: id.into(),
            kind,
            comment: None,
        }
    }

    #[must_use]
    pub fn data(id: impl Into<VariableId>) -> Self {
        Self::new(id, VariableType::Data)
    }

    #[must_use]
    pub fn parameter(id: impl Into<VariableId>) -> Self {
        Self::new(id, VariableType::Parameter)
    }

    #[must_use]
    pub fn var_type(&self) -> VariableType {
        match self.kind {
            VariableKind::Data { .. } => VariableType::Data,
            VariableKind::Parameter { .. } => VariableType::Parameter,
        }
    }

    #[must_use]
    pub fn is_data_variable(&self) -> bool {
        self.var_type() == VariableType::Data
    }

    #[must_use]
    pub fn is_parameter_variable(&self) -> bool {
        self.var_type() == VariableType::Parameter
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    #[must_use]
    pub fn has_binding(&self) -> bool {
        match &self.kind {
            VariableKind::Data { binding } => binding.is_some(),
            VariableKind::Parameter { binding } => binding.is_some(),
        }
    }
}

// =============================================================================
// METADATA & RULES
// =============================================================================

/// Descriptive metadata of a template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    pub documentation: Option<String>,
    pub contributors: Vec<String>,
    /// Identifiers of the templates this one was copied from.
    pub created_from: Vec<String>,
    /// `xsd:dateTime` lexical form.
    pub last_update_time: Option<String>,
}

/// Free-text constraint rules evaluated by the rule-inference engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rules {
    pub text: Option<String>,
}

impl Rules {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the template model and the serialization bridge.
///
/// Read-style lookups return `Option` instead; these are for mutations that
/// need an entity to exist, and for reads of malformed store content.
#[derive(Debug, Error)]
pub enum WeftError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Link not found: {0}")]
    LinkNotFound(LinkId),

    #[error("Variable not found: {0}")]
    VariableNotFound(VariableId),

    /// A link endpoint names a node but no port on it.
    #[error("Missing port for link endpoint on node {0}")]
    MissingPort(NodeId),

    /// A binding of the wrong kind was assigned to a variable.
    #[error("Variable {0} cannot hold this kind of binding")]
    BindingKindMismatch(VariableId),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A sub-template (transitively) contains itself.
    #[error("Cyclic sub-template reference through {0}")]
    CyclicTemplate(String),

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of the knowledge-store backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("No stored template at {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
