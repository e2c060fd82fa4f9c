//! # Template Graph
//!
//! The in-memory workflow template: nodes, links and variables held in
//! declaration order, plus boundary roles, metadata and rules.
//!
//! Collections are vectors. Iteration order is insertion order and every
//! query below returns results in that order; identifier-collision checks
//! walk the same order, which keeps synthesized ids deterministic.
//!
//! Mutations keep the referential invariants:
//! - every link endpoint port exists on its node (or the endpoint is `None`)
//! - a variable lives as long as some link carries it
//! - a port lives as long as some link lands on it

use crate::binding::{Binding, ValueBinding};
use crate::constraints::ConstraintStore;
use crate::primitives::{LATEST_VERSION, NODE_SUFFIX};
use crate::types::{
    ComponentVariable, Link, LinkId, Metadata, Node, NodeId, Port, PortId, Role, Rules,
    Variable, VariableId, VariableKind, VariableType, WeftError, local_name, namespace_of,
    url_of,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A workflow template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub(crate) id: String,
    pub(crate) version: u32,
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) variables: Vec<Variable>,
    pub(crate) input_roles: BTreeMap<VariableId, Role>,
    pub(crate) output_roles: BTreeMap<VariableId, Role>,
    pub(crate) metadata: Metadata,
    pub(crate) rules: Rules,
    /// Id of the enclosing template; a lookup key, never an owner.
    pub(crate) parent: Option<String>,
    /// Id of the template this one was copied from.
    pub(crate) created_from: Option<String>,
    /// Document URLs this template's store document imports.
    pub(crate) imports: BTreeSet<String>,
    pub(crate) constraints: ConstraintStore,
}

/// Return `base`, or the first `base_N` (N = 1, 2, ...) not yet taken.
pub(crate) fn unique_id(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

impl Template {
    /// Create an empty template at the latest schema version.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: LATEST_VERSION,
            nodes: Vec::new(),
            links: Vec::new(),
            variables: Vec::new(),
            input_roles: BTreeMap::new(),
            output_roles: BTreeMap::new(),
            metadata: Metadata::default(),
            rules: Rules::default(),
            parent: None,
            created_from: None,
            imports: BTreeSet::new(),
            constraints: ConstraintStore::new(),
        }
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        local_name(&self.id)
    }

    /// Namespace of the template id, including the trailing `#`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        namespace_of(&self.id)
    }

    /// Document URL of the template (namespace without `#`).
    #[must_use]
    pub fn url(&self) -> &str {
        url_of(&self.id)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Rebind the id to `namespace + name`.
    pub fn set_name(&mut self, name: &str) {
        self.id = format!("{}{}", self.namespace(), name);
    }

    /// Schema version the template was read with.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn created_from(&self) -> Option<&str> {
        self.created_from.as_deref()
    }

    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }

    /// Record that this template's document imports `url`.
    ///
    /// Sub-templates whose url is imported are written as references
    /// instead of being inlined.
    pub fn add_import(&mut self, url: impl Into<String>) {
        self.imports.insert(url.into());
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: Rules) {
        self.rules = rules;
    }

    pub fn constraints(&self) -> &ConstraintStore {
        &self.constraints
    }

    pub fn constraints_mut(&mut self) -> &mut ConstraintStore {
        &mut self.constraints
    }

    // =========================================================================
    // NODES
    // =========================================================================

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    /// Find the component variable with the given id on any node.
    #[must_use]
    pub fn component_variable(&self, id: &str) -> Option<&ComponentVariable> {
        self.nodes
            .iter()
            .map(|n| &n.component)
            .find(|c| c.id == id)
    }

    /// Add a node for `component` with id `<ns><component name>Node`,
    /// suffixed `_1`, `_2`, ... on collision.
    ///
    /// No set-creation rules are attached; see
    /// [`Template::fill_in_default_set_creation_rules`].
    pub fn add_node(&mut self, component: ComponentVariable) -> NodeId {
        let base = format!("{}{}{}", self.namespace(), component.name(), NODE_SUFFIX);
        let id = NodeId::new(unique_id(&base, |c| {
            self.nodes.iter().any(|n| n.id.as_str() == c)
        }));
        self.nodes.push(Node::new(id.clone(), component));
        id
    }

    /// Remove a node.
    ///
    /// Pure input/output links touching it are deleted (with variable and
    /// port cleanup); intermediate links lose the endpoint on this node and
    /// are demoted to pure output/input links.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<Node, WeftError> {
        let pos = self
            .nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| WeftError::NodeNotFound(id.clone()))?;
        let node = self.nodes.remove(pos);

        let incoming: Vec<LinkId> = self.node_input_links(id).map(|l| l.id.clone()).collect();
        for lid in incoming {
            self.detach_link_end(&lid, LinkEnd::Destination)?;
        }
        let outgoing: Vec<LinkId> = self.node_output_links(id).map(|l| l.id.clone()).collect();
        for lid in outgoing {
            self.detach_link_end(&lid, LinkEnd::Origin)?;
        }
        Ok(node)
    }

    fn detach_link_end(&mut self, lid: &LinkId, end: LinkEnd) -> Result<(), WeftError> {
        let link = self
            .links
            .iter_mut()
            .find(|l| &l.id == lid)
            .ok_or_else(|| WeftError::LinkNotFound(lid.clone()))?;
        let pure = match end {
            LinkEnd::Destination => link.is_input_link(),
            LinkEnd::Origin => link.is_output_link(),
        };
        if pure {
            self.delete_link(lid)?;
        } else {
            match end {
                LinkEnd::Destination => {
                    link.to_node = None;
                    link.to_port = None;
                }
                LinkEnd::Origin => {
                    link.from_node = None;
                    link.from_port = None;
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // LINKS
    // =========================================================================

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    #[must_use]
    pub fn link(&self, id: &LinkId) -> Option<&Link> {
        self.links.iter().find(|l| &l.id == id)
    }

    pub fn link_mut(&mut self, id: &LinkId) -> Option<&mut Link> {
        self.links.iter_mut().find(|l| &l.id == id)
    }

    /// `<ns><fromPort>_To_<toPort>`, with `Input_To` / `_Output` standing in
    /// for a missing origin / destination.
    #[must_use]
    pub fn create_link_id(&self, from_port: Option<&PortId>, to_port: Option<&PortId>) -> String {
        let head = from_port.map_or_else(|| "Input_To".to_string(), |p| format!("{}_To", p.name()));
        let tail = to_port.map_or_else(|| "_Output".to_string(), |p| format!("_{}", p.name()));
        format!("{}{head}{tail}", self.namespace())
    }

    /// Add a link between two (optional) node/port endpoints.
    ///
    /// Ports not yet on their node are registered; a variable not yet in the
    /// template is registered. The id is synthesized from the port names and
    /// suffixed `_1`, `_2`, ... on collision.
    pub fn add_link(
        &mut self,
        from_node: Option<&NodeId>,
        to_node: Option<&NodeId>,
        from_port: Option<Port>,
        to_port: Option<Port>,
        variable: Option<Variable>,
    ) -> Result<LinkId, WeftError> {
        for node in from_node.iter().chain(to_node.iter()) {
            if self.node(node).is_none() {
                return Err(WeftError::NodeNotFound((*node).clone()));
            }
        }
        let from_port = match (from_node, from_port) {
            (Some(n), None) => return Err(WeftError::MissingPort(n.clone())),
            (Some(_), port) => port,
            (None, _) => None,
        };
        let to_port = match (to_node, to_port) {
            (Some(n), None) => return Err(WeftError::MissingPort(n.clone())),
            (Some(_), port) => port,
            (None, _) => None,
        };

        let base = self.create_link_id(
            from_port.as_ref().map(|p| &p.id),
            to_port.as_ref().map(|p| &p.id),
        );
        let id = LinkId::new(unique_id(&base, |c| {
            self.links.iter().any(|l| l.id.as_str() == c)
        }));

        let from_port_id = from_port.as_ref().map(|p| p.id.clone());
        let to_port_id = to_port.as_ref().map(|p| p.id.clone());
        if let (Some(node), Some(port)) = (from_node.and_then(|n| self.node_mut(n)), from_port) {
            node.add_output_port(port);
        }
        if let (Some(node), Some(port)) = (to_node.and_then(|n| self.node_mut(n)), to_port) {
            node.add_input_port(port);
        }

        let variable_id = variable.map(|v| {
            let vid = v.id.clone();
            if self.variable(&vid).is_none() {
                self.variables.push(v);
            }
            vid
        });

        self.links.push(Link {
            id: id.clone(),
            from_node: from_node.cloned(),
            from_port: from_port_id,
            to_node: to_node.cloned(),
            to_port: to_port_id,
            variable: variable_id,
        });
        Ok(id)
    }

    /// Remove a link, its variable when no other link carries it, and each
    /// endpoint port no other link lands on.
    pub fn delete_link(&mut self, id: &LinkId) -> Result<Link, WeftError> {
        let pos = self
            .links
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| WeftError::LinkNotFound(id.clone()))?;
        let link = self.links.remove(pos);

        if let Some(var) = &link.variable {
            // The variable may already be gone through `delete_variable`.
            if self.variable(var).is_some() && !self.links.iter().any(|l| l.carries(var)) {
                self.delete_variable(var)?;
            }
        }

        if let (Some(n), Some(p)) = (&link.to_node, &link.to_port) {
            let in_use = self
                .links
                .iter()
                .any(|l| l.to_node.as_ref() == Some(n) && l.to_port.as_ref() == Some(p));
            if !in_use {
                if let Some(node) = self.node_mut(n) {
                    node.delete_input_port(p);
                }
            }
        }
        if let (Some(n), Some(p)) = (&link.from_node, &link.from_port) {
            let in_use = self
                .links
                .iter()
                .any(|l| l.from_node.as_ref() == Some(n) && l.from_port.as_ref() == Some(p));
            if !in_use {
                if let Some(node) = self.node_mut(n) {
                    node.delete_output_port(p);
                }
            }
        }
        Ok(link)
    }

    /// First link (in declaration order) matching the given endpoints.
    ///
    /// A `None` port is a wildcard, and so is a link with no port on that
    /// side. A `None` node matches only links that have no node on that side.
    #[must_use]
    pub fn get_link(
        &self,
        from_node: Option<&NodeId>,
        to_node: Option<&NodeId>,
        from_port: Option<&PortId>,
        to_port: Option<&PortId>,
    ) -> Option<&Link> {
        self.links.iter().find(|l| {
            l.from_node.as_ref() == from_node
                && l.to_node.as_ref() == to_node
                && from_port.is_none_or(|p| l.from_port.as_ref().is_none_or(|lp| lp == p))
                && to_port.is_none_or(|p| l.to_port.as_ref().is_none_or(|lp| lp == p))
        })
    }

    /// Intermediate links from `from` to `to`. Links missing either endpoint
    /// never match.
    pub fn links_between(&self, from: &NodeId, to: &NodeId) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|l| l.from_node.as_ref() == Some(from) && l.to_node.as_ref() == Some(to))
            .collect()
    }

    pub fn links_of_variable(&self, variable: &VariableId) -> Vec<&Link> {
        self.links.iter().filter(|l| l.carries(variable)).collect()
    }

    /// Pure input links (no origin).
    pub fn input_links(&self) -> Vec<&Link> {
        self.links.iter().filter(|l| l.is_input_link()).collect()
    }

    /// Pure output links (no destination).
    pub fn output_links(&self) -> Vec<&Link> {
        self.links.iter().filter(|l| l.is_output_link()).collect()
    }

    /// Links between two nodes.
    pub fn intermediate_links(&self) -> Vec<&Link> {
        self.links.iter().filter(|l| l.is_inout_link()).collect()
    }

    fn node_input_links<'a>(&'a self, node: &NodeId) -> impl Iterator<Item = &'a Link> + use<'a> {
        let node = node.clone();
        self.links
            .iter()
            .filter(move |l| l.to_node.as_ref() == Some(&node))
    }

    fn node_output_links<'a>(&'a self, node: &NodeId) -> impl Iterator<Item = &'a Link> + use<'a> {
        let node = node.clone();
        self.links
            .iter()
            .filter(move |l| l.from_node.as_ref() == Some(&node))
    }

    /// Links landing on `node`.
    pub fn input_links_of(&self, node: &NodeId) -> Vec<&Link> {
        self.node_input_links(node).collect()
    }

    /// Links leaving `node`.
    pub fn output_links_of(&self, node: &NodeId) -> Vec<&Link> {
        self.node_output_links(node).collect()
    }

    // =========================================================================
    // VARIABLES
    // =========================================================================

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.variables.iter().find(|v| &v.id == id)
    }

    pub fn variable_mut(&mut self, id: &VariableId) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| &v.id == id)
    }

    /// Add an unbound variable with id `base`, suffixed `_1`, `_2`, ... on
    /// collision.
    pub fn add_variable(&mut self, base: &str, var_type: VariableType) -> VariableId {
        let id = VariableId::new(unique_id(base, |c| {
            self.variables.iter().any(|v| v.id.as_str() == c)
        }));
        self.variables.push(Variable::new(id.clone(), var_type));
        id
    }

    /// Remove a variable and any role mapped to it. Links keep their
    /// (now dangling) reference.
    pub fn delete_variable(&mut self, id: &VariableId) -> Result<Variable, WeftError> {
        let pos = self
            .variables
            .iter()
            .position(|v| &v.id == id)
            .ok_or_else(|| WeftError::VariableNotFound(id.clone()))?;
        self.input_roles.remove(id);
        self.output_roles.remove(id);
        Ok(self.variables.remove(pos))
    }

    /// Bind a data variable to data-object identifiers.
    pub fn set_data_binding(&mut self, id: &VariableId, value: Binding) -> Result<(), WeftError> {
        let var = self
            .variable_mut(id)
            .ok_or_else(|| WeftError::VariableNotFound(id.clone()))?;
        match &mut var.kind {
            VariableKind::Data { binding } => {
                *binding = Some(value);
                Ok(())
            }
            VariableKind::Parameter { .. } => Err(WeftError::BindingKindMismatch(id.clone())),
        }
    }

    /// Bind a parameter variable to literal values.
    pub fn set_parameter_binding(
        &mut self,
        id: &VariableId,
        value: ValueBinding,
    ) -> Result<(), WeftError> {
        let var = self
            .variable_mut(id)
            .ok_or_else(|| WeftError::VariableNotFound(id.clone()))?;
        match &mut var.kind {
            VariableKind::Parameter { binding } => {
                *binding = Some(value);
                Ok(())
            }
            VariableKind::Data { .. } => Err(WeftError::BindingKindMismatch(id.clone())),
        }
    }

    fn variables_of<'a>(&'a self, links: impl Iterator<Item = &'a Link>) -> Vec<&'a Variable> {
        let mut seen = BTreeSet::new();
        links
            .filter_map(|l| l.variable.as_ref())
            .filter(|vid| seen.insert(*vid))
            .filter_map(|vid| self.variable(vid))
            .collect()
    }

    /// Variables carried by pure input links.
    pub fn input_variables(&self) -> Vec<&Variable> {
        self.variables_of(self.links.iter().filter(|l| l.is_input_link()))
    }

    /// Variables carried by pure output links.
    pub fn output_variables(&self) -> Vec<&Variable> {
        self.variables_of(self.links.iter().filter(|l| l.is_output_link()))
    }

    /// Variables carried by links between two nodes.
    pub fn intermediate_variables(&self) -> Vec<&Variable> {
        self.variables_of(self.links.iter().filter(|l| l.is_inout_link()))
    }

    /// Variables carried by links landing on `node`.
    pub fn input_variables_of(&self, node: &NodeId) -> Vec<&Variable> {
        self.variables_of(self.node_input_links(node))
    }

    /// Variables carried by links leaving `node`.
    pub fn output_variables_of(&self, node: &NodeId) -> Vec<&Variable> {
        self.variables_of(self.node_output_links(node))
    }

    // =========================================================================
    // ROLES
    // =========================================================================

    pub fn input_roles(&self) -> &BTreeMap<VariableId, Role> {
        &self.input_roles
    }

    pub fn output_roles(&self) -> &BTreeMap<VariableId, Role> {
        &self.output_roles
    }

    #[must_use]
    pub fn input_role_for(&self, variable: &VariableId) -> Option<&Role> {
        self.input_roles.get(variable)
    }

    #[must_use]
    pub fn output_role_for(&self, variable: &VariableId) -> Option<&Role> {
        self.output_roles.get(variable)
    }

    pub fn add_input_role(&mut self, variable: VariableId, role: Role) {
        self.input_roles.insert(variable, role);
    }

    pub fn add_output_role(&mut self, variable: VariableId, role: Role) {
        self.output_roles.insert(variable, role);
    }

    pub fn delete_input_role(&mut self, variable: &VariableId) -> Option<Role> {
        self.input_roles.remove(variable)
    }

    pub fn delete_output_role(&mut self, variable: &VariableId) -> Option<Role> {
        self.output_roles.remove(variable)
    }

    /// Walk this template and every nested sub-template, depth-first.
    pub fn walk(&self, visit: &mut impl FnMut(&Self)) {
        visit(self);
        for node in &self.nodes {
            if let Some(sub) = node.component.template() {
                sub.walk(visit);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum LinkEnd {
    Origin,
    Destination,
}

impl fmt::Display for Template {
    /// `(CompA-CompB (var=binding) ...)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", node.component)?;
        }
        for var in &self.variables {
            match &var.kind {
                VariableKind::Data {
                    binding: Some(b), ..
                } => write!(f, " ({}={})", var.name(), b)?,
                VariableKind::Parameter {
                    binding: Some(b), ..
                } => write!(f, " ({}={})", var.name(), b)?,
                _ => {}
            }
        }
        f.write_str(")")
    }
}

// =============================================================================
// TESTS
// =============================================================================
