//! # Serialization Bridge
//!
//! Converts templates to and from the triple model of the knowledge store.
//!
//! ## Read path
//!
//! Nodes, then links, then roles; afterwards roles are reconciled and
//! default set-creation rules filled in. Documents below
//! [`EXPLICIT_PORTS_VERSION`](crate::primitives::EXPLICIT_PORTS_VERSION) name component parameters on links instead of
//! ports: ports are synthesized as `<linkns>op<N>` / `<linkns>ip<N>` and every
//! synthesized input port joins the node's cross product.
//!
//! ## Write path
//!
//! One resource per node, port, link, variable, role and rule, typed with the
//! workflow vocabulary. Every template written (nested ones included) is
//! stamped with [`LATEST_VERSION`]. Sub-templates whose document is imported
//! are referenced; all others are inlined once.
//!
//! The bridge holds no store state: each call works on the graph it is given.

use crate::binding::{Binding, BindingTree, ValueBinding};
use crate::constraints::ConstraintEngine;
use crate::graph::{Template, unique_id};
use crate::primitives::{
    COMPONENT_RULE_SUFFIX, LATEST_VERSION, LEGACY_INPUT_PORT_PREFIX, LEGACY_OUTPUT_PORT_PREFIX,
    MAX_TEMPLATE_DEPTH, METADATA_SUFFIX, PORT_ROLE_SUFFIX, PORT_RULE_SUFFIX,
};
use crate::sets::{
    ComponentSetCreationRule, PortSetCreationRule, SetExpression, SetOperator, SetType,
};
use crate::triples::{Triple, TripleGraph, Value, is_anonymous};
use crate::types::{
    ComponentRef, ComponentVariable, Link, LinkId, LinkKind, Literal, Metadata, Node, NodeId,
    Port, PortId, Role, Rules, Variable, VariableId, VariableKind, WeftError, local_name,
    namespace_of, url_of,
};
use crate::vocab::{Concept, Property, RDF_TYPE, RDFS_COMMENT, Vocabulary};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Reads and writes templates with one vocabulary.
#[derive(Debug, Clone, Default)]
pub struct TemplateBridge {
    vocab: Vocabulary,
}

impl TemplateBridge {
    #[must_use]
    pub fn new(vocab: Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Read the template `uri` from `graph`.
    ///
    /// If `uri` is not itself a template resource, the first template of the
    /// graph that no node references as a sub-workflow is read instead
    /// (preferring one in `uri`'s document).
    pub fn read(&self, graph: &TripleGraph, uri: &str) -> Result<Template, WeftError> {
        let root = self
            .root_template(graph, uri)
            .ok_or_else(|| WeftError::TemplateNotFound(uri.to_string()))?;
        let mut reader = Reader {
            vocab: &self.vocab,
            graph,
            cache: Vec::new(),
            in_progress: Vec::new(),
        };
        reader.read_template(&root, None)
    }

    fn root_template(&self, graph: &TripleGraph, uri: &str) -> Option<String> {
        let class = self.vocab.concept(Concept::WorkflowTemplate);
        if graph.is_a(uri, class) {
            return Some(uri.to_string());
        }
        let templates = graph.instances_of(class);
        let referenced: BTreeSet<&str> = templates
            .iter()
            .flat_map(|t| graph.resource_values(t, self.vocab.property(Property::HasNode)))
            .filter_map(|n| {
                graph
                    .property_value(n, self.vocab.property(Property::HasWorkflow))
                    .and_then(Value::as_resource)
            })
            .collect();
        let roots: Vec<&str> = templates
            .into_iter()
            .filter(|t| !referenced.contains(t))
            .collect();
        roots
            .iter()
            .find(|t| url_of(t) == url_of(uri))
            .or_else(|| roots.first())
            .map(|t| (*t).to_string())
    }

    /// Serialize `template` into a fresh graph.
    ///
    /// Roles are reconciled first and the template (with every nested one)
    /// is upgraded to the latest schema version.
    pub fn write(&self, template: &mut Template) -> TripleGraph {
        let mut graph = TripleGraph::new();
        self.write_into(&mut graph, template);
        graph
    }

    /// Serialize `template` into an existing graph.
    pub fn write_into(&self, graph: &mut TripleGraph, template: &mut Template) {
        prepare_for_write(template);
        let mut writer = Writer {
            vocab: &self.vocab,
            graph,
            written: BTreeSet::new(),
        };
        writer.write_template(template, false);
        debug!(
            template = template.id(),
            triples = writer.graph.len(),
            "wrote template"
        );
    }
}

fn prepare_for_write(template: &mut Template) {
    template.auto_update_template_roles();
    template.version = LATEST_VERSION;
    for node in &mut template.nodes {
        if let Some(sub) = node.component.template_mut() {
            prepare_for_write(sub);
        }
    }
}

// =============================================================================
// READ PATH
// =============================================================================

struct Reader<'a> {
    vocab: &'a Vocabulary,
    graph: &'a TripleGraph,
    cache: Vec<Template>,
    in_progress: Vec<String>,
}

impl<'a> Reader<'a> {
    fn p(&self, property: Property) -> &'a str {
        self.vocab.property(property)
    }

    fn c(&self, concept: Concept) -> &'a str {
        self.vocab.concept(concept)
    }

    fn resource(&self, subject: &str, property: Property) -> Option<&'a str> {
        self.graph
            .property_value(subject, self.p(property))
            .and_then(Value::as_resource)
    }

    fn text(&self, subject: &str, property: Property) -> Option<String> {
        self.graph
            .property_value(subject, self.p(property))
            .and_then(value_text)
            .map(str::to_string)
    }

    fn dimensionality(&self, subject: &str) -> u32 {
        self.graph
            .property_value(subject, self.p(Property::HasDimensionality))
            .and_then(Value::as_int)
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(0)
    }

    fn read_template(&mut self, id: &str, parent: Option<&str>) -> Result<Template, WeftError> {
        if let Some(done) = self.cache.iter().find(|t| t.id() == id) {
            return Ok(done.clone());
        }
        if self.in_progress.iter().any(|t| t == id) {
            return Err(WeftError::CyclicTemplate(id.to_string()));
        }
        if self.in_progress.len() >= MAX_TEMPLATE_DEPTH {
            return Err(WeftError::MalformedTemplate(format!(
                "sub-templates nested deeper than {MAX_TEMPLATE_DEPTH} at {id}"
            )));
        }

        self.in_progress.push(id.to_string());
        let result = self.read_template_body(id, parent);
        self.in_progress.pop();

        let template = result?;
        self.cache.push(template.clone());
        Ok(template)
    }

    fn read_template_body(&mut self, id: &str, parent: Option<&str>) -> Result<Template, WeftError> {
        let graph = self.graph;
        if !graph.is_a(id, self.c(Concept::WorkflowTemplate)) {
            return Err(WeftError::TemplateNotFound(id.to_string()));
        }
        let mut t = Template::new(id);
        t.parent = parent.map(str::to_string);
        t.version = graph
            .property_value(id, self.p(Property::HasVersion))
            .and_then(Value::as_int)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        let explicit_ports = self.vocab.supports(Property::HasInputPort, t.version);

        for node_id in graph.resource_values(id, self.p(Property::HasNode)) {
            let mut node = self.read_node(node_id, id)?;
            node.comment = graph.comment(node_id).map(str::to_string);
            if explicit_ports {
                self.read_ports_and_rules(node_id, &mut node, t.namespace());
            } else {
                node.set_component_rule(ComponentSetCreationRule::default());
                node.set_port_rule(PortSetCreationRule::default());
            }
            t.nodes.push(node);
        }

        for link_id in graph.resource_values(id, self.p(Property::HasLink)) {
            self.read_link(link_id, &mut t, explicit_ports);
        }

        self.read_roles(id, &mut t);
        t.auto_update_template_roles();
        t.fill_in_default_set_creation_rules();

        t.metadata = self.read_metadata(id);
        t.rules = Rules {
            text: self.text(id, Property::HasRules),
        };
        t.imports = graph
            .imports_of(url_of(id))
            .into_iter()
            .filter(|u| *u != self.vocab.ontology_url())
            .map(str::to_string)
            .collect();
        self.read_constraints(&mut t);

        debug!(
            template = id,
            version = t.version,
            nodes = t.nodes.len(),
            links = t.links.len(),
            "read template"
        );
        Ok(t)
    }

    fn read_node(&mut self, node_id: &str, template_id: &str) -> Result<Node, WeftError> {
        if let Some(comp) = self.resource(node_id, Property::HasComponent) {
            let mut cv = ComponentVariable::component(comp);
            // Per-node state lives on the node; older documents put it on
            // the shared component resource.
            let graph = self.graph;
            let state = move |predicate: &str| {
                graph
                    .property_value(node_id, predicate)
                    .or_else(|| graph.property_value(comp, predicate))
            };
            let concrete = state(self.p(Property::IsConcrete)).and_then(Value::as_bool);
            cv.set_concrete(concrete == Some(true));

            if let Some(value) = state(self.p(Property::HasComponentBinding)) {
                if let Some(b) = read_binding(value) {
                    cv.set_binding(b);
                }
            } else {
                // Legacy: the component binding is asserted as a type.
                for class in self.graph.classes_of(comp) {
                    if namespace_of(class) != self.vocab.namespace() {
                        cv.set_binding(BindingTree::leaf(class.to_string()));
                    }
                }
            }
            return Ok(Node::new(node_id, cv));
        }

        if let Some(workflow) = self.resource(node_id, Property::HasWorkflow) {
            let sub = self.read_template(workflow, Some(template_id))?;
            return Ok(Node::new(node_id, ComponentVariable::workflow(sub)));
        }

        Err(WeftError::MalformedTemplate(format!(
            "node {node_id} has neither a component nor a workflow"
        )))
    }

    fn read_ports_and_rules(&self, node_id: &str, node: &mut Node, ns: &str) {
        let graph = self.graph;
        for port in graph.resource_values(node_id, self.p(Property::HasInputPort)) {
            node.add_input_port(self.read_port(port, ns));
        }
        for port in graph.resource_values(node_id, self.p(Property::HasOutputPort)) {
            node.add_output_port(self.read_port(port, ns));
        }

        if let Some(crule) = self.resource(node_id, Property::HasComponentSetCreationRule) {
            if let Some(set_type) = self.read_set_type(crule) {
                node.set_component_rule(ComponentSetCreationRule::new(set_type));
            }
        }
        if let Some(prule) = self.resource(node_id, Property::HasPortSetCreationRule) {
            if let Some(set_type) = self.read_set_type(prule) {
                let expression = self
                    .resource(prule, Property::CreateSetsOn)
                    .and_then(|e| self.read_expression(e, node, 0))
                    .unwrap_or_else(|| SetExpression::set(SetOperator::XProduct));
                node.set_port_rule(PortSetCreationRule::new(set_type, expression));
            }
        }
    }

    /// `createWorkflowSets` wins when both flags are set.
    fn read_set_type(&self, rule: &str) -> Option<SetType> {
        let flag = |p: Property| {
            self.graph
                .property_value(rule, self.p(p))
                .and_then(Value::as_bool)
                == Some(true)
        };
        if flag(Property::CreateWorkflowSets) {
            Some(SetType::WType)
        } else if flag(Property::CreateComponentSets) {
            Some(SetType::SType)
        } else {
            None
        }
    }

    fn read_expression(&self, id: &str, node: &Node, depth: usize) -> Option<SetExpression> {
        if depth > MAX_TEMPLATE_DEPTH {
            warn!(expression = id, "set expression nested too deep; truncated");
            return None;
        }
        let concept = self
            .graph
            .classes_of(id)
            .into_iter()
            .find_map(|c| self.vocab.concept_of(c))?;
        let operator = match concept {
            Concept::XProduct => SetOperator::XProduct,
            Concept::NWise => SetOperator::NWise,
            Concept::IncreaseDimensionality => SetOperator::IncreaseDimensionality,
            Concept::ReduceDimensionality => SetOperator::ReduceDimensionality,
            Concept::Shift => SetOperator::Shift,
            Concept::Port => {
                let port = node.find_input_port(&PortId::new(id));
                if port.is_none() {
                    warn!(node = %node.id, port = id, "expression names a port the node lacks");
                }
                return port.map(|p| SetExpression::leaf(SetOperator::XProduct, p.id.clone()));
            }
            _ => return None,
        };
        let children = self
            .graph
            .resource_values(id, self.p(Property::HasExpressionArgument))
            .into_iter()
            .filter_map(|arg| self.read_expression(arg, node, depth + 1))
            .collect();
        Some(SetExpression::with_children(operator, children))
    }

    /// Roles outside the template namespace come from the component catalog:
    /// their local name becomes the role id and the role is re-identified as
    /// `<port>_role`.
    fn read_port(&self, port_id: &str, ns: &str) -> Port {
        let mut port = Port::new(port_id);
        if let Some(role_obj) = self.resource(port_id, Property::SatisfiesRole) {
            let mut role = Role::new(role_obj).with_dimensionality(self.dimensionality(role_obj));
            if namespace_of(role_obj) != ns {
                role.role_id = Some(local_name(role_obj).to_string());
                role.id = format!("{port_id}{PORT_ROLE_SUFFIX}");
            } else {
                role.role_id = self.text(role_obj, Property::HasRoleId);
            }
            port.role = Some(role);
        }
        port
    }

    fn read_link(&self, link_id: &str, t: &mut Template, explicit_ports: bool) {
        let endpoint = |p: Property| {
            self.resource(link_id, p)
                .map(NodeId::new)
                .filter(|n| t.node(n).is_some())
        };
        let from_node = endpoint(Property::HasOriginNode);
        let to_node = endpoint(Property::HasDestinationNode);

        let ns = t.namespace().to_string();
        let (from_port, to_port) = if explicit_ports {
            let from_port = from_node
                .as_ref()
                .zip(self.resource(link_id, Property::HasOriginPort))
                .and_then(|(n, pid)| {
                    let node = t.node_mut(n)?;
                    let pid = PortId::new(pid);
                    if node.find_output_port(&pid).is_none() {
                        node.add_output_port(self.read_port(pid.as_str(), &ns));
                    }
                    Some(pid)
                });
            let to_port = to_node
                .as_ref()
                .zip(self.resource(link_id, Property::HasDestinationPort))
                .and_then(|(n, pid)| {
                    let node = t.node_mut(n)?;
                    let pid = PortId::new(pid);
                    if node.find_input_port(&pid).is_none() {
                        node.add_input_port(self.read_port(pid.as_str(), &ns));
                    }
                    Some(pid)
                });
            (from_port, to_port)
        } else {
            let link_ns = namespace_of(link_id);
            let from_port = from_node
                .as_ref()
                .zip(self.resource(link_id, Property::HasOriginParameter))
                .and_then(|(n, param)| {
                    let node = t.node_mut(n)?;
                    let pid = PortId::new(format!(
                        "{link_ns}{LEGACY_OUTPUT_PORT_PREFIX}{}",
                        node.output_ports().len()
                    ));
                    node.add_output_port(Port::new(pid.clone()).with_role(Role::new(param)));
                    Some(pid)
                });
            let to_port = to_node
                .as_ref()
                .zip(self.resource(link_id, Property::HasDestinationParameter))
                .and_then(|(n, param)| {
                    let node = t.node_mut(n)?;
                    let pid = PortId::new(format!(
                        "{link_ns}{LEGACY_INPUT_PORT_PREFIX}{}",
                        node.input_ports().len()
                    ));
                    node.add_input_port(Port::new(pid.clone()).with_role(Role::new(param)));
                    if let Some(rule) = node.port_rule_mut() {
                        rule.expression
                            .push(SetExpression::leaf(SetOperator::XProduct, pid.clone()));
                    }
                    Some(pid)
                });
            (from_port, to_port)
        };

        let id = if is_anonymous(link_id) {
            let base = t.create_link_id(from_port.as_ref(), to_port.as_ref());
            LinkId::new(unique_id(&base, |c| {
                t.links.iter().any(|l| l.id.as_str() == c)
            }))
        } else {
            LinkId::new(link_id)
        };

        let variable = match self.resource(link_id, Property::HasVariable) {
            None => {
                warn!(link = %id, "link carries no variable");
                None
            }
            Some(var_obj) => self.register_variable(var_obj, t),
        };

        t.links.push(Link {
            id,
            from_node,
            from_port,
            to_node,
            to_port,
            variable,
        });
    }

    fn register_variable(&self, var_obj: &str, t: &mut Template) -> Option<VariableId> {
        let vid = VariableId::new(var_obj);
        if t.variable(&vid).is_none() {
            let kind = if self.graph.is_a(var_obj, self.c(Concept::DataVariable)) {
                VariableKind::Data {
                    binding: self
                        .graph
                        .property_value(var_obj, self.p(Property::HasDataBinding))
                        .and_then(read_binding),
                }
            } else if self.graph.is_a(var_obj, self.c(Concept::ParameterVariable)) {
                VariableKind::Parameter {
                    binding: self
                        .graph
                        .property_value(var_obj, self.p(Property::HasParameterValue))
                        .map(read_value_binding),
                }
            } else {
                warn!(variable = var_obj, "variable is neither data nor parameter; dropped");
                return None;
            };
            t.variables.push(Variable {
                id: vid.clone(),
                kind,
                comment: None,
            });
        }
        if let Some(comment) = self.graph.comment(var_obj) {
            if let Some(var) = t.variable_mut(&vid) {
                var.comment = Some(comment.to_string());
            }
        }
        Some(vid)
    }

    fn read_roles(&self, id: &str, t: &mut Template) {
        for (property, output) in [(Property::HasInputRole, false), (Property::HasOutputRole, true)] {
            for role_obj in self.graph.resource_values(id, self.p(property)) {
                let Some(var) = self.resource(role_obj, Property::MapsToVariable) else {
                    warn!(role = role_obj, "role not mapped to any variable; skipped");
                    continue;
                };
                let mut role = Role::new(role_obj)
                    .with_role_id(local_name(role_obj))
                    .with_dimensionality(self.dimensionality(role_obj));
                if let Some(role_id) = self.text(role_obj, Property::HasRoleId) {
                    role.role_id = Some(role_id);
                }
                let var = VariableId::new(var);
                if output {
                    t.output_roles.insert(var, role);
                } else {
                    t.input_roles.insert(var, role);
                }
            }
        }
    }

    fn read_metadata(&self, id: &str) -> Metadata {
        let Some(meta) = self.resource(id, Property::HasMetadata) else {
            return Metadata::default();
        };
        let texts = |p: Property| {
            let mut out: Vec<String> = Vec::new();
            for value in self.graph.property_values(meta, self.p(p)) {
                if let Some(text) = value_text(value) {
                    if !out.iter().any(|o| o == text) {
                        out.push(text.to_string());
                    }
                }
            }
            out
        };
        Metadata {
            documentation: self.text(meta, Property::HasDocumentation),
            contributors: texts(Property::HasContributor),
            created_from: texts(Property::CreatedFrom),
            last_update_time: self.text(meta, Property::LastUpdateTime),
        }
    }

    /// Triples about a variable outside the workflow vocabulary are its
    /// constraints.
    fn read_constraints(&self, t: &mut Template) {
        let mut triples = Vec::new();
        for var in &t.variables {
            for (predicate, object) in self.graph.properties(var.id.as_str()) {
                if predicate == RDF_TYPE
                    || predicate == RDFS_COMMENT
                    || namespace_of(predicate) == self.vocab.namespace()
                {
                    continue;
                }
                triples.push(Triple::new(var.id.as_str(), predicate.clone(), object.clone()));
            }
        }
        t.constraints.add_constraints(triples);
    }
}

fn value_text(value: &Value) -> Option<&str> {
    match value {
        Value::Literal(lit) => Some(&lit.value),
        Value::Resource(id) => Some(id),
        Value::List(_) => None,
    }
}

fn read_binding(value: &Value) -> Option<Binding> {
    match value {
        Value::Resource(id) => Some(BindingTree::leaf(id.clone())),
        Value::Literal(lit) => Some(BindingTree::leaf(lit.value.clone())),
        Value::List(items) => Some(BindingTree::set(
            items.iter().filter_map(read_binding).collect(),
        )),
    }
}

fn read_value_binding(value: &Value) -> ValueBinding {
    match value {
        Value::Literal(lit) => BindingTree::leaf(lit.clone()),
        Value::Resource(id) => BindingTree::leaf(Literal::plain(id.clone())),
        Value::List(items) => BindingTree::set(items.iter().map(read_value_binding).collect()),
    }
}

// =============================================================================
// WRITE PATH
// =============================================================================

struct Writer<'a> {
    vocab: &'a Vocabulary,
    graph: &'a mut TripleGraph,
    written: BTreeSet<String>,
}

impl Writer<'_> {
    fn add(&mut self, subject: &str, property: Property, object: Value) {
        let predicate = self.vocab.property(property).to_string();
        self.graph.add_property_value(subject, &predicate, object);
    }

    fn set(&mut self, subject: &str, property: Property, object: Value) {
        let predicate = self.vocab.property(property).to_string();
        self.graph.set_property_value(subject, &predicate, object);
    }

    fn typed(&mut self, id: &str, concept: Concept) {
        let class = self.vocab.concept(concept).to_string();
        self.graph.create_object_of_class(id, &class);
    }

    fn write_template(&mut self, t: &Template, subtemplate: bool) {
        if !self.written.insert(t.id().to_string()) {
            return;
        }
        let tid = t.id();
        if !subtemplate {
            let ontology = self.vocab.ontology_url().to_string();
            self.graph.create_import(t.url(), &ontology);
        }
        self.typed(tid, Concept::WorkflowTemplate);

        for node in &t.nodes {
            self.write_node(t, node);
        }
        for var in &t.variables {
            self.write_variable(var);
        }
        for link in &t.links {
            self.write_link(tid, link);
        }
        self.write_roles(t);

        self.set(tid, Property::HasVersion, Literal::int(i64::from(LATEST_VERSION)).into());
        self.write_metadata(t);
        if let Some(text) = &t.rules.text {
            self.set(tid, Property::HasRules, Literal::string(text.clone()).into());
        }

        let var_ids: Vec<VariableId> = t.variables.iter().map(|v| v.id.clone()).collect();
        self.graph.add_triples(t.constraints.get_constraints(&var_ids));
    }

    fn write_node(&mut self, t: &Template, node: &Node) {
        let nid = node.id.as_str();
        self.typed(nid, Concept::Node);
        self.add(t.id(), Property::HasNode, Value::resource(nid));

        let component = &node.component;
        match &component.kind {
            ComponentRef::Component { binding, concrete } => {
                let cid = component.id.as_str();
                self.typed(cid, Concept::ComponentVariable);
                self.add(nid, Property::HasComponent, Value::resource(cid));
                if *concrete {
                    self.add(nid, Property::IsConcrete, Literal::boolean(true).into());
                }
                if let Some(b) = binding {
                    self.add(nid, Property::HasComponentBinding, write_binding(b));
                }
            }
            ComponentRef::Workflow(sub) => {
                self.add(nid, Property::HasWorkflow, Value::resource(sub.id()));
                if t.imports.contains(sub.url()) {
                    self.graph.create_import(t.url(), sub.url());
                } else {
                    self.write_template(sub, true);
                }
            }
        }

        if let Some(comment) = &node.comment {
            self.graph.set_comment(nid, comment);
        }

        for port in node.input_ports() {
            self.write_port(port);
            self.add(nid, Property::HasInputPort, Value::resource(port.id.as_str()));
        }
        for port in node.output_ports() {
            self.write_port(port);
            self.add(nid, Property::HasOutputPort, Value::resource(port.id.as_str()));
        }

        if let Some(rule) = node.component_rule() {
            let rid = format!("{nid}{COMPONENT_RULE_SUFFIX}");
            self.typed(&rid, Concept::ComponentSetRule);
            self.write_set_type(&rid, rule.set_type);
            self.add(&rid, Property::CreateSetsOn, Value::resource(component.id.as_str()));
            self.add(nid, Property::HasComponentSetCreationRule, Value::resource(rid.as_str()));
        }
        if let Some(rule) = node.port_rule() {
            let rid = format!("{nid}{PORT_RULE_SUFFIX}");
            self.typed(&rid, Concept::PortSetRule);
            self.write_set_type(&rid, rule.set_type);
            let mut counter = 0;
            let expr = self.write_expression(&rid, &rule.expression, &mut counter);
            self.add(&rid, Property::CreateSetsOn, Value::resource(expr));
            self.add(nid, Property::HasPortSetCreationRule, Value::resource(rid.as_str()));
        }
    }

    fn write_set_type(&mut self, rule: &str, set_type: SetType) {
        let flag = match set_type {
            SetType::SType => Property::CreateComponentSets,
            SetType::WType => Property::CreateWorkflowSets,
        };
        self.add(rule, flag, Literal::boolean(true).into());
    }

    /// Set nodes get ids `<rule>_<tag><n>` in depth-first order; leaves are
    /// the port resources themselves.
    fn write_expression(&mut self, rule: &str, expr: &SetExpression, counter: &mut u32) -> String {
        match expr {
            SetExpression::Leaf { port, .. } => port.as_str().to_string(),
            SetExpression::Set { operator, children } => {
                let id = format!("{rule}_{}{}", operator.tag(), counter);
                *counter += 1;
                self.typed(&id, operator_concept(*operator));
                for child in children {
                    let child_id = self.write_expression(rule, child, counter);
                    self.add(&id, Property::HasExpressionArgument, Value::resource(child_id));
                }
                id
            }
        }
    }

    fn write_port(&mut self, port: &Port) {
        let pid = port.id.as_str();
        self.typed(pid, Concept::Port);
        if let Some(role) = &port.role {
            self.write_role_fields(role);
            self.add(pid, Property::SatisfiesRole, Value::resource(role.id.as_str()));
        }
    }

    fn write_role_fields(&mut self, role: &Role) {
        let dim = Literal::int(i64::from(role.dimensionality));
        self.set(&role.id, Property::HasDimensionality, dim.into());
        if let Some(role_id) = &role.role_id {
            self.set(&role.id, Property::HasRoleId, Literal::string(role_id.clone()).into());
        }
    }

    fn write_variable(&mut self, var: &Variable) {
        let vid = var.id.as_str();
        match &var.kind {
            VariableKind::Data { binding } => {
                self.typed(vid, Concept::DataVariable);
                if let Some(b) = binding {
                    self.add(vid, Property::HasDataBinding, write_binding(b));
                }
            }
            VariableKind::Parameter { binding } => {
                self.typed(vid, Concept::ParameterVariable);
                if let Some(b) = binding {
                    self.add(vid, Property::HasParameterValue, write_value_binding(b));
                }
            }
        }
        if let Some(comment) = &var.comment {
            self.graph.set_comment(vid, comment);
        }
    }

    fn write_link(&mut self, tid: &str, link: &Link) {
        let concept = match link.kind() {
            Some(LinkKind::Input) => Concept::InputLink,
            Some(LinkKind::Output) => Concept::OutputLink,
            Some(LinkKind::InOut) => Concept::InOutLink,
            None => {
                warn!(link = %link.id, "link without endpoints not written");
                return;
            }
        };
        let lid = link.id.as_str();
        self.typed(lid, concept);
        self.add(tid, Property::HasLink, Value::resource(lid));

        let refs = [
            (Property::HasOriginNode, link.from_node.as_ref().map(NodeId::as_str)),
            (Property::HasOriginPort, link.from_port.as_ref().map(PortId::as_str)),
            (Property::HasDestinationNode, link.to_node.as_ref().map(NodeId::as_str)),
            (Property::HasDestinationPort, link.to_port.as_ref().map(PortId::as_str)),
            (Property::HasVariable, link.variable.as_ref().map(VariableId::as_str)),
        ];
        for (property, target) in refs {
            if let Some(target) = target {
                self.add(lid, property, Value::resource(target));
            }
        }
    }

    fn write_roles(&mut self, t: &Template) {
        let roles = t
            .input_roles
            .iter()
            .map(|r| (Property::HasInputRole, r))
            .chain(t.output_roles.iter().map(|r| (Property::HasOutputRole, r)));
        for (property, (var, role)) in roles {
            self.typed(&role.id, Concept::Role);
            self.add(t.id(), property, Value::resource(role.id.as_str()));
            self.set(&role.id, Property::MapsToVariable, Value::resource(var.as_str()));
            self.write_role_fields(role);
        }
    }

    fn write_metadata(&mut self, t: &Template) {
        let meta = &t.metadata;
        let mid = format!("{}{METADATA_SUFFIX}", t.id());
        self.typed(&mid, Concept::Metadata);
        self.set(t.id(), Property::HasMetadata, Value::resource(mid.as_str()));

        if let Some(time) = &meta.last_update_time {
            self.set(&mid, Property::LastUpdateTime, Literal::date_time(time.clone()).into());
        }
        if let Some(doc) = &meta.documentation {
            self.set(&mid, Property::HasDocumentation, Literal::string(doc.clone()).into());
        }
        for source in &meta.created_from {
            self.add(&mid, Property::CreatedFrom, Literal::string(source.clone()).into());
        }
        for contributor in &meta.contributors {
            self.add(&mid, Property::HasContributor, Literal::string(contributor.clone()).into());
        }
    }
}

fn operator_concept(operator: SetOperator) -> Concept {
    match operator {
        SetOperator::XProduct => Concept::XProduct,
        SetOperator::NWise => Concept::NWise,
        SetOperator::IncreaseDimensionality => Concept::IncreaseDimensionality,
        SetOperator::ReduceDimensionality => Concept::ReduceDimensionality,
        SetOperator::Shift => Concept::Shift,
    }
}

fn write_binding(binding: &Binding) -> Value {
    match binding {
        BindingTree::Value(id) => Value::resource(id.clone()),
        BindingTree::Set(children) => Value::List(children.iter().map(write_binding).collect()),
    }
}

fn write_value_binding(binding: &ValueBinding) -> Value {
    match binding {
        BindingTree::Value(lit) => Value::Literal(lit.clone()),
        BindingTree::Set(children) => {
            Value::List(children.iter().map(write_value_binding).collect())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariableType;

    const NS: &str = "http://ex.org/wf/T.owl#";

    fn id(name: &str) -> String {
        format!("{NS}{name}")
    }

    fn bridge() -> TemplateBridge {
        TemplateBridge::new(Vocabulary::new("http://ex.org/onto/workflow.owl"))
    }

    /// input -> A -> B -> output, with bindings, comments and a custom rule.
    fn pipeline() -> Template {
        let mut t = Template::new(id("T"));
        let a = t.add_node(
            ComponentVariable::component("http://ex.org/lib.owl#Align")
                .with_binding(BindingTree::leaf("http://ex.org/lib.owl#BwaAlign".to_string())),
        );
        let b = t.add_node(ComponentVariable::component("http://ex.org/lib.owl#Sort"));
        t.node_mut(&a).expect("A").comment = Some("x=10.0 y=20.0".to_string());

        let reads = Variable::data(id("reads"));
        let param = Variable::parameter(id("threads"));
        t.add_link(None, Some(&a), None, Some(Port::new(id("a_in"))), Some(reads))
            .expect("input");
        t.add_link(None, Some(&a), None, Some(Port::new(id("a_threads"))), Some(param))
            .expect("param");
        t.add_link(
            Some(&a),
            Some(&b),
            Some(Port::new(id("a_out"))),
            Some(
                Port::new(id("b_in")).with_role(
                    Role::new(id("b_in_role"))
                        .with_role_id("bam")
                        .with_dimensionality(1),
                ),
            ),
            Some(Variable::data(id("aligned"))),
        )
        .expect("inout");
        t.add_link(Some(&b), None, Some(Port::new(id("b_out"))), None, Some(Variable::data(id("sorted"))))
            .expect("output");

        t.set_parameter_binding(
            &VariableId::new(id("threads")),
            BindingTree::leaf(Literal::int(4)),
        )
        .expect("bind threads");
        t.set_data_binding(
            &VariableId::new(id("reads")),
            BindingTree::set(vec![
                BindingTree::leaf(id("r1")),
                BindingTree::leaf(id("r2")),
            ]),
        )
        .expect("bind reads");

        t.node_mut(&a).expect("A").set_port_rule(PortSetCreationRule::new(
            SetType::SType,
            SetExpression::with_children(
                SetOperator::NWise,
                vec![
                    SetExpression::leaf(SetOperator::XProduct, id("a_in")),
                    SetExpression::leaf(SetOperator::XProduct, id("a_threads")),
                ],
            ),
        ));
        t.set_rules(Rules::new("[invalid: (?t wflow:hasNode ?n) -> ]"));
        t.metadata_mut().documentation = Some("align and sort".to_string());
        t.metadata_mut().contributors = vec!["ada".to_string()];
        t.fill_in_default_set_creation_rules();
        t
    }

    fn sorted_variables(t: &Template) -> Vec<Variable> {
        let mut vars = t.variables().to_vec();
        vars.sort_by(|a, b| a.id.cmp(&b.id));
        vars
    }

    #[test]
    fn round_trip_preserves_structure() {
        let bridge = bridge();
        let mut t = pipeline();
        let graph = bridge.write(&mut t);
        let back = bridge.read(&graph, t.id()).expect("read back");

        assert_eq!(back.id(), t.id());
        assert_eq!(back.version(), LATEST_VERSION);
        assert_eq!(back.nodes(), t.nodes());
        assert_eq!(back.links(), t.links());
        assert_eq!(sorted_variables(&back), sorted_variables(&t));
        assert_eq!(back.input_roles(), t.input_roles());
        assert_eq!(back.output_roles(), t.output_roles());
        assert_eq!(back.metadata(), t.metadata());
        assert_eq!(back.rules(), t.rules());
    }

    #[test]
    fn shared_component_keeps_per_node_state() {
        let bridge = bridge();
        let lib = "http://ex.org/lib.owl#";
        let mut t = Template::new(id("T"));
        let first = t.add_node(
            ComponentVariable::component(format!("{lib}Align"))
                .with_binding(BindingTree::leaf(format!("{lib}Bwa"))),
        );
        let mut concrete = ComponentVariable::component(format!("{lib}Align"))
            .with_binding(BindingTree::leaf(format!("{lib}Bowtie")));
        concrete.set_concrete(true);
        let second = t.add_node(concrete);
        assert_eq!(second.as_str(), id("AlignNode_1"));
        t.fill_in_default_set_creation_rules();

        let graph = bridge.write(&mut t);
        let back = bridge.read(&graph, t.id()).expect("read back");

        assert_eq!(back.nodes(), t.nodes());
        let binding = |n: &NodeId| {
            back.node(n)
                .and_then(|n| n.component.binding())
                .and_then(|b| b.value())
                .cloned()
        };
        assert_eq!(binding(&first), Some(format!("{lib}Bwa")));
        assert_eq!(binding(&second), Some(format!("{lib}Bowtie")));
        assert!(!back.node(&first).expect("first").component.is_concrete());
    }

    #[test]
    fn component_state_on_component_resource_still_read() {
        let bridge = bridge();
        let vocab = bridge.vocabulary();
        let comp = "http://ex.org/lib.owl#Align";
        let mut t = Template::new(id("T"));
        t.add_node(ComponentVariable::component(comp));
        let mut graph = bridge.write(&mut t);
        graph.add_property_value(
            comp,
            vocab.property(Property::HasComponentBinding),
            Value::resource("http://ex.org/lib.owl#Bwa"),
        );
        graph.add_property_value(
            comp,
            vocab.property(Property::IsConcrete),
            Literal::boolean(true).into(),
        );

        let back = bridge.read(&graph, t.id()).expect("read back");
        let cv = &back.nodes()[0].component;
        assert!(cv.is_concrete());
        assert_eq!(
            cv.binding().and_then(|b| b.value()).map(String::as_str),
            Some("http://ex.org/lib.owl#Bwa")
        );
    }

    #[test]
    fn write_stamps_latest_version() {
        let bridge = bridge();
        let mut t = pipeline();
        t.version = 0;
        let graph = bridge.write(&mut t);

        let vocab = bridge.vocabulary();
        let version = graph
            .property_value(t.id(), vocab.property(Property::HasVersion))
            .and_then(Value::as_int);
        assert_eq!(version, Some(i64::from(LATEST_VERSION)));
        assert_eq!(t.version(), LATEST_VERSION);
    }

    #[test]
    fn write_links_by_kind() {
        let bridge = bridge();
        let mut t = pipeline();
        let graph = bridge.write(&mut t);
        let vocab = bridge.vocabulary();

        assert_eq!(graph.instances_of(vocab.concept(Concept::InputLink)).len(), 2);
        assert_eq!(graph.instances_of(vocab.concept(Concept::InOutLink)).len(), 1);
        assert_eq!(graph.instances_of(vocab.concept(Concept::OutputLink)).len(), 1);
        assert!(graph.imports_of("http://ex.org/wf/T.owl").contains("http://ex.org/onto/workflow.owl"));
    }

    #[test]
    fn read_unknown_uri_fails() {
        let bridge = bridge();
        let err = bridge.read(&TripleGraph::new(), &id("T"));
        assert!(matches!(err, Err(WeftError::TemplateNotFound(_))));
    }

    #[test]
    fn read_by_document_url_finds_root() {
        let bridge = bridge();
        let mut t = pipeline();
        let graph = bridge.write(&mut t);
        let back = bridge.read(&graph, "http://ex.org/wf/T.owl").expect("root by url");
        assert_eq!(back.id(), t.id());
    }

    #[test]
    fn unmapped_role_skipped() {
        let bridge = bridge();
        let vocab = bridge.vocabulary().clone();
        let mut t = pipeline();
        let mut graph = bridge.write(&mut t);
        graph.create_object_of_class(&id("stray_role"), vocab.concept(Concept::Role));
        graph.add_property_value(
            t.id(),
            vocab.property(Property::HasInputRole),
            Value::resource(id("stray_role")),
        );

        let back = bridge.read(&graph, t.id()).expect("read");
        assert!(back.input_roles().values().all(|r| r.id != id("stray_role")));
    }

    #[test]
    fn foreign_port_roles_renamed() {
        let bridge = bridge();
        let mut t = Template::new(id("T"));
        let a = t.add_node(ComponentVariable::component("http://ex.org/lib.owl#A"));
        let port = Port::new(id("p")).with_role(Role::new("http://ex.org/lib.owl#Reads"));
        t.add_link(None, Some(&a), None, Some(port), Some(Variable::data(id("v"))))
            .expect("link");
        let graph = bridge.write(&mut t);

        let back = bridge.read(&graph, t.id()).expect("read");
        let role = back
            .node(&a)
            .and_then(|n| n.find_input_port(&PortId::new(id("p"))))
            .and_then(|p| p.role.clone())
            .expect("role");
        assert_eq!(role.id, id("p_role"));
        assert_eq!(role.role_id.as_deref(), Some("Reads"));
    }

    #[test]
    fn anonymous_link_gets_synthesized_id() {
        let bridge = bridge();
        let vocab = bridge.vocabulary().clone();
        let mut t = Template::new(id("T"));
        let a = t.add_node(ComponentVariable::component("http://ex.org/lib.owl#A"));
        t.add_link(None, Some(&a), None, Some(Port::new(id("in"))), Some(Variable::data(id("v"))))
            .expect("link");
        let mut graph = bridge.write(&mut t);
        graph.rename_namespace(&id("Input_To_in"), "_:b0");

        let back = bridge.read(&graph, t.id()).expect("read");
        assert_eq!(back.links()[0].id.as_str(), id("Input_To_in"));
        assert!(graph.is_a("_:b0", vocab.concept(Concept::InputLink)));
    }

    #[test]
    fn constraints_round_trip() {
        let bridge = bridge();
        let mut t = pipeline();
        t.constraints_mut().add_constraints(vec![Triple::new(
            id("reads"),
            "http://ex.org/dc.owl#hasFormat",
            Value::resource("http://ex.org/dc.owl#Fastq"),
        )]);
        let graph = bridge.write(&mut t);
        let back = bridge.read(&graph, t.id()).expect("read");

        let found = back.constraints().constraints_for(&VariableId::new(id("reads")));
        assert_eq!(found.len(), 1);
        assert!(back.constraints().constraints_for(&VariableId::new(id("sorted"))).is_empty());
    }

    #[test]
    fn unknown_variable_kind_dropped() {
        let bridge = bridge();
        let mut t = Template::new(id("T"));
        let a = t.add_node(ComponentVariable::component("http://ex.org/lib.owl#A"));
        let v = t.add_variable(&id("v"), VariableType::Data);
        let var = t.variable(&v).cloned();
        t.add_link(None, Some(&a), None, Some(Port::new(id("in"))), var)
            .expect("link");
        let mut graph = bridge.write(&mut t);
        graph.remove_property(v.as_str(), RDF_TYPE);

        let back = bridge.read(&graph, t.id()).expect("read");
        assert!(back.variables().is_empty());
        assert!(back.links()[0].variable.is_none());
    }
}
