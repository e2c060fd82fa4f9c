//! # Template Copy
//!
//! Deep copies that share nothing with their source. Node and link ids are
//! preserved; variables, rules and expressions are rebuilt.

use crate::constraints::ConstraintEngine;
use crate::graph::Template;
use crate::sets::{ComponentSetCreationRule, PortSetCreationRule, SetExpression};
use crate::types::{ComponentRef, ComponentVariable, Link, Metadata, Node, Variable, VariableId};

impl Template {
    /// Create an independent copy of this template.
    ///
    /// - same id, rules text and imports
    /// - metadata keeps documentation and contributors; `created_from` is
    ///   reset to this template's id
    /// - sub-templates are copied recursively
    /// - port-rule leaves are resolved against the copied node's input ports
    /// - every link is copied, variable-less ones included
    /// - constraints of the copied variables come along
    #[must_use]
    pub fn create_copy(&self) -> Template {
        let mut copy = Template::new(self.id.clone());
        copy.version = self.version;
        copy.rules = self.rules.clone();
        copy.imports = self.imports.clone();
        copy.created_from = Some(self.id.clone());
        copy.metadata = Metadata {
            documentation: self.metadata.documentation.clone(),
            contributors: self.metadata.contributors.clone(),
            created_from: vec![self.id.clone()],
            last_update_time: None,
        };

        for node in &self.nodes {
            copy.nodes.push(copy_node(node, &self.id));
        }

        let mut copied_vars: Vec<VariableId> = Vec::new();
        for link in &self.links {
            if let Some(var) = link.variable.as_ref().and_then(|v| self.variable(v)) {
                if copy.variable(&var.id).is_none() {
                    copy.variables.push(Variable {
                        id: var.id.clone(),
                        kind: var.kind.clone(),
                        comment: var.comment.clone(),
                    });
                    copied_vars.push(var.id.clone());
                }
            }
            copy.links.push(Link {
                id: link.id.clone(),
                from_node: link.from_node.clone(),
                from_port: link.from_port.clone(),
                to_node: link.to_node.clone(),
                to_port: link.to_port.clone(),
                variable: link.variable.clone(),
            });
        }

        copy.input_roles = self.input_roles.clone();
        copy.output_roles = self.output_roles.clone();

        let constraints = self.constraints.get_constraints(&copied_vars);
        copy.constraints.add_constraints(constraints);
        copy
    }
}

fn copy_node(node: &Node, parent_id: &str) -> Node {
    let component = match &node.component.kind {
        ComponentRef::Component { binding, concrete } => ComponentVariable {
            id: node.component.id.clone(),
            kind: ComponentRef::Component {
                binding: binding.clone(),
                concrete: *concrete,
            },
        },
        ComponentRef::Workflow(sub) => {
            let mut sub_copy = sub.create_copy();
            sub_copy.parent = Some(parent_id.to_string());
            ComponentVariable::workflow(sub_copy)
        }
    };

    let mut copy = Node::new(node.id.clone(), component);
    copy.comment = node.comment.clone();
    for port in node.input_ports() {
        copy.add_input_port(port.clone());
    }
    for port in node.output_ports() {
        copy.add_output_port(port.clone());
    }

    if let Some(rule) = node.component_rule() {
        copy.set_component_rule(ComponentSetCreationRule::new(rule.set_type));
    }
    if let Some(rule) = node.port_rule() {
        let expression = rule
            .expression
            .remap(&|p| copy.find_input_port(p).map(|port| port.id.clone()))
            .unwrap_or_else(|| SetExpression::set(rule.expression.operator()));
        copy.set_port_rule(PortSetCreationRule::new(rule.set_type, expression));
    }
    copy
}
