//! # Default Set-Creation Rules
//!
//! Normalizes node rules so every node has both rules and every input port
//! fed by a variable-carrying link appears exactly once in the port rule.

use crate::graph::Template;
use crate::sets::{ComponentSetCreationRule, PortSetCreationRule, SetExpression, SetOperator};
use crate::types::{NodeId, PortId};
use std::collections::BTreeSet;
use tracing::debug;

impl Template {
    /// Attach default rules to every node and complete their port rules.
    pub fn fill_in_default_set_creation_rules(&mut self) {
        let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.id.clone()).collect();
        for id in &ids {
            self.add_default_set_creation_rules_for_node(id);
        }
    }

    /// Normalize the rules of a single node.
    ///
    /// - missing component rule: `WType`
    /// - missing port rule: `WType` over an empty cross product
    /// - leaves on ports no link lands on are dropped, and so are repeat
    ///   leaves for a port already referenced
    /// - each port fed by a variable-carrying link and not yet referenced
    ///   gets an `XProduct` leaf on the top-level expression
    pub fn add_default_set_creation_rules_for_node(&mut self, id: &NodeId) {
        let mut landed: BTreeSet<PortId> = BTreeSet::new();
        let mut fed: Vec<PortId> = Vec::new();
        for link in self.links.iter().filter(|l| l.to_node.as_ref() == Some(id)) {
            if let Some(port) = &link.to_port {
                landed.insert(port.clone());
                if link.variable.is_some() && !fed.contains(port) {
                    fed.push(port.clone());
                }
            }
        }

        let Some(node) = self.nodes.iter_mut().find(|n| &n.id == id) else {
            return;
        };
        if node.component_rule().is_none() {
            node.set_component_rule(ComponentSetCreationRule::default());
        }
        if node.port_rule().is_none() {
            node.set_port_rule(PortSetCreationRule::default());
        }
        let Some(rule) = node.port_rule_mut() else {
            return;
        };

        let before = rule.expression.ports().len();
        if rule.expression.port().is_some_and(|p| !landed.contains(p)) {
            rule.expression = SetExpression::set(SetOperator::XProduct);
        }
        rule.expression.retain_ports(&|p| landed.contains(p));
        rule.expression.dedupe_ports();
        let dropped = before - rule.expression.ports().len();
        if dropped > 0 {
            debug!(node = %id, dropped, "pruned stale or repeated port-rule leaves");
        }

        let referenced: BTreeSet<PortId> = rule.expression.ports().into_iter().cloned().collect();
        for port in fed {
            if !referenced.contains(&port) {
                if !rule.expression.is_set() {
                    let root = std::mem::replace(
                        &mut rule.expression,
                        SetExpression::set(SetOperator::XProduct),
                    );
                    rule.expression.push(root);
                }
                rule.expression
                    .push(SetExpression::leaf(SetOperator::XProduct, port));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Template;
    use crate::sets::{
        ComponentSetCreationRule, PortSetCreationRule, SetExpression, SetOperator, SetType,
    };
    use crate::types::{ComponentVariable, NodeId, Port, PortId, Variable};

    const NS: &str = "http://ex.org/wf/T.owl#";

    fn id(name: &str) -> String {
        format!("{NS}{name}")
    }

    fn two_inputs() -> (Template, NodeId) {
        let mut t = Template::new(id("T"));
        let a = t.add_node(ComponentVariable::component("lib#A"));
        for (port, var) in [("p1", "v1"), ("p2", "v2")] {
            t.add_link(
                None,
                Some(&a),
                None,
                Some(Port::new(id(port))),
                Some(Variable::data(id(var))),
            )
            .expect("input link");
        }
        (t, a)
    }

    fn leaf_count(expr: &SetExpression, port: &str) -> usize {
        expr.ports()
            .into_iter()
            .filter(|p| p.as_str() == id(port))
            .count()
    }

    #[test]
    fn attaches_defaults() {
        let (mut t, a) = two_inputs();
        t.fill_in_default_set_creation_rules();

        let node = t.node(&a).expect("node");
        assert_eq!(
            node.component_rule(),
            Some(&ComponentSetCreationRule::new(SetType::WType))
        );
        let rule = node.port_rule().expect("port rule");
        assert_eq!(rule.expression.operator(), SetOperator::XProduct);
        assert_eq!(rule.expression.to_string(), "xprod(p1, p2)");
    }

    #[test]
    fn keeps_existing_rule_and_completes_it() {
        let (mut t, a) = two_inputs();
        let custom = PortSetCreationRule::new(
            SetType::SType,
            SetExpression::with_children(
                SetOperator::NWise,
                vec![SetExpression::leaf(SetOperator::XProduct, id("p2"))],
            ),
        );
        t.node_mut(&a).expect("node").set_port_rule(custom);
        t.fill_in_default_set_creation_rules();

        let rule = t.node(&a).and_then(|n| n.port_rule()).expect("port rule");
        assert_eq!(rule.set_type, SetType::SType);
        assert_eq!(rule.expression.to_string(), "nwise(p2, p1)");
    }

    #[test]
    fn shared_port_gets_one_leaf() {
        let (mut t, a) = two_inputs();
        t.add_link(
            None,
            Some(&a),
            None,
            Some(Port::new(id("p1"))),
            Some(Variable::data(id("v3"))),
        )
        .expect("second link into p1");
        t.fill_in_default_set_creation_rules();

        let rule = t.node(&a).and_then(|n| n.port_rule()).expect("port rule");
        assert_eq!(leaf_count(&rule.expression, "p1"), 1);
    }

    #[test]
    fn skips_links_without_variable() {
        let (mut t, a) = two_inputs();
        t.add_link(None, Some(&a), None, Some(Port::new(id("p3"))), None)
            .expect("bare link");
        t.fill_in_default_set_creation_rules();

        let rule = t.node(&a).and_then(|n| n.port_rule()).expect("port rule");
        assert!(!rule.expression.contains_port(&PortId::new(id("p3"))));
    }

    #[test]
    fn drops_leaves_without_links() {
        let (mut t, a) = two_inputs();
        let stale = PortSetCreationRule::new(
            SetType::WType,
            SetExpression::with_children(
                SetOperator::XProduct,
                vec![SetExpression::leaf(SetOperator::XProduct, id("ghost"))],
            ),
        );
        t.node_mut(&a).expect("node").set_port_rule(stale);
        t.fill_in_default_set_creation_rules();

        let rule = t.node(&a).and_then(|n| n.port_rule()).expect("port rule");
        assert!(!rule.expression.contains_port(&PortId::new(id("ghost"))));
        assert_eq!(rule.expression.ports().len(), 2);
    }

    #[test]
    fn collapses_repeated_leaves() {
        let (mut t, a) = two_inputs();
        let repeated = PortSetCreationRule::new(
            SetType::WType,
            SetExpression::with_children(
                SetOperator::NWise,
                vec![
                    SetExpression::leaf(SetOperator::XProduct, id("p1")),
                    SetExpression::leaf(SetOperator::XProduct, id("p1")),
                ],
            ),
        );
        t.node_mut(&a).expect("node").set_port_rule(repeated);
        t.fill_in_default_set_creation_rules();

        let rule = t.node(&a).and_then(|n| n.port_rule()).expect("port rule");
        assert_eq!(rule.expression.to_string(), "nwise(p1, p2)");
        assert_eq!(leaf_count(&rule.expression, "p1"), 1);
    }

    #[test]
    fn idempotent() {
        let (mut t, _) = two_inputs();
        t.fill_in_default_set_creation_rules();
        let once = t.clone();
        t.fill_in_default_set_creation_rules();
        assert_eq!(once, t);
    }
}
