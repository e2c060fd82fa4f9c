//! # Validation Tier Tests (T0-T5)
//!
//! Scenario tests over the public API, from single graph edits up to
//! persistent sessions.
//!
//! ## Tiers
//! - T0: Graph Structure
//! - T1: Roles and Set-Creation Rules
//! - T2: Store Serialization
//! - T3: Nested Copy
//! - T4: Rule Validation
//! - T5: Persistent Sessions

use weft_core::{
    BindingTree, ComponentVariable, Literal, NodeId, Port, PortId, Role, SetExpression,
    SetOperator, SetType, Template, TemplateBridge, TripleGraph, Value, Variable, VariableId,
    Vocabulary, WeftError,
};

const NS: &str = "http://ex.org/wf/T.owl#";

fn id(name: &str) -> String {
    format!("{NS}{name}")
}

/// Two nodes joined by one link: A.out -> B.in carrying `v1`.
fn two_nodes() -> (Template, NodeId, NodeId) {
    let mut t = Template::new(id("T"));
    let a = t.add_node(ComponentVariable::component("http://ex.org/lib.owl#A"));
    let b = t.add_node(ComponentVariable::component("http://ex.org/lib.owl#B"));
    t.add_link(
        Some(&a),
        Some(&b),
        Some(Port::new(id("out"))),
        Some(Port::new(id("in"))),
        Some(Variable::data(id("v1"))),
    )
    .expect("link");
    (t, a, b)
}

/// input -> A -> B -> C -> output
fn three_stage() -> (Template, [NodeId; 3]) {
    let mut t = Template::new(id("T"));
    let nodes = ["A", "B", "C"]
        .map(|c| t.add_node(ComponentVariable::component(format!("http://ex.org/lib.owl#{c}"))));
    t.add_link(None, Some(&nodes[0]), None, Some(Port::new(id("a_in"))), Some(Variable::data(id("v0"))))
        .expect("input");
    t.add_link(
        Some(&nodes[0]),
        Some(&nodes[1]),
        Some(Port::new(id("a_out"))),
        Some(Port::new(id("b_in"))),
        Some(Variable::data(id("v1"))),
    )
    .expect("a to b");
    t.add_link(
        Some(&nodes[1]),
        Some(&nodes[2]),
        Some(Port::new(id("b_out"))),
        Some(Port::new(id("c_in"))),
        Some(Variable::data(id("v2"))),
    )
    .expect("b to c");
    t.add_link(Some(&nodes[2]), None, Some(Port::new(id("c_out"))), None, Some(Variable::data(id("v3"))))
        .expect("output");
    t.fill_in_default_set_creation_rules();
    (t, nodes)
}

fn names(vars: &[&Variable]) -> Vec<String> {
    vars.iter().map(|v| v.name().to_string()).collect()
}

// =============================================================================
// TIER T0: GRAPH STRUCTURE
// =============================================================================

mod t0_graph_structure {
    use super::*;

    /// T0.1: Link ids derive from port names; the variable is internal.
    #[test]
    fn intermediate_link_id_and_variables() {
        let (t, _, b) = two_nodes();

        let link = &t.links()[0];
        assert_eq!(link.id.as_str(), id("out_To_in"));
        assert!(t.input_variables().is_empty());
        assert!(t.output_variables().is_empty());
        assert_eq!(names(&t.intermediate_variables()), vec!["v1"]);
        assert_eq!(names(&t.input_variables_of(&b)), vec!["v1"]);
    }

    /// T0.2: Colliding link ids get a numeric suffix.
    #[test]
    fn colliding_link_ids_suffixed() {
        let (mut t, a, b) = two_nodes();
        let second = t
            .add_link(
                Some(&a),
                Some(&b),
                Some(Port::new(id("out"))),
                Some(Port::new(id("in"))),
                Some(Variable::data(id("v2"))),
            )
            .expect("second link");

        assert_eq!(second.as_str(), id("out_To_in_1"));
        assert_eq!(t.links_between(&a, &b).len(), 2);
        assert!(t.links_between(&b, &a).is_empty());
    }

    /// T0.3: Boundary links are named after the missing side.
    #[test]
    fn boundary_link_ids() {
        let (t, _) = three_stage();
        let ids: Vec<&str> = t.links().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids[0], id("Input_To_a_in"));
        assert_eq!(ids[3], id("c_out_To_Output"));
    }

    /// T0.4: A node endpoint without a port is rejected.
    #[test]
    fn endpoint_without_port_rejected() {
        let (mut t, a, _) = two_nodes();
        let result = t.add_link(None, Some(&a), None, None, Some(Variable::data(id("x"))));
        assert!(matches!(result, Err(WeftError::MissingPort(n)) if n == a));
    }

    /// T0.5: Links to unknown nodes are rejected.
    #[test]
    fn unknown_node_rejected() {
        let (mut t, _, _) = two_nodes();
        let ghost = NodeId::new(id("GhostNode"));
        let result = t.add_link(None, Some(&ghost), None, Some(Port::new(id("p"))), None);
        assert!(matches!(result, Err(WeftError::NodeNotFound(_))));
        assert_eq!(t.links().len(), 1);
    }

    /// T0.6: Ports are wildcards in link lookup; nodes are not.
    #[test]
    fn get_link_wildcards() {
        let (t, [a, b, _]) = three_stage();

        let by_nodes = t.get_link(Some(&a), Some(&b), None, None).expect("a to b");
        assert_eq!(by_nodes.variable, Some(VariableId::new(id("v1"))));

        let wrong_port = PortId::new(id("c_in"));
        assert!(t.get_link(Some(&a), Some(&b), None, Some(&wrong_port)).is_none());

        let input = t.get_link(None, Some(&a), None, None).expect("input link");
        assert!(input.is_input_link());
        assert!(t.get_link(None, Some(&b), None, None).is_none());
    }

    /// T0.7: Deleting a middle node demotes the links around it.
    #[test]
    fn delete_node_demotes_links() {
        let (mut t, [a, b, c]) = three_stage();
        t.delete_node(&b).expect("delete");

        assert_eq!(t.links().len(), 4);
        let into_b = t.get_link(Some(&a), None, None, None).expect("demoted a link");
        assert!(into_b.is_output_link());
        assert!(into_b.to_port.is_none());
        let out_of_b = t.get_link(None, Some(&c), None, None).expect("demoted c link");
        assert!(out_of_b.is_input_link());

        assert_eq!(names(&t.input_variables()), vec!["v0", "v2"]);
        assert_eq!(names(&t.output_variables()), vec!["v1", "v3"]);
        assert!(t.intermediate_links().is_empty());
    }

    /// T0.8: Deleting the last link carrying a variable removes it and the
    /// unused ports.
    #[test]
    fn delete_link_cleans_up() {
        let (mut t, a, b) = two_nodes();
        let lid = t.links()[0].id.clone();
        t.delete_link(&lid).expect("delete");

        assert!(t.variables().is_empty());
        assert!(t.node(&a).expect("a").output_ports().is_empty());
        assert!(t.node(&b).expect("b").input_ports().is_empty());
        assert!(matches!(t.delete_link(&lid), Err(WeftError::LinkNotFound(_))));
    }

    /// T0.9: Bindings must match the variable kind.
    #[test]
    fn binding_kind_checked() {
        let mut t = Template::new(id("T"));
        let param = t.add_variable(&id("threads"), weft_core::VariableType::Parameter);

        let result = t.set_data_binding(&param, BindingTree::leaf(id("file")));
        assert!(matches!(result, Err(WeftError::BindingKindMismatch(_))));

        t.set_parameter_binding(&param, BindingTree::leaf(Literal::int(8)))
            .expect("parameter binding");
        assert!(t.variable(&param).expect("variable").has_binding());
    }
}

// =============================================================================
// TIER T1: ROLES AND SET-CREATION RULES
// =============================================================================

mod t1_roles_and_rules {
    use super::*;

    /// T1.1: Default rules cover every fed input port.
    #[test]
    fn default_rules_filled() {
        let (t, [a, b, _]) = three_stage();

        for node in [&a, &b] {
            let node = t.node(node).expect("node");
            let rule = node.port_rule().expect("port rule");
            assert_eq!(rule.set_type, SetType::WType);
            assert_eq!(rule.expression.operator(), SetOperator::XProduct);
            assert_eq!(rule.expression.ports().len(), 1);
            assert_eq!(node.component_rule().expect("component rule").set_type, SetType::WType);
        }
    }

    /// T1.2: A custom rule is kept; a newly fed port joins it.
    #[test]
    fn custom_rule_extended() {
        let (mut t, [_, b, _]) = three_stage();
        let rule = weft_core::PortSetCreationRule::new(
            SetType::SType,
            SetExpression::with_children(
                SetOperator::NWise,
                vec![SetExpression::leaf(SetOperator::XProduct, id("b_in"))],
            ),
        );
        t.node_mut(&b).expect("b").set_port_rule(rule);
        t.add_link(None, Some(&b), None, Some(Port::new(id("b_opt"))), Some(Variable::parameter(id("opt"))))
            .expect("parameter");
        t.fill_in_default_set_creation_rules();

        let rule = t.node(&b).expect("b").port_rule().expect("rule");
        assert_eq!(rule.set_type, SetType::SType);
        assert_eq!(rule.expression.operator(), SetOperator::NWise);
        let ports: Vec<&str> = rule.expression.ports().iter().map(|p| p.as_str()).collect();
        assert_eq!(ports, vec![id("b_in"), id("b_opt")]);
    }

    /// T1.3: Boundary roles are synthesized; an output role survives only
    /// when its variable is also a template input.
    #[test]
    fn boundary_roles_reconciled() {
        let (mut t, _) = three_stage();
        let v3 = VariableId::new(id("v3"));
        t.add_output_role(v3.clone(), Role::new(id("custom")).with_role_id("custom"));
        t.auto_update_template_roles();

        let irole = t.input_role_for(&VariableId::new(id("v0"))).expect("input role");
        assert_eq!(irole.id, id("v0_irole"));
        let orole = t.output_role_for(&v3).expect("output role");
        assert_eq!(orole.id, id("v3_orole"));
        assert_eq!(orole.role_id.as_deref(), Some("v3"));
    }
}

// =============================================================================
// TIER T2: STORE SERIALIZATION
// =============================================================================

mod t2_serialization {
    use super::*;
    use weft_core::{Concept, Property};

    const LEGACY: &str = "http://ex.org/wf/Legacy.owl#";

    fn legacy_graph(vocab: &Vocabulary) -> TripleGraph {
        let c = |x| vocab.concept(x).to_string();
        let p = |x| vocab.property(x).to_string();
        let t = format!("{LEGACY}Legacy");
        let n1 = format!("{LEGACY}AlignNode");
        let n2 = format!("{LEGACY}SortNode");
        let l0 = format!("{LEGACY}L0");
        let l1 = format!("{LEGACY}L1");

        let mut g = TripleGraph::new();
        g.create_object_of_class(&t, &c(Concept::WorkflowTemplate));
        for (node, comp) in [(&n1, "http://ex.org/lib.owl#Align"), (&n2, "http://ex.org/lib.owl#Sort")] {
            g.create_object_of_class(node, &c(Concept::Node));
            g.add_property_value(&t, &p(Property::HasNode), Value::resource(node.as_str()));
            g.add_property_value(node, &p(Property::HasComponent), Value::resource(comp));
            g.create_object_of_class(comp, &c(Concept::ComponentVariable));
        }
        g.create_object_of_class("http://ex.org/lib.owl#Align", "http://ex.org/lib.owl#BwaAlign");

        g.create_object_of_class(&l0, &c(Concept::InputLink));
        g.add_property_value(&t, &p(Property::HasLink), Value::resource(l0.as_str()));
        g.add_property_value(&l0, &p(Property::HasDestinationNode), Value::resource(n1.as_str()));
        g.add_property_value(&l0, &p(Property::HasDestinationParameter), Value::resource("http://ex.org/lib.owl#reads"));
        g.add_property_value(&l0, &p(Property::HasVariable), Value::resource(format!("{LEGACY}reads")));
        g.create_object_of_class(&format!("{LEGACY}reads"), &c(Concept::DataVariable));

        g.create_object_of_class(&l1, &c(Concept::InOutLink));
        g.add_property_value(&t, &p(Property::HasLink), Value::resource(l1.as_str()));
        g.add_property_value(&l1, &p(Property::HasOriginNode), Value::resource(n1.as_str()));
        g.add_property_value(&l1, &p(Property::HasOriginParameter), Value::resource("http://ex.org/lib.owl#bam"));
        g.add_property_value(&l1, &p(Property::HasDestinationNode), Value::resource(n2.as_str()));
        g.add_property_value(&l1, &p(Property::HasDestinationParameter), Value::resource("http://ex.org/lib.owl#unsorted"));
        g.add_property_value(&l1, &p(Property::HasVariable), Value::resource(format!("{LEGACY}aligned")));
        g.create_object_of_class(&format!("{LEGACY}aligned"), &c(Concept::DataVariable));
        g
    }

    /// T2.1: Unversioned documents get ports synthesized from link parameters.
    #[test]
    fn legacy_document_read() {
        let bridge = TemplateBridge::default();
        let graph = legacy_graph(bridge.vocabulary());
        let t = bridge.read(&graph, &format!("{LEGACY}Legacy")).expect("read");

        assert_eq!(t.version(), 0);
        let align = t.node(&NodeId::new(format!("{LEGACY}AlignNode"))).expect("align");
        let sort = t.node(&NodeId::new(format!("{LEGACY}SortNode"))).expect("sort");

        let ip0 = PortId::new(format!("{LEGACY}ip0"));
        let op0 = PortId::new(format!("{LEGACY}op0"));
        assert!(align.find_input_port(&ip0).is_some());
        let out = align.find_output_port(&op0).expect("op0");
        assert_eq!(out.role.as_ref().map(|r| r.id.as_str()), Some("http://ex.org/lib.owl#bam"));
        assert_eq!(
            align.component.binding(),
            Some(&BindingTree::leaf("http://ex.org/lib.owl#BwaAlign".to_string()))
        );

        let rule = sort.port_rule().expect("port rule");
        assert_eq!(rule.set_type, SetType::WType);
        assert_eq!(
            rule.expression,
            SetExpression::with_children(
                SetOperator::XProduct,
                vec![SetExpression::leaf(SetOperator::XProduct, ip0.clone())],
            )
        );

        let l1 = t.get_link(Some(&align.id), Some(&sort.id), None, None).expect("l1");
        assert_eq!(l1.from_port, Some(op0));
        assert_eq!(l1.to_port, Some(ip0));
    }

    /// T2.2: Sub-templates are inlined and read back with their parent.
    #[test]
    fn nested_template_round_trip() {
        let (mut inner, _) = three_stage();
        inner.set_id("http://ex.org/wf/Inner.owl#Inner");
        let mut outer = Template::new("http://ex.org/wf/Outer.owl#Outer");
        let node = outer.add_node(ComponentVariable::workflow(inner));
        assert_eq!(node.as_str(), "http://ex.org/wf/Outer.owl#InnerNode");

        let bridge = TemplateBridge::default();
        let graph = bridge.write(&mut outer);
        let back = bridge.read(&graph, outer.id()).expect("read");

        let written = outer.node(&node).and_then(|n| n.component.template()).expect("inner");
        let read = back.node(&node).and_then(|n| n.component.template()).expect("inner back");
        assert_eq!(read.nodes(), written.nodes());
        assert_eq!(read.links(), written.links());
        assert_eq!(read.parent(), Some(outer.id()));
        assert_eq!(read.version(), written.version());

        let mut count = 0;
        back.walk(&mut |_| count += 1);
        assert_eq!(count, 2);
    }

    /// T2.3: A template that contains itself is rejected.
    #[test]
    fn cyclic_sub_templates_rejected() {
        let vocab = Vocabulary::default();
        let wt = vocab.concept(Concept::WorkflowTemplate);
        let has_node = vocab.property(Property::HasNode);
        let has_workflow = vocab.property(Property::HasWorkflow);

        let mut g = TripleGraph::new();
        g.create_object_of_class(&id("T"), wt);
        g.create_object_of_class("http://ex.org/wf/U.owl#U", wt);
        g.add_property_value(&id("T"), has_node, Value::resource(id("UNode")));
        g.add_property_value(&id("UNode"), has_workflow, Value::resource("http://ex.org/wf/U.owl#U"));
        g.add_property_value("http://ex.org/wf/U.owl#U", has_node, Value::resource("http://ex.org/wf/U.owl#TNode"));
        g.add_property_value("http://ex.org/wf/U.owl#TNode", has_workflow, Value::resource(id("T")));

        let result = TemplateBridge::new(vocab).read(&g, &id("T"));
        assert!(matches!(result, Err(WeftError::CyclicTemplate(_))));
    }

    /// T2.4: A node with neither component nor workflow is malformed; a
    /// sub-workflow missing from the document is not found.
    #[test]
    fn broken_nodes_rejected() {
        let vocab = Vocabulary::default();
        let wt = vocab.concept(Concept::WorkflowTemplate).to_string();
        let has_node = vocab.property(Property::HasNode).to_string();
        let has_workflow = vocab.property(Property::HasWorkflow).to_string();
        let bridge = TemplateBridge::new(vocab);

        let mut g = TripleGraph::new();
        g.create_object_of_class(&id("T"), &wt);
        g.add_property_value(&id("T"), &has_node, Value::resource(id("EmptyNode")));
        assert!(matches!(bridge.read(&g, &id("T")), Err(WeftError::MalformedTemplate(_))));

        g.add_property_value(&id("EmptyNode"), &has_workflow, Value::resource("http://ex.org/wf/Gone.owl#Gone"));
        assert!(matches!(bridge.read(&g, &id("T")), Err(WeftError::TemplateNotFound(_))));
    }

    /// T2.5: Parameter values keep their datatype through the store.
    #[test]
    fn parameter_values_round_trip() {
        let (mut t, [a, _, _]) = three_stage();
        t.add_link(None, Some(&a), None, Some(Port::new(id("a_k"))), Some(Variable::parameter(id("k"))))
            .expect("parameter");
        t.set_parameter_binding(&VariableId::new(id("k")), BindingTree::leaf(Literal::int(31)))
            .expect("bind");

        let bridge = TemplateBridge::default();
        let graph = bridge.write(&mut t);
        let back = bridge.read(&graph, t.id()).expect("read");

        let k = back.variable(&VariableId::new(id("k"))).expect("k");
        assert_eq!(k, t.variable(&VariableId::new(id("k"))).expect("k"));
        assert!(k.is_parameter_variable());
    }
}

// =============================================================================
// TIER T3: NESTED COPY
// =============================================================================

mod t3_copy {
    use super::*;

    /// T3.1: Copies of nested templates share nothing with the source.
    #[test]
    fn nested_copy_is_independent() {
        let (mut inner, _) = three_stage();
        inner.set_id("http://ex.org/wf/Inner.owl#Inner");
        let mut outer = Template::new("http://ex.org/wf/Outer.owl#Outer");
        let node = outer.add_node(ComponentVariable::workflow(inner));

        let mut copy = outer.create_copy();
        let sub = copy
            .node_mut(&node)
            .and_then(|n| n.component.template_mut())
            .expect("copied sub-template");
        sub.add_node(ComponentVariable::component("http://ex.org/lib.owl#Extra"));
        assert_eq!(sub.parent(), Some("http://ex.org/wf/Outer.owl#Outer"));
        assert_eq!(sub.created_from(), Some("http://ex.org/wf/Inner.owl#Inner"));

        let source_sub = outer.node(&node).and_then(|n| n.component.template()).expect("source");
        assert_eq!(source_sub.nodes().len(), 3);
        assert_eq!(copy.metadata().created_from, vec![outer.id().to_string()]);
    }
}

// =============================================================================
// TIER T4: RULE VALIDATION
// =============================================================================

mod t4_validation {
    use super::*;
    use weft_core::{Property, RuleEngine, RuleOutcome, Rules, strip_rule_comments};

    /// Accepts everything, optionally flagging one resource invalid.
    struct Flagging {
        flag: Option<String>,
    }

    impl RuleEngine for Flagging {
        fn apply_rules(&self, mut snapshot: TripleGraph, _rules: &str) -> Result<RuleOutcome, WeftError> {
            if let Some(target) = &self.flag {
                let vocab = Vocabulary::default();
                snapshot.set_property_value(
                    target,
                    vocab.property(Property::IsInvalid),
                    Literal::boolean(true).into(),
                );
            }
            Ok(RuleOutcome {
                valid: true,
                snapshot,
            })
        }
    }

    /// T4.1: Accepted templates come back; flagged ones do not.
    #[test]
    fn invalid_flag_rejects() {
        let bridge = TemplateBridge::default();
        let (mut t, _) = three_stage();
        t.set_rules(Rules::new("[noop: (?t ?p ?o) -> (?t ?p ?o)]"));

        assert!(bridge.apply_rules(&mut t, &Flagging { flag: None }).is_some());
        let flagging = Flagging {
            flag: Some(t.id().to_string()),
        };
        assert!(bridge.apply_rules(&mut t, &flagging).is_none());
    }

    /// T4.2: Comments are stripped but IRI fragments survive.
    #[test]
    fn rule_comments_stripped() {
        let text = "[r: (?a wflow:x ?b) -> (?a http://ex.org/o#y ?b)] # done\n# whole line\n";
        assert_eq!(
            strip_rule_comments(text),
            "[r: (?a wflow:x ?b) -> (?a http://ex.org/o#y ?b)]\n\n"
        );
    }
}

// =============================================================================
// TIER T5: PERSISTENT SESSIONS
// =============================================================================

mod t5_sessions {
    use super::*;
    use tempfile::tempdir;
    use weft_core::{Session, export_canonical, verify_canonical};

    /// T5.1: Save, save-as, list and delete against a redb store.
    #[test]
    fn redb_session_lifecycle() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("weft.redb");
        let (mut t, _) = three_stage();

        {
            let mut session = Session::with_redb(&path).expect("open");
            assert!(session.save(&mut t));
            assert!(session.save_as(&t, "http://ex.org/wf/U.owl#U"));
        }

        let mut session = Session::with_redb(&path).expect("reopen");
        assert_eq!(session.list(), vec![id("T"), "http://ex.org/wf/U.owl#U".to_string()]);

        let moved = session.load("http://ex.org/wf/U.owl#U").expect("moved copy");
        assert_eq!(moved.nodes().len(), 3);
        assert!(moved.variables().iter().all(|v| v.id.as_str().starts_with("http://ex.org/wf/U.owl#")));

        assert!(session.delete(t.id()));
        assert_eq!(session.list(), vec!["http://ex.org/wf/U.owl#U".to_string()]);
    }

    /// T5.2: A stored document exports to a verifiable canonical form.
    #[test]
    fn stored_document_exports_canonically() {
        let mut session = Session::new();
        let (mut t, _) = three_stage();
        assert!(session.save(&mut t));

        let graph = session.export_graph(t.id()).expect("document");
        let bytes = export_canonical(&graph).expect("export");
        assert!(verify_canonical(&graph, &bytes).expect("verify"));

        let mut changed = graph.clone();
        changed.add_property_value(&id("extra"), "http://ex.org/p", Value::resource(id("o")));
        assert!(!verify_canonical(&changed, &bytes).expect("verify changed"));
    }
}
