//! # Template Roles
//!
//! Reconciles the declared input/output roles of a template with the
//! boundary variables its links actually carry.

use crate::graph::Template;
use crate::primitives::{INPUT_ROLE_SUFFIX, OUTPUT_ROLE_SUFFIX};
use crate::types::{Role, VariableId};
use std::collections::BTreeSet;

impl Template {
    /// Prune stale roles and synthesize missing ones.
    ///
    /// Input roles survive only for current input variables. Output roles
    /// are checked against the same *input* variable set, so an output role
    /// is kept only when its variable is also a template input; every other
    /// output variable gets a freshly synthesized role. A variable holding a
    /// surviving role in either map gets no new role.
    ///
    /// Synthesized roles are `<var>_irole` / `<var>_orole` with the variable
    /// name as role id and dimensionality 0. Idempotent.
    pub fn auto_update_template_roles(&mut self) {
        let ivars: Vec<VariableId> = self.input_variables().iter().map(|v| v.id.clone()).collect();
        let ovars: Vec<(VariableId, String)> = self
            .output_variables()
            .iter()
            .map(|v| (v.id.clone(), v.name().to_string()))
            .collect();
        let inames: Vec<String> = self
            .input_variables()
            .iter()
            .map(|v| v.name().to_string())
            .collect();

        self.input_roles.retain(|var, _| ivars.contains(var));
        self.output_roles.retain(|var, _| ivars.contains(var));

        let role_vars: BTreeSet<VariableId> = self
            .input_roles
            .keys()
            .chain(self.output_roles.keys())
            .cloned()
            .collect();

        for (var, name) in ivars.iter().zip(inames) {
            if !role_vars.contains(var) {
                let role = Role::new(format!("{}{INPUT_ROLE_SUFFIX}", var.as_str())).with_role_id(name);
                self.input_roles.insert(var.clone(), role);
            }
        }
        for (var, name) in ovars {
            if !role_vars.contains(&var) {
                let role = Role::new(format!("{}{OUTPUT_ROLE_SUFFIX}", var.as_str())).with_role_id(name);
                self.output_roles.insert(var, role);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Template;
    use crate::types::{ComponentVariable, Port, Role, Variable, VariableId};

    const NS: &str = "http://ex.org/wf/T.owl#";

    fn id(name: &str) -> String {
        format!("{NS}{name}")
    }

    /// in -> A -> out
    fn boundary() -> Template {
        let mut t = Template::new(id("T"));
        let a = t.add_node(ComponentVariable::component("lib#A"));
        t.add_link(
            None,
            Some(&a),
            None,
            Some(Port::new(id("ip"))),
            Some(Variable::data(id("input"))),
        )
        .expect("input link");
        t.add_link(
            Some(&a),
            None,
            Some(Port::new(id("op"))),
            None,
            Some(Variable::data(id("output"))),
        )
        .expect("output link");
        t
    }

    #[test]
    fn synthesizes_missing_roles() {
        let mut t = boundary();
        t.auto_update_template_roles();

        let irole = t
            .input_role_for(&VariableId::new(id("input")))
            .expect("input role");
        assert_eq!(irole.id, id("input_irole"));
        assert_eq!(irole.role_id.as_deref(), Some("input"));
        assert_eq!(irole.dimensionality, 0);

        let orole = t
            .output_role_for(&VariableId::new(id("output")))
            .expect("output role");
        assert_eq!(orole.id, id("output_orole"));
    }

    #[test]
    fn prunes_stale_input_roles() {
        let mut t = boundary();
        t.add_input_role(VariableId::new(id("gone")), Role::new(id("gone_irole")));
        t.auto_update_template_roles();

        assert!(t.input_role_for(&VariableId::new(id("gone"))).is_none());
        assert_eq!(t.input_roles().len(), 1);
    }

    #[test]
    fn output_roles_checked_against_input_variables() {
        let mut t = boundary();
        let custom = Role::new(id("custom")).with_dimensionality(2);
        t.add_output_role(VariableId::new(id("output")), custom);
        t.auto_update_template_roles();

        // "output" is not an input variable: the declared role is replaced.
        let orole = t
            .output_role_for(&VariableId::new(id("output")))
            .expect("output role");
        assert_eq!(orole.id, id("output_orole"));
        assert_eq!(orole.dimensionality, 0);
    }

    #[test]
    fn declared_input_role_kept() {
        let mut t = boundary();
        let custom = Role::new(id("reads")).with_dimensionality(1).with_role_id("reads");
        t.add_input_role(VariableId::new(id("input")), custom.clone());
        t.auto_update_template_roles();

        assert_eq!(t.input_role_for(&VariableId::new(id("input"))), Some(&custom));
    }

    #[test]
    fn idempotent() {
        let mut t = boundary();
        t.auto_update_template_roles();
        let once = (t.input_roles().clone(), t.output_roles().clone());
        t.auto_update_template_roles();

        assert_eq!(once, (t.input_roles().clone(), t.output_roles().clone()));
    }
}
