//! # Rule Inference Boundary
//!
//! Templates are validated by an external rule engine. The engine receives a
//! serialized snapshot plus the template's rule text and answers with a
//! validity flag and the (possibly extended) snapshot.
//!
//! Rejection is an expected outcome and surfaces as `None`, never as an error.

use crate::bridge::TemplateBridge;
use crate::graph::Template;
use crate::triples::{TripleGraph, Value};
use crate::types::WeftError;
use crate::vocab::{Concept, Property};
use tracing::{debug, warn};

/// What a rule engine returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub valid: bool,
    pub snapshot: TripleGraph,
}

/// Boundary to an external rule engine.
pub trait RuleEngine {
    /// Evaluate `rules` over `snapshot`.
    fn apply_rules(&self, snapshot: TripleGraph, rules: &str) -> Result<RuleOutcome, WeftError>;
}

/// Remove `#` comments from rule text.
///
/// A `#` opens a comment only at the start of a line or after whitespace, so
/// fragment identifiers inside full IRIs survive.
#[must_use]
pub fn strip_rule_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let mut cut = None;
        let mut prev_blank = true;
        for (i, ch) in line.char_indices() {
            if ch == '#' && prev_blank {
                cut = Some(i);
                break;
            }
            prev_blank = ch.is_whitespace();
        }
        match cut {
            Some(i) => {
                out.push_str(line[..i].trim_end());
                if line.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }
    out
}

impl TemplateBridge {
    /// Validate `template` with `engine`.
    ///
    /// Returns the template itself when the engine accepts it, `None` when
    /// it rejects it, flags the template `isInvalid`, or fails.
    pub fn apply_rules<'t>(
        &self,
        template: &'t mut Template,
        engine: &impl RuleEngine,
    ) -> Option<&'t Template> {
        let snapshot = self.write(template);
        let vocab = self.vocabulary();
        let class = vocab.concept(Concept::WorkflowTemplate);
        if snapshot.instances_of(class).is_empty() {
            debug!(template = template.id(), "snapshot holds no template");
            return None;
        }

        let rules = strip_rule_comments(template.rules().text.as_deref().unwrap_or_default());
        match engine.apply_rules(snapshot, &rules) {
            Ok(outcome) => {
                let flagged = outcome
                    .snapshot
                    .property_value(template.id(), vocab.property(Property::IsInvalid))
                    .and_then(Value::as_bool)
                    == Some(true);
                if outcome.valid && !flagged {
                    Some(&*template)
                } else {
                    debug!(template = template.id(), "template rejected by rules");
                    None
                }
            }
            Err(e) => {
                warn!(template = template.id(), error = %e, "rule engine failed; template treated as invalid");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComponentVariable, Literal, Port, Rules, Variable};
    use crate::vocab::Vocabulary;
    use std::cell::RefCell;

    const NS: &str = "http://ex.org/wf/T.owl#";

    /// Records the rules it was handed and answers with a fixed verdict.
    struct Scripted {
        valid: bool,
        flag_invalid: bool,
        seen: RefCell<Option<String>>,
    }

    impl Scripted {
        fn new(valid: bool, flag_invalid: bool) -> Self {
            Self {
                valid,
                flag_invalid,
                seen: RefCell::new(None),
            }
        }
    }

    impl RuleEngine for Scripted {
        fn apply_rules(&self, mut snapshot: TripleGraph, rules: &str) -> Result<RuleOutcome, WeftError> {
            *self.seen.borrow_mut() = Some(rules.to_string());
            if self.flag_invalid {
                let vocab = Vocabulary::default();
                snapshot.set_property_value(
                    &format!("{NS}T"),
                    vocab.property(Property::IsInvalid),
                    Literal::boolean(true).into(),
                );
            }
            Ok(RuleOutcome {
                valid: self.valid,
                snapshot,
            })
        }
    }

    struct Failing;

    impl RuleEngine for Failing {
        fn apply_rules(&self, _: TripleGraph, _: &str) -> Result<RuleOutcome, WeftError> {
            Err(WeftError::Serialization("engine offline".to_string()))
        }
    }

    fn template() -> Template {
        let mut t = Template::new(format!("{NS}T"));
        let a = t.add_node(ComponentVariable::component("lib#A"));
        t.add_link(
            None,
            Some(&a),
            None,
            Some(Port::new(format!("{NS}in"))),
            Some(Variable::data(format!("{NS}v"))),
        )
        .expect("link");
        t.set_rules(Rules::new("# header\n[r: (?a ?b ?c) -> (?a ?b ?c)] # trailing\n"));
        t
    }

    #[test]
    fn strip_comments_keeps_iri_fragments() {
        let text = "# full line\n[r: (?x <http://ex.org/o#p> ?y) -> ] # note\ntail";
        assert_eq!(
            strip_rule_comments(text),
            "\n[r: (?x <http://ex.org/o#p> ?y) -> ]\ntail"
        );
    }

    #[test]
    fn valid_template_returned() {
        let bridge = TemplateBridge::default();
        let engine = Scripted::new(true, false);
        let mut t = template();

        assert!(bridge.apply_rules(&mut t, &engine).is_some());
        assert_eq!(
            engine.seen.borrow().as_deref(),
            Some("\n[r: (?a ?b ?c) -> (?a ?b ?c)]\n")
        );
    }

    #[test]
    fn rejected_template_is_none() {
        let bridge = TemplateBridge::default();
        let mut t = template();
        assert!(bridge.apply_rules(&mut t, &Scripted::new(false, false)).is_none());
    }

    #[test]
    fn invalid_flag_rejects() {
        let bridge = TemplateBridge::default();
        let mut t = template();
        assert!(bridge.apply_rules(&mut t, &Scripted::new(true, true)).is_none());
    }

    #[test]
    fn engine_failure_is_invalid() {
        let bridge = TemplateBridge::default();
        let mut t = template();
        assert!(bridge.apply_rules(&mut t, &Failing).is_none());
    }
}
