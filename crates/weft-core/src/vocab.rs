//! # Workflow Vocabulary
//!
//! The classes and properties a template document is written with, resolved
//! once against the workflow ontology URL.
//!
//! Every term records the schema version that introduced it. Readers ask
//! [`Vocabulary::supports`] instead of patching missing terms into the store.

use crate::primitives::EXPLICIT_PORTS_VERSION;
use std::collections::BTreeMap;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INT: &str = "http://www.w3.org/2001/XMLSchema#int";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// Default workflow ontology location.
pub const DEFAULT_ONTOLOGY_URL: &str = "http://weft-workflows.org/ontology/workflow.owl";

// =============================================================================
// TERMS
// =============================================================================

/// Classes of the workflow ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Concept {
    WorkflowTemplate,
    Node,
    Port,
    Role,
    ComponentVariable,
    DataVariable,
    ParameterVariable,
    InputLink,
    OutputLink,
    InOutLink,
    ComponentSetRule,
    PortSetRule,
    XProduct,
    NWise,
    IncreaseDimensionality,
    ReduceDimensionality,
    Shift,
    Metadata,
}

impl Concept {
    pub const ALL: [Self; 18] = [
        Self::WorkflowTemplate,
        Self::Node,
        Self::Port,
        Self::Role,
        Self::ComponentVariable,
        Self::DataVariable,
        Self::ParameterVariable,
        Self::InputLink,
        Self::OutputLink,
        Self::InOutLink,
        Self::ComponentSetRule,
        Self::PortSetRule,
        Self::XProduct,
        Self::NWise,
        Self::IncreaseDimensionality,
        Self::ReduceDimensionality,
        Self::Shift,
        Self::Metadata,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::WorkflowTemplate => "WorkflowTemplate",
            Self::Node => "Node",
            Self::Port => "Port",
            Self::Role => "Role",
            Self::ComponentVariable => "ComponentVariable",
            Self::DataVariable => "DataVariable",
            Self::ParameterVariable => "ParameterVariable",
            Self::InputLink => "InputLink",
            Self::OutputLink => "OutputLink",
            Self::InOutLink => "InOutLink",
            Self::ComponentSetRule => "ComponentSetRule",
            Self::PortSetRule => "PortSetRule",
            Self::XProduct => "XProduct",
            Self::NWise => "NWise",
            Self::IncreaseDimensionality => "IncreaseDimensionality",
            Self::ReduceDimensionality => "ReduceDimensionality",
            Self::Shift => "Shift",
            Self::Metadata => "Metadata",
        }
    }

    /// Schema version that introduced the class.
    #[must_use]
    pub fn since(self) -> u32 {
        match self {
            Self::Port
            | Self::ComponentSetRule
            | Self::PortSetRule
            | Self::XProduct
            | Self::NWise
            | Self::IncreaseDimensionality => EXPLICIT_PORTS_VERSION,
            Self::ReduceDimensionality | Self::Shift | Self::Metadata => 2,
            _ => 0,
        }
    }
}

/// Properties of the workflow ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    HasNode,
    HasLink,
    HasComponent,
    HasWorkflow,
    IsConcrete,
    HasComponentBinding,
    HasInputPort,
    HasOutputPort,
    SatisfiesRole,
    HasDimensionality,
    HasRoleId,
    HasComponentSetCreationRule,
    HasPortSetCreationRule,
    CreateComponentSets,
    CreateWorkflowSets,
    CreateSetsOn,
    HasExpressionArgument,
    HasOriginNode,
    HasOriginPort,
    HasDestinationNode,
    HasDestinationPort,
    HasOriginParameter,
    HasDestinationParameter,
    HasVariable,
    HasDataBinding,
    HasParameterValue,
    MapsToVariable,
    HasInputRole,
    HasOutputRole,
    HasVersion,
    HasMetadata,
    LastUpdateTime,
    HasDocumentation,
    HasContributor,
    CreatedFrom,
    HasRules,
    IsInvalid,
}

impl Property {
    pub const ALL: [Self; 37] = [
        Self::HasNode,
        Self::HasLink,
        Self::HasComponent,
        Self::HasWorkflow,
        Self::IsConcrete,
        Self::HasComponentBinding,
        Self::HasInputPort,
        Self::HasOutputPort,
        Self::SatisfiesRole,
        Self::HasDimensionality,
        Self::HasRoleId,
        Self::HasComponentSetCreationRule,
        Self::HasPortSetCreationRule,
        Self::CreateComponentSets,
        Self::CreateWorkflowSets,
        Self::CreateSetsOn,
        Self::HasExpressionArgument,
        Self::HasOriginNode,
        Self::HasOriginPort,
        Self::HasDestinationNode,
        Self::HasDestinationPort,
        Self::HasOriginParameter,
        Self::HasDestinationParameter,
        Self::HasVariable,
        Self::HasDataBinding,
        Self::HasParameterValue,
        Self::MapsToVariable,
        Self::HasInputRole,
        Self::HasOutputRole,
        Self::HasVersion,
        Self::HasMetadata,
        Self::LastUpdateTime,
        Self::HasDocumentation,
        Self::HasContributor,
        Self::CreatedFrom,
        Self::HasRules,
        Self::IsInvalid,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HasNode => "hasNode",
            Self::HasLink => "hasLink",
            Self::HasComponent => "hasComponent",
            Self::HasWorkflow => "hasWorkflow",
            Self::IsConcrete => "isConcrete",
            Self::HasComponentBinding => "hasComponentBinding",
            Self::HasInputPort => "hasInputPort",
            Self::HasOutputPort => "hasOutputPort",
            Self::SatisfiesRole => "satisfiesRole",
            Self::HasDimensionality => "hasDimensionality",
            Self::HasRoleId => "hasRoleID",
            Self::HasComponentSetCreationRule => "hasComponentSetCreationRule",
            Self::HasPortSetCreationRule => "hasPortSetCreationRule",
            Self::CreateComponentSets => "createComponentSets",
            Self::CreateWorkflowSets => "createWorkflowSets",
            Self::CreateSetsOn => "createSetsOn",
            Self::HasExpressionArgument => "hasExpressionArgument",
            Self::HasOriginNode => "hasOriginNode",
            Self::HasOriginPort => "hasOriginPort",
            Self::HasDestinationNode => "hasDestinationNode",
            Self::HasDestinationPort => "hasDestinationPort",
            Self::HasOriginParameter => "hasOriginParameter",
            Self::HasDestinationParameter => "hasDestinationParameter",
            Self::HasVariable => "hasVariable",
            Self::HasDataBinding => "hasDataBinding",
            Self::HasParameterValue => "hasParameterValue",
            Self::MapsToVariable => "mapsToVariable",
            Self::HasInputRole => "hasInputRole",
            Self::HasOutputRole => "hasOutputRole",
            Self::HasVersion => "hasVersion",
            Self::HasMetadata => "hasMetadata",
            Self::LastUpdateTime => "lastUpdateTime",
            Self::HasDocumentation => "hasDocumentation",
            Self::HasContributor => "hasContributor",
            Self::CreatedFrom => "createdFrom",
            Self::HasRules => "hasRules",
            Self::IsInvalid => "isInvalid",
        }
    }

    /// Schema version that introduced the property.
    #[must_use]
    pub fn since(self) -> u32 {
        match self {
            Self::HasInputPort
            | Self::HasOutputPort
            | Self::SatisfiesRole
            | Self::HasComponentSetCreationRule
            | Self::HasPortSetCreationRule
            | Self::CreateComponentSets
            | Self::CreateWorkflowSets
            | Self::CreateSetsOn
            | Self::HasExpressionArgument
            | Self::HasOriginPort
            | Self::HasDestinationPort
            | Self::HasComponentBinding => EXPLICIT_PORTS_VERSION,
            Self::HasRoleId | Self::HasMetadata => 2,
            _ => 0,
        }
    }

    /// Properties only legacy (version 0) documents are written with.
    #[must_use]
    pub fn is_legacy_only(self) -> bool {
        matches!(
            self,
            Self::HasOriginParameter | Self::HasDestinationParameter
        )
    }
}

// =============================================================================
// VOCABULARY
// =============================================================================

/// Term IRIs resolved against one ontology URL.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    ontology_url: String,
    namespace: String,
    concepts: BTreeMap<Concept, String>,
    properties: BTreeMap<Property, String>,
}

impl Vocabulary {
    /// Resolve every term against `ontology_url` (namespace = url + `#`).
    #[must_use]
    pub fn new(ontology_url: &str) -> Self {
        let ontology_url = ontology_url.trim_end_matches('#').to_string();
        let namespace = format!("{ontology_url}#");
        let concepts = Concept::ALL
            .iter()
            .map(|c| (*c, format!("{namespace}{}", c.name())))
            .collect();
        let properties = Property::ALL
            .iter()
            .map(|p| (*p, format!("{namespace}{}", p.name())))
            .collect();
        Self {
            ontology_url,
            namespace,
            concepts,
            properties,
        }
    }

    #[must_use]
    pub fn ontology_url(&self) -> &str {
        &self.ontology_url
    }

    /// The workflow namespace, including the trailing `#`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// IRI of a class.
    #[must_use]
    pub fn concept(&self, concept: Concept) -> &str {
        self.concepts.get(&concept).map_or("", String::as_str)
    }

    /// IRI of a property.
    #[must_use]
    pub fn property(&self, property: Property) -> &str {
        self.properties.get(&property).map_or("", String::as_str)
    }

    /// Reverse lookup of a class IRI.
    #[must_use]
    pub fn concept_of(&self, iri: &str) -> Option<Concept> {
        self.concepts
            .iter()
            .find(|(_, v)| v.as_str() == iri)
            .map(|(c, _)| *c)
    }

    /// Whether a document at schema `version` is written with `property`.
    #[must_use]
    pub fn supports(&self, property: Property, version: u32) -> bool {
        if property.is_legacy_only() {
            return version < EXPLICIT_PORTS_VERSION;
        }
        property.since() <= version
    }

    /// Whether `iri` lies in the workflow namespace.
    #[must_use]
    pub fn is_workflow_term(&self, iri: &str) -> bool {
        iri.starts_with(&self.namespace)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_ONTOLOGY_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::LATEST_VERSION;
    use std::collections::BTreeSet;

    #[test]
    fn iris_are_namespaced() {
        let vocab = Vocabulary::new("http://ex.org/onto/workflow.owl");
        assert_eq!(
            vocab.concept(Concept::WorkflowTemplate),
            "http://ex.org/onto/workflow.owl#WorkflowTemplate"
        );
        assert_eq!(
            vocab.property(Property::HasRoleId),
            "http://ex.org/onto/workflow.owl#hasRoleID"
        );
        assert!(vocab.is_workflow_term(vocab.property(Property::HasNode)));
    }

    #[test]
    fn trailing_hash_ignored() {
        let a = Vocabulary::new("http://ex.org/o.owl#");
        assert_eq!(a.ontology_url(), "http://ex.org/o.owl");
        assert_eq!(a.namespace(), "http://ex.org/o.owl#");
    }

    #[test]
    fn term_iris_unique() {
        let vocab = Vocabulary::default();
        let concepts: BTreeSet<&str> = Concept::ALL.iter().map(|c| vocab.concept(*c)).collect();
        let properties: BTreeSet<&str> =
            Property::ALL.iter().map(|p| vocab.property(*p)).collect();
        assert_eq!(concepts.len(), Concept::ALL.len());
        assert_eq!(properties.len(), Property::ALL.len());
    }

    #[test]
    fn concept_reverse_lookup() {
        let vocab = Vocabulary::default();
        let iri = vocab.concept(Concept::Shift).to_string();
        assert_eq!(vocab.concept_of(&iri), Some(Concept::Shift));
        assert_eq!(vocab.concept_of("urn:other#Shift"), None);
    }

    #[test]
    fn legacy_documents_use_parameters() {
        let vocab = Vocabulary::default();
        assert!(vocab.supports(Property::HasDestinationParameter, 0));
        assert!(!vocab.supports(Property::HasInputPort, 0));
        assert!(vocab.supports(Property::HasInputPort, LATEST_VERSION));
        assert!(!vocab.supports(Property::HasOriginParameter, LATEST_VERSION));
    }

    #[test]
    fn every_term_exists_at_latest_version() {
        assert!(Concept::ALL.iter().all(|c| c.since() <= LATEST_VERSION));
        assert!(Property::ALL.iter().all(|p| p.since() <= LATEST_VERSION));
    }
}
