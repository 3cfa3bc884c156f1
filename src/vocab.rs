//! RDF vocabularies used by the cube and the geography scheme.
//!
//! `rdf`, `rdfs` and `xsd` come from oxigraph; the Data Cube, SKOS, Dublin Core
//! and SDMX terms are declared here as constant node references.

use crate::error::{CubeError, CubeResult};
use oxigraph::model::{NamedNode, NamedNodeRef};

pub use oxigraph::model::vocab::{rdf, rdfs, xsd};

pub const QB_NS: &str = "http://purl.org/linked-data/cube#";
pub const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const SDMX_CONCEPT_NS: &str = "http://purl.org/linked-data/sdmx/2009/concept#";
pub const SDMX_MEASURE_NS: &str = "http://purl.org/linked-data/sdmx/2009/measure#";

pub const DEFAULT_ONTOLOGY_BASE: &str = "https://data.statcube.dev/ontology#";
pub const DEFAULT_RESOURCE_BASE: &str = "https://data.statcube.dev/resources/";

pub mod qb {
    use oxigraph::model::NamedNodeRef;

    pub const DATA_SET: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#DataSet");
    pub const DATA_SET_PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#dataSet");
    pub const OBSERVATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#Observation");
    pub const DATA_STRUCTURE_DEFINITION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#DataStructureDefinition");
    pub const STRUCTURE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#structure");
    pub const COMPONENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#component");
    pub const DIMENSION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#dimension");
    pub const MEASURE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#measure");
    pub const DIMENSION_PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#DimensionProperty");
    pub const MEASURE_PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#MeasureProperty");
    pub const CODED_PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#CodedProperty");
    pub const CONCEPT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#concept");
    pub const ORDER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#order");
}

pub mod skos {
    use oxigraph::model::NamedNodeRef;

    pub const CONCEPT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#Concept");
    pub const CONCEPT_SCHEME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#ConceptScheme");
    pub const PREF_LABEL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");
    pub const NOTATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#notation");
    pub const IN_SCHEME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#inScheme");
    pub const HAS_TOP_CONCEPT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#hasTopConcept");
    pub const TOP_CONCEPT_OF: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#topConceptOf");
    pub const BROADER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#broader");
    pub const NARROWER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#narrower");
}

pub mod dcterms {
    use oxigraph::model::NamedNodeRef;

    pub const TITLE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/title");
    pub const ISSUED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/issued");
    pub const MODIFIED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/modified");
    pub const PUBLISHER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/publisher");
    pub const LICENSE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/license");
}

pub mod sdmx {
    use oxigraph::model::NamedNodeRef;

    pub const REF_AREA: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/sdmx/2009/concept#refArea");
    pub const OBS_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/linked-data/sdmx/2009/measure#obsValue");
}

/// Parse an IRI, mapping the failure into a `CubeError`.
pub fn named_node(iri: impl Into<String>) -> CubeResult<NamedNode> {
    let iri = iri.into();
    NamedNode::new(iri.clone()).map_err(|e| CubeError::Iri {
        iri,
        reason: e.to_string(),
    })
}

/// Base IRIs for the ontology terms (dimension/measure properties, concept
/// types) and for minted resources (dataset, observations, concepts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    ontology: String,
    resources: String,
}

impl Namespaces {
    pub fn new(ontology: impl Into<String>, resources: impl Into<String>) -> CubeResult<Self> {
        let namespaces = Self {
            ontology: ontology.into(),
            resources: resources.into(),
        };
        // Both bases must form valid IRIs once a local name is appended.
        namespaces.term("sample")?;
        namespaces.resource("sample")?;
        Ok(namespaces)
    }

    pub fn ontology_base(&self) -> &str {
        &self.ontology
    }

    pub fn resource_base(&self) -> &str {
        &self.resources
    }

    /// `ontology:<local>`
    pub fn term(&self, local: &str) -> CubeResult<NamedNode> {
        named_node(format!("{}{}", self.ontology, local))
    }

    /// `resources:<local>`
    pub fn resource(&self, local: &str) -> CubeResult<NamedNode> {
        named_node(format!("{}{}", self.resources, local))
    }

    /// Prefix table for Turtle output.
    pub fn prefixes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#".to_string()),
            ("rdfs", "http://www.w3.org/2000/01/rdf-schema#".to_string()),
            ("xsd", "http://www.w3.org/2001/XMLSchema#".to_string()),
            ("qb", QB_NS.to_string()),
            ("skos", SKOS_NS.to_string()),
            ("dcterms", DCTERMS_NS.to_string()),
            ("sdmx-concept", SDMX_CONCEPT_NS.to_string()),
            ("sdmx-measure", SDMX_MEASURE_NS.to_string()),
            ("ontology", self.ontology.clone()),
            ("resource", self.resources.clone()),
        ]
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            ontology: DEFAULT_ONTOLOGY_BASE.to_string(),
            resources: DEFAULT_RESOURCE_BASE.to_string(),
        }
    }
}

/// Owned copy of a constant vocabulary term.
pub fn owned(node: NamedNodeRef<'_>) -> NamedNode {
    node.into_owned()
}
