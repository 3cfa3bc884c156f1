//! Data Cube domain model
//!
//! Schema resources (`Dimension`, `Measure`, `StructureDefinition`), the
//! cube-level `Dataset` and per-row `Observation`s. Every type can render its
//! own triples; the assembler only concatenates them.

use crate::error::{CubeError, CubeResult};
use crate::vocab::{dcterms, owned, qb, rdf, rdfs, sdmx, xsd};
use chrono::NaiveDate;
use oxigraph::model::{BlankNode, Literal, NamedNode, Triple};
use std::fmt;

// ============================================================================
// Labels and ranges
// ============================================================================

/// Language-tagged literal, validated at construction.
pub fn lang_literal(text: &str, language: &str) -> CubeResult<Literal> {
    Literal::new_language_tagged_literal(text, language).map_err(|e| CubeError::LanguageTag {
        tag: language.to_string(),
        reason: e.to_string(),
    })
}

/// Value range marker of a component property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueRange {
    String,
    Integer,
}

impl ValueRange {
    pub fn datatype(self) -> NamedNode {
        match self {
            ValueRange::String => owned(xsd::STRING),
            ValueRange::Integer => owned(xsd::INTEGER),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueRange::Integer)
    }
}

// ============================================================================
// Schema resources
// ============================================================================

/// A classifying axis of the cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub property: NamedNode,
    pub labels: Vec<Literal>,
    pub range: ValueRange,
    /// SDMX concept the dimension refines, if any.
    pub concept: Option<NamedNode>,
    /// Values are drawn from a code list.
    pub coded: bool,
}

impl Dimension {
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = vec![
            Triple::new(self.property.clone(), rdf::TYPE, owned(rdf::PROPERTY)),
            Triple::new(self.property.clone(), rdf::TYPE, owned(qb::DIMENSION_PROPERTY)),
        ];
        if self.coded {
            triples.push(Triple::new(
                self.property.clone(),
                rdf::TYPE,
                owned(qb::CODED_PROPERTY),
            ));
        }
        for label in &self.labels {
            triples.push(Triple::new(self.property.clone(), rdfs::LABEL, label.clone()));
        }
        triples.push(Triple::new(
            self.property.clone(),
            rdfs::RANGE,
            self.range.datatype(),
        ));
        if let Some(concept) = &self.concept {
            triples.push(Triple::new(
                self.property.clone(),
                qb::CONCEPT,
                concept.clone(),
            ));
        }
        triples
    }
}

/// The quantitative axis of the cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub property: NamedNode,
    pub labels: Vec<Literal>,
    pub range: ValueRange,
}

impl Measure {
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = vec![
            Triple::new(self.property.clone(), rdf::TYPE, owned(rdf::PROPERTY)),
            Triple::new(self.property.clone(), rdf::TYPE, owned(qb::MEASURE_PROPERTY)),
        ];
        for label in &self.labels {
            triples.push(Triple::new(self.property.clone(), rdfs::LABEL, label.clone()));
        }
        triples.push(Triple::new(
            self.property.clone(),
            rdfs::RANGE,
            self.range.datatype(),
        ));
        triples.push(Triple::new(
            self.property.clone(),
            rdfs::SUB_PROPERTY_OF,
            owned(sdmx::OBS_VALUE),
        ));
        triples
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentProperty {
    Dimension(NamedNode),
    Measure(NamedNode),
}

/// One structure component, wrapping exactly one dimension or measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub node: BlankNode,
    pub order: u32,
    pub property: ComponentProperty,
}

/// Ordered component list: dimensions first, then measures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureDefinition {
    pub node: NamedNode,
    pub components: Vec<Component>,
}

impl StructureDefinition {
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = vec![Triple::new(
            self.node.clone(),
            rdf::TYPE,
            owned(qb::DATA_STRUCTURE_DEFINITION),
        )];
        for component in &self.components {
            triples.push(Triple::new(
                self.node.clone(),
                qb::COMPONENT,
                component.node.clone(),
            ));
            let (predicate, property) = match &component.property {
                ComponentProperty::Dimension(property) => (qb::DIMENSION, property),
                ComponentProperty::Measure(property) => (qb::MEASURE, property),
            };
            triples.push(Triple::new(
                component.node.clone(),
                predicate,
                property.clone(),
            ));
            triples.push(Triple::new(
                component.node.clone(),
                qb::ORDER,
                Literal::from(i64::from(component.order)),
            ));
        }
        triples
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Dataset-level metadata supplied by the caller. Dates are wall-clock values
/// chosen at build time, not domain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMetadata {
    pub titles: Vec<Literal>,
    pub issued: NaiveDate,
    pub modified: NaiveDate,
    pub publisher: NamedNode,
    pub license: NamedNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub node: NamedNode,
    pub structure: NamedNode,
    pub metadata: DatasetMetadata,
}

fn date_literal(date: NaiveDate) -> Literal {
    Literal::new_typed_literal(date.format("%Y-%m-%d").to_string(), xsd::DATE)
}

impl Dataset {
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = vec![Triple::new(
            self.node.clone(),
            rdf::TYPE,
            owned(qb::DATA_SET),
        )];
        for title in &self.metadata.titles {
            triples.push(Triple::new(self.node.clone(), rdfs::LABEL, title.clone()));
            triples.push(Triple::new(self.node.clone(), dcterms::TITLE, title.clone()));
        }
        triples.extend([
            Triple::new(
                self.node.clone(),
                dcterms::ISSUED,
                date_literal(self.metadata.issued),
            ),
            Triple::new(
                self.node.clone(),
                dcterms::MODIFIED,
                date_literal(self.metadata.modified),
            ),
            Triple::new(
                self.node.clone(),
                dcterms::PUBLISHER,
                self.metadata.publisher.clone(),
            ),
            Triple::new(
                self.node.clone(),
                dcterms::LICENSE,
                self.metadata.license.clone(),
            ),
            Triple::new(self.node.clone(), qb::STRUCTURE, self.structure.clone()),
        ]);
        triples
    }
}

// ============================================================================
// Observations
// ============================================================================

/// One fact row: a value for every dimension plus the measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub node: NamedNode,
    pub dataset: NamedNode,
    /// `(dimension property, concept resource)` in structure order.
    pub dimensions: Vec<(NamedNode, NamedNode)>,
    pub measure: NamedNode,
    pub value: i64,
}

impl Observation {
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = vec![
            Triple::new(self.node.clone(), rdf::TYPE, owned(qb::OBSERVATION)),
            Triple::new(
                self.node.clone(),
                qb::DATA_SET_PROPERTY,
                self.dataset.clone(),
            ),
        ];
        for (property, value) in &self.dimensions {
            triples.push(Triple::new(self.node.clone(), property.clone(), value.clone()));
        }
        triples.push(Triple::new(
            self.node.clone(),
            self.measure.clone(),
            Literal::new_typed_literal(self.value.to_string(), xsd::INTEGER),
        ));
        triples
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.node, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::Term;

    fn nn(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    #[test]
    fn test_coded_dimension_carries_extra_type() {
        let dimension = Dimension {
            property: nn("http://example.org/county"),
            labels: vec![lang_literal("County", "en").unwrap()],
            range: ValueRange::String,
            concept: Some(owned(sdmx::REF_AREA)),
            coded: true,
        };
        let triples = dimension.triples();
        assert_eq!(triples.len(), 6);
        assert!(triples.contains(&Triple::new(
            nn("http://example.org/county"),
            rdf::TYPE,
            owned(qb::CODED_PROPERTY)
        )));
    }

    #[test]
    fn test_observation_value_is_typed_integer() {
        let observation = Observation {
            node: nn("http://example.org/obs-0000"),
            dataset: nn("http://example.org/ds"),
            dimensions: vec![(nn("http://example.org/county"), nn("http://example.org/a1"))],
            measure: nn("http://example.org/count"),
            value: 2,
        };
        let triples = observation.triples();
        assert_eq!(triples.len(), 4);
        assert_eq!(
            triples[3].object,
            Term::from(Literal::new_typed_literal("2", xsd::INTEGER))
        );
    }

    #[test]
    fn test_bad_language_tag_is_rejected() {
        assert!(lang_literal("Kraj", "not a tag").is_err());
    }
}
