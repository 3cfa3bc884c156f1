//! Schema building: dimension and measure properties plus the structure
//! definition composing them. Pure and deterministic for a given definition.

use crate::cube::definition::CubeDefinition;
use crate::error::{CubeError, CubeResult};
use crate::model::{
    Component, ComponentProperty, Dimension, Measure, StructureDefinition, ValueRange,
    lang_literal,
};
use crate::vocab::{Namespaces, owned, sdmx};
use oxigraph::model::{BlankNode, Literal, Triple};

/// Schema resources of one cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub dimensions: Vec<Dimension>,
    pub measures: Vec<Measure>,
    pub structure: StructureDefinition,
}

impl Schema {
    /// Build dimensions, measures and the structure in one go.
    pub fn build(definition: &CubeDefinition, namespaces: &Namespaces) -> CubeResult<Self> {
        let dimensions = build_dimensions(definition, namespaces)?;
        let measures = build_measures(definition, namespaces)?;
        let structure = build_structure(definition, namespaces, &dimensions, &measures)?;
        tracing::debug!(
            cube = %definition.kind,
            dimensions = dimensions.len(),
            measures = measures.len(),
            "schema built"
        );
        Ok(Self {
            dimensions,
            measures,
            structure,
        })
    }

    /// Dimension and measure declarations followed by the structure.
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = Vec::new();
        for dimension in &self.dimensions {
            triples.extend(dimension.triples());
        }
        for measure in &self.measures {
            triples.extend(measure.triples());
        }
        triples.extend(self.structure.triples());
        triples
    }
}

fn labels(pairs: &[(&str, &str)]) -> CubeResult<Vec<Literal>> {
    pairs
        .iter()
        .map(|(text, language)| lang_literal(text, language))
        .collect()
}

pub fn build_dimensions(
    definition: &CubeDefinition,
    namespaces: &Namespaces,
) -> CubeResult<Vec<Dimension>> {
    definition
        .dimensions
        .iter()
        .map(|spec| {
            Ok(Dimension {
                property: namespaces.term(spec.id)?,
                labels: labels(&spec.labels)?,
                range: ValueRange::String,
                concept: spec.geographic.then(|| owned(sdmx::REF_AREA)),
                coded: spec.coded,
            })
        })
        .collect()
}

pub fn build_measures(
    definition: &CubeDefinition,
    namespaces: &Namespaces,
) -> CubeResult<Vec<Measure>> {
    definition
        .measures
        .iter()
        .map(|spec| {
            Ok(Measure {
                property: namespaces.term(spec.id)?,
                labels: labels(&spec.labels)?,
                range: ValueRange::Integer,
            })
        })
        .collect()
}

/// One component per dimension, then one per measure. Component nodes get
/// stable blank node ids so rebuilding the schema yields identical triples.
pub fn build_structure(
    definition: &CubeDefinition,
    namespaces: &Namespaces,
    dimensions: &[Dimension],
    measures: &[Measure],
) -> CubeResult<StructureDefinition> {
    if measures.is_empty() {
        return Err(CubeError::malformed(
            definition.slug(),
            "a cube needs at least one measure",
        ));
    }
    if let Some(measure) = measures.iter().find(|m| !m.range.is_numeric()) {
        return Err(CubeError::malformed(
            definition.slug(),
            format!("measure {} must have a numeric range", measure.property),
        ));
    }

    let slug = definition.slug();
    let properties = dimensions
        .iter()
        .map(|d| ComponentProperty::Dimension(d.property.clone()))
        .chain(
            measures
                .iter()
                .map(|m| ComponentProperty::Measure(m.property.clone())),
        );

    let mut components = Vec::with_capacity(dimensions.len() + measures.len());
    for (position, property) in properties.enumerate() {
        let id = format!("{slug}-component-{}", position + 1);
        let node = BlankNode::new(id.clone()).map_err(|e| CubeError::Iri {
            iri: format!("_:{id}"),
            reason: e.to_string(),
        })?;
        components.push(Component {
            node,
            order: u32::try_from(position + 1).unwrap_or(u32::MAX),
            property,
        });
    }

    Ok(StructureDefinition {
        node: namespaces.term(&format!("structure-{slug}"))?,
        components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::definition::CubeKind;

    #[test]
    fn test_dimensions_precede_measures() {
        let ns = Namespaces::default();
        let schema = Schema::build(&CubeDefinition::care_providers(), &ns).unwrap();
        let kinds: Vec<bool> = schema
            .structure
            .components
            .iter()
            .map(|c| matches!(c.property, ComponentProperty::Dimension(_)))
            .collect();
        assert_eq!(kinds, vec![true, true, true, false]);
        assert_eq!(schema.structure.components[3].order, 4);
    }

    #[test]
    fn test_schema_build_is_deterministic() {
        let ns = Namespaces::default();
        for kind in [CubeKind::CareProviders, CubeKind::Population] {
            let definition = CubeDefinition::for_kind(kind);
            let first = Schema::build(&definition, &ns).unwrap();
            let second = Schema::build(&definition, &ns).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.triples(), second.triples());
        }
    }

    #[test]
    fn test_geographic_dimensions_refine_ref_area() {
        let ns = Namespaces::default();
        let dimensions = build_dimensions(&CubeDefinition::care_providers(), &ns).unwrap();
        assert!(dimensions[0].concept.is_some());
        assert!(dimensions[1].concept.is_some());
        assert!(dimensions[2].concept.is_none());
    }

    #[test]
    fn test_structure_requires_a_measure() {
        let ns = Namespaces::default();
        let definition = CubeDefinition::care_providers();
        let dimensions = build_dimensions(&definition, &ns).unwrap();
        assert!(build_structure(&definition, &ns, &dimensions, &[]).is_err());
    }
}
