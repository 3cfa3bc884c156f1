//! SKOS vocabulary of the administrative geography
//!
//! One concept scheme per level (regions, counties) below the EuroVoc
//! "geographical distribution of the population" scheme. Concept IRIs are
//! derived through [`normalize`], so they are the very resources the cube
//! observations point at.

use crate::cube::assembler::CubeGraph;
use crate::cube::codes::{CodeMap, LabelIndex};
use crate::cube::resources::normalize;
use crate::error::CubeResult;
use crate::model::lang_literal;
use crate::vocab::{Namespaces, named_node, rdf, skos};
use indexmap::IndexSet;
use oxigraph::model::{Literal, NamedNode, Triple};

pub const GEOGRAPHY_SCHEME: &str = "http://eurovoc.europa.eu/3300";
pub const GEOGRAPHY_NOTATION: &str = "3300";

const REGION_SCHEME: &str = "regions";
const COUNTY_SCHEME: &str = "counties";

/// Build the geographic hierarchy from the county -> region code map.
///
/// Regions are the top concepts of the region scheme; counties live in the
/// county scheme and point at their region through `skos:broader`. Missing
/// labels fall back to the code.
pub fn build_hierarchy(
    code_map: &CodeMap,
    county_labels: &LabelIndex,
    region_labels: &LabelIndex,
    namespaces: &Namespaces,
    language: &str,
) -> CubeResult<CubeGraph> {
    let top = named_node(GEOGRAPHY_SCHEME)?;
    let region_scheme = namespaces.term(REGION_SCHEME)?;
    let county_scheme = namespaces.term(COUNTY_SCHEME)?;

    let mut graph = CubeGraph::new();
    graph.extend([
        Triple::new(top.clone(), rdf::TYPE, skos::CONCEPT_SCHEME),
        Triple::new(
            top.clone(),
            skos::PREF_LABEL,
            lang_literal("geographical distribution of the population", "en")?,
        ),
        Triple::new(
            top.clone(),
            skos::NOTATION,
            Literal::new_simple_literal(GEOGRAPHY_NOTATION),
        ),
    ]);
    graph.extend(sub_scheme(&top, &region_scheme, "Kraj", "Region")?);
    graph.extend(sub_scheme(&top, &county_scheme, "Okres", "County")?);

    let regions: IndexSet<&str> = code_map.iter().map(|(_, region)| region).collect();
    for region in regions.iter().copied() {
        let node = concept_node(namespaces, region)?;
        let label = region_labels.get(region).unwrap_or(region);
        graph.extend(concept(&node, label, region, &region_scheme, language)?);
        graph.extend([
            Triple::new(region_scheme.clone(), skos::HAS_TOP_CONCEPT, node.clone()),
            Triple::new(node, skos::TOP_CONCEPT_OF, region_scheme.clone()),
        ]);
    }

    for (county, region) in code_map.iter() {
        let node = concept_node(namespaces, county)?;
        let parent = concept_node(namespaces, region)?;
        let label = county_labels.get(county).unwrap_or(county);
        graph.extend(concept(&node, label, county, &county_scheme, language)?);
        graph.extend([
            Triple::new(node.clone(), skos::BROADER, parent.clone()),
            Triple::new(parent, skos::NARROWER, node),
        ]);
    }

    tracing::info!(
        regions = regions.len(),
        counties = code_map.len(),
        triples = graph.len(),
        "geographic hierarchy built"
    );
    Ok(graph)
}

fn concept_node(namespaces: &Namespaces, code: &str) -> CubeResult<NamedNode> {
    namespaces.resource(normalize(code)?.as_str())
}

fn sub_scheme(top: &NamedNode, scheme: &NamedNode, cs: &str, en: &str) -> CubeResult<Vec<Triple>> {
    Ok(vec![
        Triple::new(scheme.clone(), rdf::TYPE, skos::CONCEPT_SCHEME),
        Triple::new(scheme.clone(), skos::IN_SCHEME, top.clone()),
        Triple::new(scheme.clone(), skos::PREF_LABEL, lang_literal(cs, "cs")?),
        Triple::new(scheme.clone(), skos::PREF_LABEL, lang_literal(en, "en")?),
        Triple::new(top.clone(), skos::HAS_TOP_CONCEPT, scheme.clone()),
    ])
}

fn concept(
    node: &NamedNode,
    label: &str,
    code: &str,
    scheme: &NamedNode,
    language: &str,
) -> CubeResult<Vec<Triple>> {
    Ok(vec![
        Triple::new(node.clone(), rdf::TYPE, skos::CONCEPT),
        Triple::new(node.clone(), skos::PREF_LABEL, lang_literal(label, language)?),
        Triple::new(node.clone(), skos::NOTATION, Literal::new_simple_literal(code)),
        Triple::new(node.clone(), skos::IN_SCHEME, scheme.clone()),
    ])
}
