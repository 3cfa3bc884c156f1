//! Cube assembly and Turtle serialization
//!
//! A `CubeGraph` is an insertion-ordered set of triples. Inserting the same
//! triple twice keeps its first position, so merging graphs that share
//! resource declarations stays duplicate-free and the output order is stable
//! across runs.

use crate::cube::resources::ResourceRegistry;
use crate::cube::schema::Schema;
use crate::error::{CubeError, CubeResult};
use crate::model::{Dataset, Observation};
use crate::vocab::Namespaces;
use indexmap::IndexSet;
use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::Triple;
use std::io::Write;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CubeGraph {
    triples: IndexSet<Triple>,
}

impl CubeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the triple was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Append every triple of `other` that is not present yet.
    pub fn merge(&mut self, other: CubeGraph) {
        self.triples.extend(other.triples);
    }
}

impl Extend<Triple> for CubeGraph {
    fn extend<T: IntoIterator<Item = Triple>>(&mut self, iter: T) {
        self.triples.extend(iter);
    }
}

impl FromIterator<Triple> for CubeGraph {
    fn from_iter<T: IntoIterator<Item = Triple>>(iter: T) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CubeGraph {
    type Item = Triple;
    type IntoIter = indexmap::set::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

/// Union of schema, dataset, resource declarations and observations, in that
/// order.
pub fn assemble(
    schema: &Schema,
    dataset: &Dataset,
    registry: &ResourceRegistry,
    observations: &[Observation],
) -> CubeResult<CubeGraph> {
    let mut graph = CubeGraph::new();
    graph.extend(schema.triples());
    graph.extend(dataset.triples());
    graph.extend(registry.triples()?);
    for observation in observations {
        graph.extend(observation.triples());
    }

    tracing::debug!(
        triples = graph.len(),
        resources = registry.len(),
        observations = observations.len(),
        "cube assembled"
    );
    Ok(graph)
}

/// Serialize `graph` as Turtle, declaring the prefixes of `namespaces`.
/// Returns the writer so callers can flush or inspect it.
pub fn write_turtle<W: Write>(
    graph: &CubeGraph,
    namespaces: &Namespaces,
    writer: W,
) -> CubeResult<W> {
    let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle);
    for (prefix, iri) in namespaces.prefixes() {
        serializer = serializer
            .with_prefix(prefix, iri.as_str())
            .map_err(|e| CubeError::Iri {
                iri,
                reason: e.to_string(),
            })?;
    }

    let mut writer = serializer.for_writer(writer);
    for triple in graph.iter() {
        writer
            .serialize_triple(triple)
            .map_err(CubeError::Serialization)?;
    }
    writer.finish().map_err(CubeError::Serialization)
}

/// Turtle document of `graph` as a string.
pub fn to_turtle(graph: &CubeGraph, namespaces: &Namespaces) -> CubeResult<String> {
    let bytes = write_turtle(graph, namespaces, Vec::new())?;
    String::from_utf8(bytes).map_err(|e| {
        CubeError::Serialization(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
