//! Resource normalization and deduplicated concept declarations
//!
//! `normalize` is the single place where raw labels become resource keys. The
//! `ResourceRegistry` holds at most one declaration per `(key, kind)`; a later
//! declaration with a different label is discarded and the first label is kept.
//! Code maps do the opposite (last parent wins): a resource's identity has to
//! stay singular while sibling tables may spell its label differently.

use crate::cube::definition::ConceptKind;
use crate::error::{CubeError, CubeResult};
use crate::model::lang_literal;
use crate::vocab::{Namespaces, rdf, skos};
use indexmap::IndexMap;
use indexmap::map::Entry;
use oxigraph::model::{Literal, NamedNode, Triple};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ResourceKey
// ============================================================================

const JOINER: char = '_';

/// Normalized, IRI-safe identity of one concept value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Characters that separate words or cannot appear in an IRI path segment.
///
/// Everything outside RFC 3987 `ipchar` is a separator, as are `_` (the
/// joiner itself) and `%` (only valid as part of an escape).
fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == JOINER || !is_segment_char(c)
}

/// `ipchar` without percent escapes.
fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '='
                | ':' | '@'
        )
        || is_ucschar(c)
}

fn is_ucschar(c: char) -> bool {
    let c = u32::from(c);
    matches!(c, 0xA0..=0xD7FF | 0xF900..=0xFDCF | 0xFDF0..=0xFFEF | 0xE1000..=0xEFFFD)
        || ((0x1_0000..=0xD_FFFF).contains(&c) && (c & 0xFFFF) <= 0xFFFD)
}

/// Derive the resource key of a raw label.
///
/// Trims, collapses separator runs into a single `_`, drops separators next
/// to a comma (`"a, b"` -> `"a,b"`) and lower-cases. Idempotent. Labels made
/// only of separators are rejected with `InvalidLabel`.
pub fn normalize(raw: &str) -> CubeResult<ResourceKey> {
    let mut key = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.chars() {
        if is_separator(c) {
            pending_separator = true;
            continue;
        }
        if pending_separator && !key.is_empty() && c != ',' && !key.ends_with(',') {
            key.push(JOINER);
        }
        pending_separator = false;
        key.extend(c.to_lowercase());
    }

    if key.is_empty() {
        return Err(CubeError::InvalidLabel {
            label: raw.to_string(),
            row: None,
        });
    }
    Ok(ResourceKey(key))
}

// ============================================================================
// ResourceRegistry
// ============================================================================

/// One concept declaration: `<node> a ontology:<Kind> ; skos:prefLabel "..."@lang`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDeclaration {
    pub key: ResourceKey,
    pub kind: ConceptKind,
    pub node: NamedNode,
    pub label: Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    /// First declaration of this `(key, kind)`.
    New,
    /// Same key declared again with the same label.
    Repeated,
    /// Same key declared again with a different label, which was dropped.
    LabelDiscarded,
}

/// Memoized concept declarations for one run, in first-declaration order.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    namespaces: Namespaces,
    declarations: IndexMap<(ResourceKey, ConceptKind), ResourceDeclaration>,
    discarded_labels: usize,
}

impl ResourceRegistry {
    pub fn new(namespaces: Namespaces) -> Self {
        Self {
            namespaces,
            declarations: IndexMap::new(),
            discarded_labels: 0,
        }
    }

    /// Declare a concept. Idempotent per `(key, kind)`; the first label wins.
    pub fn declare(
        &mut self,
        key: &ResourceKey,
        kind: ConceptKind,
        label: &str,
        language: &str,
    ) -> CubeResult<Declared> {
        match self.declarations.entry((key.clone(), kind)) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                let same_language = existing
                    .label
                    .language()
                    .is_some_and(|tag| tag.eq_ignore_ascii_case(language));
                if existing.label.value() == label && same_language {
                    return Ok(Declared::Repeated);
                }
                tracing::warn!(
                    key = %key,
                    kind = %kind,
                    kept = existing.label.value(),
                    discarded = label,
                    "resource already declared with another label"
                );
                self.discarded_labels += 1;
                Ok(Declared::LabelDiscarded)
            }
            Entry::Vacant(entry) => {
                let node = self.namespaces.resource(key.as_str())?;
                let label = lang_literal(label, language)?;
                tracing::trace!(key = %key, kind = %kind, "resource declared");
                entry.insert(ResourceDeclaration {
                    key: key.clone(),
                    kind,
                    node,
                    label,
                });
                Ok(Declared::New)
            }
        }
    }

    pub fn get(&self, key: &ResourceKey, kind: ConceptKind) -> Option<&ResourceDeclaration> {
        self.declarations.get(&(key.clone(), kind))
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn discarded_labels(&self) -> usize {
        self.discarded_labels
    }

    /// Declaration triples, in first-declaration order.
    pub fn triples(&self) -> CubeResult<Vec<Triple>> {
        let mut triples = Vec::with_capacity(self.declarations.len() * 2);
        for declaration in self.declarations.values() {
            let class = self.namespaces.term(declaration.kind.as_ref())?;
            triples.push(Triple::new(declaration.node.clone(), rdf::TYPE, class));
            triples.push(Triple::new(
                declaration.node.clone(),
                skos::PREF_LABEL,
                declaration.label.clone(),
            ));
        }
        Ok(triples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_normalize_collapses_and_folds() {
        assert_eq!(normalize(" North  County ").unwrap().as_str(), "north_county");
        assert_eq!(normalize("north_county").unwrap().as_str(), "north_county");
        assert_eq!(normalize("CZ0100").unwrap().as_str(), "cz0100");
        assert_eq!(
            normalize("Hlavní město Praha").unwrap().as_str(),
            "hlavní_město_praha"
        );
    }

    #[test]
    fn test_normalize_joins_around_commas() {
        assert_eq!(
            normalize("chirurgie, ortopedie").unwrap().as_str(),
            "chirurgie,ortopedie"
        );
        assert_eq!(normalize("a ,b").unwrap().as_str(), "a,b");
    }

    #[test]
    fn test_normalize_replaces_iri_unsafe_characters() {
        assert_eq!(normalize("a/b <c>").unwrap().as_str(), "a_b_c");
        assert_eq!(
            normalize("chirurgie [dětská]").unwrap().as_str(),
            "chirurgie_dětská"
        );
        assert_eq!(normalize("a\u{E000}b").unwrap().as_str(), "a_b");
        assert_eq!(normalize("a\u{FFFE}b\u{1FFFF}").unwrap().as_str(), "a_b");
    }

    #[test]
    fn test_bracketed_label_declares_a_valid_resource() {
        let mut registry = ResourceRegistry::new(Namespaces::default());
        let key = normalize("chirurgie [dětská]").unwrap();
        registry
            .declare(&key, ConceptKind::FieldOfCare, "chirurgie [dětská]", "cs")
            .unwrap();
        assert_eq!(
            registry.get(&key, ConceptKind::FieldOfCare).unwrap().node.as_str(),
            "https://data.statcube.dev/resources/chirurgie_dětská"
        );
    }

    #[test]
    fn test_blank_labels_are_invalid() {
        for raw in ["", "   ", "\t\n", " _ "] {
            assert_matches!(normalize(raw), Err(CubeError::InvalidLabel { .. }), "{raw:?}");
        }
    }

    #[test]
    fn test_declare_is_idempotent_and_keeps_first_label() {
        let mut registry = ResourceRegistry::new(Namespaces::default());
        let key = normalize(" North  County ").unwrap();

        assert_eq!(
            registry.declare(&key, ConceptKind::County, "North County", "cs").unwrap(),
            Declared::New
        );
        assert_eq!(
            registry.declare(&key, ConceptKind::County, "North County", "cs").unwrap(),
            Declared::Repeated
        );
        assert_eq!(
            registry.declare(&key, ConceptKind::County, "north county", "cs").unwrap(),
            Declared::LabelDiscarded
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.discarded_labels(), 1);
        let declaration = registry.get(&key, ConceptKind::County).unwrap();
        assert_eq!(declaration.label.value(), "North County");
        assert_eq!(registry.triples().unwrap().len(), 2);
    }

    #[test]
    fn test_same_key_different_kind_is_separate() {
        let mut registry = ResourceRegistry::new(Namespaces::default());
        let key = normalize("X").unwrap();
        registry.declare(&key, ConceptKind::County, "X", "cs").unwrap();
        registry.declare(&key, ConceptKind::FieldOfCare, "X", "cs").unwrap();
        assert_eq!(registry.len(), 2);
    }
}
