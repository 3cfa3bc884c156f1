//! Cross-dataset code resolution
//!
//! A `CodeMap` maps a low-level geographic code to its parent code and is
//! built once from a cross-reference table. It is read-only afterwards and
//! lookups of unknown codes are hard failures.
//!
//! Conflict policy: when the cross-reference lists different parents for the
//! same child, the last row wins. Label indexes keep the first label instead,
//! matching the resource registry.

use crate::cube::definition::{CodeMapId, LabelSetId};
use crate::error::{CubeError, CubeResult};
use crate::table::{Table, cell};
use indexmap::IndexMap;
use std::collections::HashMap;

// ============================================================================
// CodeMap
// ============================================================================

/// Child code -> parent code, in first-seen child order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMap {
    name: String,
    entries: IndexMap<String, String>,
    conflicts: usize,
}

impl CodeMap {
    /// Build from a cross-reference table. Rows with a missing value in either
    /// column are discarded; duplicate rows collapse.
    pub fn build(
        name: impl Into<String>,
        table: &Table,
        child_column: &str,
        parent_column: &str,
    ) -> CubeResult<Self> {
        let columns = table.columns(&[child_column, parent_column])?;
        let (child, parent) = (columns[0], columns[1]);

        let pairs = table.rows().filter_map(|record| {
            let child = cell(record, child)?;
            let parent = cell(record, parent)?;
            Some((child, parent))
        });
        let map = Self::from_pairs(name, pairs);

        tracing::info!(
            code_map = %map.name,
            table = table.name(),
            entries = map.len(),
            conflicts = map.conflicts,
            "code map built"
        );
        Ok(map)
    }

    pub fn from_pairs<C, P>(name: impl Into<String>, pairs: impl IntoIterator<Item = (C, P)>) -> Self
    where
        C: Into<String>,
        P: Into<String>,
    {
        let mut map = Self {
            name: name.into(),
            entries: IndexMap::new(),
            conflicts: 0,
        };
        for (child, parent) in pairs {
            map.insert(child.into(), parent.into());
        }
        map
    }

    fn insert(&mut self, child: String, parent: String) {
        match self.entries.get_mut(&child) {
            Some(existing) if *existing != parent => {
                tracing::warn!(
                    code_map = %self.name,
                    child = %child,
                    previous = %existing,
                    parent = %parent,
                    "conflicting parent codes; keeping the last one"
                );
                *existing = parent;
                self.conflicts += 1;
            }
            Some(_) => {}
            None => {
                self.entries.insert(child, parent);
            }
        }
    }

    /// Parent of `child`, or `UnresolvedCode`.
    pub fn resolve(&self, child: &str) -> CubeResult<&str> {
        self.entries
            .get(child)
            .map(String::as_str)
            .ok_or_else(|| CubeError::UnresolvedCode {
                code: child.to_string(),
                map: self.name.clone(),
                row: None,
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows that overwrote an earlier, different parent.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(child, parent)| (child.as_str(), parent.as_str()))
    }
}

// ============================================================================
// LabelIndex
// ============================================================================

/// Code -> human-readable label, first label wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelIndex {
    labels: IndexMap<String, String>,
}

impl LabelIndex {
    pub fn build(table: &Table, code_column: &str, label_column: &str) -> CubeResult<Self> {
        let columns = table.columns(&[code_column, label_column])?;
        let (code, label) = (columns[0], columns[1]);
        let pairs = table.rows().filter_map(|record| {
            let code = cell(record, code)?;
            let label = cell(record, label)?;
            Some((code, label))
        });
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs<C, L>(pairs: impl IntoIterator<Item = (C, L)>) -> Self
    where
        C: Into<String>,
        L: Into<String>,
    {
        let mut labels = IndexMap::new();
        for (code, label) in pairs {
            labels.entry(code.into()).or_insert_with(|| label.into());
        }
        Self { labels }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// All code maps and label indexes available to one cube run. Built before
/// observation generation and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    code_maps: HashMap<CodeMapId, CodeMap>,
    labels: HashMap<LabelSetId, LabelIndex>,
}

impl Lookups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code_map(mut self, id: CodeMapId, map: CodeMap) -> Self {
        self.code_maps.insert(id, map);
        self
    }

    pub fn with_labels(mut self, id: LabelSetId, labels: LabelIndex) -> Self {
        self.labels.insert(id, labels);
        self
    }

    pub fn code_map(&self, id: CodeMapId) -> CubeResult<&CodeMap> {
        self.code_maps
            .get(&id)
            .ok_or_else(|| CubeError::malformed(id.as_ref(), "code map was not loaded"))
    }

    /// Resolve `code` through the map registered as `id`.
    pub fn resolve(&self, id: CodeMapId, code: &str) -> CubeResult<&str> {
        self.code_map(id)?.resolve(code)
    }

    pub fn labels(&self, id: LabelSetId) -> Option<&LabelIndex> {
        self.labels.get(&id)
    }
}
