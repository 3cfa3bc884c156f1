//! Observation generation
//!
//! Works in three passes so that a failing row never leaves a partial cube:
//!
//! ```text
//! select   raw rows -> filtered groups (aggregate: count per raw key,
//!                                       pass-through: one group per row)
//! resolve  group    -> resolved codes, keys, IRIs, labels     (may fail)
//! emit     resolved -> resource declarations + Observation
//! ```
//!
//! Selection also validates measure values and the running total, so every
//! source error surfaces before the registry is touched.
//!
//! Grouping uses exact equality of the raw dimension cells. Normalization is
//! only applied when the resource reference is produced. Observation ids are a
//! zero-padded counter over the emitted order, which is the sorted group key
//! order in aggregate mode and the filtered row order in pass-through mode.

use crate::cube::codes::Lookups;
use crate::cube::definition::{
    ColumnFilter, CubeDefinition, DimensionSpec, LabelSource, MeasureMode, ValueSource,
};
use crate::cube::resources::{ResourceKey, ResourceRegistry, normalize};
use crate::error::{CubeError, CubeResult};
use crate::model::{Dataset, Observation};
use crate::table::{Record, Table, cell};
use crate::vocab::Namespaces;
use oxigraph::model::NamedNode;
use std::collections::BTreeMap;

const ID_WIDTH: usize = 4;

/// Inputs shared by every generated observation.
pub struct GenerationContext<'a> {
    pub definition: &'a CubeDefinition,
    pub namespaces: &'a Namespaces,
    pub lookups: &'a Lookups,
    /// Language of resource labels taken from source data.
    pub label_language: &'a str,
}

/// Counters reported after a generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub rows_read: usize,
    pub rows_filtered_out: usize,
    pub rows_missing_values: usize,
    pub observations: usize,
    pub measure_total: i64,
}

/// A selected group: raw cells of its first row plus the measure value.
#[derive(Debug, Clone)]
struct Group<'t> {
    first_row: usize,
    record: &'t Record,
    value: i64,
}

#[derive(Debug, Clone)]
struct ResolvedValue {
    key: ResourceKey,
    node: NamedNode,
    label: String,
}

#[derive(Debug, Clone)]
struct ResolvedGroup {
    values: Vec<ResolvedValue>,
    value: i64,
}

/// Generate all observations of `dataset` from `table`.
///
/// Every dimension value is resolved before anything is declared, so an
/// `UnresolvedCode` or `InvalidLabel` leaves `registry` untouched.
pub fn generate(
    context: &GenerationContext<'_>,
    dataset: &Dataset,
    table: &Table,
    registry: &mut ResourceRegistry,
) -> CubeResult<(Vec<Observation>, GenerationStats)> {
    let definition = context.definition;
    table.require(&definition.required_columns())?;
    let measure = definition.primary_measure().ok_or_else(|| {
        CubeError::malformed(definition.slug(), "cube definition has no measure")
    })?;

    let mut stats = GenerationStats {
        rows_read: table.len(),
        ..GenerationStats::default()
    };

    let groups = match &measure.mode {
        MeasureMode::Aggregate => select_aggregate(definition, table, &mut stats)?,
        MeasureMode::PassThrough { column } => {
            select_pass_through(definition, table, column, &mut stats)?
        }
    };

    let resolved = groups
        .iter()
        .map(|group| resolve_group(context, table, group))
        .collect::<CubeResult<Vec<_>>>()?;

    let measure_property = context.namespaces.term(measure.id)?;
    let dimension_properties = definition
        .dimensions
        .iter()
        .map(|spec| context.namespaces.term(spec.id))
        .collect::<CubeResult<Vec<_>>>()?;

    let mut observations = Vec::with_capacity(resolved.len());
    for (sequence, group) in resolved.into_iter().enumerate() {
        let mut dimensions = Vec::with_capacity(group.values.len());
        for ((spec, property), value) in definition
            .dimensions
            .iter()
            .zip(&dimension_properties)
            .zip(&group.values)
        {
            registry.declare(&value.key, spec.concept, &value.label, context.label_language)?;
            dimensions.push((property.clone(), value.node.clone()));
        }

        let observation = Observation {
            node: observation_node(context.namespaces, definition, sequence)?,
            dataset: dataset.node.clone(),
            dimensions,
            measure: measure_property.clone(),
            value: group.value,
        };
        tracing::trace!(observation = %observation, "observation emitted");
        observations.push(observation);
    }
    stats.observations = observations.len();

    tracing::info!(
        cube = %definition.kind,
        rows = stats.rows_read,
        filtered_out = stats.rows_filtered_out,
        missing_values = stats.rows_missing_values,
        observations = stats.observations,
        measure_total = stats.measure_total,
        "observations generated"
    );
    Ok((observations, stats))
}

/// `resource:<cube>/observation-0000`
pub fn observation_node(
    namespaces: &Namespaces,
    definition: &CubeDefinition,
    sequence: usize,
) -> CubeResult<NamedNode> {
    namespaces.resource(&format!(
        "{}/observation-{:0width$}",
        definition.slug(),
        sequence,
        width = ID_WIDTH
    ))
}

// ============================================================================
// Selection
// ============================================================================

struct FilterColumns {
    filters: Vec<(usize, &'static str)>,
}

impl FilterColumns {
    fn new(filters: &[ColumnFilter], table: &Table) -> CubeResult<Self> {
        let filters = filters
            .iter()
            .map(|filter| Ok((table.column(filter.column)?, filter.equals)))
            .collect::<CubeResult<Vec<_>>>()?;
        Ok(Self { filters })
    }

    /// Missing cells never match.
    fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| cell(record, *column) == Some(*expected))
    }
}

/// Raw cells of the grouping columns, or `None` if any is missing.
fn grouping_key(record: &Record, columns: &[usize]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| cell(record, *column).map(str::to_string))
        .collect()
}

fn select_aggregate<'t>(
    definition: &CubeDefinition,
    table: &'t Table,
    stats: &mut GenerationStats,
) -> CubeResult<Vec<Group<'t>>> {
    let filters = FilterColumns::new(&definition.filters, table)?;
    let key_columns = table.columns(&definition.grouping_columns())?;

    // Sorted by raw key, so the emitted order does not depend on row order.
    let mut groups: BTreeMap<Vec<String>, Group<'t>> = BTreeMap::new();
    for (index, record) in table.rows().enumerate() {
        if !filters.matches(record) {
            stats.rows_filtered_out += 1;
            continue;
        }
        let Some(key) = grouping_key(record, &key_columns) else {
            stats.rows_missing_values += 1;
            tracing::debug!(row = index, "row skipped: missing grouping value");
            continue;
        };
        stats.measure_total += 1;
        groups
            .entry(key)
            .and_modify(|group| group.value += 1)
            .or_insert(Group {
                first_row: index,
                record,
                value: 1,
            });
    }

    if stats.rows_missing_values > 0 {
        tracing::warn!(
            cube = %definition.kind,
            skipped = stats.rows_missing_values,
            "rows without a complete grouping key were skipped"
        );
    }
    Ok(groups.into_values().collect())
}

fn select_pass_through<'t>(
    definition: &CubeDefinition,
    table: &'t Table,
    measure_column: &str,
    stats: &mut GenerationStats,
) -> CubeResult<Vec<Group<'t>>> {
    let filters = FilterColumns::new(&definition.filters, table)?;
    let key_columns = table.columns(&definition.grouping_columns())?;
    let measure = table.column(measure_column)?;

    let mut groups = Vec::new();
    for (index, record) in table.rows().enumerate() {
        if !filters.matches(record) {
            stats.rows_filtered_out += 1;
            continue;
        }
        if grouping_key(record, &key_columns).is_none() {
            stats.rows_missing_values += 1;
            tracing::debug!(row = index, "row skipped: missing dimension value");
            continue;
        }
        let value = parse_measure(table, record, measure, measure_column, index)?;
        stats.measure_total = stats.measure_total.checked_add(value).ok_or_else(|| {
            CubeError::malformed(
                table.name(),
                format!("row {index}: measure total overflows after adding {value}"),
            )
        })?;
        groups.push(Group {
            first_row: index,
            record,
            value,
        });
    }
    Ok(groups)
}

fn parse_measure(
    table: &Table,
    record: &Record,
    column: usize,
    column_name: &str,
    row: usize,
) -> CubeResult<i64> {
    let raw = cell(record, column).ok_or_else(|| {
        CubeError::malformed(
            table.name(),
            format!("row {row}: missing measure value in column {column_name}"),
        )
    })?;
    let value = raw.parse::<i64>().map_err(|_| {
        CubeError::malformed(
            table.name(),
            format!("row {row}: measure value {raw:?} in column {column_name} is not an integer"),
        )
    })?;
    if value < 0 {
        return Err(CubeError::malformed(
            table.name(),
            format!("row {row}: measure value {value} in column {column_name} is negative"),
        ));
    }
    Ok(value)
}

// ============================================================================
// Resolution
// ============================================================================

fn resolve_group(
    context: &GenerationContext<'_>,
    table: &Table,
    group: &Group<'_>,
) -> CubeResult<ResolvedGroup> {
    let row = group.first_row;
    let mut codes: Vec<(&'static str, String)> = Vec::with_capacity(context.definition.dimensions.len());
    let mut values = Vec::with_capacity(context.definition.dimensions.len());

    for spec in &context.definition.dimensions {
        let code = resolve_code(context, table, group.record, spec, &codes)
            .map_err(|e| e.at_row(row))?;
        let key = normalize(&code).map_err(|e| e.at_row(row))?;
        let node = context.namespaces.resource(key.as_str())?;
        let label = resolve_label(context, table, group.record, spec, &code)?;
        values.push(ResolvedValue { key, node, label });
        codes.push((spec.id, code));
    }

    Ok(ResolvedGroup {
        values,
        value: group.value,
    })
}

fn resolve_code(
    context: &GenerationContext<'_>,
    table: &Table,
    record: &Record,
    spec: &DimensionSpec,
    earlier: &[(&'static str, String)],
) -> CubeResult<String> {
    match &spec.source {
        ValueSource::Column(column) => raw_cell(table, record, column),
        ValueSource::Translated { column, map } => {
            let raw = raw_cell(table, record, column)?;
            Ok(context.lookups.resolve(*map, &raw)?.to_string())
        }
        ValueSource::Parent { dimension, map } => {
            let child = earlier
                .iter()
                .find(|(id, _)| id == dimension)
                .map(|(_, code)| code.as_str())
                .ok_or_else(|| {
                    CubeError::malformed(
                        context.definition.slug(),
                        format!("dimension {} depends on unknown dimension {dimension}", spec.id),
                    )
                })?;
            Ok(context.lookups.resolve(*map, child)?.to_string())
        }
    }
}

fn raw_cell(table: &Table, record: &Record, column: &str) -> CubeResult<String> {
    let index = table.column(column)?;
    cell(record, index)
        .map(str::to_string)
        .ok_or_else(|| CubeError::InvalidLabel {
            label: String::new(),
            row: None,
        })
}

fn resolve_label(
    context: &GenerationContext<'_>,
    table: &Table,
    record: &Record,
    spec: &DimensionSpec,
    code: &str,
) -> CubeResult<String> {
    let label = match &spec.label {
        LabelSource::Value => None,
        LabelSource::Column(column) => cell(record, table.column(column)?).map(str::to_string),
        LabelSource::Index(id) => context
            .lookups
            .labels(*id)
            .and_then(|labels| labels.get(code))
            .map(str::to_string),
    };
    Ok(label.unwrap_or_else(|| {
        if !matches!(spec.label, LabelSource::Value) {
            tracing::debug!(dimension = spec.id, code, "no label found; using the code");
        }
        code.to_string()
    }))
}
