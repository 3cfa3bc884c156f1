//! End-to-end cube build
//!
//! Load every input table, check the column contract, build the lookups and
//! only then start producing triples. Nothing is written unless the whole
//! cube was assembled.

use crate::config::CubeConfig;
use crate::cube::codes::{CodeMap, LabelIndex, Lookups};
use crate::cube::definition::{
    CodeMapId, CubeDefinition, CubeKind, LabelSetId, LabelSource, SOURCE_LABEL_LANGUAGE, columns,
};
use crate::cube::observations::{GenerationContext, GenerationStats, generate};
use crate::cube::{CubeGraph, ResourceRegistry, Schema, assemble, write_turtle};
use crate::error::{CubeError, CubeResult};
use crate::hierarchy::build_hierarchy;
use crate::logging::stage_span;
use crate::model::{Dataset, DatasetMetadata, lang_literal};
use crate::table::Table;
use crate::vocab::{Namespaces, named_node};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Input tables of one build, loaded up front.
#[derive(Debug, Clone)]
pub struct CubeInputs {
    pub source: Table,
    pub cross_ref: Table,
    pub code_list: Option<Table>,
}

impl CubeInputs {
    pub fn load(config: &CubeConfig) -> Result<Self> {
        let load = |path: &Path, what: &str| {
            Table::from_path(path, config.delimiter)
                .with_context(|| format!("failed to load {what} {:?}", path))
        };

        let source = load(&config.source_table, "source table")?;
        let cross_ref = if config.cross_ref_table == config.source_table {
            source.clone()
        } else {
            load(&config.cross_ref_table, "cross-reference table")?
        };
        let code_list = config
            .code_list_table
            .as_deref()
            .map(|path| load(path, "code list table"))
            .transpose()?;

        tracing::info!(
            source_rows = source.len(),
            cross_ref_rows = cross_ref.len(),
            code_list_rows = code_list.as_ref().map(Table::len),
            "input tables loaded"
        );
        Ok(Self {
            source,
            cross_ref,
            code_list,
        })
    }

    fn code_list(&self) -> CubeResult<&Table> {
        self.code_list
            .as_ref()
            .ok_or_else(|| CubeError::malformed("code list", "no code list table was provided"))
    }
}

/// Code maps and label indexes the definition resolves through.
pub fn build_lookups(definition: &CubeDefinition, inputs: &CubeInputs) -> CubeResult<Lookups> {
    let mut lookups = Lookups::new();
    for id in definition.code_maps() {
        let map = match id {
            CodeMapId::CountyToRegion => CodeMap::build(
                id.as_ref(),
                &inputs.cross_ref,
                columns::COUNTY_CODE,
                columns::REGION_CODE,
            )?,
            CodeMapId::LauToCounty => CodeMap::build(
                id.as_ref(),
                inputs.code_list()?,
                columns::CODELIST_CHILD,
                columns::CODELIST_PARENT,
            )?,
        };
        lookups = lookups.with_code_map(id, map);
    }
    for spec in &definition.dimensions {
        if let LabelSource::Index(id) = spec.label {
            lookups = lookups.with_labels(id, label_index(id, &inputs.cross_ref)?);
        }
    }
    Ok(lookups)
}

fn label_index(id: LabelSetId, cross_ref: &Table) -> CubeResult<LabelIndex> {
    match id {
        LabelSetId::Regions => LabelIndex::build(cross_ref, columns::REGION_CODE, columns::REGION),
        LabelSetId::Counties => LabelIndex::build(cross_ref, columns::COUNTY_CODE, columns::COUNTY),
    }
}

/// Dataset metadata from configuration; `modified` is the build date.
pub fn dataset_metadata(config: &CubeConfig, modified: NaiveDate) -> CubeResult<DatasetMetadata> {
    let titles = config
        .dataset_title
        .iter()
        .map(|(text, language)| lang_literal(text, language))
        .collect::<CubeResult<Vec<_>>>()?;
    Ok(DatasetMetadata {
        titles,
        issued: config.issued,
        modified,
        publisher: named_node(config.publisher.as_str())?,
        license: named_node(config.license.as_str())?,
    })
}

/// Result of a cube build held in memory.
#[derive(Debug, Clone)]
pub struct BuiltCube {
    pub graph: CubeGraph,
    pub stats: GenerationStats,
    pub resources: usize,
}

/// Build the cube graph without touching the filesystem.
pub fn build_cube(
    definition: &CubeDefinition,
    inputs: &CubeInputs,
    namespaces: &Namespaces,
    metadata: DatasetMetadata,
) -> CubeResult<BuiltCube> {
    let slug = definition.slug();
    inputs.source.require(&definition.required_columns())?;

    let lookups = {
        let _span = stage_span("lookups", slug).entered();
        build_lookups(definition, inputs)?
    };

    let schema = {
        let _span = stage_span("schema", slug).entered();
        Schema::build(definition, namespaces)?
    };

    let dataset = Dataset {
        node: namespaces.resource(&format!("dataset-{slug}"))?,
        structure: schema.structure.node.clone(),
        metadata,
    };

    let mut registry = ResourceRegistry::new(namespaces.clone());
    let (observations, stats) = {
        let _span = stage_span("observations", slug).entered();
        let context = GenerationContext {
            definition,
            namespaces,
            lookups: &lookups,
            label_language: SOURCE_LABEL_LANGUAGE,
        };
        generate(&context, &dataset, &inputs.source, &mut registry)?
    };

    let graph = {
        let _span = stage_span("assemble", slug).entered();
        assemble(&schema, &dataset, &registry, &observations)?
    };

    Ok(BuiltCube {
        graph,
        stats,
        resources: registry.len(),
    })
}

/// Build the SKOS region/county hierarchy from the cross-reference table.
pub fn build_geography(inputs: &CubeInputs, namespaces: &Namespaces) -> CubeResult<CubeGraph> {
    let map = CodeMap::build(
        CodeMapId::CountyToRegion.as_ref(),
        &inputs.cross_ref,
        columns::COUNTY_CODE,
        columns::REGION_CODE,
    )?;
    let counties = label_index(LabelSetId::Counties, &inputs.cross_ref)?;
    let regions = label_index(LabelSetId::Regions, &inputs.cross_ref)?;
    build_hierarchy(&map, &counties, &regions, namespaces, SOURCE_LABEL_LANGUAGE)
}

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub kind: CubeKind,
    pub output: PathBuf,
    pub hierarchy_output: Option<PathBuf>,
    pub triples: usize,
    pub resources: usize,
    pub stats: GenerationStats,
}

/// Run a complete build described by `config`.
pub fn run(config: &CubeConfig) -> Result<BuildReport> {
    let definition = config.definition();
    let namespaces = config.namespaces()?;
    let slug = definition.slug();

    let inputs = {
        let _span = stage_span("load", slug).entered();
        CubeInputs::load(config)?
    };

    let metadata = dataset_metadata(config, chrono::Local::now().date_naive())
        .context("invalid dataset metadata")?;
    let cube = build_cube(&definition, &inputs, &namespaces, metadata)
        .with_context(|| format!("failed to build the {slug} cube"))?;

    let hierarchy = config
        .hierarchy_output
        .as_ref()
        .map(|_| {
            let _span = stage_span("hierarchy", slug).entered();
            build_geography(&inputs, &namespaces).context("failed to build the geographic hierarchy")
        })
        .transpose()?;

    write_graph(&cube.graph, &namespaces, &config.output)?;
    if let (Some(graph), Some(path)) = (&hierarchy, &config.hierarchy_output) {
        write_graph(graph, &namespaces, path)?;
    }

    tracing::info!(
        cube = %config.kind,
        output = %config.output.display(),
        triples = cube.graph.len(),
        observations = cube.stats.observations,
        resources = cube.resources,
        "cube written"
    );

    Ok(BuildReport {
        kind: config.kind,
        output: config.output.clone(),
        hierarchy_output: config.hierarchy_output.clone(),
        triples: cube.graph.len(),
        resources: cube.resources,
        stats: cube.stats,
    })
}

/// Serialize `graph` to `path` as Turtle.
pub fn write_graph(graph: &CubeGraph, namespaces: &Namespaces, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {:?}", parent))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create output file {:?}", path))?;
    let mut writer = write_turtle(graph, namespaces, BufWriter::new(file))
        .with_context(|| format!("failed to serialize {:?}", path))?;
    writer
        .flush()
        .map_err(CubeError::Serialization)
        .with_context(|| format!("failed to flush {:?}", path))?;
    tracing::debug!(path = %path.display(), triples = graph.len(), "graph written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn inputs(source: Table) -> CubeInputs {
        CubeInputs {
            cross_ref: source.clone(),
            source,
            code_list: None,
        }
    }

    fn metadata() -> DatasetMetadata {
        let date = NaiveDate::from_ymd_opt(2023, 3, 11).unwrap();
        DatasetMetadata {
            titles: vec![lang_literal("Care providers", "en").unwrap()],
            issued: date,
            modified: date,
            publisher: named_node("https://example.org/publisher").unwrap(),
            license: named_node("https://example.org/license").unwrap(),
        }
    }

    #[test]
    fn test_missing_columns_fail_before_any_graph() {
        let table = Table::from_rows("providers", ["Okres", "OkresCode"], [[Some("a"), Some("b")]]);
        let err = build_cube(
            &CubeDefinition::care_providers(),
            &inputs(table),
            &Namespaces::default(),
            metadata(),
        )
        .unwrap_err();
        assert_matches!(err, CubeError::MalformedSource { detail, .. } => {
            assert!(detail.contains("Kraj"));
            assert!(detail.contains("OborPece"));
        });
    }

    #[test]
    fn test_population_without_code_list_is_malformed() {
        let table = Table::from_rows(
            "population",
            ["vuk", "vuzemi_cis", "vuzemi_kod", "vuzemi_txt", "hodnota"],
            [[Some("DEM0004"), Some("101"), Some("40169"), Some("Benešov"), Some("1")]],
        );
        let err = build_lookups(&CubeDefinition::population(), &inputs(table)).unwrap_err();
        assert_matches!(err, CubeError::MalformedSource { .. });
    }

    #[test]
    fn test_empty_source_yields_schema_and_dataset_only() {
        let table = Table::from_rows(
            "providers",
            ["Okres", "OkresCode", "Kraj", "KrajCode", "OborPece"],
            Vec::<[Option<&'static str>; 5]>::new(),
        );
        let cube = build_cube(
            &CubeDefinition::care_providers(),
            &inputs(table),
            &Namespaces::default(),
            metadata(),
        )
        .unwrap();
        assert_eq!(cube.stats.observations, 0);
        assert_eq!(cube.resources, 0);
        assert!(!cube.graph.is_empty());
    }
}
