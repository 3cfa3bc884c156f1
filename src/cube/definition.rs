//! Cube type definitions
//!
//! Each cube type carries a fixed column contract: which source columns feed
//! which dimension, how geographic codes are resolved, where resource labels
//! come from, and whether the measure is counted or copied. The contracts are
//! data, so the observation generator stays agnostic of the concrete cube.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

// ============================================================================
// Identifiers
// ============================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CubeKind {
    /// Health-care providers counted per county, region and field of care.
    CareProviders,
    /// Mean population per county and region, copied from the source.
    Population,
}

/// Type of concept resource a dimension value is declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr)]
pub enum ConceptKind {
    County,
    Region,
    FieldOfCare,
}

/// Named code maps a definition may resolve through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum CodeMapId {
    /// County code -> region code (care-providers cross reference)
    #[strum(serialize = "county->region")]
    CountyToRegion,
    /// LAU territory code -> county code (CZSO code list)
    #[strum(serialize = "lau->county")]
    LauToCounty,
}

/// Named label indexes (code -> human-readable label).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum LabelSetId {
    #[strum(serialize = "region-labels")]
    Regions,
    #[strum(serialize = "county-labels")]
    Counties,
}

// ============================================================================
// Column contract
// ============================================================================

/// Where a dimension's code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Raw cell of a source column.
    Column(&'static str),
    /// Raw cell translated through a code map.
    Translated {
        column: &'static str,
        map: CodeMapId,
    },
    /// Parent of an earlier dimension's resolved code.
    Parent {
        dimension: &'static str,
        map: CodeMapId,
    },
}

impl ValueSource {
    /// Source column read from the raw row, if any.
    pub fn raw_column(&self) -> Option<&'static str> {
        match self {
            ValueSource::Column(column) | ValueSource::Translated { column, .. } => Some(*column),
            ValueSource::Parent { .. } => None,
        }
    }
}

/// Where a dimension value's human-readable label comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSource {
    /// The raw value doubles as its label.
    Value,
    /// A column of the same source row.
    Column(&'static str),
    /// Looked up by resolved code in a label index.
    Index(LabelSetId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSpec {
    /// Local name of the dimension property.
    pub id: &'static str,
    /// `(text, language)` pairs.
    pub labels: Vec<(&'static str, &'static str)>,
    /// Refines `sdmx-concept:refArea`.
    pub geographic: bool,
    pub coded: bool,
    pub concept: ConceptKind,
    pub source: ValueSource,
    pub label: LabelSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasureMode {
    /// Count raw rows per distinct dimension tuple.
    Aggregate,
    /// Copy a pre-aggregated numeric column.
    PassThrough { column: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureSpec {
    pub id: &'static str,
    pub labels: Vec<(&'static str, &'static str)>,
    pub mode: MeasureMode,
}

/// Exact-match predicate on a non-dimension column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: &'static str,
    pub equals: &'static str,
}

/// Complete column contract of one cube type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeDefinition {
    pub kind: CubeKind,
    pub dimensions: Vec<DimensionSpec>,
    pub measures: Vec<MeasureSpec>,
    pub filters: Vec<ColumnFilter>,
}

impl CubeDefinition {
    pub fn for_kind(kind: CubeKind) -> Self {
        match kind {
            CubeKind::CareProviders => Self::care_providers(),
            CubeKind::Population => Self::population(),
        }
    }

    pub fn care_providers() -> Self {
        Self {
            kind: CubeKind::CareProviders,
            dimensions: vec![
                DimensionSpec {
                    id: "county",
                    labels: vec![("County", "en"), ("Okres", "cs")],
                    geographic: true,
                    coded: true,
                    concept: ConceptKind::County,
                    source: ValueSource::Column(columns::COUNTY_CODE),
                    label: LabelSource::Column(columns::COUNTY),
                },
                DimensionSpec {
                    id: "region",
                    labels: vec![("Region", "en"), ("Kraj", "cs")],
                    geographic: true,
                    coded: true,
                    concept: ConceptKind::Region,
                    source: ValueSource::Parent {
                        dimension: "county",
                        map: CodeMapId::CountyToRegion,
                    },
                    label: LabelSource::Column(columns::REGION),
                },
                DimensionSpec {
                    id: "fieldOfCare",
                    labels: vec![("Field of care", "en"), ("Obor péče", "cs")],
                    geographic: false,
                    coded: false,
                    concept: ConceptKind::FieldOfCare,
                    source: ValueSource::Column(columns::FIELD_OF_CARE),
                    label: LabelSource::Value,
                },
            ],
            measures: vec![MeasureSpec {
                id: "numberOfCareProviders",
                labels: vec![
                    ("Number of care providers", "en"),
                    ("Počet poskytovatelů péče", "cs"),
                ],
                mode: MeasureMode::Aggregate,
            }],
            filters: Vec::new(),
        }
    }

    pub fn population() -> Self {
        Self {
            kind: CubeKind::Population,
            dimensions: vec![
                DimensionSpec {
                    id: "county",
                    labels: vec![("County", "en"), ("Okres", "cs")],
                    geographic: true,
                    coded: true,
                    concept: ConceptKind::County,
                    source: ValueSource::Translated {
                        column: columns::TERRITORY_CODE,
                        map: CodeMapId::LauToCounty,
                    },
                    label: LabelSource::Column(columns::TERRITORY_LABEL),
                },
                DimensionSpec {
                    id: "region",
                    labels: vec![("Region", "en"), ("Kraj", "cs")],
                    geographic: true,
                    coded: true,
                    concept: ConceptKind::Region,
                    source: ValueSource::Parent {
                        dimension: "county",
                        map: CodeMapId::CountyToRegion,
                    },
                    label: LabelSource::Index(LabelSetId::Regions),
                },
            ],
            measures: vec![MeasureSpec {
                id: "meanPopulation",
                labels: vec![
                    ("Mean population count", "en"),
                    ("Střední stav obyvatel - počet", "cs"),
                ],
                mode: MeasureMode::PassThrough {
                    column: columns::VALUE,
                },
            }],
            filters: vec![
                ColumnFilter {
                    column: columns::INDICATOR,
                    equals: MEAN_POPULATION_INDICATOR,
                },
                ColumnFilter {
                    column: columns::TERRITORY_LEVEL,
                    equals: COUNTY_LEVEL_CODELIST,
                },
            ],
        }
    }

    /// The single measure that drives observation values.
    pub fn primary_measure(&self) -> Option<&MeasureSpec> {
        self.measures.first()
    }

    /// Raw columns whose values form the grouping key, in dimension order.
    pub fn grouping_columns(&self) -> Vec<&'static str> {
        self.dimensions
            .iter()
            .filter_map(|dimension| dimension.source.raw_column())
            .collect()
    }

    /// Every column the source table must provide.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut required = self.grouping_columns();
        for dimension in &self.dimensions {
            if let LabelSource::Column(column) = dimension.label {
                required.push(column);
            }
        }
        for measure in &self.measures {
            if let MeasureMode::PassThrough { column } = measure.mode {
                required.push(column);
            }
        }
        required.extend(self.filters.iter().map(|filter| filter.column));
        let mut seen = std::collections::HashSet::new();
        required.retain(|column| seen.insert(*column));
        required
    }

    /// Code maps the definition resolves through.
    pub fn code_maps(&self) -> Vec<CodeMapId> {
        let mut maps = Vec::new();
        for dimension in &self.dimensions {
            let map = match &dimension.source {
                ValueSource::Translated { map, .. } | ValueSource::Parent { map, .. } => *map,
                ValueSource::Column(_) => continue,
            };
            if !maps.contains(&map) {
                maps.push(map);
            }
        }
        maps
    }

    pub fn slug(&self) -> &str {
        self.kind.as_ref()
    }
}

/// Language of labels read from the Czech source tables.
pub const SOURCE_LABEL_LANGUAGE: &str = "cs";

pub const MEAN_POPULATION_INDICATOR: &str = "DEM0004";
pub const COUNTY_LEVEL_CODELIST: &str = "101";

/// Column names of the known source tables.
pub mod columns {
    // Care providers registry (NRPZS)
    pub const COUNTY: &str = "Okres";
    pub const COUNTY_CODE: &str = "OkresCode";
    pub const REGION: &str = "Kraj";
    pub const REGION_CODE: &str = "KrajCode";
    pub const FIELD_OF_CARE: &str = "OborPece";

    // Population (CZSO 130141)
    pub const INDICATOR: &str = "vuk";
    pub const TERRITORY_LEVEL: &str = "vuzemi_cis";
    pub const TERRITORY_CODE: &str = "vuzemi_kod";
    pub const TERRITORY_LABEL: &str = "vuzemi_txt";
    pub const VALUE: &str = "hodnota";

    // CZSO code list
    pub const CODELIST_PARENT: &str = "CHODNOTA1";
    pub const CODELIST_CHILD: &str = "CHODNOTA2";
}
