//! Property-based tests for the cube invariants
//!
//! - normalization is idempotent and yields IRI-safe keys
//! - aggregate counts add up to the number of eligible rows
//! - every code the cross reference lists resolves, nothing else does

use proptest::prelude::*;
use statcube::cube::codes::{CodeMap, Lookups};
use statcube::cube::definition::{CodeMapId, CubeDefinition};
use statcube::cube::observations::{GenerationContext, generate};
use statcube::cube::resources::{ResourceRegistry, normalize};
use statcube::error::CubeError;
use statcube::model::{Dataset, DatasetMetadata};
use statcube::table::Table;
use statcube::vocab::{Namespaces, named_node};
use std::collections::HashMap;

// =============================================================================
// Generators
// =============================================================================

fn arb_label() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[ a-zA-Z0-9_,/#?%\-\.\tčěšřžýáíéůú\[\]<>|\x{E000}\x{FFFE}]{0,24}")
        .unwrap()
}

/// County codes drawn from a small pool so groups repeat.
fn arb_rows() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..4, 0usize..3), 0..40)
}

const COUNTIES: [&str; 4] = ["CZ0201", "CZ0202", "CZ0311", "CZ0312"];
const REGIONS: [&str; 4] = ["CZ020", "CZ020", "CZ031", "CZ031"];
const FIELDS: [&str; 3] = ["zubní lékařství", "chirurgie", "Zubní  lékařství"];

fn dataset(ns: &Namespaces) -> Dataset {
    let date = chrono::NaiveDate::from_ymd_opt(2023, 3, 11).unwrap();
    Dataset {
        node: ns.resource("dataset-care-providers").unwrap(),
        structure: ns.term("structure-care-providers").unwrap(),
        metadata: DatasetMetadata {
            titles: Vec::new(),
            issued: date,
            modified: date,
            publisher: named_node("https://example.org/publisher").unwrap(),
            license: named_node("https://example.org/license").unwrap(),
        },
    }
}

fn providers_table(rows: &[(usize, usize)]) -> Table {
    Table::from_rows(
        "providers",
        ["Okres", "OkresCode", "Kraj", "KrajCode", "OborPece"],
        rows.iter().map(|(county, field)| {
            [
                Some(COUNTIES[*county]),
                Some(COUNTIES[*county]),
                Some(REGIONS[*county]),
                Some(REGIONS[*county]),
                Some(FIELDS[*field]),
            ]
        }),
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in arb_label()) {
        if let Ok(key) = normalize(&raw) {
            let again = normalize(key.as_str()).unwrap();
            prop_assert_eq!(again, key);
        }
    }

    #[test]
    fn normalized_keys_are_iri_safe(raw in arb_label()) {
        match normalize(&raw) {
            Ok(key) => {
                let key = key.as_str();
                prop_assert!(!key.is_empty());
                prop_assert!(!key.starts_with('_') && !key.ends_with('_'));
                prop_assert!(!key.contains("__"));
                let unsafe_chars = "/#?%[]<>|\u{E000}\u{FFFE}";
                prop_assert!(!key.chars().any(|c| c.is_whitespace() || unsafe_chars.contains(c)));
                prop_assert!(Namespaces::default().resource(key).is_ok());
            }
            Err(err) => {
                let is_invalid_label = matches!(err, CubeError::InvalidLabel { .. });
                prop_assert!(is_invalid_label);
                prop_assert!(raw.chars().all(|c| !c.is_alphanumeric() && c != ',' && c != '-' && c != '.'));
            }
        }
    }

    #[test]
    fn aggregate_counts_sum_to_row_count(rows in arb_rows()) {
        let ns = Namespaces::default();
        let definition = CubeDefinition::care_providers();
        let table = providers_table(&rows);
        let lookups = Lookups::new().with_code_map(
            CodeMapId::CountyToRegion,
            CodeMap::build("county->region", &table, "OkresCode", "KrajCode").unwrap(),
        );
        let context = GenerationContext {
            definition: &definition,
            namespaces: &ns,
            lookups: &lookups,
            label_language: "cs",
        };
        let mut registry = ResourceRegistry::new(ns.clone());
        let (observations, stats) =
            generate(&context, &dataset(&ns), &table, &mut registry).unwrap();

        let total: i64 = observations.iter().map(|o| o.value).sum();
        prop_assert_eq!(total, rows.len() as i64);
        prop_assert_eq!(stats.measure_total, total);

        let mut distinct: Vec<&(usize, usize)> = rows.iter().collect();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(observations.len(), distinct.len());

        // Observation ids are dense and unique.
        let mut ids: Vec<&str> = observations.iter().map(|o| o.node.as_str()).collect();
        ids.dedup();
        prop_assert_eq!(ids.len(), observations.len());
    }

    #[test]
    fn code_map_is_total_over_its_source(
        pairs in prop::collection::vec(("[A-Z]{2}[0-9]{2}", "[A-Z]{2}[0-9]"), 0..30),
        unknown in "[a-z]{3}",
    ) {
        let map = CodeMap::from_pairs("county->region", pairs.clone());
        let mut last: HashMap<&str, &str> = HashMap::new();
        for (child, parent) in &pairs {
            last.insert(child.as_str(), parent.as_str());
        }
        for (child, parent) in &last {
            prop_assert_eq!(map.resolve(child).unwrap(), *parent);
        }
        prop_assert_eq!(map.len(), last.len());
        // Lower-case codes never appear in the generated pairs.
        let is_unresolved = matches!(map.resolve(&unknown), Err(CubeError::UnresolvedCode { .. }));
        prop_assert!(is_unresolved);
    }
}
