use crate::cube::definition::{CubeDefinition, CubeKind};
use crate::model::lang_literal;
use crate::vocab::{DEFAULT_ONTOLOGY_BASE, DEFAULT_RESOURCE_BASE, Namespaces, named_node};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DELIMITER: char = ',';
const DEFAULT_PUBLISHER: &str = "https://data.statcube.dev/";
const DEFAULT_LICENSE: &str = "https://creativecommons.org/licenses/by/4.0/";

/// `(text, language)` pairs used when no title is configured.
fn default_titles(kind: CubeKind) -> Vec<(String, String)> {
    let titles: &[(&str, &str)] = match kind {
        CubeKind::CareProviders => &[
            ("Poskytovatelé zdravotních služeb", "cs"),
            ("Health care providers", "en"),
        ],
        CubeKind::Population => &[
            ("Obyvatelé v okresech", "cs"),
            ("Population by county", "en"),
        ],
    };
    titles
        .iter()
        .map(|(text, language)| ((*text).to_string(), (*language).to_string()))
        .collect()
}

/// Fully resolved settings of one cube build.
#[derive(Debug, Clone)]
pub struct CubeConfig {
    pub kind: CubeKind,
    pub source_table: PathBuf,
    /// County -> region cross reference; the source table itself for
    /// care-providers unless configured otherwise.
    pub cross_ref_table: PathBuf,
    /// LAU -> county code list, required by the population cube.
    pub code_list_table: Option<PathBuf>,
    pub output: PathBuf,
    pub hierarchy_output: Option<PathBuf>,
    /// `(text, language)` pairs.
    pub dataset_title: Vec<(String, String)>,
    pub license: String,
    pub publisher: String,
    pub issued: NaiveDate,
    pub ontology_base: String,
    pub resource_base: String,
    pub delimiter: u8,
}

impl CubeConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            kind: cli_kind,
            source: cli_source,
            cross_ref: cli_cross_ref,
            code_list: cli_code_list,
            output: cli_output,
            hierarchy_output: cli_hierarchy_output,
            title: cli_title,
            license: cli_license,
            publisher: cli_publisher,
            issued: cli_issued,
            ontology_base: cli_ontology_base,
            resource_base: cli_resource_base,
            delimiter: cli_delimiter,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            kind: file_kind,
            source_table: file_source,
            cross_ref_table: file_cross_ref,
            code_list_table: file_code_list,
            output: file_output,
            hierarchy_output: file_hierarchy_output,
            dataset_title: file_title,
            license: file_license,
            publisher: file_publisher,
            issued: file_issued,
            ontology_base: file_ontology_base,
            resource_base: file_resource_base,
            delimiter: file_delimiter,
        } = file_config;

        let kind = cli_kind
            .or(file_kind)
            .context("a cube kind must be provided (--kind or `kind` in the config file)")?;

        let source_table = cli_source
            .or(file_source)
            .context("a source table must be provided (--source or `source_table`)")?;

        let cross_ref_table = cli_cross_ref
            .or(file_cross_ref)
            .or_else(|| (kind == CubeKind::CareProviders).then(|| source_table.clone()))
            .with_context(|| {
                format!("the {kind} cube needs a county -> region cross reference (--cross-ref)")
            })?;

        let code_list_table = cli_code_list.or(file_code_list);

        let output = cli_output
            .or(file_output)
            .unwrap_or_else(|| PathBuf::from(format!("{kind}.ttl")));

        let hierarchy_output = cli_hierarchy_output.or(file_hierarchy_output);

        let dataset_title = match cli_title {
            Some(titles) if !titles.is_empty() => titles,
            _ => file_title
                .map(|titles| {
                    titles
                        .into_iter()
                        .map(|(language, text)| (text, language))
                        .collect()
                })
                .unwrap_or_else(|| default_titles(kind)),
        };

        let issued = match cli_issued {
            Some(date) => date,
            None => match file_issued {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("invalid issued date {raw:?}, expected YYYY-MM-DD"))?,
                None => chrono::Local::now().date_naive(),
            },
        };

        let delimiter = cli_delimiter.or(file_delimiter).unwrap_or(DEFAULT_DELIMITER);
        anyhow::ensure!(
            delimiter.is_ascii(),
            "delimiter {delimiter:?} must be a single ASCII character"
        );

        Ok(Self {
            kind,
            source_table,
            cross_ref_table,
            code_list_table,
            output,
            hierarchy_output,
            dataset_title,
            license: cli_license
                .or(file_license)
                .unwrap_or_else(|| DEFAULT_LICENSE.to_string()),
            publisher: cli_publisher
                .or(file_publisher)
                .unwrap_or_else(|| DEFAULT_PUBLISHER.to_string()),
            issued,
            ontology_base: cli_ontology_base
                .or(file_ontology_base)
                .unwrap_or_else(|| DEFAULT_ONTOLOGY_BASE.to_string()),
            resource_base: cli_resource_base
                .or(file_resource_base)
                .unwrap_or_else(|| DEFAULT_RESOURCE_BASE.to_string()),
            delimiter: delimiter as u8,
        })
    }

    /// Fail fast on anything that would otherwise surface halfway through a
    /// build.
    pub fn validate(&self) -> Result<()> {
        ensure_file(&self.source_table, "source table")?;
        ensure_file(&self.cross_ref_table, "cross-reference table")?;
        match (&self.kind, &self.code_list_table) {
            (CubeKind::Population, None) => {
                anyhow::bail!("the population cube needs a code list table (--code-list)")
            }
            (_, Some(path)) => ensure_file(path, "code list table")?,
            (_, None) => {}
        }

        anyhow::ensure!(
            !self.dataset_title.is_empty(),
            "at least one dataset title must be provided"
        );
        for (text, language) in &self.dataset_title {
            anyhow::ensure!(
                !text.trim().is_empty(),
                "dataset title for language {language:?} is empty"
            );
            lang_literal(text, language)
                .with_context(|| format!("dataset title language {language:?} is invalid"))?;
        }

        self.namespaces()?;
        named_node(self.license.as_str())
            .with_context(|| format!("license {:?} is not a valid IRI", self.license))?;
        named_node(self.publisher.as_str())
            .with_context(|| format!("publisher {:?} is not a valid IRI", self.publisher))?;
        Ok(())
    }

    pub fn namespaces(&self) -> Result<Namespaces> {
        Namespaces::new(self.ontology_base.as_str(), self.resource_base.as_str())
            .context("invalid namespace base IRI")
    }

    /// Column contract of the configured cube kind.
    pub fn definition(&self) -> CubeDefinition {
        CubeDefinition::for_kind(self.kind)
    }
}

fn ensure_file(path: &Path, what: &str) -> Result<()> {
    anyhow::ensure!(path.exists(), "{what} {:?} does not exist", path);
    anyhow::ensure!(path.is_file(), "{what} {:?} is not a file", path);
    Ok(())
}

/// Parse `LANG=TEXT`.
fn parse_title(raw: &str) -> Result<(String, String), String> {
    let (language, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LANG=TEXT, got {raw:?}"))?;
    let language = language.trim();
    if language.is_empty() {
        return Err(format!("missing language in {raw:?}"));
    }
    Ok((text.trim().to_string(), language.to_string()))
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "statcube",
    about = "Build RDF Data Cubes from statistical tables",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "STATCUBE_KIND",
        value_enum,
        value_name = "KIND",
        help = "Cube to build"
    )]
    pub kind: Option<CubeKind>,

    #[arg(
        long,
        env = "STATCUBE_SOURCE",
        value_name = "FILE",
        help = "Source table (delimited text with a header row)"
    )]
    pub source: Option<PathBuf>,

    #[arg(
        long,
        env = "STATCUBE_CROSS_REF",
        value_name = "FILE",
        help = "County -> region cross-reference table"
    )]
    pub cross_ref: Option<PathBuf>,

    #[arg(
        long,
        env = "STATCUBE_CODE_LIST",
        value_name = "FILE",
        help = "LAU -> county code list table"
    )]
    pub code_list: Option<PathBuf>,

    #[arg(
        long,
        short = 'o',
        env = "STATCUBE_OUTPUT",
        value_name = "FILE",
        help = "Turtle file the cube is written to"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        env = "STATCUBE_HIERARCHY_OUTPUT",
        value_name = "FILE",
        help = "Also write the SKOS region/county hierarchy to this file"
    )]
    pub hierarchy_output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "LANG=TEXT",
        value_parser = parse_title,
        help = "Dataset title, repeatable once per language"
    )]
    pub title: Option<Vec<(String, String)>>,

    #[arg(long, env = "STATCUBE_LICENSE", value_name = "IRI", help = "Dataset license")]
    pub license: Option<String>,

    #[arg(long, env = "STATCUBE_PUBLISHER", value_name = "IRI", help = "Dataset publisher")]
    pub publisher: Option<String>,

    #[arg(
        long,
        env = "STATCUBE_ISSUED",
        value_name = "YYYY-MM-DD",
        help = "Issue date of the dataset (defaults to today)"
    )]
    pub issued: Option<NaiveDate>,

    #[arg(
        long,
        env = "STATCUBE_ONTOLOGY_BASE",
        value_name = "IRI",
        help = "Namespace of schema terms"
    )]
    pub ontology_base: Option<String>,

    #[arg(
        long,
        env = "STATCUBE_RESOURCE_BASE",
        value_name = "IRI",
        help = "Namespace of concept and observation resources"
    )]
    pub resource_base: Option<String>,

    #[arg(
        long,
        env = "STATCUBE_DELIMITER",
        value_name = "CHAR",
        help = "Field delimiter of the input tables"
    )]
    pub delimiter: Option<char>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    kind: Option<CubeKind>,
    source_table: Option<PathBuf>,
    cross_ref_table: Option<PathBuf>,
    code_list_table: Option<PathBuf>,
    output: Option<PathBuf>,
    hierarchy_output: Option<PathBuf>,
    /// language -> text
    dataset_title: Option<BTreeMap<String, String>>,
    license: Option<String>,
    publisher: Option<String>,
    issued: Option<String>,
    ontology_base: Option<String>,
    resource_base: Option<String>,
    delimiter: Option<char>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "a,b\n").unwrap();
        path
    }

    #[test]
    fn test_care_providers_defaults() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "providers.csv");
        let config = CubeConfig::from_args(CliArgs {
            kind: Some(CubeKind::CareProviders),
            source: Some(source.clone()),
            ..CliArgs::default()
        })
        .unwrap();

        assert_eq!(config.cross_ref_table, source);
        assert_eq!(config.output, PathBuf::from("care-providers.ttl"));
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.dataset_title.len(), 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_population_requires_code_list() {
        let dir = TempDir::new().unwrap();
        let config = CubeConfig::from_args(CliArgs {
            kind: Some(CubeKind::Population),
            source: Some(touch(&dir, "population.csv")),
            cross_ref: Some(touch(&dir, "providers.csv")),
            ..CliArgs::default()
        })
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("code list"));
    }

    #[test]
    fn test_population_requires_cross_reference() {
        let dir = TempDir::new().unwrap();
        let err = CubeConfig::from_args(CliArgs {
            kind: Some(CubeKind::Population),
            source: Some(touch(&dir, "population.csv")),
            ..CliArgs::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("cross reference"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "providers.csv");
        let config_path = dir.path().join("statcube.yaml");
        let mut file = fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            "kind: care-providers\nsource_table: {}\ndelimiter: ';'\nissued: 2023-03-11\ndataset_title:\n  en: From file",
            source.display()
        )
        .unwrap();

        let config = CubeConfig::from_args(CliArgs {
            config: Some(config_path),
            delimiter: Some('\t'),
            ..CliArgs::default()
        })
        .unwrap();

        assert_eq!(config.kind, CubeKind::CareProviders);
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.issued, NaiveDate::from_ymd_opt(2023, 3, 11).unwrap());
        assert_eq!(
            config.dataset_title,
            vec![("From file".to_string(), "en".to_string())]
        );
    }

    #[test]
    fn test_invalid_namespace_fails_validation() {
        let dir = TempDir::new().unwrap();
        let config = CubeConfig::from_args(CliArgs {
            kind: Some(CubeKind::CareProviders),
            source: Some(touch(&dir, "providers.csv")),
            resource_base: Some("not an iri".to_string()),
            ..CliArgs::default()
        })
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_title() {
        assert_eq!(
            parse_title("cs=Obyvatelé v okresech").unwrap(),
            ("Obyvatelé v okresech".to_string(), "cs".to_string())
        );
        assert!(parse_title("no separator").is_err());
        assert!(parse_title("=text").is_err());
    }
}
