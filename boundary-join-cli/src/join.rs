//! Join command implementation for the boundary-join CLI.

#[cfg(feature = "parallel")]
use boundary_join_core::PointSource;
use boundary_join_core::{GeometryStore, JoinOptions, JoinResults, SpatialJoinEngine};
use boundary_join_data::{
    GeoJsonBoundarySource, HttpRecordSource, HttpSourceConfig, JsonLinesSink, JsonRecordSource,
    fs,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    ARG_BOUNDARIES, ARG_ID_FIELD, ARG_LATITUDE_FIELD, ARG_LONGITUDE_FIELD, ARG_OUTPUT_DIR,
    ARG_PAGE_SIZE, ARG_RECORDS, ARG_REGION_ATTRIBUTE, CliError, ENV_BOUNDARIES, ENV_ID_FIELD,
    ENV_RECORDS,
};

const HTTP_SCHEMES: [&str; 2] = ["http://", "https://"];

/// CLI arguments for the `join` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Assign every point record to the first boundary region that \
                 contains it and write one JSON-lines file per matched \
                 region, plus matched_overall.jsonl and unmatched.jsonl. \
                 Inputs may be local files or http(s) URLs; values can come \
                 from CLI flags, configuration files, or environment \
                 variables.",
    about = "Join point records to boundary regions"
)]
#[ortho_config(prefix = "BOUNDARY_JOIN")]
pub(crate) struct JoinArgs {
    /// GeoJSON boundary file or http(s) URL.
    #[arg(long = ARG_BOUNDARIES, value_name = "path|url")]
    #[serde(default)]
    pub(crate) boundaries: Option<String>,
    /// JSON or JSON-lines record file, or paginated http(s) endpoint.
    #[arg(long = ARG_RECORDS, value_name = "path|url")]
    #[serde(default)]
    pub(crate) records: Option<String>,
    /// Boundary property holding each region's identifier.
    #[arg(long = ARG_ID_FIELD, value_name = "name")]
    #[serde(default)]
    pub(crate) id_field: Option<String>,
    /// Directory receiving the result sets (defaults to the working directory).
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// Record attribute holding the longitude.
    #[arg(long = ARG_LONGITUDE_FIELD, value_name = "name")]
    #[serde(default)]
    pub(crate) longitude_field: Option<String>,
    /// Record attribute holding the latitude.
    #[arg(long = ARG_LATITUDE_FIELD, value_name = "name")]
    #[serde(default)]
    pub(crate) latitude_field: Option<String>,
    /// Attribute added to matched records naming their region.
    #[arg(long = ARG_REGION_ATTRIBUTE, value_name = "name")]
    #[serde(default)]
    pub(crate) region_attribute: Option<String>,
    /// Records requested per page from paginated endpoints.
    #[arg(long = ARG_PAGE_SIZE, value_name = "count")]
    #[serde(default)]
    pub(crate) page_size: Option<usize>,
}

impl JoinArgs {
    pub(crate) fn into_config(self) -> Result<JoinConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        JoinConfig::try_from(merged)
    }
}

/// Where an input is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    File(Utf8PathBuf),
    Url(Url),
}

impl Input {
    fn parse(value: &str, field: &'static str) -> Result<Self, CliError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CliError::EmptyArgument { field });
        }
        if !has_http_scheme(trimmed) {
            return Ok(Self::File(Utf8PathBuf::from(trimmed)));
        }
        Url::parse(trimmed)
            .map(Self::Url)
            .map_err(|source| CliError::InvalidUrl {
                field,
                value: trimmed.to_owned(),
                source,
            })
    }

    fn require_existing(&self, field: &'static str) -> Result<(), CliError> {
        match self {
            Self::File(path) => require_file(path, field),
            Self::Url(_) => Ok(()),
        }
    }
}

fn has_http_scheme(value: &str) -> bool {
    HTTP_SCHEMES.iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn require_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolved `join` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JoinConfig {
    /// Boundary document location.
    pub(crate) boundaries: Input,
    /// Record location.
    pub(crate) records: Input,
    /// Boundary property naming each region.
    pub(crate) id_field: String,
    /// Directory receiving the result sets.
    pub(crate) output_dir: Utf8PathBuf,
    /// Field names used by the engine.
    pub(crate) options: JoinOptions,
    /// Settings for HTTP inputs.
    pub(crate) http: HttpSourceConfig,
}

impl JoinConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        self.boundaries.require_existing(ARG_BOUNDARIES)?;
        self.records.require_existing(ARG_RECORDS)?;
        match fs::metadata(&self.output_dir) {
            Ok(Some(meta)) if !meta.is_dir() => Err(CliError::OutputDirectoryNotDirectory {
                path: self.output_dir.clone(),
            }),
            Ok(_) => Ok(()),
            Err(source) => Err(CliError::InspectSourcePath {
                field: ARG_OUTPUT_DIR,
                path: self.output_dir.clone(),
                source,
            }),
        }
    }
}

impl TryFrom<JoinArgs> for JoinConfig {
    type Error = CliError;

    fn try_from(args: JoinArgs) -> Result<Self, Self::Error> {
        let boundaries = args.boundaries.ok_or(CliError::MissingArgument {
            field: ARG_BOUNDARIES,
            env: ENV_BOUNDARIES,
        })?;
        let records = args.records.ok_or(CliError::MissingArgument {
            field: ARG_RECORDS,
            env: ENV_RECORDS,
        })?;
        let id_field = args.id_field.ok_or(CliError::MissingArgument {
            field: ARG_ID_FIELD,
            env: ENV_ID_FIELD,
        })?;

        let mut options = JoinOptions::default();
        if let Some(field) = args.longitude_field {
            options = options.with_longitude_field(non_empty(field, ARG_LONGITUDE_FIELD)?);
        }
        if let Some(field) = args.latitude_field {
            options = options.with_latitude_field(non_empty(field, ARG_LATITUDE_FIELD)?);
        }
        if let Some(attribute) = args.region_attribute {
            options = options.with_region_attribute(non_empty(attribute, ARG_REGION_ATTRIBUTE)?);
        }

        let mut http = HttpSourceConfig::default();
        if let Some(page_size) = args.page_size {
            http = http.with_page_size(page_size);
        }

        Ok(Self {
            boundaries: Input::parse(&boundaries, ARG_BOUNDARIES)?,
            records: Input::parse(&records, ARG_RECORDS)?,
            id_field: non_empty(id_field, ARG_ID_FIELD)?,
            output_dir: args.output_dir.unwrap_or_else(|| Utf8PathBuf::from(".")),
            options,
            http,
        })
    }
}

fn non_empty(value: String, field: &'static str) -> Result<String, CliError> {
    if value.trim().is_empty() {
        Err(CliError::EmptyArgument { field })
    } else {
        Ok(value)
    }
}

/// Counts reported after a join run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JoinSummary {
    /// Regions indexed.
    pub(crate) regions: usize,
    /// Boundary features rejected while loading.
    pub(crate) skipped_features: usize,
    /// Records assigned to a region.
    pub(crate) matched: usize,
    /// Records left unmatched.
    pub(crate) unmatched: usize,
    /// Result files written, in order.
    pub(crate) files: Vec<Utf8PathBuf>,
}

pub(crate) fn run_join(args: JoinArgs) -> Result<JoinSummary, CliError> {
    let config = resolve_join_config(args)?;
    execute_join(&config)
}

pub(crate) fn resolve_join_config(args: JoinArgs) -> Result<JoinConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Load boundaries, join every record, and publish the result sets.
pub(crate) fn execute_join(config: &JoinConfig) -> Result<JoinSummary, CliError> {
    let store = load_store(config)?;
    let skipped_features = store.skipped().len();
    let engine = SpatialJoinEngine::new(store, config.options.clone());
    let results = join_records(&engine, config)?;

    let mut sink = JsonLinesSink::create(config.output_dir.clone())?;
    results.publish(&mut sink)?;

    let summary = JoinSummary {
        regions: engine.store().len(),
        skipped_features,
        matched: results.matched().len(),
        unmatched: results.unmatched().len(),
        files: sink.written().to_vec(),
    };
    info!(
        "Indexed {} regions ({} boundary features skipped); {} records matched, {} unmatched",
        summary.regions, summary.skipped_features, summary.matched, summary.unmatched
    );
    Ok(summary)
}

fn load_store(config: &JoinConfig) -> Result<GeometryStore, CliError> {
    let mut source = match &config.boundaries {
        Input::File(path) => GeoJsonBoundarySource::from_path(path.clone()),
        Input::Url(url) => GeoJsonBoundarySource::from_url(url.clone(), &config.http)?,
    };
    Ok(GeometryStore::load(&mut source, &config.id_field)?)
}

fn join_records(engine: &SpatialJoinEngine, config: &JoinConfig) -> Result<JoinResults, CliError> {
    match &config.records {
        Input::File(path) => join_file(engine, &mut JsonRecordSource::new(path.clone())),
        Input::Url(url) => {
            let mut source = HttpRecordSource::from_url(url.clone(), &config.http)?;
            Ok(engine.join_source(&mut source)?)
        }
    }
}

#[cfg(feature = "parallel")]
fn join_file(
    engine: &SpatialJoinEngine,
    source: &mut JsonRecordSource,
) -> Result<JoinResults, CliError> {
    let mut records = Vec::new();
    while let Some(batch) = source.next_batch()? {
        records.extend(batch);
    }
    Ok(engine.par_join_all(records))
}

#[cfg(not(feature = "parallel"))]
fn join_file(
    engine: &SpatialJoinEngine,
    source: &mut JsonRecordSource,
) -> Result<JoinResults, CliError> {
    Ok(engine.join_source(source)?)
}
