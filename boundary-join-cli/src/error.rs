//! Error types emitted by the boundary-join CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use boundary_join_data::{
    BoundaryLoadError, FetchError, HttpBuildError, RecordLoadError, SinkError,
};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors emitted by the boundary-join CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// An option that must be non-empty was blank.
    #[error("{field} must not be empty")]
    EmptyArgument {
        /// Flag name without leading dashes.
        field: &'static str,
    },
    /// An `http://` or `https://` input is not a valid URL.
    #[error("{field} URL {value:?} is invalid: {source}")]
    InvalidUrl {
        /// Flag name without leading dashes.
        field: &'static str,
        /// Value as supplied.
        value: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag name without leading dashes.
        field: &'static str,
        /// Path as resolved.
        path: Utf8PathBuf,
    },
    /// A referenced path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag name without leading dashes.
        field: &'static str,
        /// Path as resolved.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory {
        /// Path as resolved.
        path: Utf8PathBuf,
    },
    /// An HTTP collaborator could not be constructed.
    #[error("failed to prepare HTTP access: {0}")]
    BuildHttp(#[from] HttpBuildError),
    /// Boundary loading failed.
    #[error("failed to load boundaries: {0}")]
    LoadBoundaries(#[from] BoundaryLoadError),
    /// Reading records from a local file failed.
    #[error("failed to load records: {0}")]
    LoadRecords(#[from] RecordLoadError),
    /// Fetching records from a remote service failed.
    #[error("failed to fetch records: {0}")]
    FetchRecords(#[from] FetchError),
    /// Writing result sets failed.
    #[error("failed to write results: {0}")]
    WriteResults(#[from] SinkError),
}
