//! Error types emitted by the heatmap CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use heatmap_core::{EntityIdError, EntityKind, RepositoryError, SqliteStoreError};
use heatmap_scorer::MetricError;
use thiserror::Error;

/// Errors emitted by the heatmap CLI.
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
        field: &'static str,
        env: &'static str,
    },
    /// An identifier argument was blank.
    #[error("{field} must not be blank")]
    InvalidId {
        field: &'static str,
        #[source]
        source: EntityIdError,
    },
    /// Coordinates were not a valid longitude/latitude pair.
    #[error("coordinates ({lon}, {lat}) are outside -180..=180, -90..=90")]
    InvalidCoordinates { lon: f64, lat: f64 },
    /// The database file has not been created with `heatmap init`.
    #[error("database {path:?} does not exist (run `heatmap init` first)")]
    MissingDatabase { path: Utf8PathBuf },
    /// The database path exists but is not a file.
    #[error("database path {path:?} exists but is not a file")]
    DatabaseNotFile { path: Utf8PathBuf },
    /// The database path could not be inspected due to an IO error.
    #[error("failed to inspect database path {path:?}: {source}")]
    InspectDatabase {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Creating the directory that holds the database failed.
    #[error("failed to create parent directory for {path:?}: {source}")]
    CreateDatabaseDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite store failed.
    #[error(transparent)]
    OpenStore(#[from] SqliteStoreError),
    /// Reading or writing entities failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// An entity with the requested identifier is already registered.
    #[error("{kind} '{id}' already exists")]
    EntityExists { kind: EntityKind, id: String },
    /// Applying or ranking interactions failed.
    #[error(transparent)]
    Metric(#[from] MetricError),
    /// Serialising the command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing the command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
