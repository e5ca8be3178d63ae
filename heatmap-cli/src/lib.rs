//! Command-line interface for recording interactions and reading heatmaps.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use heatmap_core::SqliteEntityStore;
use serde::Serialize;

mod entities;
mod error;
mod fs;
mod interactions;
mod ranking;

pub use error::CliError;

use entities::{AddBusinessArgs, AddLocationArgs, InitArgs};
use interactions::{RecordArgs, ReviewArgs};
use ranking::{PopularArgs, TopBusinessesArgs};

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_ENTITY_ID: &str = "id";
pub(crate) const ARG_ENTITY_TYPE: &str = "entity-type";
pub(crate) const ARG_KIND: &str = "kind";
pub(crate) const ARG_LOCATION: &str = "location";
pub(crate) const ARG_RATING: &str = "rating";
pub(crate) const DEFAULT_DATABASE: &str = "heatmap.db";

/// Run the heatmap CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments or configuration are invalid, the
/// database cannot be used, or an interaction is rejected.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli, &mut stdout)
}

fn run_with(cli: Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    match cli.command {
        Command::Init(args) => entities::run_init(args, writer),
        Command::AddLocation(args) => entities::run_add_location(args, writer),
        Command::AddBusiness(args) => entities::run_add_business(args, writer),
        Command::Record(args) => interactions::run_record(args, writer),
        Command::Review(args) => interactions::run_review(args, writer),
        Command::Popular(args) => ranking::run_popular(args, writer),
        Command::TopBusinesses(args) => ranking::run_top_businesses(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "heatmap",
    about = "Record interactions and rank locations and businesses by popularity",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the heatmap database schema.
    Init(InitArgs),
    /// Register a location with fresh metrics.
    AddLocation(AddLocationArgs),
    /// Register a business under an existing location.
    AddBusiness(AddBusinessArgs),
    /// Apply one interaction to a location or business.
    Record(RecordArgs),
    /// Store a review rating and apply the review interaction.
    Review(ReviewArgs),
    /// Rank locations by live heatmap score.
    Popular(PopularArgs),
    /// Rank the businesses of one location by live heatmap score.
    TopBusinesses(TopBusinessesArgs),
}

/// Resolve the database path, falling back to `heatmap.db`.
pub(crate) fn database_or_default(database: Option<Utf8PathBuf>) -> Utf8PathBuf {
    database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE))
}

/// Open an existing database; only `init` may create one.
pub(crate) fn open_existing_store(path: &Utf8Path) -> Result<SqliteEntityStore, CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(SqliteEntityStore::open(path.as_std_path())?),
        Ok(false) => Err(CliError::DatabaseNotFile {
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingDatabase {
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectDatabase {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `payload` as pretty JSON followed by a newline.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    payload: &T,
) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(payload).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(rendered.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
