//! Database initialisation and entity registration commands.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geo::Coord;
use heatmap_core::{
    Business, Entity, EntityId, EntityKind, EntityRepository, Location, SqliteEntityStore,
};
use heatmap_scorer::MetricError;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_ENTITY_ID, ARG_LOCATION, CliError, database_or_default, fs,
    open_existing_store, write_json,
};

pub(crate) const ENV_ADD_LOCATION_ID: &str = "HEATMAP_CMDS_ADD_LOCATION_ID";
pub(crate) const ENV_ADD_BUSINESS_ID: &str = "HEATMAP_CMDS_ADD_BUSINESS_ID";
pub(crate) const ENV_ADD_BUSINESS_LOCATION: &str = "HEATMAP_CMDS_ADD_BUSINESS_LOCATION";

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "init",
    about = "Create the heatmap database schema",
    long_about = "Create the SQLite database and its tables. Missing parent \
                 directories are created; an existing database is left intact."
)]
#[ortho_config(prefix = "HEATMAP")]
pub(crate) struct InitArgs {
    /// Path to the SQLite database (defaults to `heatmap.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// CLI arguments for the `add-location` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "add-location", about = "Register a location")]
#[ortho_config(prefix = "HEATMAP")]
pub(crate) struct AddLocationArgs {
    /// Path to the SQLite database (defaults to `heatmap.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identifier of the new location.
    #[arg(long = ARG_ENTITY_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<String>,
    /// Longitude in degrees.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Latitude in degrees.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
}

/// CLI arguments for the `add-business` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "add-business",
    about = "Register a business under an existing location"
)]
#[ortho_config(prefix = "HEATMAP")]
pub(crate) struct AddBusinessArgs {
    /// Path to the SQLite database (defaults to `heatmap.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identifier of the new business.
    #[arg(long = ARG_ENTITY_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<String>,
    /// Identifier of the owning location.
    #[arg(long = ARG_LOCATION, value_name = "id")]
    #[serde(default)]
    pub(crate) location: Option<String>,
    /// Longitude in degrees.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Latitude in degrees.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
}

/// Resolved `add-location` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AddLocationConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) id: EntityId,
    pub(crate) coordinates: Coord<f64>,
}

/// Resolved `add-business` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AddBusinessConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) id: EntityId,
    pub(crate) location: EntityId,
    pub(crate) coordinates: Coord<f64>,
}

impl TryFrom<AddLocationArgs> for AddLocationConfig {
    type Error = CliError;

    fn try_from(args: AddLocationArgs) -> Result<Self, Self::Error> {
        let raw_id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ENTITY_ID,
            env: ENV_ADD_LOCATION_ID,
        })?;
        Ok(Self {
            database: database_or_default(args.database),
            id: parse_id(raw_id, ARG_ENTITY_ID)?,
            coordinates: coordinates(args.lon, args.lat)?,
        })
    }
}

impl TryFrom<AddBusinessArgs> for AddBusinessConfig {
    type Error = CliError;

    fn try_from(args: AddBusinessArgs) -> Result<Self, Self::Error> {
        let raw_id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ENTITY_ID,
            env: ENV_ADD_BUSINESS_ID,
        })?;
        let raw_location = args.location.ok_or(CliError::MissingArgument {
            field: ARG_LOCATION,
            env: ENV_ADD_BUSINESS_LOCATION,
        })?;
        Ok(Self {
            database: database_or_default(args.database),
            id: parse_id(raw_id, ARG_ENTITY_ID)?,
            location: parse_id(raw_location, ARG_LOCATION)?,
            coordinates: coordinates(args.lon, args.lat)?,
        })
    }
}

/// Parse a user-supplied identifier, naming the offending option on failure.
pub(crate) fn parse_id(raw: String, field: &'static str) -> Result<EntityId, CliError> {
    EntityId::new(raw).map_err(|source| CliError::InvalidId { field, source })
}

fn coordinates(lon: Option<f64>, lat: Option<f64>) -> Result<Coord<f64>, CliError> {
    let x = lon.unwrap_or_default();
    let y = lat.unwrap_or_default();
    if (-180.0..=180.0).contains(&x) && (-90.0..=90.0).contains(&y) {
        Ok(Coord { x, y })
    } else {
        Err(CliError::InvalidCoordinates { lon: x, lat: y })
    }
}

pub(crate) fn run_init(args: InitArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = init_database(merged)?;
    write_json(writer, &serde_json::json!({ "database": database }))
}

pub(crate) fn init_database(args: InitArgs) -> Result<Utf8PathBuf, CliError> {
    let database = database_or_default(args.database);
    fs::ensure_parent_dir(&database).map_err(|source| CliError::CreateDatabaseDir {
        path: database.clone(),
        source,
    })?;
    drop(SqliteEntityStore::open(database.as_std_path())?);
    info!("initialised heatmap database at {database}");
    Ok(database)
}

pub(crate) fn run_add_location(
    args: AddLocationArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let location = add_location(AddLocationConfig::try_from(merged)?)?;
    write_json(writer, &location)
}

pub(crate) fn add_location(config: AddLocationConfig) -> Result<Location, CliError> {
    let store = open_existing_store(&config.database)?;
    ensure_absent(&store, EntityKind::Location, &config.id)?;
    let location = Location::new(config.id, config.coordinates);
    store.save_entity(&Entity::from(location.clone()))?;
    info!("registered location {}", location.id);
    Ok(location)
}

pub(crate) fn run_add_business(
    args: AddBusinessArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let business = add_business(AddBusinessConfig::try_from(merged)?)?;
    write_json(writer, &business)
}

pub(crate) fn add_business(config: AddBusinessConfig) -> Result<Business, CliError> {
    let store = open_existing_store(&config.database)?;
    if store.location(&config.location)?.is_none() {
        return Err(CliError::Metric(MetricError::EntityNotFound {
            kind: EntityKind::Location,
            id: config.location.to_string(),
        }));
    }
    ensure_absent(&store, EntityKind::Business, &config.id)?;
    let business = Business::new(config.id, config.location, config.coordinates);
    store.save_entity(&Entity::from(business.clone()))?;
    info!(
        "registered business {} under location {}",
        business.id, business.location_id
    );
    Ok(business)
}

fn ensure_absent(
    store: &SqliteEntityStore,
    kind: EntityKind,
    id: &EntityId,
) -> Result<(), CliError> {
    match store.entity(kind, id)? {
        Some(_) => Err(CliError::EntityExists {
            kind,
            id: id.to_string(),
        }),
        None => Ok(()),
    }
}
