//! Read-only ranking commands.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use heatmap_core::EntityId;
use heatmap_scorer::{MetricUpdater, RankedEntity, ScoringPolicy};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::entities::parse_id;
use crate::{
    ARG_DATABASE, ARG_LOCATION, CliError, database_or_default, open_existing_store, write_json,
};

pub(crate) const ARG_LIMIT: &str = "limit";
pub(crate) const ENV_TOP_BUSINESSES_LOCATION: &str = "HEATMAP_CMDS_TOP_BUSINESSES_LOCATION";
pub(crate) const DEFAULT_POPULAR_LIMIT: usize = 5;
pub(crate) const DEFAULT_TOP_BUSINESSES_LIMIT: usize = 10;

/// CLI arguments for the `popular` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "popular", about = "Rank locations by live heatmap score")]
#[ortho_config(prefix = "HEATMAP")]
pub(crate) struct PopularArgs {
    /// Path to the SQLite database (defaults to `heatmap.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Number of locations to list (defaults to 5).
    #[arg(long = ARG_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

/// CLI arguments for the `top-businesses` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "top-businesses",
    about = "Rank the businesses of one location by live heatmap score"
)]
#[ortho_config(prefix = "HEATMAP")]
pub(crate) struct TopBusinessesArgs {
    /// Path to the SQLite database (defaults to `heatmap.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identifier of the location whose businesses are ranked.
    #[arg(long = ARG_LOCATION, value_name = "id")]
    #[serde(default)]
    pub(crate) location: Option<String>,
    /// Number of businesses to list (defaults to 10).
    #[arg(long = ARG_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

/// Resolved `popular` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PopularConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) limit: usize,
}

/// Resolved `top-businesses` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TopBusinessesConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) location: EntityId,
    pub(crate) limit: usize,
}

impl From<PopularArgs> for PopularConfig {
    fn from(args: PopularArgs) -> Self {
        Self {
            database: database_or_default(args.database),
            limit: args.limit.unwrap_or(DEFAULT_POPULAR_LIMIT),
        }
    }
}

impl TryFrom<TopBusinessesArgs> for TopBusinessesConfig {
    type Error = CliError;

    fn try_from(args: TopBusinessesArgs) -> Result<Self, Self::Error> {
        let raw_location = args.location.ok_or(CliError::MissingArgument {
            field: ARG_LOCATION,
            env: ENV_TOP_BUSINESSES_LOCATION,
        })?;
        Ok(Self {
            database: database_or_default(args.database),
            location: parse_id(raw_location, ARG_LOCATION)?,
            limit: args.limit.unwrap_or(DEFAULT_TOP_BUSINESSES_LIMIT),
        })
    }
}

pub(crate) fn run_popular(args: PopularArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let ranked = popular(&PopularConfig::from(merged))?;
    write_json(writer, &ranked)
}

pub(crate) fn popular(config: &PopularConfig) -> Result<Vec<RankedEntity>, CliError> {
    let store = open_existing_store(&config.database)?;
    let updater = MetricUpdater::new(store, ScoringPolicy::default());
    Ok(updater.popular_locations(Some(config.limit))?)
}

pub(crate) fn run_top_businesses(
    args: TopBusinessesArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let ranked = top_businesses(&TopBusinessesConfig::try_from(merged)?)?;
    write_json(writer, &ranked)
}

pub(crate) fn top_businesses(config: &TopBusinessesConfig) -> Result<Vec<RankedEntity>, CliError> {
    let store = open_existing_store(&config.database)?;
    let updater = MetricUpdater::new(store, ScoringPolicy::default());
    Ok(updater.top_businesses(&config.location, Some(config.limit))?)
}
