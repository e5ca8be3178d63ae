//! Commands that apply interactions to stored entities.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use heatmap_core::{EntityKind, EntityRepository, InteractionKind, Rating};
use heatmap_scorer::{MetricError, MetricUpdater, MetricsSnapshot, ScoringPolicy, UpdateOutcome};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::entities::parse_id;
use crate::{
    ARG_DATABASE, ARG_ENTITY_ID, ARG_ENTITY_TYPE, ARG_KIND, ARG_RATING, CliError,
    database_or_default, open_existing_store, write_json,
};

pub(crate) const ENV_RECORD_ENTITY_TYPE: &str = "HEATMAP_CMDS_RECORD_ENTITY_TYPE";
pub(crate) const ENV_RECORD_ID: &str = "HEATMAP_CMDS_RECORD_ID";
pub(crate) const ENV_RECORD_KIND: &str = "HEATMAP_CMDS_RECORD_KIND";
pub(crate) const ENV_REVIEW_ENTITY_TYPE: &str = "HEATMAP_CMDS_REVIEW_ENTITY_TYPE";
pub(crate) const ENV_REVIEW_ID: &str = "HEATMAP_CMDS_REVIEW_ID";
pub(crate) const ENV_REVIEW_RATING: &str = "HEATMAP_CMDS_REVIEW_RATING";

/// CLI arguments for the `record` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "record",
    about = "Apply one interaction to a location or business",
    long_about = "Apply an interaction such as `view`, `share` or `bookmark` \
                 to a stored entity. Interactions with a business also credit \
                 its location. A rating is only used by `review`, which then \
                 behaves like the `review` subcommand."
)]
#[ortho_config(prefix = "HEATMAP")]
pub(crate) struct RecordArgs {
    /// Path to the SQLite database (defaults to `heatmap.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Entity type: `Location` or `Business`.
    #[arg(long = ARG_ENTITY_TYPE, value_name = "type")]
    #[serde(default)]
    pub(crate) entity_type: Option<String>,
    /// Identifier of the entity.
    #[arg(long = ARG_ENTITY_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<String>,
    /// Interaction name, e.g. `view`, `share` or `bookmark`.
    #[arg(long = ARG_KIND, value_name = "interaction")]
    #[serde(default)]
    pub(crate) kind: Option<String>,
    /// Rating between 1 and 5 for a `review`.
    #[arg(long = ARG_RATING, value_name = "stars")]
    #[serde(default)]
    pub(crate) rating: Option<f64>,
}

/// CLI arguments for the `review` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "review",
    about = "Store a review rating and apply the review interaction"
)]
#[ortho_config(prefix = "HEATMAP")]
pub(crate) struct ReviewArgs {
    /// Path to the SQLite database (defaults to `heatmap.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Entity type: `Location` or `Business`.
    #[arg(long = ARG_ENTITY_TYPE, value_name = "type")]
    #[serde(default)]
    pub(crate) entity_type: Option<String>,
    /// Identifier of the entity.
    #[arg(long = ARG_ENTITY_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<String>,
    /// Rating between 1 and 5.
    #[arg(long = ARG_RATING, value_name = "stars")]
    #[serde(default)]
    pub(crate) rating: Option<f64>,
}

/// Resolved `record` configuration. Values stay raw so the updater reports
/// malformed input in its own validation order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) entity_type: String,
    pub(crate) id: String,
    pub(crate) kind: String,
    pub(crate) rating: Option<f64>,
}

/// Resolved `review` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReviewConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) entity_type: String,
    pub(crate) id: String,
    pub(crate) rating: f64,
}

impl TryFrom<RecordArgs> for RecordConfig {
    type Error = CliError;

    fn try_from(args: RecordArgs) -> Result<Self, Self::Error> {
        let entity_type = args.entity_type.ok_or(CliError::MissingArgument {
            field: ARG_ENTITY_TYPE,
            env: ENV_RECORD_ENTITY_TYPE,
        })?;
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ENTITY_ID,
            env: ENV_RECORD_ID,
        })?;
        let kind = args.kind.ok_or(CliError::MissingArgument {
            field: ARG_KIND,
            env: ENV_RECORD_KIND,
        })?;
        Ok(Self {
            database: database_or_default(args.database),
            entity_type,
            id,
            kind,
            rating: args.rating,
        })
    }
}

impl TryFrom<ReviewArgs> for ReviewConfig {
    type Error = CliError;

    fn try_from(args: ReviewArgs) -> Result<Self, Self::Error> {
        let entity_type = args.entity_type.ok_or(CliError::MissingArgument {
            field: ARG_ENTITY_TYPE,
            env: ENV_REVIEW_ENTITY_TYPE,
        })?;
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ENTITY_ID,
            env: ENV_REVIEW_ID,
        })?;
        let rating = args.rating.ok_or(CliError::MissingArgument {
            field: ARG_RATING,
            env: ENV_REVIEW_RATING,
        })?;
        Ok(Self {
            database: database_or_default(args.database),
            entity_type,
            id,
            rating,
        })
    }
}

/// JSON report printed after an interaction is applied.
#[derive(Debug, Serialize)]
pub(crate) struct RecordReport {
    /// The interacted entity after the update.
    pub(crate) entity: MetricsSnapshot,
    /// The credited parent location, when propagation succeeded.
    pub(crate) parent: Option<MetricsSnapshot>,
    /// Why the parent location could not be credited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) propagation_error: Option<String>,
}

impl From<UpdateOutcome> for RecordReport {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            parent: outcome.propagation.applied().cloned(),
            propagation_error: outcome.propagation.error().map(ToString::to_string),
            entity: outcome.snapshot,
        }
    }
}

pub(crate) fn run_record(args: RecordArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let report = record(RecordConfig::try_from(merged)?)?;
    write_json(writer, &report)
}

/// A rated `review` is stored like the `review` subcommand does, so the
/// average stays the mean of every stored rating.
pub(crate) fn record(config: RecordConfig) -> Result<RecordReport, CliError> {
    if let (Ok(InteractionKind::Review), Some(rating)) =
        (config.kind.parse::<InteractionKind>(), config.rating)
    {
        return review(ReviewConfig {
            database: config.database,
            entity_type: config.entity_type,
            id: config.id,
            rating,
        });
    }
    let store = open_existing_store(&config.database)?;
    let updater = MetricUpdater::new(store, ScoringPolicy::default());
    let outcome =
        updater.update_raw(&config.entity_type, &config.id, &config.kind, config.rating)?;
    info!(
        "recorded {} on {} '{}'",
        config.kind, config.entity_type, config.id
    );
    Ok(RecordReport::from(outcome))
}

pub(crate) fn run_review(args: ReviewArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let report = review(ReviewConfig::try_from(merged)?)?;
    write_json(writer, &report)
}

/// Store the review first so the recomputed average includes it.
pub(crate) fn review(config: ReviewConfig) -> Result<RecordReport, CliError> {
    let kind: EntityKind = config
        .entity_type
        .parse()
        .map_err(MetricError::InvalidEntityType)?;
    let id = parse_id(config.id, ARG_ENTITY_ID)?;
    let rating = Rating::new(config.rating).map_err(MetricError::InvalidRating)?;

    let store = open_existing_store(&config.database)?;
    if store.entity(kind, &id)?.is_none() {
        return Err(CliError::Metric(MetricError::EntityNotFound {
            kind,
            id: id.to_string(),
        }));
    }
    store.insert_review(kind, &id, rating)?;

    let updater = MetricUpdater::new(store, ScoringPolicy::default());
    let outcome = updater.update(kind, &id, InteractionKind::Review, Some(rating))?;
    info!("reviewed {kind} '{id}' with {}", rating.value());
    Ok(RecordReport::from(outcome))
}
