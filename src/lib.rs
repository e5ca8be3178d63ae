//! Facade crate for the heatmap engine.
//!
//! This crate re-exports the domain types, the repository seam and the
//! scoring components. The SQLite repository is available behind the
//! `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use heatmap_core::{
    Business, Clock, Entity, EntityId, EntityKind, EntityMetrics, EntityRepository,
    InteractionEvent, InteractionKind, Location, Rating, RepositoryError, SystemClock,
};

#[cfg(feature = "store-sqlite")]
pub use heatmap_core::{SqliteEntityStore, SqliteStoreError};

pub use heatmap_scorer::{
    DecayFunction, InteractionWeights, MetricError, MetricUpdater, MetricsSnapshot, PolicyError,
    Propagation, RankedEntity, ScoreCalculator, ScoringPolicy, UpdateOutcome,
};
