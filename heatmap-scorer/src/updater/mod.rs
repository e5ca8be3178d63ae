//! The single mutating entry point for entity metrics.
#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use heatmap_core::{
    Clock, EntityId, EntityKind, EntityMetrics, EntityRepository, InteractionEvent,
    InteractionKind, Rating, SystemClock,
};
use log::{debug, warn};
use serde::Serialize;

use crate::locks::EntityLocks;
use crate::ranking::{self, RankedEntity};
use crate::{MetricError, ScoringPolicy};

/// Metrics of one entity immediately after an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Kind of the updated entity.
    pub entity_kind: EntityKind,
    /// Identifier of the updated entity.
    pub entity_id: EntityId,
    /// Accumulated weighted activity.
    pub activity_count: f64,
    /// Mean review rating, if any review was recorded.
    pub avg_rating: Option<f64>,
    /// Score in `0..=100` at the time of the update.
    pub heatmap_score: u8,
    /// Instant of the update.
    pub last_interaction: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    fn capture(entity_kind: EntityKind, entity_id: &EntityId, metrics: &EntityMetrics) -> Self {
        Self {
            entity_kind,
            entity_id: entity_id.clone(),
            activity_count: metrics.activity_count,
            avg_rating: metrics.avg_rating,
            heatmap_score: metrics.heatmap_score,
            last_interaction: metrics.last_interaction,
        }
    }
}

/// What happened to the parent location of the updated entity.
#[derive(Debug)]
pub enum Propagation {
    /// The updated entity was a location.
    NotApplicable,
    /// The parent location was credited and saved.
    Applied(MetricsSnapshot),
    /// The primary update stands but the parent could not be updated.
    Failed(MetricError),
}

impl Propagation {
    /// Parent snapshot when propagation succeeded.
    #[must_use]
    pub const fn applied(&self) -> Option<&MetricsSnapshot> {
        match self {
            Self::Applied(snapshot) => Some(snapshot),
            Self::NotApplicable | Self::Failed(_) => None,
        }
    }

    /// Propagation error when it failed.
    #[must_use]
    pub const fn error(&self) -> Option<&MetricError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::NotApplicable | Self::Applied(_) => None,
        }
    }
}

/// Result of a successful primary update.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// The interacted entity after the update.
    pub snapshot: MetricsSnapshot,
    /// Outcome of crediting the parent location.
    pub propagation: Propagation,
}

/// Applies interactions to entities and keeps their scores current.
///
/// Each update is one [`EntityRepository::modify_entity`] cycle taken under a
/// per-entity lock, so concurrent interactions with one entity never lose
/// increments while different entities proceed in parallel. Updaters in other
/// processes are serialised by the repository itself. For businesses a second,
/// independent cycle credits the parent location with a share of the weight.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use heatmap_core::{
///     EntityId, EntityKind, EntityRepository, InteractionKind, Location, SqliteEntityStore,
/// };
/// use heatmap_scorer::{MetricUpdater, ScoringPolicy};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteEntityStore::open_in_memory()?;
/// let id = EntityId::new("harbour")?;
/// store.save_entity(&Location::new(id.clone(), Coord { x: 0.0, y: 0.0 }).into())?;
///
/// let updater = MetricUpdater::new(store, ScoringPolicy::default());
/// updater.update(EntityKind::Location, &id, InteractionKind::View, None)?;
/// let outcome = updater.update(EntityKind::Location, &id, InteractionKind::Bookmark, None)?;
/// assert!((outcome.snapshot.activity_count - 0.6).abs() < 1e-9);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MetricUpdater<R, C = SystemClock> {
    repository: R,
    policy: ScoringPolicy,
    clock: C,
    locks: EntityLocks,
}

impl<R> MetricUpdater<R, SystemClock>
where
    R: EntityRepository,
{
    /// Build an updater that reads the system clock.
    #[must_use]
    pub fn new(repository: R, policy: ScoringPolicy) -> Self {
        Self::with_clock(repository, policy, SystemClock)
    }
}

impl<R, C> MetricUpdater<R, C>
where
    R: EntityRepository,
    C: Clock,
{
    /// Build an updater with an explicit time source.
    #[must_use]
    pub fn with_clock(repository: R, policy: ScoringPolicy, clock: C) -> Self {
        Self {
            repository,
            policy,
            clock,
            locks: EntityLocks::default(),
        }
    }

    /// Borrow the underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Borrow the scoring policy.
    #[must_use]
    pub const fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Apply one interaction to an entity.
    ///
    /// `rating` is only consulted for [`InteractionKind::Review`]; the
    /// entity's average is recomputed from every stored review, falling back
    /// to `rating` itself when the repository holds none yet.
    ///
    /// # Errors
    /// Returns [`MetricError::EntityNotFound`] without writing anything when
    /// the entity does not exist, and [`MetricError::Repository`] when the
    /// store fails. Parent propagation failures do not fail the call; they
    /// are reported through [`UpdateOutcome::propagation`].
    pub fn update(
        &self,
        kind: EntityKind,
        id: &EntityId,
        interaction: InteractionKind,
        rating: Option<Rating>,
    ) -> Result<UpdateOutcome, MetricError> {
        self.update_event(&InteractionEvent {
            entity_kind: kind,
            entity_id: id.clone(),
            kind: interaction,
            rating,
        })
    }

    /// Apply a typed interaction event.
    ///
    /// # Errors
    /// See [`MetricUpdater::update`].
    pub fn update_event(&self, event: &InteractionEvent) -> Result<UpdateOutcome, MetricError> {
        let InteractionEvent {
            entity_kind: kind,
            entity_id: id,
            kind: interaction,
            rating,
        } = event;
        let review_rating = event.effective_rating();
        if let (Some(ignored), None) = (rating, review_rating) {
            debug!(
                "ignoring rating {} on {interaction} for {kind} '{id}'",
                ignored.value()
            );
        }
        let now = self.clock.now();
        let (snapshot, parent) =
            self.apply_primary(*kind, id, self.policy.weight_of(*interaction), review_rating, now)?;
        debug!(
            "{interaction} on {kind} '{id}': activity {} score {}",
            snapshot.activity_count, snapshot.heatmap_score
        );

        let propagation = match parent {
            None => Propagation::NotApplicable,
            Some(location_id) => {
                let weight = self.policy.parent_weight_of(*interaction);
                match self.propagate(id, &location_id, weight, now) {
                    Ok(parent_snapshot) => Propagation::Applied(parent_snapshot),
                    Err(err) => {
                        warn!(
                            "failed to credit location '{location_id}' for business '{id}': {err}"
                        );
                        Propagation::Failed(err)
                    }
                }
            }
        };
        Ok(UpdateOutcome {
            snapshot,
            propagation,
        })
    }

    /// Parse and apply an interaction given by name.
    ///
    /// Validation happens before any repository access: the entity type,
    /// then the interaction kind, then the identifier, then the rating of a
    /// review. Type and kind names are matched ignoring ASCII case.
    ///
    /// # Errors
    /// Returns [`MetricError::InvalidEntityType`],
    /// [`MetricError::InvalidInteractionKind`] or [`MetricError::InvalidRating`]
    /// for malformed input, [`MetricError::EntityNotFound`] for a blank or
    /// unknown identifier, and any other error from
    /// [`MetricUpdater::update`].
    pub fn update_raw(
        &self,
        entity_type: &str,
        entity_id: &str,
        interaction_name: &str,
        rating: Option<f64>,
    ) -> Result<UpdateOutcome, MetricError> {
        let kind: EntityKind = entity_type.parse()?;
        let interaction: InteractionKind = interaction_name.parse()?;
        let id = EntityId::new(entity_id).map_err(|_| MetricError::EntityNotFound {
            kind,
            id: entity_id.to_owned(),
        })?;
        let review_rating = match (interaction, rating) {
            (InteractionKind::Review, Some(raw)) => Some(Rating::new(raw)?),
            (_, Some(raw)) => {
                debug!("ignoring rating {raw} on {interaction} for {kind} '{id}'");
                None
            }
            (_, None) => None,
        };
        self.update(kind, &id, interaction, review_rating)
    }

    /// Locations ranked by their live score at the current instant.
    ///
    /// # Errors
    /// Returns [`MetricError::Repository`] when listing fails.
    pub fn popular_locations(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<RankedEntity>, MetricError> {
        ranking::popular_locations(&self.repository, &self.policy, self.clock.now(), limit)
    }

    /// Businesses of one location ranked by their live score at the current
    /// instant.
    ///
    /// # Errors
    /// Returns [`MetricError::EntityNotFound`] for an unknown location and
    /// [`MetricError::Repository`] when listing fails.
    pub fn top_businesses(
        &self,
        location_id: &EntityId,
        limit: Option<usize>,
    ) -> Result<Vec<RankedEntity>, MetricError> {
        ranking::top_businesses(
            &self.repository,
            &self.policy,
            location_id,
            self.clock.now(),
            limit,
        )
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "activity accumulates fractional interaction weights"
    )]
    fn apply_primary(
        &self,
        kind: EntityKind,
        id: &EntityId,
        weight: f64,
        rating: Option<Rating>,
        now: DateTime<Utc>,
    ) -> Result<(MetricsSnapshot, Option<EntityId>), MetricError> {
        let _guard = self.locks.acquire(kind, id)?;
        let calculator = self.policy.calculator();
        let entity = self
            .repository
            .modify_entity(kind, id, &mut |entity, stored_average| {
                let metrics = entity.metrics_mut();
                metrics.activity_count += weight;
                metrics.last_interaction = Some(now);
                if let Some(submitted) = rating {
                    metrics.avg_rating = Some(stored_average.unwrap_or_else(|| submitted.value()));
                }
                metrics.heatmap_score = calculator.live_score(metrics, now);
            })?
            .ok_or_else(|| MetricError::not_found(kind, id))?;

        let snapshot = MetricsSnapshot::capture(kind, id, entity.metrics());
        Ok((snapshot, entity.parent_location().cloned()))
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "activity accumulates fractional interaction weights"
    )]
    fn propagate(
        &self,
        business_id: &EntityId,
        location_id: &EntityId,
        weight: f64,
        now: DateTime<Utc>,
    ) -> Result<MetricsSnapshot, MetricError> {
        let _guard = self.locks.acquire(EntityKind::Location, location_id)?;
        let calculator = self.policy.calculator();
        let location = self
            .repository
            .modify_entity(EntityKind::Location, location_id, &mut |location, _| {
                let metrics = location.metrics_mut();
                metrics.activity_count += weight;
                metrics.last_interaction = Some(now);
                metrics.heatmap_score = calculator.live_score(metrics, now);
            })?
            .ok_or_else(|| MetricError::LocationNotFound {
                business_id: business_id.clone(),
                location_id: location_id.clone(),
            })?;

        Ok(MetricsSnapshot::capture(
            EntityKind::Location,
            location_id,
            location.metrics(),
        ))
    }
}
