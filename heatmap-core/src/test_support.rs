//! Test-only, in-memory `EntityRepository` and `Clock` implementations used by
//! unit and behaviour tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::{
    Business, Clock, Entity, EntityId, EntityKind, EntityRepository, Location, Rating,
    RepositoryError,
};

#[derive(Debug, Default)]
struct MemoryState {
    locations: BTreeMap<EntityId, Location>,
    businesses: BTreeMap<EntityId, Business>,
    reviews: Vec<(EntityKind, EntityId, f64)>,
    saves: usize,
}

/// In-memory `EntityRepository` implementation used in tests.
///
/// The repository counts successful saves so tests can assert that a failed
/// update performed no writes.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    /// Add a location, consuming and returning the repository.
    #[must_use]
    pub fn with_location(self, location: Location) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.locations.insert(location.id.clone(), location);
        }
        self
    }

    /// Add a business, consuming and returning the repository.
    #[must_use]
    pub fn with_business(self, business: Business) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.businesses.insert(business.id.clone(), business);
        }
        self
    }

    /// Record a review rating for an entity.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Poisoned`] if a previous holder panicked.
    pub fn insert_review(
        &self,
        kind: EntityKind,
        id: &EntityId,
        rating: Rating,
    ) -> Result<(), RepositoryError> {
        self.lock()?
            .reviews
            .push((kind, id.clone(), rating.value()));
        Ok(())
    }

    /// Number of successful `save_entity` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.saves)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state.lock().map_err(|_| RepositoryError::Poisoned)
    }
}

impl EntityRepository for MemoryRepository {
    fn entity(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, RepositoryError> {
        let state = self.lock()?;
        Ok(match kind {
            EntityKind::Location => state.locations.get(id).cloned().map(Entity::Location),
            EntityKind::Business => state.businesses.get(id).cloned().map(Entity::Business),
        })
    }

    fn save_entity(&self, entity: &Entity) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match entity {
            Entity::Location(location) => {
                state.locations.insert(location.id.clone(), location.clone());
            }
            Entity::Business(business) => {
                state.businesses.insert(business.id.clone(), business.clone());
            }
        }
        state.saves += 1;
        Ok(())
    }

    fn average_rating(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<f64>, RepositoryError> {
        let state = self.lock()?;
        let ratings: Vec<f64> = state
            .reviews
            .iter()
            .filter(|(review_kind, review_id, _)| *review_kind == kind && review_id == id)
            .map(|(_, _, rating)| *rating)
            .collect();
        if ratings.is_empty() {
            return Ok(None);
        }
        Ok(Some(ratings.iter().sum::<f64>() / ratings.len() as f64))
    }

    fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
        Ok(self.lock()?.locations.values().cloned().collect())
    }

    fn businesses_in(&self, location_id: &EntityId) -> Result<Vec<Business>, RepositoryError> {
        Ok(self
            .lock()?
            .businesses
            .values()
            .filter(|business| &business.location_id == location_id)
            .cloned()
            .collect())
    }
}

/// Deterministic `Clock` that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Freeze time at `now`.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map_or_else(|poisoned| *poisoned.into_inner(), |now| *now)
    }
}
