//! Data access traits for scored entities.
//!
//! The `EntityRepository` trait is the only persistence surface the scoring
//! engine relies on: read an entity by id, write it back, and aggregate the
//! mean review rating for an entity. Ranking additionally lists locations and
//! the businesses nested under one location.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{Business, Entity, EntityId, EntityKind, Location};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteEntityStore, SqliteStoreError};

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing store failed while performing `operation`.
    #[error("failed to {operation}")]
    Backend {
        /// Description of the failed operation.
        operation: &'static str,
        /// Source error from the storage backend.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// A persisted record could not be decoded.
    #[error("stored {kind} {id} is malformed: {reason}")]
    Corrupt {
        /// Kind of the affected record.
        kind: EntityKind,
        /// Identifier of the affected record as stored.
        id: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A thread panicked while holding the repository lock.
    #[error("repository lock poisoned")]
    Poisoned,
}

impl RepositoryError {
    /// Wrap a backend failure with the operation that triggered it.
    pub fn backend(
        operation: &'static str,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Backend {
            operation,
            source: source.into(),
        }
    }
}

/// Read and write access to locations, businesses and review ratings.
///
/// Each call is all-or-nothing: a failed `save_entity` must leave the stored
/// record untouched. Read-modify-write cycles go through
/// [`EntityRepository::modify_entity`]; stores that several processes open at
/// once override it so concurrent updates cannot overwrite each other.
///
/// # Examples
///
/// ```rust
/// use std::{collections::HashMap, sync::Mutex};
/// use heatmap_core::{
///     Business, Entity, EntityId, EntityKind, EntityRepository, Location, RepositoryError,
/// };
///
/// #[derive(Default)]
/// struct Locations(Mutex<HashMap<EntityId, Location>>);
///
/// impl EntityRepository for Locations {
///     fn entity(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, RepositoryError> {
///         let map = self.0.lock().map_err(|_| RepositoryError::Poisoned)?;
///         Ok(match kind {
///             EntityKind::Location => map.get(id).cloned().map(Entity::Location),
///             EntityKind::Business => None,
///         })
///     }
///
///     fn save_entity(&self, entity: &Entity) -> Result<(), RepositoryError> {
///         if let Entity::Location(location) = entity {
///             let mut map = self.0.lock().map_err(|_| RepositoryError::Poisoned)?;
///             map.insert(location.id.clone(), location.clone());
///         }
///         Ok(())
///     }
///
///     fn average_rating(&self, _: EntityKind, _: &EntityId) -> Result<Option<f64>, RepositoryError> {
///         Ok(None)
///     }
///
///     fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
///         let map = self.0.lock().map_err(|_| RepositoryError::Poisoned)?;
///         Ok(map.values().cloned().collect())
///     }
///
///     fn businesses_in(&self, _: &EntityId) -> Result<Vec<Business>, RepositoryError> {
///         Ok(Vec::new())
///     }
/// }
///
/// let repo = Locations::default();
/// let id = EntityId::new("harbour").unwrap();
/// assert!(repo.location(&id).unwrap().is_none());
/// ```
pub trait EntityRepository {
    /// Load an entity by kind and identifier.
    ///
    /// Returns `Ok(None)` when no such entity exists.
    fn entity(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, RepositoryError>;

    /// Persist an entity, inserting or replacing the stored record.
    fn save_entity(&self, entity: &Entity) -> Result<(), RepositoryError>;

    /// Load a location by identifier.
    fn location(&self, id: &EntityId) -> Result<Option<Location>, RepositoryError> {
        Ok(self
            .entity(EntityKind::Location, id)?
            .and_then(Entity::into_location))
    }

    /// Mean of every review rating stored for the entity.
    ///
    /// Returns `Ok(None)` when the entity has no reviews.
    fn average_rating(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<f64>, RepositoryError>;

    /// List every location.
    fn locations(&self) -> Result<Vec<Location>, RepositoryError>;

    /// List the businesses owned by `location_id`.
    fn businesses_in(&self, location_id: &EntityId) -> Result<Vec<Business>, RepositoryError>;

    /// Load an entity, hand it to `modify` along with its mean review rating,
    /// and persist the result as one unit.
    ///
    /// Returns the saved entity, or `Ok(None)` without writing anything when
    /// the entity does not exist. The default composes the other methods and
    /// is only atomic when every writer shares this value.
    fn modify_entity(
        &self,
        kind: EntityKind,
        id: &EntityId,
        modify: &mut dyn FnMut(&mut Entity, Option<f64>),
    ) -> Result<Option<Entity>, RepositoryError> {
        let Some(mut entity) = self.entity(kind, id)? else {
            return Ok(None);
        };
        let average = self.average_rating(kind, id)?;
        modify(&mut entity, average);
        self.save_entity(&entity)?;
        Ok(Some(entity))
    }
}

impl<R: EntityRepository + ?Sized> EntityRepository for &R {
    fn entity(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, RepositoryError> {
        (**self).entity(kind, id)
    }

    fn save_entity(&self, entity: &Entity) -> Result<(), RepositoryError> {
        (**self).save_entity(entity)
    }

    fn location(&self, id: &EntityId) -> Result<Option<Location>, RepositoryError> {
        (**self).location(id)
    }

    fn average_rating(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<f64>, RepositoryError> {
        (**self).average_rating(kind, id)
    }

    fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
        (**self).locations()
    }

    fn businesses_in(&self, location_id: &EntityId) -> Result<Vec<Business>, RepositoryError> {
        (**self).businesses_in(location_id)
    }

    fn modify_entity(
        &self,
        kind: EntityKind,
        id: &EntityId,
        modify: &mut dyn FnMut(&mut Entity, Option<f64>),
    ) -> Result<Option<Entity>, RepositoryError> {
        (**self).modify_entity(kind, id, modify)
    }
}
