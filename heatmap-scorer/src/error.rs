//! Error types raised while validating policies and applying interactions.
#![forbid(unsafe_code)]

use heatmap_core::{
    EntityId, EntityKind, InteractionKind, ParseEntityKindError, ParseInteractionKindError,
    RatingError, RepositoryError,
};
use thiserror::Error;

/// Errors raised when a [`ScoringPolicy`](crate::ScoringPolicy) is malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// An interaction weight was outside `(0.0, 1.0]`.
    #[error("weight {weight} for {kind} must lie in (0, 1]")]
    InvalidInteractionWeight {
        /// Interaction kind carrying the weight.
        kind: InteractionKind,
        /// Rejected weight.
        weight: f64,
    },
    /// The decay half-life was not a positive finite number of hours.
    #[error("decay half-life {hours}h must be positive and finite")]
    InvalidHalfLife {
        /// Rejected half-life in hours.
        hours: f64,
    },
    /// The activity ceiling would not normalise activity into `0.0..=1.0`.
    #[error("activity ceiling {ceiling} must be finite and greater than 1")]
    InvalidActivityCeiling {
        /// Rejected ceiling.
        ceiling: f64,
    },
    /// The blend weights were negative, non-finite or did not sum to one.
    #[error("blend weights {activity}/{rating}/{recency} must be non-negative and sum to 1")]
    InvalidBlend {
        /// Weight of the activity component.
        activity: f64,
        /// Weight of the rating component.
        rating: f64,
        /// Weight of the recency component.
        recency: f64,
    },
    /// The share of a business weight credited to its location was outside
    /// `(0.0, 1.0]`.
    #[error("parent share {share} must lie in (0, 1]")]
    InvalidParentShare {
        /// Rejected share.
        share: f64,
    },
}

/// Errors raised while applying an interaction or ranking entities.
#[derive(Debug, Error)]
pub enum MetricError {
    /// The entity type name was neither `Location` nor `Business`.
    #[error(transparent)]
    InvalidEntityType(#[from] ParseEntityKindError),
    /// The interaction name is not in the weight table.
    #[error(transparent)]
    InvalidInteractionKind(#[from] ParseInteractionKindError),
    /// A review carried a rating outside `1..=5`.
    #[error("invalid review rating")]
    InvalidRating(#[from] RatingError),
    /// No entity of the requested kind has the given identifier.
    #[error("{kind} '{id}' not found")]
    EntityNotFound {
        /// Kind that was looked up.
        kind: EntityKind,
        /// Identifier as supplied by the caller.
        id: String,
    },
    /// A business references a location that does not exist.
    #[error("business '{business_id}' references missing location '{location_id}'")]
    LocationNotFound {
        /// Business whose parent is dangling.
        business_id: EntityId,
        /// Location the business points at.
        location_id: EntityId,
    },
    /// The repository failed to read or write.
    #[error("repository operation failed")]
    Repository(#[from] RepositoryError),
    /// A thread panicked while holding the entity lock table.
    #[error("entity lock table poisoned")]
    LockPoisoned,
}

impl MetricError {
    /// Build an [`MetricError::EntityNotFound`] for a typed identifier.
    pub(crate) fn not_found(kind: EntityKind, id: &EntityId) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.to_string(),
        }
    }
}
