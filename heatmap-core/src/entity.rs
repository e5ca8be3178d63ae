//! Locations and businesses tracked for popularity scoring.
//!
//! A [`Location`] is a root entity. A [`Business`] always belongs to exactly
//! one location through [`Business::location_id`]. Both carry the same
//! [`EntityMetrics`] block, which only the metric updater mutates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use geo::Coord;
use thiserror::Error;

/// Opaque identifier of a location or business.
///
/// # Examples
/// ```
/// use heatmap_core::EntityId;
///
/// # fn main() -> Result<(), heatmap_core::EntityIdError> {
/// let id = EntityId::new("loc-1")?;
/// assert_eq!(id.as_str(), "loc-1");
/// assert!(EntityId::new("   ").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(String);

/// Errors returned by [`EntityId::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityIdError {
    /// The identifier was empty or only whitespace.
    #[error("entity id must not be blank")]
    Blank,
}

impl EntityId {
    /// Validate and wrap an identifier.
    ///
    /// # Errors
    /// Returns [`EntityIdError::Blank`] for empty or whitespace-only input.
    pub fn new(raw: impl Into<String>) -> Result<Self, EntityIdError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(EntityIdError::Blank);
        }
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Discriminates the two kinds of scored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    /// A root location such as a city district or landmark.
    Location,
    /// A business nested under a location.
    Business,
}

/// Error returned when parsing an unknown entity type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity type '{raw}' (expected Location or Business)")]
pub struct ParseEntityKindError {
    /// The rejected input.
    pub raw: String,
}

impl EntityKind {
    /// Return the canonical type name.
    ///
    /// # Examples
    /// ```
    /// use heatmap_core::EntityKind;
    ///
    /// assert_eq!(EntityKind::Business.as_str(), "Business");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Business => "Business",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("location") {
            Ok(Self::Location)
        } else if s.eq_ignore_ascii_case("business") {
            Ok(Self::Business)
        } else {
            Err(ParseEntityKindError { raw: s.to_owned() })
        }
    }
}

/// Popularity metrics shared by every entity.
///
/// `heatmap_score` caches the score computed at `last_interaction`; it is not
/// a live value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityMetrics {
    /// Accumulated weighted interactions.
    pub activity_count: f64,
    /// Mean review rating, unset until the first review.
    pub avg_rating: Option<f64>,
    /// Instant of the most recent interaction.
    pub last_interaction: Option<DateTime<Utc>>,
    /// Score in `0..=100` as of `last_interaction`.
    pub heatmap_score: u8,
}

impl EntityMetrics {
    /// Metrics for an entity that has never been interacted with.
    #[must_use]
    pub const fn fresh() -> Self {
        Self {
            activity_count: 0.0,
            avg_rating: None,
            last_interaction: None,
            heatmap_score: 0,
        }
    }
}

/// A root entity that may own businesses.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Unique identifier.
    pub id: EntityId,
    /// Opaque position, `x = longitude` and `y = latitude`.
    pub coordinates: Coord<f64>,
    /// Popularity metrics.
    pub metrics: EntityMetrics,
}

impl Location {
    /// Register a location with fresh metrics.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use heatmap_core::{EntityId, Location};
    ///
    /// let id = EntityId::new("old-town").unwrap();
    /// let location = Location::new(id, Coord { x: 74.3, y: 31.5 });
    /// assert_eq!(location.metrics.heatmap_score, 0);
    /// ```
    #[must_use]
    pub const fn new(id: EntityId, coordinates: Coord<f64>) -> Self {
        Self {
            id,
            coordinates,
            metrics: EntityMetrics::fresh(),
        }
    }
}

/// A business owned by exactly one location.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Business {
    /// Unique identifier.
    pub id: EntityId,
    /// Identifier of the owning location.
    pub location_id: EntityId,
    /// Opaque position, `x = longitude` and `y = latitude`.
    pub coordinates: Coord<f64>,
    /// Popularity metrics.
    pub metrics: EntityMetrics,
}

impl Business {
    /// Register a business under `location_id` with fresh metrics.
    #[must_use]
    pub const fn new(id: EntityId, location_id: EntityId, coordinates: Coord<f64>) -> Self {
        Self {
            id,
            location_id,
            coordinates,
            metrics: EntityMetrics::fresh(),
        }
    }
}

/// Either kind of scored entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum Entity {
    /// A root location.
    Location(Location),
    /// A business and its parent reference.
    Business(Business),
}

impl Entity {
    /// Report which kind of entity this is.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Location(_) => EntityKind::Location,
            Self::Business(_) => EntityKind::Business,
        }
    }

    /// Borrow the entity identifier.
    #[must_use]
    pub const fn id(&self) -> &EntityId {
        match self {
            Self::Location(location) => &location.id,
            Self::Business(business) => &business.id,
        }
    }

    /// Borrow the popularity metrics.
    #[must_use]
    pub const fn metrics(&self) -> &EntityMetrics {
        match self {
            Self::Location(location) => &location.metrics,
            Self::Business(business) => &business.metrics,
        }
    }

    /// Mutably borrow the popularity metrics.
    pub fn metrics_mut(&mut self) -> &mut EntityMetrics {
        match self {
            Self::Location(location) => &mut location.metrics,
            Self::Business(business) => &mut business.metrics,
        }
    }

    /// Return the owning location for businesses.
    #[must_use]
    pub const fn parent_location(&self) -> Option<&EntityId> {
        match self {
            Self::Location(_) => None,
            Self::Business(business) => Some(&business.location_id),
        }
    }

    /// Unwrap a location, discarding businesses.
    #[must_use]
    pub fn into_location(self) -> Option<Location> {
        match self {
            Self::Location(location) => Some(location),
            Self::Business(_) => None,
        }
    }

    /// Unwrap a business, discarding locations.
    #[must_use]
    pub fn into_business(self) -> Option<Business> {
        match self {
            Self::Business(business) => Some(business),
            Self::Location(_) => None,
        }
    }
}

impl From<Location> for Entity {
    fn from(location: Location) -> Self {
        Self::Location(location)
    }
}

impl From<Business> for Entity {
    fn from(business: Business) -> Self {
        Self::Business(business)
    }
}
