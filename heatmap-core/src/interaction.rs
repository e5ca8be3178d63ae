//! Interaction events reported against locations and businesses.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::{EntityId, EntityKind};

/// The closed set of user actions that contribute activity.
///
/// Names parse without regard to ASCII case, like [`EntityKind`] names.
///
/// # Examples
/// ```
/// use heatmap_core::InteractionKind;
///
/// let kind: InteractionKind = "photo_upload".parse().unwrap();
/// assert_eq!(kind, InteractionKind::PhotoUpload);
/// assert_eq!(kind.to_string(), "photo_upload");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InteractionKind {
    /// A written review, optionally carrying a rating.
    Review,
    /// The entity was shared with another user.
    Share,
    /// A photo or post was uploaded for the entity.
    PhotoUpload,
    /// The entity was bookmarked.
    Bookmark,
    /// The entity was mentioned in a chat.
    ChatMention,
    /// The entity page was viewed.
    View,
}

/// Error returned when parsing an interaction name outside the weight table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown interaction kind '{raw}'")]
pub struct ParseInteractionKindError {
    /// The rejected input.
    pub raw: String,
}

impl InteractionKind {
    /// Every interaction kind, strongest first.
    pub const ALL: [Self; 6] = [
        Self::Review,
        Self::Share,
        Self::PhotoUpload,
        Self::Bookmark,
        Self::ChatMention,
        Self::View,
    ];

    /// Return the snake-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Share => "share",
            Self::PhotoUpload => "photo_upload",
            Self::Bookmark => "bookmark",
            Self::ChatMention => "chat_mention",
            Self::View => "view",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = ParseInteractionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseInteractionKindError { raw: s.to_owned() })
    }
}

/// A review rating in the inclusive range `1.0..=5.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "f64", into = "f64"))]
pub struct Rating(f64);

/// Errors returned by [`Rating::new`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RatingError {
    /// The value was NaN or infinite.
    #[error("rating must be a finite number")]
    NotFinite,
    /// The value fell outside `1.0..=5.0`.
    #[error("rating {value} is outside 1..=5")]
    OutOfRange {
        /// The rejected value.
        value: f64,
    },
}

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: f64 = 1.0;
    /// Highest accepted rating.
    pub const MAX: f64 = 5.0;

    /// Validate a raw rating.
    ///
    /// # Errors
    /// Returns [`RatingError`] for non-finite or out-of-range input.
    ///
    /// # Examples
    /// ```
    /// use heatmap_core::Rating;
    ///
    /// assert_eq!(Rating::new(4.5).map(Rating::value), Ok(4.5));
    /// assert!(Rating::new(0.5).is_err());
    /// ```
    pub fn new(value: f64) -> Result<Self, RatingError> {
        if !value.is_finite() {
            return Err(RatingError::NotFinite);
        }
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(RatingError::OutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Return the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = RatingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

/// A single interaction against one entity.
///
/// Events are transient parameter objects and are never persisted. A rating
/// is only consulted for [`InteractionKind::Review`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionEvent {
    /// Kind of the targeted entity.
    pub entity_kind: EntityKind,
    /// Identifier of the targeted entity.
    pub entity_id: EntityId,
    /// What the user did.
    pub kind: InteractionKind,
    /// Optional rating attached to a review.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rating: Option<Rating>,
}

impl InteractionEvent {
    /// Build an event without a rating.
    #[must_use]
    pub const fn new(entity_kind: EntityKind, entity_id: EntityId, kind: InteractionKind) -> Self {
        Self {
            entity_kind,
            entity_id,
            kind,
            rating: None,
        }
    }

    /// Build a review event carrying `rating`.
    #[must_use]
    pub const fn review(entity_kind: EntityKind, entity_id: EntityId, rating: Rating) -> Self {
        Self {
            entity_kind,
            entity_id,
            kind: InteractionKind::Review,
            rating: Some(rating),
        }
    }

    /// Return the rating that should feed the average, if any.
    ///
    /// Ratings attached to anything other than a review are ignored.
    #[must_use]
    pub fn effective_rating(&self) -> Option<Rating> {
        match self.kind {
            InteractionKind::Review => self.rating,
            _ => None,
        }
    }
}
