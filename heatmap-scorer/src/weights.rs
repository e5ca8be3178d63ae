//! Activity contribution of each interaction kind.
#![forbid(unsafe_code)]

use heatmap_core::{InteractionKind, ParseInteractionKindError};

use crate::PolicyError;

/// Weight added to an entity's activity count per interaction kind.
///
/// The default table is the fixed production policy:
///
/// | kind | weight |
/// |---|---|
/// | review | 1.0 |
/// | share | 0.8 |
/// | photo_upload | 0.6 |
/// | bookmark | 0.5 |
/// | chat_mention | 0.3 |
/// | view | 0.1 |
///
/// # Examples
/// ```
/// use heatmap_core::InteractionKind;
/// use heatmap_scorer::InteractionWeights;
///
/// let weights = InteractionWeights::default();
/// assert_eq!(weights.weight_of(InteractionKind::Share), 0.8);
/// assert!(weights.weight_of_name("post").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionWeights {
    /// Weight of a review.
    pub review: f64,
    /// Weight of a share.
    pub share: f64,
    /// Weight of a photo upload.
    pub photo_upload: f64,
    /// Weight of a bookmark.
    pub bookmark: f64,
    /// Weight of a chat mention.
    pub chat_mention: f64,
    /// Weight of a page view.
    pub view: f64,
}

impl InteractionWeights {
    /// Look up the weight for a typed interaction kind.
    #[must_use]
    pub const fn weight_of(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::Review => self.review,
            InteractionKind::Share => self.share,
            InteractionKind::PhotoUpload => self.photo_upload,
            InteractionKind::Bookmark => self.bookmark,
            InteractionKind::ChatMention => self.chat_mention,
            InteractionKind::View => self.view,
        }
    }

    /// Look up the weight for an interaction name.
    ///
    /// # Errors
    /// Returns [`ParseInteractionKindError`] when `name` is not in the table.
    /// Unknown kinds are never defaulted to a weight.
    pub fn weight_of_name(&self, name: &str) -> Result<f64, ParseInteractionKindError> {
        let kind: InteractionKind = name.parse()?;
        Ok(self.weight_of(kind))
    }

    /// Check that every weight lies in `(0.0, 1.0]`.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidInteractionWeight`] for the first kind
    /// whose weight is outside the range.
    pub fn validate(self) -> Result<Self, PolicyError> {
        for kind in InteractionKind::ALL {
            let weight = self.weight_of(kind);
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(PolicyError::InvalidInteractionWeight { kind, weight });
            }
        }
        Ok(self)
    }
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            review: 1.0,
            share: 0.8,
            photo_upload: 0.6,
            bookmark: 0.5,
            chat_mention: 0.3,
            view: 0.1,
        }
    }
}
