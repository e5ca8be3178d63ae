//! Blends activity, rating and recency into a `0..=100` heatmap score.
#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use heatmap_core::{EntityMetrics, Rating};
use serde::Serialize;

use crate::{DecayFunction, PolicyError};

const BLEND_TOLERANCE: f64 = 1e-9;

/// Relative contribution of each component to the blended total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    /// Weight of the activity component.
    pub activity: f64,
    /// Weight of the rating component.
    pub rating: f64,
    /// Weight of the recency component.
    pub recency: f64,
}

impl BlendWeights {
    /// Check that the weights are finite, non-negative and sum to one.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidBlend`] otherwise.
    #[expect(
        clippy::float_arithmetic,
        reason = "blend weights must sum to one within a tolerance"
    )]
    pub fn validate(self) -> Result<Self, PolicyError> {
        let parts = [self.activity, self.rating, self.recency];
        let usable = parts.iter().all(|part| part.is_finite() && *part >= 0.0);
        let sum: f64 = parts.iter().sum();
        if !usable || (sum - 1.0).abs() > BLEND_TOLERANCE {
            return Err(PolicyError::InvalidBlend {
                activity: self.activity,
                rating: self.rating,
                recency: self.recency,
            });
        }
        Ok(self)
    }
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            activity: 0.4,
            rating: 0.3,
            recency: 0.3,
        }
    }
}

/// Component scores behind one heatmap score, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Log-scaled activity normalised against the ceiling.
    pub activity: f64,
    /// Average rating mapped from `1..=5` onto `0..=1`.
    pub rating: f64,
    /// Decay factor for the last interaction.
    pub recency: f64,
    /// Weighted blend of the three components.
    pub total: f64,
}

impl ScoreBreakdown {
    /// Integer score in `0..=100`.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "total is clamped to 0..=100 before narrowing"
    )]
    pub fn heatmap_score(&self) -> u8 {
        let scaled = (self.total * 100.0).round();
        if scaled.is_nan() {
            return 0;
        }
        scaled.clamp(0.0, 100.0) as u8
    }
}

/// Computes heatmap scores from an entity's metrics.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use heatmap_scorer::ScoreCalculator;
///
/// let calculator = ScoreCalculator::default();
/// let now = Utc::now();
/// // One review rated 5 a moment ago.
/// assert_eq!(calculator.compute_score(1.0, Some(5.0), Some(now), now), 66);
/// assert_eq!(calculator.compute_score(0.0, None, None, now), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCalculator {
    decay: DecayFunction,
    activity_ceiling: f64,
    blend: BlendWeights,
}

impl ScoreCalculator {
    /// Activity count at which the activity component saturates.
    pub const DEFAULT_ACTIVITY_CEILING: f64 = 100.0;

    /// Build a calculator from its parts.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidActivityCeiling`] unless the ceiling is
    /// finite and above one, and [`PolicyError::InvalidBlend`] for unusable
    /// blend weights.
    pub fn new(
        decay: DecayFunction,
        activity_ceiling: f64,
        blend: BlendWeights,
    ) -> Result<Self, PolicyError> {
        if !activity_ceiling.is_finite() || activity_ceiling <= 1.0 {
            return Err(PolicyError::InvalidActivityCeiling {
                ceiling: activity_ceiling,
            });
        }
        Ok(Self {
            decay,
            activity_ceiling,
            blend: blend.validate()?,
        })
    }

    /// Decay function used for the recency component.
    #[must_use]
    pub const fn decay(&self) -> &DecayFunction {
        &self.decay
    }

    /// Activity ceiling used for normalisation.
    #[must_use]
    pub const fn activity_ceiling(&self) -> f64 {
        self.activity_ceiling
    }

    /// Blend weights applied to the components.
    #[must_use]
    pub const fn blend(&self) -> &BlendWeights {
        &self.blend
    }

    /// Score for the given metric values at `now`.
    #[must_use]
    pub fn compute_score(
        &self,
        activity_count: f64,
        avg_rating: Option<f64>,
        last_interaction: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> u8 {
        self.breakdown(activity_count, avg_rating, last_interaction, now)
            .heatmap_score()
    }

    /// Score for stored metrics, decayed to `now`.
    ///
    /// The `heatmap_score` stored on an entity is only valid as of its last
    /// interaction; read paths should use this instead.
    #[must_use]
    pub fn live_score(&self, metrics: &EntityMetrics, now: DateTime<Utc>) -> u8 {
        self.compute_score(
            metrics.activity_count,
            metrics.avg_rating,
            metrics.last_interaction,
            now,
        )
    }

    /// Component scores and blended total for the given metric values.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "the score is a weighted sum of fractional components"
    )]
    pub fn breakdown(
        &self,
        activity_count: f64,
        avg_rating: Option<f64>,
        last_interaction: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let activity = self.activity_component(activity_count);
        let rating = rating_component(avg_rating);
        let recency = self.decay.factor(last_interaction, now);
        let total = self.blend.activity * activity
            + self.blend.rating * rating
            + self.blend.recency * recency;
        ScoreBreakdown {
            activity,
            rating,
            recency,
            total,
        }
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "activity is log-scaled against the ceiling"
    )]
    fn activity_component(&self, activity_count: f64) -> f64 {
        if !activity_count.is_finite() || activity_count <= 0.0 {
            return 0.0;
        }
        let scaled = (activity_count + 1.0).log10() / self.activity_ceiling.log10();
        scaled.clamp(0.0, 1.0)
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self {
            decay: DecayFunction::default(),
            activity_ceiling: Self::DEFAULT_ACTIVITY_CEILING,
            blend: BlendWeights::default(),
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "ratings map linearly from 1..=5 onto 0..=1"
)]
fn rating_component(avg_rating: Option<f64>) -> f64 {
    match avg_rating {
        Some(rating) if rating.is_finite() => {
            ((rating - Rating::MIN) / (Rating::MAX - Rating::MIN)).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}
