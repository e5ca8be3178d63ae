//! Recency decay applied to the time since an entity's last interaction.
#![forbid(unsafe_code)]

use std::f64::consts::LN_2;

use chrono::{DateTime, Utc};

use crate::PolicyError;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Exponential decay with a configurable half-life.
///
/// An entity touched `half_life_hours` ago keeps half of its recency credit;
/// after seven half-lives less than one percent remains.
///
/// # Examples
/// ```
/// use chrono::{Duration, Utc};
/// use heatmap_scorer::DecayFunction;
///
/// let decay = DecayFunction::default();
/// let now = Utc::now();
/// assert_eq!(decay.factor(None, now), 0.0);
/// assert_eq!(decay.factor(Some(now), now), 1.0);
/// let day_old = decay.factor(Some(now - Duration::hours(24)), now);
/// assert!((day_old - 0.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayFunction {
    half_life_hours: f64,
}

impl DecayFunction {
    /// Half-life used by the default policy.
    pub const DEFAULT_HALF_LIFE_HOURS: f64 = 24.0;

    /// Build a decay function with the given half-life.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidHalfLife`] unless the half-life is finite
    /// and strictly positive.
    pub fn new(half_life_hours: f64) -> Result<Self, PolicyError> {
        if !half_life_hours.is_finite() || half_life_hours <= 0.0 {
            return Err(PolicyError::InvalidHalfLife {
                hours: half_life_hours,
            });
        }
        Ok(Self { half_life_hours })
    }

    /// Configured half-life in hours.
    #[must_use]
    pub const fn half_life_hours(&self) -> f64 {
        self.half_life_hours
    }

    /// Decay factor in `0.0..=1.0` for an entity last touched at
    /// `last_interaction`.
    ///
    /// Entities that were never touched decay to zero. Timestamps in the
    /// future (clock skew) clamp to a full factor of one.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "decay is an exponential over fractional hours"
    )]
    pub fn factor(&self, last_interaction: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(last) = last_interaction else {
            return 0.0;
        };
        let elapsed_hours = (now - last).num_milliseconds() as f64 / MILLIS_PER_HOUR;
        let factor = (-elapsed_hours * LN_2 / self.half_life_hours).exp();
        if factor.is_nan() {
            return 0.0;
        }
        factor.clamp(0.0, 1.0)
    }
}

impl Default for DecayFunction {
    fn default() -> Self {
        Self {
            half_life_hours: Self::DEFAULT_HALF_LIFE_HOURS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    #[rstest]
    fn never_touched_entities_have_no_recency(now: DateTime<Utc>) {
        assert_eq!(DecayFunction::default().factor(None, now), 0.0);
    }

    #[rstest]
    fn just_touched_entities_have_full_recency(now: DateTime<Utc>) {
        assert_eq!(DecayFunction::default().factor(Some(now), now), 1.0);
    }

    #[rstest]
    #[case(24, 0.5)]
    #[case(48, 0.25)]
    #[case(168, 0.007_812_5)]
    #[expect(clippy::float_arithmetic, reason = "tolerance comparison")]
    fn halves_every_day(now: DateTime<Utc>, #[case] hours: i64, #[case] expected: f64) {
        let factor = DecayFunction::default().factor(Some(now - Duration::hours(hours)), now);
        assert!(
            (factor - expected).abs() < 1e-9,
            "expected {expected} after {hours}h, got {factor}"
        );
    }

    #[rstest]
    fn future_timestamps_clamp_to_one(now: DateTime<Utc>) {
        let skewed = now + Duration::hours(3);
        assert_eq!(DecayFunction::default().factor(Some(skewed), now), 1.0);
    }

    #[rstest]
    fn ancient_interactions_decay_towards_zero(now: DateTime<Utc>) {
        let ancient = now - Duration::days(365 * 50);
        let factor = DecayFunction::default().factor(Some(ancient), now);
        assert!((0.0..1e-12).contains(&factor), "got {factor}");
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_unusable_half_lives(#[case] hours: f64) {
        assert!(matches!(
            DecayFunction::new(hours),
            Err(PolicyError::InvalidHalfLife { .. })
        ));
    }
}
