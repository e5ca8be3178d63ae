//! Immutable scoring configuration injected into the updater and rankings.
#![forbid(unsafe_code)]

use heatmap_core::InteractionKind;

use crate::{InteractionWeights, PolicyError, ScoreCalculator};

/// Every tunable constant of the scoring model.
///
/// Construct once at process start and share by reference or clone; nothing
/// mutates a policy after validation.
///
/// # Examples
/// ```
/// use heatmap_core::InteractionKind;
/// use heatmap_scorer::ScoringPolicy;
///
/// let policy = ScoringPolicy::default();
/// assert_eq!(policy.weight_of(InteractionKind::Review), 1.0);
/// assert_eq!(policy.parent_weight_of(InteractionKind::Review), 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    weights: InteractionWeights,
    calculator: ScoreCalculator,
    parent_share: f64,
}

impl ScoringPolicy {
    /// Share of a business interaction weight credited to its location.
    pub const DEFAULT_PARENT_SHARE: f64 = 0.5;

    /// Assemble and validate a policy.
    ///
    /// # Errors
    /// Returns [`PolicyError`] when a weight or the parent share falls outside
    /// `(0.0, 1.0]`.
    pub fn new(
        weights: InteractionWeights,
        calculator: ScoreCalculator,
        parent_share: f64,
    ) -> Result<Self, PolicyError> {
        if !(parent_share > 0.0 && parent_share <= 1.0) {
            return Err(PolicyError::InvalidParentShare {
                share: parent_share,
            });
        }
        Ok(Self {
            weights: weights.validate()?,
            calculator,
            parent_share,
        })
    }

    /// Interaction weight table.
    #[must_use]
    pub const fn weights(&self) -> &InteractionWeights {
        &self.weights
    }

    /// Score calculator.
    #[must_use]
    pub const fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    /// Share of a business weight propagated to its location.
    #[must_use]
    pub const fn parent_share(&self) -> f64 {
        self.parent_share
    }

    /// Activity added to the interacted entity.
    #[must_use]
    pub const fn weight_of(&self, kind: InteractionKind) -> f64 {
        self.weights.weight_of(kind)
    }

    /// Activity added to a business's parent location.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "propagated weight is a fraction of the business weight"
    )]
    pub fn parent_weight_of(&self, kind: InteractionKind) -> f64 {
        self.weight_of(kind) * self.parent_share
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: InteractionWeights::default(),
            calculator: ScoreCalculator::default(),
            parent_share: Self::DEFAULT_PARENT_SHARE,
        }
    }
}
