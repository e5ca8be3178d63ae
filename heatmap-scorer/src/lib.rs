//! Popularity scoring for locations and businesses.
//!
//! The crate turns a stream of interactions into a heatmap score in
//! `0..=100` per entity:
//! - **Scoring policy** fixes the interaction weights, the recency
//!   half-life, the activity ceiling and the blend of the activity, rating
//!   and recency components. [`ScoringPolicy::default`] is the production
//!   policy.
//! - **Metric updates** go through [`MetricUpdater`], the only component that
//!   mutates entity metrics. Each update is serialised per entity and, for a
//!   business, credits half of its weight to the owning location in a second
//!   independent write.
//! - **Ranking** orders locations, or the businesses of one location, by
//!   their live score: the stored score decayed to the ranking instant.
//!
//! # Examples
//!
//! ```
//! use geo::Coord;
//! use heatmap_core::{Business, EntityId, Location};
//! use heatmap_core::test_support::MemoryRepository;
//! use heatmap_scorer::{MetricUpdater, ScoringPolicy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mall = EntityId::new("mall")?;
//! let cafe = EntityId::new("cafe")?;
//! let repository = MemoryRepository::default()
//!     .with_location(Location::new(mall.clone(), Coord { x: 74.3, y: 31.5 }))
//!     .with_business(Business::new(cafe, mall, Coord { x: 74.3, y: 31.5 }));
//!
//! let updater = MetricUpdater::new(repository, ScoringPolicy::default());
//! let outcome = updater.update_raw("Business", "cafe", "review", Some(5.0))?;
//! assert_eq!(outcome.snapshot.heatmap_score, 66);
//!
//! let parent = outcome.propagation.applied().expect("cafe belongs to mall");
//! assert_eq!(parent.activity_count, 0.5);
//! assert_eq!(parent.avg_rating, None);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod calculator;
mod decay;
mod error;
mod locks;
mod policy;
pub mod ranking;
mod updater;
mod weights;

pub use calculator::{BlendWeights, ScoreBreakdown, ScoreCalculator};
pub use decay::DecayFunction;
pub use error::{MetricError, PolicyError};
pub use policy::ScoringPolicy;
pub use ranking::RankedEntity;
pub use updater::{MetricUpdater, MetricsSnapshot, Propagation, UpdateOutcome};
pub use weights::InteractionWeights;
