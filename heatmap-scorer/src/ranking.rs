//! Read-side ordering of entities by live heatmap score.
#![forbid(unsafe_code)]

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use heatmap_core::{EntityId, EntityKind, EntityMetrics, EntityRepository};
use serde::Serialize;

use crate::{MetricError, ScoringPolicy};

/// One entry of a popularity ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntity {
    /// Kind of the ranked entity.
    pub entity_kind: EntityKind,
    /// Identifier of the ranked entity.
    pub entity_id: EntityId,
    /// Score decayed to the ranking instant.
    pub live_score: u8,
    /// Score cached at the last interaction.
    pub stored_score: u8,
    /// Accumulated weighted activity.
    pub activity_count: f64,
    /// Mean review rating, if any.
    pub avg_rating: Option<f64>,
    /// Instant of the most recent interaction.
    pub last_interaction: Option<DateTime<Utc>>,
}

impl RankedEntity {
    fn score(
        entity_kind: EntityKind,
        entity_id: EntityId,
        metrics: &EntityMetrics,
        policy: &ScoringPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_kind,
            entity_id,
            live_score: policy.calculator().live_score(metrics, now),
            stored_score: metrics.heatmap_score,
            activity_count: metrics.activity_count,
            avg_rating: metrics.avg_rating,
            last_interaction: metrics.last_interaction,
        }
    }
}

/// Rank every location by live score.
///
/// Ties are broken by average rating (unrated last) and then by identifier.
/// `limit` keeps only the leading entries.
///
/// # Errors
/// Returns [`MetricError::Repository`] when listing fails.
pub fn popular_locations<R>(
    repository: &R,
    policy: &ScoringPolicy,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Result<Vec<RankedEntity>, MetricError>
where
    R: EntityRepository + ?Sized,
{
    let ranked = repository
        .locations()?
        .into_iter()
        .map(|location| {
            RankedEntity::score(
                EntityKind::Location,
                location.id,
                &location.metrics,
                policy,
                now,
            )
        })
        .collect();
    Ok(order(ranked, limit))
}

/// Rank the businesses of one location by live score.
///
/// # Errors
/// Returns [`MetricError::EntityNotFound`] when the location does not exist
/// and [`MetricError::Repository`] when listing fails.
pub fn top_businesses<R>(
    repository: &R,
    policy: &ScoringPolicy,
    location_id: &EntityId,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Result<Vec<RankedEntity>, MetricError>
where
    R: EntityRepository + ?Sized,
{
    if repository.location(location_id)?.is_none() {
        return Err(MetricError::not_found(EntityKind::Location, location_id));
    }
    let ranked = repository
        .businesses_in(location_id)?
        .into_iter()
        .map(|business| {
            RankedEntity::score(
                EntityKind::Business,
                business.id,
                &business.metrics,
                policy,
                now,
            )
        })
        .collect();
    Ok(order(ranked, limit))
}

fn order(mut ranked: Vec<RankedEntity>, limit: Option<usize>) -> Vec<RankedEntity> {
    ranked.sort_by(compare);
    if let Some(max) = limit {
        ranked.truncate(max);
    }
    ranked
}

fn compare(a: &RankedEntity, b: &RankedEntity) -> Ordering {
    b.live_score
        .cmp(&a.live_score)
        .then_with(|| rating_key(b).total_cmp(&rating_key(a)))
        .then_with(|| a.entity_id.cmp(&b.entity_id))
}

fn rating_key(entry: &RankedEntity) -> f64 {
    entry.avg_rating.unwrap_or(f64::NEG_INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use geo::Coord;
    use heatmap_core::test_support::MemoryRepository;
    use heatmap_core::{Business, EntityMetrics, Location};
    use rstest::{fixture, rstest};

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).expect("valid id")
    }

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn metrics(
        activity_count: f64,
        avg_rating: Option<f64>,
        last_interaction: Option<DateTime<Utc>>,
        heatmap_score: u8,
    ) -> EntityMetrics {
        EntityMetrics {
            activity_count,
            avg_rating,
            last_interaction,
            heatmap_score,
        }
    }

    fn location(raw: &str, metrics: EntityMetrics) -> Location {
        Location {
            metrics,
            ..Location::new(id(raw), Coord { x: 0.0, y: 0.0 })
        }
    }

    fn business(raw: &str, parent: &str, metrics: EntityMetrics) -> Business {
        Business {
            metrics,
            ..Business::new(id(raw), id(parent), Coord { x: 0.0, y: 0.0 })
        }
    }

    fn ids(ranked: &[RankedEntity]) -> Vec<&str> {
        ranked.iter().map(|entry| entry.entity_id.as_str()).collect()
    }

    #[rstest]
    fn stale_snapshots_lose_to_recent_activity(now: DateTime<Utc>) {
        // "stale" cached a high score a week ago; "fresh" was touched just now.
        let repository = MemoryRepository::default()
            .with_location(location(
                "stale",
                metrics(5.0, Some(5.0), Some(now - Duration::days(7)), 90),
            ))
            .with_location(location("fresh", metrics(5.0, Some(5.0), Some(now), 70)));

        let ranked = popular_locations(&repository, &ScoringPolicy::default(), now, None)
            .expect("ranking");

        assert_eq!(ids(&ranked), vec!["fresh", "stale"]);
        let stale = ranked.get(1).expect("second entry");
        assert_eq!(stale.stored_score, 90);
        assert!(stale.live_score < stale.stored_score);
    }

    #[rstest]
    fn ties_break_on_rating_then_id(now: DateTime<Utc>) {
        let repository = MemoryRepository::default()
            .with_location(location("b", metrics(0.0, None, None, 0)))
            .with_location(location("a", metrics(0.0, None, None, 0)))
            .with_location(location("c", metrics(0.0, Some(1.0), None, 0)));

        let ranked = popular_locations(&repository, &ScoringPolicy::default(), now, None)
            .expect("ranking");

        assert_eq!(ids(&ranked), vec!["c", "a", "b"]);
    }

    #[rstest]
    fn limit_keeps_leading_entries(now: DateTime<Utc>) {
        let repository = MemoryRepository::default()
            .with_location(location("quiet", metrics(0.0, None, None, 0)))
            .with_location(location("busy", metrics(50.0, Some(4.0), Some(now), 0)))
            .with_location(location("mid", metrics(5.0, None, Some(now), 0)));

        let ranked = popular_locations(&repository, &ScoringPolicy::default(), now, Some(2))
            .expect("ranking");

        assert_eq!(ids(&ranked), vec!["busy", "mid"]);
    }

    #[rstest]
    fn businesses_are_ranked_within_their_location(now: DateTime<Utc>) {
        let repository = MemoryRepository::default()
            .with_location(location("mall", EntityMetrics::fresh()))
            .with_location(location("harbour", EntityMetrics::fresh()))
            .with_business(business("cafe", "mall", metrics(1.0, None, Some(now), 0)))
            .with_business(business("books", "mall", metrics(9.0, Some(4.5), Some(now), 0)))
            .with_business(business("ferry", "harbour", metrics(99.0, Some(5.0), Some(now), 0)));

        let ranked = top_businesses(&repository, &ScoringPolicy::default(), &id("mall"), now, None)
            .expect("ranking");

        assert_eq!(ids(&ranked), vec!["books", "cafe"]);
        assert!(ranked.iter().all(|entry| entry.entity_kind == EntityKind::Business));
    }

    #[rstest]
    fn unknown_location_is_not_found(now: DateTime<Utc>) {
        let repository = MemoryRepository::default();
        let err = top_businesses(&repository, &ScoringPolicy::default(), &id("nowhere"), now, None)
            .expect_err("missing location");
        assert!(matches!(
            err,
            MetricError::EntityNotFound {
                kind: EntityKind::Location,
                ..
            }
        ));
    }
}
