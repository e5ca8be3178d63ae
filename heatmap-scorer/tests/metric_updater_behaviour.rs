#![expect(
    clippy::expect_used,
    reason = "tests should fail fast when setup breaks"
)]

//! Behavioural coverage for applying interactions through `MetricUpdater`.

use std::cell::RefCell;

use chrono::{TimeZone, Utc};
use geo::Coord;
use heatmap_core::test_support::FixedClock;
use heatmap_core::{
    Business, EntityId, EntityKind, EntityMetrics, EntityRepository, InteractionKind, Location,
    Rating, SqliteEntityStore,
};
use heatmap_scorer::{MetricError, MetricUpdater, ScoringPolicy, UpdateOutcome};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

/// Shared state for updater scenarios, backed by an on-disk `SQLite` store.
pub struct UpdaterWorld {
    _temp_dir: TempDir,
    updater: MetricUpdater<SqliteEntityStore, FixedClock>,
    outcome: RefCell<Option<Result<UpdateOutcome, MetricError>>>,
}

#[fixture]
/// Build a fresh store and updater for each scenario run.
pub fn world() -> UpdaterWorld {
    let temp_dir = TempDir::new().expect("create tempdir for scenario");
    let store =
        SqliteEntityStore::open(temp_dir.path().join("heatmap.db")).expect("open sqlite store");
    let now = Utc
        .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("valid instant");
    UpdaterWorld {
        _temp_dir: temp_dir,
        updater: MetricUpdater::with_clock(store, ScoringPolicy::default(), FixedClock::at(now)),
        outcome: RefCell::new(None),
    }
}

fn id(raw: &str) -> EntityId {
    EntityId::new(raw).expect("valid id")
}

fn origin() -> Coord<f64> {
    Coord { x: 74.35, y: 31.52 }
}

fn apply(world: &UpdaterWorld, kind: EntityKind, raw: &str, interaction: InteractionKind) {
    let rating = (interaction == InteractionKind::Review)
        .then(|| Rating::new(5.0).expect("valid rating"));
    let outcome = world.updater.update(kind, &id(raw), interaction, rating);
    world.outcome.replace(Some(outcome));
}

fn metrics(world: &UpdaterWorld, kind: EntityKind, raw: &str) -> EntityMetrics {
    world
        .updater
        .repository()
        .entity(kind, &id(raw))
        .expect("lookup entity")
        .expect("entity exists")
        .metrics()
        .clone()
}

#[expect(
    clippy::float_arithmetic,
    reason = "assertions compare floating point values"
)]
fn assert_near(actual: f64, expected: f64, message: &str) {
    assert!((actual - expected).abs() < 1e-9, "{message}: got {actual}");
}

#[given("a fresh location named old-town")]
fn fresh_location(world: &UpdaterWorld) {
    world
        .updater
        .repository()
        .save_entity(&Location::new(id("old-town"), origin()).into())
        .expect("save location");
}

#[given("a business named cafe under old-town")]
fn cafe_under_old_town(world: &UpdaterWorld) {
    world
        .updater
        .repository()
        .save_entity(&Business::new(id("cafe"), id("old-town"), origin()).into())
        .expect("save business");
}

#[given("the cafe already has reviews rated 4, 5 and 3")]
fn cafe_reviews(world: &UpdaterWorld) {
    for value in [4.0, 5.0, 3.0] {
        world
            .updater
            .repository()
            .insert_review(
                EntityKind::Business,
                &id("cafe"),
                Rating::new(value).expect("valid rating"),
            )
            .expect("store review");
    }
}

#[given("a business named stall whose location was never registered")]
fn orphan_stall(world: &UpdaterWorld) {
    world
        .updater
        .repository()
        .save_entity(&Business::new(id("stall"), id("demolished"), origin()).into())
        .expect("save business");
}

#[when("a visitor reviews old-town with 5 stars")]
fn review_old_town(world: &UpdaterWorld) {
    apply(world, EntityKind::Location, "old-town", InteractionKind::Review);
}

#[when("a visitor views old-town")]
fn view_old_town(world: &UpdaterWorld) {
    apply(world, EntityKind::Location, "old-town", InteractionKind::View);
}

#[when("a visitor bookmarks old-town")]
fn bookmark_old_town(world: &UpdaterWorld) {
    apply(world, EntityKind::Location, "old-town", InteractionKind::Bookmark);
}

#[when("a visitor reviews the cafe with 5 stars")]
fn review_cafe(world: &UpdaterWorld) {
    // The review row lands before the interaction, as the CLI does it.
    world
        .updater
        .repository()
        .insert_review(
            EntityKind::Business,
            &id("cafe"),
            Rating::new(5.0).expect("valid rating"),
        )
        .expect("store review");
    apply(world, EntityKind::Business, "cafe", InteractionKind::Review);
}

#[when("a visitor views an unknown business")]
fn view_unknown(world: &UpdaterWorld) {
    apply(world, EntityKind::Business, "nonexistent-id", InteractionKind::View);
}

#[when("a visitor shares the stall")]
fn share_stall(world: &UpdaterWorld) {
    apply(world, EntityKind::Business, "stall", InteractionKind::Share);
}

#[then("old-town has activity 1, rating 5 and score 66")]
fn old_town_first_review(world: &UpdaterWorld) {
    let stored = metrics(world, EntityKind::Location, "old-town");
    assert_near(stored.activity_count, 1.0, "activity");
    assert_eq!(stored.avg_rating, Some(5.0));
    assert_eq!(stored.heatmap_score, 66);
}

#[then("old-town has activity {activity} and no rating")]
fn old_town_unrated(world: &UpdaterWorld, activity: f64) {
    let stored = metrics(world, EntityKind::Location, "old-town");
    assert_near(stored.activity_count, activity, "activity");
    assert_eq!(stored.avg_rating, None);
}

#[then("the cafe rating is 4.25")]
fn cafe_rating(world: &UpdaterWorld) {
    let stored = metrics(world, EntityKind::Business, "cafe");
    assert_near(stored.avg_rating.expect("rated"), 4.25, "rating");
}

#[then("the update fails because the entity was not found")]
fn update_not_found(world: &UpdaterWorld) {
    let outcome = world.outcome.borrow();
    assert!(matches!(
        outcome.as_ref(),
        Some(Err(MetricError::EntityNotFound { .. }))
    ));
}

#[then("the stall has activity 0.8")]
fn stall_activity(world: &UpdaterWorld) {
    let stored = metrics(world, EntityKind::Business, "stall");
    assert_near(stored.activity_count, 0.8, "activity");
}

#[then("propagation reports the missing location")]
fn propagation_failed(world: &UpdaterWorld) {
    let outcome = world.outcome.borrow();
    let applied = outcome
        .as_ref()
        .expect("update attempted")
        .as_ref()
        .expect("primary update succeeded");
    assert!(matches!(
        applied.propagation.error(),
        Some(MetricError::LocationNotFound { .. })
    ));
}

#[scenario(path = "tests/features/metric_updater.feature", index = 0)]
fn first_review_scores_sixty_six(world: UpdaterWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/metric_updater.feature", index = 1)]
fn weighted_interactions_accumulate(world: UpdaterWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/metric_updater.feature", index = 2)]
fn business_reviews_credit_parent(world: UpdaterWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/metric_updater.feature", index = 3)]
fn unknown_entities_are_rejected(world: UpdaterWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/metric_updater.feature", index = 4)]
fn dangling_parent_keeps_primary_update(world: UpdaterWorld) {
    let _ = world;
}
