//! Behavioural tests for `SqliteEntityStore` using rstest-bdd.

use std::cell::RefCell;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use geo::Coord;
use heatmap_core::{
    Business, Entity, EntityId, EntityKind, EntityMetrics, EntityRepository, Location, Rating,
    SqliteEntityStore,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

/// Shared state for SQLite store scenarios.
#[derive(Debug)]
struct StoreWorld {
    temp_dir: TempDir,
    store: RefCell<Option<SqliteEntityStore>>,
    listed: RefCell<Vec<Business>>,
}

impl StoreWorld {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            store: RefCell::new(None),
            listed: RefCell::new(Vec::new()),
        }
    }

    fn database_path(&self) -> PathBuf {
        self.temp_dir.path().join("heatmap.db")
    }

    fn open(&self) {
        let store = SqliteEntityStore::open(self.database_path()).expect("open store");
        self.store.replace(Some(store));
    }

    fn with_store<T>(&self, action: impl FnOnce(&SqliteEntityStore) -> T) -> T {
        let store = self.store.borrow();
        action(store.as_ref().expect("store should be opened first"))
    }
}

#[fixture]
fn world() -> StoreWorld {
    StoreWorld::new()
}

fn id(raw: &str) -> EntityId {
    EntityId::new(raw).expect("valid id")
}

fn touched_metrics() -> EntityMetrics {
    EntityMetrics {
        activity_count: 3.7,
        avg_rating: Some(4.5),
        last_interaction: Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0).single(),
        heatmap_score: 58,
    }
}

fn save(world: &StoreWorld, entity: Entity) {
    world
        .with_store(|store| store.save_entity(&entity))
        .expect("save entity");
}

fn review(world: &StoreWorld, business: &str, value: f64) {
    let rating = Rating::new(value).expect("valid rating");
    world
        .with_store(|store| store.insert_review(EntityKind::Business, &id(business), rating))
        .expect("insert review");
}

#[given("a SQLite store containing a touched location named harbour")]
fn store_with_touched_location(world: &StoreWorld) {
    world.open();
    let harbour = Location {
        metrics: touched_metrics(),
        ..Location::new(id("harbour"), Coord { x: -3.19, y: 55.98 })
    };
    save(world, harbour.into());
}

#[given("a SQLite store with businesses under harbour and old-town")]
fn store_with_businesses(world: &StoreWorld) {
    world.open();
    let here = Coord { x: 0.0, y: 0.0 };
    save(world, Location::new(id("harbour"), here).into());
    save(world, Location::new(id("old-town"), here).into());
    save(world, Business::new(id("ferry"), id("harbour"), here).into());
    save(world, Business::new(id("kiosk"), id("harbour"), here).into());
    save(world, Business::new(id("bakery"), id("old-town"), here).into());
}

#[given("ferry has reviews rated 4, 5 and 3")]
fn ferry_reviews(world: &StoreWorld) {
    for value in [4.0, 5.0, 3.0] {
        review(world, "ferry", value);
    }
}

#[given("kiosk has a single review rated 1")]
fn kiosk_review(world: &StoreWorld) {
    review(world, "kiosk", 1.0);
}

#[when("the store is reopened")]
fn reopen(world: &StoreWorld) {
    world.store.replace(None);
    world.open();
}

#[when("the businesses of harbour are listed")]
fn list_harbour(world: &StoreWorld) {
    let listed = world
        .with_store(|store| store.businesses_in(&id("harbour")))
        .expect("list businesses");
    world.listed.replace(listed);
}

#[then("harbour keeps its activity, rating, score and last interaction")]
fn harbour_persisted(world: &StoreWorld) {
    let harbour = world
        .with_store(|store| store.location(&id("harbour")))
        .expect("load location")
        .expect("harbour exists");
    assert_eq!(harbour.metrics, touched_metrics());
    assert_eq!(harbour.coordinates, Coord { x: -3.19, y: 55.98 });
}

#[then("only ferry and kiosk are returned")]
fn only_harbour_businesses(world: &StoreWorld) {
    let listed = world.listed.borrow();
    let mut ids: Vec<&str> = listed.iter().map(|business| business.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["ferry", "kiosk"]);
    assert!(listed.iter().all(|business| business.location_id == id("harbour")));
}

#[then("ferry averages 4, kiosk averages 1 and harbour has no average")]
fn averages_per_entity(world: &StoreWorld) {
    let average = |kind, raw: &str| {
        world
            .with_store(|store| store.average_rating(kind, &id(raw)))
            .expect("aggregate reviews")
    };
    assert_eq!(average(EntityKind::Business, "ferry"), Some(4.0));
    assert_eq!(average(EntityKind::Business, "kiosk"), Some(1.0));
    assert_eq!(average(EntityKind::Location, "harbour"), None);
}

#[scenario(path = "tests/features/sqlite_store.feature", index = 0)]
fn metrics_survive_reopen(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/sqlite_store.feature", index = 1)]
fn businesses_listed_per_location(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/sqlite_store.feature", index = 2)]
fn ratings_averaged_per_entity(world: StoreWorld) {
    let _ = world;
}
