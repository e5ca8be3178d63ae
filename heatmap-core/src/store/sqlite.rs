//! SQLite-backed repository for locations, businesses and reviews.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use geo::Coord;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use thiserror::Error;

use crate::{Business, Entity, EntityId, EntityKind, EntityMetrics, Location, Rating};

use super::{EntityRepository, RepositoryError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS locations (
    id TEXT PRIMARY KEY,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    activity_count REAL NOT NULL DEFAULT 0,
    avg_rating REAL,
    last_interaction_ms INTEGER,
    heatmap_score INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS businesses (
    id TEXT PRIMARY KEY,
    location_id TEXT NOT NULL,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    activity_count REAL NOT NULL DEFAULT 0,
    avg_rating REAL,
    last_interaction_ms INTEGER,
    heatmap_score INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS businesses_by_location ON businesses (location_id);
CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    rating REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS reviews_by_entity ON reviews (entity_type, entity_id);
";

const LOCATION_COLUMNS: &str =
    "id, lon, lat, activity_count, avg_rating, last_interaction_ms, heatmap_score";
const BUSINESS_COLUMNS: &str =
    "id, location_id, lon, lat, activity_count, avg_rating, last_interaction_ms, heatmap_score";

/// How long a connection waits for another writer to release the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Error raised while opening or initialising the SQLite database.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Configuring the connection failed.
    #[error("failed to configure the SQLite connection: {0}")]
    Configure(#[source] rusqlite::Error),
    /// Creating the tables failed.
    #[error("failed to initialise the heatmap schema: {0}")]
    Schema(#[source] rusqlite::Error),
}

/// Entity repository persisting metrics and reviews in SQLite.
///
/// The connection sits behind a mutex so the store can be shared between
/// threads. Other processes may open the same file; a connection waits up to
/// five seconds for a competing writer before failing.
pub struct SqliteEntityStore {
    connection: Mutex<Connection>,
}

impl fmt::Debug for SqliteEntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteEntityStore").finish_non_exhaustive()
    }
}

impl SqliteEntityStore {
    /// Open (or create) a database file and ensure the schema exists.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the file cannot be opened or the
    /// schema cannot be created.
    pub fn open<P: AsRef<Path>>(database_path: P) -> Result<Self, SqliteStoreError> {
        let database_path = database_path.as_ref();
        let connection =
            Connection::open(database_path).map_err(|source| SqliteStoreError::OpenDatabase {
                path: database_path.to_path_buf(),
                source,
            })?;
        debug!("opened heatmap store at {}", database_path.display());
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, SqliteStoreError> {
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(SqliteStoreError::Configure)?;
        connection
            .execute_batch(SCHEMA)
            .map_err(SqliteStoreError::Schema)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Record a review rating for an entity.
    ///
    /// Reviews feed [`EntityRepository::average_rating`]; they do not touch
    /// the entity's metrics.
    ///
    /// # Errors
    /// Returns [`RepositoryError`] when the insert fails.
    pub fn insert_review(
        &self,
        kind: EntityKind,
        id: &EntityId,
        rating: Rating,
    ) -> Result<(), RepositoryError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO reviews (entity_type, entity_id, rating) VALUES (?1, ?2, ?3)",
                params![kind.as_str(), id.as_str(), rating.value()],
            )
            .map_err(|source| RepositoryError::backend("insert review", source))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.connection
            .lock()
            .map_err(|_| RepositoryError::Poisoned)
    }
}

impl EntityRepository for SqliteEntityStore {
    fn entity(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, RepositoryError> {
        load_entity(&*self.lock()?, kind, id)
    }

    fn save_entity(&self, entity: &Entity) -> Result<(), RepositoryError> {
        store_entity(&*self.lock()?, entity)
    }

    fn average_rating(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<f64>, RepositoryError> {
        average_rating_in(&*self.lock()?, kind, id)
    }

    fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(&format!(
                "SELECT {LOCATION_COLUMNS} FROM locations ORDER BY id"
            ))
            .map_err(|source| RepositoryError::backend("prepare location listing", source))?;
        let rows = statement
            .query_map([], read_location_row)
            .map_err(|source| RepositoryError::backend("list locations", source))?;
        let mut locations = Vec::new();
        for row in rows {
            let raw = row.map_err(|source| RepositoryError::backend("read location row", source))?;
            locations.push(raw.decode()?);
        }
        Ok(locations)
    }

    fn businesses_in(&self, location_id: &EntityId) -> Result<Vec<Business>, RepositoryError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(&format!(
                "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE location_id = ?1 ORDER BY id"
            ))
            .map_err(|source| RepositoryError::backend("prepare business listing", source))?;
        let rows = statement
            .query_map([location_id.as_str()], read_business_row)
            .map_err(|source| RepositoryError::backend("list businesses", source))?;
        let mut businesses = Vec::new();
        for row in rows {
            let raw = row.map_err(|source| RepositoryError::backend("read business row", source))?;
            businesses.push(raw.decode()?);
        }
        Ok(businesses)
    }

    /// Runs inside a `BEGIN IMMEDIATE` transaction, so other connections to
    /// the same file wait for the write lock instead of reading stale rows.
    fn modify_entity(
        &self,
        kind: EntityKind,
        id: &EntityId,
        modify: &mut dyn FnMut(&mut Entity, Option<f64>),
    ) -> Result<Option<Entity>, RepositoryError> {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| RepositoryError::backend("begin entity update", source))?;
        let Some(mut entity) = load_entity(&transaction, kind, id)? else {
            return Ok(None);
        };
        let average = average_rating_in(&transaction, kind, id)?;
        modify(&mut entity, average);
        store_entity(&transaction, &entity)?;
        transaction
            .commit()
            .map_err(|source| RepositoryError::backend("commit entity update", source))?;
        Ok(Some(entity))
    }
}

fn load_entity(
    connection: &Connection,
    kind: EntityKind,
    id: &EntityId,
) -> Result<Option<Entity>, RepositoryError> {
    let raw = match kind {
        EntityKind::Location => connection
            .query_row(
                &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1"),
                [id.as_str()],
                read_location_row,
            )
            .optional()
            .map_err(|source| RepositoryError::backend("load location", source))?
            .map(RawEntity::Location),
        EntityKind::Business => connection
            .query_row(
                &format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1"),
                [id.as_str()],
                read_business_row,
            )
            .optional()
            .map_err(|source| RepositoryError::backend("load business", source))?
            .map(RawEntity::Business),
    };
    raw.map(RawEntity::decode).transpose()
}

fn store_entity(connection: &Connection, entity: &Entity) -> Result<(), RepositoryError> {
    match entity {
        Entity::Location(location) => {
            let metrics = MetricColumns::from(&location.metrics);
            connection
                .execute(
                    "INSERT INTO locations (id, lon, lat, activity_count, avg_rating,
                         last_interaction_ms, heatmap_score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                         lon = excluded.lon,
                         lat = excluded.lat,
                         activity_count = excluded.activity_count,
                         avg_rating = excluded.avg_rating,
                         last_interaction_ms = excluded.last_interaction_ms,
                         heatmap_score = excluded.heatmap_score",
                    params![
                        location.id.as_str(),
                        location.coordinates.x,
                        location.coordinates.y,
                        metrics.activity_count,
                        metrics.avg_rating,
                        metrics.last_interaction_ms,
                        metrics.heatmap_score,
                    ],
                )
                .map_err(|source| RepositoryError::backend("save location", source))?;
        }
        Entity::Business(business) => {
            let metrics = MetricColumns::from(&business.metrics);
            connection
                .execute(
                    "INSERT INTO businesses (id, location_id, lon, lat, activity_count,
                         avg_rating, last_interaction_ms, heatmap_score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                         location_id = excluded.location_id,
                         lon = excluded.lon,
                         lat = excluded.lat,
                         activity_count = excluded.activity_count,
                         avg_rating = excluded.avg_rating,
                         last_interaction_ms = excluded.last_interaction_ms,
                         heatmap_score = excluded.heatmap_score",
                    params![
                        business.id.as_str(),
                        business.location_id.as_str(),
                        business.coordinates.x,
                        business.coordinates.y,
                        metrics.activity_count,
                        metrics.avg_rating,
                        metrics.last_interaction_ms,
                        metrics.heatmap_score,
                    ],
                )
                .map_err(|source| RepositoryError::backend("save business", source))?;
        }
    }
    Ok(())
}

fn average_rating_in(
    connection: &Connection,
    kind: EntityKind,
    id: &EntityId,
) -> Result<Option<f64>, RepositoryError> {
    connection
        .query_row(
            "SELECT AVG(rating) FROM reviews WHERE entity_type = ?1 AND entity_id = ?2",
            params![kind.as_str(), id.as_str()],
            |row| row.get::<_, Option<f64>>(0),
        )
        .map_err(|source| RepositoryError::backend("aggregate review ratings", source))
}

/// Metric values in their column representation.
struct MetricColumns {
    activity_count: f64,
    avg_rating: Option<f64>,
    last_interaction_ms: Option<i64>,
    heatmap_score: i64,
}

impl From<&EntityMetrics> for MetricColumns {
    fn from(metrics: &EntityMetrics) -> Self {
        Self {
            activity_count: metrics.activity_count,
            avg_rating: metrics.avg_rating,
            last_interaction_ms: metrics.last_interaction.map(|at| at.timestamp_millis()),
            heatmap_score: i64::from(metrics.heatmap_score),
        }
    }
}

impl MetricColumns {
    fn decode(self, kind: EntityKind, id: &str) -> Result<EntityMetrics, RepositoryError> {
        let corrupt = |reason: String| RepositoryError::Corrupt {
            kind,
            id: id.to_owned(),
            reason,
        };
        let heatmap_score = u8::try_from(self.heatmap_score)
            .ok()
            .filter(|score| *score <= 100)
            .ok_or_else(|| corrupt(format!("heatmap score {} out of range", self.heatmap_score)))?;
        let last_interaction = self
            .last_interaction_ms
            .map(|ms| {
                DateTime::<Utc>::from_timestamp_millis(ms)
                    .ok_or_else(|| corrupt(format!("timestamp {ms} out of range")))
            })
            .transpose()?;
        if !self.activity_count.is_finite() || self.activity_count < 0.0 {
            return Err(corrupt(format!(
                "activity count {} is not a non-negative number",
                self.activity_count
            )));
        }
        Ok(EntityMetrics {
            activity_count: self.activity_count,
            avg_rating: self.avg_rating,
            last_interaction,
            heatmap_score,
        })
    }
}

struct RawLocation {
    id: String,
    coordinates: Coord<f64>,
    metrics: MetricColumns,
}

struct RawBusiness {
    id: String,
    location_id: String,
    coordinates: Coord<f64>,
    metrics: MetricColumns,
}

enum RawEntity {
    Location(RawLocation),
    Business(RawBusiness),
}

impl RawEntity {
    fn decode(self) -> Result<Entity, RepositoryError> {
        match self {
            Self::Location(raw) => raw.decode().map(Entity::Location),
            Self::Business(raw) => raw.decode().map(Entity::Business),
        }
    }
}

impl RawLocation {
    fn decode(self) -> Result<Location, RepositoryError> {
        let id = decode_id(EntityKind::Location, &self.id, &self.id)?;
        let metrics = self.metrics.decode(EntityKind::Location, &self.id)?;
        Ok(Location {
            id,
            coordinates: self.coordinates,
            metrics,
        })
    }
}

impl RawBusiness {
    fn decode(self) -> Result<Business, RepositoryError> {
        let id = decode_id(EntityKind::Business, &self.id, &self.id)?;
        let location_id = decode_id(EntityKind::Business, &self.id, &self.location_id)?;
        let metrics = self.metrics.decode(EntityKind::Business, &self.id)?;
        Ok(Business {
            id,
            location_id,
            coordinates: self.coordinates,
            metrics,
        })
    }
}

fn decode_id(kind: EntityKind, owner: &str, raw: &str) -> Result<EntityId, RepositoryError> {
    EntityId::new(raw).map_err(|err| RepositoryError::Corrupt {
        kind,
        id: owner.to_owned(),
        reason: err.to_string(),
    })
}

fn read_location_row(row: &Row<'_>) -> rusqlite::Result<RawLocation> {
    Ok(RawLocation {
        id: row.get(0)?,
        coordinates: Coord {
            x: row.get(1)?,
            y: row.get(2)?,
        },
        metrics: MetricColumns {
            activity_count: row.get(3)?,
            avg_rating: row.get(4)?,
            last_interaction_ms: row.get(5)?,
            heatmap_score: row.get(6)?,
        },
    })
}

fn read_business_row(row: &Row<'_>) -> rusqlite::Result<RawBusiness> {
    Ok(RawBusiness {
        id: row.get(0)?,
        location_id: row.get(1)?,
        coordinates: Coord {
            x: row.get(2)?,
            y: row.get(3)?,
        },
        metrics: MetricColumns {
            activity_count: row.get(4)?,
            avg_rating: row.get(5)?,
            last_interaction_ms: row.get(6)?,
            heatmap_score: row.get(7)?,
        },
    })
}
