//! Core domain types for the heatmap engine.
//!
//! The crate models the two scored entity kinds ([`Location`] and
//! [`Business`]), the interaction events reported against them, and the
//! [`EntityRepository`] seam through which the scorer reads and writes
//! metrics. A SQLite implementation of the repository is available behind the
//! `store-sqlite` feature.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod clock;
mod entity;
mod interaction;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use clock::{Clock, SystemClock};
pub use entity::{
    Business, Entity, EntityId, EntityIdError, EntityKind, EntityMetrics, Location,
    ParseEntityKindError,
};
pub use interaction::{
    InteractionEvent, InteractionKind, ParseInteractionKindError, Rating, RatingError,
};
pub use store::{EntityRepository, RepositoryError};

#[cfg(feature = "store-sqlite")]
pub use store::{SqliteEntityStore, SqliteStoreError};
