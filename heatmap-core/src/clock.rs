//! Time source used when stamping interactions.
//!
//! Score decay depends on "now", so the updater reads the current instant
//! through [`Clock`] rather than calling `Utc::now` directly. Tests inject a
//! fixed clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Supply the current instant in UTC.
///
/// # Examples
///
/// ```rust
/// use chrono::{DateTime, TimeZone, Utc};
/// use heatmap_core::Clock;
///
/// struct Epoch;
///
/// impl Clock for Epoch {
///     fn now(&self) -> DateTime<Utc> {
///         Utc.timestamp_opt(0, 0).unwrap()
///     }
/// }
///
/// assert_eq!(Epoch.now().timestamp(), 0);
/// ```
pub trait Clock: Send + Sync {
    /// Return the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
