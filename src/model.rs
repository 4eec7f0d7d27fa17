//! Input records consumed by the occupancy pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Canonical station identifier.
///
/// Backed by `Arc<str>` so resolved trips and activity records can share the
/// catalog's strings without copying them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(Arc<str>);

impl StationId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StationId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A docking station from the static catalog.
///
/// `capacity` is signed so that a bad feed can be rejected by
/// [`Catalog::build`](crate::catalog::Catalog::build) instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub capacity: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// One end of a trip as it appears in the raw log.
///
/// Either field may be missing; coordinates may also be non-finite, which
/// the resolver treats as unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Endpoint {
    pub name: Option<String>,
    pub coordinates: Option<(f64, f64)>,
}

impl Endpoint {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            coordinates: None,
        }
    }

    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            name: None,
            coordinates: Some((latitude, longitude)),
        }
    }

    /// Coordinates, only if both components are finite.
    pub fn finite_coordinates(&self) -> Option<(f64, f64)> {
        self.coordinates
            .filter(|(lat, lon)| lat.is_finite() && lon.is_finite())
    }
}

/// A single historical trip. Times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trip {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub start: Endpoint,
    pub end: Endpoint,
}
