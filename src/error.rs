//! Error types for catalog construction and series building.

use thiserror::Error;

/// Problems with the station catalog.
///
/// Everything except [`CatalogError::NoStationsAvailable`] means the catalog
/// itself is invalid and the run must stop before any trip is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("duplicate station id '{0}'")]
    DuplicateId(String),

    #[error("station '{id}' has negative capacity {capacity}")]
    NegativeCapacity { id: String, capacity: i64 },

    #[error("station '{id}' has non-finite coordinates ({latitude}, {longitude})")]
    NonFiniteCoordinates {
        id: String,
        latitude: f64,
        longitude: f64,
    },

    #[error("no stations available for nearest-neighbour lookup")]
    NoStationsAvailable,
}

impl CatalogError {
    /// `true` for errors that make the catalog unusable.
    pub fn is_invalid_catalog(&self) -> bool {
        !matches!(self, CatalogError::NoStationsAvailable)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OccupancyError {
    #[error("invalid catalog: {0}")]
    InvalidCatalog(#[from] CatalogError),

    #[error("bucket width must be positive, got {0} ms")]
    InvalidBucketWidth(i64),

    #[error("timestamp {0} ms is outside the representable datetime range")]
    TimestampOutOfRange(i64),

    #[error("time range spans {buckets} buckets, more than the limit of {limit}")]
    TooManyBuckets { buckets: u64, limit: usize },
}
