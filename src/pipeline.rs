//! End-to-end series construction: resolve, bucket, aggregate.

use tracing::info;

use crate::catalog::Catalog;
use crate::config::PipelineConfig;
use crate::error::OccupancyError;
use crate::model::{Station, Trip};
use crate::occupancy::{self, AggregationStrategy, StationActivity, TimeGrid};
use crate::resolver::{ExclusionCounts, resolve_trips};

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct OccupancyReport {
    pub strategy: AggregationStrategy,
    pub grid: TimeGrid,
    /// Ordered by station (catalog order), then bucket ascending.
    pub records: Vec<StationActivity>,
    pub exclusions: ExclusionCounts,
    pub stations: usize,
    pub total_trips: usize,
    pub resolved_trips: usize,
}

impl OccupancyReport {
    /// Records whose cumulative estimate lies outside `[0, capacity]`.
    pub fn drifted_records(&self) -> usize {
        self.records.iter().filter(|r| !r.within_capacity()).count()
    }
}

/// Builds the station activity series for `trips` against `catalog`.
///
/// The time range covers the resolvable trips only, so excluded trips never
/// change the output. No resolvable trips (or no stations) gives an empty
/// series.
#[tracing::instrument(skip(catalog, trips), fields(trips = trips.len(), stations = catalog.len()))]
pub fn build_series(
    catalog: &Catalog,
    trips: &[Trip],
    config: &PipelineConfig,
) -> Result<OccupancyReport, OccupancyError> {
    let (resolved, exclusions) = resolve_trips(catalog, trips, config.resolution);
    let grid = TimeGrid::spanning(&resolved, config.bucket_width)?;
    let records = occupancy::aggregate(config.strategy, catalog, &resolved, &grid);

    info!(
        strategy = config.strategy.as_str(),
        bucket_width = %config.bucket_width,
        resolved = resolved.len(),
        excluded = exclusions.excluded_trips,
        buckets = grid.len(),
        records = records.len(),
        "Occupancy series built"
    );

    Ok(OccupancyReport {
        strategy: config.strategy,
        grid,
        records,
        exclusions,
        stations: catalog.len(),
        total_trips: trips.len(),
        resolved_trips: resolved.len(),
    })
}

/// Validates `stations` into a catalog, then runs [`build_series`].
///
/// # Errors
///
/// [`OccupancyError::InvalidCatalog`] before any trip is looked at if the
/// stations do not form a valid catalog.
pub fn run(
    stations: Vec<Station>,
    trips: &[Trip],
    config: &PipelineConfig,
) -> Result<OccupancyReport, OccupancyError> {
    let catalog = Catalog::build(stations, config.catalog_options())?;
    build_series(&catalog, trips, config)
}
