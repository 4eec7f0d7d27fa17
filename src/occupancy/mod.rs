//! Occupancy aggregation over a station × bucket grid.
//!
//! Two models are kept side by side behind [`AggregationStrategy`]. They
//! produce different numbers from the same trips and are not meant to agree:
//!
//! - [`slot::slot_propagation`] snaps trip ends to the nearest bucket, starts
//!   every station empty and clamps the level into `[0, capacity]`.
//! - [`cumulative::cumulative_net`] floors trip ends into their bucket, seeds
//!   every station at half capacity and clamps only the occupancy rate. The
//!   cumulative estimate itself may leave `[0, capacity]`.

pub mod clamp;
pub mod cumulative;
pub mod slot;
pub mod types;

pub use types::{AggregationStrategy, StationActivity};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::bucket::{self, BucketWidth};
use crate::catalog::{Catalog, CatalogStation};
use crate::error::OccupancyError;
use crate::resolver::ResolvedTrip;
use types::EventCounts;

/// Ordered bucket starts with their UTC datetimes.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    width: BucketWidth,
    starts: Vec<i64>,
    datetimes: Vec<DateTime<Utc>>,
}

impl TimeGrid {
    /// Builds a grid from `starts`, which must be ascending multiples of
    /// `width`.
    pub fn new(starts: Vec<i64>, width: BucketWidth) -> Result<Self, OccupancyError> {
        let datetimes = starts
            .iter()
            .map(|&ms| {
                DateTime::from_timestamp_millis(ms).ok_or(OccupancyError::TimestampOutOfRange(ms))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            width,
            starts,
            datetimes,
        })
    }

    /// Smallest grid covering every start and end time in `trips`.
    ///
    /// Empty when there are no trips.
    ///
    /// # Errors
    ///
    /// [`OccupancyError::TimestampOutOfRange`] when a trip time has no UTC
    /// datetime, [`OccupancyError::TooManyBuckets`] when the trips span more
    /// than [`bucket::MAX_BUCKETS`] buckets.
    pub fn spanning(trips: &[ResolvedTrip], width: BucketWidth) -> Result<Self, OccupancyError> {
        let bounds = trips
            .iter()
            .flat_map(|t| [t.start_time_ms, t.end_time_ms])
            .fold(None, |acc: Option<(i64, i64)>, t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            });

        let starts = match bounds {
            Some((min, max)) => {
                for instant in [min, max] {
                    if DateTime::from_timestamp_millis(instant).is_none() {
                        return Err(OccupancyError::TimestampOutOfRange(instant));
                    }
                }
                bucket::full_range(min, max, width)?
            }
            None => Vec::new(),
        };
        Self::new(starts, width)
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn width(&self) -> BucketWidth {
        self.width
    }

    pub fn starts(&self) -> &[i64] {
        &self.starts
    }

    pub fn datetimes(&self) -> &[DateTime<Utc>] {
        &self.datetimes
    }

    /// Index of the bucket containing `instant`, clamped to the grid.
    pub(crate) fn floor_index(&self, instant: i64) -> usize {
        let Some(&first) = self.starts.first() else {
            return 0;
        };
        // `first` is a bucket start, so flooring the offset floors the instant
        let offset = instant.saturating_sub(first);
        let index = offset.div_euclid(self.width.as_millis()).max(0) as usize;
        index.min(self.starts.len().saturating_sub(1))
    }

    /// Index of the bucket start nearest to `instant`, earlier on ties.
    pub(crate) fn nearest_index(&self, instant: i64) -> usize {
        bucket::nearest_bucket_index(&self.starts, instant).unwrap_or(0)
    }
}

/// Runs `strategy` over already-resolved trips.
///
/// Returns one record per (station, bucket), station in catalog order, then
/// bucket ascending.
#[tracing::instrument(
    skip(catalog, trips, grid),
    fields(trips = trips.len(), buckets = grid.len())
)]
pub fn aggregate(
    strategy: AggregationStrategy,
    catalog: &Catalog,
    trips: &[ResolvedTrip],
    grid: &TimeGrid,
) -> Vec<StationActivity> {
    match strategy {
        AggregationStrategy::SlotPropagation => slot::slot_propagation(catalog, trips, grid),
        AggregationStrategy::CumulativeNet => cumulative::cumulative_net(catalog, trips, grid),
    }
}

/// Tallies departures and arrivals into the bucket chosen by `locate`.
///
/// Trips naming a station outside `catalog` are skipped.
pub(crate) fn count_events(
    catalog: &Catalog,
    trips: &[ResolvedTrip],
    grid: &TimeGrid,
    locate: impl Fn(&TimeGrid, i64) -> usize,
) -> EventCounts {
    let mut counts = EventCounts::new(catalog.len(), grid.len());
    if grid.is_empty() {
        return counts;
    }

    for trip in trips {
        if let Some(station) = catalog.index_of(&trip.start_station) {
            counts.add_departure(station, locate(grid, trip.start_time_ms));
        }
        if let Some(station) = catalog.index_of(&trip.end_station) {
            counts.add_arrival(station, locate(grid, trip.end_time_ms));
        }
    }

    counts
}

/// Applies `series` to every station in parallel and concatenates the
/// results in catalog order.
pub(crate) fn per_station<F>(
    catalog: &Catalog,
    counts: &EventCounts,
    series: F,
) -> Vec<StationActivity>
where
    F: Fn(&CatalogStation, &[u32], &[u32]) -> Vec<StationActivity> + Sync,
{
    let chunks: Vec<Vec<StationActivity>> = catalog
        .stations()
        .par_iter()
        .enumerate()
        .map(|(index, station)| {
            let (departures, arrivals) = counts.station(index);
            series(station, departures, arrivals)
        })
        .collect();

    chunks.into_iter().flatten().collect()
}
