//! Slot propagation: every departure lowers all later slots by one, every
//! arrival raises them by one.
//!
//! Implemented as a difference array per station. The snapped arrivals minus
//! departures at each slot are the point deltas, and one prefix sum turns them
//! into the level. The level starts at 0 and is clamped into
//! `[0, capacity]` after the sum.

use crate::catalog::Catalog;
use crate::occupancy::clamp::clamp;
use crate::occupancy::{StationActivity, TimeGrid, count_events, per_station};
use crate::resolver::ResolvedTrip;

pub fn slot_propagation(
    catalog: &Catalog,
    trips: &[ResolvedTrip],
    grid: &TimeGrid,
) -> Vec<StationActivity> {
    let counts = count_events(catalog, trips, grid, TimeGrid::nearest_index);

    per_station(catalog, &counts, |station, departures, arrivals| {
        let capacity = i64::from(station.capacity);
        let mut level = 0i64;

        grid.datetimes()
            .iter()
            .zip(departures.iter().zip(arrivals))
            .map(|(&bucket_start, (&dep, &arr))| {
                level += i64::from(arr) - i64::from(dep);
                let bikes = clamp(level, capacity);
                StationActivity::new(station, bucket_start, dep, arr, bikes as f64)
            })
            .collect()
    })
}
