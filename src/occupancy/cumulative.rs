//! Departure/arrival counts integrated into a running net-change estimate.
//!
//! Each station is assumed half full at the first bucket. The cumulative
//! estimate is not clamped, so it can leave `[0, capacity]` when the trip log
//! does not balance; only `occupancy_rate` is bounded. Callers can spot such
//! records with [`StationActivity::within_capacity`].

use crate::catalog::Catalog;
use crate::occupancy::{StationActivity, TimeGrid, count_events, per_station};
use crate::resolver::ResolvedTrip;

const BASELINE_FILL: f64 = 0.5;

pub fn cumulative_net(
    catalog: &Catalog,
    trips: &[ResolvedTrip],
    grid: &TimeGrid,
) -> Vec<StationActivity> {
    let counts = count_events(catalog, trips, grid, TimeGrid::floor_index);

    per_station(catalog, &counts, |station, departures, arrivals| {
        let baseline = f64::from(station.capacity) * BASELINE_FILL;
        let mut net = 0i64;

        grid.datetimes()
            .iter()
            .zip(departures.iter().zip(arrivals))
            .map(|(&bucket_start, (&dep, &arr))| {
                net += i64::from(arr) - i64::from(dep);
                StationActivity::new(station, bucket_start, dep, arr, net as f64 + baseline)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::BucketWidth;
    use crate::catalog::CatalogOptions;
    use crate::model::{Station, StationId};

    const MIN: i64 = 60_000;

    fn catalog(capacities: &[(&str, i64)]) -> Catalog {
        let stations = capacities
            .iter()
            .map(|&(id, capacity)| Station {
                id: id.to_string(),
                name: format!("Station {id}"),
                capacity,
                latitude: 0.0,
                longitude: 0.0,
            })
            .collect();
        Catalog::build(stations, CatalogOptions::default()).unwrap()
    }

    fn trip(from: &str, to: &str, start: i64, end: i64) -> ResolvedTrip {
        ResolvedTrip {
            start_station: StationId::from(from),
            end_station: StationId::from(to),
            start_time_ms: start,
            end_time_ms: end,
        }
    }

    #[test]
    fn test_round_trip_seeded_at_half_capacity() {
        let catalog = catalog(&[("A", 10)]);
        let trips = vec![trip("A", "A", 0, 15 * MIN)];
        let grid = TimeGrid::spanning(&trips, BucketWidth::default()).unwrap();

        let records = cumulative_net(&catalog, &trips, &grid);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].nb_departures, 1);
        assert_eq!(records[0].delta, -1);
        assert_eq!(records[0].cumulative_estimate, 4.0);
        assert_eq!(records[1].nb_arrivals, 1);
        assert_eq!(records[1].delta, 1);
        assert_eq!(records[1].cumulative_estimate, 5.0);
        assert_eq!(records[1].occupancy_rate, 0.5);
    }

    #[test]
    fn test_events_floor_into_their_bucket() {
        let catalog = catalog(&[("A", 10), ("B", 10)]);
        let trips = vec![trip("A", "B", 14 * MIN, 29 * MIN)];
        let grid = TimeGrid::spanning(&trips, BucketWidth::default()).unwrap();

        let records = cumulative_net(&catalog, &trips, &grid);
        let a: Vec<_> = records.iter().filter(|r| r.station_id == "A").collect();
        let b: Vec<_> = records.iter().filter(|r| r.station_id == "B").collect();

        assert_eq!(grid.len(), 3);
        assert_eq!(a[0].nb_departures, 1);
        assert_eq!(b[1].nb_arrivals, 1);
        assert_eq!(b[2].cumulative_estimate, 6.0);
    }

    #[test]
    fn test_cumulative_may_drift_but_rate_is_bounded() {
        let catalog = catalog(&[("A", 2), ("B", 2)]);
        let trips: Vec<_> = (0..4).map(|_| trip("A", "B", 0, 15 * MIN)).collect();
        let grid = TimeGrid::spanning(&trips, BucketWidth::default()).unwrap();

        let records = cumulative_net(&catalog, &trips, &grid);
        let a_last = records.iter().filter(|r| r.station_id == "A").last().unwrap();
        let b_last = records.iter().filter(|r| r.station_id == "B").last().unwrap();

        assert_eq!(a_last.cumulative_estimate, -3.0);
        assert_eq!(a_last.occupancy_rate, 0.0);
        assert!(!a_last.within_capacity());
        assert_eq!(b_last.cumulative_estimate, 5.0);
        assert_eq!(b_last.occupancy_rate, 1.0);
    }

    #[test]
    fn test_idle_station_stays_at_baseline() {
        let catalog = catalog(&[("A", 10), ("Idle", 7)]);
        let trips = vec![trip("A", "A", 0, 15 * MIN)];
        let grid = TimeGrid::spanning(&trips, BucketWidth::default()).unwrap();

        let records = cumulative_net(&catalog, &trips, &grid);
        let idle: Vec<_> = records.iter().filter(|r| r.station_id == "Idle").collect();

        assert_eq!(idle.len(), 2);
        assert!(idle.iter().all(|r| r.cumulative_estimate == 3.5 && r.delta == 0));
    }
}
