//! Data types shared by both aggregation strategies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogStation;
use crate::occupancy::clamp::occupancy_rate;

/// Which occupancy model to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationStrategy {
    /// Trip ends snapped to the nearest bucket, level starts at 0 and the
    /// whole series is clamped to `[0, capacity]`.
    SlotPropagation,
    /// Trip ends floored into their bucket, level starts at half capacity and
    /// only the rate is clamped.
    #[default]
    CumulativeNet,
}

impl AggregationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationStrategy::SlotPropagation => "slot-propagation",
            AggregationStrategy::CumulativeNet => "cumulative-net",
        }
    }
}

/// One row of the output series: a station in a single bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationActivity {
    pub station_id: String,
    pub station_name: String,
    pub datetime_bucket_start: DateTime<Utc>,
    pub nb_departures: u32,
    pub nb_arrivals: u32,
    pub delta: i64,
    pub cumulative_estimate: f64,
    pub occupancy_rate: f64,
    pub capacity: u32,
}

impl StationActivity {
    pub(crate) fn new(
        station: &CatalogStation,
        bucket_start: DateTime<Utc>,
        departures: u32,
        arrivals: u32,
        cumulative_estimate: f64,
    ) -> Self {
        Self {
            station_id: station.id.to_string(),
            station_name: station.name.clone(),
            datetime_bucket_start: bucket_start,
            nb_departures: departures,
            nb_arrivals: arrivals,
            delta: i64::from(arrivals) - i64::from(departures),
            cumulative_estimate,
            occupancy_rate: occupancy_rate(cumulative_estimate, station.capacity),
            capacity: station.capacity,
        }
    }

    /// `true` when the estimate lies in `[0, capacity]`.
    pub fn within_capacity(&self) -> bool {
        self.cumulative_estimate >= 0.0 && self.cumulative_estimate <= f64::from(self.capacity)
    }
}

/// Per-station departure and arrival counts, one flat arena per kind,
/// `buckets` entries per station in catalog order.
#[derive(Debug, Clone)]
pub(crate) struct EventCounts {
    buckets: usize,
    departures: Vec<u32>,
    arrivals: Vec<u32>,
}

impl EventCounts {
    pub(crate) fn new(stations: usize, buckets: usize) -> Self {
        Self {
            buckets,
            departures: vec![0; stations * buckets],
            arrivals: vec![0; stations * buckets],
        }
    }

    pub(crate) fn add_departure(&mut self, station: usize, bucket: usize) {
        self.departures[station * self.buckets + bucket] += 1;
    }

    pub(crate) fn add_arrival(&mut self, station: usize, bucket: usize) {
        self.arrivals[station * self.buckets + bucket] += 1;
    }

    /// `(departures, arrivals)` for one station, bucket-ascending.
    pub(crate) fn station(&self, station: usize) -> (&[u32], &[u32]) {
        let range = station * self.buckets..(station + 1) * self.buckets;
        (&self.departures[range.clone()], &self.arrivals[range])
    }
}
