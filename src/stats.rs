use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::OccupancyReport;

/// Flat summary of one pipeline run, one CSV row per run.
#[derive(Debug, Default, Serialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    pub strategy: String,
    pub bucket_width_ms: i64,

    // trips
    pub total_trips: usize,
    pub resolved_trips: usize,
    pub excluded_trips: usize,
    pub unresolved_start: usize,
    pub unresolved_end: usize,

    // series
    pub stations: usize,
    pub buckets: usize,
    pub records: usize,
    pub drifted_records: usize,
    pub mean_occupancy_rate: f64,
    pub first_bucket: Option<DateTime<Utc>>,
    pub last_bucket: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn from_report(report: &OccupancyReport) -> Self {
        let rate_sum: f64 = report.records.iter().map(|r| r.occupancy_rate).sum();
        let mean_occupancy_rate = if report.records.is_empty() {
            0.0
        } else {
            rate_sum / report.records.len() as f64
        };

        RunStats {
            timestamp: Utc::now(),
            strategy: report.strategy.as_str().to_string(),
            bucket_width_ms: report.grid.width().as_millis(),
            total_trips: report.total_trips,
            resolved_trips: report.resolved_trips,
            excluded_trips: report.exclusions.excluded_trips,
            unresolved_start: report.exclusions.unresolved_start,
            unresolved_end: report.exclusions.unresolved_end,
            stations: report.stations,
            buckets: report.grid.len(),
            records: report.records.len(),
            drifted_records: report.drifted_records(),
            mean_occupancy_rate,
            first_bucket: report.grid.datetimes().first().copied(),
            last_bucket: report.grid.datetimes().last().copied(),
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn resolved_pct(&self) -> f64 {
        Self::pct(self.resolved_trips, self.total_trips)
    }

    pub fn drifted_pct(&self) -> f64 {
        Self::pct(self.drifted_records, self.records)
    }
}
