//! Maps raw trip endpoints onto catalog stations.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::model::{Endpoint, StationId, Trip};

/// How an endpoint is matched against the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Exact station name only.
    Name,
    /// Nearest station to the endpoint coordinates only.
    Nearest,
    /// Name first, coordinates when the name is missing or unknown.
    #[default]
    NameThenNearest,
}

/// A trip whose both ends map to known stations.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrip {
    pub start_station: StationId,
    pub end_station: StationId,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

/// Trips dropped from aggregation, by cause.
///
/// A trip unresolved at both ends counts once in each cause and once in
/// `excluded_trips`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionCounts {
    pub unresolved_start: usize,
    pub unresolved_end: usize,
    pub excluded_trips: usize,
}

impl ExclusionCounts {
    fn record(&mut self, start_ok: bool, end_ok: bool) {
        if !start_ok {
            self.unresolved_start += 1;
        }
        if !end_ok {
            self.unresolved_end += 1;
        }
        if !(start_ok && end_ok) {
            self.excluded_trips += 1;
        }
    }
}

/// Resolves a single endpoint, or `None` if it cannot be matched.
pub fn resolve_endpoint(
    catalog: &Catalog,
    endpoint: &Endpoint,
    mode: ResolutionMode,
) -> Option<StationId> {
    let by_name = || {
        endpoint
            .name
            .as_deref()
            .and_then(|name| catalog.resolve_by_name(name))
            .cloned()
    };
    let by_nearest = || {
        let (lat, lon) = endpoint.finite_coordinates()?;
        // an empty spatial index just means nothing can be matched
        catalog.resolve_by_nearest(lat, lon).ok().flatten().cloned()
    };

    match mode {
        ResolutionMode::Name => by_name(),
        ResolutionMode::Nearest => by_nearest(),
        ResolutionMode::NameThenNearest => by_name().or_else(by_nearest),
    }
}

/// Resolves every trip in parallel.
///
/// Resolved trips keep the input order. Unresolvable trips are dropped and
/// tallied in the returned [`ExclusionCounts`].
#[tracing::instrument(skip(catalog, trips), fields(trips = trips.len()))]
pub fn resolve_trips(
    catalog: &Catalog,
    trips: &[Trip],
    mode: ResolutionMode,
) -> (Vec<ResolvedTrip>, ExclusionCounts) {
    let outcomes: Vec<(Option<StationId>, Option<StationId>)> = trips
        .par_iter()
        .map(|trip| {
            (
                resolve_endpoint(catalog, &trip.start, mode),
                resolve_endpoint(catalog, &trip.end, mode),
            )
        })
        .collect();

    let mut exclusions = ExclusionCounts::default();
    let mut resolved = Vec::with_capacity(trips.len());

    for (trip, outcome) in trips.iter().zip(outcomes) {
        exclusions.record(outcome.0.is_some(), outcome.1.is_some());
        if let (Some(start_station), Some(end_station)) = outcome {
            resolved.push(ResolvedTrip {
                start_station,
                end_station,
                start_time_ms: trip.start_time_ms,
                end_time_ms: trip.end_time_ms,
            });
        }
    }

    if exclusions.excluded_trips > 0 {
        warn!(
            excluded = exclusions.excluded_trips,
            unresolved_start = exclusions.unresolved_start,
            unresolved_end = exclusions.unresolved_end,
            "Trips excluded from aggregation"
        );
    }
    debug!(resolved = resolved.len(), "Trip resolution finished");

    (resolved, exclusions)
}
