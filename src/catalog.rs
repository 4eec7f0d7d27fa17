//! Station catalog: id/name indexes plus an R-tree for nearest-station lookup.
//!
//! Nearest-station search uses plain Euclidean distance in `(lat, lon)`
//! degrees. Docking stations within a city are close enough together that the
//! distortion does not change which station is closest in practice.

use std::collections::HashMap;
use std::fmt;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::model::{Station, StationId};

/// Which station keeps a name that appears more than once in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateNamePolicy {
    FirstWins,
    #[default]
    LastWins,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogOptions {
    /// Require finite coordinates on every station.
    pub spatial: bool,
    pub duplicate_names: DuplicateNamePolicy,
}

/// A station as stored in the catalog, with its capacity already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStation {
    pub id: StationId,
    pub name: String,
    pub capacity: u32,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
struct StationNode {
    index: usize,
    point: [f64; 2],
}

impl RTreeObject for StationNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StationNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

/// Immutable, read-only after construction; safe to share across threads.
pub struct Catalog {
    stations: Vec<CatalogStation>,
    by_id: HashMap<StationId, usize>,
    by_name: HashMap<String, usize>,
    tree: RTree<StationNode>,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("stations", &self.stations.len())
            .field("names", &self.by_name.len())
            .field("indexed", &self.tree.size())
            .finish()
    }
}

impl Catalog {
    /// Validates and indexes `stations`, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns an invalid-catalog [`CatalogError`] on a duplicate id, a
    /// negative capacity, or (when `options.spatial` is set) non-finite
    /// coordinates.
    #[tracing::instrument(skip(stations), fields(count = stations.len()))]
    pub fn build(stations: Vec<Station>, options: CatalogOptions) -> Result<Self, CatalogError> {
        let mut entries = Vec::with_capacity(stations.len());
        let mut by_id = HashMap::with_capacity(stations.len());
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(stations.len());
        let mut nodes = Vec::with_capacity(stations.len());

        for (index, station) in stations.into_iter().enumerate() {
            let capacity = u32::try_from(station.capacity).map_err(|_| {
                CatalogError::NegativeCapacity {
                    id: station.id.clone(),
                    capacity: station.capacity,
                }
            })?;

            let finite = station.latitude.is_finite() && station.longitude.is_finite();
            if !finite && options.spatial {
                return Err(CatalogError::NonFiniteCoordinates {
                    id: station.id,
                    latitude: station.latitude,
                    longitude: station.longitude,
                });
            }

            let id = StationId::new(&station.id);
            if by_id.insert(id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(station.id));
            }

            match options.duplicate_names {
                DuplicateNamePolicy::FirstWins => {
                    by_name.entry(station.name.clone()).or_insert(index);
                }
                DuplicateNamePolicy::LastWins => {
                    if let Some(previous) = by_name.insert(station.name.clone(), index) {
                        debug!(name = %station.name, previous, index, "Duplicate station name");
                    }
                }
            }

            if finite {
                nodes.push(StationNode {
                    index,
                    point: [station.latitude, station.longitude],
                });
            }

            entries.push(CatalogStation {
                id,
                name: station.name,
                capacity,
                latitude: station.latitude,
                longitude: station.longitude,
            });
        }

        info!(
            stations = entries.len(),
            names = by_name.len(),
            indexed = nodes.len(),
            "Station catalog built"
        );

        Ok(Self {
            stations: entries,
            by_id,
            by_name,
            tree: RTree::bulk_load(nodes),
        })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations in catalog order.
    pub fn stations(&self) -> &[CatalogStation] {
        &self.stations
    }

    pub fn get(&self, index: usize) -> Option<&CatalogStation> {
        self.stations.get(index)
    }

    pub fn index_of(&self, id: &StationId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<&StationId> {
        self.by_name.get(name).map(|&i| &self.stations[i].id)
    }

    /// Finds the station closest to `(latitude, longitude)`.
    ///
    /// Non-finite query coordinates are never matched and yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NoStationsAvailable`] when no station has usable
    /// coordinates.
    pub fn resolve_by_nearest(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<&StationId>, CatalogError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Ok(None);
        }
        if self.tree.size() == 0 {
            return Err(CatalogError::NoStationsAvailable);
        }

        Ok(self
            .tree
            .nearest_neighbor(&[latitude, longitude])
            .map(|node| &self.stations[node.index].id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, name: &str, capacity: i64, lat: f64, lon: f64) -> Station {
        Station {
            id: id.to_string(),
            name: name.to_string(),
            capacity,
            latitude: lat,
            longitude: lon,
        }
    }

    fn sample() -> Vec<Station> {
        vec![
            station("1", "Berri / de Maisonneuve", 20, 45.515, -73.561),
            station("2", "Metcalfe / du Square-Dorchester", 15, 45.500, -73.571),
            station("3", "Jeanne-Mance / Mont-Royal", 10, 45.520, -73.588),
        ]
    }

    #[test]
    fn test_build_preserves_order() {
        let catalog = Catalog::build(sample(), CatalogOptions::default()).unwrap();
        let ids: Vec<_> = catalog.stations().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.index_of(&StationId::from("3")), Some(2));
    }

    #[test]
    fn test_resolve_by_name() {
        let catalog = Catalog::build(sample(), CatalogOptions::default()).unwrap();
        assert_eq!(
            catalog.resolve_by_name("Metcalfe / du Square-Dorchester"),
            Some(&StationId::from("2"))
        );
        assert_eq!(catalog.resolve_by_name("Nowhere"), None);
    }

    #[test]
    fn test_resolve_by_nearest() {
        let catalog = Catalog::build(sample(), CatalogOptions::default()).unwrap();
        let id = catalog.resolve_by_nearest(45.5201, -73.5879).unwrap();
        assert_eq!(id, Some(&StationId::from("3")));
        let id = catalog.resolve_by_nearest(45.501, -73.570).unwrap();
        assert_eq!(id, Some(&StationId::from("2")));
    }

    #[test]
    fn test_resolve_by_nearest_non_finite_is_unresolved() {
        let catalog = Catalog::build(sample(), CatalogOptions::default()).unwrap();
        assert_eq!(catalog.resolve_by_nearest(f64::NAN, -73.5), Ok(None));
        assert_eq!(catalog.resolve_by_nearest(45.5, f64::NEG_INFINITY), Ok(None));
    }

    #[test]
    fn test_resolve_by_nearest_empty_catalog() {
        let catalog = Catalog::build(vec![], CatalogOptions::default()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(
            catalog.resolve_by_nearest(45.5, -73.5),
            Err(CatalogError::NoStationsAvailable)
        );
        // non-finite queries never reach the index, even an empty one
        assert_eq!(catalog.resolve_by_nearest(f64::NAN, -73.5), Ok(None));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut stations = sample();
        stations.push(station("2", "Other", 5, 45.0, -73.0));
        let err = Catalog::build(stations, CatalogOptions::default()).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId("2".into()));
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let stations = vec![station("9", "Broken", -1, 45.0, -73.0)];
        let err = Catalog::build(stations, CatalogOptions::default()).unwrap_err();
        assert!(matches!(err, CatalogError::NegativeCapacity { capacity: -1, .. }));
    }

    #[test]
    fn test_non_finite_coordinates_only_rejected_when_spatial() {
        let stations = vec![station("1", "Nowhere", 10, f64::NAN, -73.0)];

        let catalog = Catalog::build(stations.clone(), CatalogOptions::default()).unwrap();
        assert_eq!(catalog.resolve_by_name("Nowhere"), Some(&StationId::from("1")));
        assert_eq!(
            catalog.resolve_by_nearest(45.0, -73.0),
            Err(CatalogError::NoStationsAvailable)
        );

        let options = CatalogOptions {
            spatial: true,
            ..Default::default()
        };
        let err = Catalog::build(stations, options).unwrap_err();
        assert!(matches!(err, CatalogError::NonFiniteCoordinates { .. }));
    }

    #[test]
    fn test_duplicate_name_policy() {
        let stations = vec![
            station("1", "Same", 10, 45.0, -73.0),
            station("2", "Same", 10, 45.1, -73.1),
        ];

        let first = Catalog::build(
            stations.clone(),
            CatalogOptions {
                duplicate_names: DuplicateNamePolicy::FirstWins,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(first.resolve_by_name("Same"), Some(&StationId::from("1")));

        let last = Catalog::build(
            stations,
            CatalogOptions {
                duplicate_names: DuplicateNamePolicy::LastWins,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(last.resolve_by_name("Same"), Some(&StationId::from("2")));
    }
}
