//! Readers for the trip log (CSV) and the station catalog (GBFS JSON).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::model::{Endpoint, Station, Trip};

/// One row of the trip export. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct TripRow {
    #[serde(rename = "STARTTIMEMS")]
    start_time_ms: Option<i64>,
    #[serde(rename = "ENDTIMEMS")]
    end_time_ms: Option<i64>,
    #[serde(rename = "STARTSTATIONNAME", default)]
    start_name: Option<String>,
    #[serde(rename = "ENDSTATIONNAME", default)]
    end_name: Option<String>,
    #[serde(rename = "STARTSTATIONLATITUDE", default)]
    start_latitude: Option<f64>,
    #[serde(rename = "STARTSTATIONLONGITUDE", default)]
    start_longitude: Option<f64>,
    #[serde(rename = "ENDSTATIONLATITUDE", default)]
    end_latitude: Option<f64>,
    #[serde(rename = "ENDSTATIONLONGITUDE", default)]
    end_longitude: Option<f64>,
}

fn endpoint(name: Option<String>, latitude: Option<f64>, longitude: Option<f64>) -> Endpoint {
    Endpoint {
        name: name.filter(|n| !n.is_empty()),
        coordinates: latitude.zip(longitude),
    }
}

/// Parses trips from CSV.
///
/// Rows without both timestamps are skipped and logged; any other malformed
/// row is an error.
pub fn parse_trips<R: Read>(reader: R) -> Result<Vec<Trip>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut trips = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.deserialize::<TripRow>().enumerate() {
        let row = result.with_context(|| format!("invalid trip row {}", line + 1))?;

        let (Some(start_time_ms), Some(end_time_ms)) = (row.start_time_ms, row.end_time_ms) else {
            skipped += 1;
            continue;
        };

        trips.push(Trip {
            start_time_ms,
            end_time_ms,
            start: endpoint(row.start_name, row.start_latitude, row.start_longitude),
            end: endpoint(row.end_name, row.end_latitude, row.end_longitude),
        });
    }

    if skipped > 0 {
        warn!(skipped, "Trip rows without timestamps skipped");
    }
    debug!(trips = trips.len(), "Trip rows parsed");

    Ok(trips)
}

/// GBFS ids are strings in recent feeds and integers in older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStationId {
    Text(String),
    Number(i64),
}

impl From<RawStationId> for String {
    fn from(id: RawStationId) -> Self {
        match id {
            RawStationId::Text(s) => s,
            RawStationId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GbfsStation {
    station_id: RawStationId,
    name: String,
    /// Missing capacity is read as 0, which pins the occupancy rate at 0.
    #[serde(default)]
    capacity: i64,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct GbfsData {
    stations: Vec<GbfsStation>,
}

#[derive(Debug, Deserialize)]
struct GbfsStationInformation {
    data: GbfsData,
}

/// Parses a GBFS `station_information.json` document.
pub fn parse_stations(bytes: &[u8]) -> Result<Vec<Station>> {
    let doc: GbfsStationInformation =
        serde_json::from_slice(bytes).context("invalid station_information document")?;

    Ok(doc
        .data
        .stations
        .into_iter()
        .map(|s| Station {
            id: s.station_id.into(),
            name: s.name,
            capacity: s.capacity,
            latitude: s.lat,
            longitude: s.lon,
        })
        .collect())
}

/// Opens `path`, transparently decompressing `.gz` files.
fn open(path: &str) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open '{path}'"))?;
    let reader = BufReader::new(file);

    if Path::new(path).extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

#[tracing::instrument]
pub fn read_trips(path: &str) -> Result<Vec<Trip>> {
    let trips = parse_trips(open(path)?).with_context(|| format!("failed to read trips '{path}'"))?;
    info!(trips = trips.len(), "Trips loaded");
    Ok(trips)
}

#[tracing::instrument]
pub fn read_stations(path: &str) -> Result<Vec<Station>> {
    let mut bytes = Vec::new();
    open(path)?.read_to_end(&mut bytes)?;
    let stations =
        parse_stations(&bytes).with_context(|| format!("failed to read stations '{path}'"))?;
    info!(stations = stations.len(), "Stations loaded");
    Ok(stations)
}
