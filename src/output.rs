//! Output formatting and persistence for occupancy series and run summaries.
//!
//! Supports JSON logging of the summary, long and wide CSV exports of the
//! series, and CSV append of run statistics.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info};

use crate::occupancy::StationActivity;
use crate::pipeline::OccupancyReport;
use crate::stats::RunStats;

/// Logs run statistics as pretty-printed JSON.
pub fn print_json(stats: &RunStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// Destination of a CSV export, optionally gzip compressed.
enum Sink<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Sink<W> {
    fn new(inner: W, gzip: bool) -> Self {
        if gzip {
            Sink::Gzip(GzEncoder::new(inner, Compression::default()))
        } else {
            Sink::Plain(inner)
        }
    }

    /// Flushes everything, writing the gzip trailer when compressing.
    fn finish(self) -> io::Result<W> {
        match self {
            Sink::Plain(mut inner) => {
                inner.flush()?;
                Ok(inner)
            }
            Sink::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(inner) => inner.write(buf),
            Sink::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(inner) => inner.flush(),
            Sink::Gzip(encoder) => encoder.flush(),
        }
    }
}

fn create(path: &str, gzip: bool) -> Result<csv::Writer<Sink<File>>> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create '{path}'"))?;

    Ok(csv::Writer::from_writer(Sink::new(file, gzip)))
}

/// Flushes the CSV buffer and closes the sink, surfacing any write error.
fn finish<W: Write>(writer: csv::Writer<Sink<W>>) -> io::Result<W> {
    writer.into_inner().map_err(|e| e.into_error())?.finish()
}

/// Writes the series in long format, one row per (station, bucket).
pub fn write_series(path: &str, records: &[StationActivity], gzip: bool) -> Result<()> {
    debug!(path, rows = records.len(), gzip, "Writing occupancy series");

    let mut writer = create(path, gzip)?;
    for record in records {
        writer.serialize(record)?;
    }
    finish(writer).with_context(|| format!("failed to write '{path}'"))?;

    info!(path, rows = records.len(), "Occupancy series written");
    Ok(())
}

/// Writes the series in wide format: one row per station, one column per
/// bucket start, cells holding the cumulative estimate.
pub fn write_matrix(path: &str, report: &OccupancyReport, gzip: bool) -> Result<()> {
    let buckets = report.grid.len();
    debug!(path, buckets, gzip, "Writing occupancy matrix");

    let mut writer = create(path, gzip)?;

    let mut header = vec!["station_id".to_string()];
    header.extend(report.grid.datetimes().iter().map(|d| d.to_rfc3339()));
    writer.write_record(&header)?;

    let mut rows = 0usize;
    if buckets > 0 {
        for station in report.records.chunks(buckets) {
            let mut row = Vec::with_capacity(buckets + 1);
            row.push(station[0].station_id.clone());
            row.extend(station.iter().map(|r| r.cumulative_estimate.to_string()));
            writer.write_record(&row)?;
            rows += 1;
        }
    }
    finish(writer).with_context(|| format!("failed to write '{path}'"))?;

    info!(path, stations = rows, buckets, "Occupancy matrix written");
    Ok(())
}

/// Appends a [`RunStats`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_stats(path: &str, stats: &RunStats) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending run stats");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // header only on the first append
        .from_writer(file);

    writer.serialize(stats)?;
    writer.flush()?;

    Ok(())
}
