//! CLI entry point for the station occupancy tool.
//!
//! Provides subcommands for building occupancy series from a trip log and a
//! station catalog, checking how well trips resolve to stations, and listing
//! the catalog.

use std::ffi::OsStr;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use station_occupancy::{
    bucket::BucketWidth,
    catalog::{Catalog, DuplicateNamePolicy},
    config::PipelineConfig,
    occupancy::AggregationStrategy,
    output::{append_stats, print_json, write_matrix, write_series},
    parser::{read_stations, read_trips},
    pipeline::build_series,
    resolver::{ResolutionMode, resolve_trips},
    stats::RunStats,
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "station_occupancy")]
#[command(about = "Reconstruct bike-share station occupancy from trip logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Layout {
    /// One row per station and bucket
    #[default]
    Long,
    /// One row per station, one column per bucket
    Wide,
}

/// Pipeline settings that override the config file when given.
#[derive(clap::Args)]
struct PipelineArgs {
    /// JSON pipeline config file
    #[arg(long)]
    config: Option<String>,

    /// Occupancy model
    #[arg(long, value_enum)]
    strategy: Option<AggregationStrategy>,

    /// Bucket width in minutes
    #[arg(short, long)]
    bucket_minutes: Option<i64>,

    /// How trip endpoints are matched to stations
    #[arg(long, value_enum)]
    resolution: Option<ResolutionMode>,

    /// Which station keeps a duplicated name
    #[arg(long, value_enum)]
    duplicate_names: Option<DuplicateNamePolicy>,
}

impl PipelineArgs {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(minutes) = self.bucket_minutes {
            config.bucket_width = BucketWidth::from_minutes(minutes)?;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if let Some(duplicate_names) = self.duplicate_names {
            config.duplicate_names = duplicate_names;
        }

        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the per-station occupancy series
    Occupancy {
        /// Trip log CSV (optionally .gz)
        #[arg(short, long)]
        trips: String,

        /// GBFS station_information.json
        #[arg(short, long)]
        stations: String,

        /// CSV file to write the series to
        #[arg(short, long, default_value = "data/occupancy.csv")]
        output: String,

        /// Output layout
        #[arg(long, value_enum, default_value_t = Layout::Long)]
        layout: Layout,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Optional: CSV file to append a run summary to
        #[arg(long)]
        stats_csv: Option<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Report how many trips resolve to a station
    Resolve {
        /// Trip log CSV (optionally .gz)
        #[arg(short, long)]
        trips: String,

        /// GBFS station_information.json
        #[arg(short, long)]
        stations: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// List the station catalog
    Stations {
        /// GBFS station_information.json
        #[arg(short, long)]
        stations: String,

        /// Which station keeps a duplicated name
        #[arg(long, value_enum, default_value_t = DuplicateNamePolicy::LastWins)]
        duplicate_names: DuplicateNamePolicy,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/station_occupancy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("station_occupancy.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Occupancy {
            trips,
            stations,
            output,
            layout,
            gzip,
            stats_csv,
            pipeline,
        } => {
            let config = pipeline.into_config()?;
            let catalog = Catalog::build(read_stations(&stations)?, config.catalog_options())?;
            let trips = read_trips(&trips)?;

            let report = build_series(&catalog, &trips, &config)?;

            match layout {
                Layout::Long => write_series(&output, &report.records, gzip)?,
                Layout::Wide => write_matrix(&output, &report, gzip)?,
            }

            let stats = RunStats::from_report(&report);
            if stats.drifted_records > 0 {
                warn!(
                    drifted = stats.drifted_records,
                    drifted_pct = stats.drifted_pct(),
                    "Cumulative estimates outside station capacity"
                );
            }
            print_json(&stats)?;

            if let Some(path) = stats_csv {
                append_stats(&path, &stats)?;
            }
        }
        Commands::Resolve {
            trips,
            stations,
            pipeline,
        } => {
            let config = pipeline.into_config()?;
            let catalog = Catalog::build(read_stations(&stations)?, config.catalog_options())?;
            let trips = read_trips(&trips)?;

            let (resolved, exclusions) = resolve_trips(&catalog, &trips, config.resolution);

            info!(
                total = trips.len(),
                resolved = resolved.len(),
                resolved_pct = RunStats::pct(resolved.len(), trips.len()),
                unresolved_start = exclusions.unresolved_start,
                unresolved_end = exclusions.unresolved_end,
                excluded = exclusions.excluded_trips,
                "Trip resolution summary"
            );
        }
        Commands::Stations {
            stations,
            duplicate_names,
        } => {
            let options = PipelineConfig {
                resolution: ResolutionMode::Name,
                duplicate_names,
                ..Default::default()
            }
            .catalog_options();
            let catalog = Catalog::build(read_stations(&stations)?, options)?;

            for station in catalog.stations() {
                info!(
                    station_id = %station.id,
                    name = %station.name,
                    capacity = station.capacity,
                    lat = station.latitude,
                    lon = station.longitude,
                    "Station"
                );
            }

            let total_capacity: u64 = catalog
                .stations()
                .iter()
                .map(|s| u64::from(s.capacity))
                .sum();
            let zero_capacity = catalog.stations().iter().filter(|s| s.capacity == 0).count();

            info!(
                total = catalog.len(),
                total_capacity,
                zero_capacity,
                "Station catalog summary"
            );
        }
    }

    Ok(())
}
