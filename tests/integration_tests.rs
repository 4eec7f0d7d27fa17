use station_occupancy::catalog::Catalog;
use station_occupancy::config::PipelineConfig;
use station_occupancy::occupancy::{AggregationStrategy, StationActivity};
use station_occupancy::output::write_series;
use station_occupancy::parser::{parse_stations, parse_trips};
use station_occupancy::pipeline::{OccupancyReport, build_series};
use station_occupancy::stats::RunStats;

fn fixture_report(strategy: AggregationStrategy) -> OccupancyReport {
    let stations = parse_stations(include_bytes!("fixtures/station_information.json"))
        .expect("Failed to parse stations");
    let trips =
        parse_trips(&include_bytes!("fixtures/trips.csv")[..]).expect("Failed to parse trips");

    let config = PipelineConfig {
        strategy,
        ..Default::default()
    };
    let catalog = Catalog::build(stations, config.catalog_options()).expect("Invalid catalog");
    build_series(&catalog, &trips, &config).expect("Pipeline failed")
}

fn estimates(records: &[StationActivity], station_id: &str) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.station_id == station_id)
        .map(|r| r.cumulative_estimate)
        .collect()
}

#[test]
fn test_cumulative_net_pipeline() {
    let report = fixture_report(AggregationStrategy::CumulativeNet);

    assert_eq!(report.total_trips, 7);
    assert_eq!(report.resolved_trips, 6);
    assert_eq!(report.exclusions.unresolved_start, 1);
    assert_eq!(report.exclusions.unresolved_end, 0);

    assert_eq!(report.grid.len(), 5);
    assert_eq!(report.records.len(), 4 * 5);
    assert_eq!(
        report.grid.datetimes()[0].to_rfc3339(),
        "2024-06-01T10:00:00+00:00"
    );

    assert_eq!(estimates(&report.records, "1"), vec![1.0; 5]);
    assert_eq!(estimates(&report.records, "2"), vec![2.0, 3.0, 2.0, 3.0, 3.0]);
    assert_eq!(estimates(&report.records, "3"), vec![1.0, 1.0, 0.0, 2.0, 2.0]);
    assert_eq!(estimates(&report.records, "4"), vec![0.0; 5]);

    assert!(report.records.iter().all(|r| (0.0..=1.0).contains(&r.occupancy_rate)));
    assert!(
        report
            .records
            .iter()
            .filter(|r| r.station_id == "4")
            .all(|r| r.occupancy_rate == 0.0)
    );
}

#[test]
fn test_slot_propagation_pipeline() {
    let report = fixture_report(AggregationStrategy::SlotPropagation);

    assert_eq!(report.records.len(), 4 * 5);
    assert_eq!(estimates(&report.records, "1"), vec![0.0; 5]);
    assert_eq!(estimates(&report.records, "2"), vec![0.0, 0.0, 0.0, 1.0, 1.0]);
    assert_eq!(estimates(&report.records, "3"), vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    assert_eq!(report.drifted_records(), 0);
}

#[test]
fn test_shuffled_trips_give_identical_series() {
    let stations = parse_stations(include_bytes!("fixtures/station_information.json")).unwrap();
    let mut trips = parse_trips(&include_bytes!("fixtures/trips.csv")[..]).unwrap();
    let config = PipelineConfig::default();
    let catalog = Catalog::build(stations, config.catalog_options()).unwrap();

    let forward = build_series(&catalog, &trips, &config).unwrap();
    trips.reverse();
    trips.swap(0, 3);
    let shuffled = build_series(&catalog, &trips, &config).unwrap();

    assert_eq!(forward.records, shuffled.records);
}

#[test]
fn test_export_is_byte_identical_across_runs() {
    let dir = std::env::temp_dir();
    let first = format!("{}/station_occupancy_it_first.csv", dir.display());
    let second = format!("{}/station_occupancy_it_second.csv", dir.display());

    let report = fixture_report(AggregationStrategy::CumulativeNet);
    write_series(&first, &report.records, false).unwrap();
    let report = fixture_report(AggregationStrategy::CumulativeNet);
    write_series(&second, &report.records, false).unwrap();

    let a = std::fs::read(&first).unwrap();
    let b = std::fs::read(&second).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);

    std::fs::remove_file(&first).unwrap();
    std::fs::remove_file(&second).unwrap();
}

#[test]
fn test_run_stats_summary() {
    let stats = RunStats::from_report(&fixture_report(AggregationStrategy::CumulativeNet));

    assert_eq!(stats.stations, 4);
    assert_eq!(stats.buckets, 5);
    assert_eq!(stats.records, 20);
    assert_eq!(stats.excluded_trips, 1);
    assert_eq!(stats.drifted_records, 0);
}
