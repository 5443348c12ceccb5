//! Integration tests for cornbelt-store
//!
//! Record files are written with the same writer the collector uses, then
//! loaded from a temporary directory into a file-backed database.

use std::path::Path;

use cornbelt_core::mock::sample_batch;
use cornbelt_core::persist::{self, FileKind};
use cornbelt_store::{Loader, Report, Store};
use cornbelt_types::{DataType, LocationRegistry};
use time::macros::date;

fn write_files(dir: &Path) {
    let end = date!(2024 - 03 - 31);
    for location in ["iowa_center", "illinois_center"] {
        let historical = sample_batch(location, date!(2024 - 03 - 01), 31);
        assert!(persist::write(
            &historical,
            &dir.join(persist::historical_file_name(location, end))
        ));

        let forecast = sample_batch(location, date!(2024 - 04 - 01), 7);
        let run_date = date!(2024 - 04 - 01);
        assert!(persist::write(
            &forecast,
            &dir.join(persist::dated_file_name(FileKind::Forecast, location, run_date))
        ));

        // combined files overlap both and must be ignored by the loader
        let combined = cornbelt_core::merge::merge(&historical, &forecast).unwrap();
        assert!(persist::write(
            &combined,
            &dir.join(persist::dated_file_name(FileKind::Combined, location, run_date))
        ));
    }
}

#[test]
fn test_full_load_run() {
    let data = tempfile::tempdir().unwrap();
    write_files(data.path());

    let db = tempfile::tempdir().unwrap();
    let store = Store::open(db.path().join("weather.db")).unwrap();
    let registry = LocationRegistry::default();

    let summary = Loader::new(&store, &registry).run(data.path()).unwrap();

    assert_eq!(summary.locations_inserted, 2);
    assert_eq!(summary.files.len(), 4);
    assert_eq!(summary.files[0].data_type, DataType::Historical);
    assert_eq!(summary.files[3].data_type, DataType::Forecast);
    assert_eq!(summary.inserted(), 2 * (31 + 7));

    let v = &summary.verification;
    assert_eq!(v.locations, 2);
    assert_eq!(v.historical, 62);
    assert_eq!(v.forecast, 14);
    assert_eq!(v.total, 76);
    assert_eq!(v.per_location.len(), 2);
    assert_eq!(v.per_location[0].first_date.as_deref(), Some("2024-03-01"));
    assert_eq!(v.per_location[0].last_date.as_deref(), Some("2024-04-07"));

    assert!(store.foreign_keys_enabled().unwrap());
}

#[test]
fn test_rerun_is_noop() {
    let data = tempfile::tempdir().unwrap();
    write_files(data.path());

    let store = Store::open_in_memory().unwrap();
    let registry = LocationRegistry::default();
    let loader = Loader::new(&store, &registry);

    let first = loader.run(data.path()).unwrap();
    let second = loader.run(data.path()).unwrap();

    assert_eq!(first.inserted(), 76);
    assert_eq!(second.locations_inserted, 0);
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.verification.total, 76);
}

#[test]
fn test_registry_subset_skips_other_locations() {
    let data = tempfile::tempdir().unwrap();
    write_files(data.path());

    let store = Store::open_in_memory().unwrap();
    let registry = LocationRegistry::new(vec![
        cornbelt_types::Location::new("iowa_center", 41.6005, -93.6091).unwrap(),
    ])
    .unwrap();

    let summary = Loader::new(&store, &registry).run(data.path()).unwrap();
    assert_eq!(summary.verification.locations, 1);
    assert_eq!(summary.verification.total, 38);
}

#[test]
fn test_corrupt_file_does_not_stop_load() {
    let data = tempfile::tempdir().unwrap();
    write_files(data.path());
    std::fs::write(
        data.path().join("historical_broken_2024-03-31.json"),
        "this is not json\n",
    )
    .unwrap();

    let store = Store::open_in_memory().unwrap();
    let registry = LocationRegistry::default();
    let summary = Loader::new(&store, &registry).run(data.path()).unwrap();

    assert_eq!(summary.files.len(), 5);
    assert_eq!(summary.verification.total, 76);
}

#[test]
fn test_report_after_load() {
    let data = tempfile::tempdir().unwrap();
    write_files(data.path());

    let store = Store::open_in_memory().unwrap();
    let registry = LocationRegistry::default();
    Loader::new(&store, &registry).run(data.path()).unwrap();

    let report = Report::generate(&store, 2024);
    assert_eq!(report.failed_sections(), 0);

    let monthly = report.monthly_precipitation.unwrap();
    assert_eq!(monthly.len(), 2);
    assert!(monthly.iter().all(|m| m.month == 3 && m.days == 31));

    let recent = report.recent_vs_forecast.unwrap();
    assert_eq!(recent.len(), 4);
    assert!(
        recent
            .iter()
            .filter(|r| r.data_type == "forecast")
            .all(|r| r.days == 7)
    );

    let summary = report.summary.unwrap();
    assert_eq!(summary.total_records, 76);
    assert_eq!(summary.last_date.as_deref(), Some("2024-03-31"));
}
