//! Integration tests loading ERA5-like NetCDF files written by `test-utils`.

use std::path::Path;

use climate_common::VariableSpec;
use grid_processor::{reduce_monthly, GridLoader, GridProcessorError, LoaderConfig};
use netcdf_parser::NetCdfError;
use test_utils::{assert_approx_eq, era5_file_name, scratch_dir, Era5Fixture};

fn latitudes() -> Vec<f64> {
    vec![36.0, 35.75, 35.5]
}

fn longitudes() -> Vec<f64> {
    vec![-7.0, -6.75]
}

fn loader(dir: &Path) -> GridLoader {
    GridLoader::new(LoaderConfig {
        data_dir: dir.to_path_buf(),
        ..Default::default()
    })
}

/// Precipitation in meters: month m, cell (row, col) -> m mm + row/col offset.
fn precip_meters(month: u32, row: usize, col: usize) -> f64 {
    (month as f64 + row as f64 * 0.1 + col as f64 * 0.01) / 1000.0
}

fn write_quarters(dir: &Path) {
    for (quarter, months) in [[1u32, 2, 3], [4, 5, 6], [7, 8, 9], [10, 11, 12]].iter().enumerate() {
        let path = dir.join(era5_file_name("precipitation", 2024, &format!("q{}", quarter + 1)));
        Era5Fixture::monthly("tp", 2024, months, latitudes(), longitudes(), precip_meters)
            .write(&path)
            .expect("Failed to write fixture");
    }
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_four_quarter_files_make_twelve_months() {
    let dir = scratch_dir();
    write_quarters(dir.path());

    let spec = VariableSpec::precipitation();
    let series = loader(dir.path()).load(&spec, 2024).unwrap();

    assert_eq!(series.sources.len(), 4);
    assert_eq!(series.times.len(), 12);
    assert!(series.times.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(series.variable, "tp");

    let monthly = reduce_monthly(&series, &spec);
    for month in 1..=12u32 {
        assert_eq!(monthly.instant_count(month), 1, "month {}", month);
        assert_approx_eq!(monthly.value(month, 0, 0).unwrap(), month as f64, 1e-9);
        assert_approx_eq!(
            monthly.value(month, 1, 2).unwrap(),
            month as f64 + 0.21,
            1e-9
        );
    }
}

#[test]
fn test_precipitation_is_non_negative() {
    let dir = scratch_dir();
    write_quarters(dir.path());

    let spec = VariableSpec::precipitation();
    let series = loader(dir.path()).load(&spec, 2024).unwrap();
    let monthly = reduce_monthly(&series, &spec);

    for (_, values) in monthly.iter() {
        assert!(values.iter().filter(|v| !v.is_nan()).all(|v| *v >= 0.0));
    }
}

#[test]
fn test_other_variables_and_years_are_ignored() {
    let dir = scratch_dir();
    write_quarters(dir.path());
    Era5Fixture::monthly("t2m", 2024, &[1], latitudes(), longitudes(), |_, _, _| 280.0)
        .write(&dir.path().join(era5_file_name("temperature", 2024, "01")))
        .unwrap();
    Era5Fixture::monthly("tp", 2023, &[1], latitudes(), longitudes(), |_, _, _| 0.0)
        .write(&dir.path().join(era5_file_name("precipitation", 2023, "01")))
        .unwrap();

    let files = loader(dir.path())
        .discover(&VariableSpec::precipitation(), 2024)
        .unwrap();
    assert_eq!(files.len(), 4);
}

#[test]
fn test_legacy_time_name_and_ensemble_dimension() {
    let dir = scratch_dir();
    Era5Fixture::monthly("t2m", 2024, &[1, 2], latitudes(), longitudes(), |m, _, _| {
        270.0 + m as f64
    })
    .time_name("time")
    .ensemble_members(3)
    .write(&dir.path().join(era5_file_name("temperature", 2024, "a")))
    .unwrap();

    let spec = VariableSpec::temperature();
    let series = loader(dir.path()).load(&spec, 2024).unwrap();
    let monthly = reduce_monthly(&series, &spec);

    // Member 0 carries the unshifted values.
    assert_approx_eq!(monthly.value(1, 0, 0).unwrap(), 271.0 - 273.15, 1e-9);
    assert_approx_eq!(monthly.value(2, 1, 1).unwrap(), 272.0 - 273.15, 1e-9);
    assert!(monthly.month(3).unwrap().iter().all(|v| v.is_nan()));
}

#[test]
fn test_missing_value_marker_becomes_missing() {
    let dir = scratch_dir();
    Era5Fixture::monthly("tp", 2024, &[1], latitudes(), longitudes(), |_, row, col| {
        if row == 0 && col == 0 {
            f64::NAN
        } else {
            0.002
        }
    })
    .missing_value(-32767.0)
    .write(&dir.path().join(era5_file_name("precipitation", 2024, "01")))
    .unwrap();

    let spec = VariableSpec::precipitation();
    let series = loader(dir.path()).load(&spec, 2024).unwrap();
    let monthly = reduce_monthly(&series, &spec);

    assert!(monthly.value(1, 0, 0).unwrap().is_nan());
    assert_approx_eq!(monthly.value(1, 1, 0).unwrap(), 2.0, 1e-9);
}

#[test]
fn test_longitudes_rotated_to_signed_range() {
    let dir = scratch_dir();
    Era5Fixture::monthly(
        "tp",
        2024,
        &[1],
        vec![0.0],
        vec![0.0, 90.0, 180.0, 270.0],
        |_, _, col| col as f64 / 1000.0,
    )
    .write(&dir.path().join(era5_file_name("precipitation", 2024, "01")))
    .unwrap();

    let spec = VariableSpec::precipitation();
    let series = loader(dir.path()).load(&spec, 2024).unwrap();

    assert_eq!(series.axes.longitude.values(), &[-90.0, 0.0, 90.0, 180.0]);
    let monthly = reduce_monthly(&series, &spec);
    assert_approx_eq!(monthly.value(1, 0, 0).unwrap(), 3.0, 1e-9);
    assert_approx_eq!(monthly.value(1, 1, 0).unwrap(), 0.0, 1e-9);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_no_matching_files_is_fatal() {
    let dir = scratch_dir();
    let err = loader(dir.path())
        .load(&VariableSpec::precipitation(), 2024)
        .unwrap_err();

    match err {
        GridProcessorError::MissingInput { pattern } => {
            assert!(pattern.ends_with("era5_precipitation_2024_*.nc"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unrecognized_variable_lists_available_names() {
    let dir = scratch_dir();
    Era5Fixture::monthly("rain", 2024, &[1], latitudes(), longitudes(), |_, _, _| 0.0)
        .write(&dir.path().join(era5_file_name("precipitation", 2024, "01")))
        .unwrap();

    let err = loader(dir.path())
        .load(&VariableSpec::precipitation(), 2024)
        .unwrap_err();

    match err {
        GridProcessorError::Schema(NetCdfError::UnrecognizedVariable { available, .. }) => {
            assert_eq!(available, vec!["rain".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unrecognized_time_coordinate() {
    let dir = scratch_dir();
    Era5Fixture::monthly("tp", 2024, &[1], latitudes(), longitudes(), |_, _, _| 0.0)
        .time_name("date")
        .write(&dir.path().join(era5_file_name("precipitation", 2024, "01")))
        .unwrap();

    let err = loader(dir.path())
        .load(&VariableSpec::precipitation(), 2024)
        .unwrap_err();

    assert!(matches!(
        err,
        GridProcessorError::Schema(NetCdfError::UnrecognizedTimeCoordinate { .. })
    ));
}

#[test]
fn test_axis_mismatch_between_files() {
    let dir = scratch_dir();
    Era5Fixture::monthly("tp", 2024, &[1], latitudes(), longitudes(), |_, _, _| 0.0)
        .write(&dir.path().join(era5_file_name("precipitation", 2024, "01")))
        .unwrap();
    Era5Fixture::monthly("tp", 2024, &[2], vec![36.0, 35.5, 35.0], longitudes(), |_, _, _| 0.0)
        .write(&dir.path().join(era5_file_name("precipitation", 2024, "02")))
        .unwrap();

    let err = loader(dir.path())
        .load(&VariableSpec::precipitation(), 2024)
        .unwrap_err();

    assert!(matches!(
        err,
        GridProcessorError::AxisMismatch { axis: "latitude", .. }
    ));
}
