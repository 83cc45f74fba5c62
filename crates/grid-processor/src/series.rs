//! Continuous time series assembled from several input files.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDateTime};
use climate_common::{Axis, GridAxes};
use netcdf_parser::GridFile;
use tracing::debug;

use crate::error::{GridProcessorError, Result};

/// Axis values closer than this are considered the same coordinate.
const AXIS_TOLERANCE: f64 = 1e-9;

/// A `(time, latitude, longitude)` grid covering one year, instants ascending.
#[derive(Debug, Clone)]
pub struct GriddedTimeSeries {
    /// Data variable name resolved in the first file
    pub variable: String,
    /// Axes shared by every input file
    pub axes: GridAxes,
    /// Instants in ascending order
    pub times: Vec<NaiveDateTime>,
    /// Values in `(time, latitude, longitude)` row-major order, NaN = no-data
    pub values: Vec<f64>,
    /// Files the series was assembled from, in load order
    pub sources: Vec<PathBuf>,
}

impl GriddedTimeSeries {
    /// Concatenate files along time.
    ///
    /// Fails when a file's axes differ from the first file's, when an
    /// instant falls outside `year`, or when an instant is repeated.
    pub fn concat(files: Vec<GridFile>, year: i32) -> Result<Self> {
        let Some(first) = files.first() else {
            return Err(GridProcessorError::missing_input(format!(
                "grid files for {}",
                year
            )));
        };

        let axes = first.axes.clone();
        let variable = first.variable.clone();
        let reference = first.path.clone();

        for file in &files[1..] {
            if !axis_matches(&file.axes.latitude, &axes.latitude) {
                return Err(GridProcessorError::AxisMismatch {
                    axis: "latitude",
                    path: file.path.clone(),
                    reference: reference.clone(),
                });
            }
            if !axis_matches(&file.axes.longitude, &axes.longitude) {
                return Err(GridProcessorError::AxisMismatch {
                    axis: "longitude",
                    path: file.path.clone(),
                    reference: reference.clone(),
                });
            }
            if file.variable != variable {
                debug!(
                    file = %file.path.display(),
                    variable = %file.variable,
                    "Variable name differs from first file"
                );
            }
        }

        // (instant, file, index within file)
        let mut entries = Vec::new();
        for (f, file) in files.iter().enumerate() {
            for (t, instant) in file.times.iter().enumerate() {
                if instant.year() != year {
                    return Err(GridProcessorError::InstantOutsideYear {
                        instant: *instant,
                        year,
                        path: file.path.clone(),
                    });
                }
                entries.push((*instant, f, t));
            }
        }
        entries.sort_by_key(|(instant, f, t)| (*instant, *f, *t));

        for pair in entries.windows(2) {
            let ((a, fa, _), (b, fb, _)) = (pair[0], pair[1]);
            if a == b {
                return Err(GridProcessorError::DuplicateInstant {
                    instant: a,
                    first: files[fa].path.clone(),
                    second: files[fb].path.clone(),
                });
            }
        }

        let mut values = Vec::with_capacity(entries.len() * axes.len());
        for (_, f, t) in &entries {
            values.extend_from_slice(files[*f].slice(*t));
        }

        Ok(Self {
            variable,
            axes,
            times: entries.iter().map(|(instant, _, _)| *instant).collect(),
            values,
            sources: files.into_iter().map(|file| file.path).collect(),
        })
    }

    /// Values of one instant, row-major over `(latitude, longitude)`.
    pub fn slice(&self, t: usize) -> &[f64] {
        let n = self.axes.len();
        &self.values[t * n..(t + 1) * n]
    }

    /// Rotate a 0..360 longitude axis into -180..180, reordering every slice.
    ///
    /// Returns false when the axis is already within -180..180.
    pub fn normalize_longitudes(&mut self) -> bool {
        match self.axes.longitude.max() {
            Some(max) if max > 180.0 => {}
            _ => return false,
        }

        let wrapped: Vec<f64> = self
            .axes
            .longitude
            .values()
            .iter()
            .map(|&lon| if lon > 180.0 { lon - 360.0 } else { lon })
            .collect();

        let mut order: Vec<usize> = (0..wrapped.len()).collect();
        order.sort_by(|&a, &b| wrapped[a].total_cmp(&wrapped[b]));

        let nx = self.axes.nx();
        let mut values = Vec::with_capacity(self.values.len());
        for row in self.values.chunks(nx) {
            values.extend(order.iter().map(|&i| row[i]));
        }

        self.axes.longitude = Axis::new(order.iter().map(|&i| wrapped[i]).collect());
        self.values = values;
        true
    }
}

fn axis_matches(a: &Axis, b: &Axis) -> bool {
    a.len() == b.len()
        && a
            .values()
            .iter()
            .zip(b.values())
            .all(|(x, y)| (x - y).abs() <= AXIS_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn instant(year: i32, month: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn grid_file(name: &str, months: &[u32], lons: Vec<f64>, fill: f64) -> GridFile {
        let axes = GridAxes::new(Axis::new(vec![1.0, 0.0]), Axis::new(lons));
        let values = vec![fill; months.len() * axes.len()];
        GridFile {
            path: PathBuf::from(name),
            variable: "tp".to_string(),
            time_coordinate: "valid_time".to_string(),
            times: months.iter().map(|&m| instant(2024, m)).collect(),
            axes,
            values,
        }
    }

    #[test]
    fn test_concat_sorts_instants() {
        let series = GriddedTimeSeries::concat(
            vec![
                grid_file("b.nc", &[4, 5, 6], vec![0.0, 1.0], 2.0),
                grid_file("a.nc", &[1, 2, 3], vec![0.0, 1.0], 1.0),
            ],
            2024,
        )
        .unwrap();

        assert_eq!(series.times.len(), 6);
        assert_eq!(series.times[0], instant(2024, 1));
        assert_eq!(series.slice(0), &[1.0; 4]);
        assert_eq!(series.slice(5), &[2.0; 4]);
        assert_eq!(series.sources, vec![PathBuf::from("b.nc"), PathBuf::from("a.nc")]);
    }

    #[test]
    fn test_concat_rejects_axis_mismatch() {
        let err = GriddedTimeSeries::concat(
            vec![
                grid_file("a.nc", &[1], vec![0.0, 1.0], 1.0),
                grid_file("b.nc", &[2], vec![0.0, 0.5], 1.0),
            ],
            2024,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GridProcessorError::AxisMismatch { axis: "longitude", .. }
        ));
    }

    #[test]
    fn test_concat_rejects_duplicate_instant() {
        let err = GriddedTimeSeries::concat(
            vec![
                grid_file("a.nc", &[1, 2], vec![0.0, 1.0], 1.0),
                grid_file("b.nc", &[2, 3], vec![0.0, 1.0], 1.0),
            ],
            2024,
        )
        .unwrap_err();
        match err {
            GridProcessorError::DuplicateInstant { first, second, .. } => {
                assert_eq!(first, PathBuf::from("a.nc"));
                assert_eq!(second, PathBuf::from("b.nc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_concat_rejects_other_year() {
        let err =
            GriddedTimeSeries::concat(vec![grid_file("a.nc", &[1], vec![0.0], 1.0)], 2023)
                .unwrap_err();
        assert!(matches!(
            err,
            GridProcessorError::InstantOutsideYear { year: 2023, .. }
        ));
    }

    #[test]
    fn test_normalize_longitudes() {
        let mut file = grid_file("a.nc", &[1], vec![0.0, 90.0, 180.0, 270.0], 0.0);
        // Row-major: value = 10 * row + column
        file.values = vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0];
        let mut series = GriddedTimeSeries::concat(vec![file], 2024).unwrap();

        assert!(series.normalize_longitudes());
        assert_eq!(series.axes.longitude.values(), &[-90.0, 0.0, 90.0, 180.0]);
        assert_eq!(series.slice(0), &[3.0, 0.0, 1.0, 2.0, 13.0, 10.0, 11.0, 12.0]);

        assert!(!series.normalize_longitudes());
    }
}
