//! Common test fixtures for climate aggregation tests.
//!
//! Fixture writers produce small files shaped like real inputs: ERA5 NetCDF
//! grids (one file per month or per group of months) and GeoJSON boundary
//! and settlement collections.

use std::path::Path;

use chrono::NaiveDate;
use serde_json::{json, Value};

/// Reference epoch used by classic ERA5 NetCDF exports.
pub const ERA5_TIME_UNITS: &str = "hours since 1900-01-01 00:00:00.0";

/// File name following the `era5_{category}_{year}_{part}.nc` convention.
pub fn era5_file_name(category: &str, year: i32, part: &str) -> String {
    format!("era5_{}_{}_{}.nc", category, year, part)
}

/// Hours since 1900-01-01 for the given day and hour.
pub fn era5_hours(year: i32, month: u32, day: u32, hour: u32) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid epoch");
    let instant = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid fixture date");
    (instant - epoch).num_hours() as f64
}

/// An ERA5-like NetCDF file under construction.
#[derive(Debug, Clone)]
pub struct Era5Fixture {
    pub variable: String,
    pub time_name: String,
    pub time_units: String,
    pub times: Vec<f64>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    /// Values in `(time, latitude, longitude)` order
    pub values: Vec<f64>,
    /// Adds a leading `number` dimension when > 0. Member `m` stores
    /// `value + 1000 * m` so tests can check that member 0 is selected.
    pub ensemble_members: usize,
    pub missing_value: Option<f64>,
    /// Store a single instant as a dimensionless time coordinate.
    pub scalar_time: bool,
}

impl Era5Fixture {
    /// One instant per listed month (the 1st at 00:00), values from `value(month, row, col)`.
    pub fn monthly<F>(
        variable: &str,
        year: i32,
        months: &[u32],
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        value: F,
    ) -> Self
    where
        F: Fn(u32, usize, usize) -> f64,
    {
        let times = months.iter().map(|&m| era5_hours(year, m, 1, 0)).collect();
        let mut values = Vec::with_capacity(months.len() * latitudes.len() * longitudes.len());
        for &m in months {
            for row in 0..latitudes.len() {
                for col in 0..longitudes.len() {
                    values.push(value(m, row, col));
                }
            }
        }

        Self {
            variable: variable.to_string(),
            time_name: "valid_time".to_string(),
            time_units: ERA5_TIME_UNITS.to_string(),
            times,
            latitudes,
            longitudes,
            values,
            ensemble_members: 0,
            missing_value: None,
            scalar_time: false,
        }
    }

    /// Explicit instants (hours since 1900) with values from `value(instant_index, row, col)`.
    pub fn with_instants<F>(
        variable: &str,
        times: Vec<f64>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        value: F,
    ) -> Self
    where
        F: Fn(usize, usize, usize) -> f64,
    {
        let mut values = Vec::with_capacity(times.len() * latitudes.len() * longitudes.len());
        for t in 0..times.len() {
            for row in 0..latitudes.len() {
                for col in 0..longitudes.len() {
                    values.push(value(t, row, col));
                }
            }
        }

        Self {
            variable: variable.to_string(),
            time_name: "valid_time".to_string(),
            time_units: ERA5_TIME_UNITS.to_string(),
            times,
            latitudes,
            longitudes,
            values,
            ensemble_members: 0,
            missing_value: None,
            scalar_time: false,
        }
    }

    pub fn time_name(mut self, name: &str) -> Self {
        self.time_name = name.to_string();
        self
    }

    pub fn ensemble_members(mut self, members: usize) -> Self {
        self.ensemble_members = members;
        self
    }

    /// Drop the time dimension; the fixture must hold exactly one instant.
    pub fn scalar_time(mut self) -> Self {
        assert_eq!(self.times.len(), 1, "scalar time needs exactly one instant");
        self.scalar_time = true;
        self
    }

    /// Store NaN cells as this marker and declare it as `missing_value`.
    pub fn missing_value(mut self, marker: f64) -> Self {
        self.missing_value = Some(marker);
        self
    }

    /// Write the fixture as a NetCDF-4 file.
    pub fn write(&self, path: &Path) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;

        let time = self.time_name.as_str();
        let time_dims: Vec<&str> = if self.scalar_time { Vec::new() } else { vec![time] };
        if !self.scalar_time {
            file.add_dimension(time, self.times.len())?;
        }
        file.add_dimension("latitude", self.latitudes.len())?;
        file.add_dimension("longitude", self.longitudes.len())?;
        if self.ensemble_members > 0 {
            file.add_dimension("number", self.ensemble_members)?;
        }

        {
            let mut var = file.add_variable::<f64>(time, &time_dims)?;
            var.put_attribute("units", self.time_units.as_str())?;
            var.put_attribute("calendar", "proleptic_gregorian")?;
            var.put_values(&self.times, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>("latitude", &["latitude"])?;
            var.put_attribute("units", "degrees_north")?;
            var.put_values(&self.latitudes, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>("longitude", &["longitude"])?;
            var.put_attribute("units", "degrees_east")?;
            var.put_values(&self.longitudes, ..)?;
        }

        let stored: Vec<f64> = self
            .values
            .iter()
            .map(|&v| match self.missing_value {
                Some(marker) if v.is_nan() => marker,
                _ => v,
            })
            .collect();

        let mut grid_dims = time_dims.clone();
        grid_dims.extend(["latitude", "longitude"]);

        let (dims, data): (Vec<&str>, Vec<f64>) = if self.ensemble_members > 0 {
            let mut data = Vec::with_capacity(stored.len() * self.ensemble_members);
            for member in 0..self.ensemble_members {
                data.extend(stored.iter().map(|&v| {
                    if Some(v) == self.missing_value || v.is_nan() {
                        v
                    } else {
                        v + 1000.0 * member as f64
                    }
                }));
            }
            let mut dims = vec!["number"];
            dims.extend(grid_dims);
            (dims, data)
        } else {
            (grid_dims, stored)
        };

        let mut var = file.add_variable::<f64>(&self.variable, &dims)?;
        if let Some(marker) = self.missing_value {
            var.put_attribute("missing_value", marker)?;
        }
        var.put_values(&data, ..)?;

        Ok(())
    }
}

/// A rectangular polygon feature with `id` and `name` properties.
pub fn square_region(id: &str, name: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": { "id": id, "name": name },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
                [min_x, min_y]
            ]]
        }
    })
}

/// A point feature with arbitrary properties.
pub fn point_feature(properties: Value, lon: f64, lat: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": properties,
        "geometry": { "type": "Point", "coordinates": [lon, lat] }
    })
}

/// A FeatureCollection, optionally with a legacy named `crs` member.
pub fn feature_collection(features: Vec<Value>, crs: Option<&str>) -> Value {
    let mut collection = json!({ "type": "FeatureCollection", "features": features });
    if let Some(name) = crs {
        collection["crs"] = json!({ "type": "name", "properties": { "name": name } });
    }
    collection
}

/// Write a JSON value to disk.
pub fn write_json(path: &Path, value: &Value) -> std::io::Result<()> {
    std::fs::write(path, serde_json::to_vec_pretty(value)?)
}

/// Fresh scratch directory removed on drop.
pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create scratch directory")
}
