//! Native NetCDF reading using the netcdf library.
//!
//! Every file is opened independently and normalized into a dense
//! `(time, latitude, longitude)` array of `f64`, with no-data cells as NaN.
//! Ensemble/experiment dimensions are collapsed to their first index and
//! length-1 dimensions are dropped, whatever their position in the variable.

use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::NaiveDateTime;
use climate_common::{Axis, Calendar, CfTimeUnits, GridAxes, VariableSpec};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::schema::{resolve_alias, SchemaAliases};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// It only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// One input file after schema normalization.
#[derive(Debug, Clone)]
pub struct GridFile {
    /// Source path
    pub path: PathBuf,
    /// Data variable name that matched a candidate
    pub variable: String,
    /// Temporal coordinate name as stored in the file
    pub time_coordinate: String,
    /// Decoded time instants, in file order
    pub times: Vec<NaiveDateTime>,
    /// Latitude/longitude axes
    pub axes: GridAxes,
    /// Values in `(time, latitude, longitude)` row-major order, NaN = no-data
    pub values: Vec<f64>,
}

impl GridFile {
    /// Values of one time slice, row-major over `(latitude, longitude)`.
    pub fn slice(&self, t: usize) -> &[f64] {
        let n = self.axes.len();
        &self.values[t * n..(t + 1) * n]
    }
}

/// Role of one dimension of the data variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DimRole {
    Time,
    Latitude,
    Longitude,
    /// Collapsed to index 0
    Fixed,
}

/// Open one file and normalize it to a [`GridFile`].
pub fn read_grid_file(
    path: &Path,
    spec: &VariableSpec,
    aliases: &SchemaAliases,
) -> NetCdfResult<GridFile> {
    silence_hdf5_errors();

    let nc_file = netcdf::open(path).map_err(|e| NetCdfError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let all_variables: Vec<String> = nc_file.variables().map(|v| v.name()).collect();
    let dimension_names: Vec<String> = nc_file.dimensions().map(|d| d.name()).collect();

    // Coordinate variables share their dimension's name; everything else is data.
    let data_variables: Vec<String> = all_variables
        .iter()
        .filter(|name| !dimension_names.contains(name))
        .cloned()
        .collect();

    let variable = resolve_alias(&spec.candidates, &data_variables)
        .ok_or_else(|| NetCdfError::UnrecognizedVariable {
            path: path.to_path_buf(),
            candidates: spec.candidates.clone(),
            available: data_variables.clone(),
        })?
        .to_string();

    let time_name = resolve_alias(&aliases.time, &all_variables)
        .ok_or_else(|| NetCdfError::UnrecognizedTimeCoordinate {
            path: path.to_path_buf(),
            candidates: aliases.time.clone(),
            available: all_variables.clone(),
        })?
        .to_string();

    let lat_name = resolve_alias(&aliases.latitude, &all_variables)
        .ok_or_else(|| NetCdfError::UnrecognizedAxis {
            axis: "latitude",
            path: path.to_path_buf(),
            candidates: aliases.latitude.clone(),
            available: all_variables.clone(),
        })?
        .to_string();

    let lon_name = resolve_alias(&aliases.longitude, &all_variables)
        .ok_or_else(|| NetCdfError::UnrecognizedAxis {
            axis: "longitude",
            path: path.to_path_buf(),
            candidates: aliases.longitude.clone(),
            available: all_variables.clone(),
        })?
        .to_string();

    info!(
        file = %path.display(),
        variable = %variable,
        time_coordinate = %time_name,
        "Resolved NetCDF schema"
    );

    let times = read_times(&nc_file, path, &time_name)?;
    let latitude = Axis::new(read_f64_values(&nc_file, &lat_name)?);
    let longitude = Axis::new(read_f64_values(&nc_file, &lon_name)?);

    let data_var = nc_file
        .variable(&variable)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", variable)))?;

    // Classify every dimension of the data variable.
    let mut roles = Vec::new();
    let mut lens = Vec::new();
    for dim in data_var.dimensions() {
        let name = dim.name();
        let len = dim.len();
        let role = if name == time_name {
            DimRole::Time
        } else if name == lat_name {
            DimRole::Latitude
        } else if name == lon_name {
            DimRole::Longitude
        } else if aliases.collapse.contains(&name) || len == 1 {
            debug!(file = %path.display(), dimension = %name, len, "Collapsing dimension to first index");
            DimRole::Fixed
        } else {
            return Err(NetCdfError::UnexpectedDimension {
                path: path.to_path_buf(),
                variable: variable.clone(),
                dimension: name,
                len,
            });
        };
        roles.push(role);
        lens.push(len);
    }

    // A scalar time coordinate stamps the whole file as one instant.
    let scalar_time = !roles.contains(&DimRole::Time) && times.len() == 1;
    if scalar_time {
        debug!(file = %path.display(), time_coordinate = %time_name, "Scalar time coordinate, reading one instant");
    }

    for (role, what) in [
        (DimRole::Time, "time"),
        (DimRole::Latitude, "latitude"),
        (DimRole::Longitude, "longitude"),
    ] {
        if !roles.contains(&role) && !(role == DimRole::Time && scalar_time) {
            return Err(NetCdfError::MissingData(format!(
                "{} dimension on variable '{}' in {}",
                what,
                variable,
                path.display()
            )));
        }
    }

    let strides = row_major_strides(&lens);
    let stride_of = |role: DimRole| -> usize {
        roles
            .iter()
            .position(|r| *r == role)
            .map(|pos| strides[pos])
            .unwrap_or(0)
    };
    let (t_stride, lat_stride, lon_stride) = (
        stride_of(DimRole::Time),
        stride_of(DimRole::Latitude),
        stride_of(DimRole::Longitude),
    );

    let nt = times.len();
    let (ny, nx) = (latitude.len(), longitude.len());
    let expected = [(DimRole::Time, nt), (DimRole::Latitude, ny), (DimRole::Longitude, nx)];
    for (role, len) in expected {
        if let Some(pos) = roles.iter().position(|r| *r == role) {
            if lens[pos] != len {
                return Err(NetCdfError::InvalidFormat(format!(
                    "dimension length {} of '{}' does not match its coordinate length {} in {}",
                    lens[pos],
                    variable,
                    len,
                    path.display()
                )));
            }
        }
    }

    let raw: Vec<f64> = data_var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", variable, e)))?;

    let packing = Packing::from_variable(&data_var);

    let mut values = Vec::with_capacity(nt * ny * nx);
    for t in 0..nt {
        for j in 0..ny {
            for i in 0..nx {
                let offset = t * t_stride + j * lat_stride + i * lon_stride;
                values.push(packing.unpack(raw[offset]));
            }
        }
    }

    info!(
        file = %path.display(),
        instants = nt,
        latitudes = ny,
        longitudes = nx,
        "Loaded NetCDF grid"
    );

    Ok(GridFile {
        path: path.to_path_buf(),
        variable,
        time_coordinate: time_name,
        times,
        axes: GridAxes::new(latitude, longitude),
        values,
    })
}

/// Scale/offset packing and no-data markers of a data variable.
#[derive(Debug, Clone, Copy)]
struct Packing {
    scale_factor: f64,
    add_offset: f64,
    fill_value: Option<f64>,
    missing_value: Option<f64>,
}

impl Packing {
    fn from_variable(var: &netcdf::Variable) -> Self {
        Self {
            scale_factor: get_f64_attr(var, "scale_factor").unwrap_or(1.0),
            add_offset: get_f64_attr(var, "add_offset").unwrap_or(0.0),
            fill_value: get_f64_attr(var, "_FillValue"),
            missing_value: get_f64_attr(var, "missing_value"),
        }
    }

    /// Markers are compared against the raw stored value, before unpacking.
    fn unpack(&self, raw: f64) -> f64 {
        if raw.is_nan() || Some(raw) == self.fill_value || Some(raw) == self.missing_value {
            f64::NAN
        } else {
            raw * self.scale_factor + self.add_offset
        }
    }
}

fn read_times(
    nc_file: &netcdf::File,
    path: &Path,
    time_name: &str,
) -> NetCdfResult<Vec<NaiveDateTime>> {
    let time_var = nc_file
        .variable(time_name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", time_name)))?;

    let units = get_string_attr(&time_var, "units").ok_or_else(|| {
        NetCdfError::MissingData(format!("units attribute on '{}' in {}", time_name, path.display()))
    })?;
    let time_err = |source| NetCdfError::Time {
        path: path.to_path_buf(),
        source,
    };

    Calendar::parse(get_string_attr(&time_var, "calendar").as_deref()).map_err(time_err)?;
    let units = CfTimeUnits::parse(&units).map_err(time_err)?;

    let raw: Vec<f64> = time_var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", time_name, e)))?;

    raw.into_iter()
        .map(|v| units.decode(v).map_err(time_err))
        .collect()
}

fn read_f64_values(nc_file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = nc_file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", name)))?;
    var.get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))
}

/// Row-major strides for a shape.
fn row_major_strides(lens: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; lens.len()];
    for k in (0..lens.len().saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * lens[k + 1];
    }
    strides
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get string attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        netcdf::AttributeValue::Strs(mut v) if !v.is_empty() => Some(v.swap_remove(0)),
        _ => None,
    }
}
