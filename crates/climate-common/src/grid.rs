//! Coordinate axes of regular latitude/longitude grids.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// A one-dimensional coordinate axis (cell centers, degrees).
///
/// Values are kept in storage order, which may be ascending or descending
/// (reanalysis products usually store latitude north to south).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    values: Vec<f64>,
}

impl Axis {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Smallest coordinate on the axis.
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// Largest coordinate on the axis.
    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Absolute spacing between the first two cells (0 for single-cell axes).
    pub fn spacing(&self) -> f64 {
        match self.values.as_slice() {
            [a, b, ..] => (b - a).abs(),
            _ => 0.0,
        }
    }

    /// Index of the cell whose center is closest to `coord`.
    ///
    /// Ties resolve to the cell with the lower coordinate value, independent
    /// of storage order.
    pub fn nearest_index(&self, coord: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, &value) in self.values.iter().enumerate() {
            let distance = (value - coord).abs();
            best = match best {
                None => Some((idx, distance)),
                Some((best_idx, best_distance)) => {
                    let closer = distance < best_distance;
                    let tie_lower =
                        distance == best_distance && value < self.values[best_idx];
                    if closer || tie_lower {
                        Some((idx, distance))
                    } else {
                        Some((best_idx, best_distance))
                    }
                }
            };
        }
        best.map(|(idx, _)| idx)
    }

    /// Indices of the cells whose centers lie in `[lo, hi]`, in storage order.
    pub fn indices_within(&self, lo: f64, hi: f64) -> impl Iterator<Item = usize> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(move |(_, v)| **v >= lo && **v <= hi)
            .map(|(idx, _)| idx)
    }
}

/// Latitude/longitude axes of a rectilinear grid.
///
/// Data laid out against these axes is row-major: one row per latitude,
/// longitude varying fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    pub latitude: Axis,
    pub longitude: Axis,
}

impl GridAxes {
    pub fn new(latitude: Axis, longitude: Axis) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Number of points in X (longitude) direction.
    pub fn nx(&self) -> usize {
        self.longitude.len()
    }

    /// Number of points in Y (latitude) direction.
    pub fn ny(&self) -> usize {
        self.latitude.len()
    }

    /// Total number of grid cells.
    pub fn len(&self) -> usize {
        self.nx() * self.ny()
    }

    pub fn is_empty(&self) -> bool {
        self.nx() == 0 || self.ny() == 0
    }

    /// Get the 1D array index for a (longitude index, latitude index) pair.
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        j * self.nx() + i
    }

    /// Cell center at a (longitude index, latitude index) pair.
    pub fn point(&self, i: usize, j: usize) -> Option<GridPoint> {
        let x = *self.longitude.values().get(i)?;
        let y = *self.latitude.values().get(j)?;
        Some(GridPoint { x, y, i, j })
    }

    /// Cell whose center is nearest to `(lon, lat)` by direct coordinate distance.
    ///
    /// On a rectilinear grid the Euclidean nearest cell is the pairing of the
    /// nearest longitude and the nearest latitude, so each axis is searched on
    /// its own.
    pub fn nearest(&self, lon: f64, lat: f64) -> Option<GridPoint> {
        let i = self.longitude.nearest_index(lon)?;
        let j = self.latitude.nearest_index(lat)?;
        self.point(i, j)
    }

    /// Bounding box of the cell centers.
    pub fn bbox(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(
            self.longitude.min()?,
            self.latitude.min()?,
            self.longitude.max()?,
            self.latitude.max()?,
        ))
    }

    /// Area covered by the grid cells: center extent plus half a cell on each side.
    pub fn coverage(&self) -> Option<BoundingBox> {
        self.bbox().map(|bbox| {
            bbox.expanded(self.longitude.spacing() / 2.0, self.latitude.spacing() / 2.0)
        })
    }
}

/// A point on the grid with both indices and coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// Longitude of the cell center
    pub x: f64,
    /// Latitude of the cell center
    pub y: f64,
    /// Longitude index
    pub i: usize,
    /// Latitude index
    pub j: usize,
}
