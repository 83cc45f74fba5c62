//! Reduction of a gridded time series to twelve monthly grids.

use chrono::Datelike;
use climate_common::{GridAxes, VariableSpec, MONTHS_PER_YEAR};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{GridProcessorError, Result};
use crate::series::GriddedTimeSeries;

/// Twelve `(latitude, longitude)` grids in reporting units, NaN = no-data.
#[derive(Debug, Clone)]
pub struct MonthlyGrid {
    axes: GridAxes,
    months: Vec<Vec<f64>>,
    instant_counts: [usize; MONTHS_PER_YEAR],
}

impl MonthlyGrid {
    /// Build a monthly grid from already-reduced values, January first.
    pub fn new(axes: GridAxes, months: Vec<Vec<f64>>) -> Result<Self> {
        if months.len() != MONTHS_PER_YEAR {
            return Err(GridProcessorError::InvalidShape(format!(
                "expected {} months, got {}",
                MONTHS_PER_YEAR,
                months.len()
            )));
        }
        if let Some((m, grid)) = months
            .iter()
            .enumerate()
            .find(|(_, grid)| grid.len() != axes.len())
        {
            return Err(GridProcessorError::InvalidShape(format!(
                "month {} has {} cells, axes have {}",
                m + 1,
                grid.len(),
                axes.len()
            )));
        }

        Ok(Self {
            axes,
            months,
            instant_counts: [0; MONTHS_PER_YEAR],
        })
    }

    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    /// Values of a month (1-based), row-major over `(latitude, longitude)`.
    pub fn month(&self, month: u32) -> Option<&[f64]> {
        self.months
            .get((month as usize).checked_sub(1)?)
            .map(|grid| grid.as_slice())
    }

    /// Value at a month (1-based) and `(longitude index, latitude index)`.
    pub fn value(&self, month: u32, i: usize, j: usize) -> Option<f64> {
        let grid = self.months.get((month as usize).checked_sub(1)?)?;
        if i >= self.axes.nx() || j >= self.axes.ny() {
            return None;
        }
        grid.get(self.axes.flat_index(i, j)).copied()
    }

    /// Number of source instants that fell in a month (1-based).
    pub fn instant_count(&self, month: u32) -> usize {
        (month as usize)
            .checked_sub(1)
            .and_then(|m| self.instant_counts.get(m))
            .copied()
            .unwrap_or(0)
    }

    /// Iterate `(month, values)` pairs, January first.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[f64])> {
        self.months
            .iter()
            .enumerate()
            .map(|(m, grid)| (m as u32 + 1, grid.as_slice()))
    }
}

/// Convert units and reduce every calendar month with the variable's rule.
///
/// Missing instants of a cell are skipped; a cell missing for every instant
/// of a month stays missing. A month without any instant is all-missing.
pub fn reduce_monthly(series: &GriddedTimeSeries, spec: &VariableSpec) -> MonthlyGrid {
    let n = series.axes.len();

    let mut by_month: Vec<Vec<usize>> = vec![Vec::new(); MONTHS_PER_YEAR];
    for (t, instant) in series.times.iter().enumerate() {
        by_month[instant.month0() as usize].push(t);
    }

    let mut instant_counts = [0; MONTHS_PER_YEAR];
    for (m, instants) in by_month.iter().enumerate() {
        instant_counts[m] = instants.len();
        if instants.is_empty() {
            warn!(
                category = %spec.category,
                month = m + 1,
                "No instants for month, values will be missing"
            );
        }
    }

    let conversion = spec.conversion;
    let reduction = spec.reduction;

    let months: Vec<Vec<f64>> = by_month
        .par_iter()
        .enumerate()
        .map(|(m, instants)| {
            debug!(category = %spec.category, month = m + 1, instants = instants.len(), "Reducing month");
            (0..n)
                .map(|cell| {
                    reduction.reduce(
                        instants
                            .iter()
                            .map(|&t| conversion.apply(series.values[t * n + cell])),
                    )
                })
                .collect()
        })
        .collect();

    MonthlyGrid {
        axes: series.axes.clone(),
        months,
        instant_counts,
    }
}
