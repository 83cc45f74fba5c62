//! Nearest-cell sampling of the monthly grid at settlement locations.

use climate_common::GridPoint;
use grid_processor::MonthlyGrid;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FeatureError, Result};
use crate::features::Settlement;

/// What to do with a settlement outside the grid coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfExtentPolicy {
    /// Sample the nearest boundary cell and log a warning
    #[default]
    Clamp,
    /// Abort with [`FeatureError::OutOfExtent`]
    Error,
}

/// Monthly values at one settlement, January first; `None` = no data.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSample {
    pub key: String,
    /// Grid cell that was sampled
    pub cell: GridPoint,
    /// The settlement lies outside the grid coverage
    pub clamped: bool,
    pub months: Vec<Option<f64>>,
}

/// Sample every settlement at its nearest grid cell.
///
/// Distance is plain coordinate distance; ties go to the lower coordinate on
/// each axis. Coverage is the cell-center extent plus half a cell.
pub fn sample_settlements(
    grid: &MonthlyGrid,
    settlements: &[Settlement],
    policy: OutOfExtentPolicy,
) -> Result<Vec<SettlementSample>> {
    let axes = grid.axes();
    let coverage = axes.coverage().ok_or(FeatureError::EmptyGrid)?;

    let mut samples = Vec::with_capacity(settlements.len());
    for settlement in settlements {
        let clamped = !coverage.contains_point(settlement.lon, settlement.lat);
        if clamped {
            match policy {
                OutOfExtentPolicy::Error => {
                    return Err(FeatureError::OutOfExtent {
                        id: settlement.key(),
                        lon: settlement.lon,
                        lat: settlement.lat,
                    })
                }
                OutOfExtentPolicy::Clamp => warn!(
                    settlement = %settlement.key(),
                    lon = settlement.lon,
                    lat = settlement.lat,
                    "Settlement outside grid coverage, sampling nearest boundary cell"
                ),
            }
        }

        let cell = axes
            .nearest(settlement.lon, settlement.lat)
            .ok_or(FeatureError::EmptyGrid)?;

        let months = (1..=12u32)
            .map(|m| grid.value(m, cell.i, cell.j).filter(|v| !v.is_nan()))
            .collect();

        samples.push(SettlementSample {
            key: settlement.key(),
            cell,
            clamped,
            months,
        });
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::{Axis, GridAxes};
    use serde_json::json;

    fn grid() -> MonthlyGrid {
        let axes = GridAxes::new(
            Axis::new(vec![36.0, 35.75, 35.5]),
            Axis::new(vec![-7.0, -6.75, -6.5]),
        );
        // Value encodes month and cell: 100 * month + 10 * j + i
        let months = (1..=12)
            .map(|m| {
                (0..3)
                    .flat_map(|j| (0..3).map(move |i| (100 * m + 10 * j + i) as f64))
                    .collect()
            })
            .collect();
        MonthlyGrid::new(axes, months).unwrap()
    }

    fn settlement(id: &str, lon: f64, lat: f64) -> Settlement {
        Settlement {
            id: json!(id),
            name: json!(id),
            lon,
            lat,
        }
    }

    #[test]
    fn test_exact_cell_returns_cell_value() {
        let samples =
            sample_settlements(&grid(), &[settlement("s", -6.75, 35.5)], OutOfExtentPolicy::Clamp)
                .unwrap();
        let s = &samples[0];
        assert_eq!((s.cell.i, s.cell.j), (1, 2));
        assert!(!s.clamped);
        for m in 1..=12 {
            assert_eq!(s.months[m - 1], Some((100 * m + 21) as f64));
        }
    }

    #[test]
    fn test_tie_resolves_to_lower_coordinates() {
        let sites = [
            settlement("a", -6.875, 35.625),
            settlement("b", -6.875, 35.625),
        ];
        let first = sample_settlements(&grid(), &sites, OutOfExtentPolicy::Clamp).unwrap();
        let second = sample_settlements(&grid(), &sites, OutOfExtentPolicy::Clamp).unwrap();

        assert_eq!((first[0].cell.x, first[0].cell.y), (-7.0, 35.5));
        assert_eq!(first[0].cell, first[1].cell);
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_extent_policies() {
        let far = [settlement("far", 10.0, 50.0)];

        let clamped = sample_settlements(&grid(), &far, OutOfExtentPolicy::Clamp).unwrap();
        assert!(clamped[0].clamped);
        assert_eq!((clamped[0].cell.x, clamped[0].cell.y), (-6.5, 36.0));

        let err = sample_settlements(&grid(), &far, OutOfExtentPolicy::Error).unwrap_err();
        assert!(matches!(err, FeatureError::OutOfExtent { .. }));
    }

    #[test]
    fn test_half_cell_margin_is_inside() {
        let near = [settlement("edge", -7.1, 36.1)];
        let samples = sample_settlements(&grid(), &near, OutOfExtentPolicy::Error).unwrap();
        assert!(!samples[0].clamped);
    }

    #[test]
    fn test_missing_cell_is_none() {
        let mut months: Vec<Vec<f64>> = (0..12).map(|_| vec![1.0; 9]).collect();
        months[4][0] = f64::NAN;
        let grid = MonthlyGrid::new(grid().axes().clone(), months).unwrap();

        let samples =
            sample_settlements(&grid, &[settlement("s", -7.0, 36.0)], OutOfExtentPolicy::Clamp)
                .unwrap();
        assert_eq!(samples[0].months[4], None);
        assert_eq!(samples[0].months[5], Some(1.0));
    }

    #[test]
    fn test_policy_yaml() {
        let policy: OutOfExtentPolicy = serde_yaml::from_str("error").unwrap();
        assert_eq!(policy, OutOfExtentPolicy::Error);
        assert_eq!(OutOfExtentPolicy::default(), OutOfExtentPolicy::Clamp);
    }
}
