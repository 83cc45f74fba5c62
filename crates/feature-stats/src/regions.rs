//! Per-region monthly means over the grid cells whose centers lie inside.

use climate_common::{GridAxes, Reduction};
use geo::{Contains, Point};
use grid_processor::MonthlyGrid;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::features::Region;

/// Monthly means of one region, January first; `None` = no data.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub key: String,
    /// Grid cell centers strictly inside the region
    pub cell_count: usize,
    pub months: Vec<Option<f64>>,
}

impl RegionStats {
    /// Number of months with a value.
    pub fn months_with_data(&self) -> usize {
        self.months.iter().filter(|v| v.is_some()).count()
    }
}

/// Flat indices of the cells whose center lies strictly inside the region.
///
/// Cells are prefiltered by the region's bounding box; centers on the
/// boundary are not members.
pub fn region_cells(axes: &GridAxes, region: &Region) -> Vec<usize> {
    let bbox = &region.bbox;
    let columns: Vec<usize> = axes
        .longitude
        .indices_within(bbox.min_x, bbox.max_x)
        .collect();

    let mut cells = Vec::new();
    for j in axes.latitude.indices_within(bbox.min_y, bbox.max_y) {
        let lat = axes.latitude.values()[j];
        for &i in &columns {
            let lon = axes.longitude.values()[i];
            if region.geometry.contains(&Point::new(lon, lat)) {
                cells.push(axes.flat_index(i, j));
            }
        }
    }
    cells
}

/// Mean of each month over the region's non-missing member cells.
///
/// A region without member cells, or whose members are all missing in a
/// month, gets `None` for that month.
pub fn aggregate_regions(grid: &MonthlyGrid, regions: &[Region]) -> Vec<RegionStats> {
    let stats: Vec<RegionStats> = regions
        .par_iter()
        .map(|region| {
            let cells = region_cells(grid.axes(), region);
            let months = grid
                .iter()
                .map(|(_, values)| {
                    let mean = Reduction::Mean.reduce(cells.iter().map(|&c| values[c]));
                    (!mean.is_nan()).then_some(mean)
                })
                .collect();

            RegionStats {
                key: region.key(),
                cell_count: cells.len(),
                months,
            }
        })
        .collect();

    for s in &stats {
        if s.cell_count == 0 {
            warn!(region = %s.key, "Region contains no grid cell centers, values will be missing");
        } else {
            debug!(region = %s.key, cells = s.cell_count, months = s.months_with_data(), "Aggregated region");
        }
    }

    stats
}
