//! Inverse-distance-weighted depth for cells that turn from land to ocean.
//!
//! The search walks square rings around the cell (Chebyshev distance 1, 2,
//! ... up to `search_radius`) and stops after the first ring that brings the
//! neighbour count to `min_neighbors`. Only ocean cells (`depth > 0`) count.
//! Weights are `1 / d²` where `d` is the Euclidean distance in degrees
//! between cell centres.
//!
//! When fewer than `min_neighbors` ocean cells lie within the radius the
//! result is `fallback_depth`, so an edit never fails on sparse data.

use tracing::debug;

use crate::config::FillConfig;
use crate::depth_grid::{is_ocean, DepthGrid};
use crate::error::{PomGridError, Result};

/// Depth synthesized for the cell at 0-based `(col, row)`
pub fn fill_depth(grid: &DepthGrid, col: usize, row: usize, config: &FillConfig) -> Result<f64> {
    if col >= grid.n_cols() || row >= grid.n_rows() {
        return Err(PomGridError::invalid_parameter(
            "cell",
            format!(
                "({}, {}) outside grid of {} cols x {} rows",
                col,
                row,
                grid.n_cols(),
                grid.n_rows()
            ),
        ));
    }

    let lons = grid.lons();
    let lats = grid.lats();
    let (lon0, lat0) = (lons[col], lats[row]);

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut found = 0usize;

    for radius in 1..=config.search_radius {
        for (c, r) in ring(col, row, radius, grid.n_cols(), grid.n_rows()) {
            let Some(depth) = grid.depth_at(c, r).filter(|&d| is_ocean(d)) else {
                continue;
            };
            let d2 = (lons[c] - lon0).powi(2) + (lats[r] - lat0).powi(2);
            if d2 <= 0.0 {
                continue;
            }
            weighted_sum += depth / d2;
            weight_total += 1.0 / d2;
            found += 1;
        }
        if found >= config.min_neighbors {
            break;
        }
    }

    if found < config.min_neighbors || weight_total <= 0.0 {
        debug!(
            col = col,
            row = row,
            neighbors = found,
            fallback = config.fallback_depth,
            "Too few ocean neighbours, using fallback depth"
        );
        return Ok(config.fallback_depth);
    }

    let depth = weighted_sum / weight_total;
    debug!(col = col, row = row, neighbors = found, depth = depth, "Filled depth");
    Ok(depth)
}

/// In-grid cells at Chebyshev distance exactly `radius`
fn ring(
    col: usize,
    row: usize,
    radius: usize,
    n_cols: usize,
    n_rows: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let r = radius as i64;
    let (col, row) = (col as i64, row as i64);
    (-r..=r)
        .flat_map(move |dr| (-r..=r).map(move |dc| (dc, dr)))
        .filter(move |&(dc, dr)| dc.abs() == r || dr.abs() == r)
        .map(move |(dc, dr)| (col + dc, row + dr))
        .filter(move |&(x, y)| x >= 0 && y >= 0 && (x as usize) < n_cols && (y as usize) < n_rows)
        .map(|(x, y)| (x as usize, y as usize))
}
