//! Grid-wide interpolation driver.
//!
//! Resamples a [`SourceField`] onto every point of a [`TargetGrid`] and flips
//! the sign convention on the way: source elevations are negative below sea
//! level, output depths are positive in the ocean and exactly zero on land.
//!
//! With `parallel` enabled the target rows are split into contiguous blocks,
//! one per worker, evaluated on a dedicated rayon pool and stitched back
//! together by block index. Each point only reads the immutable source, so
//! the parallel result is identical to the serial one.

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::common::coord_to_index;
use super::{InterpolationMethod, Interpolator};
use crate::config::InterpolationConfig;
use crate::depth_grid::{DepthGrid, NO_DATA};
use crate::error::{PomGridError, Result};
use crate::grid::TargetGrid;
use crate::source::SourceField;

/// Convert a source elevation to a model depth.
///
/// Negative elevations become positive depths, anything at or above the
/// reference surface becomes land (0). Non-finite input yields NaN.
pub fn elevation_to_depth(elevation: f64) -> f64 {
    if !elevation.is_finite() {
        f64::NAN
    } else if elevation < 0.0 {
        -elevation
    } else {
        0.0
    }
}

/// Counters gathered while interpolating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolationReport {
    pub method: InterpolationMethod,
    pub total_points: usize,
    /// Points outside the source coverage, set to the no-data sentinel
    pub out_of_bounds: usize,
    /// Points inside the coverage whose neighbourhood had no data
    pub missing: usize,
    pub workers: usize,
    pub blocks: usize,
    pub duration_ms: f64,
}

/// Result of interpolating a whole grid
#[derive(Debug, Clone)]
pub struct InterpolationOutcome {
    pub grid: DepthGrid,
    pub report: InterpolationReport,
}

/// Depths for a contiguous range of rows
struct RowBlock {
    values: Vec<f64>,
    out_of_bounds: usize,
    missing: usize,
}

/// Fractional source positions of every target row and column
struct TargetPositions {
    rows: Vec<Option<f64>>,
    cols: Vec<Option<f64>>,
}

impl TargetPositions {
    fn locate(source: &SourceField, target: &TargetGrid) -> Self {
        let cols = target
            .lons
            .iter()
            .map(|&lon| coord_to_index(source.normalize_lon(lon), source.lons()))
            .collect();
        let rows = target
            .lats
            .iter()
            .map(|&lat| coord_to_index(lat, source.lats()))
            .collect();
        Self { rows, cols }
    }
}

/// Interpolate `source` onto `target`.
///
/// Points outside the source coverage get [`NO_DATA`] and are counted in the
/// report; only a grid where every point is out of bounds is an error.
pub fn interpolate(
    source: &SourceField,
    target: &TargetGrid,
    config: &InterpolationConfig,
) -> Result<InterpolationOutcome> {
    let start = Instant::now();
    let n_rows = target.n_rows();
    let n_cols = target.n_cols();

    let total_points = target
        .n_points()
        .filter(|&n| n <= config.max_grid_points)
        .ok_or_else(|| PomGridError::ResourceExhausted {
            message: format!(
                "target grid of {} x {} points exceeds max_grid_points ({})",
                n_cols, n_rows, config.max_grid_points
            ),
        })?;

    let method = config.method;
    let interpolator = method.interpolator();
    let positions = TargetPositions::locate(source, target);

    let workers = config.effective_workers().min(n_rows.max(1));
    info!(
        method = %method,
        n_cols = n_cols,
        n_rows = n_rows,
        workers = workers,
        "Interpolating source onto target grid"
    );

    let blocks = if workers > 1 {
        interpolate_parallel(source, &positions, interpolator.as_ref(), workers)?
    } else {
        vec![interpolate_rows(
            source,
            &positions,
            interpolator.as_ref(),
            0..n_rows,
        )?]
    };
    let n_blocks = blocks.len();

    let mut values = Vec::new();
    values
        .try_reserve_exact(total_points)
        .map_err(|e| PomGridError::ResourceExhausted {
            message: format!("cannot allocate {} depth values: {}", total_points, e),
        })?;
    let mut out_of_bounds = 0;
    let mut missing = 0;
    for block in blocks {
        values.extend_from_slice(&block.values);
        out_of_bounds += block.out_of_bounds;
        missing += block.missing;
    }

    if out_of_bounds == total_points {
        let (lon_lo, lon_hi) = source.lon_range();
        let (lat_lo, lat_hi) = source.lat_range();
        return Err(PomGridError::OutOfBounds {
            count: out_of_bounds,
            total: total_points,
            message: format!(
                "source covers lon [{}, {}], lat [{}, {}]",
                lon_lo, lon_hi, lat_lo, lat_hi
            ),
        });
    }
    if out_of_bounds > 0 {
        warn!(
            out_of_bounds = out_of_bounds,
            total = total_points,
            "Target points outside source coverage set to no-data"
        );
    }
    if missing > 0 {
        warn!(
            missing = missing,
            "Target points with no source data set to no-data"
        );
    }

    let depth = Array2::from_shape_vec((n_rows, n_cols), values).map_err(|e| {
        PomGridError::Interpolation {
            message: format!("failed to assemble depth grid: {}", e),
        }
    })?;
    let grid = DepthGrid::from_target(target, depth)?;

    let report = InterpolationReport {
        method,
        total_points,
        out_of_bounds,
        missing,
        workers,
        blocks: n_blocks,
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    let stats = grid.statistics();
    info!(
        ocean_points = stats.ocean_points,
        ocean_percent = stats.ocean_percent,
        land_points = stats.land_points,
        max_depth = stats.max_depth,
        mean_depth = stats.mean_depth,
        duration_ms = report.duration_ms,
        "Interpolation finished"
    );

    Ok(InterpolationOutcome { grid, report })
}

/// Row ranges of `ceil(n_rows / workers)` rows each
fn row_blocks(n_rows: usize, workers: usize) -> Vec<Range<usize>> {
    let block_size = n_rows.div_ceil(workers.max(1)).max(1);
    (0..n_rows)
        .step_by(block_size)
        .map(|start| start..(start + block_size).min(n_rows))
        .collect()
}

fn interpolate_parallel(
    source: &SourceField,
    positions: &TargetPositions,
    interpolator: &dyn Interpolator,
    workers: usize,
) -> Result<Vec<RowBlock>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pomgrid-interp-{}", i))
        .build()
        .map_err(|e| PomGridError::ResourceExhausted {
            message: format!("cannot start {} worker threads: {}", workers, e),
        })?;

    let ranges = row_blocks(positions.rows.len(), workers);
    debug!(blocks = ranges.len(), "Dispatching row blocks");

    let mut results: Vec<(usize, RowBlock)> = pool.install(|| {
        ranges
            .into_par_iter()
            .enumerate()
            .map(|(index, rows)| {
                interpolate_rows(source, positions, interpolator, rows).map(|b| (index, b))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    // Reassemble by block index, never by completion order
    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, block)| block).collect())
}

fn interpolate_rows(
    source: &SourceField,
    positions: &TargetPositions,
    interpolator: &dyn Interpolator,
    rows: Range<usize>,
) -> Result<RowBlock> {
    let n_cols = positions.cols.len();
    let len = rows.len() * n_cols;

    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|e| PomGridError::ResourceExhausted {
            message: format!("cannot allocate block of {} values: {}", len, e),
        })?;

    let data = source.values().view();
    let mut out_of_bounds = 0;
    let mut missing = 0;

    for row in rows {
        let row_pos = positions.rows[row];
        for col_pos in &positions.cols {
            let depth = match (row_pos, col_pos) {
                (Some(r), Some(c)) => {
                    let depth = elevation_to_depth(interpolator.interpolate(&data, r, *c));
                    if depth.is_nan() {
                        missing += 1;
                        NO_DATA
                    } else {
                        depth
                    }
                }
                _ => {
                    out_of_bounds += 1;
                    NO_DATA
                }
            };
            values.push(depth);
        }
    }

    Ok(RowBlock {
        values,
        out_of_bounds,
        missing,
    })
}
