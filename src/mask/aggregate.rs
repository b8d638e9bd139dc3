//! Degrade a fine mask to a coarser grid by fractional ocean coverage.
//!
//! Each coarse cell centred at `c` covers the fine cell centres lying in the
//! half-open interval `[c - res/2, c + res/2)` on both axes. The coarse cell
//! is ocean when the fraction of ocean among the valid fine cells reaches the
//! threshold. No-data fine cells are left out of the fraction entirely, and a
//! footprint holding nothing but no-data stays no-data.
//!
//! Raising the threshold can only turn ocean cells into land, never the
//! other way round.

use ndarray::Array2;
use rayon::prelude::*;
use std::ops::Range;
use tracing::{debug, info};

use super::{MaskCell, MaskGrid};
use crate::error::{PomGridError, Result};
use crate::grid::{build_axis, mean_step, round_coord, GridSpacing, TargetGrid};
use crate::source::COORD_TOLERANCE;

/// Aggregate `fine` onto a grid with spacing `resolution`.
///
/// Without a reference the coarse grid starts at the first fine coordinate.
/// With a reference the coarse centres are the reference origin plus whole
/// multiples of the resolution, so the result lines up cell-for-cell with a
/// depth grid built on the same origin.
pub fn aggregate(
    fine: &MaskGrid,
    resolution: GridSpacing,
    threshold: f64,
    reference: Option<&TargetGrid>,
) -> Result<MaskGrid> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PomGridError::invalid_parameter(
            "threshold",
            format!("threshold must lie in [0, 1], got {}", threshold),
        ));
    }
    for (param, res) in [("resolution_lon", resolution.lon), ("resolution_lat", resolution.lat)] {
        if !res.is_finite() || res <= 0.0 {
            return Err(PomGridError::Resolution {
                param: param.to_string(),
                message: format!("resolution must be a positive number, got {}", res),
            });
        }
    }

    check_not_finer("resolution_lon", resolution.lon, fine.lons())?;
    check_not_finer("resolution_lat", resolution.lat, fine.lats())?;

    let (lon_origin, lat_origin) = match reference {
        // The reference may use the other longitude convention
        Some(grid) => (
            Some(fine.lon_convention().convert(grid.lons[0])),
            Some(grid.lats[0]),
        ),
        None => (None, None),
    };
    let lons = coarse_axis(fine.lons(), resolution.lon, lon_origin, "lon")?;
    let lats = coarse_axis(fine.lats(), resolution.lat, lat_origin, "lat")?;

    let col_spans = footprints(fine.lons(), &lons, resolution.lon);
    let row_spans = footprints(fine.lats(), &lats, resolution.lat);
    debug!(
        n_cols = lons.len(),
        n_rows = lats.len(),
        "Aggregating fine mask"
    );

    let cells = fine.cells();
    let rows: Vec<Vec<MaskCell>> = row_spans
        .par_iter()
        .map(|rows| {
            col_spans
                .iter()
                .map(|cols| classify(cells, rows.clone(), cols.clone(), threshold))
                .collect()
        })
        .collect();

    let values: Vec<MaskCell> = rows.into_iter().flatten().collect();
    let coarse = Array2::from_shape_vec((lats.len(), lons.len()), values).map_err(|e| {
        PomGridError::Interpolation {
            message: format!("failed to assemble coarse mask: {}", e),
        }
    })?;
    let mask = MaskGrid::new(lons, lats, coarse)?;

    let stats = mask.statistics();
    info!(
        n_cols = mask.n_cols(),
        n_rows = mask.n_rows(),
        threshold = threshold,
        ocean = stats.ocean,
        land = stats.land,
        no_data = stats.no_data,
        "Aggregated mask"
    );
    Ok(mask)
}

/// Aggregation cannot manufacture detail
fn check_not_finer(param: &str, resolution: f64, fine_axis: &[f64]) -> Result<()> {
    let fine_step = mean_step(fine_axis);
    if fine_step > 0.0 && resolution < fine_step - COORD_TOLERANCE {
        return Err(PomGridError::Resolution {
            param: param.to_string(),
            message: format!(
                "target resolution {} is finer than the source resolution {}",
                resolution, fine_step
            ),
        });
    }
    Ok(())
}

fn coarse_axis(fine: &[f64], res: f64, origin: Option<f64>, axis: &str) -> Result<Vec<f64>> {
    let first = fine[0];
    let last = fine[fine.len() - 1];

    let Some(origin) = origin else {
        return build_axis(first, last, res);
    };

    let k_min = ((first - origin) / res - COORD_TOLERANCE).ceil() as i64;
    let k_max = ((last - origin) / res + COORD_TOLERANCE).floor() as i64;
    if k_max < k_min {
        return Err(PomGridError::GridMismatch {
            message: format!(
                "reference {} origin {} with spacing {} places no cell inside [{}, {}]",
                axis, origin, res, first, last
            ),
        });
    }

    Ok((k_min..=k_max)
        .map(|k| round_coord(origin + k as f64 * res))
        .collect())
}

/// Fine index range covered by each coarse centre
fn footprints(fine: &[f64], centres: &[f64], res: f64) -> Vec<Range<usize>> {
    let half = res / 2.0;
    centres
        .iter()
        .map(|&c| {
            let start = fine.partition_point(|&v| v < c - half - COORD_TOLERANCE);
            let end = fine.partition_point(|&v| v < c + half - COORD_TOLERANCE);
            start..end.max(start)
        })
        .collect()
}

fn classify(
    cells: &Array2<MaskCell>,
    rows: Range<usize>,
    cols: Range<usize>,
    threshold: f64,
) -> MaskCell {
    let mut ocean = 0usize;
    let mut valid = 0usize;
    for row in rows {
        for col in cols.clone() {
            match cells[[row, col]] {
                MaskCell::Ocean => {
                    ocean += 1;
                    valid += 1;
                }
                MaskCell::Land => valid += 1,
                MaskCell::NoData => {}
            }
        }
    }

    if valid == 0 {
        MaskCell::NoData
    } else if ocean as f64 / valid as f64 >= threshold {
        MaskCell::Ocean
    } else {
        MaskCell::Land
    }
}
