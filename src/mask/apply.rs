//! Conservative merge of a mask into a depth grid.
//!
//! Every grid point looks up its nearest mask cell. Ocean points whose mask
//! cell is land become land (depth 0). Nothing else changes: land never
//! becomes ocean, ocean mask cells and no-data mask cells leave the depth
//! as it is, and no-data depths stay no-data.
//!
//! Grid and mask may use different longitude conventions ([-180, 180) vs
//! [0, 360)). Grid longitudes are converted to the mask's convention before
//! the lookup, and a global mask wraps across its seam.

use serde::Serialize;
use tracing::{info, warn};

use super::{MaskCell, MaskGrid};
use crate::depth_grid::{is_ocean, DepthGrid};
use crate::error::{PomGridError, Result};
use crate::interpolation::common::nearest_index;
use crate::source::COORD_TOLERANCE;

/// What applying a mask changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskApplication {
    /// Ocean points forced to land
    pub converted: usize,
    /// 0-based grid columns left untouched by boundary preservation
    pub skipped_columns: Vec<usize>,
    /// Points whose nearest mask cell was no-data
    pub no_data_cells: usize,
}

/// Apply `mask` to `grid` in place.
///
/// With `preserve_boundaries`, the first and last grid columns are skipped
/// when they fall more than half a mask cell outside the mask's longitude
/// coverage, so a convention mismatch at the seam cannot wipe them out.
pub fn apply_mask(
    grid: &mut DepthGrid,
    mask: &MaskGrid,
    preserve_boundaries: bool,
) -> Result<MaskApplication> {
    let convention = mask.lon_convention();
    let global = mask.is_global_lon();
    let half_lon = mask.spacing_lon() / 2.0;
    let half_lat = mask.spacing_lat() / 2.0;

    let mask_lons = mask.lons();
    let mask_lats = mask.lats();
    let (mask_lon_lo, mask_lon_hi) = (mask_lons[0], mask_lons[mask_lons.len() - 1]);
    let (mask_lat_lo, mask_lat_hi) = (mask_lats[0], mask_lats[mask_lats.len() - 1]);

    let lons: Vec<f64> = grid.lons().iter().map(|&lon| convention.convert(lon)).collect();
    let inside_lon = |lon: f64| {
        global
            || (lon >= mask_lon_lo - half_lon - COORD_TOLERANCE
                && lon <= mask_lon_hi + half_lon + COORD_TOLERANCE)
    };
    let inside_lat = |lat: f64| {
        lat >= mask_lat_lo - half_lat - COORD_TOLERANCE
            && lat <= mask_lat_hi + half_lat + COORD_TOLERANCE
    };

    if !lons.iter().any(|&lon| inside_lon(lon)) {
        return Err(PomGridError::GridMismatch {
            message: format!(
                "grid longitudes [{}, {}] do not overlap mask longitudes [{}, {}]",
                grid.lons()[0],
                grid.lons()[grid.n_cols() - 1],
                mask_lon_lo,
                mask_lon_hi
            ),
        });
    }
    if !grid.lats().iter().any(|&lat| inside_lat(lat)) {
        return Err(PomGridError::GridMismatch {
            message: format!(
                "grid latitudes [{}, {}] do not overlap mask latitudes [{}, {}]",
                grid.lats()[0],
                grid.lats()[grid.n_rows() - 1],
                mask_lat_lo,
                mask_lat_hi
            ),
        });
    }

    let mut skipped_columns = Vec::new();
    if preserve_boundaries {
        let last = lons.len() - 1;
        for col in [0, last] {
            if !inside_lon(lons[col]) && !skipped_columns.contains(&col) {
                skipped_columns.push(col);
            }
        }
        if !skipped_columns.is_empty() {
            warn!(
                columns = ?skipped_columns,
                "Boundary columns outside mask coverage left untouched"
            );
        }
    }

    let mask_cols: Vec<usize> = lons
        .iter()
        .map(|&lon| nearest_mask_col(lon, mask_lons, global))
        .collect();
    let mask_rows: Vec<usize> = grid
        .lats()
        .iter()
        .map(|&lat| nearest_index(lat, mask_lats))
        .collect();

    let mut converted = 0;
    let mut no_data_cells = 0;
    for (row, &mask_row) in mask_rows.iter().enumerate() {
        for (col, &mask_col) in mask_cols.iter().enumerate() {
            if skipped_columns.contains(&col) {
                continue;
            }
            match mask.cell(mask_col, mask_row) {
                Some(MaskCell::Land) => {
                    if grid.depth_at(col, row).is_some_and(is_ocean) {
                        grid.set_depth(col, row, 0.0)?;
                        converted += 1;
                    }
                }
                Some(MaskCell::NoData) => no_data_cells += 1,
                _ => {}
            }
        }
    }

    let stats = grid.statistics();
    info!(
        converted = converted,
        no_data_cells = no_data_cells,
        ocean_points = stats.ocean_points,
        land_points = stats.land_points,
        convention = ?convention,
        "Applied mask"
    );

    Ok(MaskApplication {
        converted,
        skipped_columns,
        no_data_cells,
    })
}

/// Nearest mask column, measuring across the seam for a global mask
fn nearest_mask_col(lon: f64, mask_lons: &[f64], global: bool) -> usize {
    let idx = nearest_index(lon, mask_lons);
    if !global {
        return idx;
    }

    let wrapped = |a: f64, b: f64| {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    };
    let last = mask_lons.len() - 1;
    [idx, 0, last]
        .into_iter()
        .min_by(|&a, &b| {
            wrapped(lon, mask_lons[a])
                .total_cmp(&wrapped(lon, mask_lons[b]))
                .then(a.cmp(&b))
        })
        .unwrap_or(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth_grid::NO_DATA;
    use crate::mask::LonConvention;
    use ndarray::{array, Array2};

    fn uniform_mask(lons: Vec<f64>, lats: Vec<f64>, cell: MaskCell) -> MaskGrid {
        let cells = Array2::from_elem((lats.len(), lons.len()), cell);
        MaskGrid::new(lons, lats, cells).unwrap()
    }

    #[test]
    fn test_all_land_mask_clears_ocean() {
        let mut grid = DepthGrid::new(
            vec![-60.0, -59.75, -59.5],
            vec![-35.0, -34.75],
            Array2::from_elem((2, 3), 1500.0),
        )
        .unwrap();
        let mask = uniform_mask(
            vec![-61.0, -60.0, -59.0],
            vec![-36.0, -35.0, -34.0],
            MaskCell::Land,
        );

        let result = apply_mask(&mut grid, &mask, true).unwrap();
        assert_eq!(result.converted, 6);
        assert!(grid.depth().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_never_creates_ocean() {
        let mut grid = DepthGrid::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0],
            array![[0.0, 250.0, NO_DATA]],
        )
        .unwrap();
        let mask = uniform_mask(vec![0.0, 1.0, 2.0], vec![0.0], MaskCell::Ocean);

        let result = apply_mask(&mut grid, &mask, false).unwrap();
        assert_eq!(result.converted, 0);
        assert_eq!(grid.depth(), &array![[0.0, 250.0, NO_DATA]]);

        let land = uniform_mask(vec![0.0, 1.0, 2.0], vec![0.0], MaskCell::Land);
        apply_mask(&mut grid, &land, false).unwrap();
        assert_eq!(grid.depth(), &array![[0.0, 0.0, NO_DATA]]);
    }

    #[test]
    fn test_no_data_mask_cells_leave_depth() {
        let mut grid = DepthGrid::new(vec![0.0, 1.0], vec![0.0], array![[10.0, 20.0]]).unwrap();
        let mask = MaskGrid::new(
            vec![0.0, 1.0],
            vec![0.0],
            array![[MaskCell::NoData, MaskCell::Land]],
        )
        .unwrap();

        let result = apply_mask(&mut grid, &mask, false).unwrap();
        assert_eq!(result.no_data_cells, 1);
        assert_eq!(grid.depth(), &array![[10.0, 0.0]]);
    }

    #[test]
    fn test_positive_mask_on_signed_grid() {
        // Grid on [-180, 180), mask on [0, 360) with land east of 300°
        let mut grid = DepthGrid::new(
            vec![-70.0, -65.0, -60.0, -55.0],
            vec![-30.0],
            Array2::from_elem((1, 4), 800.0),
        )
        .unwrap();
        let mask_lons: Vec<f64> = (0..72).map(|i| i as f64 * 5.0).collect();
        let cells = Array2::from_shape_fn((1, 72), |(_, col)| {
            if mask_lons[col] >= 300.0 {
                MaskCell::Land
            } else {
                MaskCell::Ocean
            }
        });
        let mask = MaskGrid::new(mask_lons, vec![-30.0], cells).unwrap();
        assert_eq!(mask.lon_convention(), LonConvention::Positive);

        let result = apply_mask(&mut grid, &mask, true).unwrap();
        // -70 -> 290 (ocean), -65 -> 295 (ocean), -60 -> 300, -55 -> 305 (land)
        assert_eq!(grid.depth(), &array![[800.0, 800.0, 0.0, 0.0]]);
        assert_eq!(result.converted, 2);
        assert!(result.skipped_columns.is_empty());
    }

    #[test]
    fn test_signed_mask_on_positive_grid() {
        let mut grid = DepthGrid::new(
            vec![290.0, 295.0, 300.0],
            vec![0.0],
            Array2::from_elem((1, 3), 50.0),
        )
        .unwrap();
        let mask = MaskGrid::new(
            vec![-70.0, -65.0, -60.0],
            vec![0.0],
            array![[MaskCell::Ocean, MaskCell::Land, MaskCell::Ocean]],
        )
        .unwrap();

        apply_mask(&mut grid, &mask, true).unwrap();
        assert_eq!(grid.depth(), &array![[50.0, 0.0, 50.0]]);
    }

    #[test]
    fn test_global_mask_wraps_seam() {
        // 359.5 is nearest to 0.0 across the seam
        assert_eq!(
            nearest_mask_col(359.5, &(0..360).map(|i| i as f64).collect::<Vec<_>>(), true),
            0
        );
        let lons = vec![0.0, 90.0, 180.0, 270.0];
        assert_eq!(nearest_mask_col(350.0, &lons, true), 0);
        assert_eq!(nearest_mask_col(350.0, &lons, false), 3);
    }

    #[test]
    fn test_disjoint_extents_rejected() {
        let mut grid =
            DepthGrid::new(vec![0.0, 1.0], vec![0.0, 1.0], Array2::from_elem((2, 2), 10.0))
                .unwrap();

        let mask = uniform_mask(vec![50.0, 51.0], vec![0.0, 1.0], MaskCell::Land);
        let err = apply_mask(&mut grid, &mask, true).unwrap_err();
        assert!(matches!(err, PomGridError::GridMismatch { .. }));

        let mask = uniform_mask(vec![0.0, 1.0], vec![40.0, 41.0], MaskCell::Land);
        let err = apply_mask(&mut grid, &mask, true).unwrap_err();
        assert!(matches!(err, PomGridError::GridMismatch { .. }));

        assert!(grid.depth().iter().all(|&d| d == 10.0));
    }

    #[test]
    fn test_preserve_boundaries_keeps_outer_columns() {
        let make_grid = || {
            DepthGrid::new(
                vec![-61.0, -60.0, -59.0, -58.0],
                vec![0.0],
                Array2::from_elem((1, 4), 100.0),
            )
            .unwrap()
        };
        // Mask covers only -60..-59
        let mask = uniform_mask(vec![-60.0, -59.5, -59.0], vec![0.0], MaskCell::Land);

        let mut grid = make_grid();
        let result = apply_mask(&mut grid, &mask, true).unwrap();
        assert_eq!(result.skipped_columns, vec![0, 3]);
        assert_eq!(grid.depth(), &array![[100.0, 0.0, 0.0, 100.0]]);

        let mut grid = make_grid();
        let result = apply_mask(&mut grid, &mask, false).unwrap();
        assert!(result.skipped_columns.is_empty());
        assert!(grid.depth().iter().all(|&d| d == 0.0));
    }
}
