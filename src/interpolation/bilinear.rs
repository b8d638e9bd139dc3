//! Bilinear interpolation.
//!
//! This method performs linear interpolation in two dimensions using
//! the four grid points of the enclosing cell.

use ndarray::ArrayView2;

use super::Interpolator;
use crate::interpolation::common;

/// Bilinear interpolator
pub struct BilinearInterpolator;

impl Interpolator for BilinearInterpolator {
    fn interpolate(&self, data: &ArrayView2<'_, f64>, row: f64, col: f64) -> f64 {
        let (n_rows, n_cols) = data.dim();
        let (r0, fr) = common::split_index(row, n_rows);
        let (c0, fc) = common::split_index(col, n_cols);
        let (wr0, wr1) = common::linear_weight(fr);
        let (wc0, wc1) = common::linear_weight(fc);

        // Corners with zero weight are skipped so a NaN neighbour does not
        // poison a value sitting exactly on a valid sample.
        let mut value = 0.0;
        for (dr, wr) in [(0, wr0), (1, wr1)] {
            if wr == 0.0 {
                continue;
            }
            for (dc, wc) in [(0, wc0), (1, wc1)] {
                if wc == 0.0 {
                    continue;
                }
                value += wr * wc * data[[r0 + dr, c0 + dc]];
            }
        }
        value
    }

    fn name(&self) -> &str {
        "bilinear"
    }
}
