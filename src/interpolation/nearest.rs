//! Nearest neighbor interpolation.
//!
//! This method selects the value of the nearest grid point.
//! It's the simplest interpolation method, offering the fastest
//! performance but with blockier results compared to higher-order methods.

use ndarray::ArrayView2;

use super::Interpolator;
use crate::interpolation::common;

/// Nearest neighbor interpolator
pub struct NearestInterpolator;

impl NearestInterpolator {
    fn round_half_down(index: f64, size: usize) -> usize {
        let index = common::clamp_index(index, size);
        let base = index.floor();
        let nearest = if index - base <= 0.5 { base } else { base + 1.0 };
        (nearest as usize).min(size - 1)
    }
}

impl Interpolator for NearestInterpolator {
    fn interpolate(&self, data: &ArrayView2<'_, f64>, row: f64, col: f64) -> f64 {
        let (n_rows, n_cols) = data.dim();
        let r = Self::round_half_down(row, n_rows);
        let c = Self::round_half_down(col, n_cols);
        data[[r, c]]
    }

    fn name(&self) -> &str {
        "nearest"
    }
}
