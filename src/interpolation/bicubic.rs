//! Bicubic interpolation.
//!
//! This method uses the 16 surrounding grid points and the cubic convolution
//! kernel (Keys, a = -0.5) to produce smoother results than bilinear. Edges
//! are handled by replicating the border samples.
//!
//! Results are not clamped to the range of the surrounding samples: near
//! sharp gradients such as a shelf break the interpolant can overshoot. Tests
//! pin that behaviour down.

use ndarray::ArrayView2;

use super::Interpolator;
use crate::interpolation::common;

const KEYS_A: f64 = -0.5;

/// Bicubic interpolator
pub struct BicubicInterpolator;

/// Cubic convolution kernel
fn keys_kernel(x: f64) -> f64 {
    let x = x.abs();
    if x <= 1.0 {
        (KEYS_A + 2.0) * x.powi(3) - (KEYS_A + 3.0) * x.powi(2) + 1.0
    } else if x < 2.0 {
        KEYS_A * x.powi(3) - 5.0 * KEYS_A * x.powi(2) + 8.0 * KEYS_A * x - 4.0 * KEYS_A
    } else {
        0.0
    }
}

/// Weights and clamped indices for offsets -1, 0, 1, 2 around `index`
fn taps(index: f64, size: usize) -> [(usize, f64); 4] {
    let (base, frac) = common::split_index(index, size);
    let mut taps = [(0usize, 0.0f64); 4];
    for (k, tap) in taps.iter_mut().enumerate() {
        let offset = k as i64 - 1;
        let idx = (base as i64 + offset).clamp(0, size as i64 - 1) as usize;
        *tap = (idx, keys_kernel(frac - offset as f64));
    }
    taps
}

impl Interpolator for BicubicInterpolator {
    fn interpolate(&self, data: &ArrayView2<'_, f64>, row: f64, col: f64) -> f64 {
        let (n_rows, n_cols) = data.dim();
        let row_taps = taps(row, n_rows);
        let col_taps = taps(col, n_cols);

        let mut value = 0.0;
        for &(r, wr) in &row_taps {
            if wr == 0.0 {
                continue;
            }
            for &(c, wc) in &col_taps {
                if wc == 0.0 {
                    continue;
                }
                value += wr * wc * data[[r, c]];
            }
        }
        value
    }

    fn name(&self) -> &str {
        "bicubic"
    }
}
