//! Common utilities for interpolation algorithms.
//!
//! This module provides shared functionality used by various interpolation methods.

use crate::source::COORD_TOLERANCE;

/// Map a coordinate value to a fractional index on a strictly increasing axis.
///
/// Returns `None` when the value lies outside the axis. An axis with a single
/// coordinate only accepts that exact value.
pub fn coord_to_index(coord: f64, coord_values: &[f64]) -> Option<f64> {
    let n = coord_values.len();
    if n == 0 || !coord.is_finite() {
        return None;
    }

    let first = coord_values[0];
    let last = coord_values[n - 1];
    if coord < first - COORD_TOLERANCE || coord > last + COORD_TOLERANCE {
        return None;
    }
    if n == 1 {
        return Some(0.0);
    }

    let coord = coord.clamp(first, last);
    let above = coord_values.partition_point(|&v| v <= coord);
    let i0 = above.saturating_sub(1).min(n - 2);
    let fraction = (coord - coord_values[i0]) / (coord_values[i0 + 1] - coord_values[i0]);

    Some(i0 as f64 + fraction.clamp(0.0, 1.0))
}

/// Index of the coordinate closest to `coord` (ties go to the lower index)
pub fn nearest_index(coord: f64, coord_values: &[f64]) -> usize {
    let n = coord_values.len();
    if n < 2 {
        return 0;
    }
    let above = coord_values.partition_point(|&v| v < coord);
    if above == 0 {
        return 0;
    }
    if above >= n {
        return n - 1;
    }
    let below_dist = coord - coord_values[above - 1];
    let above_dist = coord_values[above] - coord;
    if below_dist <= above_dist {
        above - 1
    } else {
        above
    }
}

/// Clamp an index to valid bounds
pub fn clamp_index(index: f64, size: usize) -> f64 {
    index.max(0.0).min((size - 1) as f64)
}

/// Split a fractional index into its base cell and the offset inside it.
///
/// The base index leaves room for a right neighbour whenever the axis has
/// more than one point.
pub fn split_index(index: f64, size: usize) -> (usize, f64) {
    if size < 2 {
        return (0, 0.0);
    }
    let index = clamp_index(index, size);
    let base = (index.floor() as usize).min(size - 2);
    (base, index - base as f64)
}

/// Get the weight for linear interpolation
pub fn linear_weight(fraction: f64) -> (f64, f64) {
    (1.0 - fraction, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(-1.0, 10), 0.0);
        assert_eq!(clamp_index(5.5, 10), 5.5);
        assert_eq!(clamp_index(15.0, 10), 9.0);
    }

    #[test]
    fn test_linear_weight() {
        let (w0, w1) = linear_weight(0.3);
        assert!((w0 - 0.7).abs() < 1e-10);
        assert!((w1 - 0.3).abs() < 1e-10);
        assert!((w0 + w1 - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_coord_to_index() {
        let coords = [-60.0, -59.75, -59.5];
        assert_eq!(coord_to_index(-60.0, &coords), Some(0.0));
        assert_eq!(coord_to_index(-59.5, &coords), Some(2.0));
        assert!((coord_to_index(-59.625, &coords).unwrap() - 1.5).abs() < 1e-12);
        assert_eq!(coord_to_index(-60.1, &coords), None);
        assert_eq!(coord_to_index(-59.4, &coords), None);
        assert_eq!(coord_to_index(f64::NAN, &coords), None);
    }

    #[test]
    fn test_coord_to_index_single_point_axis() {
        assert_eq!(coord_to_index(-35.0, &[-35.0]), Some(0.0));
        assert_eq!(coord_to_index(-34.9, &[-35.0]), None);
    }

    #[test]
    fn test_nearest_index() {
        let coords = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(-5.0, &coords), 0);
        assert_eq!(nearest_index(0.5, &coords), 0);
        assert_eq!(nearest_index(0.51, &coords), 1);
        assert_eq!(nearest_index(2.9, &coords), 3);
        assert_eq!(nearest_index(99.0, &coords), 3);
        assert_eq!(nearest_index(7.0, &[1.0]), 0);
    }

    #[test]
    fn test_split_index() {
        assert_eq!(split_index(0.0, 1), (0, 0.0));
        assert_eq!(split_index(2.0, 3), (1, 1.0));
        let (base, frac) = split_index(0.25, 3);
        assert_eq!(base, 0);
        assert!((frac - 0.25).abs() < 1e-12);
    }
}
