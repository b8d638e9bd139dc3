//! Assertion utilities for testing.
//!
//! Floating-point comparisons plus a few grid-level checks.

#![allow(dead_code)]

use pomgrid::DepthGrid;

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Assert that two floating-point values are approximately equal.
///
/// # Panics
///
/// Panics if the absolute difference between `actual` and `expected` is greater than `epsilon`.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that two arrays of floating-point values are approximately element-wise equal.
pub fn assert_array_approx_eq(actual: &[f64], expected: &[f64], epsilon: Option<f64>) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Arrays have different lengths: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );

    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (a - e).abs();
        assert!(
            diff <= eps,
            "Arrays differ at index {}: actual = {}, expected = {}, diff = {}, epsilon = {}",
            i,
            a,
            e,
            diff,
            eps
        );
    }
}

/// Assert that no cell of `after` is ocean where `before` was land.
pub fn assert_no_new_ocean(before: &DepthGrid, after: &DepthGrid) {
    for row in 0..before.n_rows() {
        for col in 0..before.n_cols() {
            let (b, a) = (before.depth_at(col, row), after.depth_at(col, row));
            if b == Some(0.0) {
                assert_eq!(a, Some(0.0), "cell ({}, {}) turned from land to ocean", col, row);
            }
        }
    }
}

/// Assert that every depth in the grid is either no-data or non-negative.
pub fn assert_depths_valid(grid: &DepthGrid) {
    for &d in grid.depth().iter() {
        assert!(
            d == pomgrid::NO_DATA || d >= 0.0,
            "invalid depth value {}",
            d
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(1.0, 1.0000001, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
    }

    #[test]
    fn test_assert_array_approx_eq() {
        assert_array_approx_eq(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], None);
        assert_array_approx_eq(&[1.0, 2.0, 3.0], &[1.001, 2.001, 3.001], Some(0.01));
    }
}
