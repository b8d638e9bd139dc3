//! Target grid construction.
//!
//! A [`TargetGrid`] is a pair of strictly increasing coordinate axes built
//! from a bounding box and independent longitude/latitude spacing. Column
//! index `i` grows eastward and row index `j` grows northward, so `(0, 0)` is
//! the south-west corner.
//!
//! Axis cardinality is `floor((max - min) / spacing) + 1`. When the spacing
//! does not divide the extent evenly, the last point falls short of `max`
//! instead of overshooting it; the extent is never stretched to fit.

use serde::{Deserialize, Serialize};

use crate::error::{PomGridError, Result};

/// Tolerance used when counting steps so that `1.0 / 0.1` counts 10 steps.
const STEP_EPSILON: f64 = 1e-9;

/// Coordinates are rounded to this many decimal places.
const COORD_DECIMALS: i32 = 10;

/// Largest grid [`TargetGrid::build`] will allocate.
pub const DEFAULT_MAX_GRID_POINTS: usize = 50_000_000;

/// Geographic bounding box in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridExtent {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl GridExtent {
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self> {
        let extent = GridExtent {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        };
        extent.validate()?;
        Ok(extent)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("lon_min", self.lon_min),
            ("lon_max", self.lon_max),
            ("lat_min", self.lat_min),
            ("lat_max", self.lat_max),
        ] {
            if !value.is_finite() {
                return Err(PomGridError::invalid_extent(
                    name,
                    format!("{} is not a finite number", value),
                ));
            }
        }

        if !(-180.0..=360.0).contains(&self.lon_min) || !(-180.0..=360.0).contains(&self.lon_max) {
            return Err(PomGridError::invalid_extent(
                "lon",
                format!(
                    "longitudes must lie in [-180, 360], got [{}, {}]",
                    self.lon_min, self.lon_max
                ),
            ));
        }

        if !(-90.0..=90.0).contains(&self.lat_min) || !(-90.0..=90.0).contains(&self.lat_max) {
            return Err(PomGridError::invalid_extent(
                "lat",
                format!(
                    "latitudes must lie in [-90, 90], got [{}, {}]",
                    self.lat_min, self.lat_max
                ),
            ));
        }

        if self.lon_min >= self.lon_max {
            return Err(PomGridError::invalid_extent(
                "lon_min",
                format!(
                    "lon_min ({}) must be less than lon_max ({})",
                    self.lon_min, self.lon_max
                ),
            ));
        }

        if self.lat_min >= self.lat_max {
            return Err(PomGridError::invalid_extent(
                "lat_min",
                format!(
                    "lat_min ({}) must be less than lat_max ({})",
                    self.lat_min, self.lat_max
                ),
            ));
        }

        Ok(())
    }

    /// Grow the box by `margin` degrees on every side
    pub fn expanded(&self, margin: f64) -> GridExtent {
        GridExtent {
            lon_min: self.lon_min - margin,
            lon_max: self.lon_max + margin,
            lat_min: self.lat_min - margin,
            lat_max: self.lat_max + margin,
        }
    }
}

/// Independent grid spacing along each axis, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpacing {
    pub lon: f64,
    pub lat: f64,
}

impl GridSpacing {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn uniform(spacing: f64) -> Self {
        Self {
            lon: spacing,
            lat: spacing,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("spacing_lon", self.lon), ("spacing_lat", self.lat)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PomGridError::invalid_extent(
                    name,
                    format!("spacing must be a positive number, got {}", value),
                ));
            }
        }
        Ok(())
    }
}

impl Default for GridSpacing {
    fn default() -> Self {
        Self::uniform(0.25)
    }
}

/// A regular rectangular grid of target points
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    /// Column coordinates, strictly increasing (west to east)
    pub lons: Vec<f64>,
    /// Row coordinates, strictly increasing (south to north)
    pub lats: Vec<f64>,
    /// Spacing used to build the axes
    pub spacing: GridSpacing,
    /// Requested bounding box
    pub extent: GridExtent,
}

impl TargetGrid {
    /// Build the grid covering `extent` at the given spacing.
    pub fn build(extent: GridExtent, spacing: GridSpacing) -> Result<Self> {
        Self::build_with_limit(extent, spacing, DEFAULT_MAX_GRID_POINTS)
    }

    /// Build the grid, failing with `ResourceExhausted` before allocating
    /// anything when it would hold more than `max_points` points.
    pub fn build_with_limit(
        extent: GridExtent,
        spacing: GridSpacing,
        max_points: usize,
    ) -> Result<Self> {
        extent.validate()?;
        spacing.validate()?;

        let n_lon = axis_len(extent.lon_min, extent.lon_max, spacing.lon, max_points)?;
        let n_lat = axis_len(extent.lat_min, extent.lat_max, spacing.lat, max_points)?;
        if n_lon.checked_mul(n_lat).map_or(true, |n| n > max_points) {
            return Err(PomGridError::ResourceExhausted {
                message: format!(
                    "target grid of {} x {} points exceeds the limit of {} points",
                    n_lon, n_lat, max_points
                ),
            });
        }

        let lons = axis_points(extent.lon_min, spacing.lon, n_lon)?;
        let lats = axis_points(extent.lat_min, spacing.lat, n_lat)?;

        Ok(Self {
            lons,
            lats,
            spacing,
            extent,
        })
    }

    /// Wrap pre-existing axes, e.g. those of a grid read back from disk
    pub fn from_axes(lons: Vec<f64>, lats: Vec<f64>) -> Result<Self> {
        check_increasing(&lons, "lon")?;
        check_increasing(&lats, "lat")?;

        let spacing = GridSpacing::new(mean_step(&lons), mean_step(&lats));
        let extent = GridExtent {
            lon_min: lons[0],
            lon_max: lons[lons.len() - 1],
            lat_min: lats[0],
            lat_max: lats[lats.len() - 1],
        };

        Ok(Self {
            lons,
            lats,
            spacing,
            extent,
        })
    }

    pub fn n_cols(&self) -> usize {
        self.lons.len()
    }

    pub fn n_rows(&self) -> usize {
        self.lats.len()
    }

    /// Total number of points, or `None` on overflow
    pub fn n_points(&self) -> Option<usize> {
        self.n_cols().checked_mul(self.n_rows())
    }
}

/// Build one coordinate axis from `min` towards `max`.
pub fn build_axis(min: f64, max: f64, spacing: f64) -> Result<Vec<f64>> {
    let len = axis_len(min, max, spacing, DEFAULT_MAX_GRID_POINTS)?;
    axis_points(min, spacing, len)
}

/// Number of points on the axis from `min` to `max`, at most `limit`.
///
/// The step count is checked as `f64` so that a tiny spacing cannot
/// saturate the conversion to `usize`.
pub fn axis_len(min: f64, max: f64, spacing: f64, limit: usize) -> Result<usize> {
    let steps = ((max - min) / spacing + STEP_EPSILON).floor();
    if !steps.is_finite() || steps < 0.0 || steps >= limit as f64 {
        return Err(PomGridError::ResourceExhausted {
            message: format!(
                "axis from {} to {} at spacing {} needs more than {} points",
                min, max, spacing, limit
            ),
        });
    }
    Ok(steps as usize + 1)
}

fn axis_points(min: f64, spacing: f64, len: usize) -> Result<Vec<f64>> {
    let mut axis = Vec::new();
    axis
        .try_reserve_exact(len)
        .map_err(|e| PomGridError::ResourceExhausted {
            message: format!("cannot allocate axis of {} points: {}", len, e),
        })?;
    axis.extend((0..len).map(|k| round_coord(min + k as f64 * spacing)));
    Ok(axis)
}

/// Round a coordinate to the fixed decimal precision used for grid points
pub fn round_coord(value: f64) -> f64 {
    let scale = 10f64.powi(COORD_DECIMALS);
    (value * scale).round() / scale
}

/// Mean step between consecutive coordinates (0 for axes of length < 2)
pub fn mean_step(coords: &[f64]) -> f64 {
    if coords.len() < 2 {
        return 0.0;
    }
    (coords[coords.len() - 1] - coords[0]) / (coords.len() - 1) as f64
}

fn check_increasing(coords: &[f64], axis: &str) -> Result<()> {
    if coords.is_empty() {
        return Err(PomGridError::invalid_extent(axis, "axis has no points"));
    }
    if coords.windows(2).any(|w| w[1] <= w[0]) {
        return Err(PomGridError::invalid_extent(
            axis,
            "coordinates must be strictly increasing",
        ));
    }
    Ok(())
}
