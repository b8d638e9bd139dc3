//! Resolved depth grid and its statistics.
//!
//! A [`DepthGrid`] holds one depth per target grid point using the model
//! convention: `depth > 0` is ocean, `depth == 0` is land, and
//! [`NO_DATA`] marks points that could not be resolved.
//!
//! The grid has a single logical owner. Nothing here guards against
//! concurrent edits; callers that share a grid across threads must serialize
//! writers themselves (see [`crate::state::GridSession`]).

use ndarray::Array2;
use serde::Serialize;

use crate::error::{PomGridError, Result};
use crate::grid::{GridSpacing, TargetGrid};

/// Sentinel depth for unresolved points
pub const NO_DATA: f64 = -9999.0;

/// Whether a depth value is ocean
pub fn is_ocean(depth: f64) -> bool {
    depth > 0.0
}

/// Whether a depth value is the no-data sentinel (or not a number at all)
pub fn is_no_data(depth: f64) -> bool {
    !depth.is_finite() || depth == NO_DATA
}

/// Whether a depth value is land
pub fn is_land(depth: f64) -> bool {
    !is_ocean(depth) && !is_no_data(depth)
}

/// Summary of a depth grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridStatistics {
    pub total_points: usize,
    pub ocean_points: usize,
    pub land_points: usize,
    pub no_data_points: usize,
    /// Share of resolved points that are ocean, in percent
    pub ocean_percent: f64,
    /// Share of resolved points that are land, in percent
    pub land_percent: f64,
    /// Depth statistics over ocean points (0 when there is no ocean)
    pub min_depth: f64,
    pub max_depth: f64,
    pub mean_depth: f64,
}

/// Depths on a regular grid, indexed `[row, col]` (south to north, west to east)
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    lons: Vec<f64>,
    lats: Vec<f64>,
    depth: Array2<f64>,
    /// Free-form comment lines persisted as `#` headers
    metadata: Vec<String>,
}

impl DepthGrid {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, depth: Array2<f64>) -> Result<Self> {
        // Validates the axes
        TargetGrid::from_axes(lons.clone(), lats.clone())?;

        if depth.dim() != (lats.len(), lons.len()) {
            return Err(PomGridError::invalid_parameter(
                "depth",
                format!(
                    "depth array has shape {:?} but grid is {} rows x {} cols",
                    depth.dim(),
                    lats.len(),
                    lons.len()
                ),
            ));
        }

        Ok(Self {
            lons,
            lats,
            depth,
            metadata: Vec::new(),
        })
    }

    pub fn from_target(target: &TargetGrid, depth: Array2<f64>) -> Result<Self> {
        Self::new(target.lons.clone(), target.lats.clone(), depth)
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn depth(&self) -> &Array2<f64> {
        &self.depth
    }

    pub fn n_cols(&self) -> usize {
        self.lons.len()
    }

    pub fn n_rows(&self) -> usize {
        self.lats.len()
    }

    /// Depth at a 0-based `(col, row)` position
    pub fn depth_at(&self, col: usize, row: usize) -> Option<f64> {
        self.depth.get([row, col]).copied()
    }

    pub(crate) fn set_depth(&mut self, col: usize, row: usize, value: f64) -> Result<()> {
        let cell = self.depth.get_mut([row, col]).ok_or_else(|| {
            PomGridError::invalid_parameter(
                "cell",
                format!(
                    "({}, {}) outside grid of {} cols x {} rows",
                    col,
                    row,
                    self.lons.len(),
                    self.lats.len()
                ),
            )
        })?;
        *cell = value;
        Ok(())
    }

    pub fn spacing(&self) -> GridSpacing {
        GridSpacing::new(
            crate::grid::mean_step(&self.lons),
            crate::grid::mean_step(&self.lats),
        )
    }

    pub fn metadata(&self) -> &[String] {
        &self.metadata
    }

    pub fn push_metadata(&mut self, line: impl Into<String>) {
        self.metadata.push(line.into());
    }

    pub fn with_metadata(mut self, lines: Vec<String>) -> Self {
        self.metadata = lines;
        self
    }

    /// The grid's axes as a target grid
    pub fn target_grid(&self) -> Result<TargetGrid> {
        TargetGrid::from_axes(self.lons.clone(), self.lats.clone())
    }

    pub fn statistics(&self) -> GridStatistics {
        let mut ocean_points = 0usize;
        let mut land_points = 0usize;
        let mut no_data_points = 0usize;
        let mut min_depth = f64::INFINITY;
        let mut max_depth = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for &d in self.depth.iter() {
            if is_no_data(d) {
                no_data_points += 1;
            } else if is_ocean(d) {
                ocean_points += 1;
                min_depth = min_depth.min(d);
                max_depth = max_depth.max(d);
                sum += d;
            } else {
                land_points += 1;
            }
        }

        let resolved = ocean_points + land_points;
        let percent = |n: usize| {
            if resolved == 0 {
                0.0
            } else {
                100.0 * n as f64 / resolved as f64
            }
        };

        GridStatistics {
            total_points: self.depth.len(),
            ocean_points,
            land_points,
            no_data_points,
            ocean_percent: percent(ocean_points),
            land_percent: percent(land_points),
            min_depth: if ocean_points > 0 { min_depth } else { 0.0 },
            max_depth: if ocean_points > 0 { max_depth } else { 0.0 },
            mean_depth: if ocean_points > 0 {
                sum / ocean_points as f64
            } else {
                0.0
            },
        }
    }
}
