//! Ocean/land masks.
//!
//! A [`MaskGrid`] classifies every point of its own regular grid as ocean,
//! land or no-data. Fine masks are extracted from a reanalysis field
//! ([`extract`]), degraded to the model resolution ([`aggregate`]) and merged
//! into a depth grid ([`apply`]).

pub mod aggregate;
pub mod apply;
pub mod extract;

use ndarray::Array2;
use serde::Serialize;

use crate::error::{PomGridError, Result};
use crate::grid::{mean_step, TargetGrid};

pub use aggregate::aggregate;
pub use apply::{apply_mask, MaskApplication};
pub use extract::extract_mask;

/// Classification of one mask cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MaskCell {
    Land,
    Ocean,
    NoData,
}

impl MaskCell {
    /// Value written to mask files: 1 ocean, 0 land, -1 no-data
    pub fn file_value(self) -> i32 {
        match self {
            MaskCell::Ocean => 1,
            MaskCell::Land => 0,
            MaskCell::NoData => -1,
        }
    }

    /// Parse a mask file value; any negative value is no-data
    pub fn from_file_value(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(PomGridError::invalid_parameter(
                "mask",
                format!("mask value {} is not a number", value),
            ));
        }
        if value < 0.0 {
            Ok(MaskCell::NoData)
        } else if value >= 0.5 {
            Ok(MaskCell::Ocean)
        } else {
            Ok(MaskCell::Land)
        }
    }

    pub fn is_ocean(self) -> bool {
        self == MaskCell::Ocean
    }

    pub fn is_land(self) -> bool {
        self == MaskCell::Land
    }
}

/// Longitude convention of a coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LonConvention {
    /// [-180, 180)
    Signed,
    /// [0, 360)
    Positive,
}

impl LonConvention {
    /// Any longitude beyond 180° means the axis uses [0, 360)
    pub fn detect(lons: &[f64]) -> Self {
        if lons.iter().any(|&lon| lon > 180.0) {
            LonConvention::Positive
        } else {
            LonConvention::Signed
        }
    }

    /// Express `lon` in this convention
    pub fn convert(self, lon: f64) -> f64 {
        match self {
            LonConvention::Positive if lon < 0.0 => lon + 360.0,
            LonConvention::Signed if lon > 180.0 => lon - 360.0,
            _ => lon,
        }
    }
}

/// Mask summary counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaskStatistics {
    pub total: usize,
    pub ocean: usize,
    pub land: usize,
    pub no_data: usize,
}

/// Ternary ocean/land mask on a regular grid, indexed `[row, col]`
#[derive(Debug, Clone, PartialEq)]
pub struct MaskGrid {
    lons: Vec<f64>,
    lats: Vec<f64>,
    cells: Array2<MaskCell>,
}

impl MaskGrid {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, cells: Array2<MaskCell>) -> Result<Self> {
        TargetGrid::from_axes(lons.clone(), lats.clone())?;

        if cells.dim() != (lats.len(), lons.len()) {
            return Err(PomGridError::invalid_parameter(
                "mask",
                format!(
                    "mask array has shape {:?} but grid is {} rows x {} cols",
                    cells.dim(),
                    lats.len(),
                    lons.len()
                ),
            ));
        }

        Ok(Self { lons, lats, cells })
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn cells(&self) -> &Array2<MaskCell> {
        &self.cells
    }

    pub fn n_cols(&self) -> usize {
        self.lons.len()
    }

    pub fn n_rows(&self) -> usize {
        self.lats.len()
    }

    /// Cell at a 0-based `(col, row)` position
    pub fn cell(&self, col: usize, row: usize) -> Option<MaskCell> {
        self.cells.get([row, col]).copied()
    }

    pub fn spacing_lon(&self) -> f64 {
        mean_step(&self.lons)
    }

    pub fn spacing_lat(&self) -> f64 {
        mean_step(&self.lats)
    }

    pub fn lon_convention(&self) -> LonConvention {
        LonConvention::detect(&self.lons)
    }

    /// Whether the mask's longitudes wrap the whole globe
    pub fn is_global_lon(&self) -> bool {
        let step = self.spacing_lon();
        step > 0.0 && self.lons[self.lons.len() - 1] - self.lons[0] + step >= 360.0 - step * 0.5
    }

    pub fn statistics(&self) -> MaskStatistics {
        let mut stats = MaskStatistics {
            total: self.cells.len(),
            ocean: 0,
            land: 0,
            no_data: 0,
        };
        for cell in self.cells.iter() {
            match cell {
                MaskCell::Ocean => stats.ocean += 1,
                MaskCell::Land => stats.land += 1,
                MaskCell::NoData => stats.no_data += 1,
            }
        }
        stats
    }
}
