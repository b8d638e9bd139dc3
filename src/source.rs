//! In-memory source field and coordinate naming conventions.
//!
//! A [`SourceField`] is the 2-D slice of a gridded dataset that the
//! interpolation engine reads from: monotonic longitude/latitude axes and a
//! `[lat, lon]` array of elevations. Missing samples are stored as NaN.
//! Elevations follow the source convention, negative below sea level.

use ndarray::{concatenate, s, Array2, Axis};
use serde::Serialize;

use crate::error::{PomGridError, Result};
use crate::grid::mean_step;

/// Tolerance for coordinate comparisons, in degrees
pub const COORD_TOLERANCE: f64 = 1e-9;

/// A pair of coordinate variable names used by some family of datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordinateConvention {
    pub lon: &'static str,
    pub lat: &'static str,
}

/// Known coordinate naming conventions, tried in this order; first match wins.
pub const COORDINATE_CONVENTIONS: &[CoordinateConvention] = &[
    CoordinateConvention {
        lon: "lon",
        lat: "lat",
    },
    CoordinateConvention {
        lon: "longitude",
        lat: "latitude",
    },
    CoordinateConvention {
        lon: "xt_ocean",
        lat: "yt_ocean",
    },
    CoordinateConvention {
        lon: "x",
        lat: "y",
    },
    CoordinateConvention {
        lon: "nav_lon",
        lat: "nav_lat",
    },
];

/// Data variable names tried when none is given explicitly.
/// Bathymetry names come first, then reanalysis ocean fields.
pub const DATA_VARIABLE_CANDIDATES: &[&str] = &[
    "elevation", "Band1", "z", "depth", "eta_t", "ssh", "zos", "temp", "salt", "u", "v",
];

/// Dimensions that index time steps
pub const TIME_DIMENSIONS: &[&str] = &["time", "Time", "t"];

/// Dimensions that index vertical levels; the surface (index 0) is used
pub const LEVEL_DIMENSIONS: &[&str] = &["depth", "st_ocean", "lev", "z", "level"];

impl CoordinateConvention {
    /// Pick the first convention whose two names are both available.
    pub fn detect<F>(has_variable: F) -> Result<CoordinateConvention>
    where
        F: Fn(&str) -> bool,
    {
        COORDINATE_CONVENTIONS
            .iter()
            .copied()
            .find(|c| has_variable(c.lon) && has_variable(c.lat))
            .ok_or_else(|| PomGridError::SourceFormat {
                message: format!(
                    "no coordinate variables found; tried {}",
                    COORDINATE_CONVENTIONS
                        .iter()
                        .map(|c| format!("{}/{}", c.lon, c.lat))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

/// A rectangular field of elevation samples on monotonic axes
#[derive(Debug, Clone)]
pub struct SourceField {
    name: String,
    lons: Vec<f64>,
    lats: Vec<f64>,
    values: Array2<f64>,
}

impl SourceField {
    /// Create a field from axes and a `[lat, lon]` array.
    ///
    /// Axes may be strictly increasing or strictly decreasing; decreasing
    /// axes are reversed together with the data so the stored axes always
    /// increase.
    pub fn new(
        name: impl Into<String>,
        mut lons: Vec<f64>,
        mut lats: Vec<f64>,
        mut values: Array2<f64>,
    ) -> Result<Self> {
        let name = name.into();

        if lons.is_empty() || lats.is_empty() {
            return Err(PomGridError::SourceFormat {
                message: format!("field {} has an empty coordinate axis", name),
            });
        }

        if values.dim() != (lats.len(), lons.len()) {
            return Err(PomGridError::SourceFormat {
                message: format!(
                    "field {} has shape {:?} but axes are {} lat x {} lon",
                    name,
                    values.dim(),
                    lats.len(),
                    lons.len()
                ),
            });
        }

        if is_decreasing(&lons) {
            lons.reverse();
            values.invert_axis(Axis(1));
        }
        if is_decreasing(&lats) {
            lats.reverse();
            values.invert_axis(Axis(0));
        }

        for (axis, coords) in [("lon", &lons), ("lat", &lats)] {
            if !is_increasing(coords) {
                return Err(PomGridError::SourceFormat {
                    message: format!("{} axis of field {} is not monotonic", axis, name),
                });
            }
        }

        Ok(Self {
            name,
            lons,
            lats,
            values: values.as_standard_layout().to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Whether a sample carries the no-data convention
    pub fn is_no_data(value: f64) -> bool {
        !value.is_finite()
    }

    pub fn lon_range(&self) -> (f64, f64) {
        (self.lons[0], self.lons[self.lons.len() - 1])
    }

    pub fn lat_range(&self) -> (f64, f64) {
        (self.lats[0], self.lats[self.lats.len() - 1])
    }

    /// Approximate memory held by the sample array
    pub fn size_bytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<f64>()
    }

    /// Whether the longitude axis wraps the whole globe
    pub fn is_global_lon(&self) -> bool {
        let step = mean_step(&self.lons);
        let (lo, hi) = self.lon_range();
        step > 0.0 && hi - lo + step >= 360.0 - step * 0.5
    }

    /// Add wrap columns on both sides of a global longitude axis so that
    /// points between the last and the first meridian can be interpolated.
    pub fn with_periodic_longitude(self) -> Self {
        if !self.is_global_lon() {
            return self;
        }

        let n = self.lons.len();
        let (lo, hi) = self.lon_range();
        let prepend = hi - 360.0 < lo - COORD_TOLERANCE;
        let append = lo + 360.0 > hi + COORD_TOLERANCE;

        let mut lons = Vec::with_capacity(n + 2);
        if prepend {
            lons.push(hi - 360.0);
        }
        lons.extend_from_slice(&self.lons);
        if append {
            lons.push(lo + 360.0);
        }

        let values = {
            let mut columns = Vec::with_capacity(3);
            if prepend {
                columns.push(self.values.slice(s![.., n - 1..n]));
            }
            columns.push(self.values.view());
            if append {
                columns.push(self.values.slice(s![.., 0..1]));
            }
            concatenate(Axis(1), &columns)
        };
        let values = match values {
            Ok(values) => values,
            Err(_) => return self,
        };

        Self {
            name: self.name,
            lons,
            lats: self.lats,
            values,
        }
    }

    /// Shift a longitude by ±360° when that brings it inside the source range.
    pub fn normalize_lon(&self, lon: f64) -> f64 {
        let (lo, hi) = self.lon_range();
        let inside = |x: f64| x >= lo - COORD_TOLERANCE && x <= hi + COORD_TOLERANCE;
        if inside(lon) {
            return lon;
        }
        [lon + 360.0, lon - 360.0]
            .into_iter()
            .find(|&x| inside(x))
            .unwrap_or(lon)
    }
}

fn is_increasing(coords: &[f64]) -> bool {
    coords.iter().all(|v| v.is_finite()) && coords.windows(2).all(|w| w[1] > w[0])
}

fn is_decreasing(coords: &[f64]) -> bool {
    coords.len() > 1 && coords.windows(2).all(|w| w[1] < w[0])
}
