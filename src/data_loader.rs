//! NetCDF source loading.
//!
//! Opens a gridded dataset, works out which variables hold the coordinates
//! and the data, and reads a 2-D slice of the data into a [`SourceField`].
//! Only the hyperslab covering the requested window is read, which keeps
//! multi-gigabyte bathymetry files manageable.
//!
//! The file handle lives in a [`SourceDataset`] and is released by
//! [`SourceDataset::close`] or, on every other path, when the dataset is
//! dropped.

use netcdf::{AttributeValue as NcAttributeValue, Extent, Variable as NetCDFVariable};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::error::{PomGridError, Result};
use crate::grid::{mean_step, GridExtent};
use crate::logging::log_source_load_stats;
use crate::source::{
    CoordinateConvention, SourceField, COORD_TOLERANCE, DATA_VARIABLE_CANDIDATES,
    LEVEL_DIMENSIONS, TIME_DIMENSIONS,
};

/// Metadata about a NetCDF dimension
#[derive(Debug, Clone, Serialize)]
pub struct Dimension {
    pub name: String,
    pub size: usize,
    pub is_unlimited: bool,
}

/// How a dataset's variables map onto a 2-D field
#[derive(Debug, Clone, Serialize)]
pub struct SourceLayout {
    pub convention: CoordinateConvention,
    /// Dimension indexed by the longitude coordinate
    pub lon_dim: String,
    /// Dimension indexed by the latitude coordinate
    pub lat_dim: String,
    /// Data variable read by [`SourceDataset::read_field`]
    pub variable: String,
    /// Dimensions of the data variable, in file order
    pub dimensions: Vec<Dimension>,
    /// Length of the time dimension, if the variable has one
    pub time_steps: Option<usize>,
}

/// Index range read along one axis
#[derive(Debug, Clone, PartialEq)]
struct AxisWindow {
    start: usize,
    end: usize,
    /// Whether the whole axis is read
    full: bool,
}

/// An open gridded dataset
pub struct SourceDataset {
    path: PathBuf,
    file: Option<netcdf::File>,
    layout: SourceLayout,
    lons: Vec<f64>,
    lats: Vec<f64>,
    fill_values: Vec<f64>,
    scale_factor: f64,
    add_offset: f64,
}

impl SourceDataset {
    /// Open `path` and identify its coordinates and data variable.
    pub fn open(path: &Path, variable: Option<&str>) -> Result<Self> {
        if !path.exists() {
            return Err(PomGridError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = netcdf::open(path)?;
        info!(path = %path.display(), "Opened source dataset");
        debug!(
            variables = file.variables().count(),
            dimensions = file.dimensions().count(),
            "Source dataset contents"
        );

        let convention = CoordinateConvention::detect(|name| file.variable(name).is_some())?;
        let (lons, lon_dim) = read_coordinate(&file, convention.lon, Axis::Lon)?;
        let (lats, lat_dim) = read_coordinate(&file, convention.lat, Axis::Lat)?;
        if lons.is_empty() || lats.is_empty() {
            return Err(PomGridError::SourceFormat {
                message: format!("{} has an empty coordinate axis", path.display()),
            });
        }

        let (variable, dimensions, fill_values, scale_factor, add_offset) = {
            let data_var = find_data_variable(&file, variable, &lon_dim, &lat_dim)?;
            let dimensions: Vec<Dimension> = data_var
                .dimensions()
                .iter()
                .map(|dim| Dimension {
                    name: dim.name(),
                    size: dim.len(),
                    is_unlimited: dim.is_unlimited(),
                })
                .collect();

            let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
                .into_iter()
                .filter_map(|name| numeric_attribute(&data_var, name))
                .collect();
            let scale_factor = numeric_attribute(&data_var, "scale_factor").unwrap_or(1.0);
            let add_offset = numeric_attribute(&data_var, "add_offset").unwrap_or(0.0);

            (data_var.name(), dimensions, fill_values, scale_factor, add_offset)
        };
        let time_steps = dimensions
            .iter()
            .find(|d| TIME_DIMENSIONS.contains(&d.name.as_str()))
            .map(|d| d.size);

        let layout = SourceLayout {
            convention,
            lon_dim,
            lat_dim,
            variable,
            dimensions,
            time_steps,
        };
        info!(
            variable = %layout.variable,
            lon = convention.lon,
            lat = convention.lat,
            n_lon = lons.len(),
            n_lat = lats.len(),
            "Identified source layout"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            layout,
            lons,
            lats,
            fill_values,
            scale_factor,
            add_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Longitudes in file order
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Latitudes in file order
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Read the data variable at `time_index`, restricted to `window` when given.
    ///
    /// A window longitude outside the file's range is shifted by ±360°.
    /// Global files whose window cannot be expressed as one contiguous range
    /// are read in full and wrapped.
    pub fn read_field(&self, time_index: usize, window: Option<&GridExtent>) -> Result<SourceField> {
        let file = self.file.as_ref().ok_or_else(|| PomGridError::SourceFormat {
            message: format!("{} is already closed", self.path.display()),
        })?;
        let var = file
            .variable(&self.layout.variable)
            .ok_or_else(|| PomGridError::SourceFormat {
                message: format!("variable {} disappeared", self.layout.variable),
            })?;

        let start = Instant::now();
        let (lon_window, lat_window) = match window {
            Some(w) => (
                self.lon_window(w.lon_min, w.lon_max),
                axis_window(&self.lats, w.lat_min, w.lat_max),
            ),
            None => (full_window(self.lons.len()), full_window(self.lats.len())),
        };

        let mut extents: Vec<Extent> = Vec::with_capacity(self.layout.dimensions.len());
        let mut lon_pos = None;
        let mut lat_pos = None;
        for (pos, dim) in self.layout.dimensions.iter().enumerate() {
            let name = dim.name.as_str();
            if name == self.layout.lon_dim {
                lon_pos = Some(pos);
                extents.push((lon_window.start..lon_window.end).into());
            } else if name == self.layout.lat_dim {
                lat_pos = Some(pos);
                extents.push((lat_window.start..lat_window.end).into());
            } else if TIME_DIMENSIONS.contains(&name) {
                if time_index >= dim.size {
                    return Err(PomGridError::invalid_parameter(
                        "time_index",
                        format!("{} is out of range for {} time steps", time_index, dim.size),
                    ));
                }
                extents.push(time_index.into());
            } else if LEVEL_DIMENSIONS.contains(&name) || dim.size == 1 {
                extents.push(0usize.into());
            } else {
                return Err(PomGridError::SourceFormat {
                    message: format!(
                        "variable {} has unsupported dimension {} of size {}",
                        self.layout.variable, name, dim.size
                    ),
                });
            }
        }

        let (Some(lon_pos), Some(lat_pos)) = (lon_pos, lat_pos) else {
            return Err(PomGridError::SourceFormat {
                message: format!(
                    "variable {} does not span {} and {}",
                    self.layout.variable, self.layout.lon_dim, self.layout.lat_dim
                ),
            });
        };

        let raw: Vec<f64> = var.get_values::<f64, _>(extents.as_slice())?;
        let n_lon = lon_window.end - lon_window.start;
        let n_lat = lat_window.end - lat_window.start;

        let values: Vec<f64> = raw
            .into_iter()
            .map(|v| {
                if !v.is_finite() || self.fill_values.iter().any(|&f| v == f) {
                    f64::NAN
                } else {
                    v * self.scale_factor + self.add_offset
                }
            })
            .collect();

        let values = if lat_pos < lon_pos {
            ndarray::Array2::from_shape_vec((n_lat, n_lon), values)
        } else {
            ndarray::Array2::from_shape_vec((n_lon, n_lat), values).map(|a| a.reversed_axes())
        }
        .map_err(|e| PomGridError::SourceFormat {
            message: format!("unexpected shape reading {}: {}", self.layout.variable, e),
        })?;

        let lons = self.lons[lon_window.start..lon_window.end].to_vec();
        let lats = self.lats[lat_window.start..lat_window.end].to_vec();
        let mut field = SourceField::new(self.layout.variable.clone(), lons, lats, values)?;
        if lon_window.full {
            field = field.with_periodic_longitude();
        }

        log_source_load_stats(
            &self.path.display().to_string(),
            field.name(),
            field.lons().len(),
            field.lats().len(),
            field.size_bytes(),
            start,
        );
        Ok(field)
    }

    /// Release the file handle
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "Closed source dataset");
        }
    }

    fn lon_window(&self, lo: f64, hi: f64) -> AxisWindow {
        let (first, last) = (self.lons[0], self.lons[self.lons.len() - 1]);
        let (s_lo, s_hi) = (first.min(last), first.max(last));

        for shift in [0.0, 360.0, -360.0] {
            if lo + shift >= s_lo - COORD_TOLERANCE && hi + shift <= s_hi + COORD_TOLERANCE {
                return axis_window(&self.lons, lo + shift, hi + shift);
            }
        }

        let step = mean_step(&self.lons).abs();
        let global = step > 0.0 && s_hi - s_lo + step >= 360.0 - step * 0.5;
        if global {
            return full_window(self.lons.len());
        }

        // Partial overlap: read what the file has, the engine reports the rest
        [0.0, 360.0, -360.0]
            .into_iter()
            .map(|shift| axis_window(&self.lons, lo + shift, hi + shift))
            .max_by_key(|w| w.end - w.start)
            .unwrap_or_else(|| full_window(self.lons.len()))
    }
}

impl Drop for SourceDataset {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open `path`, read one field and close the file again.
///
/// The window is grown by `margin` degrees so interpolation stencils near
/// the edge of the target grid still find their neighbours.
pub fn load_source_field(
    path: &Path,
    config: &SourceConfig,
    window: Option<&GridExtent>,
    margin: f64,
) -> Result<SourceField> {
    let mut dataset = SourceDataset::open(path, config.variable.as_deref())?;
    let window = window.map(|w| w.expanded(margin));
    let field = dataset.read_field(config.time_index, window.as_ref());
    dataset.close();
    field
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Lon,
    Lat,
}

fn full_window(len: usize) -> AxisWindow {
    AxisWindow {
        start: 0,
        end: len,
        full: true,
    }
}

/// Contiguous index range of a monotonic axis covering `[lo, hi]`, padded by
/// one sample on each side. An empty intersection yields the single nearest
/// sample so the caller can still report which points fell outside.
fn axis_window(coords: &[f64], lo: f64, hi: f64) -> AxisWindow {
    let inside: Vec<usize> = coords
        .iter()
        .enumerate()
        .filter(|(_, &c)| c >= lo - COORD_TOLERANCE && c <= hi + COORD_TOLERANCE)
        .map(|(i, _)| i)
        .collect();

    let (start, end) = match (inside.first(), inside.last()) {
        (Some(&first), Some(&last)) => (first.saturating_sub(1), (last + 2).min(coords.len())),
        _ => {
            let centre = (lo + hi) / 2.0;
            let nearest = coords
                .iter()
                .enumerate()
                .min_by(|a, b| (a.1 - centre).abs().total_cmp(&(b.1 - centre).abs()))
                .map(|(i, _)| i)
                .unwrap_or(0);
            (nearest, nearest + 1)
        }
    };

    AxisWindow {
        start,
        end,
        full: start == 0 && end == coords.len(),
    }
}

/// Read a coordinate variable; 2-D (curvilinear-style) coordinates are
/// reduced to their first row or column.
fn read_coordinate(file: &netcdf::File, name: &str, axis: Axis) -> Result<(Vec<f64>, String)> {
    let var = file.variable(name).ok_or_else(|| PomGridError::SourceFormat {
        message: format!("coordinate variable {} not found", name),
    })?;
    let dims = var.dimensions();
    let all: Vec<Extent> = dims.iter().map(|_| (..).into()).collect();
    let values: Vec<f64> = var.get_values::<f64, _>(all.as_slice())?;

    match (dims.len(), axis) {
        (1, _) => Ok((values, dims[0].name())),
        (2, Axis::Lon) => {
            let nx = dims[1].len();
            Ok((values.into_iter().take(nx).collect(), dims[1].name()))
        }
        (2, Axis::Lat) => {
            let nx = dims[1].len().max(1);
            Ok((values.into_iter().step_by(nx).collect(), dims[0].name()))
        }
        (n, _) => Err(PomGridError::SourceFormat {
            message: format!("coordinate variable {} has {} dimensions", name, n),
        }),
    }
}

fn find_data_variable<'f>(
    file: &'f netcdf::File,
    explicit: Option<&str>,
    lon_dim: &str,
    lat_dim: &str,
) -> Result<NetCDFVariable<'f>> {
    let spans = |var: &NetCDFVariable| {
        let names: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        names.iter().any(|n| n == lon_dim) && names.iter().any(|n| n == lat_dim)
    };

    if let Some(name) = explicit {
        let var = file.variable(name).ok_or_else(|| PomGridError::SourceFormat {
            message: format!("data variable {} not found", name),
        })?;
        if !spans(&var) {
            return Err(PomGridError::SourceFormat {
                message: format!("variable {} does not span {} and {}", name, lon_dim, lat_dim),
            });
        }
        return Ok(var);
    }

    for name in DATA_VARIABLE_CANDIDATES {
        if let Some(var) = file.variable(name) {
            if spans(&var) {
                return Ok(var);
            }
        }
    }

    if let Some(var) = file.variables().find(|v| spans(v)) {
        warn!(variable = %var.name(), "No known data variable name, using first 2-D variable");
        return Ok(var);
    }

    Err(PomGridError::SourceFormat {
        message: format!(
            "no data variable spans {} and {}; tried {}",
            lon_dim,
            lat_dim,
            DATA_VARIABLE_CANDIDATES.join(", ")
        ),
    })
}

/// Scalar numeric attribute as f64
fn numeric_attribute(var: &NetCDFVariable, name: &str) -> Option<f64> {
    let value = var.attribute(name)?.value().ok()?;
    match value {
        NcAttributeValue::Uchar(v) => Some(v as f64),
        NcAttributeValue::Schar(v) => Some(v as f64),
        NcAttributeValue::Ushort(v) => Some(v as f64),
        NcAttributeValue::Short(v) => Some(v as f64),
        NcAttributeValue::Uint(v) => Some(v as f64),
        NcAttributeValue::Int(v) => Some(v as f64),
        NcAttributeValue::Float(v) => Some(v as f64),
        NcAttributeValue::Double(v) => Some(v),
        NcAttributeValue::Floats(v) => v.first().map(|&x| x as f64),
        NcAttributeValue::Doubles(v) => v.first().copied(),
        NcAttributeValue::Shorts(v) => v.first().map(|&x| x as f64),
        NcAttributeValue::Ints(v) => v.first().map(|&x| x as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// GEBCO-style file: `lat` stored north to south, `elevation` with a
    /// missing value marker
    fn create_bathymetry_file(path: &Path) -> std::result::Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;
        file.add_dimension("lon", 8)?;
        file.add_dimension("lat", 6)?;
        file.add_attribute("title", "Bathymetry test grid")?;

        let lons: Vec<f64> = (0..8).map(|i| -62.0 + i as f64 * 0.5).collect();
        let lats: Vec<f64> = (0..6).map(|j| -33.0 - j as f64 * 0.5).collect();
        let mut values = Vec::with_capacity(48);
        for j in 0..6 {
            for i in 0..8 {
                values.push(if i == 7 && j == 0 {
                    -32767.0f32
                } else {
                    -100.0 * (i as f32 + 1.0) + 10.0 * j as f32
                });
            }
        }

        {
            let mut var = file.add_variable::<f64>("lon", &["lon"])?;
            var.put_attribute("units", "degrees_east")?;
            var.put_values(&lons, &[..])?;
        }
        {
            let mut var = file.add_variable::<f64>("lat", &["lat"])?;
            var.put_attribute("units", "degrees_north")?;
            var.put_values(&lats, &[..])?;
        }
        {
            let mut var = file.add_variable::<f32>("elevation", &["lat", "lon"])?;
            var.put_attribute("units", "m")?;
            var.put_attribute("missing_value", -32767.0f32)?;
            var.put_values(&values, &[.., ..])?;
        }
        Ok(())
    }

    /// Reanalysis-style file with time and depth dimensions and lon before lat
    fn create_reanalysis_file(path: &Path) -> std::result::Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;
        file.add_dimension("Time", 2)?;
        file.add_dimension("st_ocean", 3)?;
        file.add_dimension("xt_ocean", 4)?;
        file.add_dimension("yt_ocean", 2)?;

        {
            let mut var = file.add_variable::<f64>("xt_ocean", &["xt_ocean"])?;
            var.put_values(&[300.0, 300.25, 300.5, 300.75], &[..])?;
        }
        {
            let mut var = file.add_variable::<f64>("yt_ocean", &["yt_ocean"])?;
            var.put_values(&[-30.0, -29.75], &[..])?;
        }
        {
            // [Time, st_ocean, xt_ocean, yt_ocean]
            let mut values = vec![0.0f32; 2 * 3 * 4 * 2];
            for t in 0..2 {
                for x in 0..4 {
                    for y in 0..2 {
                        let idx = ((t * 3) * 4 + x) * 2 + y;
                        values[idx] = (t * 100 + x * 10 + y) as f32;
                    }
                }
            }
            // Land at (x=0, y=1) in every time step
            values[1] = 1.0e20;
            values[3 * 4 * 2 + 1] = 1.0e20;

            let mut var =
                file.add_variable::<f32>("temp", &["Time", "st_ocean", "xt_ocean", "yt_ocean"])?;
            var.put_attribute("_FillValue", 1.0e20f32)?;
            var.put_values(&values, &[.., .., .., ..])?;
        }
        Ok(())
    }

    #[test]
    fn test_file_not_found() {
        let err = SourceDataset::open(Path::new("/nonexistent/gebco.nc"), None)
            .err()
            .unwrap();
        assert!(matches!(err, PomGridError::SourceNotFound { .. }));
    }

    #[test]
    fn test_bathymetry_layout_and_flip() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gebco.nc");
        create_bathymetry_file(&path)?;

        let dataset = SourceDataset::open(&path, None)?;
        assert_eq!(dataset.layout().variable, "elevation");
        assert_eq!(dataset.layout().convention.lon, "lon");
        assert_eq!(dataset.layout().time_steps, None);

        let field = dataset.read_field(0, None)?;
        // Stored north to south, exposed south to north
        assert_eq!(field.lats()[0], -35.5);
        assert_eq!(field.lats()[5], -33.0);
        assert_eq!(field.values()[[5, 0]], -100.0);
        assert_eq!(field.values()[[0, 0]], -50.0);
        // Missing value marker becomes NaN
        assert!(field.values()[[5, 7]].is_nan());
        Ok(())
    }

    #[test]
    fn test_windowed_read() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gebco.nc");
        create_bathymetry_file(&path)?;

        let dataset = SourceDataset::open(&path, None)?;
        let window = GridExtent {
            lon_min: -61.0,
            lon_max: -60.0,
            lat_min: -34.0,
            lat_max: -33.5,
        };
        let field = dataset.read_field(0, Some(&window))?;
        // One sample of padding on each side
        assert_eq!(field.lons(), &[-61.5, -61.0, -60.5, -60.0, -59.5]);
        assert_eq!(field.lats(), &[-34.5, -34.0, -33.5, -33.0]);
        Ok(())
    }

    #[test]
    fn test_extra_dimensions_and_transpose() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reanalysis.nc");
        create_reanalysis_file(&path)?;

        let config = SourceConfig {
            variable: None,
            time_index: 1,
        };
        let field = load_source_field(&path, &config, None, 0.0)?;
        assert_eq!(field.name(), "temp");
        assert_eq!(field.values().dim(), (2, 4));
        // time 1, x = 2, y = 0
        assert_eq!(field.values()[[0, 2]], 120.0);
        assert!(field.values()[[1, 0]].is_nan());

        let config = SourceConfig {
            variable: None,
            time_index: 5,
        };
        let err = load_source_field(&path, &config, None, 0.0).unwrap_err();
        assert!(matches!(err, PomGridError::InvalidParameter { ref param, .. } if param == "time_index"));
        Ok(())
    }

    #[test]
    fn test_window_shifted_between_conventions() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reanalysis.nc");
        create_reanalysis_file(&path)?;

        let dataset = SourceDataset::open(&path, Some("temp"))?;
        // Target expressed in [-180, 180): -59.5 is 300.5 in the file
        let window = GridExtent {
            lon_min: -59.75,
            lon_max: -59.5,
            lat_min: -30.0,
            lat_max: -29.75,
        };
        let field = dataset.read_field(0, Some(&window))?;
        assert_eq!(field.lons(), &[300.0, 300.25, 300.5, 300.75]);
        Ok(())
    }

    #[test]
    fn test_unknown_layout_rejected() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.nc");
        {
            let mut file = netcdf::create(&path)?;
            file.add_dimension("cell", 3)?;
            let mut var = file.add_variable::<f64>("foo", &["cell"])?;
            var.put_values(&[1.0, 2.0, 3.0], &[..])?;
        }

        let err = SourceDataset::open(&path, None).err().unwrap();
        assert!(matches!(err, PomGridError::SourceFormat { .. }));

        let gebco = dir.path().join("gebco.nc");
        create_bathymetry_file(&gebco)?;
        let err = SourceDataset::open(&gebco, Some("salinity")).err().unwrap();
        assert!(matches!(err, PomGridError::SourceFormat { .. }));
        Ok(())
    }

    #[test]
    fn test_close_releases_handle() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gebco.nc");
        create_bathymetry_file(&path)?;

        let mut dataset = SourceDataset::open(&path, None)?;
        assert!(dataset.is_open());
        dataset.close();
        assert!(!dataset.is_open());
        assert!(dataset.read_field(0, None).is_err());
        Ok(())
    }

    #[test]
    fn test_axis_window() {
        let coords = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(
            axis_window(&coords, 1.5, 2.5),
            AxisWindow {
                start: 1,
                end: 4,
                full: false
            }
        );
        assert!(axis_window(&coords, -10.0, 10.0).full);
        // Descending axes give the same contiguous range
        let desc = [4.0, 3.0, 2.0, 1.0, 0.0];
        assert_eq!(axis_window(&desc, 1.5, 2.5).start, 1);
        // No overlap: nearest single sample
        let w = axis_window(&coords, 50.0, 60.0);
        assert_eq!((w.start, w.end), (4, 5));
    }
}
