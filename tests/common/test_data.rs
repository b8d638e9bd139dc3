//! Test data generation utilities.
//!
//! Functions that write small NetCDF files shaped like the real inputs:
//! a GEBCO-style elevation grid and a reanalysis field whose fill values
//! mark land.

#![allow(dead_code)]

use std::path::Path;

use netcdf::Error;
type Result<T> = std::result::Result<T, Error>;

/// Regularly spaced axis from `start`, `n` points apart by `step`
pub fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|k| start + k as f64 * step).collect()
}

/// Creates a GEBCO-style elevation file.
///
/// Elevation is negative below sea level. With `descending_lat` the
/// latitude axis is stored north to south, as some bathymetry products do.
pub fn create_elevation_nc<F>(
    path: &Path,
    lons: &[f64],
    lats: &[f64],
    descending_lat: bool,
    elevation: F,
) -> Result<()>
where
    F: Fn(f64, f64) -> f32,
{
    let mut file = netcdf::create(path)?;

    file.add_dimension("lon", lons.len())?;
    file.add_dimension("lat", lats.len())?;

    file.add_attribute("title", "Synthetic bathymetry")?;
    file.add_attribute("institution", "pomgrid test suite")?;

    let stored_lats: Vec<f64> = if descending_lat {
        lats.iter().rev().copied().collect()
    } else {
        lats.to_vec()
    };

    let mut values = Vec::with_capacity(lons.len() * lats.len());
    for &lat in &stored_lats {
        for &lon in lons {
            values.push(elevation(lon, lat));
        }
    }

    {
        let mut var = file.add_variable::<f64>("lon", &["lon"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put_values(lons, &[..])?;
    }
    {
        let mut var = file.add_variable::<f64>("lat", &["lat"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put_values(&stored_lats, &[..])?;
    }
    {
        let mut var = file.add_variable::<f32>("elevation", &["lat", "lon"])?;
        var.put_attribute("units", "m")?;
        var.put_attribute("long_name", "Elevation relative to sea level")?;
        var.put_values(&values, &[.., ..])?;
    }

    Ok(())
}

/// Creates a reanalysis-style file with a `time` axis and `_FillValue` over land.
///
/// Coordinates use the `xt_ocean`/`yt_ocean` names and the 0..360 longitude
/// convention of ocean reanalyses.
pub fn create_reanalysis_nc<F>(
    path: &Path,
    lons: &[f64],
    lats: &[f64],
    time_steps: usize,
    is_ocean: F,
) -> Result<()>
where
    F: Fn(f64, f64) -> bool,
{
    const FILL: f32 = -1.0e34;

    let mut file = netcdf::create(path)?;

    file.add_dimension("time", time_steps)?;
    file.add_dimension("yt_ocean", lats.len())?;
    file.add_dimension("xt_ocean", lons.len())?;

    file.add_attribute("title", "Synthetic ocean reanalysis")?;

    let mut values = Vec::with_capacity(time_steps * lons.len() * lats.len());
    for t in 0..time_steps {
        for &lat in lats {
            for &lon in lons {
                values.push(if is_ocean(lon, lat) {
                    15.0 + t as f32
                } else {
                    FILL
                });
            }
        }
    }

    {
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        var.put_attribute("units", "days since 1993-01-01")?;
        let times: Vec<f64> = (0..time_steps).map(|t| t as f64).collect();
        var.put_values(&times, &[..])?;
    }
    {
        let mut var = file.add_variable::<f64>("xt_ocean", &["xt_ocean"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put_values(lons, &[..])?;
    }
    {
        let mut var = file.add_variable::<f64>("yt_ocean", &["yt_ocean"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put_values(lats, &[..])?;
    }
    {
        let mut var = file.add_variable::<f32>("temp", &["time", "yt_ocean", "xt_ocean"])?;
        var.put_attribute("units", "degC")?;
        var.put_attribute("_FillValue", FILL)?;
        var.put_values(&values, &[.., .., ..])?;
    }

    Ok(())
}
