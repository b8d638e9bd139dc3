//! ASCII grid and mask files.
//!
//! # Grid format
//!
//! ```text
//! # Bathymetry grid for POM
//! # Generated: 2026-10-17 09:30:00
//!      1      1   -60.0000   -35.0000    1000.00
//!      2      1   -59.7500   -35.0000       0.00
//! ```
//!
//! One point per line, `i j lon lat depth`, with 1-based indices, written
//! j-outer and i-inner (south to north, west to east). Mask files use the
//! same layout with `1` ocean, `0` land and `-1` no-data in the last column.
//!
//! Lines starting with `#` carry metadata. Readers keep them but never rely
//! on them. All writes go to a temporary file in the destination directory
//! which is renamed over the target once complete, so a failed run never
//! leaves a truncated file behind.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::Local;
use ndarray::Array2;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::depth_grid::{DepthGrid, NO_DATA};
use crate::error::{PomGridError, Result};
use crate::grid::TargetGrid;
use crate::interpolation::InterpolationReport;
use crate::mask::{MaskCell, MaskGrid};

/// One parsed data line
#[derive(Debug, Clone, Copy, PartialEq)]
struct Record {
    i: usize,
    j: usize,
    lon: f64,
    lat: f64,
    value: f64,
}

/// Format one depth line
pub fn format_depth_row(i: usize, j: usize, lon: f64, lat: f64, depth: f64) -> String {
    format!("{:6} {:6} {:10.4} {:10.4} {:10.2}", i, j, lon, lat, depth)
}

/// Format one mask line
pub fn format_mask_row(i: usize, j: usize, lon: f64, lat: f64, cell: MaskCell) -> String {
    format!("{:6} {:6} {:10.4} {:10.4} {:6}", i, j, lon, lat, cell.file_value())
}

/// Metadata lines describing a freshly generated grid
pub fn generation_header(
    source: &str,
    target: &TargetGrid,
    report: &InterpolationReport,
) -> Vec<String> {
    vec![
        "Bathymetry grid for POM".to_string(),
        format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        format!("Source: {}", source),
        format!(
            "Extent: lon [{:.4}, {:.4}], lat [{:.4}, {:.4}]",
            target.extent.lon_min,
            target.extent.lon_max,
            target.extent.lat_min,
            target.extent.lat_max
        ),
        format!(
            "Spacing: {} x {} degrees",
            target.spacing.lon, target.spacing.lat
        ),
        format!("Dimensions: {} x {} points", target.n_cols(), target.n_rows()),
        format!("Method: {}", report.method),
        "Format: i j lon lat depth (depth > 0 ocean, 0 land)".to_string(),
    ]
}

/// Write a depth grid atomically
pub fn write_depth_grid(path: &Path, grid: &DepthGrid) -> Result<()> {
    write_atomic(path, |out| {
        write_comments(out, grid.metadata())?;
        for (j, &lat) in grid.lats().iter().enumerate() {
            for (i, &lon) in grid.lons().iter().enumerate() {
                let depth = grid.depth()[[j, i]];
                let depth = if depth.is_finite() { depth } else { NO_DATA };
                writeln!(out, "{}", format_depth_row(i + 1, j + 1, lon, lat, depth))?;
            }
        }
        Ok(())
    })?;

    info!(
        path = %path.display(),
        points = grid.depth().len(),
        "Depth grid written"
    );
    Ok(())
}

/// Read a depth grid, keeping its `#` lines as metadata
pub fn read_depth_grid(path: &Path) -> Result<DepthGrid> {
    let (metadata, records) = read_records(path)?;
    let (lons, lats, values) = assemble(&records, NO_DATA)?;
    let grid = DepthGrid::new(lons, lats, values)?.with_metadata(metadata);

    debug!(
        path = %path.display(),
        n_cols = grid.n_cols(),
        n_rows = grid.n_rows(),
        "Depth grid read"
    );
    Ok(grid)
}

/// Write a mask atomically
pub fn write_mask(path: &Path, mask: &MaskGrid, header: &[String]) -> Result<()> {
    write_atomic(path, |out| {
        write_comments(out, header)?;
        for (j, &lat) in mask.lats().iter().enumerate() {
            for (i, &lon) in mask.lons().iter().enumerate() {
                let cell = mask.cells()[[j, i]];
                writeln!(out, "{}", format_mask_row(i + 1, j + 1, lon, lat, cell))?;
            }
        }
        Ok(())
    })?;

    info!(path = %path.display(), points = mask.cells().len(), "Mask written");
    Ok(())
}

/// Read a mask file
pub fn read_mask(path: &Path) -> Result<MaskGrid> {
    let (_, records) = read_records(path)?;
    let (lons, lats, values) = assemble(&records, -1.0)?;

    let mut cells = Array2::from_elem(values.dim(), MaskCell::NoData);
    for (cell, &value) in cells.iter_mut().zip(values.iter()) {
        *cell = MaskCell::from_file_value(value)?;
    }
    MaskGrid::new(lons, lats, cells)
}

/// Export a depth grid as an ESRI ASCII raster, rows written south to north
pub fn write_esri_ascii(path: &Path, grid: &DepthGrid) -> Result<()> {
    let spacing = grid.spacing();
    write_atomic(path, |out| {
        writeln!(out, "ncols {}", grid.n_cols())?;
        writeln!(out, "nrows {}", grid.n_rows())?;
        writeln!(out, "xllcorner {:.6}", grid.lons()[0])?;
        writeln!(out, "yllcorner {:.6}", grid.lats()[0])?;
        writeln!(out, "dx {:.6}", spacing.lon)?;
        writeln!(out, "dy {:.6}", spacing.lat)?;
        writeln!(out, "NODATA_value {}", NO_DATA)?;
        for row in grid.depth().rows() {
            let line = row
                .iter()
                .map(|&d| {
                    let d = if d.is_finite() { d } else { NO_DATA };
                    format!("{:.2}", d)
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", line)?;
        }
        Ok(())
    })?;

    info!(path = %path.display(), "ESRI ASCII raster written");
    Ok(())
}

fn write_comments(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        if line.is_empty() {
            writeln!(out, "#")?;
        } else {
            writeln!(out, "# {}", line)?;
        }
    }
    Ok(())
}

fn write_atomic<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        body(&mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_records(path: &Path) -> Result<(Vec<String>, Vec<Record>)> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PomGridError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => PomGridError::Io(e),
    })?;
    let reader = BufReader::new(file);

    let mut metadata = Vec::new();
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            metadata.push(comment.strip_prefix(' ').unwrap_or(comment).to_string());
            continue;
        }
        records.push(parse_record(line, line_num + 1)?);
    }

    if records.is_empty() {
        return Err(PomGridError::GridFormat {
            line: 0,
            message: format!("{} contains no data lines", path.display()),
        });
    }
    Ok((metadata, records))
}

fn parse_record(line: &str, line_num: usize) -> Result<Record> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return Err(PomGridError::GridFormat {
            line: line_num,
            message: format!("expected 5 columns, found {}", parts.len()),
        });
    }

    let number = |idx: usize, name: &str| -> Result<f64> {
        parts[idx]
            .parse::<f64>()
            .map_err(|_| PomGridError::GridFormat {
                line: line_num,
                message: format!("invalid {} value '{}'", name, parts[idx]),
            })
    };
    let index = |idx: usize, name: &str| -> Result<usize> {
        let value = number(idx, name)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(PomGridError::GridFormat {
                line: line_num,
                message: format!("{} index '{}' is not a non-negative integer", name, parts[idx]),
            });
        }
        Ok(value as usize)
    };

    Ok(Record {
        i: index(0, "i")?,
        j: index(1, "j")?,
        lon: number(2, "lon")?,
        lat: number(3, "lat")?,
        value: number(4, "value")?,
    })
}

/// Rebuild axes and values from records indexed by `(i, j)`.
///
/// Indices normally start at 1; files whose smallest index is 0 are read as
/// 0-based. Every point of the rectangle must appear exactly once.
fn assemble(records: &[Record], missing: f64) -> Result<(Vec<f64>, Vec<f64>, Array2<f64>)> {
    let base_i = records.iter().map(|r| r.i).min().unwrap_or(1).min(1);
    let base_j = records.iter().map(|r| r.j).min().unwrap_or(1).min(1);
    let n_cols = records.iter().map(|r| r.i - base_i + 1).max().unwrap_or(0);
    let n_rows = records.iter().map(|r| r.j - base_j + 1).max().unwrap_or(0);

    let expected = n_cols.checked_mul(n_rows).ok_or_else(|| PomGridError::ResourceExhausted {
        message: format!("grid of {} x {} points is too large", n_cols, n_rows),
    })?;
    if records.len() != expected {
        return Err(PomGridError::GridFormat {
            line: 0,
            message: format!(
                "found {} data lines but indices describe {} x {} = {} points",
                records.len(),
                n_cols,
                n_rows,
                expected
            ),
        });
    }

    let mut lons = vec![f64::NAN; n_cols];
    let mut lats = vec![f64::NAN; n_rows];
    let mut values = Array2::from_elem((n_rows, n_cols), f64::NAN);

    for record in records {
        let col = record.i - base_i;
        let row = record.j - base_j;
        let cell = &mut values[[row, col]];
        if !cell.is_nan() {
            return Err(PomGridError::GridFormat {
                line: 0,
                message: format!("point ({}, {}) appears more than once", record.i, record.j),
            });
        }
        *cell = if record.value.is_finite() { record.value } else { missing };
        lons[col] = record.lon;
        lats[row] = record.lat;
    }

    Ok((lons, lats, values))
}
