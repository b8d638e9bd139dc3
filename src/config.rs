//! Configuration management for pomgrid.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)
//!
//! Each pipeline stage receives its own section explicitly; there are no
//! process-wide settings.

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PomGridError, Result};
use crate::grid::{GridExtent, GridSpacing, DEFAULT_MAX_GRID_POINTS};
use crate::interpolation::InterpolationMethod;

/// Command-line arguments for pomgrid
#[derive(Parser, Debug)]
#[command(name = "pomgrid")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to JSON configuration file
    #[arg(short, long, env = "POMGRID_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "POMGRID_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,
}

/// Pipeline stages exposed on the command line
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interpolate a bathymetry source onto a regular grid
    Generate(GenerateArgs),
    /// Extract a land/ocean mask from a reanalysis and degrade it to a coarser grid
    ExtractMask(ExtractMaskArgs),
    /// Merge a mask into an existing grid (ocean to land only)
    ApplyMask(ApplyMaskArgs),
    /// Toggle cells between land and ocean
    Edit(EditArgs),
}

impl Command {
    /// Stage name used in logs and error context
    pub fn stage(&self) -> &'static str {
        match self {
            Command::Generate(_) => "generate",
            Command::ExtractMask(_) => "extract-mask",
            Command::ApplyMask(_) => "apply-mask",
            Command::Edit(_) => "edit",
        }
    }
}

/// Geographic bounding box flags
#[derive(ClapArgs, Debug, Clone)]
pub struct ExtentArgs {
    /// Western longitude limit
    #[arg(long, allow_negative_numbers = true)]
    pub lon_min: f64,
    /// Eastern longitude limit
    #[arg(long, allow_negative_numbers = true)]
    pub lon_max: f64,
    /// Southern latitude limit
    #[arg(long, allow_negative_numbers = true)]
    pub lat_min: f64,
    /// Northern latitude limit
    #[arg(long, allow_negative_numbers = true)]
    pub lat_max: f64,
}

impl ExtentArgs {
    pub fn to_extent(&self) -> Result<GridExtent> {
        GridExtent::new(self.lon_min, self.lon_max, self.lat_min, self.lat_max)
    }
}

/// Grid spacing flags; per-axis values override the uniform one
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SpacingArgs {
    /// Uniform spacing in degrees (default 0.25)
    #[arg(long)]
    pub spacing: Option<f64>,
    /// Longitude spacing (dx) in degrees
    #[arg(long)]
    pub spacing_lon: Option<f64>,
    /// Latitude spacing (dy) in degrees
    #[arg(long)]
    pub spacing_lat: Option<f64>,
}

impl SpacingArgs {
    pub fn resolve(&self) -> Result<GridSpacing> {
        let base = self.spacing.map(GridSpacing::uniform).unwrap_or_default();
        let spacing = GridSpacing::new(
            self.spacing_lon.unwrap_or(base.lon),
            self.spacing_lat.unwrap_or(base.lat),
        );
        spacing.validate()?;
        Ok(spacing)
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct GenerateArgs {
    /// Path to the bathymetry NetCDF file (e.g. GEBCO)
    pub source: PathBuf,

    #[command(flatten)]
    pub extent: ExtentArgs,

    #[command(flatten)]
    pub spacing: SpacingArgs,

    /// Interpolation method
    #[arg(short, long, env = "POMGRID_METHOD", value_enum)]
    pub method: Option<InterpolationMethod>,

    /// Disable parallel interpolation
    #[arg(long)]
    pub serial: bool,

    /// Number of worker threads
    #[arg(short, long, env = "POMGRID_WORKERS")]
    pub workers: Option<usize>,

    /// Data variable to read (auto-detected when omitted)
    #[arg(long)]
    pub variable: Option<String>,

    /// Time index for time-varying sources
    #[arg(long)]
    pub time_index: Option<usize>,

    /// Output grid file (5-column ASCII)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also write an ESRI ASCII raster
    #[arg(long)]
    pub esri_output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExtractMaskArgs {
    /// Path to the reanalysis NetCDF file
    pub source: PathBuf,

    /// Target longitude resolution in degrees
    #[arg(long)]
    pub resolution_lon: f64,

    /// Target latitude resolution in degrees (defaults to the longitude one)
    #[arg(long)]
    pub resolution_lat: Option<f64>,

    /// Minimum ocean fraction for a coarse cell to be ocean
    #[arg(short, long, env = "POMGRID_THRESHOLD")]
    pub threshold: Option<f64>,

    /// Existing grid file whose cells the coarse mask should line up with
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Data variable to read (auto-detected when omitted)
    #[arg(long)]
    pub variable: Option<String>,

    /// Time index for time-varying sources
    #[arg(long)]
    pub time_index: Option<usize>,

    /// Also write the full-resolution mask here
    #[arg(long)]
    pub fine_output: Option<PathBuf>,

    /// Output mask file
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ApplyMaskArgs {
    /// Grid file to correct
    pub grid: PathBuf,

    /// Mask file (1 = ocean, 0 = land)
    pub mask: PathBuf,

    /// Let boundary columns be masked even when they fall outside the mask
    #[arg(long)]
    pub no_preserve_boundaries: bool,

    /// Output file (default: <grid>_masked.asc)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct EditArgs {
    /// Grid file to edit
    pub grid: PathBuf,

    /// Cell to toggle, as 1-based "i,j"; repeatable
    #[arg(long = "toggle", value_parser = parse_cell, required = true)]
    pub toggles: Vec<(usize, usize)>,

    /// Output file (default: <grid>_edited_<timestamp>.asc)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_cell(value: &str) -> std::result::Result<(usize, usize), String> {
    let (i, j) = value
        .split_once(',')
        .ok_or_else(|| format!("expected i,j but got '{}'", value))?;
    let i = i
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid i '{}': {}", i, e))?;
    let j = j
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid j '{}': {}", j, e))?;
    Ok((i, j))
}

/// Interpolation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Interpolation method
    #[serde(default)]
    pub method: InterpolationMethod,

    /// Split the target rows across worker threads
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Number of worker threads (None = available CPU parallelism)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Margin in degrees read around the target extent
    #[serde(default = "default_margin")]
    pub margin_degrees: f64,

    /// Refuse grids with more points than this
    #[serde(default = "default_max_grid_points")]
    pub max_grid_points: usize,
}

impl InterpolationConfig {
    /// Worker count actually used
    pub fn effective_workers(&self) -> usize {
        if !self.parallel {
            return 1;
        }
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// Source dataset configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Explicit data variable name
    #[serde(default)]
    pub variable: Option<String>,

    /// Time index for time-varying sources
    #[serde(default)]
    pub time_index: usize,
}

/// Mask aggregation and application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Minimum ocean fraction for a coarse cell to be ocean
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Keep the first/last grid columns when they fall outside the mask
    #[serde(default = "default_preserve_boundaries")]
    pub preserve_boundaries: bool,
}

/// Gap-fill (IDW) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillConfig {
    /// Search radius in cells
    #[serde(default = "default_search_radius")]
    pub search_radius: usize,

    /// Neighbours required before falling back
    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: usize,

    /// Depth used when too few neighbours are found
    #[serde(default = "default_fallback_depth")]
    pub fallback_depth: f64,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub interpolation: InterpolationConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub mask: MaskConfig,

    #[serde(default)]
    pub fill: FillConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Command)> {
        let args = Args::parse();
        Self::from_args(args)
    }

    /// Build the configuration for already-parsed arguments
    pub fn from_args(args: Args) -> Result<(Self, Command)> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(level) = args.log_level {
            config.log_level = level;
        }

        match &args.command {
            Command::Generate(generate) => {
                if let Some(method) = generate.method {
                    config.interpolation.method = method;
                }
                if generate.serial {
                    config.interpolation.parallel = false;
                }
                if generate.workers.is_some() {
                    config.interpolation.workers = generate.workers;
                }
                if generate.variable.is_some() {
                    config.source.variable = generate.variable.clone();
                }
                if let Some(t) = generate.time_index {
                    config.source.time_index = t;
                }
            }
            Command::ExtractMask(extract) => {
                if let Some(threshold) = extract.threshold {
                    config.mask.threshold = threshold;
                }
                if extract.variable.is_some() {
                    config.source.variable = extract.variable.clone();
                }
                if let Some(t) = extract.time_index {
                    config.source.time_index = t;
                }
            }
            Command::ApplyMask(apply) => {
                if apply.no_preserve_boundaries {
                    config.mask.preserve_boundaries = false;
                }
            }
            Command::Edit(_) => {}
        }

        Ok((config, args.command))
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        let workers = other.interpolation.workers.or(self.interpolation.workers);
        self.interpolation = other.interpolation;
        self.interpolation.workers = workers;
        if other.source.variable.is_some() {
            self.source.variable = other.source.variable;
        }
        self.source.time_index = other.source.time_index;
        self.mask = other.mask;
        self.fill = other.fill;
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(PomGridError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if self.interpolation.workers == Some(0) {
            return Err(PomGridError::Config {
                message: "workers must be at least 1".to_string(),
            });
        }

        if !self.interpolation.margin_degrees.is_finite() || self.interpolation.margin_degrees < 0.0
        {
            return Err(PomGridError::Config {
                message: format!(
                    "margin_degrees must be a non-negative number, got {}",
                    self.interpolation.margin_degrees
                ),
            });
        }

        if self.interpolation.max_grid_points == 0 {
            return Err(PomGridError::Config {
                message: "max_grid_points must be positive".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.mask.threshold) {
            return Err(PomGridError::Config {
                message: format!(
                    "threshold must lie in [0, 1], got {}",
                    self.mask.threshold
                ),
            });
        }

        if self.fill.search_radius == 0 {
            return Err(PomGridError::Config {
                message: "search_radius must be at least 1".to_string(),
            });
        }

        if !self.fill.fallback_depth.is_finite() || self.fill.fallback_depth <= 0.0 {
            return Err(PomGridError::Config {
                message: format!(
                    "fallback_depth must be a positive depth, got {}",
                    self.fill.fallback_depth
                ),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpolation: InterpolationConfig::default(),
            source: SourceConfig::default(),
            mask: MaskConfig::default(),
            fill: FillConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::default(),
            parallel: default_parallel(),
            workers: None,
            margin_degrees: default_margin(),
            max_grid_points: default_max_grid_points(),
        }
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            preserve_boundaries: default_preserve_boundaries(),
        }
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            search_radius: default_search_radius(),
            min_neighbors: default_min_neighbors(),
            fallback_depth: default_fallback_depth(),
        }
    }
}

// Default value functions for serde
fn default_parallel() -> bool {
    true
}

fn default_margin() -> f64 {
    1.0
}

fn default_max_grid_points() -> usize {
    DEFAULT_MAX_GRID_POINTS
}

fn default_threshold() -> f64 {
    0.5
}

fn default_preserve_boundaries() -> bool {
    true
}

fn default_search_radius() -> usize {
    5
}

fn default_min_neighbors() -> usize {
    4
}

fn default_fallback_depth() -> f64 {
    100.0
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.interpolation.method, InterpolationMethod::Linear);
        assert!(config.interpolation.parallel);
        assert_eq!(config.mask.threshold, 0.5);
        assert_eq!(config.fill.search_radius, 5);
        assert_eq!(config.fill.min_neighbors, 4);
        assert_eq!(config.fill.fallback_depth, 100.0);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_merge() {
        let mut config1 = Config::default();
        let mut config2 = Config::default();

        config2.interpolation.workers = Some(4);
        config2.mask.threshold = 0.7;

        config1.merge(config2);

        assert_eq!(config1.interpolation.workers, Some(4));
        assert_eq!(config1.mask.threshold, 0.7);
    }

    #[test]
    fn test_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"interpolation": {"method": "cubic"}, "fill": {"fallback_depth": 50.0}}"#)
                .unwrap();
        assert_eq!(config.interpolation.method, InterpolationMethod::Cubic);
        assert!(config.interpolation.parallel);
        assert_eq!(config.fill.fallback_depth, 50.0);
        assert_eq!(config.fill.search_radius, 5);
    }

    #[test]
    fn test_config_validation() {
        // Valid config should pass
        let config = Config::default();
        assert!(config.validate().is_ok());

        // Test invalid log level
        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        // Test invalid threshold
        let mut config = Config::default();
        config.mask.threshold = 1.5;
        assert!(config.validate().is_err());

        // Test zero workers
        let mut config = Config::default();
        config.interpolation.workers = Some(0);
        assert!(config.validate().is_err());

        // Test zero search radius
        let mut config = Config::default();
        config.fill.search_radius = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_workers() {
        let mut config = InterpolationConfig::default();
        config.workers = Some(4);
        assert_eq!(config.effective_workers(), 4);

        config.parallel = false;
        assert_eq!(config.effective_workers(), 1);

        config.parallel = true;
        config.workers = None;
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn test_spacing_resolution() {
        let spacing = SpacingArgs::default().resolve().unwrap();
        assert_eq!(spacing, GridSpacing::uniform(0.25));

        let spacing = SpacingArgs {
            spacing: Some(0.5),
            spacing_lon: None,
            spacing_lat: Some(0.1),
        }
        .resolve()
        .unwrap();
        assert_eq!(spacing, GridSpacing::new(0.5, 0.1));

        let result = SpacingArgs {
            spacing: Some(-1.0),
            ..Default::default()
        }
        .resolve();
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::try_parse_from([
            "pomgrid",
            "generate",
            "gebco.nc",
            "--lon-min",
            "-60",
            "--lon-max",
            "-30",
            "--lat-min",
            "-35",
            "--lat-max",
            "-5",
            "--spacing-lon",
            "0.25",
            "--spacing-lat",
            "0.5",
            "--method",
            "nearest",
            "--serial",
            "-o",
            "grid.asc",
        ])
        .unwrap();

        let (config, command) = Config::from_args(args).unwrap();
        assert_eq!(config.interpolation.method, InterpolationMethod::Nearest);
        assert!(!config.interpolation.parallel);

        match command {
            Command::Generate(generate) => {
                let extent = generate.extent.to_extent().unwrap();
                assert_eq!(extent.lon_min, -60.0);
                assert_eq!(extent.lat_max, -5.0);
                assert_eq!(
                    generate.spacing.resolve().unwrap(),
                    GridSpacing::new(0.25, 0.5)
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("3,4"), Ok((3, 4)));
        assert_eq!(parse_cell(" 10 , 2 "), Ok((10, 2)));
        assert!(parse_cell("3").is_err());
        assert!(parse_cell("a,1").is_err());
    }
}
