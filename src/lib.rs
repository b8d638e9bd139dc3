//! # pomgrid
//!
//! Bathymetry and land/ocean mask preparation for regular POM model grids.
//!
//! This library interpolates a global elevation dataset (GEBCO and similar)
//! onto a regular lon/lat grid, derives land/ocean masks from reanalysis
//! output, aligns those masks with an existing grid, and supports manual
//! cell edits with inverse-distance gap filling.
//!
//! ## Pipeline
//!
//! - **Generate**: read a windowed source field and interpolate it in
//!   parallel row blocks ([`interpolation::interpolate`])
//! - **Mask**: extract a fine mask and aggregate it by ocean fraction
//!   ([`mask::extract_mask`], [`mask::aggregate`])
//! - **Correct**: merge a mask into a grid, ocean to land only
//!   ([`mask::apply_mask`])
//! - **Edit**: toggle cells through a [`GridSession`]
//!
//! Grids and masks are exchanged as 5-column ASCII files ([`ascii`]).

pub mod ascii;
pub mod config;
#[cfg(feature = "netcdf")]
pub mod data_loader;
pub mod depth_grid;
pub mod error;
pub mod fill;
pub mod grid;
pub mod interpolation;
pub mod logging;
pub mod mask;
pub mod source;
pub mod state;

pub use config::{Config, FillConfig, InterpolationConfig, MaskConfig, SourceConfig};
pub use depth_grid::{DepthGrid, GridStatistics, NO_DATA};
pub use error::{PomGridError, Result};
pub use grid::{GridExtent, GridSpacing, TargetGrid};
pub use interpolation::{interpolate, InterpolationMethod, InterpolationOutcome, InterpolationReport};
pub use logging::{
    generate_run_id, init_tracing, log_error, log_grid_stats, log_mask_stats, log_operation_end,
    log_operation_start, log_timed_operation,
};
pub use mask::{MaskCell, MaskGrid, MaskStatistics};
pub use source::SourceField;
pub use state::{EditCommand, EditOutcome, GridSession};
