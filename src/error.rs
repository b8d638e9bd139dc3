//! Error types for pomgrid.
//!
//! This module defines a single error enum covering every failure the grid
//! pipeline can report. Each variant names the offending parameter or value so
//! that a failed run says what went wrong and where.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pomgrid operations.
#[derive(Error, Debug)]
pub enum PomGridError {
    /// Bounding box or spacing cannot describe a grid
    #[error("Invalid extent: {param} - {message}")]
    InvalidExtent { param: String, message: String },

    /// Source dataset path does not exist
    #[error("Source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// Source dataset exists but its layout is not understood
    #[error("Source format error: {message}")]
    SourceFormat { message: String },

    /// Every target point fell outside the source coverage
    #[error("Out of bounds: {count} of {total} target points outside source coverage ({message})")]
    OutOfBounds {
        count: usize,
        total: usize,
        message: String,
    },

    /// Aggregation asked for a resolution finer than its input
    #[error("Resolution error: {param} - {message}")]
    Resolution { param: String, message: String },

    /// Grid and mask do not overlap
    #[error("Grid mismatch: {message}")]
    GridMismatch { message: String },

    /// Allocation refused or grid larger than the configured limit
    #[error("Resource exhausted: {message}")]
    ResourceExhausted { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Interpolation errors
    #[error("Interpolation error: {message}")]
    Interpolation { message: String },

    /// Malformed ASCII grid or mask file
    #[error("Grid format error at line {line}: {message}")]
    GridFormat { line: usize, message: String },

    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PomGridError {
    pub(crate) fn invalid_parameter(param: &str, message: impl Into<String>) -> Self {
        PomGridError::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_extent(param: &str, message: impl Into<String>) -> Self {
        PomGridError::InvalidExtent {
            param: param.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with PomGridError
pub type Result<T> = std::result::Result<T, PomGridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_parameter() {
        let err = PomGridError::invalid_extent("lon_min", "must be below lon_max");
        assert_eq!(
            err.to_string(),
            "Invalid extent: lon_min - must be below lon_max"
        );

        let err = PomGridError::SourceNotFound {
            path: PathBuf::from("/data/gebco.nc"),
        };
        assert!(err.to_string().contains("/data/gebco.nc"));
    }

    #[test]
    fn test_out_of_bounds_reports_counts() {
        let err = PomGridError::OutOfBounds {
            count: 4,
            total: 4,
            message: "source lon [0, 1]".to_string(),
        };
        assert!(err.to_string().contains("4 of 4"));
    }
}
