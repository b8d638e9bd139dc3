//! Logging utilities for pomgrid.
//!
//! Structured `tracing` helpers shared by the pipeline stages so every run
//! reports its timings and grid statistics the same way.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::depth_grid::GridStatistics;
use crate::error::PomGridError;
use crate::mask::MaskStatistics;

/// Initialize the tracing subscriber with the given log level
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with warnings"
        );
    }
}

/// Log an operation with timing and result in a single statement
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let run_id = Uuid::new_v4();

    debug!(
        operation = operation,
        run_id = %run_id,
        "Starting operation"
    );

    let result = f();

    info!(
        operation = operation,
        run_id = %run_id,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log what was read from a source file
pub fn log_source_load_stats(
    file_path: &str,
    variable: &str,
    n_lon: usize,
    n_lat: usize,
    memory_usage: usize,
    start_time: Instant,
) {
    info!(
        operation = "source_load",
        file_path = file_path,
        variable = variable,
        n_lon = n_lon,
        n_lat = n_lat,
        memory_mb = memory_usage as f64 / (1024.0 * 1024.0),
        duration_ms = start_time.elapsed().as_secs_f64() * 1000.0,
        "Source field loaded"
    );
}

/// Log the land/ocean breakdown of a depth grid
pub fn log_grid_stats(label: &str, stats: &GridStatistics) {
    info!(
        grid = label,
        total = stats.total_points,
        ocean = stats.ocean_points,
        land = stats.land_points,
        no_data = stats.no_data_points,
        ocean_percent = format!("{:.1}", stats.ocean_percent),
        min_depth = stats.min_depth,
        max_depth = stats.max_depth,
        mean_depth = format!("{:.2}", stats.mean_depth),
        "Depth grid statistics"
    );
}

pub fn log_mask_stats(label: &str, stats: &MaskStatistics) {
    info!(
        mask = label,
        total = stats.total,
        ocean = stats.ocean,
        land = stats.land,
        no_data = stats.no_data,
        "Mask statistics"
    );
}

/// Log an error with the pipeline stage it came from
pub fn log_error(error: &PomGridError, stage: &str) {
    error!(
        error = %error,
        stage = stage,
        error_type = std::any::type_name_of_val(error),
        "Error occurred"
    );
}

/// Generate a unique run ID
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}
