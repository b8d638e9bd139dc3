//! pomgrid - bathymetry and mask preparation for POM grids
//!
//! This is the main entry point for the pomgrid command-line tool.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use pomgrid::ascii;
use pomgrid::config::{ApplyMaskArgs, Command, EditArgs, ExtractMaskArgs, GenerateArgs};
use pomgrid::grid::{GridExtent, GridSpacing, TargetGrid};
use pomgrid::mask::{aggregate, apply_mask, extract_mask};
use pomgrid::{
    generate_run_id, init_tracing, interpolate, log_error, log_grid_stats, log_mask_stats,
    log_operation_end, log_operation_start, log_timed_operation, Config, EditCommand, EditOutcome,
    GridSession, PomGridError, SourceConfig, SourceField,
};

fn main() -> Result<()> {
    let (config, command) = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.log_level);
    info!("Starting pomgrid v{}", env!("CARGO_PKG_VERSION"));

    let stage = command.stage();
    let run_id = generate_run_id();
    let start = Instant::now();
    log_operation_start(stage, Some(&run_id));

    let result = match command {
        Command::Generate(args) => generate(&config, args),
        Command::ExtractMask(args) => extract(&config, args),
        Command::ApplyMask(args) => apply(&config, args),
        Command::Edit(args) => edit(&config, args),
    };

    if let Err(err) = &result {
        if let Some(pom_err) = err.downcast_ref::<PomGridError>() {
            log_error(pom_err, stage);
        }
    }
    log_operation_end(stage, start, result.is_ok());
    result
}

fn generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let extent = args.extent.to_extent().context("Invalid extent")?;
    let spacing = args.spacing.resolve().context("Invalid spacing")?;
    let target =
        TargetGrid::build_with_limit(extent, spacing, config.interpolation.max_grid_points)
            .context("Failed to build target grid")?;
    info!(
        n_cols = target.n_cols(),
        n_rows = target.n_rows(),
        "Target grid: {} x {} points",
        target.n_cols(),
        target.n_rows()
    );

    let field = read_source(
        &args.source,
        &config.source,
        Some(&target.extent),
        config.interpolation.margin_degrees,
    )?;

    let outcome = log_timed_operation("interpolate", || {
        interpolate(&field, &target, &config.interpolation)
    })
    .context("Interpolation failed")?;
    drop(field);

    let source_name = args.source.display().to_string();
    let header = ascii::generation_header(&source_name, &target, &outcome.report);
    let grid = outcome.grid.with_metadata(header);
    log_grid_stats("generated", &grid.statistics());

    ascii::write_depth_grid(&args.output, &grid)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), "Grid written");

    if let Some(esri) = &args.esri_output {
        ascii::write_esri_ascii(esri, &grid)
            .with_context(|| format!("Failed to write {}", esri.display()))?;
        info!(path = %esri.display(), "ESRI raster written");
    }

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}

fn extract(config: &Config, args: ExtractMaskArgs) -> Result<()> {
    let field = read_source(&args.source, &config.source, None, 0.0)?;
    let fine = extract_mask(&field).context("Failed to extract mask")?;
    log_mask_stats("fine", &fine.statistics());

    let mut header = vec![
        "Land/ocean mask".to_string(),
        format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        format!("Source: {}", args.source.display()),
        format!("Variable: {}", field.name()),
    ];

    if let Some(path) = &args.fine_output {
        let mut fine_header = header.clone();
        fine_header.push(mask_format_line());
        ascii::write_mask(path, &fine, &fine_header)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Fine mask written");
    }

    let reference = match &args.reference {
        Some(path) => {
            let grid = ascii::read_depth_grid(path)
                .with_context(|| format!("Failed to read reference grid {}", path.display()))?;
            header.push(format!("Aligned to: {}", path.display()));
            Some(grid.target_grid()?)
        }
        None => None,
    };

    let resolution = GridSpacing::new(
        args.resolution_lon,
        args.resolution_lat.unwrap_or(args.resolution_lon),
    );
    let coarse = aggregate(&fine, resolution, config.mask.threshold, reference.as_ref())
        .context("Failed to aggregate mask")?;
    log_mask_stats("coarse", &coarse.statistics());

    header.push(format!(
        "Resolution: {} x {} degrees",
        resolution.lon, resolution.lat
    ));
    header.push(format!("Ocean threshold: {}", config.mask.threshold));
    header.push(mask_format_line());
    ascii::write_mask(&args.output, &coarse, &header)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), "Mask written");

    println!("{}", serde_json::to_string_pretty(&coarse.statistics())?);
    Ok(())
}

fn apply(config: &Config, args: ApplyMaskArgs) -> Result<()> {
    let mut grid = ascii::read_depth_grid(&args.grid)
        .with_context(|| format!("Failed to read grid {}", args.grid.display()))?;
    let mask = ascii::read_mask(&args.mask)
        .with_context(|| format!("Failed to read mask {}", args.mask.display()))?;
    log_grid_stats("before", &grid.statistics());

    let applied = apply_mask(&mut grid, &mask, config.mask.preserve_boundaries)
        .context("Failed to apply mask")?;
    log_grid_stats("after", &grid.statistics());

    grid.push_metadata(format!(
        "Mask applied at: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    grid.push_metadata(format!("Mask file: {}", args.mask.display()));

    let output = args
        .output
        .unwrap_or_else(|| derived_path(&args.grid, "masked"));
    ascii::write_depth_grid(&output, &grid)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(path = %output.display(), converted = applied.converted, "Masked grid written");

    println!("{}", serde_json::to_string_pretty(&applied)?);
    Ok(())
}

fn edit(config: &Config, args: EditArgs) -> Result<()> {
    let mut session = GridSession::open(&args.grid, config.fill.clone())
        .with_context(|| format!("Failed to open {}", args.grid.display()))?;

    for (i, j) in args.toggles {
        let outcome = session
            .apply(EditCommand::ToggleCell { i, j })
            .with_context(|| format!("Failed to toggle cell ({}, {})", i, j))?;
        match outcome {
            EditOutcome::ToLand { previous, .. } => {
                println!("({}, {}) ocean -> land (was {:.2} m)", i, j, previous)
            }
            EditOutcome::ToOcean { depth, .. } => {
                println!("({}, {}) land -> ocean ({:.2} m)", i, j, depth)
            }
            EditOutcome::MaskApplied(_) => {}
        }
    }

    let output = args.output.unwrap_or_else(|| {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        derived_path(&args.grid, &format!("edited_{}", stamp))
    });
    let saved = session
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if saved {
        log_grid_stats("edited", &session.grid().statistics());
        info!(path = %output.display(), edits = session.edits().len(), "Edited grid written");
    }
    Ok(())
}

#[cfg(feature = "netcdf")]
fn read_source(
    path: &Path,
    source: &SourceConfig,
    window: Option<&GridExtent>,
    margin: f64,
) -> Result<SourceField> {
    pomgrid::data_loader::load_source_field(path, source, window, margin)
        .with_context(|| format!("Failed to read source {}", path.display()))
}

#[cfg(not(feature = "netcdf"))]
fn read_source(
    path: &Path,
    _source: &SourceConfig,
    _window: Option<&GridExtent>,
    _margin: f64,
) -> Result<SourceField> {
    anyhow::bail!(
        "Cannot read {}: pomgrid was built without the netcdf feature",
        path.display()
    )
}

fn mask_format_line() -> String {
    "Format: i j lon lat mask (1 ocean, 0 land, -1 no data)".to_string()
}

/// `<dir>/<stem>_<suffix>.asc` next to `path`
fn derived_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "grid".to_string());
    path.with_file_name(format!("{}_{}.asc", stem, suffix))
}
