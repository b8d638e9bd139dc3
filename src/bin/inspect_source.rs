use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use pomgrid::data_loader::SourceDataset;

/// Print the structure of a NetCDF source and how pomgrid would read it
#[derive(Parser, Debug)]
#[command(name = "inspect_source")]
struct Args {
    /// NetCDF file to inspect
    path: PathBuf,

    /// Data variable to read (auto-detected when omitted)
    #[arg(long)]
    variable: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("Inspecting source: {}", args.path.display());

    let file = netcdf::open(&args.path)?;

    println!("\n=== FILE INFORMATION ===");

    println!("\nDimensions:");
    for dim in file.dimensions() {
        println!(
            "  {} = {} {}",
            dim.name(),
            dim.len(),
            if dim.is_unlimited() { "(unlimited)" } else { "" }
        );
    }

    println!("\nVariables:");
    for var in file.variables() {
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| format!("{} = {}", d.name(), d.len()))
            .collect();
        println!("  {} ({:?}) [{}]", var.name(), var.vartype(), dims.join(", "));

        for attr in var.attributes() {
            match attr.value() {
                Ok(val) => println!("    {}: {:?}", attr.name(), val),
                Err(e) => println!("    {}: error reading value: {}", attr.name(), e),
            }
        }
    }

    println!("\nGlobal Attributes:");
    for attr in file.attributes() {
        match attr.value() {
            Ok(val) => println!("  {}: {:?}", attr.name(), val),
            Err(e) => println!("  {}: error reading value: {}", attr.name(), e),
        }
    }
    drop(file);

    println!("\n=== POMGRID LAYOUT ===");
    let dataset = SourceDataset::open(&args.path, args.variable.as_deref())?;
    let layout = dataset.layout();
    println!(
        "\nCoordinates: {} / {} (dimensions {} / {})",
        layout.convention.lon, layout.convention.lat, layout.lon_dim, layout.lat_dim
    );
    println!("Data variable: {}", layout.variable);
    if let Some(steps) = layout.time_steps {
        println!("Time steps: {}", steps);
    }

    let (lons, lats) = (dataset.lons(), dataset.lats());
    if let (Some(first), Some(last)) = (lons.first(), lons.last()) {
        println!("Longitude: {} points, {} to {}", lons.len(), first, last);
    }
    if let (Some(first), Some(last)) = (lats.first(), lats.last()) {
        println!("Latitude: {} points, {} to {}", lats.len(), first, last);
    }

    Ok(())
}
