//! Fine mask extraction from a reanalysis field.
//!
//! Ocean models only store values over water, so a finite sample marks an
//! ocean cell and a fill value (NaN after loading) marks land.

use ndarray::Array2;
use tracing::info;

use super::{MaskCell, MaskGrid};
use crate::error::Result;
use crate::source::SourceField;

/// Classify every sample of `field` as ocean or land.
pub fn extract_mask(field: &SourceField) -> Result<MaskGrid> {
    let values = field.values();
    let cells = Array2::from_shape_fn(values.dim(), |(row, col)| {
        if SourceField::is_no_data(values[[row, col]]) {
            MaskCell::Land
        } else {
            MaskCell::Ocean
        }
    });

    let mask = MaskGrid::new(field.lons().to_vec(), field.lats().to_vec(), cells)?;
    let stats = mask.statistics();
    info!(
        variable = field.name(),
        n_cols = mask.n_cols(),
        n_rows = mask.n_rows(),
        ocean = stats.ocean,
        land = stats.land,
        "Extracted fine mask"
    );
    Ok(mask)
}
