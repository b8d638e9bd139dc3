//! Edit session state for a depth grid.
//!
//! A [`GridSession`] is the single owner of a [`DepthGrid`] while it is being
//! edited. All changes arrive as [`EditCommand`]s, so every mutation goes
//! through one place: toggles pick up gap-filled depths, mask merges stay
//! conservative, and the session knows whether there is anything to save.
//!
//! The session is not `Sync`-guarded. Sharing one across threads requires the
//! caller to serialize access, typically by sending commands to the owning
//! thread.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ascii;
use crate::config::FillConfig;
use crate::depth_grid::{is_ocean, DepthGrid};
use crate::error::{PomGridError, Result};
use crate::fill::fill_depth;
use crate::mask::{apply_mask, MaskApplication, MaskGrid};

/// A change requested of the session
#[derive(Debug, Clone)]
pub enum EditCommand {
    /// Flip a cell between land and ocean; `i` and `j` are 1-based
    ToggleCell { i: usize, j: usize },
    /// Merge a mask into the grid (ocean to land only)
    ApplyMask {
        mask: MaskGrid,
        preserve_boundaries: bool,
    },
}

/// What a command did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditOutcome {
    ToLand { i: usize, j: usize, previous: f64 },
    ToOcean { i: usize, j: usize, depth: f64 },
    MaskApplied(MaskApplication),
}

/// Entry of the session's edit log
#[derive(Debug, Clone, Serialize)]
pub struct EditRecord {
    pub at: DateTime<Local>,
    pub outcome: EditOutcome,
}

/// Owner of a depth grid under edit
#[derive(Debug)]
pub struct GridSession {
    source: Option<PathBuf>,
    grid: DepthGrid,
    fill: FillConfig,
    modified: bool,
    edits: Vec<EditRecord>,
}

impl GridSession {
    pub fn new(grid: DepthGrid, fill: FillConfig) -> Self {
        Self {
            source: None,
            grid,
            fill,
            modified: false,
            edits: Vec::new(),
        }
    }

    /// Load a grid file for editing
    pub fn open(path: &Path, fill: FillConfig) -> Result<Self> {
        let grid = ascii::read_depth_grid(path)?;
        let stats = grid.statistics();
        info!(
            path = %path.display(),
            n_cols = grid.n_cols(),
            n_rows = grid.n_rows(),
            ocean_points = stats.ocean_points,
            land_points = stats.land_points,
            "Opened grid for editing"
        );

        let mut session = Self::new(grid, fill);
        session.source = Some(path.to_path_buf());
        Ok(session)
    }

    pub fn grid(&self) -> &DepthGrid {
        &self.grid
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn edits(&self) -> &[EditRecord] {
        &self.edits
    }

    /// Apply one command
    pub fn apply(&mut self, command: EditCommand) -> Result<EditOutcome> {
        let outcome = match command {
            EditCommand::ToggleCell { i, j } => self.toggle(i, j)?,
            EditCommand::ApplyMask {
                mask,
                preserve_boundaries,
            } => {
                let applied = apply_mask(&mut self.grid, &mask, preserve_boundaries)?;
                if applied.converted > 0 {
                    self.modified = true;
                }
                EditOutcome::MaskApplied(applied)
            }
        };

        self.edits.push(EditRecord {
            at: Local::now(),
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    fn toggle(&mut self, i: usize, j: usize) -> Result<EditOutcome> {
        let (col, row) = match (i.checked_sub(1), j.checked_sub(1)) {
            (Some(col), Some(row)) if col < self.grid.n_cols() && row < self.grid.n_rows() => {
                (col, row)
            }
            _ => {
                return Err(PomGridError::invalid_parameter(
                    "cell",
                    format!(
                        "({}, {}) outside 1..={} x 1..={}",
                        i,
                        j,
                        self.grid.n_cols(),
                        self.grid.n_rows()
                    ),
                ))
            }
        };

        let current = self.grid.depth_at(col, row).unwrap_or(0.0);
        let outcome = if is_ocean(current) {
            self.grid.set_depth(col, row, 0.0)?;
            info!(i = i, j = j, previous = current, "Cell converted to land");
            EditOutcome::ToLand {
                i,
                j,
                previous: current,
            }
        } else {
            let depth = fill_depth(&self.grid, col, row, &self.fill)?;
            self.grid.set_depth(col, row, depth)?;
            info!(i = i, j = j, depth = depth, "Cell converted to ocean");
            EditOutcome::ToOcean { i, j, depth }
        };

        self.modified = true;
        Ok(outcome)
    }

    /// Write the grid with an edit stamp and clear the modified flag.
    ///
    /// An unmodified session writes nothing and returns `false`.
    pub fn save(&mut self, path: &Path) -> Result<bool> {
        if !self.modified {
            warn!(path = %path.display(), "No modifications, nothing saved");
            return Ok(false);
        }

        self.grid.push_metadata(format!(
            "Edited at: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        ascii::write_depth_grid(path, &self.grid)?;
        self.modified = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::MaskCell;
    use ndarray::{array, Array2};
    use tempfile::TempDir;

    fn session() -> GridSession {
        let mut depth = Array2::from_elem((5, 5), 200.0);
        depth[[2, 2]] = 0.0;
        let grid = DepthGrid::new(
            (0..5).map(|i| i as f64).collect(),
            (0..5).map(|j| j as f64).collect(),
            depth,
        )
        .unwrap();
        GridSession::new(grid, FillConfig::default())
    }

    #[test]
    fn test_toggle_land_to_ocean_fills() {
        let mut session = session();
        let outcome = session.apply(EditCommand::ToggleCell { i: 3, j: 3 }).unwrap();
        assert_eq!(outcome, EditOutcome::ToOcean { i: 3, j: 3, depth: 200.0 });
        assert_eq!(session.grid().depth_at(2, 2), Some(200.0));
        assert!(session.modified());
        assert_eq!(session.edits().len(), 1);
    }

    #[test]
    fn test_toggle_ocean_to_land() {
        let mut session = session();
        let outcome = session.apply(EditCommand::ToggleCell { i: 1, j: 1 }).unwrap();
        assert_eq!(
            outcome,
            EditOutcome::ToLand {
                i: 1,
                j: 1,
                previous: 200.0
            }
        );
        assert_eq!(session.grid().depth_at(0, 0), Some(0.0));
    }

    #[test]
    fn test_isolated_cell_gets_fallback() {
        let grid = DepthGrid::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0],
            array![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        let mut session = GridSession::new(grid, FillConfig::default());
        session.apply(EditCommand::ToggleCell { i: 2, j: 1 }).unwrap();
        assert_eq!(session.grid().depth_at(1, 0), Some(100.0));
    }

    #[test]
    fn test_indices_are_one_based() {
        let mut session = session();
        assert!(session.apply(EditCommand::ToggleCell { i: 0, j: 1 }).is_err());
        assert!(session.apply(EditCommand::ToggleCell { i: 6, j: 1 }).is_err());
        assert!(!session.modified());
        assert!(session.edits().is_empty());
    }

    #[test]
    fn test_apply_mask_command() {
        let mut session = session();
        let mask = MaskGrid::new(
            vec![0.0, 4.0],
            vec![0.0, 4.0],
            array![
                [MaskCell::Land, MaskCell::Ocean],
                [MaskCell::Ocean, MaskCell::Ocean]
            ],
        )
        .unwrap();

        let outcome = session
            .apply(EditCommand::ApplyMask {
                mask,
                preserve_boundaries: true,
            })
            .unwrap();
        let EditOutcome::MaskApplied(applied) = outcome else {
            panic!("expected mask outcome");
        };
        // Cells nearest to (0, 0): columns 0..=2, rows 0..=2, minus the land centre
        assert_eq!(applied.converted, 8);
        assert!(session.modified());
    }

    #[test]
    fn test_save_stamps_and_clears_modified() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edited.asc");

        let mut session = session();
        session.apply(EditCommand::ToggleCell { i: 1, j: 1 }).unwrap();
        assert!(session.save(&path).unwrap());
        assert!(!session.modified());

        let reopened = GridSession::open(&path, FillConfig::default()).unwrap();
        assert!(reopened.grid().metadata()[0].starts_with("Edited at: "));
        assert_eq!(reopened.grid().depth_at(0, 0), Some(0.0));
        assert_eq!(reopened.source(), Some(path.as_path()));
    }

    #[test]
    fn test_save_without_edits_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unchanged.asc");

        let mut session = session();
        assert!(!session.save(&path).unwrap());
        assert!(!path.exists());
        assert!(session
            .grid()
            .metadata()
            .iter()
            .all(|line| !line.starts_with("Edited at: ")));

        // A second save after writing once is also a no-op
        session.apply(EditCommand::ToggleCell { i: 1, j: 1 }).unwrap();
        assert!(session.save(&path).unwrap());
        let stamps = session.grid().metadata().len();
        assert!(!session.save(&path).unwrap());
        assert_eq!(session.grid().metadata().len(), stamps);
    }
}
