//! Static board layout.

use std::collections::HashSet;

use fiducial_aruco::MAX_MARKER_ID;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Grid of marker ids plus the printed marker size and gap.
///
/// `marker_ids[row][col]`; `None` marks an empty cell. Sizes are in the
/// pixel units the board was printed with; only their ratio matters for
/// pose estimation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardConfiguration {
    pub width: usize,
    pub height: usize,
    pub marker_ids: Vec<Vec<Option<u32>>>,
    pub marker_size_pix: u32,
    pub marker_distance_pix: u32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardConfigError {
    #[error("board width and height must be >= 1")]
    EmptyGrid,
    #[error("expected {expected} rows of marker ids, got {got}")]
    RowCount { expected: usize, got: usize },
    #[error("row {row} has {got} marker ids, expected {expected}")]
    ColumnCount { row: usize, expected: usize, got: usize },
    #[error("marker id {0} is out of range (0..=1023)")]
    IdOutOfRange(u32),
    #[error("marker id {0} appears more than once")]
    DuplicateId(u32),
    #[error("marker_size_pix must be > 0")]
    InvalidMarkerSize,
}

impl BoardConfiguration {
    /// Validate and build a configuration.
    pub fn new(
        width: usize,
        height: usize,
        marker_ids: Vec<Vec<Option<u32>>>,
        marker_size_pix: u32,
        marker_distance_pix: u32,
    ) -> Result<Self, BoardConfigError> {
        let config = Self {
            width,
            height,
            marker_ids,
            marker_size_pix,
            marker_distance_pix,
        };
        config.validate()?;
        Ok(config)
    }

    /// Every cell used, ids assigned row-major starting at `first_id`.
    pub fn sequential(
        width: usize,
        height: usize,
        first_id: u32,
        marker_size_pix: u32,
        marker_distance_pix: u32,
    ) -> Result<Self, BoardConfigError> {
        if width == 0 || height == 0 {
            return Err(BoardConfigError::EmptyGrid);
        }
        let count = u32::try_from(width * height).unwrap_or(u32::MAX);
        let last = first_id.saturating_add(count - 1);
        if last > MAX_MARKER_ID {
            return Err(BoardConfigError::IdOutOfRange(last));
        }
        let marker_ids = (0..height)
            .map(|row| {
                (0..width)
                    .map(|col| Some(first_id + (row * width + col) as u32))
                    .collect()
            })
            .collect();
        Self::new(width, height, marker_ids, marker_size_pix, marker_distance_pix)
    }

    pub fn validate(&self) -> Result<(), BoardConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(BoardConfigError::EmptyGrid);
        }
        if self.marker_size_pix == 0 {
            return Err(BoardConfigError::InvalidMarkerSize);
        }
        if self.marker_ids.len() != self.height {
            return Err(BoardConfigError::RowCount {
                expected: self.height,
                got: self.marker_ids.len(),
            });
        }
        let mut seen = HashSet::new();
        for (row, ids) in self.marker_ids.iter().enumerate() {
            if ids.len() != self.width {
                return Err(BoardConfigError::ColumnCount {
                    row,
                    expected: self.width,
                    got: ids.len(),
                });
            }
            for &id in ids.iter().flatten() {
                if id > MAX_MARKER_ID {
                    return Err(BoardConfigError::IdOutOfRange(id));
                }
                if !seen.insert(id) {
                    return Err(BoardConfigError::DuplicateId(id));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.width * self.height
    }

    pub fn id_at(&self, row: usize, col: usize) -> Option<u32> {
        self.marker_ids.get(row)?.get(col).copied().flatten()
    }

    /// Used cells in row-major order as `(row, col, id)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.marker_ids.iter().enumerate().flat_map(|(row, ids)| {
            ids.iter()
                .enumerate()
                .filter_map(move |(col, id)| id.map(|id| (row, col, id)))
        })
    }

    /// Gap between markers in the units of `marker_size`.
    pub fn marker_distance(&self, marker_size: f64) -> f64 {
        self.marker_distance_pix as f64 * marker_size / self.marker_size_pix as f64
    }

    /// Object-space corners of the marker in cell `(row, col)` for markers of
    /// side `marker_size`, in marker corner order. The board centre is the
    /// origin; X runs down the rows and Y along the columns.
    pub fn object_corners(&self, row: usize, col: usize, marker_size: f64) -> [Point3<f64>; 4] {
        let s = marker_size;
        let d = self.marker_distance(s);
        let pitch = s + d;
        let extent = |n: usize| n as f64 * s + n.saturating_sub(1) as f64 * d;
        let ax = row as f64 * pitch - extent(self.height) / 2.0;
        let ay = col as f64 * pitch - extent(self.width) / 2.0;
        [
            Point3::new(ax, ay, 0.0),
            Point3::new(ax, ay + s, 0.0),
            Point3::new(ax + s, ay + s, 0.0),
            Point3::new(ax + s, ay, 0.0),
        ]
    }
}
