use fiducial_aruco::Marker;
use fiducial_core::{axis_points, model_view_matrix, CameraParameters, GlMatrix, Pose, PoseError};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::BoardConfiguration;

/// A detected marker placed in its board cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardMarker {
    pub row: usize,
    pub col: usize,
    pub marker: Marker,
}

/// Markers matched against one configuration and the board pose solved
/// from all of their corners. Rebuilt from scratch on every detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub config: BoardConfiguration,
    /// Matched markers in row-major cell order.
    pub markers: Vec<BoardMarker>,
    pub marker_size: Option<f32>,
    pub pose: Option<Pose>,
    /// `markers.len() / (width * height)`.
    pub coverage: f32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("board has no pose")]
    PoseNotAvailable,
    #[error(transparent)]
    Pose(#[from] PoseError),
}

impl Board {
    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn marker(&self, id: u32) -> Option<&BoardMarker> {
        self.markers.iter().find(|m| m.marker.id == id)
    }

    fn require_pose(&self) -> Result<&Pose, BoardError> {
        self.pose.as_ref().ok_or(BoardError::PoseNotAvailable)
    }

    pub fn model_view_matrix(&self) -> Result<GlMatrix, BoardError> {
        Ok(model_view_matrix(self.require_pose()?)?)
    }

    /// Board axes of length twice the marker size, projected into the image.
    pub fn axis_points(&self, camera: &CameraParameters) -> Result<[Point2<f64>; 4], BoardError> {
        let pose = self.require_pose()?;
        let size = self.marker_size.ok_or(BoardError::PoseNotAvailable)?;
        Ok(axis_points(pose, camera, 2.0 * size as f64)?)
    }
}
