use fiducial_core::{ImageError, PoseError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarkerError {
    #[error("marker id {0} is out of range (0..=1023)")]
    IdOutOfRange(u32),
    #[error("marker image size {0}px is smaller than the 7-cell grid")]
    ImageTooSmall(usize),
    #[error("marker size must be positive, got {0}")]
    InvalidSize(f32),
    #[error("marker {id} has no pose")]
    PoseNotAvailable { id: u32 },
    #[error(transparent)]
    Pose(#[from] PoseError),
    #[error(transparent)]
    Image(#[from] ImageError),
}
