use fiducial_core::{
    align_to_id, axis_points, cube_points, model_view_matrix, perimeter, solve_pnp, CameraParameters, GlMatrix,
    PnpOptions, Pose,
};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::{Code, MarkerError};

/// An identified marker.
///
/// `corners` are in image pixels, ordered so that corner 0 is the top-left
/// cell corner of the upright code, whatever the camera orientation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    pub corners: [Point2<f32>; 4],
    /// Clockwise quarter turns that brought the observed code upright.
    pub rotations: u8,
    /// Physical side length in metres, when known.
    pub size: Option<f32>,
    /// Upright code regenerated from `id`, not the raw scanned cells.
    pub code: Code,
    pub pose: Option<Pose>,
}

/// Object-space corners of a square marker of side `size`, centred at the origin.
pub fn marker_object_points(size: f64) -> [Point3<f64>; 4] {
    let h = size / 2.0;
    [
        Point3::new(-h, -h, 0.0),
        Point3::new(-h, h, 0.0),
        Point3::new(h, h, 0.0),
        Point3::new(h, -h, 0.0),
    ]
}

impl Marker {
    pub fn new(id: u32, corners: [Point2<f32>; 4]) -> Self {
        Self {
            id,
            corners,
            rotations: 0,
            size: None,
            code: Code::for_id(id).unwrap_or_default(),
            pose: None,
        }
    }

    pub fn perimeter(&self) -> f32 {
        perimeter(&self.corners)
    }

    pub fn center(&self) -> Point2<f32> {
        let sum = self.corners.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 4.0)
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = (size > 0.0).then_some(size);
        self
    }

    /// Solve the marker pose for a physical side length `size` and rotate
    /// it about Z to match the decoded orientation.
    pub fn estimate_pose(
        &mut self,
        camera: &CameraParameters,
        size: f32,
        options: PnpOptions,
    ) -> Result<&Pose, MarkerError> {
        if size <= 0.0 || !size.is_finite() {
            return Err(MarkerError::InvalidSize(size));
        }
        let object = marker_object_points(size as f64);
        let image = self.corners.map(|p| Point2::new(p.x as f64, p.y as f64));
        let raw = solve_pnp(&object, &image, camera, options)?;
        self.size = Some(size);
        Ok(self.pose.insert(Pose::new(align_to_id(&raw.rvec, self.rotations), raw.tvec)))
    }

    fn require_pose(&self) -> Result<&Pose, MarkerError> {
        self.pose.as_ref().ok_or(MarkerError::PoseNotAvailable { id: self.id })
    }

    pub fn model_view_matrix(&self) -> Result<GlMatrix, MarkerError> {
        Ok(model_view_matrix(self.require_pose()?)?)
    }

    /// Axes of length twice the marker size, projected into the image.
    pub fn axis_points(&self, camera: &CameraParameters) -> Result<[Point2<f64>; 4], MarkerError> {
        let pose = self.require_pose()?;
        let size = self.size.ok_or(MarkerError::PoseNotAvailable { id: self.id })?;
        Ok(axis_points(pose, camera, 2.0 * size as f64)?)
    }

    /// A cube sitting on the marker, projected into the image.
    pub fn cube_points(&self, camera: &CameraParameters) -> Result<[Point2<f64>; 8], MarkerError> {
        let pose = self.require_pose()?;
        let size = self.size.ok_or(MarkerError::PoseNotAvailable { id: self.id })?;
        Ok(cube_points(pose, camera, size as f64)?)
    }
}
