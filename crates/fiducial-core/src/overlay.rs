//! Image-space points for drawing a pose: coordinate axes and a cube.

use nalgebra::{Point2, Point3};

use crate::{CameraParameters, PoseError, Pose};

fn project_all<const N: usize>(
    pose: &Pose,
    camera: &CameraParameters,
    pts: [Point3<f64>; N],
) -> Result<[Point2<f64>; N], PoseError> {
    if !camera.is_valid() {
        return Err(PoseError::InvalidCamera);
    }
    if !pose.is_finite() {
        return Err(PoseError::InvalidExtrinsics);
    }
    let mut out = [Point2::origin(); N];
    for (dst, p) in out.iter_mut().zip(&pts) {
        *dst = camera.project(pose, p).ok_or(PoseError::Degenerate)?;
    }
    Ok(out)
}

/// Origin followed by the tips of the X, Y and Z axes of length `length`.
pub fn axis_points(pose: &Pose, camera: &CameraParameters, length: f64) -> Result<[Point2<f64>; 4], PoseError> {
    project_all(
        pose,
        camera,
        [
            Point3::origin(),
            Point3::new(length, 0.0, 0.0),
            Point3::new(0.0, length, 0.0),
            Point3::new(0.0, 0.0, length),
        ],
    )
}

/// The eight corners of a cube of side `size` standing on the marker plane:
/// the base square at `z = 0` first, then the top square at `z = size`.
pub fn cube_points(pose: &Pose, camera: &CameraParameters, size: f64) -> Result<[Point2<f64>; 8], PoseError> {
    let h = size / 2.0;
    project_all(
        pose,
        camera,
        [
            Point3::new(-h, -h, 0.0),
            Point3::new(-h, h, 0.0),
            Point3::new(h, h, 0.0),
            Point3::new(h, -h, 0.0),
            Point3::new(-h, -h, size),
            Point3::new(-h, h, size),
            Point3::new(h, h, size),
            Point3::new(h, -h, size),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn fronto_parallel_axes_project_as_expected() {
        let camera = CameraParameters::new(500.0, 500.0, 320.0, 240.0);
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let pts = axis_points(&pose, &camera, 0.1).expect("valid");
        assert_relative_eq!(pts[0], Point2::new(320.0, 240.0), epsilon = 1e-9);
        assert_relative_eq!(pts[1], Point2::new(370.0, 240.0), epsilon = 1e-9);
        assert_relative_eq!(pts[2], Point2::new(320.0, 290.0), epsilon = 1e-9);
        // Z axis points along the optical axis: projects onto the origin
        assert_relative_eq!(pts[3], Point2::new(320.0, 240.0), epsilon = 1e-9);
    }

    #[test]
    fn cube_top_face_shrinks_away_from_camera() {
        let camera = CameraParameters::new(500.0, 500.0, 320.0, 240.0);
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let pts = cube_points(&pose, &camera, 0.2).expect("valid");
        let base = (pts[2] - pts[0]).norm();
        let top = (pts[6] - pts[4]).norm();
        assert!(top < base);
    }

    #[test]
    fn invalid_camera_fails() {
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(
            axis_points(&pose, &CameraParameters::default(), 1.0),
            Err(PoseError::InvalidCamera)
        );
    }
}
