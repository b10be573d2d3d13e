//! Rigid object-to-camera pose stored as a Rodrigues rotation vector plus
//! translation, and the axis re-alignment helpers applied after PnP.

use nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Maps object coordinates into camera coordinates: `Xc = R(rvec) * Xo + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl Pose {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    pub fn from_rotation(r: &Matrix3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            rvec: rotation_to_rvec(r),
            tvec,
        }
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        rvec_to_rotation(&self.rvec)
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation() * p.coords + self.tvec)
    }

    pub fn is_finite(&self) -> bool {
        self.rvec.iter().chain(self.tvec.iter()).all(|v| v.is_finite())
    }
}

pub fn rvec_to_rotation(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_scaled_axis(*rvec).into_inner()
}

/// Rotation vector of the orthonormal matrix `r`. Goes through a quaternion
/// so half turns keep their axis.
pub fn rotation_to_rvec(r: &Matrix3<f64>) -> Vector3<f64> {
    let rot = Rotation3::from_matrix_unchecked(*r);
    UnitQuaternion::from_rotation_matrix(&rot).scaled_axis()
}

/// Row-major 3x3 product `a * b`.
pub fn matrix_product_3x3(a: &[f64; 9], b: &[f64; 9]) -> [f64; 9] {
    let mut out = [0.0; 9];
    for i in 0..3 {
        for j in 0..3 {
            out[i * 3 + j] = (0..3).map(|k| a[i * 3 + k] * b[k * 3 + j]).sum();
        }
    }
    out
}

/// Rotate the object frame of `rvec` by `degrees` about its own Z axis:
/// `R' = R * Rz(degrees)`.
pub fn rotate_z_axis(rvec: &Vector3<f64>, degrees: f64) -> Vector3<f64> {
    let (s, c) = degrees.to_radians().sin_cos();
    let rz = Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0);
    rotation_to_rvec(&(rvec_to_rotation(rvec) * rz))
}

/// Rotate the object frame of `rvec` by +90 degrees about its own X axis.
pub fn rotate_x_axis(rvec: &Vector3<f64>) -> Vector3<f64> {
    let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0);
    rotation_to_rvec(&(rvec_to_rotation(rvec) * rx))
}

/// Re-align a marker pose with its decoded orientation: Z rotation by
/// `(rotations + 1) * 90` degrees.
pub fn align_to_id(rvec: &Vector3<f64>, rotations: u8) -> Vector3<f64> {
    rotate_z_axis(rvec, (rotations as f64 + 1.0) * 90.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn z_rotation_moves_x_axis_onto_y() {
        let rvec = Vector3::zeros();
        let r = rvec_to_rotation(&rotate_z_axis(&rvec, 90.0));
        let x = r * Vector3::x();
        assert_relative_eq!(x, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn full_turn_is_identity() {
        let rvec = Vector3::new(0.2, -0.4, 1.1);
        let back = rotate_z_axis(&rotate_z_axis(&rvec, 270.0), 90.0);
        assert_relative_eq!(rvec_to_rotation(&back), rvec_to_rotation(&rvec), epsilon = 1e-12);
    }

    #[test]
    fn align_uses_one_extra_quarter_turn() {
        let rvec = Vector3::new(0.3, 0.1, -0.2);
        for r in 0..4u8 {
            let expected = rotate_z_axis(&rvec, 90.0 * (r as f64 + 1.0));
            assert_relative_eq!(
                rvec_to_rotation(&align_to_id(&rvec, r)),
                rvec_to_rotation(&expected),
                epsilon = 1e-12
            );
        }
        // three rotations complete the turn
        assert_relative_eq!(
            rvec_to_rotation(&align_to_id(&rvec, 3)),
            rvec_to_rotation(&rvec),
            epsilon = 1e-12
        );
    }

    #[test]
    fn half_turn_keeps_its_axis() {
        let r = Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0);
        let rvec = rotation_to_rvec(&r);
        assert_relative_eq!(rvec.norm(), std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(rvec_to_rotation(&rvec), r, epsilon = 1e-12);
    }

    #[test]
    fn x_rotation_maps_y_to_z() {
        let r = rvec_to_rotation(&rotate_x_axis(&Vector3::zeros()));
        assert_relative_eq!(r * Vector3::y(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn row_major_product() {
        let a = [1.0, 2.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let b = [1.0, 0.0, 0.0, 3.0, 1.0, 0.0, 0.0, 0.0, 2.0];
        assert_eq!(matrix_product_3x3(&a, &b), [7.0, 2.0, 0.0, 3.0, 1.0, 0.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn pose_transforms_points() {
        let pose = Pose::new(Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2), Vector3::new(0.0, 0.0, 5.0));
        let p = pose.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 5.0), epsilon = 1e-12);
    }
}
