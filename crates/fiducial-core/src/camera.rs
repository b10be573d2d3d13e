//! Pinhole camera with Brown–Conrady distortion (OpenCV coefficient order).

use nalgebra::{Matrix3, Point2, Point3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Pose;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("invalid camera parameters")]
    Invalid,
    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
    #[error("camera matrix decomposition failed")]
    Decomposition,
}

/// Intrinsics `fx, fy, cx, cy` plus distortion `k1 k2 p1 p2 [k3]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub distortion: Vec<f64>,
    /// Image size `[width, height]` the intrinsics were calibrated at.
    #[serde(default)]
    pub image_size: Option<[f64; 2]>,
}

impl Default for CameraParameters {
    /// An all-zero (invalid) camera: detection runs without pose.
    fn default() -> Self {
        Self {
            fx: 0.0,
            fy: 0.0,
            cx: 0.0,
            cy: 0.0,
            distortion: Vec::new(),
            image_size: None,
        }
    }
}

impl CameraParameters {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            ..Self::default()
        }
    }

    pub fn with_distortion(mut self, coeffs: &[f64]) -> Self {
        self.distortion = coeffs.to_vec();
        self
    }

    pub fn with_image_size(mut self, width: f64, height: f64) -> Self {
        self.image_size = Some([width, height]);
        self
    }

    /// Usable for pose estimation: positive finite focal lengths, finite
    /// principal point, and 0, 4, 5 or 8 finite distortion coefficients.
    pub fn is_valid(&self) -> bool {
        let finite = [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .chain(&self.distortion)
            .all(|v| v.is_finite());
        finite
            && self.fx > 0.0
            && self.fy > 0.0
            && matches!(self.distortion.len(), 0 | 4 | 5 | 8)
    }

    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Distortion coefficients in OpenCV order `k1 k2 p1 p2 [k3 [k4 k5 k6]]`.
    pub fn dist_coeff(&self) -> &[f64] {
        &self.distortion
    }

    /// Intrinsics rescaled from the calibration size to `(width, height)`.
    pub fn resized(&self, width: f64, height: f64) -> Result<Self, CameraError> {
        if !self.is_valid() {
            return Err(CameraError::Invalid);
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(CameraError::InvalidSize { width, height });
        }
        let Some([w0, h0]) = self.image_size else {
            return Ok(self.clone().with_image_size(width, height));
        };
        if w0 <= 0.0 || h0 <= 0.0 {
            return Err(CameraError::InvalidSize {
                width: w0,
                height: h0,
            });
        }
        let (ax, ay) = (width / w0, height / h0);
        Ok(Self {
            fx: self.fx * ax,
            cx: self.cx * ax,
            fy: self.fy * ay,
            cy: self.cy * ay,
            distortion: self.distortion.clone(),
            image_size: Some([width, height]),
        })
    }

    fn coeff(&self, i: usize) -> f64 {
        self.distortion.get(i).copied().unwrap_or(0.0)
    }

    /// Apply lens distortion to a normalized image point.
    pub fn distort(&self, p: Point2<f64>) -> Point2<f64> {
        if self.distortion.is_empty() {
            return p;
        }
        let (k1, k2, p1, p2, k3) = (self.coeff(0), self.coeff(1), self.coeff(2), self.coeff(3), self.coeff(4));
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let mut radial = 1.0 + r2 * (k1 + r2 * (k2 + r2 * k3));
        if self.distortion.len() == 8 {
            let (k4, k5, k6) = (self.coeff(5), self.coeff(6), self.coeff(7));
            radial /= 1.0 + r2 * (k4 + r2 * (k5 + r2 * k6));
        }
        Point2::new(
            x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x),
            y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y,
        )
    }

    /// Pixel to undistorted normalized coordinates (fixed-point iteration).
    pub fn undistort_pixel(&self, px: Point2<f64>) -> Point2<f64> {
        let d = Point2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy);
        if self.distortion.is_empty() {
            return d;
        }
        let mut p = d;
        for _ in 0..20 {
            let dp = self.distort(p);
            let next = Point2::new(p.x + (d.x - dp.x), p.y + (d.y - dp.y));
            let step = (next - p).norm();
            p = next;
            if step < 1e-12 {
                break;
            }
        }
        p
    }

    /// Normalized (undistorted) point to pixel.
    pub fn normalized_to_pixel(&self, p: Point2<f64>) -> Point2<f64> {
        let d = self.distort(p);
        Point2::new(self.fx * d.x + self.cx, self.fy * d.y + self.cy)
    }

    /// Project an object-space point through `pose` into pixel coordinates.
    /// Points at or behind the camera centre map to `None`.
    pub fn project(&self, pose: &Pose, p: &Point3<f64>) -> Option<Point2<f64>> {
        let pc = pose.transform_point(p);
        if pc.z <= 1e-12 {
            return None;
        }
        Some(self.normalized_to_pixel(Point2::new(pc.x / pc.z, pc.y / pc.z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn validity_rules() {
        assert!(!CameraParameters::default().is_valid());
        let cam = CameraParameters::new(500.0, 500.0, 320.0, 240.0);
        assert!(cam.is_valid());
        assert!(!cam.clone().with_distortion(&[0.1, 0.0, 0.0]).is_valid());
        assert!(!cam.clone().with_distortion(&[f64::NAN, 0.0, 0.0, 0.0]).is_valid());
        assert!(cam.with_distortion(&[0.1, -0.05, 0.001, 0.0, 0.01]).is_valid());
    }

    #[test]
    fn matrix_and_coefficients_accessors() {
        let cam = CameraParameters::new(500.0, 510.0, 320.0, 240.0).with_distortion(&[-0.1, 0.02, 0.0, 0.0]);
        let k = cam.camera_matrix();
        assert_eq!((k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)], k[(2, 2)]), (500.0, 510.0, 320.0, 240.0, 1.0));
        assert_eq!(cam.dist_coeff(), &[-0.1, 0.02, 0.0, 0.0]);
        assert!(CameraParameters::default().dist_coeff().is_empty());
    }

    #[test]
    fn undistort_inverts_distort() {
        let cam = CameraParameters::new(600.0, 610.0, 320.0, 240.0)
            .with_distortion(&[-0.21, 0.08, 0.0012, -0.0008, -0.01]);
        let p = Point2::new(0.31, -0.22);
        let px = cam.normalized_to_pixel(p);
        let back = cam.undistort_pixel(px);
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn resize_scales_intrinsics() {
        let cam = CameraParameters::new(800.0, 600.0, 320.0, 240.0).with_image_size(640.0, 480.0);
        let half = cam.resized(320.0, 240.0).expect("valid");
        assert_relative_eq!(half.fx, 400.0);
        assert_relative_eq!(half.fy, 300.0);
        assert_relative_eq!(half.cx, 160.0);
        assert_relative_eq!(half.cy, 120.0);
        assert_eq!(
            CameraParameters::default().resized(10.0, 10.0),
            Err(CameraError::Invalid)
        );
    }

    #[test]
    fn loads_from_json_with_defaults() {
        let cam: CameraParameters =
            serde_json::from_str(r#"{"fx":700,"fy":700,"cx":320,"cy":240}"#).expect("parse");
        assert!(cam.is_valid());
        assert!(cam.distortion.is_empty());
        assert_eq!(cam.image_size, None);
    }
}
