//! Perspective-n-point for planar targets.
//!
//! The linear estimate decomposes the object-plane to normalized-image
//! homography; Levenberg–Marquardt then minimizes pixel reprojection error
//! with lens distortion taken into account.

use nalgebra::{Matrix2x6, Matrix3, Matrix6, Point2, Point3, Vector2, Vector3, Vector6};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{estimate_homography, rotation_to_rvec, CameraParameters, Pose};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    #[error("need at least 4 correspondences, got {0}")]
    TooFewPoints(usize),
    #[error("object/image point counts differ ({object} vs {image})")]
    LengthMismatch { object: usize, image: usize },
    #[error("object points must lie on the z = 0 plane")]
    NonPlanar,
    #[error("invalid camera parameters")]
    InvalidCamera,
    #[error("degenerate point configuration")]
    Degenerate,
    #[error("extrinsic parameters are not available")]
    InvalidExtrinsics,
}

#[derive(Clone, Copy, Debug)]
pub struct PnpOptions {
    pub refine: bool,
    pub max_iters: usize,
}

impl Default for PnpOptions {
    fn default() -> Self {
        Self {
            refine: true,
            max_iters: 30,
        }
    }
}

/// Pose of a planar (z = 0) object from 2D-3D correspondences.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(object, image, camera), fields(n = object.len()))
)]
pub fn solve_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraParameters,
    options: PnpOptions,
) -> Result<Pose, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::LengthMismatch {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < 4 {
        return Err(PoseError::TooFewPoints(object.len()));
    }
    if !camera.is_valid() {
        return Err(PoseError::InvalidCamera);
    }
    if object.iter().any(|p| p.z.abs() > 1e-9) {
        return Err(PoseError::NonPlanar);
    }

    let plane: Vec<Point2<f64>> = object.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let normalized: Vec<Point2<f64>> = image.iter().map(|&p| camera.undistort_pixel(p)).collect();
    let h = estimate_homography(&plane, &normalized).ok_or(PoseError::Degenerate)?;
    let initial = pose_from_homography(&h.h)?;

    if !options.refine {
        return Ok(initial);
    }
    let refined = refine_pose(&initial, object, image, camera, options.max_iters);
    log::trace!(
        "pnp: rms {:.4}px -> {:.4}px",
        rms_error(&initial, object, image, camera),
        rms_error(&refined, object, image, camera)
    );
    Ok(refined)
}

/// Decompose `H ~ [r1 r2 t]` (normalized camera) into a pose in front of the camera.
fn pose_from_homography(h: &Matrix3<f64>) -> Result<Pose, PoseError> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm1 = h1.norm();
    let norm2 = h2.norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return Err(PoseError::Degenerate);
    }
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t: Vector3<f64> = h3 * lambda;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(PoseError::Degenerate);
    }

    let approx = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = approx.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::Degenerate);
    };
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u = u;
        u.column_mut(2).neg_mut();
        r = u * v_t;
    }

    let pose = Pose::new(rotation_to_rvec(&r), t);
    if pose.is_finite() {
        Ok(pose)
    } else {
        Err(PoseError::Degenerate)
    }
}

fn project(camera: &CameraParameters, pose: &Pose, p: &Point3<f64>) -> Point2<f64> {
    let pc = pose.transform_point(p);
    let z = if pc.z.abs() <= 1e-12 { 1e-12 } else { pc.z };
    camera.normalized_to_pixel(Point2::new(pc.x / z, pc.y / z))
}

fn squared_error(pose: &Pose, object: &[Point3<f64>], image: &[Point2<f64>], camera: &CameraParameters) -> f64 {
    object
        .iter()
        .zip(image)
        .map(|(p3, p2)| (project(camera, pose, p3) - p2).norm_squared())
        .sum()
}

/// Root-mean-square reprojection error in pixels.
pub fn rms_error(pose: &Pose, object: &[Point3<f64>], image: &[Point2<f64>], camera: &CameraParameters) -> f64 {
    if object.is_empty() {
        return 0.0;
    }
    (squared_error(pose, object, image, camera) / object.len() as f64).sqrt()
}

fn to_params(pose: &Pose) -> Vector6<f64> {
    Vector6::new(pose.rvec.x, pose.rvec.y, pose.rvec.z, pose.tvec.x, pose.tvec.y, pose.tvec.z)
}

fn from_params(p: &Vector6<f64>) -> Pose {
    Pose::new(Vector3::new(p[0], p[1], p[2]), Vector3::new(p[3], p[4], p[5]))
}

/// Levenberg–Marquardt on the reprojection error with a forward-difference Jacobian.
fn refine_pose(
    initial: &Pose,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraParameters,
    max_iters: usize,
) -> Pose {
    const EPS: f64 = 1e-7;
    let mut params = to_params(initial);
    let mut lambda = 1e-3;
    let mut current = squared_error(initial, object, image, camera);

    for _ in 0..max_iters {
        if current < 1e-20 {
            break;
        }
        let base = from_params(&params);
        let mut jtj = Matrix6::<f64>::zeros();
        let mut jtr = Vector6::<f64>::zeros();

        for (p3, p2) in object.iter().zip(image) {
            let pred = project(camera, &base, p3);
            let mut j = Matrix2x6::<f64>::zeros();
            for k in 0..6 {
                let mut perturbed = params;
                perturbed[k] += EPS;
                let q = project(camera, &from_params(&perturbed), p3);
                j[(0, k)] = (q.x - pred.x) / EPS;
                j[(1, k)] = (q.y - pred.y) / EPS;
            }
            let r = Vector2::new(pred.x - p2.x, pred.y - p2.y);
            jtj += j.transpose() * j;
            jtr += j.transpose() * r;
        }

        let mut lhs = jtj;
        for i in 0..6 {
            lhs[(i, i)] *= 1.0 + lambda;
        }
        let Some(delta) = lhs.lu().solve(&jtr) else {
            break;
        };

        let candidate = params - delta;
        let err = squared_error(&from_params(&candidate), object, image, camera);
        if err < current {
            params = candidate;
            current = err;
            lambda /= 10.0;
            if delta.norm() < 1e-10 {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    from_params(&params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rvec_to_rotation;
    use approx::assert_relative_eq;

    fn square(side: f64) -> Vec<Point3<f64>> {
        let h = side / 2.0;
        vec![
            Point3::new(-h, -h, 0.0),
            Point3::new(-h, h, 0.0),
            Point3::new(h, h, 0.0),
            Point3::new(h, -h, 0.0),
        ]
    }

    fn assert_pose_close(a: &Pose, b: &Pose, tol: f64) {
        assert_relative_eq!(rvec_to_rotation(&a.rvec), rvec_to_rotation(&b.rvec), epsilon = tol);
        assert_relative_eq!(a.tvec, b.tvec, epsilon = tol);
    }

    #[test]
    fn recovers_pose_of_square_without_distortion() {
        let camera = CameraParameters::new(800.0, 800.0, 320.0, 240.0);
        let gt = Pose::new(Vector3::new(2.9, 0.25, -0.1), Vector3::new(0.03, -0.02, 0.6));
        let object = square(0.1);
        let image: Vec<_> = object.iter().map(|p| camera.project(&gt, p).expect("in front")).collect();

        let pose = solve_pnp(&object, &image, &camera, PnpOptions::default()).expect("pose");
        assert_pose_close(&pose, &gt, 1e-6);
        assert!(rms_error(&pose, &object, &image, &camera) < 1e-6);
    }

    #[test]
    fn refinement_accounts_for_distortion() {
        let camera = CameraParameters::new(700.0, 700.0, 330.0, 250.0)
            .with_distortion(&[-0.25, 0.07, 0.0005, -0.0004, 0.0]);
        let gt = Pose::new(Vector3::new(3.0, -0.2, 0.3), Vector3::new(-0.1, 0.05, 0.8));
        let object: Vec<Point3<f64>> = (0..3)
            .flat_map(|r| (0..3).map(move |c| Point3::new(c as f64 * 0.05, r as f64 * 0.05, 0.0)))
            .collect();
        let image: Vec<_> = object.iter().map(|p| camera.project(&gt, p).expect("in front")).collect();

        let pose = solve_pnp(&object, &image, &camera, PnpOptions::default()).expect("pose");
        assert_pose_close(&pose, &gt, 1e-5);
    }

    #[test]
    fn rejects_bad_input() {
        let camera = CameraParameters::new(800.0, 800.0, 320.0, 240.0);
        let object = square(1.0);
        let image = vec![Point2::new(0.0, 0.0); 3];
        assert_eq!(
            solve_pnp(&object, &image, &camera, PnpOptions::default()),
            Err(PoseError::LengthMismatch { object: 4, image: 3 })
        );
        assert_eq!(
            solve_pnp(&object[..3], &image, &camera, PnpOptions::default()),
            Err(PoseError::TooFewPoints(3))
        );
        let image4 = vec![Point2::new(1.0, 1.0); 4];
        assert_eq!(
            solve_pnp(&object, &image4, &CameraParameters::default(), PnpOptions::default()),
            Err(PoseError::InvalidCamera)
        );
        let mut lifted = object.clone();
        lifted[2].z = 0.5;
        assert_eq!(
            solve_pnp(&lifted, &image4, &camera, PnpOptions::default()),
            Err(PoseError::NonPlanar)
        );
    }
}
