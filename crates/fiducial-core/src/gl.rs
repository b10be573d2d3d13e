//! OpenGL-style 4x4 matrices (column-major, `m[row + 4 * col]`) for
//! rendering content registered to a detected pose.

use crate::{CameraError, CameraParameters, Pose, PoseError};

pub type GlMatrix = [f64; 16];

/// Column-major product `a * b`.
pub fn matrix_product_4x4(a: &GlMatrix, b: &GlMatrix) -> GlMatrix {
    let mut out = [0.0; 16];
    for i in 0..4 {
        for j in 0..4 {
            out[i + 4 * j] = (0..4).map(|k| a[i + 4 * k] * b[k + 4 * j]).sum();
        }
    }
    out
}

/// Model-view matrix `[R | t]` with the camera Z row negated (OpenGL looks down -Z).
pub fn model_view_matrix(pose: &Pose) -> Result<GlMatrix, PoseError> {
    if !pose.is_finite() {
        return Err(PoseError::InvalidExtrinsics);
    }
    let r = pose.rotation();
    let t = pose.tvec;
    let mut m = [0.0; 16];
    for row in 0..3 {
        let sign = if row == 2 { -1.0 } else { 1.0 };
        for col in 0..3 {
            m[row + 4 * col] = sign * r[(row, col)];
        }
        m[row + 12] = sign * t[row];
    }
    m[15] = 1.0;
    Ok(m)
}

fn check_clip(near: f64, far: f64) -> Result<(), CameraError> {
    if near.is_finite() && far.is_finite() && far != near {
        Ok(())
    } else {
        Err(CameraError::Invalid)
    }
}

/// Projection matrix written directly from the intrinsics for a viewport of
/// `width x height` pixels.
pub fn simple_projection_matrix(
    camera: &CameraParameters,
    width: f64,
    height: f64,
    near: f64,
    far: f64,
) -> Result<GlMatrix, CameraError> {
    if !camera.is_valid() {
        return Err(CameraError::Invalid);
    }
    if width <= 0.0 || height <= 0.0 {
        return Err(CameraError::InvalidSize { width, height });
    }
    check_clip(near, far)?;

    let mut m = [0.0; 16];
    m[0] = 2.0 * camera.fx / width;
    m[5] = -2.0 * camera.fy / height;
    m[8] = 1.0 - 2.0 * camera.cx / width;
    m[9] = 2.0 * camera.cy / height - 1.0;
    m[10] = (-far - near) / (far - near);
    m[11] = -1.0;
    m[14] = -2.0 * far * near / (far - near);
    Ok(m)
}

fn norm3(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn dot3(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn head(row: &[f64; 4]) -> [f64; 3] {
    [row[0], row[1], row[2]]
}

/// Split a 3x4 camera matrix into an upper-triangular intrinsic part
/// (normalized so that `k[2][2] == 1`) and a rigid `[R | t]` part.
fn decompose_camera_matrix(src: &[[f64; 4]; 3]) -> Result<([[f64; 3]; 3], [[f64; 4]; 3]), CameraError> {
    let mut k = [[0.0f64; 3]; 3];
    let mut rt = [[0.0f64; 4]; 3];

    k[2][2] = norm3(head(&src[2]));
    if k[2][2] <= f64::EPSILON {
        return Err(CameraError::Decomposition);
    }
    for c in 0..4 {
        rt[2][c] = src[2][c] / k[2][2];
    }

    k[1][2] = dot3(head(&rt[2]), head(&src[1]));
    let rem: [f64; 3] = std::array::from_fn(|c| src[1][c] - k[1][2] * rt[2][c]);
    k[1][1] = norm3(rem);
    if k[1][1] <= f64::EPSILON {
        return Err(CameraError::Decomposition);
    }
    for c in 0..3 {
        rt[1][c] = rem[c] / k[1][1];
    }

    k[0][2] = dot3(head(&rt[2]), head(&src[0]));
    k[0][1] = dot3(head(&rt[1]), head(&src[0]));
    let rem: [f64; 3] = std::array::from_fn(|c| src[0][c] - k[0][1] * rt[1][c] - k[0][2] * rt[2][c]);
    k[0][0] = norm3(rem);
    if k[0][0] <= f64::EPSILON {
        return Err(CameraError::Decomposition);
    }
    for c in 0..3 {
        rt[0][c] = rem[c] / k[0][0];
    }

    rt[1][3] = (src[1][3] - k[1][2] * rt[2][3]) / k[1][1];
    rt[0][3] = (src[0][3] - k[0][1] * rt[1][3] - k[0][2] * rt[2][3]) / k[0][0];

    let scale = k[2][2];
    for row in k.iter_mut() {
        for v in row.iter_mut() {
            *v /= scale;
        }
    }
    Ok((k, rt))
}

/// Projection matrix for a viewport of `size`, from intrinsics calibrated at
/// `calibrated_size`, via decomposition of the camera matrix. With `invert`
/// the image Y axis is not flipped.
pub fn gl_projection_matrix(
    camera: &CameraParameters,
    calibrated_size: (f64, f64),
    size: (f64, f64),
    near: f64,
    far: f64,
    invert: bool,
) -> Result<GlMatrix, CameraError> {
    if !camera.is_valid() {
        return Err(CameraError::Invalid);
    }
    let (w0, h0) = calibrated_size;
    let (width, height) = size;
    if w0 <= 0.0 || h0 <= 0.0 {
        return Err(CameraError::InvalidSize { width: w0, height: h0 });
    }
    if width <= 0.0 || height <= 0.0 {
        return Err(CameraError::InvalidSize { width, height });
    }
    check_clip(near, far)?;

    let (ax, ay) = (width / w0, height / h0);
    // third column negated: OpenGL looks down -Z
    let cam = [
        [camera.fx * ax, 0.0, -camera.cx * ax, 0.0],
        [0.0, camera.fy * ay, -camera.cy * ay, 0.0],
        [0.0, 0.0, -1.0, 0.0],
    ];
    let (k, rt) = decompose_camera_matrix(&cam)?;

    let q = [
        [2.0 * k[0][0] / width, 2.0 * k[0][1] / width, 2.0 * k[0][2] / width - 1.0, 0.0],
        [0.0, 2.0 * k[1][1] / height, 2.0 * k[1][2] / height - 1.0, 0.0],
        [0.0, 0.0, (far + near) / (far - near), -2.0 * far * near / (far - near)],
        [0.0, 0.0, 1.0, 0.0],
    ];

    let mut m = [0.0; 16];
    for i in 0..4 {
        for j in 0..3 {
            m[i + j * 4] = q[i][0] * rt[0][j] + q[i][1] * rt[1][j] + q[i][2] * rt[2][j];
        }
        m[i + 12] = q[i][0] * rt[0][3] + q[i][1] * rt[1][3] + q[i][2] * rt[2][3] + q[i][3];
    }

    if !invert {
        for idx in [1, 5, 9, 13] {
            m[idx] = -m[idx];
        }
    }
    Ok(m)
}
