//! Core raster and geometry primitives for square fiducial marker detection.
//!
//! This crate knows nothing about marker codes or boards. It provides the
//! building blocks the detectors are assembled from: greyscale views,
//! binarization, border following, polygon approximation, perspective
//! rectification, the camera model, planar PnP and the OpenGL helpers used to
//! render content on top of a detected pose.

mod camera;
mod contours;
mod edges;
mod gl;
mod homography;
mod image;
mod logger;
mod overlay;
mod pnp;
mod polygon;
mod pose;
mod threshold;

pub use camera::{CameraError, CameraParameters};
pub use contours::{find_contours, BorderKind, Contour};
pub use edges::canny;
pub use gl::{gl_projection_matrix, matrix_product_4x4, model_view_matrix, simple_projection_matrix, GlMatrix};
pub use homography::{estimate_homography, homography_from_4pt, warp_quad_to_square, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, ImageError, ImageView};
pub use overlay::{axis_points, cube_points};
pub use pnp::{rms_error, solve_pnp, PnpOptions, PoseError};
pub use polygon::{approx_polygon_closed, is_convex, perimeter};
pub use pose::{
    align_to_id, matrix_product_3x3, rotate_x_axis, rotate_z_axis, rotation_to_rvec, rvec_to_rotation, Pose,
};
pub use threshold::{
    adaptive_mean_inv, binarize, otsu_threshold, threshold_binary, threshold_inv, ThresholdMethod,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_env, parse_level, LoggerError, LOG_ENV};
