//! End-to-end helpers on top of the `image` crate.

use std::path::Path;

use ::image::{DynamicImage, ImageBuffer, Luma};

use crate::{aruco, board, core};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
    #[error(transparent)]
    Buffer(#[from] core::ImageError),
    #[error(transparent)]
    Marker(#[from] aruco::MarkerError),
    #[error(transparent)]
    BoardConfig(#[from] board::BoardConfigError),
    #[error("image dimensions {width}x{height} do not fit the buffer")]
    InvalidDimensions { width: usize, height: usize },
}

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Copy a core image into an `image::GrayImage`.
pub fn to_image(img: &core::GrayImage) -> Result<::image::GrayImage, DetectError> {
    let invalid = || DetectError::InvalidDimensions {
        width: img.width,
        height: img.height,
    };
    let width = u32::try_from(img.width).map_err(|_| invalid())?;
    let height = u32::try_from(img.height).map_err(|_| invalid())?;
    ImageBuffer::<Luma<u8>, _>::from_raw(width, height, img.data.clone()).ok_or_else(invalid)
}

/// Greyscale frame from any decoded image. Colour converts with BT.601 weights.
pub fn from_dynamic(img: &DynamicImage) -> Result<core::GrayImage, DetectError> {
    if let DynamicImage::ImageLuma8(gray) = img {
        let view = gray_view(gray);
        return Ok(core::ImageView::gray(view).to_gray()?);
    }
    let rgb = img.to_rgb8();
    let view = core::ImageView {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
        channels: 3,
        data: rgb.as_raw(),
    };
    Ok(view.to_gray()?)
}

pub fn load_gray(path: impl AsRef<Path>) -> Result<core::GrayImage, DetectError> {
    from_dynamic(&::image::open(path)?)
}

pub fn save_gray(img: &core::GrayImage, path: impl AsRef<Path>) -> Result<(), DetectError> {
    to_image(img)?.save(path)?;
    Ok(())
}

/// Copy `img` onto a white canvas with a `margin` pixel border.
pub fn with_white_margin(img: &core::GrayImage, margin: usize) -> core::GrayImage {
    let mut canvas = core::GrayImage::filled(img.width + 2 * margin, img.height + 2 * margin, 255);
    canvas.blit(&img.view(), margin, margin);
    canvas
}

/// Run the marker detector on an `image::GrayImage`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, detector, camera), fields(width = img.width(), height = img.height()))
)]
pub fn detect_markers(
    img: &::image::GrayImage,
    detector: &mut aruco::MarkerDetector,
    camera: Option<&core::CameraParameters>,
    marker_size: f32,
) -> Result<Vec<aruco::Marker>, DetectError> {
    Ok(detector.detect_gray(&gray_view(img), camera, marker_size)?)
}

/// Detect markers and match them against `config`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(width = img.width(), height = img.height()))
)]
pub fn detect_board(
    img: &::image::GrayImage,
    params: aruco::MarkerDetectorParams,
    config: board::BoardConfiguration,
    camera: Option<&core::CameraParameters>,
    marker_size: f32,
) -> Result<board::Board, DetectError> {
    let board_detector = board::BoardDetector::new(config)?;
    let mut detector = aruco::MarkerDetector::new(params);
    let markers = detect_markers(img, &mut detector, camera, marker_size)?;
    Ok(board_detector.detect(&markers, camera, marker_size))
}
