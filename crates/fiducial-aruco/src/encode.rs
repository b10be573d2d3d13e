//! Printable marker images.

use fiducial_core::GrayImage;

use crate::{Code, MarkerError};

/// Render marker `id` as a `size x size` greyscale image (black border,
/// white cells 255). Pixels beyond `7 * (size / 7)` stay black.
pub fn create_marker_image(id: u32, size: usize) -> Result<GrayImage, MarkerError> {
    Code::for_id(id)?.render(size)
}

/// Marker image surrounded by a white quiet zone of `margin` pixels.
pub fn create_marker_image_with_margin(id: u32, size: usize, margin: usize) -> Result<GrayImage, MarkerError> {
    let marker = create_marker_image(id, size)?;
    let mut canvas = GrayImage::filled(size + 2 * margin, size + 2 * margin, 255);
    canvas.blit(&marker.view(), margin, margin);
    Ok(canvas)
}
