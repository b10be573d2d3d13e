//! Printable board images.

use fiducial_aruco::{create_marker_image, MarkerError};
use fiducial_core::GrayImage;

use crate::BoardConfiguration;

/// Render `config` on a white canvas: the marker of cell `(row, col)` has its
/// top-left corner at `(col, row) * (marker_size_pix + marker_distance_pix)`.
/// Empty cells stay white.
pub fn render_board_image(config: &BoardConfiguration) -> Result<GrayImage, MarkerError> {
    let size = config.marker_size_pix as usize;
    let gap = config.marker_distance_pix as usize;
    let pitch = size + gap;
    let extent = |n: usize| n * size + n.saturating_sub(1) * gap;

    let mut canvas = GrayImage::filled(extent(config.width), extent(config.height), 255);
    for (row, col, id) in config.cells() {
        let marker = create_marker_image(id, size)?;
        canvas.blit(&marker.view(), col * pitch, row * pitch);
    }
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_layout() {
        let cfg = BoardConfiguration::new(3, 2, vec![vec![Some(1), None, Some(2)], vec![Some(3), Some(4), Some(5)]], 70, 20)
            .expect("valid");
        let img = render_board_image(&cfg).expect("render");
        assert_eq!((img.width, img.height), (250, 160));
        // gaps and the empty cell are white, marker borders black
        assert_eq!(img.get(80, 10), 255);
        assert_eq!(img.get(125, 35), 255);
        assert_eq!(img.get(2, 2), 0);
        assert_eq!(img.get(182, 92), 0);
        assert_eq!(img.get(125, 95), 0);
    }

    #[test]
    fn tiny_markers_fail() {
        let cfg = BoardConfiguration::sequential(2, 2, 0, 5, 2).expect("valid");
        assert_eq!(render_board_image(&cfg), Err(MarkerError::ImageTooSmall(5)));
    }
}
