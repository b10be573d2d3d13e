//! Boards of square fiducial markers.
//!
//! A [`BoardConfiguration`] fixes which marker id sits in which grid cell and
//! the printed marker size and gap. [`BoardDetector`] matches already
//! detected markers against it and solves one pose from all matched corners;
//! [`render_board_image`] produces the printable board.

mod board;
mod config;
mod detector;
mod render;

pub use board::{Board, BoardError, BoardMarker};
pub use config::{BoardConfigError, BoardConfiguration};
pub use detector::{match_markers, BoardDetector};
pub use render::render_board_image;
