//! Square fiducial marker detection, marker boards and pose estimation.
//!
//! This crate re-exports the workspace crates under short names and adds:
//! - (feature `image`) helpers that load, save and detect on `image` buffers,
//! - JSON configuration and report types for batch detection ([`io`]),
//! - (feature `cli`) the `fiducial` command line tool.
//!
//! ## Quickstart
//!
//! ```no_run
//! use fiducial::aruco::MarkerDetector;
//! use fiducial::core::{CameraParameters, ImageView};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = fiducial::detect::load_gray("frame.png")?;
//! let camera = CameraParameters::new(800.0, 800.0, 320.0, 240.0);
//! let mut detector = MarkerDetector::default();
//! for m in detector.detect(&ImageView::gray(frame.view()), Some(&camera), 0.05)? {
//!     println!("marker {} at {:?}", m.id, m.pose.map(|p| p.tvec));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `fiducial::core`: image views, raster primitives, camera model, PnP, GL helpers.
//! - `fiducial::aruco`: marker codes, marker rendering and the marker detector.
//! - `fiducial::board`: board layouts, board detection and board rendering.
//! - `fiducial::detect` (feature `image`): end-to-end helpers on image files.

pub use fiducial_aruco as aruco;
pub use fiducial_board as board;
pub use fiducial_core as core;

pub use fiducial_aruco::{Marker, MarkerDetector, MarkerDetectorParams};
pub use fiducial_board::{Board, BoardConfiguration, BoardDetector};
pub use fiducial_core::{CameraParameters, Pose};

#[cfg(feature = "image")]
pub mod detect;
pub mod io;
