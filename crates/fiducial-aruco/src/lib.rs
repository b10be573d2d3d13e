//! Square fiducial markers with a 7x7 binary code.
//!
//! The crate covers both directions:
//! - [`Code`] / [`create_marker_image`] turn an id in `0..1024` into a
//!   printable pattern,
//! - [`MarkerDetector`] finds markers in a frame, decodes their ids, orders
//!   their corners consistently and, given camera intrinsics and a physical
//!   size, solves their pose.
//!
//! Each detector stage is also exposed on its own in [`pipeline`] so it can be
//! run and tested in isolation.
//!
//! ```
//! use fiducial_aruco::{create_marker_image_with_margin, MarkerDetector};
//! use fiducial_core::ImageView;
//!
//! let img = create_marker_image_with_margin(108, 140, 40).unwrap();
//! let mut detector = MarkerDetector::default();
//! let markers = detector.detect(&ImageView::gray(img.view()), None, 0.0).unwrap();
//! assert_eq!(markers.len(), 1);
//! assert_eq!(markers[0].id, 108);
//! ```

mod code;
mod detector;
mod encode;
mod error;
mod marker;

pub use code::{Code, Identification, CODEWORDS, CODE_SIZE, MAX_MARKER_ID};
pub use detector::{pipeline, MarkerDetector, MarkerDetectorParams};
pub use encode::{create_marker_image, create_marker_image_with_margin};
pub use error::MarkerError;
pub use marker::{marker_object_points, Marker};
