//! Per-frame marker detection.
//!
//! [`MarkerDetector`] owns the scratch images reused between frames and chains
//! the stages in [`pipeline`]: binarize, trace, filter quads, suppress near
//! duplicates, rectify, read and identify codes, keep one marker per id and
//! finally solve poses when intrinsics and a physical size are known.

mod params;
pub mod pipeline;

pub use params::MarkerDetectorParams;

use fiducial_core::{binarize, CameraParameters, GrayImage, GrayImageView, ImageView, PnpOptions};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Marker, MarkerError};

/// Square marker detector.
///
/// `detect` takes `&mut self`: the greyscale and binary buffers are
/// overwritten on every call, so one instance serves one frame at a time.
#[derive(Clone, Debug, Default)]
pub struct MarkerDetector {
    params: MarkerDetectorParams,
    gray: GrayImage,
    binary: GrayImage,
}

impl MarkerDetector {
    pub fn new(params: MarkerDetectorParams) -> Self {
        Self {
            params,
            gray: GrayImage::default(),
            binary: GrayImage::default(),
        }
    }

    #[inline]
    pub fn params(&self) -> &MarkerDetectorParams {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut MarkerDetectorParams {
        &mut self.params
    }

    /// Binary image of the last processed frame (foreground 255).
    pub fn binary(&self) -> GrayImageView<'_> {
        self.binary.view()
    }

    /// Detect markers in an 8-bit frame with 1, 3 or 4 channels.
    ///
    /// Poses are solved only when `camera` is valid and `marker_size > 0`;
    /// otherwise markers come back without pose. Only malformed image buffers
    /// are errors.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(width = image.width, height = image.height))
    )]
    pub fn detect(
        &mut self,
        image: &ImageView<'_>,
        camera: Option<&CameraParameters>,
        marker_size: f32,
    ) -> Result<Vec<Marker>, MarkerError> {
        let mut gray = std::mem::take(&mut self.gray);
        let markers = image
            .to_gray_into(&mut gray)
            .map_err(MarkerError::from)
            .and_then(|()| self.detect_gray(&gray.view(), camera, marker_size));
        self.gray = gray;
        markers
    }

    /// Same as [`detect`](Self::detect) on a greyscale frame.
    pub fn detect_gray(
        &mut self,
        gray: &GrayImageView<'_>,
        camera: Option<&CameraParameters>,
        marker_size: f32,
    ) -> Result<Vec<Marker>, MarkerError> {
        gray.validate()?;
        binarize(gray, self.params.threshold, &mut self.binary);

        let candidates = pipeline::find_candidates(&self.binary.view(), &self.params);
        let found = candidates.len();
        let candidates = pipeline::suppress_near_duplicates(candidates, self.params.min_corner_distance);
        let survivors = candidates.len();

        let identified: Vec<Marker> = candidates
            .iter()
            .filter_map(|c| {
                let patch = pipeline::rectify(gray, c, self.params.canonical_size)?;
                let code = pipeline::read_code(&patch.view(), self.params.code_threshold)?;
                pipeline::identify(c, &code)
            })
            .collect();
        let decoded = identified.len();
        let mut markers = pipeline::dedup_by_id(identified);

        log::debug!(
            "markers: {} candidates, {} after near-duplicate suppression, {} identified, {} unique",
            found,
            survivors,
            decoded,
            markers.len()
        );

        if marker_size > 0.0 {
            for m in &mut markers {
                m.size = Some(marker_size);
            }
        }
        if let Some(camera) = camera.filter(|c| c.is_valid() && marker_size > 0.0) {
            let options = PnpOptions {
                refine: self.params.refine_pose,
                ..PnpOptions::default()
            };
            let mut posed = 0usize;
            for m in &mut markers {
                match m.estimate_pose(camera, marker_size, options) {
                    Ok(_) => posed += 1,
                    Err(e) => log::debug!("marker {}: no pose ({e})", m.id),
                }
            }
            log::debug!("markers: {posed}/{} posed", markers.len());
        }

        Ok(markers)
    }
}
