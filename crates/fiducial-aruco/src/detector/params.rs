use fiducial_core::ThresholdMethod;
use serde::{Deserialize, Serialize};

/// Configuration for [`MarkerDetector`](super::MarkerDetector).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerDetectorParams {
    /// Frame binarization.
    pub threshold: ThresholdMethod,
    /// A contour needs more than `image_width / min_contour_divisor` points.
    pub min_contour_divisor: usize,
    /// Polygon approximation tolerance as a fraction of the contour point count.
    pub approx_epsilon_frac: f64,
    /// Minimum quad side length in pixels, also the mean corner distance
    /// below which two candidates count as the same quad.
    pub min_corner_distance: f32,
    /// Side of the rectified canonical patch in pixels.
    pub canonical_size: usize,
    /// Threshold applied to the canonical patch when it has no contrast for
    /// Otsu to split.
    pub code_threshold: u8,
    /// Run Levenberg–Marquardt after the linear pose estimate.
    pub refine_pose: bool,
}

impl Default for MarkerDetectorParams {
    fn default() -> Self {
        Self {
            threshold: ThresholdMethod::default(),
            min_contour_divisor: 5,
            approx_epsilon_frac: 0.05,
            min_corner_distance: 10.0,
            canonical_size: 50,
            code_threshold: 125,
            refine_pose: true,
        }
    }
}

impl MarkerDetectorParams {
    /// Minimum contour length for a frame of the given width.
    pub fn min_contour_points(&self, image_width: usize) -> usize {
        image_width / self.min_contour_divisor.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let params: MarkerDetectorParams = serde_json::from_str(
            r#"{ "threshold": { "method": "fixed", "threshold": 90 }, "canonical_size": 70 }"#,
        )
        .expect("parse");
        assert_eq!(params.threshold, ThresholdMethod::Fixed { threshold: 90 });
        assert_eq!(params.canonical_size, 70);
        assert_eq!(params.min_contour_divisor, 5);
        assert_eq!(params.code_threshold, 125);
    }

    #[test]
    fn contour_length_scales_with_width() {
        let params = MarkerDetectorParams::default();
        assert_eq!(params.min_contour_points(640), 128);
        let zero = MarkerDetectorParams {
            min_contour_divisor: 0,
            ..params
        };
        assert_eq!(zero.min_contour_points(640), 640);
    }
}
