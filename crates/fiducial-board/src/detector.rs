use fiducial_aruco::Marker;
use fiducial_core::{solve_pnp, CameraParameters, PnpOptions};
use nalgebra::{Point2, Point3};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Board, BoardConfigError, BoardConfiguration, BoardMarker};

/// For every used cell in row-major order, the first marker carrying the
/// cell's id.
pub fn match_markers(config: &BoardConfiguration, markers: &[Marker]) -> Vec<BoardMarker> {
    config
        .cells()
        .filter_map(|(row, col, id)| {
            let marker = markers.iter().find(|m| m.id == id)?;
            Some(BoardMarker {
                row,
                col,
                marker: marker.clone(),
            })
        })
        .collect()
}

/// Matches detected markers to a fixed board layout.
#[derive(Clone, Debug)]
pub struct BoardDetector {
    config: BoardConfiguration,
    pnp: PnpOptions,
}

impl BoardDetector {
    pub fn new(config: BoardConfiguration) -> Result<Self, BoardConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            pnp: PnpOptions::default(),
        })
    }

    pub fn with_pnp_options(mut self, pnp: PnpOptions) -> Self {
        self.pnp = pnp;
        self
    }

    #[inline]
    pub fn config(&self) -> &BoardConfiguration {
        &self.config
    }

    /// Place `markers` on the board and, with at least two matches, valid
    /// intrinsics and `marker_size > 0`, solve the board pose.
    ///
    /// Matched markers take `marker_size` as their size when it is positive.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(markers = markers.len()))
    )]
    pub fn detect(&self, markers: &[Marker], camera: Option<&CameraParameters>, marker_size: f32) -> Board {
        let mut matched = match_markers(&self.config, markers);
        if marker_size > 0.0 {
            for m in &mut matched {
                m.marker.size = Some(marker_size);
            }
        }
        let coverage = matched.len() as f32 / self.config.num_cells() as f32;

        let pose = match camera {
            Some(camera) if camera.is_valid() && marker_size > 0.0 && matched.len() >= 2 => {
                let s = marker_size as f64;
                let object: Vec<Point3<f64>> = matched
                    .iter()
                    .flat_map(|m| self.config.object_corners(m.row, m.col, s))
                    .collect();
                let image: Vec<Point2<f64>> = matched
                    .iter()
                    .flat_map(|m| m.marker.corners.map(|p| Point2::new(p.x as f64, p.y as f64)))
                    .collect();
                solve_pnp(&object, &image, camera, self.pnp)
                    .map_err(|e| log::debug!("board pose failed: {e}"))
                    .ok()
            }
            _ => None,
        };

        log::debug!(
            "board: {}/{} cells matched, pose: {}",
            matched.len(),
            self.config.num_cells(),
            pose.is_some()
        );

        Board {
            config: self.config.clone(),
            markers: matched,
            marker_size: (marker_size > 0.0).then_some(marker_size),
            pose,
            coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fiducial_core::{rvec_to_rotation, Pose};
    use nalgebra::Vector3;

    fn config() -> BoardConfiguration {
        BoardConfiguration::new(2, 1, vec![vec![Some(5), Some(9)]], 50, 10).expect("valid")
    }

    fn camera() -> CameraParameters {
        CameraParameters::new(700.0, 700.0, 320.0, 240.0)
    }

    fn observed(cfg: &BoardConfiguration, gt: &Pose, size: f64) -> Vec<Marker> {
        cfg.cells()
            .map(|(row, col, id)| {
                let corners = cfg.object_corners(row, col, size).map(|p| {
                    let q = camera().project(gt, &p).expect("in front");
                    Point2::new(q.x as f32, q.y as f32)
                });
                Marker::new(id, corners)
            })
            .collect()
    }

    #[test]
    fn coverage_counts_matched_cells() {
        let cfg = BoardConfiguration::sequential(2, 2, 0, 50, 10).expect("valid");
        let det = BoardDetector::new(cfg).expect("valid");
        let corners = [Point2::origin(); 4];
        let markers = vec![Marker::new(3, corners), Marker::new(40, corners), Marker::new(1, corners)];
        let board = det.detect(&markers, None, 0.0);
        assert_relative_eq!(board.coverage, 0.5);
        assert_eq!(
            board.markers.iter().map(|m| (m.row, m.col, m.marker.id)).collect::<Vec<_>>(),
            vec![(0, 1, 1), (1, 1, 3)]
        );
        assert!(board.pose.is_none());

        let none = det.detect(&[Marker::new(99, corners)], None, 0.0);
        assert_eq!(none.coverage, 0.0);
        assert!(none.is_empty());
    }

    #[test]
    fn first_marker_with_the_id_wins() {
        let a = Marker::new(5, [Point2::new(1.0, 1.0); 4]);
        let b = Marker::new(5, [Point2::new(2.0, 2.0); 4]);
        let matched = match_markers(&config(), &[a.clone(), b]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].marker, a);
    }

    #[test]
    fn two_marker_board_pose() {
        let gt = Pose::new(Vector3::new(2.9, 0.15, -0.1), Vector3::new(0.01, -0.02, 0.6));
        let markers = observed(&config(), &gt, 0.05);
        let board = BoardDetector::new(config())
            .expect("valid")
            .detect(&markers, Some(&camera()), 0.05);
        assert_eq!(board.coverage, 1.0);
        assert_eq!(board.len(), 2);
        assert!(board.markers.iter().all(|m| m.marker.size == Some(0.05)));

        let pose = board.pose.expect("pose");
        assert_relative_eq!(rvec_to_rotation(&pose.rvec), rvec_to_rotation(&gt.rvec), epsilon = 1e-4);
        assert_relative_eq!(pose.tvec, gt.tvec, epsilon = 1e-4);
        assert!(pose.tvec.z > 0.0);
        // board normal points back at the camera
        assert!((pose.rotation() * Vector3::z()).z < 0.0);

        assert!(board.model_view_matrix().is_ok());
        let axes = board.axis_points(&camera()).expect("axes");
        let origin = camera().project(&gt, &Point3::origin()).expect("in front");
        assert!((axes[0] - origin).norm() < 0.05);
    }

    #[test]
    fn pose_needs_two_markers_and_valid_inputs() {
        let gt = Pose::new(Vector3::new(3.1, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.5));
        let markers = observed(&config(), &gt, 0.05);
        let det = BoardDetector::new(config()).expect("valid");

        let one = det.detect(&markers[..1], Some(&camera()), 0.05);
        assert_relative_eq!(one.coverage, 0.5);
        assert!(one.pose.is_none());

        assert!(det.detect(&markers, Some(&CameraParameters::default()), 0.05).pose.is_none());
        let unsized_board = det.detect(&markers, Some(&camera()), 0.0);
        assert!(unsized_board.pose.is_none());
        assert_eq!(unsized_board.model_view_matrix(), Err(crate::BoardError::PoseNotAvailable));
    }
}
