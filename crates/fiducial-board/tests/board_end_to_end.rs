use approx::assert_relative_eq;
use fiducial_aruco::MarkerDetector;
use fiducial_board::{render_board_image, BoardConfiguration, BoardDetector};
use fiducial_core::{CameraParameters, GrayImage, ImageView};
use nalgebra::Vector3;

const MARGIN: usize = 30;

fn board_scene(cfg: &BoardConfiguration) -> GrayImage {
    let board = render_board_image(cfg).expect("render");
    let mut canvas = GrayImage::filled(board.width + 2 * MARGIN, board.height + 2 * MARGIN, 255);
    canvas.blit(&board.view(), MARGIN, MARGIN);
    canvas
}

#[test]
fn rendered_board_is_detected_with_full_coverage() {
    let cfg = BoardConfiguration::sequential(3, 2, 10, 70, 20).expect("valid");
    let img = board_scene(&cfg);
    let camera = CameraParameters::new(300.0, 300.0, img.width as f64 / 2.0, img.height as f64 / 2.0);
    let size = 0.07;

    let markers = MarkerDetector::default()
        .detect(&ImageView::gray(img.view()), Some(&camera), size)
        .expect("detect");
    assert_eq!(markers.iter().map(|m| m.id).collect::<Vec<_>>(), (10..16).collect::<Vec<_>>());
    assert!(markers.iter().all(|m| m.rotations == 0));

    let board = BoardDetector::new(cfg).expect("valid").detect(&markers, Some(&camera), size);
    assert_eq!(board.coverage, 1.0);
    assert_eq!(
        board.markers.iter().map(|m| (m.row, m.col, m.marker.id)).collect::<Vec<_>>(),
        vec![(0, 0, 10), (0, 1, 11), (0, 2, 12), (1, 0, 13), (1, 1, 14), (1, 2, 15)]
    );

    let pose = board.pose.expect("board pose");
    // 90 px pitch for 0.09 m, seen at f = 300
    assert_relative_eq!(pose.tvec.z, 0.3, max_relative = 0.03);
    // the board centre sits on the principal point
    assert!(pose.tvec.x.abs() < 2e-3 && pose.tvec.y.abs() < 2e-3, "{:?}", pose.tvec);
    assert!((pose.rotation() * Vector3::z()).z < -0.99);
}

#[test]
fn foreign_markers_do_not_count() {
    let cfg = BoardConfiguration::sequential(3, 2, 10, 70, 20).expect("valid");
    let img = board_scene(&cfg);
    let markers = MarkerDetector::default()
        .detect(&ImageView::gray(img.view()), None, 0.0)
        .expect("detect");

    let other = BoardConfiguration::new(2, 2, vec![vec![Some(12), Some(500)], vec![None, Some(15)]], 70, 20)
        .expect("valid");
    let board = BoardDetector::new(other).expect("valid").detect(&markers, None, 0.0);
    assert_relative_eq!(board.coverage, 0.5);
    assert!(board.pose.is_none());
    assert!(board.marker(12).is_some() && board.marker(500).is_none());
}
