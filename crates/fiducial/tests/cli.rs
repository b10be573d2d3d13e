use std::fs;

use assert_cmd::Command;
use fiducial::io::DetectReport;
use predicates::prelude::*;

fn fiducial() -> Command {
    Command::cargo_bin("fiducial").expect("binary built")
}

#[test]
fn marker_then_detect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = dir.path().join("marker.png");
    fiducial()
        .args(["marker", "--id", "108", "--size", "140", "--margin", "40", "--output"])
        .arg(&png)
        .assert()
        .success();
    assert!(png.exists());

    let report_path = dir.path().join("report.json");
    let config = dir.path().join("detect.json");
    fs::write(
        &config,
        serde_json::json!({
            "image_path": "marker.png",
            "output_path": report_path,
            "camera": { "fx": 300.0, "fy": 300.0, "cx": 110.0, "cy": 110.0 },
            "marker_size": 0.05
        })
        .to_string(),
    )
    .expect("write config");

    fiducial()
        .args(["detect", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 markers: [108]"));

    let report = DetectReport::load_json(&report_path).expect("report");
    assert_eq!(report.error, None);
    assert_eq!((report.width, report.height), (220, 220));
    assert_eq!(report.markers.len(), 1);
    assert_eq!(report.markers[0].id, 108);
    assert!(report.markers[0].pose.is_some());
}

#[test]
fn out_of_range_marker_id_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    fiducial()
        .args(["marker", "--id", "1024", "--output"])
        .arg(dir.path().join("bad.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn board_then_detect_board() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = dir.path().join("board.png");
    let layout = dir.path().join("layout.json");
    fiducial()
        .args([
            "board",
            "--width",
            "3",
            "--height",
            "2",
            "--first-id",
            "20",
            "--marker-size",
            "70",
            "--distance",
            "20",
            "--margin",
            "30",
        ])
        .arg("--layout-output")
        .arg(&layout)
        .arg("--output")
        .arg(&png)
        .assert()
        .success()
        .stdout(predicate::str::contains("board 3x2"));

    let layout_json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&layout).expect("layout")).expect("json");
    let report_path = dir.path().join("report.json");
    let config = dir.path().join("detect.json");
    fs::write(
        &config,
        serde_json::json!({
            "image_path": png,
            "output_path": report_path,
            "camera": { "fx": 300.0, "fy": 300.0, "cx": 155.0, "cy": 110.0 },
            "marker_size": 0.07,
            "board": layout_json
        })
        .to_string(),
    )
    .expect("write config");

    fiducial()
        .args(["detect", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("board coverage 1.00, pose: yes"));

    let report = DetectReport::load_json(&report_path).expect("report");
    let board = report.board.expect("board");
    assert_eq!(board.markers.len(), 6);
    assert!(board.pose.is_some());
}

#[test]
fn missing_image_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report_path = dir.path().join("report.json");
    let config = dir.path().join("detect.json");
    fs::write(
        &config,
        serde_json::json!({ "image_path": "nope.png", "output_path": report_path }).to_string(),
    )
    .expect("write config");

    fiducial()
        .args(["detect", "--config"])
        .arg(&config)
        .assert()
        .failure();
    let report = DetectReport::load_json(&report_path).expect("report");
    assert!(report.error.is_some());
}

#[test]
fn log_level_installs_the_stderr_logger() {
    let dir = tempfile::tempdir().expect("tempdir");
    fiducial()
        .args(["--log-level", "debug", "marker", "--id", "5", "--output"])
        .arg(dir.path().join("m.png"))
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO fiducial] marker 5 written"));

    fiducial()
        .args(["--log-level", "loud", "marker", "--id", "5", "--output"])
        .arg(dir.path().join("n.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown log level 'loud'"));
}
