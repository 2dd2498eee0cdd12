use std::fs;
use std::path::{Path, PathBuf};

use bopper_core::{DecodeOptions, Report, analyze_gif_file};

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

fn load_expected_report(dir: &str) -> Report {
    let expected_path = repo_root().join(dir).join("expected_report.json");
    let expected_json = fs::read_to_string(&expected_path).expect("read expected_report.json");
    serde_json::from_str(&expected_json).expect("parse expected report")
}

fn run_golden(dir: &str) {
    let input = repo_root().join(dir).join("input.gif");
    let expected = load_expected_report(dir);

    let mut actual = analyze_gif_file(&input, &DecodeOptions::default(), None).expect("analyze gif");
    actual.input.path = expected.input.path.clone();

    let actual_value = serde_json::to_value(actual).expect("serialize actual");
    let expected_value = serde_json::to_value(expected).expect("serialize expected");

    assert_eq!(actual_value, expected_value, "golden mismatch in {dir}");
}

#[test]
fn golden_two_frames() {
    run_golden("tests/golden/two_frames");
}

#[test]
fn golden_interlaced() {
    run_golden("tests/golden/interlaced");
}

#[test]
fn golden_truncated() {
    run_golden("tests/golden/truncated");
}

#[test]
fn golden_two_frames_background_disposal_clears_patch() {
    let report = load_expected_report("tests/golden/two_frames");
    let opaque: Vec<u64> = report.frames.iter().map(|f| f.opaque_pixels).collect();
    assert_eq!(opaque, vec![16, 16, 12]);
}

#[test]
fn golden_truncated_keeps_complete_frame() {
    let report = load_expected_report("tests/golden/truncated");
    assert!(report.animation.truncated);
    assert_eq!(report.animation.frames_count, 1);
}

#[test]
fn golden_interlaced_rows_land_in_order() {
    let input = repo_root().join("tests/golden/interlaced/input.gif");
    let bytes = fs::read(input).expect("read fixture");
    let animation =
        bopper_core::decode_animation(&bytes, &DecodeOptions::default()).expect("decode fixture");
    let first = animation.frame(0).expect("first frame");
    // stream order [0,1,0,1,0,1,0,1] lands on rows [0,4,2,6,1,3,5,7]
    let column: Vec<u8> = (0..8).map(|y| first.pixel(0, y).unwrap()[0]).collect();
    assert_eq!(column, vec![0, 0, 0, 255, 255, 0, 255, 255]);
}
