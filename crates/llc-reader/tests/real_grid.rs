//! Checks against real LLC1080 grid files, skipped when they are absent.
//!
//! Place `XC.data` and `YC.data` of an LLC1080 run in `crates/llc-reader/testdata/`
//! or point `TEST_DATA_DIR` at them.

use llc_grid::LlcPreset;
use llc_reader::{DataPaths, LlcModel};
use test_utils::require_test_file;

#[test]
fn test_llc1080_face_corners_are_geographic() {
    let xc = require_test_file!("XC.data");
    let yc = require_test_file!("YC.data");
    let grid_dir = xc.parent().unwrap().to_path_buf();
    assert_eq!(yc.parent(), Some(grid_dir.as_path()), "XC.data and YC.data must share a directory");
    let model = LlcModel::from_preset(LlcPreset::Llc1080, DataPaths::new(".", grid_dir)).unwrap();

    let corners = model.describe_faces().unwrap();
    assert_eq!(corners.len(), 5);
    for face in &corners {
        for corner in [face.lower_left, face.lower_right, face.upper_left, face.upper_right] {
            assert!((-180.0..=360.0).contains(&corner.xc), "face {}: {:?}", face.face, corner);
            assert!((-90.0..=90.0).contains(&corner.yc), "face {}: {:?}", face.face, corner);
        }
    }
    // the cap reaches high northern latitudes
    let cap = &corners[4];
    assert!(cap.upper_right.yc.max(cap.lower_left.yc) > 45.0);
}
