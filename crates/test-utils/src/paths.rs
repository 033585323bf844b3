//! Locating optional real model output for tests.
//!
//! Real LLC grids are too large to check in, so tests that need them look in
//! a few well-known `testdata/` directories and skip when nothing is there.

use std::path::PathBuf;

/// Environment variable naming an extra directory of real LLC files.
pub const TEST_DATA_ENV: &str = "TEST_DATA_DIR";

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// Directories searched by [`find_test_file`], in order.
///
/// `$TEST_DATA_DIR` comes first when set, then the reader and tiler
/// `testdata/` directories, then `testdata/` at the workspace root.
pub fn testdata_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    std::env::var_os(TEST_DATA_ENV)
        .map(PathBuf::from)
        .into_iter()
        .chain([
            root.join("crates/llc-reader/testdata"),
            root.join("services/llc-tiler/testdata"),
            root.join("testdata"),
        ])
        .collect()
}

/// First existing `name` in [`testdata_dirs`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    testdata_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Scratch directory removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
