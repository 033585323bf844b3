//! Inventory of LLC binary files in a directory tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use llc_grid::{ElementType, GridLayout};
use serde::Serialize;
use tracing::{debug, warn};

/// One `.data` file and whether its size fits the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanEntry {
    /// Path relative to the scanned directory
    pub path: PathBuf,
    pub bytes: u64,
    /// Levels held by the file, `None` when the size does not match
    pub levels: Option<usize>,
}

/// Walk `root` and size-check every `*.data` file against `layout`.
///
/// Entries are sorted by path.
pub fn scan_directory(
    root: &Path,
    layout: &GridLayout,
    dtype: ElementType,
) -> Result<Vec<ScanEntry>> {
    let mut entries = Vec::new();

    for entry in walkdir::WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|e| e.to_str()) != Some("data")
        {
            continue;
        }

        let bytes = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?
            .len();
        let levels = layout.levels_in_file(bytes, dtype);
        let path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();

        match levels {
            Some(levels) => debug!(path = %path.display(), levels, "Found LLC file"),
            None => warn!(path = %path.display(), bytes, "File size does not match grid"),
        }
        entries.push(ScanEntry {
            path,
            bytes,
            levels,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_reports_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = GridLayout::new(5, 2, 1, 3).unwrap();
        // 9 samples per level
        std::fs::write(dir.path().join("Eta.data"), vec![0u8; 9 * 4]).unwrap();
        std::fs::create_dir(dir.path().join("run")).unwrap();
        std::fs::write(dir.path().join("run/Theta.data"), vec![0u8; 3 * 9 * 4]).unwrap();
        std::fs::write(dir.path().join("run/Bad.data"), vec![0u8; 2 * 9 * 4]).unwrap();
        std::fs::write(dir.path().join("run/Theta.meta"), b"nDims = [ 2 ];").unwrap();

        let entries = scan_directory(dir.path(), &layout, ElementType::BIG_F32).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, PathBuf::from("Eta.data"));
        assert_eq!(entries[0].levels, Some(1));
        assert_eq!(entries[1].path, PathBuf::from("run/Bad.data"));
        assert_eq!(entries[1].levels, None);
        assert_eq!(entries[2].levels, Some(3));
        assert_eq!(entries[2].bytes, 108);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = GridLayout::new(5, 2, 1, 3).unwrap();
        assert!(scan_directory(&dir.path().join("nope"), &layout, ElementType::BIG_F32).is_err());
    }
}
