//! Read-only memory mappings of LLC binary files.

use std::fs::File;
use std::path::{Path, PathBuf};

use llc_grid::{ElementType, FieldView, GridLayout, LlcError, Result};
use memmap2::Mmap;
use tracing::{debug, warn};

/// An LLC file mapped read-only, with its level count already checked
/// against the grid geometry.
///
/// Views handed out by [`view`](Self::view) borrow the mapping; the mapping is
/// unmapped when the `MappedFile` is dropped.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    mmap: Mmap,
    dtype: ElementType,
    shape: [usize; 3],
}

impl MappedFile {
    /// Open and map `path`.
    ///
    /// The file must hold exactly 1 or `layout.vertical_levels()` levels of
    /// `layout.plane_elements()` samples, otherwise `FileSizeMismatch`.
    pub fn open(path: impl AsRef<Path>, layout: &GridLayout, dtype: ElementType) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LlcError::io(path, e))?;
        let file_len = file.metadata().map_err(|e| LlcError::io(path, e))?.len();

        let levels = layout.levels_in_file(file_len, dtype).ok_or_else(|| {
            warn!(path = %path.display(), file_len, "File size does not match grid geometry");
            LlcError::FileSizeMismatch {
                path: path.to_path_buf(),
                file_len,
                element_size: dtype.size(),
                plane_elements: layout.plane_elements(),
                vertical_levels: layout.vertical_levels(),
            }
        })?;

        // SAFETY: the mapping is read-only and never handed out mutably. Every
        // sample access goes through bounds-checked slicing, so a file that
        // shrinks underneath us can fault but never read out of bounds.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| LlcError::io(path, e))?;
        if mmap.len() as u64 != file_len {
            return Err(LlcError::FileSizeMismatch {
                path: path.to_path_buf(),
                file_len: mmap.len() as u64,
                element_size: dtype.size(),
                plane_elements: layout.plane_elements(),
                vertical_levels: layout.vertical_levels(),
            });
        }

        debug!(path = %path.display(), levels, bytes = file_len, "Mapped LLC file");

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            dtype,
            shape: layout.file_shape(levels),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    /// Number of levels stored in the file (1 or the layout's vertical levels).
    pub fn levels(&self) -> usize {
        self.shape[0]
    }

    /// `(levels, Ntop, Nxtot)`.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// The whole file as a column-major `(levels, Ntop, Nxtot)` view.
    pub fn view(&self) -> Result<FieldView<'_>> {
        FieldView::column_major(&self.mmap, self.dtype, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn layout() -> GridLayout {
        GridLayout::new(5, 2, 1, 4).unwrap()
    }

    fn write_samples(file: &mut tempfile::NamedTempFile, values: &[f32]) {
        for v in values {
            file.write_all(&v.to_be_bytes()).unwrap();
        }
        file.flush().unwrap();
    }

    #[test]
    fn test_open_full_depth() {
        // 4 levels of a 1 x 9 plane
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let values: Vec<f32> = (0..36).map(|v| v as f32).collect();
        write_samples(&mut file, &values);

        let mapped = MappedFile::open(file.path(), &layout(), ElementType::BIG_F32).unwrap();
        assert_eq!(mapped.levels(), 4);
        assert_eq!(mapped.shape(), [4, 1, 9]);
        assert_eq!(mapped.bytes().len(), 144);
        // levels vary fastest on disk
        let view = mapped.view().unwrap();
        assert_eq!(view.get(1, 0, 0), Some(1.0));
        assert_eq!(view.get(0, 0, 1), Some(4.0));
    }

    #[test]
    fn test_open_single_level() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_samples(&mut file, &[0.5; 9]);

        let mapped = MappedFile::open(file.path(), &layout(), ElementType::BIG_F32).unwrap();
        assert_eq!(mapped.levels(), 1);
        assert_eq!(mapped.path(), file.path());
    }

    #[test]
    fn test_open_rejects_other_sizes() {
        for samples in [0, 8, 18, 27, 45] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write_samples(&mut file, &vec![1.0; samples]);
            let result = MappedFile::open(file.path(), &layout(), ElementType::BIG_F32);
            assert!(
                matches!(result, Err(LlcError::FileSizeMismatch { .. })),
                "{} samples",
                samples
            );
        }
    }
}
