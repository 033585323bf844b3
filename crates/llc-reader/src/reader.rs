//! Face extraction from mapped LLC files.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use llc_grid::{ElementType, FieldArray, FieldView, GridLayout, Levels, Result, ViewGeometry};
use lru::LruCache;
use tracing::debug;

use crate::mapped::MappedFile;

/// Reads oriented faces out of LLC binary files.
///
/// The reader holds no per-read state. With a map cache enabled it keeps
/// up to `entries` mappings open, keyed by path; a file rewritten on disk
/// while cached keeps serving its old mapping until evicted or cleared.
pub struct FaceReader {
    layout: Arc<GridLayout>,
    dtype: ElementType,
    cache: Option<Mutex<LruCache<PathBuf, Arc<MappedFile>>>>,
}

impl FaceReader {
    /// Create a reader for big-endian `f32` files without a map cache.
    pub fn new(layout: Arc<GridLayout>) -> Self {
        Self {
            layout,
            dtype: ElementType::default(),
            cache: None,
        }
    }

    /// Use a different sample encoding.
    pub fn with_dtype(mut self, dtype: ElementType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Keep up to `entries` mappings open between reads. Zero disables the cache.
    pub fn with_map_cache(mut self, entries: usize) -> Self {
        self.cache = NonZeroUsize::new(entries).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    pub fn layout(&self) -> &Arc<GridLayout> {
        &self.layout
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    /// Map a file, or reuse a cached mapping.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Arc<MappedFile>> {
        let path = path.as_ref();
        let Some(cache) = &self.cache else {
            return Ok(Arc::new(MappedFile::open(path, &self.layout, self.dtype)?));
        };

        if let Some(mapped) = lock(cache).get(path) {
            debug!(path = %path.display(), "Map cache hit");
            return Ok(mapped.clone());
        }

        // map outside the lock so concurrent misses on different files do not serialize
        let mapped = Arc::new(MappedFile::open(path, &self.layout, self.dtype)?);
        lock(cache).put(path.to_path_buf(), mapped.clone());
        Ok(mapped)
    }

    /// Read one logical face of `path`.
    ///
    /// The result is a live view over the mapping; no samples are copied.
    pub fn read_face(
        &self,
        path: impl AsRef<Path>,
        face: usize,
        levels: impl Into<Levels>,
    ) -> Result<FaceData> {
        self.layout.disk_index(face)?;
        let file = self.open(path)?;
        self.face_from(file, face, levels)
    }

    /// Cut a logical face out of an already mapped file.
    pub fn face_from(
        &self,
        file: Arc<MappedFile>,
        face: usize,
        levels: impl Into<Levels>,
    ) -> Result<FaceData> {
        let levels = levels.into();
        let geometry = {
            let oriented = self.layout.extract_face(file.view()?, face)?;
            oriented.select_levels(&levels)?.geometry()
        };
        debug!(
            path = %file.path().display(),
            face,
            shape = ?geometry.shape(),
            "Read face"
        );
        Ok(FaceData {
            file,
            face,
            geometry,
        })
    }

    /// Number of mappings currently cached.
    pub fn cached_maps(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| lock(cache).len())
    }

    /// Drop every cached mapping. Views already handed out stay valid.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            lock(cache).clear();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // the cache holds no invariants a panicking holder could break
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An oriented `(levels, rows, cols)` window of one face, backed by a mapping.
///
/// `FaceData` shares ownership of the mapping, so it can be sent across
/// threads and outlive the reader; the mapping is released when the last
/// view referencing it is dropped.
#[derive(Debug, Clone)]
pub struct FaceData {
    file: Arc<MappedFile>,
    face: usize,
    geometry: ViewGeometry,
}

impl FaceData {
    /// Borrowed view over the mapping.
    pub fn view(&self) -> FieldView<'_> {
        // geometry was derived from a checked view over this same mapping
        FieldView::from_parts_unchecked(self.file.bytes(), self.file.dtype(), self.geometry)
    }

    pub fn face(&self) -> usize {
        self.face
    }

    pub fn file(&self) -> &Arc<MappedFile> {
        &self.file
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn shape(&self) -> [usize; 3] {
        self.geometry.shape()
    }

    pub fn levels(&self) -> usize {
        self.geometry.shape()[0]
    }

    pub fn rows(&self) -> usize {
        self.geometry.shape()[1]
    }

    pub fn cols(&self) -> usize {
        self.geometry.shape()[2]
    }

    pub fn get(&self, level: usize, row: usize, col: usize) -> Option<f64> {
        self.view().get(level, row, col)
    }

    /// Restrict to a `rows x cols` window without copying.
    pub fn window(&self, rows: Range<usize>, cols: Range<usize>) -> Result<FaceData> {
        let geometry = self.view().window(rows, cols)?.geometry();
        Ok(self.with_geometry(geometry))
    }

    /// Restrict to a sub-range of levels without copying.
    pub fn select_levels(&self, levels: impl Into<Levels>) -> Result<FaceData> {
        let geometry = self.view().select_levels(&levels.into())?.geometry();
        Ok(self.with_geometry(geometry))
    }

    /// Decode into an owned row-major array.
    pub fn to_array(&self) -> FieldArray {
        self.view().to_array()
    }

    fn with_geometry(&self, geometry: ViewGeometry) -> FaceData {
        FaceData {
            file: self.file.clone(),
            face: self.face,
            geometry,
        }
    }
}
