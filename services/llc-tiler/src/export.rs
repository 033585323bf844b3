//! Per-tile export of field values and coordinates.
//!
//! Each tile is written as raw little-endian `f32` arrays next to a JSON
//! sidecar describing where the tile sits on the grid and on the map:
//!
//! ```text
//! {basename}_{id:04}.f32       field values, (levels, rows, cols) row-major
//! {basename}_{id:04}.lon.f32   longitudes, (rows, cols)
//! {basename}_{id:04}.lat.f32   latitudes, (rows, cols)
//! {basename}_{id:04}.json      TileSidecar
//! ```

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use llc_grid::{FieldArray, Levels, TileIndex};
use llc_reader::{LlcModel, Tile};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Semi-major axis of the spherical Mercator datum, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude where spherical Mercator reaches the square world extent.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Convert WGS84 degrees to spherical Mercator (EPSG:900913) meters.
///
/// Latitudes are clamped to [`MAX_MERCATOR_LAT`] so the poles stay finite.
pub fn lonlat_to_meters(lon: f64, lat: f64) -> (f64, f64) {
    let origin_shift = std::f64::consts::PI * EARTH_RADIUS_M;
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let mx = lon * origin_shift / 180.0;
    let my = ((90.0 + lat) * std::f64::consts::PI / 360.0).tan().ln() / (std::f64::consts::PI / 180.0);
    (mx, my * origin_shift / 180.0)
}

/// Axis-aligned extent in some coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Extent of the finite points, if there are any.
    fn of_points(points: impl Iterator<Item = (f64, f64)>) -> Option<Self> {
        points
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold(None, |acc: Option<Extent>, (x, y)| {
                Some(match acc {
                    None => Extent {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                    },
                    Some(e) => Extent {
                        min_x: e.min_x.min(x),
                        min_y: e.min_y.min(y),
                        max_x: e.max_x.max(x),
                        max_y: e.max_y.max(y),
                    },
                })
            })
    }

    /// Mercator extent of a lon/lat extent.
    pub fn to_mercator(&self) -> Extent {
        let (min_x, min_y) = lonlat_to_meters(self.min_x, self.min_y);
        let (max_x, max_y) = lonlat_to_meters(self.max_x, self.max_y);
        Extent {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// JSON metadata written next to every exported tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSidecar {
    pub id: usize,
    pub face: usize,
    pub field: String,
    /// Half-open row and column ranges on the face
    pub rows: [usize; 2],
    pub cols: [usize; 2],
    /// `(levels, rows, cols)` of the value file
    pub shape: [usize; 3],
    pub dtype: String,
    /// Finite field values over all exported levels
    pub valid_count: usize,
    pub value_range: Option<[f64; 2]>,
    /// Lon/lat extent of the cells that are valid on the first exported level
    pub lonlat_extent: Option<Extent>,
    pub mercator_extent: Option<Extent>,
    pub generated_at: DateTime<Utc>,
}

/// What to export and where.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Field file name inside the data directory
    pub field: String,
    pub levels: Levels,
    pub output_dir: PathBuf,
    pub basename: String,
}

impl ExportOptions {
    pub fn new(field: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            field: field.into(),
            levels: Levels::Single(0),
            output_dir: output_dir.into(),
            basename: "tile".to_string(),
        }
    }

    pub fn with_levels(mut self, levels: Levels) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = basename.into();
        self
    }

    /// Output path for tile `id` with the given suffix.
    pub fn output_path(&self, id: usize, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{:04}{}", self.basename, id, suffix))
    }
}

/// Files written for one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedTile {
    pub id: usize,
    pub values: PathBuf,
    pub lon: PathBuf,
    pub lat: PathBuf,
    pub sidecar: PathBuf,
    pub valid_count: usize,
}

/// Export one tile.
pub fn export_tile(tile: &Tile<'_>, options: &ExportOptions) -> Result<ExportedTile> {
    let id = tile.id();
    let values = tile
        .load_field(&options.field, options.levels.clone())
        .with_context(|| format!("Failed to load {} for tile {}", options.field, id))?
        .to_array();
    let (lon, lat) = tile
        .load_coordinates()
        .with_context(|| format!("Failed to load coordinates for tile {}", id))?;
    let (lon, lat) = (lon.to_array(), lat.to_array());

    let sidecar = describe(tile, options, &values, &lon, &lat);
    if sidecar.valid_count == 0 {
        warn!(tile = id, field = %options.field, "Tile has no finite values");
    }

    let exported = ExportedTile {
        id,
        values: options.output_path(id, ".f32"),
        lon: options.output_path(id, ".lon.f32"),
        lat: options.output_path(id, ".lat.f32"),
        sidecar: options.output_path(id, ".json"),
        valid_count: sidecar.valid_count,
    };
    write_f32_le(&exported.values, values.data())?;
    write_f32_le(&exported.lon, lon.data())?;
    write_f32_le(&exported.lat, lat.data())?;
    let json = serde_json::to_vec_pretty(&sidecar)?;
    fs::write(&exported.sidecar, json)
        .with_context(|| format!("Failed to write {}", exported.sidecar.display()))?;

    debug!(tile = id, face = tile.face(), valid = sidecar.valid_count, "Exported tile");
    Ok(exported)
}

/// Export every tile in `ids`, or the whole index when `ids` is empty.
///
/// Tiles are processed in parallel; the first failure aborts the export.
pub fn export_tiles(
    model: &LlcModel,
    index: &TileIndex,
    ids: &[i64],
    options: &ExportOptions,
) -> Result<Vec<ExportedTile>> {
    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("Failed to create {}", options.output_dir.display()))?;

    let specs = if ids.is_empty() {
        index.enumerate()
    } else {
        ids.iter()
            .map(|&id| index.resolve(id))
            .collect::<llc_grid::Result<Vec<_>>>()?
    };

    info!(
        tiles = specs.len(),
        field = %options.field,
        output = %options.output_dir.display(),
        "Exporting tiles"
    );

    let mut exported = specs
        .into_par_iter()
        .map(|spec| export_tile(&model.tile(spec), options))
        .collect::<Result<Vec<_>>>()?;
    exported.sort_by_key(|tile| tile.id);

    info!(tiles = exported.len(), "Export complete");
    Ok(exported)
}

fn describe(
    tile: &Tile<'_>,
    options: &ExportOptions,
    values: &FieldArray,
    lon: &FieldArray,
    lat: &FieldArray,
) -> TileSidecar {
    let spec = tile.spec();
    // cells with a finite value on the first exported level
    let mask = values.level(0).unwrap_or(&[]);
    let lonlat_extent = Extent::of_points(
        lon.data()
            .iter()
            .zip(lat.data())
            .zip(mask)
            .filter(|(_, value)| value.is_finite())
            .map(|((&x, &y), _)| (x, y)),
    );

    TileSidecar {
        id: spec.id,
        face: spec.face,
        field: options.field.clone(),
        rows: [spec.rows.start, spec.rows.end],
        cols: [spec.cols.start, spec.cols.end],
        shape: values.shape(),
        dtype: "<f4".to_string(),
        valid_count: values.valid_count(),
        value_range: values.finite_range().map(|(min, max)| [min, max]),
        lonlat_extent,
        mercator_extent: lonlat_extent.map(|e| e.to_mercator()),
        generated_at: Utc::now(),
    }
}

fn write_f32_le(path: &Path, data: &[f64]) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for &value in data {
        writer.write_all(&(value as f32).to_le_bytes())?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
