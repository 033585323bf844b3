//! Tiler configuration.
//!
//! Loaded from a YAML file when one is given, otherwise from `LLC_*`
//! environment variables. Command-line flags are applied on top by the binary.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use llc_grid::{ElementType, GridLayout, LlcPreset, TileShape};
use llc_reader::{DataPaths, FaceReader, LlcModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which grid geometry to start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridPreset {
    #[default]
    Llc4320,
    Llc1080,
    /// Every dimension comes from the explicit fields.
    Custom,
}

impl GridPreset {
    pub fn from_str(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("custom") {
            return Some(GridPreset::Custom);
        }
        LlcPreset::from_str(s.trim()).map(|preset| match preset {
            LlcPreset::Llc4320 => GridPreset::Llc4320,
            LlcPreset::Llc1080 => GridPreset::Llc1080,
        })
    }

    fn preset(&self) -> Option<LlcPreset> {
        match self {
            GridPreset::Llc4320 => Some(LlcPreset::Llc4320),
            GridPreset::Llc1080 => Some(LlcPreset::Llc1080),
            GridPreset::Custom => None,
        }
    }
}

/// Top-level tiler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilerConfig {
    /// Base geometry
    #[serde(default)]
    pub preset: GridPreset,

    /// Overrides of the preset geometry (required for `custom`)
    #[serde(default)]
    pub face_count: Option<usize>,
    #[serde(default)]
    pub side_length: Option<usize>,
    #[serde(default)]
    pub top_length: Option<usize>,
    #[serde(default)]
    pub vertical_levels: Option<usize>,

    /// Directory holding model output fields
    #[serde(default = "default_dir")]
    pub data_dir: PathBuf,

    /// Directory holding grid files (`XC.data`, `YC.data`)
    #[serde(default = "default_dir")]
    pub grid_dir: PathBuf,

    /// Sample encoding, numpy style (`>f4`, `<f4`, `>f8`, `<f8`)
    #[serde(default = "default_dtype")]
    pub dtype: String,

    #[serde(default = "default_tile_size")]
    pub tile_rows: usize,
    #[serde(default = "default_tile_size")]
    pub tile_cols: usize,

    /// Open mappings kept between reads; 0 disables the cache
    #[serde(default = "default_map_cache_entries")]
    pub map_cache_entries: usize,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_dtype() -> String {
    ElementType::default().as_str().to_string()
}

fn default_tile_size() -> usize {
    540
}

fn default_map_cache_entries() -> usize {
    8
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self {
            preset: GridPreset::default(),
            face_count: None,
            side_length: None,
            top_length: None,
            vertical_levels: None,
            data_dir: default_dir(),
            grid_dir: default_dir(),
            dtype: default_dtype(),
            tile_rows: default_tile_size(),
            tile_cols: default_tile_size(),
            map_cache_entries: default_map_cache_entries(),
        }
    }
}

impl TilerConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded YAML configuration");
        Ok(config)
    }

    /// Load configuration from `LLC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup with the same names as the
    /// environment variables. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(preset) = lookup("LLC_PRESET") {
            config.preset = GridPreset::from_str(&preset)
                .ok_or_else(|| anyhow!("LLC_PRESET must be llc4320, llc1080 or custom, got {:?}", preset))?;
        }
        if let Some(dir) = lookup("LLC_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LLC_GRID_DIR") {
            config.grid_dir = PathBuf::from(dir);
        }
        if let Some(dtype) = lookup("LLC_DTYPE") {
            config.dtype = dtype;
        }

        config.face_count = parse_optional(&lookup, "LLC_FACE_COUNT")?;
        config.side_length = parse_optional(&lookup, "LLC_SIDE_LENGTH")?;
        config.top_length = parse_optional(&lookup, "LLC_TOP_LENGTH")?;
        config.vertical_levels = parse_optional(&lookup, "LLC_VERTICAL_LEVELS")?;

        if let Some(rows) = parse_optional(&lookup, "LLC_TILE_ROWS")? {
            config.tile_rows = rows;
        }
        if let Some(cols) = parse_optional(&lookup, "LLC_TILE_COLS")? {
            config.tile_cols = cols;
        }
        if let Some(entries) = parse_optional(&lookup, "LLC_MAP_CACHE_ENTRIES")? {
            config.map_cache_entries = entries;
        }

        Ok(config)
    }

    /// Check the configuration without touching the file system.
    pub fn validate(&self) -> Result<()> {
        if self.tile_rows == 0 || self.tile_cols == 0 {
            bail!(
                "tile shape must be positive, got {} x {}",
                self.tile_rows,
                self.tile_cols
            );
        }
        self.element_type()?;
        self.build_layout()?;
        Ok(())
    }

    /// Sample encoding of the configured files.
    pub fn element_type(&self) -> Result<ElementType> {
        ElementType::parse(&self.dtype).ok_or_else(|| {
            anyhow!(
                "unsupported dtype {:?}, expected one of >f4, <f4, >f8, <f8",
                self.dtype
            )
        })
    }

    /// Grid geometry: the preset dimensions with any explicit overrides.
    pub fn build_layout(&self) -> Result<GridLayout> {
        let (faces, side, top, levels) = match self.preset.preset() {
            Some(preset) => {
                let (faces, side, top, levels) = preset.parameters();
                (
                    self.face_count.unwrap_or(faces),
                    self.side_length.unwrap_or(side),
                    self.top_length.unwrap_or(top),
                    self.vertical_levels.unwrap_or(levels),
                )
            }
            None => (
                self.face_count.unwrap_or(5),
                self.side_length
                    .context("custom grids need side_length")?,
                self.top_length.context("custom grids need top_length")?,
                self.vertical_levels
                    .context("custom grids need vertical_levels")?,
            ),
        };
        GridLayout::new(faces, side, top, levels).context("Invalid grid geometry")
    }

    pub fn tile_shape(&self) -> TileShape {
        TileShape::new(self.tile_rows, self.tile_cols)
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir, &self.grid_dir)
    }

    /// Model with a reader configured from this file.
    pub fn build_model(&self) -> Result<LlcModel> {
        let layout = Arc::new(self.build_layout()?);
        let reader = FaceReader::new(layout)
            .with_dtype(self.element_type()?)
            .with_map_cache(self.map_cache_entries);
        Ok(LlcModel::with_reader(reader, self.paths()))
    }
}

fn parse_optional<F>(lookup: &F, key: &str) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, value))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TilerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TilerConfig::default());
        assert_eq!(config.preset, GridPreset::Llc4320);
        assert_eq!(config.dtype, ">f4");
        assert_eq!(config.tile_shape(), TileShape::new(540, 540));
        assert_eq!(config.map_cache_entries, 8);
        config.validate().unwrap();

        let layout = config.build_layout().unwrap();
        assert_eq!(layout.side_length(), 12960);
        assert_eq!(layout.vertical_levels(), 90);
    }

    #[test]
    fn test_env_overrides() {
        let config = TilerConfig::from_lookup(lookup(&[
            ("LLC_PRESET", "LLC1080"),
            ("LLC_DATA_DIR", "/data/run"),
            ("LLC_GRID_DIR", "/data/grid"),
            ("LLC_DTYPE", "<f8"),
            ("LLC_TILE_ROWS", "270"),
            ("LLC_TILE_COLS", " 135 "),
            ("LLC_MAP_CACHE_ENTRIES", "0"),
            ("LLC_VERTICAL_LEVELS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.preset, GridPreset::Llc1080);
        assert_eq!(config.data_dir, PathBuf::from("/data/run"));
        assert_eq!(config.grid_dir, PathBuf::from("/data/grid"));
        assert_eq!(config.element_type().unwrap(), ElementType::LITTLE_F64);
        assert_eq!(config.tile_shape(), TileShape::new(270, 135));
        assert_eq!(config.map_cache_entries, 0);

        let layout = config.build_layout().unwrap();
        assert_eq!(layout.side_length(), 3240);
        assert_eq!(layout.top_length(), 1080);
        assert_eq!(layout.vertical_levels(), 1);
    }

    #[test]
    fn test_bad_env_values() {
        assert!(TilerConfig::from_lookup(lookup(&[("LLC_PRESET", "llc90")])).is_err());
        assert!(TilerConfig::from_lookup(lookup(&[("LLC_TILE_ROWS", "-1")])).is_err());
        assert!(TilerConfig::from_lookup(lookup(&[("LLC_SIDE_LENGTH", "big")])).is_err());
    }

    #[test]
    fn test_custom_requires_dimensions() {
        let config = TilerConfig {
            preset: GridPreset::Custom,
            side_length: Some(12),
            top_length: Some(4),
            ..TilerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vertical_levels"));

        let config = TilerConfig {
            vertical_levels: Some(3),
            ..config
        };
        config.validate().unwrap();
        assert_eq!(config.build_layout().unwrap().total_x_dim(), 52);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_tiles = TilerConfig {
            tile_cols: 0,
            ..TilerConfig::default()
        };
        assert!(zero_tiles.validate().is_err());

        let bad_dtype = TilerConfig {
            dtype: "i4".to_string(),
            ..TilerConfig::default()
        };
        assert!(bad_dtype.validate().is_err());

        let six_faces = TilerConfig {
            face_count: Some(6),
            ..TilerConfig::default()
        };
        assert!(six_faces.validate().is_err());
    }

    #[test]
    fn test_yaml_with_defaults() {
        let yaml = r#"
preset: custom
side_length: 6
top_length: 6
vertical_levels: 2
data_dir: /scratch/llc
tile_rows: 3
tile_cols: 2
"#;
        let config: TilerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.preset, GridPreset::Custom);
        assert_eq!(config.data_dir, PathBuf::from("/scratch/llc"));
        assert_eq!(config.grid_dir, PathBuf::from("."));
        assert_eq!(config.dtype, ">f4");
        assert_eq!(config.map_cache_entries, 8);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiler.yaml");
        std::fs::write(&path, "preset: llc1080\ndtype: '>f8'\n").unwrap();

        let config = TilerConfig::from_yaml(&path).unwrap();
        assert_eq!(config.preset, GridPreset::Llc1080);
        assert_eq!(config.element_type().unwrap(), ElementType::BIG_F64);

        assert!(TilerConfig::from_yaml(dir.path().join("missing.yaml")).is_err());
        std::fs::write(&path, "preset: [not, a, preset]\n").unwrap();
        assert!(TilerConfig::from_yaml(&path).is_err());
    }
}
