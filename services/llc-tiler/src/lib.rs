//! LLC tiler service library.
//!
//! Configuration loading, tile export and data directory scans used by the
//! `llc-tiler` binary.

pub mod config;
pub mod export;
pub mod scan;

pub use config::{GridPreset, TilerConfig};
pub use export::{export_tile, export_tiles, lonlat_to_meters, ExportOptions, ExportedTile, TileSidecar};
pub use scan::{scan_directory, ScanEntry};
