//! LLC tiler.
//!
//! Describes Lat-Lon-Cube grids, lists and resolves tiles, and exports
//! tiles of model output fields with their coordinates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use llc_grid::{Levels, TileSpec};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use llc_tiler::config::{GridPreset, TilerConfig};
use llc_tiler::export::{export_tiles, ExportOptions};
use llc_tiler::scan::scan_directory;

#[derive(Parser, Debug)]
#[command(name = "llc-tiler")]
#[command(about = "Tile Lat-Lon-Cube model output")]
struct Args {
    /// Configuration file path (otherwise LLC_* environment variables)
    #[arg(short, long, env = "LLC_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

/// Command-line overrides applied on top of the loaded configuration.
#[derive(ClapArgs, Debug)]
struct Overrides {
    /// Grid preset (llc4320, llc1080, custom)
    #[arg(long)]
    preset: Option<String>,

    /// Directory holding model output fields
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory holding XC.data and YC.data
    #[arg(long)]
    grid_dir: Option<PathBuf>,

    /// Sample encoding (>f4, <f4, >f8, <f8)
    #[arg(long)]
    dtype: Option<String>,

    #[arg(long)]
    side_length: Option<usize>,

    #[arg(long)]
    top_length: Option<usize>,

    #[arg(long)]
    vertical_levels: Option<usize>,

    #[arg(long)]
    tile_rows: Option<usize>,

    #[arg(long)]
    tile_cols: Option<usize>,

    /// Open mappings kept between reads (0 disables)
    #[arg(long)]
    map_cache_entries: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the grid geometry and the corner coordinates of every face
    Describe {
        /// Skip reading XC.data / YC.data
        #[arg(long)]
        geometry_only: bool,
    },

    /// List every tile of the grid
    Tiles {
        /// Only tiles of this face
        #[arg(long)]
        face: Option<usize>,
    },

    /// Show the face and window of one tile id
    Resolve {
        #[arg(allow_negative_numbers = true)]
        tile_id: i64,
    },

    /// Export tiles of a field with their coordinates
    Export {
        /// Field file name inside the data directory
        #[arg(short, long)]
        field: String,

        /// Tile ids to export (default: all)
        #[arg(short, long = "tile", allow_negative_numbers = true)]
        tiles: Vec<i64>,

        /// Vertical level to export
        #[arg(long, default_value_t = 0, conflicts_with = "all_levels")]
        level: usize,

        /// Export every level in the file
        #[arg(long)]
        all_levels: bool,

        /// Output directory
        #[arg(short, long, default_value = "tiles")]
        output: PathBuf,

        /// Output file name prefix
        #[arg(long, default_value = "tile")]
        basename: String,
    },

    /// Size-check every .data file in the data directory
    Scan,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    let config = load_config(&args)?;
    config.validate()?;
    info!(
        preset = ?config.preset,
        data_dir = %config.data_dir.display(),
        grid_dir = %config.grid_dir.display(),
        dtype = %config.dtype,
        "Loaded configuration"
    );

    match args.command {
        Command::Describe { geometry_only } => describe(&config, geometry_only),
        Command::Tiles { face } => list_tiles(&config, face),
        Command::Resolve { tile_id } => resolve(&config, tile_id),
        Command::Export {
            field,
            tiles,
            level,
            all_levels,
            output,
            basename,
        } => {
            let levels = if all_levels {
                Levels::All
            } else {
                Levels::Single(level)
            };
            let options = ExportOptions::new(field, output)
                .with_levels(levels)
                .with_basename(basename);
            export(&config, &tiles, &options)
        }
        Command::Scan => scan(&config),
    }
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn load_config(args: &Args) -> Result<TilerConfig> {
    let mut config = match &args.config {
        Some(path) => TilerConfig::from_yaml(path)?,
        None => TilerConfig::from_env()?,
    };

    let o = &args.overrides;
    if let Some(preset) = &o.preset {
        config.preset = GridPreset::from_str(preset)
            .with_context(|| format!("Unknown preset {:?}", preset))?;
    }
    if let Some(dir) = &o.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &o.grid_dir {
        config.grid_dir = dir.clone();
    }
    if let Some(dtype) = &o.dtype {
        config.dtype = dtype.clone();
    }
    config.side_length = o.side_length.or(config.side_length);
    config.top_length = o.top_length.or(config.top_length);
    config.vertical_levels = o.vertical_levels.or(config.vertical_levels);
    if let Some(rows) = o.tile_rows {
        config.tile_rows = rows;
    }
    if let Some(cols) = o.tile_cols {
        config.tile_cols = cols;
    }
    if let Some(entries) = o.map_cache_entries {
        config.map_cache_entries = entries;
    }
    Ok(config)
}

fn describe(config: &TilerConfig, geometry_only: bool) -> Result<()> {
    let model = config.build_model()?;
    let layout = model.layout();

    println!(
        "faces: {}  side: {}  top: {}  levels: {}  total x: {}",
        layout.face_count(),
        layout.side_length(),
        layout.top_length(),
        layout.vertical_levels(),
        layout.total_x_dim()
    );
    for face in 0..layout.face_count() {
        let (rows, cols) = layout.face_dims(face)?;
        let range = layout.face_offset_range(face)?;
        println!(
            "face {}: {} x {}  on disk at columns {}..{}",
            face, rows, cols, range.start, range.end
        );
    }

    if geometry_only {
        return Ok(());
    }
    for corners in model.describe_faces()? {
        println!("face {}:", corners.face);
        for (name, corner) in [
            ("lower left", corners.lower_left),
            ("lower right", corners.lower_right),
            ("upper left", corners.upper_left),
            ("upper right", corners.upper_right),
        ] {
            println!("  {:<12} XC {:>10.4}  YC {:>9.4}", name, corner.xc, corner.yc);
        }
    }
    Ok(())
}

fn list_tiles(config: &TilerConfig, face: Option<usize>) -> Result<()> {
    let model = config.build_model()?;
    let index = model.tile_index(config.tile_shape())?;

    let specs: Vec<TileSpec> = match face {
        Some(face) => {
            let ids = index
                .face_tile_ids(face)
                .with_context(|| format!("Face {} is out of range", face))?;
            ids.map(|id| index.resolve(id as i64)).collect::<llc_grid::Result<_>>()?
        }
        None => index.enumerate(),
    };
    for spec in &specs {
        println!("{}", serde_json::to_string(spec)?);
    }
    info!(tiles = specs.len(), total = index.total_tiles(), "Listed tiles");
    Ok(())
}

fn resolve(config: &TilerConfig, tile_id: i64) -> Result<()> {
    let model = config.build_model()?;
    let index = model.tile_index(config.tile_shape())?;
    let tile = model.tile_by_id(&index, tile_id)?;
    println!("{}", serde_json::to_string_pretty(tile.spec())?);
    Ok(())
}

fn export(config: &TilerConfig, tiles: &[i64], options: &ExportOptions) -> Result<()> {
    let model = config.build_model()?;
    let index = model.tile_index(config.tile_shape())?;
    let exported = export_tiles(&model, &index, tiles, options)?;
    for tile in &exported {
        println!("{}", tile.sidecar.display());
    }
    Ok(())
}

fn scan(config: &TilerConfig) -> Result<()> {
    let layout = config.build_layout()?;
    let entries = scan_directory(&config.data_dir, &layout, config.element_type()?)?;
    let mismatched = entries.iter().filter(|e| e.levels.is_none()).count();
    for entry in &entries {
        match entry.levels {
            Some(levels) => println!("{:>3} levels  {}", levels, entry.path.display()),
            None => println!("  mismatch  {} ({} bytes)", entry.path.display(), entry.bytes),
        }
    }
    info!(files = entries.len(), mismatched, "Scan complete");
    Ok(())
}
