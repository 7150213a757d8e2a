//! Command-line configuration for the sequence stitcher.
//!
//! This module provides:
//! - Subcommands via clap (`group`, `read`, `thumbnail`, `assemble`)
//! - Environment variables with the `STITCH_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use sequence_stitcher::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Group(config) = cli.command {
//!     config.validate()?;
//!     let paths = config.input.resolve_paths()?;
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `STITCH_VARIANT` - Prefix table, `simple` or `full` (default: full)
//! - `STITCH_POOL_SIZE` - Paths whose idle handles are kept open (default: 64)
//! - `STITCH_RECURSIVE` - Descend into sub-directories (default: false)
//! - `STITCH_THUMBNAIL_SIZE` - Longest thumbnail side (default: 256)

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use walkdir::WalkDir;

use crate::backend::{ImageFileBackend, DEFAULT_POOL_CAPACITY};
use crate::naming::ClassifierVariant;

// =============================================================================
// Default Values
// =============================================================================

/// Default longest side of a thumbnail.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Largest accepted thumbnail side.
pub const MAX_THUMBNAIL_SIZE: u32 = 16384;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Sequence Stitcher - infers the layout of multi-file acquisitions from
/// their filenames.
#[derive(Parser, Debug, Clone)]
#[command(name = "sequence-stitcher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Group files into sequences and print what was found
    Group(GroupConfig),

    /// Read a stitched region and save it as an image
    Read(ReadConfig),

    /// Save a downscaled view of one group
    Thumbnail(ThumbnailConfig),

    /// Load every group into memory sequences and print their shape
    Assemble(AssembleConfig),
}

impl Command {
    /// Input options shared by every subcommand.
    pub fn input(&self) -> &InputOptions {
        match self {
            Command::Group(c) => &c.input,
            Command::Read(c) => &c.input,
            Command::Thumbnail(c) => &c.input,
            Command::Assemble(c) => &c.input,
        }
    }
}

/// Filename prefix table.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Z, T, C and series prefixes
    Simple,

    /// Adds X and Y tile prefixes
    #[default]
    Full,
}

impl From<Variant> for ClassifierVariant {
    fn from(value: Variant) -> Self {
        match value {
            Variant::Simple => ClassifierVariant::Simple,
            Variant::Full => ClassifierVariant::Full,
        }
    }
}

// =============================================================================
// Shared Input Options
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InputOptions {
    /// Image files or directories holding them.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Filename prefix table used to classify numbers.
    #[arg(long, value_enum, default_value_t = Variant::Full, env = "STITCH_VARIANT")]
    pub variant: Variant,

    /// Number of paths whose idle file handles are kept open.
    #[arg(long, default_value_t = DEFAULT_POOL_CAPACITY, env = "STITCH_POOL_SIZE")]
    pub pool_size: usize,

    /// Descend into sub-directories.
    #[arg(short, long, default_value_t = false, env = "STITCH_RECURSIVE")]
    pub recursive: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InputOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.paths.is_empty() {
            return Err("At least one input path is required".to_string());
        }
        if self.pool_size == 0 {
            return Err("pool_size must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Expand directories into the files they contain.
    ///
    /// Directory listings are sorted; files named directly are kept in the
    /// order given. Only files the image backend recognises are taken from
    /// directories. Symlinked directories are not descended into.
    pub fn resolve_paths(&self) -> Result<Vec<String>, String> {
        let mut resolved = Vec::new();
        for path in &self.paths {
            if path.is_dir() {
                collect_dir(path, self.recursive, &mut resolved)?;
            } else {
                resolved.push(path.to_string_lossy().into_owned());
            }
        }

        if resolved.is_empty() {
            return Err("No image files found in the given paths".to_string());
        }
        Ok(resolved)
    }
}

fn collect_dir(dir: &Path, recursive: bool, out: &mut Vec<String>) -> Result<(), String> {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| format!("Cannot list {}: {}", dir.display(), e))?;
        // Symlinks to files are kept, symlinks to directories are not
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }
        let name = entry.path().to_string_lossy().into_owned();
        if ImageFileBackend::accepts(&name) {
            out.push(name);
        }
    }
    Ok(())
}

// =============================================================================
// Subcommand Configurations
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct GroupConfig {
    #[command(flatten)]
    pub input: InputOptions,

    /// Print the groups as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl GroupConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.input.validate()
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReadConfig {
    #[command(flatten)]
    pub input: InputOptions,

    /// Group index.
    #[arg(long, default_value_t = 0)]
    pub series: usize,

    /// Resolution level (0 = full resolution).
    #[arg(long, default_value_t = 0)]
    pub resolution: u32,

    /// Left edge of the region.
    #[arg(long, default_value_t = 0)]
    pub x: u32,

    /// Top edge of the region.
    #[arg(long, default_value_t = 0)]
    pub y: u32,

    /// Region width (default: to the right edge of the volume).
    #[arg(long)]
    pub width: Option<u32>,

    /// Region height (default: to the bottom edge of the volume).
    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long, default_value_t = 0)]
    pub z: u32,

    #[arg(long, default_value_t = 0)]
    pub t: u32,

    #[arg(long, default_value_t = 0)]
    pub c: u32,

    /// Image file to write (format from the extension).
    #[arg(short, long)]
    pub output: PathBuf,
}

impl ReadConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.input.validate()?;

        if self.width == Some(0) || self.height == Some(0) {
            return Err("Region width and height must be greater than 0".to_string());
        }
        validate_output(&self.output)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ThumbnailConfig {
    #[command(flatten)]
    pub input: InputOptions,

    /// Group index.
    #[arg(long, default_value_t = 0)]
    pub series: usize,

    /// Longest side of the thumbnail.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE, env = "STITCH_THUMBNAIL_SIZE")]
    pub max_size: u32,

    /// Image file to write (format from the extension).
    #[arg(short, long)]
    pub output: PathBuf,
}

impl ThumbnailConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.input.validate()?;

        if self.max_size == 0 || self.max_size > MAX_THUMBNAIL_SIZE {
            return Err(format!(
                "max_size must be between 1 and {}",
                MAX_THUMBNAIL_SIZE
            ));
        }
        validate_output(&self.output)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AssembleConfig {
    #[command(flatten)]
    pub input: InputOptions,

    /// Print the sequences as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl AssembleConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.input.validate()
    }
}

fn validate_output(output: &Path) -> Result<(), String> {
    if !ImageFileBackend::accepts(&output.to_string_lossy()) {
        return Err(format!(
            "Unsupported output format for {} (use .png, .tif, .jpg or .bmp)",
            output.display()
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
