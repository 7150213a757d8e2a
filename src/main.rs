//! Sequence Stitcher - command-line front end.
//!
//! Groups image files into sequences, then prints, reads or assembles them.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sequence_stitcher::{
    config::{AssembleConfig, Cli, Command, GroupConfig, InputOptions, ReadConfig, ThumbnailConfig},
    CancellationFlag, GroupBuilder, GroupSummary, GroupingOutcome, HandlePool, ImageFileBackend,
    PixelBuffer, Rect, SequenceAssembler, TiledVolumeReader,
};

type Pool = Arc<HandlePool<ImageFileBackend>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.command.input().verbose);

    match cli.command {
        Command::Group(config) => run_group(config).await,
        Command::Read(config) => run_read(config).await,
        Command::Thumbnail(config) => run_thumbnail(config).await,
        Command::Assemble(config) => run_assemble(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "sequence_stitcher=debug"
    } else {
        "sequence_stitcher=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Cancellation flag raised by Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationFlag {
    let flag = CancellationFlag::new();
    let handle = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current file");
            handle.cancel();
        }
    });
    flag
}

/// Expand the inputs and group them.
async fn build_groups(input: &InputOptions, pool: &Pool) -> Result<GroupingOutcome, String> {
    let paths = input.resolve_paths()?;
    info!("Grouping {} file(s)", paths.len());

    GroupBuilder::new(pool.clone())
        .with_variant(input.variant.into())
        .build(&paths, &cancel_on_ctrl_c())
        .await
        .map_err(|e| e.to_string())
}

fn new_pool(input: &InputOptions) -> Pool {
    Arc::new(HandlePool::with_capacity(ImageFileBackend::new(), input.pool_size))
}

// =============================================================================
// Group Command
// =============================================================================

#[derive(Serialize)]
struct UnplacedReport {
    path: String,
    reason: String,
}

#[derive(Serialize)]
struct GroupReport {
    groups: Vec<GroupSummary>,
    unplaced: Vec<UnplacedReport>,
    cancelled: bool,
}

async fn run_group(config: GroupConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let pool = new_pool(&config.input);
    let outcome = match build_groups(&config.input, &pool).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Grouping failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = GroupReport {
        groups: outcome.groups.iter().map(|g| g.summary()).collect(),
        unplaced: outcome
            .unplaced
            .iter()
            .map(|u| UnplacedReport {
                path: u.path.clone(),
                reason: u.reason.to_string(),
            })
            .collect(),
        cancelled: outcome.cancelled,
    };

    if config.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    for (i, group) in report.groups.iter().enumerate() {
        println!("Series {}: {}", i, group.base);
        println!(
            "  {} file(s), grid {}x{} z{} t{} c{}",
            group.files, group.grid.x, group.grid.y, group.grid.z, group.grid.t, group.grid.c
        );
        println!(
            "  size X={} Y={} Z={} T={} C={} ({} x{})",
            group.size_x,
            group.size_y,
            group.size_z,
            group.size_t,
            group.size_c,
            group.signature.pixel_type.name(),
            group.signature.samples_per_pixel
        );
        if let Some(ref irregular) = group.irregular {
            println!("  warning: {}", irregular);
        }
    }
    if !report.unplaced.is_empty() {
        println!();
        println!("Unplaced files:");
        for u in &report.unplaced {
            println!("  {} ({})", u.path, u.reason);
        }
    }
    if report.cancelled {
        println!();
        println!("Grouping was cancelled; results are partial.");
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Read Command
// =============================================================================

async fn run_read(config: ReadConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let pool = new_pool(&config.input);
    let outcome = match build_groups(&config.input, &pool).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Grouping failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reader = TiledVolumeReader::new(outcome.groups, pool);
    let group = match reader.group(config.series) {
        Ok(group) => group,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let (tile_width, tile_height) = group.signature().size_at(config.resolution);
    let volume_width = tile_width.saturating_mul(group.grid().x);
    let volume_height = tile_height.saturating_mul(group.grid().y);
    let rect = Rect::new(
        config.x,
        config.y,
        config
            .width
            .unwrap_or_else(|| volume_width.saturating_sub(config.x)),
        config
            .height
            .unwrap_or_else(|| volume_height.saturating_sub(config.y)),
    );

    let buffer = match reader
        .read_region(config.series, config.resolution, rect, config.z, config.t, config.c)
        .await
    {
        Ok(buffer) => buffer,
        Err(e) => {
            error!("Read failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match save_buffer(&buffer, &config.output) {
        Ok(()) => {
            info!(
                "Wrote {}x{} region to {}",
                buffer.width,
                buffer.height,
                config.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Thumbnail Command
// =============================================================================

async fn run_thumbnail(config: ThumbnailConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let pool = new_pool(&config.input);
    let outcome = match build_groups(&config.input, &pool).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Grouping failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reader = TiledVolumeReader::new(outcome.groups, pool);
    let buffer = match reader.read_thumbnail(config.series, config.max_size).await {
        Ok(buffer) => buffer,
        Err(e) => {
            error!("Thumbnail failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match save_buffer(&buffer, &config.output) {
        Ok(()) => {
            info!(
                "Wrote {}x{} thumbnail to {}",
                buffer.width,
                buffer.height,
                config.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn save_buffer(buffer: &PixelBuffer, output: &Path) -> Result<(), String> {
    let image = buffer.to_dynamic_image().ok_or_else(|| {
        format!(
            "Cannot save {} pixels with {} sample(s) as an image",
            buffer.pixel_type.name(),
            buffer.samples_per_pixel
        )
    })?;
    image
        .save(output)
        .map_err(|e| format!("Failed to write {}: {}", output.display(), e))
}

// =============================================================================
// Assemble Command
// =============================================================================

#[derive(Serialize)]
struct SequenceReport {
    series: usize,
    size_x: u32,
    size_y: u32,
    size_z: u32,
    size_t: u32,
    size_c: u32,
    files: usize,
    missing_planes: usize,
}

async fn run_assemble(config: AssembleConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let pool = new_pool(&config.input);
    let outcome = match build_groups(&config.input, &pool).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Grouping failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let entries = outcome.assembly_entries();
    let assembled = match SequenceAssembler::new(pool)
        .assemble(&entries, &cancel_on_ctrl_c())
        .await
    {
        Ok(assembled) => assembled,
        Err(e) => {
            error!("Assembly failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reports: Vec<SequenceReport> = assembled
        .sequences
        .iter()
        .map(|s| SequenceReport {
            series: s.series,
            size_x: s.size_x(),
            size_y: s.size_y(),
            size_z: s.size_z,
            size_t: s.size_t,
            size_c: s.size_c,
            files: s.paths.len(),
            missing_planes: s.missing_planes(),
        })
        .collect();

    if config.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for (i, r) in reports.iter().enumerate() {
            println!(
                "Sequence {} (series {}): X={} Y={} Z={} T={} C={}, {} file(s), {} missing plane(s)",
                i, r.series, r.size_x, r.size_y, r.size_z, r.size_t, r.size_c, r.files, r.missing_planes
            );
        }
    }

    for failed in &assembled.failed {
        warn!("Could not load {}: {}", failed.path, failed.error);
    }
    if assembled.cancelled {
        warn!("Assembly was cancelled; results are partial");
    }

    ExitCode::SUCCESS
}
