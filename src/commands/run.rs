//! Nearshore region run.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use coastrefine::grid::{write_mask, AsciiRaster, Extent, GridSource};
use coastrefine::pipeline::{NearshoreConfig, NearshorePipeline, RulingChoice};
use coastrefine::region::CoverageMethod;
use tracing::{info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// ASCII topography raster
    #[arg(short, long)]
    pub topo: PathBuf,

    /// Pipeline configuration (JSON); defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Restrict the raster to x_min,x_max,y_min,y_max before selecting
    #[arg(long, allow_hyphen_values = true)]
    pub crop: Option<Extent>,

    /// Refinement region output file
    #[arg(short, long, default_value = "coastrr.data")]
    pub output: PathBuf,

    /// Optional 0/1 raster of the nearshore mask
    #[arg(long)]
    pub mask_output: Option<PathBuf>,

    /// Ruling axis: rows, columns or auto (overrides the config)
    #[arg(long)]
    pub axis: Option<RulingChoice>,

    /// Cells of padding around every strip (overrides the config)
    #[arg(long)]
    pub padding: Option<usize>,

    /// Span endpoints at points or cell edges (overrides the config)
    #[arg(long, value_parser = parse_method)]
    pub method: Option<CoverageMethod>,

    /// Write one enclosing span per line instead of the exact covering
    #[arg(long)]
    pub envelope: bool,
}

fn parse_method(s: &str) -> Result<CoverageMethod, String> {
    match s.to_ascii_lowercase().as_str() {
        "points" | "0" => Ok(CoverageMethod::Points),
        "cells" | "1" => Ok(CoverageMethod::Cells),
        other => Err(format!("unknown coverage method '{other}'")),
    }
}

pub fn execute(args: RunArgs) -> Result<()> {
    let start = Instant::now();

    let mut config = match &args.config {
        Some(path) => NearshoreConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NearshoreConfig::default(),
    };
    if let Some(axis) = args.axis {
        config.ruling = axis;
    }
    if let Some(padding) = args.padding {
        config.padding = padding;
    }
    if let Some(method) = args.method {
        config.method = method;
    }
    let pipeline = NearshorePipeline::new(config)?;

    let mut grid = AsciiRaster::new(&args.topo)
        .load()
        .with_context(|| format!("loading {}", args.topo.display()))?;
    if let Some(extent) = &args.crop {
        grid = grid.crop(extent);
        info!(rows = grid.dim().0, cols = grid.dim().1, "cropped raster");
    }
    if grid.is_empty() {
        warn!("raster is empty after cropping; the region will have no rules");
    }

    let result = pipeline.run(&grid)?;
    if result.tether.limit_reached() {
        info!(
            rounds = result.tether.rounds,
            "tether pass stopped at its iteration cap"
        );
    }

    if let Some(path) = &args.mask_output {
        write_mask(&result.nearshore, grid.geometry(), path)
            .with_context(|| format!("writing mask {}", path.display()))?;
    }

    let region = if args.envelope {
        result.region.envelope()
    } else {
        result.region
    };
    pipeline
        .writer(&grid)
        .write(&region, &args.output)
        .with_context(|| format!("writing region {}", args.output.display()))?;

    info!(
        rules = region.len(),
        cells = result.nearshore.count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "done"
    );
    Ok(())
}
