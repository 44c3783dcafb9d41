//! Raster summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use coastrefine::grid::{AsciiRaster, GridSource};

#[derive(Args)]
pub struct InfoArgs {
    /// ASCII topography raster
    #[arg(short, long)]
    pub topo: PathBuf,
}

pub fn execute(args: InfoArgs) -> Result<()> {
    let grid = AsciiRaster::new(&args.topo)
        .load()
        .with_context(|| format!("loading {}", args.topo.display()))?;
    let g = grid.geometry();

    println!("raster:     {}", args.topo.display());
    println!("shape:      {} rows x {} cols", g.rows, g.cols);
    println!("spacing:    dx = {}, dy = {}", g.dx, g.dy);
    match g.extent() {
        Some(e) => println!(
            "extent:     x [{}, {}], y [{}, {}]",
            e.x_min, e.x_max, e.y_min, e.y_max
        ),
        None => println!("extent:     (empty)"),
    }
    match grid.elevation_range() {
        Some((lo, hi)) => println!("elevation:  [{lo}, {hi}]"),
        None => println!("elevation:  (no data)"),
    }
    let missing = grid.values().iter().filter(|v| v.is_nan()).count();
    println!("no-data:    {missing} cells");
    Ok(())
}
