//! Nearshore refinement pipeline.
//!
//! Chains flood passes into the region a storm-surge run refines at its
//! finest level:
//!
//! 1. **coastline** - uncapped pass over the narrow band, flooded from the
//!    wet cells
//! 2. **tether** - wide band seeded by the coastline, capped in rounds so it
//!    stays attached to the shore
//! 3. **reexpand** - narrow band again, seeded by the tether
//! 4. **shallow** - independent pass over the shallow band, flooded from the
//!    dry cells
//! 5. **nearshore** - `reexpand AND shallow`, compressed into strips
//!
//! Every stage takes and returns immutable masks, so each can be run and
//! tested on its own. Stages 1-3 and stage 4 share nothing but the grid and
//! run concurrently.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RefineError, RefineResult};
use crate::grid::{Grid, GridSource};
use crate::region::{compress, CoverageMethod, RegionWriter, RuledRectangleSet, RulingAxis};
use crate::selection::{Adjacency, Bounds, FloodSelector, Selection, SelectionMask};

/// One elevation band. Missing ends are unbounded.
///
/// `seed_low`/`seed_high` pick the cells a pass starts from when no earlier
/// stage feeds it: the wet side of the shore for the coastline pass, the dry
/// side for the shallow pass. With neither set, every admissible cell seeds
/// itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    /// Cap on propagation rounds.
    #[serde(default)]
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub seed_low: Option<f64>,
    #[serde(default)]
    pub seed_high: Option<f64>,
}

impl BandConfig {
    pub fn bounds(&self) -> RefineResult<Bounds> {
        Bounds::new(
            self.low.unwrap_or(f64::NEG_INFINITY),
            self.high.unwrap_or(f64::INFINITY),
        )
    }

    /// Seed band, if one is configured.
    pub fn seed_bounds(&self) -> RefineResult<Option<Bounds>> {
        if self.seed_low.is_none() && self.seed_high.is_none() {
            return Ok(None);
        }
        Bounds::new(
            self.seed_low.unwrap_or(f64::NEG_INFINITY),
            self.seed_high.unwrap_or(f64::INFINITY),
        )
        .map(Some)
    }

    /// Cells of `grid` inside the seed band.
    pub fn seed_mask(&self, grid: &Grid) -> RefineResult<Option<SelectionMask>> {
        Ok(self
            .seed_bounds()?
            .map(|b| SelectionMask::from_array(grid.values().mapv(|z| b.contains(z)))))
    }
}

fn default_coastline() -> BandConfig {
    BandConfig {
        high: Some(15.0),
        seed_high: Some(0.0),
        ..BandConfig::default()
    }
}

fn default_tether() -> BandConfig {
    BandConfig {
        high: Some(1e6),
        max_iterations: Some(20),
        ..BandConfig::default()
    }
}

fn default_shallow() -> BandConfig {
    BandConfig {
        low: Some(-15.0),
        seed_low: Some(0.0),
        ..BandConfig::default()
    }
}

/// Ruling axis, or the one that yields fewer strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulingChoice {
    #[default]
    Rows,
    Columns,
    Auto,
}

impl RulingChoice {
    /// Pick a concrete axis for `mask`. `Auto` prefers rows on a tie.
    pub fn resolve(self, mask: &SelectionMask) -> RulingAxis {
        match self {
            RulingChoice::Rows => RulingAxis::Rows,
            RulingChoice::Columns => RulingAxis::Columns,
            RulingChoice::Auto => {
                let rows = compress(mask, RulingAxis::Rows, 0).len();
                let cols = compress(mask, RulingAxis::Columns, 0).len();
                if cols < rows {
                    RulingAxis::Columns
                } else {
                    RulingAxis::Rows
                }
            }
        }
    }
}

impl std::str::FromStr for RulingChoice {
    type Err = RefineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(RulingChoice::Auto);
        }
        Ok(match s.parse::<RulingAxis>()? {
            RulingAxis::Rows => RulingChoice::Rows,
            RulingAxis::Columns => RulingChoice::Columns,
        })
    }
}

/// Pipeline parameters, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearshoreConfig {
    /// Narrow band of the coastline and re-expansion passes.
    #[serde(default = "default_coastline")]
    pub coastline: BandConfig,

    /// Wide, capped band anchoring the selection to the shore.
    #[serde(default = "default_tether")]
    pub tether: BandConfig,

    /// Band of the independent shallow-water pass.
    #[serde(default = "default_shallow")]
    pub shallow: BandConfig,

    #[serde(default)]
    pub adjacency: Adjacency,

    #[serde(default)]
    pub ruling: RulingChoice,

    /// Cells added on both ends of every strip.
    #[serde(default)]
    pub padding: usize,

    #[serde(default)]
    pub method: CoverageMethod,
}

impl Default for NearshoreConfig {
    fn default() -> Self {
        Self {
            coastline: default_coastline(),
            tether: default_tether(),
            shallow: default_shallow(),
            adjacency: Adjacency::default(),
            ruling: RulingChoice::default(),
            padding: 0,
            method: CoverageMethod::default(),
        }
    }
}

impl NearshoreConfig {
    pub fn from_json_str(text: &str) -> RefineResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| RefineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> RefineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RefineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check every band before any pass runs.
    pub fn validate(&self) -> RefineResult<()> {
        for band in [&self.coastline, &self.tether, &self.shallow] {
            band.bounds()?;
            band.seed_bounds()?;
        }
        Ok(())
    }
}

/// Masks of every stage plus the compressed region.
#[derive(Debug, Clone)]
pub struct NearshoreResult {
    pub coastline: Selection,
    pub tether: Selection,
    pub reexpanded: Selection,
    pub shallow: Selection,
    pub nearshore: SelectionMask,
    pub region: RuledRectangleSet,
}

/// Runs the staged selection over a grid.
#[derive(Debug, Clone)]
pub struct NearshorePipeline {
    config: NearshoreConfig,
    selector: FloodSelector,
}

impl NearshorePipeline {
    pub fn new(config: NearshoreConfig) -> RefineResult<Self> {
        config.validate()?;
        let selector = FloodSelector::new(config.adjacency);
        Ok(Self { config, selector })
    }

    pub fn config(&self) -> &NearshoreConfig {
        &self.config
    }

    fn pass(&self, grid: &Grid, band: &BandConfig, seed: Option<&SelectionMask>) -> RefineResult<Selection> {
        self.selector.select(grid, band.bounds()?, seed, band.max_iterations)
    }

    /// Narrow band flooded from the coastline seed band.
    pub fn coastline(&self, grid: &Grid) -> RefineResult<Selection> {
        let band = &self.config.coastline;
        self.pass(grid, band, band.seed_mask(grid)?.as_ref())
    }

    /// Wide capped band, seeded by its own seed band when one is configured
    /// and by `coastline` otherwise.
    pub fn tether(&self, grid: &Grid, coastline: &SelectionMask) -> RefineResult<Selection> {
        let band = &self.config.tether;
        match band.seed_mask(grid)? {
            Some(seed) => self.pass(grid, band, Some(&seed)),
            None => self.pass(grid, band, Some(coastline)),
        }
    }

    /// Narrow band again, seeded only by `tether`.
    pub fn reexpand(&self, grid: &Grid, tether: &SelectionMask) -> RefineResult<Selection> {
        self.pass(grid, &self.config.coastline, Some(tether))
    }

    /// Shallow band flooded from the shallow seed band.
    pub fn shallow(&self, grid: &Grid) -> RefineResult<Selection> {
        let band = &self.config.shallow;
        self.pass(grid, band, band.seed_mask(grid)?.as_ref())
    }

    /// Run every stage and compress the nearshore mask.
    pub fn run(&self, grid: &Grid) -> RefineResult<NearshoreResult> {
        let (chain, shallow) = rayon::join(
            || -> RefineResult<(Selection, Selection, Selection)> {
                let coastline = self.coastline(grid)?;
                let tether = self.tether(grid, &coastline.mask)?;
                let reexpanded = self.reexpand(grid, &tether.mask)?;
                Ok((coastline, tether, reexpanded))
            },
            || self.shallow(grid),
        );
        let (coastline, tether, reexpanded) = chain?;
        let shallow = shallow?;

        info!(selected = coastline.mask.count(), "coastline pass");
        info!(
            selected = tether.mask.count(),
            rounds = tether.rounds,
            capped = tether.limit_reached(),
            "tether pass"
        );
        info!(selected = reexpanded.mask.count(), "re-expansion pass");
        info!(selected = shallow.mask.count(), "shallow pass");

        let nearshore = reexpanded.mask.and(&shallow.mask)?;
        let axis = self.config.ruling.resolve(&nearshore);
        let region = compress(&nearshore, axis, self.config.padding);
        info!(
            cells = nearshore.count(),
            strips = region.len(),
            axis = ?axis,
            "nearshore region"
        );

        Ok(NearshoreResult {
            coastline,
            tether,
            reexpanded,
            shallow,
            nearshore,
            region,
        })
    }

    /// Load a grid from `source`, then [`run`](Self::run).
    pub fn run_source(&self, source: &dyn GridSource) -> RefineResult<(Grid, NearshoreResult)> {
        let grid = source.load()?;
        let result = self.run(&grid)?;
        Ok((grid, result))
    }

    /// Writer for regions computed on `grid`.
    pub fn writer(&self, grid: &Grid) -> RegionWriter {
        RegionWriter::new(*grid.geometry(), self.config.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Sloping beach: deep water in the west rising to high land in the east,
    /// plus an isolated inland lake.
    fn beach() -> Grid {
        let values = Array2::from_shape_fn((6, 10), |(r, c)| {
            if (2..=3).contains(&r) && c == 9 {
                -3.0 // lake
            } else {
                -40.0 + 8.0 * c as f64
            }
        });
        Grid::new((0.0, 0.0), (1.0, 1.0), values).unwrap()
    }

    #[test]
    fn test_default_config_bands() {
        let config = NearshoreConfig::default();
        let coast = config.coastline.bounds().unwrap();
        assert_eq!((coast.low(), coast.high()), (f64::NEG_INFINITY, 15.0));
        assert_eq!(config.tether.max_iterations, Some(20));
        assert_eq!(config.tether.seed_bounds().unwrap(), None);
        assert_eq!(config.shallow.bounds().unwrap().low(), -15.0);
        let wet = config.coastline.seed_bounds().unwrap().unwrap();
        assert_eq!((wet.low(), wet.high()), (f64::NEG_INFINITY, 0.0));
        let dry = config.shallow.seed_bounds().unwrap().unwrap();
        assert_eq!((dry.low(), dry.high()), (0.0, f64::INFINITY));
    }

    #[test]
    fn test_config_from_json() {
        let config = NearshoreConfig::from_json_str(
            r#"{
                "shallow": { "low": -10.0 },
                "tether": { "high": 100.0, "max_iterations": 3 },
                "adjacency": "eight",
                "ruling": "auto",
                "padding": 2,
                "method": "cells"
            }"#,
        )
        .unwrap();
        assert_eq!(config.coastline, default_coastline());
        assert_eq!(config.shallow.low, Some(-10.0));
        assert_eq!(config.tether.max_iterations, Some(3));
        assert_eq!(config.adjacency, Adjacency::Eight);
        assert_eq!(config.ruling, RulingChoice::Auto);
        assert_eq!(config.padding, 2);
        assert_eq!(config.method, CoverageMethod::Cells);
    }

    #[test]
    fn test_config_rejects_inverted_band() {
        let err = NearshoreConfig::from_json_str(r#"{ "shallow": { "low": 5.0, "high": -5.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, RefineError::InvalidBounds { .. }));
        assert!(matches!(
            NearshoreConfig::from_json_str(r#"{ "coastline": { "seed_low": 1.0, "seed_high": 0.0 } }"#),
            Err(RefineError::InvalidBounds { .. })
        ));
        assert!(matches!(
            NearshoreConfig::from_json_str("{ not json"),
            Err(RefineError::Config(_))
        ));
    }

    #[test]
    fn test_run_selects_nearshore_band() {
        let grid = beach();
        let pipeline = NearshorePipeline::new(NearshoreConfig::default()).unwrap();
        let result = pipeline.run(&grid).unwrap();

        // columns with -15 <= z <= 15: z = -40 + 8c -> c in 4..=6 (z = -8, 0, 8)
        for r in 0..6 {
            for c in 0..10 {
                let z = grid.value(r, c).unwrap();
                let expected = (-15.0..=15.0).contains(&z);
                assert_eq!(result.nearshore.get(r, c), expected, "cell ({r}, {c})");
            }
        }
        assert!(result.nearshore.is_subset_of(&result.reexpanded.mask));
        assert!(result.nearshore.is_subset_of(&result.shallow.mask));
        assert_eq!(result.region.rasterize(), result.nearshore);
    }

    #[test]
    fn test_tether_cap_limits_inland_growth() {
        let grid = beach();
        let config = NearshoreConfig {
            coastline: BandConfig { high: Some(0.0), ..BandConfig::default() },
            tether: BandConfig { max_iterations: Some(2), ..BandConfig::default() },
            ..NearshoreConfig::default()
        };
        let pipeline = NearshorePipeline::new(config).unwrap();
        let coast = pipeline.coastline(&grid).unwrap();
        let tether = pipeline.tether(&grid, &coast.mask).unwrap();

        assert!(coast.mask.is_subset_of(&tether.mask));
        assert!(tether.limit_reached());
        assert_eq!(tether.rounds, 2);
        // coastline reaches column 5 (z = 0); two rounds add columns 6 and 7
        assert!(tether.mask.get(0, 7));
        assert!(!tether.mask.get(0, 8));
    }

    /// Ocean in the west, a beach, then hills. A low hollow sits behind the
    /// first ridge and a dry pond far inland, both within the narrow band.
    fn ridged_coast() -> Grid {
        let values = Array2::from_shape_fn((3, 40), |(_, c)| match c {
            0..=3 => -20.0,
            4 => 5.0,
            10 => 10.0,
            30 => 10.0,
            _ => 30.0,
        });
        Grid::new((0.0, 0.0), (1.0, 1.0), values).unwrap()
    }

    #[test]
    fn test_inland_hollows_need_a_wet_connection() {
        let grid = ridged_coast();
        let pipeline = NearshorePipeline::new(NearshoreConfig::default()).unwrap();
        let result = pipeline.run(&grid).unwrap();

        // the coastline pass stops at the first ridge
        assert_eq!(result.coastline.mask.count(), 3 * 5);
        assert!(!result.coastline.mask.get(0, 10));
        assert!(!result.coastline.mask.get(0, 30));

        // the tether reaches 20 cells past the beach, so only the near hollow
        // is picked up again by the re-expansion
        assert!(result.tether.limit_reached());
        assert!(result.tether.mask.get(0, 24));
        assert!(!result.tether.mask.get(0, 25));
        assert!(result.reexpanded.mask.get(1, 10));
        assert!(!result.reexpanded.mask.get(1, 30));
        assert_ne!(result.reexpanded.mask, result.coastline.mask);

        // the shallow pass never crosses into the -20 m ocean
        assert!(!result.shallow.mask.get(0, 3));
        for r in 0..3 {
            for c in 0..40 {
                assert_eq!(result.nearshore.get(r, c), c == 4 || c == 10, "cell ({r}, {c})");
            }
        }
    }

    #[test]
    fn test_self_seeded_bands_keep_isolated_cells() {
        let grid = ridged_coast();
        let unseeded = BandConfig { seed_high: None, ..default_coastline() };
        let config = NearshoreConfig { coastline: unseeded, ..NearshoreConfig::default() };
        let coast = NearshorePipeline::new(config).unwrap().coastline(&grid).unwrap();
        assert!(coast.mask.get(0, 30));
    }

    #[test]
    fn test_tether_seed_band_replaces_coastline() {
        let grid = ridged_coast();
        let config = NearshoreConfig {
            tether: BandConfig { seed_high: Some(0.0), max_iterations: Some(0), ..default_tether() },
            ..NearshoreConfig::default()
        };
        let pipeline = NearshorePipeline::new(config).unwrap();
        let coast = pipeline.coastline(&grid).unwrap();
        let tether = pipeline.tether(&grid, &coast.mask).unwrap();
        // zero rounds from the wet cells only: the beach is not included
        assert_eq!(tether.mask.count(), 3 * 4);
        assert!(!tether.mask.get(0, 4));
    }

    #[test]
    fn test_stages_are_reproducible() {
        let grid = beach();
        let pipeline = NearshorePipeline::new(NearshoreConfig::default()).unwrap();
        let a = pipeline.run(&grid).unwrap();
        let b = pipeline.run(&grid).unwrap();
        assert_eq!(a.nearshore, b.nearshore);
        assert_eq!(a.region, b.region);
    }

    #[test]
    fn test_auto_ruling_prefers_fewer_strips() {
        // a tall thin column: one strip per column vs six per row
        let mask = SelectionMask::from_array(Array2::from_shape_fn((6, 3), |(_, c)| c == 1));
        assert_eq!(RulingChoice::Auto.resolve(&mask), RulingAxis::Columns);
        let wide = SelectionMask::from_array(Array2::from_shape_fn((3, 6), |(r, _)| r == 1));
        assert_eq!(RulingChoice::Auto.resolve(&wide), RulingAxis::Rows);
        assert_eq!("auto".parse::<RulingChoice>().unwrap(), RulingChoice::Auto);
        assert_eq!("columns".parse::<RulingChoice>().unwrap(), RulingChoice::Columns);
    }

    #[test]
    fn test_run_source() {
        let grid = beach();
        let pipeline = NearshorePipeline::new(NearshoreConfig::default()).unwrap();
        let (loaded, result) = pipeline.run_source(&grid).unwrap();
        assert_eq!(loaded.dim(), (6, 10));
        // three shoreline columns plus the two lake cells
        assert_eq!(result.nearshore.count(), 6 * 3 + 2);
    }
}
