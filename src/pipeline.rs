//! End-to-end orchestration: resolve coordinates, acquire tiles,
//! reconstruct the composite, then hand it to an optional analyzer.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use crate::cli::{AcquireConfig, AssembleConfig, RunConfig};
use crate::config::FetchConfig;
use crate::coord::{Axis, BoundingBox, GeoPoint};
use crate::extract::FirstTwoIntegers;
use crate::fetch::TileFetcher;
use crate::mosaic::GridReconstructor;
use crate::query::build_query_url;

/// Downstream consumer of a finished composite, e.g. the detection or
/// segmentation layer. The pipeline checks success truthiness and
/// nothing else.
pub trait Analyzer {
    fn analyze(&self, composite: &Path) -> bool;
}

pub fn run_acquire(config: &AcquireConfig) -> Result<()> {
    let fetch_config = resolve_fetch_config(config)?;
    match acquire(&fetch_config, config)? {
        Some(manifest) => {
            println!(
                "{} Manifest ready: {}",
                "ℹ".blue().bold(),
                manifest.display()
            );
            Ok(())
        }
        None => bail!("acquisition produced no usable tiles"),
    }
}

pub fn run_assemble(config: &AssembleConfig) -> Result<()> {
    let mut reconstructor = GridReconstructor::new(config.output.clone());
    reconstructor.load(&config.manifest)?;
    let composite = reconstructor.assemble()?;
    println!(
        "{} Composite saved: {}",
        "✔".green().bold(),
        composite.display()
    );
    Ok(())
}

pub fn run_pipeline(config: &RunConfig, analyzer: Option<&dyn Analyzer>) -> Result<()> {
    let fetch_config = resolve_fetch_config(&config.acquire)?;
    let Some(manifest) = acquire(&fetch_config, &config.acquire)? else {
        bail!("acquisition produced no usable tiles");
    };
    let mut reconstructor = GridReconstructor::new(config.output.clone());
    reconstructor.load(&manifest)?;
    let composite = reconstructor.assemble()?;
    println!(
        "{} Composite saved: {}",
        "✔".green().bold(),
        composite.display()
    );
    hand_off(analyzer, &composite);
    Ok(())
}

fn resolve_fetch_config(config: &AcquireConfig) -> Result<FetchConfig> {
    let mut fetch_config = match &config.config {
        Some(path) => {
            let loaded = FetchConfig::load_from_path(path)?;
            println!(
                "{} Loaded fetch config: {}",
                "ℹ".blue().bold(),
                path.display()
            );
            loaded
        }
        None => FetchConfig::default(),
    };
    if let Some(dir) = &config.base_dir {
        fetch_config = fetch_config.with_base_dir(dir.clone());
    }
    Ok(fetch_config)
}

fn acquire(fetch_config: &FetchConfig, config: &AcquireConfig) -> Result<Option<PathBuf>> {
    let longitude = config.lon.to_decimal(Axis::Longitude)?;
    let latitude = config.lat.to_decimal(Axis::Latitude)?;
    let bbox = BoundingBox::around(GeoPoint {
        longitude,
        latitude,
    });
    println!(
        "{} Resolved point ({latitude:.6}, {longitude:.6})",
        "ℹ".blue().bold()
    );
    println!(
        "  {} Query bbox X:[{:.6}..{:.6}] Y:[{:.6}..{:.6}]",
        "◎".blue(),
        bbox.min_x,
        bbox.max_x,
        bbox.min_y,
        bbox.max_y
    );
    let url = build_query_url(&bbox);
    let fetcher = TileFetcher::new(fetch_config, &FirstTwoIntegers);
    fetcher.fetch(&url, &config.subject)
}

fn hand_off(analyzer: Option<&dyn Analyzer>, composite: &Path) {
    let Some(analyzer) = analyzer else {
        return;
    };
    if analyzer.analyze(composite) {
        println!("{} Analysis complete", "✔".green().bold());
    } else {
        println!("{} Analysis reported failure", "⚠".yellow().bold());
    }
}
