//! Command-line front end for the abstract rendering core
//!
//! Generates a synthetic glyph dataset, indexes it, renders it through the configured
//! aggregator and transfer, then prints an ASCII raster and a JSON summary.

mod cli;
mod config;
mod dataset;
mod logging;
mod output;

use std::time::Instant;

use abstract_rendering::spatial::NodeStats;
use abstract_rendering::{
    AffineTransform, GlyphList, Glyphset, Pipeline, QuadTree, RenderCoordinator, Renderer,
    Value,
};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{error, info};

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::output::{ascii_raster, grid_stats, RenderSummary};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let (mut config, created_config) = AppConfig::load_from_file(&args.config)?;
    config.apply_overrides(&args)?;
    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

    logging::setup_logging(&config.logging)?;
    if created_config {
        info!("Created default configuration file: {}", args.config.display());
    }

    if let Err(e) = run(&config, &args) {
        error!("Render failed: {e:#}");
        return Err(e);
    }
    Ok(())
}

fn run(config: &AppConfig, args: &CliArgs) -> Result<()> {
    let started = Instant::now();
    let glyphs = config.dataset.generate();
    let value_kind = config.dataset.value_kind();
    info!(
        dataset = ?config.dataset.kind,
        glyphs = glyphs.len(),
        "Generated dataset"
    );

    let (glyphset, index) = if config.index.enabled {
        let tree = QuadTree::build(config.index.tree.clone(), glyphs)
            .context("building quadtree index")?;
        let stats = tree.stats();
        info!(
            leaves = stats.leaf_nodes,
            depth = stats.max_depth,
            max_leaf_load = stats.max_leaf_load,
            "Indexed glyphs"
        );
        (Box::new(tree) as Box<dyn Glyphset<Value>>, Some(stats))
    } else {
        let list: GlyphList<Value> = glyphs.into_iter().collect();
        (Box::new(list) as Box<dyn Glyphset<Value>>, None::<NodeStats>)
    };

    let pipeline = Pipeline::new(
        value_kind,
        config.pipeline.aggregator.clone(),
        config.pipeline.transfer.clone(),
    )?;
    let renderer = Renderer::new(config.to_render_config())?;

    let (width, height) = (config.render.width, config.render.height);
    let bounds = glyphset
        .bounds()
        .ok_or_else(|| anyhow!("dataset produced no glyphs"))?;
    let view = AffineTransform::zoom_fit(&bounds, width, height)?;

    let coordinator = RenderCoordinator::new();
    let image = coordinator
        .run(|| pipeline.run(&renderer, &*glyphset, &view, width, height))?
        .ok_or_else(|| anyhow!("render was superseded before it could be published"))?;

    let (non_empty_cells, range) = grid_stats(&image);
    let summary = RenderSummary {
        dataset: config.dataset.kind,
        glyphs: glyphset.size(),
        width,
        height,
        index,
        aggregator: config.pipeline.aggregator.name(),
        transfer: config.pipeline.transfer.name(),
        output_kind: pipeline.output_kind(),
        non_empty_cells,
        min: range.map(|r| r.min),
        max: range.map(|r| r.max),
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
    };

    if !args.summary_only {
        print!("{}", ascii_raster(&image));
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!(
        elapsed_ms = summary.elapsed_ms,
        non_empty_cells, "Render complete"
    );
    Ok(())
}
