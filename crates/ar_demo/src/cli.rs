//! Command-line argument parsing
//!
//! Every flag here overrides the matching value from the configuration file.

use clap::Parser;
use std::path::PathBuf;

/// Render a synthetic glyph dataset through an aggregate-then-transfer pipeline.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Configuration file path
    ///
    /// If the file doesn't exist, a default configuration will be written there.
    #[arg(short, long, default_value = "ar-demo.toml")]
    pub config: PathBuf,

    /// Output grid width in cells
    #[arg(long)]
    pub width: Option<usize>,

    /// Output grid height in cells
    #[arg(long)]
    pub height: Option<usize>,

    /// Aggregator name (count, sum, first, last, solid)
    #[arg(short, long)]
    pub aggregator: Option<String>,

    /// Transfer name (echo, interpolate, present, threshold, iso_contour, contours,
    /// spaced_contours)
    #[arg(short, long)]
    pub transfer: Option<String>,

    /// Render on the calling thread only
    #[arg(long)]
    pub serial: bool,

    /// Worker threads for parallel rendering
    #[arg(long)]
    pub threads: Option<usize>,

    /// Query glyphs by linear scan instead of the quadtree index
    #[arg(long)]
    pub no_index: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Print only the JSON summary, not the raster
    #[arg(long)]
    pub summary_only: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from("ar-demo.toml"),
            width: None,
            height: None,
            aggregator: None,
            transfer: None,
            serial: false,
            threads: None,
            no_index: false,
            log_level: None,
            json_logs: false,
            summary_only: false,
        }
    }
}
