//! Configuration management for the demo renderer.
//!
//! Handles loading and validating the TOML configuration file and folding command-line
//! overrides into it.

use std::path::Path;

use abstract_rendering::{
    AggregatorSpec, Color, QuadTreeConfig, RenderConfig, RenderMode, TransferSpec,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::CliArgs;
use crate::dataset::DatasetSettings;

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Output grid and worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output grid width in cells
    pub width: usize,
    /// Output grid height in cells
    pub height: usize,
    pub mode: RenderMode,
    /// Worker threads; defaults to the number of CPUs
    pub threads: usize,
    /// Grid rows handed to a worker per task
    pub rows_per_task: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let engine = RenderConfig::default();
        Self {
            width: 72,
            height: 36,
            mode: engine.mode,
            threads: engine.threads,
            rows_per_task: engine.rows_per_task,
        }
    }
}

/// Glyph index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Query through a quadtree rather than a linear scan
    pub enabled: bool,
    pub tree: QuadTreeConfig,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tree: QuadTreeConfig::default(),
        }
    }
}

/// Which aggregator and transfer to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub aggregator: AggregatorSpec,
    pub transfer: TransferSpec,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            aggregator: AggregatorSpec::Count,
            transfer: TransferSpec::Interpolate {
                low: Color::PINK,
                high: Color::RED,
            },
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration there and returns it.
    /// The flag is true when the file was created. Loading usually runs before logging
    /// is initialized, so callers report the creation themselves.
    pub fn load_from_file(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok((config, false))
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_content)
                .with_context(|| format!("writing {}", path.display()))?;
            Ok((default_config, true))
        }
    }

    /// Folds command-line overrides into the file configuration.
    pub fn apply_overrides(&mut self, args: &CliArgs) -> Result<()> {
        if let Some(width) = args.width {
            self.render.width = width;
        }
        if let Some(height) = args.height {
            self.render.height = height;
        }
        if let Some(threads) = args.threads {
            self.render.threads = threads;
        }
        if args.serial {
            self.render.mode = RenderMode::Serial;
        }
        if args.no_index {
            self.index.enabled = false;
        }
        if let Some(name) = &args.aggregator {
            self.pipeline.aggregator = name.parse()?;
        }
        if let Some(name) = &args.transfer {
            self.pipeline.transfer = name.parse()?;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        Ok(())
    }

    pub fn to_render_config(&self) -> RenderConfig {
        RenderConfig {
            mode: self.render.mode,
            threads: self.render.threads,
            rows_per_task: self.render.rows_per_task,
        }
    }

    /// Checks the configuration for consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.render.width == 0 || self.render.height == 0 {
            return Err(format!(
                "Render size must be non-zero, got {}x{}",
                self.render.width, self.render.height
            ));
        }
        self.to_render_config()
            .validate()
            .map_err(|e| e.to_string())?;
        self.index.tree.validate().map_err(|e| e.to_string())?;
        self.dataset.validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
