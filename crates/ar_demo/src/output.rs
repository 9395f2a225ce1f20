//! Terminal output: an ASCII raster of the rendered grid and a JSON run summary.

use abstract_rendering::aggregates::values;
use abstract_rendering::spatial::NodeStats;
use abstract_rendering::{Aggregates, FlatAggregates, Stats, Value, ValueKind};
use serde::Serialize;

use crate::dataset::DatasetKind;

/// Light to dark.
const RAMP: &[u8] = b" .:-=+*#%@";

/// What one run did, printed as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub dataset: DatasetKind,
    pub glyphs: usize,
    pub width: usize,
    pub height: usize,
    pub index: Option<NodeStats>,
    pub aggregator: &'static str,
    pub transfer: &'static str,
    pub output_kind: ValueKind,
    pub non_empty_cells: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub elapsed_ms: f64,
}

/// Count of cells holding something other than the grid default, plus the numeric range
/// of those cells when the grid is numeric.
pub fn grid_stats(grid: &FlatAggregates<Value>) -> (usize, Option<Stats<f64>>) {
    let default = grid.default_value();
    let occupied: Vec<Value> = values::<Value, _>(grid).filter(|v| *v != default).collect();
    let range = Stats::of(occupied.iter().filter_map(Value::as_f64));
    (occupied.len(), range)
}

fn shade(darkness: f64) -> char {
    let top = (RAMP.len() - 1) as f64;
    let index = (darkness.clamp(0.0, 1.0) * top).round() as usize;
    RAMP[index] as char
}

/// One character per cell, one line per grid row.
pub fn ascii_raster(grid: &FlatAggregates<Value>) -> String {
    let default = grid.default_value();
    let (_, range) = grid_stats(grid);
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());

    for y in grid.low_y()..grid.high_y() {
        for x in grid.low_x()..grid.high_x() {
            let value = grid.get(x, y);
            let cell = match value {
                _ if value == default => ' ',
                Value::Color(color) if color.a == 0 => ' ',
                Value::Color(color) => shade(1.0 - color.luminance()),
                Value::Bool(set) => {
                    if set {
                        '#'
                    } else {
                        ' '
                    }
                }
                Value::Int(_) | Value::Float(_) => {
                    let v = value.as_f64().unwrap_or(0.0);
                    match range {
                        Some(r) if r.max > r.min => shade((v - r.min) / (r.max - r.min)),
                        _ => shade(1.0),
                    }
                }
            };
            out.push(cell);
        }
        out.push('\n');
    }
    out
}
