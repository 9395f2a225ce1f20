//! Glyph-to-grid aggregation and transfer application
//!
//! The renderer owns a worker pool and splits every output grid into disjoint runs of
//! rows. Each task owns its slice of the output outright, so no two tasks ever write the
//! same cell and no locking happens on the hot path.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregates::{Aggregates, FlatAggregates};
use crate::aggregator::Aggregator;
use crate::error::{RenderError, Result};
use crate::geometry::{AffineTransform, Rect};
use crate::glyph::Glyphset;
use crate::transfer::{Specialized, Transfer};

/// How per-cell work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Every cell on the calling thread, row by row.
    Serial,
    /// Row partitions on the renderer's worker pool.
    #[default]
    Parallel,
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,
    /// Worker threads for parallel mode.
    pub threads: usize,
    /// Rows handed to a worker as one task.
    pub rows_per_task: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Parallel,
            threads: num_cpus::get(),
            rows_per_task: 4,
        }
    }
}

impl RenderConfig {
    pub fn serial() -> Self {
        Self {
            mode: RenderMode::Serial,
            threads: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(RenderError::InvalidParameter(
                "render threads must be at least 1".to_string(),
            ));
        }
        if self.rows_per_task == 0 {
            return Err(RenderError::InvalidParameter(
                "rows_per_task must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs aggregation and transfer passes over screen-sized grids.
pub struct Renderer {
    config: RenderConfig,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.mode {
            RenderMode::Serial => None,
            RenderMode::Parallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .thread_name(|i| format!("ar-render-{i}"))
                    .build()
                    .map_err(|e| RenderError::InvalidParameter(e.to_string()))?,
            ),
        };
        info!(
            mode = ?config.mode,
            threads = config.threads,
            rows_per_task = config.rows_per_task,
            "Renderer ready"
        );
        Ok(Self { config, pool })
    }

    /// A renderer that never leaves the calling thread.
    pub fn serial() -> Self {
        Self {
            config: RenderConfig::serial(),
            pool: None,
        }
    }

    /// Folds every glyph touching each screen cell into a `width` x `height` grid.
    ///
    /// `view` maps absolute (glyph) space onto the screen; each cell's region is the
    /// unit square `[x, x+1) x [y, y+1)` carried back through its inverse.
    pub fn aggregate<V, A>(
        &self,
        glyphs: &dyn Glyphset<V>,
        aggregator: &dyn Aggregator<V, A>,
        view: &AffineTransform,
        width: usize,
        height: usize,
    ) -> Result<FlatAggregates<A>>
    where
        A: Clone + Send + Sync,
    {
        let started = Instant::now();
        let inverse = view.inverse()?;
        let mut grid = FlatAggregates::with_size(width, height, aggregator.identity());

        if glyphs.is_empty() {
            debug!(width, height, "Empty glyphset, nothing to aggregate");
            return Ok(grid);
        }

        self.fill(grid.values_mut(), width, (0, 0), |x, y| {
            let region = inverse.apply_rect(&Rect::new(x as f64, y as f64, 1.0, 1.0));
            let mut acc = aggregator.identity();
            for glyph in glyphs.intersects(&region) {
                aggregator.check(glyph.value())?;
                acc = aggregator.combine(&acc, glyph.value())?;
            }
            Ok(acc)
        })?;

        debug!(
            width,
            height,
            glyphs = glyphs.size(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Aggregation complete"
        );
        Ok(grid)
    }

    /// Specializes `transfer` against `aggregates` and applies it.
    pub fn transfer<In, Out>(
        &self,
        aggregates: &dyn Aggregates<In>,
        transfer: &dyn Transfer<In, Out>,
    ) -> Result<FlatAggregates<Out>>
    where
        Out: Clone + Send + Sync,
    {
        let started = Instant::now();
        let specialized = transfer.specialize(aggregates)?;
        let out = self.apply(aggregates, &specialized)?;
        debug!(
            width = out.width(),
            height = out.height(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Transfer complete"
        );
        Ok(out)
    }

    /// Applies an already specialized transfer. The output covers the input's region.
    pub fn apply<In, Out>(
        &self,
        aggregates: &dyn Aggregates<In>,
        specialized: &Specialized<'_, In, Out>,
    ) -> Result<FlatAggregates<Out>>
    where
        Out: Clone + Send + Sync,
    {
        match specialized {
            Specialized::ItemWise(item) => {
                let mut out = FlatAggregates::new(
                    aggregates.low_x(),
                    aggregates.low_y(),
                    aggregates.high_x(),
                    aggregates.high_y(),
                    item.empty_value(),
                );
                let width = out.width();
                let origin = (aggregates.low_x(), aggregates.low_y());
                self.fill(out.values_mut(), width, origin, |x, y| {
                    Ok(item.at(x, y, aggregates))
                })?;
                Ok(out)
            }
            Specialized::SetWise(set) => set.process(aggregates, self),
        }
    }

    /// Aggregation followed by a transfer pass.
    pub fn reduce_transfer<V, A, Out>(
        &self,
        glyphs: &dyn Glyphset<V>,
        aggregator: &dyn Aggregator<V, A>,
        transfer: &dyn Transfer<A, Out>,
        view: &AffineTransform,
        width: usize,
        height: usize,
    ) -> Result<FlatAggregates<Out>>
    where
        A: Clone + Send + Sync,
        Out: Clone + Send + Sync,
    {
        let aggregates = self.aggregate(glyphs, aggregator, view, width, height)?;
        self.transfer(&aggregates, transfer)
    }

    /// Writes `cell(x, y)` into every slot of a row-major buffer whose rows are `width`
    /// long and whose first cell sits at `origin`.
    fn fill<T, F>(&self, values: &mut [T], width: usize, origin: (i32, i32), cell: F) -> Result<()>
    where
        T: Send,
        F: Fn(i32, i32) -> Result<T> + Sync,
    {
        if width == 0 || values.is_empty() {
            return Ok(());
        }
        let chunk = width * self.config.rows_per_task;
        let fill_chunk = |(index, rows): (usize, &mut [T])| -> Result<()> {
            let first = index * chunk;
            for (offset, slot) in rows.iter_mut().enumerate() {
                let i = first + offset;
                let x = origin.0 + (i % width) as i32;
                let y = origin.1 + (i / width) as i32;
                *slot = cell(x, y)?;
            }
            Ok(())
        };

        match &self.pool {
            Some(pool) => pool.install(|| {
                values
                    .par_chunks_mut(chunk)
                    .enumerate()
                    .try_for_each(fill_chunk)
            }),
            None => values.chunks_mut(chunk).enumerate().try_for_each(fill_chunk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Count, Solid, Sum};
    use crate::color::Color;
    use crate::geometry::Point;
    use crate::glyph::{Glyph, GlyphList};
    use crate::spatial::{QuadTree, QuadTreeConfig};
    use crate::transfer::general::Echo;

    fn parallel(threads: usize, rows_per_task: usize) -> Renderer {
        Renderer::new(RenderConfig {
            mode: RenderMode::Parallel,
            threads,
            rows_per_task,
        })
        .unwrap()
    }

    fn unit_squares() -> Vec<Glyph<i32>> {
        vec![
            Glyph::new(Rect::new(0.0, 0.0, 1.0, 1.0), 1),
            Glyph::new(Rect::new(0.0, 0.0, 2.0, 2.0), 2),
            Glyph::new(Rect::new(3.0, 1.0, 1.0, 1.0), 3),
            Glyph::new(Rect::point(Point::new(1.5, 3.5)), 4),
        ]
    }

    #[test]
    fn test_count_with_identity_view() {
        let glyphs: GlyphList<i32> = unit_squares().into_iter().collect();
        let grid = Renderer::serial()
            .aggregate(&glyphs, &Count, &AffineTransform::identity(), 4, 4)
            .unwrap();
        assert_eq!(
            grid.to_rows(),
            vec![
                vec![2, 1, 0, 0],
                vec![1, 1, 0, 1],
                vec![0, 0, 0, 0],
                vec![0, 1, 0, 0],
            ]
        );
    }

    #[test]
    fn test_scaled_view_maps_cells_back_to_absolute_space() {
        let glyphs: GlyphList<i32> = unit_squares().into_iter().collect();
        // Two screen cells per absolute unit.
        let view = AffineTransform::scale_translate(2.0, 2.0, 0.0, 0.0);
        let grid = Renderer::serial()
            .aggregate(&glyphs, &Sum, &view, 8, 8)
            .unwrap();
        assert_eq!(grid.get(0, 0), 3.0);
        assert_eq!(grid.get(3, 3), 2.0);
        assert_eq!(grid.get(6, 2), 3.0);
        assert_eq!(grid.get(3, 7), 4.0);
        assert_eq!(grid.get(5, 5), 0.0);
    }

    #[test]
    fn test_parallel_matches_serial_and_is_order_independent() {
        let mut glyphs = Vec::new();
        for i in 0..200 {
            let x = (i * 37 % 53) as f64 * 0.7;
            let y = (i * 11 % 41) as f64 * 0.9;
            glyphs.push(Glyph::new(Rect::new(x, y, 1.5, 0.5), i));
        }
        let forward: GlyphList<i32> = glyphs.iter().cloned().collect();
        let backward: GlyphList<i32> = glyphs.iter().rev().cloned().collect();
        let tree = QuadTree::build(QuadTreeConfig::default(), glyphs.clone()).unwrap();

        let bounds = forward.bounds().unwrap();
        let view = AffineTransform::zoom_fit(&bounds, 30, 20).unwrap();
        let serial = Renderer::serial()
            .aggregate(&forward, &Count, &view, 30, 20)
            .unwrap();

        for renderer in [parallel(4, 1), parallel(3, 7)] {
            assert_eq!(renderer.aggregate(&backward, &Count, &view, 30, 20).unwrap(), serial);
            assert_eq!(renderer.aggregate(&tree, &Count, &view, 30, 20).unwrap(), serial);
        }
        assert!(serial.to_rows().iter().flatten().any(|c| *c > 1));
    }

    struct EvenOnly;

    impl Aggregator<i32, i64> for EvenOnly {
        fn identity(&self) -> i64 {
            0
        }

        fn combine(&self, current: &i64, _value: &i32) -> Result<i64> {
            Ok(current + 1)
        }

        fn rollup(&self, sources: &[i64]) -> i64 {
            sources.iter().sum()
        }

        fn check(&self, value: &i32) -> Result<()> {
            if value % 2 == 0 {
                Ok(())
            } else {
                Err(RenderError::TypeMismatch {
                    context: "even-only aggregator",
                    expected: "even".to_string(),
                    found: value.to_string(),
                })
            }
        }
    }

    #[test]
    fn test_incompatible_value_fails_whole_render() {
        let glyphs: GlyphList<i32> = unit_squares().into_iter().collect();
        for renderer in [Renderer::serial(), parallel(2, 1)] {
            let err = renderer
                .aggregate(&glyphs, &EvenOnly, &AffineTransform::identity(), 4, 4)
                .unwrap_err();
            assert!(matches!(err, RenderError::TypeMismatch { .. }));
        }
    }

    #[test]
    fn test_non_invertible_view_is_reported() {
        let glyphs: GlyphList<i32> = unit_squares().into_iter().collect();
        let view = AffineTransform::scale_translate(0.0, 1.0, 0.0, 0.0);
        assert!(matches!(
            Renderer::serial().aggregate(&glyphs, &Count, &view, 4, 4),
            Err(RenderError::NonInvertibleTransform(_))
        ));
    }

    #[test]
    fn test_empty_glyphset_yields_identity_grid() {
        let glyphs = GlyphList::<i32>::new();
        let solid = Solid { color: Color::RED };
        let grid = parallel(2, 2)
            .aggregate(&glyphs, &solid, &AffineTransform::identity(), 3, 2)
            .unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert!(grid.to_rows().iter().flatten().all(|c| *c == Color::CLEAR));
    }

    #[test]
    fn test_transfer_preserves_region() {
        let mut grid = FlatAggregates::new(-2, 3, 1, 5, 0i64);
        grid.set(-2, 3, 4).unwrap();
        grid.set(0, 4, 9).unwrap();
        let out = parallel(2, 1)
            .transfer(&grid, &Echo::new(0i64))
            .unwrap();
        assert_eq!(out, grid);
    }

    #[test]
    fn test_reduce_transfer_composes_passes() {
        let glyphs: GlyphList<i32> = unit_squares().into_iter().collect();
        let out = Renderer::serial()
            .reduce_transfer(
                &glyphs,
                &Count,
                &Echo::new(0i64),
                &AffineTransform::identity(),
                4,
                4,
            )
            .unwrap();
        assert_eq!(out.get(0, 0), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RenderConfig {
            threads: 0,
            ..RenderConfig::default()
        };
        assert!(Renderer::new(config).is_err());
        let config = RenderConfig {
            rows_per_task: 0,
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
