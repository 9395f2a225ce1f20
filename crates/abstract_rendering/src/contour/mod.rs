//! Iso-contour transfers
//!
//! Each transfer thresholds a numeric grid at one or more levels, traces the boundary of
//! every above-threshold region with marching squares and keeps the result as contour
//! glyphs ordered from the lowest level to the highest. Applied as a transfer, a cell
//! takes the value of the highest contour enclosing its center.

pub mod marching;

use tracing::{debug, trace};

use crate::aggregates::{values, Aggregates, PadAggregates};
use crate::error::{RenderError, Result};
use crate::geometry::{Path, Shape};
use crate::glyph::Glyph;
use crate::numeric::{Numeric, Stats};
use crate::transfer::{ItemWise, Specialized, Transfer};

/// Upper bound on the levels one spaced-contour pass may produce.
pub const MAX_LEVELS: usize = 4096;

/// Traces the regions of `aggregates` strictly above `threshold`.
///
/// The thresholded grid is padded with a border of below-threshold cells, so regions
/// touching the edge still close whatever the threshold. The returned glyph is valued at
/// the smallest value above `threshold`.
pub fn trace_contour<N: Numeric>(
    aggregates: &dyn Aggregates<N>,
    threshold: N,
) -> Result<Glyph<N>> {
    let above = marching::above_threshold(aggregates, threshold);
    let padded = PadAggregates::new(&above, false);
    let mut types = marching::classify(&padded);
    let path = marching::assemble(&mut types)?;
    trace!(
        threshold = ?threshold,
        rings = path.rings().len(),
        "Traced iso contour"
    );
    Ok(Glyph::new(path, threshold.min_incr()))
}

/// Per-row crossings of a path's edges, answering even-odd containment for grid cell
/// centers with a binary search instead of a walk over every edge.
#[derive(Debug, Clone, Default)]
pub struct ContourIndex {
    first_row: i32,
    rows: Vec<Vec<f64>>,
}

impl ContourIndex {
    pub fn new(path: &Path) -> Self {
        let Some(bounds) = path.bounds() else {
            return Self::default();
        };
        let first_row = (bounds.min_y - 0.5).floor() as i32;
        let last_row = (bounds.max_y - 0.5).ceil() as i32;
        let mut rows = vec![Vec::new(); (last_row - first_row + 1).max(0) as usize];

        for (a, b) in path.edges() {
            let low = (a.y.min(b.y) - 0.5).floor() as i32;
            let high = (a.y.max(b.y) - 0.5).ceil() as i32;
            for row in low.max(first_row)..=high.min(last_row) {
                let py = row as f64 + 0.5;
                if (a.y > py) != (b.y > py) {
                    let cross_x = a.x + (py - a.y) * (b.x - a.x) / (b.y - a.y);
                    rows[(row - first_row) as usize].push(cross_x);
                }
            }
        }
        for row in &mut rows {
            row.sort_by(f64::total_cmp);
        }
        Self { first_row, rows }
    }

    /// Whether the center of grid cell `(x, y)` lies inside the path.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let row = y - self.first_row;
        if row < 0 || row as usize >= self.rows.len() {
            return false;
        }
        let crossings = &self.rows[row as usize];
        let px = x as f64 + 0.5;
        let left_of_or_at = crossings.partition_point(|c| *c <= px);
        (crossings.len() - left_of_or_at) % 2 == 1
    }
}

/// Contours ordered from lowest to highest level, with their lookup indexes.
#[derive(Debug, Clone)]
pub struct ContourSet<N> {
    contours: Vec<Glyph<N>>,
    indexes: Vec<ContourIndex>,
    empty: N,
}

impl<N: Numeric> ContourSet<N> {
    fn new(contours: Vec<Glyph<N>>, empty: N) -> Self {
        let indexes = contours
            .iter()
            .map(|c| match c.shape() {
                Shape::Path(path) => ContourIndex::new(path),
                Shape::Rect(_) => ContourIndex::default(),
            })
            .collect();
        Self {
            contours,
            indexes,
            empty,
        }
    }

    /// Contour glyphs, lowest level first.
    pub fn contours(&self) -> &[Glyph<N>] {
        &self.contours
    }

    pub fn levels(&self) -> Vec<N> {
        self.contours.iter().map(|c| *c.value()).collect()
    }

    /// Value of the highest contour enclosing the center of cell `(x, y)`.
    pub fn value_at(&self, x: i32, y: i32) -> N {
        self.contours
            .iter()
            .zip(&self.indexes)
            .rev()
            .find(|(_, index)| index.contains(x, y))
            .map(|(contour, _)| *contour.value())
            .unwrap_or(self.empty)
    }
}

impl<N: Numeric> ItemWise<N, N> for ContourSet<N> {
    fn empty_value(&self) -> N {
        self.empty
    }

    fn at(&self, x: i32, y: i32, _aggregates: &dyn Aggregates<N>) -> N {
        self.value_at(x, y)
    }
}

/// One contour at `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoContour<N> {
    pub threshold: N,
    pub empty: N,
}

impl<N: Numeric> IsoContour<N> {
    pub fn new(threshold: N, empty: N) -> Self {
        Self { threshold, empty }
    }

    pub fn contour_set(&self, aggregates: &dyn Aggregates<N>) -> Result<ContourSet<N>> {
        let contour = trace_contour(aggregates, self.threshold)?;
        Ok(ContourSet::new(vec![contour], self.empty))
    }
}

impl<N: Numeric> Transfer<N, N> for IsoContour<N> {
    fn empty_value(&self) -> N {
        self.empty
    }

    fn specialize(&self, aggregates: &dyn Aggregates<N>) -> Result<Specialized<'_, N, N>> {
        Ok(Specialized::item_wise(self.contour_set(aggregates)?))
    }
}

/// Contours every `spacing` units, starting at `floor` (or the grid minimum) and
/// continuing until a level reaches the grid maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacedContours<N> {
    pub spacing: f64,
    pub floor: Option<N>,
    pub empty: N,
}

impl<N: Numeric> SpacedContours<N> {
    pub fn new(spacing: f64, floor: Option<N>, empty: N) -> Self {
        Self {
            spacing,
            floor,
            empty,
        }
    }

    pub fn contour_set(&self, aggregates: &dyn Aggregates<N>) -> Result<ContourSet<N>> {
        if !(self.spacing > 0.0 && self.spacing.is_finite()) {
            return Err(RenderError::InvalidParameter(format!(
                "contour spacing must be positive, got {}",
                self.spacing
            )));
        }
        let Some(stats) = Stats::of(values::<N, _>(aggregates)) else {
            return Ok(ContourSet::new(Vec::new(), self.empty));
        };
        let bottom = self.floor.unwrap_or(stats.min);

        let mut contours = Vec::new();
        let mut i = 0usize;
        loop {
            let threshold = bottom.add_f64(i as f64 * self.spacing);
            contours.push(trace_contour(aggregates, threshold)?);
            i += 1;
            if threshold.to_f64() >= stats.max.to_f64() {
                break;
            }
            if i >= MAX_LEVELS {
                return Err(RenderError::InvalidParameter(format!(
                    "spacing {} yields more than {MAX_LEVELS} contour levels",
                    self.spacing
                )));
            }
        }
        debug!(levels = contours.len(), spacing = self.spacing, "Built spaced contours");
        Ok(ContourSet::new(contours, self.empty))
    }
}

impl<N: Numeric> Transfer<N, N> for SpacedContours<N> {
    fn empty_value(&self) -> N {
        self.empty
    }

    fn specialize(&self, aggregates: &dyn Aggregates<N>) -> Result<Specialized<'_, N, N>> {
        Ok(Specialized::item_wise(self.contour_set(aggregates)?))
    }
}

/// `n` contours evenly spaced over `[min, max)` of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NContours<N> {
    pub n: usize,
    pub empty: N,
}

impl<N: Numeric> NContours<N> {
    pub fn new(n: usize, empty: N) -> Self {
        Self { n, empty }
    }

    /// Thresholds `min + i * (max - min) / n` for `i` in `0..n`.
    pub fn levels(&self, stats: &Stats<N>) -> Vec<N> {
        let step = (stats.max.to_f64() - stats.min.to_f64()) / self.n as f64;
        (0..self.n)
            .map(|i| stats.min.add_f64(step * i as f64))
            .collect()
    }

    pub fn contour_set(&self, aggregates: &dyn Aggregates<N>) -> Result<ContourSet<N>> {
        let Some(stats) = Stats::of(values::<N, _>(aggregates)) else {
            return Ok(ContourSet::new(Vec::new(), self.empty));
        };
        let contours = self
            .levels(&stats)
            .into_iter()
            .map(|threshold| trace_contour(aggregates, threshold))
            .collect::<Result<Vec<_>>>()?;
        debug!(levels = contours.len(), "Built evenly spaced contours");
        Ok(ContourSet::new(contours, self.empty))
    }
}

impl<N: Numeric> Transfer<N, N> for NContours<N> {
    fn empty_value(&self) -> N {
        self.empty
    }

    fn specialize(&self, aggregates: &dyn Aggregates<N>) -> Result<Specialized<'_, N, N>> {
        Ok(Specialized::item_wise(self.contour_set(aggregates)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::FlatAggregates;
    use crate::geometry::Point;
    use crate::renderer::Renderer;

    /// Highest enclosing contour found by testing every edge of every path.
    fn value_at_linear<N: Numeric>(set: &ContourSet<N>, x: i32, y: i32) -> N {
        let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
        set.contours
            .iter()
            .rev()
            .find(|c| c.shape().contains(center))
            .map(|c| *c.value())
            .unwrap_or(set.empty)
    }

    fn block_grid() -> FlatAggregates<i64> {
        FlatAggregates::from_rows(
            vec![
                vec![0, 0, 0, 0],
                vec![0, 5, 5, 0],
                vec![0, 5, 5, 0],
                vec![0, 0, 0, 0],
            ],
            0,
        )
    }

    #[test]
    fn test_block_yields_one_closed_contour() {
        let grid = block_grid();
        let set = IsoContour::new(3i64, 0).contour_set(&grid).unwrap();
        assert_eq!(set.levels(), vec![4]);
        let Shape::Path(path) = set.contours()[0].shape() else {
            panic!("contours are paths");
        };
        assert_eq!(path.rings().len(), 1);
        assert_eq!(path.rings()[0].len(), 8);

        let out = Renderer::serial()
            .transfer(&grid, &IsoContour::new(3i64, 0))
            .unwrap();
        assert_eq!(
            out.to_rows(),
            vec![
                vec![0, 0, 0, 0],
                vec![0, 4, 4, 0],
                vec![0, 4, 4, 0],
                vec![0, 0, 0, 0],
            ]
        );
    }

    #[test]
    fn test_rectangle_contour_contains_exactly_the_region() {
        let mut grid = FlatAggregates::new(-3, 2, 9, 10, 0.0f64);
        for y in 4..8 {
            for x in -1..6 {
                grid.set(x, y, 2.5).unwrap();
            }
        }
        let set = IsoContour::new(1.0, 0.0).contour_set(&grid).unwrap();
        assert_eq!(set.contours().len(), 1);
        let contour = &set.contours()[0];
        for (x, y) in crate::aggregates::cells::<f64, _>(&grid) {
            let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let above = grid.get(x, y) > 1.0;
            assert_eq!(contour.shape().contains(center), above, "cell ({x}, {y})");
            assert_eq!(set.value_at(x, y) > 0.0, above, "cell ({x}, {y})");
        }
    }

    #[test]
    fn test_region_touching_edge_is_closed_by_padding() {
        let grid = FlatAggregates::from_rows(vec![vec![9, 9, 0], vec![9, 0, 0]], 0);
        let out = Renderer::serial()
            .transfer(&grid, &IsoContour::new(4i32, 0))
            .unwrap();
        assert_eq!(out.to_rows(), vec![vec![5, 5, 0], vec![5, 0, 0]]);
    }

    #[test]
    fn test_hole_is_excluded_under_even_odd() {
        let grid = FlatAggregates::from_rows(
            vec![
                vec![7, 7, 7, 7, 7],
                vec![7, 0, 0, 0, 7],
                vec![7, 0, 0, 0, 7],
                vec![7, 7, 7, 7, 7],
            ],
            0,
        );
        let set = IsoContour::new(1i64, 0).contour_set(&grid).unwrap();
        let Shape::Path(path) = set.contours()[0].shape() else {
            panic!("contours are paths");
        };
        assert_eq!(path.rings().len(), 2);
        assert_eq!(set.value_at(0, 0), 2);
        assert_eq!(set.value_at(2, 1), 0);
        assert_eq!(set.value_at(4, 3), 2);
    }

    #[test]
    fn test_threshold_below_empty_still_closes_at_the_border() {
        let grid = FlatAggregates::from_rows(vec![vec![5i64, 5], vec![5, 5]], 0);
        let set = IsoContour::new(-3i64, 0).contour_set(&grid).unwrap();
        assert_eq!(set.levels(), vec![-2]);
        let Shape::Path(path) = set.contours()[0].shape() else {
            panic!("contours are paths");
        };
        assert_eq!(path.rings().len(), 1);
        for (x, y) in crate::aggregates::cells::<i64, _>(&grid) {
            assert_eq!(set.value_at(x, y), -2, "cell ({x}, {y})");
        }
        assert_eq!(set.value_at(-1, 0), 0);
        assert_eq!(set.value_at(2, 1), 0);
    }

    #[test]
    fn test_n_contours_over_negative_data() {
        let grid = FlatAggregates::from_rows(vec![vec![-4.0, 0.0], vec![0.0, 3.0]], 0.0);
        let transfer = NContours::new(2, 0.0f64);
        let set = transfer.contour_set(&grid).unwrap();
        let levels = set.levels();
        assert_eq!(levels.len(), 2);
        assert!(levels[0] > -4.0 && levels[0] < -3.9);
        assert!(levels[1] > -0.5 && levels[1] < -0.4);

        let out = Renderer::serial().transfer(&grid, &transfer).unwrap();
        assert_eq!(
            out.to_rows(),
            vec![vec![0.0, levels[1]], vec![levels[1], levels[1]]]
        );
    }

    #[test]
    fn test_n_contours_levels_evenly_spaced() {
        let stats = Stats { min: 0.0f64, max: 10.0 };
        let levels = NContours::new(5, 0.0).levels(&stats);
        assert_eq!(levels, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert!(NContours::new(0, 0.0).levels(&stats).is_empty());

        let int_levels = NContours::new(4, 0i64).levels(&Stats { min: 0, max: 10 });
        assert_eq!(int_levels, vec![0, 2, 5, 7]);
    }

    #[test]
    fn test_n_contours_nested_levels() {
        let grid = FlatAggregates::from_rows(
            vec![
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 4.0, 4.0, 4.0, 0.0],
                vec![0.0, 4.0, 10.0, 4.0, 0.0],
                vec![0.0, 4.0, 4.0, 4.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
            ],
            0.0,
        );
        let transfer = NContours::new(2, 0.0f64);
        let set = transfer.contour_set(&grid).unwrap();
        assert_eq!(set.contours().len(), 2);
        let levels = set.levels();
        assert!(levels[0] > 0.0 && levels[0] < levels[1] && levels[1] > 5.0);

        let out = Renderer::serial().transfer(&grid, &transfer).unwrap();
        assert_eq!(out.get(2, 2), levels[1]);
        assert_eq!(out.get(1, 1), levels[0]);
        assert_eq!(out.get(0, 0), 0.0);
    }

    #[test]
    fn test_spaced_contours_from_floor_to_max() {
        let grid = FlatAggregates::from_rows(vec![vec![0i64, 3, 6], vec![9, 12, 0]], 0);
        let set = SpacedContours::new(4.0, Some(1i64), 0).contour_set(&grid).unwrap();
        assert_eq!(set.levels(), vec![2, 6, 10, 14]);

        let from_min = SpacedContours::new(5.0, None, 0i64).contour_set(&grid).unwrap();
        assert_eq!(from_min.levels(), vec![1, 6, 11, 16]);

        assert!(matches!(
            SpacedContours::new(0.0, None, 0i64).contour_set(&grid),
            Err(RenderError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_index_matches_linear_scan() {
        let mut rows = Vec::new();
        for y in 0..14 {
            let row: Vec<f64> = (0..17)
                .map(|x| (((x * 7 + y * 13) % 11) as f64) + if (x + y) % 5 == 0 { 6.0 } else { 0.0 })
                .collect();
            rows.push(row);
        }
        let grid = FlatAggregates::from_rows(rows, 0.0);
        let set = NContours::new(4, 0.0f64).contour_set(&grid).unwrap();
        for y in -2..16 {
            for x in -2..19 {
                assert_eq!(set.value_at(x, y), value_at_linear(&set, x, y), "cell ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_empty_grid_has_no_contours() {
        let grid = FlatAggregates::<i64>::with_size(0, 0, 0);
        assert!(NContours::new(3, 0i64).contour_set(&grid).unwrap().contours().is_empty());
        assert!(SpacedContours::new(1.0, None, 0i64)
            .contour_set(&grid)
            .unwrap()
            .contours()
            .is_empty());
    }
}
