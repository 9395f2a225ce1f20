//! The reduction algebra: folding glyph values into cells and merging cells.

use crate::aggregates::{Aggregates, FlatAggregates};
use crate::color::Color;
use crate::error::Result;
use crate::numeric::Numeric;

/// Folds glyph values of type `V` into per-cell aggregates of type `A`.
///
/// `combine` must be associative and commutative over the glyphs folded into one cell
/// for a render to be independent of glyph order and partitioning.
pub trait Aggregator<V, A>: Send + Sync {
    /// Value of a cell no glyph touches; also the starting point of every fold.
    fn identity(&self) -> A;

    /// Folds one glyph value into a cell. Dynamically typed aggregators fail with a type
    /// mismatch when the cell or the value is of a kind they do not fold.
    fn combine(&self, current: &A, value: &V) -> Result<A>;

    /// Merges several cells into one lower-resolution cell.
    fn rollup(&self, sources: &[A]) -> A;

    /// Rejects glyph values this aggregator cannot consume.
    fn check(&self, _value: &V) -> Result<()> {
        Ok(())
    }
}

/// Point-wise merge of two aggregate values, used to merge whole grids.
pub trait AggregateReducer<L, R, O>: Send + Sync {
    fn combine(&self, left: &L, right: &R) -> O;

    fn rollup(&self, sources: &[L]) -> O;

    /// Identity under `combine`; fills empty cells and rollup padding.
    fn zero(&self) -> O;
}

/// Counts the glyphs touching each cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl<V> Aggregator<V, i64> for Count {
    fn identity(&self) -> i64 {
        0
    }

    fn combine(&self, current: &i64, _value: &V) -> Result<i64> {
        Ok(current + 1)
    }

    fn rollup(&self, sources: &[i64]) -> i64 {
        sources.iter().sum()
    }
}

impl AggregateReducer<i64, i64, i64> for Count {
    fn combine(&self, left: &i64, right: &i64) -> i64 {
        left + right
    }

    fn rollup(&self, sources: &[i64]) -> i64 {
        sources.iter().sum()
    }

    fn zero(&self) -> i64 {
        0
    }
}

/// Sums numeric glyph values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl<V: Numeric> Aggregator<V, f64> for Sum {
    fn identity(&self) -> f64 {
        0.0
    }

    fn combine(&self, current: &f64, value: &V) -> Result<f64> {
        Ok(current + value.to_f64())
    }

    fn rollup(&self, sources: &[f64]) -> f64 {
        sources.iter().sum()
    }
}

impl AggregateReducer<f64, f64, f64> for Sum {
    fn combine(&self, left: &f64, right: &f64) -> f64 {
        left + right
    }

    fn rollup(&self, sources: &[f64]) -> f64 {
        sources.iter().sum()
    }

    fn zero(&self) -> f64 {
        0.0
    }
}

/// Keeps the value of the earliest glyph folded into a cell.
///
/// Order dependent: results follow the glyphset's query order.
#[derive(Debug, Clone)]
pub struct First<V> {
    pub empty: V,
}

impl<V: Clone + PartialEq + Send + Sync> Aggregator<V, V> for First<V> {
    fn identity(&self) -> V {
        self.empty.clone()
    }

    fn combine(&self, current: &V, value: &V) -> Result<V> {
        Ok(AggregateReducer::combine(self, current, value))
    }

    fn rollup(&self, sources: &[V]) -> V {
        sources
            .iter()
            .find(|v| **v != self.empty)
            .cloned()
            .unwrap_or_else(|| self.empty.clone())
    }
}

impl<V: Clone + PartialEq + Send + Sync> AggregateReducer<V, V, V> for First<V> {
    fn combine(&self, left: &V, right: &V) -> V {
        if *left == self.empty {
            right.clone()
        } else {
            left.clone()
        }
    }

    fn rollup(&self, sources: &[V]) -> V {
        Aggregator::rollup(self, sources)
    }

    fn zero(&self) -> V {
        self.empty.clone()
    }
}

/// Keeps the value of the latest glyph folded into a cell.
#[derive(Debug, Clone)]
pub struct Last<V> {
    pub empty: V,
}

impl<V: Clone + PartialEq + Send + Sync> Aggregator<V, V> for Last<V> {
    fn identity(&self) -> V {
        self.empty.clone()
    }

    fn combine(&self, _current: &V, value: &V) -> Result<V> {
        Ok(value.clone())
    }

    fn rollup(&self, sources: &[V]) -> V {
        sources
            .iter()
            .rev()
            .find(|v| **v != self.empty)
            .cloned()
            .unwrap_or_else(|| self.empty.clone())
    }
}

impl<V: Clone + PartialEq + Send + Sync> AggregateReducer<V, V, V> for Last<V> {
    fn combine(&self, left: &V, right: &V) -> V {
        if *right == self.empty {
            left.clone()
        } else {
            right.clone()
        }
    }

    fn rollup(&self, sources: &[V]) -> V {
        Aggregator::rollup(self, sources)
    }

    fn zero(&self) -> V {
        self.empty.clone()
    }
}

/// Paints any touched cell a single color.
#[derive(Debug, Clone, Copy)]
pub struct Solid {
    pub color: Color,
}

impl<V> Aggregator<V, Color> for Solid {
    fn identity(&self) -> Color {
        Color::CLEAR
    }

    fn combine(&self, _current: &Color, _value: &V) -> Result<Color> {
        Ok(self.color)
    }

    fn rollup(&self, sources: &[Color]) -> Color {
        if sources.iter().any(|c| *c != Color::CLEAR) {
            self.color
        } else {
            Color::CLEAR
        }
    }
}

impl AggregateReducer<Color, Color, Color> for Solid {
    fn combine(&self, left: &Color, right: &Color) -> Color {
        if *left != Color::CLEAR || *right != Color::CLEAR {
            self.color
        } else {
            Color::CLEAR
        }
    }

    fn rollup(&self, sources: &[Color]) -> Color {
        Aggregator::<(), Color>::rollup(self, sources)
    }

    fn zero(&self) -> Color {
        Color::CLEAR
    }
}

/// Merges two grids cell by cell over the union of their regions.
pub fn combine_aggregates<L, R, O>(
    left: &dyn Aggregates<L>,
    right: &dyn Aggregates<R>,
    reducer: &dyn AggregateReducer<L, R, O>,
) -> FlatAggregates<O>
where
    O: Clone + Send + Sync,
{
    let low_x = left.low_x().min(right.low_x());
    let low_y = left.low_y().min(right.low_y());
    let high_x = left.high_x().max(right.high_x());
    let high_y = left.high_y().max(right.high_y());
    let mut out = FlatAggregates::new(low_x, low_y, high_x, high_y, reducer.zero());
    let width = out.width();
    for (i, slot) in out.values_mut().iter_mut().enumerate() {
        let x = low_x + (i % width) as i32;
        let y = low_y + (i / width) as i32;
        *slot = reducer.combine(&left.get(x, y), &right.get(x, y));
    }
    out
}

/// Reduces resolution: each output cell rolls up a `factor` x `factor` block of input
/// cells. Blocks hanging over the grid edge are padded with `zero()`.
pub fn rollup_aggregates<A>(
    aggregates: &dyn Aggregates<A>,
    reducer: &dyn AggregateReducer<A, A, A>,
    factor: usize,
) -> Result<FlatAggregates<A>>
where
    A: Clone + Send + Sync,
{
    if factor == 0 {
        return Err(crate::error::RenderError::InvalidParameter(
            "rollup factor must be at least 1".to_string(),
        ));
    }
    let f = factor as i32;
    let low_x = aggregates.low_x().div_euclid(f);
    let low_y = aggregates.low_y().div_euclid(f);
    let high_x = (aggregates.high_x() + f - 1).div_euclid(f);
    let high_y = (aggregates.high_y() + f - 1).div_euclid(f);

    let mut out = FlatAggregates::new(low_x, low_y, high_x, high_y, reducer.zero());
    let mut block = Vec::with_capacity(factor * factor);
    for y in low_y..high_y {
        for x in low_x..high_x {
            block.clear();
            for sy in y * f..(y + 1) * f {
                for sx in x * f..(x + 1) * f {
                    if aggregates.contains_cell(sx, sy) {
                        block.push(aggregates.get(sx, sy));
                    } else {
                        block.push(reducer.zero());
                    }
                }
            }
            out.set(x, y, reducer.rollup(&block))?;
        }
    }
    Ok(out)
}
