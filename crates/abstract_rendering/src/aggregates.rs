//! Integer-indexed grids of aggregate values.

use serde::Serialize;

use crate::error::{RenderError, Result};

/// A bounded grid `[low_x, high_x) x [low_y, high_y)` of values with a default for
/// unset cells. Reads outside the region return the default, never an error.
pub trait Aggregates<A>: Send + Sync {
    fn get(&self, x: i32, y: i32) -> A;

    fn set(&mut self, x: i32, y: i32, value: A) -> Result<()>;

    fn default_value(&self) -> A;

    fn low_x(&self) -> i32;
    fn low_y(&self) -> i32;
    fn high_x(&self) -> i32;
    fn high_y(&self) -> i32;

    fn width(&self) -> usize {
        (self.high_x() - self.low_x()).max(0) as usize
    }

    fn height(&self) -> usize {
        (self.high_y() - self.low_y()).max(0) as usize
    }

    fn contains_cell(&self, x: i32, y: i32) -> bool {
        x >= self.low_x() && x < self.high_x() && y >= self.low_y() && y < self.high_y()
    }
}

/// Row-major iterator over every cell coordinate of a grid region.
pub fn cells<A, G>(aggregates: &G) -> impl Iterator<Item = (i32, i32)>
where
    G: Aggregates<A> + ?Sized,
{
    let (lx, hx) = (aggregates.low_x(), aggregates.high_x());
    let (ly, hy) = (aggregates.low_y(), aggregates.high_y());
    (ly..hy).flat_map(move |y| (lx..hx).map(move |x| (x, y)))
}

/// Every value of a grid in row-major order, defaults included.
pub fn values<'a, A, G>(aggregates: &'a G) -> impl Iterator<Item = A> + 'a
where
    A: 'a,
    G: Aggregates<A> + ?Sized,
{
    cells::<A, G>(aggregates).map(move |(x, y)| aggregates.get(x, y))
}

/// Dense, row-major aggregate storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatAggregates<A> {
    low_x: i32,
    low_y: i32,
    high_x: i32,
    high_y: i32,
    default_value: A,
    values: Vec<A>,
}

impl<A: Clone + Send + Sync> FlatAggregates<A> {
    /// Grid over `[low_x, high_x) x [low_y, high_y)` with every cell at `default_value`.
    pub fn new(low_x: i32, low_y: i32, high_x: i32, high_y: i32, default_value: A) -> Self {
        let high_x = high_x.max(low_x);
        let high_y = high_y.max(low_y);
        let len = (high_x - low_x) as usize * (high_y - low_y) as usize;
        Self {
            low_x,
            low_y,
            high_x,
            high_y,
            values: vec![default_value.clone(); len],
            default_value,
        }
    }

    /// Screen-shaped grid `[0, width) x [0, height)`.
    pub fn with_size(width: usize, height: usize, default_value: A) -> Self {
        Self::new(0, 0, width as i32, height as i32, default_value)
    }

    /// Builds a grid from rows, `rows[y][x]`, anchored at the origin.
    pub fn from_rows(rows: Vec<Vec<A>>, default_value: A) -> Self {
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::with_size(width, height, default_value);
        for (y, row) in rows.into_iter().enumerate() {
            for (x, value) in row.into_iter().enumerate() {
                grid.values[y * width + x] = value;
            }
        }
        grid
    }

    /// Copies the extent and contents of any grid.
    pub fn copy_of<G: Aggregates<A> + ?Sized>(source: &G) -> Self {
        let mut grid = Self::new(
            source.low_x(),
            source.low_y(),
            source.high_x(),
            source.high_y(),
            source.default_value(),
        );
        for (slot, value) in grid.values.iter_mut().zip(values(source)) {
            *slot = value;
        }
        grid
    }

    /// Applies `f` to every cell and to the default.
    pub fn map<B: Clone, F: Fn(&A) -> B>(&self, f: F) -> FlatAggregates<B> {
        FlatAggregates {
            low_x: self.low_x,
            low_y: self.low_y,
            high_x: self.high_x,
            high_y: self.high_y,
            default_value: f(&self.default_value),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Cell values as `rows[y][x]`, relative to the grid origin.
    pub fn to_rows(&self) -> Vec<Vec<A>> {
        let width = self.width();
        if width == 0 {
            return vec![Vec::new(); self.height()];
        }
        self.values.chunks(width).map(<[A]>::to_vec).collect()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.contains_cell(x, y) {
            Some((y - self.low_y) as usize * self.width() + (x - self.low_x) as usize)
        } else {
            None
        }
    }

    /// Row-major cell storage; each `width()` run is one row.
    pub(crate) fn values_mut(&mut self) -> &mut [A] {
        &mut self.values
    }
}

impl<A: Clone + Send + Sync> Aggregates<A> for FlatAggregates<A> {
    fn get(&self, x: i32, y: i32) -> A {
        match self.index(x, y) {
            Some(i) => self.values[i].clone(),
            None => self.default_value.clone(),
        }
    }

    fn set(&mut self, x: i32, y: i32, value: A) -> Result<()> {
        let i = self.index(x, y).ok_or(RenderError::OutOfBounds { x, y })?;
        self.values[i] = value;
        Ok(())
    }

    fn default_value(&self) -> A {
        self.default_value.clone()
    }

    fn low_x(&self) -> i32 {
        self.low_x
    }

    fn low_y(&self) -> i32 {
        self.low_y
    }

    fn high_x(&self) -> i32 {
        self.high_x
    }

    fn high_y(&self) -> i32 {
        self.high_y
    }
}

/// Read-only view adding a one-cell border of `pad` around a base grid.
///
/// Used by neighborhood algorithms so edge cells need no special casing.
pub struct PadAggregates<'a, A> {
    base: &'a dyn Aggregates<A>,
    pad: A,
}

impl<'a, A> PadAggregates<'a, A> {
    pub fn new(base: &'a dyn Aggregates<A>, pad: A) -> Self {
        Self { base, pad }
    }
}

impl<'a, A: Clone + Send + Sync> Aggregates<A> for PadAggregates<'a, A> {
    fn get(&self, x: i32, y: i32) -> A {
        if self.base.contains_cell(x, y) {
            self.base.get(x, y)
        } else if self.contains_cell(x, y) {
            self.pad.clone()
        } else {
            self.base.default_value()
        }
    }

    fn set(&mut self, _x: i32, _y: i32, _value: A) -> Result<()> {
        Err(RenderError::UnsupportedOperation(
            "padded aggregates are read-only",
        ))
    }

    fn default_value(&self) -> A {
        self.base.default_value()
    }

    fn low_x(&self) -> i32 {
        self.base.low_x() - 1
    }

    fn low_y(&self) -> i32 {
        self.base.low_y() - 1
    }

    fn high_x(&self) -> i32 {
        self.base.high_x() + 1
    }

    fn high_y(&self) -> i32 {
        self.base.high_y() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_outside_returns_default() {
        let mut grid = FlatAggregates::new(2, 3, 5, 6, -1);
        grid.set(2, 3, 7).unwrap();
        grid.set(4, 5, 9).unwrap();
        assert_eq!(grid.get(2, 3), 7);
        assert_eq!(grid.get(4, 5), 9);
        assert_eq!(grid.get(3, 4), -1);
        assert_eq!(grid.get(5, 5), -1);
        assert_eq!(grid.get(-100, 100), -1);
        assert_eq!((grid.width(), grid.height()), (3, 3));
    }

    #[test]
    fn test_set_outside_is_rejected() {
        let mut grid = FlatAggregates::with_size(2, 2, 0);
        assert!(matches!(
            grid.set(2, 0, 1),
            Err(RenderError::OutOfBounds { x: 2, y: 0 })
        ));
    }

    #[test]
    fn test_rows_round_trip_and_row_major_cells() {
        let grid = FlatAggregates::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]], 0);
        assert_eq!(grid.get(2, 1), 6);
        assert_eq!(values(&grid).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(grid.to_rows(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
        let doubled = grid.map(|v| v * 2);
        assert_eq!(doubled.get(1, 0), 4);
    }

    #[test]
    fn test_pad_aggregates_border() {
        let base = FlatAggregates::new(0, 0, 3, 2, 0);
        let base = {
            let mut b = base;
            b.set(1, 1, 5).unwrap();
            b
        };
        let pad = PadAggregates::new(&base, 9);

        assert_eq!((pad.low_x(), pad.low_y(), pad.high_x(), pad.high_y()), (-1, -1, 4, 3));
        assert_eq!(pad.get(1, 1), 5);
        assert_eq!(pad.get(0, 0), 0);
        for (x, y) in [(-1, -1), (-1, 0), (3, 1), (3, 2), (0, -1), (2, 2), (-1, 2), (3, -1)] {
            assert_eq!(pad.get(x, y), 9, "cell ({x}, {y}) should be padding");
        }
        for (x, y) in [(-2, 0), (4, 1), (0, 3), (1, -2), (4, 3)] {
            assert_eq!(pad.get(x, y), 0, "cell ({x}, {y}) should be the base default");
        }
    }

    #[test]
    fn test_pad_aggregates_rejects_writes() {
        let base = FlatAggregates::with_size(2, 2, 1);
        let mut pad = PadAggregates::new(&base, 0);
        for (x, y) in [(0, 0), (-1, -1), (5, 5)] {
            assert!(matches!(
                pad.set(x, y, 3),
                Err(RenderError::UnsupportedOperation(_))
            ));
        }
    }
}
