//! Marching-squares cell classification and contour stitching
//!
//! Coordinates: grid cell `(x, y)` covers `[x, x+1) x [y, y+1)`, so its center sits at
//! `(x + 0.5, y + 0.5)`. Marching cell `(x, y)` is the square whose corners are the
//! centers of grid cells `(x-1, y-1)`, `(x, y-1)`, `(x-1, y)` and `(x, y)`. Contour
//! vertices sit on the midpoints of marching-cell edges, which keeps every grid cell
//! center strictly off the contour.

use tracing::trace;

use crate::aggregates::{cells, Aggregates, FlatAggregates};
use crate::error::{RenderError, Result};
use crate::geometry::{Path, Point};

/// Edge of a marching cell. In scan-line convention "top" is low y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    None,
    Left,
    Right,
    Bottom,
    Top,
}

impl Side {
    /// Midpoint of this edge of marching cell `(x, y)`.
    pub fn midpoint(self, x: i32, y: i32) -> Result<Point> {
        let (x, y) = (x as f64, y as f64);
        match self {
            Side::Left => Ok(Point::new(x - 0.5, y)),
            Side::Right => Ok(Point::new(x + 0.5, y)),
            Side::Bottom => Ok(Point::new(x, y + 0.5)),
            Side::Top => Ok(Point::new(x, y - 0.5)),
            Side::None => Err(RenderError::IllegalContourState(format!(
                "no edge point for side None at ({x}, {y})"
            ))),
        }
    }

    /// The marching cell across this edge.
    pub fn step(self, x: i32, y: i32) -> Result<(i32, i32)> {
        match self {
            Side::Left => Ok((x - 1, y)),
            Side::Right => Ok((x + 1, y)),
            Side::Bottom => Ok((x, y + 1)),
            Side::Top => Ok((x, y - 1)),
            Side::None => Err(RenderError::IllegalContourState(format!(
                "encountered side None after starting contour at ({x}, {y})"
            ))),
        }
    }
}

/// The sixteen corner configurations of a marching cell.
///
/// Bits: down-left `0b1000`, down-right `0b0100`, up-right `0b0010`, up-left `0b0001`,
/// where "down" is the lower row index. Names follow the scan-line convention: `ui` is
/// the up (higher) row, `di` the down (lower) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum McType {
    #[default]
    Empty,
    Surround,
    UiLOut,
    UiROut,
    DiROut,
    DiLOut,
    UiLIn,
    UiRIn,
    DiRIn,
    DiLIn,
    DiIn,
    LIn,
    UiIn,
    RIn,
    /// Down-left and up-right above: ambiguous saddle.
    DiagTwo,
    /// Down-right and up-left above: ambiguous saddle.
    DiagOne,
}

pub const DOWN_LEFT: u8 = 0b1000;
pub const DOWN_RIGHT: u8 = 0b0100;
pub const UP_RIGHT: u8 = 0b0010;
pub const UP_LEFT: u8 = 0b0001;

impl McType {
    pub fn from_code(code: u8) -> McType {
        match code & 0b1111 {
            0b0000 => McType::Empty,
            0b1111 => McType::Surround,
            0b1110 => McType::UiLOut,
            0b1101 => McType::UiROut,
            0b1011 => McType::DiROut,
            0b0111 => McType::DiLOut,
            0b0001 => McType::UiLIn,
            0b0010 => McType::UiRIn,
            0b0100 => McType::DiRIn,
            0b1000 => McType::DiLIn,
            0b1100 => McType::DiIn,
            0b1001 => McType::LIn,
            0b0011 => McType::UiIn,
            0b0110 => McType::RIn,
            0b1010 => McType::DiagTwo,
            _ => McType::DiagOne,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            McType::Empty => 0b0000,
            McType::Surround => 0b1111,
            McType::UiLOut => 0b1110,
            McType::UiROut => 0b1101,
            McType::DiROut => 0b1011,
            McType::DiLOut => 0b0111,
            McType::UiLIn => 0b0001,
            McType::UiRIn => 0b0010,
            McType::DiRIn => 0b0100,
            McType::DiLIn => 0b1000,
            McType::DiIn => 0b1100,
            McType::LIn => 0b1001,
            McType::UiIn => 0b0011,
            McType::RIn => 0b0110,
            McType::DiagTwo => 0b1010,
            McType::DiagOne => 0b0101,
        }
    }

    pub fn is_ambiguous(self) -> bool {
        matches!(self, McType::DiagOne | McType::DiagTwo)
    }

    /// Whether a contour walk may begin here.
    pub fn is_start(self) -> bool {
        !matches!(
            self,
            McType::Empty | McType::Surround | McType::DiagOne | McType::DiagTwo
        )
    }

    /// Type left behind once the walk has consumed this cell's segment. Saddles carry
    /// two segments and stay until the scan moves past them.
    pub fn cleared(self) -> McType {
        match self {
            McType::Empty | McType::Surround | McType::DiagOne | McType::DiagTwo => self,
            _ => McType::Empty,
        }
    }

    /// Edge a walk starting in this cell enters through.
    pub fn entry_side(self) -> Result<Side> {
        match self {
            McType::UiLIn | McType::UiIn | McType::DiLOut => Ok(Side::Left),
            McType::UiRIn | McType::RIn | McType::UiLOut => Ok(Side::Bottom),
            McType::DiRIn | McType::DiIn | McType::UiROut => Ok(Side::Right),
            McType::DiLIn | McType::LIn | McType::DiROut => Ok(Side::Top),
            other => Err(RenderError::IllegalContourState(format!(
                "cannot start a contour in a {other:?} cell"
            ))),
        }
    }

    /// Edge the walk leaves through, given the direction it arrived from.
    ///
    /// `prev` is the side the previous cell was left through, so a walk moving right
    /// arrives with `prev == Side::Right`. Only saddles look at it.
    pub fn exit_side(self, prev: Side) -> Result<Side> {
        match self {
            McType::DiLIn | McType::DiIn | McType::UiLOut => Ok(Side::Left),
            McType::UiLIn | McType::LIn | McType::UiROut => Ok(Side::Bottom),
            McType::UiRIn | McType::UiIn | McType::DiROut => Ok(Side::Right),
            McType::DiRIn | McType::RIn | McType::DiLOut => Ok(Side::Top),
            McType::DiagOne => match prev {
                Side::Left => Ok(Side::Top),
                Side::Right => Ok(Side::Bottom),
                _ => Err(illegal_previous(prev, self)),
            },
            McType::DiagTwo => match prev {
                Side::Bottom => Ok(Side::Right),
                Side::Top => Ok(Side::Left),
                _ => Err(illegal_previous(prev, self)),
            },
            McType::Empty | McType::Surround => Err(RenderError::IllegalContourState(
                format!("cannot determine exit side for a {self:?} cell"),
            )),
        }
    }
}

fn illegal_previous(prev: Side, current: McType) -> RenderError {
    RenderError::IllegalContourState(format!(
        "illegal previous side {prev:?} for current cell {current:?}"
    ))
}

/// Marks each cell strictly above `threshold`.
pub fn above_threshold<N, G>(aggregates: &G, threshold: N) -> FlatAggregates<bool>
where
    N: PartialOrd,
    G: Aggregates<N> + ?Sized,
{
    let mut above = FlatAggregates::new(
        aggregates.low_x(),
        aggregates.low_y(),
        aggregates.high_x(),
        aggregates.high_y(),
        false,
    );
    let width = above.width();
    for (i, slot) in above.values_mut().iter_mut().enumerate() {
        let x = aggregates.low_x() + (i % width) as i32;
        let y = aggregates.low_y() + (i / width) as i32;
        *slot = aggregates.get(x, y) > threshold;
    }
    above
}

/// Classifies every marching cell whose four corners lie inside `above`.
///
/// Only rings whose outside lies within `above` are traced, so callers pad the grid with
/// `false` first.
pub fn classify<G>(above: &G) -> FlatAggregates<McType>
where
    G: Aggregates<bool> + ?Sized,
{
    let mut types = FlatAggregates::new(
        above.low_x() + 1,
        above.low_y() + 1,
        above.high_x(),
        above.high_y(),
        McType::Empty,
    );
    let width = types.width();
    let (low_x, low_y) = (types.low_x(), types.low_y());
    for (i, slot) in types.values_mut().iter_mut().enumerate() {
        let x = low_x + (i % width) as i32;
        let y = low_y + (i / width) as i32;
        let mut code = 0;
        if above.get(x - 1, y - 1) {
            code |= DOWN_LEFT;
        }
        if above.get(x, y - 1) {
            code |= DOWN_RIGHT;
        }
        if above.get(x - 1, y) {
            code |= UP_LEFT;
        }
        if above.get(x, y) {
            code |= UP_RIGHT;
        }
        *slot = McType::from_code(code);
    }
    types
}

/// Stitches every segment in `types` into closed rings, consuming the cells as it goes.
///
/// The result may hold several disjoint rings, and rings nested inside others describe
/// holes under the even-odd rule.
pub fn assemble(types: &mut FlatAggregates<McType>) -> Result<Path> {
    let mut path = Path::new();
    let starts: Vec<(i32, i32)> = cells::<McType, _>(&*types).collect();
    for (x, y) in starts {
        if types.get(x, y).is_start() {
            let ring = stitch(types, x, y)?;
            trace!(x, y, vertices = ring.len(), "Stitched contour ring");
            path.push_ring(ring);
        }
    }
    Ok(path)
}

/// Follows one connected contour from `(start_x, start_y)` back to itself.
fn stitch(types: &mut FlatAggregates<McType>, start_x: i32, start_y: i32) -> Result<Vec<Point>> {
    let limit = 2 * types.width() * types.height() + 4;
    let (mut x, mut y) = (start_x, start_y);
    let mut ring = vec![types.get(x, y).entry_side()?.midpoint(x, y)?];
    let mut prev = Side::None;

    loop {
        let cell = types.get(x, y);
        let exit = cell.exit_side(prev)?;
        let vertex = exit.midpoint(x, y)?;
        types.set(x, y, cell.cleared())?;
        (x, y) = exit.step(x, y)?;
        prev = exit;
        if (x, y) == (start_x, start_y) {
            // Arrived back through the start's entry edge, already the ring's first vertex.
            break;
        }
        ring.push(vertex);
        if ring.len() > limit {
            return Err(RenderError::IllegalContourState(format!(
                "contour starting at ({start_x}, {start_y}) never returned to its start"
            )));
        }
    }
    Ok(ring)
}
