//! # Abstract Rendering
//!
//! Turns large collections of glyphs (a shape paired with a value) into a fixed-resolution
//! raster through an explicit two-stage pipeline: spatial aggregation into a grid of
//! aggregate values, followed by a transfer pass that maps that grid to an output grid,
//! usually colors.
//!
//! ## Core Pieces
//!
//! - **Glyphs**: [`Glyph`] values collected in a [`Glyphset`], either a flat [`GlyphList`]
//!   or the adaptive [`QuadTree`] index.
//! - **Aggregates**: bounded integer-indexed grids ([`FlatAggregates`], [`PadAggregates`])
//!   with a default value for unset cells.
//! - **Reduction algebra**: [`Aggregator`] folds glyph values into cells and
//!   [`AggregateReducer`] merges whole grids or rolls them up to a coarser resolution.
//! - **Renderer**: [`Renderer`] drives aggregation and transfer passes over a rayon pool,
//!   one disjoint slice of rows per task.
//! - **Transfers**: item-wise or set-wise [`Transfer`] functions plus the [`If`] and
//!   [`Seq`] combinators.
//! - **Contours**: marching-squares iso-contours ([`IsoContour`], [`SpacedContours`],
//!   [`NContours`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use abstract_rendering::*;
//!
//! let glyphs: GlyphList<i32> = (0..4)
//!     .map(|i| Glyph::new(Rect::new(i as f64, 0.0, 1.0, 1.0), i))
//!     .collect();
//! let renderer = Renderer::serial();
//! let view = AffineTransform::identity();
//!
//! let counts = renderer.aggregate(&glyphs, &Count, &view, 4, 1)?;
//! let image = renderer.transfer(&counts, &Present::new(Color::RED, Color::WHITE))?;
//! assert_eq!(image.get(2, 0), Color::RED);
//! # Ok::<(), RenderError>(())
//! ```
//!
//! Front ends that pick their reducers from configuration go through
//! [`registry::Pipeline`], which checks value kinds before anything runs, and through
//! [`RenderCoordinator`] so that only the newest redraw request publishes its result.

pub mod aggregates;
pub mod aggregator;
pub mod color;
pub mod contour;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod glyph;
pub mod numeric;
pub mod registry;
pub mod renderer;
pub mod spatial;
pub mod transfer;


pub use aggregates::{Aggregates, FlatAggregates, PadAggregates};
pub use aggregator::{
    combine_aggregates, rollup_aggregates, AggregateReducer, Aggregator, Count, First, Last,
    Solid, Sum,
};
pub use color::Color;
pub use contour::{ContourSet, IsoContour, NContours, SpacedContours};
pub use coordinator::{RenderCoordinator, RenderTicket};
pub use error::{RenderError, Result};
pub use geometry::{AffineTransform, Path, Point, Rect, Shape};
pub use glyph::{Glyph, GlyphList, Glyphset};
pub use numeric::{Numeric, Stats};
pub use registry::{AggregatorSpec, Pipeline, TransferSpec, Value, ValueKind};
pub use renderer::{RenderConfig, RenderMode, Renderer};
pub use spatial::{QuadTree, QuadTreeConfig};
pub use transfer::{
    Const, Echo, If, Interpolate, ItemWise, Present, Seq, SetWise, Specialized, Transfer,
};
