//! Transfer functions: turning one aggregate grid into another
//!
//! A [`Transfer`] is a stateless description. Before use it is specialized against the
//! concrete grid it will run over, which is where grid-wide context (extrema, contour
//! geometry, predicate results) gets computed. The specialized form is either item-wise,
//! a pure function of one cell that the renderer can schedule freely, or set-wise, which
//! needs the whole grid and drives the renderer itself.

pub mod combinators;
pub mod general;
pub mod predicates;

use crate::aggregates::{Aggregates, FlatAggregates};
use crate::error::Result;
use crate::renderer::Renderer;

pub use combinators::{If, Seq};
pub use general::{Const, Echo, Interpolate, Present};

/// A grid-to-grid transformation from `In` cells to `Out` cells.
pub trait Transfer<In, Out>: Send + Sync {
    /// Value of output cells with nothing to say.
    fn empty_value(&self) -> Out;

    /// Prepares this transfer for one grid. Called exactly once per grid, before any
    /// cell is computed.
    fn specialize(&self, aggregates: &dyn Aggregates<In>) -> Result<Specialized<'_, In, Out>>;
}

/// A transfer whose output at a cell depends only on that cell's neighbourhood and
/// whatever was computed during specialization.
pub trait ItemWise<In, Out>: Send + Sync {
    fn empty_value(&self) -> Out;

    fn at(&self, x: i32, y: i32, aggregates: &dyn Aggregates<In>) -> Out;
}

/// A transfer that needs the whole grid at once.
pub trait SetWise<In, Out>: Send + Sync {
    fn process(
        &self,
        aggregates: &dyn Aggregates<In>,
        renderer: &Renderer,
    ) -> Result<FlatAggregates<Out>>;
}

/// A transfer bound to one grid, ready to run.
pub enum Specialized<'a, In, Out> {
    ItemWise(Box<dyn ItemWise<In, Out> + 'a>),
    SetWise(Box<dyn SetWise<In, Out> + 'a>),
}

impl<'a, In, Out> Specialized<'a, In, Out> {
    pub fn item_wise(item: impl ItemWise<In, Out> + 'a) -> Self {
        Specialized::ItemWise(Box::new(item))
    }

    pub fn set_wise(set: impl SetWise<In, Out> + 'a) -> Self {
        Specialized::SetWise(Box::new(set))
    }

    pub fn is_item_wise(&self) -> bool {
        matches!(self, Specialized::ItemWise(_))
    }
}

impl<In, Out> std::fmt::Debug for Specialized<'_, In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Specialized::ItemWise(_) => f.write_str("Specialized::ItemWise"),
            Specialized::SetWise(_) => f.write_str("Specialized::SetWise"),
        }
    }
}
