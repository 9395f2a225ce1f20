//! Everyday item-wise transfers.

use crate::aggregates::{values, Aggregates};
use crate::color::Color;
use crate::error::Result;
use crate::numeric::{Numeric, Stats};
use crate::transfer::{ItemWise, Specialized, Transfer};

/// Returns the same value for every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Const<Out> {
    value: Out,
}

impl<Out> Const<Out> {
    pub fn new(value: Out) -> Self {
        Self { value }
    }
}

impl<In, Out: Clone + Send + Sync> ItemWise<In, Out> for Const<Out> {
    fn empty_value(&self) -> Out {
        self.value.clone()
    }

    fn at(&self, _x: i32, _y: i32, _aggregates: &dyn Aggregates<In>) -> Out {
        self.value.clone()
    }
}

impl<In, Out: Clone + Send + Sync> Transfer<In, Out> for Const<Out> {
    fn empty_value(&self) -> Out {
        self.value.clone()
    }

    fn specialize(&self, _aggregates: &dyn Aggregates<In>) -> Result<Specialized<'_, In, Out>> {
        Ok(Specialized::item_wise(self.clone()))
    }
}

/// Copies each cell through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Echo<T> {
    empty: T,
}

impl<T> Echo<T> {
    pub fn new(empty: T) -> Self {
        Self { empty }
    }
}

impl<T: Clone + Send + Sync> ItemWise<T, T> for Echo<T> {
    fn empty_value(&self) -> T {
        self.empty.clone()
    }

    fn at(&self, x: i32, y: i32, aggregates: &dyn Aggregates<T>) -> T {
        aggregates.get(x, y)
    }
}

impl<T: Clone + Send + Sync> Transfer<T, T> for Echo<T> {
    fn empty_value(&self) -> T {
        self.empty.clone()
    }

    fn specialize(&self, _aggregates: &dyn Aggregates<T>) -> Result<Specialized<'_, T, T>> {
        Ok(Specialized::item_wise(self.clone()))
    }
}

/// Maps each non-default cell onto a color ramp between `low` and `high`, scaled by the
/// grid's observed extremes. Default cells become `empty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolate {
    pub low: Color,
    pub high: Color,
    pub empty: Color,
}

impl Interpolate {
    pub fn new(low: Color, high: Color) -> Self {
        Self {
            low,
            high,
            empty: Color::CLEAR,
        }
    }

    pub fn with_empty(mut self, empty: Color) -> Self {
        self.empty = empty;
        self
    }
}

struct InterpolateAt<N> {
    ramp: Interpolate,
    default: N,
    extrema: Option<Stats<f64>>,
}

impl<N: Numeric> ItemWise<N, Color> for InterpolateAt<N> {
    fn empty_value(&self) -> Color {
        self.ramp.empty
    }

    fn at(&self, x: i32, y: i32, aggregates: &dyn Aggregates<N>) -> Color {
        let value = aggregates.get(x, y);
        let Some(extrema) = self.extrema else {
            return self.ramp.empty;
        };
        if value == self.default {
            return self.ramp.empty;
        }
        let span = extrema.max - extrema.min;
        let t = if span > 0.0 {
            (value.to_f64() - extrema.min) / span
        } else {
            1.0
        };
        Color::lerp(self.ramp.low, self.ramp.high, t)
    }
}

impl<N: Numeric> Transfer<N, Color> for Interpolate {
    fn empty_value(&self) -> Color {
        self.empty
    }

    fn specialize(&self, aggregates: &dyn Aggregates<N>) -> Result<Specialized<'_, N, Color>> {
        let default = aggregates.default_value();
        let extrema = Stats::of(
            values::<N, _>(aggregates)
                .filter(|v| *v != default)
                .map(Numeric::to_f64),
        );
        Ok(Specialized::item_wise(InterpolateAt {
            ramp: *self,
            default,
            extrema,
        }))
    }
}

/// Marks cells holding anything other than the grid default.
#[derive(Debug, Clone, PartialEq)]
pub struct Present<Out> {
    pub present: Out,
    pub absent: Out,
}

impl<Out> Present<Out> {
    pub fn new(present: Out, absent: Out) -> Self {
        Self { present, absent }
    }
}

struct PresentAt<In, Out> {
    marks: Present<Out>,
    default: In,
}

impl<In, Out> ItemWise<In, Out> for PresentAt<In, Out>
where
    In: PartialEq + Send + Sync,
    Out: Clone + Send + Sync,
{
    fn empty_value(&self) -> Out {
        self.marks.absent.clone()
    }

    fn at(&self, x: i32, y: i32, aggregates: &dyn Aggregates<In>) -> Out {
        if aggregates.get(x, y) != self.default {
            self.marks.present.clone()
        } else {
            self.marks.absent.clone()
        }
    }
}

impl<In, Out> Transfer<In, Out> for Present<Out>
where
    In: PartialEq + Send + Sync + 'static,
    Out: Clone + Send + Sync,
{
    fn empty_value(&self) -> Out {
        self.absent.clone()
    }

    fn specialize(&self, aggregates: &dyn Aggregates<In>) -> Result<Specialized<'_, In, Out>> {
        Ok(Specialized::item_wise(PresentAt {
            marks: self.clone(),
            default: aggregates.default_value(),
        }))
    }
}
