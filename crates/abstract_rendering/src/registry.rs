//! Runtime-selected reducers
//!
//! Front ends pick their aggregator and transfer by name from configuration, so glyph and
//! cell values travel as a small dynamic [`Value`]. A [`Pipeline`] checks at build time that
//! the aggregator accepts the glyph values and that the transfer accepts what the
//! aggregator produces, then dispatches to the statically typed reducers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregates::{values, FlatAggregates};
use crate::aggregator::{Aggregator, Count, First, Last, Solid, Sum};
use crate::color::Color;
use crate::contour::{IsoContour, NContours, SpacedContours};
use crate::error::{RenderError, Result};
use crate::geometry::AffineTransform;
use crate::glyph::Glyphset;
use crate::renderer::Renderer;
use crate::transfer::{Echo, If, Interpolate, Present, Transfer};

/// A glyph or cell value whose kind is only known at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Color(Color),
}

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Color,
}

impl ValueKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Float)
    }

    /// The "nothing here" value of this kind.
    pub fn zero(self) -> Value {
        match self {
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Color => Value::Color(Color::CLEAR),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Color => "color",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Color(_) => ValueKind::Color,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Color(c) => write!(f, "{c}"),
        }
    }
}

fn mismatch(context: &'static str, expected: impl fmt::Display, found: ValueKind) -> RenderError {
    RenderError::TypeMismatch {
        context,
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

/// Aggregators selectable by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregatorSpec {
    Count,
    Sum,
    First,
    Last,
    Solid { color: Color },
}

impl AggregatorSpec {
    pub const NAMES: &'static [&'static str] = &["count", "sum", "first", "last", "solid"];

    pub fn name(&self) -> &'static str {
        match self {
            AggregatorSpec::Count => "count",
            AggregatorSpec::Sum => "sum",
            AggregatorSpec::First => "first",
            AggregatorSpec::Last => "last",
            AggregatorSpec::Solid { .. } => "solid",
        }
    }

    /// Kind of the aggregates produced from glyph values of kind `input`.
    pub fn output_kind(&self, input: ValueKind) -> Result<ValueKind> {
        match self {
            AggregatorSpec::Count => Ok(ValueKind::Int),
            AggregatorSpec::Sum if input.is_numeric() => Ok(ValueKind::Float),
            AggregatorSpec::Sum => Err(mismatch("sum aggregator", "int or float", input)),
            AggregatorSpec::First | AggregatorSpec::Last => Ok(input),
            AggregatorSpec::Solid { .. } => Ok(ValueKind::Color),
        }
    }

    /// Aggregator over dynamic glyph values of kind `input`.
    pub fn build(&self, input: ValueKind) -> Result<ValueAggregator> {
        let output = self.output_kind(input)?;
        Ok(ValueAggregator {
            spec: self.clone(),
            input,
            output,
        })
    }
}

impl FromStr for AggregatorSpec {
    type Err = RenderError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Ok(AggregatorSpec::Count),
            "sum" => Ok(AggregatorSpec::Sum),
            "first" => Ok(AggregatorSpec::First),
            "last" => Ok(AggregatorSpec::Last),
            "solid" => Ok(AggregatorSpec::Solid { color: Color::BLUE }),
            other => Err(RenderError::InvalidParameter(format!(
                "unknown aggregator '{other}', expected one of {:?}",
                Self::NAMES
            ))),
        }
    }
}

/// Adapts the typed aggregators to [`Value`] glyphs and cells.
#[derive(Debug, Clone)]
pub struct ValueAggregator {
    spec: AggregatorSpec,
    input: ValueKind,
    output: ValueKind,
}

impl ValueAggregator {
    pub fn output_kind(&self) -> ValueKind {
        self.output
    }
}

impl Aggregator<Value, Value> for ValueAggregator {
    fn identity(&self) -> Value {
        self.output.zero()
    }

    fn combine(&self, current: &Value, value: &Value) -> Result<Value> {
        if current.kind() != self.output {
            return Err(mismatch("aggregate cell", self.output, current.kind()));
        }
        match (&self.spec, current) {
            (AggregatorSpec::Count, Value::Int(count)) => Ok(Value::Int(
                Aggregator::<Value, i64>::combine(&Count, count, value)?,
            )),
            (AggregatorSpec::Sum, Value::Float(sum)) => match value.as_f64() {
                Some(more) => Ok(Value::Float(sum + more)),
                None => Err(mismatch("sum aggregator", "int or float", value.kind())),
            },
            (AggregatorSpec::First, _) => {
                let first = First {
                    empty: self.input.zero(),
                };
                Aggregator::combine(&first, current, value)
            }
            (AggregatorSpec::Last, _) => {
                let last = Last {
                    empty: self.input.zero(),
                };
                Aggregator::combine(&last, current, value)
            }
            (AggregatorSpec::Solid { color }, _) => Ok(Value::Color(*color)),
            (AggregatorSpec::Count | AggregatorSpec::Sum, other) => Err(mismatch(
                "aggregate cell",
                self.output,
                other.kind(),
            )),
        }
    }

    fn rollup(&self, sources: &[Value]) -> Value {
        match &self.spec {
            AggregatorSpec::Count => {
                let counts: Vec<i64> = sources
                    .iter()
                    .filter_map(|v| match v {
                        Value::Int(c) => Some(*c),
                        _ => None,
                    })
                    .collect();
                Value::Int(Aggregator::<Value, i64>::rollup(&Count, &counts))
            }
            AggregatorSpec::Sum => {
                let sums: Vec<f64> = sources.iter().filter_map(Value::as_f64).collect();
                Value::Float(Aggregator::<f64, f64>::rollup(&Sum, &sums))
            }
            AggregatorSpec::First => Aggregator::rollup(
                &First {
                    empty: self.input.zero(),
                },
                sources,
            ),
            AggregatorSpec::Last => Aggregator::rollup(
                &Last {
                    empty: self.input.zero(),
                },
                sources,
            ),
            AggregatorSpec::Solid { color } => {
                let colors: Vec<Color> = sources.iter().filter_map(Value::as_color).collect();
                Value::Color(Aggregator::<Value, Color>::rollup(
                    &Solid { color: *color },
                    &colors,
                ))
            }
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        if value.kind() == self.input {
            Ok(())
        } else {
            Err(mismatch(
                "glyph value for aggregator",
                self.input,
                value.kind(),
            ))
        }
    }
}

/// Transfers selectable by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferSpec {
    /// Aggregates pass through unchanged.
    Echo,
    /// Numeric aggregates onto a color ramp.
    Interpolate { low: Color, high: Color },
    /// Non-empty cells in one color, the rest in another.
    Present { present: Color, absent: Color },
    /// Per-cell `value > above` test choosing between two colors.
    Threshold { above: f64, pass: Color, fail: Color },
    /// One iso-contour at `threshold`.
    IsoContour { threshold: f64 },
    /// `levels` iso-contours evenly spaced over the aggregate range.
    Contours { levels: usize },
    /// Iso-contours every `spacing` units from `floor`, or from the minimum.
    SpacedContours {
        spacing: f64,
        #[serde(default)]
        floor: Option<f64>,
    },
}

impl TransferSpec {
    pub const NAMES: &'static [&'static str] = &[
        "echo",
        "interpolate",
        "present",
        "threshold",
        "iso_contour",
        "contours",
        "spaced_contours",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TransferSpec::Echo => "echo",
            TransferSpec::Interpolate { .. } => "interpolate",
            TransferSpec::Present { .. } => "present",
            TransferSpec::Threshold { .. } => "threshold",
            TransferSpec::IsoContour { .. } => "iso_contour",
            TransferSpec::Contours { .. } => "contours",
            TransferSpec::SpacedContours { .. } => "spaced_contours",
        }
    }

    /// Kind of the output cells for aggregates of kind `input`.
    pub fn output_kind(&self, input: ValueKind) -> Result<ValueKind> {
        match self {
            TransferSpec::Echo => Ok(input),
            TransferSpec::Present { .. } => Ok(ValueKind::Color),
            TransferSpec::Interpolate { .. } | TransferSpec::Threshold { .. } => {
                if input.is_numeric() {
                    Ok(ValueKind::Color)
                } else {
                    Err(mismatch("color transfer", "int or float", input))
                }
            }
            TransferSpec::IsoContour { .. }
            | TransferSpec::Contours { .. }
            | TransferSpec::SpacedContours { .. } => {
                if input.is_numeric() {
                    Ok(ValueKind::Float)
                } else {
                    Err(mismatch("contour transfer", "int or float", input))
                }
            }
        }
    }
}

impl FromStr for TransferSpec {
    type Err = RenderError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "echo" => Ok(TransferSpec::Echo),
            "interpolate" => Ok(TransferSpec::Interpolate {
                low: Color::PINK,
                high: Color::RED,
            }),
            "present" => Ok(TransferSpec::Present {
                present: Color::RED,
                absent: Color::WHITE,
            }),
            "threshold" => Ok(TransferSpec::Threshold {
                above: 1.0,
                pass: Color::RED,
                fail: Color::WHITE,
            }),
            "iso_contour" => Ok(TransferSpec::IsoContour { threshold: 1.0 }),
            "contours" => Ok(TransferSpec::Contours { levels: 5 }),
            "spaced_contours" => Ok(TransferSpec::SpacedContours {
                spacing: 1.0,
                floor: None,
            }),
            other => Err(RenderError::InvalidParameter(format!(
                "unknown transfer '{other}', expected one of {:?}",
                Self::NAMES
            ))),
        }
    }
}

/// A type-checked aggregator and transfer pair over [`Value`] glyphs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    aggregator: ValueAggregator,
    transfer: TransferSpec,
    output: ValueKind,
}

impl Pipeline {
    /// Fails with a type mismatch unless `aggregator` accepts `input` glyph values and
    /// `transfer` accepts the aggregator's output.
    pub fn new(input: ValueKind, aggregator: AggregatorSpec, transfer: TransferSpec) -> Result<Self> {
        let aggregator = aggregator.build(input)?;
        let output = transfer.output_kind(aggregator.output_kind())?;
        info!(
            input = %input,
            aggregator = aggregator.spec.name(),
            aggregates = %aggregator.output_kind(),
            transfer = transfer.name(),
            output = %output,
            "Pipeline assembled"
        );
        Ok(Self {
            aggregator,
            transfer,
            output,
        })
    }

    pub fn aggregator(&self) -> &ValueAggregator {
        &self.aggregator
    }

    pub fn transfer_spec(&self) -> &TransferSpec {
        &self.transfer
    }

    pub fn output_kind(&self) -> ValueKind {
        self.output
    }

    pub fn aggregate(
        &self,
        renderer: &Renderer,
        glyphs: &dyn Glyphset<Value>,
        view: &AffineTransform,
        width: usize,
        height: usize,
    ) -> Result<FlatAggregates<Value>> {
        renderer.aggregate(glyphs, &self.aggregator, view, width, height)
    }

    /// Runs the configured transfer over aggregates this pipeline produced.
    pub fn transfer(
        &self,
        renderer: &Renderer,
        aggregates: &FlatAggregates<Value>,
    ) -> Result<FlatAggregates<Value>> {
        let produced = self.aggregator.output_kind();
        if let Some(bad) = values::<Value, _>(aggregates).find(|v| v.kind() != produced) {
            return Err(mismatch("aggregates for transfer", produced, bad.kind()));
        }
        debug!(transfer = self.transfer.name(), "Running transfer");

        match &self.transfer {
            TransferSpec::Echo => renderer.transfer(aggregates, &Echo::new(produced.zero())),
            TransferSpec::Present { present, absent } => {
                let out = renderer.transfer(aggregates, &Present::new(*present, *absent))?;
                Ok(out.map(|c| Value::Color(*c)))
            }
            TransferSpec::Interpolate { low, high } => {
                let numeric = numeric(aggregates);
                let out = renderer.transfer(&numeric, &Interpolate::new(*low, *high))?;
                Ok(out.map(|c| Value::Color(*c)))
            }
            TransferSpec::Threshold { above, pass, fail } => {
                let above = *above;
                let numeric = numeric(aggregates);
                let threshold = If::values(move |v: &f64| *v > above, *pass, *fail);
                let out = renderer.transfer(&numeric, &threshold)?;
                Ok(out.map(|c| Value::Color(*c)))
            }
            TransferSpec::IsoContour { threshold } => {
                self.contour(renderer, aggregates, &IsoContour::new(*threshold, 0.0))
            }
            TransferSpec::Contours { levels } => {
                self.contour(renderer, aggregates, &NContours::new(*levels, 0.0))
            }
            TransferSpec::SpacedContours { spacing, floor } => self.contour(
                renderer,
                aggregates,
                &SpacedContours::new(*spacing, *floor, 0.0),
            ),
        }
    }

    /// Aggregation followed by the transfer.
    pub fn run(
        &self,
        renderer: &Renderer,
        glyphs: &dyn Glyphset<Value>,
        view: &AffineTransform,
        width: usize,
        height: usize,
    ) -> Result<FlatAggregates<Value>> {
        let aggregates = self.aggregate(renderer, glyphs, view, width, height)?;
        self.transfer(renderer, &aggregates)
    }

    fn contour(
        &self,
        renderer: &Renderer,
        aggregates: &FlatAggregates<Value>,
        transfer: &dyn Transfer<f64, f64>,
    ) -> Result<FlatAggregates<Value>> {
        let numeric = numeric(aggregates);
        let out = renderer.transfer(&numeric, transfer)?;
        Ok(out.map(|v| Value::Float(*v)))
    }
}

/// Numeric view of a grid already checked to hold ints or floats.
fn numeric(aggregates: &FlatAggregates<Value>) -> FlatAggregates<f64> {
    aggregates.map(|v| v.as_f64().unwrap_or(0.0))
}
