//! Glyphs and the collections that hold them.

use once_cell::sync::OnceCell;

use crate::geometry::{Rect, Shape};

/// A shape paired with a value. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph<V> {
    shape: Shape,
    value: V,
}

impl<V> Glyph<V> {
    pub fn new(shape: impl Into<Shape>, value: V) -> Self {
        Self {
            shape: shape.into(),
            value,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn bounds(&self) -> Rect {
        self.shape.bounds()
    }
}

/// Read access to a collection of glyphs.
///
/// Implementations are shared between concurrent renders, so every query takes `&self`.
pub trait Glyphset<V>: Send + Sync {
    /// Tight union of every glyph's bounds, `None` when empty.
    fn bounds(&self) -> Option<Rect>;

    /// Number of distinct glyphs.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Glyph<V>> + '_>;

    /// Distinct glyphs whose shape touches `region`, in insertion order.
    fn intersects(&self, region: &Rect) -> Vec<&Glyph<V>>;
}

/// Flat list of glyphs answering region queries by linear scan.
#[derive(Debug)]
pub struct GlyphList<V> {
    glyphs: Vec<Glyph<V>>,
    bounds: OnceCell<Option<Rect>>,
}

impl<V> Default for GlyphList<V> {
    fn default() -> Self {
        Self {
            glyphs: Vec::new(),
            bounds: OnceCell::new(),
        }
    }
}

impl<V> GlyphList<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, glyph: Glyph<V>) {
        self.glyphs.push(glyph);
        self.bounds.take();
    }

    pub fn get(&self, index: usize) -> Option<&Glyph<V>> {
        self.glyphs.get(index)
    }
}

impl<V> FromIterator<Glyph<V>> for GlyphList<V> {
    fn from_iter<I: IntoIterator<Item = Glyph<V>>>(iter: I) -> Self {
        Self {
            glyphs: iter.into_iter().collect(),
            bounds: OnceCell::new(),
        }
    }
}

impl<V: Send + Sync> Glyphset<V> for GlyphList<V> {
    fn bounds(&self) -> Option<Rect> {
        *self
            .bounds
            .get_or_init(|| Rect::union_all(self.glyphs.iter().map(Glyph::bounds)))
    }

    fn size(&self) -> usize {
        self.glyphs.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Glyph<V>> + '_> {
        Box::new(self.glyphs.iter())
    }

    fn intersects(&self, region: &Rect) -> Vec<&Glyph<V>> {
        self.glyphs
            .iter()
            .filter(|g| g.shape().intersects(region))
            .collect()
    }
}
