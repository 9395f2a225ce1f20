//! Spatial indexing for glyph region queries
//!
//! The quadtree answers "which glyphs touch region R" for the renderer, one query per
//! screen cell, and is shared read-only across render workers.

mod quadtree;

pub use quadtree::{GlyphId, LeafInfo, NodeStats, QuadTree, QuadTreeConfig};
