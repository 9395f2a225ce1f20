//! Multi-assignment quadtree over glyph bounds.
//!
//! Glyphs are never clipped: a glyph is stored in every leaf its bounds touch, so leaves
//! hold `GlyphId` handles into one glyph arena and whole-tree collections deduplicate by
//! handle. Nodes live by value in a node arena; promoting a leaf overwrites its slot with
//! an inner node.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RenderError, Result};
use crate::geometry::{Point, Rect};
use crate::glyph::{Glyph, Glyphset};
use once_cell::sync::OnceCell;

/// Tuning knobs for the quadtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadTreeConfig {
    /// Items a leaf holds before a split is considered
    pub loading: usize,
    /// Fraction of a leaf's items that must fall in a single quadrant for a split to pay off
    pub split_ratio: f64,
    /// Children smaller than this along both axes are never created
    pub min_dimension: f64,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            loading: 16,
            split_ratio: 0.5,
            min_dimension: 0.0001,
        }
    }
}

impl QuadTreeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.loading == 0 {
            return Err(RenderError::InvalidParameter(
                "quadtree loading must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.split_ratio) {
            return Err(RenderError::InvalidParameter(format!(
                "split_ratio must be in [0, 1), got {}",
                self.split_ratio
            )));
        }
        if !(self.min_dimension > 0.0) {
            return Err(RenderError::InvalidParameter(format!(
                "min_dimension must be positive, got {}",
                self.min_dimension
            )));
        }
        Ok(())
    }
}

/// Handle to a glyph stored in the tree's glyph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlyphId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

#[derive(Debug)]
struct Leaf {
    bounds: Rect,
    /// Candidate quadrants, `None` once the floor is reached
    subs: Option<[Rect; 4]>,
    items: Vec<GlyphId>,
    /// Items whose bounds touch more than one candidate quadrant
    multi_sub_items: usize,
}

impl Leaf {
    fn new(bounds: Rect, min_dimension: f64) -> Self {
        // Flat data has one degenerate axis, so only stop once both halves are tiny.
        let at_bottom =
            bounds.width() / 2.0 < min_dimension && bounds.height() / 2.0 < min_dimension;
        Self {
            bounds,
            subs: if at_bottom { None } else { Some(bounds.quadrants()) },
            items: Vec::new(),
            multi_sub_items: 0,
        }
    }

    fn at_bottom(&self) -> bool {
        self.subs.is_none()
    }

    /// More than `ratio` of the items would be uniquely assigned to one quadrant.
    fn advantageous_split(&self, ratio: f64) -> bool {
        let unique = self.items.len() - self.multi_sub_items;
        unique as f64 > self.items.len() as f64 * ratio
    }

    fn should_split(&self, config: &QuadTreeConfig) -> bool {
        !self.at_bottom()
            && self.items.len() >= config.loading
            && self.advantageous_split(config.split_ratio)
    }

    fn spans_subs(&self, glyph_bounds: &Rect) -> bool {
        self.subs.as_ref().is_some_and(|subs| {
            subs.iter().filter(|q| q.intersects(glyph_bounds)).count() > 1
        })
    }

    fn push(&mut self, id: GlyphId, glyph_bounds: &Rect) {
        if self.spans_subs(glyph_bounds) {
            self.multi_sub_items += 1;
        }
        self.items.push(id);
    }

    fn remove(&mut self, id: GlyphId, glyph_bounds: &Rect) {
        let before = self.items.len();
        self.items.retain(|item| *item != id);
        if self.items.len() < before && self.spans_subs(glyph_bounds) {
            self.multi_sub_items = self.multi_sub_items.saturating_sub(1);
        }
    }
}

#[derive(Debug)]
struct Inner {
    bounds: Rect,
    /// NW, NE, SW, SE
    children: [NodeId; 4],
}

#[derive(Debug)]
enum Node {
    Leaf(Leaf),
    Inner(Inner),
}

impl Node {
    fn bounds(&self) -> &Rect {
        match self {
            Node::Leaf(leaf) => &leaf.bounds,
            Node::Inner(inner) => &inner.bounds,
        }
    }
}

/// Structural statistics for a quadtree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeStats {
    pub leaf_nodes: usize,
    pub inner_nodes: usize,
    pub max_depth: usize,
    /// Sum of leaf loads; counts duplicated glyphs once per leaf
    pub stored_handles: usize,
    pub max_leaf_load: usize,
}

/// Read-only view of one leaf, for inspection and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafInfo {
    pub bounds: Rect,
    pub load: usize,
    pub multi_sub_items: usize,
    pub at_bottom: bool,
}

/// Quadtree glyph index.
#[derive(Debug)]
pub struct QuadTree<V> {
    config: QuadTreeConfig,
    nodes: Vec<Node>,
    glyphs: Vec<Glyph<V>>,
    bounds: OnceCell<Option<Rect>>,
}

const ROOT: NodeId = NodeId(0);

impl<V> QuadTree<V> {
    /// Creates an empty tree covering `concern`.
    pub fn new(config: QuadTreeConfig, concern: Rect) -> Result<Self> {
        config.validate()?;
        let root = Leaf::new(concern, config.min_dimension);
        Ok(Self {
            config,
            nodes: vec![Node::Leaf(root)],
            glyphs: Vec::new(),
            bounds: OnceCell::new(),
        })
    }

    /// Builds a tree whose concern region covers every glyph.
    pub fn build<I>(config: QuadTreeConfig, glyphs: I) -> Result<Self>
    where
        I: IntoIterator<Item = Glyph<V>>,
    {
        let glyphs: Vec<Glyph<V>> = glyphs.into_iter().collect();
        let bounds = Rect::union_all(glyphs.iter().map(Glyph::bounds))
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 1.0, 1.0));
        // Grow past max edges so glyphs touching them stay inside the half-open region.
        let margin = config.min_dimension.max(bounds.width().max(bounds.height()) * 1e-9);
        let concern = Rect {
            min_x: bounds.min_x,
            min_y: bounds.min_y,
            max_x: bounds.max_x + margin,
            max_y: bounds.max_y + margin,
        };
        let mut tree = Self::new(config, concern)?;
        for glyph in glyphs {
            tree.add(glyph)?;
        }
        debug!(
            glyphs = tree.glyphs.len(),
            nodes = tree.nodes.len(),
            "Built quadtree index"
        );
        Ok(tree)
    }

    pub fn concern_bounds(&self) -> Rect {
        *self.nodes[ROOT.0].bounds()
    }

    /// Inserts a glyph, promoting leaves as needed.
    pub fn add(&mut self, glyph: Glyph<V>) -> Result<GlyphId> {
        let glyph_bounds = glyph.bounds();
        let concern = self.concern_bounds();
        if !concern.intersects(&glyph_bounds) {
            return Err(RenderError::OutsideConcern {
                glyph: glyph_bounds,
                concern,
            });
        }
        let id = GlyphId(self.glyphs.len());
        self.glyphs.push(glyph);
        if let Err(e) = self.insert(ROOT, id) {
            self.discard(id, &glyph_bounds);
            return Err(e);
        }
        self.bounds.take();
        Ok(id)
    }

    /// Drops the most recently pushed glyph and every handle to it.
    fn discard(&mut self, id: GlyphId, glyph_bounds: &Rect) {
        self.glyphs.truncate(id.0);
        for node in &mut self.nodes {
            if let Node::Leaf(leaf) = node {
                leaf.remove(id, glyph_bounds);
            }
        }
    }

    fn insert(&mut self, node: NodeId, id: GlyphId) -> Result<()> {
        let glyph_bounds = self.glyphs[id.0].bounds();
        let split = match &mut self.nodes[node.0] {
            Node::Inner(inner) => {
                let (concern, children) = (inner.bounds, inner.children);
                return self.insert_into_children(concern, children, id, &glyph_bounds);
            }
            Node::Leaf(leaf) if leaf.should_split(&self.config) => true,
            Node::Leaf(leaf) => {
                leaf.push(id, &glyph_bounds);
                false
            }
        };
        if split {
            self.promote(node)?;
            self.insert(node, id)
        } else {
            Ok(())
        }
    }

    fn insert_into_children(
        &mut self,
        concern: Rect,
        children: [NodeId; 4],
        id: GlyphId,
        glyph_bounds: &Rect,
    ) -> Result<()> {
        let mut added = false;
        for child in children {
            if self.nodes[child.0].bounds().intersects(glyph_bounds) {
                self.insert(child, id)?;
                added = true;
            }
        }
        if !added {
            error!(glyph = %glyph_bounds, concern = %concern, "Glyph touched no child quadrant");
            return Err(RenderError::TopologyViolation {
                glyph: *glyph_bounds,
                concern,
            });
        }
        Ok(())
    }

    /// Replaces a leaf with an inner node and redistributes its items.
    fn promote(&mut self, node: NodeId) -> Result<()> {
        let (bounds, items, subs) = match &mut self.nodes[node.0] {
            Node::Leaf(leaf) => match leaf.subs {
                Some(subs) => (leaf.bounds, std::mem::take(&mut leaf.items), subs),
                None => return Ok(()),
            },
            Node::Inner(_) => return Ok(()),
        };

        let first = self.nodes.len();
        for sub in subs {
            self.nodes
                .push(Node::Leaf(Leaf::new(sub, self.config.min_dimension)));
        }
        let children = [
            NodeId(first),
            NodeId(first + 1),
            NodeId(first + 2),
            NodeId(first + 3),
        ];
        self.nodes[node.0] = Node::Inner(Inner { bounds, children });
        debug!(concern = %bounds, items = items.len(), "Promoted quadtree leaf");

        for item in items {
            self.insert(node, item)?;
        }
        Ok(())
    }

    /// Distinct glyph handles reachable from the root, in insertion order.
    fn collect_ids<F>(&self, mut visit_leaf: F) -> Vec<GlyphId>
    where
        F: FnMut(&Leaf, &mut Vec<GlyphId>),
    {
        let mut ids = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(node) = stack.pop() {
            match &self.nodes[node.0] {
                Node::Leaf(leaf) => visit_leaf(leaf, &mut ids),
                Node::Inner(inner) => stack.extend(inner.children),
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Every glyph, each exactly once.
    pub fn items(&self) -> Vec<&Glyph<V>> {
        self.collect_ids(|leaf, ids| ids.extend_from_slice(&leaf.items))
            .into_iter()
            .map(|id| &self.glyphs[id.0])
            .collect()
    }

    /// Glyphs whose shape contains `p`.
    pub fn containing(&self, p: Point) -> Vec<&Glyph<V>> {
        let mut ids: Vec<GlyphId> = Vec::new();
        let mut node = ROOT;
        loop {
            match &self.nodes[node.0] {
                Node::Leaf(leaf) => {
                    ids.extend(
                        leaf.items
                            .iter()
                            .copied()
                            .filter(|id| self.glyphs[id.0].shape().contains(p)),
                    );
                    break;
                }
                Node::Inner(inner) => {
                    match inner
                        .children
                        .iter()
                        .find(|child| self.nodes[child.0].bounds().contains(p))
                    {
                        Some(child) => node = *child,
                        None => break,
                    }
                }
            }
        }
        ids.into_iter().map(|id| &self.glyphs[id.0]).collect()
    }

    /// Glyphs whose shape touches `region`, each exactly once, in insertion order.
    pub fn query(&self, region: &Rect) -> Vec<&Glyph<V>> {
        let mut ids: Vec<GlyphId> = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(node) = stack.pop() {
            let node = &self.nodes[node.0];
            if !node.bounds().intersects(region) {
                continue;
            }
            match node {
                Node::Leaf(leaf) => ids.extend(
                    leaf.items
                        .iter()
                        .copied()
                        .filter(|id| self.glyphs[id.0].shape().intersects(region)),
                ),
                Node::Inner(inner) => stack.extend(inner.children),
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| &self.glyphs[id.0]).collect()
    }

    pub fn leaves(&self) -> Vec<LeafInfo> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Leaf(leaf) => Some(LeafInfo {
                    bounds: leaf.bounds,
                    load: leaf.items.len(),
                    multi_sub_items: leaf.multi_sub_items,
                    at_bottom: leaf.at_bottom(),
                }),
                Node::Inner(_) => None,
            })
            .collect()
    }

    /// Gets statistics about the tree's structure
    pub fn stats(&self) -> NodeStats {
        let mut stats = NodeStats::default();
        let mut stack = vec![(ROOT, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            stats.max_depth = stats.max_depth.max(depth);
            match &self.nodes[node.0] {
                Node::Leaf(leaf) => {
                    stats.leaf_nodes += 1;
                    stats.stored_handles += leaf.items.len();
                    stats.max_leaf_load = stats.max_leaf_load.max(leaf.items.len());
                }
                Node::Inner(inner) => {
                    stats.inner_nodes += 1;
                    stack.extend(inner.children.iter().map(|c| (*c, depth + 1)));
                }
            }
        }
        stats
    }
}

impl<V: Send + Sync> Glyphset<V> for QuadTree<V> {
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
        self.query(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(loading: usize) -> QuadTreeConfig {
        QuadTreeConfig {
            loading,
            ..QuadTreeConfig::default()
        }
    }

    fn point_glyph(x: f64, y: f64, value: i32) -> Glyph<i32> {
        Glyph::new(Rect::point(Point::new(x, y)), value)
    }

    #[test]
    fn test_quadtree_subdivision() {
        let mut tree = QuadTree::new(config(8), Rect::new(0.0, 0.0, 1000.0, 1000.0)).unwrap();

        for i in 0..20 {
            tree.add(point_glyph(i as f64 * 50.0, i as f64 * 50.0, i)).unwrap();
        }

        let stats = tree.stats();
        assert!(stats.max_depth > 0, "Tree should have subdivided");
        assert!(stats.inner_nodes > 0, "Should have inner nodes");
        assert_eq!(tree.items().len(), 20);
        assert_eq!(tree.size(), 20);
    }

    #[test]
    fn test_leaf_load_respects_loading_for_unique_items() {
        let mut tree = QuadTree::new(config(4), Rect::new(0.0, 0.0, 64.0, 64.0)).unwrap();
        for i in 0..200 {
            let x = (i * 37 % 64) as f64 + 0.25;
            let y = (i * 11 % 64) as f64 + 0.5;
            tree.add(point_glyph(x, y, i)).unwrap();
        }
        for leaf in tree.leaves() {
            assert!(
                leaf.load <= 4 || leaf.at_bottom,
                "leaf {} holds {} items",
                leaf.bounds,
                leaf.load
            );
        }
    }

    #[test]
    fn test_spanning_glyphs_do_not_force_split() {
        let mut tree = QuadTree::new(config(2), Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        for i in 0..10 {
            tree.add(Glyph::new(Rect::new(1.0, 1.0, 8.0, 8.0), i)).unwrap();
        }
        let stats = tree.stats();
        assert_eq!(stats.inner_nodes, 0);
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].load, 10);
        assert_eq!(leaves[0].multi_sub_items, 10);
    }

    #[test]
    fn test_glyphs_duplicated_across_leaves_are_reported_once() {
        let mut tree = QuadTree::new(config(1), Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        tree.add(point_glyph(1.0, 1.0, 0)).unwrap();
        tree.add(point_glyph(9.0, 9.0, 1)).unwrap();
        tree.add(Glyph::new(Rect::new(2.0, 2.0, 6.0, 6.0), 2)).unwrap();

        let stats = tree.stats();
        assert!(stats.stored_handles > 3, "spanning glyph should be stored in several leaves");
        let values: Vec<i32> = tree.items().into_iter().map(|g| *g.value()).collect();
        assert_eq!(values, vec![0, 1, 2]);
        let hits: Vec<i32> = tree
            .query(&Rect::new(0.0, 0.0, 10.0, 10.0))
            .into_iter()
            .map(|g| *g.value())
            .collect();
        assert_eq!(hits, vec![0, 1, 2]);
    }

    #[test]
    fn test_containing_matches_linear_scan() {
        let mut tree = QuadTree::new(config(3), Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        for i in 0..60 {
            let x = (i * 13 % 90) as f64;
            let y = (i * 29 % 90) as f64;
            tree.add(Glyph::new(Rect::new(x, y, 7.0, 5.0), i)).unwrap();
        }
        for point in [Point::new(10.5, 20.5), Point::new(50.0, 50.0), Point::new(3.0, 88.0)] {
            let mut expected: Vec<i32> = tree
                .iter()
                .filter(|g| g.shape().contains(point))
                .map(|g| *g.value())
                .collect();
            let mut found: Vec<i32> = tree.containing(point).into_iter().map(|g| *g.value()).collect();
            expected.sort_unstable();
            found.sort_unstable();
            assert_eq!(found, expected, "point {point:?}");
        }
    }

    #[test]
    fn test_bounds_checking() {
        let mut tree = QuadTree::new(config(4), Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        let result = tree.add(point_glyph(200.0, 200.0, 0));
        assert!(matches!(result, Err(RenderError::OutsideConcern { .. })));
        assert_eq!(tree.size(), 0);
    }

    #[test]
    fn test_minimum_dimension_stops_subdivision() {
        let cfg = QuadTreeConfig {
            loading: 1,
            split_ratio: 0.5,
            min_dimension: 1.0,
        };
        let mut tree = QuadTree::new(cfg, Rect::new(0.0, 0.0, 4.0, 4.0)).unwrap();
        for i in 0..50 {
            tree.add(point_glyph(0.1 + i as f64 * 0.001, 0.1, i)).unwrap();
        }
        let stats = tree.stats();
        assert!(stats.max_depth <= 2, "depth {} exceeds the floor", stats.max_depth);
        assert_eq!(tree.items().len(), 50);
        assert!(tree.leaves().iter().any(|l| l.at_bottom && l.load == 50));
    }

    #[test]
    fn test_collinear_points_still_subdivide() {
        let glyphs = (0..1000).map(|i| point_glyph(i as f64, 0.0, i));
        let tree = QuadTree::build(QuadTreeConfig::default(), glyphs).unwrap();
        assert!(tree.concern_bounds().height() < 0.001);

        let stats = tree.stats();
        assert!(stats.inner_nodes > 0, "flat data should still split");
        assert!(stats.max_leaf_load <= 16, "max leaf load {}", stats.max_leaf_load);
        assert_eq!(tree.items().len(), 1000);

        let hits = tree.query(&Rect::new(100.5, -1.0, 10.0, 2.0));
        let values: Vec<i32> = hits.into_iter().map(|g| *g.value()).collect();
        assert_eq!(values, (101..111).collect::<Vec<_>>());
        assert_eq!(tree.containing(Point::new(500.0, 0.0)).len(), 1);
    }

    #[test]
    fn test_failed_insert_leaves_no_orphan() {
        let mut tree = QuadTree::new(config(16), Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        // An inner node whose children only tile its low corner.
        tree.nodes[0] = Node::Inner(Inner {
            bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
            children: [NodeId(1), NodeId(2), NodeId(3), NodeId(4)],
        });
        for quadrant in Rect::new(0.0, 0.0, 5.0, 5.0).quadrants() {
            tree.nodes.push(Node::Leaf(Leaf::new(quadrant, 1.0)));
        }
        tree.add(point_glyph(1.0, 1.0, 1)).unwrap();

        let result = tree.add(point_glyph(8.0, 8.0, 2));
        assert!(matches!(result, Err(RenderError::TopologyViolation { .. })));
        assert_eq!(tree.size(), 1);
        let values: Vec<i32> = tree.items().into_iter().map(|g| *g.value()).collect();
        assert_eq!(values, vec![1]);
        assert_eq!(tree.stats().stored_handles, 1);
    }

    #[test]
    fn test_build_covers_all_glyphs() {
        let glyphs = (0..30).map(|i| point_glyph(i as f64, (i * 2) as f64, i));
        let tree = QuadTree::build(config(4), glyphs).unwrap();
        assert_eq!(tree.size(), 30);
        assert_eq!(
            tree.bounds(),
            Some(Rect::from_corners(Point::new(0.0, 0.0), Point::new(29.0, 58.0)))
        );
        assert_eq!(tree.containing(Point::new(29.0, 58.0)).len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = QuadTreeConfig {
            loading: 0,
            ..QuadTreeConfig::default()
        };
        assert!(QuadTree::<i32>::new(bad, Rect::new(0.0, 0.0, 1.0, 1.0)).is_err());
    }
}
