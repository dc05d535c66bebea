//! Collision tree spatial partitioning structure
//!
//! Divides a bounded 2D region into a hierarchy of grid cells. Each node
//! splits into `degree[0] x degree[1]` cells when it holds more colliders
//! than `cell_capacity`. Colliders only move into a cell that contains their
//! whole bounding box, so straddling colliders stay at the parent.
//!
//! Trees are rebalanced by [`CollisionTree::flush`], which runs once per
//! frame before any query.

use std::collections::VecDeque;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::debug::{CollisionView, ViewShape};
use crate::foundation::collections::{ColliderId, IdPool, NodeKey, TreeId};
use crate::foundation::math::Vec4;
use crate::physics::collider::Collider;
use crate::physics::shapes::Aabb;

/// Configuration for collision tree behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Grid cells per node along x and y
    pub degree: [usize; 2],

    /// Maximum colliders per node before they are pushed into children
    pub cell_capacity: usize,

    /// Maximum subdivision depth (root is depth 0)
    pub max_depth: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            degree: [2, 2],
            cell_capacity: 8,
            max_depth: 8,
        }
    }
}

impl TreeConfig {
    /// Copy with every field clamped to a usable value
    pub fn sanitized(self) -> Self {
        Self {
            degree: [self.degree[0].max(1), self.degree[1].max(1)],
            cell_capacity: self.cell_capacity.max(1),
            max_depth: self.max_depth,
        }
    }

    fn cell_count(&self) -> usize {
        self.degree[0] * self.degree[1]
    }
}

/// Single node in the collision tree hierarchy
#[derive(Debug, Clone)]
pub struct CollisionNode {
    bounds: Aabb,
    depth: u32,
    parent: Option<NodeKey>,
    children: Vec<Option<NodeKey>>,
    colliders: Vec<ColliderId>,
}

impl CollisionNode {
    fn new(bounds: Aabb, depth: u32, parent: Option<NodeKey>, cells: usize) -> Self {
        Self {
            bounds,
            depth,
            parent,
            children: vec![None; cells],
            colliders: Vec::new(),
        }
    }

    /// World-space bounds of this node
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Depth in the tree (0 = root)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Colliders resident in this node
    pub fn colliders(&self) -> &[ColliderId] {
        &self.colliders
    }

    /// Instantiated child cells
    pub fn children(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.children.iter().flatten().copied()
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// Counters of one flush, logged at trace level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Colliders whose world shape was rebaked
    pub refreshed: usize,
    /// Expired residents removed
    pub dropped: usize,
    /// Colliders moved back to the root after leaving their node
    pub rehomed: usize,
    /// Colliders moved into a child cell
    pub pushed_down: usize,
    /// Colliders pulled up when a sparse family of leaves collapsed
    pub pulled_up: usize,
    /// Child nodes removed
    pub pruned: usize,
}

/// Bounded grid tree over the colliders of a world
#[derive(Debug, Clone)]
pub struct CollisionTree {
    id: TreeId,
    bounds: Aabb,
    config: TreeConfig,
    nodes: SlotMap<NodeKey, CollisionNode>,
    root: NodeKey,
}

/// Whether `wrap` may live in a node with bounds `cell`
///
/// Interior cell edges are exclusive, so colliders in sibling subtrees never
/// touch. Edges on the tree's outer bound are inclusive.
#[allow(clippy::float_cmp)]
fn fits(cell: &Aabb, outer: &Aabb, wrap: &Aabb) -> bool {
    // Grid cells snap exactly to the outer edges.
    let low = |edge: f32, outer_edge: f32, v: f32| if edge == outer_edge { v >= edge } else { v > edge };
    let high = |edge: f32, outer_edge: f32, v: f32| if edge == outer_edge { v <= edge } else { v < edge };
    low(cell.min.x, outer.min.x, wrap.min.x)
        && high(cell.max.x, outer.max.x, wrap.max.x)
        && low(cell.min.y, outer.min.y, wrap.min.y)
        && high(cell.max.y, outer.max.y, wrap.max.y)
}

impl CollisionTree {
    /// Create an empty tree covering `bounds`
    pub fn new(id: TreeId, bounds: Aabb, config: TreeConfig) -> Self {
        let config = config.sanitized();
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(CollisionNode::new(bounds, 0, None, config.cell_count()));
        Self {
            id,
            bounds,
            config,
            nodes,
            root,
        }
    }

    /// Handle of this tree
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Region covered by the root node
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Active configuration
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Root node handle
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Look up a node
    pub fn node(&self, key: NodeKey) -> Option<&CollisionNode> {
        self.nodes.get(key)
    }

    /// Number of instantiated nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total resident colliders
    pub fn len(&self) -> usize {
        self.nodes.values().map(|n| n.colliders.len()).sum()
    }

    /// Whether no collider is resident
    pub fn is_empty(&self) -> bool {
        self.nodes.values().all(|n| n.colliders.is_empty())
    }

    /// Attach a collider; it is placed at the root until the next flush
    pub fn attach(&mut self, id: ColliderId, collider: &mut Collider) -> bool {
        if collider.is_attached_to(self.id) {
            return false;
        }
        let Some(root) = self.nodes.get_mut(self.root) else {
            return false;
        };
        root.colliders.push(id);
        collider.set_node(self.id, self.root);
        collider.mark_dirty();
        debug!("Attached collider {:?} to tree {:?}", id, self.id);
        true
    }

    /// Detach a collider; returns whether it was attached
    pub fn detach(&mut self, id: ColliderId, collider: &mut Collider) -> bool {
        match collider.clear_node(self.id) {
            Some(node) => {
                self.evict(id, node);
                debug!("Detached collider {:?} from tree {:?}", id, self.id);
                true
            }
            None => false,
        }
    }

    /// Remove a resident entry without touching the collider itself
    pub(crate) fn evict(&mut self, id: ColliderId, node: NodeKey) -> bool {
        if let Some(node) = self.nodes.get_mut(node) {
            if let Some(index) = node.colliders.iter().position(|c| *c == id) {
                node.colliders.remove(index);
                return true;
            }
        }
        // The recorded node is stale; fall back to a full scan.
        let mut found = false;
        for node in self.nodes.values_mut() {
            let before = node.colliders.len();
            node.colliders.retain(|c| *c != id);
            found |= node.colliders.len() != before;
        }
        found
    }

    /// Node keys in breadth-first order
    fn bfs_order(&self) -> Vec<NodeKey> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root]);
        while let Some(key) = queue.pop_front() {
            if let Some(node) = self.nodes.get(key) {
                order.push(key);
                queue.extend(node.children());
            }
        }
        order
    }

    /// Rebalance the tree against the current collider shapes
    pub fn flush(&mut self, colliders: &mut IdPool<ColliderId, Collider>) -> FlushStats {
        let mut stats = FlushStats::default();
        self.update_pass(colliders, &mut stats);
        self.insert_pass(colliders, &mut stats);
        self.remove_pass(self.root, colliders, &mut stats);
        trace!("Flushed tree {:?}: {:?}", self.id, stats);
        stats
    }

    fn update_pass(&mut self, colliders: &mut IdPool<ColliderId, Collider>, stats: &mut FlushStats) {
        let mut rehome = Vec::new();
        for key in self.bfs_order() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            let residents = std::mem::take(&mut node.colliders);
            let mut kept = Vec::with_capacity(residents.len());
            for id in residents {
                let Some(collider) = colliders.get_mut(id) else {
                    warn!("Dropping expired collider {:?} from tree {:?}", id, self.id);
                    stats.dropped += 1;
                    continue;
                };
                if collider.node_in(self.id) != Some(key) {
                    warn!("Dropping stale residency of collider {:?} in tree {:?}", id, self.id);
                    stats.dropped += 1;
                    continue;
                }
                if collider.refresh() {
                    stats.refreshed += 1;
                }
                if key != self.root && !fits(&node.bounds, &self.bounds, &collider.quad_wrap()) {
                    collider.set_node(self.id, self.root);
                    rehome.push(id);
                } else {
                    kept.push(id);
                }
            }
            node.colliders = kept;
        }
        stats.rehomed = rehome.len();
        if let Some(root) = self.nodes.get_mut(self.root) {
            root.colliders.extend(rehome);
        }
    }

    fn insert_pass(&mut self, colliders: &mut IdPool<ColliderId, Collider>, stats: &mut FlushStats) {
        let mut queue = VecDeque::from([self.root]);
        while let Some(key) = queue.pop_front() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            if node.colliders.len() > self.config.cell_capacity && node.depth < self.config.max_depth {
                self.push_down(key, colliders, stats);
            }
            if let Some(node) = self.nodes.get(key) {
                queue.extend(node.children());
            }
        }
    }

    fn push_down(&mut self, key: NodeKey, colliders: &mut IdPool<ColliderId, Collider>, stats: &mut FlushStats) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        let (bounds, depth) = (node.bounds, node.depth);
        let residents = std::mem::take(&mut node.colliders);
        let mut kept = Vec::with_capacity(residents.len());

        for id in residents {
            let Some(collider) = colliders.get_mut(id) else {
                kept.push(id);
                continue;
            };
            let target = self
                .cell_for(&bounds, &collider.quad_wrap())
                .and_then(|(slot, cell)| self.child_at(key, slot, cell, depth + 1));
            match target.and_then(|child| self.nodes.get_mut(child).map(|n| (child, n))) {
                Some((child, child_node)) => {
                    child_node.colliders.push(id);
                    collider.set_node(self.id, child);
                    stats.pushed_down += 1;
                }
                None => kept.push(id),
            }
        }

        if let Some(node) = self.nodes.get_mut(key) {
            node.colliders = kept;
        }
    }

    /// Grid cell that holds all of `wrap`, as (slot, bounds)
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell_for(&self, bounds: &Aabb, wrap: &Aabb) -> Option<(usize, Aabb)> {
        let [dx, dy] = self.config.degree;
        let size = bounds.size();
        if size.x <= 0.0 || size.y <= 0.0 {
            return None;
        }
        let center = wrap.center();
        let ix = (((center.x - bounds.min.x) / size.x * dx as f32).floor().max(0.0) as usize).min(dx - 1);
        let iy = (((center.y - bounds.min.y) / size.y * dy as f32).floor().max(0.0) as usize).min(dy - 1);
        let cell = bounds.grid_cell(self.config.degree, ix, iy);
        fits(&cell, &self.bounds, wrap).then_some((iy * dx + ix, cell))
    }

    /// Existing child in `slot`, instantiated on first use
    fn child_at(&mut self, parent: NodeKey, slot: usize, bounds: Aabb, depth: u32) -> Option<NodeKey> {
        let existing = self.nodes.get(parent)?.children.get(slot).copied().flatten();
        if let Some(child) = existing.filter(|c| self.nodes.contains_key(*c)) {
            return Some(child);
        }
        let child = self
            .nodes
            .insert(CollisionNode::new(bounds, depth, Some(parent), self.config.cell_count()));
        *self.nodes.get_mut(parent)?.children.get_mut(slot)? = Some(child);
        Some(child)
    }

    fn remove_pass(&mut self, key: NodeKey, colliders: &mut IdPool<ColliderId, Collider>, stats: &mut FlushStats) {
        let children: Vec<NodeKey> = match self.nodes.get(key) {
            Some(node) => node.children().collect(),
            None => return,
        };
        if children.is_empty() {
            return;
        }
        for &child in &children {
            self.remove_pass(child, colliders, stats);
        }

        // Collapse the children into this node when it is underfull and the
        // whole family fits in one cell.
        let resident = self.nodes.get(key).map_or(0, |n| n.colliders.len());
        let family = children.iter().try_fold(resident, |total, child| {
            let node = self.nodes.get(*child)?;
            node.is_leaf().then_some(total + node.colliders.len())
        });
        let collapse = resident < self.config.cell_capacity
            && family.is_some_and(|total| total <= self.config.cell_capacity);

        let mut pulled = Vec::new();
        for (slot, child) in self.nodes.get(key).map(|n| n.children.clone()).unwrap_or_default().into_iter().enumerate() {
            let Some(child) = child else {
                continue;
            };
            let prune = match self.nodes.get_mut(child) {
                Some(node) if collapse => {
                    pulled.append(&mut node.colliders);
                    true
                }
                Some(node) => node.is_leaf() && node.colliders.is_empty(),
                None => true,
            };
            if prune {
                self.nodes.remove(child);
                stats.pruned += 1;
                if let Some(node) = self.nodes.get_mut(key) {
                    node.children[slot] = None;
                }
            }
        }

        for id in &pulled {
            if let Some(collider) = colliders.get_mut(*id) {
                collider.set_node(self.id, key);
            }
        }
        stats.pulled_up += pulled.len();
        if let Some(node) = self.nodes.get_mut(key) {
            node.colliders.extend(pulled);
        }
    }

    /// Breadth-first iterator over colliders in nodes touching `region`
    ///
    /// Results are candidates: a collider is reported when its node touches
    /// the region, whether or not its own bounds do.
    pub fn query(&self, region: &Aabb) -> Query<'_> {
        Query::starting_at(self, self.root, 0, Some(*region))
    }

    /// Iterator over every candidate pair, each reported once
    pub fn pairs(&self) -> Pairs<'_> {
        Pairs {
            tree: self,
            order: self.bfs_order(),
            position: 0,
            index: 0,
            second: None,
        }
    }

    /// Bounds of every node, breadth first
    pub fn node_bounds(&self) -> Vec<Aabb> {
        self.bfs_order()
            .into_iter()
            .filter_map(|key| self.nodes.get(key).map(|n| n.bounds))
            .collect()
    }

    /// Snapshot of the node grid
    pub fn collision_view(&self, color: Vec4) -> CollisionView {
        let mut view = CollisionView::new(color);
        view.set_shapes(self.node_bounds().iter().map(ViewShape::from_aabb));
        view
    }
}

/// Breadth-first walk over resident colliders
#[derive(Debug, Clone)]
pub struct Query<'a> {
    tree: &'a CollisionTree,
    queue: VecDeque<NodeKey>,
    current: &'a [ColliderId],
    region: Option<Aabb>,
}

impl<'a> Query<'a> {
    /// Walk the subtree of `key`, skipping its first `skip` residents
    fn starting_at(tree: &'a CollisionTree, key: NodeKey, skip: usize, region: Option<Aabb>) -> Self {
        let mut query = Self {
            tree,
            queue: VecDeque::new(),
            current: &[],
            region,
        };
        if let Some(node) = tree.nodes.get(key) {
            query.current = node.colliders.get(skip..).unwrap_or(&[]);
            query.enqueue_children(node);
        }
        query
    }

    fn enqueue_children(&mut self, node: &CollisionNode) {
        for child in node.children() {
            let touches = match (&self.region, self.tree.nodes.get(child)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(region), Some(c)) => c.bounds.intersects(region),
            };
            if touches {
                self.queue.push_back(child);
            }
        }
    }
}

impl Iterator for Query<'_> {
    type Item = ColliderId;

    fn next(&mut self) -> Option<ColliderId> {
        loop {
            if let Some((first, rest)) = self.current.split_first() {
                self.current = rest;
                return Some(*first);
            }
            let key = self.queue.pop_front()?;
            let tree = self.tree;
            if let Some(node) = tree.nodes.get(key) {
                self.current = &node.colliders;
                self.enqueue_children(node);
            }
        }
    }
}

/// Duplicate-free candidate pair walk
///
/// The first cursor visits every resident in breadth-first order; for each,
/// the second cursor walks the rest of that node and then its subtree.
#[derive(Debug, Clone)]
pub struct Pairs<'a> {
    tree: &'a CollisionTree,
    order: Vec<NodeKey>,
    position: usize,
    index: usize,
    second: Option<(ColliderId, Query<'a>)>,
}

impl Iterator for Pairs<'_> {
    type Item = (ColliderId, ColliderId);

    fn next(&mut self) -> Option<(ColliderId, ColliderId)> {
        loop {
            if let Some((first, cursor)) = &mut self.second {
                if let Some(second) = cursor.next() {
                    return Some((*first, second));
                }
                self.second = None;
                self.index += 1;
            }
            let key = *self.order.get(self.position)?;
            let residents = self.tree.nodes.get(key).map_or(&[][..], |n| &n.colliders[..]);
            match residents.get(self.index) {
                Some(first) => {
                    let cursor = Query::starting_at(self.tree, key, self.index + 1, None);
                    self.second = Some((*first, cursor));
                }
                None => {
                    self.position += 1;
                    self.index = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform2D, Vec2};
    use crate::physics::primitive::TPrimitive;
    use std::collections::HashSet;

    struct Scene {
        tree: CollisionTree,
        colliders: IdPool<ColliderId, Collider>,
    }

    impl Scene {
        fn new(capacity: usize) -> Self {
            let mut trees: SlotMap<TreeId, ()> = SlotMap::with_key();
            let config = TreeConfig {
                degree: [2, 2],
                cell_capacity: capacity,
                max_depth: 4,
            };
            Self {
                tree: CollisionTree::new(
                    trees.insert(()),
                    Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(16.0, 16.0)),
                    config,
                ),
                colliders: IdPool::new("collider", 64),
            }
        }

        fn add(&mut self, center: Vec2, half: f32) -> ColliderId {
            let shape = Aabb::from_center_extents(Vec2::zeros(), Vec2::new(half, half));
            let matrix = Transform2D::from_position(center).to_matrix();
            let id = self.colliders.insert(Collider::new(TPrimitive::new(shape, matrix))).unwrap();
            let collider = self.colliders.get_mut(id).unwrap();
            assert!(self.tree.attach(id, collider));
            id
        }

        fn assert_resident_once(&self) {
            for (id, collider) in self.colliders.iter() {
                let node_key = collider.node_in(self.tree.id()).unwrap();
                let hits = self
                    .tree
                    .nodes
                    .values()
                    .flat_map(|n| n.colliders.iter())
                    .filter(|c| **c == id)
                    .count();
                assert_eq!(hits, 1);
                let node = self.tree.node(node_key).unwrap();
                assert!(node.colliders().contains(&id));
                if node_key != self.tree.root() {
                    assert!(node.bounds().contains(&collider.quad_wrap()));
                }
            }
        }
    }

    #[test]
    fn test_attach_places_at_root() {
        let mut scene = Scene::new(2);
        let id = scene.add(Vec2::new(2.0, 2.0), 0.5);
        assert_eq!(scene.colliders.get(id).unwrap().node_in(scene.tree.id()), Some(scene.tree.root()));
        let collider = scene.colliders.get_mut(id).unwrap();
        assert!(!scene.tree.attach(id, collider));
    }

    #[test]
    fn test_flush_subdivides_and_keeps_straddlers() {
        let mut scene = Scene::new(2);
        let a = scene.add(Vec2::new(2.0, 2.0), 0.5);
        let b = scene.add(Vec2::new(14.0, 2.0), 0.5);
        let c = scene.add(Vec2::new(2.0, 14.0), 0.5);
        // Straddles the vertical center line.
        let d = scene.add(Vec2::new(8.0, 2.0), 1.0);

        let stats = scene.tree.flush(&mut scene.colliders);
        assert_eq!(stats.pushed_down, 3);
        assert_eq!(scene.tree.node(scene.tree.root()).unwrap().colliders(), &[d]);
        for id in [a, b, c] {
            assert_ne!(scene.colliders.get(id).unwrap().node_in(scene.tree.id()), Some(scene.tree.root()));
        }
        scene.assert_resident_once();
    }

    #[test]
    fn test_moving_collider_is_rehomed_and_leaves_pruned() {
        let mut scene = Scene::new(1);
        let a = scene.add(Vec2::new(2.0, 2.0), 0.5);
        let _b = scene.add(Vec2::new(14.0, 14.0), 0.5);
        scene.tree.flush(&mut scene.colliders);
        let before = scene.tree.node_count();
        assert!(before > 1);

        scene
            .colliders
            .get_mut(a)
            .unwrap()
            .set_matrix(Transform2D::from_position(Vec2::new(8.0, 8.0)).to_matrix())
            .unwrap();
        let stats = scene.tree.flush(&mut scene.colliders);
        assert_eq!(stats.refreshed, 1);
        assert_eq!(stats.rehomed, 1);
        assert!(stats.pruned >= 1);
        scene.assert_resident_once();
    }

    #[test]
    fn test_expired_residents_are_dropped() {
        let mut scene = Scene::new(4);
        let a = scene.add(Vec2::new(2.0, 2.0), 0.5);
        scene.add(Vec2::new(4.0, 2.0), 0.5);
        scene.colliders.remove(a);

        let stats = scene.tree.flush(&mut scene.colliders);
        assert_eq!(stats.dropped, 1);
        assert_eq!(scene.tree.len(), 1);
    }

    #[test]
    fn test_query_and_pairs() {
        let mut scene = Scene::new(1);
        let ids: Vec<ColliderId> = [(2.0, 2.0), (3.0, 2.0), (14.0, 14.0), (8.0, 8.0)]
            .iter()
            .map(|&(x, y)| scene.add(Vec2::new(x, y), 0.75))
            .collect();
        scene.tree.flush(&mut scene.colliders);
        scene.assert_resident_once();

        let found: HashSet<ColliderId> = scene
            .tree
            .query(&Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0)))
            .collect();
        assert!(found.contains(&ids[0]) && found.contains(&ids[1]));
        assert!(!found.contains(&ids[2]));

        let pairs: Vec<(ColliderId, ColliderId)> = scene.tree.pairs().collect();
        let unique: HashSet<(ColliderId, ColliderId)> = pairs
            .iter()
            .map(|&(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect();
        assert_eq!(unique.len(), pairs.len());
        assert!(pairs.iter().all(|(a, b)| a != b));
        let first = if ids[0] < ids[1] { (ids[0], ids[1]) } else { (ids[1], ids[0]) };
        assert!(unique.contains(&first));
    }

    #[test]
    fn test_node_view_lists_every_node() {
        let mut scene = Scene::new(1);
        scene.add(Vec2::new(2.0, 2.0), 0.5);
        scene.add(Vec2::new(14.0, 14.0), 0.5);
        scene.tree.flush(&mut scene.colliders);
        let view = scene.tree.collision_view(Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(view.shapes.len(), scene.tree.node_count());
    }
}
