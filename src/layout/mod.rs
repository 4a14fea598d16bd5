//! Force-directed layout for the note graph.
//!
//! The engine steps once per frame while its temperature (`alpha`) is above
//! `alpha_min`, then idles until something re-heats it: a structural change,
//! a drag, or a change of the focus pin.
//!
//! Node positions live on the [`Node`] records inside the [`GraphStore`]; the
//! engine only keeps the simulation state around them (temperature, the drag
//! and focus trackers, and the seeded placement RNG).
//!
//! ```ignore
//! let mut engine = LayoutEngine::new(LayoutConfig::default(), size.center());
//! engine.place_node(&mut store, "Rust");
//! // Each frame:
//! engine.step(&mut store);
//! ```

mod forces;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::geometry::{HalfExtent, Point};
use crate::model::Node;
use crate::store::GraphStore;

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
    alpha: f32,
    alpha_target: f32,
    center: Point,
    rng: StdRng,
    dragging: Option<String>,
    focus: Option<String>,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig, center: Point) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            alpha: 1.0,
            alpha_target: 0.0,
            center,
            rng,
            dragging: None,
            focus: None,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn center(&self) -> Point {
        self.center
    }

    /// Id of the node currently pinned by focus, if any.
    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.alpha >= self.config.alpha_min || self.alpha_target > 0.0
    }

    pub fn reheat(&mut self) {
        self.alpha = self.alpha.max(self.config.alpha_restart);
    }

    // =========================================================================
    // PLACEMENT
    // =========================================================================

    /// Seed a position for `id`: near the centroid of the other nodes, or
    /// around the center when it is the only node.
    pub fn place_node(&mut self, store: &mut GraphStore, id: &str) {
        let others: Vec<Point> = store
            .nodes()
            .iter()
            .filter(|node| node.id != id)
            .map(Node::position)
            .collect();
        let anchor = if others.is_empty() {
            self.center
        } else {
            let n = others.len() as f32;
            let (sx, sy) = others
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
            Point::new(sx / n, sy / n)
        };

        let jitter = self.config.placement_jitter.max(0.0);
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = self.rng.gen_range(jitter * 0.5..=jitter);
        let at = Point::new(
            anchor.x + angle.cos() * radius,
            anchor.y + angle.sin() * radius,
        );

        if let Some(node) = store.node_mut(id) {
            node.x = at.x;
            node.y = at.y;
            node.vx = 0.0;
            node.vy = 0.0;
            debug!(id, x = at.x, y = at.y, "placed note");
        }
        self.reheat();
    }

    // =========================================================================
    // SIMULATION
    // =========================================================================

    /// Advance one step. Returns false when the engine is idle.
    pub fn step(&mut self, store: &mut GraphStore) -> bool {
        if !self.is_running() {
            return false;
        }
        if store.is_empty() {
            self.alpha = 0.0;
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        let links: Vec<(usize, usize)> = store
            .edges()
            .iter()
            .filter_map(|edge| Some((store.index_of(&edge.source)?, store.index_of(&edge.target)?)))
            .collect();
        let centering = self.focus.is_none().then_some(self.center);
        let forces = forces::accumulate(store.nodes(), &links, &self.config, centering);

        let keep = 1.0 - self.config.velocity_decay;
        let max_velocity = self.config.max_velocity;
        for (node, (fx, fy)) in store.nodes_mut().iter_mut().zip(forces) {
            if let (Some(px), Some(py)) = (node.fx, node.fy) {
                node.x = px;
                node.y = py;
                node.vx = 0.0;
                node.vy = 0.0;
                continue;
            }
            node.vx = (node.vx + fx * self.alpha) * keep;
            node.vy = (node.vy + fy * self.alpha) * keep;

            let speed = (node.vx * node.vx + node.vy * node.vy).sqrt();
            if speed > max_velocity {
                node.vx *= max_velocity / speed;
                node.vy *= max_velocity / speed;
            }
            node.x += node.vx;
            node.y += node.vy;
        }

        if !self.is_running() {
            debug!(alpha = self.alpha, "layout settled");
        }
        true
    }

    /// Step until idle or `max_steps` is reached. Returns the number of steps run.
    pub fn settle(&mut self, store: &mut GraphStore, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.step(store) {
            steps += 1;
        }
        steps
    }

    // =========================================================================
    // PINNING (focus and drag)
    // =========================================================================

    /// Move the focus pin to `target`, releasing the previous one.
    ///
    /// Returns true when the pinned node changed.
    pub fn set_focus(&mut self, store: &mut GraphStore, target: Option<&str>) -> bool {
        if self.focus.as_deref() == target {
            return false;
        }
        if let Some(previous) = self.focus.take()
            && self.dragging.as_deref() != Some(previous.as_str())
            && let Some(node) = store.node_mut(&previous)
        {
            node.unpin();
        }
        if let Some(id) = target
            && let Some(node) = store.node_mut(id)
        {
            if self.dragging.as_deref() != Some(id) {
                node.pin(self.center);
            }
            self.focus = Some(id.to_string());
        }
        debug!(focus = ?self.focus, "focus pin changed");
        self.reheat();
        true
    }

    /// Recenter the simulation (e.g. on resize), carrying the focus pin along.
    pub fn set_center(&mut self, store: &mut GraphStore, center: Point) {
        self.center = center;
        if let Some(id) = self.focus.clone()
            && self.dragging.as_deref() != Some(id.as_str())
            && let Some(node) = store.node_mut(&id)
        {
            node.pin(center);
        }
        self.reheat();
    }

    pub fn begin_drag(&mut self, store: &mut GraphStore, id: &str) -> bool {
        let Some(node) = store.node_mut(id) else {
            return false;
        };
        let at = node.position();
        node.pin(at);
        self.dragging = Some(id.to_string());
        self.alpha_target = self.config.drag_alpha_target;
        self.reheat();
        true
    }

    pub fn drag_to(&mut self, store: &mut GraphStore, world: Point) {
        if let Some(id) = self.dragging.as_deref()
            && let Some(node) = store.node_mut(id)
        {
            node.pin(world);
        }
    }

    /// Finish a drag. The node is released unless it holds the focus pin, in
    /// which case it snaps back to the center.
    pub fn end_drag(&mut self, store: &mut GraphStore) -> Option<String> {
        let id = self.dragging.take()?;
        self.alpha_target = 0.0;
        if let Some(node) = store.node_mut(&id) {
            if self.focus.as_deref() == Some(id.as_str()) {
                node.pin(self.center);
            } else {
                node.unpin();
            }
        }
        Some(id)
    }

    // =========================================================================
    // STORE CHANGES
    // =========================================================================

    pub fn on_renamed(&mut self, from: &str, to: &str) {
        for tracked in [&mut self.focus, &mut self.dragging] {
            if tracked.as_deref() == Some(from) {
                *tracked = Some(to.to_string());
            }
        }
    }

    pub fn on_removed(&mut self, id: &str) {
        if self.focus.as_deref() == Some(id) {
            self.focus = None;
        }
        if self.dragging.as_deref() == Some(id) {
            self.dragging = None;
            self.alpha_target = 0.0;
        }
        self.reheat();
    }

    pub fn on_cleared(&mut self) {
        self.focus = None;
        self.dragging = None;
        self.alpha_target = 0.0;
    }

    // =========================================================================
    // HIT TESTING
    // =========================================================================

    /// Topmost node whose box contains the world-space point. `extent_of`
    /// gives each node's half size.
    pub fn node_at<'a>(
        &self,
        store: &'a GraphStore,
        world: Point,
        extent_of: impl Fn(&Node) -> HalfExtent,
    ) -> Option<&'a Node> {
        store.nodes().iter().rev().find(|node| {
            let extent = extent_of(node);
            (world.x - node.x).abs() <= extent.x && (world.y - node.y).abs() <= extent.y
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Point = Point { x: 400.0, y: 300.0 };

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LayoutConfig::default(), CENTER)
    }

    fn store_with(ids: &[&str]) -> (GraphStore, LayoutEngine) {
        let mut store = GraphStore::new();
        let mut engine = engine();
        for id in ids {
            store.add_node(id, None).unwrap();
            engine.place_node(&mut store, id);
        }
        store.take_events();
        (store, engine)
    }

    fn set_pos(store: &mut GraphStore, id: &str, x: f32, y: f32) {
        let node = store.node_mut(id).unwrap();
        node.x = x;
        node.y = y;
    }

    fn dist(store: &GraphStore, a: &str, b: &str) -> f32 {
        store
            .node(a)
            .unwrap()
            .position()
            .distance(store.node(b).unwrap().position())
    }

    #[test]
    fn first_node_is_placed_near_center() {
        let (store, engine) = store_with(&["a"]);
        let jitter = engine.config().placement_jitter;
        assert!(store.node("a").unwrap().position().distance(CENTER) <= jitter + 1e-3);
    }

    #[test]
    fn unlinked_nodes_repel() {
        let (mut store, mut engine) = store_with(&["a", "b"]);
        set_pos(&mut store, "a", 390.0, 300.0);
        set_pos(&mut store, "b", 410.0, 300.0);
        let before = dist(&store, "a", "b");
        for _ in 0..50 {
            engine.step(&mut store);
        }
        assert!(dist(&store, "a", "b") > before);
    }

    #[test]
    fn linked_nodes_are_pulled_together() {
        let (mut store, mut engine) = store_with(&["a", "b"]);
        store.add_edge("a", "b").unwrap();
        set_pos(&mut store, "a", -400.0, 300.0);
        set_pos(&mut store, "b", 1200.0, 300.0);
        let before = dist(&store, "a", "b");
        engine.settle(&mut store, 1000);
        let after = dist(&store, "a", "b");
        assert!(after < before);
        assert!(after < 600.0, "settled at {after}");
    }

    #[test]
    fn cools_down_and_idles_until_reheated() {
        let (mut store, mut engine) = store_with(&["a", "b", "c"]);
        let steps = engine.settle(&mut store, 10_000);
        assert!(steps > 0 && steps < 10_000);
        assert!(!engine.is_running());
        assert!(!engine.step(&mut store));

        let frozen = store.node("a").unwrap().position();
        assert!(!engine.step(&mut store));
        assert_eq!(store.node("a").unwrap().position(), frozen);

        engine.reheat();
        assert!(engine.step(&mut store));
    }

    #[test]
    fn same_seed_gives_identical_positions() {
        let run = || {
            let (mut store, mut engine) = store_with(&["a", "b", "c", "d"]);
            store.add_edge("a", "b").unwrap();
            store.add_edge("c", "d").unwrap();
            engine.settle(&mut store, 200);
            store
                .nodes()
                .iter()
                .map(|node| (node.x, node.y))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn pinned_node_does_not_move() {
        let (mut store, mut engine) = store_with(&["a", "b"]);
        store.node_mut("a").unwrap().pin(Point::new(10.0, 20.0));
        for _ in 0..30 {
            engine.step(&mut store);
        }
        assert_eq!(store.node("a").unwrap().position(), Point::new(10.0, 20.0));
    }

    #[test]
    fn drag_pins_then_releases() {
        let (mut store, mut engine) = store_with(&["a", "b"]);
        engine.settle(&mut store, 10_000);
        assert!(engine.begin_drag(&mut store, "a"));
        assert!(engine.is_running());
        engine.drag_to(&mut store, Point::new(5.0, 6.0));
        engine.step(&mut store);
        assert_eq!(store.node("a").unwrap().position(), Point::new(5.0, 6.0));

        assert_eq!(engine.end_drag(&mut store).as_deref(), Some("a"));
        assert!(!store.node("a").unwrap().is_pinned());
    }

    #[test]
    fn dragging_focus_target_snaps_back_to_center() {
        let (mut store, mut engine) = store_with(&["a", "b"]);
        engine.set_focus(&mut store, Some("a"));
        engine.begin_drag(&mut store, "a");
        engine.drag_to(&mut store, Point::new(0.0, 0.0));
        engine.end_drag(&mut store);

        let node = store.node("a").unwrap();
        assert!(node.is_pinned());
        assert_eq!(node.position(), CENTER);
    }

    #[test]
    fn focus_moves_release_previous_pin() {
        let (mut store, mut engine) = store_with(&["a", "b"]);
        assert!(engine.set_focus(&mut store, Some("a")));
        assert!(!engine.set_focus(&mut store, Some("a")));
        assert!(engine.set_focus(&mut store, Some("b")));
        assert!(!store.node("a").unwrap().is_pinned());
        assert_eq!(store.node("b").unwrap().position(), CENTER);

        let pinned = store.nodes().iter().filter(|n| n.is_pinned()).count();
        assert_eq!(pinned, 1);

        engine.set_focus(&mut store, None);
        assert!(store.nodes().iter().all(|n| !n.is_pinned()));
    }

    #[test]
    fn rename_and_removal_update_trackers() {
        let (mut store, mut engine) = store_with(&["a"]);
        engine.set_focus(&mut store, Some("a"));
        engine.on_renamed("a", "z");
        assert_eq!(engine.focus(), Some("z"));
        engine.on_removed("z");
        assert_eq!(engine.focus(), None);
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let (mut store, engine) = store_with(&["a", "b"]);
        set_pos(&mut store, "a", 0.0, 0.0);
        set_pos(&mut store, "b", 10.0, 0.0);
        let extent = |_: &Node| HalfExtent { x: 50.0, y: 20.0 };
        let hit = engine.node_at(&store, Point::new(5.0, 0.0), extent).unwrap();
        assert_eq!(hit.id, "b");
        assert!(engine.node_at(&store, Point::new(500.0, 0.0), extent).is_none());
    }

    #[test]
    fn hit_test_uses_each_node_extent() {
        let (mut store, engine) = store_with(&["wide", "narrow"]);
        set_pos(&mut store, "wide", 0.0, 0.0);
        set_pos(&mut store, "narrow", 0.0, 200.0);
        let extent = |node: &Node| {
            if node.id == "wide" {
                HalfExtent { x: 90.0, y: 20.0 }
            } else {
                HalfExtent { x: 50.0, y: 20.0 }
            }
        };
        let hit = engine.node_at(&store, Point::new(85.0, 0.0), extent).unwrap();
        assert_eq!(hit.id, "wide");
        assert!(engine.node_at(&store, Point::new(60.0, 200.0), extent).is_none());
    }
}
