//! The note graph service: one store, layout, viewport and selection bound to
//! a [`Scene`] and a [`KeyValueStore`].
//!
//! Every CRUD call validates through the store, then the service drains the
//! store's change events to seed positions, re-heat the layout, keep the
//! selection and focus pin consistent, persist, and re-sync the scene.
//! Simulation and camera animation advance in [`NoteGraph::frame`].

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::geometry::{HalfExtent, Point, Transform};
use crate::layout::LayoutEngine;
use crate::layout_dump::GraphDump;
use crate::model::{GraphEvent, Node, Outcome};
use crate::persist::{self, GraphRecord, KeyValueStore};
use crate::scene::{Primitive, Scene, SceneKey};
use crate::selection::Selection;
use crate::store::GraphStore;
use crate::timer::{DisplayTimer, ExpiryAction};
use crate::viewport::{NoteBox, ViewportController};

pub type SelectionCallback = Box<dyn FnMut(Option<&Node>)>;

/// Nominal frame length used by [`NoteGraph::settle`].
pub const FRAME: Duration = Duration::from_millis(16);

pub struct NoteGraph<S: Scene, K: KeyValueStore> {
    config: Config,
    store: GraphStore,
    layout: LayoutEngine,
    viewport: ViewportController,
    selection: Selection,
    scene: S,
    storage: K,
    on_selection: Option<SelectionCallback>,
    timer: DisplayTimer,
    drawn: BTreeSet<SceneKey>,
    /// Drawn half size per note id, as reported by the scene.
    extents: HashMap<String, HalfExtent>,
}

fn note_boxes<'a>(
    store: &'a GraphStore,
    extents: &'a HashMap<String, HalfExtent>,
    fallback: HalfExtent,
) -> impl Iterator<Item = NoteBox> + 'a {
    store.nodes().iter().map(move |node| {
        let extent = extents.get(&node.id).copied().unwrap_or(fallback);
        (node.position(), extent)
    })
}

impl<S: Scene, K: KeyValueStore> NoteGraph<S, K> {
    /// Build a service and restore whatever graph `storage` holds.
    pub fn new(config: Config, scene: S, storage: K) -> Self {
        let size = scene.size();
        let layout = LayoutEngine::new(config.layout.clone(), size.center());
        let viewport = ViewportController::new(config.viewport.clone(), size);
        let mut graph = Self {
            config,
            store: GraphStore::new(),
            layout,
            viewport,
            selection: Selection::Unselected,
            scene,
            storage,
            on_selection: None,
            timer: DisplayTimer::new(),
            drawn: BTreeSet::new(),
            extents: HashMap::new(),
        };
        graph.load();
        graph
    }

    pub fn with_selection_callback(mut self, callback: impl FnMut(Option<&Node>) + 'static) -> Self {
        self.on_selection = Some(Box::new(callback));
        self
    }

    pub fn on_selection(&mut self, callback: impl FnMut(Option<&Node>) + 'static) {
        self.on_selection = Some(Box::new(callback));
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selection.selected().and_then(|id| self.store.node(id))
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn storage(&self) -> &K {
        &self.storage
    }

    /// Token of the transient display that is still showing, if any.
    pub fn display_token(&self) -> Option<u64> {
        self.timer.active()
    }

    /// Half size of the box drawn for `id`; hit testing and fitting use it too.
    pub fn note_extent(&self, id: &str) -> Option<HalfExtent> {
        self.store.contains(id).then(|| self.extent_of(id))
    }

    fn extent_of(&self, id: &str) -> HalfExtent {
        self.extents
            .get(id)
            .copied()
            .unwrap_or_else(|| self.config.viewport.half_extent())
    }

    /// Measure notes the scene has not sized yet and forget removed ones.
    /// Labels are ids, so a cached extent stays valid for its id.
    fn refresh_extents(&mut self) {
        let store = &self.store;
        self.extents.retain(|id, _| store.contains(id));
        let fallback = self.config.viewport.half_extent();
        for node in self.store.nodes() {
            if !self.extents.contains_key(&node.id) {
                let extent = self.scene.note_extent(&node.id).unwrap_or(fallback);
                self.extents.insert(node.id.clone(), extent);
            }
        }
    }

    pub fn dump(&self) -> GraphDump {
        GraphDump::capture(
            &self.store,
            self.viewport.transform(),
            self.viewport.fit_mode(),
            self.selection.selected(),
        )
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    pub fn add_note(&mut self, id: &str, body: Option<&str>) -> Outcome {
        let result = self.store.add_node(id, body);
        let ok = result.is_ok();
        let outcome = self.finish("add_note", result.into());
        if ok {
            self.zoom_to_fit(None);
        }
        outcome
    }

    pub fn edit_note(
        &mut self,
        current_id: &str,
        new_id: Option<&str>,
        new_body: Option<&str>,
    ) -> Outcome {
        let result = self.store.rename_or_edit(current_id, new_id, new_body);
        self.finish("edit_note", result.into())
    }

    pub fn connect_notes(&mut self, source: &str, target: &str) -> Outcome {
        let result = self.store.add_edge(source, target);
        self.finish("connect_notes", result.into())
    }

    pub fn delete_note(&mut self, id: &str) -> Outcome {
        let result = self.store.delete_node(id);
        self.finish("delete_note", result.into())
    }

    pub fn search_notes(&mut self, query: &str) -> Outcome {
        let message = self.store.highlight_by_substring(query);
        self.finish("search_notes", Outcome::success(message))
    }

    pub fn clear(&mut self) -> Outcome {
        let message = self.store.clear();
        self.finish("clear", Outcome::success(message))
    }

    /// Every note as `{id, body}`; also frames the whole graph.
    pub fn list_notes(&mut self) -> Outcome {
        let notes = self.store.list();
        let message = format!("Found {} note(s). Displaying all nodes.", notes.len());
        let outcome = match serde_json::to_value(&notes) {
            Ok(data) => Outcome::success(message).with_data(data),
            Err(err) => Outcome::failure(err.to_string()),
        };
        if outcome.ok {
            self.zoom_to_fit(None);
        }
        self.finish("list_notes", outcome)
    }

    fn finish(&mut self, operation: &'static str, outcome: Outcome) -> Outcome {
        if !outcome.ok {
            info!(operation, message = %outcome.message, "rejected");
            return outcome;
        }
        info!(operation, message = %outcome.message, "applied");
        if self.absorb_events() {
            self.save();
        }
        self.show_transient(operation == "list_notes");
        outcome
    }

    /// Start (or restart) the transient display that follows a successful
    /// operation. Only a listing resets the zoom when its display expires.
    fn show_transient(&mut self, listing: bool) {
        let storage = &self.config.storage;
        let (duration, action) = if listing {
            (
                storage.display_duration_ms + storage.list_display_bonus_ms,
                ExpiryAction::ResetZoom,
            )
        } else {
            (storage.display_duration_ms, ExpiryAction::Nothing)
        };
        let token = self.timer.arm(Duration::from_millis(duration), action);
        debug!(token, ?action, "transient display armed");
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    pub fn save(&mut self) {
        if let Err(err) = persist::save_graph(&mut self.storage, &self.config.storage.key, &self.store) {
            warn!(error = %err, "could not save graph");
        }
    }

    /// Replace the in-memory graph with the stored one.
    pub fn load(&mut self) {
        let record = persist::load_graph(&self.storage, &self.config.storage.key);
        self.restore(record);
    }

    fn restore(&mut self, record: GraphRecord) {
        let (store, unplaced) = record.into_store();
        self.store = store;
        self.layout.on_cleared();
        for id in &unplaced {
            self.layout.place_node(&mut self.store, id);
        }
        self.layout.reheat();
        if self.selection.clear() {
            self.notify_selection();
        }
        self.refresh_extents();
        self.sync_focus();
        self.sync_scene();
        if !self.store.is_empty() {
            let duration = Duration::from_millis(self.config.storage.load_display_ms);
            let token = self.timer.arm(duration, ExpiryAction::Nothing);
            info!(notes = self.store.len(), token, "showing restored graph");
        }
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Apply pending store events. Returns false when there were none.
    fn absorb_events(&mut self) -> bool {
        let events = self.store.take_events();
        if events.is_empty() {
            return false;
        }
        let mut notify = false;
        for event in &events {
            match event {
                GraphEvent::NodeAdded(id) => self.layout.place_node(&mut self.store, id),
                GraphEvent::NodeRenamed { from, to } => {
                    self.layout.on_renamed(from, to);
                    notify |= self.selection.on_renamed(from, to);
                }
                GraphEvent::BodyChanged(id) => notify |= self.selection.is_selected(id),
                GraphEvent::NodeRemoved { id, .. } => {
                    self.layout.on_removed(id);
                    notify |= self.selection.on_removed(id);
                }
                GraphEvent::Cleared => {
                    self.layout.on_cleared();
                    notify |= self.selection.clear();
                }
                GraphEvent::EdgeAdded(_) | GraphEvent::HighlightChanged => {}
            }
            if event.is_structural() {
                self.layout.reheat();
            }
        }
        self.refresh_extents();
        self.sync_focus();
        if notify {
            self.notify_selection();
        }
        self.sync_scene();
        true
    }

    fn sync_focus(&mut self) {
        let target = self.selection.focus_target(&self.store.highlighted_ids());
        self.layout.set_focus(&mut self.store, target.as_deref());
    }

    fn notify_selection(&mut self) {
        if let Some(callback) = self.on_selection.as_mut() {
            let node = self.selection.selected().and_then(|id| self.store.node(id));
            callback(node);
        }
    }

    fn selection_changed(&mut self) {
        if self.selection.selected().is_some() {
            self.viewport.exit_fit();
        }
        self.sync_focus();
        self.notify_selection();
        self.sync_scene();
    }

    // =========================================================================
    // SCENE
    // =========================================================================

    fn sync_scene(&mut self) {
        let fallback = self.config.viewport.half_extent();
        let selected = self.selection.selected();
        let mut live = BTreeSet::new();

        for edge in self.store.edges() {
            let (Some(from), Some(to)) = (self.store.node(&edge.source), self.store.node(&edge.target))
            else {
                continue;
            };
            let key = SceneKey::Link(edge.key());
            let primitive = Primitive::Link {
                from: from.position(),
                to: to.position(),
            };
            if self.drawn.contains(&key) {
                self.scene.update(&key, primitive);
            } else {
                self.scene.add(key.clone(), primitive);
            }
            live.insert(key);
        }

        for node in self.store.nodes() {
            let key = SceneKey::Note(node.id.clone());
            let primitive = Primitive::Note {
                center: node.position(),
                half_extent: self.extents.get(&node.id).copied().unwrap_or(fallback),
                label: node.id.clone(),
                highlighted: node.highlighted,
                selected: selected == Some(node.id.as_str()),
            };
            if self.drawn.contains(&key) {
                self.scene.update(&key, primitive);
            } else {
                self.scene.add(key.clone(), primitive);
            }
            live.insert(key);
        }

        for stale in self.drawn.difference(&live) {
            self.scene.remove(stale);
        }
        self.drawn = live;
        self.scene.set_transform(self.viewport.transform());
    }

    // =========================================================================
    // FRAMES
    // =========================================================================

    /// Advance simulation, camera and timers by one frame.
    ///
    /// Returns true while anything is still moving.
    pub fn frame(&mut self, dt: Duration) -> bool {
        let was_running = self.layout.is_running();
        let stepped = self.layout.step(&mut self.store);
        if stepped {
            let fallback = self.config.viewport.half_extent();
            self.viewport
                .follow(note_boxes(&self.store, &self.extents, fallback));
        }
        let animated = self.viewport.tick(dt);

        if let Some((token, action)) = self.timer.tick(dt) {
            debug!(token, ?action, "transient display expired");
            if action == ExpiryAction::ResetZoom {
                self.viewport.reset(None);
            }
        }
        if was_running && !self.layout.is_running() {
            self.save();
        }
        if stepped || animated {
            self.sync_scene();
        }
        self.layout.is_running() || self.viewport.is_animating()
    }

    /// Run frames until the layout and camera are at rest, or `max_frames`.
    pub fn settle(&mut self, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.frame(FRAME) {
            frames += 1;
        }
        frames
    }

    // =========================================================================
    // CAMERA
    // =========================================================================

    pub fn zoom_to_fit(&mut self, duration: Option<Duration>) {
        let fallback = self.config.viewport.half_extent();
        self.viewport
            .fit_to_bounds(note_boxes(&self.store, &self.extents, fallback), duration);
        self.scene.set_transform(self.viewport.transform());
    }

    pub fn reset_zoom(&mut self, duration: Option<Duration>) {
        self.viewport.reset(duration);
        self.scene.set_transform(self.viewport.transform());
    }

    /// Re-read the scene size and re-run the active camera mode against it.
    pub fn resize(&mut self) {
        let size = self.scene.size();
        self.layout.set_center(&mut self.store, size.center());
        let fallback = self.config.viewport.half_extent();
        self.viewport
            .resize(size, note_boxes(&self.store, &self.extents, fallback));
        self.sync_scene();
    }

    // =========================================================================
    // POINTER INPUT
    // =========================================================================

    fn hit(&self, screen: Point) -> Option<String> {
        let world = self.viewport.screen_to_world(screen);
        self.layout
            .node_at(&self.store, world, |node| self.extent_of(&node.id))
            .map(|node| node.id.clone())
    }

    /// Click at a screen position: selects the note under it, or clears the
    /// selection on empty canvas.
    pub fn click_at(&mut self, screen: Point) {
        match self.hit(screen) {
            Some(id) => {
                self.click_node(&id);
            }
            None => self.click_empty(),
        }
    }

    pub fn click_node(&mut self, id: &str) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        self.selection.click_node(id);
        self.selection_changed();
        true
    }

    pub fn click_empty(&mut self) {
        if self.selection.click_empty() {
            self.selection_changed();
        }
    }

    /// Start dragging whatever note is under `screen`.
    pub fn drag_start(&mut self, screen: Point) -> bool {
        match self.hit(screen) {
            Some(id) => self.drag_node(&id),
            None => false,
        }
    }

    pub fn drag_node(&mut self, id: &str) -> bool {
        if !self.layout.begin_drag(&mut self.store, id) {
            return false;
        }
        self.viewport.exit_fit();
        debug!(id, "drag started");
        true
    }

    pub fn drag_move(&mut self, screen: Point) {
        let world = self.viewport.screen_to_world(screen);
        self.layout.drag_to(&mut self.store, world);
        self.sync_scene();
    }

    pub fn drag_end(&mut self) {
        if let Some(id) = self.layout.end_drag(&mut self.store) {
            debug!(id, "drag ended");
            self.save();
            self.sync_scene();
        }
    }
}
