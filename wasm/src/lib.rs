use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use notegraph::{
    Config, KeyValueStore, MemoryStore, NoteGraph, Outcome, Point, SvgScene, Theme, ViewportSize,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    /// Previously exported state to start from.
    state: Option<String>,
}

/// What the selection callback last reported, in a shape JS can consume.
#[derive(Debug, Clone, Serialize)]
struct SelectedNote {
    id: String,
    body: String,
}

fn build_config(options: &GraphOptions, width: f32, height: f32) -> Config {
    let theme = options
        .theme
        .as_deref()
        .and_then(Theme::by_name)
        .unwrap_or_default();
    let mut config = Config::with_theme(theme);
    if let Some(font_family) = &options.font_family {
        config.theme.font_family = font_family.clone();
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    config.render.width = width;
    config.render.height = height;
    config
}

fn to_json(outcome: &Outcome) -> String {
    serde_json::to_string(outcome).unwrap_or_else(|err| failure_json(&err.to_string()))
}

fn failure_json(message: &str) -> String {
    serde_json::json!({ "ok": false, "message": message }).to_string()
}

#[wasm_bindgen]
pub struct WasmNoteGraph {
    graph: NoteGraph<SvgScene, MemoryStore>,
    selection: Rc<RefCell<Option<Option<SelectedNote>>>>,
}

#[wasm_bindgen]
impl WasmNoteGraph {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, options_json: Option<String>) -> Result<WasmNoteGraph, JsValue> {
        let options = match options_json {
            Some(raw) => serde_json::from_str::<GraphOptions>(&raw)
                .map_err(|error| JsValue::from_str(&error.to_string()))?,
            None => GraphOptions::default(),
        };
        let config = build_config(&options, width, height);

        let mut storage = MemoryStore::new();
        if let Some(state) = &options.state {
            storage
                .set(&config.storage.key, state)
                .map_err(|error| JsValue::from_str(&error.to_string()))?;
        }

        let scene = SvgScene::new(config.theme.clone(), config.render.clone());
        let selection = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&selection);
        let graph = NoteGraph::new(config, scene, storage).with_selection_callback(move |node| {
            let note = node.map(|n| SelectedNote {
                id: n.id.clone(),
                body: n.body.clone(),
            });
            *sink.borrow_mut() = Some(note);
        });
        Ok(WasmNoteGraph { graph, selection })
    }

    pub fn add_note(&mut self, id: &str, body: Option<String>) -> String {
        to_json(&self.graph.add_note(id, body.as_deref()))
    }

    pub fn edit_note(&mut self, id: &str, new_id: Option<String>, new_body: Option<String>) -> String {
        to_json(&self.graph.edit_note(id, new_id.as_deref(), new_body.as_deref()))
    }

    pub fn connect_notes(&mut self, source: &str, target: &str) -> String {
        to_json(&self.graph.connect_notes(source, target))
    }

    pub fn delete_note(&mut self, id: &str) -> String {
        to_json(&self.graph.delete_note(id))
    }

    pub fn search_notes(&mut self, query: &str) -> String {
        to_json(&self.graph.search_notes(query))
    }

    pub fn clear(&mut self) -> String {
        to_json(&self.graph.clear())
    }

    pub fn list_notes(&mut self) -> String {
        to_json(&self.graph.list_notes())
    }

    /// Advance one frame; returns true while anything is still moving.
    pub fn frame(&mut self, dt_ms: f64) -> bool {
        self.graph.frame(Duration::from_secs_f64(dt_ms.max(0.0) / 1000.0))
    }

    pub fn click(&mut self, x: f32, y: f32) {
        self.graph.click_at(Point::new(x, y));
    }

    pub fn drag_start(&mut self, x: f32, y: f32) -> bool {
        self.graph.drag_start(Point::new(x, y))
    }

    pub fn drag_move(&mut self, x: f32, y: f32) {
        self.graph.drag_move(Point::new(x, y));
    }

    pub fn drag_end(&mut self) {
        self.graph.drag_end();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.graph.scene_mut().set_size(ViewportSize::new(width, height));
        self.graph.resize();
    }

    pub fn zoom_to_fit(&mut self, duration_ms: Option<u32>) {
        self.graph
            .zoom_to_fit(duration_ms.map(|ms| Duration::from_millis(ms.into())));
    }

    pub fn reset_zoom(&mut self, duration_ms: Option<u32>) {
        self.graph
            .reset_zoom(duration_ms.map(|ms| Duration::from_millis(ms.into())));
    }

    pub fn svg(&self) -> String {
        self.graph.scene().to_svg()
    }

    /// Whether the transient graph display is still showing.
    pub fn display_active(&self) -> bool {
        self.graph.display_token().is_some()
    }

    /// JSON of the last selection change (`null` for a deselect), or
    /// `undefined` when nothing changed since the previous call.
    pub fn take_selection_change(&self) -> Option<String> {
        let change = self.selection.borrow_mut().take()?;
        serde_json::to_string(&change).ok()
    }

    /// Stored graph text, for the host to put in its own storage.
    pub fn export_state(&self) -> Option<String> {
        let key = &self.graph.config().storage.key;
        self.graph.storage().get(key).ok().flatten()
    }
}
