//! Renderer-agnostic drawing surface the service keeps in sync with the graph.

use std::collections::BTreeMap;

use crate::geometry::{HalfExtent, Point, Transform, ViewportSize};
use crate::model::EdgeKey;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SceneKey {
    Note(String),
    Link(EdgeKey),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Note {
        center: Point,
        half_extent: HalfExtent,
        label: String,
        highlighted: bool,
        selected: bool,
    },
    Link {
        from: Point,
        to: Point,
    },
}

/// A surface that holds keyed primitives in world space plus one camera transform.
pub trait Scene {
    fn add(&mut self, key: SceneKey, primitive: Primitive);
    fn update(&mut self, key: &SceneKey, primitive: Primitive);
    fn remove(&mut self, key: &SceneKey);
    fn set_transform(&mut self, transform: Transform);
    fn size(&self) -> ViewportSize;

    /// Half size of the box this scene draws for a note labelled `label`.
    /// `None` lets the caller fall back to its configured note size.
    fn note_extent(&self, _label: &str) -> Option<HalfExtent> {
        None
    }
}

/// A scene that only records what it was told. Useful for headless hosts.
#[derive(Debug, Clone)]
pub struct RecordingScene {
    pub size: ViewportSize,
    pub primitives: BTreeMap<SceneKey, Primitive>,
    pub transform: Transform,
}

impl RecordingScene {
    pub fn new(size: ViewportSize) -> Self {
        Self {
            size,
            primitives: BTreeMap::new(),
            transform: Transform::IDENTITY,
        }
    }

    pub fn note(&self, id: &str) -> Option<&Primitive> {
        self.primitives.get(&SceneKey::Note(id.to_string()))
    }

    pub fn link_count(&self) -> usize {
        self.primitives
            .keys()
            .filter(|key| matches!(key, SceneKey::Link(_)))
            .count()
    }
}

impl Scene for RecordingScene {
    fn add(&mut self, key: SceneKey, primitive: Primitive) {
        self.primitives.insert(key, primitive);
    }

    fn update(&mut self, key: &SceneKey, primitive: Primitive) {
        if let Some(slot) = self.primitives.get_mut(key) {
            *slot = primitive;
        }
    }

    fn remove(&mut self, key: &SceneKey) {
        self.primitives.remove(key);
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn size(&self) -> ViewportSize {
        self.size
    }
}
