//! Saving and restoring the note graph as JSON under a string key.
//!
//! Loading never fails: a missing key yields an empty graph, unreadable or
//! malformed data is logged and treated as missing, and individual records
//! that would break the graph invariants are skipped.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PersistError;
use crate::model::{Edge, Node};
use crate::store::GraphStore;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<StoredNode>,
    pub edges: Vec<StoredEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEdge {
    #[serde(alias = "from")]
    pub source: String,
    #[serde(alias = "to")]
    pub target: String,
}

impl GraphRecord {
    pub fn from_store(store: &GraphStore) -> Self {
        Self {
            nodes: store
                .nodes()
                .iter()
                .map(|node| StoredNode {
                    id: node.id.clone(),
                    body: node.body.clone(),
                    x: Some(node.x),
                    y: Some(node.y),
                    highlighted: node.highlighted,
                })
                .collect(),
            edges: store
                .edges()
                .iter()
                .map(StoredEdge::from)
                .collect(),
        }
    }

    /// Build a store from the record, skipping entries that would violate
    /// its invariants. Returns the store and the ids of nodes that had no
    /// stored position.
    pub fn into_store(self) -> (GraphStore, Vec<String>) {
        let mut store = GraphStore::new();
        let mut unplaced = Vec::new();
        let mut dropped = 0usize;

        for stored in self.nodes {
            let mut node = Node::new(stored.id, stored.body);
            node.highlighted = stored.highlighted;
            let placed = match (stored.x, stored.y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                    node.x = x;
                    node.y = y;
                    true
                }
                _ => false,
            };
            let id = node.id.trim().to_string();
            match store.insert_node(node) {
                Ok(()) if !placed => unplaced.push(id),
                Ok(()) => {}
                Err(_) => dropped += 1,
            }
        }
        for edge in self.edges {
            if store.add_edge(&edge.source, &edge.target).is_err() {
                dropped += 1;
            }
        }
        store.take_events();

        if dropped > 0 {
            warn!(dropped, "skipped invalid records while loading graph");
        }
        (store, unplaced)
    }
}

/// Read the graph stored under `key`. Never fails; see the module docs.
pub fn load_graph(kv: &impl KeyValueStore, key: &str) -> GraphRecord {
    let text = match kv.get(key) {
        Ok(Some(text)) => text,
        Ok(None) => return GraphRecord::default(),
        Err(err) => {
            warn!(key, error = %err, "could not read stored graph");
            return GraphRecord::default();
        }
    };
    match serde_json::from_str::<GraphRecord>(&text) {
        Ok(record) => {
            info!(
                key,
                nodes = record.nodes.len(),
                edges = record.edges.len(),
                "loaded graph"
            );
            record
        }
        Err(err) => {
            warn!(key, error = %err, "stored graph is malformed, starting empty");
            GraphRecord::default()
        }
    }
}

pub fn save_graph(
    kv: &mut impl KeyValueStore,
    key: &str,
    store: &GraphStore,
) -> Result<(), PersistError> {
    let text = serde_json::to_string(&GraphRecord::from_store(store))?;
    kv.set(key, &text)
}

impl From<&Edge> for StoredEdge {
    fn from(edge: &Edge) -> Self {
        Self {
            source: edge.source.clone(),
            target: edge.target.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node("a", Some("first")).unwrap();
        store.add_node("b", None).unwrap();
        store.add_edge("a", "b").unwrap();
        store.take_events();
        store
    }

    #[test]
    fn save_then_load_restores_notes_and_links() {
        let mut kv = MemoryStore::new();
        save_graph(&mut kv, "k", &sample()).unwrap();
        let (store, unplaced) = load_graph(&kv, "k").into_store();
        assert_eq!(store.list(), sample().list());
        assert!(store.has_edge("b", "a"));
        assert!(unplaced.is_empty());
    }

    #[test]
    fn search_highlights_survive_a_reload() {
        let mut store = sample();
        store.highlight_by_substring("FIRST");
        let mut kv = MemoryStore::new();
        save_graph(&mut kv, "k", &store).unwrap();

        let text = kv.get("k").unwrap().unwrap();
        assert_eq!(text.matches("\"highlighted\":true").count(), 1);
        assert!(!text.contains("\"highlighted\":false"));

        let (loaded, _) = load_graph(&kv, "k").into_store();
        assert_eq!(loaded.highlighted_ids(), vec!["a"]);
    }

    #[test]
    fn missing_key_is_an_empty_graph() {
        let record = load_graph(&MemoryStore::new(), "nothing");
        assert_eq!(record, GraphRecord::default());
    }

    #[test]
    fn malformed_text_is_treated_as_absent() {
        let mut kv = MemoryStore::new();
        kv.set("k", "{ not json").unwrap();
        assert_eq!(load_graph(&kv, "k"), GraphRecord::default());
        kv.set("k", r#"{"nodes": 3, "edges": []}"#).unwrap();
        assert_eq!(load_graph(&kv, "k"), GraphRecord::default());
    }

    #[test]
    fn invalid_records_are_dropped() {
        let mut kv = MemoryStore::new();
        kv.set(
            "k",
            r#"{
                "nodes": [
                    {"id": "a", "body": "", "x": 1.0, "y": 2.0},
                    {"id": "  "},
                    {"id": "a", "body": "dup"},
                    {"id": "b"}
                ],
                "edges": [
                    {"source": "a", "target": "b"},
                    {"from": "b", "to": "a"},
                    {"source": "a", "target": "a"},
                    {"source": "a", "target": "ghost"}
                ]
            }"#,
        )
        .unwrap();
        let (store, unplaced) = load_graph(&kv, "k").into_store();
        assert_eq!(store.len(), 2);
        assert_eq!(store.edges().len(), 1);
        assert_eq!(unplaced, vec!["b".to_string()]);
        assert_eq!(store.node("a").map(|n| (n.x, n.y)), Some((1.0, 2.0)));
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn file_store_round_trips_and_reports_missing_keys() {
        let dir = std::env::temp_dir().join(format!("notegraph-persist-{}", std::process::id()));
        let mut kv = FileStore::new(&dir);
        assert_eq!(kv.get("notegraph.v2").unwrap(), None);
        kv.set("notegraph.v2", "{}").unwrap();
        assert_eq!(kv.get("notegraph.v2").unwrap().as_deref(), Some("{}"));
        assert!(dir.join("notegraph.v2.json").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
