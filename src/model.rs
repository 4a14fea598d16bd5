use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// A note in the graph. The id doubles as the display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub body: String,
    pub x: f32,
    pub y: f32,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
    pub highlighted: bool,
    #[serde(skip)]
    pub(crate) vx: f32,
    #[serde(skip)]
    pub(crate) vy: f32,
}

impl Node {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            x: 0.0,
            y: 0.0,
            fx: None,
            fy: None,
            highlighted: false,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() && self.fy.is_some()
    }

    pub(crate) fn pin(&mut self, at: Point) {
        self.fx = Some(at.x);
        self.fy = Some(at.y);
        self.x = at.x;
        self.y = at.y;
        self.vx = 0.0;
        self.vy = 0.0;
    }

    pub(crate) fn unpin(&mut self) {
        self.fx = None;
        self.fy = None;
    }

    pub(crate) fn matches(&self, needle_lower: &str) -> bool {
        self.id.to_lowercase().contains(needle_lower)
            || self.body.to_lowercase().contains(needle_lower)
    }
}

/// An undirected link between two notes, stored by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.source, &self.target)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// Direction-free identity of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeKey(String, String);

impl EdgeKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    pub fn ends(&self) -> (&str, &str) {
        (&self.0, &self.1)
    }
}

/// Read-only view of a note returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    pub body: String,
}

/// Structural and state changes recorded by the store for its owner to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded(String),
    NodeRenamed { from: String, to: String },
    BodyChanged(String),
    NodeRemoved { id: String, edges: Vec<EdgeKey> },
    EdgeAdded(EdgeKey),
    HighlightChanged,
    Cleared,
}

impl GraphEvent {
    /// Whether the simulation needs to be re-heated after this change.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GraphEvent::NodeAdded(_)
                | GraphEvent::NodeRemoved { .. }
                | GraphEvent::EdgeAdded(_)
                | GraphEvent::Cleared
        )
    }
}

/// Result shape of every CRUD operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl<E: std::fmt::Display> From<Result<String, E>> for Outcome {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(message) => Outcome::success(message),
            Err(err) => Outcome::failure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_ignores_direction() {
        assert_eq!(EdgeKey::new("a", "b"), EdgeKey::new("b", "a"));
        assert_eq!(Edge::new("z", "m").key().ends(), ("m", "z"));
    }

    #[test]
    fn node_matches_id_or_body_case_insensitively() {
        let node = Node::new("Rust Notes", "Ownership and Borrowing");
        assert!(node.matches("rust"));
        assert!(node.matches("borrow"));
        assert!(!node.matches("python"));
    }

    #[test]
    fn outcome_serializes_without_empty_data() {
        let json = serde_json::to_string(&Outcome::success("done")).unwrap();
        assert_eq!(json, r#"{"ok":true,"message":"done"}"#);
    }
}
