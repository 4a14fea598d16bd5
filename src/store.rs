//! Node and edge records plus the rules that keep them consistent.
//!
//! Every mutator validates first and only then touches state, so a failed
//! call leaves the store exactly as it was. Successful mutations append a
//! [`GraphEvent`] that the owning service drains to drive layout, selection
//! and persistence.

use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::model::{Edge, EdgeKey, GraphEvent, Node, NoteSummary};

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_keys: HashSet<EdgeKey>,
    events: Vec<GraphEvent>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // MUTATORS
    // =========================================================================

    pub fn add_node(&mut self, id: &str, body: Option<&str>) -> Result<String, GraphError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(GraphError::EmptyId);
        }
        if self.index.contains_key(id) {
            return Err(GraphError::DuplicateNote(id.to_string()));
        }
        self.push_node(Node::new(id, body.unwrap_or_default()));
        self.events.push(GraphEvent::NodeAdded(id.to_string()));
        Ok(format!("Note \"{id}\" created."))
    }

    /// Insert a fully formed node (used when restoring persisted state).
    pub(crate) fn insert_node(&mut self, mut node: Node) -> Result<(), GraphError> {
        node.id = node.id.trim().to_string();
        if node.id.is_empty() {
            return Err(GraphError::EmptyId);
        }
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNote(node.id));
        }
        self.push_node(node);
        Ok(())
    }

    fn push_node(&mut self, node: Node) {
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    pub fn rename_or_edit(
        &mut self,
        current_id: &str,
        new_id: Option<&str>,
        new_body: Option<&str>,
    ) -> Result<String, GraphError> {
        let current_id = current_id.trim();
        if current_id.is_empty() {
            return Err(GraphError::MissingCurrentId);
        }
        let idx = self
            .index_of(current_id)
            .ok_or_else(|| GraphError::NoteNotFound(current_id.to_string()))?;

        let new_id = new_id.map(str::trim).filter(|id| !id.is_empty());
        let renamed_to = new_id.filter(|id| *id != current_id);
        if let Some(target) = renamed_to
            && self.index.contains_key(target)
        {
            return Err(GraphError::RenameCollision(target.to_string()));
        }
        let body_changed = new_body.is_some_and(|body| body != self.nodes[idx].body);

        if renamed_to.is_none() && !body_changed {
            return Ok(format!("Node \"{current_id}\" was not changed."));
        }

        let mut message = format!("Node \"{current_id}\" updated.");
        if let Some(target) = renamed_to {
            self.rewrite_id(idx, current_id, target);
            message.push_str(&format!(" Renamed to \"{target}\"."));
        }
        if body_changed && let Some(body) = new_body {
            self.nodes[idx].body = body.to_string();
            self.events
                .push(GraphEvent::BodyChanged(self.nodes[idx].id.clone()));
            message.push_str(" Body updated.");
        }
        Ok(message)
    }

    fn rewrite_id(&mut self, idx: usize, from: &str, to: &str) {
        self.index.remove(from);
        self.index.insert(to.to_string(), idx);
        self.nodes[idx].id = to.to_string();

        for edge in &mut self.edges {
            if edge.source == from {
                edge.source = to.to_string();
            }
            if edge.target == from {
                edge.target = to.to_string();
            }
        }
        self.edge_keys = self.edges.iter().map(Edge::key).collect();
        self.events.push(GraphEvent::NodeRenamed {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<String, GraphError> {
        let (source, target) = (source.trim(), target.trim());
        if source.is_empty() || target.is_empty() {
            return Err(GraphError::MissingEndpoints);
        }
        if source == target {
            return Err(GraphError::SelfLink);
        }
        if !self.contains(source) {
            return Err(GraphError::SourceNotFound(source.to_string()));
        }
        if !self.contains(target) {
            return Err(GraphError::TargetNotFound(target.to_string()));
        }
        let key = EdgeKey::new(source, target);
        if self.edge_keys.contains(&key) {
            return Err(GraphError::DuplicateLink);
        }
        self.edges.push(Edge::new(source, target));
        self.edge_keys.insert(key.clone());
        self.events.push(GraphEvent::EdgeAdded(key));
        Ok(format!("Linked \"{source}\" to \"{target}\"."))
    }

    pub fn delete_node(&mut self, id: &str) -> Result<String, GraphError> {
        let id = id.trim();
        let idx = self
            .index_of(id)
            .ok_or_else(|| GraphError::NoteNotFound(id.to_string()))?;

        self.nodes.remove(idx);
        self.reindex();

        let mut removed = Vec::new();
        self.edges.retain(|edge| {
            if edge.touches(id) {
                removed.push(edge.key());
                false
            } else {
                true
            }
        });
        for key in &removed {
            self.edge_keys.remove(key);
        }
        self.events.push(GraphEvent::NodeRemoved {
            id: id.to_string(),
            edges: removed,
        });
        Ok(format!("Note \"{id}\" and its connections were deleted."))
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect();
    }

    /// Flag every note whose id or body contains `query`, ignoring case.
    pub fn highlight_by_substring(&mut self, query: &str) -> String {
        let needle = query.trim().to_lowercase();
        let mut changed = false;
        for node in &mut self.nodes {
            let hit = !needle.is_empty() && node.matches(&needle);
            changed |= node.highlighted != hit;
            node.highlighted = hit;
        }
        if changed {
            self.events.push(GraphEvent::HighlightChanged);
        }
        if needle.is_empty() {
            "Highlighting cleared.".to_string()
        } else {
            format!("Highlighting results for: \"{}\".", query.trim())
        }
    }

    pub fn clear(&mut self) -> String {
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
        self.edge_keys.clear();
        self.events.push(GraphEvent::Cleared);
        "All notes and links have been cleared from the graph.".to_string()
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn list(&self) -> Vec<NoteSummary> {
        self.nodes
            .iter()
            .map(|node| NoteSummary {
                id: node.id.clone(),
                body: node.body.clone(),
            })
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.nodes[idx])
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index_of(id).map(|idx| &mut self.nodes[idx])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edge_keys.contains(&EdgeKey::new(a, b))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn highlighted_ids(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| node.highlighted)
            .map(|node| node.id.as_str())
            .collect()
    }

    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check the referential and uniqueness rules, describing the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() || node.id.trim() != node.id {
                return Err(format!("node id {:?} is empty or untrimmed", node.id));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(format!("node id {:?} is duplicated", node.id));
            }
            if self.index.get(&node.id).map(|&idx| &self.nodes[idx].id) != Some(&node.id) {
                return Err(format!("index entry for {:?} is stale", node.id));
            }
        }
        if self.index.len() != self.nodes.len() {
            return Err("index and node list differ in size".to_string());
        }
        let mut keys = HashSet::new();
        for edge in &self.edges {
            if edge.source == edge.target {
                return Err(format!("edge {:?} is a self-loop", edge.source));
            }
            if !self.contains(&edge.source) || !self.contains(&edge.target) {
                return Err(format!(
                    "edge {:?} -> {:?} has a missing endpoint",
                    edge.source, edge.target
                ));
            }
            if !keys.insert(edge.key()) {
                return Err(format!(
                    "edge {:?} -- {:?} is duplicated",
                    edge.source, edge.target
                ));
            }
        }
        if keys != self.edge_keys {
            return Err("edge key set is out of sync".to_string());
        }
        Ok(())
    }
}
