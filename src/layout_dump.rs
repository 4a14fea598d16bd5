use crate::geometry::Transform;
use crate::store::GraphStore;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GraphDump {
    pub transform: Transform,
    pub fit_mode: bool,
    pub selected: Option<String>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub pinned: bool,
    pub highlighted: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub source: String,
    pub target: String,
    pub points: [[f32; 2]; 2],
}

impl GraphDump {
    pub fn capture(
        store: &GraphStore,
        transform: Transform,
        fit_mode: bool,
        selected: Option<&str>,
    ) -> Self {
        let nodes = store
            .nodes()
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                x: node.x,
                y: node.y,
                pinned: node.is_pinned(),
                highlighted: node.highlighted,
            })
            .collect();

        let edges = store
            .edges()
            .iter()
            .filter_map(|edge| {
                let from = store.node(&edge.source)?;
                let to = store.node(&edge.target)?;
                Some(EdgeDump {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    points: [[from.x, from.y], [to.x, to.y]],
                })
            })
            .collect();

        GraphDump {
            transform,
            fit_mode,
            selected: selected.map(str::to_string),
            nodes,
            edges,
        }
    }
}

pub fn write_layout_dump(path: &Path, dump: &GraphDump) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, dump)?;
    Ok(())
}
