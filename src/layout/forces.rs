use crate::config::LayoutConfig;
use crate::geometry::Point;
use crate::model::Node;

const GOLDEN_ANGLE: f32 = 2.399_963;

/// Net force on every node for one step.
///
/// `links` holds index pairs into `nodes`. `center` enables the global
/// centering pull; pass `None` when a focus pin is anchoring the graph.
pub(super) fn accumulate(
    nodes: &[Node],
    links: &[(usize, usize)],
    config: &LayoutConfig,
    center: Option<Point>,
) -> Vec<(f32, f32)> {
    let n = nodes.len();
    let mut forces = vec![(0.0f32, 0.0f32); n];

    for i in 0..n {
        for j in (i + 1)..n {
            let (ux, uy, dist) = separation(&nodes[i], &nodes[j], i, j);
            let dist = dist.max(config.min_distance);
            let magnitude = config.repulsion / (dist * dist);
            forces[i].0 += ux * magnitude;
            forces[i].1 += uy * magnitude;
            forces[j].0 -= ux * magnitude;
            forces[j].1 -= uy * magnitude;
        }
    }

    for &(a, b) in links {
        let (ux, uy, dist) = separation(&nodes[b], &nodes[a], b, a);
        let stretch = (dist - config.spring_length) * config.spring_stiffness;
        forces[a].0 += ux * stretch;
        forces[a].1 += uy * stretch;
        forces[b].0 -= ux * stretch;
        forces[b].1 -= uy * stretch;
    }

    if let Some(center) = center {
        for (force, node) in forces.iter_mut().zip(nodes) {
            force.0 += (center.x - node.x) * config.centering_strength;
            force.1 += (center.y - node.y) * config.centering_strength;
        }
    }

    forces
}

/// Unit vector from `b` toward `a` and their distance. Coincident nodes get a
/// direction derived from their indices so the result stays deterministic.
fn separation(a: &Node, b: &Node, ia: usize, ib: usize) -> (f32, f32, f32) {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist > f32::EPSILON {
        return (dx / dist, dy / dist, dist);
    }
    let angle = (ia * 7 + ib * 13) as f32 * GOLDEN_ANGLE;
    let sign = if ia < ib { 1.0 } else { -1.0 };
    (angle.cos() * sign, angle.sin() * sign, 0.0)
}
