use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use notegraph::viewport::compute_fit;
use notegraph::{
    Config, HalfExtent, KeyValueStore, MemoryStore, NoteGraph, Point, RecordingScene, Selection,
    Transform, ViewportSize,
};
use pretty_assertions::assert_eq;

type Graph = NoteGraph<RecordingScene, MemoryStore>;

const VIEW: ViewportSize = ViewportSize {
    width: 800.0,
    height: 600.0,
};

fn graph_with(storage: MemoryStore) -> Graph {
    NoteGraph::new(Config::default(), RecordingScene::new(VIEW), storage)
}

fn graph() -> Graph {
    graph_with(MemoryStore::new())
}

fn run_frames(graph: &mut Graph, frames: usize) {
    for _ in 0..frames {
        graph.frame(Duration::from_millis(16));
    }
}

fn edge_set(graph: &Graph) -> Vec<(String, String)> {
    let mut edges: Vec<(String, String)> = graph
        .store()
        .edges()
        .iter()
        .map(|edge| {
            let key = edge.key();
            let (a, b) = key.ends();
            (a.to_string(), b.to_string())
        })
        .collect();
    edges.sort();
    edges
}

#[test]
fn invariants_hold_through_add_and_delete_sequences() {
    let mut g = graph();
    let ids = ["a", "b", "c", "d", "e"];
    for id in ids {
        assert!(g.add_note(id, None).ok);
        g.store().check_invariants().unwrap();
    }
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            g.connect_notes(a, b);
            g.store().check_invariants().unwrap();
        }
    }
    assert_eq!(g.store().edges().len(), 10);

    for id in ["c", "a", "missing", "e"] {
        g.delete_note(id);
        g.store().check_invariants().unwrap();
        run_frames(&mut g, 5);
    }
    assert_eq!(edge_set(&g), vec![("b".to_string(), "d".to_string())]);
}

#[test]
fn reverse_link_is_a_duplicate() {
    let mut g = graph();
    g.add_note("a", None);
    g.add_note("b", None);
    assert!(g.connect_notes("a", "b").ok);
    let second = g.connect_notes("b", "a");
    assert!(!second.ok);
    assert_eq!(second.message, "Link already exists.");
}

#[test]
fn rename_rewrites_edges_and_keeps_position() {
    let mut g = graph();
    g.add_note("a", None);
    g.add_note("b", None);
    g.add_note("c", None);
    g.connect_notes("a", "b");
    g.connect_notes("c", "a");
    run_frames(&mut g, 50);
    let before = g.store().node("a").unwrap().position();

    let outcome = g.edit_note("a", Some("z"), None);
    assert_eq!(outcome.message, "Node \"a\" updated. Renamed to \"z\".");
    assert!(!g.store().contains("a"));
    assert_eq!(g.store().node("z").unwrap().position(), before);
    assert_eq!(
        edge_set(&g),
        vec![
            ("b".to_string(), "z".to_string()),
            ("c".to_string(), "z".to_string())
        ]
    );
}

#[test]
fn save_clear_load_round_trip() {
    let mut g = graph();
    g.add_note("Rust", Some("ownership"));
    g.add_note("Go", Some("goroutines"));
    g.add_note("Zig", None);
    g.connect_notes("Rust", "Go");
    g.connect_notes("Zig", "Rust");
    run_frames(&mut g, 100);
    g.save();
    let saved = g.storage().clone();
    let notes = g.store().list();
    let edges = edge_set(&g);

    let cleared = g.clear();
    assert_eq!(
        cleared.message,
        "All notes and links have been cleared from the graph."
    );
    assert!(g.store().is_empty());

    let restored = graph_with(saved);
    assert_eq!(restored.store().list(), notes);
    assert_eq!(edge_set(&restored), edges);
}

#[test]
fn malformed_storage_starts_empty() {
    let mut storage = MemoryStore::new();
    storage.set("notegraph.v2", "{\"nodes\": \"nope\"}").unwrap();
    let g = graph_with(storage);
    assert!(g.store().is_empty());
    assert!(g.scene().primitives.is_empty());
}

#[test]
fn fit_frames_two_nodes_in_800_by_600() {
    for e in [0.5f32, 22.0, 75.0] {
        let extent = HalfExtent { x: e, y: e };
        let t = compute_fit(
            [(Point::new(0.0, 0.0), extent), (Point::new(100.0, 100.0), extent)],
            VIEW,
            0.9,
        )
        .unwrap();
        let span = 100.0 + 2.0 * e;
        let k = (800.0 / span).min(600.0 / span) * 0.9;
        assert!((t.k - k).abs() < 1e-4, "k for e={e}");
        let mid = t.apply(Point::new(50.0, 50.0));
        assert!((mid.x - 400.0).abs() < 1e-3 && (mid.y - 300.0).abs() < 1e-3);
    }
}

#[test]
fn one_note_or_coincident_notes_keep_identity() {
    let mut g = graph();
    g.add_note("only", None);
    g.zoom_to_fit(Some(Duration::ZERO));
    assert!(!g.viewport().fit_mode());
    assert_eq!(g.transform(), Transform::IDENTITY);

    let e = HalfExtent { x: 75.0, y: 22.0 };
    let at = Point::new(10.0, 10.0);
    assert_eq!(compute_fit([(at, e), (at, e)], VIEW, 0.9), None);

    g.add_note("second", None);
    g.drag_node("only");
    g.drag_move(Point::new(250.0, 250.0));
    g.drag_end();
    g.drag_node("second");
    g.drag_move(Point::new(250.0, 250.0));
    g.zoom_to_fit(Some(Duration::ZERO));
    assert!(!g.viewport().fit_mode());
    assert_eq!(g.transform(), Transform::IDENTITY);
}

#[test]
fn zoom_calls_are_safe_on_any_graph() {
    let mut g = graph();
    g.zoom_to_fit(Some(Duration::ZERO));
    assert_eq!(g.transform(), Transform::IDENTITY);
    g.reset_zoom(None);
    g.add_note("a", None);
    g.clear();
    g.zoom_to_fit(None);
    run_frames(&mut g, 60);
    assert_eq!(g.transform(), Transform::IDENTITY);
    assert!(!g.viewport().fit_mode());
}

#[test]
fn toggling_selection_reports_none() {
    let mut g = graph();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    g.on_selection(move |node| sink.borrow_mut().push(node.map(|n| n.id.clone())));

    g.add_note("A", None);
    g.add_note("B", None);
    g.click_node("A");
    g.click_node("B");
    g.click_node("B");
    assert_eq!(g.selection(), &Selection::Unselected);
    assert_eq!(
        *calls.borrow(),
        vec![Some("A".to_string()), Some("B".to_string()), None]
    );
}

#[test]
fn clicking_empty_canvas_deselects() {
    let mut g = graph();
    g.add_note("A", None);
    run_frames(&mut g, 400);
    g.reset_zoom(Some(Duration::ZERO));
    g.click_node("A");
    g.click_at(Point::new(-5_000.0, -5_000.0));
    assert_eq!(g.selection(), &Selection::Unselected);
}

#[test]
fn empty_search_clears_highlights() {
    let mut g = graph();
    g.add_note("apple", None);
    g.add_note("grape", Some("Apple-like"));
    let hit = g.search_notes("APPLE");
    assert_eq!(hit.message, "Highlighting results for: \"APPLE\".");
    assert_eq!(g.store().highlighted_ids(), vec!["apple", "grape"]);

    let cleared = g.search_notes("   ");
    assert_eq!(cleared.message, "Highlighting cleared.");
    assert!(g.store().highlighted_ids().is_empty());
}

#[test]
fn focus_pin_follows_selection_and_rename() {
    let mut g = graph();
    g.add_note("a", None);
    g.add_note("b", None);
    g.click_node("a");
    assert_eq!(g.layout().focus(), Some("a"));
    run_frames(&mut g, 30);
    assert_eq!(g.store().node("a").unwrap().position(), VIEW.center());

    g.edit_note("a", Some("c"), None);
    assert_eq!(g.layout().focus(), Some("c"));
    assert!(g.store().node("c").unwrap().is_pinned());

    g.click_node("b");
    assert!(!g.store().node("c").unwrap().is_pinned());
    assert!(g.store().node("b").unwrap().is_pinned());
    let pinned = g.store().nodes().iter().filter(|n| n.is_pinned()).count();
    assert_eq!(pinned, 1);
}

#[test]
fn same_operations_give_same_layout() {
    let script = |g: &mut Graph| {
        for id in ["one", "two", "three", "four"] {
            g.add_note(id, None);
        }
        g.connect_notes("one", "two");
        g.connect_notes("two", "three");
        g.connect_notes("three", "four");
        run_frames(g, 200);
    };
    let mut first = graph();
    let mut second = graph();
    script(&mut first);
    script(&mut second);
    let a: Vec<Point> = first.store().nodes().iter().map(|n| n.position()).collect();
    let b: Vec<Point> = second.store().nodes().iter().map(|n| n.position()).collect();
    assert_eq!(a, b);
}

#[test]
fn later_display_supersedes_listing_reset() {
    let mut g = graph();
    g.add_note("a", None);
    g.add_note("b", None);
    g.list_notes();
    let listing = g.display_token();
    g.add_note("c", None);
    assert_ne!(g.display_token(), listing);

    g.frame(Duration::from_millis(80_000));
    assert_eq!(g.display_token(), None);
    assert!(g.viewport().fit_mode());
}

#[test]
fn resize_refits_a_framed_graph() {
    let mut g = graph();
    g.add_note("a", None);
    g.add_note("b", None);
    g.settle(2_000);
    assert!(g.viewport().fit_mode());
    let before = g.transform();

    g.scene_mut().size = ViewportSize::new(1600.0, 1200.0);
    g.resize();
    assert!(g.viewport().fit_mode());
    assert!(g.transform().k > before.k);
    assert_eq!(g.layout().center(), Point::new(800.0, 600.0));
}
