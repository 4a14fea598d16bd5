#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod persist;
pub mod render;
pub mod scene;
pub mod selection;
pub mod service;
pub mod store;
pub mod text_metrics;
pub mod theme;
pub mod timer;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, StorageConfig, ViewportConfig, load_config};
pub use error::{GraphError, PersistError};
pub use geometry::{HalfExtent, Point, Transform, ViewportSize};
pub use layout::LayoutEngine;
pub use model::{Edge, EdgeKey, GraphEvent, Node, NoteSummary, Outcome};
pub use persist::{FileStore, KeyValueStore, MemoryStore};
pub use render::SvgScene;
pub use scene::{Primitive, RecordingScene, Scene, SceneKey};
pub use selection::Selection;
pub use service::NoteGraph;
pub use store::GraphStore;
pub use theme::Theme;
pub use timer::{DisplayTimer, ExpiryAction};
pub use viewport::{Easing, ViewportController};
