use crate::geometry::{HalfExtent, ViewportSize};
use crate::theme::Theme;
use crate::viewport::Easing;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Physical constants of the force simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Coulomb-like repulsion between every pair of notes.
    pub repulsion: f32,
    /// Rest length of a link spring.
    pub spring_length: f32,
    pub spring_stiffness: f32,
    /// Pull of every note toward the viewport center when nothing is focus-pinned.
    pub centering_strength: f32,
    /// Fraction of velocity removed each step (0.0 = none, 1.0 = all).
    pub velocity_decay: f32,
    pub max_velocity: f32,
    /// Distances below this are clamped when computing repulsion.
    pub min_distance: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    /// Temperature a structural change, drag or pin change re-heats to.
    pub alpha_restart: f32,
    /// Temperature held while a note is being dragged.
    pub drag_alpha_target: f32,
    /// Radius of the random offset applied to newly placed notes.
    pub placement_jitter: f32,
    pub seed: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: 10000.0,
            spring_length: 150.0,
            spring_stiffness: 0.05,
            centering_strength: 0.01,
            velocity_decay: 0.4,
            max_velocity: 50.0,
            min_distance: 10.0,
            alpha_min: 0.001,
            // Cools from 1.0 to alpha_min in roughly 300 steps.
            alpha_decay: 1.0 - 0.001f32.powf(1.0 / 300.0),
            alpha_restart: 0.5,
            drag_alpha_target: 0.3,
            placement_jitter: 60.0,
            seed: 0x5EED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Fraction of the viewport the fitted graph may occupy.
    pub padding: f32,
    pub fit_duration_ms: u64,
    pub easing: Easing,
    pub note_width: f32,
    pub note_height: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            padding: 0.9,
            fit_duration_ms: 750,
            easing: Easing::EaseInOutQuad,
            note_width: 150.0,
            note_height: 44.0,
        }
    }
}

impl ViewportConfig {
    pub fn half_extent(&self) -> HalfExtent {
        HalfExtent {
            x: self.note_width / 2.0,
            y: self.note_height / 2.0,
        }
    }

    pub fn fit_duration(&self) -> Duration {
        Duration::from_millis(self.fit_duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub label_min_width: f32,
    pub label_max_width: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            background: "#FFFFFF".to_string(),
            label_min_width: 100.0,
            label_max_width: 200.0,
            label_padding_x: 15.0,
            label_padding_y: 10.0,
        }
    }
}

impl RenderConfig {
    pub fn size(&self) -> ViewportSize {
        ViewportSize::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub key: String,
    pub dir: Option<PathBuf>,
    /// Lifetime of a transient graph display.
    pub display_duration_ms: u64,
    /// Extra lifetime granted to the display that follows a listing.
    pub list_display_bonus_ms: u64,
    /// Lifetime of the display shown when a non-empty graph is restored.
    pub load_display_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: "notegraph.v2".to_string(),
            dir: None,
            display_duration_ms: 70_000,
            list_display_bonus_ms: 2_000,
            load_display_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub render: RenderConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn with_theme(theme: Theme) -> Self {
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            render,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    physics: Option<PhysicsFile>,
    viewport: Option<ViewportFile>,
    render: Option<RenderFile>,
    storage: Option<StorageFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    note_background: Option<String>,
    note_border: Option<String>,
    highlight_background: Option<String>,
    highlight_border: Option<String>,
    link_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhysicsFile {
    repulsion: Option<f32>,
    spring_length: Option<f32>,
    spring_stiffness: Option<f32>,
    centering_strength: Option<f32>,
    velocity_decay: Option<f32>,
    max_velocity: Option<f32>,
    min_distance: Option<f32>,
    alpha_min: Option<f32>,
    alpha_decay: Option<f32>,
    alpha_restart: Option<f32>,
    drag_alpha_target: Option<f32>,
    placement_jitter: Option<f32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewportFile {
    padding: Option<f32>,
    fit_duration_ms: Option<u64>,
    easing: Option<Easing>,
    note_width: Option<f32>,
    note_height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderFile {
    width: Option<f32>,
    height: Option<f32>,
    label_min_width: Option<f32>,
    label_max_width: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageFile {
    key: Option<String>,
    dir: Option<PathBuf>,
    display_duration_ms: Option<u64>,
    load_display_ms: Option<u64>,
}

/// Load a JSON5 config file over the defaults. A missing path yields defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(name) = parsed.theme.as_deref() {
        let theme =
            Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("unknown theme \"{name}\""))?;
        config = Config::with_theme(theme);
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.text_color {
            theme.text_color = v;
        }
        if let Some(v) = vars.note_background {
            theme.note_background = v;
        }
        if let Some(v) = vars.note_border {
            theme.note_border = v;
        }
        if let Some(v) = vars.highlight_background {
            theme.highlight_background = v;
        }
        if let Some(v) = vars.highlight_border {
            theme.highlight_border = v;
        }
        if let Some(v) = vars.link_color {
            theme.link_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            theme.background = v;
        }
    }

    if let Some(physics) = parsed.physics {
        let layout = &mut config.layout;
        if let Some(v) = physics.repulsion {
            layout.repulsion = v;
        }
        if let Some(v) = physics.spring_length {
            layout.spring_length = v;
        }
        if let Some(v) = physics.spring_stiffness {
            layout.spring_stiffness = v;
        }
        if let Some(v) = physics.centering_strength {
            layout.centering_strength = v;
        }
        if let Some(v) = physics.velocity_decay {
            layout.velocity_decay = v.clamp(0.0, 1.0);
        }
        if let Some(v) = physics.max_velocity {
            layout.max_velocity = v;
        }
        if let Some(v) = physics.min_distance {
            layout.min_distance = v.max(f32::EPSILON);
        }
        if let Some(v) = physics.alpha_min {
            layout.alpha_min = v;
        }
        if let Some(v) = physics.alpha_decay {
            layout.alpha_decay = v.clamp(0.0, 1.0);
        }
        if let Some(v) = physics.alpha_restart {
            layout.alpha_restart = v;
        }
        if let Some(v) = physics.drag_alpha_target {
            layout.drag_alpha_target = v;
        }
        if let Some(v) = physics.placement_jitter {
            layout.placement_jitter = v;
        }
        if let Some(v) = physics.seed {
            layout.seed = v;
        }
    }

    if let Some(viewport) = parsed.viewport {
        let cfg = &mut config.viewport;
        if let Some(v) = viewport.padding {
            cfg.padding = v;
        }
        if let Some(v) = viewport.fit_duration_ms {
            cfg.fit_duration_ms = v;
        }
        if let Some(v) = viewport.easing {
            cfg.easing = v;
        }
        if let Some(v) = viewport.note_width {
            cfg.note_width = v;
        }
        if let Some(v) = viewport.note_height {
            cfg.note_height = v;
        }
    }

    if let Some(render) = parsed.render {
        let cfg = &mut config.render;
        if let Some(v) = render.width {
            cfg.width = v;
        }
        if let Some(v) = render.height {
            cfg.height = v;
        }
        if let Some(v) = render.label_min_width {
            cfg.label_min_width = v;
        }
        if let Some(v) = render.label_max_width {
            cfg.label_max_width = v;
        }
    }

    if let Some(storage) = parsed.storage {
        let cfg = &mut config.storage;
        if let Some(v) = storage.key {
            cfg.key = v;
        }
        if storage.dir.is_some() {
            cfg.dir = storage.dir;
        }
        if let Some(v) = storage.load_display_ms {
            cfg.load_display_ms = v;
        }
        if let Some(v) = storage.display_duration_ms {
            cfg.display_duration_ms = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(parse_config("{}").unwrap(), Config::default());
    }

    #[test]
    fn overlays_sections_with_comments() {
        let config = parse_config(
            r#"{
                // dark canvas with a longer spring
                theme: "dark",
                physics: { springLength: 220, seed: 7 },
                viewport: { padding: 0.8, easing: "linear" },
                storage: { key: "custom" },
            }"#,
        )
        .unwrap();
        assert_eq!(config.theme, Theme::dark());
        assert_eq!(config.render.background, Theme::dark().background);
        assert_eq!(config.layout.spring_length, 220.0);
        assert_eq!(config.layout.seed, 7);
        assert_eq!(config.layout.repulsion, LayoutConfig::default().repulsion);
        assert_eq!(config.viewport.padding, 0.8);
        assert_eq!(config.viewport.easing, Easing::Linear);
        assert_eq!(config.storage.key, "custom");
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(parse_config(r#"{ "theme": "neon" }"#).is_err());
    }

    #[test]
    fn default_alpha_decay_cools_in_about_300_steps() {
        let cfg = LayoutConfig::default();
        let mut alpha = 1.0f32;
        let mut steps = 0;
        while alpha >= cfg.alpha_min {
            alpha -= alpha * cfg.alpha_decay;
            steps += 1;
        }
        assert!((295..=305).contains(&steps), "took {steps} steps");
    }
}
