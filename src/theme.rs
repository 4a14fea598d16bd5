use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub note_background: String,
    pub note_border: String,
    pub note_border_width: f32,
    pub note_corner_radius: f32,
    pub highlight_background: String,
    pub highlight_border: String,
    pub selected_border_width: f32,
    pub link_color: String,
    pub link_highlight_color: String,
    pub link_width: f32,
    pub background: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "system-ui, -apple-system, \"Segoe UI\", Roboto, \"Helvetica Neue\", Arial, sans-serif"
                .to_string(),
            font_size: 14.0,
            text_color: "#1e293b".to_string(),
            note_background: "#f8fafc".to_string(),
            note_border: "#cbd5e1".to_string(),
            note_border_width: 1.5,
            note_corner_radius: 4.0,
            highlight_background: "#e2e8f0".to_string(),
            highlight_border: "#64748b".to_string(),
            selected_border_width: 3.0,
            link_color: "#94a3b8".to_string(),
            link_highlight_color: "#475569".to_string(),
            link_width: 1.4,
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            text_color: "#e2e8f0".to_string(),
            note_background: "#334155".to_string(),
            note_border: "#64748b".to_string(),
            highlight_background: "#475569".to_string(),
            highlight_border: "#94a3b8".to_string(),
            link_color: "#64748b".to_string(),
            link_highlight_color: "#cbd5e1".to_string(),
            background: "#0f172a".to_string(),
            ..Self::light()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" | "default" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
