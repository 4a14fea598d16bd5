/// Which note, if any, the user has clicked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Unselected,
    Selected(String),
}

impl Selection {
    pub fn selected(&self) -> Option<&str> {
        match self {
            Selection::Unselected => None,
            Selection::Selected(id) => Some(id),
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected() == Some(id)
    }

    /// Select `id`, or deselect it when it is already selected.
    ///
    /// Always changes state.
    pub fn click_node(&mut self, id: &str) -> bool {
        *self = if self.is_selected(id) {
            Selection::Unselected
        } else {
            Selection::Selected(id.to_string())
        };
        true
    }

    pub fn click_empty(&mut self) -> bool {
        self.clear()
    }

    pub fn clear(&mut self) -> bool {
        let changed = *self != Selection::Unselected;
        *self = Selection::Unselected;
        changed
    }

    pub fn on_renamed(&mut self, from: &str, to: &str) -> bool {
        if self.is_selected(from) {
            *self = Selection::Selected(to.to_string());
            return true;
        }
        false
    }

    pub fn on_removed(&mut self, id: &str) -> bool {
        if self.is_selected(id) {
            *self = Selection::Unselected;
            return true;
        }
        false
    }

    /// The node the layout should pin to the viewport center.
    ///
    /// An explicit selection wins. Without one, a search that matched exactly
    /// one note focuses that note; zero or several matches focus nothing.
    pub fn focus_target(&self, highlighted: &[&str]) -> Option<String> {
        if let Some(id) = self.selected() {
            return Some(id.to_string());
        }
        match highlighted {
            [only] => Some((*only).to_string()),
            _ => None,
        }
    }
}
