//! Camera transform for the note graph: identity or fit-to-bounds.
//!
//! Transitions are frame-paced. Starting a new one always begins from the
//! current interpolated transform and replaces whatever was in flight.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ViewportConfig;
use crate::geometry::{Bounds, HalfExtent, Point, Transform, ViewportSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    #[default]
    EaseInOutQuad,
    EaseOutCubic,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[derive(Debug, Clone)]
struct Transition {
    from: Transform,
    to: Transform,
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
}

impl Transition {
    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }
}

/// A note box for framing: world center plus half extent.
pub type NoteBox = (Point, HalfExtent);

/// Transform that frames every note box inside `size`.
///
/// Returns `None` when there is nothing to frame, or when the note centers
/// span no width or no height (one note, or all notes coincident).
pub fn compute_fit(
    boxes: impl IntoIterator<Item = NoteBox>,
    size: ViewportSize,
    padding: f32,
) -> Option<Transform> {
    if size.width <= 0.0 || size.height <= 0.0 {
        return None;
    }
    let boxes: Vec<NoteBox> = boxes.into_iter().collect();
    let centers = Bounds::of_points(boxes.iter().map(|(center, _)| *center))?;
    if centers.width() <= f32::EPSILON || centers.height() <= f32::EPSILON {
        return None;
    }
    let bounds = Bounds::of_boxes(boxes)?;
    let k = (size.width / bounds.width()).min(size.height / bounds.height()) * padding;
    let mid = bounds.center();
    let screen = size.center();
    Some(Transform {
        x: screen.x - mid.x * k,
        y: screen.y - mid.y * k,
        k,
    })
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewportConfig,
    size: ViewportSize,
    transform: Transform,
    fit_mode: bool,
    transition: Option<Transition>,
}

impl ViewportController {
    pub fn new(config: ViewportConfig, size: ViewportSize) -> Self {
        Self {
            config,
            size,
            transform: Transform::IDENTITY,
            fit_mode: false,
            transition: None,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Where the camera is heading (the current transform when idle).
    pub fn target(&self) -> Transform {
        self.transition
            .as_ref()
            .map(|t| t.to)
            .unwrap_or(self.transform)
    }

    pub fn fit_mode(&self) -> bool {
        self.fit_mode
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.transform.invert(screen)
    }

    // =========================================================================
    // MODES
    // =========================================================================

    /// Frame all note boxes. Falls back to identity when their centers span
    /// no area.
    ///
    /// Returns whether fit mode was entered.
    pub fn fit_to_bounds(
        &mut self,
        boxes: impl IntoIterator<Item = NoteBox>,
        duration: Option<Duration>,
    ) -> bool {
        let duration = duration.unwrap_or_else(|| self.config.fit_duration());
        match compute_fit(boxes, self.size, self.config.padding) {
            Some(target) => {
                debug!(k = target.k, x = target.x, y = target.y, "fit to bounds");
                self.fit_mode = true;
                self.animate_to(target, duration);
                true
            }
            None => {
                debug!("fit skipped: degenerate bounds, using identity");
                self.fit_mode = false;
                self.animate_to(Transform::IDENTITY, duration);
                false
            }
        }
    }

    pub fn reset(&mut self, duration: Option<Duration>) {
        let duration = duration.unwrap_or_else(|| self.config.fit_duration());
        self.fit_mode = false;
        self.animate_to(Transform::IDENTITY, duration);
    }

    /// Leave fit mode for a user-driven interaction (drag or selection).
    pub fn exit_fit(&mut self) {
        if self.fit_mode || !self.target().is_identity() {
            self.reset(None);
        }
    }

    fn animate_to(&mut self, target: Transform, duration: Duration) {
        if duration.is_zero() {
            self.transform = target;
            self.transition = None;
            return;
        }
        self.transition = Some(Transition {
            from: self.transform,
            to: target,
            elapsed: Duration::ZERO,
            duration,
            easing: self.config.easing,
        });
    }

    // =========================================================================
    // FRAME UPDATES
    // =========================================================================

    /// Advance any running transition. Returns true if the transform changed.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };
        transition.elapsed += dt;
        let t = transition.progress();
        self.transform = transition
            .from
            .lerp(&transition.to, transition.easing.apply(t));
        if t >= 1.0 {
            self.transform = transition.to;
            self.transition = None;
        }
        true
    }

    /// Keep a fitted camera framing nodes that are still moving.
    pub fn follow(&mut self, boxes: impl IntoIterator<Item = NoteBox>) -> bool {
        if !self.fit_mode || self.transition.is_some() {
            return false;
        }
        let Some(target) = compute_fit(boxes, self.size, self.config.padding) else {
            return false;
        };
        let changed = target != self.transform;
        self.transform = target;
        changed
    }

    /// Adopt a new surface size, re-running the active mode immediately.
    pub fn resize(&mut self, size: ViewportSize, boxes: impl IntoIterator<Item = NoteBox>) {
        self.size = size;
        if !self.fit_mode {
            return;
        }
        match compute_fit(boxes, size, self.config.padding) {
            Some(target) => self.animate_to(target, Duration::ZERO),
            None => {
                self.fit_mode = false;
                self.animate_to(Transform::IDENTITY, Duration::ZERO);
            }
        }
    }
}
