use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Width/height of the surface the engine draws into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Half of a note box's width and height, used for fitting and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalfExtent {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Bounds of the bare `points`. `None` when empty.
    pub fn of_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    /// Union of boxes given as center plus half extent. `None` when empty.
    pub fn of_boxes(boxes: impl IntoIterator<Item = (Point, HalfExtent)>) -> Option<Self> {
        boxes
            .into_iter()
            .map(|(c, e)| Bounds {
                min_x: c.x - e.x,
                min_y: c.y - e.y,
                max_x: c.x + e.x,
                max_y: c.y + e.y,
            })
            .reduce(|a, b| Bounds {
                min_x: a.min_x.min(b.min_x),
                min_y: a.min_y.min(b.min_y),
                max_x: a.max_x.max(b.max_x),
                max_y: a.max_y.max(b.max_y),
            })
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Uniform-scale camera transform: `screen = world * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn apply(&self, world: Point) -> Point {
        Point::new(world.x * self.k + self.x, world.y * self.k + self.y)
    }

    pub fn invert(&self, screen: Point) -> Point {
        let k = if self.k.abs() < f32::EPSILON { 1.0 } else { self.k };
        Point::new((screen.x - self.x) / k, (screen.y - self.y) / k)
    }

    pub fn lerp(&self, to: &Transform, t: f32) -> Transform {
        Transform {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            k: self.k + (to.k - self.k) * t,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Transform::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_union_covers_each_extent() {
        let bounds = Bounds::of_boxes([
            (Point::new(0.0, 0.0), HalfExtent { x: 10.0, y: 5.0 }),
            (Point::new(100.0, 50.0), HalfExtent { x: 30.0, y: 5.0 }),
        ])
        .unwrap();
        assert_eq!(bounds.width(), 140.0);
        assert_eq!(bounds.height(), 60.0);
        assert_eq!(bounds.min_x, -10.0);
        assert_eq!(bounds.max_x, 130.0);
    }

    #[test]
    fn point_bounds_of_one_point_have_no_area() {
        let bounds = Bounds::of_points([Point::new(4.0, 9.0)]).unwrap();
        assert_eq!(bounds.width(), 0.0);
        assert_eq!(bounds.height(), 0.0);
        assert_eq!(Bounds::of_points(std::iter::empty()), None);
    }

    #[test]
    fn transform_invert_round_trips() {
        let t = Transform {
            x: 40.0,
            y: -12.0,
            k: 2.5,
        };
        let world = Point::new(3.0, 7.0);
        let back = t.invert(t.apply(world));
        assert!((back.x - world.x).abs() < 1e-4);
        assert!((back.y - world.y).abs() < 1e-4);
    }
}
