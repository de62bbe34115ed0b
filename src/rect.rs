//! Rectangles.

use cgmath::{EuclideanSpace, Point2, Vector2, Zero};

/// A rectangle, in the coordinate space of whoever owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Rectangle origin.
    pub origin: Point2<f64>,

    /// Rectangle size.
    pub size: Vector2<f64>,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point2<f64>, size: Vector2<f64>) -> Rect {
        Rect { origin, size }
    }

    /// Creates a new rectangle from its components.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            origin: Point2::new(x, y),
            size: Vector2::new(width, height),
        }
    }

    /// Returns a zero-sized rectangle at the origin.
    pub fn zero() -> Rect {
        Rect {
            origin: Point2::new(0., 0.),
            size: Vector2::zero(),
        }
    }

    pub fn x(&self) -> f64 {
        self.origin.x
    }

    pub fn y(&self) -> f64 {
        self.origin.y
    }

    pub fn width(&self) -> f64 {
        self.size.x
    }

    pub fn height(&self) -> f64 {
        self.size.y
    }

    /// Returns true if the point is inside the rectangle.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.size.x
            && point.y < self.origin.y + self.size.y
    }

    /// Returns a new rectangle with the given origin.
    pub fn with_origin(&self, origin: Point2<f64>) -> Rect {
        Rect {
            origin,
            size: self.size,
        }
    }

    /// Returns the same size rebased to the origin, i.e. this rectangle as seen from inside itself.
    pub fn local(&self) -> Rect {
        self.with_origin(Point2::origin())
    }
}

#[test]
fn test_rect_local() {
    let rect = Rect::from_xywh(50., 25., 100., 200.);
    assert_eq!(rect.local(), Rect::from_xywh(0., 0., 100., 200.));
    assert!(rect.contains(Point2::new(50., 25.)));
    assert!(!rect.contains(Point2::new(150., 25.)));
}
