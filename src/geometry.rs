//! Layout-space geometry primitives
//!
//! Everything the drag engine computes is expressed in output-layout
//! coordinates: the global coordinate space spanning all outputs. Integer
//! types are used for positions that come from input devices and window
//! management, floating point for relative grab anchors.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

/// Tolerance used when flooring a product that should land on an integer.
///
/// `(a / b) * b` is not always exactly `a` in binary floating point
/// (`1.0 / 49.0 * 49.0 == 0.9999999999999999`), which would shift the
/// reconstructed geometry by one pixel.
const FLOOR_EPSILON: f64 = 1e-9;

/// Integer point in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(self, other: Point) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Floating-point point, used for relative anchors and transformed coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_loc_and_size(loc: Point, size: Size) -> Self {
        Self::new(loc.x, loc.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Half-open containment test: the right and bottom edges belong to the
    /// neighbouring box, so adjacent outputs never both claim a point.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }

    /// Smallest rectangle containing both. Empty rectangles do not contribute.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = (self.x + self.width).max(other.x + other.width);
        let y2 = (self.y + self.height).max(other.y + other.height);

        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }
}

fn floor_near_integer(value: f64) -> i32 {
    let rounded = value.round();
    if (value - rounded).abs() < FLOOR_EPSILON {
        rounded as i32
    } else {
        value.floor() as i32
    }
}

/// Find the position of `grab` relative to `view`.
///
/// Returns `(0.5, 0.5)` if the grab is the midpoint of the view. Values are
/// not clamped: a grab outside the box extrapolates, and a zero-area box
/// yields non-finite components rather than a panic.
pub fn find_relative_grab(view: Rect, grab: Point) -> PointF {
    PointF::new(
        (grab.x - view.x) as f64 / view.width as f64,
        (grab.y - view.y) as f64 / view.height as f64,
    )
}

/// Find the geometry of a view of `size` which is grabbed at `grab`, where
/// the grab sits at `relative` inside the view.
///
/// Exact inverse of [`find_relative_grab`] for any box containing the grab.
pub fn find_geometry_around(size: Size, grab: Point, relative: PointF) -> Rect {
    Rect::new(
        grab.x - floor_near_integer(relative.x * size.width as f64),
        grab.y - floor_near_integer(relative.y * size.height as f64),
        size.width,
        size.height,
    )
}
