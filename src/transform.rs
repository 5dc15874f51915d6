//! Per-view transform applied while a view is being dragged
//!
//! The transform keeps the point at `relative_grab` inside the view pinned
//! to `grab_position`, and scales the rest of the view around that point.
//! A scale factor of 2.0 shows the view at half its width and height.

use cgmath::Vector2;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::animation::{AnimatedScalar, EasingCurve};
use crate::geometry::{find_geometry_around, Point, PointF, Rect, Size};

/// A transform shared between the session entry that owns it and the
/// render tree it is attached to
pub type SharedTransform = Rc<RefCell<GrabTransform>>;

#[derive(Debug, Clone)]
pub struct GrabTransform {
    relative_grab: PointF,
    grab_position: Point,
    scale_factor: AnimatedScalar,
    /// Untransformed bounding box of the view, refreshed by the session
    content_box: Rect,
}

impl GrabTransform {
    pub fn new(
        content_box: Rect,
        grab_position: Point,
        relative_grab: PointF,
        initial_scale: f64,
        scale_duration: Duration,
        scale_curve: EasingCurve,
    ) -> Self {
        Self {
            relative_grab,
            grab_position,
            scale_factor: AnimatedScalar::new(initial_scale, scale_duration, scale_curve),
            content_box,
        }
    }

    pub fn into_shared(self) -> SharedTransform {
        Rc::new(RefCell::new(self))
    }

    pub fn relative_grab(&self) -> PointF {
        self.relative_grab
    }

    pub fn grab_position(&self) -> Point {
        self.grab_position
    }

    pub fn set_grab_position(&mut self, position: Point) {
        self.grab_position = position;
    }

    pub fn content_box(&self) -> Rect {
        self.content_box
    }

    pub fn set_content_box(&mut self, content_box: Rect) {
        self.content_box = content_box;
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor.current()
    }

    pub fn scale_target(&self) -> f64 {
        self.scale_factor.target()
    }

    pub fn is_scaling(&self) -> bool {
        self.scale_factor.is_running()
    }

    /// The grab anchor inside the untransformed content box
    fn anchor(&self) -> Vector2<f64> {
        let bbox = self.content_box;
        Vector2::new(
            bbox.x as f64 + bbox.width as f64 * self.relative_grab.x,
            bbox.y as f64 + bbox.height as f64 * self.relative_grab.y,
        )
    }

    fn grab(&self) -> Vector2<f64> {
        Vector2::new(self.grab_position.x as f64, self.grab_position.y as f64)
    }

    /// Map a point of the view's content to layout coordinates
    pub fn to_screen(&self, local: PointF) -> PointF {
        let local = Vector2::new(local.x, local.y);
        let screen = self.grab() + (local - self.anchor()) / self.scale_factor();
        PointF::new(screen.x, screen.y)
    }

    /// Map a layout point back into the view's content coordinates
    pub fn to_local(&self, screen: PointF) -> PointF {
        let screen = Vector2::new(screen.x, screen.y);
        let local = self.anchor() + (screen - self.grab()) * self.scale_factor();
        PointF::new(local.x, local.y)
    }

    /// Where the view currently appears, in layout coordinates
    pub fn bounding_box(&self) -> Rect {
        let bbox = self.content_box;
        let scale = self.scale_factor();
        let size = Size::new(
            (bbox.width as f64 / scale).floor() as i32,
            (bbox.height as f64 / scale).floor() as i32,
        );

        find_geometry_around(size, self.grab_position, self.relative_grab)
    }

    /// Animate the scale factor towards `target`.
    ///
    /// Returns the region to repaint if the visible box changed immediately.
    pub fn set_scale(&mut self, target: f64) -> Option<Rect> {
        let before = self.bounding_box();
        self.scale_factor.start(target);
        self.damage_since(before)
    }

    /// Advance the scale animation by one frame.
    ///
    /// Returns the union of the old and new box when the view grew or shrank.
    pub fn advance(&mut self, delta: Duration) -> Option<Rect> {
        let before = self.bounding_box();
        self.scale_factor.advance(delta);
        self.damage_since(before)
    }

    fn damage_since(&self, before: Rect) -> Option<Rect> {
        let after = self.bounding_box();
        (after != before).then(|| before.union(&after))
    }
}
