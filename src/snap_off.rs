//! Holding a tiled or fullscreen view in place until it is dragged far enough

use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapState {
    /// The view stays where it is, only the deformation model follows input
    Held,
    /// The view tracks the input
    Free,
}

#[derive(Debug, Clone)]
pub struct SnapOffController {
    state: SnapState,
    origin: Point,
    threshold: f64,
}

impl SnapOffController {
    pub fn new(held: bool, origin: Point, threshold: f64) -> Self {
        Self {
            state: if held { SnapState::Held } else { SnapState::Free },
            origin,
            threshold,
        }
    }

    pub fn state(&self) -> SnapState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == SnapState::Held
    }

    pub fn distance_to_origin(&self, position: Point) -> f64 {
        self.origin.distance_to(position)
    }

    /// Check motion to `position`; returns true only on the call that frees the view.
    /// Once free, the controller never re-arms.
    pub fn check(&mut self, position: Point) -> bool {
        if self.state == SnapState::Free {
            return false;
        }

        if self.distance_to_origin(position) >= self.threshold {
            self.state = SnapState::Free;
            return true;
        }

        false
    }
}
