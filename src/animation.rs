//! Time-driven animated values
//!
//! The drag engine never owns a clock. An [`AnimatedScalar`] is started with
//! a target and advanced by whoever drives frames (the render scheduler's
//! per-frame hook), which keeps timing out of the geometry code.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Easing curves for animated values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EasingCurve {
    Linear,
    EaseIn,
    #[default]
    EaseOut,
    EaseInOut,
}

impl EasingCurve {
    /// Look a curve up by its configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(EasingCurve::Linear),
            "ease-in" => Some(EasingCurve::EaseIn),
            "ease-out" => Some(EasingCurve::EaseOut),
            "ease-in-out" => Some(EasingCurve::EaseInOut),
            _ => None,
        }
    }

    /// Map linear progress in `[0, 1]` onto the curve
    pub fn apply(self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);

        match self {
            EasingCurve::Linear => t,
            EasingCurve::EaseIn => t * t,
            EasingCurve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            EasingCurve::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// A scalar animating from a start value towards a target over a fixed duration
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedScalar {
    start: f64,
    end: f64,
    current: f64,
    elapsed: Duration,
    duration: Duration,
    curve: EasingCurve,
    running: bool,
}

impl AnimatedScalar {
    /// Create a settled animation resting at `value`
    pub fn new(value: f64, duration: Duration, curve: EasingCurve) -> Self {
        Self {
            start: value,
            end: value,
            current: value,
            elapsed: Duration::ZERO,
            duration,
            curve,
            running: false,
        }
    }

    /// Jump to `value` without animating
    pub fn set_immediate(&mut self, value: f64) {
        self.start = value;
        self.end = value;
        self.current = value;
        self.elapsed = Duration::ZERO;
        self.running = false;
    }

    /// Animate from the current value towards `target`.
    ///
    /// Restarting towards the target already being approached keeps the
    /// running animation untouched.
    pub fn start(&mut self, target: f64) {
        if target == self.end {
            return;
        }

        self.start = self.current;
        self.end = target;
        self.elapsed = Duration::ZERO;

        if self.duration.is_zero() {
            self.current = target;
            self.running = false;
        } else {
            self.running = true;
        }
    }

    /// Advance the animation by one frame interval
    pub fn advance(&mut self, delta: Duration) {
        if !self.running {
            return;
        }

        self.elapsed += delta;
        if self.elapsed >= self.duration {
            self.current = self.end;
            self.running = false;
            return;
        }

        let progress = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.current = self.start + (self.end - self.start) * self.curve.apply(progress);
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.end
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
