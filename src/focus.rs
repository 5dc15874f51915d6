//! Tracking which output owns the live grab position

use log::debug;

use crate::geometry::Point;
use crate::host::{OutputId, OutputLayout, SceneGraph};

/// Follows the grab across outputs and moves the per-frame hook with it.
///
/// The hook keeps damaging dragged views while their scale animates, so it
/// must live on exactly one output at a time and be removed exactly once for
/// every output it was added to.
#[derive(Debug, Default)]
pub struct OutputFocusTracker {
    current: Option<OutputId>,
}

impl OutputFocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<OutputId> {
        self.current
    }

    /// Resolve the output under `grab`, or the nearest one when the grab is
    /// between or beyond the outputs.
    ///
    /// On a change, `notify(previous, new)` runs after the hook has been
    /// detached from the previous output and before it is attached to the
    /// new one. Returns whether the focused output changed.
    pub fn update(
        &mut self,
        grab: Point,
        outputs: &dyn OutputLayout,
        scene: &dyn SceneGraph,
        notify: impl FnOnce(Option<OutputId>, Option<OutputId>),
    ) -> bool {
        let output = outputs.closest_output(grab);
        if output == self.current {
            return false;
        }

        let previous = self.current;
        if let Some(previous) = previous {
            scene.remove_frame_hook(previous);
        }

        self.current = output;
        debug!("Drag focus output {:?} -> {:?}", previous, output);
        notify(previous, output);

        if let Some(output) = output {
            scene.add_frame_hook(output);
        }

        true
    }

    /// Drop focus without notifying, removing the hook from the current output
    pub fn reset(&mut self, scene: &dyn SceneGraph) {
        if let Some(output) = self.current.take() {
            scene.remove_frame_hook(output);
        }
    }
}
