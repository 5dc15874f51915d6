//! Overlay node rendering dragged views above all normal content
//!
//! While dragged, views are drawn in layout coordinates on whatever output
//! the grab is over. Their normal layer does not know about this, so the
//! overlay takes over damage tracking: any change repaints the union of the
//! previous and the current overlay box, which clears the old position.

use std::cell::Cell;

use crate::geometry::Rect;
use crate::host::{SceneGraph, ViewId};
use crate::transform::SharedTransform;

/// Half-extent of the region the overlay reports as visible
const VISIBILITY_EXTENT: i32 = 100_000;

pub struct OverlayNode {
    views: Vec<(ViewId, SharedTransform)>,
    last_bbox: Cell<Rect>,
}

impl OverlayNode {
    pub fn new(views: Vec<(ViewId, SharedTransform)>) -> Self {
        let node = Self {
            views,
            last_bbox: Cell::new(Rect::default()),
        };
        node.last_bbox.set(node.bounding_box());
        node
    }

    /// Views rendered by this node, bottom to top
    pub fn views(&self) -> impl Iterator<Item = &(ViewId, SharedTransform)> {
        self.views.iter()
    }

    /// Union of every dragged view's transformed box
    pub fn bounding_box(&self) -> Rect {
        self.views
            .iter()
            .fold(Rect::default(), |acc, (_, transform)| {
                acc.union(&transform.borrow().bounding_box())
            })
    }

    /// Box used for the last damage request
    pub fn last_bounding_box(&self) -> Rect {
        self.last_bbox.get()
    }

    /// A child changed: repaint where the overlay was and where it is now
    pub fn on_child_damage(&self, scene: &dyn SceneGraph) {
        let previous = self.last_bbox.get();
        let current = self.bounding_box();
        self.last_bbox.set(current);

        let region = previous.union(&current);
        if !region.is_empty() {
            scene.damage(region);
        }
    }

    /// Region to treat as visible during occlusion culling.
    ///
    /// Never narrowed to the origin output of a view: the view may be shown
    /// on a completely different output than the one managing it.
    pub fn visible_region(&self) -> Rect {
        Rect::new(
            -VISIBILITY_EXTENT,
            -VISIBILITY_EXTENT,
            2 * VISIBILITY_EXTENT,
            2 * VISIBILITY_EXTENT,
        )
    }
}

impl std::fmt::Debug for OverlayNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let views: Vec<ViewId> = self.views.iter().map(|(view, _)| *view).collect();
        f.debug_struct("OverlayNode")
            .field("views", &views)
            .field("last_bbox", &self.last_bbox.get())
            .finish()
    }
}
