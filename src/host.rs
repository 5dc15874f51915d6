//! Capabilities the drag engine consumes from its host compositor
//!
//! The engine never reaches into a global compositor object. Every
//! collaborator is a narrow trait, and a [`Host`] bundles one implementation
//! of each so it can be handed to a [`DragSession`](crate::session::DragSession)
//! by the plugin that owns it.
//!
//! All methods take `&self`: the engine runs on the compositor main loop and
//! implementations keep their own state behind interior mutability.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use crate::geometry::{Point, PointF, Rect, Size};
use crate::overlay::OverlayNode;
use crate::transform::SharedTransform;

/// Identifier of a view (toplevel window or dialog)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Identifier of an output (monitor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputId(pub u32);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// Bitmask of the edges a view is tiled against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TiledEdges(pub u32);

impl TiledEdges {
    pub const NONE: TiledEdges = TiledEdges(0);
    pub const TOP: TiledEdges = TiledEdges(1);
    pub const BOTTOM: TiledEdges = TiledEdges(2);
    pub const LEFT: TiledEdges = TiledEdges(4);
    pub const RIGHT: TiledEdges = TiledEdges(8);
    pub const ALL: TiledEdges = TiledEdges(1 | 2 | 4 | 8);

    pub fn is_tiled(self) -> bool {
        self.0 != 0
    }
}

impl std::ops::BitOr for TiledEdges {
    type Output = TiledEdges;

    fn bitor(self, rhs: TiledEdges) -> TiledEdges {
        TiledEdges(self.0 | rhs.0)
    }
}

/// The window-management view model
pub trait ViewModel {
    /// Visual bounding box in layout coordinates, excluding the drag transform.
    /// `None` once the view no longer exists.
    fn bounding_box(&self, view: ViewId) -> Option<Rect>;

    /// Window-manager geometry in layout coordinates (excludes decorations)
    fn wm_geometry(&self, view: ViewId) -> Option<Rect>;

    fn is_mapped(&self, view: ViewId) -> bool;

    fn parent(&self, view: ViewId) -> Option<ViewId>;

    /// The view followed by all of its descendants (dialogs, transient children)
    fn enumerate_views(&self, view: ViewId) -> Vec<ViewId>;

    fn pending_fullscreen(&self, view: ViewId) -> bool;

    fn pending_tiled_edges(&self, view: ViewId) -> TiledEdges;

    /// Strictly increasing stamp of the last time the view received focus
    fn focus_timestamp(&self, view: ViewId) -> u64;

    fn output_of(&self, view: ViewId) -> Option<OutputId>;

    /// Ask to be told when the view goes away. Delivery is the host's job:
    /// it must call `DragSession::handle_view_destroyed` for a watched view.
    fn watch_destruction(&self, view: ViewId);

    fn unwatch_destruction(&self, view: ViewId);

    /// Root of the view's parent chain
    fn toplevel(&self, view: ViewId) -> ViewId {
        let mut view = view;
        while let Some(parent) = self.parent(view) {
            view = parent;
        }
        view
    }
}

/// Output layout and per-output workspace grids
pub trait OutputLayout {
    /// Output whose layout rectangle contains `point`, or else the one
    /// nearest to it. `None` only when there are no outputs.
    fn closest_output(&self, point: Point) -> Option<OutputId>;

    fn layout_geometry(&self, output: OutputId) -> Option<Rect>;

    fn current_workspace(&self, output: OutputId) -> Point;

    fn workspace_grid_size(&self, output: OutputId) -> Size;
}

/// Render tree operations used while a drag is in progress
pub trait SceneGraph {
    fn attach_transform(&self, view: ViewId, transform: SharedTransform);

    fn detach_transform(&self, view: ViewId);

    /// Toggle the view's node in its normal layer
    fn set_view_enabled(&self, view: ViewId, enabled: bool);

    /// Insert a node above all normal content
    fn add_overlay(&self, overlay: Rc<OverlayNode>);

    fn remove_overlay(&self, overlay: &Rc<OverlayNode>);

    /// Request a repaint of `region` (layout coordinates) on every output it touches
    fn damage(&self, region: Rect);

    /// Start calling `DragSession::handle_frame` before each frame of `output`
    fn add_frame_hook(&self, output: OutputId);

    fn remove_frame_hook(&self, output: OutputId);
}

/// The physically simulated "wobbly" mesh attached to views
pub trait Deformation {
    /// A grab started at `relative` inside the view
    fn start_grab(&self, view: ViewId, relative: PointF);

    /// Keep the mesh pinned to the given edges
    fn anchor(&self, view: ViewId, edges: TiledEdges);

    fn unanchor(&self, view: ViewId);

    /// The grab point moved to `to` (layout coordinates)
    fn grab_moved(&self, view: ViewId, to: Point);

    fn translate(&self, view: ViewId, delta: Point);

    /// Replace the model's geometry without animating the change
    fn rebuild_from_geometry(&self, view: ViewId, geometry: Rect);

    /// End the grab; the model continues in output-local coordinates
    fn reset_to_local_space(&self, view: ViewId);
}

/// Input seat affordances
pub trait Seat {
    fn set_cursor(&self, name: &str);

    fn focus_output(&self, output: OutputId);
}

/// Window-management requests issued when a drag starts or ends
pub trait WindowManagement {
    fn set_view_grabbed(&self, view: ViewId, grabbed: bool);

    /// Move the view's window-manager geometry to `to`, in output-local coordinates
    fn move_view(&self, view: ViewId, to: Point);

    fn move_to_output(&self, view: ViewId, output: OutputId);

    fn fullscreen_request(&self, view: ViewId, output: OutputId, workspace: Point);

    fn tile_request(&self, view: ViewId, edges: TiledEdges, workspace: Option<Point>);

    fn move_to_workspace(&self, view: ViewId, output: OutputId, workspace: Point);

    fn focus_raise(&self, view: ViewId);
}

/// Deformation model for hosts without wobbly windows
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDeformation;

impl Deformation for NoDeformation {
    fn start_grab(&self, _view: ViewId, _relative: PointF) {}
    fn anchor(&self, _view: ViewId, _edges: TiledEdges) {}
    fn unanchor(&self, _view: ViewId) {}
    fn grab_moved(&self, _view: ViewId, _to: Point) {}
    fn translate(&self, _view: ViewId, _delta: Point) {}
    fn rebuild_from_geometry(&self, _view: ViewId, _geometry: Rect) {}
    fn reset_to_local_space(&self, _view: ViewId) {}
}

/// One implementation of every capability the engine needs
#[derive(Clone)]
pub struct Host {
    pub views: Rc<dyn ViewModel>,
    pub outputs: Rc<dyn OutputLayout>,
    pub scene: Rc<dyn SceneGraph>,
    pub deformation: Rc<dyn Deformation>,
    pub seat: Rc<dyn Seat>,
    pub wm: Rc<dyn WindowManagement>,
}

impl Host {
    /// Build a host from a single backend implementing every capability
    pub fn from_backend<B>(backend: Rc<B>) -> Self
    where
        B: ViewModel + OutputLayout + SceneGraph + Deformation + Seat + WindowManagement + 'static,
    {
        Self {
            views: backend.clone(),
            outputs: backend.clone(),
            scene: backend.clone(),
            deformation: backend.clone(),
            seat: backend.clone(),
            wm: backend,
        }
    }

    /// Same backend, but without a deformation model
    pub fn without_deformation(mut self) -> Self {
        self.deformation = Rc::new(NoDeformation);
        self
    }
}
