//! In-memory compositor implementing every host capability
//!
//! Used by the `move-drag replay` command and by tests. It keeps a flat model
//! of outputs and views, applies window-management requests to that model,
//! and records render-tree and deformation calls so they can be inspected.

use log::trace;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use crate::geometry::{Point, PointF, Rect, Size};
use crate::host::{
    Deformation, OutputId, OutputLayout, SceneGraph, Seat, TiledEdges, ViewId, ViewModel,
    WindowManagement,
};
use crate::overlay::OverlayNode;
use crate::transform::SharedTransform;

/// A recorded call into the deformation model or window manager
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    StartGrab { view: ViewId, relative: PointF },
    Anchor { view: ViewId, edges: TiledEdges },
    Unanchor(ViewId),
    GrabMoved { view: ViewId, to: Point },
    Translate { view: ViewId, delta: Point },
    Rebuild { view: ViewId, geometry: Rect },
    ResetToLocal(ViewId),
    Grabbed { view: ViewId, grabbed: bool },
    MoveView { view: ViewId, to: Point },
    MoveToOutput { view: ViewId, output: OutputId },
    Fullscreen { view: ViewId, output: OutputId, workspace: Point },
    Tile { view: ViewId, edges: TiledEdges, workspace: Option<Point> },
    MoveToWorkspace { view: ViewId, output: OutputId, workspace: Point },
    FocusRaise(ViewId),
}

#[derive(Debug, Clone)]
struct HeadlessOutput {
    geometry: Rect,
    grid: Size,
    workspace: Point,
}

#[derive(Debug, Clone)]
struct HeadlessView {
    /// Visual box in layout coordinates, decorations included
    bbox: Rect,
    decoration: i32,
    parent: Option<ViewId>,
    mapped: bool,
    fullscreen: bool,
    tiled: TiledEdges,
    focus_timestamp: u64,
    output: Option<OutputId>,
    workspace: Point,
}

impl HeadlessView {
    fn wm_geometry(&self) -> Rect {
        Rect::new(
            self.bbox.x + self.decoration,
            self.bbox.y + self.decoration,
            self.bbox.width - 2 * self.decoration,
            self.bbox.height - 2 * self.decoration,
        )
    }
}

#[derive(Default)]
struct HeadlessState {
    outputs: BTreeMap<OutputId, HeadlessOutput>,
    views: BTreeMap<ViewId, HeadlessView>,
    focus_clock: u64,

    transforms: HashMap<ViewId, SharedTransform>,
    disabled: HashSet<ViewId>,
    overlays: Vec<Rc<OverlayNode>>,
    damage: Vec<Rect>,
    frame_hooks: Vec<OutputId>,
    frame_hook_removals: usize,

    cursor: String,
    focused_output: Option<OutputId>,
    watched: BTreeSet<ViewId>,
    grabbed: BTreeSet<ViewId>,
    calls: Vec<HostCall>,
}

/// Squared distance from `point` to the nearest pixel of `rect`
fn squared_distance(rect: Rect, point: Point) -> i128 {
    let axis = |value: i32, start: i32, len: i32| -> i128 {
        let (value, start) = (value as i128, start as i128);
        let end = start + len as i128 - 1;
        if value < start {
            start - value
        } else if value > end {
            value - end
        } else {
            0
        }
    };
    let dx = axis(point.x, rect.x, rect.width);
    let dy = axis(point.y, rect.y, rect.height);
    dx * dx + dy * dy
}

impl HeadlessState {
    fn output_containing(&self, point: Point) -> Option<OutputId> {
        self.outputs
            .iter()
            .find(|(_, output)| output.geometry.contains(point))
            .map(|(id, _)| *id)
    }

    fn closest_output(&self, point: Point) -> Option<OutputId> {
        self.output_containing(point).or_else(|| {
            self.outputs
                .iter()
                .min_by_key(|(_, output)| squared_distance(output.geometry, point))
                .map(|(id, _)| *id)
        })
    }

    fn next_focus_stamp(&mut self) -> u64 {
        self.focus_clock += 1;
        self.focus_clock
    }
}

/// Headless compositor model
pub struct HeadlessCompositor {
    state: RefCell<HeadlessState>,
}

impl Default for HeadlessCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessCompositor {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                cursor: "default".to_string(),
                ..HeadlessState::default()
            }),
        }
    }

    pub fn add_output(&self, id: OutputId, geometry: Rect, grid: Size) {
        self.state.borrow_mut().outputs.insert(
            id,
            HeadlessOutput {
                geometry,
                grid,
                workspace: Point::default(),
            },
        );
    }

    pub fn set_current_workspace(&self, output: OutputId, workspace: Point) {
        if let Some(output) = self.state.borrow_mut().outputs.get_mut(&output) {
            output.workspace = workspace;
        }
    }

    /// Add a mapped view; it lands on the output containing its top-left corner
    /// and becomes the most recently focused view.
    pub fn add_view(&self, id: ViewId, bbox: Rect) {
        let mut state = self.state.borrow_mut();
        let output = state.output_containing(bbox.origin());
        let workspace = output
            .and_then(|output| state.outputs.get(&output))
            .map(|output| output.workspace)
            .unwrap_or_default();
        let focus_timestamp = state.next_focus_stamp();

        state.views.insert(
            id,
            HeadlessView {
                bbox,
                decoration: 0,
                parent: None,
                mapped: true,
                fullscreen: false,
                tiled: TiledEdges::NONE,
                focus_timestamp,
                output,
                workspace,
            },
        );
    }

    pub fn add_child(&self, id: ViewId, parent: ViewId, bbox: Rect) {
        self.add_view(id, bbox);
        self.update_view(id, |view| view.parent = Some(parent));
    }

    pub fn set_decoration(&self, id: ViewId, decoration: i32) {
        self.update_view(id, |view| view.decoration = decoration);
    }

    pub fn set_fullscreen(&self, id: ViewId, fullscreen: bool) {
        self.update_view(id, |view| view.fullscreen = fullscreen);
    }

    pub fn set_tiled(&self, id: ViewId, edges: TiledEdges) {
        self.update_view(id, |view| view.tiled = edges);
    }

    pub fn set_mapped(&self, id: ViewId, mapped: bool) {
        self.update_view(id, |view| view.mapped = mapped);
    }

    pub fn set_view_bbox(&self, id: ViewId, bbox: Rect) {
        self.update_view(id, |view| view.bbox = bbox);
    }

    /// Give the view focus, stamping it as the most recent
    pub fn focus(&self, id: ViewId) {
        let mut state = self.state.borrow_mut();
        let stamp = state.next_focus_stamp();
        if let Some(view) = state.views.get_mut(&id) {
            view.focus_timestamp = stamp;
        }
    }

    /// Destroy a view. Returns whether someone asked to be told about it;
    /// if so the caller owes the session a `handle_view_destroyed`.
    pub fn remove_view(&self, id: ViewId) -> bool {
        let mut state = self.state.borrow_mut();
        state.views.remove(&id);
        state.watched.contains(&id)
    }

    fn update_view(&self, id: ViewId, apply: impl FnOnce(&mut HeadlessView)) {
        if let Some(view) = self.state.borrow_mut().views.get_mut(&id) {
            apply(view);
        }
    }

    fn record(&self, call: HostCall) {
        trace!("Headless host call: {:?}", call);
        self.state.borrow_mut().calls.push(call);
    }

    pub fn view_bbox(&self, id: ViewId) -> Option<Rect> {
        self.state.borrow().views.get(&id).map(|view| view.bbox)
    }

    pub fn view_workspace(&self, id: ViewId) -> Option<Point> {
        self.state.borrow().views.get(&id).map(|view| view.workspace)
    }

    pub fn view_output(&self, id: ViewId) -> Option<OutputId> {
        self.state.borrow().views.get(&id).and_then(|view| view.output)
    }

    pub fn is_fullscreen(&self, id: ViewId) -> bool {
        self.state
            .borrow()
            .views
            .get(&id)
            .map(|view| view.fullscreen)
            .unwrap_or(false)
    }

    pub fn damage_log(&self) -> Vec<Rect> {
        self.state.borrow().damage.clone()
    }

    pub fn clear_damage(&self) {
        self.state.borrow_mut().damage.clear();
    }

    pub fn frame_hooks(&self) -> Vec<OutputId> {
        self.state.borrow().frame_hooks.clone()
    }

    pub fn frame_hook_removals(&self) -> usize {
        self.state.borrow().frame_hook_removals
    }

    pub fn cursor(&self) -> String {
        self.state.borrow().cursor.clone()
    }

    pub fn focused_output(&self) -> Option<OutputId> {
        self.state.borrow().focused_output
    }

    pub fn overlay_count(&self) -> usize {
        self.state.borrow().overlays.len()
    }

    pub fn attached_transform(&self, id: ViewId) -> Option<SharedTransform> {
        self.state.borrow().transforms.get(&id).cloned()
    }

    pub fn is_view_enabled(&self, id: ViewId) -> bool {
        !self.state.borrow().disabled.contains(&id)
    }

    pub fn watched_views(&self) -> Vec<ViewId> {
        self.state.borrow().watched.iter().copied().collect()
    }

    pub fn is_grabbed(&self, id: ViewId) -> bool {
        self.state.borrow().grabbed.contains(&id)
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }
}

impl ViewModel for HeadlessCompositor {
    fn bounding_box(&self, view: ViewId) -> Option<Rect> {
        self.view_bbox(view)
    }

    fn wm_geometry(&self, view: ViewId) -> Option<Rect> {
        self.state.borrow().views.get(&view).map(HeadlessView::wm_geometry)
    }

    fn is_mapped(&self, view: ViewId) -> bool {
        self.state
            .borrow()
            .views
            .get(&view)
            .map(|view| view.mapped)
            .unwrap_or(false)
    }

    fn parent(&self, view: ViewId) -> Option<ViewId> {
        self.state.borrow().views.get(&view).and_then(|view| view.parent)
    }

    fn enumerate_views(&self, view: ViewId) -> Vec<ViewId> {
        let state = self.state.borrow();
        if !state.views.contains_key(&view) {
            return Vec::new();
        }

        let mut result = Vec::new();
        let mut pending = vec![view];
        while let Some(next) = pending.pop() {
            result.push(next);
            let mut children: Vec<ViewId> = state
                .views
                .iter()
                .filter(|(_, child)| child.parent == Some(next))
                .map(|(id, _)| *id)
                .collect();
            children.reverse();
            pending.extend(children);
        }

        result
    }

    fn pending_fullscreen(&self, view: ViewId) -> bool {
        self.is_fullscreen(view)
    }

    fn pending_tiled_edges(&self, view: ViewId) -> TiledEdges {
        self.state
            .borrow()
            .views
            .get(&view)
            .map(|view| view.tiled)
            .unwrap_or_default()
    }

    fn focus_timestamp(&self, view: ViewId) -> u64 {
        self.state
            .borrow()
            .views
            .get(&view)
            .map(|view| view.focus_timestamp)
            .unwrap_or(0)
    }

    fn output_of(&self, view: ViewId) -> Option<OutputId> {
        self.view_output(view)
    }

    fn watch_destruction(&self, view: ViewId) {
        self.state.borrow_mut().watched.insert(view);
    }

    fn unwatch_destruction(&self, view: ViewId) {
        self.state.borrow_mut().watched.remove(&view);
    }
}

impl OutputLayout for HeadlessCompositor {
    fn closest_output(&self, point: Point) -> Option<OutputId> {
        self.state.borrow().closest_output(point)
    }

    fn layout_geometry(&self, output: OutputId) -> Option<Rect> {
        self.state
            .borrow()
            .outputs
            .get(&output)
            .map(|output| output.geometry)
    }

    fn current_workspace(&self, output: OutputId) -> Point {
        self.state
            .borrow()
            .outputs
            .get(&output)
            .map(|output| output.workspace)
            .unwrap_or_default()
    }

    fn workspace_grid_size(&self, output: OutputId) -> Size {
        self.state
            .borrow()
            .outputs
            .get(&output)
            .map(|output| output.grid)
            .unwrap_or(Size::new(1, 1))
    }
}

impl SceneGraph for HeadlessCompositor {
    fn attach_transform(&self, view: ViewId, transform: SharedTransform) {
        self.state.borrow_mut().transforms.insert(view, transform);
    }

    fn detach_transform(&self, view: ViewId) {
        self.state.borrow_mut().transforms.remove(&view);
    }

    fn set_view_enabled(&self, view: ViewId, enabled: bool) {
        let mut state = self.state.borrow_mut();
        if enabled {
            state.disabled.remove(&view);
        } else {
            state.disabled.insert(view);
        }
    }

    fn add_overlay(&self, overlay: Rc<OverlayNode>) {
        self.state.borrow_mut().overlays.push(overlay);
    }

    fn remove_overlay(&self, overlay: &Rc<OverlayNode>) {
        self.state
            .borrow_mut()
            .overlays
            .retain(|node| !Rc::ptr_eq(node, overlay));
    }

    fn damage(&self, region: Rect) {
        self.state.borrow_mut().damage.push(region);
    }

    fn add_frame_hook(&self, output: OutputId) {
        self.state.borrow_mut().frame_hooks.push(output);
    }

    fn remove_frame_hook(&self, output: OutputId) {
        let mut state = self.state.borrow_mut();
        if let Some(index) = state.frame_hooks.iter().position(|hook| *hook == output) {
            state.frame_hooks.remove(index);
            state.frame_hook_removals += 1;
        }
    }
}

impl Deformation for HeadlessCompositor {
    fn start_grab(&self, view: ViewId, relative: PointF) {
        self.record(HostCall::StartGrab { view, relative });
    }

    fn anchor(&self, view: ViewId, edges: TiledEdges) {
        self.record(HostCall::Anchor { view, edges });
    }

    fn unanchor(&self, view: ViewId) {
        self.record(HostCall::Unanchor(view));
    }

    fn grab_moved(&self, view: ViewId, to: Point) {
        self.record(HostCall::GrabMoved { view, to });
    }

    fn translate(&self, view: ViewId, delta: Point) {
        self.record(HostCall::Translate { view, delta });
    }

    fn rebuild_from_geometry(&self, view: ViewId, geometry: Rect) {
        self.record(HostCall::Rebuild { view, geometry });
    }

    fn reset_to_local_space(&self, view: ViewId) {
        self.record(HostCall::ResetToLocal(view));
    }
}

impl Seat for HeadlessCompositor {
    fn set_cursor(&self, name: &str) {
        self.state.borrow_mut().cursor = name.to_string();
    }

    fn focus_output(&self, output: OutputId) {
        self.state.borrow_mut().focused_output = Some(output);
    }
}

impl WindowManagement for HeadlessCompositor {
    fn set_view_grabbed(&self, view: ViewId, grabbed: bool) {
        {
            let mut state = self.state.borrow_mut();
            if grabbed {
                state.grabbed.insert(view);
            } else {
                state.grabbed.remove(&view);
            }
        }
        self.record(HostCall::Grabbed { view, grabbed });
    }

    fn move_view(&self, view: ViewId, to: Point) {
        {
            let mut state = self.state.borrow_mut();
            let origin = state
                .views
                .get(&view)
                .and_then(|view| view.output)
                .and_then(|output| state.outputs.get(&output))
                .map(|output| output.geometry.origin())
                .unwrap_or_default();

            if let Some(entry) = state.views.get_mut(&view) {
                let decoration = Point::new(entry.decoration, entry.decoration);
                let wm_origin = to + origin;
                let bbox_origin = wm_origin - decoration;
                entry.bbox = Rect::from_loc_and_size(bbox_origin, entry.bbox.size());
            }
        }
        self.record(HostCall::MoveView { view, to });
    }

    fn move_to_output(&self, view: ViewId, output: OutputId) {
        let tree = self.enumerate_views(view);
        {
            let mut state = self.state.borrow_mut();
            for id in tree {
                if let Some(entry) = state.views.get_mut(&id) {
                    entry.output = Some(output);
                }
            }
        }
        self.record(HostCall::MoveToOutput { view, output });
    }

    fn fullscreen_request(&self, view: ViewId, output: OutputId, workspace: Point) {
        self.update_view(view, |entry| {
            entry.fullscreen = true;
            entry.output = Some(output);
            entry.workspace = workspace;
        });
        self.record(HostCall::Fullscreen {
            view,
            output,
            workspace,
        });
    }

    fn tile_request(&self, view: ViewId, edges: TiledEdges, workspace: Option<Point>) {
        self.update_view(view, |entry| {
            entry.tiled = edges;
            if let Some(workspace) = workspace {
                entry.workspace = workspace;
            }
        });
        self.record(HostCall::Tile {
            view,
            edges,
            workspace,
        });
    }

    fn move_to_workspace(&self, view: ViewId, output: OutputId, workspace: Point) {
        self.update_view(view, |entry| {
            entry.output = Some(output);
            entry.workspace = workspace;
        });
        self.record(HostCall::MoveToWorkspace {
            view,
            output,
            workspace,
        });
    }

    fn focus_raise(&self, view: ViewId) {
        self.focus(view);
        self.record(HostCall::FocusRaise(view));
    }
}
