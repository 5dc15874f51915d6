//! Interactive drag sessions
//!
//! A [`DragSession`] owns at most one active drag. Output-specific plugins
//! grab input on their output and forward it here; the session keeps the
//! dragged views under the pointer across outputs, holds tiled views in place
//! until they snap off, and reports the drop through a [`DragEvent::DragDone`]
//! event. Placement after the drop is left to the listeners, see
//! [`crate::drop`].
//!
//! The session is an explicitly owned context object: the compositor creates
//! one and hands it by reference to every plugin that can drive a drag.
//!
//! The session does not observe views itself. The host routes view
//! lifecycle into it: destruction of a watched view goes to
//! [`DragSession::handle_view_destroyed`] and unmapping to
//! [`DragSession::handle_view_unmapped`]. A host that skips this leaves the
//! session drawing a view that no longer exists.

use log::{debug, trace, warn};
use serde::Serialize;
use std::rc::Rc;
use std::time::Duration;

use crate::animation::EasingCurve;
use crate::focus::OutputFocusTracker;
use crate::geometry::{find_geometry_around, find_relative_grab, Point, PointF, Rect};
use crate::host::{Host, OutputId, TiledEdges, ViewId};
use crate::overlay::OverlayNode;
use crate::snap_off::SnapOffController;
use crate::transform::{GrabTransform, SharedTransform};

/// Options fixed for the lifetime of one drag
#[derive(Debug, Clone, PartialEq)]
pub struct DragOptions {
    /// Hold tiled and fullscreen views in place until `snap_off_threshold` is reached
    pub enable_snap_off: bool,
    /// Distance in pixels from the grab origin that frees a held view
    pub snap_off_threshold: f64,
    /// Drag the whole view tree (main window and its dialogs) together
    pub join_views: bool,
    /// Scale factor the views start with; 2.0 shows them at half size
    pub initial_scale: f64,
    pub scale_duration: Duration,
    pub scale_curve: EasingCurve,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            enable_snap_off: false,
            snap_off_threshold: 0.0,
            join_views: false,
            initial_scale: 1.0,
            scale_duration: Duration::from_millis(300),
            scale_curve: EasingCurve::EaseOut,
        }
    }
}

/// A dragged view and where inside it the grab was
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraggedViewInfo {
    pub view: ViewId,
    pub relative_grab: PointF,
}

/// Everything a listener needs to place views after a drop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragDone {
    /// Input position at release, in layout coordinates
    pub grab_position: Point,
    pub main_view: ViewId,
    pub views: Vec<DraggedViewInfo>,
    /// Output under the input at release, or the nearest one to it.
    /// `None` only when the layout has no outputs.
    pub focused_output: Option<OutputId>,
    pub join_views: bool,
    /// The view was released before it snapped off
    pub held_in_place: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DragEvent {
    /// The output under the grab changed, including when the drag begins
    FocusOutputChanged {
        previous: Option<OutputId>,
        new: Option<OutputId>,
    },
    /// A held view moved past the snap-off threshold
    SnapOffTriggered { output: Option<OutputId> },
    /// The drag ended, explicitly or because a dragged view was destroyed or unmapped
    DragDone(DragDone),
}

pub type DragListener = Box<dyn FnMut(&DragEvent)>;

struct DraggedView {
    view: ViewId,
    transform: SharedTransform,
    last_damage_box: Rect,
}

struct ActiveDrag {
    main_view: ViewId,
    /// Never empty
    views: Vec<DraggedView>,
    options: DragOptions,
    overlay: Rc<OverlayNode>,
    snap_off: SnapOffController,
}

pub struct DragSession {
    host: Host,
    active: Option<ActiveDrag>,
    focus: OutputFocusTracker,
    listeners: Vec<DragListener>,
}

impl DragSession {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            active: None,
            focus: OutputFocusTracker::new(),
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DragEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(listeners: &mut [DragListener], event: &DragEvent) {
        for listener in listeners.iter_mut() {
            listener(event);
        }
    }

    /// Start dragging `view`, computing the relative grab from its bounding box.
    pub fn start_drag_at(&mut self, view: ViewId, grab_position: Point, options: DragOptions) {
        let view = if options.join_views {
            self.host.views.toplevel(view)
        } else {
            view
        };

        let Some(bbox) = self.host.views.bounding_box(view) else {
            warn!("Cannot drag {}: it has no geometry", view);
            return;
        };

        let relative = find_relative_grab(bbox, grab_position);
        self.start_drag(view, grab_position, relative, options);
    }

    /// Start dragging `view`, grabbed at `relative` inside its bounding box,
    /// with the input at `grab_position` (layout coordinates).
    ///
    /// # Panics
    ///
    /// If a drag is already active.
    pub fn start_drag(
        &mut self,
        view: ViewId,
        grab_position: Point,
        relative: PointF,
        options: DragOptions,
    ) {
        assert!(
            self.active.is_none(),
            "start_drag({}) while another drag is active",
            view
        );

        let host = self.host.clone();
        let Some(bbox) = host.views.bounding_box(view) else {
            warn!("Cannot drag {}: it has no geometry", view);
            return;
        };

        // The grab point in layout coordinates; each participant derives its
        // own relative grab from it.
        let grab_point = Point::new(
            (bbox.x as f64 + relative.x * bbox.width as f64) as i32,
            (bbox.y as f64 + relative.y * bbox.height as f64) as i32,
        );

        let main_view = if options.join_views {
            host.views.toplevel(view)
        } else {
            view
        };
        let targets = if options.join_views {
            host.views.enumerate_views(main_view)
        } else {
            vec![main_view]
        };

        let mut views = Vec::with_capacity(targets.len());
        for target in targets {
            let Some(content) = host.views.bounding_box(target) else {
                continue;
            };

            let relative_grab = find_relative_grab(content, grab_point);
            let transform = GrabTransform::new(
                content,
                grab_position,
                relative_grab,
                options.initial_scale,
                options.scale_duration,
                options.scale_curve,
            )
            .into_shared();

            host.scene.attach_transform(target, transform.clone());
            host.scene.set_view_enabled(target, false);
            host.scene.damage(content);

            let geometry = transform.borrow().bounding_box();
            host.deformation.rebuild_from_geometry(target, geometry);
            host.deformation.start_grab(target, relative_grab);
            host.views.watch_destruction(target);

            views.push(DraggedView {
                view: target,
                transform,
                last_damage_box: geometry,
            });
        }

        if views.is_empty() {
            warn!("Cannot drag {}: no view in its tree has geometry", main_view);
            return;
        }

        host.wm.set_view_grabbed(main_view, true);

        let overlay = Rc::new(OverlayNode::new(
            views
                .iter()
                .map(|dragged| (dragged.view, dragged.transform.clone()))
                .collect(),
        ));
        host.scene.add_overlay(overlay.clone());
        host.seat.set_cursor("grabbing");

        let held = options.enable_snap_off
            && (host.views.pending_fullscreen(main_view)
                || host.views.pending_tiled_edges(main_view).is_tiled());
        if held {
            for dragged in &views {
                host.deformation.anchor(dragged.view, TiledEdges::ALL);
            }
        }

        debug!(
            "Drag started: {} with {} view(s) at {:?}, held in place: {}",
            main_view,
            views.len(),
            grab_position,
            held
        );

        self.active = Some(ActiveDrag {
            main_view,
            views,
            snap_off: SnapOffController::new(held, grab_position, options.snap_off_threshold),
            options,
            overlay,
        });

        self.update_focus(grab_position);
    }

    /// The input moved to `to` (layout coordinates)
    pub fn handle_motion(&mut self, to: Point) {
        let host = self.host.clone();
        let Some(active) = self.active.as_mut() else {
            trace!("Ignoring motion to {:?}: no active drag", to);
            return;
        };

        if active.snap_off.check(to) {
            for dragged in &active.views {
                host.deformation.unanchor(dragged.view);
            }

            debug!("{} snapped off at {:?}", active.main_view, to);
            let output = self.focus.current();
            Self::notify(&mut self.listeners, &DragEvent::SnapOffTriggered { output });
        }

        // The deformation model always follows the input: while held it is
        // anchored at its edges, so the grabbed point moves without the view.
        let free = !active.snap_off.is_held();
        for dragged in &active.views {
            host.deformation.grab_moved(dragged.view, to);
            if free {
                dragged.transform.borrow_mut().set_grab_position(to);
            }
        }

        if free {
            Self::damage_views(&host, active);
        }

        self.update_focus(to);
    }

    /// The input was released: end the drag and report where it happened.
    pub fn handle_input_released(&mut self) {
        let Some(active) = self.active.take() else {
            trace!("Input released without an active drag");
            return;
        };
        let host = self.host.clone();

        let grab_position = active
            .views
            .first()
            .map(|dragged| dragged.transform.borrow().grab_position())
            .unwrap_or_default();
        let focused_output = self.focus.current();
        let done = DragDone {
            grab_position,
            main_view: active.main_view,
            views: active
                .views
                .iter()
                .map(|dragged| DraggedViewInfo {
                    view: dragged.view,
                    relative_grab: dragged.transform.borrow().relative_grab(),
                })
                .collect(),
            focused_output,
            join_views: active.options.join_views,
            held_in_place: active.snap_off.is_held(),
        };

        // The overlay goes first so no frame shows a view both there and in its layer
        host.scene.remove_overlay(&active.overlay);
        let overlay_box = active.overlay.bounding_box();
        if !overlay_box.is_empty() {
            host.scene.damage(overlay_box);
        }

        let origin = focused_output
            .and_then(|output| host.outputs.layout_geometry(output))
            .map(|geometry| geometry.origin())
            .unwrap_or_default();

        for dragged in &active.views {
            host.scene.set_view_enabled(dragged.view, true);
            host.scene.detach_transform(dragged.view);

            // Rebuild from the unscaled size so a residual scale does not
            // turn into a wobbly resize animation.
            let geometry = {
                let transform = dragged.transform.borrow();
                let content = host
                    .views
                    .bounding_box(dragged.view)
                    .unwrap_or_else(|| transform.content_box());
                find_geometry_around(
                    content.size(),
                    transform.grab_position(),
                    transform.relative_grab(),
                )
            };
            host.deformation.rebuild_from_geometry(dragged.view, geometry);
            host.deformation.reset_to_local_space(dragged.view);
            host.deformation.translate(dragged.view, -origin);

            host.views.unwatch_destruction(dragged.view);
        }

        host.wm.set_view_grabbed(active.main_view, false);
        self.focus.reset(host.scene.as_ref());
        host.seat.set_cursor("default");

        debug!(
            "Drag of {} done at {:?} on {:?}",
            done.main_view, done.grab_position, done.focused_output
        );
        Self::notify(&mut self.listeners, &DragEvent::DragDone(done));
    }

    /// Animate every dragged view towards `scale`
    pub fn set_scale(&mut self, scale: f64) {
        let host = self.host.clone();
        let Some(active) = self.active.as_mut() else {
            trace!("Ignoring scale {}: no active drag", scale);
            return;
        };

        let mut changed = false;
        for dragged in &active.views {
            changed |= dragged.transform.borrow_mut().set_scale(scale).is_some();
        }

        if changed {
            Self::damage_views(&host, active);
        }
    }

    /// Per-frame hook of `output`: advance scale animations and keep
    /// repainting while they run.
    pub fn handle_frame(&mut self, output: OutputId, delta: Duration) {
        if self.focus.current() != Some(output) {
            return;
        }

        let host = self.host.clone();
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let scaling = active
            .views
            .iter()
            .any(|dragged| dragged.transform.borrow().is_scaling());
        if !scaling {
            return;
        }

        for dragged in &active.views {
            dragged.transform.borrow_mut().advance(delta);
        }

        Self::damage_views(&host, active);
    }

    /// A view went away. If it is being dragged the drag ends immediately.
    ///
    /// The session never hears about destruction on its own: the host must
    /// call this for every view it was asked to watch through
    /// [`ViewModel::watch_destruction`](crate::host::ViewModel::watch_destruction).
    pub fn handle_view_destroyed(&mut self, view: ViewId) {
        if self.participates(view) {
            warn!("{} destroyed while being dragged, releasing", view);
            self.handle_input_released();
        }
    }

    /// A view was unmapped. A dragged view ends the drag the same way
    /// destruction does; the host forwards unmaps for every view.
    pub fn handle_view_unmapped(&mut self, view: ViewId) {
        if self.participates(view) {
            warn!("{} unmapped while being dragged, releasing", view);
            self.handle_input_released();
        }
    }

    fn participates(&self, view: ViewId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.views.iter().any(|dragged| dragged.view == view))
    }

    pub fn is_view_held_in_place(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.snap_off.is_held())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn main_view(&self) -> Option<ViewId> {
        self.active.as_ref().map(|active| active.main_view)
    }

    /// Output under the grab, or the nearest one; `None` when idle
    pub fn current_output(&self) -> Option<OutputId> {
        self.focus.current()
    }

    pub fn options(&self) -> Option<&DragOptions> {
        self.active.as_ref().map(|active| &active.options)
    }

    pub fn dragged_views(&self) -> Vec<ViewId> {
        self.active
            .as_ref()
            .map(|active| active.views.iter().map(|dragged| dragged.view).collect())
            .unwrap_or_default()
    }

    pub fn transform(&self, view: ViewId) -> Option<SharedTransform> {
        self.active.as_ref().and_then(|active| {
            active
                .views
                .iter()
                .find(|dragged| dragged.view == view)
                .map(|dragged| dragged.transform.clone())
        })
    }

    /// Box each dragged view was last damaged with
    pub fn last_damage_boxes(&self) -> Vec<(ViewId, Rect)> {
        self.active
            .as_ref()
            .map(|active| {
                active
                    .views
                    .iter()
                    .map(|dragged| (dragged.view, dragged.last_damage_box))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn update_focus(&mut self, grab: Point) {
        let host = &self.host;
        let listeners = &mut self.listeners;

        self.focus.update(
            grab,
            host.outputs.as_ref(),
            host.scene.as_ref(),
            |previous, new| {
                if let Some(output) = new {
                    host.seat.focus_output(output);
                }
                Self::notify(listeners, &DragEvent::FocusOutputChanged { previous, new });
            },
        );
    }

    fn damage_views(host: &Host, active: &mut ActiveDrag) {
        for dragged in active.views.iter_mut() {
            let mut transform = dragged.transform.borrow_mut();
            if let Some(content) = host.views.bounding_box(dragged.view) {
                transform.set_content_box(content);
            }
            dragged.last_damage_box = transform.bounding_box();
        }

        active.overlay.on_child_damage(host.scene.as_ref());
    }
}

impl Drop for DragSession {
    fn drop(&mut self) {
        if self.active.is_some() {
            debug!("Drag session dropped mid-drag, releasing");
            self.handle_input_released();
        }
    }
}

#[cfg(test)]
mod tests;
