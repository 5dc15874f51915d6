//! Placing views in the window-management model after a drag
//!
//! The session only reports where a drag ended. A plugin subscribed to
//! [`DragEvent::DragDone`](crate::session::DragEvent::DragDone) turns that
//! report into a [`DropPlan`] with [`plan_drop`] and carries it out with
//! [`apply_drop`]. Planning is pure so it can be inspected and tested without
//! touching the host.

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::geometry::{find_geometry_around, Point, Size};
use crate::host::{Host, OutputId, OutputLayout, TiledEdges, ViewId, ViewModel, WindowManagement};
use crate::session::DragDone;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DropError {
    #[error("destination {0} is not known to the output layout")]
    UnknownOutput(OutputId),

    #[error("{0} was unmapped before it could be dropped")]
    PrimaryUnmapped(ViewId),

    #[error("drag of {0} ended with no output to drop on")]
    NoDestination(ViewId),
}

/// Layout state to re-apply after the view has been moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutRequest {
    Fullscreen,
    Tile(TiledEdges),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewPlacement {
    pub view: ViewId,
    /// Window-manager position, relative to the destination output
    pub position: Point,
    pub request: Option<LayoutRequest>,
}

/// Everything [`apply_drop`] will ask the window manager to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropPlan {
    pub output: OutputId,
    pub toplevel: ViewId,
    /// The toplevel currently lives on another output
    pub move_tree_to_output: bool,
    pub workspace: Point,
    pub placements: Vec<ViewPlacement>,
    /// The whole view tree of `toplevel`; all of it lands on `workspace`
    pub tree: Vec<ViewId>,
    /// Most recently focused participant
    pub focus: ViewId,
}

/// Workspace containing `grab` (output-local), counted from `current`
/// and clamped to the grid.
fn target_workspace(grab: Point, output_size: Size, current: Point, grid: Size) -> Point {
    let column = if output_size.width > 0 {
        grab.x.div_euclid(output_size.width)
    } else {
        0
    };
    let row = if output_size.height > 0 {
        grab.y.div_euclid(output_size.height)
    } else {
        0
    };

    Point::new(
        (column + current.x).clamp(0, (grid.width - 1).max(0)),
        (row + current.y).clamp(0, (grid.height - 1).max(0)),
    )
}

/// Work out where every dragged view goes.
pub fn plan_drop(
    done: &DragDone,
    views: &dyn ViewModel,
    outputs: &dyn OutputLayout,
) -> Result<DropPlan, DropError> {
    let toplevel = views.toplevel(done.main_view);
    if !views.is_mapped(toplevel) {
        return Err(DropError::PrimaryUnmapped(toplevel));
    }

    let output = done
        .focused_output
        .ok_or(DropError::NoDestination(toplevel))?;
    let output_geometry = outputs
        .layout_geometry(output)
        .ok_or(DropError::UnknownOutput(output))?;

    let grab = done.grab_position - output_geometry.origin();
    let workspace = target_workspace(
        grab,
        output_geometry.size(),
        outputs.current_workspace(output),
        outputs.workspace_grid_size(output),
    );

    let mut placements = Vec::with_capacity(done.views.len());
    let mut focus = done.main_view;
    for info in &done.views {
        if !views.is_mapped(info.view) {
            debug!("Skipping {}: unmapped during the drag", info.view);
            continue;
        }
        let (Some(bbox), Some(wm)) = (views.bounding_box(info.view), views.wm_geometry(info.view))
        else {
            continue;
        };

        let wm_offset = wm.origin() - bbox.origin();
        let visual = find_geometry_around(bbox.size(), grab, info.relative_grab);

        let request = if views.pending_fullscreen(info.view) {
            Some(LayoutRequest::Fullscreen)
        } else {
            let edges = views.pending_tiled_edges(info.view);
            edges.is_tiled().then_some(LayoutRequest::Tile(edges))
        };

        placements.push(ViewPlacement {
            view: info.view,
            position: visual.origin() + wm_offset,
            request,
        });

        if views.focus_timestamp(info.view) > views.focus_timestamp(focus) {
            focus = info.view;
        }
    }

    Ok(DropPlan {
        output,
        toplevel,
        move_tree_to_output: views.output_of(toplevel) != Some(output),
        workspace,
        placements,
        tree: views.enumerate_views(toplevel),
        focus,
    })
}

/// Carry out a plan produced by [`plan_drop`]
pub fn apply_drop(plan: &DropPlan, wm: &dyn WindowManagement) {
    if plan.move_tree_to_output {
        wm.move_to_output(plan.toplevel, plan.output);
    }

    for placement in &plan.placements {
        wm.move_view(placement.view, placement.position);
        match placement.request {
            Some(LayoutRequest::Fullscreen) => {
                wm.fullscreen_request(placement.view, plan.output, plan.workspace)
            }
            Some(LayoutRequest::Tile(edges)) => {
                wm.tile_request(placement.view, edges, Some(plan.workspace))
            }
            None => {}
        }
    }

    for view in &plan.tree {
        wm.move_to_workspace(*view, plan.output, plan.workspace);
    }

    wm.focus_raise(plan.focus);
}

/// Plan and apply the drop in one go
pub fn finalize_drop(done: &DragDone, host: &Host) -> Result<DropPlan, DropError> {
    let plan = plan_drop(done, host.views.as_ref(), host.outputs.as_ref())?;
    apply_drop(&plan, host.wm.as_ref());

    info!(
        "Dropped {} on {} workspace ({}, {})",
        plan.toplevel, plan.output, plan.workspace.x, plan.workspace.y
    );
    Ok(plan)
}

/// Snap-off consumer: a tiled view that leaves its slot floats again.
/// Fullscreen views keep their state. Returns whether a request was issued.
pub fn release_tiling_on_snap_off(
    view: ViewId,
    views: &dyn ViewModel,
    wm: &dyn WindowManagement,
) -> bool {
    if views.pending_tiled_edges(view).is_tiled() && !views.pending_fullscreen(view) {
        wm.tile_request(view, TiledEdges::NONE, None);
        return true;
    }

    false
}
