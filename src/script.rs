//! Drag replay scripts
//!
//! A script describes a headless desktop (outputs with workspace grids,
//! views with their layout state) and a sequence of input steps. Replaying it
//! drives a real [`DragSession`] against a [`HeadlessCompositor`], reacting
//! to snap-off and drop events the way a move plugin would, and reports the
//! events and the final placement of every view.
//!
//! ```json
//! {
//!   "outputs": [{ "id": 1, "geometry": { "x": 0, "y": 0, "width": 1920, "height": 1080 } }],
//!   "views": [{ "id": 1, "geometry": { "x": 100, "y": 100, "width": 200, "height": 100 } }],
//!   "steps": [
//!     { "step": "start", "view": 1, "at": { "x": 200, "y": 150 } },
//!     { "step": "motion", "to": { "x": 250, "y": 120 } },
//!     { "step": "release" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use crate::config::MoveDragConfig;
use crate::drop::{finalize_drop, release_tiling_on_snap_off, DropPlan};
use crate::geometry::{Point, Rect, Size};
use crate::headless::HeadlessCompositor;
use crate::host::{Host, OutputId, TiledEdges, ViewId, ViewModel};
use crate::session::{DragEvent, DragSession};

fn one_workspace() -> Size {
    Size::new(1, 1)
}

fn mapped() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptOutput {
    pub id: OutputId,
    pub geometry: Rect,
    #[serde(default = "one_workspace")]
    pub workspaces: Size,
    #[serde(default)]
    pub current_workspace: Point,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptView {
    pub id: ViewId,
    pub geometry: Rect,
    #[serde(default)]
    pub parent: Option<ViewId>,
    /// Decoration width around the window-manager geometry
    #[serde(default)]
    pub decoration: i32,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub tiled: TiledEdges,
    #[serde(default = "mapped")]
    pub mapped: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Start {
        view: ViewId,
        at: Point,
        /// Overrides `drag.join_views` for this drag
        #[serde(default)]
        join_views: Option<bool>,
    },
    Motion {
        to: Point,
    },
    Scale {
        factor: f64,
    },
    /// A frame on the output currently under the grab
    Frame {
        ms: u64,
    },
    Release,
    Destroy {
        view: ViewId,
    },
    Unmap {
        view: ViewId,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    pub outputs: Vec<ScriptOutput>,
    pub views: Vec<ScriptView>,
    #[serde(default)]
    pub config: MoveDragConfig,
    pub steps: Vec<Step>,
}

/// What happened to one drop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropOutcome {
    pub main_view: ViewId,
    /// Placement applied, if any
    pub plan: Option<DropPlan>,
    /// Why nothing was placed
    pub skipped: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub view: ViewId,
    pub geometry: Rect,
    pub output: Option<OutputId>,
    pub workspace: Point,
    pub fullscreen: bool,
    pub tiled: TiledEdges,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub events: Vec<DragEvent>,
    pub drops: Vec<DropOutcome>,
    pub views: Vec<ViewState>,
}

impl ReplayScript {
    /// Load a script from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;

        Self::from_json(&contents).with_context(|| format!("Invalid script: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let script: ReplayScript = serde_json::from_str(json).context("Failed to parse script")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.outputs.is_empty() {
            anyhow::bail!("Script needs at least one output");
        }

        let mut outputs = HashSet::new();
        for output in &self.outputs {
            if !outputs.insert(output.id) {
                anyhow::bail!("Duplicate output id {}", output.id);
            }
            if output.geometry.is_empty() {
                anyhow::bail!("{} has an empty geometry", output.id);
            }
            if output.workspaces.width < 1 || output.workspaces.height < 1 {
                anyhow::bail!("{} needs a workspace grid of at least 1x1", output.id);
            }
        }

        let mut views = HashSet::new();
        for view in &self.views {
            if !views.insert(view.id) {
                anyhow::bail!("Duplicate view id {}", view.id);
            }
        }
        for view in &self.views {
            if let Some(parent) = view.parent {
                if !views.contains(&parent) {
                    anyhow::bail!("{} has unknown parent {}", view.id, parent);
                }
            }
        }

        self.config.validate().context("Invalid script config")?;

        Ok(())
    }

    fn build_host(&self) -> Rc<HeadlessCompositor> {
        let host = Rc::new(HeadlessCompositor::new());

        for output in &self.outputs {
            host.add_output(output.id, output.geometry, output.workspaces);
            host.set_current_workspace(output.id, output.current_workspace);
        }

        // Parents must exist first so children land in their trees
        for view in &self.views {
            match view.parent {
                Some(parent) => host.add_child(view.id, parent, view.geometry),
                None => host.add_view(view.id, view.geometry),
            }
            host.set_decoration(view.id, view.decoration);
            host.set_fullscreen(view.id, view.fullscreen);
            host.set_tiled(view.id, view.tiled);
            host.set_mapped(view.id, view.mapped);
        }

        host
    }

    /// Replay every step and report what the desktop looks like afterwards
    pub fn run(&self) -> Result<ReplayReport> {
        let compositor = self.build_host();
        let host = Host::from_backend(compositor.clone());

        let events = Rc::new(RefCell::new(Vec::new()));
        let mut session = DragSession::new(host.clone());
        {
            let events = events.clone();
            session.subscribe(move |event| events.borrow_mut().push(event.clone()));
        }

        let mut handled = 0;
        let mut drops = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            debug!("Replaying step {}: {:?}", index, step);
            let main_view = session.main_view();

            match step {
                Step::Start {
                    view,
                    at,
                    join_views,
                } => {
                    if session.is_active() {
                        anyhow::bail!("Step {}: start while a drag is active", index);
                    }
                    if compositor.view_bbox(*view).is_none() {
                        anyhow::bail!("Step {}: unknown {}", index, view);
                    }

                    let mut options = self.config.drag_options();
                    if let Some(join_views) = join_views {
                        options.join_views = *join_views;
                    }
                    session.start_drag_at(*view, *at, options);
                }
                Step::Motion { to } => session.handle_motion(*to),
                Step::Scale { factor } => session.set_scale(*factor),
                Step::Frame { ms } => {
                    if let Some(output) = session.current_output() {
                        session.handle_frame(output, Duration::from_millis(*ms));
                    }
                }
                Step::Release => session.handle_input_released(),
                Step::Destroy { view } => {
                    if compositor.remove_view(*view) {
                        session.handle_view_destroyed(*view);
                    }
                }
                Step::Unmap { view } => {
                    compositor.set_mapped(*view, false);
                    session.handle_view_unmapped(*view);
                }
            }

            let new_events: Vec<DragEvent> = events.borrow()[handled..].to_vec();
            handled += new_events.len();
            for event in new_events {
                match event {
                    DragEvent::SnapOffTriggered { .. } => {
                        if let Some(view) = main_view {
                            release_tiling_on_snap_off(view, host.views.as_ref(), host.wm.as_ref());
                        }
                    }
                    DragEvent::DragDone(done) => {
                        let outcome = if done.held_in_place {
                            DropOutcome {
                                main_view: done.main_view,
                                plan: None,
                                skipped: Some("released before snapping off".to_string()),
                            }
                        } else {
                            match finalize_drop(&done, &host) {
                                Ok(plan) => DropOutcome {
                                    main_view: done.main_view,
                                    plan: Some(plan),
                                    skipped: None,
                                },
                                Err(err) => {
                                    warn!("Drop of {} not placed: {}", done.main_view, err);
                                    DropOutcome {
                                        main_view: done.main_view,
                                        plan: None,
                                        skipped: Some(err.to_string()),
                                    }
                                }
                            }
                        };
                        drops.push(outcome);
                    }
                    DragEvent::FocusOutputChanged { .. } => {}
                }
            }
        }

        if session.is_active() {
            info!("Script ended mid-drag, releasing");
            session.handle_input_released();
        }
        drop(session);

        let views = self
            .views
            .iter()
            .filter_map(|view| {
                let geometry = compositor.view_bbox(view.id)?;
                Some(ViewState {
                    view: view.id,
                    geometry,
                    output: compositor.view_output(view.id),
                    workspace: compositor.view_workspace(view.id).unwrap_or_default(),
                    fullscreen: compositor.is_fullscreen(view.id),
                    tiled: compositor.pending_tiled_edges(view.id),
                })
            })
            .collect();

        let events = events.borrow().clone();
        Ok(ReplayReport {
            events,
            drops,
            views,
        })
    }
}
