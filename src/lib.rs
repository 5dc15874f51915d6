//! # move-drag
//!
//! Cross-output interactive window dragging for compositor plugins.
//!
//! A plugin grabs input on its output and forwards it to a shared
//! [`DragSession`]. The session keeps the dragged views pinned under the
//! pointer while they move between outputs, renders them above everything in
//! an overlay, holds tiled and fullscreen views in place until they are
//! dragged far enough to snap off, and reports the drop so the caller can
//! place the views in the window-management model.
//!
//! ## Architecture
//!
//! - `geometry`: points, rectangles and the grab geometry helpers
//! - `transform`: per-view transform pinning the grab point under the input
//! - `overlay`: the render node holding every dragged view
//! - `focus`: tracks which output owns the grab
//! - `snap_off`: the held/free state machine
//! - `session`: the drag lifecycle
//! - `drop`: placing views after a drop
//! - `host`: traits for everything the engine needs from the compositor
//! - `headless`: in-memory compositor implementing those traits
//! - `script`: JSON drag replays against the headless compositor
//! - `config`: TOML configuration
//!
//! ## Usage
//!
//! ```rust
//! use move_drag::headless::HeadlessCompositor;
//! use move_drag::{DragOptions, DragSession, Host, OutputId, Point, Rect, Size, ViewId};
//! use std::rc::Rc;
//!
//! let compositor = Rc::new(HeadlessCompositor::new());
//! compositor.add_output(OutputId(1), Rect::new(0, 0, 1920, 1080), Size::new(1, 1));
//! compositor.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
//!
//! let mut session = DragSession::new(Host::from_backend(compositor));
//! session.start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
//! session.handle_motion(Point::new(250, 120));
//! session.handle_input_released();
//! ```

pub mod animation;
pub mod config;
pub mod drop;
pub mod focus;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod overlay;
pub mod script;
pub mod session;
pub mod snap_off;
pub mod transform;

// Re-export main types for easy access
pub use config::MoveDragConfig;
pub use drop::{apply_drop, finalize_drop, plan_drop, release_tiling_on_snap_off, DropError, DropPlan};
pub use geometry::{find_geometry_around, find_relative_grab, Point, PointF, Rect, Size};
pub use host::{Host, OutputId, TiledEdges, ViewId};
pub use session::{DragDone, DragEvent, DragOptions, DragSession};
pub use transform::GrabTransform;

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for move-drag
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
