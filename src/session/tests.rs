//! Unit tests for drag sessions
//!
//! Every test runs against the headless compositor with two side-by-side
//! 1920x1080 outputs.

use super::*;
use crate::geometry::Size;
use crate::headless::{HeadlessCompositor, HostCall};
use std::cell::RefCell;

const LEFT: OutputId = OutputId(1);
const RIGHT: OutputId = OutputId(2);

struct Fixture {
    host: Rc<HeadlessCompositor>,
    session: DragSession,
    events: Rc<RefCell<Vec<DragEvent>>>,
}

impl Fixture {
    fn new() -> Self {
        let host = Rc::new(HeadlessCompositor::new());
        host.add_output(LEFT, Rect::new(0, 0, 1920, 1080), Size::new(3, 3));
        host.add_output(RIGHT, Rect::new(1920, 0, 1920, 1080), Size::new(1, 1));

        let mut session = DragSession::new(Host::from_backend(host.clone()));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        Self {
            host,
            session,
            events,
        }
    }

    fn snap_offs(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, DragEvent::SnapOffTriggered { .. }))
            .count()
    }

    fn drag_done(&self) -> Vec<DragDone> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DragEvent::DragDone(done) => Some(done.clone()),
                _ => None,
            })
            .collect()
    }

    fn grab_position(&self, view: ViewId) -> Point {
        self.session
            .transform(view)
            .map(|transform| transform.borrow().grab_position())
            .unwrap_or_default()
    }

    fn assert_invariant(&self) {
        let active = self.session.is_active();
        assert_eq!(self.session.dragged_views().is_empty(), !active);
        assert_eq!(self.session.current_output().is_some(), active);
    }
}

fn snap_off_options(threshold: f64) -> DragOptions {
    DragOptions {
        enable_snap_off: true,
        snap_off_threshold: threshold,
        ..DragOptions::default()
    }
}

#[test]
fn test_motion_moves_free_view() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));

    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    let transform = fx.session.transform(ViewId(1)).expect("view is dragged");
    assert_eq!(transform.borrow().relative_grab(), PointF::new(0.5, 0.5));

    fx.session.handle_motion(Point::new(250, 120));
    assert_eq!(transform.borrow().grab_position(), Point::new(250, 120));
    assert_eq!(transform.borrow().bounding_box(), Rect::new(150, 70, 200, 100));
}

#[test]
fn test_snap_off_after_threshold() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(0, 0, 200, 100));
    fx.host.set_tiled(ViewId(1), TiledEdges::ALL);

    fx.session.start_drag(
        ViewId(1),
        Point::new(0, 0),
        PointF::new(0.0, 0.0),
        snap_off_options(30.0),
    );
    assert!(fx.session.is_view_held_in_place());

    fx.session.handle_motion(Point::new(20, 20));
    assert!(fx.session.is_view_held_in_place());
    assert_eq!(fx.grab_position(ViewId(1)), Point::new(0, 0));
    assert_eq!(fx.snap_offs(), 0);

    fx.session.handle_motion(Point::new(30, 0));
    assert!(!fx.session.is_view_held_in_place());
    assert_eq!(fx.grab_position(ViewId(1)), Point::new(30, 0));
    assert!(fx
        .events
        .borrow()
        .contains(&DragEvent::SnapOffTriggered { output: Some(LEFT) }));

    // Never re-arms
    fx.session.handle_motion(Point::new(0, 0));
    assert!(!fx.session.is_view_held_in_place());
    assert_eq!(fx.snap_offs(), 1);
}

#[test]
fn test_held_view_still_feeds_deformation_model() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(0, 0, 200, 100));
    fx.host.set_fullscreen(ViewId(1), true);

    fx.session.start_drag_at(ViewId(1), Point::new(50, 50), snap_off_options(100.0));
    fx.session.handle_motion(Point::new(60, 50));

    let calls = fx.host.calls();
    assert!(calls.contains(&HostCall::Anchor {
        view: ViewId(1),
        edges: TiledEdges::ALL
    }));
    assert!(calls.contains(&HostCall::GrabMoved {
        view: ViewId(1),
        to: Point::new(60, 50)
    }));
    assert_eq!(fx.grab_position(ViewId(1)), Point::new(50, 50));
}

#[test]
fn test_snap_off_needs_tiled_or_fullscreen_view() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(0, 0, 200, 100));

    fx.session.start_drag_at(ViewId(1), Point::new(50, 50), snap_off_options(100.0));
    assert!(!fx.session.is_view_held_in_place());

    fx.session.handle_motion(Point::new(60, 50));
    assert_eq!(fx.grab_position(ViewId(1)), Point::new(60, 50));
}

#[test]
fn test_release_without_drag_is_silent() {
    let mut fx = Fixture::new();
    fx.session.handle_input_released();
    fx.session.handle_motion(Point::new(10, 10));
    fx.session.set_scale(2.0);

    assert!(fx.events.borrow().is_empty());
    fx.assert_invariant();
}

#[test]
fn test_second_release_emits_nothing() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());

    fx.session.handle_input_released();
    fx.session.handle_input_released();
    assert_eq!(fx.drag_done().len(), 1);
}

#[test]
#[should_panic(expected = "while another drag is active")]
fn test_starting_twice_fails_fast() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.host.add_view(ViewId(2), Rect::new(500, 100, 200, 100));

    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    fx.session
        .start_drag_at(ViewId(2), Point::new(600, 150), DragOptions::default());
}

#[test]
fn test_invariant_holds_through_lifecycle() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.assert_invariant();

    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    fx.assert_invariant();

    for to in [
        Point::new(300, 400),
        Point::new(1900, 400),
        Point::new(2500, 400),
        Point::new(-50, 400),
        Point::new(5000, -300),
        Point::new(-800, -2000),
        Point::new(1000, 1500),
        Point::new(10, 400),
    ] {
        fx.session.handle_motion(to);
        fx.assert_invariant();
    }

    fx.session.handle_input_released();
    fx.assert_invariant();
}

#[test]
fn test_join_views_fans_out_to_children() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 400, 300));
    fx.host.add_child(ViewId(2), ViewId(1), Rect::new(150, 150, 100, 100));
    fx.host.add_child(ViewId(3), ViewId(1), Rect::new(300, 200, 100, 50));

    let joined = DragOptions {
        join_views: true,
        ..DragOptions::default()
    };
    fx.session.start_drag_at(ViewId(2), Point::new(200, 200), joined);
    assert_eq!(fx.session.main_view(), Some(ViewId(1)));
    assert_eq!(
        fx.session.dragged_views(),
        vec![ViewId(1), ViewId(2), ViewId(3)]
    );
    fx.session.handle_input_released();

    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 200), DragOptions::default());
    assert_eq!(fx.session.dragged_views(), vec![ViewId(1)]);
}

#[test]
fn test_joined_views_use_their_own_relative_grab() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(0, 0, 400, 400));
    fx.host.add_child(ViewId(2), ViewId(1), Rect::new(100, 100, 200, 200));

    let joined = DragOptions {
        join_views: true,
        ..DragOptions::default()
    };
    fx.session.start_drag_at(ViewId(1), Point::new(200, 200), joined);

    let child = fx.session.transform(ViewId(2)).expect("child is dragged");
    assert_eq!(child.borrow().relative_grab(), PointF::new(0.5, 0.5));

    fx.session.handle_motion(Point::new(300, 300));
    assert_eq!(child.borrow().bounding_box(), Rect::new(200, 200, 200, 200));
}

#[test]
fn test_set_scale_is_idempotent_on_target() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    let transform = fx.session.transform(ViewId(1)).expect("view is dragged");

    fx.session.set_scale(2.0);
    assert_eq!(transform.borrow().scale_target(), 2.0);

    fx.session.handle_frame(LEFT, Duration::from_millis(100));
    let partial = transform.borrow().scale_factor();

    fx.session.set_scale(2.0);
    assert_eq!(transform.borrow().scale_target(), 2.0);
    assert_eq!(transform.borrow().scale_factor(), partial);
    assert!(transform.borrow().is_scaling());
}

#[test]
fn test_frame_hook_only_runs_on_focused_output() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    fx.session.set_scale(2.0);
    fx.host.clear_damage();

    fx.session.handle_frame(RIGHT, Duration::from_millis(300));
    assert!(fx.host.damage_log().is_empty());

    fx.session.handle_frame(LEFT, Duration::from_millis(300));
    assert_eq!(fx.host.damage_log(), vec![Rect::new(100, 100, 200, 100)]);
    assert_eq!(
        fx.session.last_damage_boxes(),
        vec![(ViewId(1), Rect::new(150, 125, 100, 50))]
    );

    // Animation finished, nothing left to repaint
    fx.host.clear_damage();
    fx.session.handle_frame(LEFT, Duration::from_millis(16));
    assert!(fx.host.damage_log().is_empty());
}

#[test]
fn test_scale_animates_with_grab_off_every_output() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    let transform = fx.session.transform(ViewId(1)).expect("view is dragged");

    fx.session.handle_motion(Point::new(-50, 400));
    assert_eq!(fx.session.current_output(), Some(LEFT));
    assert_eq!(fx.host.frame_hooks(), vec![LEFT]);

    fx.session.set_scale(2.0);
    fx.session.handle_frame(LEFT, Duration::from_millis(300));
    assert_eq!(transform.borrow().scale_factor(), 2.0);
    assert!(!transform.borrow().is_scaling());
    assert_eq!(transform.borrow().bounding_box(), Rect::new(-100, 375, 100, 50));

    fx.session.handle_motion(Point::new(4200, -100));
    assert_eq!(fx.session.current_output(), Some(RIGHT));

    fx.session.handle_input_released();
    assert_eq!(fx.drag_done()[0].focused_output, Some(RIGHT));
    fx.assert_invariant();
}

#[test]
fn test_initial_scale_shrinks_view_around_grab() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(0, 0, 400, 200));
    let options = DragOptions {
        initial_scale: 2.0,
        ..DragOptions::default()
    };

    fx.session.start_drag_at(ViewId(1), Point::new(200, 100), options);
    let transform = fx.session.transform(ViewId(1)).expect("view is dragged");
    assert_eq!(transform.borrow().bounding_box(), Rect::new(100, 50, 200, 100));
    assert!(fx.host.calls().contains(&HostCall::Rebuild {
        view: ViewId(1),
        geometry: Rect::new(100, 50, 200, 100)
    }));
}

#[test]
fn test_focus_follows_grab_across_outputs() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(1800, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(1850, 150), DragOptions::default());
    assert_eq!(fx.host.frame_hooks(), vec![LEFT]);

    fx.session.handle_motion(Point::new(2100, 150));
    assert_eq!(fx.session.current_output(), Some(RIGHT));
    assert_eq!(fx.host.focused_output(), Some(RIGHT));
    assert_eq!(fx.host.frame_hooks(), vec![RIGHT]);

    let focus_changes: Vec<DragEvent> = fx
        .events
        .borrow()
        .iter()
        .filter(|event| matches!(event, DragEvent::FocusOutputChanged { .. }))
        .cloned()
        .collect();
    assert_eq!(
        focus_changes,
        vec![
            DragEvent::FocusOutputChanged {
                previous: None,
                new: Some(LEFT)
            },
            DragEvent::FocusOutputChanged {
                previous: Some(LEFT),
                new: Some(RIGHT)
            },
        ]
    );

    fx.session.handle_input_released();
    assert!(fx.host.frame_hooks().is_empty());
    assert_eq!(fx.host.frame_hook_removals(), 2);
}

#[test]
fn test_release_restores_view_and_reports_drop() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());

    assert!(!fx.host.is_view_enabled(ViewId(1)));
    assert_eq!(fx.host.overlay_count(), 1);
    assert_eq!(fx.host.cursor(), "grabbing");
    assert!(fx.host.is_grabbed(ViewId(1)));
    assert_eq!(fx.host.watched_views(), vec![ViewId(1)]);

    fx.session.handle_motion(Point::new(2020, 200));
    fx.host.clear_calls();
    fx.session.handle_input_released();

    assert!(fx.host.is_view_enabled(ViewId(1)));
    assert!(fx.host.attached_transform(ViewId(1)).is_none());
    assert_eq!(fx.host.overlay_count(), 0);
    assert_eq!(fx.host.cursor(), "default");
    assert!(!fx.host.is_grabbed(ViewId(1)));
    assert!(fx.host.watched_views().is_empty());

    assert_eq!(
        fx.host.calls(),
        vec![
            HostCall::Rebuild {
                view: ViewId(1),
                geometry: Rect::new(1920, 150, 200, 100)
            },
            HostCall::ResetToLocal(ViewId(1)),
            HostCall::Translate {
                view: ViewId(1),
                delta: Point::new(-1920, 0)
            },
            HostCall::Grabbed {
                view: ViewId(1),
                grabbed: false
            },
        ]
    );

    assert_eq!(
        fx.drag_done(),
        vec![DragDone {
            grab_position: Point::new(2020, 200),
            main_view: ViewId(1),
            views: vec![DraggedViewInfo {
                view: ViewId(1),
                relative_grab: PointF::new(0.5, 0.5)
            }],
            focused_output: Some(RIGHT),
            join_views: false,
            held_in_place: false,
        }]
    );
}

#[test]
fn test_destroyed_child_forces_release() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 400, 300));
    fx.host.add_child(ViewId(2), ViewId(1), Rect::new(150, 150, 100, 100));
    let joined = DragOptions {
        join_views: true,
        ..DragOptions::default()
    };
    fx.session.start_drag_at(ViewId(1), Point::new(200, 200), joined);

    // Unrelated views do not end the drag
    fx.session.handle_view_destroyed(ViewId(99));
    assert!(fx.session.is_active());

    assert!(fx.host.remove_view(ViewId(2)));
    fx.session.handle_view_destroyed(ViewId(2));

    assert!(!fx.session.is_active());
    assert_eq!(fx.drag_done().len(), 1);
    assert!(fx.host.attached_transform(ViewId(1)).is_none());
    assert!(fx.host.attached_transform(ViewId(2)).is_none());
    assert_eq!(fx.host.overlay_count(), 0);
    fx.assert_invariant();
}

#[test]
fn test_unmapped_view_forces_release() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.host.add_view(ViewId(5), Rect::new(900, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    fx.session.handle_motion(Point::new(600, 600));

    fx.host.set_mapped(ViewId(5), false);
    fx.session.handle_view_unmapped(ViewId(5));
    assert!(fx.session.is_active());

    fx.host.set_mapped(ViewId(1), false);
    fx.session.handle_view_unmapped(ViewId(1));

    assert!(!fx.session.is_active());
    assert!(fx.host.attached_transform(ViewId(1)).is_none());
    assert_eq!(fx.host.overlay_count(), 0);
    assert!(fx.host.frame_hooks().is_empty());
    assert!(fx.host.watched_views().is_empty());
    assert_eq!(fx.drag_done().len(), 1);
    assert_eq!(fx.drag_done()[0].grab_position, Point::new(600, 600));
    fx.assert_invariant();

    // Input after the forced release belongs to no drag
    fx.session.handle_motion(Point::new(900, 900));
    fx.session.handle_input_released();
    assert_eq!(fx.drag_done().len(), 1);
}

#[test]
fn test_dropping_session_mid_drag_cleans_up() {
    let fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    let Fixture {
        host,
        mut session,
        events,
    } = fx;

    session.start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    drop(session);

    assert_eq!(host.overlay_count(), 0);
    assert!(host.frame_hooks().is_empty());
    assert!(events
        .borrow()
        .iter()
        .any(|event| matches!(event, DragEvent::DragDone(_))));
}

#[test]
fn test_motion_damages_old_and_new_overlay_box() {
    let mut fx = Fixture::new();
    fx.host.add_view(ViewId(1), Rect::new(100, 100, 200, 100));
    fx.session
        .start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    fx.host.clear_damage();

    fx.session.handle_motion(Point::new(500, 150));
    assert_eq!(fx.host.damage_log(), vec![Rect::new(100, 100, 500, 100)]);
}

#[test]
fn test_drag_without_deformation_model() {
    let compositor = Rc::new(HeadlessCompositor::new());
    compositor.add_output(LEFT, Rect::new(0, 0, 1920, 1080), Size::new(1, 1));
    compositor.add_view(ViewId(1), Rect::new(100, 100, 200, 100));

    let host = Host::from_backend(compositor.clone()).without_deformation();
    let mut session = DragSession::new(host);
    session.start_drag_at(ViewId(1), Point::new(200, 150), DragOptions::default());
    session.handle_motion(Point::new(400, 150));
    session.handle_input_released();

    // Only the window manager saw the drag
    assert_eq!(
        compositor.calls(),
        vec![
            HostCall::Grabbed {
                view: ViewId(1),
                grabbed: true
            },
            HostCall::Grabbed {
                view: ViewId(1),
                grabbed: false
            },
        ]
    );
}
