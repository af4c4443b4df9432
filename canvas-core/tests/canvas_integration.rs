//! Canvas Integration Tests
//!
//! Exercises the full state through its public surface:
//! - Cascading inserts and z-order
//! - Removal, suppression and restore
//! - Text editing round trips
//! - Hover overlay and regeneration flow
//! - Model invariants under random operation sequences

use std::collections::HashSet;
use std::time::Duration;

use canvas_core::{
    CanvasError, CanvasState, Element, ElementId, FeedItem, HoverEvent, InputEvent, InteractionMode,
    PointerEvent, PointerTarget, RegenerationOutcome, Scene, Viewport,
};
use proptest::prelude::*;

fn feed_image(path: &str, code: Option<&str>) -> FeedItem {
    FeedItem::Image {
        image_path: path.to_string(),
        code: code.map(str::to_string),
        query: None,
    }
}

fn ids_in_render_order(state: &CanvasState) -> Vec<ElementId> {
    state
        .scene()
        .list_ordered_by_z()
        .iter()
        .map(|e| e.id)
        .collect()
}

// ============================================================================
// Element Model & Z-Order
// ============================================================================

#[test]
fn test_two_images_cascade_and_reorder() {
    let mut state = CanvasState::new(1200.0, 800.0);
    let report = state.apply_feed(vec![feed_image("/out/1.png", None), feed_image("/out/2.png", None)]);
    let (first, second) = (report.inserted[0], report.inserted[1]);

    let a = state.scene().get_element(first).expect("first").transform;
    let b = state.scene().get_element(second).expect("second").transform;
    assert!((b.x - a.x - 30.0).abs() < f32::EPSILON);
    assert!((b.y - a.y - 30.0).abs() < f32::EPSILON);
    assert!(a.x != b.x || a.y != b.y);
    assert_eq!(ids_in_render_order(&state), vec![first, second]);

    state.bring_to_front(first);
    assert_eq!(ids_in_render_order(&state), vec![second, first]);
}

#[test]
fn test_remove_selected_image() {
    let mut state = CanvasState::new(1200.0, 800.0);
    let id = state.apply_feed(vec![feed_image("/out/1.png", Some("df.plot()"))]).inserted[0];

    state.process_event(&InputEvent::Pointer(PointerEvent::down(
        60.0,
        60.0,
        PointerTarget::Element(id),
    )));
    state.process_event(&InputEvent::Pointer(PointerEvent::up(60.0, 60.0)));
    assert_eq!(state.status().selected, Some(id));

    state.remove_selected().expect("removed");
    assert!(!ids_in_render_order(&state).contains(&id));
    assert!(state.scene().removed_images().contains("/out/1.png"));
    assert_eq!(state.status().selected, None);
}

#[test]
fn test_removed_image_not_reinserted_until_restore() {
    let mut state = CanvasState::new(1200.0, 800.0);
    let feed = vec![feed_image("/out/1.png", None)];
    let id = state.apply_feed(feed.clone()).inserted[0];
    state.remove(id).expect("remove");

    for _ in 0..3 {
        assert!(state.apply_feed(feed.clone()).inserted.is_empty());
    }
    assert!(state.scene().is_empty());

    state.restore_images();
    assert_eq!(state.status().element_count, 1);
    // the next identical delivery is a duplicate, not a second copy
    assert!(state.apply_feed(feed).inserted.is_empty());
    assert_eq!(state.status().element_count, 1);
}

#[test]
fn test_stale_events_do_not_break_interaction() {
    let mut state = CanvasState::new(1200.0, 800.0);
    let id = state.insert_text();
    state.remove(id).expect("remove");

    state.process_event(&InputEvent::Pointer(PointerEvent::down(
        110.0,
        110.0,
        PointerTarget::Element(id),
    )));
    state.process_event(&InputEvent::DoubleClick {
        x: 110.0,
        y: 110.0,
        target: PointerTarget::Element(id),
    });
    state.process_event(&InputEvent::Hover(HoverEvent::EnterElement(id)));
    assert_eq!(state.status().mode, InteractionMode::Idle);
    assert!(matches!(state.remove(id), Err(CanvasError::ElementNotFound(_))));

    let fresh = state.insert_text();
    state.select(fresh);
    assert_eq!(state.status().selected, Some(fresh));
}

// ============================================================================
// Text Editing
// ============================================================================

#[test]
fn test_text_edit_via_events() {
    let mut state = CanvasState::new(1200.0, 800.0);
    let id = state.insert_text();
    let target = PointerTarget::Element(id);

    state.process_event(&InputEvent::DoubleClick {
        x: 110.0,
        y: 110.0,
        target,
    });
    assert_eq!(state.status().mode, InteractionMode::TextEditing);
    assert_eq!(state.controller().editing(), state.status().selected);

    state.process_event(&InputEvent::TextInput {
        text: "Revenue by region".into(),
    });
    state.process_event(&InputEvent::key("Enter"));

    let text = state.scene().get_element(id).and_then(Element::as_text).expect("text");
    assert_eq!(text.content, "Revenue by region");

    state.process_event(&InputEvent::DoubleClick {
        x: 110.0,
        y: 110.0,
        target,
    });
    state.process_event(&InputEvent::TextInput {
        text: "discarded".into(),
    });
    state.process_event(&InputEvent::key("Escape"));
    let text = state.scene().get_element(id).and_then(Element::as_text).expect("text");
    assert_eq!(text.content, "Revenue by region");
}

// ============================================================================
// Hover Overlay & Regeneration
// ============================================================================

#[test]
fn test_regeneration_round_trip() {
    let mut state = CanvasState::new(1200.0, 800.0);
    state.set_viewport(Viewport::new(1440.0, 900.0));
    state.set_file_id(Some("upload-7".into()));
    let id = state
        .apply_feed(vec![feed_image("/out/1.png", Some("plot.scatter(x,y)"))])
        .inserted[0];

    state.process_event(&InputEvent::Hover(HoverEvent::EnterElement(id)));
    assert_eq!(state.preview().expect("open").draft, "plot.scatter(x,y)");
    let timer = state
        .process_event(&InputEvent::Hover(HoverEvent::LeaveElement(id)))
        .expect("close armed");
    assert_eq!(timer.delay, Duration::from_millis(300));
    state.process_event(&InputEvent::Hover(HoverEvent::EnterOverlay));
    assert!(!state.timer_fired(timer.token));

    state.set_draft("plot.scatter(x,y,c='red')");
    let ticket = state
        .begin_regeneration("plot.scatter(x,y,c='red')")
        .expect("ticket");
    assert!(matches!(
        state.begin_regeneration("again"),
        Err(CanvasError::RegenerationBusy(_))
    ));

    // leaving while in flight defers the close
    assert!(state
        .process_event(&InputEvent::Hover(HoverEvent::LeaveOverlay))
        .is_none());

    let timer = state
        .complete_regeneration(
            &ticket,
            RegenerationOutcome::Success {
                image_path: "/out/2.png".into(),
            },
        )
        .expect("confirmation close");
    assert_eq!(timer.delay, Duration::from_millis(1500));

    let image = state.scene().get_element(id).and_then(Element::as_image).expect("image");
    assert!(image.source_ref.starts_with("/out/2.png?v="));
    assert_eq!(image.recipe.as_deref(), Some("plot.scatter(x,y,c='red')"));

    assert!(state.timer_fired(timer.token));
    assert!(state.preview().is_none());
}

#[test]
fn test_regeneration_without_file_reference() {
    let mut state = CanvasState::new(1200.0, 800.0);
    let id = state
        .apply_feed(vec![feed_image("/out/1.png", Some("plot()"))])
        .inserted[0];
    state.process_event(&InputEvent::Hover(HoverEvent::EnterElement(id)));

    assert!(matches!(
        state.begin_regeneration("plot()"),
        Err(CanvasError::MissingContext(_))
    ));
    assert!(!state.hover().is_busy());
}

// ============================================================================
// Invariants
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Image(u8),
    Text,
    Remove(usize),
    Resize(usize, f32, f32),
    Front(usize),
    Back(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Image),
        Just(Op::Text),
        (0usize..16).prop_map(Op::Remove),
        (0usize..16, -500.0f32..800.0, -500.0f32..800.0).prop_map(|(i, w, h)| Op::Resize(i, w, h)),
        (0usize..16).prop_map(Op::Front),
        (0usize..16).prop_map(Op::Back),
    ]
}

fn pick(scene: &Scene, index: usize) -> Option<ElementId> {
    let ids: Vec<ElementId> = scene.elements().map(|e| e.id).collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

proptest! {
    #[test]
    fn prop_ids_unique_and_sizes_floored(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut scene = Scene::new(1200.0, 800.0);
        for op in ops {
            match op {
                Op::Image(n) => {
                    scene.insert_image(format!("/out/{n}.png"), None, None);
                }
                Op::Text => {
                    scene.insert_text();
                }
                Op::Remove(i) => {
                    if let Some(id) = pick(&scene, i) {
                        scene.remove(id).expect("live id");
                    }
                }
                Op::Resize(i, w, h) => {
                    if let Some(id) = pick(&scene, i) {
                        scene
                            .update(id, &canvas_core::ElementPatch::size(w, h))
                            .expect("finite size");
                    }
                }
                Op::Front(i) => {
                    if let Some(id) = pick(&scene, i) {
                        scene.bring_to_front(id);
                        let last = scene.list_ordered_by_z().last().map(|e| e.id);
                        prop_assert_eq!(last, Some(id));
                    }
                }
                Op::Back(i) => {
                    if let Some(id) = pick(&scene, i) {
                        scene.send_to_back(id);
                        let first = scene.list_ordered_by_z().first().map(|e| e.id);
                        prop_assert_eq!(first, Some(id));
                    }
                }
            }

            let mut seen = HashSet::new();
            for element in scene.elements() {
                prop_assert!(seen.insert(element.id));
                let (min_w, min_h) = element.min_size();
                prop_assert!(element.transform.width >= min_w);
                prop_assert!(element.transform.height >= min_h);
                let tf = element.transform;
                prop_assert!(tf.x >= 0.0 && tf.y >= 0.0);
                prop_assert!(tf.x + tf.width <= 1200.0 + 1e-3);
                prop_assert!(tf.y + tf.height <= 800.0 + 1e-3);
            }
        }
    }
}
