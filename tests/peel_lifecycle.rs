/// Scenario tests for the full peel interaction.
///
/// Each test drives a `GestureBinding` attached to a recording fake element through
/// `peeloff_test_scenes::Scenario`, which steps 16ms frames the way a host run loop would.
///
/// Run with:   cargo test --test peel_lifecycle
use std::time::Duration;

use peeloff::{CompetitorState, GestureKind, LifecyclePhase, PeelConfig, Point, Rect, Size};
use peeloff_test_scenes::{HostEvent, RecordingElement, Scenario, FRAME};

fn rect(x: f32, y: f32, width: f32, height: f32) -> Rect {
    Rect::new(Point::new(x, y), Size::new(width, height))
}

fn sticker() -> Scenario {
    Scenario::new(rect(0.0, 0.0, 100.0, 100.0))
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn layer_is_empty(scenario: &Scenario) -> bool {
    scenario
        .element
        .layer()
        .map(|layer| layer.is_empty())
        .unwrap_or(true)
}

#[test]
fn long_press_lifts_the_element_into_an_overlay() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));

    assert_eq!(scenario.binding.phase(), LifecyclePhase::PeelingIn);
    let overlay = scenario.binding.overlay().expect("overlay after long press");
    assert_eq!(overlay.frame(), rect(0.0, 0.0, 100.0, 100.0));
    assert_eq!(overlay.viewport(), rect(-35.0, -35.0, 170.0, 170.0));
    assert_eq!(scenario.element.layer().unwrap().len(), 1);

    scenario.run_for(ms(800));
    let overlay = scenario.binding.overlay().unwrap();
    assert_eq!(overlay.surface().presented_peeled(), 1.0);
    assert!(overlay.is_source_hidden());
    assert!(scenario.element.is_hidden());
}

#[test]
fn dragging_keeps_the_press_offset_under_the_finger() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.drag_to(Point::new(80.0, 60.0));

    assert_eq!(scenario.binding.phase(), LifecyclePhase::Tracking);
    let overlay = scenario.binding.overlay().unwrap();
    assert_eq!(overlay.frame(), rect(30.0, 10.0, 100.0, 100.0));
    let layer = scenario.element.layer().unwrap();
    assert_eq!(layer.frame(overlay.id()), Some(rect(30.0, 10.0, 100.0, 100.0)));
}

#[test]
fn release_peels_out_and_returns_to_idle() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.drag_to(Point::new(80.0, 60.0));
    scenario.release(Point::new(80.0, 60.0));
    assert_eq!(scenario.binding.phase(), LifecyclePhase::PeelingOut);

    // The completion is scheduled on the frame after the release.
    scenario.run_for(ms(800));
    assert_eq!(scenario.binding.phase(), LifecyclePhase::PeelingOut);
    assert!(scenario.element.is_hidden());

    scenario.step();
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(scenario.binding.overlay().is_none());
    assert!(!scenario.element.is_hidden());
    assert!(layer_is_empty(&scenario));
    assert!(matches!(
        scenario.element.events().last(),
        Some(HostEvent::Remove(_))
    ));
}

#[test]
fn overlay_springs_back_onto_the_element() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.drag_to(Point::new(80.0, 60.0));
    scenario.release(Point::new(80.0, 60.0));

    scenario.run_for(ms(400));
    let frame = scenario.binding.overlay().unwrap().frame();
    assert!(frame.origin.x > 0.0 && frame.origin.x < 30.0, "{frame:?}");
    assert!(frame.origin.y > 0.0 && frame.origin.y < 10.0, "{frame:?}");
    assert_eq!(frame.size, Size::new(100.0, 100.0));

    scenario.finish_animation();
    let last_frame = scenario
        .element
        .events()
        .iter()
        .rev()
        .find_map(|event| match event {
            HostEvent::SetFrame(_, frame) => Some(*frame),
            _ => None,
        })
        .unwrap();
    assert!(last_frame.origin.x.abs() < 0.5, "{last_frame:?}");
    assert!(last_frame.origin.y.abs() < 0.5, "{last_frame:?}");
}

#[test]
fn snapshot_and_insert_happen_before_the_element_hides() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    assert!(!scenario.element.is_hidden());
    scenario.step();
    assert!(scenario.element.is_hidden());
    scenario.release(Point::new(50.0, 50.0));
    scenario.finish_animation();

    let element = &scenario.element;
    let snapshot = element.position(|e| *e == HostEvent::Snapshot).unwrap();
    let insert = element
        .position(|e| matches!(e, HostEvent::Insert(..)))
        .unwrap();
    let hide = element.position(|e| *e == HostEvent::Hide).unwrap();
    let show = element.position(|e| *e == HostEvent::Show).unwrap();
    let remove = element
        .position(|e| matches!(e, HostEvent::Remove(_)))
        .unwrap();
    assert!(snapshot < hide);
    assert!(insert < hide);
    assert!(hide < show);
    assert!(show < remove);
    assert_eq!(element.count(|e| *e == HostEvent::Hide), 1);
    assert_eq!(element.count(|e| *e == HostEvent::Show), 1);
}

#[test]
fn release_before_the_start_callback_still_hides_then_reveals() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.release(Point::new(50.0, 50.0));
    assert_eq!(scenario.binding.phase(), LifecyclePhase::PeelingOut);
    assert!(!scenario.element.is_hidden());

    scenario.step();
    assert!(scenario.element.is_hidden());

    scenario.finish_animation();
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(!scenario.element.is_hidden());
    assert!(layer_is_empty(&scenario));
}

#[test]
fn cancellation_is_handled_like_a_release() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.cancel();
    assert_eq!(scenario.binding.phase(), LifecyclePhase::PeelingOut);
    scenario.finish_animation();
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(!scenario.element.is_hidden());
}

#[test]
fn a_short_tap_never_lifts_anything() {
    let mut scenario = sticker();
    scenario.press(Point::new(50.0, 50.0));
    scenario.run_for(ms(100));
    scenario.release(Point::new(50.0, 50.0));
    scenario.run_for(ms(500));

    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(scenario.element.events().is_empty());
}

#[test]
fn a_new_press_during_peel_out_is_rejected() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.release(Point::new(50.0, 50.0));

    scenario.long_press(Point::new(20.0, 20.0));
    assert_eq!(scenario.binding.phase(), LifecyclePhase::PeelingOut);
    let cycle = scenario.binding.overlay().unwrap().cycle();
    scenario.drag_to(Point::new(90.0, 90.0));
    assert_eq!(scenario.binding.overlay().unwrap().cycle(), cycle);

    scenario.finish_animation();
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    scenario.release(Point::new(90.0, 90.0));
    scenario.run_for(ms(100));

    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    let element = &scenario.element;
    assert_eq!(element.count(|e| matches!(e, HostEvent::Insert(..))), 1);
    assert_eq!(element.count(|e| matches!(e, HostEvent::Remove(_))), 1);
    assert!(!element.is_hidden());
}

#[test]
fn consecutive_gestures_get_fresh_overlays() {
    let mut scenario = sticker();
    let mut ids = Vec::new();
    for _ in 0..2 {
        scenario.long_press(Point::new(50.0, 50.0));
        ids.push(scenario.binding.overlay().unwrap().id());
        scenario.release(Point::new(50.0, 50.0));
        scenario.finish_animation();
        assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    }
    assert_ne!(ids[0], ids[1]);
    assert_eq!(
        scenario
            .element
            .count(|e| matches!(e, HostEvent::Insert(..))),
        2
    );
}

#[test]
fn detach_tears_down_immediately() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.drag_to(Point::new(60.0, 60.0));
    scenario.step();
    assert!(scenario.element.is_hidden());

    scenario.binding.detach();
    assert!(!scenario.binding.is_attached());
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(!scenario.element.is_hidden());
    assert!(layer_is_empty(&scenario));

    // Callbacks still in flight and new touches change nothing.
    scenario.press(Point::new(50.0, 50.0));
    scenario.run_for(ms(1000));
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert_eq!(
        scenario
            .element
            .count(|e| matches!(e, HostEvent::Insert(..))),
        1
    );
}

#[test]
fn dropping_the_binding_reveals_the_element() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.step();
    assert!(scenario.element.is_hidden());

    let Scenario {
        binding,
        element,
        mut scheduler,
        ..
    } = scenario;
    drop(binding);
    assert!(!element.is_hidden());
    assert!(element.layer().unwrap().is_empty());

    // Pending callbacks find nobody to talk to.
    scheduler.advance_to(ms(5000));
    assert!(!element.is_hidden());
}

#[test]
fn pending_pan_delays_recognition_until_it_fails() {
    let mut scenario = sticker();
    scenario
        .binding
        .competitor_changed(GestureKind::Pan, CompetitorState::Possible);
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.run_for(ms(200));
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);

    scenario
        .binding
        .competitor_changed(GestureKind::Pan, CompetitorState::Failed);
    scenario.step();
    assert_eq!(scenario.binding.phase(), LifecyclePhase::PeelingIn);
}

#[test]
fn a_beginning_drag_wins_over_the_peel() {
    let mut scenario = sticker();
    scenario
        .binding
        .competitor_changed(GestureKind::Drag, CompetitorState::Possible);
    scenario.press(Point::new(50.0, 50.0));
    scenario.step();
    scenario
        .binding
        .competitor_changed(GestureKind::Drag, CompetitorState::Began);
    scenario.run_for(ms(500));
    scenario.release(Point::new(50.0, 50.0));
    scenario.run_for(FRAME);

    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(scenario.element.events().is_empty());
}

#[test]
fn element_outside_a_window_is_not_peeled() {
    let mut scenario =
        Scenario::with_element(RecordingElement::orphan(), PeelConfig::default());
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.drag_to(Point::new(60.0, 60.0));
    scenario.release(Point::new(60.0, 60.0));
    scenario.run_for(ms(1000));

    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(!scenario.element.is_hidden());
    assert_eq!(
        scenario
            .element
            .count(|e| !matches!(e, HostEvent::Snapshot)),
        0
    );
}

#[test]
fn element_leaving_its_window_peels_out_in_place() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.drag_to(Point::new(80.0, 60.0));
    scenario.element.move_to(None);
    scenario.release(Point::new(80.0, 60.0));

    scenario.run_for(ms(400));
    assert_eq!(
        scenario.binding.overlay().unwrap().frame(),
        rect(30.0, 10.0, 100.0, 100.0)
    );
    scenario.finish_animation();
    assert_eq!(scenario.binding.phase(), LifecyclePhase::Idle);
    assert!(layer_is_empty(&scenario));
}

#[test]
fn overlay_returns_to_where_the_element_is_now() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.element.move_to(Some(rect(200.0, 0.0, 100.0, 100.0)));
    scenario.release(Point::new(50.0, 50.0));

    scenario.run_for(ms(800));
    let frame = scenario.binding.overlay().unwrap().frame();
    assert!((frame.origin.x - 200.0).abs() < 1.0, "{frame:?}");
}

#[test]
fn slower_configuration_is_respected() {
    let config = PeelConfig::default().with_animation_duration(ms(1600));
    let mut scenario = Scenario::with_element(
        RecordingElement::in_window(rect(0.0, 0.0, 100.0, 100.0)),
        config,
    );
    scenario.long_press(Point::new(50.0, 50.0));
    scenario.run_for(ms(800));
    let peeled = scenario
        .binding
        .overlay()
        .unwrap()
        .surface()
        .presented_peeled();
    assert!((peeled - 0.5).abs() < 0.02, "{peeled}");
}

#[test]
fn element_stays_hidden_exactly_while_the_overlay_lives() {
    let mut scenario = sticker();
    scenario.long_press(Point::new(50.0, 50.0));
    // The peel-in start arrives on the next frame.
    scenario.step();

    let check = |scenario: &Scenario| {
        let phase = scenario.binding.phase();
        assert_eq!(
            scenario.element.is_hidden(),
            phase != LifecyclePhase::Idle,
            "phase {phase:?} at {:?}",
            scenario.now()
        );
    };

    let path = [(60.0, 55.0), (75.0, 40.0), (75.0, 40.0), (30.0, 90.0), (52.0, 48.0)];
    for (frames, (x, y)) in path.into_iter().enumerate() {
        scenario.drag_to(Point::new(x, y));
        check(&scenario);
        // Uneven spacing between moves, including moves on back-to-back frames.
        for _ in 0..=frames % 3 {
            scenario.step();
            check(&scenario);
        }
    }

    scenario.drag_to(Point::new(40.0, 40.0));
    scenario.release(Point::new(40.0, 40.0));
    let mut frames = 0;
    while scenario.binding.phase() != LifecyclePhase::Idle {
        check(&scenario);
        scenario.step();
        frames += 1;
        assert!(frames < 100, "peel-out never completed");
    }
    check(&scenario);
    assert!(!scenario.element.is_hidden());
}
