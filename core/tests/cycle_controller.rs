//! Cycle controller tests.
//!
//! Tests cover: the timeout boundary, the full Running → Ending → Saving →
//! Resetting → Running walk, manual ends (including a rejected one during
//! Saving), what freezes the clock and what doesn't, and the saving
//! indicator only showing on timeouts.

use undertime_core::{
    controller::CyclePhase,
    event::CycleEvent,
    hud::HudInput,
    session::GameSession,
    store::SqliteSaveStore,
};

fn build(id: &str) -> GameSession<SqliteSaveStore> {
    let mut session = GameSession::build_test(id).expect("build test session");
    session.new_game();
    session
}

/// Tick until the session is running in a cycle other than `from`.
fn finish_transition(session: &mut GameSession<SqliteSaveStore>, from: u32) -> Vec<CycleEvent> {
    let mut events = Vec::new();
    for _ in 0..32 {
        events.extend(session.tick(1.0));
        if session.phase() == CyclePhase::Running && session.controller().cycle_id() != from {
            return events;
        }
    }
    panic!("transition out of cycle {from} did not finish: {events:?}");
}

#[test]
fn exactly_at_threshold_is_still_running() {
    let mut session = build("ctl-threshold");
    let length = session.config().cycle_length_secs as u32;

    for _ in 0..length {
        assert!(session.tick(1.0).is_empty());
    }
    assert_eq!(session.controller().clock().elapsed_secs, length as f32);
    assert_eq!(session.phase(), CyclePhase::Running);

    let events = session.tick(1.0);
    assert_eq!(session.phase(), CyclePhase::Ending);
    assert!(matches!(
        events.as_slice(),
        [CycleEvent::CycleEnding { cycle_id: 0, manual: false, .. }]
    ));
}

#[test]
fn timeout_walks_every_phase_and_installs_a_fresh_cycle() {
    let mut session = build("ctl-timeout");
    let length = session.config().cycle_length_secs as u32;
    for _ in 0..=length {
        session.tick(1.0);
    }
    assert_eq!(session.phase(), CyclePhase::Ending);

    let events = finish_transition(&mut session, 0);

    let kinds: Vec<_> = events
        .iter()
        .map(|e| match e {
            CycleEvent::FadeOutCompleted { .. } => "fade_out",
            CycleEvent::SaveStarted { indicator: true, .. } => "save_started_with_indicator",
            CycleEvent::SaveStarted { indicator: false, .. } => "save_started",
            CycleEvent::SaveCompleted { persisted: true, .. } => "saved",
            CycleEvent::SaveCompleted { persisted: false, .. } => "save_failed",
            CycleEvent::CycleReset { .. } => "reset",
            CycleEvent::CycleResumed { .. } => "resumed",
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(kinds, vec!["fade_out", "save_started_with_indicator", "saved", "reset", "resumed"]);

    let save = session.coordinator().save_file();
    assert_eq!(save.completed_cycles.len(), 1);
    assert!(!save.completed_cycles[0].ended_manually);
    assert!(save.completed_cycles[0].elapsed_secs > session.config().cycle_length_secs);
    assert_eq!(save.current_cycle.id, 1);
    assert!(save.current_cycle.is_fresh());
    assert_eq!(session.controller().clock().elapsed_secs, 0.0);
}

#[test]
fn each_completed_cycle_adds_exactly_one_archive_entry() {
    let mut session = build("ctl-growth");

    for n in 0..3u32 {
        session.tick(5.0);
        assert!(matches!(session.end_cycle(), CycleEvent::CycleEnding { manual: true, .. }));
        finish_transition(&mut session, n);

        let save = session.coordinator().save_file();
        assert_eq!(save.completed_cycles.len() as u32, n + 1);
        assert_eq!(save.current_cycle.id, n + 1);
        assert!(save.completed_cycles.iter().all(|c| c.id < save.current_cycle.id));
    }
}

#[test]
fn manual_end_during_saving_is_rejected() {
    let mut session = build("ctl-scenario-d");
    session.end_cycle();
    session.tick(1.0);
    session.tick(1.0);
    assert_eq!(session.phase(), CyclePhase::Saving);

    let event = session.end_cycle();

    assert_eq!(event, CycleEvent::ManualEndRejected { phase: CyclePhase::Saving });
    assert_eq!(session.phase(), CyclePhase::Saving);

    finish_transition(&mut session, 0);
    assert_eq!(session.coordinator().save_file().completed_cycles.len(), 1);
}

#[test]
fn manual_end_is_ignored_in_every_transition_phase() {
    let mut session = build("ctl-single-flight");
    session.end_cycle();

    let mut seen = Vec::new();
    while session.phase() != CyclePhase::Running {
        seen.push(session.phase());
        assert!(matches!(session.end_cycle(), CycleEvent::ManualEndRejected { .. }));
        session.tick(1.0);
    }
    assert!(seen.contains(&CyclePhase::Ending));
    assert!(seen.contains(&CyclePhase::Saving));
    assert!(seen.contains(&CyclePhase::Resetting));
    assert_eq!(session.coordinator().save_file().completed_cycles.len(), 1);
}

#[test]
fn manual_end_skips_the_saving_indicator() {
    let mut session = build("ctl-no-indicator");
    session.end_cycle();
    let events = finish_transition(&mut session, 0);

    assert!(events.iter().any(|e| matches!(e, CycleEvent::SaveStarted { indicator: false, .. })));
    assert!(session.coordinator().save_file().completed_cycles[0].ended_manually);
}

#[test]
fn pause_menu_freezes_the_clock_but_reading_does_not() {
    let mut session = build("ctl-freeze");

    session.input(HudInput::Pause);
    assert!(session.hud().pause_menu_open);
    session.tick(10.0);
    assert_eq!(session.controller().clock().elapsed_secs, 0.0);
    session.input(HudInput::Pause);

    session.select("Clue0", true);
    session.input(HudInput::Interact);
    assert_eq!(session.hud().clue_detail, Some(0));
    session.tick(10.0);
    assert_eq!(session.controller().clock().elapsed_secs, 10.0);
    assert!(session.player().unwrap().is_movement_locked());
}

#[test]
fn cycle_end_closes_modals_and_pauses_the_player() {
    let mut session = build("ctl-close-modals");
    session.input(HudInput::Phone);
    assert!(session.hud().phone_open);

    session.end_cycle();

    assert!(!session.hud().any_modal_open());
    assert!(!session.hud().selection_enabled);
    assert!(session.player().unwrap().is_paused());

    // HUD input does nothing mid-transition.
    session.input(HudInput::Phone);
    assert!(!session.hud().phone_open);

    finish_transition(&mut session, 0);
    assert!(session.hud().selection_enabled);
    assert!(!session.player().unwrap().is_paused());
}

#[test]
fn fast_forward_scales_the_cycle_clock() {
    let mut session = build("ctl-fast-forward");
    session.input(HudInput::ToggleFastForward);
    session.tick(2.0);
    let scale = session.config().fast_forward_scale;
    assert_eq!(session.controller().clock().elapsed_secs, 2.0 * scale);
}

#[test]
fn fade_covers_the_transition_and_clears_after() {
    let mut session = build("ctl-fade");
    session.end_cycle();
    session.tick(1.0);
    session.tick(1.0);
    assert_eq!(session.controller().fade().alpha(), 1.0);

    finish_transition(&mut session, 0);
    let fade_secs = session.config().fade_secs;
    session.tick(fade_secs);
    assert_eq!(session.controller().fade().alpha(), 0.0);
}
