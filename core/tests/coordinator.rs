//! Save coordinator tests.
//!
//! Tests cover: idempotent unlocks with first provenance kept, unlocks
//! without an observer, failing participants isolated per pass, essential
//! restore failure, missing and corrupt saves, gateway write failure, the
//! single in-flight save rule, stale save stamps, and the spawn pose of a
//! fresh save.

use std::any::Any;
use std::collections::HashMap;

use undertime_core::{
    config::{GameConfig, SpawnPose},
    coordinator::{LoadOutcome, SaveCoordinator, SaveRequest, UnlockOutcome},
    error::{GameError, GameResult},
    hints::UnlockHintStack,
    participant::{Participant, Resettable, SaveAware},
    phone_participant::{CannedResponder, PhoneParticipant},
    player_participant::PlayerParticipant,
    clue_wall_participant::ClueWallParticipant,
    save_data::{CycleStamp, SaveFile},
    store::SaveGateway,
    types::{Quat, Vec3},
};

// ── Test doubles ───────────────────────────────────────────────

/// Keeps serialized payloads in memory. Writes can be made to fail.
#[derive(Default)]
struct MemoryGateway {
    slots:       HashMap<String, String>,
    fail_writes: bool,
    writes:      usize,
}

impl SaveGateway for MemoryGateway {
    fn exists(&self, identifier: &str) -> GameResult<bool> {
        Ok(self.slots.contains_key(identifier))
    }

    fn save(&mut self, identifier: &str, data: &SaveFile) -> GameResult<()> {
        if self.fail_writes {
            return Err(GameError::Other(anyhow::anyhow!("disk full")));
        }
        self.writes += 1;
        self.slots.insert(identifier.to_string(), serde_json::to_string(data)?);
        Ok(())
    }

    fn load(&self, identifier: &str) -> GameResult<SaveFile> {
        let payload = self
            .slots
            .get(identifier)
            .ok_or_else(|| GameError::NotFound { identifier: identifier.to_string() })?;
        serde_json::from_str(payload).map_err(|source| GameError::CorruptData {
            identifier: identifier.to_string(),
            source,
        })
    }
}

/// Scribbles into the save, then fails. Counts every call it receives.
#[derive(Default)]
struct FaultyParticipant {
    gathers:  usize,
    restores: usize,
    resets:   usize,
}

impl SaveAware for FaultyParticipant {
    fn gather(&mut self, save: &mut SaveFile) -> GameResult<()> {
        self.gathers += 1;
        save.current_cycle.mark_part_removed(99);
        save.player_position.x = 1000.0;
        Err(GameError::Other(anyhow::anyhow!("gather exploded")))
    }

    fn restore(&mut self, _save: &SaveFile) -> GameResult<()> {
        self.restores += 1;
        Err(GameError::Other(anyhow::anyhow!("restore exploded")))
    }
}

impl Resettable for FaultyParticipant {
    fn reset(&mut self, _save: &SaveFile) -> GameResult<()> {
        self.resets += 1;
        Err(GameError::Other(anyhow::anyhow!("reset exploded")))
    }
}

impl Participant for FaultyParticipant {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn as_save_aware(&mut self) -> Option<&mut dyn SaveAware> {
        Some(self)
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Writes one removed part, succeeds.
struct MarkerParticipant;

impl SaveAware for MarkerParticipant {
    fn gather(&mut self, save: &mut SaveFile) -> GameResult<()> {
        save.current_cycle.mark_part_removed(4);
        Ok(())
    }

    fn restore(&mut self, _save: &SaveFile) -> GameResult<()> {
        Ok(())
    }
}

impl Participant for MarkerParticipant {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn as_save_aware(&mut self) -> Option<&mut dyn SaveAware> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn coordinator() -> SaveCoordinator<MemoryGateway> {
    coordinator_with(MemoryGateway::default())
}

fn coordinator_with(gateway: MemoryGateway) -> SaveCoordinator<MemoryGateway> {
    let config = GameConfig::default_test();
    let hints = UnlockHintStack::new(config.hint_display_secs, config.hint_leave_secs);
    SaveCoordinator::new(config.save_identifier.clone(), gateway, config.catalog, hints)
}

fn with_observers(coordinator: &mut SaveCoordinator<MemoryGateway>) {
    let catalog = coordinator.catalog().clone();
    coordinator.register(Box::new(ClueWallParticipant::new(catalog)));
    coordinator.register(Box::new(PhoneParticipant::new(2.0, Box::new(CannedResponder::new("ok")))));
}

fn stamp(cycle_id: u32, elapsed_secs: f32) -> CycleStamp {
    CycleStamp { cycle_id, elapsed_secs }
}

// ── Unlocks ────────────────────────────────────────────────────

#[test]
fn unlocking_the_same_clue_twice_keeps_one_record() {
    let mut coordinator = coordinator();
    with_observers(&mut coordinator);

    let first = coordinator.unlock_clue(3, stamp(0, 5.0)).unwrap();
    let second = coordinator.unlock_clue(3, stamp(0, 9.0)).unwrap();

    assert_eq!(first, UnlockOutcome::Unlocked { materialized: true });
    assert_eq!(second, UnlockOutcome::AlreadyCollected);
    let clues = &coordinator.save_file().collected_clues;
    assert_eq!(clues.len(), 1);
    assert_eq!(clues[0].id, 3);
    assert_eq!(coordinator.hints().len(), 1, "a duplicate unlock must not hint again");
}

#[test]
fn duplicate_unlocks_never_overwrite_provenance() {
    let mut coordinator = coordinator();
    with_observers(&mut coordinator);

    coordinator.unlock_contact(1, stamp(0, 12.5)).unwrap();
    coordinator.unlock_contact(1, stamp(3, 44.0)).unwrap();
    coordinator.unlock_clue(2, stamp(1, 7.0)).unwrap();
    coordinator.unlock_clue(2, stamp(2, 1.0)).unwrap();

    let contact = coordinator.save_file().contact(1).expect("contact 1");
    assert_eq!((contact.cycle_id, contact.cycle_elapsed), (0, 12.5));
    let clue = coordinator.save_file().clue(2).expect("clue 2");
    assert_eq!((clue.cycle_id, clue.cycle_elapsed), (1, 7.0));
}

#[test]
fn unlock_without_an_observer_still_records_the_data() {
    let mut coordinator = coordinator();

    let outcome = coordinator.unlock_clue(1, stamp(0, 1.0)).unwrap();

    assert_eq!(outcome, UnlockOutcome::Unlocked { materialized: false });
    assert!(coordinator.save_file().has_clue(1));
    assert!(coordinator.hints().is_empty());
}

#[test]
fn unknown_catalog_ids_are_rejected() {
    let mut coordinator = coordinator();
    let err = coordinator.unlock_clue(42, stamp(0, 0.0)).unwrap_err();
    assert!(matches!(err, GameError::UnknownClue { id: 42 }), "got {err:?}");
    let err = coordinator.unlock_contact(42, stamp(0, 0.0)).unwrap_err();
    assert!(matches!(err, GameError::UnknownContact { id: 42 }), "got {err:?}");
    assert!(coordinator.save_file().collected_clues.is_empty());
}

#[test]
fn quick_unlock_walks_the_catalog_then_stops() {
    let mut coordinator = coordinator();
    coordinator.unlock_clue(0, stamp(0, 0.0)).unwrap();

    let mut unlocked = Vec::new();
    while let Some(id) = coordinator.quick_unlock_clue(stamp(0, 1.0)).unwrap() {
        unlocked.push(id);
    }
    assert_eq!(unlocked, vec![1, 2, 3]);
    assert_eq!(coordinator.save_file().collected_clues.len(), 4);
}

// ── Save pass ──────────────────────────────────────────────────

#[test]
fn failing_gather_leaves_no_partial_write() {
    let mut coordinator = coordinator();
    let faulty = coordinator.register(Box::new(FaultyParticipant::default()));
    coordinator.register(Box::new(MarkerParticipant));

    let report = coordinator.save_game(SaveRequest::checkpoint(stamp(0, 20.0))).unwrap();

    assert_eq!(report.pass.visited, 2);
    assert_eq!(report.pass.failures.len(), 1);
    assert_eq!(report.pass.failures[0].participant, "faulty");
    assert!(report.persisted);

    let save = coordinator.save_file();
    assert!(save.current_cycle.is_part_removed(4), "healthy participant was skipped");
    assert!(!save.current_cycle.is_part_removed(99));
    assert_eq!(save.player_position, SpawnPose::default().position);
    assert_eq!(save.current_cycle.elapsed_secs, 20.0);

    let faulty = coordinator.registry().get::<FaultyParticipant>(faulty).unwrap();
    assert_eq!(faulty.gathers, 1);
}

#[test]
fn end_of_cycle_save_archives_before_writing() {
    let mut coordinator = coordinator();
    coordinator.register(Box::new(MarkerParticipant));

    let report = coordinator.save_game(SaveRequest::end_of_cycle(stamp(0, 61.0), true)).unwrap();
    assert_eq!(report.cycle_id, 0);
    assert_eq!(report.new_cycle, Some(1));

    let on_disk = coordinator.gateway().load("UnderTime").unwrap();
    assert_eq!(on_disk.completed_cycles.len(), 1);
    let ended = &on_disk.completed_cycles[0];
    assert_eq!(ended.elapsed_secs, 61.0);
    assert!(ended.ended_manually);
    assert!(ended.is_part_removed(4));
    assert_eq!(on_disk.current_cycle.id, 1);
    assert!(on_disk.current_cycle.is_fresh());
}

#[test]
fn second_request_while_one_is_pending_is_rejected() {
    let mut coordinator = coordinator();

    coordinator.request_save(SaveRequest::end_of_cycle(stamp(0, 60.5), false)).unwrap();
    assert!(coordinator.is_save_in_flight());

    let err = coordinator.request_save(SaveRequest::checkpoint(stamp(0, 60.5))).unwrap_err();
    assert!(matches!(err, GameError::SaveInFlight));
    let err = coordinator.save_game(SaveRequest::checkpoint(stamp(0, 60.5))).unwrap_err();
    assert!(matches!(err, GameError::SaveInFlight));

    let report = coordinator.poll_save().expect("pending save runs");
    assert_eq!(report.new_cycle, Some(1));
    assert!(!coordinator.is_save_in_flight());
    assert!(coordinator.poll_save().is_none());
    assert_eq!(coordinator.save_file().completed_cycles.len(), 1);
    assert_eq!(coordinator.gateway().writes, 1);
}

#[test]
fn failed_write_is_reported_not_fatal() {
    let mut coordinator = coordinator_with(MemoryGateway { fail_writes: true, ..Default::default() });

    let new_game = coordinator.new_game();
    assert!(!new_game.persisted);

    let report = coordinator.save_game(SaveRequest::end_of_cycle(stamp(0, 60.5), false)).unwrap();
    assert!(!report.persisted);
    // In memory the cycle still moved on.
    assert_eq!(coordinator.save_file().current_cycle.id, 1);
    assert!(!coordinator.is_game_exists());
}

#[test]
fn save_stamped_for_another_cycle_is_rejected() {
    let mut coordinator = coordinator();
    coordinator.register(Box::new(MarkerParticipant));
    coordinator.save_game(SaveRequest::end_of_cycle(stamp(0, 60.5), false)).unwrap();

    let err = coordinator.save_game(SaveRequest::checkpoint(stamp(0, 60.5))).unwrap_err();
    assert!(matches!(err, GameError::StaleStamp { stamped: 0, current: 1 }), "got {err:?}");
    let err = coordinator.request_save(SaveRequest::checkpoint(stamp(0, 60.5))).unwrap_err();
    assert!(matches!(err, GameError::StaleStamp { .. }), "got {err:?}");

    assert!(!coordinator.is_save_in_flight());
    assert!(coordinator.save_file().current_cycle.is_fresh());
    assert_eq!(coordinator.gateway().writes, 1);
}

#[test]
fn new_game_puts_the_player_at_the_spawn_pose() {
    let spawn = SpawnPose { position: Vec3::new(2.0, 0.0, 3.0), orientation: Quat::IDENTITY };
    let mut coordinator = coordinator().with_spawn_pose(spawn.clone());
    let player = coordinator.register(Box::new(PlayerParticipant::new(spawn.clone())));
    coordinator
        .registry_mut()
        .get_mut::<PlayerParticipant>(player)
        .unwrap()
        .place(Vec3::new(9.0, 0.0, 9.0), Quat::IDENTITY)
        .unwrap();

    let report = coordinator.new_game();

    assert!(report.pass.is_clean());
    assert_eq!(coordinator.save_file().player_position, spawn.position);
    let on_disk = coordinator.gateway().load("UnderTime").unwrap();
    assert_eq!(on_disk.player_position, spawn.position);
    let player = coordinator.registry().get::<PlayerParticipant>(player).unwrap();
    assert_eq!(player.position(), spawn.position);
}

// ── Load / reset passes ────────────────────────────────────────

#[test]
fn missing_save_loads_fresh() {
    let mut coordinator = coordinator();
    let report = coordinator.load_game().unwrap();
    assert_eq!(report.outcome, LoadOutcome::Fresh);
    assert_eq!(coordinator.save_file(), &SaveFile::at_spawn(&SpawnPose::default()));
}

#[test]
fn corrupt_save_loads_fresh() {
    let mut gateway = MemoryGateway::default();
    gateway.slots.insert("UnderTime".into(), "{\"player_position\": 12".into());
    let mut coordinator = coordinator_with(gateway);
    coordinator.unlock_clue(0, stamp(0, 0.0)).unwrap();

    let report = coordinator.load_game().unwrap();

    assert_eq!(report.outcome, LoadOutcome::Fresh);
    assert!(coordinator.save_file().collected_clues.is_empty());
}

#[test]
fn non_essential_restore_failure_is_a_warning() {
    let mut coordinator = coordinator();
    coordinator.new_game();
    let faulty = coordinator.register(Box::new(FaultyParticipant::default()));
    coordinator.register(Box::new(MarkerParticipant));

    let report = coordinator.load_game().unwrap();

    assert_eq!(report.outcome, LoadOutcome::Loaded);
    assert_eq!(report.pass.visited, 2);
    assert_eq!(report.pass.failures.len(), 1);
    assert_eq!(report.pass.failures[0].operation, "restore");
    assert_eq!(coordinator.registry().get::<FaultyParticipant>(faulty).unwrap().restores, 1);
}

#[test]
fn essential_restore_failure_fails_the_load() {
    let mut gateway = MemoryGateway::default();
    let broken = SaveFile { player_orientation: Quat::new(0.0, 0.0, 0.0, 0.0), ..SaveFile::default() };
    gateway.save("UnderTime", &broken).unwrap();
    let mut coordinator = coordinator_with(gateway);
    coordinator.register(Box::new(PlayerParticipant::new(GameConfig::default_test().spawn_pose)));

    let err = coordinator.load_game().unwrap_err();

    match err {
        GameError::ParticipantFailure { participant, operation, .. } => {
            assert_eq!(participant, "player");
            assert_eq!(operation, "restore");
        }
        other => panic!("expected ParticipantFailure, got {other:?}"),
    }
}

#[test]
fn reset_failures_do_not_stop_the_pass() {
    let mut coordinator = coordinator();
    let faulty = coordinator.register(Box::new(FaultyParticipant::default()));
    coordinator.register(Box::new(PlayerParticipant::new(GameConfig::default_test().spawn_pose)));

    let report = coordinator.reset_all();

    assert_eq!(report.visited, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(coordinator.registry().get::<FaultyParticipant>(faulty).unwrap().resets, 1);
}

#[test]
fn deregistered_participants_are_not_visited() {
    let mut coordinator = coordinator();
    let faulty = coordinator.register(Box::new(FaultyParticipant::default()));
    assert!(coordinator.deregister(faulty).is_some());

    let report = coordinator.save_game(SaveRequest::checkpoint(stamp(0, 1.0))).unwrap();
    assert_eq!(report.pass.visited, 0);
    assert!(report.pass.is_clean());
    assert!(coordinator.registry().is_empty());
}
