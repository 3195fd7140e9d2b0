//! The save coordinator, owner of the one live SaveFile.
//!
//! PASSES (one at a time, never interleaved):
//!   - gather:  every SaveAware participant writes into the SaveFile,
//!              then the SaveFile is written through the gateway.
//!   - restore: the SaveFile is fully loaded first, then every SaveAware
//!              participant reads it.
//!   - reset:   every Resettable participant returns to the fresh-cycle
//!              baseline.
//!
//! RULES:
//!   - No ordering between participants within a pass.
//!   - A failing participant is logged and skipped; it never leaves a
//!     partial write in the SaveFile and never aborts the pass.
//!   - At most one save is in flight. A second request is rejected with
//!     GameError::SaveInFlight, never queued and never silently dropped.
//!   - A save request must be stamped for the current cycle. Anything else
//!     is rejected with GameError::StaleStamp before a gather starts.
//!   - A fresh save (new game, missing or corrupt load) puts the player at
//!     the spawn pose.

use crate::{
    config::{Catalog, SpawnPose},
    error::{GameError, GameResult},
    hints::UnlockHintStack,
    participant::{Participant, ParticipantHandle, ParticipantRegistry, Unlocked},
    save_data::{CycleStamp, SaveFile},
    store::SaveGateway,
    types::{ClueId, ContactId, CycleId},
};
use serde::{Deserialize, Serialize};

/// The cycle clock's contribution to a save.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub stamp:          CycleStamp,
    pub ended_manually: bool,
    /// Archive the current cycle and install a fresh one before writing.
    pub archive:        bool,
}

impl SaveRequest {
    /// Save mid-cycle without ending it (e.g. exit to menu).
    pub fn checkpoint(stamp: CycleStamp) -> Self {
        Self { stamp, ended_manually: false, archive: false }
    }

    pub fn end_of_cycle(stamp: CycleStamp, ended_manually: bool) -> Self {
        Self { stamp, ended_manually, archive: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantFault {
    pub participant: String,
    pub operation:   String,
    pub reason:      String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Participants that took part in the pass.
    pub visited:  usize,
    pub failures: Vec<ParticipantFault>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, participant: &str, operation: &str, error: &GameError) {
        log::warn!("participant '{participant}' failed during {operation}: {error}");
        self.failures.push(ParticipantFault {
            participant: participant.to_string(),
            operation:   operation.to_string(),
            reason:      error.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveReport {
    /// Id of the cycle that was current when the save started.
    pub cycle_id:  CycleId,
    /// Id of the freshly installed cycle, when the save archived one.
    pub new_cycle: Option<CycleId>,
    pub pass:      PassReport,
    /// False if the gateway write failed; the in-memory SaveFile is still
    /// consistent, but this cycle's progress may not be on disk.
    pub persisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded,
    /// Nothing usable on disk; the session starts from an empty save.
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub outcome: LoadOutcome,
    pub pass:    PassReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGameReport {
    pub persisted: bool,
    pub pass:      PassReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockOutcome {
    /// Recorded. `materialized` is false when no observer was there to
    /// show it (data is still authoritative).
    Unlocked { materialized: bool },
    AlreadyCollected,
}

pub struct SaveCoordinator<G: SaveGateway> {
    identifier:   String,
    gateway:      G,
    save:         SaveFile,
    registry:     ParticipantRegistry,
    hints:        UnlockHintStack,
    catalog:      Catalog,
    spawn:        SpawnPose,
    pending_save: Option<SaveRequest>,
}

impl<G: SaveGateway> SaveCoordinator<G> {
    pub fn new(identifier: impl Into<String>, gateway: G, catalog: Catalog, hints: UnlockHintStack) -> Self {
        let spawn = SpawnPose::default();
        Self {
            identifier: identifier.into(),
            gateway,
            save: SaveFile::at_spawn(&spawn),
            registry: ParticipantRegistry::new(),
            hints,
            catalog,
            spawn,
            pending_save: None,
        }
    }

    /// Where a fresh save puts the player.
    pub fn with_spawn_pose(mut self, spawn: SpawnPose) -> Self {
        self.save = SaveFile::at_spawn(&spawn);
        self.spawn = spawn;
        self
    }

    // ── Registry ───────────────────────────────────────────────

    pub fn register(&mut self, participant: Box<dyn Participant>) -> ParticipantHandle {
        self.registry.register(participant)
    }

    pub fn deregister(&mut self, handle: ParticipantHandle) -> Option<Box<dyn Participant>> {
        self.registry.deregister(handle)
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ParticipantRegistry {
        &mut self.registry
    }

    // ── Read-only views ────────────────────────────────────────

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn save_file(&self) -> &SaveFile {
        &self.save
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn hints(&self) -> &UnlockHintStack {
        &self.hints
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Whether a save exists under this coordinator's identifier.
    /// Gateway errors read as "no save".
    pub fn is_game_exists(&self) -> bool {
        match self.gateway.exists(&self.identifier) {
            Ok(exists) => exists,
            Err(e) => {
                log::warn!("exists('{}') failed: {e}", self.identifier);
                false
            }
        }
    }

    // ── Game lifecycle ─────────────────────────────────────────

    /// Discard the current save, persist a default one, and hand the fresh
    /// state to every participant. A write failure is reported, not fatal.
    pub fn new_game(&mut self) -> NewGameReport {
        self.save = SaveFile::at_spawn(&self.spawn);
        self.pending_save = None;
        let persisted = match self.gateway.save(&self.identifier, &self.save) {
            Ok(()) => true,
            Err(e) => {
                log::error!("new game: save('{}') failed: {e}", self.identifier);
                false
            }
        };
        let pass = self.restore_pass();
        log::info!("new game started (persisted={persisted})");
        NewGameReport { persisted, pass }
    }

    /// Read the save and distribute it. A missing or corrupt save leaves an
    /// empty SaveFile in place. Only an essential participant's failed
    /// restore is returned as an error.
    pub fn load_game(&mut self) -> GameResult<LoadReport> {
        self.pending_save = None;
        let outcome = match self.gateway.load(&self.identifier) {
            Ok(save) => {
                self.save = save;
                LoadOutcome::Loaded
            }
            Err(e) => {
                if e.is_recoverable_load() {
                    log::warn!("no game data loaded: {e}");
                } else {
                    log::warn!("load('{}') failed, starting fresh: {e}", self.identifier);
                }
                self.save = SaveFile::at_spawn(&self.spawn);
                LoadOutcome::Fresh
            }
        };

        let mut essential_failure = None;
        let pass = self.restore_pass_with(|name, error| {
            if essential_failure.is_none() {
                essential_failure = Some(GameError::ParticipantFailure {
                    participant: name.to_string(),
                    operation:   "restore",
                    reason:      error.to_string(),
                });
            }
        });
        if let Some(error) = essential_failure {
            log::error!("essential restore failed: {error}");
            return Err(error);
        }

        log::info!(
            "game loaded ({outcome:?}): cycle={} completed={} clues={} contacts={}",
            self.save.current_cycle.id,
            self.save.completed_cycles.len(),
            self.save.collected_clues.len(),
            self.save.collected_contacts.len(),
        );
        Ok(LoadReport { outcome, pass })
    }

    fn restore_pass(&mut self) -> PassReport {
        self.restore_pass_with(|name, error| {
            log::error!("essential participant '{name}' failed to restore: {error}");
        })
    }

    fn restore_pass_with(&mut self, mut on_essential: impl FnMut(&str, &GameError)) -> PassReport {
        let mut report = PassReport::default();
        for participant in self.registry.iter_mut() {
            let name = participant.name();
            let essential = participant.is_essential();
            let Some(save_aware) = participant.as_save_aware() else { continue };
            report.visited += 1;
            match save_aware.restore(&self.save) {
                Ok(()) => log::debug!("save data applied: {name}"),
                Err(e) => {
                    if essential {
                        on_essential(name, &e);
                    }
                    report.fail(name, "restore", &e);
                }
            }
        }
        report
    }

    // ── Save ───────────────────────────────────────────────────

    /// Queue a save for the next `poll_save`. Rejected while one is pending
    /// or when stamped for another cycle.
    pub fn request_save(&mut self, request: SaveRequest) -> GameResult<()> {
        self.admit_save(&request)?;
        self.pending_save = Some(request);
        Ok(())
    }

    /// Run the pending save, if any, and report its completion.
    pub fn poll_save(&mut self) -> Option<SaveReport> {
        let request = self.pending_save.take()?;
        Some(self.run_save(request))
    }

    /// Save immediately. Same admission rules as `request_save`.
    pub fn save_game(&mut self, request: SaveRequest) -> GameResult<SaveReport> {
        self.admit_save(&request)?;
        Ok(self.run_save(request))
    }

    fn admit_save(&self, request: &SaveRequest) -> GameResult<()> {
        if self.pending_save.is_some() {
            log::warn!("save requested while another is in flight; rejected");
            return Err(GameError::SaveInFlight);
        }
        let current = self.save.current_cycle.id;
        if request.stamp.cycle_id != current {
            log::warn!("save stamped for cycle {} rejected; current cycle is {current}", request.stamp.cycle_id);
            return Err(GameError::StaleStamp { stamped: request.stamp.cycle_id, current });
        }
        Ok(())
    }

    fn run_save(&mut self, request: SaveRequest) -> SaveReport {
        let cycle = &mut self.save.current_cycle;
        cycle.elapsed_secs = request.stamp.elapsed_secs;
        cycle.ended_manually = request.ended_manually;
        let cycle_id = cycle.id;

        // Each participant gathers into a scratch copy that is committed
        // only if the whole gather succeeds.
        let mut pass = PassReport::default();
        for participant in self.registry.iter_mut() {
            let name = participant.name();
            let Some(save_aware) = participant.as_save_aware() else { continue };
            pass.visited += 1;
            let mut scratch = self.save.clone();
            match save_aware.gather(&mut scratch) {
                Ok(()) => {
                    self.save = scratch;
                    log::debug!("game data gathered: {name}");
                }
                Err(e) => pass.fail(name, "gather", &e),
            }
        }

        let new_cycle = request.archive.then(|| self.save.archive_current_cycle());

        let persisted = match self.gateway.save(&self.identifier, &self.save) {
            Ok(()) => true,
            Err(e) => {
                log::error!("save('{}') failed during write: {e}", self.identifier);
                false
            }
        };

        log::info!(
            "save complete: cycle={cycle_id} archived={} persisted={persisted} failures={}",
            new_cycle.is_some(),
            pass.failures.len()
        );
        SaveReport { cycle_id, new_cycle, pass, persisted }
    }

    // ── Reset / pause / update ─────────────────────────────────

    pub fn reset_all(&mut self) -> PassReport {
        let mut report = PassReport::default();
        for participant in self.registry.iter_mut() {
            let name = participant.name();
            let Some(resettable) = participant.as_resettable() else { continue };
            report.visited += 1;
            if let Err(e) = resettable.reset(&self.save) {
                report.fail(name, "reset", &e);
            }
        }
        report
    }

    pub fn set_paused_all(&mut self, paused: bool) {
        for participant in self.registry.iter_mut() {
            if let Some(pausable) = participant.as_pausable() {
                pausable.set_paused(paused);
            }
        }
    }

    /// Advance participant timers and the hint stack by one tick.
    pub fn update(&mut self, dt: f32) {
        for participant in self.registry.iter_mut() {
            participant.update(dt);
        }
        self.hints.tick(dt);
    }

    // ── Unlocks ────────────────────────────────────────────────

    pub fn unlock_clue(&mut self, id: ClueId, stamp: CycleStamp) -> GameResult<UnlockOutcome> {
        let label_key = self
            .catalog
            .clue(id)
            .map(|c| c.title_key.clone())
            .ok_or(GameError::UnknownClue { id })?;
        if !self.save.record_clue(id, stamp) {
            return Ok(UnlockOutcome::AlreadyCollected);
        }
        Ok(self.announce(Unlocked::Clue(id), label_key))
    }

    pub fn unlock_contact(&mut self, id: ContactId, stamp: CycleStamp) -> GameResult<UnlockOutcome> {
        let label_key = self
            .catalog
            .contact(id)
            .map(|c| c.name_key.clone())
            .ok_or(GameError::UnknownContact { id })?;
        if !self.save.record_contact(id, stamp) {
            return Ok(UnlockOutcome::AlreadyCollected);
        }
        Ok(self.announce(Unlocked::Contact(id), label_key))
    }

    /// Unlock the first catalog clue not collected yet. Dev tooling.
    pub fn quick_unlock_clue(&mut self, stamp: CycleStamp) -> GameResult<Option<ClueId>> {
        let next = self
            .catalog
            .clues
            .iter()
            .map(|c| c.id)
            .find(|id| !self.save.has_clue(*id));
        match next {
            Some(id) => self.unlock_clue(id, stamp).map(|_| Some(id)),
            None => Ok(None),
        }
    }

    /// Unlock the first catalog contact not known yet. Dev tooling.
    pub fn quick_unlock_contact(&mut self, stamp: CycleStamp) -> GameResult<Option<ContactId>> {
        let next = self
            .catalog
            .contacts
            .iter()
            .map(|c| c.id)
            .find(|id| !self.save.has_contact(*id));
        match next {
            Some(id) => self.unlock_contact(id, stamp).map(|_| Some(id)),
            None => Ok(None),
        }
    }

    fn announce(&mut self, item: Unlocked, label_key: String) -> UnlockOutcome {
        let mut materialized = false;
        for participant in self.registry.iter_mut() {
            let name = participant.name();
            let Some(observer) = participant.as_unlock_observer() else { continue };
            match observer.on_unlocked(item, &self.save) {
                Ok(shown) => materialized |= shown,
                Err(e) => log::warn!("'{name}' could not show {item:?}: {e}"),
            }
        }

        if materialized {
            self.hints.push(item, Some(label_key));
            log::info!("unlocked {item:?}");
        } else {
            log::warn!("unlocked {item:?} with no active observer; visual and hint skipped");
        }
        UnlockOutcome::Unlocked { materialized }
    }
}
