//! The game session: one play session, wired end to end.
//!
//! The session owns the coordinator, the cycle controller and the HUD,
//! and holds handles to the standard participants it registered. Every
//! component that needs the coordinator gets it from here, by reference.
//!
//! TICK ORDER (fixed):
//!   1. Cycle controller (clock, fades, transition steps)
//!   2. Participant updates and the unlock hint stack
//!   3. Player movement lock follows the HUD

use crate::{
    bomb_participant::BombParticipant,
    clue_wall_participant::ClueWallParticipant,
    command::PlayerCommand,
    config::GameConfig,
    controller::{CycleController, CyclePhase},
    coordinator::{LoadReport, NewGameReport, SaveCoordinator, SaveReport, SaveRequest, UnlockOutcome},
    error::{GameError, GameResult},
    event::CycleEvent,
    hints::{UnlockHint, UnlockHintStack},
    hud::{Hud, HudEffect, HudInput, InteractTarget},
    participant::{Participant, ParticipantHandle},
    phone_participant::{CannedResponder, ChatResponder, PhoneParticipant, ThreadPreview},
    player_participant::{PlayerIntent, PlayerParticipant},
    save_data::CycleStamp,
    selection::SelectedEntity,
    settings::GameSettings,
    snapshot::SaveSnapshot,
    store::{SaveGateway, SqliteSaveStore},
    types::{ClueId, ContactId, CycleId, PartId, Quat, SessionId, Vec3},
};
use serde::{Deserialize, Serialize};

/// Handles of the participants every session registers.
#[derive(Debug, Clone, Copy)]
pub struct StandardHandles {
    pub player:    ParticipantHandle,
    pub bomb:      ParticipantHandle,
    pub phone:     ParticipantHandle,
    pub clue_wall: ParticipantHandle,
}

pub struct GameSession<G: SaveGateway> {
    pub session_id: SessionId,
    config:         GameConfig,
    coordinator:    SaveCoordinator<G>,
    controller:     CycleController,
    hud:            Hud,
    handles:        StandardHandles,
}

pub fn new_session_id() -> SessionId {
    format!("session-{}", uuid::Uuid::new_v4())
}

impl<G: SaveGateway> GameSession<G> {
    /// Build a fully wired session with the standard participants
    /// registered and the canned chat responder.
    pub fn build(session_id: SessionId, config: GameConfig, gateway: G) -> Self {
        let responder = Box::new(CannedResponder::new(config.reply_text.clone()));
        Self::build_with_responder(session_id, config, gateway, responder)
    }

    pub fn build_with_responder(
        session_id: SessionId,
        config: GameConfig,
        gateway: G,
        responder: Box<dyn ChatResponder>,
    ) -> Self {
        let hints = UnlockHintStack::new(config.hint_display_secs, config.hint_leave_secs);
        let mut coordinator =
            SaveCoordinator::new(config.save_identifier.clone(), gateway, config.catalog.clone(), hints)
                .with_spawn_pose(config.spawn_pose.clone());

        let handles = StandardHandles {
            player:    coordinator.register(Box::new(PlayerParticipant::new(config.spawn_pose.clone()))),
            bomb:      coordinator.register(Box::new(BombParticipant::new(config.bomb_parts.clone()))),
            phone:     coordinator.register(Box::new(PhoneParticipant::new(config.reply_delay_secs, responder))),
            clue_wall: coordinator.register(Box::new(ClueWallParticipant::new(config.catalog.clone()))),
        };

        let controller = CycleController::new(&config);
        log::info!("session {session_id} built ({} participants)", coordinator.registry().len());
        Self { session_id, config, coordinator, controller, hud: Hud::default(), handles }
    }

    // ── Read-only views ────────────────────────────────────────

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &SaveCoordinator<G> {
        &self.coordinator
    }

    /// For registering extra participants.
    pub fn coordinator_mut(&mut self) -> &mut SaveCoordinator<G> {
        &mut self.coordinator
    }

    pub fn controller(&self) -> &CycleController {
        &self.controller
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn handles(&self) -> StandardHandles {
        self.handles
    }

    pub fn phase(&self) -> CyclePhase {
        self.controller.phase()
    }

    pub fn player(&self) -> Option<&PlayerParticipant> {
        self.coordinator.registry().get(self.handles.player)
    }

    pub fn bomb(&self) -> Option<&BombParticipant> {
        self.coordinator.registry().get(self.handles.bomb)
    }

    pub fn phone(&self) -> Option<&PhoneParticipant> {
        self.coordinator.registry().get(self.handles.phone)
    }

    pub fn clue_wall(&self) -> Option<&ClueWallParticipant> {
        self.coordinator.registry().get(self.handles.clue_wall)
    }

    fn participant_mut<T: Participant + 'static>(&mut self, handle: ParticipantHandle) -> GameResult<&mut T> {
        self.coordinator
            .registry_mut()
            .get_mut(handle)
            .ok_or_else(|| GameError::Other(anyhow::anyhow!("participant {handle:?} is not registered")))
    }

    // ── Command dispatch ───────────────────────────────────────

    /// Apply one command. Only time-related commands produce events.
    pub fn apply(&mut self, command: PlayerCommand) -> GameResult<Vec<CycleEvent>> {
        let mut events = Vec::new();
        match command {
            PlayerCommand::NewGame => {
                self.new_game();
            }
            PlayerCommand::LoadGame => {
                self.load_game()?;
            }
            PlayerCommand::SaveAndExit => {
                self.save_and_exit()?;
            }
            PlayerCommand::Tick { dt, count } => {
                for _ in 0..count {
                    events.extend(self.tick(dt));
                }
            }
            PlayerCommand::EndCycle => events.push(self.end_cycle()),
            PlayerCommand::Input { input } => self.input(input),
            PlayerCommand::Select { name, selected } => self.select(&name, selected),
            PlayerCommand::RemoveBombPart => {
                self.remove_bomb_part()?;
            }
            PlayerCommand::PlacePlayer { position, orientation } => {
                self.place_player(position, orientation)?;
            }
            PlayerCommand::SteerPlayer { intent } => {
                self.steer_player(intent)?;
            }
            PlayerCommand::UnlockClue { id } => {
                self.unlock_clue(id)?;
            }
            PlayerCommand::UnlockContact { id } => {
                self.unlock_contact(id)?;
            }
            PlayerCommand::QuickUnlockClue => {
                self.quick_unlock_clue()?;
            }
            PlayerCommand::QuickUnlockContact => {
                self.quick_unlock_contact()?;
            }
            PlayerCommand::OpenChat { contact_id } => self.open_chat(contact_id)?,
            PlayerCommand::CloseChat => self.close_chat()?,
            PlayerCommand::SendMessage { contact_id, text } => {
                self.send_message(contact_id, &text)?;
            }
        }
        Ok(events)
    }

    // ── Game lifecycle ─────────────────────────────────────────

    pub fn new_game(&mut self) -> NewGameReport {
        let report = self.coordinator.new_game();
        self.resync();
        report
    }

    /// An essential participant's failed restore is returned as an error;
    /// the session is still resynced to whatever the coordinator holds.
    pub fn load_game(&mut self) -> GameResult<LoadReport> {
        let result = self.coordinator.load_game();
        self.resync();
        result
    }

    fn resync(&mut self) {
        self.controller.sync_from(&self.coordinator);
        self.hud = Hud::default();
        self.coordinator.set_paused_all(false);
        self.sync_movement_lock();
    }

    /// Checkpoint the running cycle without ending it. Outside Running the
    /// end-of-cycle save owns the save file, so this is rejected with
    /// `SaveInFlight`.
    pub fn save_and_exit(&mut self) -> GameResult<SaveReport> {
        if !self.controller.is_running() {
            log::warn!("checkpoint rejected during {:?}", self.controller.phase());
            return Err(GameError::SaveInFlight);
        }
        self.coordinator.save_game(SaveRequest::checkpoint(self.controller.stamp()))
    }

    // ── Time ───────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32) -> Vec<CycleEvent> {
        let events = self.controller.tick(dt, &mut self.coordinator, &mut self.hud);
        self.coordinator.update(dt);
        self.sync_movement_lock();
        events
    }

    pub fn end_cycle(&mut self) -> CycleEvent {
        let event = self.controller.request_manual_end(&mut self.coordinator, &mut self.hud);
        self.sync_movement_lock();
        event
    }

    fn sync_movement_lock(&mut self) {
        let locked = self.hud.locks_movement();
        if let Ok(player) = self.participant_mut::<PlayerParticipant>(self.handles.player) {
            player.set_movement_locked(locked);
        }
    }

    // ── HUD and world ──────────────────────────────────────────

    /// Ignored outside Running.
    pub fn input(&mut self, input: HudInput) {
        if !self.controller.is_running() {
            log::debug!("input {input:?} ignored during {:?}", self.controller.phase());
            return;
        }
        match self.hud.handle(input) {
            HudEffect::None => {}
            HudEffect::PauseAll(paused) => self.coordinator.set_paused_all(paused),
            HudEffect::ToggleFastForward => {
                if self.config.dev_tools {
                    self.controller.toggle_fast_forward();
                } else {
                    log::debug!("fast-forward needs dev tools");
                }
            }
        }
        self.sync_movement_lock();
    }

    /// Selection report from the world-selection collaborator.
    pub fn select(&mut self, name: &str, selected: bool) {
        let Some(entity) = SelectedEntity::parse(name) else {
            log::debug!("selection of '{name}' ignored");
            return;
        };
        match entity {
            SelectedEntity::Clue(id) => self.target(InteractTarget::Clue(id), selected),
            SelectedEntity::Bomb => self.target(InteractTarget::Bomb, selected),
            SelectedEntity::BombPart(part) => {
                if !self.hud.bomb_open {
                    return;
                }
                if let Ok(bomb) = self.participant_mut::<BombParticipant>(self.handles.bomb) {
                    bomb.select_part(part, selected);
                }
            }
        }
    }

    fn target(&mut self, target: InteractTarget, selected: bool) {
        if selected {
            self.hud.set_target(Some(target));
        } else {
            self.hud.clear_target(target);
        }
    }

    /// Only while the bomb is being inspected.
    pub fn remove_bomb_part(&mut self) -> GameResult<Option<PartId>> {
        if !self.controller.is_running() || !self.hud.bomb_open {
            return Ok(None);
        }
        let handle = self.handles.bomb;
        Ok(self.participant_mut::<BombParticipant>(handle)?.remove_selected())
    }

    pub fn place_player(&mut self, position: Vec3, orientation: Quat) -> GameResult<()> {
        let handle = self.handles.player;
        self.participant_mut::<PlayerParticipant>(handle)?.place(position, orientation)
    }

    pub fn steer_player(&mut self, intent: PlayerIntent) -> GameResult<bool> {
        let handle = self.handles.player;
        Ok(self.participant_mut::<PlayerParticipant>(handle)?.steer(intent))
    }

    // ── Unlocks ────────────────────────────────────────────────

    /// Provenance for an unlock. Between the archive and the reset the
    /// clock still shows the ended cycle; the save file's current cycle wins.
    fn unlock_stamp(&self) -> CycleStamp {
        let current = &self.coordinator.save_file().current_cycle;
        if self.controller.cycle_id() == current.id {
            self.controller.stamp()
        } else {
            current.stamp()
        }
    }

    pub fn unlock_clue(&mut self, id: ClueId) -> GameResult<UnlockOutcome> {
        let stamp = self.unlock_stamp();
        self.coordinator.unlock_clue(id, stamp)
    }

    pub fn unlock_contact(&mut self, id: ContactId) -> GameResult<UnlockOutcome> {
        let stamp = self.unlock_stamp();
        self.coordinator.unlock_contact(id, stamp)
    }

    pub fn quick_unlock_clue(&mut self) -> GameResult<Option<ClueId>> {
        if !self.config.dev_tools {
            log::debug!("quick unlock needs dev tools");
            return Ok(None);
        }
        let stamp = self.unlock_stamp();
        self.coordinator.quick_unlock_clue(stamp)
    }

    pub fn quick_unlock_contact(&mut self) -> GameResult<Option<ContactId>> {
        if !self.config.dev_tools {
            log::debug!("quick unlock needs dev tools");
            return Ok(None);
        }
        let stamp = self.unlock_stamp();
        self.coordinator.quick_unlock_contact(stamp)
    }

    // ── Phone ──────────────────────────────────────────────────

    pub fn open_chat(&mut self, contact_id: ContactId) -> GameResult<()> {
        let handle = self.handles.phone;
        self.participant_mut::<PhoneParticipant>(handle)?.open(contact_id)
    }

    pub fn close_chat(&mut self) -> GameResult<()> {
        let handle = self.handles.phone;
        self.participant_mut::<PhoneParticipant>(handle)?.close();
        Ok(())
    }

    /// Dropped (returns false) outside Running: the phone closed with the cycle.
    pub fn send_message(&mut self, contact_id: ContactId, text: &str) -> GameResult<bool> {
        if !self.controller.is_running() {
            log::debug!("message to contact {contact_id} dropped during {:?}", self.controller.phase());
            return Ok(false);
        }
        let handle = self.handles.phone;
        self.participant_mut::<PhoneParticipant>(handle)?.send_message(contact_id, text)
    }

    // ── State export ───────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        let save = self.coordinator.save_file();
        let clock = self.controller.clock();
        SessionState {
            session_id:         self.session_id.clone(),
            phase:              self.controller.phase(),
            cycle_id:           clock.cycle_id,
            elapsed_secs:       clock.elapsed_secs,
            remaining_secs:     clock.remaining_secs(),
            time_scale:         clock.time_scale(),
            fade_alpha:         self.controller.fade().alpha(),
            saving_indicator:   self.controller.indicator().is_active(),
            save_in_flight:     self.coordinator.is_save_in_flight(),
            completed_cycles:   save.completed_cycles.len(),
            collected_clues:    save.collected_clues.iter().map(|c| c.id).collect(),
            collected_contacts: save.collected_contacts.iter().map(|c| c.id).collect(),
            live_parts:         self.bomb().map(|b| b.live_parts().collect()).unwrap_or_default(),
            removed_parts:      self.bomb().map(|b| b.removed_parts().collect()).unwrap_or_default(),
            threads:            self.phone().map(|p| p.previews()).unwrap_or_default(),
            open_chat:          self.phone().and_then(|p| p.open_chat()),
            wall_pins:          self
                .clue_wall()
                .map(|w| w.pins().map(|(_, pin)| pin.name.clone()).collect())
                .unwrap_or_default(),
            player_position:    self.player().map(|p| p.position()).unwrap_or_default(),
            hints:              self.coordinator.hints().visible().cloned().collect(),
            hud:                self.hud.clone(),
        }
    }
}

impl GameSession<SqliteSaveStore> {
    /// In-memory SQLite store and the small test config.
    pub fn build_test(session_id: impl Into<SessionId>) -> GameResult<Self> {
        let store = SqliteSaveStore::in_memory()?;
        store.migrate()?;
        Ok(Self::build(session_id.into(), GameConfig::default_test(), store))
    }

    pub fn settings(&self) -> GameResult<GameSettings> {
        GameSettings::load(self.coordinator.gateway())
    }

    pub fn save_settings(&self, settings: &GameSettings) -> GameResult<()> {
        settings.save(self.coordinator.gateway())
    }

    /// Recent saves of this session's slot, newest first.
    pub fn snapshots(&self) -> GameResult<Vec<SaveSnapshot>> {
        self.coordinator.gateway().snapshots(self.coordinator.identifier())
    }
}

/// Flat view of a session for the runner and for UI bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id:         SessionId,
    pub phase:              CyclePhase,
    pub cycle_id:           CycleId,
    pub elapsed_secs:       f32,
    pub remaining_secs:     f32,
    pub time_scale:         f32,
    pub fade_alpha:         f32,
    pub saving_indicator:   bool,
    pub save_in_flight:     bool,
    pub completed_cycles:   usize,
    pub collected_clues:    Vec<ClueId>,
    pub collected_contacts: Vec<ContactId>,
    pub live_parts:         Vec<PartId>,
    pub removed_parts:      Vec<PartId>,
    pub threads:            Vec<ThreadPreview>,
    pub open_chat:          Option<ContactId>,
    pub wall_pins:          Vec<String>,
    pub player_position:    Vec3,
    pub hints:              Vec<UnlockHint>,
    pub hud:                Hud,
}
