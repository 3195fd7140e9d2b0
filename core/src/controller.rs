//! The cycle controller: owns the current cycle's clock and drives the
//! end-of-cycle transition.
//!
//! STATE MACHINE (one step per tick at most):
//!   Running   → Ending     timeout (elapsed > length) or manual end
//!   Ending    → Saving     fade to black finished; save requested
//!   Saving    → Resetting  coordinator reports the save complete
//!   Resetting → Running    participants reset, fade back, world resumed
//!
//! RULES:
//!   - Once past Running the transition runs to completion. There is no
//!     path back to Running mid-transition.
//!   - A manual end outside Running is rejected, never queued.
//!   - The clock only accrues while Running.

use crate::{
    clock::CycleClock,
    config::GameConfig,
    coordinator::{SaveCoordinator, SaveRequest},
    event::CycleEvent,
    hud::Hud,
    save_data::CycleStamp,
    store::SaveGateway,
    transition::{BlinkIndicator, ScreenFade},
    types::CycleId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Running,
    Ending,
    Saving,
    Resetting,
}

pub struct CycleController {
    phase:         CyclePhase,
    clock:         CycleClock,
    fade:          ScreenFade,
    indicator:     BlinkIndicator,
    fade_secs:     f32,
    blink_secs:    f32,
    fade_reported: bool,
}

impl CycleController {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            phase: CyclePhase::Running,
            clock: CycleClock::new(config.cycle_length_secs, config.fast_forward_scale),
            fade: ScreenFade::default(),
            indicator: BlinkIndicator::new(config.indicator_blink_secs),
            fade_secs: config.fade_secs,
            blink_secs: config.indicator_blink_secs,
            fade_reported: false,
        }
    }

    // ── Read-only views ────────────────────────────────────────

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == CyclePhase::Running
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    pub fn fade(&self) -> &ScreenFade {
        &self.fade
    }

    pub fn indicator(&self) -> &BlinkIndicator {
        &self.indicator
    }

    pub fn cycle_id(&self) -> CycleId {
        self.clock.cycle_id
    }

    /// Provenance stamp for anything recorded right now.
    pub fn stamp(&self) -> CycleStamp {
        self.clock.stamp()
    }

    /// Dev tools only; the caller checks the flag.
    pub fn toggle_fast_forward(&mut self) {
        let speed = self.clock.toggle_fast_forward();
        log::info!("cycle clock speed: {speed:?}");
    }

    /// Adopt the coordinator's current cycle after a new game or load.
    /// Any transition in progress is abandoned.
    pub fn sync_from<G: SaveGateway>(&mut self, coordinator: &SaveCoordinator<G>) {
        self.clock.resume_from(&coordinator.save_file().current_cycle);
        self.phase = CyclePhase::Running;
        self.fade = ScreenFade::default();
        self.indicator = BlinkIndicator::new(self.blink_secs);
        self.fade_reported = false;
        log::debug!(
            "cycle controller synced: cycle={} elapsed={:.2}",
            self.clock.cycle_id,
            self.clock.elapsed_secs
        );
    }

    // ── Manual end ─────────────────────────────────────────────

    pub fn request_manual_end<G: SaveGateway>(
        &mut self,
        coordinator: &mut SaveCoordinator<G>,
        hud: &mut Hud,
    ) -> CycleEvent {
        if self.phase != CyclePhase::Running {
            log::info!("manual cycle end ignored during {:?}", self.phase);
            return CycleEvent::ManualEndRejected { phase: self.phase };
        }
        self.begin_end(true, coordinator, hud)
    }

    fn begin_end<G: SaveGateway>(
        &mut self,
        manual: bool,
        coordinator: &mut SaveCoordinator<G>,
        hud: &mut Hud,
    ) -> CycleEvent {
        self.phase = CyclePhase::Ending;
        self.clock.ended_manually = manual;
        self.fade_reported = false;
        hud.close_all_modals();
        coordinator.set_paused_all(true);
        self.fade.start(0.0, 1.0, self.fade_secs);
        log::info!(
            "cycle {} ending (manual={manual}, elapsed={:.2})",
            self.clock.cycle_id,
            self.clock.elapsed_secs
        );
        CycleEvent::CycleEnding {
            cycle_id: self.clock.cycle_id,
            manual,
            elapsed_secs: self.clock.elapsed_secs,
        }
    }

    // ── Tick ───────────────────────────────────────────────────

    pub fn tick<G: SaveGateway>(
        &mut self,
        dt: f32,
        coordinator: &mut SaveCoordinator<G>,
        hud: &mut Hud,
    ) -> Vec<CycleEvent> {
        let mut events = Vec::new();
        self.fade.tick(dt);
        self.indicator.tick(dt);

        match self.phase {
            CyclePhase::Running => {
                self.clock.advance(dt, hud.freezes_clock());
                if self.clock.timed_out() {
                    events.push(self.begin_end(false, coordinator, hud));
                }
            }
            CyclePhase::Ending => {
                if self.fade.is_done() {
                    self.start_save(coordinator, &mut events);
                }
            }
            CyclePhase::Saving => {
                if let Some(report) = coordinator.poll_save() {
                    self.indicator.stop();
                    events.push(CycleEvent::SaveCompleted {
                        cycle_id:  report.cycle_id,
                        persisted: report.persisted,
                        failures:  report.pass.failures.len(),
                    });
                    self.phase = CyclePhase::Resetting;
                }
            }
            CyclePhase::Resetting => {
                let pass = coordinator.reset_all();
                let new_cycle_id = coordinator.save_file().current_cycle.id;
                self.clock.start_cycle(new_cycle_id);
                self.fade.start(1.0, 0.0, self.fade_secs);
                hud.enable_selection();
                coordinator.set_paused_all(false);
                self.phase = CyclePhase::Running;
                log::info!("cycle {new_cycle_id} started ({} reset failures)", pass.failures.len());
                events.push(CycleEvent::CycleReset { new_cycle_id, failures: pass.failures.len() });
                events.push(CycleEvent::CycleResumed { cycle_id: new_cycle_id });
            }
        }
        events
    }

    fn start_save<G: SaveGateway>(
        &mut self,
        coordinator: &mut SaveCoordinator<G>,
        events: &mut Vec<CycleEvent>,
    ) {
        let cycle_id = self.clock.cycle_id;
        let manual = self.clock.ended_manually;
        if !self.fade_reported {
            self.fade_reported = true;
            events.push(CycleEvent::FadeOutCompleted { cycle_id });
        }
        match coordinator.request_save(SaveRequest::end_of_cycle(self.clock.stamp(), manual)) {
            Ok(()) => {
                let indicator = !manual;
                if indicator {
                    self.indicator.start();
                }
                self.phase = CyclePhase::Saving;
                events.push(CycleEvent::SaveStarted { cycle_id, indicator });
            }
            // Rejected by the coordinator; retry on the next tick.
            Err(e) => log::warn!("end-of-cycle save deferred: {e}"),
        }
    }
}
