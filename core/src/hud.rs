//! In-game HUD state: modal overlays, the interaction target, and whether
//! world selection is live.
//!
//! RULES:
//!   - Pause closes the topmost modal first: clue detail, then phone,
//!     then bomb inspection. Only with nothing open does it toggle the
//!     pause menu.
//!   - The pause menu freezes the cycle clock. The other modals only lock
//!     player movement; reading time still counts against the cycle.
//!   - The phone and the pause menu pause every Pausable participant.

use crate::types::ClueId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HudInput {
    Pause,
    Phone,
    Interact,
    /// Dev tools only.
    ToggleFastForward,
}

/// What the interaction hint currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum InteractTarget {
    Clue(ClueId),
    Bomb,
}

/// Side effect the session must apply after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HudEffect {
    None,
    /// Broadcast pause (true) or resume (false) to every Pausable.
    PauseAll(bool),
    ToggleFastForward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub clue_detail:       Option<ClueId>,
    pub phone_open:        bool,
    pub bomb_open:         bool,
    pub pause_menu_open:   bool,
    pub target:            Option<InteractTarget>,
    pub selection_enabled: bool,
}

impl Default for Hud {
    fn default() -> Self {
        Self {
            clue_detail: None,
            phone_open: false,
            bomb_open: false,
            pause_menu_open: false,
            target: None,
            selection_enabled: true,
        }
    }
}

impl Hud {
    pub fn handle(&mut self, input: HudInput) -> HudEffect {
        match input {
            HudInput::Pause => self.on_pause(),
            HudInput::Phone => self.on_phone(),
            HudInput::Interact => self.on_interact(),
            HudInput::ToggleFastForward => HudEffect::ToggleFastForward,
        }
    }

    fn on_pause(&mut self) -> HudEffect {
        if self.clue_detail.take().is_some() {
            return HudEffect::None;
        }
        if self.phone_open {
            self.phone_open = false;
            return HudEffect::PauseAll(false);
        }
        if self.bomb_open {
            self.bomb_open = false;
            self.selection_enabled = true;
            return HudEffect::None;
        }
        self.pause_menu_open = !self.pause_menu_open;
        HudEffect::PauseAll(self.pause_menu_open)
    }

    fn on_phone(&mut self) -> HudEffect {
        if self.pause_menu_open {
            return HudEffect::None;
        }
        self.phone_open = !self.phone_open;
        HudEffect::PauseAll(self.phone_open)
    }

    fn on_interact(&mut self) -> HudEffect {
        if self.pause_menu_open || self.phone_open || self.clue_detail.is_some() || self.bomb_open {
            return HudEffect::None;
        }
        match self.target {
            Some(InteractTarget::Clue(id)) => self.clue_detail = Some(id),
            Some(InteractTarget::Bomb) => {
                self.bomb_open = true;
                self.target = None;
                self.selection_enabled = false;
            }
            None => {}
        }
        HudEffect::None
    }

    /// Point the interaction hint at something, or clear it.
    pub fn set_target(&mut self, target: Option<InteractTarget>) {
        if self.selection_enabled || target.is_none() {
            self.target = target;
        }
    }

    /// Clear the hint only if it still points at `target`.
    pub fn clear_target(&mut self, target: InteractTarget) {
        if self.target == Some(target) {
            self.target = None;
        }
    }

    /// Hide every overlay and stop world selection for a cycle transition.
    pub fn close_all_modals(&mut self) {
        self.clue_detail = None;
        self.phone_open = false;
        self.bomb_open = false;
        self.pause_menu_open = false;
        self.target = None;
        self.selection_enabled = false;
    }

    pub fn enable_selection(&mut self) {
        self.selection_enabled = true;
    }

    pub fn freezes_clock(&self) -> bool {
        self.pause_menu_open
    }

    pub fn locks_movement(&self) -> bool {
        self.clue_detail.is_some() || self.bomb_open
    }

    pub fn any_modal_open(&self) -> bool {
        self.clue_detail.is_some() || self.phone_open || self.bomb_open || self.pause_menu_open
    }
}
