use crate::{
    hud::HudInput,
    player_participant::PlayerIntent,
    types::{ClueId, ContactId, Quat, Vec3},
};
use serde::{Deserialize, Serialize};

/// All player-issued commands a session understands.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Game lifecycle ────────────────────────────
    NewGame,
    LoadGame,
    SaveAndExit,

    // ── Time ──────────────────────────────────────
    Tick {
        dt: f32,
        #[serde(default = "one")]
        count: u32,
    },
    EndCycle,

    // ── HUD and world ─────────────────────────────
    Input {
        input: HudInput,
    },
    Select {
        name:     String,
        selected: bool,
    },
    RemoveBombPart,
    PlacePlayer {
        position:    Vec3,
        orientation: Quat,
    },
    SteerPlayer {
        intent: PlayerIntent,
    },

    // ── Unlocks ───────────────────────────────────
    UnlockClue {
        id: ClueId,
    },
    UnlockContact {
        id: ContactId,
    },
    QuickUnlockClue,
    QuickUnlockContact,

    // ── Phone ─────────────────────────────────────
    OpenChat {
        contact_id: ContactId,
    },
    CloseChat,
    SendMessage {
        contact_id: ContactId,
        text:       String,
    },
}

fn one() -> u32 {
    1
}
