//! Cycle events: what the controller reports back to the session each tick.
//!
//! RULE: the controller never calls into the UI. Everything a caller needs
//! to react to (fades, the saving indicator, the new cycle id) is reported
//! here or readable from the controller afterwards.

use crate::{controller::CyclePhase, types::CycleId};
use serde::{Deserialize, Serialize};

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleEvent {
    // ── Transition into the end of a cycle ─────────
    CycleEnding {
        cycle_id: CycleId,
        manual: bool,
        elapsed_secs: f32,
    },
    FadeOutCompleted {
        cycle_id: CycleId,
    },

    // ── Save ───────────────────────────────────────
    SaveStarted {
        cycle_id: CycleId,
        /// Whether the saving indicator is shown (timeouts only).
        indicator: bool,
    },
    SaveCompleted {
        cycle_id: CycleId,
        persisted: bool,
        failures: usize,
    },

    // ── Back to running ────────────────────────────
    CycleReset {
        new_cycle_id: CycleId,
        failures: usize,
    },
    CycleResumed {
        cycle_id: CycleId,
    },

    // ── Rejections ─────────────────────────────────
    ManualEndRejected {
        phase: CyclePhase,
    },
}
