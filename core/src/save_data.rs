//! The save data model: one full game save.
//!
//! RULE: the SaveCoordinator is the only owner of a live SaveFile.
//! Participants see it as `&SaveFile` during restore/reset, or as a
//! `&mut SaveFile` for the duration of a single gather call.
//!
//! Collected clues and contacts keep unlock order and hold at most one
//! record per id. Removed parts only ever go from false to true.

use crate::{
    config::SpawnPose,
    types::{ClueId, ContactId, CycleId, PartId, Quat, Vec3},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The moment something happened, in cycle terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleStamp {
    pub cycle_id:     CycleId,
    pub elapsed_secs: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub player_position:    Vec3,
    pub player_orientation: Quat,
    /// Append-only; appended at cycle end only.
    pub completed_cycles:   Vec<Cycle>,
    pub current_cycle:      Cycle,
    pub collected_clues:    Vec<ClueRecord>,
    pub collected_contacts: Vec<ContactRecord>,
}

impl SaveFile {
    /// An empty save with the player standing at `spawn`.
    pub fn at_spawn(spawn: &SpawnPose) -> Self {
        Self {
            player_position: spawn.position,
            player_orientation: spawn.orientation,
            ..Self::default()
        }
    }

    pub fn has_clue(&self, id: ClueId) -> bool {
        self.collected_clues.iter().any(|c| c.id == id)
    }

    pub fn has_contact(&self, id: ContactId) -> bool {
        self.collected_contacts.iter().any(|c| c.id == id)
    }

    pub fn clue(&self, id: ClueId) -> Option<&ClueRecord> {
        self.collected_clues.iter().find(|c| c.id == id)
    }

    pub fn contact(&self, id: ContactId) -> Option<&ContactRecord> {
        self.collected_contacts.iter().find(|c| c.id == id)
    }

    /// Record a clue. Returns false (and changes nothing) if the id is
    /// already collected, so the first provenance always wins.
    pub fn record_clue(&mut self, id: ClueId, stamp: CycleStamp) -> bool {
        if self.has_clue(id) {
            return false;
        }
        self.collected_clues.push(ClueRecord {
            id,
            cycle_id:      stamp.cycle_id,
            cycle_elapsed: stamp.elapsed_secs,
        });
        true
    }

    /// Same contract as `record_clue`.
    pub fn record_contact(&mut self, id: ContactId, stamp: CycleStamp) -> bool {
        if self.has_contact(id) {
            return false;
        }
        self.collected_contacts.push(ContactRecord {
            id,
            cycle_id:      stamp.cycle_id,
            cycle_elapsed: stamp.elapsed_secs,
        });
        true
    }

    /// Move the current cycle into `completed_cycles` and install a fresh
    /// one with the next id. Returns the new cycle id.
    pub fn archive_current_cycle(&mut self) -> CycleId {
        let next_id = self.current_cycle.id + 1;
        let ended = std::mem::replace(&mut self.current_cycle, Cycle::new(next_id));
        self.completed_cycles.push(ended);
        next_id
    }

    /// The highest id ever used, archived or current.
    pub fn latest_cycle_id(&self) -> CycleId {
        self.completed_cycles
            .iter()
            .map(|c| c.id)
            .chain(std::iter::once(self.current_cycle.id))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    /// Seconds elapsed in this cycle; frozen once the cycle ends.
    pub elapsed_secs:   f32,
    pub id:             CycleId,
    /// Player ended the cycle (as opposed to the timeout).
    pub ended_manually: bool,
    /// At most one thread per contact.
    pub messages:       Vec<Message>,
    /// part id -> removed. Unknown ids read as not removed.
    pub part_state:     BTreeMap<PartId, bool>,
}

impl Cycle {
    pub fn new(id: CycleId) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn stamp(&self) -> CycleStamp {
        CycleStamp { cycle_id: self.id, elapsed_secs: self.elapsed_secs }
    }

    pub fn is_part_removed(&self, part: PartId) -> bool {
        self.part_state.get(&part).copied().unwrap_or(false)
    }

    /// Returns true if the part was newly removed.
    pub fn mark_part_removed(&mut self, part: PartId) -> bool {
        let removed = self.part_state.entry(part).or_insert(false);
        if *removed {
            return false;
        }
        *removed = true;
        true
    }

    pub fn removed_parts(&self) -> impl Iterator<Item = PartId> + '_ {
        self.part_state.iter().filter(|(_, removed)| **removed).map(|(id, _)| *id)
    }

    pub fn thread(&self, contact_id: ContactId) -> Option<&Message> {
        self.messages.iter().find(|m| m.contact_id == contact_id)
    }

    /// Get the thread for a contact, creating an empty one if needed.
    pub fn ensure_thread(&mut self, contact_id: ContactId) -> &mut Message {
        let index = match self.messages.iter().position(|m| m.contact_id == contact_id) {
            Some(index) => index,
            None => {
                self.messages.push(Message::new(contact_id));
                self.messages.len() - 1
            }
        };
        &mut self.messages[index]
    }

    /// A cycle nothing has happened in yet.
    pub fn is_fresh(&self) -> bool {
        self.elapsed_secs == 0.0
            && !self.ended_manually
            && self.messages.is_empty()
            && self.removed_parts().next().is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub contact_id: ContactId,
    /// Append-only.
    pub texts:      Vec<MessageText>,
}

impl Message {
    pub fn new(contact_id: ContactId) -> Self {
        Self { contact_id, texts: Vec::new() }
    }

    pub fn push(&mut self, text: impl Into<String>, is_received: bool) {
        self.texts.push(MessageText { text: text.into(), is_received });
    }

    /// Text shown in the thread list.
    pub fn preview(&self) -> &str {
        self.texts.last().map(|t| t.text.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageText {
    pub text:        String,
    /// false = written by the player, true = written by the contact.
    pub is_received: bool,
}

/// Provenance of a collected clue. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClueRecord {
    pub id:            ClueId,
    pub cycle_id:      CycleId,
    pub cycle_elapsed: f32,
}

/// Provenance of a known contact. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id:            ContactId,
    pub cycle_id:      CycleId,
    pub cycle_elapsed: f32,
}
