//! Participant traits and registry.
//!
//! RULE: Every stateful gameplay object implements Participant and is
//! registered with the SaveCoordinator when created, deregistered when
//! destroyed. The coordinator only ever iterates its registry; there is
//! no scan of the world for objects of a given capability.
//!
//! Capabilities are opt-in. A participant exposes the ones it supports
//! through the `as_*` accessors and leaves the rest at `None`.

use crate::{
    error::GameResult,
    save_data::SaveFile,
    types::{ClueId, ContactId},
};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Contributes to / restores from the shared save file.
///
/// Participants must not depend on the order of other participants'
/// gather/restore calls.
pub trait SaveAware {
    /// Write this object's contribution. The reference must not be retained.
    fn gather(&mut self, save: &mut SaveFile) -> GameResult<()>;

    /// Rebuild local runtime state from a fully populated save file.
    /// Calling this twice with the same save must produce the same state.
    fn restore(&mut self, save: &SaveFile) -> GameResult<()>;
}

/// Returns to the fresh-cycle baseline after a cycle ends.
pub trait Resettable {
    /// `save` is read-only context (already archived and persisted).
    fn reset(&mut self, save: &SaveFile) -> GameResult<()>;
}

pub trait Pausable {
    /// While paused, input-driven mutation stops. Entering pause zeroes
    /// any in-flight directional or look state.
    fn set_paused(&mut self, paused: bool);
}

/// Something the player just unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Unlocked {
    Clue(ClueId),
    Contact(ContactId),
}

/// Materializes the visual side of an unlock (wall pin, message thread).
pub trait UnlockObserver {
    /// Returns true if this observer materialized the item.
    fn on_unlocked(&mut self, item: Unlocked, save: &SaveFile) -> GameResult<bool>;
}

/// The contract every registered participant must fulfill.
pub trait Participant {
    /// Stable name, used in logs and failure reports.
    fn name(&self) -> &'static str;

    fn as_save_aware(&mut self) -> Option<&mut dyn SaveAware> {
        None
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        None
    }

    fn as_pausable(&mut self) -> Option<&mut dyn Pausable> {
        None
    }

    fn as_unlock_observer(&mut self) -> Option<&mut dyn UnlockObserver> {
        None
    }

    /// Per-tick local logic (timers, delayed replies).
    fn update(&mut self, _dt: f32) {}

    /// A failed restore of an essential participant fails the whole load.
    fn is_essential(&self) -> bool {
        false
    }

    /// For typed access through the registry.
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Handle returned by `ParticipantRegistry::register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantHandle(u32);

#[derive(Default)]
pub struct ParticipantRegistry {
    next_handle: u32,
    entries:     Vec<(ParticipantHandle, Box<dyn Participant>)>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, participant: Box<dyn Participant>) -> ParticipantHandle {
        let handle = ParticipantHandle(self.next_handle);
        self.next_handle += 1;
        log::debug!("participant registered: {} ({handle:?})", participant.name());
        self.entries.push((handle, participant));
        handle
    }

    pub fn deregister(&mut self, handle: ParticipantHandle) -> Option<Box<dyn Participant>> {
        let index = self.entries.iter().position(|(h, _)| *h == handle)?;
        let (_, participant) = self.entries.remove(index);
        log::debug!("participant deregistered: {} ({handle:?})", participant.name());
        Some(participant)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: ParticipantHandle) -> bool {
        self.entries.iter().any(|(h, _)| *h == handle)
    }

    pub fn get<T: Participant + 'static>(&self, handle: ParticipantHandle) -> Option<&T> {
        self.entries
            .iter()
            .find(|(h, _)| *h == handle)
            .and_then(|(_, p)| p.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Participant + 'static>(&mut self, handle: ParticipantHandle) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .and_then(|(_, p)| p.as_any_mut().downcast_mut::<T>())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Participant>> + '_ {
        self.entries.iter_mut().map(|(_, p)| p)
    }
}
