//! Clue wall participant: one pin per collected clue.
//!
//! Pins carry the selection name of their clue, so selecting a pin maps
//! straight back to the clue id. Clues persist across cycles; the wall is
//! never reset.

use crate::{
    config::Catalog,
    error::{GameError, GameResult},
    participant::{Participant, SaveAware, UnlockObserver, Unlocked},
    save_data::SaveFile,
    selection::SelectedEntity,
    types::ClueId,
};
use serde::{Deserialize, Serialize};
use std::{any::Any, collections::BTreeMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallPin {
    pub name:     String,
    /// (y, z) on the wall plane.
    pub position: (f32, f32),
}

pub struct ClueWallParticipant {
    catalog: Catalog,
    pins:    BTreeMap<ClueId, WallPin>,
}

impl ClueWallParticipant {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, pins: BTreeMap::new() }
    }

    pub fn pins(&self) -> impl Iterator<Item = (ClueId, &WallPin)> + '_ {
        self.pins.iter().map(|(id, pin)| (*id, pin))
    }

    pub fn pin(&self, id: ClueId) -> Option<&WallPin> {
        self.pins.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Returns false if the pin was already on the wall.
    fn pin_clue(&mut self, id: ClueId) -> GameResult<bool> {
        if self.pins.contains_key(&id) {
            return Ok(false);
        }
        let def = self.catalog.clue(id).ok_or(GameError::UnknownClue { id })?;
        self.pins.insert(id, WallPin {
            name:     SelectedEntity::Clue(id).to_string(),
            position: def.wall_position,
        });
        Ok(true)
    }
}

impl SaveAware for ClueWallParticipant {
    // Collected clues are recorded by the coordinator at unlock time.
    fn gather(&mut self, _save: &mut SaveFile) -> GameResult<()> {
        Ok(())
    }

    /// Rebuilds the wall from scratch. Unknown clue ids are skipped and the
    /// first one is reported after every known pin is up.
    fn restore(&mut self, save: &SaveFile) -> GameResult<()> {
        self.pins.clear();
        let mut first_error = None;
        for record in &save.collected_clues {
            if let Err(e) = self.pin_clue(record.id) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl UnlockObserver for ClueWallParticipant {
    fn on_unlocked(&mut self, item: Unlocked, _save: &SaveFile) -> GameResult<bool> {
        match item {
            Unlocked::Clue(id) => {
                self.pin_clue(id)?;
                Ok(true)
            }
            Unlocked::Contact(_) => Ok(false),
        }
    }
}

impl Participant for ClueWallParticipant {
    fn name(&self) -> &'static str {
        "clue_wall"
    }

    fn as_save_aware(&mut self) -> Option<&mut dyn SaveAware> {
        Some(self)
    }

    fn as_unlock_observer(&mut self) -> Option<&mut dyn UnlockObserver> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
