//! Bomb participant: the destructible bomb in the current cycle.
//!
//! Removal is one-directional within a cycle. A fresh cycle brings a fresh
//! bomb with every part back in place.

use crate::{
    error::GameResult,
    participant::{Participant, Resettable, SaveAware},
    save_data::SaveFile,
    types::PartId,
};
use std::{any::Any, collections::BTreeSet};

pub struct BombParticipant {
    parts:    Vec<PartId>,
    live:     BTreeSet<PartId>,
    /// Removed this cycle. May hold ids this bomb never had (restored
    /// from a save written by different content); they are kept as-is.
    removed:  BTreeSet<PartId>,
    selected: Option<PartId>,
}

impl BombParticipant {
    pub fn new(parts: Vec<PartId>) -> Self {
        let live = parts.iter().copied().collect();
        Self { parts, live, removed: BTreeSet::new(), selected: None }
    }

    pub fn live_parts(&self) -> impl Iterator<Item = PartId> + '_ {
        self.live.iter().copied()
    }

    pub fn is_live(&self, part: PartId) -> bool {
        self.live.contains(&part)
    }

    pub fn removed_parts(&self) -> impl Iterator<Item = PartId> + '_ {
        self.removed.iter().copied()
    }

    pub fn selected(&self) -> Option<PartId> {
        self.selected
    }

    /// Selection report for a `Bomb{id}` name.
    pub fn select_part(&mut self, part: PartId, selected: bool) {
        if selected {
            if self.live.contains(&part) {
                self.selected = Some(part);
            }
        } else if self.selected == Some(part) {
            self.selected = None;
        }
    }

    /// Remove the selected part. Returns the removed id, or `None` if
    /// nothing live was selected.
    pub fn remove_selected(&mut self) -> Option<PartId> {
        let part = self.selected.take()?;
        if !self.live.remove(&part) {
            return None;
        }
        self.removed.insert(part);
        log::info!("bomb part {part} removed ({} left)", self.live.len());
        Some(part)
    }

    fn rebuild(&mut self, removed: BTreeSet<PartId>) {
        self.live = self.parts.iter().copied().filter(|p| !removed.contains(p)).collect();
        self.removed = removed;
        self.selected = None;
    }
}

impl SaveAware for BombParticipant {
    fn gather(&mut self, save: &mut SaveFile) -> GameResult<()> {
        for part in &self.removed {
            save.current_cycle.mark_part_removed(*part);
        }
        Ok(())
    }

    fn restore(&mut self, save: &SaveFile) -> GameResult<()> {
        self.rebuild(save.current_cycle.removed_parts().collect());
        Ok(())
    }
}

impl Resettable for BombParticipant {
    fn reset(&mut self, _save: &SaveFile) -> GameResult<()> {
        self.rebuild(BTreeSet::new());
        Ok(())
    }
}

impl Participant for BombParticipant {
    fn name(&self) -> &'static str {
        "bomb"
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
