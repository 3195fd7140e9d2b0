//! Unlock hint stack: the "new clue / new contact" toasts.
//!
//! Hints are queued in unlock order. Each one is shown for a fixed time,
//! then plays a leave animation, then is dropped from the front.

use crate::participant::Unlocked;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintStage {
    Showing,
    Leaving,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockHint {
    pub item:      Unlocked,
    /// Localisation key of the description line, when the catalog has one.
    pub label_key: Option<String>,
    pub age_secs:  f32,
    pub stage:     HintStage,
}

#[derive(Debug, Clone)]
pub struct UnlockHintStack {
    display_secs: f32,
    leave_secs:   f32,
    queue:        VecDeque<UnlockHint>,
}

impl UnlockHintStack {
    pub fn new(display_secs: f32, leave_secs: f32) -> Self {
        Self { display_secs, leave_secs, queue: VecDeque::new() }
    }

    pub fn push(&mut self, item: Unlocked, label_key: Option<String>) {
        self.queue.push_back(UnlockHint {
            item,
            label_key,
            age_secs: 0.0,
            stage: HintStage::Showing,
        });
    }

    /// Age every hint; returns how many finished and were dropped.
    pub fn tick(&mut self, dt: f32) -> usize {
        let lifetime = self.display_secs + self.leave_secs;
        for hint in self.queue.iter_mut() {
            hint.age_secs += dt;
            if hint.age_secs >= self.display_secs {
                hint.stage = HintStage::Leaving;
            }
        }
        let mut dropped = 0;
        while self.queue.front().is_some_and(|h| h.age_secs >= lifetime) {
            self.queue.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn visible(&self) -> impl Iterator<Item = &UnlockHint> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
