//! Player participant: pose plus movement and look intent.
//!
//! The pose is the minimum viable state of a save: a failed restore here
//! fails the whole load. Movement itself is an external collaborator; this
//! participant only holds what it is told and what must survive a cycle.

use crate::{
    config::SpawnPose,
    error::{GameError, GameResult},
    participant::{Participant, Pausable, Resettable, SaveAware},
    save_data::SaveFile,
    types::{Quat, Vec2, Vec3},
};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerIntent {
    pub movement: Vec2,
    pub look:     Vec2,
    pub sprint:   bool,
}

pub struct PlayerParticipant {
    spawn:           SpawnPose,
    position:        Vec3,
    orientation:     Quat,
    intent:          PlayerIntent,
    paused:          bool,
    movement_locked: bool,
}

impl PlayerParticipant {
    pub fn new(spawn: SpawnPose) -> Self {
        Self {
            position: spawn.position,
            orientation: spawn.orientation,
            spawn,
            intent: PlayerIntent::default(),
            paused: false,
            movement_locked: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn intent(&self) -> PlayerIntent {
        self.intent
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_movement_locked(&self) -> bool {
        self.movement_locked
    }

    /// Set from the HUD each tick: true while a reading modal is open.
    pub fn set_movement_locked(&mut self, locked: bool) {
        if locked && !self.movement_locked {
            self.intent.movement = Vec2::ZERO;
            self.intent.sprint = false;
        }
        self.movement_locked = locked;
    }

    /// Input from the movement collaborator. Dropped while paused; movement
    /// is also dropped while locked, look is not.
    pub fn steer(&mut self, intent: PlayerIntent) -> bool {
        if self.paused {
            return false;
        }
        self.intent.look = intent.look;
        if !self.movement_locked {
            self.intent.movement = intent.movement;
            self.intent.sprint = intent.sprint;
        }
        true
    }

    /// Where the movement collaborator put the player.
    pub fn place(&mut self, position: Vec3, orientation: Quat) -> GameResult<()> {
        let (position, orientation) = validate_pose(position, orientation)?;
        self.position = position;
        self.orientation = orientation;
        Ok(())
    }
}

fn validate_pose(position: Vec3, orientation: Quat) -> GameResult<(Vec3, Quat)> {
    if !position.is_finite() {
        return Err(GameError::InvalidPose { reason: format!("non-finite position {position:?}") });
    }
    let orientation = orientation.normalized().ok_or_else(|| GameError::InvalidPose {
        reason: format!("degenerate orientation {orientation:?}"),
    })?;
    Ok((position, orientation))
}

impl SaveAware for PlayerParticipant {
    fn gather(&mut self, save: &mut SaveFile) -> GameResult<()> {
        save.player_position = self.position;
        save.player_orientation = self.orientation;
        Ok(())
    }

    fn restore(&mut self, save: &SaveFile) -> GameResult<()> {
        let (position, orientation) = validate_pose(save.player_position, save.player_orientation)?;
        self.position = position;
        self.orientation = orientation;
        self.intent = PlayerIntent::default();
        Ok(())
    }
}

impl Resettable for PlayerParticipant {
    fn reset(&mut self, _save: &SaveFile) -> GameResult<()> {
        self.position = self.spawn.position;
        self.orientation = self.spawn.orientation;
        self.intent = PlayerIntent::default();
        Ok(())
    }
}

impl Pausable for PlayerParticipant {
    fn set_paused(&mut self, paused: bool) {
        if paused {
            self.intent = PlayerIntent::default();
        }
        self.paused = paused;
    }
}

impl Participant for PlayerParticipant {
    fn name(&self) -> &'static str {
        "player"
    }

    fn as_save_aware(&mut self) -> Option<&mut dyn SaveAware> {
        Some(self)
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_pausable(&mut self) -> Option<&mut dyn Pausable> {
        Some(self)
    }

    fn is_essential(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
