//! Cycle clock: owns elapsed time, speed control, and the timeout check.

use crate::{
    save_data::{Cycle, CycleStamp},
    types::CycleId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleClock {
    pub cycle_id:       CycleId,
    pub elapsed_secs:   f32,
    pub ended_manually: bool,
    pub speed:          ClockSpeed,
    length_secs:        f32,
    fast_forward_scale: f32,
}

impl CycleClock {
    pub fn new(length_secs: f32, fast_forward_scale: f32) -> Self {
        Self {
            cycle_id: 0,
            elapsed_secs: 0.0,
            ended_manually: false,
            speed: ClockSpeed::Normal,
            length_secs,
            fast_forward_scale,
        }
    }

    /// Pick up where a saved cycle left off.
    pub fn resume_from(&mut self, cycle: &Cycle) {
        self.cycle_id = cycle.id;
        self.elapsed_secs = cycle.elapsed_secs;
        self.ended_manually = false;
    }

    pub fn start_cycle(&mut self, id: CycleId) {
        self.cycle_id = id;
        self.elapsed_secs = 0.0;
        self.ended_manually = false;
    }

    /// Accrue one tick of scaled time unless frozen. Returns the new
    /// elapsed time.
    pub fn advance(&mut self, dt: f32, frozen: bool) -> f32 {
        if !frozen {
            self.elapsed_secs += dt * self.time_scale();
        }
        self.elapsed_secs
    }

    /// Exactly at the threshold has not timed out yet.
    pub fn timed_out(&self) -> bool {
        self.elapsed_secs > self.length_secs
    }

    pub fn length_secs(&self) -> f32 {
        self.length_secs
    }

    pub fn remaining_secs(&self) -> f32 {
        (self.length_secs - self.elapsed_secs).max(0.0)
    }

    pub fn stamp(&self) -> CycleStamp {
        CycleStamp { cycle_id: self.cycle_id, elapsed_secs: self.elapsed_secs }
    }

    pub fn set_speed(&mut self, speed: ClockSpeed) {
        self.speed = speed;
    }

    pub fn toggle_fast_forward(&mut self) -> ClockSpeed {
        self.speed = match self.speed {
            ClockSpeed::Normal      => ClockSpeed::FastForward,
            ClockSpeed::FastForward => ClockSpeed::Normal,
        };
        self.speed
    }

    pub fn time_scale(&self) -> f32 {
        match self.speed {
            ClockSpeed::Normal      => 1.0,
            ClockSpeed::FastForward => self.fast_forward_scale,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClockSpeed {
    Normal,       // real time
    FastForward,  // debug only
}
