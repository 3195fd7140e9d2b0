//! Shared primitive types used across the entire game core.

use serde::{Deserialize, Serialize};

/// Sequence number of a time-loop cycle. Assigned at cycle creation.
pub type CycleId = u32;

/// Catalog id of a clue.
pub type ClueId = u32;

/// Catalog id of a contact.
pub type ContactId = u32;

/// Opaque, stable key of a destructible sub-object (e.g. a bomb component).
/// Never assumed to be contiguous.
pub type PartId = u32;

/// The canonical session identifier.
pub type SessionId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Orientation as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Returns the normalized quaternion, or `None` for a zero-length or
    /// non-finite input.
    pub fn normalized(&self) -> Option<Quat> {
        let len = self.length();
        if !len.is_finite() || len <= f32::EPSILON {
            return None;
        }
        Some(Quat::new(self.x / len, self.y / len, self.z / len, self.w / len))
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A 2-component value: movement and look intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
