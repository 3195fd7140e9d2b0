//! Save history metadata.
//!
//! Every successful save also appends a snapshot row. Only the newest
//! SNAPSHOT_RETENTION rows per save identifier are kept.

use crate::types::CycleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_RETENTION: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveSnapshot {
    pub id:               i64,
    pub identifier:       String,
    /// Id of the cycle that was current when the save was written.
    pub cycle_id:         CycleId,
    pub completed_cycles: u32,
    pub saved_at:         DateTime<Utc>,
}
