//! SQLite persistence layer: the save gateway.
//!
//! RULE: Only store.rs talks to the database.
//! The coordinator goes through the SaveGateway trait; it never executes
//! SQL directly and never knows which medium holds the bytes.

use crate::{
    error::{GameError, GameResult},
    save_data::SaveFile,
    snapshot::{SaveSnapshot, SNAPSHOT_RETENTION},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Bumped whenever the serialized SaveFile layout changes shape.
pub const SAVE_FORMAT_VERSION: i64 = 1;

/// Opaque key-value save/load of one serialized SaveFile per identifier.
pub trait SaveGateway {
    fn exists(&self, identifier: &str) -> GameResult<bool>;

    fn save(&mut self, identifier: &str, data: &SaveFile) -> GameResult<()>;

    /// A missing identifier is `GameError::NotFound`; a payload that does
    /// not deserialize is `GameError::CorruptData`.
    fn load(&self, identifier: &str) -> GameResult<SaveFile>;
}

pub struct SqliteSaveStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SqliteSaveStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files (:memory: ignores it).
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            log::warn!("could not enable WAL for '{path}': {e}");
        }
        Ok(Self { conn, path: Some(path.to_string()) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_save_slot.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_settings.sql"))?;
        Ok(())
    }

    // ── Save history ───────────────────────────────────────────

    /// Newest first.
    pub fn snapshots(&self, identifier: &str) -> GameResult<Vec<SaveSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, identifier, cycle_id, completed_cycles, saved_at
             FROM save_snapshot WHERE identifier = ?1
             ORDER BY id DESC",
        )?;
        let rows = stmt
            .query_map(params![identifier], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, identifier, cycle_id, completed, saved_at)| {
                Ok(SaveSnapshot {
                    id,
                    identifier,
                    cycle_id:         cycle_id as u32,
                    completed_cycles: completed as u32,
                    saved_at:         parse_timestamp(&saved_at)?,
                })
            })
            .collect()
    }

    /// The full SaveFile stored with a snapshot row.
    pub fn snapshot_payload(&self, snapshot_id: i64) -> GameResult<SaveFile> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT identifier, payload FROM save_snapshot WHERE id = ?1",
                params![snapshot_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (identifier, payload) = row.ok_or_else(|| GameError::NotFound {
            identifier: format!("snapshot#{snapshot_id}"),
        })?;
        decode_payload(&identifier, &payload)
    }

    // ── Settings ───────────────────────────────────────────────

    pub fn get_setting(&self, key: &str) -> GameResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM setting WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn put_setting(&self, key: &str, value: &str) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO setting (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Overwrite a slot's payload with arbitrary text. Test hook for the
    /// corrupt-save path.
    #[doc(hidden)]
    pub fn put_raw_payload(&self, identifier: &str, payload: &str) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO save_slot (identifier, format_version, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identifier) DO UPDATE SET payload = excluded.payload",
            params![identifier, SAVE_FORMAT_VERSION, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl SaveGateway for SqliteSaveStore {
    fn exists(&self, identifier: &str) -> GameResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM save_slot WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn save(&mut self, identifier: &str, data: &SaveFile) -> GameResult<()> {
        let payload = serde_json::to_string(data)?;
        let saved_at = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO save_slot (identifier, format_version, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identifier) DO UPDATE SET
                 format_version = excluded.format_version,
                 payload        = excluded.payload,
                 saved_at       = excluded.saved_at",
            params![identifier, SAVE_FORMAT_VERSION, payload, saved_at],
        )?;
        tx.execute(
            "INSERT INTO save_snapshot (identifier, cycle_id, completed_cycles, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                identifier,
                data.current_cycle.id as i64,
                data.completed_cycles.len() as i64,
                payload,
                saved_at,
            ],
        )?;
        prune_snapshots(&tx, identifier)?;
        tx.commit()?;

        log::debug!("save '{identifier}' written ({} bytes)", payload.len());
        Ok(())
    }

    fn load(&self, identifier: &str) -> GameResult<SaveFile> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT format_version, payload FROM save_slot WHERE identifier = ?1",
                params![identifier],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (version, payload) = row.ok_or_else(|| GameError::NotFound {
            identifier: identifier.to_string(),
        })?;
        if version != SAVE_FORMAT_VERSION {
            log::warn!(
                "save '{identifier}' has format version {version}, expected {SAVE_FORMAT_VERSION}"
            );
        }
        decode_payload(identifier, &payload)
    }
}

/// Keep the newest `SNAPSHOT_RETENTION` rows. Runs inside the save's
/// transaction, so a failed prune rolls the slot write back too.
fn prune_snapshots(conn: &Connection, identifier: &str) -> GameResult<()> {
    conn.execute(
        "DELETE FROM save_snapshot
         WHERE identifier = ?1 AND id NOT IN (
             SELECT id FROM save_snapshot WHERE identifier = ?1
             ORDER BY id DESC LIMIT ?2
         )",
        params![identifier, SNAPSHOT_RETENTION as i64],
    )?;
    Ok(())
}

fn decode_payload(identifier: &str, payload: &str) -> GameResult<SaveFile> {
    serde_json::from_str(payload).map_err(|source| GameError::CorruptData {
        identifier: identifier.to_string(),
        source,
    })
}

fn parse_timestamp(raw: &str) -> GameResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GameError::Other(anyhow::anyhow!("bad timestamp '{raw}': {e}")))
}
