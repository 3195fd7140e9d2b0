//! Player settings persisted alongside the save.

use crate::{error::GameResult, store::SqliteSaveStore};
use serde::{Deserialize, Serialize};

const KEY_LANGUAGE: &str = "language";
const KEY_RESOLUTION_WIDTH: &str = "resolutionWidth";
const KEY_RESOLUTION_HEIGHT: &str = "resolutionHeight";

pub const DEFAULT_RESOLUTION: (u32, u32) = (1920, 1080);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Locale name; `None` until the player picks one.
    pub language:   Option<String>,
    pub resolution: (u32, u32),
}

impl Default for GameSettings {
    fn default() -> Self {
        Self { language: None, resolution: DEFAULT_RESOLUTION }
    }
}

impl GameSettings {
    pub fn load(store: &SqliteSaveStore) -> GameResult<Self> {
        let language = store.get_setting(KEY_LANGUAGE)?.filter(|l| !l.is_empty());
        let width = read_u32(store, KEY_RESOLUTION_WIDTH)?;
        let height = read_u32(store, KEY_RESOLUTION_HEIGHT)?;

        // A zero or missing dimension falls back to the default resolution.
        let resolution = match (width, height) {
            (Some(w), Some(h)) if w != 0 && h != 0 => (w, h),
            _ => DEFAULT_RESOLUTION,
        };
        log::debug!("settings loaded: language={language:?} resolution={resolution:?}");
        Ok(Self { language, resolution })
    }

    pub fn save(&self, store: &SqliteSaveStore) -> GameResult<()> {
        store.put_setting(KEY_LANGUAGE, self.language.as_deref().unwrap_or(""))?;
        store.put_setting(KEY_RESOLUTION_WIDTH, &self.resolution.0.to_string())?;
        store.put_setting(KEY_RESOLUTION_HEIGHT, &self.resolution.1.to_string())?;
        Ok(())
    }
}

fn read_u32(store: &SqliteSaveStore, key: &str) -> GameResult<Option<u32>> {
    Ok(store.get_setting(key)?.and_then(|v| v.parse().ok()))
}
