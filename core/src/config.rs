use crate::types::{ClueId, ContactId, PartId, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A clue that can be unlocked. Display text is a localisation key only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClueDef {
    pub id: ClueId,
    pub title_key: String,
    /// Position on the clue wall as (y, z).
    pub wall_position: (f32, f32),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactDef {
    pub id: ContactId,
    pub name_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub clues: Vec<ClueDef>,
    pub contacts: Vec<ContactDef>,
}

impl Catalog {
    pub fn clue(&self, id: ClueId) -> Option<&ClueDef> {
        self.clues.iter().find(|c| c.id == id)
    }

    pub fn contact(&self, id: ContactId) -> Option<&ContactDef> {
        self.contacts.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for SpawnPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(-0.5, 0.0, 0.0),
            orientation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Key the save is stored under.
    pub save_identifier: String,
    /// A cycle times out once its elapsed time goes past this.
    pub cycle_length_secs: f32,
    pub fade_secs: f32,
    pub fast_forward_scale: f32,
    pub indicator_blink_secs: f32,
    pub hint_display_secs: f32,
    pub hint_leave_secs: f32,
    pub reply_delay_secs: f32,
    pub reply_text: String,
    /// Enables quick-unlock and the fast-forward toggle.
    pub dev_tools: bool,
    pub spawn_pose: SpawnPose,
    /// Parts present in a freshly instantiated bomb.
    pub bomb_parts: Vec<PartId>,
    pub catalog: Catalog,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_identifier: "UnderTime".into(),
            cycle_length_secs: 60.0,
            fade_secs: 2.0,
            fast_forward_scale: 5.0,
            indicator_blink_secs: 0.25,
            hint_display_secs: 3.5,
            hint_leave_secs: 1.0,
            reply_delay_secs: 2.0,
            reply_text: "Got it!".into(),
            dev_tools: false,
            spawn_pose: SpawnPose::default(),
            bomb_parts: (1..=6).collect(),
            catalog: Catalog::default(),
        }
    }
}

impl GameConfig {
    /// Load from the data/ directory.
    /// In tests, use GameConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/game.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: GameConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        let catalog_path = format!("{data_dir}/catalog.json");
        let catalog_content = std::fs::read_to_string(&catalog_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {catalog_path}: {e}"))?;
        config.catalog = serde_json::from_str(&catalog_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {catalog_path}: {e}"))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.save_identifier.is_empty() {
            anyhow::bail!("save_identifier must not be empty");
        }
        if !(self.cycle_length_secs > 0.0) {
            anyhow::bail!("cycle_length_secs must be positive, got {}", self.cycle_length_secs);
        }
        for (name, value) in [
            ("fade_secs", self.fade_secs),
            ("indicator_blink_secs", self.indicator_blink_secs),
            ("hint_display_secs", self.hint_display_secs),
            ("hint_leave_secs", self.hint_leave_secs),
            ("reply_delay_secs", self.reply_delay_secs),
        ] {
            if !(value >= 0.0) {
                anyhow::bail!("{name} must not be negative, got {value}");
            }
        }
        let mut clue_ids: Vec<_> = self.catalog.clues.iter().map(|c| c.id).collect();
        clue_ids.sort_unstable();
        if clue_ids.windows(2).any(|w| w[0] == w[1]) {
            anyhow::bail!("catalog has duplicate clue ids");
        }
        let mut contact_ids: Vec<_> = self.catalog.contacts.iter().map(|c| c.id).collect();
        contact_ids.sort_unstable();
        if contact_ids.windows(2).any(|w| w[0] == w[1]) {
            anyhow::bail!("catalog has duplicate contact ids");
        }
        Ok(())
    }

    /// Small, fixed config for tests: a 4-clue / 3-contact catalog with
    /// dev tools on.
    pub fn default_test() -> Self {
        Self {
            dev_tools: true,
            catalog: Catalog {
                clues: (0..4)
                    .map(|id| ClueDef {
                        id,
                        title_key: format!("clue.{id}.title"),
                        wall_position: (id as f32 * 0.5, 1.0),
                    })
                    .collect(),
                contacts: (0..3)
                    .map(|id| ContactDef { id, name_key: format!("contact.{id}.name") })
                    .collect(),
            },
            ..Self::default()
        }
    }
}
