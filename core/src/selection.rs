//! Selection names: the wire convention shared with the world-selection
//! collaborator.
//!
//! RULE: names are parsed here, once, into a `SelectedEntity`. Nothing
//! deeper in the core looks at the raw string.
//!
//! Format: prefix + decimal id, no separator (`Clue3`, `Bomb12`), or the
//! bare `Bomb` for the bomb body itself.

use crate::types::{ClueId, PartId};
use serde::{Deserialize, Serialize};
use std::fmt;

const CLUE_PREFIX: &str = "Clue";
const BOMB_PREFIX: &str = "Bomb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SelectedEntity {
    Clue(ClueId),
    BombPart(PartId),
    Bomb,
}

impl SelectedEntity {
    /// Returns `None` for anything that isn't one of ours; the selection
    /// collaborator reports every outlined object, not just game entities.
    pub fn parse(name: &str) -> Option<Self> {
        if name == BOMB_PREFIX {
            return Some(Self::Bomb);
        }
        if let Some(id) = name.strip_prefix(CLUE_PREFIX).and_then(parse_id) {
            return Some(Self::Clue(id));
        }
        name.strip_prefix(BOMB_PREFIX).and_then(parse_id).map(Self::BombPart)
    }
}

impl fmt::Display for SelectedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clue(id) => write!(f, "{CLUE_PREFIX}{id}"),
            Self::BombPart(id) => write!(f, "{BOMB_PREFIX}{id}"),
            Self::Bomb => f.write_str(BOMB_PREFIX),
        }
    }
}

/// Digits only: no sign, no whitespace.
fn parse_id(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_three_shapes() {
        assert_eq!(SelectedEntity::parse("Clue3"), Some(SelectedEntity::Clue(3)));
        assert_eq!(SelectedEntity::parse("Bomb12"), Some(SelectedEntity::BombPart(12)));
        assert_eq!(SelectedEntity::parse("Bomb"), Some(SelectedEntity::Bomb));
    }

    #[test]
    fn rejects_separators_signs_and_strangers() {
        for name in ["Clue", "Clue-1", "Clue 1", "Clue+1", "clue1", "Bomb_2", "Door4", ""] {
            assert_eq!(SelectedEntity::parse(name), None, "{name}");
        }
    }

    #[test]
    fn display_is_the_wire_name() {
        for entity in [SelectedEntity::Clue(0), SelectedEntity::BombPart(7), SelectedEntity::Bomb] {
            assert_eq!(SelectedEntity::parse(&entity.to_string()), Some(entity));
        }
    }
}
