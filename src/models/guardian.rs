//! Guardian identity and character models.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Static account identity, sourced from configuration at startup.
#[derive(Debug, Clone, Serialize)]
pub struct Guardian {
    /// Full Bungie name (Name#1234)
    pub bungie_name: String,
    pub display_name: String,
    /// Destiny membership ID scoping profile queries
    pub membership_id: String,
    /// Destiny membership type (-1 auto-resolves cross-save)
    pub membership_type: i32,
    pub membership_type_name: String,
}

/// Platform name for a Bungie membership type.
pub fn membership_type_name(membership_type: i32) -> &'static str {
    match membership_type {
        1 => "Xbox",
        2 => "PlayStation",
        3 => "Steam",
        4 => "Blizzard",
        5 => "Stadia",
        6 => "Epic Games",
        -1 => "Cross Save",
        _ => "Unknown",
    }
}

/// One character, with hashes decoded through the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterSummary {
    pub character_id: String,
    pub class_name: String,
    pub race_name: String,
    pub gender_name: String,
    pub light: u32,
    /// Items sitting at the postmaster (lost items bucket)
    pub postmaster_count: u32,
    pub last_played: Option<DateTime<Utc>>,
}

/// All characters on the account, most recently played first.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterRoster {
    pub count: usize,
    /// Set when any character's postmaster is close to overflowing
    pub postmaster_critical: bool,
    pub characters: Vec<CharacterSummary>,
}

/// A rotating milestone (featured raid, dungeon, or other activity).
#[derive(Debug, Clone, Serialize)]
pub struct Rotator {
    pub name: String,
    pub activity: Option<String>,
    pub has_master: bool,
    pub end_date: Option<DateTime<Utc>>,
}

/// Active rotators categorized by activity type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Rotators {
    pub raids: Vec<Rotator>,
    pub dungeons: Vec<Rotator>,
    pub other: Vec<Rotator>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_type_names() {
        assert_eq!(membership_type_name(3), "Steam");
        assert_eq!(membership_type_name(-1), "Cross Save");
        assert_eq!(membership_type_name(99), "Unknown");
    }
}
