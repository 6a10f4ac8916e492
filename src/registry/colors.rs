//! Canonical colors and lane assignments
//!
//! A color is an authorization partition: every agent holds exactly one, and
//! execution is only permitted inside the lane that color maps to. TEAL is
//! the orchestration color and is never a valid executing lane.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical agent colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Teal,
    Blue,
    Yellow,
    Purple,
    Orange,
    DarkRed,
    Green,
    White,
    Pink,
}

/// Emoji glyphs that may prefix a declared color (single or dual squares)
pub const COLOR_EMOJI: &str = "🟦🟩🔷🔵🟡🟨🟣🟠🟧🔴🟥🟢⚪🩷💗";

impl Color {
    /// Canonical registry spelling ("DARK RED" keeps its space)
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Teal => "TEAL",
            Color::Blue => "BLUE",
            Color::Yellow => "YELLOW",
            Color::Purple => "PURPLE",
            Color::Orange => "ORANGE",
            Color::DarkRed => "DARK RED",
            Color::Green => "GREEN",
            Color::White => "WHITE",
            Color::Pink => "PINK",
        }
    }

    /// Normalize and resolve a declared color string.
    ///
    /// Strips emoji prefixes, uppercases, folds spaces/hyphens to
    /// underscores, then applies the fixed aliases: GREY→WHITE and
    /// DARK/DARKRED/RED→DARK RED. Returns None for anything else.
    pub fn parse(declared: &str) -> Option<Color> {
        let normalized = normalize_color_token(declared);
        match normalized.as_str() {
            "TEAL" => Some(Color::Teal),
            "BLUE" => Some(Color::Blue),
            "YELLOW" => Some(Color::Yellow),
            "PURPLE" => Some(Color::Purple),
            "ORANGE" => Some(Color::Orange),
            "DARK_RED" | "DARKRED" | "DARK" | "RED" => Some(Color::DarkRed),
            "GREEN" => Some(Color::Green),
            "WHITE" | "GREY" => Some(Color::White),
            "PINK" => Some(Color::Pink),
            _ => None,
        }
    }

    /// Resolve the canonical color for an emoji glyph (e.g. "🔵" → BLUE).
    /// Dual-glyph TEAL ("🟦🟩") is checked before its single components.
    pub fn from_emoji(emoji: &str) -> Option<Color> {
        match emoji {
            "🟦🟩" | "🟦" | "🔷" => Some(Color::Teal),
            "🔵" => Some(Color::Blue),
            "🟡" | "🟨" => Some(Color::Yellow),
            "🟣" => Some(Color::Purple),
            "🟠" | "🟧" => Some(Color::Orange),
            "🔴" | "🟥" => Some(Color::DarkRed),
            "🟢" | "🟩" => Some(Color::Green),
            "⚪" => Some(Color::White),
            "🩷" | "💗" => Some(Color::Pink),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercase, trim, strip emoji prefixes, fold separators to underscores.
fn normalize_color_token(declared: &str) -> String {
    let stripped: String = declared
        .chars()
        .filter(|c| !COLOR_EMOJI.contains(*c))
        .collect();
    stripped
        .trim()
        .to_uppercase()
        .replace([' ', '-'], "_")
}

/// A single color lane: human lane name plus the GIDs authorized to execute
/// in it. The orchestration color additionally carries the small fixed set of
/// GIDs allowed to *claim* it (no GID may ever execute in it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorLane {
    pub color: Color,
    pub lane: String,
    pub authorized_gids: BTreeSet<String>,
    #[serde(default)]
    pub reserved_gids: BTreeSet<String>,
}

/// The full color → lane authorization table
#[derive(Debug, Clone, Default)]
pub struct ColorLanes {
    lanes: BTreeMap<Color, ColorLane>,
}

impl ColorLanes {
    pub fn new(lanes: Vec<ColorLane>) -> Self {
        Self {
            lanes: lanes.into_iter().map(|l| (l.color, l)).collect(),
        }
    }

    pub fn lane_for_color(&self, color: Color) -> Option<&str> {
        self.lanes.get(&color).map(|l| l.lane.as_str())
    }

    pub fn get(&self, color: Color) -> Option<&ColorLane> {
        self.lanes.get(&color)
    }

    /// GIDs authorized to execute in this color's lane
    pub fn authorized_gids(&self, color: Color) -> Option<&BTreeSet<String>> {
        self.lanes.get(&color).map(|l| &l.authorized_gids)
    }

    /// Whether this GID is in the orchestration color's reserved claim set.
    /// Claiming is not executing: TEAL execution is denied unconditionally.
    pub fn is_reserved_color_allowed(&self, gid: &str) -> bool {
        self.lanes
            .get(&Color::Teal)
            .map(|l| l.reserved_gids.contains(&gid.to_uppercase()))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorLane> {
        self.lanes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_colors() {
        assert_eq!(Color::parse("BLUE"), Some(Color::Blue));
        assert_eq!(Color::parse("blue"), Some(Color::Blue));
        assert_eq!(Color::parse(" teal "), Some(Color::Teal));
        assert_eq!(Color::parse("NOPE"), None);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Color::parse("GREY"), Some(Color::White));
        assert_eq!(Color::parse("DARK RED"), Some(Color::DarkRed));
        assert_eq!(Color::parse("DARK-RED"), Some(Color::DarkRed));
        assert_eq!(Color::parse("DARKRED"), Some(Color::DarkRed));
        assert_eq!(Color::parse("RED"), Some(Color::DarkRed));
        assert_eq!(Color::parse("DARK"), Some(Color::DarkRed));
    }

    #[test]
    fn test_parse_strips_emoji_prefix() {
        assert_eq!(Color::parse("🔵 BLUE"), Some(Color::Blue));
        assert_eq!(Color::parse("🟦🟩 TEAL"), Some(Color::Teal));
        assert_eq!(Color::parse("⚪GREY"), Some(Color::White));
    }

    #[test]
    fn test_canonical_spelling() {
        assert_eq!(Color::DarkRed.as_str(), "DARK RED");
        assert_eq!(Color::parse(Color::DarkRed.as_str()), Some(Color::DarkRed));
    }

    #[test]
    fn test_emoji_resolution() {
        assert_eq!(Color::from_emoji("🔵"), Some(Color::Blue));
        assert_eq!(Color::from_emoji("🟦🟩"), Some(Color::Teal));
        assert_eq!(Color::from_emoji("🟩"), Some(Color::Green));
        assert_eq!(Color::from_emoji("x"), None);
    }

    #[test]
    fn test_reserved_claim_set() {
        let lanes = ColorLanes::new(vec![ColorLane {
            color: Color::Teal,
            lane: "Orchestration".to_string(),
            authorized_gids: BTreeSet::new(),
            reserved_gids: ["GID-00", "GID-04"].iter().map(|s| s.to_string()).collect(),
        }]);
        assert!(lanes.is_reserved_color_allowed("GID-00"));
        assert!(lanes.is_reserved_color_allowed("gid-04"));
        assert!(!lanes.is_reserved_color_allowed("GID-01"));
    }
}
