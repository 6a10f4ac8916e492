//! Canonical agent records and name resolution
//!
//! Agents are immutable once loaded. A GID is permanently bound to its agent
//! and every agent holds exactly one color.

use crate::registry::colors::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Agent rank levels (L0 = orchestration root, L3 = most junior)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentLevel {
    L0,
    L1,
    L2,
    L3,
}

impl AgentLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "L0" => Some(AgentLevel::L0),
            "L1" => Some(AgentLevel::L1),
            "L2" => Some(AgentLevel::L2),
            "L3" => Some(AgentLevel::L3),
            _ => None,
        }
    }
}

/// Immutable agent definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub name: String,
    pub gid: String,
    pub role: String,
    pub emoji: String,
    pub color: Color,
    pub lane: String,
    pub level: AgentLevel,
    pub aliases: BTreeSet<String>,
    pub mutable_fields: BTreeSet<String>,
    pub immutable_fields: BTreeSet<String>,
}

impl Agent {
    /// Numeric component of the GID (e.g. "GID-01" → 1)
    pub fn gid_number(&self) -> u32 {
        self.gid
            .rsplit('-')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

/// Case-insensitive, whitespace/hyphen-normalized agent name key.
/// "Mira R" and "mira-r" resolve to the same canonical entry.
pub fn normalize_agent_name(name: &str) -> String {
    name.trim().to_uppercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_agent_name() {
        assert_eq!(normalize_agent_name("cody"), "CODY");
        assert_eq!(normalize_agent_name("Mira R"), "MIRA-R");
        assert_eq!(normalize_agent_name("  mira-r "), "MIRA-R");
    }

    #[test]
    fn test_gid_number() {
        let agent = Agent {
            name: "CODY".to_string(),
            gid: "GID-01".to_string(),
            role: "Senior Backend Engineer".to_string(),
            emoji: "🔵".to_string(),
            color: Color::Blue,
            lane: "Backend Engineering".to_string(),
            level: AgentLevel::L2,
            aliases: BTreeSet::new(),
            mutable_fields: BTreeSet::new(),
            immutable_fields: BTreeSet::new(),
        };
        assert_eq!(agent.gid_number(), 1);
    }

    #[test]
    fn test_agent_level_parse() {
        assert_eq!(AgentLevel::parse("L0"), Some(AgentLevel::L0));
        assert_eq!(AgentLevel::parse("L3"), Some(AgentLevel::L3));
        assert_eq!(AgentLevel::parse("L4"), None);
    }
}
