//! Registry source documents and schema validation
//!
//! The raw registry document is parsed leniently, then validated strictly:
//! every schema error is collected and reported together, and any error at
//! all prevents the registry from loading. There is no partial registry.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raised when registry schema validation fails. HARD STOP, no degraded load.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read registry source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse agent registry JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse lock registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Registry schema invalid ({} errors): {}", .errors.len(), .errors.join("; "))]
    Invalid { errors: Vec<String> },
}

static SEMVER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());
static GID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^GID-\d{2}$").unwrap());

/// Fields that can never move to a mutable list, regardless of what the
/// record declares.
pub const ALWAYS_IMMUTABLE_FIELDS: [&str; 3] = ["gid", "lane", "color"];

const REQUIRED_TOP_LEVEL_FIELDS: [&str; 5] = [
    "registry_version",
    "agents",
    "color_lanes",
    "governance_invariants",
    "schema_metadata",
];

const REQUIRED_AGENT_FIELDS: [&str; 9] = [
    "gid",
    "lane",
    "color",
    "emoji_primary",
    "agent_level",
    "diversity_profile",
    "role",
    "mutable_fields",
    "immutable_fields",
];

const VALID_AGENT_LEVELS: [&str; 4] = ["L0", "L1", "L2", "L3"];

/// One agent record as stored in the registry source
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentRecord {
    #[serde(default)]
    pub gid: Option<String>,
    #[serde(default)]
    pub lane: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub emoji_primary: Option<String>,
    #[serde(default)]
    pub agent_level: Option<String>,
    #[serde(default)]
    pub diversity_profile: Option<Vec<String>>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub mutable_fields: Option<Vec<String>>,
    #[serde(default)]
    pub immutable_fields: Option<Vec<String>>,
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub emoji_aliases: Option<Vec<String>>,
}

/// One color lane record as stored in the registry source
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColorLaneRecord {
    #[serde(default)]
    pub lane: Option<String>,
    #[serde(default)]
    pub gids: Vec<String>,
    #[serde(default)]
    pub reserved_gids: Option<Vec<String>>,
}

/// The versioned agent registry document
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentRegistryDoc {
    #[serde(default)]
    pub registry_version: Option<String>,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentRecord>,
    #[serde(default)]
    pub color_lanes: BTreeMap<String, ColorLaneRecord>,
    #[serde(default)]
    pub governance_invariants: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub schema_metadata: Option<serde_json::Value>,
}

impl AgentRegistryDoc {
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(source)?)
    }
}

pub fn is_valid_semver(version: &str) -> bool {
    SEMVER_PATTERN.is_match(version)
}

pub fn is_valid_gid_format(gid: &str) -> bool {
    GID_PATTERN.is_match(gid)
}

/// Validate the full document schema, collecting every error.
/// A non-empty return means the registry must not load.
pub fn validate_schema(doc: &AgentRegistryDoc) -> Vec<String> {
    let mut errors = Vec::new();

    let raw = serde_json::to_value(doc).unwrap_or_default();
    for field in REQUIRED_TOP_LEVEL_FIELDS {
        let missing = match raw.get(field) {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::Object(map)) => {
                // agents/color_lanes must be present and non-empty
                (field == "agents" || field == "color_lanes") && map.is_empty()
            }
            _ => false,
        };
        if missing {
            errors.push(format!("Missing required top-level field: {field}"));
        }
    }

    match doc.registry_version.as_deref() {
        None | Some("") => errors.push("registry_version must be a non-empty string".to_string()),
        Some(version) if !is_valid_semver(version) => {
            errors.push(format!("registry_version '{version}' is not valid semver (X.Y.Z)"));
        }
        _ => {}
    }

    if let Some(metadata) = doc.schema_metadata.as_ref().and_then(|m| m.as_object()) {
        if !metadata.contains_key("agent_levels") {
            errors.push("schema_metadata missing 'agent_levels'".to_string());
        }
        if !metadata.contains_key("field_mutability") {
            errors.push("schema_metadata missing 'field_mutability'".to_string());
        }
    }

    for (name, record) in &doc.agents {
        errors.extend(validate_agent_record(name, record));
    }

    for (color, record) in &doc.color_lanes {
        if record.lane.as_deref().map_or(true, str::is_empty) {
            errors.push(format!("Color lane {color}: missing lane name"));
        }
    }

    errors
}

fn validate_agent_record(name: &str, record: &AgentRecord) -> Vec<String> {
    let mut errors = Vec::new();
    let prefix = format!("Agent {name}:");

    let raw = serde_json::to_value(record).unwrap_or_default();
    for field in REQUIRED_AGENT_FIELDS {
        if raw.get(field).map_or(true, serde_json::Value::is_null) {
            errors.push(format!("{prefix} missing required field '{field}'"));
        }
    }

    if let Some(gid) = record.gid.as_deref() {
        if !is_valid_gid_format(gid) {
            errors.push(format!("{prefix} invalid GID format '{gid}' (expected GID-NN)"));
        }
    }

    if let Some(level) = record.agent_level.as_deref() {
        if !VALID_AGENT_LEVELS.contains(&level) {
            errors.push(format!("{prefix} invalid agent_level '{level}' (expected L0-L3)"));
        }
    }

    if let Some(immutable) = record.immutable_fields.as_ref() {
        let missing: Vec<&str> = ALWAYS_IMMUTABLE_FIELDS
            .iter()
            .copied()
            .filter(|f| !immutable.iter().any(|i| i == f))
            .collect();
        if !missing.is_empty() {
            errors.push(format!("{prefix} immutable_fields missing required: {missing:?}"));
        }
    }

    errors
}

/// Validate that no immutable field changed between two snapshots of the
/// same registry version. Each violation names the agent, the field, and
/// both values; removal without a version bump is also a violation.
pub fn validate_mutability(old: &AgentRegistryDoc, new: &AgentRegistryDoc) -> Vec<String> {
    let mut violations = Vec::new();

    if old.registry_version != new.registry_version {
        return violations;
    }

    for (name, old_record) in &old.agents {
        let Some(new_record) = new.agents.get(name) else {
            violations.push(format!("Agent {name} removed without version bump"));
            continue;
        };

        let mut immutable: Vec<String> = old_record
            .immutable_fields
            .clone()
            .unwrap_or_default();
        for field in ALWAYS_IMMUTABLE_FIELDS {
            if !immutable.iter().any(|f| f == field) {
                immutable.push(field.to_string());
            }
        }

        let old_raw = serde_json::to_value(old_record).unwrap_or_default();
        let new_raw = serde_json::to_value(new_record).unwrap_or_default();

        for field in &immutable {
            let old_val = old_raw.get(field.as_str()).cloned().unwrap_or_default();
            let new_val = new_raw.get(field.as_str()).cloned().unwrap_or_default();
            if old_val != new_val {
                violations.push(format!(
                    "Agent {name}: immutable field '{field}' changed from '{old_val}' to '{new_val}' without version bump"
                ));
            }
        }
    }

    violations
}
