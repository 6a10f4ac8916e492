//! Canonical registry - the single source of truth for identities
//!
//! The registry is built once at process start from versioned configuration
//! and is immutable afterward; validators hold a shared reference and never
//! observe a partially loaded or mutated state. Picking up a new registry
//! version means constructing a new `Registry` value, never editing one in
//! place.

pub mod agents;
pub mod colors;
pub mod schema;

use crate::constitution::locks::{Lock, LockRegistry};
use crate::error::{GovernanceResult, Violation};
use crate::registry::agents::{normalize_agent_name, Agent, AgentLevel};
use crate::registry::colors::{Color, ColorLane, ColorLanes};
use crate::registry::schema::{validate_mutability, validate_schema, AgentRegistryDoc, SchemaError};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

/// The loaded, indexed, immutable registry
#[derive(Debug, Clone)]
pub struct Registry {
    version: String,
    fingerprint: String,
    agents: BTreeMap<String, Agent>,
    gid_index: BTreeMap<String, String>,
    lanes: ColorLanes,
    locks: LockRegistry,
    /// Raw snapshot retained for cross-snapshot mutability validation
    source_doc: AgentRegistryDoc,
}

impl Registry {
    /// Load the registry from its configured source files.
    pub fn load(agents_path: &Path, locks_path: &Path) -> Result<Self, SchemaError> {
        let agents_json = std::fs::read_to_string(agents_path)?;
        let locks_yaml = std::fs::read_to_string(locks_path)?;
        Self::from_sources(&agents_json, &locks_yaml)
    }

    /// Build a registry from raw source documents. Any schema error at all
    /// prevents the registry from existing; there is no degraded registry.
    pub fn from_sources(agents_json: &str, locks_yaml: &str) -> Result<Self, SchemaError> {
        let doc = AgentRegistryDoc::parse(agents_json)?;

        let mut errors = validate_schema(&doc);

        let locks = match LockRegistry::load_str(locks_yaml) {
            Ok(locks) => {
                let uncovered = locks.validate_enforcement_coverage();
                if !uncovered.is_empty() {
                    errors.push(format!(
                        "active locks without enforcement mechanisms: {uncovered:?}"
                    ));
                }
                Some(locks)
            }
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };

        if !errors.is_empty() {
            return Err(SchemaError::Invalid { errors });
        }
        let locks = locks.expect("lock registry parsed");

        let lanes = build_lanes(&doc, &mut errors);
        let agents = build_agents(&doc, &mut errors);
        validate_registry_invariants(&agents, &lanes, &mut errors);

        if !errors.is_empty() {
            return Err(SchemaError::Invalid { errors });
        }

        let mut gid_index = BTreeMap::new();
        for agent in agents.values() {
            gid_index.insert(agent.gid.clone(), agent.name.clone());
        }

        let version = doc.registry_version.clone().unwrap_or_default();
        let fingerprint = fingerprint_sources(agents_json, locks_yaml);

        info!(
            version = %version,
            agents = agents.len(),
            locks = locks.iter().count(),
            "registry loaded"
        );

        Ok(Self {
            version,
            fingerprint,
            agents,
            gid_index,
            lanes,
            locks,
            source_doc: doc,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// SHA-256 fingerprint of the exact sources this registry was built from.
    /// Admission events carry it so "which registry validated this" is always
    /// answerable.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Resolve an agent by canonical name or alias (case-insensitive,
    /// whitespace/hyphen-normalized; exact name first, then aliases).
    pub fn agent_by_name(&self, name: &str) -> Option<&Agent> {
        let key = normalize_agent_name(name);
        if let Some(agent) = self.agents.get(&key) {
            return Some(agent);
        }
        self.agents.values().find(|a| a.aliases.contains(&key))
    }

    pub fn agent_by_gid(&self, gid: &str) -> Option<&Agent> {
        self.gid_index
            .get(&gid.to_uppercase())
            .and_then(|name| self.agents.get(name))
    }

    pub fn lane_for_color(&self, color: Color) -> Option<&str> {
        self.lanes.lane_for_color(color)
    }

    pub fn is_reserved_color_allowed(&self, gid: &str) -> bool {
        self.lanes.is_reserved_color_allowed(gid)
    }

    pub fn lanes(&self) -> &ColorLanes {
        &self.lanes
    }

    pub fn lock(&self, lock_id: &str) -> Option<&Lock> {
        self.locks.get(lock_id)
    }

    pub fn locks_by_scope(&self, scope: &str) -> Vec<&Lock> {
        self.locks.locks_by_scope(scope)
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn validate_enforcement_coverage(&self) -> Vec<String> {
        self.locks.validate_enforcement_coverage()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Cross-snapshot mutability validation: within an unchanged registry
    /// version, every field declared immutable must be byte-identical.
    /// Covers both agents and locks.
    pub fn validate_mutability_against(&self, newer: &Registry) -> Vec<String> {
        let mut violations = validate_mutability(&self.source_doc, &newer.source_doc);
        violations.extend(LockRegistry::validate_mutability(&self.locks, &newer.locks));
        violations
    }

    /// Raising form of `validate_mutability_against`: a candidate snapshot
    /// that mutates immutable fields is rejected outright.
    pub fn require_mutability_against(&self, newer: &Registry) -> GovernanceResult<()> {
        let violations = self.validate_mutability_against(newer);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Violation::MutabilityViolation { violations })
        }
    }

    /// Formatted canonical roster, sorted by GID
    pub fn roster_summary(&self) -> String {
        let mut agents: Vec<&Agent> = self.agents.values().collect();
        agents.sort_by_key(|a| a.gid_number());

        let mut lines = vec![
            format!("CANONICAL AGENT ROSTER (registry v{})", self.version),
            "=".repeat(50),
        ];
        for agent in agents {
            lines.push(format!(
                "{} {} ({}) - {} [{}]",
                agent.emoji, agent.name, agent.gid, agent.role, agent.color
            ));
        }
        lines.join("\n")
    }
}

fn build_lanes(doc: &AgentRegistryDoc, errors: &mut Vec<String>) -> ColorLanes {
    let mut lanes = Vec::new();
    for (color_name, record) in &doc.color_lanes {
        let Some(color) = Color::parse(color_name) else {
            errors.push(format!("Color lane '{color_name}' is not a canonical color"));
            continue;
        };
        lanes.push(ColorLane {
            color,
            lane: record.lane.clone().unwrap_or_default(),
            authorized_gids: record.gids.iter().map(|g| g.to_uppercase()).collect(),
            reserved_gids: record
                .reserved_gids
                .iter()
                .flatten()
                .map(|g| g.to_uppercase())
                .collect(),
        });
    }
    ColorLanes::new(lanes)
}

fn build_agents(doc: &AgentRegistryDoc, errors: &mut Vec<String>) -> BTreeMap<String, Agent> {
    let mut agents = BTreeMap::new();
    let mut seen_gids: BTreeSet<String> = BTreeSet::new();

    for (name, record) in &doc.agents {
        let canonical_name = normalize_agent_name(name);
        let Some(color) = record.color.as_deref().and_then(Color::parse) else {
            errors.push(format!(
                "Agent {name}: color '{}' is not a canonical color",
                record.color.as_deref().unwrap_or("")
            ));
            continue;
        };
        let Some(level) = record.agent_level.as_deref().and_then(AgentLevel::parse) else {
            continue; // already reported by schema validation
        };

        let gid = record.gid.clone().unwrap_or_default().to_uppercase();
        if !seen_gids.insert(gid.clone()) {
            errors.push(format!("Agent {name}: GID {gid} already assigned to another agent"));
            continue;
        }

        agents.insert(
            canonical_name.clone(),
            Agent {
                name: canonical_name,
                gid,
                role: record.role.clone().unwrap_or_default(),
                emoji: record.emoji_primary.clone().unwrap_or_default(),
                color,
                lane: record.lane.clone().unwrap_or_default(),
                level,
                aliases: record
                    .aliases
                    .iter()
                    .flatten()
                    .map(|a| normalize_agent_name(a))
                    .collect(),
                mutable_fields: record.mutable_fields.iter().flatten().cloned().collect(),
                immutable_fields: record.immutable_fields.iter().flatten().cloned().collect(),
            },
        );
    }
    agents
}

/// Registry self-checks: colors resolvable in the lane table, the reserved
/// orchestration color held only by its claim set, emoji unique per color.
fn validate_registry_invariants(
    agents: &BTreeMap<String, Agent>,
    lanes: &ColorLanes,
    errors: &mut Vec<String>,
) {
    let mut emoji_by_color: BTreeMap<(Color, String), String> = BTreeMap::new();

    for agent in agents.values() {
        if lanes.get(agent.color).is_none() {
            errors.push(format!(
                "Agent {} claims color '{}' with no lane assignment",
                agent.name, agent.color
            ));
        }

        if agent.color == Color::Teal && !lanes.is_reserved_color_allowed(&agent.gid) {
            errors.push(format!(
                "Agent {} ({}) uses TEAL but is not in the reserved claim set",
                agent.name, agent.gid
            ));
        }

        let key = (agent.color, agent.emoji.clone());
        if let Some(holder) = emoji_by_color.insert(key, agent.name.clone()) {
            errors.push(format!(
                "Agents {} and {} share emoji '{}' within color {}",
                holder, agent.name, agent.emoji, agent.color
            ));
        }
    }
}

fn fingerprint_sources(agents_json: &str, locks_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(agents_json.as_bytes());
    hasher.update(locks_yaml.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    pub const AGENTS_JSON: &str = r#"{
        "registry_version": "3.0.0",
        "agents": {
            "BENSON": {
                "gid": "GID-00", "lane": "Orchestration", "color": "TEAL",
                "emoji_primary": "🟦🟩", "agent_level": "L0",
                "diversity_profile": ["orchestration"],
                "role": "Chief Orchestrator",
                "mutable_fields": ["role"],
                "immutable_fields": ["gid", "lane", "color"]
            },
            "CODY": {
                "gid": "GID-01", "lane": "Backend Engineering", "color": "BLUE",
                "emoji_primary": "🔵", "agent_level": "L2",
                "diversity_profile": ["backend"],
                "role": "Senior Backend Engineer",
                "mutable_fields": ["role"],
                "immutable_fields": ["gid", "lane", "color"],
                "aliases": ["CODY-R"]
            },
            "CINDY": {
                "gid": "GID-04", "lane": "Orchestration", "color": "TEAL",
                "emoji_primary": "🔷", "agent_level": "L1",
                "diversity_profile": ["orchestration"],
                "role": "Orchestration Deputy",
                "mutable_fields": ["role"],
                "immutable_fields": ["gid", "lane", "color"]
            },
            "DAN": {
                "gid": "GID-07", "lane": "Quality Engineering", "color": "GREEN",
                "emoji_primary": "🟢", "agent_level": "L2",
                "diversity_profile": ["testing"],
                "role": "QA / Test Engineering",
                "mutable_fields": ["role"],
                "immutable_fields": ["gid", "lane", "color"]
            },
            "SONNY": {
                "gid": "GID-02", "lane": "Frontend Engineering", "color": "YELLOW",
                "emoji_primary": "🟡", "agent_level": "L2",
                "diversity_profile": ["frontend"],
                "role": "Frontend Engineer",
                "mutable_fields": ["role"],
                "immutable_fields": ["gid", "lane", "color"]
            }
        },
        "color_lanes": {
            "TEAL": { "lane": "Orchestration", "gids": [], "reserved_gids": ["GID-00", "GID-04"] },
            "BLUE": { "lane": "Backend Engineering", "gids": ["GID-01"] },
            "GREEN": { "lane": "Quality Engineering", "gids": ["GID-07"] },
            "YELLOW": { "lane": "Frontend Engineering", "gids": ["GID-02"] }
        },
        "governance_invariants": {
            "INV-AGENT-01": "No agent may appear in more than one color lane",
            "INV-AGENT-03": "TEAL is reserved for GID-00 and GID-04 only"
        },
        "schema_metadata": {
            "agent_levels": ["L0", "L1", "L2", "L3"],
            "field_mutability": {}
        }
    }"#;

    pub const LOCKS_YAML: &str = r#"
version: "1.0"
locks:
  - lock_id: LOCK-GATEWAY-001
    description: Gateway admission invariants
    scope: [gateway]
    type: invariant
    enforcement:
      - pac_gate: true
    severity: CRITICAL
    violation_policy: { action: HARD_FAIL, telemetry: REQUIRED }
  - lock_id: LOCK-OCC-002
    description: Concurrency control invariants
    scope: [occ]
    type: invariant
    enforcement:
      - pac_gate: true
    severity: HIGH
    violation_policy: { action: HARD_FAIL, telemetry: REQUIRED }
  - lock_id: LOCK-ZONE-003
    description: Settlement ledger is a forbidden zone
    scope: [governance]
    type: boundary
    enforcement:
      - pac_gate: true
    severity: CRITICAL
    violation_policy: { action: HARD_FAIL, telemetry: REQUIRED }
    forbidden_zones: ["settlement/ledger"]
  - lock_id: LOCK-LINT-004
    description: Lint-only constraint
    scope: [gateway]
    type: constraint
    enforcement:
      - lint_rule: naming
    severity: MEDIUM
    violation_policy: { action: SOFT_FAIL, telemetry: OPTIONAL }
"#;

    pub fn registry() -> super::Registry {
        super::Registry::from_sources(AGENTS_JSON, LOCKS_YAML).unwrap()
    }
}
