//! Constitutional lock records
//!
//! A lock is a named invariant with one or more enforcement mechanisms, a
//! severity, and a violation policy. Only admission-gated locks participate
//! in PAC admission; forbidden zones deny regardless of acknowledgment.

use crate::error::Violation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lock classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    Invariant,
    Constraint,
    Boundary,
    Gate,
}

/// Lock severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockSeverity {
    Critical,
    High,
    Medium,
}

impl LockSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockSeverity::Critical => "CRITICAL",
            LockSeverity::High => "HIGH",
            LockSeverity::Medium => "MEDIUM",
        }
    }
}

/// What happens when the lock is violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationAction {
    HardFail,
    SoftFail,
}

/// Whether a violation must emit telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryPolicy {
    Required,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationPolicy {
    pub action: ViolationAction,
    pub telemetry: TelemetryPolicy,
}

/// One enforcement mechanism, as written in the lock registry:
/// a single-key map per entry (`pac_gate: true`, `test_required: <path>`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    PacGate(bool),
    TestRequired(String),
    RuntimeAssertion(String),
    CiWorkflow(String),
    LintRule(String),
}

// Deserialize from the documented single-key map form (`pac_gate: true`,
// `test_required: <path>`, ...). serde_yaml 0.9 renders the default
// externally-tagged enum as a `!tag`, which does not match the registry
// wire format, so the map form is read explicitly.
impl<'de> Deserialize<'de> for Enforcement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        #[derive(Deserialize)]
        #[serde(rename_all = "snake_case")]
        struct EnforcementMap {
            #[serde(default)]
            pac_gate: Option<bool>,
            #[serde(default)]
            test_required: Option<String>,
            #[serde(default)]
            runtime_assertion: Option<String>,
            #[serde(default)]
            ci_workflow: Option<String>,
            #[serde(default)]
            lint_rule: Option<String>,
        }

        let m = EnforcementMap::deserialize(deserializer)?;
        let candidates = [
            m.pac_gate.map(Enforcement::PacGate),
            m.test_required.map(Enforcement::TestRequired),
            m.runtime_assertion.map(Enforcement::RuntimeAssertion),
            m.ci_workflow.map(Enforcement::CiWorkflow),
            m.lint_rule.map(Enforcement::LintRule),
        ];

        let mut iter = candidates.into_iter().flatten();
        let first = iter
            .next()
            .ok_or_else(|| D::Error::custom("enforcement entry must specify exactly one mechanism"))?;
        if iter.next().is_some() {
            return Err(D::Error::custom(
                "enforcement entry must specify exactly one mechanism",
            ));
        }
        Ok(first)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    Active,
    Superseded,
}

impl Default for LockStatus {
    fn default() -> Self {
        LockStatus::Active
    }
}

/// An invariant lock record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub lock_id: String,
    pub description: String,
    pub scope: BTreeSet<String>,
    #[serde(rename = "type")]
    pub lock_type: LockType,
    pub enforcement: Vec<Enforcement>,
    pub severity: LockSeverity,
    pub violation_policy: ViolationPolicy,
    #[serde(default)]
    pub forbidden_zones: Vec<String>,
    #[serde(default)]
    pub source_invariants: Vec<String>,
    #[serde(default)]
    pub status: LockStatus,
    #[serde(default)]
    pub superseded_by: Option<String>,
}

impl Lock {
    pub fn is_active(&self) -> bool {
        self.status == LockStatus::Active
    }

    /// Admission-gated locks are the only ones required for PAC admission
    pub fn is_admission_gated(&self) -> bool {
        self.enforcement
            .iter()
            .any(|e| matches!(e, Enforcement::PacGate(true)))
    }

    pub fn applies_to_any_scope(&self, scopes: &BTreeSet<String>) -> bool {
        self.scope.iter().any(|s| scopes.contains(s))
    }
}

/// The raw lock registry document (YAML)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LockRegistryDoc {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    locks: Option<Vec<Lock>>,
}

/// Loaded, indexed lock registry. Immutable after load.
#[derive(Debug, Clone)]
pub struct LockRegistry {
    version: String,
    locks: Vec<Lock>,
}

impl LockRegistry {
    /// Parse a lock registry from YAML source.
    /// Parse failure or a missing top-level section is a hard stop.
    pub fn load_str(source: &str) -> Result<Self, Violation> {
        let doc: LockRegistryDoc =
            serde_yaml::from_str(source).map_err(|e| Violation::LockRegistry {
                reason: format!("failed to parse lock registry: {e}"),
            })?;

        let version = doc.version.ok_or_else(|| Violation::LockRegistry {
            reason: "missing top-level 'version' field".to_string(),
        })?;
        let locks = doc.locks.ok_or_else(|| Violation::LockRegistry {
            reason: "missing top-level 'locks' section".to_string(),
        })?;

        Ok(Self { version, locks })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, lock_id: &str) -> Option<&Lock> {
        self.locks.iter().find(|l| l.lock_id == lock_id)
    }

    /// All active locks whose scope set contains the given scope tag
    pub fn locks_by_scope(&self, scope: &str) -> Vec<&Lock> {
        self.locks
            .iter()
            .filter(|l| l.is_active() && l.scope.contains(scope))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lock> {
        self.locks.iter()
    }

    /// Every active lock must carry at least one enforcement mechanism.
    /// Returns the offending lock ids; non-empty means the registry is invalid.
    pub fn validate_enforcement_coverage(&self) -> Vec<String> {
        self.locks
            .iter()
            .filter(|l| l.is_active() && l.enforcement.is_empty())
            .map(|l| l.lock_id.clone())
            .collect()
    }

    /// Union of admission-gated, active lock ids whose scope intersects the
    /// declared scopes.
    pub fn required_for_scopes(&self, scopes: &BTreeSet<String>) -> BTreeSet<String> {
        self.locks
            .iter()
            .filter(|l| l.is_active() && l.is_admission_gated() && l.applies_to_any_scope(scopes))
            .map(|l| l.lock_id.clone())
            .collect()
    }

    /// First active lock whose forbidden-zone fragment is a substring of the
    /// path, if any.
    pub fn check_forbidden_zone(&self, path: &str) -> Option<&Lock> {
        self.forbidden_zone_hit(path).map(|(lock, _)| lock)
    }

    /// Like `check_forbidden_zone`, but also names the matched fragment.
    pub fn forbidden_zone_hit(&self, path: &str) -> Option<(&Lock, &str)> {
        self.locks.iter().find_map(|l| {
            if !l.is_active() {
                return None;
            }
            l.forbidden_zones
                .iter()
                .find(|z| path.contains(z.as_str()))
                .map(|z| (l, z.as_str()))
        })
    }

    /// Snapshot mutability check: within an unchanged registry version, a
    /// lock's id, type, and scope are immutable and removal is a violation.
    pub fn validate_mutability(old: &LockRegistry, new: &LockRegistry) -> Vec<String> {
        let mut violations = Vec::new();

        if old.version != new.version {
            return violations;
        }

        for old_lock in &old.locks {
            let Some(new_lock) = new.get(&old_lock.lock_id) else {
                violations.push(format!(
                    "Lock {} removed without version bump",
                    old_lock.lock_id
                ));
                continue;
            };
            if new_lock.lock_type != old_lock.lock_type {
                violations.push(format!(
                    "Lock {}: immutable field 'type' changed from '{:?}' to '{:?}' without version bump",
                    old_lock.lock_id, old_lock.lock_type, new_lock.lock_type
                ));
            }
            if new_lock.scope != old_lock.scope {
                violations.push(format!(
                    "Lock {}: immutable field 'scope' changed from {:?} to {:?} without version bump",
                    old_lock.lock_id, old_lock.scope, new_lock.scope
                ));
            }
        }

        violations
    }
}
