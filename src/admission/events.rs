//! Admission telemetry - the append-only audit trail
//!
//! Every admission attempt, admitted or denied, produces exactly one
//! immutable event. Events are never mutated after creation; the sequence of
//! events is the audit trail and outlives individual requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::RwLock;
use uuid::Uuid;

/// Terminal outcome of one admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionOutcome {
    Admitted,
    DeniedMissingLocks,
    DeniedForbiddenZone,
    DeniedActivationBlock,
    DeniedColorGateway,
    DeniedEndBanner,
}

impl AdmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Admitted => "ADMITTED",
            AdmissionOutcome::DeniedMissingLocks => "DENIED_MISSING_LOCKS",
            AdmissionOutcome::DeniedForbiddenZone => "DENIED_FORBIDDEN_ZONE",
            AdmissionOutcome::DeniedActivationBlock => "DENIED_ACTIVATION_BLOCK",
            AdmissionOutcome::DeniedColorGateway => "DENIED_COLOR_GATEWAY",
            AdmissionOutcome::DeniedEndBanner => "DENIED_END_BANNER",
        }
    }
}

/// One immutable admission event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionEvent {
    pub id: Uuid,
    pub pac_id: String,
    pub outcome: AdmissionOutcome,
    pub acknowledged_locks: BTreeSet<String>,
    pub required_locks: BTreeSet<String>,
    pub missing_locks: Vec<String>,
    pub affected_scopes: BTreeSet<String>,
    pub touched_files: Vec<String>,
    pub reason: String,
    /// Fingerprint of the registry snapshot that validated this attempt
    pub registry_fingerprint: String,
    pub timestamp: DateTime<Utc>,
}

/// Lock violation telemetry emitted by runtime assertions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationEvent {
    pub id: Uuid,
    pub lock_id: String,
    pub severity: String,
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

impl ViolationEvent {
    pub fn new(lock_id: impl Into<String>, severity: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lock_id: lock_id.into(),
            severity: severity.into(),
            context: context.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only event log. Concurrent appends from multiple in-flight
/// validations are safe; entries are atomic and immutable once appended.
#[derive(Debug, Default)]
pub struct AuditLog {
    admissions: RwLock<Vec<AdmissionEvent>>,
    violations: RwLock<Vec<ViolationEvent>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_admission(&self, event: AdmissionEvent) {
        self.admissions
            .write()
            .expect("audit log poisoned")
            .push(event);
    }

    pub fn append_violation(&self, event: ViolationEvent) {
        self.violations
            .write()
            .expect("audit log poisoned")
            .push(event);
    }

    /// Snapshot of all admission events, in append order
    pub fn admission_events(&self) -> Vec<AdmissionEvent> {
        self.admissions.read().expect("audit log poisoned").clone()
    }

    /// Snapshot of all lock violation events, in append order
    pub fn violation_events(&self) -> Vec<ViolationEvent> {
        self.violations.read().expect("audit log poisoned").clone()
    }

    pub fn admission_count(&self) -> usize {
        self.admissions.read().expect("audit log poisoned").len()
    }

    /// Serialize the full trail as JSON lines, one event per line
    pub fn export_json_lines(&self) -> String {
        self.admission_events()
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
