//! Constitution engine - lock enforcement at runtime and at admission
//!
//! Computes required-lock sets per declared scope, checks forbidden zones,
//! and exposes the runtime assertion primitive. Forbidden zones can never be
//! acknowledged away.

pub mod locks;

use crate::admission::events::{AuditLog, ViolationEvent};
use crate::error::{GovernanceResult, Violation};
use crate::registry::Registry;
use locks::{Lock, TelemetryPolicy};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::error;

/// A touched file matching a forbidden-zone fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneHit {
    pub lock_id: String,
    pub zone: String,
    pub path: String,
}

impl ZoneHit {
    /// The distinguishable entry appended to the missing list
    pub fn missing_entry(&self) -> String {
        format!("FORBIDDEN_ZONE:{}:{}", self.lock_id, self.zone)
    }
}

/// Result of the lock-acknowledgment stage of admission
#[derive(Debug, Clone)]
pub struct AdmissionCheck {
    pub required: BTreeSet<String>,
    /// Unacknowledged required locks plus FORBIDDEN_ZONE entries
    pub missing: Vec<String>,
    pub zone_hits: Vec<ZoneHit>,
}

impl AdmissionCheck {
    pub fn admitted(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Runtime and admission-time lock enforcement over an immutable registry.
pub struct ConstitutionEngine<'r> {
    registry: &'r Registry,
    audit: Arc<AuditLog>,
}

impl<'r> ConstitutionEngine<'r> {
    pub fn new(registry: &'r Registry, audit: Arc<AuditLog>) -> Self {
        Self { registry, audit }
    }

    /// Active locks with zero enforcement mechanisms (registry is invalid if
    /// this is non-empty; re-exposed for re-validation of candidate sources).
    pub fn validate_enforcement_coverage(&self) -> Vec<String> {
        self.registry.validate_enforcement_coverage()
    }

    /// Raising form of `validate_enforcement_coverage`
    pub fn require_enforcement_coverage(&self) -> GovernanceResult<()> {
        let uncovered = self.validate_enforcement_coverage();
        if uncovered.is_empty() {
            Ok(())
        } else {
            Err(Violation::LockEnforcementMissing { lock_ids: uncovered })
        }
    }

    /// Runtime assertion primitive: verify `condition` holds for `lock_id`.
    ///
    /// An unknown lock id is a registry error. A false condition emits a
    /// violation event (when the lock's telemetry policy requires it) and
    /// raises, carrying the lock's declared severity.
    pub fn assert_lock(
        &self,
        lock_id: &str,
        condition: bool,
        context: &str,
    ) -> GovernanceResult<()> {
        let lock = self.registry.lock(lock_id).ok_or_else(|| Violation::LockRegistry {
            reason: format!("unknown lock id '{lock_id}'"),
        })?;

        if condition {
            return Ok(());
        }

        error!(
            lock_id = %lock.lock_id,
            severity = lock.severity.as_str(),
            context,
            "lock violated"
        );

        if lock.violation_policy.telemetry == TelemetryPolicy::Required {
            self.audit.append_violation(ViolationEvent::new(
                lock.lock_id.clone(),
                lock.severity.as_str(),
                context,
            ));
        }

        Err(Violation::LockViolation {
            lock_id: lock.lock_id.clone(),
            severity: lock.severity.as_str().to_string(),
            context: context.to_string(),
        })
    }

    /// Required = union over all active, admission-gated locks whose scope
    /// intersects the affected scopes.
    pub fn required_locks_for_scopes(&self, scopes: &BTreeSet<String>) -> BTreeSet<String> {
        self.registry.locks().required_for_scopes(scopes)
    }

    /// Full admission-stage lock evaluation: missing acknowledgments plus
    /// forbidden-zone hits. Zone entries are appended regardless of
    /// acknowledgment; a forbidden zone always denies.
    pub fn evaluate_admission(
        &self,
        acknowledged: &BTreeSet<String>,
        affected_scopes: &BTreeSet<String>,
        touched_files: &[String],
    ) -> AdmissionCheck {
        let required = self.required_locks_for_scopes(affected_scopes);

        let mut missing: Vec<String> = required.difference(acknowledged).cloned().collect();

        let zone_hits: Vec<ZoneHit> = touched_files
            .iter()
            .filter_map(|path| {
                self.registry
                    .locks()
                    .forbidden_zone_hit(path)
                    .map(|(lock, zone)| ZoneHit {
                        lock_id: lock.lock_id.clone(),
                        zone: zone.to_string(),
                        path: path.clone(),
                    })
            })
            .collect();

        missing.extend(zone_hits.iter().map(ZoneHit::missing_entry));

        AdmissionCheck {
            required,
            missing,
            zone_hits,
        }
    }

    /// (admitted, missing) view of `evaluate_admission`
    pub fn validate_pac_admission(
        &self,
        acknowledged: &BTreeSet<String>,
        affected_scopes: &BTreeSet<String>,
        touched_files: &[String],
    ) -> (bool, Vec<String>) {
        let check = self.evaluate_admission(acknowledged, affected_scopes, touched_files);
        (check.admitted(), check.missing)
    }

    /// First active lock whose forbidden-zone fragment matches the path
    pub fn check_forbidden_zone(&self, path: &str) -> Option<&Lock> {
        self.registry.locks().check_forbidden_zone(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_fixtures::registry;
    use pretty_assertions::assert_eq;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assert_lock_passes_on_true_condition() {
        let reg = registry();
        let audit = Arc::new(AuditLog::new());
        let engine = ConstitutionEngine::new(&reg, Arc::clone(&audit));

        assert!(engine.assert_lock("LOCK-GATEWAY-001", true, "steady state").is_ok());
        assert!(audit.violation_events().is_empty());
    }

    #[test]
    fn test_assert_lock_unknown_id() {
        let reg = registry();
        let engine = ConstitutionEngine::new(&reg, Arc::new(AuditLog::new()));
        let err = engine.assert_lock("LOCK-NOPE-999", true, "x").unwrap_err();
        assert_eq!(err.code(), "LOCK_REGISTRY_ERROR");
    }

    #[test]
    fn test_assert_lock_failure_emits_required_telemetry() {
        let reg = registry();
        let audit = Arc::new(AuditLog::new());
        let engine = ConstitutionEngine::new(&reg, Arc::clone(&audit));

        let err = engine
            .assert_lock("LOCK-GATEWAY-001", false, "wire format drifted")
            .unwrap_err();
        assert_eq!(err.code(), "LOCK_VIOLATION");
        assert!(err.to_string().contains("CRITICAL"));

        let events = audit.violation_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].lock_id, "LOCK-GATEWAY-001");
        assert_eq!(events[0].severity, "CRITICAL");
    }

    #[test]
    fn test_assert_lock_optional_telemetry_not_emitted() {
        let reg = registry();
        let audit = Arc::new(AuditLog::new());
        let engine = ConstitutionEngine::new(&reg, Arc::clone(&audit));

        // LOCK-LINT-004 has telemetry: OPTIONAL
        let err = engine.assert_lock("LOCK-LINT-004", false, "naming").unwrap_err();
        assert_eq!(err.code(), "LOCK_VIOLATION");
        assert!(audit.violation_events().is_empty());
    }

    #[test]
    fn test_required_locks_scope_union() {
        let reg = registry();
        let engine = ConstitutionEngine::new(&reg, Arc::new(AuditLog::new()));

        let required = engine.required_locks_for_scopes(&set(&["gateway", "occ"]));
        assert_eq!(required, set(&["LOCK-GATEWAY-001", "LOCK-OCC-002"]));

        // lint-only enforcement is never required at admission
        assert!(!required.contains("LOCK-LINT-004"));
    }

    #[test]
    fn test_missing_is_exact_set_difference() {
        let reg = registry();
        let engine = ConstitutionEngine::new(&reg, Arc::new(AuditLog::new()));

        let (admitted, missing) = engine.validate_pac_admission(
            &set(&["LOCK-GATEWAY-001"]),
            &set(&["gateway", "occ"]),
            &[],
        );
        assert!(!admitted);
        assert_eq!(missing, vec!["LOCK-OCC-002".to_string()]);
    }

    #[test]
    fn test_forbidden_zone_cannot_be_acknowledged_away() {
        let reg = registry();
        let engine = ConstitutionEngine::new(&reg, Arc::new(AuditLog::new()));

        // acknowledging the zone's own lock changes nothing
        let (admitted, missing) = engine.validate_pac_admission(
            &set(&["LOCK-ZONE-003"]),
            &set(&["governance"]),
            &["settlement/ledger/core.rs".to_string()],
        );
        assert!(!admitted);
        assert_eq!(
            missing,
            vec!["FORBIDDEN_ZONE:LOCK-ZONE-003:settlement/ledger".to_string()]
        );
    }

    #[test]
    fn test_check_forbidden_zone_lookup() {
        let reg = registry();
        let engine = ConstitutionEngine::new(&reg, Arc::new(AuditLog::new()));
        let lock = engine.check_forbidden_zone("settlement/ledger/core.rs").unwrap();
        assert_eq!(lock.lock_id, "LOCK-ZONE-003");
        assert!(engine.check_forbidden_zone("src/lib.rs").is_none());
    }

    #[test]
    fn test_enforcement_coverage_clean_registry() {
        let reg = registry();
        let engine = ConstitutionEngine::new(&reg, Arc::new(AuditLog::new()));
        assert!(engine.validate_enforcement_coverage().is_empty());
        assert!(engine.require_enforcement_coverage().is_ok());
    }
}
