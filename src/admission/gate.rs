//! PAC admission gate - the orchestrator
//!
//! Runs the stages in fixed order: activation block → color gateway → END
//! banner → forbidden zones → lock acknowledgments. Any stage failure aborts
//! immediately; the gate attaches a denial event before re-raising and never
//! swallows an error. Stages whose inputs are absent skip cleanly.

use crate::activation::ActivationValidator;
use crate::admission::declaration::PACDeclaration;
use crate::admission::events::{AdmissionEvent, AdmissionOutcome, AuditLog};
use crate::banner::EndBannerValidator;
use crate::constitution::ConstitutionEngine;
use crate::error::{GovernanceResult, Violation};
use crate::gates::ExecutionGates;
use crate::gateway::ColorGateway;
use crate::registry::Registry;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// The admission orchestrator. Holds the immutable registry and the
/// append-only audit log; each `admit` call is an independent attempt with
/// its own gate state.
pub struct AdmissionGate<'r> {
    registry: &'r Registry,
    audit: Arc<AuditLog>,
}

impl<'r> AdmissionGate<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_audit(registry, Arc::new(AuditLog::new()))
    }

    pub fn with_audit(registry: &'r Registry, audit: Arc<AuditLog>) -> Self {
        Self { registry, audit }
    }

    pub fn audit(&self) -> Arc<AuditLog> {
        Arc::clone(&self.audit)
    }

    /// All admission events recorded by this gate, in append order
    pub fn events(&self) -> Vec<AdmissionEvent> {
        self.audit.admission_events()
    }

    /// Run every admission stage in order. Returns the admitted event, or
    /// raises the stage's violation after recording the denial.
    pub fn admit(&self, declaration: &PACDeclaration) -> GovernanceResult<AdmissionEvent> {
        let mut gates = ExecutionGates::new();
        let pac_id = declaration.pac_id.as_str();

        // Stage 1: activation block
        if let Some(block) = &declaration.activation_block {
            let validator = ActivationValidator::new(self.registry);
            if let Err(violation) = validator.validate(block, Some(pac_id)) {
                return Err(self.deny(
                    declaration,
                    AdmissionOutcome::DeniedActivationBlock,
                    violation,
                ));
            }
        }
        gates.mark_activation_validated();

        // Stage 2: color gateway
        if declaration.has_executing_identity() {
            gates.require_activation_before_color_gateway()?;
            let gateway = ColorGateway::new(self.registry);
            if let Err(violation) = gateway.validate_execution(
                declaration.executing_gid.as_deref().unwrap_or_default(),
                declaration.executing_color.as_deref().unwrap_or_default(),
                Some(pac_id),
            ) {
                return Err(self.deny(
                    declaration,
                    AdmissionOutcome::DeniedColorGateway,
                    violation,
                ));
            }
        }
        gates.mark_color_gateway_validated();

        // Stage 3: END banner
        if declaration.has_end_banner() {
            let validator = EndBannerValidator::new(self.registry);
            if let Err(violation) = validator.validate(
                declaration.executing_agent.as_deref().unwrap_or_default(),
                declaration.end_banner_agent.as_deref().unwrap_or_default(),
                declaration.end_banner_gid.as_deref(),
                declaration.end_banner_color.as_deref(),
            ) {
                return Err(self.deny(declaration, AdmissionOutcome::DeniedEndBanner, violation));
            }
        }

        // Stage 4: lock acknowledgments and forbidden zones
        gates.require_activation_before_admission()?;
        let engine = ConstitutionEngine::new(self.registry, Arc::clone(&self.audit));
        let check = engine.evaluate_admission(
            &declaration.acknowledged_locks,
            &declaration.affected_scopes,
            &declaration.touched_files,
        );

        // forbidden zones take precedence over missing acknowledgments
        if let Some(hit) = check.zone_hits.first() {
            let violation = Violation::ForbiddenZone {
                pac_id: pac_id.to_string(),
                lock_id: hit.lock_id.clone(),
                zone: hit.zone.clone(),
                path: hit.path.clone(),
            };
            return Err(self.record(
                declaration,
                AdmissionOutcome::DeniedForbiddenZone,
                &check.required,
                check.missing.clone(),
                violation,
            ));
        }

        if !check.missing.is_empty() {
            let violation = Violation::PacAdmission {
                pac_id: pac_id.to_string(),
                missing: check.missing.clone(),
            };
            return Err(self.record(
                declaration,
                AdmissionOutcome::DeniedMissingLocks,
                &check.required,
                check.missing.clone(),
                violation,
            ));
        }

        gates.mark_admission_validated();
        gates.require_all_passed()?;

        let event = self.build_event(
            declaration,
            AdmissionOutcome::Admitted,
            &check.required,
            Vec::new(),
            format!("PAC {pac_id} admitted"),
        );
        self.audit.append_admission(event.clone());

        info!(pac_id, outcome = event.outcome.as_str(), "PAC admitted");
        Ok(event)
    }

    /// Record a denial for a stage violation, echoing the violation back
    fn deny(
        &self,
        declaration: &PACDeclaration,
        outcome: AdmissionOutcome,
        violation: Violation,
    ) -> Violation {
        let required = ConstitutionEngine::new(self.registry, Arc::clone(&self.audit))
            .required_locks_for_scopes(&declaration.affected_scopes);
        self.record(declaration, outcome, &required, Vec::new(), violation)
    }

    fn record(
        &self,
        declaration: &PACDeclaration,
        outcome: AdmissionOutcome,
        required: &std::collections::BTreeSet<String>,
        missing: Vec<String>,
        violation: Violation,
    ) -> Violation {
        let event = self.build_event(
            declaration,
            outcome,
            required,
            missing,
            format!("[{}] {}", violation.code(), violation),
        );
        self.audit.append_admission(event);

        warn!(
            pac_id = %declaration.pac_id,
            outcome = outcome.as_str(),
            code = violation.code(),
            "PAC denied"
        );
        violation
    }

    fn build_event(
        &self,
        declaration: &PACDeclaration,
        outcome: AdmissionOutcome,
        required: &std::collections::BTreeSet<String>,
        missing: Vec<String>,
        reason: String,
    ) -> AdmissionEvent {
        AdmissionEvent {
            id: Uuid::new_v4(),
            pac_id: declaration.pac_id.clone(),
            outcome,
            acknowledged_locks: declaration.acknowledged_locks.clone(),
            required_locks: required.clone(),
            missing_locks: missing,
            affected_scopes: declaration.affected_scopes.clone(),
            touched_files: declaration.touched_files.clone(),
            reason,
            registry_fingerprint: self.registry.fingerprint().to_string(),
            timestamp: Utc::now(),
        }
    }
}
