//! Error handling module
//!
//! Every governance violation is a typed variant carrying only the fields
//! relevant to that failure, plus a stable violation code that callers must
//! surface verbatim. There is no soft-warn path: a violation is a hard stop.

use thiserror::Error;

/// A governance violation. HARD FAIL: callers must not downgrade or retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    // --- Activation Block ---
    #[error("no activation block provided - execution denied (PAC: {})", .pac_id.as_deref().unwrap_or("unknown"))]
    MissingBlock { pac_id: Option<String> },

    #[error("agent '{agent}' not found in canonical registry")]
    InvalidAgent {
        agent: String,
        pac_id: Option<String>,
    },

    #[error("GID '{declared}' does not match canonical GID '{canonical}' for {agent}")]
    GidMismatch {
        agent: String,
        declared: String,
        canonical: String,
        pac_id: Option<String>,
    },

    #[error("role '{declared}' does not match canonical role '{canonical}' for {agent}")]
    RoleMismatch {
        agent: String,
        declared: String,
        canonical: String,
        pac_id: Option<String>,
    },

    #[error("color '{declared}' does not match canonical color '{canonical}' for {agent}")]
    ColorMismatch {
        agent: String,
        declared: String,
        canonical: String,
        pac_id: Option<String>,
    },

    #[error("emoji '{declared}' does not match canonical emoji '{canonical}' for {agent}")]
    EmojiMismatch {
        agent: String,
        declared: String,
        canonical: String,
        pac_id: Option<String>,
    },

    #[error("lane '{declared}' does not match expected lane '{expected}' for color '{color}'")]
    LaneMismatch {
        agent: String,
        declared: String,
        expected: String,
        color: String,
        pac_id: Option<String>,
    },

    #[error("prohibited actions list cannot be empty")]
    MissingProhibitedActions,

    #[error("persona binding statement cannot be empty")]
    MissingPersonaBinding,

    // --- Structural Integrity ---
    #[error("line {content_line}: execution content '{header}' appears before activation block at line {marker_line}")]
    PositionViolation {
        content_line: usize,
        marker_line: usize,
        header: String,
    },

    #[error("multiple activation blocks detected at lines {lines:?} - exactly one required per execution context")]
    DuplicateBlock { lines: Vec<usize> },

    #[error("header/footer {field} mismatch: header='{header}', footer='{footer}'")]
    StructuralMismatch {
        field: String,
        header: String,
        footer: String,
    },

    #[error("missing required activation field: {field}")]
    MissingRequiredField { field: String },

    // --- Color Gateway ---
    #[error("missing required field for color gateway check: {field}")]
    MissingField {
        field: String,
        pac_id: Option<String>,
    },

    #[error("TEAL is orchestration-only and can never be an executing lane (GID: {gid})")]
    TealExecution {
        gid: String,
        pac_id: Option<String>,
    },

    #[error("GID '{gid}' not found in canonical registry")]
    UnknownAgent {
        gid: String,
        pac_id: Option<String>,
    },

    #[error("unknown color '{declared}'")]
    UnknownColor {
        declared: String,
        pac_id: Option<String>,
    },

    // --- END Banner ---
    #[error("END banner {field} '{observed}' does not match expected '{expected}'")]
    EndBannerViolation {
        field: String,
        observed: String,
        expected: String,
    },

    // --- Constitution / Locks ---
    #[error("lock registry error: {reason}")]
    LockRegistry { reason: String },

    #[error("active locks without enforcement mechanisms: {lock_ids:?}")]
    LockEnforcementMissing { lock_ids: Vec<String> },

    #[error("immutable field mutations detected: {}", .violations.join("; "))]
    MutabilityViolation { violations: Vec<String> },

    #[error("lock {lock_id} violated ({severity}): {context}")]
    LockViolation {
        lock_id: String,
        severity: String,
        context: String,
    },

    // --- Admission ---
    #[error("PAC {pac_id} denied: missing lock acknowledgments: {missing:?}")]
    PacAdmission {
        pac_id: String,
        missing: Vec<String>,
    },

    #[error("PAC {pac_id} denied: '{path}' touches forbidden zone '{zone}' (lock {lock_id})")]
    ForbiddenZone {
        pac_id: String,
        lock_id: String,
        zone: String,
        path: String,
    },

    // --- Execution Gates ---
    #[error("execution gate violation [{gate}]: {reason}")]
    ExecutionGate { gate: String, reason: String },
}

impl Violation {
    /// Stable violation code. Surfaced verbatim to callers and telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            Violation::MissingBlock { .. } => "MISSING_ACTIVATION_BLOCK",
            Violation::InvalidAgent { .. } => "INVALID_AGENT_NAME",
            Violation::GidMismatch { .. } => "GID_AGENT_MISMATCH",
            Violation::RoleMismatch { .. } => "ROLE_MISMATCH",
            Violation::ColorMismatch { .. } => "COLOR_MISMATCH",
            Violation::EmojiMismatch { .. } => "EMOJI_MISMATCH",
            Violation::LaneMismatch { .. } => "LANE_COLOR_MISMATCH",
            Violation::MissingProhibitedActions => "MISSING_PROHIBITED_ACTIONS",
            Violation::MissingPersonaBinding => "MISSING_PERSONA_BINDING",
            Violation::PositionViolation { .. } => "ACTIVATION_BLOCK_POSITION_VIOLATION",
            Violation::DuplicateBlock { .. } => "DUPLICATE_ACTIVATION_BLOCK",
            Violation::StructuralMismatch { .. } => "HEADER_FOOTER_STRUCTURAL_MISMATCH",
            Violation::MissingRequiredField { .. } => "MISSING_REQUIRED_ACTIVATION_FIELD",
            Violation::MissingField { .. } => "MISSING_FIELD",
            Violation::TealExecution { .. } => "TEAL_EXECUTION_DENIED",
            Violation::UnknownAgent { .. } => "UNKNOWN_AGENT",
            Violation::UnknownColor { .. } => "UNKNOWN_COLOR",
            Violation::EndBannerViolation { .. } => "END_BANNER_VIOLATION",
            Violation::LockRegistry { .. } => "LOCK_REGISTRY_ERROR",
            Violation::LockEnforcementMissing { .. } => "LOCK_ENFORCEMENT_MISSING",
            Violation::MutabilityViolation { .. } => "MUTABILITY_VIOLATION",
            Violation::LockViolation { .. } => "LOCK_VIOLATION",
            Violation::PacAdmission { .. } => "PAC_ADMISSION_DENIED",
            Violation::ForbiddenZone { .. } => "FORBIDDEN_ZONE_VIOLATION",
            Violation::ExecutionGate { .. } => "EXECUTION_GATE_VIOLATION",
        }
    }
}

/// Result type alias for governance checks
pub type GovernanceResult<T> = Result<T, Violation>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let v = Violation::TealExecution {
            gid: "GID-00".to_string(),
            pac_id: None,
        };
        assert_eq!(v.code(), "TEAL_EXECUTION_DENIED");

        let v = Violation::GidMismatch {
            agent: "CODY".to_string(),
            declared: "GID-99".to_string(),
            canonical: "GID-01".to_string(),
            pac_id: Some("PAC-CODY-TEST-01".to_string()),
        };
        assert_eq!(v.code(), "GID_AGENT_MISMATCH");
    }

    #[test]
    fn test_messages_carry_context() {
        let v = Violation::ColorMismatch {
            agent: "CODY".to_string(),
            declared: "YELLOW".to_string(),
            canonical: "BLUE".to_string(),
            pac_id: None,
        };
        let msg = v.to_string();
        assert!(msg.contains("YELLOW"));
        assert!(msg.contains("BLUE"));
        assert!(msg.contains("CODY"));
    }
}
