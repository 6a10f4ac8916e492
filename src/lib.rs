//! PacFlow - Governance Enforcement Platform
//!
//! Fail-closed admission gates for PAC execution contexts. A PAC declares an
//! execution context (identity, scope, intended changes); this crate
//! validates the declaration against a canonical, immutable registry before
//! any downstream action is permitted.
//!
//! The pipeline runs in fixed order: activation block binding, structural
//! integrity, color lane authorization, END banner symmetry, and
//! constitutional lock admission. Any stage failure is a hard stop with a
//! typed violation; every attempt appends one immutable event to the audit
//! trail.

pub mod activation;
pub mod admission;
pub mod banner;
pub mod config;
pub mod constitution;
pub mod error;
pub mod gates;
pub mod gateway;
pub mod lint;
pub mod registry;
pub mod structure;

pub use activation::{ActivationBlock, ActivationValidator};
pub use admission::{AdmissionEvent, AdmissionGate, AdmissionOutcome, AuditLog, PACDeclaration};
pub use banner::EndBannerValidator;
pub use constitution::ConstitutionEngine;
pub use error::{GovernanceResult, Violation};
pub use gates::ExecutionGates;
pub use gateway::ColorGateway;
pub use registry::Registry;
