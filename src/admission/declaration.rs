//! PAC declarations - one admission request
//!
//! A declaration is immutable once constructed. Optional identity fields are
//! attached with builder methods; their absence skips the corresponding
//! admission stage, but a present field is always enforced.

use crate::activation::ActivationBlock;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

static PAC_ID_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^PAC(-[A-Z0-9]+)+$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("PAC ID cannot be empty")]
    EmptyPacId,

    #[error("Invalid PAC ID format: '{0}' (expected PAC-<SEGMENT>-...)")]
    InvalidPacIdFormat(String),

    #[error("PAC must declare at least one affected scope")]
    NoScopes,
}

/// One admission request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PACDeclaration {
    pub pac_id: String,
    pub acknowledged_locks: BTreeSet<String>,
    pub affected_scopes: BTreeSet<String>,
    pub touched_files: Vec<String>,
    pub executing_agent: Option<String>,
    pub executing_gid: Option<String>,
    pub executing_color: Option<String>,
    pub end_banner_agent: Option<String>,
    pub end_banner_gid: Option<String>,
    pub end_banner_color: Option<String>,
    pub activation_block: Option<ActivationBlock>,
}

impl PACDeclaration {
    pub fn new(
        pac_id: impl Into<String>,
        acknowledged_locks: BTreeSet<String>,
        affected_scopes: BTreeSet<String>,
    ) -> Result<Self, DeclarationError> {
        let pac_id = pac_id.into();
        if pac_id.is_empty() {
            return Err(DeclarationError::EmptyPacId);
        }
        if !PAC_ID_FORMAT.is_match(&pac_id) {
            return Err(DeclarationError::InvalidPacIdFormat(pac_id));
        }
        if affected_scopes.is_empty() {
            return Err(DeclarationError::NoScopes);
        }

        Ok(Self {
            pac_id,
            acknowledged_locks,
            affected_scopes,
            touched_files: Vec::new(),
            executing_agent: None,
            executing_gid: None,
            executing_color: None,
            end_banner_agent: None,
            end_banner_gid: None,
            end_banner_color: None,
            activation_block: None,
        })
    }

    pub fn with_touched_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.touched_files = files.into_iter().collect();
        self
    }

    pub fn with_executing_identity(
        mut self,
        agent: impl Into<String>,
        gid: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        self.executing_agent = Some(agent.into());
        self.executing_gid = Some(gid.into());
        self.executing_color = Some(color.into());
        self
    }

    pub fn with_end_banner(
        mut self,
        agent: impl Into<String>,
        gid: Option<String>,
        color: Option<String>,
    ) -> Self {
        self.end_banner_agent = Some(agent.into());
        self.end_banner_gid = gid;
        self.end_banner_color = color;
        self
    }

    pub fn with_activation_block(mut self, block: ActivationBlock) -> Self {
        self.activation_block = Some(block);
        self
    }

    /// The color gateway stage runs only when both fields are declared
    pub fn has_executing_identity(&self) -> bool {
        self.executing_gid.is_some() && self.executing_color.is_some()
    }

    /// The END banner stage runs only when both triples are declared
    pub fn has_end_banner(&self) -> bool {
        self.executing_agent.is_some() && self.end_banner_agent.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scopes(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_declaration() {
        let declaration = PACDeclaration::new(
            "PAC-TEST-FEATURE-01",
            scopes(&["LOCK-TEST-001"]),
            scopes(&["gateway"]),
        )
        .unwrap();
        assert_eq!(declaration.pac_id, "PAC-TEST-FEATURE-01");
        assert!(declaration.touched_files.is_empty());
        assert!(!declaration.has_executing_identity());
        assert!(!declaration.has_end_banner());
    }

    #[test]
    fn test_empty_pac_id_fails() {
        let err = PACDeclaration::new("", BTreeSet::new(), scopes(&["gateway"])).unwrap_err();
        assert_eq!(err, DeclarationError::EmptyPacId);
    }

    #[test]
    fn test_invalid_pac_id_format_fails() {
        let err =
            PACDeclaration::new("INVALID-ID", BTreeSet::new(), scopes(&["gateway"])).unwrap_err();
        assert_eq!(
            err,
            DeclarationError::InvalidPacIdFormat("INVALID-ID".to_string())
        );
    }

    #[test]
    fn test_no_scopes_fails() {
        let err = PACDeclaration::new("PAC-TEST-FEATURE-01", BTreeSet::new(), BTreeSet::new())
            .unwrap_err();
        assert_eq!(err, DeclarationError::NoScopes);
    }

    #[test]
    fn test_builder_attaches_optional_stages() {
        let declaration = PACDeclaration::new(
            "PAC-CODY-FULL-01",
            scopes(&["LOCK-GATEWAY-001"]),
            scopes(&["gateway"]),
        )
        .unwrap()
        .with_executing_identity("CODY", "GID-01", "BLUE")
        .with_end_banner("CODY", Some("GID-01".to_string()), Some("BLUE".to_string()))
        .with_touched_files(["src/gateway.rs".to_string()]);

        assert!(declaration.has_executing_identity());
        assert!(declaration.has_end_banner());
        assert_eq!(declaration.touched_files.len(), 1);
    }
}
