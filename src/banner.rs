//! END banner enforcement
//!
//! The closing identity banner must agree with the opening declaration. The
//! banner's GID and color are checked against the canonical registry entry
//! for the banner's agent name, not against the header's claims: a banner
//! cannot "confirm" an identity the registry does not recognize.

use crate::error::{GovernanceResult, Violation};
use crate::registry::colors::Color;
use crate::registry::Registry;

pub struct EndBannerValidator<'r> {
    registry: &'r Registry,
}

impl<'r> EndBannerValidator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Validate a closing banner against the executing agent declaration.
    ///
    /// Callers skip this check entirely when either triple is absent; once
    /// both are present the first failing comparison raises.
    pub fn validate(
        &self,
        executing_agent: &str,
        banner_agent: &str,
        banner_gid: Option<&str>,
        banner_color: Option<&str>,
    ) -> GovernanceResult<()> {
        if !banner_agent.eq_ignore_ascii_case(executing_agent) {
            return Err(Violation::EndBannerViolation {
                field: "agent".to_string(),
                observed: banner_agent.to_string(),
                expected: executing_agent.to_string(),
            });
        }

        let agent = self.registry.agent_by_name(banner_agent).ok_or_else(|| {
            Violation::EndBannerViolation {
                field: "agent".to_string(),
                observed: banner_agent.to_string(),
                expected: "a registered agent".to_string(),
            }
        })?;

        if let Some(gid) = banner_gid {
            if gid.to_uppercase() != agent.gid {
                return Err(Violation::EndBannerViolation {
                    field: "GID".to_string(),
                    observed: gid.to_string(),
                    expected: agent.gid.clone(),
                });
            }
        }

        if let Some(color) = banner_color {
            if Color::parse(color) != Some(agent.color) {
                return Err(Violation::EndBannerViolation {
                    field: "color".to_string(),
                    observed: color.to_string(),
                    expected: agent.color.to_string(),
                });
            }
        }

        Ok(())
    }
}
