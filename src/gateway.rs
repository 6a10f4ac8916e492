//! Color Gateway - lane authorization enforcement
//!
//! Authorizes a (GID, declared color) pair against the lane table. TEAL is
//! the orchestration color: a fixed claim set may hold it, but no GID may
//! ever use it as an *executing* lane.

use crate::error::{GovernanceResult, Violation};
use crate::registry::colors::Color;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Resolved executing identity returned on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutingIdentity {
    pub agent_name: String,
    pub gid: String,
    pub color: Color,
}

/// The three named identity fields of a PAC header
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacHeader {
    pub agent: Option<String>,
    pub gid: Option<String>,
    pub color: Option<String>,
}

/// Authorizes executing identities against the color lane table.
pub struct ColorGateway<'r> {
    registry: &'r Registry,
}

impl<'r> ColorGateway<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Validate that `gid` may execute in the declared color's lane.
    ///
    /// Rule order is fixed: missing field → unknown color → TEAL (always
    /// denied as executing lane, for every GID) → unknown GID → lane
    /// authorization.
    pub fn validate_execution(
        &self,
        gid: &str,
        declared_color: &str,
        pac_id: Option<&str>,
    ) -> GovernanceResult<ExecutingIdentity> {
        let pac = pac_id.map(str::to_string);

        if gid.trim().is_empty() {
            return Err(Violation::MissingField {
                field: "GID".to_string(),
                pac_id: pac,
            });
        }
        if declared_color.trim().is_empty() {
            return Err(Violation::MissingField {
                field: "EXECUTING COLOR".to_string(),
                pac_id: pac,
            });
        }

        let color = Color::parse(declared_color).ok_or_else(|| Violation::UnknownColor {
            declared: declared_color.to_string(),
            pac_id: pac.clone(),
        })?;

        // TEAL can never be an executing lane - not even for its claim set
        if color == Color::Teal {
            return Err(Violation::TealExecution {
                gid: gid.to_uppercase(),
                pac_id: pac,
            });
        }

        let gid_upper = gid.to_uppercase();
        let agent = self
            .registry
            .agent_by_gid(&gid_upper)
            .ok_or_else(|| Violation::UnknownAgent {
                gid: gid_upper.clone(),
                pac_id: pac.clone(),
            })?;

        let authorized = self
            .registry
            .lanes()
            .authorized_gids(color)
            .map(|gids| gids.contains(&gid_upper))
            .unwrap_or(false);

        if !authorized {
            return Err(Violation::ColorMismatch {
                agent: format!("{} ({})", agent.name, agent.gid),
                declared: declared_color.to_string(),
                canonical: agent.color.to_string(),
                pac_id: pac,
            });
        }

        info!(
            agent = %agent.name,
            gid = %agent.gid,
            color = %color,
            pac_id = pac_id.unwrap_or("unknown"),
            "color gateway passed"
        );

        Ok(ExecutingIdentity {
            agent_name: agent.name.clone(),
            gid: agent.gid.clone(),
            color,
        })
    }

    /// Validate a parsed PAC header. All three named fields must be present
    /// before the execution check runs.
    pub fn validate_pac_header(
        &self,
        header: &PacHeader,
        pac_id: Option<&str>,
    ) -> GovernanceResult<ExecutingIdentity> {
        for (field, value) in [
            ("EXECUTING AGENT", &header.agent),
            ("GID", &header.gid),
            ("EXECUTING COLOR", &header.color),
        ] {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(Violation::MissingField {
                    field: field.to_string(),
                    pac_id: pac_id.map(str::to_string),
                });
            }
        }

        let identity = self.validate_execution(
            header.gid.as_deref().unwrap_or_default(),
            header.color.as_deref().unwrap_or_default(),
            pac_id,
        )?;

        // header agent must resolve to the same canonical identity the GID does
        let claimed = header.agent.as_deref().unwrap_or_default();
        match self.registry.agent_by_name(claimed) {
            Some(agent) if agent.gid == identity.gid => Ok(identity),
            Some(agent) => Err(Violation::GidMismatch {
                agent: agent.name.clone(),
                declared: identity.gid.clone(),
                canonical: agent.gid.clone(),
                pac_id: pac_id.map(str::to_string),
            }),
            None => Err(Violation::InvalidAgent {
                agent: claimed.to_string(),
                pac_id: pac_id.map(str::to_string),
            }),
        }
    }
}
