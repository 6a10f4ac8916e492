//! Activation block declaration
//!
//! The identity-binding section of a PAC. Immutable once constructed; a block
//! missing any required element never exists as a value at all.

use crate::error::{GovernanceResult, Violation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A claimed execution identity for one execution context.
///
/// All seven required elements (agent, GID, role, color, emoji, prohibited
/// actions, persona binding) must be non-empty; the lane is declared for
/// verification but derived from the color.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationBlock {
    pub agent_name: String,
    pub gid: String,
    pub role: String,
    pub color: String,
    pub emoji: String,
    pub prohibited_actions: BTreeSet<String>,
    pub persona_binding: String,
    pub lane: Option<String>,
    pub pac_id: Option<String>,
}

impl ActivationBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_name: impl Into<String>,
        gid: impl Into<String>,
        role: impl Into<String>,
        color: impl Into<String>,
        emoji: impl Into<String>,
        prohibited_actions: BTreeSet<String>,
        persona_binding: impl Into<String>,
    ) -> GovernanceResult<Self> {
        let block = Self {
            agent_name: agent_name.into(),
            gid: gid.into(),
            role: role.into(),
            color: color.into(),
            emoji: emoji.into(),
            prohibited_actions,
            persona_binding: persona_binding.into(),
            lane: None,
            pac_id: None,
        };
        block.validate_required_fields()?;
        Ok(block)
    }

    pub fn with_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    pub fn with_pac_id(mut self, pac_id: impl Into<String>) -> Self {
        self.pac_id = Some(pac_id.into());
        self
    }

    fn validate_required_fields(&self) -> GovernanceResult<()> {
        for (field, value) in [
            ("AGENT", &self.agent_name),
            ("GID", &self.gid),
            ("ROLE", &self.role),
            ("COLOR", &self.color),
            ("EMOJI", &self.emoji),
        ] {
            if value.trim().is_empty() {
                return Err(Violation::MissingRequiredField {
                    field: field.to_string(),
                });
            }
        }
        if self.prohibited_actions.is_empty() {
            return Err(Violation::MissingProhibitedActions);
        }
        if self.persona_binding.trim().is_empty() {
            return Err(Violation::MissingPersonaBinding);
        }
        Ok(())
    }
}
