//! Activation block validation against the canonical registry
//!
//! All validation is fail-closed: no identity may be inferred or defaulted,
//! and the first failing check determines the reported violation. Checks are
//! never batched.

use crate::activation::block::ActivationBlock;
use crate::error::{GovernanceResult, Violation};
use crate::registry::agents::Agent;
use crate::registry::colors::Color;
use crate::registry::Registry;
use tracing::info;

/// Seniority/title filler ignored when comparing roles
const ROLE_NOISE_WORDS: [&str; 7] = ["SENIOR", "JUNIOR", "LEAD", "CHIEF", "ENGINEER", "LANE", "/"];

/// Validates activation blocks against the canonical registry.
pub struct ActivationValidator<'r> {
    registry: &'r Registry,
}

impl<'r> ActivationValidator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Validate a block against the registry, resolving the canonical agent.
    ///
    /// Check order: agent → GID → role → color → emoji → lane. The first
    /// failure raises immediately.
    pub fn validate(
        &self,
        block: &ActivationBlock,
        pac_id: Option<&str>,
    ) -> GovernanceResult<&'r Agent> {
        let pac = pac_id.map(str::to_string);

        // Step 1: resolve agent from registry
        let agent = self.registry.agent_by_name(&block.agent_name).ok_or_else(|| {
            Violation::InvalidAgent {
                agent: block.agent_name.clone(),
                pac_id: pac.clone(),
            }
        })?;

        // Step 2: GID must match canonical (case-insensitive)
        if block.gid.to_uppercase() != agent.gid {
            return Err(Violation::GidMismatch {
                agent: agent.name.clone(),
                declared: block.gid.clone(),
                canonical: agent.gid.clone(),
                pac_id: pac,
            });
        }

        // Step 3: role must match canonical (rule-bounded fuzzy)
        if !role_matches(&block.role, &agent.role) {
            return Err(Violation::RoleMismatch {
                agent: agent.name.clone(),
                declared: block.role.clone(),
                canonical: agent.role.clone(),
                pac_id: pac,
            });
        }

        // Step 4: color must match canonical after normalization
        if Color::parse(&block.color) != Some(agent.color) {
            return Err(Violation::ColorMismatch {
                agent: agent.name.clone(),
                declared: block.color.clone(),
                canonical: agent.color.to_string(),
                pac_id: pac,
            });
        }

        // Step 5: emoji must match canonical byte-for-byte
        if block.emoji != agent.emoji {
            return Err(Violation::EmojiMismatch {
                agent: agent.name.clone(),
                declared: block.emoji.clone(),
                canonical: agent.emoji.clone(),
                pac_id: pac,
            });
        }

        // Step 6: lane, if declared, must match the lane derived from the
        // agent's color (the raw color name is accepted as equivalent)
        if let Some(declared_lane) = block.lane.as_deref() {
            if let Some(expected_lane) = self.registry.lane_for_color(agent.color) {
                let declared = normalize_lane(declared_lane);
                if declared != normalize_lane(expected_lane)
                    && declared != normalize_lane(agent.color.as_str())
                {
                    return Err(Violation::LaneMismatch {
                        agent: agent.name.clone(),
                        declared: declared_lane.to_string(),
                        expected: expected_lane.to_string(),
                        color: agent.color.to_string(),
                        pac_id: pac,
                    });
                }
            }
        }

        info!(
            agent = %agent.name,
            gid = %agent.gid,
            pac_id = pac_id.unwrap_or("unknown"),
            "activation block validated"
        );

        Ok(agent)
    }

    /// Primary enforcement entrypoint: a missing block always raises.
    pub fn validate_or_raise(
        &self,
        block: Option<&ActivationBlock>,
        pac_id: Option<&str>,
    ) -> GovernanceResult<&'r Agent> {
        let block = block.ok_or_else(|| Violation::MissingBlock {
            pac_id: pac_id.map(str::to_string),
        })?;
        self.validate(block, pac_id)
    }
}

/// Exact match passes; otherwise both roles are tokenized into word sets,
/// the fixed noise-word set is dropped, and a non-empty intersection of the
/// remaining significant words passes.
fn role_matches(declared: &str, canonical: &str) -> bool {
    let declared_upper = declared.to_uppercase();
    let canonical_upper = canonical.to_uppercase();
    if declared_upper == canonical_upper {
        return true;
    }

    let significant = |s: &str| -> std::collections::BTreeSet<String> {
        s.split_whitespace()
            .filter(|w| !ROLE_NOISE_WORDS.contains(w))
            .map(str::to_string)
            .collect()
    };

    significant(&declared_upper)
        .intersection(&significant(&canonical_upper))
        .next()
        .is_some()
}

fn normalize_lane(lane: &str) -> String {
    lane.trim().to_uppercase().replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::block::test_fixtures::cody_block;
    use crate::registry::test_fixtures::registry;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_block_resolves_agent() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let agent = validator.validate(&cody_block(), None).unwrap();
        assert_eq!(agent.name, "CODY");
        assert_eq!(agent.gid, "GID-01");
    }

    #[test]
    fn test_every_canonical_tuple_validates() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        for agent in reg.agents() {
            let block = ActivationBlock::new(
                agent.name.clone(),
                agent.gid.clone(),
                agent.role.clone(),
                agent.color.to_string(),
                agent.emoji.clone(),
                ["identity_drift".to_string()].into_iter().collect(),
                format!("Executing as {}", agent.name),
            )
            .unwrap();
            let resolved = validator.validate(&block, None).unwrap();
            assert_eq!(resolved.gid, agent.gid);
        }
    }

    #[test]
    fn test_unknown_agent() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let mut block = cody_block();
        block.agent_name = "NOBODY".to_string();
        let err = validator.validate(&block, None).unwrap_err();
        assert_eq!(err.code(), "INVALID_AGENT_NAME");
    }

    #[test]
    fn test_gid_mismatch_is_exactly_gid() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let mut block = cody_block();
        block.gid = "GID-99".to_string();
        let err = validator.validate(&block, Some("PAC-CODY-TEST-01")).unwrap_err();
        assert_eq!(err.code(), "GID_AGENT_MISMATCH");
        assert!(err.to_string().contains("GID-01"));
    }

    #[test]
    fn test_gid_comparison_is_case_insensitive() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let mut block = cody_block();
        block.gid = "gid-01".to_string();
        assert!(validator.validate(&block, None).is_ok());
    }

    #[test]
    fn test_color_mismatch_is_exactly_color() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let mut block = cody_block();
        block.color = "YELLOW".to_string();
        let err = validator.validate(&block, None).unwrap_err();
        assert_eq!(err.code(), "COLOR_MISMATCH");
    }

    #[test]
    fn test_emoji_mismatch_is_exactly_emoji() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let mut block = cody_block();
        block.emoji = "🟩".to_string();
        let err = validator.validate(&block, None).unwrap_err();
        assert_eq!(err.code(), "EMOJI_MISMATCH");
    }

    #[test]
    fn test_role_fuzzy_match_shares_significant_word() {
        // "Backend Engineering" vs canonical "Senior Backend Engineer":
        // noise filtering leaves BACKEND in both
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        assert!(validator.validate(&cody_block(), None).is_ok());
    }

    #[test]
    fn test_role_without_overlap_rejected() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let mut block = cody_block();
        block.role = "Senior Pastry Chef".to_string();
        let err = validator.validate(&block, None).unwrap_err();
        assert_eq!(err.code(), "ROLE_MISMATCH");
    }

    #[test]
    fn test_lane_accepts_lane_name_or_color() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);

        let block = cody_block().with_lane("backend-engineering");
        assert!(validator.validate(&block, None).is_ok());

        let block = cody_block().with_lane("BLUE");
        assert!(validator.validate(&block, None).is_ok());

        let block = cody_block().with_lane("Quality Engineering");
        let err = validator.validate(&block, None).unwrap_err();
        assert_eq!(err.code(), "LANE_COLOR_MISMATCH");
    }

    #[test]
    fn test_missing_block_always_raises() {
        let reg = registry();
        let validator = ActivationValidator::new(&reg);
        let err = validator.validate_or_raise(None, Some("PAC-TEST-X-01")).unwrap_err();
        assert_eq!(err.code(), "MISSING_ACTIVATION_BLOCK");
    }
}
