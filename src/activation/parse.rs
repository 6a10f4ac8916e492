//! Activation block extraction from raw PAC text
//!
//! Best-effort, fail-closed parsing for the file-lint path: missing fields
//! yield no block at all, never a defaulted identity. The parsed block still
//! has to pass full registry validation afterwards.

use crate::activation::block::ActivationBlock;
use crate::gateway::PacHeader;
use crate::registry::colors::COLOR_EMOJI;
use crate::registry::Registry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static EXECUTING_AGENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)EXECUTING\s+AGENT\s*[:\-—]\s*([A-Za-z0-9]+(?:-[A-Za-z0-9]+)?)").unwrap()
});

static GID_REF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(GID-\d+)\b").unwrap());

static COLOR_LINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:EXECUTING\s+)?COLOR\s*[:\-—]\s*(.+)").unwrap());

static ROLE_LINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*ROLE\s*[:\-—]\s*(.+)$").unwrap());

// case-sensitive: docstring-style "lane: description" must not match
static LANE_LINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*LANE\s*[:\-—]\s*(.+)$").unwrap());

static PERSONA_BINDING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:I\s+am|This\s+is|Operating\s+as|Executing\s+as)\s+\S+").unwrap()
});

static PROHIBITED_HEADER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PROHIBITED|FORBIDDEN|NOT\s+ALLOWED|MUST\s+NOT").unwrap());

static BULLET_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[•\-\*]\s*(.+)$").unwrap());

static PAC_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(PAC(?:-[A-Z0-9]+)+)\b").unwrap());

/// Extract the first PAC id reference from document text
pub fn extract_pac_id(text: &str) -> Option<String> {
    PAC_ID_PATTERN
        .captures(text)
        .map(|c| c[1].to_string())
}

/// Extract the executing-identity header triple. Fields that are not
/// declared stay `None`; the gateway decides whether that is acceptable.
pub fn parse_pac_header(text: &str) -> PacHeader {
    let agent = EXECUTING_AGENT_PATTERN
        .captures(text)
        .map(|c| c[1].to_string());
    let gid = GID_REF_PATTERN
        .captures(text)
        .map(|c| c[1].to_uppercase());
    let color = COLOR_LINE_PATTERN
        .captures(text)
        .map(|c| strip_emoji(c[1].trim()));

    PacHeader { agent, gid, color }
}

/// Parse an activation block out of PAC text.
///
/// Returns None when the identity elements cannot all be recovered. The
/// registry is consulted only to fill the canonical emoji/role when the text
/// declares a color without a glyph - the resulting block is still validated
/// against the registry by the caller, so a wrong fill fails there.
pub fn parse_activation_block(text: &str, registry: &Registry) -> Option<ActivationBlock> {
    let agent_name = EXECUTING_AGENT_PATTERN.captures(text)?[1].to_string();
    let gid = GID_REF_PATTERN.captures(text)?[1].to_uppercase();
    let color_raw = COLOR_LINE_PATTERN.captures(text)?[1].trim().to_string();

    let mut emoji = leading_emoji(&color_raw);
    let color = strip_emoji(&color_raw);

    let canonical = registry.agent_by_name(&agent_name);
    if emoji.is_empty() {
        emoji = canonical.map(|a| a.emoji.clone()).unwrap_or_default();
    }

    let role = text
        .lines()
        .filter(|line| !line.to_uppercase().contains("EXECUTION ROLE"))
        .find_map(|line| ROLE_LINE_PATTERN.captures(line))
        .map(|c| c[1].trim().to_string())
        .or_else(|| canonical.map(|a| a.role.clone()))
        .unwrap_or_else(|| "Unknown".to_string());

    let lane = text
        .lines()
        .find_map(|line| LANE_LINE_PATTERN.captures(line))
        .map(|c| c[1].trim().to_string());

    let prohibited = parse_prohibited_actions(text);
    let persona = PERSONA_BINDING_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| format!("Executing as {agent_name}"));

    let block = ActivationBlock::new(
        agent_name,
        gid,
        role,
        color.to_uppercase(),
        emoji,
        prohibited,
        persona,
    )
    .ok()?;

    let block = match lane {
        Some(lane) => block.with_lane(lane),
        None => block,
    };
    Some(match extract_pac_id(text) {
        Some(pac_id) => block.with_pac_id(pac_id),
        None => block,
    })
}

/// Bulleted entries following a PROHIBITED/FORBIDDEN header; the fixed
/// default set applies when a PAC declares the section without bullets.
fn parse_prohibited_actions(text: &str) -> BTreeSet<String> {
    let mut actions = BTreeSet::new();
    let mut in_section = false;

    for line in text.lines() {
        if PROHIBITED_HEADER_PATTERN.is_match(line) {
            in_section = true;
            continue;
        }
        if in_section {
            if let Some(captures) = BULLET_PATTERN.captures(line) {
                actions.insert(captures[1].trim().to_string());
            } else if line.trim().is_empty() {
                in_section = false;
            }
        }
    }

    if actions.is_empty() {
        actions = [
            "identity_drift".to_string(),
            "color_violation".to_string(),
            "unauthorized_execution".to_string(),
        ]
        .into_iter()
        .collect();
    }
    actions
}

fn leading_emoji(value: &str) -> String {
    value
        .chars()
        .take_while(|c| COLOR_EMOJI.contains(*c))
        .collect()
}

fn strip_emoji(value: &str) -> String {
    value
        .chars()
        .filter(|c| !COLOR_EMOJI.contains(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_fixtures::registry;
    use pretty_assertions::assert_eq;

    const PAC_TEXT: &str = "\
PAC-CODY-SAMPLE-01

AGENT ACTIVATION BLOCK
EXECUTING AGENT: CODY
GID: GID-01
EXECUTING COLOR: 🔵 BLUE
ROLE: Backend Engineering
LANE: Backend Engineering
PROHIBITED ACTIONS:
- identity_drift
- color_violation

PERSONA BINDING: ACTIVE - Executing as CODY
";

    #[test]
    fn test_parse_full_block() {
        let reg = registry();
        let block = parse_activation_block(PAC_TEXT, &reg).unwrap();
        assert_eq!(block.agent_name, "CODY");
        assert_eq!(block.gid, "GID-01");
        assert_eq!(block.color, "BLUE");
        assert_eq!(block.emoji, "🔵");
        assert_eq!(block.role, "Backend Engineering");
        assert_eq!(block.lane.as_deref(), Some("Backend Engineering"));
        assert!(block.prohibited_actions.contains("identity_drift"));
        assert_eq!(block.pac_id.as_deref(), Some("PAC-CODY-SAMPLE-01"));
    }

    #[test]
    fn test_missing_agent_yields_none() {
        let reg = registry();
        assert!(parse_activation_block("GID: GID-01\nCOLOR: BLUE\n", &reg).is_none());
    }

    #[test]
    fn test_emoji_filled_from_registry_when_absent() {
        let reg = registry();
        let text = PAC_TEXT.replace("🔵 ", "");
        let block = parse_activation_block(&text, &reg).unwrap();
        assert_eq!(block.emoji, "🔵");
    }

    #[test]
    fn test_default_prohibited_actions() {
        let reg = registry();
        let text = "\
EXECUTING AGENT: CODY
GID: GID-01
EXECUTING COLOR: BLUE
Executing as CODY
";
        let block = parse_activation_block(text, &reg).unwrap();
        assert!(block.prohibited_actions.contains("identity_drift"));
        assert!(block.prohibited_actions.contains("unauthorized_execution"));
    }

    #[test]
    fn test_parse_pac_header() {
        let header = parse_pac_header(PAC_TEXT);
        assert_eq!(header.agent.as_deref(), Some("CODY"));
        assert_eq!(header.gid.as_deref(), Some("GID-01"));
        assert_eq!(header.color.as_deref(), Some("BLUE"));
    }

    #[test]
    fn test_extract_pac_id() {
        assert_eq!(
            extract_pac_id(PAC_TEXT).as_deref(),
            Some("PAC-CODY-SAMPLE-01")
        );
        assert_eq!(extract_pac_id("no id here"), None);
    }
}
