//! Structural integrity checks for PAC document text
//!
//! Three line-oriented rules over the scanned token stream:
//! position (activation before any execution content), uniqueness (exactly
//! one activation block), and structure (header/footer symmetry plus
//! required field labels).

pub mod scanner;

use crate::error::Violation;
use scanner::{present_field_labels, scan, LineKind, LineToken, REQUIRED_ACTIVATION_FIELDS};
use thiserror::Error;

/// How many lines after a border may still belong to the same block opening
const BORDER_LOOKAHEAD: usize = 15;

/// Raised by `require_integrity`: the single most severe violation decides
/// the code, every violation message is preserved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("structural integrity violation [{code}]: {}", .messages.join("; "))]
pub struct IntegrityError {
    pub code: &'static str,
    pub messages: Vec<String>,
}

/// Aggregated result of all three structural checks
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub violations: Vec<Violation>,
    pub block_count: usize,
    pub first_marker_line: Option<usize>,
    pub has_content_before_activation: bool,
    pub has_structural_symmetry: bool,
}

impl IntegrityReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check that the activation block appears before any execution content.
/// Returns (ok, violations, first marker line). A document with no marker at
/// all passes here; absence is the uniqueness check's finding.
pub fn check_position(text: &str) -> (bool, Vec<Violation>, Option<usize>) {
    let tokens = scan(text);
    position_check(&tokens)
}

/// Check that exactly one activation block exists.
/// Returns (ok, violations, block count).
pub fn check_single_block(text: &str) -> (bool, Vec<Violation>, usize) {
    let tokens = scan(text);
    single_block_check(&tokens)
}

/// Check header/footer symmetry and required field-label presence.
pub fn check_structure(text: &str) -> (bool, Vec<Violation>) {
    let tokens = scan(text);
    let (_, violations) = structure_check(&tokens, text);
    (violations.is_empty(), violations)
}

/// Run all three checks and aggregate every violation.
pub fn check_integrity(text: &str) -> IntegrityReport {
    let tokens = scan(text);

    let (pos_ok, pos_violations, first_marker_line) = position_check(&tokens);
    let (_, single_violations, block_count) = single_block_check(&tokens);
    let (symmetry_ok, struct_violations) = structure_check(&tokens, text);

    let mut violations = pos_violations;
    violations.extend(single_violations);
    violations.extend(struct_violations);

    IntegrityReport {
        violations,
        block_count,
        first_marker_line,
        has_content_before_activation: !pos_ok,
        has_structural_symmetry: symmetry_ok,
    }
}

/// Validate and raise on any violation.
pub fn require_integrity(text: &str) -> Result<IntegrityReport, IntegrityError> {
    let report = check_integrity(text);
    if report.passed() {
        return Ok(report);
    }

    let code = if report.has_content_before_activation {
        "ACTIVATION_BLOCK_POSITION_VIOLATION"
    } else if report.block_count > 1 {
        "DUPLICATE_ACTIVATION_BLOCK"
    } else if report.block_count == 0 {
        "MISSING_ACTIVATION_BLOCK"
    } else if !report.has_structural_symmetry {
        "HEADER_FOOTER_STRUCTURAL_MISMATCH"
    } else {
        "MISSING_REQUIRED_ACTIVATION_FIELD"
    };

    Err(IntegrityError {
        code,
        messages: report.violations.iter().map(|v| v.to_string()).collect(),
    })
}

fn position_check(tokens: &[LineToken]) -> (bool, Vec<Violation>, Option<usize>) {
    let Some(marker_line) = first_marker_line(tokens) else {
        return (true, Vec::new(), None);
    };

    let violations: Vec<Violation> = tokens
        .iter()
        .take_while(|t| t.number < marker_line)
        .filter_map(|t| match &t.kind {
            LineKind::ExecutionHeader { label } => Some(Violation::PositionViolation {
                content_line: t.number,
                marker_line,
                header: label.clone(),
            }),
            _ => None,
        })
        .collect();

    (violations.is_empty(), violations, Some(marker_line))
}

/// The first explicit marker, or the first border run that opens an identity
/// declaration (GID reference or AGENT mention on the following line).
fn first_marker_line(tokens: &[LineToken]) -> Option<usize> {
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            LineKind::ActivationMarker => return Some(token.number),
            LineKind::Border => {
                if let Some(next) = tokens.get(i + 1) {
                    if next.gid_ref().is_some() || next.text.to_uppercase().contains("AGENT") {
                        return Some(token.number);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn single_block_check(tokens: &[LineToken]) -> (bool, Vec<Violation>, usize) {
    let marker_lines: Vec<usize> = tokens
        .iter()
        .filter(|t| t.kind == LineKind::ActivationMarker)
        .map(|t| t.number)
        .collect();

    // explicit markers take precedence over the structural heuristic
    if !marker_lines.is_empty() {
        if marker_lines.len() > 1 {
            return (
                false,
                vec![Violation::DuplicateBlock {
                    lines: marker_lines.clone(),
                }],
                marker_lines.len(),
            );
        }
        return (true, Vec::new(), 1);
    }

    let candidate_lines = heuristic_block_lines(tokens);
    match candidate_lines.len() {
        0 => (
            false,
            vec![Violation::MissingBlock { pac_id: None }],
            0,
        ),
        1 => (true, Vec::new(), 1),
        _ => (
            false,
            vec![Violation::DuplicateBlock {
                lines: candidate_lines.clone(),
            }],
            candidate_lines.len(),
        ),
    }
}

/// Fallback detection: a border run whose lookahead carries a GID reference
/// and an activation-specific keyword, excluding execution packs.
fn heuristic_block_lines(tokens: &[LineToken]) -> Vec<usize> {
    let mut lines = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != LineKind::Border {
            continue;
        }
        let lookahead: String = tokens[i..tokens.len().min(i + BORDER_LOOKAHEAD)]
            .iter()
            .map(|t| t.text.to_uppercase())
            .collect::<Vec<_>>()
            .join("\n");

        let has_gid = lookahead.contains("GID-");
        let has_activation_keyword = lookahead.contains("ACTIVATION")
            || lookahead.contains("LOCK-")
            || lookahead.contains("PERSONA BINDING")
            || lookahead.contains("PROHIBITED");
        let is_execution_pack = lookahead.contains("EXECUTION PACK")
            || lookahead.contains("EXECUTING AGENT:")
            || lookahead.contains("EXECUTING LANE:");

        if has_gid && has_activation_keyword && !is_execution_pack {
            lines.push(token.number);
        }
    }
    lines
}

fn structure_check(tokens: &[LineToken], text: &str) -> (bool, Vec<Violation>) {
    let mut violations = Vec::new();

    let header = extract_header_triple(tokens);
    let footer = extract_footer_triple(tokens);

    match (&header, &footer) {
        (Some(header), Some(footer)) => {
            if header.agent != footer.agent {
                violations.push(Violation::StructuralMismatch {
                    field: "agent".to_string(),
                    header: header.agent.clone(),
                    footer: footer.agent.clone(),
                });
            }
            if header.gid != footer.gid {
                violations.push(Violation::StructuralMismatch {
                    field: "GID".to_string(),
                    header: header.gid.clone(),
                    footer: footer.gid.clone(),
                });
            }
            if let (Some(header_emoji), Some(footer_emoji)) = (&header.emoji, &footer.emoji) {
                if header_emoji != footer_emoji {
                    violations.push(Violation::StructuralMismatch {
                        field: "emoji".to_string(),
                        header: header_emoji.clone(),
                        footer: footer_emoji.clone(),
                    });
                }
            }
        }
        (Some(_), None) => {
            violations.push(Violation::StructuralMismatch {
                field: "footer".to_string(),
                header: "present".to_string(),
                footer: "missing".to_string(),
            });
        }
        _ => {}
    }

    let symmetry_ok = violations.is_empty();

    let present = present_field_labels(text);
    for label in REQUIRED_ACTIVATION_FIELDS {
        if !present.contains(&label) {
            violations.push(Violation::MissingRequiredField {
                field: label.to_string(),
            });
        }
    }

    (symmetry_ok, violations)
}

#[derive(Debug)]
struct IdentityTriple {
    emoji: Option<String>,
    gid: String,
    agent: String,
}

/// Border run followed closely by a "GID-NN — NAME" line opens the header
fn extract_header_triple(tokens: &[LineToken]) -> Option<IdentityTriple> {
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != LineKind::Border {
            continue;
        }
        for next in tokens.iter().skip(i + 1).take(3) {
            if let Some((gid, agent)) = next.identity_pair() {
                return Some(IdentityTriple {
                    emoji: token.border_glyph(),
                    gid,
                    agent,
                });
            }
        }
    }
    None
}

/// END banner followed closely by a border run closes the footer
fn extract_footer_triple(tokens: &[LineToken]) -> Option<IdentityTriple> {
    for (i, token) in tokens.iter().enumerate() {
        if let LineKind::EndBanner { agent, gid } = &token.kind {
            let emoji = tokens
                .iter()
                .skip(i + 1)
                .take(3)
                .find(|t| t.kind == LineKind::Border)
                .and_then(|t| t.border_glyph());
            return Some(IdentityTriple {
                emoji,
                gid: gid.clone(),
                agent: agent.clone(),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID_PAC: &str = "\
🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵
GID-01 — CODY
AGENT ACTIVATION BLOCK
AGENT: CODY
GID: GID-01
ROLE: Backend Engineering
COLOR: 🔵 BLUE
LANE: Backend Engineering
PERSONA BINDING: ACTIVE
PROHIBITED:
- identity_drift

OBJECTIVE: ship the admission gate
TASKS: implement, test

END — CODY (GID-01)
🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵
";

    #[test]
    fn test_valid_pac_passes_all_checks() {
        let report = check_integrity(VALID_PAC);
        assert_eq!(report.violations, Vec::new());
        assert_eq!(report.block_count, 1);
        assert_eq!(report.first_marker_line, Some(1));
        assert!(report.passed());
        assert!(require_integrity(VALID_PAC).is_ok());
    }

    #[test]
    fn test_objective_before_marker_is_position_violation() {
        let text = format!("OBJECTIVE: sneak work in first\n\n{VALID_PAC}");
        let (ok, violations, marker) = check_position(&text);
        assert!(!ok);
        assert_eq!(violations.len(), 1);
        match &violations[0] {
            Violation::PositionViolation {
                content_line,
                marker_line,
                header,
            } => {
                assert_eq!(*content_line, 1);
                assert_eq!(*marker_line, 3);
                assert_eq!(header, "OBJECTIVE:");
            }
            other => panic!("expected position violation, got {other:?}"),
        }
        assert_eq!(marker, Some(3));

        let err = require_integrity(&text).unwrap_err();
        assert_eq!(err.code, "ACTIVATION_BLOCK_POSITION_VIOLATION");
    }

    #[test]
    fn test_duplicate_markers_report_both_lines() {
        let text = "AGENT ACTIVATION BLOCK\ncontent\nAGENT ACTIVATION BLOCK\n";
        let (ok, violations, count) = check_single_block(text);
        assert!(!ok);
        assert_eq!(count, 2);
        match &violations[0] {
            Violation::DuplicateBlock { lines } => assert_eq!(lines, &vec![1, 3]),
            other => panic!("expected duplicate block, got {other:?}"),
        }

        let err = require_integrity(text).unwrap_err();
        assert_eq!(err.code, "DUPLICATE_ACTIVATION_BLOCK");
    }

    #[test]
    fn test_no_block_at_all() {
        let text = "just some notes\nnothing else\n";
        let (ok, violations, count) = check_single_block(text);
        assert!(!ok);
        assert_eq!(count, 0);
        assert_eq!(violations[0].code(), "MISSING_ACTIVATION_BLOCK");

        let err = require_integrity(text).unwrap_err();
        assert_eq!(err.code, "MISSING_ACTIVATION_BLOCK");
    }

    #[test]
    fn test_heuristic_detects_block_without_marker() {
        let text = "\
🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵
GID-01 — CODY
PERSONA BINDING: ACTIVE
PROHIBITED:
- identity_drift
";
        let (ok, _, count) = check_single_block(text);
        assert!(ok);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_heuristic_excludes_execution_packs() {
        let text = "\
🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵
EXECUTION PACK
EXECUTING AGENT: CODY
GID-01 tasks below
";
        let (_, _, count) = check_single_block(text);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_header_footer_agent_mismatch() {
        let text = VALID_PAC.replace("END — CODY (GID-01)", "END — DAN (GID-01)");
        let (ok, violations) = check_structure(&text);
        assert!(!ok);
        match &violations[0] {
            Violation::StructuralMismatch {
                field,
                header,
                footer,
            } => {
                assert_eq!(field, "agent");
                assert_eq!(header, "CODY");
                assert_eq!(footer, "DAN");
            }
            other => panic!("expected structural mismatch, got {other:?}"),
        }

        let err = require_integrity(&text).unwrap_err();
        assert_eq!(err.code, "HEADER_FOOTER_STRUCTURAL_MISMATCH");
    }

    #[test]
    fn test_header_footer_gid_and_emoji_mismatch() {
        let text = VALID_PAC
            .replace("END — CODY (GID-01)", "END — CODY (GID-07)")
            .replace(
                "END — CODY (GID-07)\n🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵",
                "END — CODY (GID-07)\n🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢",
            );
        let (_, violations) = check_structure(&text);
        let fields: Vec<&str> = violations
            .iter()
            .filter_map(|v| match v {
                Violation::StructuralMismatch { field, .. } => Some(field.as_str()),
                _ => None,
            })
            .collect();
        assert!(fields.contains(&"GID"));
        assert!(fields.contains(&"emoji"));
    }

    #[test]
    fn test_header_without_footer_is_a_violation() {
        let text = "\
🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵
GID-01 — CODY
AGENT ACTIVATION BLOCK
AGENT: CODY
GID: GID-01
ROLE: Backend
COLOR: BLUE
LANE: Backend
PERSONA BINDING: ACTIVE
";
        let (ok, violations) = check_structure(text);
        assert!(!ok);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::StructuralMismatch { field, .. } if field == "footer")));
    }

    #[test]
    fn test_missing_field_labels_reported_individually() {
        let text = "\
AGENT ACTIVATION BLOCK
AGENT: CODY
GID: GID-01
ROLE: Backend
";
        let (_, violations) = check_structure(text);
        let missing: Vec<String> = violations
            .iter()
            .filter_map(|v| match v {
                Violation::MissingRequiredField { field } => Some(field.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["COLOR", "LANE", "PERSONA BINDING"]);

        let err = require_integrity(text).unwrap_err();
        assert_eq!(err.code, "MISSING_REQUIRED_ACTIVATION_FIELD");
        assert!(err.messages.iter().any(|m| m.contains("COLOR")));
    }
}
