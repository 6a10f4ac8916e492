//! PAC file linting - the thin CLI consumer of the governance checks
//!
//! Runs the structural and identity checks per file and reports every
//! violation code and message verbatim. Exit status is the caller's
//! responsibility; a file either passes completely or fails.

use crate::activation::parse::{extract_pac_id, parse_activation_block, parse_pac_header};
use crate::activation::ActivationValidator;
use crate::gateway::ColorGateway;
use crate::registry::Registry;
use crate::structure;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lint outcome for one file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    pub pac_id: Option<String>,
    /// Rendered as "[CODE] message", surfaced verbatim
    pub violations: Vec<String>,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Run all per-document checks over raw text.
pub fn lint_text(text: &str, registry: &Registry) -> Vec<String> {
    let mut violations = Vec::new();
    let pac_id = extract_pac_id(text);

    // structural integrity
    let report = structure::check_integrity(text);
    violations.extend(
        report
            .violations
            .iter()
            .map(|v| format!("[{}] {}", v.code(), v)),
    );

    // identity binding
    match parse_activation_block(text, registry) {
        Some(block) => {
            let validator = ActivationValidator::new(registry);
            if let Err(v) = validator.validate(&block, pac_id.as_deref()) {
                violations.push(format!("[{}] {}", v.code(), v));
            }
        }
        None if report.block_count > 0 => {
            violations.push(
                "[MISSING_ACTIVATION_BLOCK] activation block present but identity fields could not be parsed"
                    .to_string(),
            );
        }
        None => {}
    }

    // executing lane authorization
    let header = parse_pac_header(text);
    if header.agent.is_some() || header.gid.is_some() || header.color.is_some() {
        let gateway = ColorGateway::new(registry);
        if let Err(v) = gateway.validate_pac_header(&header, pac_id.as_deref()) {
            violations.push(format!("[{}] {}", v.code(), v));
        }
    }

    violations
}

/// Lint one file from disk
pub fn lint_file(path: &Path, registry: &Registry) -> FileReport {
    debug!(path = %path.display(), "linting");
    match std::fs::read_to_string(path) {
        Ok(text) => FileReport {
            path: path.to_path_buf(),
            pac_id: extract_pac_id(&text),
            violations: lint_text(&text, registry),
        },
        Err(e) => FileReport {
            path: path.to_path_buf(),
            pac_id: None,
            violations: vec![format!("[IO_ERROR] failed to read file: {e}")],
        },
    }
}

/// Lint a set of files; returns the reports and whether everything passed
pub fn lint_paths(paths: &[PathBuf], registry: &Registry) -> (Vec<FileReport>, bool) {
    let reports: Vec<FileReport> = paths.iter().map(|p| lint_file(p, registry)).collect();
    let all_passed = reports.iter().all(FileReport::passed);
    (reports, all_passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_fixtures::registry;

    const CLEAN_PAC: &str = "\
PAC-CODY-LINT-01

🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵
GID-01 — CODY
AGENT ACTIVATION BLOCK
AGENT: CODY
EXECUTING AGENT: CODY
GID: GID-01
ROLE: Backend Engineering
EXECUTING COLOR: 🔵 BLUE
LANE: Backend Engineering
PERSONA BINDING: ACTIVE — Executing as CODY
PROHIBITED:
- identity_drift

OBJECTIVE: ship the feature

END — CODY (GID-01)
🔵🔵🔵🔵🔵🔵🔵🔵🔵🔵
";

    #[test]
    fn test_clean_pac_passes() {
        let reg = registry();
        let violations = lint_text(CLEAN_PAC, &reg);
        assert!(violations.is_empty(), "unexpected: {violations:?}");
    }

    #[test]
    fn test_identity_drift_is_reported_verbatim() {
        let reg = registry();
        // a consistently drifted GID passes symmetry but fails registry binding
        let drifted = CLEAN_PAC.replace("GID-01", "GID-99");
        let violations = lint_text(&drifted, &reg);
        assert!(violations
            .iter()
            .any(|v| v.starts_with("[GID_AGENT_MISMATCH]")));
    }

    #[test]
    fn test_structural_violation_reported() {
        let reg = registry();
        let reordered = format!("OBJECTIVE: early content\n\n{CLEAN_PAC}");
        let violations = lint_text(&reordered, &reg);
        assert!(violations
            .iter()
            .any(|v| v.starts_with("[ACTIVATION_BLOCK_POSITION_VIOLATION]")));
    }

    #[test]
    fn test_unreadable_file_fails_closed() {
        let reg = registry();
        let report = lint_file(Path::new("/nonexistent/pac.md"), &reg);
        assert!(!report.passed());
    }
}
