//! Line scanner for PAC document text
//!
//! Classifies each line into a typed token so the position, uniqueness and
//! symmetry checks operate on one unambiguous intermediate representation
//! instead of re-scanning raw text per rule.

use once_cell::sync::Lazy;
use regex::Regex;

/// Glyphs that make up an activation block border run
const BORDER_GLYPHS: &str = "🔵⚪🟣🟨🟦🟧🟥🟩🟢🩷🔷";

/// Minimum run length for a border line
const BORDER_RUN: usize = 10;

/// Field labels that must all appear somewhere in a PAC document
pub const REQUIRED_ACTIVATION_FIELDS: [&str; 6] =
    ["AGENT", "GID", "ROLE", "COLOR", "LANE", "PERSONA BINDING"];

static ACTIVATION_MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)AGENT\s+ACTIVATION\s+BLOCK").unwrap());

static END_BANNER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bEND\b\s*[—–/-]\s*([A-Za-z0-9]+(?:-[A-Za-z0-9]+)?)\s*\(?(GID-\d+)\)?").unwrap()
});

static GID_REF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(GID-\d+)\b").unwrap());

static IDENTITY_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(GID-\d+)\s*[—–/-]\s*([A-Za-z0-9]+(?:-[A-Za-z0-9]+)?)").unwrap()
});

/// Execution-relevant content headers. Any of these before the activation
/// block is a position violation.
static EXECUTION_HEADER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^OBJECTIVE\s*:",
        r"(?i)^SCOPE\s*:",
        r"(?i)^TASKS?\s*:",
        r"(?i)^OUTPUTS?\s*:",
        r"(?i)^ACCEPTANCE\s+CRITERIA",
        r"(?i)^EXECUTING\s+AGENT\s*:",
        r"(?i)^EXECUTING\s+LANE\s*:",
        r"(?i)^AUTHORIZED\s+FILES?\s*:",
        r"(?i)^REQUIRED\s+TASKS?\s*:",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Classification of one document line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Explicit "AGENT ACTIVATION BLOCK" marker
    ActivationMarker,
    /// A run of border glyphs opening or closing a block
    Border,
    /// Closing identity banner: END — NAME (GID-NN)
    EndBanner { agent: String, gid: String },
    /// Execution-relevant content header (OBJECTIVE:, SCOPE:, ...)
    ExecutionHeader { label: String },
    /// Anything else
    Content,
}

/// One scanned line, 1-indexed
#[derive(Debug, Clone)]
pub struct LineToken {
    pub number: usize,
    pub kind: LineKind,
    pub text: String,
}

impl LineToken {
    /// First GID reference on this line, if any
    pub fn gid_ref(&self) -> Option<String> {
        GID_REF_PATTERN
            .captures(&self.text)
            .map(|c| c[1].to_uppercase())
    }

    /// "GID-NN — NAME" identity pair on this line, if any
    pub fn identity_pair(&self) -> Option<(String, String)> {
        IDENTITY_LINE_PATTERN
            .captures(&self.text)
            .map(|c| (c[1].to_uppercase(), c[2].to_uppercase()))
    }

    /// First border glyph of a border line (the block's emoji)
    pub fn border_glyph(&self) -> Option<String> {
        if self.kind != LineKind::Border {
            return None;
        }
        self.text.trim().chars().next().map(|c| c.to_string())
    }
}

/// Scan document text into a typed token stream.
pub fn scan(text: &str) -> Vec<LineToken> {
    text.lines()
        .enumerate()
        .map(|(i, line)| LineToken {
            number: i + 1,
            kind: classify(line),
            text: line.to_string(),
        })
        .collect()
}

fn classify(line: &str) -> LineKind {
    if ACTIVATION_MARKER_PATTERN.is_match(line) {
        return LineKind::ActivationMarker;
    }
    if is_border(line) {
        return LineKind::Border;
    }
    if let Some(captures) = END_BANNER_PATTERN.captures(line) {
        return LineKind::EndBanner {
            agent: captures[1].to_uppercase(),
            gid: captures[2].to_uppercase(),
        };
    }
    for pattern in EXECUTION_HEADER_PATTERNS.iter() {
        if let Some(m) = pattern.find(line) {
            return LineKind::ExecutionHeader {
                label: m.as_str().trim().to_string(),
            };
        }
    }
    LineKind::Content
}

fn is_border(line: &str) -> bool {
    let glyphs: Vec<char> = line.trim().chars().collect();
    glyphs.len() >= BORDER_RUN && glyphs[..BORDER_RUN].iter().all(|c| BORDER_GLYPHS.contains(*c))
}

/// Which of the required field labels appear anywhere in the text.
/// Label presence is order-insensitive and checked with the same lenient
/// separators the documents actually use ("LABEL:" or "LABEL —").
pub fn present_field_labels(text: &str) -> Vec<&'static str> {
    let upper = text.to_uppercase();
    REQUIRED_ACTIVATION_FIELDS
        .iter()
        .copied()
        .filter(|label| {
            let found = [
                format!("{label}:"),
                format!("{label} :"),
                format!("{label}—"),
                format!("{label} —"),
            ]
            .iter()
            .any(|p| upper.contains(p.as_str()));
            // PERSONA BINDING may appear split across a banner line
            found
                || (*label == "PERSONA BINDING"
                    && upper.contains("PERSONA")
                    && upper.contains("BINDING"))
        })
        .collect()
}
