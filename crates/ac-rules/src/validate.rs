//! Strict validation of user-edited rule lists.
//!
//! The parser is lenient and skips what it cannot read; this module is the
//! gate in front of persisting a list and reports the first defect with the
//! offending line.

use std::sync::OnceLock;

use regex::Regex;

/// What is wrong with a rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectKind {
    /// Not exactly one comma.
    Format,
    /// Space before the comma, or none after it.
    Comma,
    Pattern,
    Name,
}

impl DefectKind {
    /// What the message calls the defective part.
    pub fn what(self) -> &'static str {
        match self {
            Self::Format => "rule format",
            Self::Comma => "comma format",
            Self::Pattern => "pattern",
            Self::Name => "container name",
        }
    }

    /// How to write it correctly.
    pub fn hint(self) -> &'static str {
        match self {
            Self::Format => "Each rule must be in the format: Pattern, Name (e.g., youtube.com, YT)",
            Self::Comma => "Format must be: Pattern, Name (no space before comma, space after comma)",
            Self::Pattern => {
                "Pattern must be a valid domain (e.g., google.com, *.google.*, google.*, \
                 *.google.com) or URL path (e.g., google.com/search)"
            }
            Self::Name => {
                "Container name must contain only letters, numbers, spaces, hyphens, or underscores"
            }
        }
    }
}

/// A rejected rule line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {} on line {line_number}: \"{line}\". {}", .kind.what(), .kind.hint())]
pub struct ValidationError {
    /// 1-based line number in the submitted text.
    pub line_number: usize,
    /// The trimmed line.
    pub line: String,
    pub kind: DefectKind,
}

// =============================================================================
// Line Shapes
// =============================================================================

fn comma_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^,\s]+,\s+[^,\s][^,]*$").expect("static regex"))
}

fn pattern_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\*\.)?([a-zA-Z0-9_-]+\.)*([a-zA-Z0-9_*-]+)(\.[a-zA-Z0-9_-]+)*(\.\*)?(/.*)?$",
        )
        .expect("static regex")
    })
}

fn name_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9 _-]+$").expect("static regex"))
}

/// Check whether a pattern is acceptable on its own.
pub fn is_valid_pattern(pattern: &str) -> bool {
    !pattern.is_empty() && (pattern.contains('/') || pattern_shape().is_match(pattern))
}

/// Check whether a container name is acceptable on its own.
pub fn is_valid_container_name(name: &str) -> bool {
    name_shape().is_match(name)
}

// =============================================================================
// Validation
// =============================================================================

/// Validate one line. Blank lines are accepted.
pub fn validate_rule_line(line_number: usize, raw: &str) -> Result<(), ValidationError> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(());
    }

    let defect = |kind| ValidationError {
        line_number,
        line: line.to_string(),
        kind,
    };

    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != 2 {
        return Err(defect(DefectKind::Format));
    }
    if !comma_shape().is_match(line) {
        return Err(defect(DefectKind::Comma));
    }

    let pattern = parts[0].trim();
    let name = parts[1].trim();
    if !is_valid_pattern(pattern) {
        return Err(defect(DefectKind::Pattern));
    }
    if !is_valid_container_name(name) {
        return Err(defect(DefectKind::Name));
    }

    Ok(())
}

/// Validate a whole list, stopping at the first defect. Returns the number
/// of rule lines.
pub fn validate_rules(text: &str) -> Result<usize, ValidationError> {
    let mut count = 0;
    for (idx, line) in text.split('\n').enumerate() {
        validate_rule_line(idx + 1, line)?;
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Every defect of a list, in line order.
pub fn validate_all(text: &str) -> Vec<ValidationError> {
    text.split('\n')
        .enumerate()
        .filter_map(|(idx, line)| validate_rule_line(idx + 1, line).err())
        .collect()
}
