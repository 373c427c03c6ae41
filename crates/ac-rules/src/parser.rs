use ac_core::Rule;

/// A rule together with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    /// 1-based line number in the source text.
    pub line_number: usize,
    /// The trimmed line, emitted verbatim when the list is re-serialized.
    pub text: String,
    pub rule: Rule,
}

/// Reason a non-empty line was not accepted as a rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleLineError {
    #[error("line {line_number}: expected exactly one comma in {text:?}")]
    CommaCount { line_number: usize, text: String },
    #[error("line {line_number}: empty pattern or container name in {text:?}")]
    EmptyField { line_number: usize, text: String },
}

impl RuleLineError {
    pub fn line_number(&self) -> usize {
        match self {
            Self::CommaCount { line_number, .. } | Self::EmptyField { line_number, .. } => *line_number,
        }
    }
}

/// Outcome of parsing a rule list: the valid rules in order plus every
/// rejected line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRules {
    pub rules: Vec<RuleLine>,
    pub rejected: Vec<RuleLineError>,
}

impl ParsedRules {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_rule_line(line_number: usize, raw: &str) -> Result<Option<RuleLine>, RuleLineError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let mut parts = text.split(',');
    let (pattern, container) = match (parts.next(), parts.next(), parts.next()) {
        (Some(pattern), Some(container), None) => (pattern.trim(), container.trim()),
        _ => {
            return Err(RuleLineError::CommaCount {
                line_number,
                text: text.to_string(),
            })
        }
    };

    if pattern.is_empty() || container.is_empty() {
        return Err(RuleLineError::EmptyField {
            line_number,
            text: text.to_string(),
        });
    }

    Ok(Some(RuleLine {
        line_number,
        text: text.to_string(),
        rule: Rule::new(pattern, container),
    }))
}

/// Parse a whole rule list, skipping malformed lines with a warning.
pub fn parse_rules(text: &str) -> ParsedRules {
    let mut parsed = ParsedRules::default();

    for (idx, raw_line) in text.split('\n').enumerate() {
        match parse_rule_line(idx + 1, raw_line) {
            Ok(Some(rule)) => parsed.rules.push(rule),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping invalid rule: {}", e);
                parsed.rejected.push(e);
            }
        }
    }

    parsed
}

/// Just the rules of a list, in stored order.
pub fn rules_from_text(text: &str) -> Vec<Rule> {
    parse_rules(text).rules.into_iter().map(|line| line.rule).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_lines_in_order() {
        let parsed = parse_rules("youtube.com, YT\n\n  *.google.com,   Google  \r\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.rules[0].rule, Rule::new("youtube.com", "YT"));
        assert_eq!(parsed.rules[0].line_number, 1);
        assert_eq!(parsed.rules[1].rule, Rule::new("*.google.com", "Google"));
        assert_eq!(parsed.rules[1].text, "*.google.com,   Google");
        assert_eq!(parsed.rules[1].line_number, 3);
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn rejects_malformed_lines() {
        let parsed = parse_rules("no comma here\na.com, B, C\n, Empty\na.com,  \nok.com, Fine");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.rules[0].rule.pattern, "ok.com");
        assert_eq!(parsed.rejected.len(), 4);
        assert!(matches!(parsed.rejected[0], RuleLineError::CommaCount { line_number: 1, .. }));
        assert!(matches!(parsed.rejected[1], RuleLineError::CommaCount { line_number: 2, .. }));
        assert!(matches!(parsed.rejected[2], RuleLineError::EmptyField { line_number: 3, .. }));
        assert_eq!(parsed.rejected[3].line_number(), 4);
    }

    #[test]
    fn empty_text_has_no_rules() {
        assert!(parse_rules("").is_empty());
        assert!(rules_from_text("  \n\n ").is_empty());
    }
}
