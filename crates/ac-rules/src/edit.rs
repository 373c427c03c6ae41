//! Line-level edits of a stored rule list, as made from the popup.
//!
//! Every function takes the current text and returns the new text; the
//! caller persists it and re-sorts when it wants canonical order.

use crate::parser::{parse_rules, RuleLine};
use crate::validate::{validate_rule_line, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum RuleEditError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("A rule for pattern {0:?} already exists")]
    DuplicatePattern(String),
}

fn kept_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(str::trim).filter(|line| !line.is_empty())
}

/// Append `pattern, container`, refusing a pattern that already has a rule.
pub fn add_rule(text: &str, pattern: &str, container: &str) -> Result<String, RuleEditError> {
    let pattern = pattern.trim();
    let line = format!("{}, {}", pattern, container.trim());
    validate_rule_line(1, &line)?;

    if parse_rules(text).rules.iter().any(|r| r.rule.pattern == pattern) {
        return Err(RuleEditError::DuplicatePattern(pattern.to_string()));
    }

    let mut lines: Vec<&str> = kept_lines(text).collect();
    lines.push(&line);
    Ok(lines.join("\n"))
}

/// Drop every line equal to `line` (after trimming). Blank lines go too.
pub fn remove_rule(text: &str, line: &str) -> String {
    let target = line.trim();
    kept_lines(text)
        .filter(|l| *l != target)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `old` lines and append `new` ones, validating the new lines first.
///
/// `new` is indexed from 1 in errors.
pub fn replace_rules(text: &str, old: &[&str], new: &[&str]) -> Result<String, RuleEditError> {
    for (idx, line) in new.iter().enumerate() {
        validate_rule_line(idx + 1, line)?;
    }

    let mut lines: Vec<&str> = kept_lines(text)
        .filter(|l| !old.iter().any(|o| o.trim() == *l))
        .collect();
    lines.extend(new.iter().map(|l| l.trim()).filter(|l| !l.is_empty()));
    Ok(lines.join("\n"))
}

/// The rules pointing at `container`, in stored order.
pub fn rules_for_container(text: &str, container: &str) -> Vec<RuleLine> {
    parse_rules(text)
        .rules
        .into_iter()
        .filter(|line| line.rule.container == container)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "youtube.com, YT\n\n*.google.com, Google\nmail.google.com, Google";

    #[test]
    fn test_add_rule() {
        let text = add_rule(LIST, " reddit.com ", "Social").unwrap();
        assert_eq!(
            text,
            "youtube.com, YT\n*.google.com, Google\nmail.google.com, Google\nreddit.com, Social"
        );
        assert_eq!(add_rule("", "a.com", "A").unwrap(), "a.com, A");
    }

    #[test]
    fn test_add_rule_rejects() {
        assert!(matches!(
            add_rule(LIST, "youtube.com", "Other"),
            Err(RuleEditError::DuplicatePattern(p)) if p == "youtube.com"
        ));
        assert!(matches!(add_rule(LIST, "bad!.com", "X"), Err(RuleEditError::Invalid(_))));
        assert!(matches!(add_rule(LIST, "ok.com", "N@me"), Err(RuleEditError::Invalid(_))));
    }

    #[test]
    fn test_remove_rule() {
        assert_eq!(
            remove_rule(LIST, " *.google.com, Google "),
            "youtube.com, YT\nmail.google.com, Google"
        );
        assert_eq!(remove_rule(LIST, "missing.com, X"), remove_rule(LIST, ""));
    }

    #[test]
    fn test_replace_rules() {
        let text = replace_rules(
            LIST,
            &["*.google.com, Google", "mail.google.com, Google"],
            &["*.google.com, Work"],
        )
        .unwrap();
        assert_eq!(text, "youtube.com, YT\n*.google.com, Work");

        let err = replace_rules(LIST, &[], &["ok.com, A", "bad.com,B"]).unwrap_err();
        match err {
            RuleEditError::Invalid(e) => assert_eq!(e.line_number, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rules_for_container() {
        let google = rules_for_container(LIST, "Google");
        assert_eq!(google.len(), 2);
        assert_eq!(google[0].rule.pattern, "*.google.com");
        assert_eq!(google[1].line_number, 4);
        assert!(rules_for_container(LIST, "google").is_empty());
    }
}
