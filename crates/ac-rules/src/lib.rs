//! Auto Containers Rule List Tools
//!
//! This crate works on the persisted rule text (`pattern, container` per
//! line): parsing it, validating user edits, and keeping it in canonical
//! most-specific-first order.

pub mod covers;
pub mod edit;
pub mod parser;
pub mod sorter;
pub mod validate;

pub use covers::pattern_covers;
pub use edit::{add_rule, remove_rule, replace_rules, rules_for_container, RuleEditError};
pub use parser::{parse_rules, rules_from_text, ParsedRules, RuleLine, RuleLineError};
pub use sorter::{sort_key, sort_rules, sort_rules_with_stats, SortKey, SortStats};
pub use validate::{
    is_valid_container_name, is_valid_pattern, validate_all, validate_rule_line, validate_rules,
    DefectKind, ValidationError,
};
