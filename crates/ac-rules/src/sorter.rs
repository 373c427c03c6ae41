//! Rule list canonicalization.
//!
//! Rules are grouped by base domain (the label before the TLD), groups are
//! ordered alphabetically with global-TLD wildcards and catch-alls last, and
//! inside a group a pattern is moved after every pattern it covers so the
//! first-match resolver sees the most specific rule first.

use std::cmp::Ordering;
use std::collections::HashMap;

use ac_core::tld::TldList;
use ac_core::types::is_catch_all_pattern;

use crate::covers::pattern_covers;
use crate::parser::parse_rules;

/// Grouping key of a rule pattern.
///
/// Ordered by bucket first: every `Domain` group precedes every
/// `GlobalTld` group, and `CatchAll` is always last.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Base domain label, e.g. `google` for `mail.google.com`.
    Domain(String),
    /// `*.tld` wildcards such as `*.com` or `*.co.uk`.
    GlobalTld(String),
    /// `*`, `*.*` and `*/*`.
    CatchAll,
}

impl SortKey {
    fn bucket(&self) -> u8 {
        match self {
            Self::Domain(_) => 0,
            Self::GlobalTld(_) => 1,
            Self::CatchAll => 2,
        }
    }

    /// The label the key collates on.
    pub fn label(&self) -> &str {
        match self {
            Self::Domain(label) | Self::GlobalTld(label) => label,
            Self::CatchAll => "",
        }
    }

    /// Total order used for groups.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.bucket()
            .cmp(&other.bucket())
            .then_with(|| collate(self.label(), other.label()))
    }
}

/// Counters reported by [`sort_rules_with_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Valid rules emitted.
    pub rules: usize,
    /// Non-empty lines dropped as malformed.
    pub rejected: usize,
    pub groups: usize,
    /// Groups whose relaxation hit the pass bound before settling.
    pub unsettled_groups: usize,
}

// =============================================================================
// Grouping Key
// =============================================================================

/// Compute the grouping key of a pattern.
pub fn sort_key(pattern: &str, tlds: &TldList) -> SortKey {
    if is_catch_all_pattern(pattern) {
        return SortKey::CatchAll;
    }

    let domain = pattern.split('/').next().unwrap_or_default();
    let lowered = domain.to_lowercase();
    let normalized = lowered.strip_prefix("www.").unwrap_or(&lowered).trim();

    let leading_wildcard = normalized.starts_with("*.");
    let stripped = normalized.strip_prefix("*.").unwrap_or(normalized);
    let stripped = stripped.strip_suffix(".*").unwrap_or(stripped).replace('*', "");

    if leading_wildcard && !stripped.is_empty() && tlds.is_bare_tld(&stripped) {
        return SortKey::GlobalTld(stripped);
    }

    if stripped.is_empty() {
        let fallback = if normalized.is_empty() { domain } else { normalized };
        return SortKey::Domain(fallback.to_string());
    }

    match tlds.registrable_label(&stripped) {
        Some(label) => SortKey::Domain(label.to_string()),
        None => SortKey::Domain(normalized.to_string()),
    }
}

/// Case-insensitive collation: `_` < `-` < other punctuation < digits <
/// letters < everything else.
fn collate(a: &str, b: &str) -> Ordering {
    let a = a.chars().flat_map(char::to_lowercase).map(collation_weight);
    let b = b.chars().flat_map(char::to_lowercase).map(collation_weight);
    a.cmp(b)
}

#[inline]
fn collation_weight(c: char) -> (u8, u32) {
    match c {
        '_' => (0, 0),
        '-' => (0, 1),
        '0'..='9' => (2, c as u32),
        'a'..='z' => (3, c as u32),
        c if c.is_ascii() => (1, c as u32),
        c if c.is_alphanumeric() => (4, c as u32),
        c => (1, c as u32),
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Sort a rule list with the default TLD table.
///
/// Malformed lines are dropped. A list with no valid rule is returned
/// unchanged.
pub fn sort_rules(text: &str) -> String {
    sort_rules_with_stats(text, &TldList::default()).0
}

/// Sort a rule list and report what happened.
pub fn sort_rules_with_stats(text: &str, tlds: &TldList) -> (String, SortStats) {
    let parsed = parse_rules(text);
    let mut stats = SortStats {
        rejected: parsed.rejected.len(),
        ..SortStats::default()
    };

    if parsed.is_empty() {
        log::debug!("No valid rules to sort; leaving list untouched");
        return (text.to_string(), stats);
    }

    let mut groups: Vec<(SortKey, Vec<usize>)> = Vec::new();
    let mut group_of: HashMap<SortKey, usize> = HashMap::new();
    for (idx, line) in parsed.rules.iter().enumerate() {
        let key = sort_key(&line.rule.pattern, tlds);
        match group_of.get(&key) {
            Some(&g) => groups[g].1.push(idx),
            None => {
                group_of.insert(key.clone(), groups.len());
                groups.push((key, vec![idx]));
            }
        }
    }

    for (key, members) in groups.iter_mut() {
        if members.len() < 2 {
            continue;
        }
        let patterns: Vec<&str> = members
            .iter()
            .map(|&idx| parsed.rules[idx].rule.pattern.as_str())
            .collect();
        let (order, settled) = relax(&patterns);
        if !settled {
            log::warn!("Rule group {:?} did not settle; keeping last order", key.label());
            stats.unsettled_groups += 1;
        }
        *members = order.into_iter().map(|pos| members[pos]).collect();
    }

    groups.sort_by(|a, b| a.0.compare(&b.0));

    stats.rules = parsed.len();
    stats.groups = groups.len();

    let sorted = groups
        .iter()
        .flat_map(|(_, members)| members.iter())
        .map(|&idx| parsed.rules[idx].text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    (sorted, stats)
}

/// Reorder `patterns` so no pattern precedes one it covers.
///
/// Each pass walks the pairs of the order it started with and moves a
/// covering pattern to just after the covered one. Stops after a pass with
/// no moves, or after `2n` passes. Returns the new order as indexes into
/// `patterns` and whether it settled.
fn relax(patterns: &[&str]) -> (Vec<usize>, bool) {
    let n = patterns.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut covers: HashMap<(usize, usize), bool> = HashMap::new();

    for _ in 0..2 * n {
        let snapshot = order.clone();
        let mut moved = false;

        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (snapshot[i], snapshot[j]);
                if patterns[a] == patterns[b] {
                    continue;
                }
                let (Some(pa), Some(pb)) = (position(&order, a), position(&order, b)) else {
                    continue;
                };
                if pa >= pb {
                    continue;
                }
                let a_covers_b = *covers
                    .entry((a, b))
                    .or_insert_with(|| pattern_covers(patterns[a], patterns[b]));
                if a_covers_b {
                    order.remove(pa);
                    order.insert(pb, a);
                    moved = true;
                }
            }
        }

        if !moved {
            return (order, true);
        }
    }

    (order, false)
}

#[inline]
fn position(order: &[usize], item: usize) -> Option<usize> {
    order.iter().position(|&x| x == item)
}
