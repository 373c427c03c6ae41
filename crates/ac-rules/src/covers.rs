//! Pairwise covering relation between rule patterns.
//!
//! `pattern_covers(a, b)` approximates "every URL matched by `b` is also
//! matched by `a`". It is a heuristic: `b`'s wildcards are replaced by a
//! fixed sample alphabet and the results are tested against `a`, then a
//! character-level skeleton walk rejects structurally incompatible pairs.
//! It is not a sound subsumption check and need not be transitive.

use std::collections::HashSet;

use regex::Regex;

/// Strings substituted for each wildcard of the covered pattern.
const SAMPLES: [&str; 5] = ["", "test", "example", "a", "subdomain"];

/// Expansion is `SAMPLES.len() ^ wildcards`; beyond this the pair is
/// treated as non-comparable.
const MAX_WILDCARDS: usize = 6;

/// Check if `general` covers `specific`.
pub fn pattern_covers(general: &str, specific: &str) -> bool {
    let Some(cases) = sample_expansions(specific) else {
        log::debug!("Pattern {:?} has too many wildcards to compare", specific);
        return false;
    };

    let regex = match glob_regex(general) {
        Ok(regex) => regex,
        Err(e) => {
            log::debug!("Pattern {:?} does not compile for covering check: {}", general, e);
            return false;
        }
    };

    if !cases.iter().all(|case| regex.is_match(case)) {
        return false;
    }

    structurally_covers(general, specific)
}

/// Anchored, case-sensitive regex of a `*` glob.
fn glob_regex(glob: &str) -> Result<Regex, regex::Error> {
    let body = glob.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
    Regex::new(&format!("^{}$", body))
}

/// Every string obtained by replacing each `*` with each sample, left to
/// right, without duplicates.
fn sample_expansions(pattern: &str) -> Option<Vec<String>> {
    if pattern.matches('*').count() > MAX_WILDCARDS {
        return None;
    }

    let mut pieces = pattern.split('*');
    let mut cases = vec![pieces.next().unwrap_or_default().to_string()];
    for piece in pieces {
        cases = cases
            .iter()
            .flat_map(|prefix| SAMPLES.iter().map(move |sample| format!("{prefix}{sample}{piece}")))
            .collect();
    }

    let mut seen = HashSet::with_capacity(cases.len());
    cases.retain(|case| seen.insert(case.clone()));
    Some(cases)
}

/// Walk `general` over `specific`, letting each `*` skip ahead to the next
/// literal of `general`.
fn structurally_covers(general: &str, specific: &str) -> bool {
    // `*.x` never covers a plain second-level domain like `x.com`.
    if general.starts_with("*.") && !specific.contains('*') {
        let domain = specific.split('/').next().unwrap_or_default();
        let domain = domain.split('?').next().unwrap_or_default();
        if domain.split('.').count() <= 2 {
            return false;
        }
    }

    let g: Vec<char> = general.chars().collect();
    let s: Vec<char> = specific.chars().collect();
    let (mut gi, mut si) = (0usize, 0usize);

    while gi < g.len() && si < s.len() {
        if g[gi] == '*' {
            gi += 1;
            while si < s.len() && gi < g.len() && s[si] != g[gi] {
                si += 1;
            }
        } else if g[gi] == s[si] {
            gi += 1;
            si += 1;
        } else {
            return false;
        }
    }

    // Whatever is left of `general` may only be wildcards.
    g[gi..].iter().all(|&c| c == '*')
}
