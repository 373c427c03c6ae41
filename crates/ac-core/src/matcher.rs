//! Rule Pattern Matcher
//!
//! Decides whether a URL falls under a rule pattern. Patterns are compiled
//! once into a [`Pattern`]; compile failures and unparsable URLs never match.

use ::url::Url;
use regex::{Regex, RegexBuilder};

use crate::types::Rule;
use crate::url::{host_of, parse, strip_www};

/// Error type for pattern compilation.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Empty pattern")]
    Empty,
    #[error("Invalid wildcard pattern {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// =============================================================================
// Compiled Pattern
// =============================================================================

#[derive(Debug, Clone)]
enum DomainMatch {
    /// `*` and `*.*`
    Any,
    /// Plain domain, lowercased.
    Exact(String),
    /// `*.base`, `base.*` and free-form globs.
    Regex(Regex),
}

#[derive(Debug, Clone)]
enum PathMatch {
    /// Literal path: equal, or followed by `/` or `?`.
    Prefix(String),
    /// Wildcarded path with an optional trailing `/...`.
    Glob(Regex),
}

#[derive(Debug, Clone)]
struct PathPattern {
    path: PathMatch,
    /// Required query parameters; an empty value means "present, any value".
    query: Vec<(String, String)>,
}

/// A compiled rule pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    domain: DomainMatch,
    path: Option<PathPattern>,
}

impl Pattern {
    /// Compile a rule pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let (domain_part, path) = match pattern.find('/') {
            Some(slash) => (&pattern[..slash], Some(compile_path(pattern, &pattern[slash..])?)),
            None => (pattern, None),
        };

        Ok(Self {
            raw: pattern.to_string(),
            domain: compile_domain(domain_part)?,
            path,
        })
    }

    /// The pattern text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True if the pattern constrains the path or query.
    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    /// Match a bare domain (already stripped of `www.` or not).
    pub fn matches_domain(&self, domain: &str) -> bool {
        let domain = strip_www(domain);
        match &self.domain {
            DomainMatch::Any => true,
            DomainMatch::Exact(exact) => domain.eq_ignore_ascii_case(exact),
            DomainMatch::Regex(re) => re.is_match(domain),
        }
    }

    /// Match a parsed URL.
    pub fn matches_url(&self, url: &Url) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        if !self.matches_domain(host) {
            return false;
        }
        match &self.path {
            None => true,
            Some(path) => path.matches(url),
        }
    }

    /// Match a URL string. Unparsable URLs never match.
    pub fn matches_str(&self, url: &str) -> bool {
        match parse(url) {
            Some(parsed) => self.matches_url(&parsed),
            None => false,
        }
    }
}

impl PathPattern {
    fn matches(&self, url: &Url) -> bool {
        let path = url.path();
        let path_ok = match &self.path {
            PathMatch::Glob(re) => re.is_match(path),
            PathMatch::Prefix(prefix) => path_has_prefix(path, prefix),
        };
        if !path_ok {
            return false;
        }

        self.query.iter().all(|(key, value)| {
            let found = url.query_pairs().find(|(k, _)| k == key.as_str());
            match found {
                None => false,
                Some(_) if value.is_empty() => true,
                Some((_, v)) => v == value.as_str(),
            }
        })
    }
}

#[inline]
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if path == prefix {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest == "/" || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

// =============================================================================
// Compilation
// =============================================================================

/// Translate a `*` glob into an unanchored regex body.
fn glob_to_regex(glob: &str) -> String {
    glob.split('*').map(regex::escape).collect::<Vec<_>>().join(".*")
}

fn build_regex(pattern: &str, source: &str, case_insensitive: bool) -> Result<Regex, PatternError> {
    RegexBuilder::new(source)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| PatternError::Regex {
            pattern: pattern.to_string(),
            source,
        })
}

fn compile_domain(pattern: &str) -> Result<DomainMatch, PatternError> {
    if pattern == "*" || pattern == "*.*" {
        return Ok(DomainMatch::Any);
    }

    let normalized = strip_www(pattern);
    if !normalized.contains('*') {
        return Ok(DomainMatch::Exact(normalized.to_ascii_lowercase()));
    }

    let source = if let Some(base) = normalized.strip_prefix("*.") {
        // The base itself or any subdomain of it.
        let base = glob_to_regex(base);
        format!(r"^(?:{base}|.*\.{base})$")
    } else if let Some(base) = normalized.strip_suffix(".*") {
        // Same label under any alphabetic single-label TLD.
        format!(r"^{}\.[a-zA-Z]{{2,}}$", glob_to_regex(base))
    } else {
        format!("^{}$", glob_to_regex(normalized))
    };

    build_regex(pattern, &source, true).map(DomainMatch::Regex)
}

fn compile_path(pattern: &str, path_and_query: &str) -> Result<PathPattern, PatternError> {
    let (path, query) = match path_and_query.find('?') {
        Some(q) => (&path_and_query[..q], Some(&path_and_query[q + 1..])),
        None => (path_and_query, None),
    };

    let path = if path.contains('*') {
        let source = format!("^{}(/.*)?$", glob_to_regex(path));
        PathMatch::Glob(build_regex(pattern, &source, false)?)
    } else {
        PathMatch::Prefix(path.to_string())
    };

    let query = query
        .map(|q| {
            ::url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    Ok(PathPattern { path, query })
}

// =============================================================================
// Convenience
// =============================================================================

/// Match a URL string against a pattern string, failing closed.
pub fn matches(url: &str, pattern: &str) -> bool {
    match Pattern::parse(pattern) {
        Ok(compiled) => compiled.matches_str(url),
        Err(e) => {
            log::debug!("Pattern {:?} does not compile: {}", pattern, e);
            false
        }
    }
}

/// Match a bare domain against a domain pattern (no path part), failing closed.
pub fn matches_domain(domain: &str, pattern: &str) -> bool {
    match compile_domain(pattern.trim()) {
        Ok(DomainMatch::Any) => true,
        Ok(DomainMatch::Exact(exact)) => strip_www(domain).eq_ignore_ascii_case(&exact),
        Ok(DomainMatch::Regex(re)) => re.is_match(strip_www(domain)),
        Err(_) => false,
    }
}

/// First rule in `rules` whose pattern matches `url`, with its index.
///
/// The URL is parsed once; rules whose pattern fails to compile are skipped.
pub fn first_match<'a>(rules: &'a [Rule], url: &str) -> Option<(usize, &'a Rule)> {
    let parsed = parse(url)?;
    rules.iter().enumerate().find(|(_, rule)| match Pattern::parse(&rule.pattern) {
        Ok(pattern) => pattern.matches_url(&parsed),
        Err(e) => {
            log::debug!("Skipping rule {:?}: {}", rule.pattern, e);
            false
        }
    })
}
