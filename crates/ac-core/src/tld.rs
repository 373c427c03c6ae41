//! Top-level domain table for base-domain grouping
//!
//! Rule grouping keys on the label right before the TLD, so `mail.google.com`,
//! `google.*` and `*.google.co.uk` all land in the `google` group. Multi-label
//! suffixes are recognized from a small configurable table rather than the
//! full Public Suffix List.
//!
//! # Examples
//!
//! ```
//! use ac_core::tld::TldList;
//!
//! let tlds = TldList::default();
//! assert_eq!(tlds.registrable_label("sub.example.com"), Some("example"));
//! assert_eq!(tlds.registrable_label("sub.example.co.uk"), Some("example"));
//! ```

/// Multi-label TLDs recognized out of the box.
pub const COMMON_MULTI_LABEL_TLDS: &[&str] = &[
    "co.uk", "org.uk", "gov.uk", "ac.uk",
    "com.au", "net.au", "org.au",
    "co.jp", "ne.jp",
    "com.br",
];

/// Configurable table of multi-label TLDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TldList {
    multi_label: Vec<String>,
}

impl Default for TldList {
    fn default() -> Self {
        Self {
            multi_label: COMMON_MULTI_LABEL_TLDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TldList {
    /// A table with no multi-label entries.
    pub fn empty() -> Self {
        Self { multi_label: Vec::new() }
    }

    /// Extend the table with more multi-label suffixes (e.g. `co.nz`).
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for suffix in extra {
            let suffix = suffix.as_ref().trim().trim_matches('.').to_ascii_lowercase();
            if !suffix.is_empty() && !self.multi_label.contains(&suffix) {
                self.multi_label.push(suffix);
            }
        }
        self
    }

    /// Check if a suffix is one of the configured multi-label TLDs.
    #[inline]
    pub fn is_multi_label(&self, suffix: &str) -> bool {
        self.multi_label.iter().any(|s| s.eq_ignore_ascii_case(suffix))
    }

    /// Number of trailing labels forming the TLD (1 or 2).
    pub fn suffix_len(&self, labels: &[&str]) -> usize {
        let n = labels.len();
        if n >= 2 {
            let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
            if self.is_multi_label(&last_two) {
                return 2;
            }
        }
        1
    }

    /// True when `domain` is nothing but a TLD (`com`, `co.uk`).
    pub fn is_bare_tld(&self, domain: &str) -> bool {
        let labels: Vec<&str> = domain.split('.').collect();
        labels.len() == 1 || (labels.len() == 2 && self.is_multi_label(domain))
    }

    /// The label immediately before the TLD.
    ///
    /// Single-label hosts return themselves; empty hosts return None.
    pub fn registrable_label<'a>(&self, host: &'a str) -> Option<&'a str> {
        if host.is_empty() {
            return None;
        }
        let labels: Vec<&'a str> = host.split('.').collect();
        let n = labels.len();
        if n == 1 {
            return Some(labels[0]);
        }
        let tld_len = self.suffix_len(&labels);
        if n <= tld_len {
            return Some(labels[0]);
        }
        Some(labels[n - tld_len - 1])
    }
}
