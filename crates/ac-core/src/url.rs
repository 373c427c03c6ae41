//! URL helpers shared by the matcher and the runtime
//!
//! Parsing is delegated to the `url` crate; the helpers here only decide
//! which URLs carry a usable domain.

use ::url::Url;

// =============================================================================
// Blank and Internal Pages
// =============================================================================

/// URLs the browser uses for empty tabs.
pub const BLANK_URLS: &[&str] = &["about:blank", "about:newtab"];

/// Schemes of extension-internal pages, which are never routed.
const EXTENSION_SCHEMES: &[&str] = &["moz-extension://", "chrome-extension://"];

/// True for empty URLs and the blank/new-tab pages.
#[inline]
pub fn is_blank_url(url: &str) -> bool {
    url.is_empty() || BLANK_URLS.contains(&url)
}

/// Same as `is_blank_url` for an optional URL; a missing URL is blank.
#[inline]
pub fn is_blank(url: Option<&str>) -> bool {
    url.map_or(true, is_blank_url)
}

/// True for pages served by an extension.
#[inline]
pub fn is_extension_page(url: &str) -> bool {
    EXTENSION_SCHEMES.iter().any(|s| starts_with_ignore_case(url, s))
}

/// True for http/https URLs, the only ones navigation handling looks at.
#[inline]
pub fn is_web_url(url: &str) -> bool {
    starts_with_ignore_case(url, "https://") || starts_with_ignore_case(url, "http://")
}

#[inline]
fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

// =============================================================================
// Domain Extraction
// =============================================================================

/// Strip a single leading `www.` label.
#[inline]
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Parse a URL, returning None for anything the `url` crate rejects.
pub fn parse(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::debug!("Unparsable URL {:?}: {}", url, e);
            None
        }
    }
}

/// Hostname of a parsed URL without the leading `www.`.
pub fn host_of(url: &Url) -> Option<&str> {
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(strip_www(host)),
        _ => None,
    }
}

/// The routing domain of a URL: its hostname without `www.`.
///
/// Returns None for blank pages, extension pages, `about:` pages and
/// anything without a host. Two URLs are "on the same domain" when this
/// returns equal values.
pub fn domain_of(url: &str) -> Option<String> {
    if is_blank_url(url) || is_extension_page(url) {
        return None;
    }
    let parsed = parse(url)?;
    host_of(&parsed).map(str::to_owned)
}
