//! Auto Containers Core Library
//!
//! This crate decides which container a URL belongs to. It has no knowledge
//! of the browser: everything here is a pure function over strings.
//!
//! # Architecture
//!
//! Rules are `pattern, container` pairs kept in priority order. A pattern is
//! either a domain pattern (`example.com`, `*.example.com`, `example.*`,
//! `ex*le.com`) or a domain+path pattern (`example.com/app/*?tab=`). The
//! matcher compiles a pattern once and tests parsed URLs against it.
//!
//! # Modules
//!
//! - `matcher`: Pattern compilation and URL matching
//! - `tld`: Multi-label TLD table used for base-domain grouping
//! - `types`: Containers, styles and rule types
//! - `url`: URL helpers (domain extraction, blank/internal page detection)

pub mod matcher;
pub mod tld;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use matcher::{first_match, matches, Pattern, PatternError};
pub use tld::TldList;
pub use types::{
    ContainerColor, ContainerIcon, ContainerKind, ContainerStyle, Rule, DEFAULT_CONTAINER_ID,
};
pub use self::url::{domain_of, is_blank_url, is_web_url};
