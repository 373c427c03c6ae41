//! Core type definitions for Auto Containers
//!
//! These types are shared by the sorter, the runtime and the bindings. Their
//! serde representation is the one persisted in extension storage.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Cookie store id of the browser's default (non-isolated) container.
pub const DEFAULT_CONTAINER_ID: &str = "firefox-default";

/// Name prefix of temporary containers (`tmp_<n>`).
pub const TEMP_CONTAINER_PREFIX: &str = "tmp_";

// =============================================================================
// Container Colors
// =============================================================================

/// Container color, as understood by the contextual identities API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum ContainerColor {
    #[default]
    Blue,
    Turquoise,
    Green,
    Yellow,
    Orange,
    Red,
    Pink,
    Purple,
    Toolbar,
}

impl ContainerColor {
    /// Every color, in palette order.
    pub const ALL: [ContainerColor; 9] = [
        Self::Blue,
        Self::Turquoise,
        Self::Green,
        Self::Yellow,
        Self::Orange,
        Self::Red,
        Self::Pink,
        Self::Purple,
        Self::Toolbar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Turquoise => "turquoise",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Toolbar => "toolbar",
        }
    }

    /// Parse from the lowercase API name.
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

// =============================================================================
// Container Icons
// =============================================================================

/// Container icon, as understood by the contextual identities API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum ContainerIcon {
    Fingerprint,
    Briefcase,
    Dollar,
    Cart,
    Vacation,
    Gift,
    Food,
    Fruit,
    Pet,
    Tree,
    Chill,
    #[default]
    Circle,
    Fence,
}

impl ContainerIcon {
    /// Every icon, in palette order.
    pub const ALL: [ContainerIcon; 13] = [
        Self::Fingerprint,
        Self::Briefcase,
        Self::Dollar,
        Self::Cart,
        Self::Vacation,
        Self::Gift,
        Self::Food,
        Self::Fruit,
        Self::Pet,
        Self::Tree,
        Self::Chill,
        Self::Circle,
        Self::Fence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fingerprint => "fingerprint",
            Self::Briefcase => "briefcase",
            Self::Dollar => "dollar",
            Self::Cart => "cart",
            Self::Vacation => "vacation",
            Self::Gift => "gift",
            Self::Food => "food",
            Self::Fruit => "fruit",
            Self::Pet => "pet",
            Self::Tree => "tree",
            Self::Chill => "chill",
            Self::Circle => "circle",
            Self::Fence => "fence",
        }
    }

    /// Parse from the lowercase API name.
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_str() == s)
    }
}

// =============================================================================
// Container Style
// =============================================================================

/// Visual style of a container. The default (blue circle) is the baseline
/// used when no saved style exists for a container name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
pub struct ContainerStyle {
    pub color: ContainerColor,
    pub icon: ContainerIcon,
}

impl ContainerStyle {
    pub const fn new(color: ContainerColor, icon: ContainerIcon) -> Self {
        Self { color, icon }
    }
}

// =============================================================================
// Container Kind
// =============================================================================

/// Containers are told apart purely by name shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// User- or rule-named container.
    Permanent,
    /// Auto-created `tmp_<n>` container.
    Temporary(u32),
}

impl ContainerKind {
    /// Classify a container by its name.
    pub fn of(name: &str) -> Self {
        match temp_index(name) {
            Some(n) => Self::Temporary(n),
            None => Self::Permanent,
        }
    }

    #[inline]
    pub fn is_temporary(self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

/// Index of a `tmp_<n>` name, or None for any other name. Indices past
/// `u32::MAX` saturate; the name is still temporary.
pub fn temp_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(TEMP_CONTAINER_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}

/// Name of the temporary container with index `n`.
pub fn temp_name(n: u32) -> String {
    format!("{}{}", TEMP_CONTAINER_PREFIX, n)
}

// =============================================================================
// Rule
// =============================================================================

/// A routing rule: URLs matching `pattern` go to the container `container`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub pattern: String,
    pub container: String,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            container: container.into(),
        }
    }

    /// True for the patterns that match every URL.
    pub fn is_catch_all(&self) -> bool {
        is_catch_all_pattern(&self.pattern)
    }
}

/// Patterns that are forced to the very end of a sorted rule list.
pub fn is_catch_all_pattern(pattern: &str) -> bool {
    matches!(pattern, "*" | "*.*" | "*/*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_index() {
        assert_eq!(temp_index("tmp_0"), Some(0));
        assert_eq!(temp_index("tmp_12"), Some(12));
        assert_eq!(temp_index("tmp_"), None);
        assert_eq!(temp_index("tmp_1a"), None);
        assert_eq!(temp_index("tmp_-1"), None);
        assert_eq!(temp_index("Work"), None);
        assert_eq!(temp_index("xtmp_1"), None);
    }

    #[test]
    fn test_oversized_temp_index_stays_temporary() {
        assert_eq!(temp_index("tmp_4294967295"), Some(u32::MAX));
        assert_eq!(temp_index("tmp_99999999999"), Some(u32::MAX));
        assert!(ContainerKind::of("tmp_99999999999").is_temporary());
        assert!(!ContainerKind::of("tmp_9x").is_temporary());
    }

    #[test]
    fn test_container_kind() {
        assert_eq!(ContainerKind::of("tmp_3"), ContainerKind::Temporary(3));
        assert_eq!(ContainerKind::of("YT"), ContainerKind::Permanent);
        assert!(ContainerKind::of("tmp_7").is_temporary());
    }

    #[test]
    fn test_style_serde_names() {
        let style = ContainerStyle::new(ContainerColor::Turquoise, ContainerIcon::Fingerprint);
        let json = serde_json::to_string(&style).unwrap();
        assert_eq!(json, r#"{"color":"turquoise","icon":"fingerprint"}"#);
        assert_eq!(ContainerStyle::default().color, ContainerColor::Blue);
        assert_eq!(ContainerStyle::default().icon, ContainerIcon::Circle);
    }

    #[test]
    fn test_palette_names_round_trip() {
        for color in ContainerColor::ALL {
            assert_eq!(ContainerColor::from_name(color.as_str()), Some(color));
        }
        for icon in ContainerIcon::ALL {
            assert_eq!(ContainerIcon::from_name(icon.as_str()), Some(icon));
        }
        assert_eq!(ContainerColor::from_name("mauve"), None);
    }

    #[test]
    fn test_catch_all() {
        assert!(Rule::new("*", "X").is_catch_all());
        assert!(Rule::new("*.*", "X").is_catch_all());
        assert!(Rule::new("*/*", "X").is_catch_all());
        assert!(!Rule::new("*.com", "X").is_catch_all());
    }
}
