//! Host platform capabilities
//!
//! The runtime never talks to a browser directly. Everything it needs from
//! the host (containers, tabs, persisted settings, user feedback) goes
//! through the async traits below, so the same code runs against the real
//! extension bridge and the in-memory fake used in tests.

use std::fmt;

use ac_core::types::{ContainerKind, ContainerStyle};
use ac_core::DEFAULT_CONTAINER_ID;
use serde::{Deserialize, Serialize};

/// Browser tab id.
pub type TabId = i32;

/// Opaque container (cookie store) id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The browser's default, non-isolated container.
    pub fn default_container() -> Self {
        Self(DEFAULT_CONTAINER_ID.to_string())
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        self.0.is_empty() || self.0 == DEFAULT_CONTAINER_ID
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub style: ContainerStyle,
}

impl Container {
    #[inline]
    pub fn kind(&self) -> ContainerKind {
        ContainerKind::of(&self.name)
    }

    #[inline]
    pub fn is_temporary(&self) -> bool {
        self.kind().is_temporary()
    }
}

/// Snapshot of a tab as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: TabId,
    pub url: Option<String>,
    pub title: Option<String>,
    pub container_id: ContainerId,
    pub window_id: i32,
    pub index: u32,
    pub active: bool,
    pub opener_tab_id: Option<TabId>,
}

impl Tab {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

/// Parameters of a tab to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTab {
    pub url: Option<String>,
    pub container_id: ContainerId,
    pub window_id: i32,
    pub index: u32,
    pub active: bool,
}

impl CreateTab {
    /// Same slot as `tab`, bound to `container_id`.
    pub fn replacing(tab: &Tab, url: Option<String>, container_id: ContainerId) -> Self {
        Self {
            url,
            container_id,
            window_id: tab.window_id,
            index: tab.index,
            active: tab.active,
        }
    }
}

/// Host call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The tab or container is gone (closed concurrently).
    #[error("{0} not found")]
    NotFound(String),
    #[error("platform rejected the request: {0}")]
    Rejected(String),
}

impl PlatformError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// =============================================================================
// Capabilities
// =============================================================================

#[async_trait::async_trait]
pub trait ContainerStore: Send + Sync {
    async fn containers(&self) -> Result<Vec<Container>, PlatformError>;

    async fn find_containers(&self, name: &str) -> Result<Vec<Container>, PlatformError>;

    async fn container(&self, id: &ContainerId) -> Result<Container, PlatformError>;

    async fn create_container(
        &self,
        name: &str,
        style: ContainerStyle,
    ) -> Result<Container, PlatformError>;

    async fn update_container(
        &self,
        id: &ContainerId,
        name: &str,
        style: ContainerStyle,
    ) -> Result<Container, PlatformError>;

    async fn remove_container(&self, id: &ContainerId) -> Result<(), PlatformError>;
}

#[async_trait::async_trait]
pub trait TabStore: Send + Sync {
    async fn tab(&self, id: TabId) -> Result<Tab, PlatformError>;

    /// Tabs currently bound to `container`.
    async fn tabs_in(&self, container: &ContainerId) -> Result<Vec<Tab>, PlatformError>;

    async fn create_tab(&self, params: CreateTab) -> Result<Tab, PlatformError>;

    async fn remove_tab(&self, id: TabId) -> Result<(), PlatformError>;
}

/// Persisted key-value store (extension local storage).
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PlatformError>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), PlatformError>;
}

/// User-visible side effects.
#[async_trait::async_trait]
pub trait Feedback: Send + Sync {
    async fn set_badge(&self, tab: TabId, excluded: bool) -> Result<(), PlatformError>;

    async fn notify(&self, title: &str, message: &str) -> Result<(), PlatformError>;
}

/// Everything the runtime needs from the host.
pub trait Platform: ContainerStore + TabStore + SettingsStore + Feedback + 'static {}

impl<T> Platform for T where T: ContainerStore + TabStore + SettingsStore + Feedback + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_id_default() {
        assert!(ContainerId::default_container().is_default());
        assert!(ContainerId::new("").is_default());
        assert!(!ContainerId::new("firefox-container-1").is_default());
        assert_eq!(ContainerId::from("c1").to_string(), "c1");
    }

    #[test]
    fn test_container_kind() {
        let c = Container {
            id: "c1".into(),
            name: "tmp_4".into(),
            style: ContainerStyle::default(),
        };
        assert!(c.is_temporary());
        assert_eq!(c.kind(), ContainerKind::Temporary(4));
    }

    #[test]
    fn test_container_id_serde() {
        let id: ContainerId = serde_json::from_str("\"firefox-container-3\"").unwrap();
        assert_eq!(id.as_str(), "firefox-container-3");
    }
}
