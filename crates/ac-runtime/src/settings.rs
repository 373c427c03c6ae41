//! Persisted settings and runtime configuration
//!
//! The extension keeps four keys in local storage. Values are read lazily on
//! every use so edits made by the options page apply without a restart.

use std::collections::BTreeMap;
use std::time::Duration;

use ac_core::types::{ContainerColor, ContainerIcon, ContainerStyle};
use ac_core::TldList;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};
use crate::platform::SettingsStore;

pub const RULES_KEY: &str = "rules";
pub const TEMP_CONTAINER_STYLE_KEY: &str = "tempContainerStyle";
pub const CONTAINER_STYLES_KEY: &str = "containerStyles";
pub const NOTIFICATIONS_KEY: &str = "notifications";

/// Style of newly created temporary containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TempContainerStyle {
    pub color: Option<ContainerColor>,
    pub icon: Option<ContainerIcon>,
    pub random_color: bool,
    pub random_icon: bool,
}

impl Default for TempContainerStyle {
    fn default() -> Self {
        Self {
            color: Some(ContainerColor::Blue),
            icon: Some(ContainerIcon::Circle),
            random_color: false,
            random_icon: false,
        }
    }
}

impl TempContainerStyle {
    /// Concrete style for one new container.
    pub fn pick(&self, rng: &mut fastrand::Rng) -> ContainerStyle {
        let color = if self.random_color {
            ContainerColor::ALL[rng.usize(..ContainerColor::ALL.len())]
        } else {
            self.color.unwrap_or_default()
        };
        let icon = if self.random_icon {
            ContainerIcon::ALL[rng.usize(..ContainerIcon::ALL.len())]
        } else {
            self.icon.unwrap_or_default()
        };
        ContainerStyle::new(color, icon)
    }
}

/// Saved style per container name.
pub type ContainerStyles = BTreeMap<String, ContainerStyle>;

/// The whole persisted document, as exported by the options page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredSettings {
    pub rules: String,
    pub temp_container_style: TempContainerStyle,
    pub container_styles: ContainerStyles,
    pub notifications: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            rules: String::new(),
            temp_container_style: TempContainerStyle::default(),
            container_styles: ContainerStyles::new(),
            notifications: true,
        }
    }
}

// =============================================================================
// Store Access
// =============================================================================

/// Typed view over a [`SettingsStore`].
pub struct Settings<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: SettingsStore + ?Sized> Settings<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn read<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| RuntimeError::Settings { key, source }),
        }
    }

    async fn write<T: Serialize>(&self, key: &'static str, value: &T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|source| RuntimeError::Settings { key, source })?;
        self.store.set(key, value).await?;
        Ok(())
    }

    /// Read a key, falling back to the default when it is malformed.
    async fn read_or_default<T: DeserializeOwned + Default>(&self, key: &'static str) -> Result<T> {
        match self.read(key).await {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(RuntimeError::Settings { key, source }) => {
                log::warn!("Ignoring malformed setting {:?}: {}", key, source);
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn rules(&self) -> Result<String> {
        self.read_or_default(RULES_KEY).await
    }

    pub async fn set_rules(&self, rules: &str) -> Result<()> {
        self.write(RULES_KEY, &rules).await
    }

    pub async fn container_styles(&self) -> Result<ContainerStyles> {
        self.read_or_default(CONTAINER_STYLES_KEY).await
    }

    pub async fn set_container_styles(&self, styles: &ContainerStyles) -> Result<()> {
        self.write(CONTAINER_STYLES_KEY, styles).await
    }

    /// Saved style for a container name, or the baseline style.
    pub async fn style_for(&self, name: &str) -> Result<ContainerStyle> {
        Ok(self.container_styles().await?.get(name).copied().unwrap_or_default())
    }

    pub async fn temp_container_style(&self) -> Result<TempContainerStyle> {
        self.read_or_default(TEMP_CONTAINER_STYLE_KEY).await
    }

    pub async fn notifications_enabled(&self) -> Result<bool> {
        match self.read::<bool>(NOTIFICATIONS_KEY).await {
            Ok(value) => Ok(value.unwrap_or(true)),
            Err(RuntimeError::Settings { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Load every key at once.
    pub async fn load(&self) -> Result<StoredSettings> {
        Ok(StoredSettings {
            rules: self.rules().await?,
            temp_container_style: self.temp_container_style().await?,
            container_styles: self.container_styles().await?,
            notifications: self.notifications_enabled().await?,
        })
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Tunables that are not user settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How long an empty temporary container survives.
    pub quiet_period: Duration,
    /// Replacement attempts allowed per tab before it is left alone.
    pub max_processing_per_tab: u32,
    /// TLD table used when sorting rules.
    pub tlds: TldList,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_secs(5 * 60),
            max_processing_per_tab: 3,
            tlds: TldList::default(),
        }
    }
}
