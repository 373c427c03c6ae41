//! Events delivered by the host platform.

use serde::{Deserialize, Serialize};

use crate::platform::{Tab, TabId};

/// Page load status reported with tab updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// The parts of a tab that changed in an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabChange {
    pub url: Option<String>,
    pub status: Option<LoadStatus>,
}

impl TabChange {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            status: None,
        }
    }

    pub fn status(status: LoadStatus) -> Self {
        Self {
            url: None,
            status: Some(status),
        }
    }
}

/// A navigation about to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub tab_id: TabId,
    /// 0 for the top-level frame.
    pub frame_id: i32,
    pub url: String,
}

impl Navigation {
    #[inline]
    pub fn is_main_frame(&self) -> bool {
        self.frame_id == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    TabCreated(Tab),
    TabUpdated {
        tab_id: TabId,
        change: TabChange,
        tab: Tab,
    },
    BeforeNavigate(Navigation),
    TabRemoved(TabId),
    TabActivated(TabId),
}

impl PlatformEvent {
    pub fn tab_id(&self) -> TabId {
        match self {
            Self::TabCreated(tab) => tab.id,
            Self::TabUpdated { tab_id, .. } => *tab_id,
            Self::BeforeNavigate(nav) => nav.tab_id,
            Self::TabRemoved(id) | Self::TabActivated(id) => *id,
        }
    }
}
