//! Per-tab tracking state
//!
//! One entry per tab id seen since startup. Nothing here is persisted: the
//! registry starts empty and an entry is dropped when its tab closes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::platform::{ContainerId, TabId};

bitflags::bitflags! {
    /// Tracking flags of a tab.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TabFlags: u8 {
        /// A mutating handler holds the tab's lock.
        const PROCESSING = 1 << 0;
        /// Waiting for the first real URL.
        const PENDING = 1 << 1;
        /// Opened by the router itself as a replacement.
        const ADDON_CREATED = 1 << 2;
        /// The user opted this tab out of routing.
        const EXCLUDED = 1 << 3;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabEntry {
    pub flags: TabFlags,
    /// Last known non-blank URL.
    pub last_url: Option<String>,
    /// Container the tab was last seen in.
    pub container: Option<ContainerId>,
    /// Replacement attempts so far.
    pub processed: u32,
}

/// Shared per-tab state.
#[derive(Debug, Clone, Default)]
pub struct TabRegistry {
    inner: Arc<Mutex<HashMap<TabId, TabEntry>>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<TabId, TabEntry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_entry<R>(&self, tab: TabId, f: impl FnOnce(&mut TabEntry) -> R) -> R {
        f(self.entries().entry(tab).or_default())
    }

    /// Current state of a tab; untracked tabs read as the default entry.
    pub fn view(&self, tab: TabId) -> TabEntry {
        self.entries().get(&tab).cloned().unwrap_or_default()
    }

    pub fn is_tracked(&self, tab: TabId) -> bool {
        self.entries().contains_key(&tab)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    // =========================================================================
    // Flags
    // =========================================================================

    pub fn has(&self, tab: TabId, flag: TabFlags) -> bool {
        self.entries().get(&tab).is_some_and(|e| e.flags.contains(flag))
    }

    /// Set or clear `flag`. Returns true if the flag changed.
    pub fn set(&self, tab: TabId, flag: TabFlags, on: bool) -> bool {
        self.with_entry(tab, |e| {
            let before = e.flags.contains(flag);
            e.flags.set(flag, on);
            before != on
        })
    }

    #[inline]
    pub fn is_excluded(&self, tab: TabId) -> bool {
        self.has(tab, TabFlags::EXCLUDED)
    }

    // =========================================================================
    // URL and Container
    // =========================================================================

    pub fn last_url(&self, tab: TabId) -> Option<String> {
        self.entries().get(&tab).and_then(|e| e.last_url.clone())
    }

    pub fn record_url(&self, tab: TabId, url: &str) {
        self.with_entry(tab, |e| e.last_url = Some(url.to_string()));
    }

    pub fn container(&self, tab: TabId) -> Option<ContainerId> {
        self.entries().get(&tab).and_then(|e| e.container.clone())
    }

    pub fn observe_container(&self, tab: TabId, container: &ContainerId) {
        self.with_entry(tab, |e| e.container = Some(container.clone()));
    }

    // =========================================================================
    // Loop Guard
    // =========================================================================

    /// Count one replacement attempt. Returns false once `ceiling` attempts
    /// have already been made.
    pub fn bump(&self, tab: TabId, ceiling: u32) -> bool {
        self.with_entry(tab, |e| {
            let before = e.processed;
            e.processed = e.processed.saturating_add(1);
            before < ceiling
        })
    }

    pub fn reset_count(&self, tab: TabId) {
        if let Some(e) = self.entries().get_mut(&tab) {
            e.processed = 0;
        }
    }

    // =========================================================================
    // Locking and Teardown
    // =========================================================================

    /// Take the tab's processing lock, or None if another handler holds it.
    pub fn try_lock(&self, tab: TabId) -> Option<TabLock> {
        self.with_entry(tab, |e| {
            if e.flags.contains(TabFlags::PROCESSING) {
                return None;
            }
            e.flags.insert(TabFlags::PROCESSING);
            Some(TabLock {
                registry: self.clone(),
                tab,
            })
        })
    }

    /// Drop all state of a closed tab.
    pub fn remove(&self, tab: TabId) -> Option<TabEntry> {
        self.entries().remove(&tab)
    }
}

/// Processing lock of one tab, released on drop.
#[derive(Debug)]
pub struct TabLock {
    registry: TabRegistry,
    tab: TabId,
}

impl TabLock {
    #[inline]
    pub fn tab(&self) -> TabId {
        self.tab
    }
}

impl Drop for TabLock {
    fn drop(&mut self) {
        if let Some(e) = self.registry.entries().get_mut(&self.tab) {
            e.flags.remove(TabFlags::PROCESSING);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let registry = TabRegistry::new();
        let lock = registry.try_lock(1).unwrap();
        assert_eq!(lock.tab(), 1);
        assert!(registry.has(1, TabFlags::PROCESSING));
        assert!(registry.try_lock(1).is_none());
        assert!(registry.try_lock(2).is_some());
        drop(lock);
        assert!(!registry.has(1, TabFlags::PROCESSING));
        assert!(registry.try_lock(1).is_some());
    }

    #[test]
    fn test_lock_released_on_early_return() {
        fn bail(registry: &TabRegistry) -> Result<(), ()> {
            let _lock = registry.try_lock(7).ok_or(())?;
            Err(())
        }
        let registry = TabRegistry::new();
        assert!(bail(&registry).is_err());
        assert!(!registry.has(7, TabFlags::PROCESSING));
    }

    #[test]
    fn test_lock_survives_removed_entry() {
        let registry = TabRegistry::new();
        let lock = registry.try_lock(3).unwrap();
        registry.remove(3);
        drop(lock);
        assert!(!registry.is_tracked(3));
    }

    #[test]
    fn test_bump_ceiling() {
        let registry = TabRegistry::new();
        assert!(registry.bump(5, 3));
        assert!(registry.bump(5, 3));
        assert!(registry.bump(5, 3));
        assert!(!registry.bump(5, 3));
        assert!(!registry.bump(5, 3));
        registry.reset_count(5);
        assert!(registry.bump(5, 3));
    }

    #[test]
    fn test_flags_and_urls() {
        let registry = TabRegistry::new();
        assert!(!registry.is_excluded(9));
        assert!(registry.set(9, TabFlags::EXCLUDED, true));
        assert!(!registry.set(9, TabFlags::EXCLUDED, true));
        assert!(registry.is_excluded(9));

        registry.record_url(9, "https://example.com/");
        registry.observe_container(9, &ContainerId::new("c1"));
        let entry = registry.view(9);
        assert_eq!(entry.last_url.as_deref(), Some("https://example.com/"));
        assert_eq!(entry.container, Some(ContainerId::new("c1")));

        assert!(registry.remove(9).is_some());
        assert_eq!(registry.view(9), TabEntry::default());
        assert!(registry.is_empty());
    }
}
