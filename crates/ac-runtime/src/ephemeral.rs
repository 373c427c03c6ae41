//! Temporary container lifecycle
//!
//! Temporary containers are named `tmp_<n>` and live while they hold tabs.
//! Once empty, a deletion timer runs for the quiet period; attaching a tab
//! cancels it, and a timer that fires re-checks emptiness before deleting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ac_core::types::{temp_index, temp_name};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::platform::{Container, ContainerId, Platform};
use crate::settings::Settings;

/// True for `tmp_<n>` names.
#[inline]
pub fn is_ephemeral_name(name: &str) -> bool {
    temp_index(name).is_some()
}

/// Lowest index `n >= 1` not used by any `tmp_<n>` container.
pub fn next_index<'a>(names: impl IntoIterator<Item = &'a str>) -> u32 {
    let mut used: Vec<u32> = names.into_iter().filter_map(temp_index).collect();
    used.sort_unstable();
    used.dedup();

    let mut next = 1;
    for n in used {
        if n == next {
            next += 1;
        } else if n > next {
            break;
        }
    }
    next
}

// =============================================================================
// Deletion Timers
// =============================================================================

#[derive(Default)]
struct TimerTable {
    next_generation: u64,
    timers: HashMap<ContainerId, (u64, JoinHandle<()>)>,
}

/// At most one pending deletion per container id.
pub struct DeletionTimers<P> {
    platform: Arc<P>,
    quiet_period: Duration,
    table: Arc<Mutex<TimerTable>>,
}

impl<P> Clone for DeletionTimers<P> {
    fn clone(&self) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
            quiet_period: self.quiet_period,
            table: Arc::clone(&self.table),
        }
    }
}

fn lock_table(table: &Mutex<TimerTable>) -> MutexGuard<'_, TimerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: Platform> DeletionTimers<P> {
    pub fn new(platform: Arc<P>, quiet_period: Duration) -> Self {
        Self {
            platform,
            quiet_period,
            table: Arc::new(Mutex::new(TimerTable::default())),
        }
    }

    /// Schedule deletion of `id`, superseding any pending timer for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, id: &ContainerId) {
        let mut table = lock_table(&self.table);
        let generation = table.next_generation;
        table.next_generation += 1;

        let platform = Arc::clone(&self.platform);
        let shared = Arc::clone(&self.table);
        let quiet_period = self.quiet_period;
        let container = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            delete_if_empty(platform.as_ref(), &container).await;
            let mut table = lock_table(&shared);
            if table.timers.get(&container).is_some_and(|(g, _)| *g == generation) {
                table.timers.remove(&container);
            }
        });

        if let Some((_, previous)) = table.timers.insert(id.clone(), (generation, handle)) {
            previous.abort();
        }
        log::debug!("Armed deletion timer for {} ({:?})", id, self.quiet_period);
    }

    /// Drop the pending timer for `id`. Returns true if one was pending.
    pub fn cancel(&self, id: &ContainerId) -> bool {
        match lock_table(&self.table).timers.remove(id) {
            Some((_, handle)) => {
                handle.abort();
                log::debug!("Canceled deletion timer for {}", id);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, id: &ContainerId) -> bool {
        lock_table(&self.table).timers.contains_key(id)
    }

    /// Containers with a pending timer, sorted.
    pub fn pending(&self) -> Vec<ContainerId> {
        let mut ids: Vec<ContainerId> = lock_table(&self.table).timers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

async fn delete_if_empty<P: Platform>(platform: &P, id: &ContainerId) {
    match platform.tabs_in(id).await {
        Ok(tabs) if tabs.is_empty() => match platform.remove_container(id).await {
            Ok(()) => log::info!("Deleted idle temporary container {}", id),
            Err(e) if e.is_not_found() => log::debug!("Container {} already gone", id),
            Err(e) => log::warn!("Failed to delete container {}: {}", id, e),
        },
        Ok(tabs) => log::debug!("Container {} still holds {} tab(s), keeping it", id, tabs.len()),
        Err(e) if e.is_not_found() => log::debug!("Container {} already gone", id),
        Err(e) => log::warn!("Could not list tabs of container {}: {}", id, e),
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Outcome of the startup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapStats {
    pub deleted: usize,
    pub armed: usize,
}

/// Creates, times and reaps temporary containers.
pub struct EphemeralContainers<P> {
    platform: Arc<P>,
    timers: DeletionTimers<P>,
    rng: Mutex<fastrand::Rng>,
    /// Serializes index allocation so two creations never pick the same name.
    create_lock: tokio::sync::Mutex<()>,
}

impl<P: Platform> EphemeralContainers<P> {
    pub fn new(platform: Arc<P>, quiet_period: Duration) -> Self {
        Self::with_rng(platform, quiet_period, fastrand::Rng::new())
    }

    pub fn with_rng(platform: Arc<P>, quiet_period: Duration, rng: fastrand::Rng) -> Self {
        Self {
            timers: DeletionTimers::new(Arc::clone(&platform), quiet_period),
            platform,
            rng: Mutex::new(rng),
            create_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn timers(&self) -> &DeletionTimers<P> {
        &self.timers
    }

    #[inline]
    pub fn arm(&self, id: &ContainerId) {
        self.timers.arm(id);
    }

    #[inline]
    pub fn cancel(&self, id: &ContainerId) -> bool {
        self.timers.cancel(id)
    }

    /// Containers with a pending deletion timer.
    pub fn pending_timers(&self) -> Vec<ContainerId> {
        self.timers.pending()
    }

    /// All existing `tmp_<n>` containers.
    pub async fn temporary_containers(&self) -> Result<Vec<Container>> {
        let all = self.platform.containers().await?;
        Ok(all.into_iter().filter(Container::is_temporary).collect())
    }

    /// Whether `id` names an existing temporary container.
    pub async fn is_temporary(&self, id: &ContainerId) -> Result<bool> {
        if id.is_default() {
            return Ok(false);
        }
        match self.platform.container(id).await {
            Ok(container) => Ok(container.is_temporary()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the next `tmp_<n>` container and arm its timer.
    pub async fn create(&self) -> Result<Container> {
        let _guard = self.create_lock.lock().await;

        let existing = self.temporary_containers().await?;
        let name = temp_name(next_index(existing.iter().map(|c| c.name.as_str())));

        let temp_style = Settings::new(self.platform.as_ref()).temp_container_style().await?;
        let style = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            temp_style.pick(&mut rng)
        };

        let container = self.platform.create_container(&name, style).await?;
        log::info!(
            "Created temporary container {} ({}, {}/{})",
            container.name,
            container.id,
            style.color.as_str(),
            style.icon.as_str()
        );
        self.timers.arm(&container.id);
        Ok(container)
    }

    /// Delete empty temporary containers and arm timers for the others.
    pub async fn reap_on_startup(&self) -> Result<ReapStats> {
        let mut stats = ReapStats::default();
        for container in self.temporary_containers().await? {
            let tabs = match self.platform.tabs_in(&container.id).await {
                Ok(tabs) => tabs,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            if tabs.is_empty() {
                match self.platform.remove_container(&container.id).await {
                    Ok(()) => {
                        log::info!("Deleted empty container {} on startup", container.name);
                        stats.deleted += 1;
                    }
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e.into()),
                }
            } else {
                self.timers.arm(&container.id);
                stats.armed += 1;
            }
        }
        Ok(stats)
    }
}
