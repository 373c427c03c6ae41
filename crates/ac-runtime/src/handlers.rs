//! Event router
//!
//! [`Router`] owns the tab registry, the resolver and the temporary container
//! lifecycle. Each platform event is turned into a [`Signal`], run through
//! [`transition`], and the resulting effects are carried out in order.
//!
//! Handlers never fail the event loop: errors are logged at the dispatch
//! boundary, and a tab or container vanishing mid-operation only rates a
//! debug line.

use std::sync::Arc;

use ac_core::types::ContainerKind;
use ac_core::url::{domain_of, is_blank_url, is_extension_page};

use crate::ephemeral::{EphemeralContainers, ReapStats};
use crate::error::Result;
use crate::event::{Navigation, PlatformEvent, TabChange};
use crate::fsm::{
    blank_tab_needs_isolation, navigation_verdict, resolution_verdict, transition, Destination,
    Effect, NavigationFacts, OpenerFacts, ResolutionFacts, Signal, TabView, Verdict,
};
use crate::platform::{ContainerId, CreateTab, Platform, Tab, TabId};
use crate::registry::{TabEntry, TabFlags, TabLock, TabRegistry};
use crate::resolver::ContainerResolver;
use crate::settings::{RuntimeConfig, Settings};

/// Title of every notification the router raises.
pub const NOTIFICATION_TITLE: &str = "Auto Containers";

/// What an effect may need from the event that produced it.
struct EffectContext<'a> {
    tab_id: TabId,
    tab: Option<&'a Tab>,
    url: Option<&'a str>,
}

/// Routes tab events to containers.
pub struct Router<P> {
    platform: Arc<P>,
    config: RuntimeConfig,
    registry: TabRegistry,
    resolver: ContainerResolver<P>,
    ephemeral: EphemeralContainers<P>,
}

impl<P: Platform> Router<P> {
    pub fn new(platform: Arc<P>, config: RuntimeConfig) -> Self {
        Self::with_rng(platform, config, fastrand::Rng::new())
    }

    /// Router whose temporary container styles come from `rng`.
    pub fn with_rng(platform: Arc<P>, config: RuntimeConfig, rng: fastrand::Rng) -> Self {
        Self {
            resolver: ContainerResolver::new(Arc::clone(&platform)),
            ephemeral: EphemeralContainers::with_rng(Arc::clone(&platform), config.quiet_period, rng),
            registry: TabRegistry::new(),
            platform,
            config,
        }
    }

    pub fn platform(&self) -> &P {
        self.platform.as_ref()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &ContainerResolver<P> {
        &self.resolver
    }

    pub fn ephemeral(&self) -> &EphemeralContainers<P> {
        &self.ephemeral
    }

    pub(crate) fn settings(&self) -> Settings<'_, P> {
        Settings::new(self.platform.as_ref())
    }

    /// Startup sweep of leftover temporary containers.
    pub async fn startup(&self) -> Result<ReapStats> {
        let stats = self.ephemeral.reap_on_startup().await?;
        log::info!(
            "Startup sweep: deleted {} empty temporary container(s), {} timer(s) armed",
            stats.deleted,
            stats.armed
        );
        Ok(stats)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Handle one platform event. Failures are logged, never returned.
    pub async fn dispatch(&self, event: PlatformEvent) {
        let tab_id = event.tab_id();
        let result = match event {
            PlatformEvent::TabCreated(tab) => self.on_created(&tab).await,
            PlatformEvent::TabUpdated { tab_id, change, tab } => {
                self.on_updated(tab_id, &change, &tab).await
            }
            PlatformEvent::BeforeNavigate(nav) => self.on_before_navigate(&nav).await,
            PlatformEvent::TabRemoved(id) => self.on_removed(id).await,
            PlatformEvent::TabActivated(id) => self.on_activated(id).await,
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_gone() => log::debug!("Tab {}: {}, nothing left to do", tab_id, e),
            Err(e) => log::error!("Handling event for tab {} failed: {}", tab_id, e),
        }
    }

    fn view(&self, tab_id: TabId) -> TabView {
        let entry = self.registry.view(tab_id);
        TabView {
            flags: entry.flags,
            has_url: entry.last_url.is_some(),
        }
    }

    pub async fn on_created(&self, tab: &Tab) -> Result<()> {
        let view = self.view(tab.id);
        self.registry.observe_container(tab.id, &tab.container_id);
        let signal = Signal::Created {
            url: tab.url(),
            has_opener: tab.opener_tab_id.is_some(),
            title: tab.title.as_deref(),
        };
        let ctx = EffectContext {
            tab_id: tab.id,
            tab: Some(tab),
            url: Some(tab.url()),
        };
        self.apply(&ctx, transition(view, signal)).await
    }

    pub async fn on_updated(&self, tab_id: TabId, change: &TabChange, tab: &Tab) -> Result<()> {
        let view = self.view(tab_id);
        self.registry.observe_container(tab_id, &tab.container_id);
        let signal = Signal::Updated {
            url: tab.url(),
            url_changed: change.url.is_some(),
            status: change.status,
        };
        let ctx = EffectContext {
            tab_id,
            tab: Some(tab),
            url: Some(tab.url()),
        };
        self.apply(&ctx, transition(view, signal)).await
    }

    pub async fn on_before_navigate(&self, nav: &Navigation) -> Result<()> {
        let signal = Signal::BeforeNavigate {
            main_frame: nav.is_main_frame(),
            url: &nav.url,
        };
        let ctx = EffectContext {
            tab_id: nav.tab_id,
            tab: None,
            url: Some(&nav.url),
        };
        self.apply(&ctx, transition(self.view(nav.tab_id), signal)).await
    }

    pub async fn on_removed(&self, tab_id: TabId) -> Result<()> {
        let ctx = EffectContext {
            tab_id,
            tab: None,
            url: None,
        };
        self.apply(&ctx, transition(self.view(tab_id), Signal::Removed)).await
    }

    pub async fn on_activated(&self, tab_id: TabId) -> Result<()> {
        let ctx = EffectContext {
            tab_id,
            tab: None,
            url: None,
        };
        self.apply(&ctx, transition(self.view(tab_id), Signal::Activated)).await
    }

    async fn apply(&self, ctx: &EffectContext<'_>, effects: Vec<Effect>) -> Result<()> {
        let tab_id = ctx.tab_id;
        let mut forgotten: Option<TabEntry> = None;

        for effect in effects {
            log::trace!("Tab {}: {:?}", tab_id, effect);
            match effect {
                Effect::MarkPending => {
                    self.registry.set(tab_id, TabFlags::PENDING, true);
                }
                Effect::ClearPending => {
                    self.registry.set(tab_id, TabFlags::PENDING, false);
                }
                Effect::ClearAddonCreated => {
                    self.registry.set(tab_id, TabFlags::ADDON_CREATED, false);
                }
                Effect::StoreInitialUrl | Effect::RecordUrl => {
                    if let Some(url) = ctx.url {
                        self.registry.record_url(tab_id, url);
                    }
                }
                Effect::RefreshBadge => self.refresh_badge(tab_id).await,
                Effect::IsolateBlankTab => {
                    if let Some(tab) = ctx.tab {
                        self.isolate_blank_tab(tab).await?;
                    }
                }
                Effect::Resolve => {
                    if let Some(tab) = ctx.tab {
                        self.process_tab(tab).await?;
                    }
                }
                Effect::EvaluateNavigation => {
                    if let Some(url) = ctx.url {
                        self.evaluate_navigation(tab_id, url).await?;
                    }
                }
                Effect::Forget => forgotten = self.registry.remove(tab_id),
                Effect::ReleaseContainer => {
                    if let Some(container) = forgotten.as_ref().and_then(|e| e.container.as_ref()) {
                        self.release_container(tab_id, container).await?;
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Routines
    // =========================================================================

    /// Route a tab whose first real URL just became known.
    pub async fn process_tab(&self, tab: &Tab) -> Result<()> {
        if self.registry.is_excluded(tab.id) {
            log::debug!("Tab {} is excluded, leaving it alone", tab.id);
            return Ok(());
        }
        let url = tab.url();
        if is_blank_url(url) || is_extension_page(url) {
            return Ok(());
        }
        let Some(domain) = domain_of(url) else {
            log::debug!("Tab {} has no routable domain", tab.id);
            return Ok(());
        };
        let Some(lock) = self.registry.try_lock(tab.id) else {
            log::debug!("Tab {} is already being processed", tab.id);
            return Ok(());
        };

        let target = self.resolver.resolve(url).await?;
        let opener = self.opener_of(tab).await?;
        let in_temporary = self.ephemeral.is_temporary(&tab.container_id).await?;

        let facts = ResolutionFacts {
            container: &tab.container_id,
            in_temporary,
            domain: Some(domain.as_str()),
            target: target.as_ref(),
            opener: opener.as_ref().map(|(domain, container)| OpenerFacts {
                domain: domain.as_deref(),
                container,
            }),
        };
        let verdict = resolution_verdict(&facts);
        log::debug!("Tab {} ({}): {:?}", tab.id, domain, verdict);

        match verdict {
            Verdict::Replace { destination, .. } => {
                self.replace_tab(&lock, tab, url, destination).await?;
            }
            Verdict::Stay { renew } => {
                // Settled; the loop guard starts over.
                self.registry.reset_count(tab.id);
                if renew && in_temporary {
                    self.ephemeral.arm(&tab.container_id);
                }
            }
        }
        Ok(())
    }

    /// Move a fresh blank tab out of a container it should not share.
    pub async fn isolate_blank_tab(&self, tab: &Tab) -> Result<()> {
        if tab.container_id.is_default() {
            return Ok(());
        }
        let container = match self.platform.container(&tab.container_id).await {
            Ok(container) => container,
            Err(e) if e.is_not_found() => {
                log::debug!("Container of blank tab {} is gone", tab.id);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let kind = container.kind();
        let busy_siblings = match kind {
            ContainerKind::Temporary(_) => self
                .platform
                .tabs_in(&container.id)
                .await?
                .iter()
                .filter(|t| t.id != tab.id && domain_of(t.url()).is_some())
                .count(),
            ContainerKind::Permanent => 0,
        };
        if !blank_tab_needs_isolation(Some(kind), busy_siblings) {
            log::debug!("Blank tab {} may stay in {}", tab.id, container.name);
            return Ok(());
        }

        let Some(_lock) = self.registry.try_lock(tab.id) else {
            return Ok(());
        };
        if !self.admit(tab.id).await? {
            return Ok(());
        }

        let fresh = self.ephemeral.create().await?;
        log::info!(
            "Moving blank tab {} out of {} into {}",
            tab.id,
            container.name,
            fresh.name
        );
        self.open_replacement(tab, None, &fresh.id).await?;
        Ok(())
    }

    /// Decide whether a top-level navigation moves the tab.
    pub async fn evaluate_navigation(&self, tab_id: TabId, url: &str) -> Result<()> {
        let Some(new_domain) = domain_of(url) else {
            return Ok(());
        };
        let tab = self.platform.tab(tab_id).await?;
        self.registry.observe_container(tab_id, &tab.container_id);

        let Some(lock) = self.registry.try_lock(tab_id) else {
            log::debug!("Tab {} is already being processed", tab_id);
            return Ok(());
        };

        let current_url = self
            .registry
            .last_url(tab_id)
            .or_else(|| tab.url.clone())
            .unwrap_or_default();
        let current_domain = domain_of(&current_url);

        let target = self.resolver.resolve(url).await?;
        let previous_target = match current_domain {
            Some(_) => self.resolver.resolve(&current_url).await?,
            None => None,
        };
        let opener = self.opener_of(&tab).await?;

        let facts = NavigationFacts {
            container: &tab.container_id,
            current_domain: current_domain.as_deref(),
            new_domain: &new_domain,
            target: target.as_ref(),
            previous_target: previous_target.as_ref(),
            opener: opener.as_ref().map(|(domain, container)| OpenerFacts {
                domain: domain.as_deref(),
                container,
            }),
        };
        let verdict = navigation_verdict(&facts);
        log::debug!(
            "Tab {} navigating {:?} -> {}: {:?}",
            tab_id,
            current_domain,
            new_domain,
            verdict
        );

        match verdict {
            Verdict::Replace { destination, .. } => {
                // A replaced tab is gone; its URL lives on in the new tab's entry.
                if self.replace_tab(&lock, &tab, url, destination).await?.is_none() {
                    self.registry.record_url(tab_id, url);
                }
            }
            Verdict::Stay { renew } => {
                self.registry.reset_count(tab_id);
                self.registry.record_url(tab_id, url);
                if renew && self.ephemeral.is_temporary(&tab.container_id).await? {
                    self.ephemeral.arm(&tab.container_id);
                }
            }
        }
        Ok(())
    }

    /// Replace `tab` with a copy loading `url` in `destination`.
    ///
    /// Returns the new tab, or None if nothing was done.
    pub async fn replace_tab(
        &self,
        lock: &TabLock,
        tab: &Tab,
        url: &str,
        destination: Destination,
    ) -> Result<Option<Tab>> {
        debug_assert_eq!(lock.tab(), tab.id);
        if is_blank_url(url) {
            log::debug!("Not replacing tab {} on blank page", tab.id);
            return Ok(None);
        }
        if !self.admit(tab.id).await? {
            return Ok(None);
        }

        let container = match destination {
            Destination::Container(id) => id,
            Destination::FreshEphemeral => self.ephemeral.create().await?.id,
        };
        let new_tab = self
            .open_replacement(tab, Some(url.to_string()), &container)
            .await?;
        self.registry.record_url(new_tab.id, url);
        Ok(Some(new_tab))
    }

    async fn open_replacement(
        &self,
        tab: &Tab,
        url: Option<String>,
        container: &ContainerId,
    ) -> Result<Tab> {
        self.ephemeral.cancel(container);

        let new_tab = self
            .platform
            .create_tab(CreateTab::replacing(tab, url, container.clone()))
            .await?;
        self.registry.set(new_tab.id, TabFlags::ADDON_CREATED, true);
        self.registry.observe_container(new_tab.id, container);

        match self.platform.remove_tab(tab.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => log::warn!("Tab {} was already closed", tab.id),
            Err(e) => return Err(e.into()),
        }
        log::info!(
            "Replaced tab {} with tab {} in container {}",
            tab.id,
            new_tab.id,
            container
        );
        Ok(new_tab)
    }

    /// Count a replacement attempt against the loop guard.
    async fn admit(&self, tab_id: TabId) -> Result<bool> {
        let ceiling = self.config.max_processing_per_tab;
        if self.registry.bump(tab_id, ceiling) {
            return Ok(true);
        }

        log::warn!(
            "Tab {} reached {} replacement attempts, leaving it in place",
            tab_id,
            ceiling
        );
        // Only the first refusal notifies.
        if self.registry.view(tab_id).processed == ceiling.saturating_add(1)
            && self.settings().notifications_enabled().await?
        {
            self.notify(
                NOTIFICATION_TITLE,
                "A tab kept switching containers and was left where it is.",
            )
            .await;
        }
        Ok(false)
    }

    /// The opener's domain and container. A closed opener reads as no domain
    /// in the default container.
    async fn opener_of(&self, tab: &Tab) -> Result<Option<(Option<String>, ContainerId)>> {
        let Some(opener_id) = tab.opener_tab_id else {
            return Ok(None);
        };
        match self.platform.tab(opener_id).await {
            Ok(opener) => Ok(Some((domain_of(opener.url()), opener.container_id))),
            Err(e) if e.is_not_found() => {
                log::debug!("Opener {} of tab {} is gone", opener_id, tab.id);
                Ok(Some((None, ContainerId::default_container())))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn release_container(&self, tab_id: TabId, container: &ContainerId) -> Result<()> {
        if !self.ephemeral.is_temporary(container).await? {
            return Ok(());
        }
        let tabs = match self.platform.tabs_in(container).await {
            Ok(tabs) => tabs,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if tabs.iter().all(|t| t.id == tab_id) {
            log::debug!("Container {} emptied by tab {}", container, tab_id);
            self.ephemeral.arm(container);
        }
        Ok(())
    }

    // =========================================================================
    // Exclusion and Feedback
    // =========================================================================

    /// Opt a tab in or out of routing. Returns the new state.
    pub async fn set_excluded(&self, tab_id: TabId, excluded: bool) -> bool {
        if self.registry.set(tab_id, TabFlags::EXCLUDED, excluded) {
            log::info!(
                "Tab {} {} routing",
                tab_id,
                if excluded { "excluded from" } else { "returned to" }
            );
            self.refresh_badge(tab_id).await;
        }
        excluded
    }

    async fn refresh_badge(&self, tab_id: TabId) {
        let excluded = self.registry.is_excluded(tab_id);
        if let Err(e) = self.platform.set_badge(tab_id, excluded).await {
            log::warn!("Could not update badge of tab {}: {}", tab_id, e);
        }
    }

    pub(crate) async fn notify(&self, title: &str, message: &str) {
        if let Err(e) = self.platform.notify(title, message).await {
            log::warn!("Notification failed: {}", e);
        }
    }
}
