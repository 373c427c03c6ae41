//! Tab routing state machine
//!
//! The decisions of the event handlers, as pure functions:
//!
//! - [`transition`] maps a tab's tracking flags and an incoming signal to the
//!   list of effects the handler must apply, in order.
//! - [`navigation_verdict`] and [`resolution_verdict`] decide whether a tab
//!   stays in its container or gets replaced, and where to.
//! - [`blank_tab_needs_isolation`] decides whether a fresh blank tab must be
//!   moved out of an inherited container.
//!
//! Nothing here touches the platform; the handlers gather the facts and
//! carry out the result.

use ac_core::types::ContainerKind;
use ac_core::url::{is_blank_url, is_web_url};

use crate::event::LoadStatus;
use crate::platform::ContainerId;
use crate::registry::TabFlags;

/// Title browsers give to an empty new tab.
const NEW_TAB_TITLE: &str = "New Tab";

// =============================================================================
// Event Table
// =============================================================================

/// What the handler knows about a tab before acting on an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabView {
    pub flags: TabFlags,
    /// A non-blank URL has been stored for the tab.
    pub has_url: bool,
}

impl TabView {
    #[inline]
    fn is(&self, flag: TabFlags) -> bool {
        self.flags.contains(flag)
    }
}

/// Event data relevant to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<'a> {
    Created {
        url: &'a str,
        has_opener: bool,
        title: Option<&'a str>,
    },
    Updated {
        /// Current URL of the tab.
        url: &'a str,
        url_changed: bool,
        status: Option<LoadStatus>,
    },
    BeforeNavigate {
        main_frame: bool,
        url: &'a str,
    },
    Removed,
    Activated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Wait for the tab's first real URL.
    MarkPending,
    ClearPending,
    ClearAddonCreated,
    /// Remember the tab's current URL as its first known one.
    StoreInitialUrl,
    /// Remember the navigation target URL.
    RecordUrl,
    RefreshBadge,
    /// Check whether a blank tab inherited a container it must leave.
    IsolateBlankTab,
    /// Run the resolution routine on the tab.
    Resolve,
    /// Decide whether a navigation moves the tab.
    EvaluateNavigation,
    /// Drop all tracking state.
    Forget,
    /// Arm the deletion timer of the tab's last container if it is now empty.
    ReleaseContainer,
}

/// The effects of `signal` on a tab in state `view`.
pub fn transition(view: TabView, signal: Signal<'_>) -> Vec<Effect> {
    use Effect::*;

    match signal {
        Signal::Created { url, has_opener, title } => {
            if view.is(TabFlags::PROCESSING) || view.is(TabFlags::ADDON_CREATED) {
                return vec![];
            }
            if is_blank_url(url) && !has_opener {
                // A restored tab starts blank but already carries its title.
                if looks_restored(title) {
                    return vec![MarkPending];
                }
                return vec![IsolateBlankTab];
            }
            vec![MarkPending]
        }

        Signal::Updated { url, url_changed, status } => {
            let mut effects = Vec::new();
            let complete = status == Some(LoadStatus::Complete);

            if view.is(TabFlags::EXCLUDED) && (complete || url_changed) {
                effects.push(RefreshBadge);
            }
            if view.is(TabFlags::PROCESSING) {
                return effects;
            }
            if status == Some(LoadStatus::Loading) && !is_blank_url(url) && !view.has_url {
                effects.push(StoreInitialUrl);
            }
            if view.is(TabFlags::PENDING) {
                if url_changed && !is_blank_url(url) {
                    effects.extend([ClearPending, Resolve]);
                    return effects;
                }
                if complete && is_blank_url(url) && !view.is(TabFlags::ADDON_CREATED) {
                    effects.push(ClearPending);
                    return effects;
                }
            }
            if complete && view.is(TabFlags::ADDON_CREATED) {
                effects.push(ClearAddonCreated);
            }
            effects
        }

        Signal::BeforeNavigate { main_frame, url } => {
            if !main_frame || !is_web_url(url) {
                return vec![];
            }
            if view.is(TabFlags::EXCLUDED) {
                return vec![RecordUrl, RefreshBadge];
            }
            if view.is(TabFlags::ADDON_CREATED) || view.is(TabFlags::PENDING) {
                return vec![];
            }
            vec![EvaluateNavigation]
        }

        Signal::Removed => vec![Forget, ReleaseContainer],

        Signal::Activated => vec![RefreshBadge],
    }
}

fn looks_restored(title: Option<&str>) -> bool {
    matches!(title, Some(t) if !t.is_empty() && t != NEW_TAB_TITLE)
}

// =============================================================================
// Blank Tabs
// =============================================================================

/// Whether a blank tab must move to a fresh temporary container.
///
/// `container` is the kind of the inherited container (None for the default
/// container); `busy_siblings` counts other tabs in it with a real domain.
pub fn blank_tab_needs_isolation(container: Option<ContainerKind>, busy_siblings: usize) -> bool {
    match container {
        None => false,
        Some(ContainerKind::Permanent) => true,
        Some(ContainerKind::Temporary(_)) => busy_siblings > 0,
    }
}

// =============================================================================
// Verdicts
// =============================================================================

/// Where a replacement tab goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Container(ContainerId),
    /// A temporary container created for this replacement.
    FreshEphemeral,
}

impl Destination {
    fn for_target(target: Option<&ContainerId>) -> Self {
        match target {
            Some(id) => Self::Container(id.clone()),
            None => Self::FreshEphemeral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplaceReason {
    /// Same site as the opener, which sits in a non-default container.
    FollowOpener,
    /// A rule targets a container the tab is not in.
    RuleTarget,
    /// The tab leaves the default container for a new domain.
    LeaveDefault,
    /// The domain changed and so did its target.
    DomainChange,
    /// The tab has no suitable temporary container.
    NeedsEphemeral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Replace {
        destination: Destination,
        reason: ReplaceReason,
    },
    /// Leave the tab; when `renew`, restart its temporary container's timer.
    Stay { renew: bool },
}

impl Verdict {
    fn replace(destination: Destination, reason: ReplaceReason) -> Self {
        Self::Replace { destination, reason }
    }
}

/// The tab that opened the one being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenerFacts<'a> {
    /// None when the opener is gone or on a page without a domain.
    pub domain: Option<&'a str>,
    pub container: &'a ContainerId,
}

impl OpenerFacts<'_> {
    /// The opener's container should be shared with a tab on `domain`.
    fn shares(&self, domain: &str) -> bool {
        self.domain == Some(domain) && !self.container.is_default()
    }
}

/// Facts about a top-level navigation of a routed tab.
#[derive(Debug, Clone, Copy)]
pub struct NavigationFacts<'a> {
    pub container: &'a ContainerId,
    /// Domain of the tab's previous URL.
    pub current_domain: Option<&'a str>,
    pub new_domain: &'a str,
    /// Rule target of the new URL.
    pub target: Option<&'a ContainerId>,
    /// Rule target of the previous URL.
    pub previous_target: Option<&'a ContainerId>,
    pub opener: Option<OpenerFacts<'a>>,
}

/// Decide whether a navigation moves the tab.
pub fn navigation_verdict(facts: &NavigationFacts<'_>) -> Verdict {
    if let Some(opener) = facts.opener.filter(|o| o.shares(facts.new_domain)) {
        if facts.container != opener.container {
            return Verdict::replace(
                Destination::Container(opener.container.clone()),
                ReplaceReason::FollowOpener,
            );
        }
        return Verdict::Stay { renew: true };
    }

    let in_default = facts.container.is_default();
    let domain_changed = facts.current_domain != Some(facts.new_domain);
    let destination = Destination::for_target(facts.target);

    if in_default && facts.target.is_some() {
        return Verdict::replace(destination, ReplaceReason::RuleTarget);
    }
    if in_default && domain_changed {
        return Verdict::replace(destination, ReplaceReason::LeaveDefault);
    }
    if domain_changed {
        // Two domains without rules never share a temporary container.
        let both_unruled = facts.target.is_none() && facts.previous_target.is_none();
        if facts.target != facts.previous_target || both_unruled {
            return Verdict::replace(destination, ReplaceReason::DomainChange);
        }
        return Verdict::Stay { renew: true };
    }
    if let Some(target) = facts.target {
        if target != facts.container {
            return Verdict::replace(destination, ReplaceReason::RuleTarget);
        }
    }
    Verdict::Stay { renew: true }
}

/// Facts about a tab whose first real URL just became known.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionFacts<'a> {
    pub container: &'a ContainerId,
    pub in_temporary: bool,
    pub domain: Option<&'a str>,
    pub target: Option<&'a ContainerId>,
    pub opener: Option<OpenerFacts<'a>>,
}

/// Decide where a newly loaded tab belongs.
pub fn resolution_verdict(facts: &ResolutionFacts<'_>) -> Verdict {
    if let Some(target) = facts.target {
        if target != facts.container {
            return Verdict::replace(Destination::Container(target.clone()), ReplaceReason::RuleTarget);
        }
        return Verdict::Stay { renew: false };
    }

    if let (Some(domain), Some(opener)) = (facts.domain, facts.opener) {
        if opener.shares(domain) {
            if facts.container != opener.container {
                return Verdict::replace(
                    Destination::Container(opener.container.clone()),
                    ReplaceReason::FollowOpener,
                );
            }
            return Verdict::Stay { renew: true };
        }
    }

    // A temporary container is only suitable when the tab has no opener or
    // is on the opener's domain.
    let opener_elsewhere = facts
        .opener
        .is_some_and(|o| o.domain.is_none() || o.domain != facts.domain);
    if !facts.in_temporary || opener_elsewhere {
        return Verdict::replace(Destination::FreshEphemeral, ReplaceReason::NeedsEphemeral);
    }
    Verdict::Stay { renew: true }
}
