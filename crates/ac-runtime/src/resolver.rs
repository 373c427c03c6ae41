//! Rule-based container lookup.

use std::sync::Arc;

use ac_core::{domain_of, first_match, Rule};
use ac_rules::rules_from_text;

use crate::error::Result;
use crate::platform::{ContainerId, Platform};
use crate::settings::Settings;

/// Maps URLs to the container their first matching rule names.
pub struct ContainerResolver<P> {
    platform: Arc<P>,
    /// Held across lookup and creation so a name is created at most once.
    create_lock: tokio::sync::Mutex<()>,
}

impl<P: Platform> ContainerResolver<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self {
            platform,
            create_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The first stored rule matching `url`, if any.
    pub async fn target_rule(&self, url: &str) -> Result<Option<Rule>> {
        let text = Settings::new(self.platform.as_ref()).rules().await?;
        if text.trim().is_empty() {
            log::debug!("No rules configured");
            return Ok(None);
        }
        if domain_of(url).is_none() {
            log::debug!("No routable domain in {:?}", url);
            return Ok(None);
        }

        let rules = rules_from_text(&text);
        match first_match(&rules, url) {
            Some((idx, rule)) => {
                log::debug!("Rule {:?} matched {} after {} rule(s)", rule.pattern, url, idx + 1);
                Ok(Some(rule.clone()))
            }
            None => {
                log::debug!("None of {} rule(s) matched {}", rules.len(), url);
                Ok(None)
            }
        }
    }

    /// Container for `url`: the matching rule's container, created with its
    /// saved style if it does not exist yet. None when no rule matches.
    pub async fn resolve(&self, url: &str) -> Result<Option<ContainerId>> {
        let Some(rule) = self.target_rule(url).await? else {
            return Ok(None);
        };

        let _guard = self.create_lock.lock().await;
        let existing = self.platform.find_containers(&rule.container).await?;
        if let Some(container) = existing.into_iter().next() {
            return Ok(Some(container.id));
        }

        let style = Settings::new(self.platform.as_ref()).style_for(&rule.container).await?;
        let container = self.platform.create_container(&rule.container, style).await?;
        log::info!(
            "Created container {} ({}) for pattern {:?}",
            container.name,
            container.id,
            rule.pattern
        );
        Ok(Some(container.id))
    }
}
