//! Messages from the extension's popup and options pages.

use ac_core::ContainerStyle;
use ac_rules::{add_rule, sort_rules_with_stats, validate_rules};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::Result;
use crate::handlers::Router;
use crate::platform::{ContainerId, Platform, TabId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "camelCase")]
#[ts(export)]
pub enum ExtensionMessage {
    #[serde(rename_all = "camelCase")]
    ExcludeTab { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    RemoveExclusion { tab_id: TabId },
    /// Re-sort the stored rules.
    SortRules,
    /// Validate, store and sort a full rules text.
    SaveRules { rules: String },
    /// Append one rule from the popup.
    #[serde(rename_all = "camelCase")]
    AddRule {
        pattern: String,
        container_name: String,
        /// Style to save for a container name seen for the first time.
        #[serde(default)]
        style: Option<ContainerStyle>,
        /// Temporary container to rename into `container_name`.
        #[serde(default)]
        convert_container: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_excluded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn excluded(is_excluded: bool) -> Self {
        Self {
            success: true,
            is_excluded: Some(is_excluded),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            is_excluded: None,
            error: Some(error.into()),
        }
    }
}

impl<P: Platform> Router<P> {
    /// Answer a page message. Errors become a failed response.
    pub async fn handle_message(&self, message: ExtensionMessage) -> MessageResponse {
        log::debug!("Message: {:?}", message);
        match self.try_handle_message(message).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Message failed: {}", e);
                MessageResponse::failed(e.to_string())
            }
        }
    }

    async fn try_handle_message(&self, message: ExtensionMessage) -> Result<MessageResponse> {
        match message {
            ExtensionMessage::ExcludeTab { tab_id } => {
                Ok(MessageResponse::excluded(self.set_excluded(tab_id, true).await))
            }
            ExtensionMessage::RemoveExclusion { tab_id } => {
                Ok(MessageResponse::excluded(self.set_excluded(tab_id, false).await))
            }
            ExtensionMessage::SortRules => {
                self.sort_stored_rules().await?;
                Ok(MessageResponse::ok())
            }
            ExtensionMessage::SaveRules { rules } => self.save_rules(&rules).await,
            ExtensionMessage::AddRule {
                pattern,
                container_name,
                style,
                convert_container,
            } => {
                self.add_rule(
                    &pattern,
                    &container_name,
                    style.unwrap_or_default(),
                    convert_container.map(ContainerId::new),
                )
                .await
            }
        }
    }

    /// Sort the stored rules in place. Returns true if the text changed.
    pub async fn sort_stored_rules(&self) -> Result<bool> {
        let settings = self.settings();
        let rules = settings.rules().await?;
        let (sorted, stats) = sort_rules_with_stats(&rules, &self.config().tlds);
        if sorted == rules {
            log::debug!("Rules already sorted ({} rule(s))", stats.rules);
            return Ok(false);
        }
        settings.set_rules(&sorted).await?;
        log::info!(
            "Sorted {} rule(s) in {} group(s), dropped {} invalid line(s)",
            stats.rules,
            stats.groups,
            stats.rejected
        );
        Ok(true)
    }

    /// Store a full rules text after validating it, then sort it.
    pub async fn save_rules(&self, rules: &str) -> Result<MessageResponse> {
        let settings = self.settings();
        let notify = settings.notifications_enabled().await?;

        if let Err(e) = validate_rules(rules) {
            log::warn!("Rejected rules: {}", e);
            if notify {
                self.notify("Invalid Rules Format", &e.to_string()).await;
            }
            return Ok(MessageResponse::failed(e.to_string()));
        }

        settings.set_rules(rules).await?;
        self.sort_stored_rules().await?;
        if notify {
            self.notify("Settings Saved", "Container rules have been saved.")
                .await;
        }
        Ok(MessageResponse::ok())
    }

    /// Append a rule, remember the container's style and optionally turn a
    /// temporary container into the rule's permanent one.
    pub async fn add_rule(
        &self,
        pattern: &str,
        container_name: &str,
        style: ContainerStyle,
        convert: Option<ContainerId>,
    ) -> Result<MessageResponse> {
        let settings = self.settings();
        let rules = settings.rules().await?;
        let updated = add_rule(&rules, pattern, container_name)?;
        let name = container_name.trim();

        let convert = match convert {
            Some(id) if self.ephemeral().is_temporary(&id).await? => {
                let taken = self
                    .platform()
                    .find_containers(name)
                    .await?
                    .iter()
                    .any(|c| !c.is_temporary());
                if taken {
                    return Ok(MessageResponse::failed(format!(
                        "A container named {name:?} already exists"
                    )));
                }
                Some(id)
            }
            Some(id) => {
                log::debug!("Container {} is not temporary, not converting it", id);
                None
            }
            None => None,
        };

        settings.set_rules(&updated).await?;

        let mut styles = settings.container_styles().await?;
        if convert.is_some() || !styles.contains_key(name) {
            styles.insert(name.to_string(), style);
            settings.set_container_styles(&styles).await?;
        }

        if let Some(id) = convert {
            self.ephemeral().cancel(&id);
            let container = self.platform().update_container(&id, name, style).await?;
            log::info!("Converted temporary container {} into {}", id, container.name);
        }

        self.sort_stored_rules().await?;
        Ok(MessageResponse::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let msg: ExtensionMessage =
            serde_json::from_str(r#"{"action":"excludeTab","tabId":4}"#).unwrap();
        assert_eq!(msg, ExtensionMessage::ExcludeTab { tab_id: 4 });

        let msg: ExtensionMessage = serde_json::from_str(
            r#"{"action":"addRule","pattern":"*.youtube.com","containerName":"YT"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ExtensionMessage::AddRule {
                pattern: "*.youtube.com".into(),
                container_name: "YT".into(),
                style: None,
                convert_container: None,
            }
        );

        let msg: ExtensionMessage = serde_json::from_str(r#"{"action":"sortRules"}"#).unwrap();
        assert_eq!(msg, ExtensionMessage::SortRules);
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let json = serde_json::to_string(&MessageResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
        let json = serde_json::to_string(&MessageResponse::excluded(false)).unwrap();
        assert_eq!(json, r#"{"success":true,"isExcluded":false}"#);
        let json = serde_json::to_string(&MessageResponse::failed("nope")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"nope"}"#);
    }
}
