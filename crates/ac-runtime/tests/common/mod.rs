//! In-memory platform shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once};

use ac_core::ContainerStyle;
use ac_runtime::settings::{CONTAINER_STYLES_KEY, NOTIFICATIONS_KEY, RULES_KEY};
use ac_runtime::{
    Container, ContainerId, ContainerStore, CreateTab, Feedback, PlatformError, Router,
    RuntimeConfig, SettingsStore, Tab, TabId, TabStore,
};
use serde_json::Value;
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = CombinedLogger::init(vec![TermLogger::new(
            LevelFilter::Debug,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )]);
    });
}

#[derive(Default)]
pub struct State {
    pub containers: Vec<Container>,
    pub next_container: u32,
    pub tabs: BTreeMap<TabId, Tab>,
    pub next_tab: TabId,
    pub settings: HashMap<String, Value>,
    pub badges: HashMap<TabId, bool>,
    pub notifications: Vec<(String, String)>,
    pub closed_tabs: Vec<TabId>,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
    /// Suspend once after each container lookup, letting other tasks run.
    slow_lookups: AtomicBool,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_rules(rules: &str) -> Arc<Self> {
        let platform = Self::default();
        platform.put(RULES_KEY, Value::String(rules.to_string()));
        Arc::new(platform)
    }

    pub fn slow_lookups(&self) {
        self.slow_lookups.store(true, Ordering::SeqCst);
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn put(&self, key: &str, value: Value) {
        self.state().settings.insert(key.to_string(), value);
    }

    pub fn setting(&self, key: &str) -> Option<Value> {
        self.state().settings.get(key).cloned()
    }

    pub fn rules(&self) -> String {
        match self.setting(RULES_KEY) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        }
    }

    pub fn disable_notifications(&self) {
        self.put(NOTIFICATIONS_KEY, Value::Bool(false));
    }

    pub fn set_style(&self, name: &str, style: ContainerStyle) {
        let mut styles = match self.setting(CONTAINER_STYLES_KEY) {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        styles.insert(name.to_string(), serde_json::to_value(style).unwrap());
        self.put(CONTAINER_STYLES_KEY, Value::Object(styles));
    }

    pub fn add_container(&self, name: &str) -> ContainerId {
        let mut state = self.state();
        state.next_container += 1;
        let id = ContainerId::new(format!("firefox-container-{}", state.next_container));
        state.containers.push(Container {
            id: id.clone(),
            name: name.to_string(),
            style: ContainerStyle::default(),
        });
        id
    }

    pub fn container_named(&self, name: &str) -> Option<Container> {
        self.state().containers.iter().find(|c| c.name == name).cloned()
    }

    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().containers.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    /// Insert a tab as the browser would, without notifying the router.
    pub fn open_tab(&self, url: &str, container: &ContainerId, opener: Option<TabId>) -> Tab {
        let mut state = self.state();
        state.next_tab += 1;
        let tab = Tab {
            id: state.next_tab,
            url: Some(url.to_string()),
            title: None,
            container_id: container.clone(),
            window_id: 1,
            index: state.tabs.len() as u32,
            active: true,
            opener_tab_id: opener,
        };
        state.tabs.insert(tab.id, tab.clone());
        tab
    }

    pub fn set_url(&self, tab: TabId, url: &str) -> Tab {
        let mut state = self.state();
        let tab = state.tabs.get_mut(&tab).unwrap();
        tab.url = Some(url.to_string());
        tab.clone()
    }

    pub fn close_tab(&self, tab: TabId) {
        let mut state = self.state();
        state.tabs.remove(&tab);
        state.closed_tabs.push(tab);
    }

    pub fn live_tab(&self, tab: TabId) -> Option<Tab> {
        self.state().tabs.get(&tab).cloned()
    }

    /// The most recently opened tab.
    pub fn newest_tab(&self) -> Tab {
        self.state().tabs.values().next_back().cloned().unwrap()
    }

    pub fn badge(&self, tab: TabId) -> Option<bool> {
        self.state().badges.get(&tab).copied()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.state().notifications.clone()
    }
}

fn not_found(what: impl std::fmt::Display) -> PlatformError {
    PlatformError::NotFound(what.to_string())
}

#[async_trait::async_trait]
impl ContainerStore for FakePlatform {
    async fn containers(&self) -> Result<Vec<Container>, PlatformError> {
        Ok(self.state().containers.clone())
    }

    async fn find_containers(&self, name: &str) -> Result<Vec<Container>, PlatformError> {
        let found: Vec<Container> =
            self.state().containers.iter().filter(|c| c.name == name).cloned().collect();
        if self.slow_lookups.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Ok(found)
    }

    async fn container(&self, id: &ContainerId) -> Result<Container, PlatformError> {
        self.state()
            .containers
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| not_found(format!("container {id}")))
    }

    async fn create_container(
        &self,
        name: &str,
        style: ContainerStyle,
    ) -> Result<Container, PlatformError> {
        let id = self.add_container(name);
        let mut state = self.state();
        let container = state.containers.iter_mut().find(|c| c.id == id).unwrap();
        container.style = style;
        Ok(container.clone())
    }

    async fn update_container(
        &self,
        id: &ContainerId,
        name: &str,
        style: ContainerStyle,
    ) -> Result<Container, PlatformError> {
        let mut state = self.state();
        let container = state
            .containers
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found(format!("container {id}")))?;
        container.name = name.to_string();
        container.style = style;
        Ok(container.clone())
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<(), PlatformError> {
        let mut state = self.state();
        let before = state.containers.len();
        state.containers.retain(|c| &c.id != id);
        if state.containers.len() == before {
            return Err(not_found(format!("container {id}")));
        }
        state.tabs.retain(|_, t| &t.container_id != id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl TabStore for FakePlatform {
    async fn tab(&self, id: TabId) -> Result<Tab, PlatformError> {
        self.live_tab(id).ok_or_else(|| not_found(format!("tab {id}")))
    }

    async fn tabs_in(&self, container: &ContainerId) -> Result<Vec<Tab>, PlatformError> {
        Ok(self
            .state()
            .tabs
            .values()
            .filter(|t| &t.container_id == container)
            .cloned()
            .collect())
    }

    async fn create_tab(&self, params: CreateTab) -> Result<Tab, PlatformError> {
        let mut state = self.state();
        state.next_tab += 1;
        let tab = Tab {
            id: state.next_tab,
            url: params.url,
            title: None,
            container_id: params.container_id,
            window_id: params.window_id,
            index: params.index,
            active: params.active,
            opener_tab_id: None,
        };
        state.tabs.insert(tab.id, tab.clone());
        Ok(tab)
    }

    async fn remove_tab(&self, id: TabId) -> Result<(), PlatformError> {
        let mut state = self.state();
        match state.tabs.remove(&id) {
            Some(_) => {
                state.closed_tabs.push(id);
                Ok(())
            }
            None => Err(not_found(format!("tab {id}"))),
        }
    }
}

#[async_trait::async_trait]
impl SettingsStore for FakePlatform {
    async fn get(&self, key: &str) -> Result<Option<Value>, PlatformError> {
        Ok(self.setting(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PlatformError> {
        self.put(key, value);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Feedback for FakePlatform {
    async fn set_badge(&self, tab: TabId, excluded: bool) -> Result<(), PlatformError> {
        self.state().badges.insert(tab, excluded);
        Ok(())
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), PlatformError> {
        self.state()
            .notifications
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

pub fn router(platform: &Arc<FakePlatform>) -> Router<FakePlatform> {
    init_logging();
    Router::with_rng(
        Arc::clone(platform),
        RuntimeConfig::default(),
        fastrand::Rng::with_seed(1),
    )
}
