//! Auto Containers Runtime
//!
//! The browser-facing half of Auto Containers: it reacts to tab events,
//! resolves the container a tab belongs in and replaces tabs that sit in the
//! wrong one. Temporary `tmp_<n>` containers are created on demand and
//! deleted after a quiet period once empty.
//!
//! The host is abstracted behind the [`Platform`] traits so the same router
//! runs against a real browser binding or an in-memory fake.
//!
//! # Modules
//!
//! - `platform`: Host capabilities (containers, tabs, storage, feedback)
//! - `event`: Platform events fed to the router
//! - `registry`: Per-tab tracking flags, URLs and locks
//! - `fsm`: Pure event table and replacement verdicts
//! - `resolver`: Rule lookup and rule container creation
//! - `ephemeral`: Temporary container naming, timers and startup sweep
//! - `handlers`: The [`Router`] carrying out effects
//! - `messages`: Popup and options page requests
//! - `settings`: Typed access to stored settings

pub mod ephemeral;
pub mod error;
pub mod event;
pub mod fsm;
pub mod handlers;
pub mod messages;
pub mod platform;
pub mod registry;
pub mod resolver;
pub mod settings;

pub use ephemeral::{DeletionTimers, EphemeralContainers, ReapStats};
pub use error::{Result, RuntimeError};
pub use event::{LoadStatus, Navigation, PlatformEvent, TabChange};
pub use handlers::Router;
pub use messages::{ExtensionMessage, MessageResponse};
pub use platform::{
    Container, ContainerId, ContainerStore, CreateTab, Feedback, Platform, PlatformError,
    SettingsStore, Tab, TabId, TabStore,
};
pub use registry::{TabEntry, TabFlags, TabRegistry};
pub use resolver::ContainerResolver;
pub use settings::{RuntimeConfig, Settings, StoredSettings, TempContainerStyle};
