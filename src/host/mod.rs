//! Capabilities the aggregation engine needs from its host
//!
//! The engine never renders UI, owns addon state or plays media itself. It
//! calls into the host through the traits below: execute an action, read
//! and write settings, query the addon registry, report progress, ask the
//! user, and check whether something is playing. [`local::LocalHost`] is a
//! standalone implementation driven by the configuration file; tests supply
//! their own fakes.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppResult;

pub mod console;
pub mod local;
pub mod settings;

pub use console::{ConsoleDialogs, ConsoleProgress};
pub use local::LocalHost;
pub use settings::JsonSettingsStore;

/// An action the host performs on our behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Launch a plugin by its `plugin://` URI
    RunPlugin(String),
    /// Start playback of a URI
    PlayMedia(String),
}

/// Fire-and-forget action execution
///
/// `execute` returns as soon as the action has been launched; it never waits
/// for, or reads, a result.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: HostAction) -> AppResult<()>;
}

/// An installed plugin addon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonInfo {
    pub id: String,
    pub name: String,
    /// Install directory, used to resolve relative logo paths
    pub path: PathBuf,
    pub icon: Option<String>,
}

/// The host's addon registry and per-addon settings
#[async_trait]
pub trait AddonRegistry: Send + Sync {
    /// All enabled plugin addons
    async fn plugin_addons(&self) -> AppResult<Vec<AddonInfo>>;

    async fn addon_setting(&self, addon_id: &str, key: &str) -> AppResult<Option<String>>;

    async fn set_addon_setting(&self, addon_id: &str, key: &str, value: &str) -> AppResult<()>;

    /// Enable or disable an addon as a whole
    async fn set_addon_enabled(&self, addon_id: &str, enabled: bool) -> AppResult<()>;
}

/// Global key/value settings
pub trait SettingsStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str) -> AppResult<()>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn set_int(&self, key: &str, value: i64) -> AppResult<()>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&self, key: &str, value: bool) -> AppResult<()>;
}

/// Progress display for a manual refresh
pub trait ProgressReporter: Send + Sync {
    fn update(&self, percent: u8, message: &str);
    /// Whether the user asked to cancel
    fn is_cancelled(&self) -> bool;
    fn close(&self);
}

/// Current playback state of the host player
pub trait PlaybackMonitor: Send + Sync {
    fn is_playing_tv(&self) -> bool;
    fn is_playing_radio(&self) -> bool;

    fn is_playing(&self) -> bool {
        self.is_playing_tv() || self.is_playing_radio()
    }
}

/// User-facing dialogs
#[async_trait]
pub trait Dialogs: Send + Sync {
    fn ok(&self, heading: &str, message: &str);

    fn notify(&self, message: &str);

    /// Ask the user to pick one of `options`; `None` when dismissed
    async fn select(&self, heading: &str, options: &[String]) -> Option<usize>;

    async fn yes_no(&self, heading: &str, message: &str) -> bool;
}

/// All host capabilities bundled for the engine
#[derive(Clone)]
pub struct Host {
    pub actions: Arc<dyn ActionExecutor>,
    pub addons: Arc<dyn AddonRegistry>,
    pub settings: Arc<dyn SettingsStore>,
    pub playback: Arc<dyn PlaybackMonitor>,
    pub dialogs: Arc<dyn Dialogs>,
}
