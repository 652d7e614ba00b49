use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the generated files and the persisted stores
    #[serde(default = "default_profile_path")]
    pub profile_path: PathBuf,
    #[serde(default = "default_playlist_filename")]
    pub playlist_filename: String,
    #[serde(default = "default_epg_filename")]
    pub epg_filename: String,
}

/// How replies are collected from plugin sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Loopback socket the plugin connects back to
    #[default]
    Socket,
    /// Temp file the plugin writes, polled until complete
    FilePoll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    /// Bounds the wait for the plugin to connect back (not the transfer)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Poll interval of the file-poll transport
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_refresh_interval", with = "duration_serde")]
    pub refresh_interval: Duration,
    #[serde(default = "default_scheduler_tick", with = "duration_serde")]
    pub tick: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Directory scanned for legacy `iptv.json` manifests
    #[serde(default = "default_addons_path")]
    pub addons_path: PathBuf,
    /// Addon id of the downstream PVR client restarted after a refresh
    #[serde(default = "default_pvr_addon_id")]
    pub pvr_addon_id: String,
    /// Program and leading arguments used for non-plugin `PlayMedia` actions
    #[serde(default)]
    pub player_command: Vec<String>,
    /// Plugin addons known to the local host
    #[serde(default)]
    pub addons: Vec<AddonConfig>,
}

/// A plugin addon as declared in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonConfig {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub icon: Option<String>,
    /// Program and leading arguments used to run the plugin
    #[serde(default)]
    pub command: Vec<String>,
    /// Addon settings, e.g. `iptv.enabled`, `iptv.channels_uri`, `iptv.epg_uri`
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

fn default_profile_path() -> PathBuf {
    PathBuf::from(DEFAULT_PROFILE_PATH)
}

fn default_playlist_filename() -> String {
    DEFAULT_PLAYLIST_FILENAME.to_string()
}

fn default_epg_filename() -> String {
    DEFAULT_EPG_FILENAME.to_string()
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_http_connect_timeout() -> Duration {
    DEFAULT_HTTP_CONNECT_TIMEOUT
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

fn default_scheduler_tick() -> Duration {
    DEFAULT_SCHEDULER_TICK
}

fn default_addons_path() -> PathBuf {
    PathBuf::from(DEFAULT_ADDONS_PATH)
}

fn default_pvr_addon_id() -> String {
    DEFAULT_PVR_ADDON_ID.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            profile_path: default_profile_path(),
            playlist_filename: default_playlist_filename(),
            epg_filename: default_epg_filename(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            connect_timeout: default_connect_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_http_connect_timeout(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            tick: default_scheduler_tick(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            addons_path: default_addons_path(),
            pvr_addon_id: default_pvr_addon_id(),
            player_command: Vec::new(),
            addons: Vec::new(),
        }
    }
}

impl StorageConfig {
    pub fn playlist_path(&self) -> PathBuf {
        self.profile_path.join(&self.playlist_filename)
    }

    pub fn epg_path(&self) -> PathBuf {
        self.profile_path.join(&self.epg_filename)
    }

    pub fn sources_path(&self) -> PathBuf {
        self.profile_path.join(SOURCES_FILENAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.profile_path.join(SETTINGS_FILENAME)
    }

    pub fn channels_cache_path(&self) -> PathBuf {
        self.profile_path.join(CHANNELS_CACHE_FILENAME)
    }
}

impl Config {
    pub fn load_from_file(config_file: &Path) -> AppResult<Self> {
        if config_file.exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents).map_err(|e| {
                AppError::configuration(format!("{}: {e}", config_file.display()))
            })
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)
                .map_err(|e| AppError::configuration(e.to_string()))?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file.display());
            Ok(default_config)
        }
    }
}
