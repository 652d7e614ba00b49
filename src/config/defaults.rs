/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
use std::time::Duration;

// Storage defaults
pub const DEFAULT_PROFILE_PATH: &str = "./data";
pub const DEFAULT_PLAYLIST_FILENAME: &str = "playlist.m3u8";
pub const DEFAULT_EPG_FILENAME: &str = "epg.xml";
pub const SOURCES_FILENAME: &str = "sources.json";
pub const SETTINGS_FILENAME: &str = "settings.json";
pub const CHANNELS_CACHE_FILENAME: &str = "channels.json";

// Transport defaults
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

// HTTP defaults
pub const DEFAULT_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// Scheduler defaults
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_SCHEDULER_TICK: Duration = Duration::from_secs(10);

// Host defaults
pub const DEFAULT_ADDONS_PATH: &str = "./addons";
pub const DEFAULT_PVR_ADDON_ID: &str = "pvr.iptvsimple";

// Envelope versions understood by the normalizer
pub const CHANNELS_VERSION: u64 = 1;
pub const EPG_VERSION: u64 = 1;
pub const MANIFEST_VERSION: u64 = 1;

// Runtime setting keys
pub const SETTING_RESTART_AFTER_REFRESH: &str = "iptv_simple_restart";
pub const SETTING_LAST_REFRESHED: &str = "last_refreshed";
