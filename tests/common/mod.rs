//! Shared fake host for integration tests
//!
//! Plugin triggers are answered for real: the fake executor reads the `port`
//! query parameter of the trigger URI and connects back over loopback with
//! the reply registered for that URI.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use iptv_manager::config::StorageConfig;
use iptv_manager::errors::AppResult;
use iptv_manager::host::{
    ActionExecutor, AddonInfo, AddonRegistry, Dialogs, Host, HostAction, PlaybackMonitor,
    ProgressReporter, SettingsStore,
};
use iptv_manager::ingestor::Aggregator;
use iptv_manager::services::{CatchupService, PvrRestarter};
use iptv_manager::sources::{SourceCatalog, SourceStore};
use iptv_manager::transport::SocketTransport;
use iptv_manager::utils::StandardHttpClient;

#[derive(Default)]
pub struct FakeHost {
    addons: Mutex<Vec<(AddonInfo, HashMap<String, String>)>>,
    replies: Mutex<HashMap<String, Vec<u8>>>,
    settings: Mutex<HashMap<String, String>>,
    pub actions: Mutex<Vec<HostAction>>,
    pub toggles: Mutex<Vec<(String, bool)>>,
    pub notifications: Mutex<Vec<String>>,
    pub playing: AtomicBool,
    pub selection: Mutex<Option<usize>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an IPTV addon with its channels and guide URIs
    pub fn add_addon(&self, id: &str, name: &str, enabled: bool, channels: Option<&str>, epg: Option<&str>) {
        let mut settings = HashMap::new();
        settings.insert(
            "iptv.enabled".to_string(),
            if enabled { "true" } else { "false" }.to_string(),
        );
        if let Some(uri) = channels {
            settings.insert("iptv.channels_uri".to_string(), uri.to_string());
        }
        if let Some(uri) = epg {
            settings.insert("iptv.epg_uri".to_string(), uri.to_string());
        }

        self.addons.lock().unwrap().push((
            AddonInfo {
                id: id.to_string(),
                name: name.to_string(),
                path: PathBuf::from(format!("/addons/{id}")),
                icon: None,
            },
            settings,
        ));
    }

    /// Reply sent back when `uri` (without its query) is triggered
    pub fn reply(&self, uri: &str, body: &[u8]) {
        self.replies
            .lock()
            .unwrap()
            .insert(uri.to_string(), body.to_vec());
    }

    pub fn triggered(&self) -> Vec<HostAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn host(self: &Arc<Self>) -> Host {
        Host {
            actions: self.clone(),
            addons: self.clone(),
            settings: self.clone(),
            playback: self.clone(),
            dialogs: self.clone(),
        }
    }
}

#[async_trait]
impl ActionExecutor for FakeHost {
    async fn execute(&self, action: HostAction) -> AppResult<()> {
        self.actions.lock().unwrap().push(action.clone());

        let HostAction::RunPlugin(uri) = action else {
            return Ok(());
        };
        let parsed = url::Url::parse(&uri).unwrap();
        let port: u16 = parsed
            .query_pairs()
            .find(|(key, _)| key == "port")
            .map(|(_, value)| value.parse().unwrap())
            .unwrap();
        let base = uri.split('?').next().unwrap().to_string();

        let Some(body) = self.replies.lock().unwrap().get(&base).cloned() else {
            return Ok(());
        };
        tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream.write_all(&body).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        Ok(())
    }
}

#[async_trait]
impl AddonRegistry for FakeHost {
    async fn plugin_addons(&self) -> AppResult<Vec<AddonInfo>> {
        Ok(self
            .addons
            .lock()
            .unwrap()
            .iter()
            .map(|(info, _)| info.clone())
            .collect())
    }

    async fn addon_setting(&self, addon_id: &str, key: &str) -> AppResult<Option<String>> {
        Ok(self
            .addons
            .lock()
            .unwrap()
            .iter()
            .find(|(info, _)| info.id == addon_id)
            .and_then(|(_, settings)| settings.get(key).cloned()))
    }

    async fn set_addon_setting(&self, addon_id: &str, key: &str, value: &str) -> AppResult<()> {
        if let Some((_, settings)) = self
            .addons
            .lock()
            .unwrap()
            .iter_mut()
            .find(|(info, _)| info.id == addon_id)
        {
            settings.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn set_addon_enabled(&self, addon_id: &str, enabled: bool) -> AppResult<()> {
        self.toggles
            .lock()
            .unwrap()
            .push((addon_id.to_string(), enabled));
        Ok(())
    }
}

impl SettingsStore for FakeHost {
    fn get_string(&self, key: &str) -> Option<String> {
        self.settings.lock().unwrap().get(key).cloned()
    }

    fn set_string(&self, key: &str, value: &str) -> AppResult<()> {
        self.settings
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get_string(key).and_then(|v| v.parse().ok())
    }

    fn set_int(&self, key: &str, value: i64) -> AppResult<()> {
        self.set_string(key, &value.to_string())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_string(key).map(|v| v == "true")
    }

    fn set_bool(&self, key: &str, value: bool) -> AppResult<()> {
        self.set_string(key, if value { "true" } else { "false" })
    }
}

impl PlaybackMonitor for FakeHost {
    fn is_playing_tv(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn is_playing_radio(&self) -> bool {
        false
    }
}

#[async_trait]
impl Dialogs for FakeHost {
    fn ok(&self, _heading: &str, message: &str) {
        self.notifications.lock().unwrap().push(message.to_string());
    }

    fn notify(&self, message: &str) {
        self.notifications.lock().unwrap().push(message.to_string());
    }

    async fn select(&self, _heading: &str, _options: &[String]) -> Option<usize> {
        *self.selection.lock().unwrap()
    }

    async fn yes_no(&self, _heading: &str, _message: &str) -> bool {
        true
    }
}

/// Progress that reports cancellation from the `after`-th check on
pub struct CancelAfter {
    checks: AtomicUsize,
    after: usize,
    pub closed: AtomicBool,
}

impl CancelAfter {
    pub fn new(after: usize) -> Self {
        Self {
            checks: AtomicUsize::new(0),
            after,
            closed: AtomicBool::new(false),
        }
    }

    pub fn never() -> Self {
        Self::new(usize::MAX)
    }
}

impl ProgressReporter for CancelAfter {
    fn update(&self, _percent: u8, _message: &str) {}

    fn is_cancelled(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst) + 1 >= self.after
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn storage(profile: &Path) -> StorageConfig {
    StorageConfig {
        profile_path: profile.to_path_buf(),
        ..StorageConfig::default()
    }
}

/// Aggregator over a fake host, with a short connect timeout
pub fn aggregator(fake: &Arc<FakeHost>, profile: &Path) -> Aggregator {
    let storage = storage(profile);
    let host = fake.host();
    let store = SourceStore::new(
        storage.sources_path(),
        vec![storage.playlist_path(), storage.epg_path()],
    );
    let catalog = SourceCatalog {
        host: host.clone(),
        store: Arc::new(store),
        transport: Arc::new(SocketTransport::new(Duration::from_millis(500))),
        http: Arc::new(StandardHttpClient::new().unwrap()),
    };
    let restarter = PvrRestarter::new(host.clone(), "pvr.iptvsimple").with_pause(Duration::ZERO);
    let catchup = CatchupService::new(storage.channels_cache_path(), host);

    Aggregator::new(catalog, storage, restarter, catchup)
}

/// Every event of the document parses
pub fn assert_well_formed(xml: &str) {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("guide is not well-formed: {e}\n{xml}"),
        }
    }
}
