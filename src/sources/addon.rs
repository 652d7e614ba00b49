//! Addon-backed sources
//!
//! An addon opts in through its `iptv.enabled` setting and announces where to
//! ask for data with `iptv.channels_uri` and `iptv.epg_uri`. Addon sources
//! are never persisted; they are derived from the registry on every run.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::{AppResult, SourceError, SourceResult};
use crate::host::{ActionExecutor, AddonInfo, AddonRegistry};
use crate::ingestor::normalize::{decode_reply, normalize_channels, normalize_epg, Reply};
use crate::models::{ChannelPayload, GuidePayload, SourceMeta};
use crate::sources::traits::SourceHandler;
use crate::transport::Transport;
use crate::utils::url::UrlUtils;

pub const SETTING_ENABLED: &str = "iptv.enabled";
pub const SETTING_CHANNELS_URI: &str = "iptv.channels_uri";
pub const SETTING_EPG_URI: &str = "iptv.epg_uri";

pub struct AddonSource {
    addon: AddonInfo,
    enabled: bool,
    channels_uri: Option<String>,
    epg_uri: Option<String>,
    transport: Arc<dyn Transport>,
    actions: Arc<dyn ActionExecutor>,
}

impl AddonSource {
    pub fn new(
        addon: AddonInfo,
        enabled: bool,
        channels_uri: Option<String>,
        epg_uri: Option<String>,
        transport: Arc<dyn Transport>,
        actions: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            addon,
            enabled,
            channels_uri,
            epg_uri,
            transport,
            actions,
        }
    }

    /// Addons that advertise IPTV support, enabled or not
    ///
    /// Addons without an `iptv.enabled` setting do not support IPTV at all
    /// and are left out.
    pub async fn detect_sources(
        registry: &dyn AddonRegistry,
        transport: Arc<dyn Transport>,
        actions: Arc<dyn ActionExecutor>,
    ) -> AppResult<Vec<AddonSource>> {
        let mut sources = Vec::new();

        for addon in registry.plugin_addons().await? {
            let setting = |key: &'static str| {
                let id = addon.id.clone();
                async move {
                    match registry.addon_setting(&id, key).await {
                        Ok(value) => value.filter(|v| !v.is_empty()),
                        Err(e) => {
                            warn!("Could not read {} of {}: {}", key, id, e);
                            None
                        }
                    }
                }
            };

            let Some(enabled) = setting(SETTING_ENABLED).await else {
                continue;
            };
            let channels_uri = setting(SETTING_CHANNELS_URI).await;
            let epg_uri = setting(SETTING_EPG_URI).await;

            debug!("Detected IPTV addon {} (enabled: {})", addon.id, enabled);
            sources.push(AddonSource::new(
                addon,
                enabled == "true",
                channels_uri,
                epg_uri,
                Arc::clone(&transport),
                Arc::clone(&actions),
            ));
        }

        Ok(sources)
    }

    /// Toggle IPTV support of an addon through its settings
    pub async fn set_enabled(
        registry: &dyn AddonRegistry,
        addon_id: &str,
        enabled: bool,
    ) -> AppResult<()> {
        let value = if enabled { "true" } else { "false" };
        registry
            .set_addon_setting(addon_id, SETTING_ENABLED, value)
            .await?;
        info!("Set {} of {} to {}", SETTING_ENABLED, addon_id, value);
        Ok(())
    }

    pub fn addon_id(&self) -> &str {
        &self.addon.id
    }

    pub fn channels_uri(&self) -> Option<&str> {
        self.channels_uri.as_deref()
    }

    pub fn epg_uri(&self) -> Option<&str> {
        self.epg_uri.as_deref()
    }

    fn meta(&self) -> SourceMeta {
        SourceMeta {
            name: self.addon.name.clone(),
            path: Some(self.addon.path.clone()),
            icon: self.addon.icon.clone(),
        }
    }

    async fn request(&self, uri: &str) -> SourceResult<Reply> {
        if !UrlUtils::is_plugin_uri(uri) {
            return Err(SourceError::NotImplemented {
                uri: UrlUtils::obfuscate_credentials(uri),
            });
        }

        let bytes = self.transport.exchange(uri, self.actions.as_ref()).await?;
        decode_reply(&bytes)
    }
}

#[async_trait]
impl SourceHandler for AddonSource {
    fn display_name(&self) -> &str {
        &self.addon.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn fetch_channels(&self) -> SourceResult<ChannelPayload> {
        let Some(uri) = self.channels_uri.as_deref() else {
            return Ok(ChannelPayload::empty());
        };

        info!("Requesting channels from {}...", UrlUtils::obfuscate_credentials(uri));
        let reply = self.request(uri).await?;
        normalize_channels(reply, &self.meta(), uri)
    }

    async fn fetch_epg(&self) -> SourceResult<GuidePayload> {
        let Some(uri) = self.epg_uri.as_deref() else {
            return Ok(GuidePayload::empty());
        };

        info!("Requesting epg from {}...", UrlUtils::obfuscate_credentials(uri));
        let reply = self.request(uri).await?;
        normalize_epg(reply, uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::host::HostAction;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct NoopActions;

    #[async_trait]
    impl ActionExecutor for NoopActions {
        async fn execute(&self, _action: HostAction) -> AppResult<()> {
            Ok(())
        }
    }

    /// Replies with a canned body regardless of the trigger
    struct CannedTransport {
        reply: SourceResult<Vec<u8>>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn exchange(
            &self,
            _template: &str,
            _executor: &dyn ActionExecutor,
        ) -> SourceResult<Vec<u8>> {
            match &self.reply {
                Ok(bytes) => Ok(bytes.clone()),
                Err(_) => Err(SourceError::fetch_failed("no reply")),
            }
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        addons: Vec<AddonInfo>,
        settings: Mutex<HashMap<(String, String), String>>,
    }

    #[async_trait]
    impl AddonRegistry for FakeRegistry {
        async fn plugin_addons(&self) -> AppResult<Vec<AddonInfo>> {
            Ok(self.addons.clone())
        }

        async fn addon_setting(&self, addon_id: &str, key: &str) -> AppResult<Option<String>> {
            Ok(self
                .settings
                .lock()
                .unwrap()
                .get(&(addon_id.to_string(), key.to_string()))
                .cloned())
        }

        async fn set_addon_setting(&self, addon_id: &str, key: &str, value: &str) -> AppResult<()> {
            self.settings
                .lock()
                .unwrap()
                .insert((addon_id.to_string(), key.to_string()), value.to_string());
            Ok(())
        }

        async fn set_addon_enabled(&self, _addon_id: &str, _enabled: bool) -> AppResult<()> {
            Err(AppError::internal("not supported"))
        }
    }

    fn addon(id: &str) -> AddonInfo {
        AddonInfo {
            id: id.to_string(),
            name: format!("Name of {id}"),
            path: PathBuf::from(format!("/addons/{id}")),
            icon: None,
        }
    }

    fn source_with_reply(channels_uri: &str, reply: &[u8]) -> AddonSource {
        AddonSource::new(
            addon("plugin.video.example"),
            true,
            Some(channels_uri.to_string()),
            Some("plugin://plugin.video.example/iptv/epg".to_string()),
            Arc::new(CannedTransport {
                reply: Ok(reply.to_vec()),
            }),
            Arc::new(NoopActions),
        )
    }

    #[tokio::test]
    async fn test_detect_sources_reads_settings() {
        let registry = FakeRegistry {
            addons: vec![addon("a"), addon("b"), addon("c")],
            ..FakeRegistry::default()
        };
        registry.set_addon_setting("a", SETTING_ENABLED, "true").await.unwrap();
        registry
            .set_addon_setting("a", SETTING_CHANNELS_URI, "plugin://a/channels")
            .await
            .unwrap();
        registry.set_addon_setting("b", SETTING_ENABLED, "false").await.unwrap();

        let sources = AddonSource::detect_sources(
            &registry,
            Arc::new(CannedTransport { reply: Ok(Vec::new()) }),
            Arc::new(NoopActions),
        )
        .await
        .unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources[0].is_enabled());
        assert_eq!(sources[0].channels_uri(), Some("plugin://a/channels"));
        assert_eq!(sources[0].epg_uri(), None);
        assert!(!sources[1].is_enabled());
    }

    #[tokio::test]
    async fn test_set_enabled_writes_setting() {
        let registry = FakeRegistry::default();
        AddonSource::set_enabled(&registry, "a", false).await.unwrap();
        assert_eq!(
            registry.addon_setting("a", SETTING_ENABLED).await.unwrap(),
            Some("false".to_string())
        );
    }

    #[tokio::test]
    async fn test_structured_channels_are_normalized() {
        let source = source_with_reply(
            "plugin://plugin.video.example/iptv/channels",
            br#"{"version": 1, "streams": [{"name": "C1", "stream": "plugin://x/play/1", "logo": "one.png"}]}"#,
        );

        let ChannelPayload::Structured(channels) = source.fetch_channels().await.unwrap() else {
            panic!("expected structured channels");
        };
        assert_eq!(channels[0].logo.as_deref(), Some("/addons/plugin.video.example/one.png"));
        assert!(channels[0].group.contains("Name of plugin.video.example"));
    }

    #[tokio::test]
    async fn test_non_plugin_uri_is_not_implemented() {
        let source = source_with_reply("http://example.com/channels.json", b"{}");
        assert!(matches!(
            source.fetch_channels().await,
            Err(SourceError::NotImplemented { .. })
        ));
        assert!(source.get_channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_version_yields_empty() {
        let source = source_with_reply(
            "plugin://plugin.video.example/iptv/channels",
            br#"{"version": 999, "streams": [{"name": "C1", "stream": "x"}]}"#,
        );
        assert!(source.get_channels().await.is_empty());
    }
}
