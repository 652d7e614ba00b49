//! Standalone host backed by the configuration file
//!
//! Plugins are external programs declared in `[[host.addons]]` (or in a
//! legacy `iptv.json` manifest). Running a plugin spawns its command with the
//! same three arguments a media-center plugin receives: the base URI, a
//! handle and the query string. Addon settings start from the configured
//! values and are overridden by whatever was written to the settings store.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::HostConfig;
use crate::errors::{AppError, AppResult};
use crate::host::{
    ActionExecutor, AddonInfo, AddonRegistry, HostAction, PlaybackMonitor, SettingsStore,
};
use crate::sources::discovery::discover_manifests;
use crate::utils::url::UrlUtils;

/// Handle passed to plugins that are run rather than listed
const RUN_PLUGIN_HANDLE: &str = "-1";

#[derive(Debug, Clone)]
struct LocalAddon {
    info: AddonInfo,
    command: Vec<String>,
    defaults: BTreeMap<String, String>,
}

pub struct LocalHost {
    addons: Vec<LocalAddon>,
    player_command: Vec<String>,
    settings: Arc<dyn SettingsStore>,
}

impl LocalHost {
    pub fn new(config: &HostConfig, settings: Arc<dyn SettingsStore>) -> Self {
        let mut addons: Vec<LocalAddon> = config
            .addons
            .iter()
            .map(|addon| LocalAddon {
                info: AddonInfo {
                    id: addon.id.clone(),
                    name: addon.name.clone(),
                    path: addon.path.clone(),
                    icon: addon.icon.clone(),
                },
                command: addon.command.clone(),
                defaults: addon.settings.clone(),
            })
            .collect();

        for discovered in discover_manifests(&config.addons_path) {
            if addons.iter().any(|a| a.info.id == discovered.info.id) {
                debug!(
                    "Addon {} is configured explicitly, ignoring its manifest",
                    discovered.info.id
                );
                continue;
            }

            let mut defaults = BTreeMap::new();
            defaults.insert("iptv.enabled".to_string(), "true".to_string());
            if let Some(uri) = discovered.channels_uri {
                defaults.insert("iptv.channels_uri".to_string(), uri);
            }
            if let Some(uri) = discovered.epg_uri {
                defaults.insert("iptv.epg_uri".to_string(), uri);
            }

            addons.push(LocalAddon {
                info: discovered.info,
                command: discovered.command,
                defaults,
            });
        }

        info!("Local host knows {} plugin addon(s)", addons.len());

        Self {
            addons,
            player_command: config.player_command.clone(),
            settings,
        }
    }

    fn find(&self, addon_id: &str) -> Option<&LocalAddon> {
        self.addons.iter().find(|a| a.info.id == addon_id)
    }

    fn setting_key(addon_id: &str, key: &str) -> String {
        format!("addon:{addon_id}:{key}")
    }

    fn is_enabled(&self, addon_id: &str) -> bool {
        self.settings
            .get_bool(&Self::setting_key(addon_id, "enabled"))
            .unwrap_or(true)
    }

    /// Spawn a program and reap it in the background
    fn spawn_detached(
        program: &str,
        args: &[String],
        current_dir: Option<&PathBuf>,
        label: String,
    ) -> AppResult<()> {
        let mut command = Command::new(program);
        command.args(args).stdin(std::process::Stdio::null());
        if let Some(dir) = current_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| AppError::internal(format!("Failed to launch {label}: {e}")))?;

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("{} finished", label),
                Ok(status) => error!("{} exited with {}", label, status),
                Err(e) => error!("Failed waiting for {}: {}", label, e),
            }
        });

        Ok(())
    }

    fn run_plugin(&self, uri: &str) -> AppResult<()> {
        let addon_id = UrlUtils::plugin_id(uri)
            .ok_or_else(|| AppError::validation(format!("Not a plugin URI: {uri}")))?;
        let addon = self
            .find(&addon_id)
            .ok_or_else(|| AppError::not_found("addon", &addon_id))?;

        let (program, leading) = addon.command.split_first().ok_or_else(|| {
            AppError::configuration(format!("No command configured for addon {addon_id}"))
        })?;

        let (base, query) = match uri.split_once('?') {
            Some((base, query)) => (base.to_string(), format!("?{query}")),
            None => (uri.to_string(), String::new()),
        };

        let mut args: Vec<String> = leading.to_vec();
        args.extend([base, RUN_PLUGIN_HANDLE.to_string(), query]);

        info!("Executing RunPlugin({})", UrlUtils::obfuscate_credentials(uri));
        Self::spawn_detached(program, &args, Some(&addon.info.path), addon_id)
    }

    fn play_media(&self, uri: &str) -> AppResult<()> {
        if UrlUtils::is_plugin_uri(uri) {
            return self.run_plugin(uri);
        }

        match self.player_command.split_first() {
            Some((program, leading)) => {
                let mut args = leading.to_vec();
                args.push(uri.to_string());
                info!("Playing {}", UrlUtils::obfuscate_credentials(uri));
                Self::spawn_detached(program, &args, None, program.clone())
            }
            None => {
                info!("No player configured, stream URI: {}", uri);
                println!("{uri}");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for LocalHost {
    async fn execute(&self, action: HostAction) -> AppResult<()> {
        match action {
            HostAction::RunPlugin(uri) => self.run_plugin(&uri),
            HostAction::PlayMedia(uri) => self.play_media(&uri),
        }
    }
}

#[async_trait]
impl AddonRegistry for LocalHost {
    async fn plugin_addons(&self) -> AppResult<Vec<AddonInfo>> {
        Ok(self
            .addons
            .iter()
            .filter(|a| self.is_enabled(&a.info.id))
            .map(|a| a.info.clone())
            .collect())
    }

    async fn addon_setting(&self, addon_id: &str, key: &str) -> AppResult<Option<String>> {
        let addon = self
            .find(addon_id)
            .ok_or_else(|| AppError::not_found("addon", addon_id))?;

        Ok(self
            .settings
            .get_string(&Self::setting_key(addon_id, key))
            .or_else(|| addon.defaults.get(key).cloned()))
    }

    async fn set_addon_setting(&self, addon_id: &str, key: &str, value: &str) -> AppResult<()> {
        if self.find(addon_id).is_none() {
            return Err(AppError::not_found("addon", addon_id));
        }
        self.settings
            .set_string(&Self::setting_key(addon_id, key), value)
    }

    async fn set_addon_enabled(&self, addon_id: &str, enabled: bool) -> AppResult<()> {
        info!(
            "{} addon {}",
            if enabled { "Enabling" } else { "Disabling" },
            addon_id
        );
        self.settings
            .set_bool(&Self::setting_key(addon_id, "enabled"), enabled)
    }
}

/// The local host has no player of its own to observe
impl PlaybackMonitor for LocalHost {
    fn is_playing_tv(&self) -> bool {
        false
    }

    fn is_playing_radio(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AddonConfig;
    use crate::host::JsonSettingsStore;
    use std::time::Duration;

    fn host_with_addon(root: &std::path::Path, command: Vec<String>) -> LocalHost {
        let addon_path = root.join("plugin.video.example");
        std::fs::create_dir_all(&addon_path).unwrap();

        let mut settings = BTreeMap::new();
        settings.insert("iptv.enabled".to_string(), "true".to_string());
        settings.insert(
            "iptv.channels_uri".to_string(),
            "plugin://plugin.video.example/iptv/channels".to_string(),
        );

        let config = HostConfig {
            addons_path: root.join("addons"),
            addons: vec![AddonConfig {
                id: "plugin.video.example".to_string(),
                name: "Example".to_string(),
                path: addon_path,
                icon: None,
                command,
                settings,
            }],
            ..HostConfig::default()
        };
        let store = Arc::new(JsonSettingsStore::open(&root.join("settings.json")));
        LocalHost::new(&config, store)
    }

    #[tokio::test]
    async fn test_addon_settings_fall_back_to_configuration() {
        let root = tempfile::tempdir().unwrap();
        let host = host_with_addon(root.path(), Vec::new());

        assert_eq!(
            host.addon_setting("plugin.video.example", "iptv.enabled").await.unwrap(),
            Some("true".to_string())
        );

        host.set_addon_setting("plugin.video.example", "iptv.enabled", "false")
            .await
            .unwrap();
        assert_eq!(
            host.addon_setting("plugin.video.example", "iptv.enabled").await.unwrap(),
            Some("false".to_string())
        );
        assert!(host.addon_setting("plugin.video.unknown", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_addons_are_hidden() {
        let root = tempfile::tempdir().unwrap();
        let host = host_with_addon(root.path(), Vec::new());

        assert_eq!(host.plugin_addons().await.unwrap().len(), 1);
        host.set_addon_enabled("plugin.video.example", false).await.unwrap();
        assert!(host.plugin_addons().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_plugin_without_command_fails() {
        let root = tempfile::tempdir().unwrap();
        let host = host_with_addon(root.path(), Vec::new());

        let result = host
            .execute(HostAction::RunPlugin(
                "plugin://plugin.video.example/iptv/channels?port=1".to_string(),
            ))
            .await;
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_plugin_passes_plugin_arguments() {
        let root = tempfile::tempdir().unwrap();
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"printf '%s|%s|%s' "$1" "$2" "$3" > args.txt"#.to_string(),
            "sh".to_string(),
        ];
        let host = host_with_addon(root.path(), command);

        host.execute(HostAction::RunPlugin(
            "plugin://plugin.video.example/iptv/channels?port=4242".to_string(),
        ))
        .await
        .unwrap();

        let output = root.path().join("plugin.video.example").join("args.txt");
        let mut contents = String::new();
        for _ in 0..50 {
            if let Ok(text) = std::fs::read_to_string(&output) {
                if !text.is_empty() {
                    contents = text;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        assert_eq!(
            contents,
            "plugin://plugin.video.example/iptv/channels|-1|?port=4242"
        );
    }

    #[tokio::test]
    async fn test_manifest_addons_are_registered() {
        let root = tempfile::tempdir().unwrap();
        let manifest_dir = root.path().join("addons").join("plugin.video.legacy");
        std::fs::create_dir_all(&manifest_dir).unwrap();
        std::fs::write(
            manifest_dir.join("iptv.json"),
            r#"{"version": 1, "channels": "plugin://plugin.video.legacy/channels"}"#,
        )
        .unwrap();

        let host = host_with_addon(root.path(), Vec::new());
        let ids: Vec<String> = host
            .plugin_addons()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["plugin.video.example", "plugin.video.legacy"]);
        assert_eq!(
            host.addon_setting("plugin.video.legacy", "iptv.channels_uri")
                .await
                .unwrap(),
            Some("plugin://plugin.video.legacy/channels".to_string())
        );
    }
}
