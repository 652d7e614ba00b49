//! Legacy `iptv.json` manifest discovery
//!
//! Older addons announce their IPTV support with an `iptv.json` file in
//! their install directory instead of addon settings:
//!
//! ```json
//! {"version": 1, "channels": "plugin://plugin.video.x/iptv/channels", "epg": "plugin://plugin.video.x/iptv/epg"}
//! ```
//!
//! The directory name is the addon id. Manifests with a newer version, or
//! that cannot be parsed, are skipped with a warning.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::defaults::MANIFEST_VERSION;
use crate::host::AddonInfo;

pub const MANIFEST_FILENAME: &str = "iptv.json";

#[derive(Debug, Deserialize)]
struct IptvManifest {
    #[serde(default = "default_version")]
    version: u64,
    #[serde(default)]
    channels: Option<String>,
    #[serde(default)]
    epg: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    /// How the local host launches the plugin
    #[serde(default)]
    command: Vec<String>,
}

fn default_version() -> u64 {
    1
}

/// An addon found through its manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAddon {
    pub info: AddonInfo,
    pub channels_uri: Option<String>,
    pub epg_uri: Option<String>,
    pub command: Vec<String>,
}

/// Scan `addons_path/*/iptv.json`, sorted by addon id
pub fn discover_manifests(addons_path: &Path) -> Vec<DiscoveredAddon> {
    let entries = match std::fs::read_dir(addons_path) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No addons directory at {}: {}", addons_path.display(), e);
            return Vec::new();
        }
    };

    let mut discovered: Vec<DiscoveredAddon> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.join(MANIFEST_FILENAME).is_file())
        .filter_map(|path| load_manifest(&path))
        .collect();

    discovered.sort_by(|a, b| a.info.id.cmp(&b.info.id));
    discovered
}

fn load_manifest(addon_dir: &Path) -> Option<DiscoveredAddon> {
    let manifest_path = addon_dir.join(MANIFEST_FILENAME);
    let addon_id = addon_dir.file_name()?.to_string_lossy().to_string();

    let contents = match std::fs::read_to_string(&manifest_path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Could not read {}: {}", manifest_path.display(), e);
            return None;
        }
    };

    let manifest: IptvManifest = match serde_json::from_str(&contents) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("Skipping invalid manifest {}: {}", manifest_path.display(), e);
            return None;
        }
    };

    if manifest.version > MANIFEST_VERSION {
        warn!(
            "Skipping {} since it uses an unsupported version: {}",
            manifest_path.display(),
            manifest.version
        );
        return None;
    }

    debug!("Discovered IPTV manifest for {}", addon_id);

    Some(DiscoveredAddon {
        info: AddonInfo {
            name: manifest.name.unwrap_or_else(|| addon_id.clone()),
            id: addon_id,
            path: PathBuf::from(addon_dir),
            icon: manifest.icon,
        },
        channels_uri: manifest.channels.filter(|uri| !uri.is_empty()),
        epg_uri: manifest.epg.filter(|uri| !uri.is_empty()),
        command: manifest.command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(root: &Path, id: &str, body: &str) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILENAME), body).unwrap();
    }

    #[test]
    fn test_discovers_valid_manifests_sorted() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(
            root.path(),
            "plugin.video.b",
            r#"{"version": 1, "channels": "plugin://plugin.video.b/channels", "epg": ""}"#,
        );
        write_manifest(
            root.path(),
            "plugin.video.a",
            r#"{"channels": "plugin://plugin.video.a/channels", "name": "Example A"}"#,
        );
        std::fs::create_dir_all(root.path().join("plugin.video.nomanifest")).unwrap();

        let found = discover_manifests(root.path());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].info.id, "plugin.video.a");
        assert_eq!(found[0].info.name, "Example A");
        assert_eq!(found[1].info.name, "plugin.video.b");
        assert_eq!(found[1].epg_uri, None);
        assert_eq!(found[1].info.path, root.path().join("plugin.video.b"));
    }

    #[test]
    fn test_skips_newer_and_invalid_manifests() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(root.path(), "plugin.video.new", r#"{"version": 2, "channels": "x"}"#);
        write_manifest(root.path(), "plugin.video.bad", "not json");

        assert!(discover_manifests(root.path()).is_empty());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let root = tempfile::tempdir().unwrap();
        assert!(discover_manifests(&root.path().join("nope")).is_empty());
    }
}
