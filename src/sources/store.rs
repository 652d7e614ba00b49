//! Persisted store of user-defined sources (`sources.json`)
//!
//! The document is an object keyed by source uuid. Every mutation reads the
//! current document, changes one entry and writes it back atomically; there
//! is no locking between processes. A missing or corrupt document reads as
//! empty.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::generator::publish::write_atomic_blocking;
use crate::sources::external::{ExternalSource, Location};

const TYPE_NONE: u8 = 0;
const TYPE_URL: u8 = 1;
const TYPE_FILE: u8 = 2;

/// On-disk shape of one source
#[derive(Debug, Serialize, Deserialize)]
struct StoredSource {
    uuid: String,
    name: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    playlist_uri: Option<String>,
    #[serde(default)]
    playlist_type: u8,
    #[serde(default)]
    epg_uri: Option<String>,
    #[serde(default)]
    epg_type: u8,
}

fn location_from(kind: u8, uri: Option<String>) -> Option<Location> {
    match (kind, uri) {
        (TYPE_URL, Some(uri)) if !uri.is_empty() => Some(Location::Url(uri)),
        (TYPE_FILE, Some(uri)) if !uri.is_empty() => Some(Location::File(PathBuf::from(uri))),
        _ => None,
    }
}

fn location_into(location: &Option<Location>) -> (u8, Option<String>) {
    match location {
        None => (TYPE_NONE, None),
        Some(Location::Url(url)) => (TYPE_URL, Some(url.clone())),
        Some(Location::File(path)) => (TYPE_FILE, Some(path.to_string_lossy().into_owned())),
    }
}

impl TryFrom<StoredSource> for ExternalSource {
    type Error = uuid::Error;

    fn try_from(stored: StoredSource) -> Result<Self, Self::Error> {
        Ok(ExternalSource {
            uuid: Uuid::parse_str(&stored.uuid)?,
            name: stored.name,
            enabled: stored.enabled,
            playlist: location_from(stored.playlist_type, stored.playlist_uri),
            epg: location_from(stored.epg_type, stored.epg_uri),
        })
    }
}

impl From<&ExternalSource> for StoredSource {
    fn from(source: &ExternalSource) -> Self {
        let (playlist_type, playlist_uri) = location_into(&source.playlist);
        let (epg_type, epg_uri) = location_into(&source.epg);
        StoredSource {
            uuid: source.uuid.to_string(),
            name: source.name.clone(),
            enabled: source.enabled,
            playlist_uri,
            playlist_type,
            epg_uri,
            epg_type,
        }
    }
}

/// Which document of a source a location is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Playlist,
    Epg,
}

pub struct SourceStore {
    path: PathBuf,
    /// Generated files that may never be used as a source
    protected_outputs: Vec<PathBuf>,
}

impl SourceStore {
    pub fn new(path: PathBuf, protected_outputs: Vec<PathBuf>) -> Self {
        Self {
            path,
            protected_outputs,
        }
    }

    fn read_document(&self) -> Map<String, Value> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Map::new(),
        };

        match serde_json::from_str::<Map<String, Value>>(&contents) {
            Ok(document) => document,
            Err(e) => {
                warn!("Ignoring corrupt source store {}: {}", self.path.display(), e);
                Map::new()
            }
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> AppResult<()> {
        let contents = serde_json::to_vec_pretty(document)?;
        write_atomic_blocking(&self.path, &contents)
    }

    /// All stored sources in document order
    pub fn load_all(&self) -> Vec<ExternalSource> {
        self.read_document()
            .into_iter()
            .filter_map(|(key, value)| {
                let stored: StoredSource = match serde_json::from_value(value) {
                    Ok(stored) => stored,
                    Err(e) => {
                        warn!("Skipping unreadable source {}: {}", key, e);
                        return None;
                    }
                };
                match ExternalSource::try_from(stored) {
                    Ok(source) => Some(source),
                    Err(e) => {
                        warn!("Skipping source {} with invalid uuid: {}", key, e);
                        None
                    }
                }
            })
            .collect()
    }

    pub fn get(&self, uuid: &Uuid) -> AppResult<ExternalSource> {
        self.load_all()
            .into_iter()
            .find(|source| &source.uuid == uuid)
            .ok_or_else(|| AppError::not_found("source", uuid.to_string()))
    }

    /// Insert or replace a source
    pub fn save(&self, source: &ExternalSource) -> AppResult<()> {
        let mut document = self.read_document();
        let stored = serde_json::to_value(StoredSource::from(source))?;
        document.insert(source.uuid.to_string(), stored);
        self.write_document(&document)
    }

    pub fn delete(&self, uuid: &Uuid) -> AppResult<()> {
        let mut document = self.read_document();
        if document.shift_remove(&uuid.to_string()).is_none() {
            return Err(AppError::not_found("source", uuid.to_string()));
        }
        self.write_document(&document)?;
        info!("Deleted source {}", uuid);
        Ok(())
    }

    /// Create and persist a new, disabled source
    pub fn create(&self, name: Option<String>) -> AppResult<ExternalSource> {
        let source = ExternalSource::new(name);
        self.save(&source)?;
        info!("Created source {} ({})", source.name, source.uuid);
        Ok(source)
    }

    pub fn rename(&self, uuid: &Uuid, name: &str) -> AppResult<ExternalSource> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Source name cannot be empty"));
        }
        self.update(uuid, |source| source.name = name.trim().to_string())
    }

    pub fn set_enabled(&self, uuid: &Uuid, enabled: bool) -> AppResult<ExternalSource> {
        self.update(uuid, |source| source.enabled = enabled)
    }

    /// Set or clear the playlist or guide location of a source
    pub fn set_location(
        &self,
        uuid: &Uuid,
        kind: DocumentKind,
        location: Option<Location>,
    ) -> AppResult<ExternalSource> {
        if let Some(Location::File(path)) = &location {
            if self.is_protected(path) {
                return Err(AppError::validation(format!(
                    "{} is generated by this application and cannot be used as a source",
                    path.display()
                )));
            }
        }

        self.update(uuid, |source| match kind {
            DocumentKind::Playlist => source.playlist = location,
            DocumentKind::Epg => source.epg = location,
        })
    }

    fn update<F>(&self, uuid: &Uuid, change: F) -> AppResult<ExternalSource>
    where
        F: FnOnce(&mut ExternalSource),
    {
        let mut source = self.get(uuid)?;
        change(&mut source);
        self.save(&source)?;
        Ok(source)
    }

    fn is_protected(&self, candidate: &Path) -> bool {
        let candidate = comparable(candidate);
        self.protected_outputs
            .iter()
            .any(|output| comparable(output) == candidate)
    }
}

/// Canonical path when it exists, otherwise an absolute lexical path
fn comparable(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
