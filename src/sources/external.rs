//! User-defined sources backed by a URL or a local file
//!
//! External sources always deliver complete documents: an M3U playlist and an
//! XMLTV guide. Either may be absent. The documents are fetched, decompressed
//! according to their suffix and passed through without their wrapper.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::errors::{SourceError, SourceResult};
use crate::models::{ChannelPayload, GuidePayload};
use crate::sources::raw::{extract_m3u, extract_xmltv};
use crate::sources::traits::SourceHandler;
use crate::utils::decompression::DecompressionService;
use crate::utils::http_client::DecompressingHttpClient;
use crate::utils::url::UrlUtils;

pub const DEFAULT_SOURCE_NAME: &str = "External Source";

/// Where an external document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    File(PathBuf),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Url(url) => write!(f, "{}", UrlUtils::obfuscate_credentials(url)),
            Location::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A persisted user-defined source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSource {
    pub uuid: Uuid,
    pub name: String,
    pub enabled: bool,
    pub playlist: Option<Location>,
    pub epg: Option<Location>,
}

impl ExternalSource {
    /// A fresh, disabled source without locations
    pub fn new(name: Option<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string()),
            enabled: false,
            playlist: None,
            epg: None,
        }
    }
}

/// Fetches the documents of an [`ExternalSource`]
pub struct ExternalSourceHandler {
    source: ExternalSource,
    http: Arc<dyn DecompressingHttpClient>,
}

impl ExternalSourceHandler {
    pub fn new(source: ExternalSource, http: Arc<dyn DecompressingHttpClient>) -> Self {
        Self { source, http }
    }

    pub fn source(&self) -> &ExternalSource {
        &self.source
    }

    async fn load(&self, location: &Location) -> SourceResult<String> {
        match location {
            Location::Url(url) => self.http.fetch_text(url).await,
            Location::File(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(SourceError::NotFound { path: path.clone() });
                }
                let bytes = tokio::fs::read(path).await?;
                let bytes =
                    DecompressionService::decompress_for(&path.to_string_lossy(), bytes)?;
                String::from_utf8(bytes).map_err(|e| {
                    SourceError::malformed(format!("{} is not valid UTF-8: {e}", path.display()))
                })
            }
        }
    }
}

#[async_trait]
impl SourceHandler for ExternalSourceHandler {
    fn display_name(&self) -> &str {
        &self.source.name
    }

    fn is_enabled(&self) -> bool {
        self.source.enabled
    }

    async fn fetch_channels(&self) -> SourceResult<ChannelPayload> {
        let Some(location) = &self.source.playlist else {
            return Ok(ChannelPayload::empty());
        };

        info!("Loading playlist of {} from {}", self.source.name, location);
        let data = self.load(location).await?;
        Ok(ChannelPayload::Raw(extract_m3u(&data)))
    }

    async fn fetch_epg(&self) -> SourceResult<GuidePayload> {
        let Some(location) = &self.source.epg else {
            return Ok(GuidePayload::empty());
        };

        info!("Loading guide of {} from {}", self.source.name, location);
        let data = self.load(location).await?;
        Ok(GuidePayload::Raw(extract_xmltv(&data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::http_client::StandardHttpClient;

    fn handler(source: ExternalSource) -> ExternalSourceHandler {
        ExternalSourceHandler::new(source, Arc::new(StandardHttpClient::new().unwrap()))
    }

    #[test]
    fn test_new_source_defaults() {
        let source = ExternalSource::new(None);
        assert_eq!(source.name, DEFAULT_SOURCE_NAME);
        assert!(!source.enabled);
        assert!(source.playlist.is_none() && source.epg.is_none());

        assert_eq!(ExternalSource::new(Some("Mine".to_string())).name, "Mine");
    }

    #[tokio::test]
    async fn test_file_playlist_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.m3u");
        std::fs::write(&path, "#EXTM3U\n#EXTINF:-1,C2\nhttp://x/2\n").unwrap();

        let mut source = ExternalSource::new(Some("Files".to_string()));
        source.playlist = Some(Location::File(path));

        let payload = handler(source).fetch_channels().await.unwrap();
        assert_eq!(payload, ChannelPayload::Raw("#EXTINF:-1,C2\nhttp://x/2".to_string()));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ExternalSource::new(None);
        source.epg = Some(Location::File(dir.path().join("gone.xml")));

        let handler = handler(source);
        assert!(matches!(
            handler.fetch_epg().await,
            Err(SourceError::NotFound { .. })
        ));
        assert!(handler.get_epg().await.is_empty());
    }

    #[cfg(feature = "compression-gzip")]
    #[tokio::test]
    async fn test_gzipped_guide_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.xml.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"<?xml version=\"1.0\"?><tv><channel id=\"a\"/></tv>")
            .unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut source = ExternalSource::new(None);
        source.epg = Some(Location::File(path));

        let payload = handler(source).fetch_epg().await.unwrap();
        assert_eq!(payload, GuidePayload::Raw("<channel id=\"a\"/>".to_string()));
    }

    #[tokio::test]
    async fn test_source_without_locations_is_empty() {
        let handler = handler(ExternalSource::new(None));
        assert!(handler.fetch_channels().await.unwrap().is_empty());
        assert!(handler.fetch_epg().await.unwrap().is_empty());
    }
}
