use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::defaults::DEFAULT_HTTP_CONNECT_TIMEOUT;
use crate::errors::{AppError, AppResult, SourceError, SourceResult};
use crate::utils::decompression::DecompressionService;
use crate::utils::url::UrlUtils;

/// HTTP client that applies suffix-based decompression to every download
#[async_trait]
pub trait DecompressingHttpClient: Send + Sync {
    /// GET the URL and return the decompressed body
    async fn fetch_bytes(&self, url: &str) -> SourceResult<Vec<u8>>;

    /// GET the URL and return the decompressed body as UTF-8 text
    async fn fetch_text(&self, url: &str) -> SourceResult<String> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes)
            .map_err(|e| SourceError::malformed(format!("Content is not valid UTF-8: {e}")))
    }
}

/// Default implementation of DecompressingHttpClient using reqwest
#[derive(Clone)]
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    pub fn new() -> AppResult<Self> {
        Self::with_connection_timeout(DEFAULT_HTTP_CONNECT_TIMEOUT)
    }

    /// Only the connection phase is bounded; slow transfers of large guides
    /// are allowed to finish
    pub fn with_connection_timeout(connect_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("iptv-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    async fn process_response_to_bytes(response: Response, url: &str) -> SourceResult<Vec<u8>> {
        if !response.status().is_success() {
            return Err(SourceError::fetch_failed(format!(
                "HTTP error: {} {} - URL: {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown"),
                UrlUtils::obfuscate_credentials(url)
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::fetch_failed(format!("Failed to read response: {e}")))?;

        debug!("Fetched {} bytes of raw content", bytes.len());

        DecompressionService::decompress_for(url, bytes.to_vec())
    }
}

#[async_trait]
impl DecompressingHttpClient for StandardHttpClient {
    async fn fetch_bytes(&self, url: &str) -> SourceResult<Vec<u8>> {
        debug!("Fetching content from: {}", UrlUtils::obfuscate_credentials(url));

        let response = self.client.get(url).send().await.map_err(|e| {
            SourceError::fetch_failed(UrlUtils::obfuscate_credentials(&e.to_string()))
        })?;

        Self::process_response_to_bytes(response, url).await
    }
}
