//! Temp-file rendezvous, polled until the plugin has written its reply

use std::time::Duration;

use async_trait::async_trait;
use tempfile::{NamedTempFile, TempPath};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::{SourceError, SourceResult};
use crate::host::{ActionExecutor, HostAction};
use crate::transport::{peer_label, Transport, TriggerPlaceholder};
use crate::utils::url::UrlUtils;

/// Exchange through a temporary file
///
/// The reply is complete once the file is non-empty and its size did not
/// change between two polls. The file is removed on every exit path.
pub struct FilePollTransport {
    timeout: Duration,
    poll_interval: Duration,
}

impl FilePollTransport {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    async fn wait_for_reply(&self, path: &TempPath, peer: &str) -> SourceResult<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut last_size: Option<u64> = None;

        loop {
            let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);

            if size > 0 && last_size == Some(size) {
                let contents = tokio::fs::read(path).await?;
                debug!("Read {} bytes reply from {} via {}", contents.len(), peer, path.display());
                return Ok(contents);
            }
            last_size = Some(size);

            if Instant::now() >= deadline {
                return Err(SourceError::TransportTimeout {
                    endpoint: path.display().to_string(),
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Transport for FilePollTransport {
    async fn exchange(
        &self,
        template: &str,
        executor: &dyn ActionExecutor,
    ) -> SourceResult<Vec<u8>> {
        let peer = peer_label(template);
        let path = NamedTempFile::with_prefix("iptv-manager-")?.into_temp_path();
        let path_text = path.display().to_string();

        let uri = TriggerPlaceholder::for_file(template).substitute(template, &path_text);

        info!("Executing RunPlugin({})...", UrlUtils::obfuscate_credentials(&uri));
        executor
            .execute(HostAction::RunPlugin(uri))
            .await
            .map_err(|e| SourceError::fetch_failed(format!("Could not trigger {peer}: {e}")))?;

        let result = self.wait_for_reply(&path, &peer).await;
        if let Err(e) = path.close() {
            debug!("Could not remove {}: {}", path_text, e);
        }
        result
    }
}
