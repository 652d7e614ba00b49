//! Source handler trait definitions
//!
//! Every source answers the same two questions: which channels do you have,
//! and what is on them. The `fetch_*` methods report failures; the `get_*`
//! methods are what the aggregator calls and never fail: a misbehaving source
//! is logged and contributes nothing.

use async_trait::async_trait;
use tracing::{error, warn};

use crate::errors::{SourceError, SourceResult};
use crate::models::{ChannelPayload, GuidePayload};

#[async_trait]
pub trait SourceHandler: Send + Sync {
    /// Name shown to users and injected as a group tag
    fn display_name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    async fn fetch_channels(&self) -> SourceResult<ChannelPayload>;

    async fn fetch_epg(&self) -> SourceResult<GuidePayload>;

    /// Channels of this source, empty on any failure
    async fn get_channels(&self) -> ChannelPayload {
        match self.fetch_channels().await {
            Ok(payload) => payload,
            Err(e) => {
                log_source_failure(self.display_name(), "channels", &e);
                ChannelPayload::empty()
            }
        }
    }

    /// Guide of this source, empty on any failure
    async fn get_epg(&self) -> GuidePayload {
        match self.fetch_epg().await {
            Ok(payload) => payload,
            Err(e) => {
                log_source_failure(self.display_name(), "EPG", &e);
                GuidePayload::empty()
            }
        }
    }
}

fn log_source_failure(source_name: &str, what: &str, err: &SourceError) {
    match err {
        SourceError::UnsupportedVersion { uri, version, .. } => warn!(
            "Skipping {} of {} since {} uses an unsupported version: {}",
            what, source_name, uri, version
        ),
        SourceError::IncompleteRecord { .. } => {
            warn!("Skipping {} of {} since it is incomplete: {}", what, source_name, err)
        }
        _ => error!(
            "Something went wrong while fetching {} of {}: {}",
            what, source_name, err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;

    struct Flaky {
        fail: bool,
    }

    #[async_trait]
    impl SourceHandler for Flaky {
        fn display_name(&self) -> &str {
            "Flaky"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn fetch_channels(&self) -> SourceResult<ChannelPayload> {
            if self.fail {
                Err(SourceError::fetch_failed("boom"))
            } else {
                Ok(ChannelPayload::Structured(vec![Channel::new("A", "http://a")]))
            }
        }

        async fn fetch_epg(&self) -> SourceResult<GuidePayload> {
            Err(SourceError::incomplete("epg"))
        }
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let source = Flaky { fail: true };
        assert!(source.get_channels().await.is_empty());
        assert!(source.get_epg().await.is_empty());

        let source = Flaky { fail: false };
        assert!(!source.get_channels().await.is_empty());
    }
}
