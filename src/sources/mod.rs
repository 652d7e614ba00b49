//! Source abstraction
//!
//! Three kinds of data providers exist and no others: plugin addons reached
//! through a [`Transport`], and user-defined sources whose playlist and guide
//! live at a URL or in a local file. [`Source`] is the closed set of them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{AppResult, SourceResult};
use crate::host::Host;
use crate::models::{ChannelPayload, GuidePayload};
use crate::transport::Transport;
use crate::utils::http_client::DecompressingHttpClient;

pub mod addon;
pub mod discovery;
pub mod external;
pub mod raw;
pub mod store;
pub mod traits;

pub use addon::AddonSource;
pub use external::{ExternalSource, ExternalSourceHandler, Location};
pub use store::{DocumentKind, SourceStore};
pub use traits::SourceHandler;

pub enum Source {
    Addon(AddonSource),
    External(ExternalSourceHandler),
}

impl Source {
    fn handler(&self) -> &dyn SourceHandler {
        match self {
            Source::Addon(source) => source,
            Source::External(source) => source,
        }
    }
}

#[async_trait]
impl SourceHandler for Source {
    fn display_name(&self) -> &str {
        self.handler().display_name()
    }

    fn is_enabled(&self) -> bool {
        self.handler().is_enabled()
    }

    async fn fetch_channels(&self) -> SourceResult<ChannelPayload> {
        self.handler().fetch_channels().await
    }

    async fn fetch_epg(&self) -> SourceResult<GuidePayload> {
        self.handler().fetch_epg().await
    }
}

/// Everything needed to enumerate sources
#[derive(Clone)]
pub struct SourceCatalog {
    pub host: Host,
    pub store: Arc<SourceStore>,
    pub transport: Arc<dyn Transport>,
    pub http: Arc<dyn DecompressingHttpClient>,
}

impl SourceCatalog {
    /// Addon sources first (registry order), then stored sources (store order)
    pub async fn detect_sources(&self) -> AppResult<Vec<Source>> {
        let mut sources: Vec<Source> = AddonSource::detect_sources(
            self.host.addons.as_ref(),
            Arc::clone(&self.transport),
            Arc::clone(&self.host.actions),
        )
        .await?
        .into_iter()
        .map(Source::Addon)
        .collect();

        sources.extend(
            self.store
                .load_all()
                .into_iter()
                .map(|source| {
                    Source::External(ExternalSourceHandler::new(source, Arc::clone(&self.http)))
                }),
        );

        Ok(sources)
    }
}
