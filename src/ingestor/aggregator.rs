//! Aggregation run
//!
//! One run fetches every enabled source in order, merges their channels and
//! guides, and publishes the playlist, the guide and the channel cache. A
//! failing source only loses its own contribution. Cancellation is checked
//! between fetches; a cancelled run writes nothing, so the previous output
//! stays in place.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::defaults::{SETTING_LAST_REFRESHED, SETTING_RESTART_AFTER_REFRESH};
use crate::config::{Config, StorageConfig};
use crate::errors::AppResult;
use crate::generator::{render_guide, render_playlist, write_atomic};
use crate::host::{Host, ProgressReporter};
use crate::models::{ChannelPayload, GuidePayload, SourceChannels};
use crate::services::catchup::CatchupService;
use crate::services::pvr::{PvrRestarter, RestartOutcome, RestartState};
use crate::sources::{SourceCatalog, SourceHandler, SourceStore};
use crate::transport::transport_for;
use crate::utils::http_client::StandardHttpClient;

/// Counts reported by a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub sources: usize,
    pub channels: usize,
    pub raw_playlists: usize,
    pub programmes: usize,
    pub raw_guides: usize,
    pub restart: Option<RestartOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed(RefreshSummary),
    /// Stopped on request before anything was written
    Cancelled,
    /// Output could not be written; the previous files are untouched
    Failed(String),
}

pub struct Aggregator {
    catalog: SourceCatalog,
    storage: StorageConfig,
    restarter: PvrRestarter,
    catchup: CatchupService,
}

impl Aggregator {
    pub fn new(
        catalog: SourceCatalog,
        storage: StorageConfig,
        restarter: PvrRestarter,
        catchup: CatchupService,
    ) -> Self {
        Self {
            catalog,
            storage,
            restarter,
            catchup,
        }
    }

    /// Wire up sources, transport and services from the configuration
    pub fn from_config(config: &Config, host: Host) -> AppResult<Self> {
        let storage = config.storage.clone();
        let store = SourceStore::new(
            storage.sources_path(),
            vec![storage.playlist_path(), storage.epg_path()],
        );
        let http = StandardHttpClient::with_connection_timeout(config.http.connect_timeout)?;

        let catalog = SourceCatalog {
            host: host.clone(),
            store: Arc::new(store),
            transport: transport_for(&config.transport),
            http: Arc::new(http),
        };
        let restarter = PvrRestarter::new(host.clone(), config.host.pvr_addon_id.clone());
        let catchup = CatchupService::new(storage.channels_cache_path(), host);

        Ok(Self::new(catalog, storage, restarter, catchup))
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    pub fn restarter(&self) -> &PvrRestarter {
        &self.restarter
    }

    pub fn catchup(&self) -> &CatchupService {
        &self.catchup
    }

    /// Run one aggregation
    ///
    /// With a progress reporter the run is treated as manual: progress is
    /// shown, cancellation is honoured and the PVR restart is forced.
    pub async fn refresh(
        &self,
        progress: Option<&dyn ProgressReporter>,
        restart_state: &mut RestartState,
    ) -> RefreshOutcome {
        let host = &self.catalog.host;

        let sources = match self.catalog.detect_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                error!("Could not enumerate sources: {}", e);
                return self.fail(progress, format!("Could not enumerate sources: {e}"));
            }
        };
        let enabled: Vec<_> = sources.into_iter().filter(|s| s.is_enabled()).collect();
        info!("Refreshing {} enabled sources", enabled.len());

        let mut channels: Vec<SourceChannels> = Vec::with_capacity(enabled.len());
        let mut guides: Vec<GuidePayload> = Vec::with_capacity(enabled.len());

        for (index, source) in enabled.iter().enumerate() {
            let name = source.display_name();
            if let Some(progress) = progress {
                let percent = (100 * index / enabled.len()) as u8;
                progress.update(percent, &format!("Fetching channels and guide of {name}"));
            }

            info!("Updating IPTV data for {}", name);
            channels.push(SourceChannels {
                source_name: name.to_string(),
                payload: source.get_channels().await,
            });
            if is_cancelled(progress) {
                return cancelled(progress, name);
            }

            guides.push(source.get_epg().await);
            if is_cancelled(progress) {
                return cancelled(progress, name);
            }
        }

        if let Some(progress) = progress {
            progress.update(100, "Updating channels and guide...");
        }

        let mut summary = summarize(&channels, &guides);
        summary.sources = enabled.len();

        if let Err(e) = self.publish(&channels, &guides).await {
            error!("Could not write the playlist and guide: {}", e);
            return self.fail(progress, format!("Could not write the playlist and guide: {e}"));
        }

        if host
            .settings
            .get_bool(SETTING_RESTART_AFTER_REFRESH)
            .unwrap_or(false)
        {
            match self.restarter.restart(progress.is_some(), restart_state).await {
                Ok(outcome) => summary.restart = Some(outcome),
                Err(e) => error!("Could not restart {}: {}", self.restarter.pvr_addon_id(), e),
            }
        }

        if let Err(e) = host
            .settings
            .set_int(SETTING_LAST_REFRESHED, Utc::now().timestamp())
        {
            warn!("Could not record refresh time: {}", e);
        }

        if let Some(progress) = progress {
            progress.close();
        }

        info!(
            "Refresh finished: {} sources, {} channels, {} programmes",
            summary.sources, summary.channels, summary.programmes
        );
        RefreshOutcome::Completed(summary)
    }

    async fn publish(&self, channels: &[SourceChannels], guides: &[GuidePayload]) -> AppResult<()> {
        let playlist = render_playlist(channels);
        let guide = render_guide(guides, channels);

        write_atomic(&self.storage.playlist_path(), playlist.into_bytes()).await?;
        write_atomic(&self.storage.epg_path(), guide.into_bytes()).await?;
        self.catchup.write_channels(channels).await
    }

    fn fail(&self, progress: Option<&dyn ProgressReporter>, message: String) -> RefreshOutcome {
        if let Some(progress) = progress {
            progress.close();
        }
        self.catalog.host.dialogs.ok("IPTV Manager", &message);
        RefreshOutcome::Failed(message)
    }
}

fn is_cancelled(progress: Option<&dyn ProgressReporter>) -> bool {
    progress.map(|p| p.is_cancelled()).unwrap_or(false)
}

fn cancelled(progress: Option<&dyn ProgressReporter>, source_name: &str) -> RefreshOutcome {
    info!("Refresh cancelled after {}, nothing was written", source_name);
    if let Some(progress) = progress {
        progress.close();
    }
    RefreshOutcome::Cancelled
}

fn summarize(channels: &[SourceChannels], guides: &[GuidePayload]) -> RefreshSummary {
    let mut summary = RefreshSummary::default();
    for source in channels {
        match &source.payload {
            ChannelPayload::Structured(records) => summary.channels += records.len(),
            ChannelPayload::Raw(body) if !body.trim().is_empty() => summary.raw_playlists += 1,
            ChannelPayload::Raw(_) => {}
        }
    }
    for guide in guides {
        match guide {
            GuidePayload::Structured(guide) => summary.programmes += guide.entry_count(),
            GuidePayload::Raw(body) if !body.trim().is_empty() => summary.raw_guides += 1,
            GuidePayload::Raw(_) => {}
        }
    }
    debug!("{:?}", summary);
    summary
}
