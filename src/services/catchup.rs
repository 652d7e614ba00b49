//! Catch-up playback from the guide
//!
//! After every refresh the structured channels of each source are cached in
//! `channels.json`. A programme picked in the guide is matched to channels
//! by name (the only thing the guide gives us), and the channel's `vod`
//! template is filled in and played.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::generator::publish::write_atomic;
use crate::host::{Host, HostAction};
use crate::models::{Channel, ChannelPayload, SourceChannels};
use crate::utils::datetime::ProgramTime;

const DATE_PLACEHOLDER: &str = "{date}";
const DURATION_PLACEHOLDER: &str = "{duration}";

/// One source's channels as stored in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSource {
    #[serde(rename = "addon_name")]
    pub source_name: String,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// A programme selected for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub channel: String,
    pub start: ProgramTime,
    /// Length in seconds
    pub duration: u64,
}

/// Parse a duration label: `S`, `M:S` or `H:M:S`
pub fn parse_duration_label(label: &str) -> AppResult<u64> {
    let parts: Vec<&str> = label.trim().split(':').collect();
    let numbers = parts
        .iter()
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AppError::validation(format!("Unknown duration {label}")))?;

    match numbers.as_slice() {
        [seconds] => Ok(*seconds),
        [minutes, seconds] => Ok(minutes * 60 + seconds),
        [hours, minutes, seconds] => Ok(hours * 3600 + minutes * 60 + seconds),
        _ => Err(AppError::validation(format!("Unknown duration {label}"))),
    }
}

/// Fill the `{date}` and `{duration}` placeholders of a catch-up template
pub fn resolve_template(template: &str, program: &Program) -> String {
    let mut uri = template.to_string();
    if uri.contains(DATE_PLACEHOLDER) {
        uri = uri.replace(DATE_PLACEHOLDER, &program.start.to_iso8601());
    }
    if uri.contains(DURATION_PLACEHOLDER) {
        uri = uri.replace(DURATION_PLACEHOLDER, &program.duration.to_string());
    }
    uri
}

/// Reads and writes the channel cache and plays programmes from it
pub struct CatchupService {
    cache_path: PathBuf,
    host: Host,
}

impl CatchupService {
    pub fn new(cache_path: PathBuf, host: Host) -> Self {
        Self { cache_path, host }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Replace the cache with the structured channels of this run
    pub async fn write_channels(&self, sources: &[SourceChannels]) -> AppResult<()> {
        let cache: Vec<CachedSource> = sources
            .iter()
            .filter_map(|source| match &source.payload {
                ChannelPayload::Structured(channels) => Some(CachedSource {
                    source_name: source.source_name.clone(),
                    channels: channels.clone(),
                }),
                ChannelPayload::Raw(_) => None,
            })
            .collect();

        write_atomic(&self.cache_path, serde_json::to_vec(&cache)?).await
    }

    pub async fn read_channels(&self) -> AppResult<Vec<CachedSource>> {
        let contents = match tokio::fs::read(&self.cache_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Sources able to play `channel_name`, with their catch-up template
    ///
    /// Names match case-insensitively. A source is listed once; its last
    /// matching channel wins.
    pub async fn players_for_channel(&self, channel_name: &str) -> AppResult<Vec<(String, String)>> {
        let wanted = channel_name.to_lowercase();
        let mut matches: Vec<(String, String)> = Vec::new();

        for source in self.read_channels().await? {
            for channel in &source.channels {
                let Some(vod) = channel.vod.as_deref() else {
                    continue;
                };
                if channel.name.to_lowercase() != wanted {
                    continue;
                }
                match matches.iter_mut().find(|(name, _)| name == &source.source_name) {
                    Some(existing) => existing.1 = vod.to_string(),
                    None => matches.push((source.source_name.clone(), vod.to_string())),
                }
            }
        }

        Ok(matches)
    }

    /// Play a programme, asking the user when several sources can play it
    ///
    /// Returns the URI that was played, if any.
    pub async fn play_program(&self, program: &Program) -> AppResult<Option<String>> {
        debug!("Playing {:?}", program);
        let players = self.players_for_channel(&program.channel).await?;

        let template = match players.len() {
            0 => {
                info!("No source was found to play {}", program.channel);
                self.host.dialogs.notify(&format!(
                    "Could not find a source to play {}",
                    program.channel
                ));
                return Ok(None);
            }
            1 => players[0].1.clone(),
            _ => {
                let names: Vec<String> = players.iter().map(|(name, _)| name.clone()).collect();
                match self.host.dialogs.select("Select a source", &names).await {
                    Some(index) if index < players.len() => players[index].1.clone(),
                    _ => {
                        debug!("Selection to play {} was cancelled", program.channel);
                        return Ok(None);
                    }
                }
            }
        };

        let uri = resolve_template(&template, program);
        info!("Playing {}", uri);
        self.host
            .actions
            .execute(HostAction::PlayMedia(uri.clone()))
            .await?;
        Ok(Some(uri))
    }
}
