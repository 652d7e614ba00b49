//! Canonical in-memory shapes shared by the normalizer, the aggregator and
//! the serializers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A playable channel after normalization
///
/// `name` and `stream` are always non-empty; the normalizer drops records
/// that lack either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub stream: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<u32>,
    /// Group tags; always contains the owning source's display name
    #[serde(default)]
    pub group: BTreeSet<String>,
    #[serde(default)]
    pub radio: bool,
    /// Player properties written verbatim as `#KODIPROP` lines
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kodiprops: BTreeMap<String, String>,
    /// Catch-up URI template (`{date}`, `{duration}` placeholders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vod: Option<String>,
}

impl Channel {
    pub fn new<N: Into<String>, S: Into<String>>(name: N, stream: S) -> Self {
        Self {
            id: None,
            name: name.into(),
            stream: stream.into(),
            logo: None,
            preset: None,
            group: BTreeSet::new(),
            radio: false,
            kodiprops: BTreeMap::new(),
            vod: None,
        }
    }
}

/// A person credited on a programme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    /// XMLTV credit role: director, actor, writer, presenter, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Genre given either as one string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Genre {
    One(String),
    Many(Vec<String>),
}

impl Genre {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Genre::One(value) => vec![value.as_str()],
            Genre::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// One programme listing
///
/// Timestamps are kept as received; they may or may not carry an offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideEntry {
    pub start: String,
    pub stop: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub genre: Option<Genre>,
    #[serde(default)]
    pub episode: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub credits: Vec<Credit>,
    /// Catch-up URI for this programme
    #[serde(default)]
    pub stream: Option<String>,
}

/// Channel id to programme listings, in first-seen key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guide {
    channels: Vec<(String, Vec<GuideEntry>)>,
    index: HashMap<String, usize>,
}

impl Guide {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries for a channel, keeping earlier entries first
    pub fn extend_channel<I>(&mut self, channel_id: &str, entries: I)
    where
        I: IntoIterator<Item = GuideEntry>,
    {
        let position = match self.index.get(channel_id) {
            Some(position) => *position,
            None => {
                self.channels.push((channel_id.to_string(), Vec::new()));
                self.index
                    .insert(channel_id.to_string(), self.channels.len() - 1);
                self.channels.len() - 1
            }
        };
        self.channels[position].1.extend(entries);
    }

    /// Merge another guide into this one (later entries appended)
    pub fn merge(&mut self, other: Guide) {
        for (channel_id, entries) in other.channels {
            self.extend_channel(&channel_id, entries);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GuideEntry])> {
        self.channels
            .iter()
            .map(|(id, entries)| (id.as_str(), entries.as_slice()))
    }

    pub fn get(&self, channel_id: &str) -> Option<&[GuideEntry]> {
        self.index
            .get(channel_id)
            .map(|position| self.channels[*position].1.as_slice())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn entry_count(&self) -> usize {
        self.channels.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Channel data of one source: decoded records or a raw M3U body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelPayload {
    Structured(Vec<Channel>),
    /// M3U body without its `#EXTM3U` header
    Raw(String),
}

impl ChannelPayload {
    pub fn empty() -> Self {
        ChannelPayload::Structured(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ChannelPayload::Structured(channels) => channels.is_empty(),
            ChannelPayload::Raw(body) => body.trim().is_empty(),
        }
    }
}

/// Guide data of one source: decoded listings or a raw XMLTV body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidePayload {
    Structured(Guide),
    /// Content of the `<tv>` element without the element itself
    Raw(String),
}

impl GuidePayload {
    pub fn empty() -> Self {
        GuidePayload::Structured(Guide::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            GuidePayload::Structured(guide) => guide.is_empty(),
            GuidePayload::Raw(body) => body.trim().is_empty(),
        }
    }
}

/// Channels contributed by one source during an aggregation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChannels {
    pub source_name: String,
    pub payload: ChannelPayload,
}

/// Metadata of the source a reply belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMeta {
    /// Display name, also injected as a group tag
    pub name: String,
    /// Install path that relative logos are resolved against
    pub path: Option<std::path::PathBuf>,
    /// Fallback logo for channels without one
    pub icon: Option<String>,
}
