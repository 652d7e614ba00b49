//! Format Normalizer
//!
//! Turns a source reply into the canonical [`ChannelPayload`] /
//! [`GuidePayload`] shapes:
//!
//! - raw documents (JSON strings, or anything that is not JSON) only lose
//!   their wrapper and are passed through untouched
//! - structured replies are checked against the supported envelope version;
//!   a newer version rejects the whole reply
//! - channels without `name` or `stream` are dropped, logos are made
//!   absolute, groups become a set that always holds the source name
//! - guide entries need `start` and `stop`; descriptive fields of the wrong
//!   type are dropped one by one

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::defaults::{CHANNELS_VERSION, EPG_VERSION};
use crate::errors::{SourceError, SourceResult};
use crate::models::{
    Channel, ChannelPayload, Credit, Genre, Guide, GuideEntry, GuidePayload, SourceMeta,
};
use crate::sources::raw::{extract_m3u, extract_xmltv};
use crate::utils::url::UrlUtils;

/// A decoded source reply
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A JSON object envelope
    Structured(Map<String, Value>),
    /// A complete M3U or XMLTV document
    Raw(String),
}

/// Decode the bytes received from a source
///
/// A JSON object is structured data and a JSON string is a raw document.
/// Bytes that are not JSON at all are also taken as a raw document.
pub fn decode_reply(bytes: &[u8]) -> SourceResult<Reply> {
    let text = String::from_utf8_lossy(bytes);

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(envelope)) => Ok(Reply::Structured(envelope)),
        Ok(Value::String(document)) => Ok(Reply::Raw(document)),
        Ok(other) => Err(SourceError::malformed(format!(
            "expected a JSON object or string, got {}",
            json_kind(&other)
        ))),
        Err(_) => Ok(Reply::Raw(text.into_owned())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn envelope_version(envelope: &Map<String, Value>) -> u64 {
    envelope.get("version").and_then(Value::as_u64).unwrap_or(1)
}

fn check_version(envelope: &Map<String, Value>, supported: u64, uri: &str) -> SourceResult<()> {
    let version = envelope_version(envelope);
    if version > supported {
        return Err(SourceError::UnsupportedVersion {
            uri: UrlUtils::obfuscate_credentials(uri),
            version,
            supported,
        });
    }
    Ok(())
}

/// Normalize a channels reply
pub fn normalize_channels(
    reply: Reply,
    meta: &SourceMeta,
    uri: &str,
) -> SourceResult<ChannelPayload> {
    let envelope = match reply {
        Reply::Raw(document) => return Ok(ChannelPayload::Raw(extract_m3u(&document))),
        Reply::Structured(envelope) => envelope,
    };

    check_version(&envelope, CHANNELS_VERSION, uri)?;

    let streams: &[Value] = match envelope.get("streams") {
        Some(Value::Array(streams)) => streams.as_slice(),
        Some(_) => {
            warn!("Ignoring non-list streams from {}", meta.name);
            &[]
        }
        None => &[],
    };

    let mut channels = Vec::with_capacity(streams.len());
    for entry in streams {
        match normalize_channel(entry, meta) {
            Ok(channel) => channels.push(channel),
            Err(e) => warn!("Skipping channel since it is incomplete ({}): {}", e, entry),
        }
    }

    debug!(
        "Normalized {} of {} channels from {}",
        channels.len(),
        streams.len(),
        meta.name
    );
    Ok(ChannelPayload::Structured(channels))
}

/// Normalize one channel record
pub fn normalize_channel(entry: &Value, meta: &SourceMeta) -> SourceResult<Channel> {
    let record = entry
        .as_object()
        .ok_or_else(|| SourceError::incomplete("name"))?;

    let name = non_empty_text(record.get("name")).ok_or_else(|| SourceError::incomplete("name"))?;
    let stream =
        non_empty_text(record.get("stream")).ok_or_else(|| SourceError::incomplete("stream"))?;

    let mut channel = Channel::new(name, stream);
    channel.id = non_empty_text(record.get("id"));
    channel.logo = resolve_logo(non_empty_text(record.get("logo")), meta);
    channel.preset = record.get("preset").and_then(as_preset);
    channel.group = normalize_group(record.get("group"), &meta.name);
    channel.radio = record.get("radio").map(is_truthy).unwrap_or(false);
    channel.kodiprops = record
        .get("kodiprops")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .filter_map(|(key, value)| scalar_text(value).map(|v| (key.clone(), v)))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();
    channel.vod = non_empty_text(record.get("vod"));

    Ok(channel)
}

/// Make a logo absolute, or fall back to the source icon
pub fn resolve_logo(logo: Option<String>, meta: &SourceMeta) -> Option<String> {
    match logo {
        None => meta.icon.clone(),
        Some(logo) if UrlUtils::is_absolute_reference(&logo) => Some(logo),
        Some(logo) => match &meta.path {
            Some(path) => Some(path.join(&logo).to_string_lossy().into_owned()),
            None => Some(logo),
        },
    }
}

/// Group tags from a string (`;`-separated), a list, or nothing, plus the
/// source name
pub fn normalize_group(group: Option<&Value>, source_name: &str) -> BTreeSet<String> {
    let mut groups: BTreeSet<String> = match group {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::String(text)) => text
            .split(';')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|g| !g.is_empty())
            .collect(),
        Some(other) => {
            warn!("Channel group is not a list: {}", other);
            BTreeSet::new()
        }
    };

    groups.insert(source_name.to_string());
    groups
}

/// Normalize a guide reply
pub fn normalize_epg(reply: Reply, uri: &str) -> SourceResult<GuidePayload> {
    let envelope = match reply {
        Reply::Raw(document) => return Ok(GuidePayload::Raw(extract_xmltv(&document)?)),
        Reply::Structured(envelope) => envelope,
    };

    check_version(&envelope, EPG_VERSION, uri)?;

    let epg = match envelope.get("epg") {
        Some(Value::Object(epg)) if !epg.is_empty() => epg,
        _ => return Err(SourceError::incomplete("epg")),
    };

    let mut guide = Guide::new();
    for (channel_id, entries) in epg {
        let Some(entries) = entries.as_array() else {
            warn!("Ignoring guide data for {} since it is not a list", channel_id);
            continue;
        };

        let parsed = entries.iter().filter_map(|entry| match parse_guide_entry(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping guide entry for {}: {}", channel_id, e);
                None
            }
        });
        guide.extend_channel(channel_id, parsed);
    }

    Ok(GuidePayload::Structured(guide))
}

/// Build a guide entry; only `start` and `stop` are required
///
/// Descriptive fields of an unexpected type are dropped on their own, the
/// entry itself is kept.
fn parse_guide_entry(entry: &Value) -> SourceResult<GuideEntry> {
    let fields = entry
        .as_object()
        .ok_or_else(|| SourceError::incomplete("start"))?;

    let start = fields
        .get("start")
        .and_then(scalar_text)
        .ok_or_else(|| SourceError::incomplete("start"))?;
    let stop = fields
        .get("stop")
        .and_then(scalar_text)
        .ok_or_else(|| SourceError::incomplete("stop"))?;

    Ok(GuideEntry {
        title: optional_text(fields, "title"),
        description: optional_text(fields, "description"),
        subtitle: optional_text(fields, "subtitle"),
        genre: fields.get("genre").and_then(parse_genre),
        episode: optional_text(fields, "episode"),
        image: optional_text(fields, "image"),
        date: optional_text(fields, "date"),
        credits: fields.get("credits").map(parse_credits).unwrap_or_default(),
        stream: optional_text(fields, "stream"),
        start,
        stop,
    })
}

/// Scalar field as text; `null` is absent, anything else is discarded
fn optional_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null => None,
        value => {
            let text = scalar_text(value);
            if text.is_none() {
                warn!("Ignoring guide field {} of unexpected type: {}", key, value);
            }
            text
        }
    }
}

fn parse_genre(value: &Value) -> Option<Genre> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(Genre::Many(items.iter().filter_map(scalar_text).collect())),
        other => match scalar_text(other) {
            Some(text) => Some(Genre::One(text)),
            None => {
                warn!("Ignoring guide genre of unexpected type: {}", other);
                None
            }
        },
    }
}

fn parse_credits(value: &Value) -> Vec<Credit> {
    let items = match value {
        Value::Null => return Vec::new(),
        Value::Array(items) => items,
        other => {
            warn!("Ignoring guide credits that are not a list: {}", other);
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(|item| {
            let fields = item.as_object()?;
            let credit = Credit {
                kind: non_empty_text(fields.get("type"))?,
                name: non_empty_text(fields.get("name"))?,
                role: non_empty_text(fields.get("role")),
            };
            Some(credit)
        })
        .collect()
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    value.and_then(scalar_text).filter(|text| !text.trim().is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn as_preset(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.eq_ignore_ascii_case("true"),
        Value::Number(number) => number.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}
