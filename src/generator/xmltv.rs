//! Guide Serializer (XMLTV)

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::escape::escape;
use tracing::warn;

use crate::models::{ChannelPayload, Guide, GuideEntry, GuidePayload, SourceChannels};
use crate::sources::raw::split_xmltv_channels;
use crate::utils::datetime::DateTimeParser;

const XMLTV_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                            <!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n\
                            <tv>\n";
const XMLTV_FOOTER: &str = "</tv>\n";

/// Credit roles in the order XMLTV expects them inside `<credits>`
const CREDIT_ORDER: [&str; 10] = [
    "director",
    "actor",
    "writer",
    "adapter",
    "producer",
    "composer",
    "editor",
    "presenter",
    "commentator",
    "guest",
];

fn escape_xml(input: &str) -> Cow<'_, str> {
    escape(input)
}

/// Channel id to display name for every structured channel that has an id
fn display_names(channels: &[SourceChannels]) -> HashMap<&str, &str> {
    let mut names = HashMap::new();
    for source in channels {
        if let ChannelPayload::Structured(records) = &source.payload {
            for channel in records {
                if let Some(id) = channel.id.as_deref() {
                    names.entry(id).or_insert(channel.name.as_str());
                }
            }
        }
    }
    names
}

fn render_credits(entry: &GuideEntry, xmltv: &mut String) {
    if entry.credits.is_empty() {
        return;
    }

    xmltv.push_str("    <credits>\n");
    for kind in CREDIT_ORDER {
        for credit in entry.credits.iter().filter(|c| c.kind == kind) {
            match credit.role.as_deref() {
                Some(role) if kind == "actor" => xmltv.push_str(&format!(
                    "      <actor role=\"{}\">{}</actor>\n",
                    escape_xml(role),
                    escape_xml(&credit.name)
                )),
                _ => xmltv.push_str(&format!(
                    "      <{kind}>{}</{kind}>\n",
                    escape_xml(&credit.name)
                )),
            }
        }
    }
    xmltv.push_str("    </credits>\n");
}

/// Render one `<programme>` element, or `None` when its times are unusable
pub fn render_programme(channel_id: &str, entry: &GuideEntry) -> Option<String> {
    let start = match DateTimeParser::parse_program_time(&entry.start) {
        Ok(start) => start,
        Err(e) => {
            warn!("Skipping programme on {}: {}", channel_id, e);
            return None;
        }
    };
    let stop = match DateTimeParser::parse_program_time(&entry.stop) {
        Ok(stop) => stop,
        Err(e) => {
            warn!("Skipping programme on {}: {}", channel_id, e);
            return None;
        }
    };

    let mut xmltv = format!(
        "  <programme start=\"{}\" stop=\"{}\" channel=\"{}\"",
        start.to_xmltv(),
        stop.to_xmltv(),
        escape_xml(channel_id)
    );
    if let Some(stream) = entry.stream.as_deref() {
        xmltv.push_str(&format!(" catchup-id=\"{}\"", escape_xml(stream)));
    }
    xmltv.push_str(">\n");

    xmltv.push_str(&format!(
        "    <title>{}</title>\n",
        escape_xml(entry.title.as_deref().unwrap_or_default())
    ));
    if let Some(description) = entry.description.as_deref() {
        xmltv.push_str(&format!("    <desc>{}</desc>\n", escape_xml(description)));
    }
    if let Some(subtitle) = entry.subtitle.as_deref() {
        xmltv.push_str(&format!(
            "    <sub-title>{}</sub-title>\n",
            escape_xml(subtitle)
        ));
    }
    render_credits(entry, &mut xmltv);
    if let Some(date) = entry.date.as_deref() {
        xmltv.push_str(&format!("    <date>{}</date>\n", escape_xml(date)));
    }
    if let Some(genre) = &entry.genre {
        for category in genre.values() {
            xmltv.push_str(&format!(
                "    <category>{}</category>\n",
                escape_xml(category)
            ));
        }
    }
    if let Some(image) = entry.image.as_deref() {
        xmltv.push_str(&format!("    <icon src=\"{}\"/>\n", escape_xml(image)));
    }
    if let Some(episode) = entry.episode.as_deref() {
        xmltv.push_str(&format!(
            "    <episode-num system=\"onscreen\">{}</episode-num>\n",
            escape_xml(episode)
        ));
    }
    xmltv.push_str("  </programme>\n");

    Some(xmltv)
}

/// Render the combined guide document
///
/// Structured guides are merged per channel id in source order. The
/// `<channel>` elements of raw XMLTV fragments are written after the
/// structured channels; the rest of each fragment follows the structured
/// programmes unchanged.
pub fn render_guide(guides: &[GuidePayload], channels: &[SourceChannels]) -> String {
    let mut merged = Guide::new();
    let mut raw_fragments = Vec::new();
    for payload in guides {
        match payload {
            GuidePayload::Structured(guide) => merged.merge(guide.clone()),
            GuidePayload::Raw(body) => {
                if !body.trim().is_empty() {
                    raw_fragments.push(body.as_str());
                }
            }
        }
    }

    let names = display_names(channels);
    let mut xmltv = String::from(XMLTV_HEADER);

    for (channel_id, _) in merged.iter() {
        match names.get(channel_id) {
            Some(name) => xmltv.push_str(&format!(
                "  <channel id=\"{}\">\n    <display-name>{}</display-name>\n  </channel>\n",
                escape_xml(channel_id),
                escape_xml(name)
            )),
            None => xmltv.push_str(&format!(
                "  <channel id=\"{}\"></channel>\n",
                escape_xml(channel_id)
            )),
        }
    }

    let mut raw_rest = Vec::with_capacity(raw_fragments.len());
    for fragment in raw_fragments {
        let (raw_channels, rest) = split_xmltv_channels(fragment);
        for channel in raw_channels {
            xmltv.push_str(channel);
            xmltv.push('\n');
        }
        if !rest.is_empty() {
            raw_rest.push(rest);
        }
    }

    for (channel_id, entries) in merged.iter() {
        for entry in entries {
            if let Some(programme) = render_programme(channel_id, entry) {
                xmltv.push_str(&programme);
            }
        }
    }

    for rest in raw_rest {
        xmltv.push_str(&rest);
        xmltv.push('\n');
    }

    xmltv.push_str(XMLTV_FOOTER);
    xmltv
}
