//! Playlist Serializer (extended M3U)

use crate::models::{Channel, ChannelPayload, SourceChannels};

const M3U_HEADER: &str = "#EXTM3U\n";

/// Attribute values are delimited by double quotes and lines by newlines
fn m3u_safe(value: &str) -> String {
    value.replace('"', "'").replace(['\r', '\n'], " ")
}

/// Render one channel record
///
/// Attributes are only written when present. Player properties go between
/// the `#EXTINF` line and the stream URI.
pub fn render_channel(channel: &Channel) -> String {
    let name = m3u_safe(&channel.name);
    let mut extinf = format!("#EXTINF:-1 tvg-name=\"{name}\"");

    if let Some(id) = channel.id.as_deref() {
        extinf.push_str(&format!(" tvg-id=\"{}\"", m3u_safe(id)));
    }
    if let Some(logo) = channel.logo.as_deref() {
        extinf.push_str(&format!(" tvg-logo=\"{}\"", m3u_safe(logo)));
    }
    if let Some(preset) = channel.preset {
        extinf.push_str(&format!(" tvg-chno=\"{preset}\""));
    }
    if !channel.group.is_empty() {
        let groups: Vec<&str> = channel.group.iter().map(String::as_str).collect();
        extinf.push_str(&format!(" group-title=\"{}\"", m3u_safe(&groups.join(";"))));
    }
    if channel.radio {
        extinf.push_str(" radio=\"true\"");
    }

    let mut record = format!("{extinf},{name}\n");
    for (key, value) in &channel.kodiprops {
        record.push_str(&format!("#KODIPROP:{}={}\n", m3u_safe(key), m3u_safe(value)));
    }
    record.push_str(&m3u_safe(&channel.stream));
    record.push_str("\n\n");
    record
}

/// Render the combined playlist of all sources, in source order
pub fn render_playlist(sources: &[SourceChannels]) -> String {
    let mut playlist = String::from(M3U_HEADER);

    for source in sources {
        match &source.payload {
            ChannelPayload::Structured(channels) => {
                for channel in channels {
                    playlist.push_str(&render_channel(channel));
                }
            }
            ChannelPayload::Raw(body) => {
                if !body.is_empty() {
                    playlist.push_str(body);
                    playlist.push_str("\n\n");
                }
            }
        }
    }

    playlist
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_minimal_channel_omits_optional_attributes() {
        let channel = Channel::new("C1", "plugin://x/play/1");
        assert_eq!(
            render_channel(&channel),
            "#EXTINF:-1 tvg-name=\"C1\",C1\nplugin://x/play/1\n\n"
        );
    }

    #[test]
    fn test_full_channel_attribute_order() {
        let mut channel = Channel::new("One", "http://x/one.mpd");
        channel.id = Some("one.be".to_string());
        channel.logo = Some("http://x/one.png".to_string());
        channel.preset = Some(1);
        channel.group = BTreeSet::from(["VRT".to_string(), "News".to_string()]);
        channel.radio = true;
        channel
            .kodiprops
            .insert("inputstream".to_string(), "inputstream.adaptive".to_string());
        channel.kodiprops.insert(
            "inputstream.adaptive.manifest_type".to_string(),
            "mpd".to_string(),
        );

        assert_eq!(
            render_channel(&channel),
            "#EXTINF:-1 tvg-name=\"One\" tvg-id=\"one.be\" tvg-logo=\"http://x/one.png\" \
             tvg-chno=\"1\" group-title=\"News;VRT\" radio=\"true\",One\n\
             #KODIPROP:inputstream=inputstream.adaptive\n\
             #KODIPROP:inputstream.adaptive.manifest_type=mpd\n\
             http://x/one.mpd\n\n"
        );
    }

    #[test]
    fn test_quotes_cannot_break_attributes() {
        let channel = Channel::new("The \"Best\"\nChannel", "http://x");
        assert!(render_channel(&channel)
            .starts_with("#EXTINF:-1 tvg-name=\"The 'Best' Channel\",The 'Best' Channel\n"));
    }

    #[test]
    fn test_playlist_combines_structured_and_raw() {
        let mut c1 = Channel::new("C1", "plugin://x/play/1");
        c1.group.insert("Example".to_string());

        let sources = vec![
            SourceChannels {
                source_name: "Example".to_string(),
                payload: ChannelPayload::Structured(vec![c1]),
            },
            SourceChannels {
                source_name: "Files".to_string(),
                payload: ChannelPayload::Raw("#EXTINF:-1,C2\nhttp://x/2".to_string()),
            },
            SourceChannels {
                source_name: "Empty".to_string(),
                payload: ChannelPayload::empty(),
            },
        ];

        assert_eq!(
            render_playlist(&sources),
            "#EXTM3U\n\
             #EXTINF:-1 tvg-name=\"C1\" group-title=\"Example\",C1\nplugin://x/play/1\n\n\
             #EXTINF:-1,C2\nhttp://x/2\n\n"
        );
    }

    #[test]
    fn test_empty_playlist_is_just_the_header() {
        assert_eq!(render_playlist(&[]), "#EXTM3U\n");
    }
}
