//! Raw pass-through helpers
//!
//! A source may answer with a ready-made playlist or guide document instead
//! of structured data. Such replies skip field validation; only the outer
//! wrapper is removed so the body can be embedded in the combined output.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{SourceError, SourceResult};

const M3U_HEADER: &str = "#EXTM3U";

static TV_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tv[^>]*>(.*)</tv>").expect("valid <tv> element pattern")
});

static CHANNEL_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<channel\b[^>]*/>|<channel\b.*?</channel>")
        .expect("valid <channel> element pattern")
});

/// Playlist body without its `#EXTM3U` header line
///
/// Attributes on the header line (`url-tvg=...`) belong to the source's own
/// playlist and are dropped with it.
pub fn extract_m3u(data: &str) -> String {
    data.lines()
        .filter(|line| !line.trim_start().starts_with(M3U_HEADER))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Content of the outermost `<tv>` element
pub fn extract_xmltv(data: &str) -> SourceResult<String> {
    TV_ELEMENT
        .captures(data)
        .and_then(|captures| captures.get(1))
        .map(|inner| inner.as_str().trim().to_string())
        .ok_or_else(|| SourceError::malformed("XMLTV document has no <tv> element"))
}

/// Split a `<tv>` fragment into its `<channel>` elements and everything else
pub fn split_xmltv_channels(fragment: &str) -> (Vec<&str>, String) {
    let channels: Vec<&str> = CHANNEL_ELEMENT
        .find_iter(fragment)
        .map(|m| m.as_str())
        .collect();
    let rest = CHANNEL_ELEMENT.replace_all(fragment, "");
    (channels, rest.trim().to_string())
}
