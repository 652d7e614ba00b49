//! URL utilities for consistent URL handling
//!
//! Trigger URIs (`plugin://...`), HTTP(S) source locations and channel logo
//! references all pass through here.

use regex::Regex;
use url::Url;

/// Prefixes of logo references that are used as-is instead of being joined
/// with a source's install path
const ABSOLUTE_REFERENCE_PREFIXES: [&str; 5] =
    ["http://", "https://", "special://", "resource://", "/"];

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Set (or replace) one query parameter, keeping all other parameters
    /// in their original order
    ///
    /// # Examples
    ///
    /// ```rust
    /// use iptv_manager::utils::url::UrlUtils;
    ///
    /// assert_eq!(
    ///     UrlUtils::set_query_param("plugin://plugin.video.x/iptv?port=1&a=b", "port", "8080"),
    ///     "plugin://plugin.video.x/iptv?port=8080&a=b"
    /// );
    /// ```
    pub fn set_query_param(uri: &str, key: &str, value: &str) -> String {
        let Ok(mut parsed) = Url::parse(uri) else {
            // Not parseable as an absolute URL; append textually
            let separator = if uri.contains('?') { '&' } else { '?' };
            return format!("{uri}{separator}{key}={value}");
        };

        let mut pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value.to_string(),
            None => pairs.push((key.to_string(), value.to_string())),
        }
        pairs.retain({
            let mut seen = false;
            move |(k, _)| {
                if k != key {
                    return true;
                }
                let keep = !seen;
                seen = true;
                keep
            }
        });

        parsed.query_pairs_mut().clear().extend_pairs(pairs);
        parsed.to_string()
    }

    /// Whether a logo reference is already absolute or scheme-qualified
    pub fn is_absolute_reference(reference: &str) -> bool {
        ABSOLUTE_REFERENCE_PREFIXES
            .iter()
            .any(|prefix| reference.starts_with(prefix))
    }

    /// Whether a URI addresses a plugin (the only kind a plugin source can trigger)
    pub fn is_plugin_uri(uri: &str) -> bool {
        uri.starts_with("plugin://")
    }

    /// Addon id (authority part) of a `plugin://` URI
    pub fn plugin_id(uri: &str) -> Option<String> {
        let rest = uri.strip_prefix("plugin://")?;
        let id = rest.split(['/', '?']).next().unwrap_or_default();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    /// Obfuscate sensitive information in URLs for safe logging
    ///
    /// Masks user info and the usual credential query parameters.
    pub fn obfuscate_credentials(url: &str) -> String {
        let mut obfuscated = url.to_string();

        if let Ok(parsed) = Url::parse(url) {
            if !parsed.username().is_empty() || parsed.password().is_some() {
                let mut new_url = parsed.clone();
                let _ = new_url.set_username("****");
                let _ = new_url.set_password(Some("****"));
                obfuscated = new_url.to_string();
            }
        }

        let sensitive_params = ["username", "password", "user", "pass", "pwd", "token"];

        for param in &sensitive_params {
            let pattern = format!(r"(?i)([?&]{}=)[^&]*", regex::escape(param));
            if let Ok(re) = Regex::new(&pattern) {
                obfuscated = re.replace_all(&obfuscated, "${1}****").to_string();
            }
        }

        obfuscated
    }
}
