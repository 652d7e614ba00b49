//! One-shot request/response exchange with plugin sources
//!
//! A plugin cannot be called directly: it is launched by URI through the
//! host and answers asynchronously. An exchange therefore prepares a reply
//! endpoint, encodes that endpoint into the trigger URI, fires the trigger
//! and waits for the answer. Two endpoint kinds exist:
//!
//! - [`socket::SocketTransport`]: an ephemeral loopback listener the plugin
//!   connects back to (`$PORT` / `port=`)
//! - [`file_poll::FilePollTransport`]: a temporary file the plugin writes
//!   (`$FILE` / `file=`), polled until complete
//!
//! A single exchange only ever uses one of them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{TransportConfig, TransportKind};
use crate::errors::SourceResult;
use crate::host::ActionExecutor;
use crate::utils::url::UrlUtils;

pub mod file_poll;
pub mod socket;

pub use file_poll::FilePollTransport;
pub use socket::{ReplyListener, SocketTransport};

/// Where in a trigger URI the reply endpoint is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPlaceholder {
    /// Literal `$PORT` token
    PortToken,
    /// `port=<N>` query parameter, added or replaced
    PortQuery,
    /// Literal `$FILE` token
    FileToken,
    /// `file=<path>` query parameter, added or replaced
    FileQuery,
}

impl TriggerPlaceholder {
    pub const PORT_TOKEN: &'static str = "$PORT";
    pub const FILE_TOKEN: &'static str = "$FILE";

    /// Placeholder to use for a port; the literal token wins over the query
    pub fn for_port(template: &str) -> Self {
        if template.contains(Self::PORT_TOKEN) {
            Self::PortToken
        } else {
            Self::PortQuery
        }
    }

    /// Placeholder to use for a file path; the literal token wins over the query
    pub fn for_file(template: &str) -> Self {
        if template.contains(Self::FILE_TOKEN) {
            Self::FileToken
        } else {
            Self::FileQuery
        }
    }

    /// Encode `value` into `template`
    pub fn substitute(self, template: &str, value: &str) -> String {
        match self {
            Self::PortToken => template.replace(Self::PORT_TOKEN, value),
            Self::FileToken => template.replace(Self::FILE_TOKEN, value),
            Self::PortQuery => UrlUtils::set_query_param(template, "port", value),
            Self::FileQuery => UrlUtils::set_query_param(template, "file", value),
        }
    }
}

/// A reply channel to a plugin source
#[async_trait]
pub trait Transport: Send + Sync {
    /// Trigger `template` through `executor` and return the raw reply
    async fn exchange(
        &self,
        template: &str,
        executor: &dyn ActionExecutor,
    ) -> SourceResult<Vec<u8>>;
}

/// Build the configured transport
pub fn transport_for(config: &TransportConfig) -> Arc<dyn Transport> {
    match config.kind {
        TransportKind::Socket => Arc::new(SocketTransport::new(config.connect_timeout)),
        TransportKind::FilePoll => Arc::new(FilePollTransport::new(
            config.connect_timeout,
            config.poll_interval,
        )),
    }
}

/// Name used in diagnostics for the plugin behind a trigger URI
pub(crate) fn peer_label(template: &str) -> String {
    UrlUtils::plugin_id(template).unwrap_or_else(|| UrlUtils::obfuscate_credentials(template))
}
