//! Utility modules shared by the sources and the host layer

pub mod datetime;
pub mod decompression;
pub mod http_client;
pub mod url;

pub use datetime::{DateTimeParser, ProgramTime};
pub use decompression::{CompressionFormat, DecompressionService};
pub use http_client::{DecompressingHttpClient, StandardHttpClient};
pub use url::UrlUtils;
