use std::io::Read;

use tracing::debug;

use crate::errors::{SourceError, SourceResult};

/// Compression formats recognised from a location's file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Bzip2,
    Uncompressed,
}

/// Suffix-driven decompression for URL and file sources
pub struct DecompressionService;

impl DecompressionService {
    /// Pick the format from the last path component of a URL or file name
    ///
    /// Query strings and fragments are ignored, so
    /// `http://host/guide.xml.gz?token=1` is still gzip.
    pub fn detect_from_suffix(location: &str) -> CompressionFormat {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or(location)
            .to_ascii_lowercase();

        if path.ends_with(".gz") {
            CompressionFormat::Gzip
        } else if path.ends_with(".bz2") {
            CompressionFormat::Bzip2
        } else {
            CompressionFormat::Uncompressed
        }
    }

    /// Decompress `data` according to the suffix of `location`
    pub fn decompress_for(location: &str, data: Vec<u8>) -> SourceResult<Vec<u8>> {
        let format = Self::detect_from_suffix(location);
        debug!("Compression format for {}: {:?}", location, format);

        match format {
            CompressionFormat::Gzip => Self::decompress_gzip(&data),
            CompressionFormat::Bzip2 => Self::decompress_bzip2(&data),
            CompressionFormat::Uncompressed => Ok(data),
        }
    }

    #[cfg(feature = "compression-gzip")]
    fn decompress_gzip(data: &[u8]) -> SourceResult<Vec<u8>> {
        let mut decoder = flate2::read::GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SourceError::fetch_failed(format!("Failed to decompress gzip data: {e}")))?;
        Ok(decompressed)
    }

    #[cfg(not(feature = "compression-gzip"))]
    fn decompress_gzip(_data: &[u8]) -> SourceResult<Vec<u8>> {
        Err(SourceError::fetch_failed(
            "gzip support is not enabled in this build",
        ))
    }

    #[cfg(feature = "compression-bzip2")]
    fn decompress_bzip2(data: &[u8]) -> SourceResult<Vec<u8>> {
        let mut decoder = bzip2::read::BzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SourceError::fetch_failed(format!("Failed to decompress bzip2 data: {e}")))?;
        Ok(decompressed)
    }

    #[cfg(not(feature = "compression-bzip2"))]
    fn decompress_bzip2(_data: &[u8]) -> SourceResult<Vec<u8>> {
        Err(SourceError::fetch_failed(
            "bzip2 support is not enabled in this build",
        ))
    }
}
