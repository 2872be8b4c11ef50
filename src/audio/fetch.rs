//! Getting source bytes into memory: HTTP(S) through `reqwest`, everything
//! else from the local filesystem. Duration is read with `lofty` so the
//! engine learns it even for formats whose decoder cannot tell.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lofty::file::AudioFile;
use lofty::probe::Probe;
use percent_encoding::percent_decode_str;

use crate::config::StreamSettings;
use crate::resolver::is_absolute;

use super::error::DeviceError;

/// Cheaply clonable audio bytes; every rebuilt sink gets its own cursor.
#[derive(Clone)]
pub(super) struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SharedBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

#[derive(Clone)]
pub(super) struct LoadedMedia {
    pub bytes: SharedBytes,
    /// Duration from container metadata, if any.
    pub duration: Option<Duration>,
}

#[derive(Clone, Debug)]
pub(super) struct FetchConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl From<&StreamSettings> for FetchConfig {
    fn from(stream: &StreamSettings) -> Self {
        Self {
            connect_timeout: Duration::from_millis(stream.connect_timeout_ms),
            read_timeout: Duration::from_millis(stream.read_timeout_ms),
        }
    }
}

pub(super) fn fetch_media(source: &str, config: &FetchConfig) -> Result<LoadedMedia, DeviceError> {
    let bytes = if is_absolute(source) {
        fetch_http(source, config)?
    } else {
        read_file(source)?
    };
    let duration = container_duration(&bytes);
    Ok(LoadedMedia {
        bytes: bytes.into(),
        duration,
    })
}

fn fetch_http(url: &str, config: &FetchConfig) -> Result<Vec<u8>, DeviceError> {
    let http_err = |source: reqwest::Error| DeviceError::Http {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.read_timeout)
        .build()
        .map_err(http_err)?;

    let response = client.get(url).send().map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(DeviceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.bytes().map_err(http_err)?;
    tracing::debug!(url, bytes = body.len(), "fetched audio");
    Ok(body.to_vec())
}

/// `source` went through the resolver, so it is percent-encoded.
fn read_file(source: &str) -> Result<Vec<u8>, DeviceError> {
    let raw = source.strip_prefix("file://").unwrap_or(source);
    let path = PathBuf::from(percent_decode_str(raw).decode_utf8_lossy().into_owned());
    std::fs::read(&path).map_err(|source| DeviceError::Io { path, source })
}

pub(super) fn container_duration(bytes: &[u8]) -> Option<Duration> {
    let tagged = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .ok()?
        .read()
        .ok()?;
    let duration = tagged.properties().duration();
    (!duration.is_zero()).then_some(duration)
}
