use std::path::PathBuf;

use super::image_decoder::DecodeError;

/// Where an image to analyse comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// An encoded image file on disk.
    Path(PathBuf),
    /// Encoded image bytes, e.g. an upload body.
    Bytes(Vec<u8>),
    /// A `"<header>,<base64 payload>"` string as produced by a browser
    /// canvas capture (`data:image/jpeg;base64,...`).
    DataUrl(String),
}

impl ImageSource {
    /// Short label for log messages; never includes payload data.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            ImageSource::DataUrl(url) => format!("<data url, {} chars>", url.len()),
        }
    }
}

/// Returns the base64 payload of a data URL: everything after the first comma.
pub fn data_url_payload(data_url: &str) -> Result<&str, DecodeError> {
    data_url
        .split_once(',')
        .map(|(_, payload)| payload.trim())
        .ok_or_else(|| DecodeError::MalformedInput("data URL has no ',' delimiter".to_string()))
}
