//! Chart icon download
//!
//! OLM embeds the operator icon inline as base64 data, so the chart's icon
//! URL is fetched once at generation time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use olmpack_core::Icon;
use std::time::Duration;

use crate::error::{CsvError, Result};

pub const PNG_MEDIA_TYPE: &str = "image/png";
pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Downloads chart icons
pub struct IconFetcher {
    client: reqwest::Client,
}

impl IconFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CsvError::IconFetch {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self { client })
    }

    /// Fetch `url` and encode it as an OLM icon
    pub async fn fetch(&self, url: &str) -> Result<Icon> {
        let fetch_error = |message: String| CsvError::IconFetch {
            url: url.to_string(),
            message,
        };

        tracing::debug!(url, "fetching icon");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        icon_from_bytes(&bytes)
    }
}

/// Encode raw image bytes, rejecting anything but PNG and SVG
pub fn icon_from_bytes(bytes: &[u8]) -> Result<Icon> {
    let media_type = sniff_media_type(bytes);
    if media_type != PNG_MEDIA_TYPE && media_type != SVG_MEDIA_TYPE {
        return Err(CsvError::UnsupportedIconMediaType {
            media_type: media_type.to_string(),
        });
    }

    Ok(Icon {
        data: STANDARD.encode(bytes),
        media_type: media_type.to_string(),
    })
}

/// Content sniffing; binary formats by magic bytes, SVG by its root element
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PNG_MAGIC) {
        return PNG_MEDIA_TYPE;
    }
    if bytes.starts_with(b"\xff\xd8\xff") {
        return "image/jpeg";
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return "image/gif";
    }

    let text = String::from_utf8_lossy(bytes);
    if skip_xml_preamble(&text).starts_with("<svg") {
        return SVG_MEDIA_TYPE;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return "text/plain";
    }

    "application/octet-stream"
}

/// Skip a byte order mark, the XML declaration, comments, processing
/// instructions and the doctype, in any number and order
fn skip_xml_preamble(text: &str) -> &str {
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();
    loop {
        let end = if rest.starts_with("<!--") {
            rest.find("-->").map(|i| i + 3)
        } else if rest.starts_with("<?") {
            rest.find("?>").map(|i| i + 2)
        } else if rest.starts_with("<!") {
            rest.find('>').map(|i| i + 1)
        } else {
            return rest;
        };
        match end {
            Some(end) => rest = rest[end..].trim_start(),
            None => return "",
        }
    }
}
