//! Image types for vision requests.
//!
//! A resolved image is a byte buffer plus a MIME type. Vision gateways take
//! images inline as `data:` URIs, so this module also owns the data-URI
//! encoding and the MIME inference rules:
//!
//! - magic-byte sniffing for PNG, JPEG, GIF and WebP
//! - extension guessing for paths and URLs
//! - `Content-Type` header parsing for downloads
//!
//! When nothing matches, callers fall back to [`FALLBACK_MIME_TYPE`].
//!
//! # Example
//!
//! ```
//! use openvision::types::image::ResolvedImage;
//!
//! let image = ResolvedImage::new(vec![0x89, b'P', b'N', b'G'], "image/png");
//! assert_eq!(image.to_data_uri(), "data:image/png;base64,iVBORw==");
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

/// MIME type assumed when an image's type cannot be determined.
pub const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Image formats recognized by their magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// PNG image (`image/png`).
    Png,
    /// JPEG image (`image/jpeg`).
    Jpeg,
    /// GIF image (`image/gif`).
    Gif,
    /// WebP image (`image/webp`).
    Webp,
}

impl MediaType {
    /// Returns the MIME type string for this media type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Detects the media type from the leading bytes of an image.
    ///
    /// Returns `None` when no known signature matches.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // GIF: "GIF8"
        if bytes.starts_with(b"GIF8") {
            return Some(Self::Gif);
        }

        // WebP: "RIFF" .... "WEBP"
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }

        None
    }
}

/// Guesses an image MIME type from a path or URL extension.
///
/// Query strings and fragments are ignored. Only `image/*` guesses are
/// returned.
#[must_use]
pub fn mime_from_extension(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let ext = Path::new(path).extension()?.to_str()?;
    mime_guess::from_ext(ext)
        .iter()
        .map(|m| m.essence_str().to_string())
        .find(|m| m.starts_with("image/"))
}

/// Extracts an image MIME type from a `Content-Type` header value.
///
/// Parameters such as `; charset=binary` are dropped. Returns `None` for
/// non-image types.
#[must_use]
pub fn mime_from_content_type(header: &str) -> Option<String> {
    let essence = header.split(';').next()?.trim().to_ascii_lowercase();
    essence.starts_with("image/").then_some(essence)
}

/// An image ready to be embedded in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
}

impl ResolvedImage {
    /// Creates a resolved image.
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Encodes the image as `data:<mime_type>;base64,<payload>`.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// The parts of a `data:` URI carrying base64 content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    /// Declared MIME type, if the header names one.
    pub mime_type: Option<&'a str>,
    /// The base64 payload after `;base64,`.
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Splits a base64 `data:` URI into its MIME type and payload.
    ///
    /// Returns `None` if `uri` is not a `data:` URI or is not base64 encoded.
    #[must_use]
    pub fn parse(uri: &'a str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let header = header.strip_suffix(";base64")?;
        let mime_type = header.split(';').next().filter(|m| !m.is_empty());
        Some(Self { mime_type, payload })
    }
}
