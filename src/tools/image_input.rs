//! Image input classification and resolution.
//!
//! Callers may hand over an image in several shapes. Classification is a
//! pure, ordered set of checks (first match wins):
//!
//! 1. raw bytes supplied by the host
//! 2. `http://` or `https://` URL
//! 3. `data:` URI with a base64 payload
//! 4. bare base64 whose decoded bytes carry a known image signature
//! 5. anything else is a filesystem path
//!
//! Resolution then performs the I/O for the chosen variant and always ends
//! in a [`ResolvedImage`].

use crate::error::{ImageResolutionError, VisionResult};
use crate::types::image::{
    mime_from_content_type, mime_from_extension, DataUri, MediaType, ResolvedImage,
    FALLBACK_MIME_TYPE,
};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Transport timeout for downloading remote images.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Shortest string considered as bare base64.
const MIN_BASE64_LEN: usize = 4;

static BASE64_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").expect("base64 regex should compile"));

// Accepts input with or without trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An image as handed over by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Binary payload supplied by the host, with an optional MIME hint.
    Bytes {
        /// Raw image bytes.
        data: Vec<u8>,
        /// MIME type the host claims, used only if sniffing fails.
        mime_hint: Option<String>,
    },
    /// A URL, data URI, base64 string or path.
    Text(String),
}

/// The classified shape of an image input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Raw bytes, used as-is.
    InlineData {
        /// Raw image bytes.
        bytes: Vec<u8>,
        /// MIME type the host claims.
        mime_hint: Option<String>,
    },
    /// Base64 text, optionally from a data URI with a declared MIME type.
    InlineBase64 {
        /// The base64 payload.
        data: String,
        /// MIME type declared by a data URI header.
        declared_mime: Option<String>,
    },
    /// An `http(s)` URL to download.
    RemoteUrl(String),
    /// A filesystem path, absolute or relative.
    FilePath(String),
}

impl ImageReference {
    /// Classifies host input.
    #[must_use]
    pub fn from_input(input: ImageInput) -> Self {
        match input {
            ImageInput::Bytes { data, mime_hint } => Self::InlineData {
                bytes: data,
                mime_hint,
            },
            ImageInput::Text(text) => Self::classify(&text),
        }
    }

    /// Classifies a textual image reference.
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let text = text.trim();

        if is_remote_url(text) {
            return Self::RemoteUrl(text.to_string());
        }

        if let Some(uri) = DataUri::parse(text) {
            return Self::InlineBase64 {
                data: uri.payload.to_string(),
                declared_mime: uri.mime_type.map(str::to_string),
            };
        }

        if is_base64_image(text) {
            return Self::InlineBase64 {
                data: text.to_string(),
                declared_mime: None,
            };
        }

        Self::FilePath(text.to_string())
    }

    /// Short name of the variant, for logs.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::InlineData { .. } => "inline_data",
            Self::InlineBase64 { .. } => "inline_base64",
            Self::RemoteUrl(_) => "remote_url",
            Self::FilePath(_) => "file_path",
        }
    }
}

/// Returns `true` for strings starting with `http://` or `https://`.
#[must_use]
pub fn is_remote_url(text: &str) -> bool {
    let lower = text.get(..8).unwrap_or(text).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Returns `true` if `text` is base64 that decodes to a recognizable image.
#[must_use]
pub fn is_base64_image(text: &str) -> bool {
    if text.len() < MIN_BASE64_LEN || !BASE64_SHAPE.is_match(text) {
        return false;
    }
    LENIENT_BASE64
        .decode(text)
        .map(|bytes| MediaType::sniff(&bytes).is_some())
        .unwrap_or(false)
}

/// Resolves a path reference to an absolute path.
///
/// Absolute paths are returned unchanged. Relative paths are joined onto
/// `project_root` when given (itself taken relative to `cwd` if needed),
/// otherwise onto `cwd`.
#[must_use]
pub fn resolve_path(reference: &str, project_root: Option<&Path>, cwd: &Path) -> PathBuf {
    let path = Path::new(reference);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match project_root {
        Some(root) => cwd.join(root).join(path),
        None => cwd.join(path),
    }
}

/// Turns image references into bytes and a MIME type.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: reqwest::Client,
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageResolver {
    /// Creates a resolver whose downloads use [`FETCH_TIMEOUT`].
    #[must_use]
    pub fn new() -> Self {
        let client = client_or_default(reqwest::Client::builder().timeout(FETCH_TIMEOUT).build());
        Self { client }
    }

    /// Resolves a classified reference.
    ///
    /// # Errors
    ///
    /// Returns [`ImageResolutionError`] (wrapped in `VisionError`) if the
    /// download fails, the file is missing or unreadable, or inline data
    /// cannot be decoded.
    pub async fn resolve(
        &self,
        reference: ImageReference,
        project_root: Option<&Path>,
    ) -> VisionResult<ResolvedImage> {
        let variant = reference.variant_name();
        let image = match reference {
            ImageReference::InlineData { bytes, mime_hint } => {
                ensure_not_empty(&bytes)?;
                let mime_type = sniffed_or(&bytes, mime_hint.filter(|m| m.starts_with("image/")));
                ResolvedImage::new(bytes, mime_type)
            }
            ImageReference::InlineBase64 {
                data,
                declared_mime,
            } => {
                let bytes = LENIENT_BASE64
                    .decode(data.trim())
                    .map_err(|e| ImageResolutionError::InvalidInlineData(e.to_string()))?;
                ensure_not_empty(&bytes)?;
                let mime_type = match declared_mime.filter(|m| m.starts_with("image/")) {
                    Some(declared) => declared,
                    None => sniffed_or(&bytes, None),
                };
                ResolvedImage::new(bytes, mime_type)
            }
            ImageReference::RemoteUrl(url) => self.fetch(&url).await?,
            ImageReference::FilePath(reference) => {
                let cwd = std::env::current_dir().map_err(|e| {
                    ImageResolutionError::FileUnreadable {
                        path: PathBuf::from(&reference),
                        reason: format!("cannot determine working directory: {e}"),
                    }
                })?;
                read_file(&resolve_path(&reference, project_root, &cwd)).await?
            }
        };

        debug!(
            variant,
            mime_type = %image.mime_type,
            bytes = image.bytes.len(),
            "image resolved"
        );
        Ok(image)
    }

    async fn fetch(&self, url: &str) -> Result<ResolvedImage, ImageResolutionError> {
        let fetch_error = |reason: String| ImageResolutionError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(mime_from_content_type);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .to_vec();

        let mime_type = match header_mime.or_else(|| mime_from_extension(url)) {
            Some(mime) => mime,
            None => sniffed_or(&bytes, None),
        };
        Ok(ResolvedImage::new(bytes, mime_type))
    }
}

async fn read_file(path: &Path) -> Result<ResolvedImage, ImageResolutionError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ImageResolutionError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ImageResolutionError::FileUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    })?;

    let mime_type = match path.to_str().and_then(mime_from_extension) {
        Some(mime) => mime,
        None => sniffed_or(&bytes, None),
    };
    Ok(ResolvedImage::new(bytes, mime_type))
}

fn client_or_default(built: reqwest::Result<reqwest::Client>) -> reqwest::Client {
    built.unwrap_or_else(|e| {
        warn!("Failed to build download client, fetching without timeout: {e}");
        reqwest::Client::new()
    })
}

fn ensure_not_empty(bytes: &[u8]) -> Result<(), ImageResolutionError> {
    if bytes.is_empty() {
        return Err(ImageResolutionError::InvalidInlineData(
            "empty image payload".to_string(),
        ));
    }
    Ok(())
}

fn sniffed_or(bytes: &[u8], hint: Option<String>) -> String {
    MediaType::sniff(bytes)
        .map(|m| m.as_str().to_string())
        .or(hint)
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}
