//! Image asset loading.
//!
//! Image elements reference their bitmap by path, optionally carrying a
//! cache-busting query suffix. For export the bitmap is read from an asset
//! root and embedded as a base64 data URI.

use std::path::{Path, PathBuf};

use base64::Engine;

use crate::error::{RenderError, RenderResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF.
    Gif,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    /// MIME type for data URIs.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }
}

/// Strip a cache-busting query or fragment from a source reference.
#[must_use]
pub fn strip_cache_suffix(source_ref: &str) -> &str {
    source_ref
        .split_once(['?', '#'])
        .map_or(source_ref, |(path, _)| path)
}

/// Resolve a source reference to a file under `root`.
///
/// Leading slashes are ignored so server-style absolute paths such as
/// `/static/out/1.png` resolve inside the root. Parent components are
/// rejected.
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the path escapes the root.
pub fn resolve_asset_path(root: &Path, source_ref: &str) -> RenderResult<PathBuf> {
    let relative = strip_cache_suffix(source_ref).trim_start_matches('/');
    if relative.is_empty() || relative.split('/').any(|part| part == "..") {
        return Err(RenderError::Resource(format!(
            "refusing to resolve {source_ref} under {}",
            root.display()
        )));
    }
    Ok(root.join(relative))
}

/// Read an asset and encode it as a data URI.
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the file cannot be read or is not a
/// supported image.
pub fn load_data_uri(root: &Path, source_ref: &str) -> RenderResult<String> {
    if source_ref.starts_with("data:") {
        return Ok(source_ref.to_string());
    }
    let path = resolve_asset_path(root, source_ref)?;
    let bytes = std::fs::read(&path)
        .map_err(|e| RenderError::Resource(format!("Failed to read {}: {e}", path.display())))?;
    encode_data_uri(&bytes)
}

/// Encode raw image bytes as a base64 data URI.
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the bytes are not a supported image.
pub fn encode_data_uri(bytes: &[u8]) -> RenderResult<String> {
    let format = ImageFormat::from_magic_bytes(bytes)
        .ok_or_else(|| RenderError::Resource("Unsupported or corrupt image data".to_string()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{encoded}", format.mime()))
}
