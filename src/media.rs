//! Local media assets and their pre-flight checks.
//!
//! An asset's size and type are confirmed by reading it before any network
//! call: a path that cannot be read, or whose size changes between the
//! metadata read and the content read, is a precondition failure
//! (`LocalAssetUnreadable`), never a network failure.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PostError, PostResult};

/// Remote media taxonomy used by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    TweetImage,
    TweetGif,
    TweetVideo,
}

impl MediaCategory {
    /// Wire value for the `media_category` request field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TweetImage => "tweet_image",
            Self::TweetGif => "tweet_gif",
            Self::TweetVideo => "tweet_video",
        }
    }

    /// Derive the category from a MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        if mime == "image/gif" {
            Self::TweetGif
        } else if mime.starts_with("video/") {
            Self::TweetVideo
        } else {
            Self::TweetImage
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local media asset, fully read and verified before upload.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    file_name: String,
    mime: String,
    category: MediaCategory,
    data: Vec<u8>,
    path: Option<PathBuf>,
}

impl MediaAsset {
    /// Read an asset from disk, verifying readability and size.
    ///
    /// The file's metadata size is compared against the bytes actually read;
    /// a mismatch (e.g. the file changed mid-read) is `LocalAssetUnreadable`.
    pub async fn from_path(path: impl AsRef<Path>) -> PostResult<Self> {
        let path = path.as_ref();
        let unreadable = |reason: String| PostError::LocalAssetUnreadable {
            path: path.display().to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(unreadable("not a regular file".into()));
        }
        let declared = metadata.len();

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        if data.len() as u64 != declared {
            return Err(unreadable(format!(
                "declared size {declared} bytes but read {} bytes",
                data.len()
            )));
        }

        let file_name = path
            .file_name()
            .map_or_else(|| "media".to_string(), |n| n.to_string_lossy().into_owned());
        let mime = sniff_mime(&data, &file_name);
        let category = MediaCategory::from_mime(&mime);

        Ok(Self {
            file_name,
            mime,
            category,
            data,
            path: Some(path.to_path_buf()),
        })
    }

    /// Build an asset from an in-memory buffer with a declared MIME type.
    #[must_use]
    pub fn from_bytes(file_name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        let mime = mime.into();
        let category = MediaCategory::from_mime(&mime);
        Self {
            file_name: file_name.into(),
            mime,
            category,
            data,
            path: None,
        }
    }

    /// File name sent with multipart uploads.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Confirmed MIME type.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Remote media category.
    #[must_use]
    pub fn category(&self) -> MediaCategory {
        self.category
    }

    /// Confirmed size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The verified content.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Source path, when the asset came from disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Human-readable source description for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.path {
            Some(p) => format!("{} ({} bytes, {})", p.display(), self.size(), self.mime),
            None => format!("{} ({} bytes, {})", self.file_name, self.size(), self.mime),
        }
    }
}

/// An opaque media identifier usable in a subsequent post-creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle(pub String);

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identify the MIME type from content magic bytes, falling back to the
/// file extension, then to `application/octet-stream`.
#[must_use]
pub fn sniff_mime(data: &[u8], file_name: &str) -> String {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png".into();
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg".into();
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif".into();
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp".into();
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return "video/mp4".into();
    }

    let extension = file_name.rsplit('.').next().unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png".into(),
        "jpg" | "jpeg" => "image/jpeg".into(),
        "gif" => "image/gif".into(),
        "webp" => "image/webp".into(),
        "mp4" => "video/mp4".into(),
        _ => "application/octet-stream".into(),
    }
}
