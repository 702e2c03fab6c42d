//! Image uploads attached at intake.
//!
//! Only raster images are kept. The declared content type must be one of
//! PNG, JPEG, GIF or WebP and the leading bytes must match it; the stored
//! file always carries the extension of the sniffed format, since
//! `/uploads` is served by extension from the same origin.

use chrono::Utc;
use repair_desk_core::TicketError;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use uuid::Uuid;

/// Boxed future returned by [`ImageStore`] methods.
pub type ImageFuture<'a, T = String> =
    Pin<Box<dyn Future<Output = Result<T, TicketError>> + Send + 'a>>;

/// Persists uploaded images and returns a reference to store on the ticket.
pub trait ImageStore: Send + Sync {
    /// Store one image.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] for a content type outside
    ///   [`ImageFormat`] or bytes that do not match it
    /// - [`TicketError::Upstream`] if the bytes could not be written
    fn store(&self, file_name: String, content_type: String, bytes: Vec<u8>) -> ImageFuture<'_>;

    /// Delete a previously stored image. Removing a missing image succeeds.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] for a reference this store did not issue
    /// - [`TicketError::Upstream`] if the file could not be deleted
    fn remove(&self, reference: String) -> ImageFuture<'_, ()>;
}

/// Accepted raster formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
    /// `image/gif`
    Gif,
    /// `image/webp`
    Webp,
}

impl ImageFormat {
    /// Map a declared content type, ignoring parameters and case.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Detect the format from the file signature.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    /// File extension used for stored files.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Writes images below a directory served at `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    /// Public URL prefix of stored files.
    pub const URL_PREFIX: &'static str = "/uploads";

    /// Create a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name behind a reference issued by [`ImageStore::store`].
    fn stored_name(reference: &str) -> Option<&str> {
        let name = reference.strip_prefix(Self::URL_PREFIX)?.strip_prefix('/')?;
        (!name.is_empty() && sanitize_file_name(name) == name).then_some(name)
    }
}

impl ImageStore for LocalImageStore {
    fn store(&self, file_name: String, content_type: String, bytes: Vec<u8>) -> ImageFuture<'_> {
        Box::pin(async move {
            let Some(declared) = ImageFormat::from_content_type(&content_type) else {
                return Err(TicketError::Validation(format!(
                    "Only PNG, JPEG, GIF or WebP images are accepted, got '{content_type}'"
                )));
            };
            if ImageFormat::sniff(&bytes) != Some(declared) {
                return Err(TicketError::Validation(format!(
                    "Upload '{}' is not a valid {content_type} file",
                    sanitize_file_name(&file_name)
                )));
            }

            let sanitized = sanitize_file_name(&file_name);
            let stem = sanitized
                .rsplit_once('.')
                .map_or(sanitized.as_str(), |(stem, _)| stem);
            let stored_name = format!(
                "{}-{}-{stem}.{}",
                Utc::now().timestamp_millis(),
                Uuid::new_v4().simple(),
                declared.extension()
            );

            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| io_failed("write", &e))?;
            tokio::fs::write(self.dir.join(&stored_name), &bytes)
                .await
                .map_err(|e| io_failed("write", &e))?;

            tracing::debug!(file = %stored_name, size = bytes.len(), "Stored upload");
            Ok(format!("{}/{stored_name}", Self::URL_PREFIX))
        })
    }

    fn remove(&self, reference: String) -> ImageFuture<'_, ()> {
        Box::pin(async move {
            let Some(name) = Self::stored_name(&reference) else {
                return Err(TicketError::Validation(format!(
                    "'{reference}' is not a stored upload"
                )));
            };
            match tokio::fs::remove_file(self.dir.join(name)).await {
                Ok(()) => {
                    tracing::debug!(file = %name, "Removed upload");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_failed("remove", &e)),
            }
        })
    }
}

fn io_failed(action: &str, err: &std::io::Error) -> TicketError {
    tracing::error!(error = %err, action, "Upload file operation failed");
    TicketError::Upstream {
        service: "image store",
        message: err.to_string(),
    }
}

/// Reduce a client file name to `[A-Za-z0-9._-]`, without leading dots.
#[must_use]
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.chars().take(100).collect()
    }
}
