//! Single-slot holder for the ticket photo attached to the next message.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Please upload an image file (got {0})")]
    InvalidInput(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Maps a file extension to an image mime type.
pub fn image_mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

#[derive(Debug, Default, Clone)]
pub struct TicketImageCapture {
    pending: Option<String>,
}

impl TicketImageCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `bytes` as a data URL and make it the pending attachment.
    ///
    /// Non-image input is rejected and the current attachment is kept.
    pub fn capture(&mut self, bytes: &[u8], mime_type: &str) -> Result<String, CaptureError> {
        if !mime_type.starts_with("image/") {
            return Err(CaptureError::InvalidInput(mime_type.to_string()));
        }
        let data_url = to_data_url(bytes, mime_type);
        debug!(mime_type, bytes = bytes.len(), "captured ticket image");
        self.pending = Some(data_url.clone());
        Ok(data_url)
    }

    pub async fn capture_file(&mut self, path: impl AsRef<Path>) -> Result<String, CaptureError> {
        let path = path.as_ref();
        let mime_type = image_mime_for(path)
            .ok_or_else(|| CaptureError::InvalidInput(path.display().to_string()))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| CaptureError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        self.capture(&bytes, mime_type)
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Remove and return the pending attachment.
    pub fn take(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_encodes_data_url() {
        let mut capture = TicketImageCapture::new();
        let url = capture.capture(b"abc", "image/png").unwrap();
        assert_eq!(url, "data:image/png;base64,YWJj");
        assert_eq!(capture.pending(), Some("data:image/png;base64,YWJj"));
    }

    #[test]
    fn test_non_image_keeps_previous_attachment() {
        let mut capture = TicketImageCapture::new();
        capture.capture(b"abc", "image/jpeg").unwrap();

        let err = capture.capture(b"%PDF", "application/pdf").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidInput(ref m) if m == "application/pdf"));
        assert_eq!(capture.pending(), Some("data:image/jpeg;base64,YWJj"));
    }

    #[test]
    fn test_new_capture_replaces_old() {
        let mut capture = TicketImageCapture::new();
        capture.capture(b"one", "image/png").unwrap();
        capture.capture(b"two", "image/gif").unwrap();
        assert!(capture.pending().unwrap().starts_with("data:image/gif"));
    }

    #[test]
    fn test_take_and_clear() {
        let mut capture = TicketImageCapture::new();
        capture.capture(b"abc", "image/png").unwrap();
        assert!(capture.take().is_some());
        assert!(!capture.has_pending());

        capture.capture(b"abc", "image/png").unwrap();
        capture.clear();
        assert_eq!(capture.pending(), None);
    }

    #[test]
    fn test_image_mime_for_extension() {
        assert_eq!(image_mime_for(Path::new("ticket.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_for(Path::new("ticket.webp")), Some("image/webp"));
        assert_eq!(image_mime_for(Path::new("notes.txt")), None);
        assert_eq!(image_mime_for(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_capture_file_reads_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticket.png");
        std::fs::write(&path, b"abc").unwrap();

        let mut capture = TicketImageCapture::new();
        let url = capture.capture_file(&path).await.unwrap();
        assert_eq!(url, "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_capture_file_rejects_unknown_extension() {
        let mut capture = TicketImageCapture::new();
        let err = capture.capture_file("ticket.pdf").await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidInput(_)));
        assert!(!capture.has_pending());
    }
}
