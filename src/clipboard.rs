//! Clipboard access behind a trait, so the capture protocol can be
//! exercised against a fake in tests.

use crate::error::CaptureError;
use crate::platform;

/// The clipboard surface the capture protocol needs: text in, text out,
/// and an optional revision counter for change detection.
pub trait ClipboardAccess {
    /// Current revision counter, or None when the OS does not expose one.
    fn revision(&mut self) -> Option<u64>;

    /// Current clipboard text. `Ok(None)` means the clipboard holds no
    /// text content at all (distinct from an empty string).
    fn read_text(&mut self) -> Result<Option<String>, CaptureError>;

    fn write_text(&mut self, text: &str) -> Result<(), CaptureError>;
}

/// Real clipboard backed by arboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, CaptureError> {
        let inner = arboard::Clipboard::new()
            .map_err(|e| CaptureError::ClipboardUnavailable(e.to_string()))?;
        Ok(SystemClipboard { inner })
    }
}

impl ClipboardAccess for SystemClipboard {
    fn revision(&mut self) -> Option<u64> {
        platform::clipboard_revision()
    }

    fn read_text(&mut self) -> Result<Option<String>, CaptureError> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(CaptureError::ClipboardRead(e.to_string())),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), CaptureError> {
        self.inner
            .set_text(text)
            .map_err(|e| CaptureError::ClipboardWrite(e.to_string()))
    }
}
