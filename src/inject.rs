//! Synthetic input: copy shortcuts, selection replacement, paste fallback
//!
//! Thin wrappers over enigo key events plus the clipboard. Text is
//! delivered as Unicode text injection first; callers fall back to
//! `paste_via_clipboard` when injection fails or is partially delivered.

use crate::capture::CopyShortcuts;
use crate::clipboard::ClipboardAccess;
use crate::error::{CaptureError, InjectError};
use enigo::{Direction, Enigo, Key, Keyboard, Settings as EnigoSettings};
use std::time::Duration;
use tracing::debug;

/// Delay between writing the clipboard and sending the paste shortcut,
/// giving the clipboard owner time to settle.
const PASTE_SETTLE_DELAY: Duration = Duration::from_millis(100);

pub struct Injector {
    enigo: Enigo,
}

impl Injector {
    pub fn new() -> Result<Self, InjectError> {
        let enigo = Enigo::new(&EnigoSettings::default())
            .map_err(|e| InjectError::Connection(e.to_string()))?;
        Ok(Injector { enigo })
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<(), InjectError> {
        self.enigo
            .key(key, direction)
            .map_err(|e| InjectError::KeyEvent(e.to_string()))
    }

    /// Tap `key` while `modifier` is held.
    fn chord(&mut self, modifier: Key, key: Key) -> Result<(), InjectError> {
        self.key(modifier, Direction::Press)?;
        let result = self.key(key, Direction::Click);
        // Always release the modifier, even when the tap failed, so a
        // stuck Ctrl never outlives this call.
        let released = self.key(modifier, Direction::Release);
        result.and(released)
    }

    /// Remove the current selection (Delete key).
    pub fn delete_selection(&mut self) -> Result<(), InjectError> {
        self.key(Key::Delete, Direction::Click)
    }

    /// Type `text` at the caret. Newlines are delivered as Shift+Enter
    /// so multi-line editors insert a break instead of submitting, and
    /// tabs as the Tab key so they are not swallowed by text injection.
    pub fn insert_text(&mut self, text: &str) -> Result<(), InjectError> {
        let mut chunk = String::new();
        for ch in text.chars() {
            match ch {
                '\r' => {}
                '\n' => {
                    self.flush_chunk(&mut chunk)?;
                    self.key(Key::Shift, Direction::Press)?;
                    let result = self.key(Key::Return, Direction::Click);
                    let released = self.key(Key::Shift, Direction::Release);
                    result.and(released)?;
                }
                '\t' => {
                    self.flush_chunk(&mut chunk)?;
                    self.key(Key::Tab, Direction::Click)?;
                }
                _ => chunk.push(ch),
            }
        }
        self.flush_chunk(&mut chunk)
    }

    fn flush_chunk(&mut self, chunk: &mut String) -> Result<(), InjectError> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.enigo
            .text(chunk)
            .map_err(|e| InjectError::TextInjection(e.to_string()))?;
        chunk.clear();
        Ok(())
    }

    /// Fallback delivery: put `text` in the clipboard and send Ctrl+V.
    /// Leaves `text` in the clipboard afterward.
    pub fn paste_via_clipboard(
        &mut self,
        clipboard: &mut dyn ClipboardAccess,
        text: &str,
    ) -> Result<(), InjectError> {
        clipboard
            .write_text(text)
            .map_err(|e| InjectError::PasteFallback(e.to_string()))?;
        std::thread::sleep(PASTE_SETTLE_DELAY);
        debug!("Pasting {} characters via clipboard", text.chars().count());
        self.chord(Key::Control, Key::Unicode('v'))
            .map_err(|e| InjectError::PasteFallback(e.to_string()))
    }
}

impl CopyShortcuts for Injector {
    fn send_copy(&mut self) -> Result<(), CaptureError> {
        self.chord(Key::Control, Key::Unicode('c'))
            .map_err(|e| CaptureError::CopyShortcut(e.to_string()))
    }

    fn send_copy_alternate(&mut self) -> Result<(), CaptureError> {
        self.chord(Key::Control, Key::Insert)
            .map_err(|e| CaptureError::CopyShortcut(e.to_string()))
    }
}
