//! Interactive hotkey capture: record the next combination the user
//! presses, for `keyswap hotkey capture`.
//!
//! A background thread runs the global event listener and forwards key
//! events over a channel. The listener cannot be stopped once started,
//! so the thread is detached; after capture finishes its sends just go
//! nowhere.

use crate::error::HotkeyError;
use crate::keys::{classify_rdev_key, CapturedKey, HotkeyBinding, Modifier};
use rdev::EventType;
use std::collections::BTreeSet;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

enum KeyEvent {
    Press(rdev::Key),
    Release(rdev::Key),
}

/// Wait for the user to press a combination and return it as a binding.
/// Escape cancels; `Ok(None)` means cancelled or timed out.
pub fn capture_binding() -> Result<Option<HotkeyBinding>, HotkeyError> {
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("keyswap-capture".to_string())
        .spawn(move || {
            let result = rdev::listen(move |event| {
                let forwarded = match event.event_type {
                    EventType::KeyPress(key) => tx.send(KeyEvent::Press(key)),
                    EventType::KeyRelease(key) => tx.send(KeyEvent::Release(key)),
                    _ => Ok(()),
                };
                // Receiver gone: capture is over, keep draining silently.
                let _ = forwarded;
            });
            if let Err(e) = result {
                warn!("Key event listener failed: {e:?}");
            }
        })
        .map_err(|e| HotkeyError::CaptureFailed(e.to_string()))?;

    let deadline = Instant::now() + CAPTURE_TIMEOUT;
    let mut held: BTreeSet<Modifier> = BTreeSet::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!("Hotkey capture timed out");
            return Ok(None);
        }

        let event = match rx.recv_timeout(remaining) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                debug!("Hotkey capture timed out");
                return Ok(None);
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(HotkeyError::CaptureFailed(
                    "key event listener stopped".to_string(),
                ));
            }
        };

        match event {
            KeyEvent::Press(key) if key == rdev::Key::Escape => return Ok(None),
            KeyEvent::Press(key) => match classify_rdev_key(key) {
                Some(CapturedKey::Modifier(m)) => {
                    held.insert(m);
                }
                Some(CapturedKey::Key(name)) => {
                    let mods: Vec<&'static str> = held.iter().map(|m| m.name()).collect();
                    return HotkeyBinding::new(&mods, &name).map(Some);
                }
                None => debug!("Ignoring unmappable key {key:?}"),
            },
            KeyEvent::Release(key) => {
                if let Some(CapturedKey::Modifier(m)) = classify_rdev_key(key) {
                    held.remove(&m);
                }
            }
        }
    }
}
