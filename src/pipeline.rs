//! One end-to-end transform cycle: capture the selection, rewrite it,
//! replace it in the focused application.
//!
//! Runs on a short-lived worker thread spawned by the orchestrator. A
//! cycle that cannot complete is logged and discarded; the next hotkey
//! firing starts fresh with new clipboard and input connections.

use crate::capture::{CaptureOptions, CaptureResult, SelectionCapture, SystemClock, SystemFocus};
use crate::clipboard::SystemClipboard;
use crate::error::Result;
use crate::inject::Injector;
use crate::platform;
use crate::transform;
use tracing::{debug, info, warn};

/// What the fired hotkey asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Re-type the selection in the counterpart keyboard layout.
    Translate,
    /// Toggle the selection's letter case.
    Case,
}

pub fn run(job: Job) -> Result<()> {
    let mut clipboard = SystemClipboard::new()?;
    let mut injector = Injector::new()?;

    let captured = {
        let focus = SystemFocus;
        let clock = SystemClock;
        SelectionCapture::new(
            &mut clipboard,
            &mut injector,
            &focus,
            &clock,
            CaptureOptions::default(),
        )
        .capture()?
    };

    let text = match captured {
        CaptureResult::Text(text) => text,
        CaptureResult::NoSelection => {
            debug!("Nothing selected, cycle is a no-op");
            return Ok(());
        }
        CaptureResult::Aborted => {
            info!("Focus moved during capture, cycle abandoned");
            return Ok(());
        }
    };

    let (replacement, switch_to) = match job {
        Job::Translate => {
            // Prefer the focused window's actual layout; fall back to a
            // character heuristic where the OS does not report one.
            let source = platform::focused_window_layout()
                .unwrap_or_else(|| transform::guess_source(&text));
            debug!("Converting {} characters from {source}", text.chars().count());
            (transform::convert(&text, source), Some(source.counterpart()))
        }
        Job::Case => (transform::change_case(&text), None),
    };

    if replacement == text {
        debug!("Replacement equals the selection, leaving it untouched");
        return Ok(());
    }

    injector.delete_selection()?;
    if let Err(e) = injector.insert_text(&replacement) {
        warn!("Text injection failed ({e}), falling back to clipboard paste");
        injector.paste_via_clipboard(&mut clipboard, &replacement)?;
    }

    if let Some(target) = switch_to {
        if platform::request_layout_switch(target) {
            debug!("Asked the focused window to switch to {target}");
        }
    }

    Ok(())
}
