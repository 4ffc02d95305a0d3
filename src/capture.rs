//! Selection capture protocol
//!
//! Obtains the focused application's current selection as text by sending
//! a copy shortcut and watching the clipboard for the result. Copy
//! commands are asynchronous and not guaranteed to be honored, so
//! completion is detected through the clipboard revision counter where
//! the OS provides one, and through a random sentinel value written to
//! the clipboard where it does not. The whole routine is bounded: it
//! never blocks longer than `max_attempts * 2 * timeout_per_attempt`
//! plus fixed overhead, and it aborts the moment keyboard focus moves to
//! a different window.

use crate::clipboard::ClipboardAccess;
use crate::error::CaptureError;
use crate::platform::{self, WindowId};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

/// Outcome of one capture invocation. Owned by the caller and discarded
/// after use; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    /// The selection, as text. Also left in the clipboard.
    Text(String),
    /// No clipboard change (or an empty string) within the timeout.
    NoSelection,
    /// Focus moved to another window mid-capture.
    Aborted,
}

/// Timing knobs for the capture protocol.
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    /// How long to wait for the clipboard to react to one shortcut.
    pub timeout_per_attempt: Duration,
    /// How many copy/copy-alternate rounds to run.
    pub max_attempts: u32,
    /// Clipboard polling interval.
    pub poll_interval: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            timeout_per_attempt: Duration::from_millis(600),
            max_attempts: 2,
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// Time source, injectable so tests can simulate elapsed time without
/// real delays.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Reports which window currently has keyboard focus.
pub trait FocusProbe {
    fn focused_window(&self) -> Option<WindowId>;
}

/// Real focus probe backed by the platform layer.
pub struct SystemFocus;

impl FocusProbe for SystemFocus {
    fn focused_window(&self) -> Option<WindowId> {
        platform::focused_window()
    }
}

/// Sends the copy shortcut (and its fallback) to the focused window.
pub trait CopyShortcuts {
    /// The primary copy combination (Ctrl+C).
    fn send_copy(&mut self) -> Result<(), CaptureError>;
    /// The alternate combination honored by some applications that
    /// ignore the primary one (Ctrl+Insert).
    fn send_copy_alternate(&mut self) -> Result<(), CaptureError>;
}

enum Poll {
    Changed,
    TimedOut,
    FocusLost,
}

/// One capture invocation over injected collaborators.
pub struct SelectionCapture<'a> {
    clipboard: &'a mut dyn ClipboardAccess,
    shortcuts: &'a mut dyn CopyShortcuts,
    focus: &'a dyn FocusProbe,
    clock: &'a dyn Clock,
    options: CaptureOptions,
}

impl<'a> SelectionCapture<'a> {
    pub fn new(
        clipboard: &'a mut dyn ClipboardAccess,
        shortcuts: &'a mut dyn CopyShortcuts,
        focus: &'a dyn FocusProbe,
        clock: &'a dyn Clock,
        options: CaptureOptions,
    ) -> Self {
        SelectionCapture {
            clipboard,
            shortcuts,
            focus,
            clock,
            options,
        }
    }

    /// Run the protocol: revision-counter change detection when the OS
    /// exposes a counter, sentinel fallback otherwise.
    pub fn capture(&mut self) -> Result<CaptureResult, CaptureError> {
        let initial_focus = self.focus.focused_window();

        match self.clipboard.revision() {
            Some(_) => self.capture_by_revision(initial_focus),
            None => self.capture_by_sentinel(initial_focus),
        }
    }

    fn capture_by_revision(
        &mut self,
        initial_focus: Option<WindowId>,
    ) -> Result<CaptureResult, CaptureError> {
        for attempt in 0..self.options.max_attempts {
            for alternate in [false, true] {
                if self.focus_changed(initial_focus) {
                    debug!("Focus changed before copy shortcut, aborting capture");
                    return Ok(CaptureResult::Aborted);
                }

                // Snapshot the counter right before sending, so an
                // unrelated change between rounds is not misread.
                let baseline = self.clipboard.revision();
                self.send_shortcut(alternate)?;
                trace!(attempt, alternate, "Copy shortcut sent, polling revision");

                match self.poll(initial_focus, |c| Ok(c.revision() != baseline))? {
                    Poll::FocusLost => {
                        debug!("Focus changed while polling revision, aborting capture");
                        return Ok(CaptureResult::Aborted);
                    }
                    Poll::TimedOut => continue,
                    Poll::Changed => match self.clipboard.read_text()? {
                        Some(text) if !text.is_empty() => {
                            return Ok(CaptureResult::Text(text))
                        }
                        // Some applications clear the clipboard instead
                        // of leaving it untouched when nothing is
                        // selected. The copy was honored and answered
                        // "nothing": retrying would only spam the
                        // application with more shortcuts.
                        _ => {
                            debug!("Clipboard changed to empty content, no selection");
                            return Ok(CaptureResult::NoSelection);
                        }
                    },
                }
            }
        }

        debug!("No clipboard revision change within timeout");
        Ok(CaptureResult::NoSelection)
    }

    fn capture_by_sentinel(
        &mut self,
        initial_focus: Option<WindowId>,
    ) -> Result<CaptureResult, CaptureError> {
        let prior = self.clipboard.read_text()?;
        let sentinel = format!("__keyswap-{}__", Uuid::new_v4());
        self.clipboard.write_text(&sentinel)?;

        let outcome = self.sentinel_attempts(initial_focus, &sentinel);

        // The sentinel is our own write: never leave it behind, not even
        // when the attempt loop itself errored out.
        if !matches!(outcome, Ok(CaptureResult::Text(_))) {
            if let Err(e) = self.restore(&prior) {
                debug!("Failed to restore prior clipboard contents: {e}");
            }
        }
        outcome
    }

    fn sentinel_attempts(
        &mut self,
        initial_focus: Option<WindowId>,
        sentinel: &str,
    ) -> Result<CaptureResult, CaptureError> {
        for attempt in 0..self.options.max_attempts {
            for alternate in [false, true] {
                if self.focus_changed(initial_focus) {
                    debug!("Focus changed before copy shortcut, aborting capture");
                    return Ok(CaptureResult::Aborted);
                }

                self.send_shortcut(alternate)?;
                trace!(attempt, alternate, "Copy shortcut sent, polling for sentinel overwrite");

                let outcome = self.poll(initial_focus, |c| {
                    Ok(c.read_text()?.as_deref() != Some(sentinel))
                })?;
                match outcome {
                    Poll::FocusLost => {
                        debug!("Focus changed while polling clipboard, aborting capture");
                        return Ok(CaptureResult::Aborted);
                    }
                    Poll::TimedOut => continue,
                    Poll::Changed => match self.clipboard.read_text()? {
                        Some(text) if !text.is_empty() => {
                            return Ok(CaptureResult::Text(text))
                        }
                        _ => {
                            debug!("Clipboard changed to empty content, no selection");
                            return Ok(CaptureResult::NoSelection);
                        }
                    },
                }
            }
        }

        debug!("Clipboard still holds the sentinel after all attempts");
        Ok(CaptureResult::NoSelection)
    }

    fn send_shortcut(&mut self, alternate: bool) -> Result<(), CaptureError> {
        if alternate {
            self.shortcuts.send_copy_alternate()
        } else {
            self.shortcuts.send_copy()
        }
    }

    fn poll(
        &mut self,
        initial_focus: Option<WindowId>,
        mut changed: impl FnMut(&mut dyn ClipboardAccess) -> Result<bool, CaptureError>,
    ) -> Result<Poll, CaptureError> {
        let deadline = self.clock.now() + self.options.timeout_per_attempt;
        loop {
            if self.focus_changed(initial_focus) {
                return Ok(Poll::FocusLost);
            }
            if changed(&mut *self.clipboard)? {
                return Ok(Poll::Changed);
            }
            if self.clock.now() >= deadline {
                return Ok(Poll::TimedOut);
            }
            self.clock.sleep(self.options.poll_interval);
        }
    }

    fn focus_changed(&self, initial: Option<WindowId>) -> bool {
        self.focus.focused_window() != initial
    }

    fn restore(&mut self, prior: &Option<String>) -> Result<(), CaptureError> {
        self.clipboard.write_text(prior.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted clipboard/focus/time environment shared by the fakes.
    struct World {
        start: Instant,
        elapsed: Duration,
        revision: Option<u64>,
        text: Option<String>,
        focus: Option<WindowId>,
        // Script: after `polls_until_copy_lands` clipboard polls
        // following a copy shortcut, `copied_text` appears (revision
        // bumps, content replaced). None = copy is never honored.
        polls_until_copy_lands: Option<u32>,
        copied_text: String,
        pending_polls: Option<u32>,
        // Script: focus flips to another window after this many polls.
        focus_change_after: Option<u32>,
        // Script: clipboard reads start failing after this many polls.
        read_error_after: Option<u32>,
        polls_seen: u32,
        copies_sent: u32,
        alternates_sent: u32,
    }

    impl World {
        fn new(revision: Option<u64>) -> Rc<RefCell<World>> {
            Rc::new(RefCell::new(World {
                start: Instant::now(),
                elapsed: Duration::ZERO,
                revision,
                text: None,
                focus: Some(WindowId(1)),
                polls_until_copy_lands: None,
                copied_text: String::new(),
                pending_polls: None,
                focus_change_after: None,
                read_error_after: None,
                polls_seen: 0,
                copies_sent: 0,
                alternates_sent: 0,
            }))
        }

        fn on_poll(&mut self) {
            self.polls_seen += 1;
            if let Some(after) = self.focus_change_after {
                if self.polls_seen > after {
                    self.focus = Some(WindowId(2));
                }
            }
            if let Some(remaining) = self.pending_polls {
                if remaining == 0 {
                    self.text = Some(self.copied_text.clone());
                    if let Some(rev) = self.revision.as_mut() {
                        *rev += 1;
                    }
                    self.pending_polls = None;
                } else {
                    self.pending_polls = Some(remaining - 1);
                }
            }
        }
    }

    struct FakeClipboard(Rc<RefCell<World>>);

    impl ClipboardAccess for FakeClipboard {
        fn revision(&mut self) -> Option<u64> {
            let mut w = self.0.borrow_mut();
            w.on_poll();
            w.revision
        }

        fn read_text(&mut self) -> Result<Option<String>, CaptureError> {
            let mut w = self.0.borrow_mut();
            // Sentinel-path polling goes through reads, not revisions.
            if w.revision.is_none() {
                w.on_poll();
            }
            if let Some(after) = w.read_error_after {
                if w.polls_seen > after {
                    return Err(CaptureError::ClipboardRead("scripted failure".to_string()));
                }
            }
            Ok(w.text.clone())
        }

        fn write_text(&mut self, text: &str) -> Result<(), CaptureError> {
            let mut w = self.0.borrow_mut();
            w.text = Some(text.to_string());
            if let Some(rev) = w.revision.as_mut() {
                *rev += 1;
            }
            Ok(())
        }
    }

    struct FakeShortcuts(Rc<RefCell<World>>);

    impl CopyShortcuts for FakeShortcuts {
        fn send_copy(&mut self) -> Result<(), CaptureError> {
            let mut w = self.0.borrow_mut();
            w.copies_sent += 1;
            w.pending_polls = w.polls_until_copy_lands;
            Ok(())
        }

        fn send_copy_alternate(&mut self) -> Result<(), CaptureError> {
            let mut w = self.0.borrow_mut();
            w.alternates_sent += 1;
            w.pending_polls = w.polls_until_copy_lands;
            Ok(())
        }
    }

    struct FakeFocus(Rc<RefCell<World>>);

    impl FocusProbe for FakeFocus {
        fn focused_window(&self) -> Option<WindowId> {
            self.0.borrow().focus
        }
    }

    struct FakeClock(Rc<RefCell<World>>);

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            let w = self.0.borrow();
            w.start + w.elapsed
        }

        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().elapsed += duration;
        }
    }

    fn run_capture(world: &Rc<RefCell<World>>, options: CaptureOptions) -> CaptureResult {
        let mut clipboard = FakeClipboard(world.clone());
        let mut shortcuts = FakeShortcuts(world.clone());
        let focus = FakeFocus(world.clone());
        let clock = FakeClock(world.clone());
        SelectionCapture::new(&mut clipboard, &mut shortcuts, &focus, &clock, options)
            .capture()
            .unwrap()
    }

    #[test]
    fn revision_change_yields_selection() {
        let world = World::new(Some(7));
        {
            let mut w = world.borrow_mut();
            w.polls_until_copy_lands = Some(3);
            w.copied_text = "ghbdtn".to_string();
        }

        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::Text("ghbdtn".to_string()));
        assert_eq!(world.borrow().copies_sent, 1);
        assert_eq!(world.borrow().alternates_sent, 0);
    }

    #[test]
    fn empty_selection_times_out_as_no_selection() {
        let world = World::new(Some(0));
        // Copy is never honored: no revision change at all.
        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::NoSelection);

        // Both shortcuts tried on every attempt.
        let w = world.borrow();
        assert_eq!(w.copies_sent, 2);
        assert_eq!(w.alternates_sent, 2);
    }

    #[test]
    fn capture_is_time_bounded() {
        let options = CaptureOptions {
            timeout_per_attempt: Duration::from_millis(600),
            max_attempts: 2,
            poll_interval: Duration::from_millis(20),
        };
        let world = World::new(Some(0));
        let result = run_capture(&world, options);
        assert_eq!(result, CaptureResult::NoSelection);

        // max_attempts * 2 shortcut windows, each bounded by the
        // per-attempt timeout (plus one trailing poll interval each).
        let elapsed = world.borrow().elapsed;
        let bound = options.timeout_per_attempt * 2 * options.max_attempts
            + options.poll_interval * 2 * options.max_attempts;
        assert!(elapsed <= bound, "capture ran for {elapsed:?}");
    }

    #[test]
    fn cleared_clipboard_counts_as_no_selection() {
        let world = World::new(Some(3));
        {
            let mut w = world.borrow_mut();
            w.polls_until_copy_lands = Some(1);
            w.copied_text = String::new();
        }

        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::NoSelection);

        // The copy was honored and answered "nothing selected": the
        // alternate shortcut and further attempts are not tried.
        let w = world.borrow();
        assert_eq!(w.copies_sent, 1);
        assert_eq!(w.alternates_sent, 0);
    }

    #[test]
    fn sentinel_path_emptied_clipboard_counts_as_no_selection() {
        let world = World::new(None);
        {
            let mut w = world.borrow_mut();
            w.text = Some("before".to_string());
            w.polls_until_copy_lands = Some(1);
            w.copied_text = String::new();
        }

        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::NoSelection);

        let w = world.borrow();
        assert_eq!(w.copies_sent, 1);
        assert_eq!(w.alternates_sent, 0);
        // Prior contents restored, sentinel gone.
        assert_eq!(w.text.as_deref(), Some("before"));
    }

    #[test]
    fn sentinel_is_cleaned_up_when_a_clipboard_read_fails() {
        let world = World::new(None);
        {
            let mut w = world.borrow_mut();
            w.text = Some("before".to_string());
            w.read_error_after = Some(3);
        }

        let mut clipboard = FakeClipboard(world.clone());
        let mut shortcuts = FakeShortcuts(world.clone());
        let focus = FakeFocus(world.clone());
        let clock = FakeClock(world.clone());
        let result = SelectionCapture::new(
            &mut clipboard,
            &mut shortcuts,
            &focus,
            &clock,
            CaptureOptions::default(),
        )
        .capture();

        assert!(matches!(result, Err(CaptureError::ClipboardRead(_))));
        // The error still propagates, but our own sentinel write must
        // not be left as the user's clipboard contents.
        assert_eq!(world.borrow().text.as_deref(), Some("before"));
    }

    #[test]
    fn focus_change_aborts_mid_poll() {
        let world = World::new(Some(0));
        world.borrow_mut().focus_change_after = Some(4);

        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::Aborted);
    }

    #[test]
    fn sentinel_path_captures_selection() {
        let world = World::new(None);
        {
            let mut w = world.borrow_mut();
            w.text = Some("before".to_string());
            w.polls_until_copy_lands = Some(2);
            w.copied_text = "ghbdtn".to_string();
        }

        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::Text("ghbdtn".to_string()));
        // Happy path leaves the captured text in the clipboard.
        assert_eq!(world.borrow().text.as_deref(), Some("ghbdtn"));
    }

    #[test]
    fn sentinel_path_restores_prior_contents_on_no_selection() {
        let world = World::new(None);
        world.borrow_mut().text = Some("before".to_string());

        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::NoSelection);
        assert_eq!(world.borrow().text.as_deref(), Some("before"));
    }

    #[test]
    fn sentinel_path_restores_prior_contents_on_abort() {
        let world = World::new(None);
        {
            let mut w = world.borrow_mut();
            w.text = Some("before".to_string());
            w.focus_change_after = Some(3);
        }

        let result = run_capture(&world, CaptureOptions::default());
        assert_eq!(result, CaptureResult::Aborted);
        assert_eq!(world.borrow().text.as_deref(), Some("before"));
    }
}
