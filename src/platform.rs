//! Thin OS facade: focus identity, clipboard revision, layout control
//!
//! Everything here is best-effort. On Windows the real primitives are
//! used; elsewhere the probes report "unavailable" and callers fall back
//! to portable behavior (sentinel-based capture, heuristic layout
//! detection, no layout switching).

use crate::transform::Layout;

/// Opaque identity of a top-level window, used only for equality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowId(pub u64);

/// Identity of the currently focused window, when the OS exposes one.
pub fn focused_window() -> Option<WindowId> {
    imp::focused_window()
}

/// The clipboard revision counter, when the OS exposes one. Increments
/// whenever clipboard contents change.
pub fn clipboard_revision() -> Option<u64> {
    imp::clipboard_revision()
}

/// The keyboard layout of the focused window, when the OS reports it.
pub fn focused_window_layout() -> Option<Layout> {
    imp::focused_window_layout()
}

/// Ask the focused window to switch to `target`. Best-effort: a refusal
/// is reported as `false`, never as an error.
pub fn request_layout_switch(target: Layout) -> bool {
    imp::request_layout_switch(target)
}

#[cfg(windows)]
mod imp {
    use super::WindowId;
    use crate::transform::Layout;
    use tracing::debug;
    use windows_sys::Win32::System::DataExchange::GetClipboardSequenceNumber;
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
        ActivateKeyboardLayout, GetKeyboardLayout, LoadKeyboardLayoutW,
    };
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, GetWindowThreadProcessId, PostMessageW,
        WM_INPUTLANGCHANGEREQUEST,
    };

    const LANG_RUSSIAN: u32 = 0x0419;
    const KLID_RUSSIAN: &[u16] = &[
        b'0' as u16,
        b'0' as u16,
        b'0' as u16,
        b'0' as u16,
        b'0' as u16,
        b'4' as u16,
        b'1' as u16,
        b'9' as u16,
        0,
    ];
    const KLID_ENGLISH_US: &[u16] = &[
        b'0' as u16,
        b'0' as u16,
        b'0' as u16,
        b'0' as u16,
        b'0' as u16,
        b'4' as u16,
        b'0' as u16,
        b'9' as u16,
        0,
    ];

    pub fn focused_window() -> Option<WindowId> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_null() {
            None
        } else {
            Some(WindowId(hwnd as u64))
        }
    }

    pub fn clipboard_revision() -> Option<u64> {
        Some(u64::from(unsafe { GetClipboardSequenceNumber() }))
    }

    pub fn focused_window_layout() -> Option<Layout> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_null() {
            return None;
        }
        let thread = unsafe { GetWindowThreadProcessId(hwnd, std::ptr::null_mut()) };
        let hkl = unsafe { GetKeyboardLayout(thread) } as usize;
        if hkl == 0 {
            return None;
        }
        if (hkl as u32 & 0xFFFF) == LANG_RUSSIAN {
            Some(Layout::Cyrillic)
        } else {
            Some(Layout::Latin)
        }
    }

    pub fn request_layout_switch(target: Layout) -> bool {
        let klid = match target {
            Layout::Cyrillic => KLID_RUSSIAN,
            Layout::Latin => KLID_ENGLISH_US,
        };
        let hkl = unsafe { LoadKeyboardLayoutW(klid.as_ptr(), 0) };
        if hkl.is_null() {
            debug!("LoadKeyboardLayoutW failed for {target}");
            return false;
        }

        let hwnd = unsafe { GetForegroundWindow() };
        if !hwnd.is_null() {
            let posted = unsafe {
                PostMessageW(hwnd, WM_INPUTLANGCHANGEREQUEST, 0, hkl as isize)
            };
            if posted != 0 {
                return true;
            }
            debug!("WM_INPUTLANGCHANGEREQUEST post failed, activating directly");
        }

        !unsafe { ActivateKeyboardLayout(hkl, 0) }.is_null()
    }
}

#[cfg(not(windows))]
mod imp {
    use super::WindowId;
    use crate::transform::Layout;
    use tracing::debug;

    pub fn focused_window() -> Option<WindowId> {
        None
    }

    pub fn clipboard_revision() -> Option<u64> {
        None
    }

    pub fn focused_window_layout() -> Option<Layout> {
        None
    }

    pub fn request_layout_switch(target: Layout) -> bool {
        debug!("Layout switching to {target} not supported on this platform");
        false
    }
}
