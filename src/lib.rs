//! Keyswap: fix text typed in the wrong keyboard layout
//!
//! A background daemon registers a global hotkey; when it fires, the
//! current selection is captured through the clipboard, each character
//! is mapped to the counterpart layout (QWERTY <-> ЙЦУКЕН), and the
//! selection is replaced in place with synthetic input.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │            Daemon            │
//!                 │  (lock, signals, file watch) │
//!                 └──────────────────────────────┘
//!                                │
//!                                ▼ control messages
//!                 ┌──────────────────────────────┐
//!                 │         Orchestrator         │
//!                 │ (hotkey thread, debounce,    │
//!                 │  registration state)         │
//!                 └──────────────────────────────┘
//!                                │
//!                                ▼ one worker per firing
//!   ┌─────────────┐   ┌──────────────────────┐   ┌──────────────┐
//!   │   Capture   │──▶│      Transform       │──▶│    Inject    │
//!   │ (clipboard, │   │ (layout mapping or   │   │ (delete +    │
//!   │  Ctrl+C)    │   │  case toggle)        │   │  re-type)    │
//!   └─────────────┘   └──────────────────────┘   └──────────────┘
//! ```

pub mod autostart;
pub mod capture;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hotkey_capture;
pub mod inject;
pub mod keys;
pub mod notification;
pub mod orchestrator;
pub mod pipeline;
pub mod platform;
pub mod transform;

pub use cli::{AutostartAction, Cli, Commands, HotkeyAction};
pub use config::{HotkeyRole, Settings};
pub use error::{KeyswapError, Result};
pub use keys::HotkeyBinding;
pub use transform::Layout;

/// Name used for desktop notifications.
pub const APP_NAME: &str = "Keyswap";
