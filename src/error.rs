//! Error types for keyswap
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the keyswap application
#[derive(Error, Debug)]
pub enum KeyswapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Selection capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Input injection error: {0}")]
    Inject(#[from] InjectError),

    #[error("Another keyswap instance is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to the settings document
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the config directory for this platform")]
    NoConfigDir,

    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Settings file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write settings file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("'{0}' is already assigned to the {1} hotkey. Pick a different combination.")]
    ConflictingBindings(String, &'static str),
}

/// Errors related to global hotkey registration and binding parsing
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Unknown key name: '{0}'. Use names like F4, A, 7, SPACE, INSERT.")]
    UnknownKey(String),

    #[error("Unknown modifier: '{0}'. Valid modifiers: CTRL, ALT, SHIFT, WIN.")]
    UnknownModifier(String),

    #[error("'{0}' is not a valid combination. Expected something like Ctrl+Alt+T or F10.")]
    InvalidCombo(String),

    #[error("Failed to register '{combo}': {reason}. The combination may be owned by another application.")]
    RegistrationFailed { combo: String, reason: String },

    #[error("Failed to initialize the global hotkey manager: {0}")]
    ManagerInit(String),

    #[error("Hotkey capture failed: {0}")]
    CaptureFailed(String),
}

/// Errors from the selection capture protocol
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Clipboard is unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Clipboard read failed: {0}")]
    ClipboardRead(String),

    #[error("Clipboard write failed: {0}")]
    ClipboardWrite(String),

    #[error("Copy shortcut could not be sent: {0}")]
    CopyShortcut(String),
}

/// Errors from synthetic key events and text injection
#[derive(Error, Debug)]
pub enum InjectError {
    #[error("Keyboard connection failed: {0}")]
    Connection(String),

    #[error("Key event failed: {0}")]
    KeyEvent(String),

    #[error("Text injection failed: {0}")]
    TextInjection(String),

    #[error("Clipboard paste fallback failed: {0}")]
    PasteFallback(String),
}

/// Result type alias using KeyswapError
pub type Result<T> = std::result::Result<T, KeyswapError>;
