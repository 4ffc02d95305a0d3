//! Settings loading and persistence for keyswap
//!
//! The settings document is a small flat TOML file under the platform
//! config directory (~/.config/keyswap/config.toml on Linux). Missing
//! keys are filled with defaults on load and persisted back; writes go
//! through a temp file in the same directory and rename over the
//! original, so a crash mid-write never leaves a truncated file.

use crate::error::ConfigError;
use crate::keys::HotkeyBinding;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which logical binding a settings mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyRole {
    /// Invokes the capture/convert/replace sequence
    Trigger,
    /// Requests process shutdown
    Exit,
    /// Invokes the capture/case-toggle/replace sequence
    Case,
}

impl HotkeyRole {
    pub fn label(&self) -> &'static str {
        match self {
            HotkeyRole::Trigger => "translate",
            HotkeyRole::Exit => "exit",
            HotkeyRole::Case => "case",
        }
    }
}

/// The persisted settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether the trigger hotkey reacts at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Mirror log output into a file under the config directory
    #[serde(default)]
    pub file_logging: bool,

    /// Start the daemon on login (systemd user service on Linux)
    #[serde(default)]
    pub autorun: bool,

    /// Combination that shuts the daemon down
    #[serde(default = "default_exit_hotkey")]
    pub exit_hotkey: HotkeyBinding,

    /// Combination that converts the current selection
    #[serde(default = "default_translate_hotkey")]
    pub translate_hotkey: HotkeyBinding,

    /// Optional combination that toggles the selection's case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_hotkey: Option<HotkeyBinding>,
}

fn default_enabled() -> bool {
    true
}

fn default_exit_hotkey() -> HotkeyBinding {
    HotkeyBinding::bare("F10").expect("default exit binding is valid")
}

fn default_translate_hotkey() -> HotkeyBinding {
    HotkeyBinding::bare("F4").expect("default translate binding is valid")
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enabled: default_enabled(),
            file_logging: false,
            autorun: false,
            exit_hotkey: default_exit_hotkey(),
            translate_hotkey: default_translate_hotkey(),
            case_hotkey: None,
        }
    }
}

impl Settings {
    /// Default settings file path: ~/.config/keyswap/config.toml (or the
    /// platform equivalent).
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        directories::ProjectDirs::from("", "", "keyswap")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Path of the optional log file, next to the settings document.
    pub fn log_path() -> Result<PathBuf, ConfigError> {
        directories::ProjectDirs::from("", "", "keyswap")
            .map(|dirs| dirs.config_dir().join("keyswap.log"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load settings from `path` (or the default location). A missing
    /// file yields defaults; a file with missing keys is re-persisted
    /// with the defaults filled in.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Settings::default_path()?,
        };

        if !path.exists() {
            debug!("No settings file at {:?}, writing defaults", path);
            let settings = Settings::default();
            settings.save(&path)?;
            return Ok(settings);
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Settings = toml::from_str(&raw)?;

        // Persist back so the document always carries every key.
        let normalized = toml::to_string_pretty(&settings)?;
        if normalized != raw {
            debug!("Filling missing settings keys in {:?}", path);
            settings.save(&path)?;
        }

        Ok(settings)
    }

    /// Atomically write the document: serialize into a temp file in the
    /// target directory, then rename it over the original.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = toml::to_string_pretty(self)?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(serialized.as_bytes()).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!("Settings written to {:?}", path);
        Ok(())
    }

    /// The binding currently assigned to `role`, if any.
    pub fn binding(&self, role: HotkeyRole) -> Option<&HotkeyBinding> {
        match role {
            HotkeyRole::Trigger => Some(&self.translate_hotkey),
            HotkeyRole::Exit => Some(&self.exit_hotkey),
            HotkeyRole::Case => self.case_hotkey.as_ref(),
        }
    }

    /// Assign `binding` to `role`, rejecting combinations already held by
    /// another role. Enforced here, at write time, so a conflicting pair
    /// can never reach the registration thread.
    pub fn set_binding(
        &mut self,
        role: HotkeyRole,
        binding: HotkeyBinding,
    ) -> Result<(), ConfigError> {
        for other in [HotkeyRole::Trigger, HotkeyRole::Exit, HotkeyRole::Case] {
            if other == role {
                continue;
            }
            if let Some(existing) = self.binding(other) {
                if existing.conflicts_with(&binding) {
                    return Err(ConfigError::ConflictingBindings(
                        binding.to_string(),
                        other.label(),
                    ));
                }
            }
        }

        info!("{} hotkey set to {}", role.label(), binding);
        match role {
            HotkeyRole::Trigger => self.translate_hotkey = binding,
            HotkeyRole::Exit => self.exit_hotkey = binding,
            HotkeyRole::Case => self.case_hotkey = Some(binding),
        }
        Ok(())
    }

    /// True when the configured trigger/exit pair aliases to the same
    /// combination. Checked again by the registration thread before
    /// binding, since the file can be edited by hand.
    pub fn bindings_conflict(&self) -> bool {
        let pairs = [
            (Some(&self.translate_hotkey), Some(&self.exit_hotkey)),
            (Some(&self.translate_hotkey), self.case_hotkey.as_ref()),
            (Some(&self.exit_hotkey), self.case_hotkey.as_ref()),
        ];
        pairs.iter().any(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => a.conflicts_with(b),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_bindings() {
        let s = Settings::default();
        assert!(s.enabled);
        assert!(!s.file_logging);
        assert!(!s.autorun);
        assert_eq!(s.exit_hotkey.to_string(), "F10");
        assert_eq!(s.translate_hotkey.to_string(), "F4");
        assert!(s.case_hotkey.is_none());
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let s: Settings = toml::from_str("enabled = false\n").unwrap();
        assert!(!s.enabled);
        assert_eq!(s.exit_hotkey.to_string(), "F10");
        assert_eq!(s.translate_hotkey.to_string(), "F4");
    }

    #[test]
    fn full_document_round_trips() {
        let doc = r#"
            enabled = true
            file_logging = true
            autorun = false

            [exit_hotkey]
            modifiers = ["CTRL"]
            key = "Q"

            [translate_hotkey]
            modifiers = ["CTRL", "ALT"]
            key = "T"
        "#;
        let s: Settings = toml::from_str(doc).unwrap();
        assert!(s.file_logging);
        assert_eq!(s.exit_hotkey.to_string(), "Ctrl+Q");
        assert_eq!(s.translate_hotkey.to_string(), "Ctrl+Alt+T");

        let out = toml::to_string_pretty(&s).unwrap();
        let reparsed: Settings = toml::from_str(&out).unwrap();
        assert_eq!(s, reparsed);
    }

    #[test]
    fn conflicting_rebind_is_rejected() {
        let mut s = Settings::default();
        s.set_binding(
            HotkeyRole::Exit,
            HotkeyBinding::parse_combo("Ctrl+Q").unwrap(),
        )
        .unwrap();

        let before = s.translate_hotkey.clone();
        let err = s
            .set_binding(
                HotkeyRole::Trigger,
                HotkeyBinding::parse_combo("ctrl+q").unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingBindings(..)));
        assert_eq!(s.translate_hotkey, before);
    }

    #[test]
    fn case_binding_participates_in_conflicts() {
        let mut s = Settings::default();
        s.set_binding(
            HotkeyRole::Case,
            HotkeyBinding::parse_combo("Ctrl+Alt+C").unwrap(),
        )
        .unwrap();
        assert!(s
            .set_binding(
                HotkeyRole::Trigger,
                HotkeyBinding::parse_combo("Ctrl+Alt+C").unwrap(),
            )
            .is_err());
    }

    #[test]
    fn hand_edited_conflict_is_detected() {
        let mut s = Settings::default();
        s.translate_hotkey = s.exit_hotkey.clone();
        assert!(s.bindings_conflict());
    }
}
