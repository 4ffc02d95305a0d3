//! Settings file round-trip tests against a real filesystem
//!
//! Everything runs inside a per-test temp directory, so the user's
//! actual configuration is never touched.

use keyswap::config::{HotkeyRole, Settings};
use keyswap::keys::HotkeyBinding;
use std::path::PathBuf;
use tempfile::TempDir;

fn settings_path(dir: &TempDir) -> PathBuf {
    dir.path().join("config.toml")
}

#[test]
fn first_load_writes_a_complete_default_document() {
    let dir = TempDir::new().unwrap();
    let path = settings_path(&dir);

    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings, Settings::default());

    // The file now exists and carries every key, including defaults.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("enabled = true"));
    assert!(raw.contains("file_logging = false"));
    assert!(raw.contains("autorun = false"));
    assert!(raw.contains("[exit_hotkey]"));
    assert!(raw.contains("[translate_hotkey]"));
}

#[test]
fn partial_document_is_filled_in_and_persisted_back() {
    let dir = TempDir::new().unwrap();
    let path = settings_path(&dir);
    std::fs::write(&path, "enabled = false\n").unwrap();

    let settings = Settings::load(Some(&path)).unwrap();
    assert!(!settings.enabled);
    assert_eq!(settings.exit_hotkey.to_string(), "F10");

    // The missing keys were written back to disk.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("enabled = false"));
    assert!(raw.contains("[translate_hotkey]"));
}

#[test]
fn saved_changes_survive_a_reload() {
    let dir = TempDir::new().unwrap();
    let path = settings_path(&dir);

    let mut settings = Settings::load(Some(&path)).unwrap();
    settings
        .set_binding(
            HotkeyRole::Trigger,
            HotkeyBinding::parse_combo("Ctrl+Alt+T").unwrap(),
        )
        .unwrap();
    settings
        .set_binding(
            HotkeyRole::Case,
            HotkeyBinding::parse_combo("Ctrl+Alt+C").unwrap(),
        )
        .unwrap();
    settings.enabled = false;
    settings.save(&path).unwrap();

    let reloaded = Settings::load(Some(&path)).unwrap();
    assert_eq!(reloaded, settings);
    assert_eq!(reloaded.translate_hotkey.to_string(), "Ctrl+Alt+T");
    assert_eq!(
        reloaded.case_hotkey.as_ref().map(|b| b.to_string()),
        Some("Ctrl+Alt+C".to_string())
    );
}

#[test]
fn save_creates_missing_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/deeper/config.toml");

    Settings::default().save(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn corrupt_document_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let path = settings_path(&dir);
    std::fs::write(&path, "enabled = \"maybe\"\n").unwrap();

    assert!(Settings::load(Some(&path)).is_err());
}

#[test]
fn unknown_key_name_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let path = settings_path(&dir);
    std::fs::write(
        &path,
        "[translate_hotkey]\nmodifiers = [\"CTRL\"]\nkey = \"NOTAKEY\"\n",
    )
    .unwrap();

    assert!(Settings::load(Some(&path)).is_err());
}
