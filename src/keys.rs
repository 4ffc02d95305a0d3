//! Hotkey binding model: modifiers, key names, normalization
//!
//! Bindings are stored in the settings document as
//! `{ modifiers = ["CTRL", "ALT"], key = "T" }`. Modifier synonyms are
//! collapsed on every write (CONTROL -> CTRL, MENU -> ALT, WINDOWS -> WIN),
//! duplicates removed, and key names uppercased, so two bindings compare
//! equal exactly when they resolve to the same physical combination.

use crate::error::HotkeyError;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A modifier key, normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Win,
}

impl Modifier {
    /// Parse a modifier name, accepting common synonyms case-insensitively.
    pub fn parse(name: &str) -> Result<Self, HotkeyError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CTRL" | "CONTROL" => Ok(Modifier::Ctrl),
            "ALT" | "MENU" => Ok(Modifier::Alt),
            "SHIFT" => Ok(Modifier::Shift),
            "WIN" | "WINDOWS" | "SUPER" | "META" | "CMD" => Ok(Modifier::Win),
            _ => Err(HotkeyError::UnknownModifier(name.to_string())),
        }
    }

    /// Canonical name used in the settings document.
    pub fn name(&self) -> &'static str {
        match self {
            Modifier::Ctrl => "CTRL",
            Modifier::Alt => "ALT",
            Modifier::Shift => "SHIFT",
            Modifier::Win => "WIN",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Alt => "Alt",
            Modifier::Shift => "Shift",
            Modifier::Win => "Win",
        };
        write!(f, "{pretty}")
    }
}

/// A global hotkey combination: a set of modifiers plus one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBinding", into = "RawBinding")]
pub struct HotkeyBinding {
    modifiers: BTreeSet<Modifier>,
    key: String,
}

/// On-disk shape of a binding, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBinding {
    #[serde(default)]
    modifiers: Vec<String>,
    key: String,
}

impl TryFrom<RawBinding> for HotkeyBinding {
    type Error = HotkeyError;

    fn try_from(raw: RawBinding) -> Result<Self, Self::Error> {
        HotkeyBinding::new(&raw.modifiers, &raw.key)
    }
}

impl From<HotkeyBinding> for RawBinding {
    fn from(binding: HotkeyBinding) -> Self {
        RawBinding {
            modifiers: binding
                .modifiers
                .iter()
                .map(|m| m.name().to_string())
                .collect(),
            key: binding.key,
        }
    }
}

impl HotkeyBinding {
    /// Build a normalized binding from raw modifier names and a key name.
    pub fn new<S: AsRef<str>>(modifiers: &[S], key: &str) -> Result<Self, HotkeyError> {
        let key = key.trim().to_ascii_uppercase();
        if key.is_empty() {
            return Err(HotkeyError::UnknownKey(key));
        }
        // Reject unknown key names up front so a bad settings file fails at
        // load time, not at registration time.
        key_code(&key)?;

        let mut set = BTreeSet::new();
        for name in modifiers {
            set.insert(Modifier::parse(name.as_ref())?);
        }
        Ok(HotkeyBinding {
            modifiers: set,
            key,
        })
    }

    /// Binding with no modifiers, e.g. a bare function key.
    pub fn bare(key: &str) -> Result<Self, HotkeyError> {
        HotkeyBinding::new::<&str>(&[], key)
    }

    /// Parse a combo string like "Ctrl+Alt+T" or "F10".
    pub fn parse_combo(combo: &str) -> Result<Self, HotkeyError> {
        let parts: Vec<&str> = combo
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (key, mods) = parts
            .split_last()
            .ok_or_else(|| HotkeyError::InvalidCombo(combo.to_string()))?;
        HotkeyBinding::new(mods, key)
            .map_err(|_| HotkeyError::InvalidCombo(combo.to_string()))
    }

    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.modifiers.iter().copied()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True when both bindings resolve to the same (modifier-set, key) pair.
    /// Normalization makes this plain equality.
    pub fn conflicts_with(&self, other: &HotkeyBinding) -> bool {
        self == other
    }

    /// Convert to the OS-facing hotkey type used for registration.
    pub fn to_os_hotkey(&self) -> Result<HotKey, HotkeyError> {
        let mut mods = Modifiers::empty();
        for m in &self.modifiers {
            mods |= match m {
                Modifier::Ctrl => Modifiers::CONTROL,
                Modifier::Alt => Modifiers::ALT,
                Modifier::Shift => Modifiers::SHIFT,
                Modifier::Win => Modifiers::SUPER,
            };
        }
        let code = key_code(&self.key)?;
        let mods = if mods.is_empty() { None } else { Some(mods) };
        Ok(HotKey::new(mods, code))
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{m}+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Map a normalized key name to a key code for registration.
fn key_code(name: &str) -> Result<Code, HotkeyError> {
    let code = match name {
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,
        "F13" => Code::F13,
        "F14" => Code::F14,
        "F15" => Code::F15,
        "F16" => Code::F16,
        "F17" => Code::F17,
        "F18" => Code::F18,
        "F19" => Code::F19,
        "F20" => Code::F20,
        "F21" => Code::F21,
        "F22" => Code::F22,
        "F23" => Code::F23,
        "F24" => Code::F24,
        "SPACE" => Code::Space,
        "TAB" => Code::Tab,
        "ENTER" | "RETURN" => Code::Enter,
        "ESC" | "ESCAPE" => Code::Escape,
        "BACKSPACE" => Code::Backspace,
        "INSERT" => Code::Insert,
        "DELETE" => Code::Delete,
        "HOME" => Code::Home,
        "END" => Code::End,
        "PAGEUP" => Code::PageUp,
        "PAGEDOWN" => Code::PageDown,
        "UP" => Code::ArrowUp,
        "DOWN" => Code::ArrowDown,
        "LEFT" => Code::ArrowLeft,
        "RIGHT" => Code::ArrowRight,
        "MINUS" => Code::Minus,
        "EQUAL" => Code::Equal,
        "COMMA" => Code::Comma,
        "PERIOD" => Code::Period,
        "SLASH" => Code::Slash,
        "BACKSLASH" => Code::Backslash,
        "SEMICOLON" => Code::Semicolon,
        "QUOTE" => Code::Quote,
        "BACKQUOTE" | "GRAVE" => Code::Backquote,
        "BRACKETLEFT" => Code::BracketLeft,
        "BRACKETRIGHT" => Code::BracketRight,
        "CAPSLOCK" => Code::CapsLock,
        "NUMLOCK" => Code::NumLock,
        "SCROLLLOCK" => Code::ScrollLock,
        "PAUSE" => Code::Pause,
        "PRINTSCREEN" => Code::PrintScreen,
        other => return Err(HotkeyError::UnknownKey(other.to_string())),
    };
    Ok(code)
}

/// What a low-level key event from the interactive capture listener means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedKey {
    Modifier(Modifier),
    Key(String),
}

/// Classify an rdev key for the interactive binding capture feature.
/// Returns None for keys that cannot appear in a binding.
pub fn classify_rdev_key(key: rdev::Key) -> Option<CapturedKey> {
    use rdev::Key as K;

    let modifier = match key {
        K::ControlLeft | K::ControlRight => Some(Modifier::Ctrl),
        K::Alt | K::AltGr => Some(Modifier::Alt),
        K::ShiftLeft | K::ShiftRight => Some(Modifier::Shift),
        K::MetaLeft | K::MetaRight => Some(Modifier::Win),
        _ => None,
    };
    if let Some(m) = modifier {
        return Some(CapturedKey::Modifier(m));
    }

    let name = match key {
        K::KeyA => "A",
        K::KeyB => "B",
        K::KeyC => "C",
        K::KeyD => "D",
        K::KeyE => "E",
        K::KeyF => "F",
        K::KeyG => "G",
        K::KeyH => "H",
        K::KeyI => "I",
        K::KeyJ => "J",
        K::KeyK => "K",
        K::KeyL => "L",
        K::KeyM => "M",
        K::KeyN => "N",
        K::KeyO => "O",
        K::KeyP => "P",
        K::KeyQ => "Q",
        K::KeyR => "R",
        K::KeyS => "S",
        K::KeyT => "T",
        K::KeyU => "U",
        K::KeyV => "V",
        K::KeyW => "W",
        K::KeyX => "X",
        K::KeyY => "Y",
        K::KeyZ => "Z",
        K::Num0 => "0",
        K::Num1 => "1",
        K::Num2 => "2",
        K::Num3 => "3",
        K::Num4 => "4",
        K::Num5 => "5",
        K::Num6 => "6",
        K::Num7 => "7",
        K::Num8 => "8",
        K::Num9 => "9",
        K::F1 => "F1",
        K::F2 => "F2",
        K::F3 => "F3",
        K::F4 => "F4",
        K::F5 => "F5",
        K::F6 => "F6",
        K::F7 => "F7",
        K::F8 => "F8",
        K::F9 => "F9",
        K::F10 => "F10",
        K::F11 => "F11",
        K::F12 => "F12",
        K::Space => "SPACE",
        K::Tab => "TAB",
        K::Return => "ENTER",
        K::Backspace => "BACKSPACE",
        K::Insert => "INSERT",
        K::Delete => "DELETE",
        K::Home => "HOME",
        K::End => "END",
        K::PageUp => "PAGEUP",
        K::PageDown => "PAGEDOWN",
        K::UpArrow => "UP",
        K::DownArrow => "DOWN",
        K::LeftArrow => "LEFT",
        K::RightArrow => "RIGHT",
        K::Minus => "MINUS",
        K::Equal => "EQUAL",
        K::Comma => "COMMA",
        K::Dot => "PERIOD",
        K::Slash => "SLASH",
        K::BackSlash => "BACKSLASH",
        K::SemiColon => "SEMICOLON",
        K::Quote => "QUOTE",
        K::BackQuote => "BACKQUOTE",
        K::LeftBracket => "BRACKETLEFT",
        K::RightBracket => "BRACKETRIGHT",
        K::CapsLock => "CAPSLOCK",
        K::NumLock => "NUMLOCK",
        K::ScrollLock => "SCROLLLOCK",
        K::PrintScreen => "PRINTSCREEN",
        K::Pause => "PAUSE",
        _ => return None,
    };
    Some(CapturedKey::Key(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_synonyms_collapse() {
        assert_eq!(Modifier::parse("control").unwrap(), Modifier::Ctrl);
        assert_eq!(Modifier::parse("MENU").unwrap(), Modifier::Alt);
        assert_eq!(Modifier::parse("Windows").unwrap(), Modifier::Win);
        assert!(Modifier::parse("hyper").is_err());
    }

    #[test]
    fn binding_normalizes_and_dedupes() {
        let b = HotkeyBinding::new(&["ctrl", "CONTROL", "alt"], "t").unwrap();
        let mods: Vec<Modifier> = b.modifiers().collect();
        assert_eq!(mods, vec![Modifier::Ctrl, Modifier::Alt]);
        assert_eq!(b.key(), "T");
    }

    #[test]
    fn equal_after_normalization_conflicts() {
        let a = HotkeyBinding::new(&["CONTROL"], "q").unwrap();
        let b = HotkeyBinding::new(&["ctrl"], "Q").unwrap();
        assert!(a.conflicts_with(&b));

        let c = HotkeyBinding::new(&["ctrl", "shift"], "Q").unwrap();
        assert!(!a.conflicts_with(&c));
    }

    #[test]
    fn combo_parsing_round_trips_display() {
        let b = HotkeyBinding::parse_combo("ctrl + alt + t").unwrap();
        assert_eq!(b.to_string(), "Ctrl+Alt+T");

        let bare = HotkeyBinding::parse_combo("F10").unwrap();
        assert_eq!(bare.to_string(), "F10");

        assert!(HotkeyBinding::parse_combo("").is_err());
        assert!(HotkeyBinding::parse_combo("ctrl+").is_err());
        assert!(HotkeyBinding::parse_combo("ctrl+banana").is_err());
    }

    #[test]
    fn unknown_key_rejected_at_construction() {
        assert!(HotkeyBinding::bare("NOTAKEY").is_err());
    }

    #[test]
    fn os_hotkey_conversion() {
        let b = HotkeyBinding::new(&["ctrl", "shift"], "d").unwrap();
        let hk = b.to_os_hotkey().unwrap();
        assert_eq!(hk.key, Code::KeyD);
        assert!(hk.mods.contains(Modifiers::CONTROL));
        assert!(hk.mods.contains(Modifiers::SHIFT));

        let bare = HotkeyBinding::bare("F4").unwrap();
        assert_eq!(bare.to_os_hotkey().unwrap().key, Code::F4);
    }

    #[test]
    fn serde_uses_raw_document_shape() {
        let toml_src = r#"
            modifiers = ["control", "SHIFT"]
            key = "y"
        "#;
        let b: HotkeyBinding = toml::from_str(toml_src).unwrap();
        assert_eq!(b, HotkeyBinding::new(&["CTRL", "SHIFT"], "Y").unwrap());

        let out = toml::to_string(&b).unwrap();
        assert!(out.contains("\"CTRL\""));
        assert!(out.contains("key = \"Y\""));
    }

    #[test]
    fn rdev_classification() {
        assert_eq!(
            classify_rdev_key(rdev::Key::ControlLeft),
            Some(CapturedKey::Modifier(Modifier::Ctrl))
        );
        assert_eq!(
            classify_rdev_key(rdev::Key::KeyT),
            Some(CapturedKey::Key("T".to_string()))
        );
        assert_eq!(classify_rdev_key(rdev::Key::Unknown(0)), None);
    }
}
