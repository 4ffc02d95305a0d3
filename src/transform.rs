//! Layout-aware text conversion
//!
//! Pure functions over a static bidirectional table between the Latin
//! (QWERTY, US-English) and Cyrillic (ЙЦУКЕН, Windows-Russian) character
//! sets, plus the case-toggle rule used by the optional case hotkey.

use std::collections::HashMap;
use std::sync::OnceLock;

/// The two layouts the substitution table covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Latin,
    Cyrillic,
}

impl Layout {
    /// The layout the converted text belongs to.
    pub fn counterpart(self) -> Layout {
        match self {
            Layout::Latin => Layout::Cyrillic,
            Layout::Cyrillic => Layout::Latin,
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Latin => write!(f, "latin"),
            Layout::Cyrillic => write!(f, "cyrillic"),
        }
    }
}

/// Lowercase letter rows plus the punctuation/digit pairs of the
/// Windows-Russian layout. Uppercase letter pairs are derived.
const BASE_PAIRS: &[(char, char)] = &[
    ('q', 'й'),
    ('w', 'ц'),
    ('e', 'у'),
    ('r', 'к'),
    ('t', 'е'),
    ('y', 'н'),
    ('u', 'г'),
    ('i', 'ш'),
    ('o', 'щ'),
    ('p', 'з'),
    ('a', 'ф'),
    ('s', 'ы'),
    ('d', 'в'),
    ('f', 'а'),
    ('g', 'п'),
    ('h', 'р'),
    ('j', 'о'),
    ('k', 'л'),
    ('l', 'д'),
    ('z', 'я'),
    ('x', 'ч'),
    ('c', 'с'),
    ('v', 'м'),
    ('b', 'и'),
    ('n', 'т'),
    ('m', 'ь'),
    ('@', '"'),
    ('#', '№'),
    ('$', ';'),
    ('^', ':'),
    ('&', '?'),
    (',', 'б'),
    ('<', 'Б'),
    ('.', 'ю'),
    ('>', 'Ю'),
    ('/', '.'),
    ('?', ','),
    (';', 'ж'),
    (':', 'Ж'),
    ('\'', 'э'),
    ('"', 'Э'),
    ('[', 'х'),
    ('{', 'Х'),
    (']', 'ъ'),
    ('}', 'Ъ'),
    ('`', 'ё'),
    ('~', 'Ё'),
];

fn latin_to_cyrillic() -> &'static HashMap<char, char> {
    static MAP: OnceLock<HashMap<char, char>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for &(lat, cyr) in BASE_PAIRS {
            map.insert(lat, cyr);
            if lat.is_alphabetic() {
                for (upper_lat, upper_cyr) in
                    lat.to_uppercase().zip(cyr.to_uppercase())
                {
                    map.insert(upper_lat, upper_cyr);
                }
            }
        }
        map
    })
}

fn cyrillic_to_latin() -> &'static HashMap<char, char> {
    static MAP: OnceLock<HashMap<char, char>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map: HashMap<char, char> = latin_to_cyrillic()
            .iter()
            .map(|(&lat, &cyr)| (cyr, lat))
            .collect();
        // Both '.' and '/' map to 'ю'/'.' pairs; the reverse of 'ю' must
        // stay '.', and 'ё' reverses to the backquote row.
        map.insert('ю', '.');
        map.insert('Ю', '>');
        map.insert('ё', '`');
        map.insert('Ё', '~');
        map
    })
}

/// Convert `text` assuming it was typed while `source` was the active
/// layout. Each character is looked up in the source-direction map first,
/// then in the reverse map (tolerating text garbled in both directions),
/// and passed through unchanged when neither map knows it.
pub fn convert(text: &str, source: Layout) -> String {
    let (primary, reverse) = match source {
        Layout::Cyrillic => (cyrillic_to_latin(), latin_to_cyrillic()),
        Layout::Latin => (latin_to_cyrillic(), cyrillic_to_latin()),
    };

    text.chars()
        .map(|ch| {
            primary
                .get(&ch)
                .or_else(|| reverse.get(&ch))
                .copied()
                .unwrap_or(ch)
        })
        .collect()
}

/// Toggle the case of a selection: text without letters is returned
/// unchanged, all-lowercase text becomes uppercase, anything else becomes
/// lowercase.
pub fn change_case(text: &str) -> String {
    let mut has_letters = false;
    let mut all_lower = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            has_letters = true;
            if !ch.is_lowercase() {
                all_lower = false;
            }
        }
    }

    if !has_letters {
        text.to_string()
    } else if all_lower {
        text.to_uppercase()
    } else {
        text.to_lowercase()
    }
}

/// Guess which layout produced `text` when the OS cannot report the
/// focused window's layout: whichever alphabet contributes more mapped
/// characters wins, with Latin as the tie-break.
pub fn guess_source(text: &str) -> Layout {
    let mut cyrillic = 0usize;
    let mut latin = 0usize;
    for ch in text.chars() {
        if ch.is_ascii_alphabetic() {
            latin += 1;
        } else if cyrillic_to_latin().contains_key(&ch) {
            cyrillic += 1;
        }
    }
    if cyrillic > latin {
        Layout::Cyrillic
    } else {
        Layout::Latin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_garble_becomes_cyrillic() {
        // Typed as "привет" with the Latin layout active by mistake.
        assert_eq!(convert("ghbdtn", Layout::Latin), "привет");
    }

    #[test]
    fn cyrillic_context_uses_reverse_map_for_latin_input() {
        // The focused window reports Cyrillic, but the garbled text is
        // Latin: the reverse map recovers it.
        assert_eq!(convert("ghbdtn", Layout::Cyrillic), "привет");
    }

    #[test]
    fn cyrillic_garble_becomes_latin() {
        assert_eq!(convert("руддщ", Layout::Cyrillic), "hello");
    }

    #[test]
    fn case_is_preserved() {
        assert_eq!(convert("Ghbdtn", Layout::Latin), "Привет");
        assert_eq!(convert("GHBDTN", Layout::Latin), "ПРИВЕТ");
    }

    #[test]
    fn punctuation_pairs() {
        assert_eq!(convert(";", Layout::Latin), "ж");
        assert_eq!(convert("`", Layout::Latin), "ё");
        assert_eq!(convert("ё", Layout::Cyrillic), "`");
        assert_eq!(convert("?", Layout::Latin), ",");
        // Unmapped characters pass through.
        assert_eq!(convert("123 -_=+", Layout::Latin), "123 -_=+");
    }

    #[test]
    fn conversion_is_deterministic() {
        let input = "ghbdtn, vbh!";
        let once = convert(input, Layout::Latin);
        let twice = convert(input, Layout::Latin);
        assert_eq!(once, twice);
    }

    #[test]
    fn change_case_rules() {
        assert_eq!(change_case("1234 !"), "1234 !");
        assert_eq!(change_case("hello"), "HELLO");
        assert_eq!(change_case("HELLO"), "hello");
        assert_eq!(change_case("Hello"), "hello");
        assert_eq!(change_case("привет"), "ПРИВЕТ");
        assert_eq!(change_case(""), "");
    }

    #[test]
    fn source_guessing() {
        assert_eq!(guess_source("ghbdtn"), Layout::Latin);
        assert_eq!(guess_source("руддщ"), Layout::Cyrillic);
        assert_eq!(guess_source("12345"), Layout::Latin);
    }
}
