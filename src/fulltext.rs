//! Fulltext tokeniser (spec §4.H).
//!
//! Segments the content of a text-bearing event into indexable words. Word
//! boundaries come from `unicode-segmentation`'s UAX #29 implementation,
//! which already discards pure whitespace/punctuation spans; the filters
//! below narrow that down to the spec's notion of an indexable word.

use unicode_segmentation::UnicodeSegmentation;

const MEDIA_EXTENSIONS: &[&str] = &[
    ".jpg", ".png", ".jpeg", ".mp4", ".mov", ".aac", ".mp3",
];

const ENTITY_PREFIXES: &[&str] = &[
    "nostr:", "npub", "nsec", "nevent", "naddr", "note", "lnurl", "cashu",
];

/// URL schemes UAX #29 splits off into their own word when a URL appears in
/// content (`"https://x.jpg"` tokenises to `"https"` and `"x.jpg"`; the
/// latter is already dropped as a media suffix, the former needs its own
/// rule).
const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ws", "wss", "magnet"];

/// Minimum payload length after an entity prefix for the heuristic to fire,
/// so that e.g. the bare word "note" isn't mistaken for a `note1...` id.
const ENTITY_MIN_PAYLOAD: usize = 16;

/// Kinds whose `content` is prose worth fulltext-indexing (glossary
/// "text-bearing kind"; enumerated in `SPEC_FULL.md`'s supplemented
/// features section since `spec.md` names the list only in prose).
pub fn is_text_bearing(kind: u16) -> bool {
    matches!(
        kind,
        0 | 1 | 1622 | 1630..=1633 | 2004 | 30023 | 30024 | 30818 | 31922 | 31923
    )
}

/// Tokenise `content`, returning `(word, position)` pairs. `position` is a
/// 0-based counter over *accepted* words only — dropped words don't consume
/// a position. Duplicate words collapse to their last occurring position
/// (the index is a `word -> position` map internally), which is a known
/// limitation carried over unchanged from the spec.
pub fn tokenize(content: &str) -> Vec<(String, u64)> {
    // The position of a word is the counter value at the time of its *last*
    // accepted occurrence (spec §4.H edge case: "the word-position map
    // collapses same-word positions").
    let mut last_position: std::collections::HashMap<String, u64> = std::collections::HashMap::new();
    let mut counter = 0u64;
    for word in content.unicode_words() {
        let lower = word.to_lowercase();
        if !is_indexable(&lower) {
            continue;
        }
        last_position.insert(lower, counter);
        counter += 1;
    }

    let mut out: Vec<(String, u64)> = last_position.into_iter().collect();
    out.sort_unstable_by_key(|(_, pos)| *pos);
    out
}

fn is_indexable(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    if first.is_whitespace() || first.is_ascii_punctuation() && first != '_' {
        return false;
    }
    if MEDIA_EXTENSIONS.iter().any(|ext| word.ends_with(ext)) {
        return false;
    }
    if word.contains('.') {
        return false;
    }
    if looks_like_entity(word) {
        return false;
    }
    if is_hex_of_len(word, 64) || is_hex_of_len(word, 128) {
        return false;
    }
    if URL_SCHEMES.iter().any(|scheme| *scheme == word) {
        return false;
    }
    true
}

fn looks_like_entity(word: &str) -> bool {
    ENTITY_PREFIXES.iter().any(|prefix| {
        word.starts_with(prefix) && word.len() >= prefix.len() + ENTITY_MIN_PAYLOAD
    })
}

fn is_hex_of_len(word: &str, len: usize) -> bool {
    word.len() == len && word.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_urls_and_media_suffixed_tokens() {
        let words = tokenize("hello world https://x.jpg hello");
        let as_words: Vec<&str> = words.iter().map(|(w, _)| w.as_str()).collect();
        assert!(as_words.contains(&"hello"));
        assert!(as_words.contains(&"world"));
        assert!(!as_words.iter().any(|w| w.contains("https")));
        assert!(!as_words.iter().any(|w| w.ends_with(".jpg") || w.contains("jpg")));
    }

    #[test]
    fn duplicate_word_collapses_to_one_entry() {
        let words = tokenize("hello world hello");
        let hellos: Vec<_> = words.iter().filter(|(w, _)| w == "hello").collect();
        assert_eq!(hellos.len(), 1);
    }

    #[test]
    fn drops_bare_hex_ids() {
        let sixty_four_hex = "a".repeat(64);
        let words = tokenize(&format!("look at {sixty_four_hex} now"));
        assert!(!words.iter().any(|(w, _)| w == &sixty_four_hex));
        assert!(words.iter().any(|(w, _)| w == "look"));
    }

    #[test]
    fn drops_entity_style_tokens() {
        let npub = format!("npub1{}", "q".repeat(58));
        let words = tokenize(&format!("hi {npub} there"));
        assert!(!words.iter().any(|(w, _)| w.starts_with("npub")));
    }

    #[test]
    fn text_bearing_kinds_match_glossary_list() {
        assert!(is_text_bearing(0));
        assert!(is_text_bearing(1));
        assert!(is_text_bearing(30023));
        assert!(is_text_bearing(1631));
        assert!(!is_text_bearing(7)); // reaction, not prose
    }

    #[test]
    fn lowercases_words() {
        let words = tokenize("HELLO World");
        assert!(words.iter().any(|(w, _)| w == "hello"));
        assert!(words.iter().any(|(w, _)| w == "world"));
    }
}
