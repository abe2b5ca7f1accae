use std::collections::HashMap;
use std::sync::LazyLock;

/// Arabic letters and their simplified Latin romanization.
///
/// Several letters share a Latin form (`س`/`ص` both become `s`, `ح`/`ه`
/// both become `h`, and so on); the scheme is lossy and is not meant to be
/// reversed.
const ARABIC_TO_LATIN: [(char, &str); 30] = [
    ('ا', "a"),
    ('ب', "b"),
    ('ت', "t"),
    ('ث', "th"),
    ('ج', "j"),
    ('ح', "h"),
    ('خ', "kh"),
    ('د', "d"),
    ('ذ', "dh"),
    ('ر', "r"),
    ('ز', "z"),
    ('س', "s"),
    ('ش', "sh"),
    ('ص', "s"),
    ('ض', "d"),
    ('ط', "t"),
    ('ظ', "z"),
    ('ع', "a"),
    ('غ', "gh"),
    ('ف', "f"),
    ('ق', "q"),
    ('ك', "k"),
    ('ل', "l"),
    ('م', "m"),
    ('ن', "n"),
    ('ه', "h"),
    ('و', "w"),
    ('ي', "y"),
    ('ء', "'"),
    ('ى', "a"),
];

static TABLE: LazyLock<HashMap<char, &'static str>> =
    LazyLock::new(|| ARABIC_TO_LATIN.iter().copied().collect());

/// Romanize `text` one code point at a time.
///
/// Characters without a table entry (spaces, digits, punctuation, Latin,
/// Arabic diacritics, letters outside the table) are copied unchanged.
pub fn transliterate(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.chars() {
        match TABLE.get(&ch) {
            Some(latin) => output.push_str(latin),
            None => output.push(ch),
        }
    }
    output
}

pub fn lookup(ch: char) -> Option<&'static str> {
    TABLE.get(&ch).copied()
}

/// Table entries in their declaration order.
pub fn table() -> impl Iterator<Item = (char, &'static str)> {
    ARABIC_TO_LATIN.iter().copied()
}

pub fn contains_source_script(text: &str) -> bool {
    text.chars().any(|ch| TABLE.contains_key(&ch))
}
