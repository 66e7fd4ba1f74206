//! Bibliography text normalization
//!
//! A fixed-order, Unicode-sensitive pipeline applied to the text of
//! bibliography-entry paragraphs: non-breaking spaces after initials,
//! Cyrillic angular quotes, en dashes, non-breaking spaces before unit
//! tokens, and optional renumbering. Order matters: later steps must not
//! re-break spacing inserted by earlier ones.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Language of one bibliography entry, supplied by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    En,
    Mixed,
    /// No language supplied; both Cyrillic and Latin rules apply.
    #[default]
    Unset,
}

/// One bibliography entry as produced by the external classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BibliographyEntry {
    pub paragraph_index: usize,
    pub raw_text: String,
    #[serde(default)]
    pub language: Language,
}

/// Requested numbering style for bibliography entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberingScheme {
    /// `1. Entry`
    #[serde(rename = "1.")]
    Dot,
    /// `1) Entry`
    #[serde(rename = "1)")]
    Paren,
    /// `[1] Entry`
    #[serde(rename = "[1]")]
    Bracket,
}

const NBSP: char = '\u{00A0}';

// Two consecutive initials: "И. И." / "A. B."
static CYR_INITIAL_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([А-ЯЁ]\.)\s*([А-ЯЁ]\.)").unwrap());
static LAT_INITIAL_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]\.)\s*([A-Z]\.)").unwrap());

// A final initial followed by a capitalized word: "И. Иванов" / "J. Smith"
static CYR_INITIAL_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([А-ЯЁ]\.)\s*([А-ЯЁ][а-яё])").unwrap());
static LAT_INITIAL_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]\.)\s*([A-Z][a-z])").unwrap());

static DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());
static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']*)'").unwrap());

// Digit followed by a unit or abbreviation token. Longer tokens first so
// "мм" wins over "м"; bare-letter units carry a word boundary so "10 года"
// is not mistaken for "10 г".
static DIGIT_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d)\s*(стр\.|с\.|pp\.|p\.|pages\b|page\b|(?:мм|см|км|кг|мг|мл|мин|м|г|л|с|ч)\b|%)",
    )
    .unwrap()
});

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[?\d+[.)\]]?\s*").unwrap());

/// Run the normalization pipeline over one entry's text.
pub fn normalize_text(text: &str, language: Language) -> String {
    let mut out = text.to_string();

    // 1. Initials spacing. A fix-point loop because adjacent matches
    //    overlap: in "А. Б. В." the middle initial belongs to two pairs.
    if matches!(language, Language::Ru | Language::Mixed | Language::Unset) {
        out = replace_until_stable(&CYR_INITIAL_PAIR, &out);
        out = replace_until_stable(&CYR_INITIAL_WORD, &out);
    }
    if matches!(language, Language::En | Language::Mixed | Language::Unset) {
        out = replace_until_stable(&LAT_INITIAL_PAIR, &out);
        out = replace_until_stable(&LAT_INITIAL_WORD, &out);
    }

    // 2. Straight quotes become Cyrillic angular quotes, Russian-style
    //    entries only.
    if matches!(language, Language::Ru | Language::Unset) {
        out = DOUBLE_QUOTED.replace_all(&out, "«${1}»").into_owned();
        out = SINGLE_QUOTED.replace_all(&out, "«${1}»").into_owned();
    }

    // 3. Em dash to en dash; hyphen-minus is never touched.
    out = out.replace('\u{2014}', "\u{2013}");

    // 4. Non-breaking space between a digit and a unit token.
    out = DIGIT_UNIT
        .replace_all(&out, format!("${{1}}{NBSP}${{2}}").as_str())
        .into_owned();

    out
}

/// Apply a numbering scheme to an already-normalized entry.
///
/// An existing leading numeral (`1.`, `1)`, `[1]` and variants) is stripped
/// first; unnumbered entries just get the new prefix.
pub fn renumber(text: &str, scheme: NumberingScheme, number: usize) -> String {
    let body = if LEADING_NUMBER.is_match(text) {
        LEADING_NUMBER.replace(text, "").into_owned()
    } else {
        text.to_string()
    };
    let prefix = match scheme {
        NumberingScheme::Dot => format!("{number}. "),
        NumberingScheme::Paren => format!("{number}) "),
        NumberingScheme::Bracket => format!("[{number}] "),
    };
    format!("{prefix}{body}")
}

fn replace_until_stable(re: &Regex, text: &str) -> String {
    let replacement = format!("${{1}}{NBSP}${{2}}");
    let mut current = text.to_string();
    loop {
        let next = re.replace_all(&current, replacement.as_str()).into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}
