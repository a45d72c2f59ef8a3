//! The ordered rewrite pipeline that folds spelling variation onto
//! one canonical phonetic form.
//!
//! Both sides of a search go through [`normalize`]: the Arabic
//! transcoder feeds it the raw symbol stream of a verse, the query
//! path feeds it the user's transliteration. Each step rewrites the
//! whole string before the next begins, and the adjacent-duplicate
//! merge must stay last so that doubled consonants cannot hide a
//! tajweed context from the earlier rules.

use std::sync::LazyLock;

use lafz_diff::{diff, Edit};
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::alphabet;
use crate::Phone;

static RX_HAMZA_AFTER_I: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"i([au])").unwrap());
static RX_HAMZA_AFTER_U: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"u([ai])").unwrap());
static RX_HAMZA_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^aiu0])?([^aiu0])0?([^aiu0])([aiu])").unwrap());
static RX_ALIF_LAM_SYAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"x([aiu]?)l([zsdtnlr])").unwrap());
static RX_UNUSED_HAMZA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"x([^aiu0])").unwrap());
static RX_MADDA_A: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ax([^aiu]|$)").unwrap());
static RX_MADDA_I: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"iy([^aiu]|$)").unwrap());
static RX_MADDA_U: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"uw([^aiu]|$)").unwrap());
static RX_IKHFA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"n0?g").unwrap());
static RX_IQLAB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"n0?b").unwrap());
static RX_IDGHAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"n0?([ynmwlr])").unwrap());
static RX_SILENT_HAMZA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^aiu])x").unwrap());
static RX_HANGING_VOWELS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[aiu]+$").unwrap());

/// Digraph folds, applied in order after all structural rules. The
/// diphthong pairs come first so `ai`/`au` settle as the semivowels
/// they transliterate.
const DIGRAPHS: [(&str, &str); 12] = [
    ("ai", "ay"),
    ("au", "aw"),
    ("sh", "s"),
    ("ts", "s"),
    ("sy", "s"),
    ("kh", "h"),
    ("ch", "h"),
    ("zh", "z"),
    ("dz", "z"),
    ("dh", "d"),
    ("th", "t"),
    ("gh", "g"),
];

/// Normalizes a transliteration (or raw phonetic string) onto the
/// canonical phonetic form. Unrecognized characters are dropped;
/// this never fails.
pub fn normalize(input: &str) -> String {
    let s: String = input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .nfkc()
        .collect();
    let s = s.to_lowercase();
    let s: String = s.chars().map(alphabet::fold_latin).collect();

    // Mark possible hamza between colliding vowels, e.g. "mui" => "muxi".
    let s = RX_HAMZA_AFTER_I.replace_all(&s, "ix$1").into_owned();
    let s = RX_HAMZA_AFTER_U.replace_all(&s, "ux$1").into_owned();

    // Join words, protecting vowel-initial ones with a hamza seat.
    let s = collapse_spaces(&s);

    let s: String = s.chars().filter(|c| alphabet::is_symbol(*c)).collect();

    // Promote the vowel of an initial consonant cluster, e.g. "xl0ha" => "xalha".
    let s = RX_HAMZA_PREFIX
        .replace(&s, "${1}${4}${2}${3}${4}")
        .into_owned();

    // Elide the article before sun letters, e.g. "xalrahman" => "arahman".
    let s = RX_ALIF_LAM_SYAMS.replace_all(&s, "${1}${2}").into_owned();

    // Hamza in front of a consonant is inaudible.
    let s = RX_UNUSED_HAMZA.replace_all(&s, "${1}").into_owned();
    let s = s.strip_prefix('x').unwrap_or(&s).to_string();

    // Long vowels spelled as vowel + semivowel, e.g. "iy" => "i".
    let s = RX_MADDA_A.replace_all(&s, "a${1}").into_owned();
    let s = RX_MADDA_I.replace_all(&s, "i${1}").into_owned();
    let s = RX_MADDA_U.replace_all(&s, "u${1}").into_owned();

    // Tajweed: ikhfa, iqlab, idgham.
    let s = RX_IKHFA.replace_all(&s, "n0").into_owned();
    let s = RX_IQLAB.replace_all(&s, "m0b").into_owned();
    let s = RX_IDGHAM.replace_all(&s, "${1}").into_owned();

    let s = s.replace('0', "");

    // A glottal stop directly after a consonant is silent.
    let s = RX_SILENT_HAMZA.replace_all(&s, "${1}").into_owned();

    // Fold digraphs before touching the tail, so a word-final
    // diphthong settles as its semivowel instead of being trimmed.
    let s = DIGRAPHS
        .iter()
        .fold(s, |acc, (from, to)| acc.replace(from, to));

    // Trailing short vowels carry no signal. Stripping the whole
    // run keeps normalization idempotent: a single trim could expose
    // another trailing vowel on a second pass.
    let s = RX_HANGING_VOWELS.replace(&s, "").into_owned();

    merge_adjacent(&s)
}

/// Normalizes a position-bearing phonetic sequence. The symbol
/// stream is normalized as a string, then diffed against the
/// original so every surviving symbol keeps its origin position.
/// Inserted symbols inherit the previous survivor's position; a
/// leading insertion takes position 0.
pub fn normalize_phones(phones: Vec<Phone>) -> Vec<Phone> {
    let original: Vec<char> = phones.iter().map(|p| p.symbol).collect();
    let original_text: String = original.iter().collect();
    let normalized: Vec<char> = normalize(&original_text).chars().collect();

    let edits = diff(&original, &normalized, 0, 0);

    let mut spliced: Vec<(char, Option<usize>)> = Vec::with_capacity(normalized.len());
    let mut i = 0;
    for edit in &edits {
        while i < edit.old_pos() {
            spliced.push((phones[i].symbol, Some(phones[i].pos)));
            i += 1;
        }
        match edit {
            Edit::Delete { .. } => i += 1,
            Edit::Insert { elem, .. } => spliced.push((*elem, None)),
        }
    }
    while i < phones.len() {
        spliced.push((phones[i].symbol, Some(phones[i].pos)));
        i += 1;
    }

    let mut out = Vec::with_capacity(spliced.len());
    let mut last_pos = 0;
    for (symbol, pos) in spliced {
        let pos = pos.unwrap_or(last_pos);
        last_pos = pos;
        out.push(Phone { symbol, pos });
    }
    out
}

fn collapse_spaces(s: &str) -> String {
    let s = s.replace(['-', '_'], " ");
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if word.starts_with(|c| alphabet::is_vowel(c)) {
            out.push('x');
        }
        out.push_str(word);
    }
    out
}

fn merge_adjacent(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = None;
    for c in s.chars() {
        if prev != Some(c) {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}
