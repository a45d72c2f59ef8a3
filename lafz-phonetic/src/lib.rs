//! Phonetic encoding for Arabic text and Latin transliterations.
//!
//! Everything searchable is first mapped onto a deliberately lossy
//! alphabet of 19 symbols (15 consonants, the glottal marker `x`,
//! and the vowels `a`/`i`/`u`), so that the many ways a user can
//! romanize the same recitation collide on one canonical form. The
//! [`arabic`] module encodes vocalized Arabic, [`normalize`] folds a
//! transliteration onto the same form, and [`trigrams`] windows the
//! result for the inverted index.

mod alphabet;
pub mod arabic;
mod normalizer;

pub use normalizer::{normalize, normalize_phones};

use serde::{Deserialize, Serialize};

/// Trigram window length. Fixed: shorter windows collide too often
/// on a 19-symbol alphabet, longer ones miss partial matches in
/// short verses.
pub const NGRAM_LEN: usize = 3;

/// One phonetic symbol together with the index of the source
/// character (in the normalized Arabic text) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phone {
    pub symbol: char,
    pub pos: usize,
}

/// A length-3 window over a phonetic sequence. `start`/`end` span
/// the source-text characters the window covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NGram {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Renders a phonetic sequence as its plain symbol string.
pub fn phones_text(phones: &[Phone]) -> String {
    phones.iter().map(|p| p.symbol).collect()
}

/// Windows a phonetic sequence into trigrams. Sequences shorter
/// than three symbols produce nothing.
pub fn trigrams(phones: &[Phone]) -> Vec<NGram> {
    if phones.len() < NGRAM_LEN {
        return Vec::new();
    }
    phones
        .windows(NGRAM_LEN)
        .map(|window| {
            let start = window.iter().map(|p| p.pos).min().unwrap_or(0);
            let end = window.iter().map(|p| p.pos).max().unwrap_or(0) + 1;
            NGram {
                text: window.iter().map(|p| p.symbol).collect(),
                start,
                end,
            }
        })
        .collect()
}

/// Windows a plain phonetic string into trigram texts, for the
/// query side where no source positions exist.
pub fn trigram_texts(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < NGRAM_LEN {
        return Vec::new();
    }
    chars
        .windows(NGRAM_LEN)
        .map(|window| window.iter().collect())
        .collect()
}
