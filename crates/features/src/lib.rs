//! Text features for organization and place matching.
//!
//! Provides pure functions used by name resolution and location checks:
//! - Name normalization (case, whitespace, punctuation noise)
//! - Edit distance and similarity ratios
//! - Containment detection
//! - Per-token Metaphone encodings
//! - City alias folding

use rphonetic::{Encoder, Metaphone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metaphone code of a single token, `None` when the token has no letters.
pub fn metaphone(token: &str) -> Option<String> {
    let code = Metaphone::default().encode(&token.to_uppercase());
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Normalize an organization name for comparison.
///
/// Lowercases, drops punctuation noise (periods, commas, quotes), turns
/// separators into spaces, expands `&` and collapses whitespace. Digits and
/// location words are kept.
pub fn normalize_name(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if c == '&' {
            out.push_str(" and ");
        } else if c.is_whitespace() || matches!(c, '-' | '/' | '_' | '(' | ')' | '[' | ']' | '|' | '+') {
            out.push(' ');
        }
        // everything else is noise: . , ' " ’ ! ? ; : etc.
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a city, state or country value.
pub fn normalize_place(text: &str) -> String {
    normalize_name(text)
}

/// Split a normalized string into tokens.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Compute Levenshtein edit distance between two strings.
pub fn edit_distance(s1: &str, s2: &str) -> usize {
    let s1: Vec<char> = s1.chars().collect();
    let s2: Vec<char> = s2.chars().collect();

    let mut previous: Vec<usize> = (0..=s2.len()).collect();
    let mut current = vec![0; s2.len() + 1];

    for i in 1..=s1.len() {
        current[0] = i;
        for j in 1..=s2.len() {
            let cost = if s1[i - 1] == s2[j - 1] { 0 } else { 1 };
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[s2.len()]
}

/// Edit similarity in `0.0..=1.0`: `1 - distance / longer_length`.
pub fn similarity_ratio(s1: &str, s2: &str) -> f64 {
    let longest = s1.chars().count().max(s2.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(s1, s2) as f64 / longest as f64
}

/// True when two different normalized strings are related by containment:
/// one is a substring of the other, or one token set strictly contains the other.
///
/// Containment alone never supports a positive match.
pub fn is_containment(s1: &str, s2: &str) -> bool {
    if s1 == s2 || s1.is_empty() || s2.is_empty() {
        return false;
    }
    if s1.contains(s2) || s2.contains(s1) {
        return true;
    }

    let a: std::collections::BTreeSet<&str> = tokens(s1).into_iter().collect();
    let b: std::collections::BTreeSet<&str> = tokens(s2).into_iter().collect();
    a != b && (a.is_subset(&b) || b.is_subset(&a))
}

/// Check whether two normalized names sound alike token by token.
///
/// Requires the same number of tokens; each pair must share a Metaphone code.
/// Tokens without a code (numerals) must be equal.
pub fn phonetic_tokens_match(s1: &str, s2: &str) -> bool {
    let a = tokens(s1);
    let b = tokens(s2);
    if a.is_empty() || a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).all(|(t1, t2)| {
        if t1 == t2 {
            return true;
        }
        match (metaphone(t1), metaphone(t2)) {
            (Some(m1), Some(m2)) => m1 == m2,
            _ => false,
        }
    })
}

/// Alternate spellings of place names folded to one canonical form.
///
/// One table serves cities, states and countries. Keys and values are
/// normalized place names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceAliases {
    aliases: BTreeMap<String, String>,
}

impl Default for PlaceAliases {
    fn default() -> Self {
        Self::from_pairs([
            ("bangalore", "bengaluru"),
            ("bombay", "mumbai"),
            ("madras", "chennai"),
            ("calcutta", "kolkata"),
            ("gurgaon", "gurugram"),
            ("poona", "pune"),
            ("trivandrum", "thiruvananthapuram"),
            ("new delhi", "delhi"),
            ("cochin", "kochi"),
            ("mysore", "mysuru"),
            ("in", "india"),
            ("ind", "india"),
            ("bharat", "india"),
            ("us", "united states"),
            ("usa", "united states"),
            ("united states of america", "united states"),
            ("uk", "united kingdom"),
            ("great britain", "united kingdom"),
            ("uae", "united arab emirates"),
            ("ap", "andhra pradesh"),
            ("dl", "delhi"),
            ("gj", "gujarat"),
            ("hr", "haryana"),
            ("ka", "karnataka"),
            ("kl", "kerala"),
            ("mh", "maharashtra"),
            ("pb", "punjab"),
            ("tn", "tamil nadu"),
            ("ts", "telangana"),
            ("tg", "telangana"),
            ("up", "uttar pradesh"),
            ("wb", "west bengal"),
            ("orissa", "odisha"),
        ])
    }
}

impl PlaceAliases {
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let aliases = pairs
            .into_iter()
            .map(|(alias, canonical)| (normalize_place(alias), normalize_place(canonical)))
            .collect();
        Self { aliases }
    }

    /// Normalize a place and fold it to its canonical spelling.
    pub fn canonical(&self, place: &str) -> String {
        let normalized = normalize_place(place);
        match self.aliases.get(&normalized) {
            Some(canonical) => canonical.clone(),
            None => normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
