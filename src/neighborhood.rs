use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

/// Leading phrases longer than this are not treated as a neighborhood label.
const MAX_LEADING_CHARS: usize = 40;
const MIN_LEADING_CHARS: usize = 3;

const NAME: &str = r"\p{L}[\p{L}'’]*(?:\s+\p{L}[\p{L}'’]*){0,2}";

/// Words that end a fallback name ("col. palmira casa de 3 hab" -> "palmira").
const NAME_STOP_WORDS: &[&str] = &[
    "y", "e", "con", "en", "casa", "apto", "apartamento", "lote", "terreno", "local",
    "cerca", "frente", "precio", "venta", "alquiler", "renta", "se", "para", "por",
];

/// Fallback patterns, tried in order on the normalized text.
static FALLBACKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"\b(?:col\.|colonia)\s*(?P<name>{})", NAME),
        format!(r"\b(?:res\.|residencial)\s*(?P<name>{})", NAME),
        format!(r"\bbarrio\s+(?P<name>{})", NAME),
        r"\banillo\s+perif[eé]rico\b".to_string(),
        format!(r"\blomas?\b(?:\s+(?:del?\s+)?(?P<name>{}))?", NAME),
        format!(r"\baltos\s+de\s+(?P<name>{})", NAME),
        format!(r"\bsan\s+(?P<name>{})", NAME),
    ]
    .iter()
    .map(|src| Regex::new(src).expect("valid neighborhood fallback regex"))
    .collect()
});

/// A canonical neighborhood name and the spellings that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Ordered alias dictionary. Keys are accent-folded, lower-cased and stripped
/// of punctuation, so "Col. Palmira", "COL PALMIRA" and "col palmira" collide.
#[derive(Debug, Clone, Default)]
pub struct NeighborhoodDictionary {
    entries: Vec<NeighborhoodEntry>,
    keys: Vec<(String, usize)>,
}

impl NeighborhoodDictionary {
    pub fn new(entries: Vec<NeighborhoodEntry>) -> Self {
        let mut keys: Vec<(String, usize)> = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                tracing::warn!("Skipping neighborhood entry with an empty name");
                continue;
            }
            for spelling in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
                let key = canonicalize(spelling);
                if key.is_empty() {
                    continue;
                }
                // First entry to claim a key keeps it
                if keys.iter().any(|(k, _)| *k == key) {
                    tracing::debug!("Duplicate neighborhood key '{}' ignored", key);
                    continue;
                }
                keys.push((key, idx));
            }
        }

        Self { entries, keys }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let entries: Vec<NeighborhoodEntry> = serde_yaml::from_str(yaml)?;
        let dictionary = Self::new(entries);
        tracing::debug!(
            "Loaded {} neighborhoods ({} lookup keys)",
            dictionary.len(),
            dictionary.keys.len()
        );
        Ok(dictionary)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)?;
        tracing::info!("Reading neighborhood dictionary from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NeighborhoodEntry] {
        &self.entries
    }

    /// Exact lookup of a phrase against names and aliases.
    pub fn lookup(&self, phrase: &str) -> Option<&str> {
        self.lookup_key(&canonicalize(phrase))
    }

    fn lookup_key(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.keys
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, idx)| self.entries[*idx].name.as_str())
    }

    /// Earliest word-bounded occurrence of any key in canonical text; on a
    /// shared start the longer key wins.
    fn search(&self, canonical_text: &str) -> Option<&str> {
        let mut best: Option<(usize, usize, usize)> = None;

        for (key, idx) in &self.keys {
            if key.chars().count() < MIN_LEADING_CHARS {
                continue;
            }
            let Some(pos) = find_word(canonical_text, key) else {
                continue;
            };
            let better = match best {
                None => true,
                Some((best_pos, best_len, _)) => {
                    pos < best_pos || (pos == best_pos && key.len() > best_len)
                }
            };
            if better {
                best = Some((pos, key.len(), *idx));
            }
        }

        best.map(|(_, _, idx)| self.entries[idx].name.as_str())
    }
}

/// Find the neighborhood a listing names.
///
/// Stages, first success wins:
/// 1. the leading phrase (before the first `:` or `,`) looked up exactly,
///    also with a leader hint ("col.", "res.") stripped
/// 2. any dictionary name or alias appearing as whole words in the text
/// 3. fallback patterns (col./res./barrio/anillo periferico/lomas/altos de/san),
///    resolved through the dictionary when possible
///
/// Dictionary hits return the canonical name; pattern-only hits return the
/// matched phrase upper-cased.
pub fn match_neighborhood(
    text: &str,
    dictionary: Option<&NeighborhoodDictionary>,
    leader_hints: &[String],
) -> Option<String> {
    let dictionary = dictionary.filter(|d| !d.is_empty());

    if let Some(dict) = dictionary {
        if let Some(name) = match_leading_phrase(text, dict, leader_hints) {
            tracing::trace!("Neighborhood '{}' from leading phrase", name);
            return Some(name.to_string());
        }
        if let Some(name) = dict.search(&canonicalize(text)) {
            tracing::trace!("Neighborhood '{}' from dictionary search", name);
            return Some(name.to_string());
        }
    }

    let found = match_fallback(text, dictionary);
    if let Some(name) = &found {
        tracing::debug!("Neighborhood '{}' from fallback pattern", name);
    }
    found
}

fn match_leading_phrase<'d>(
    text: &str,
    dict: &'d NeighborhoodDictionary,
    leader_hints: &[String],
) -> Option<&'d str> {
    let phrase = canonicalize(leading_window(text));
    let hints: Vec<String> = leader_hints
        .iter()
        .map(|h| canonicalize(h))
        .filter(|h| !h.is_empty())
        .collect();

    // Longest word prefix first, bounded by MAX_LEADING_CHARS
    let words: Vec<&str> = phrase.split(' ').filter(|w| !w.is_empty()).collect();
    for take in (1..=words.len()).rev() {
        let candidate = words[..take].join(" ");
        let len = candidate.chars().count();
        if len > MAX_LEADING_CHARS {
            continue;
        }
        if len < MIN_LEADING_CHARS {
            break;
        }
        if let Some(name) = dict.lookup_key(&candidate) {
            return Some(name);
        }
        for hint in &hints {
            if let Some(rest) = candidate.strip_prefix(hint.as_str()) {
                if let Some(name) = rest.strip_prefix(' ').and_then(|r| dict.lookup_key(r)) {
                    return Some(name);
                }
            }
        }
    }

    None
}

/// Text before the first ':' or ','; without either, the first
/// MAX_LEADING_CHARS characters cut back to a word boundary.
fn leading_window(text: &str) -> &str {
    if let Some(end) = text.find(|c: char| c == ':' || c == ',') {
        return &text[..end];
    }
    match text.char_indices().nth(MAX_LEADING_CHARS) {
        None => text,
        Some((cut, c)) if c.is_whitespace() => &text[..cut],
        Some((cut, _)) => text[..cut].rsplit_once(' ').map_or("", |(head, _)| head),
    }
}

fn match_fallback(text: &str, dictionary: Option<&NeighborhoodDictionary>) -> Option<String> {
    for pattern in FALLBACKS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };

            let (prefix, name) = match caps.name("name") {
                Some(name) => (&text[whole.start()..name.start()], trim_name(name.as_str())),
                None => (whole.as_str(), String::new()),
            };
            if name.is_empty() && caps.name("name").is_some() {
                continue;
            }

            let phrase = format!("{} {}", prefix.trim(), name).trim().to_string();
            if let Some(dict) = dictionary {
                let by_name = name_prefixes(&name).find_map(|candidate| dict.lookup(&candidate));
                if let Some(found) = dict.lookup(&phrase).or(by_name) {
                    return Some(found.to_string());
                }
            }
            return Some(phrase.to_uppercase());
        }
    }
    None
}

/// Cut a captured name at the first stop word.
fn trim_name(name: &str) -> String {
    name.split_whitespace()
        .take_while(|w| !NAME_STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// "lomas del guijarro sur" -> "lomas del guijarro sur", "lomas del guijarro", ...
fn name_prefixes(name: &str) -> impl Iterator<Item = String> + '_ {
    let words: Vec<&str> = name.split_whitespace().collect();
    (1..=words.len()).rev().map(move |take| words[..take].join(" "))
}

/// Position of `needle` in `haystack` bounded by spaces or the ends. Both
/// sides must already be canonical.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let end = pos + needle.len();
        (pos == 0 || bytes[pos - 1] == b' ') && (end == haystack.len() || bytes[end] == b' ')
    })
}

/// Accent-fold, lower-case, turn punctuation into spaces and collapse them.
pub fn canonicalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
