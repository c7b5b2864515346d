use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::numeric::{word_to_number, NUMBER_WORDS};
use super::{char_after, char_before, compile_pattern, keyword_alternation, window_after, window_before};
use crate::config::AgencyConfig;
use crate::error::ConfigError;

/// Room counts at or above this are noise (years, hours, lot numbers).
const MAX_ROOM_COUNT: u32 = 20;
const MAX_SLASH_BATHROOMS: f64 = 10.0;
/// Characters around an "N/M" pair searched for an apartment-like word.
const SLASH_CONTEXT_WINDOW: usize = 30;

static HALF_BATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bmedio\s+ba[ñn]\w*|\bba[ñn]\w*\s+y\s+(?:medio\b|1/2|½)|(?:½|\b1/2)\s*ba[ñn]")
        .expect("valid half bath regex")
});

// What may not follow an "N/M" pair for it to read as bedrooms/bathrooms
static SLASH_TAIL_REJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:m²|vrs²|v²|mz\b|metros|varas|manzanas?|\$|us\$|usd\b|lps|l\.|ba[ñn])")
        .expect("valid slash tail regex")
});

// "2 baños y 1/2": a fraction after a bathroom word or "y" is a half bath
static SLASH_LEAD_REJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\by|\bba[ñn]\w*|\bmedio)\s*$").expect("valid slash lead regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoomExtraction {
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    /// How many different bedroom counts the text mentions.
    pub distinct_bedrooms: usize,
}

#[derive(Debug, Clone)]
enum EnsuiteMatcher {
    /// Accent- and case-folded phrases matched as substrings.
    Literal(Vec<String>),
    Pattern(Vec<Regex>),
}

impl EnsuiteMatcher {
    fn is_match(&self, text: &str) -> bool {
        match self {
            EnsuiteMatcher::Literal(phrases) => {
                let folded = fold(text);
                phrases.iter().any(|p| folded.contains(p.as_str()))
            }
            EnsuiteMatcher::Pattern(patterns) => patterns.iter().any(|re| re.is_match(text)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoomPatterns {
    bed_numeric: Regex,
    bed_word: Regex,
    bed_short: Regex,
    bath_and_half: Regex,
    bath_numeric: Regex,
    bath_word: Regex,
    bath_short: Regex,
    slash: Regex,
    slash_context: Vec<String>,
    ensuite: EnsuiteMatcher,
    infer_from_bedrooms: bool,
    hint_bedrooms: Option<u32>,
    allow_slash: bool,
}

impl RoomPatterns {
    pub fn compile(config: &AgencyConfig) -> Result<Self, ConfigError> {
        let defaults = AgencyConfig::default();
        let bed_kw = keyword_alternation(non_empty_or(&config.bedroom_keywords, &defaults.bedroom_keywords));
        let bath_kw = keyword_alternation(non_empty_or(&config.bathroom_keywords, &defaults.bathroom_keywords));

        let ensuite = if config.bathroom_ensuite_regex {
            let patterns = config
                .bathroom_ensuite_markers
                .iter()
                .filter(|m| !m.trim().is_empty())
                .map(|m| compile_pattern(&format!("(?i){}", m)))
                .collect::<Result<Vec<_>, _>>()?;
            EnsuiteMatcher::Pattern(patterns)
        } else {
            EnsuiteMatcher::Literal(
                config
                    .bathroom_ensuite_markers
                    .iter()
                    .map(|m| fold(m.trim()))
                    .filter(|m| !m.is_empty())
                    .collect(),
            )
        };

        Ok(Self {
            bed_numeric: compile_pattern(&format!(
                r"(?i)\(?\s*(?P<n>\d{{1,2}})\s*\)?\s*(?:{})",
                bed_kw
            ))?,
            bed_word: compile_pattern(&format!(r"(?i)\b(?P<w>{})\s+(?:{})", NUMBER_WORDS, bed_kw))?,
            bed_short: compile_pattern(r"(?i)\b(?P<n>\d{1,2})\s?h\b")?,
            bath_and_half: compile_pattern(&format!(
                r"(?i)(?:\b(?P<w>{})|(?P<n>\d{{1,2}}))\s+y\s+medio\s+(?:{})",
                NUMBER_WORDS, bath_kw
            ))?,
            bath_numeric: compile_pattern(&format!(
                r"(?i)(?:(?P<solo>½|1/2)|(?P<n>\d{{1,2}}(?:[.,]\d)?)(?:\s*(?P<half>1/2|½))?)\s*(?:{})",
                bath_kw
            ))?,
            bath_word: compile_pattern(&format!(r"(?i)\b(?P<w>{})\s+(?:{})", NUMBER_WORDS, bath_kw))?,
            bath_short: compile_pattern(r"(?i)\b(?P<n>\d{1,2})\s?b\b")?,
            slash: compile_pattern(r"(?P<bed>\d{1,2})\s*/\s*(?P<bath>\d{1,2}(?:[.,]5)?)")?,
            slash_context: config
                .slash_context_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            ensuite,
            infer_from_bedrooms: config.bathroom_infer_from_bedrooms,
            hint_bedrooms: config.hint_bedrooms,
            allow_slash: config.allow_slash_bed_bath,
        })
    }

    pub fn extract(&self, text: &str) -> RoomExtraction {
        let slash = self.slash_pair(text);

        let mut mentions: Vec<(usize, u32)> = self
            .bed_numeric
            .captures_iter(text)
            .filter_map(|caps| self.digit_count(text, &caps))
            .chain(
                self.bed_word
                    .captures_iter(text)
                    .filter_map(|caps| self.word_count(text, &caps)),
            )
            .filter(|(_, n)| *n > 0 && *n < MAX_ROOM_COUNT)
            .collect();
        mentions.sort_by_key(|(pos, _)| *pos);

        let distinct_bedrooms = mentions.iter().map(|(_, n)| *n).collect::<BTreeSet<_>>().len();

        let bedrooms = mentions
            .first()
            .map(|(_, n)| *n)
            .or_else(|| self.short_count(&self.bed_short, text))
            .or_else(|| slash.map(|(bed, _)| bed));

        let mut bathrooms = self.bath_and_half_count(text);
        let mut half_accounted = bathrooms.is_some();
        if bathrooms.is_none() {
            if let Some((value, half)) = self.bath_numeric_count(text) {
                half_accounted = half;
                bathrooms = Some(value);
            }
        }
        bathrooms = bathrooms
            .or_else(|| {
                self.bath_word
                    .captures_iter(text)
                    .find_map(|caps| self.word_count(text, &caps))
                    .map(|(_, n)| f64::from(n))
            })
            .or_else(|| self.short_count(&self.bath_short, text).map(f64::from))
            .or_else(|| slash.map(|(_, bath)| bath));

        if bathrooms.is_none() && self.infer_from_bedrooms && self.ensuite.is_match(text) {
            bathrooms = bedrooms.or(self.hint_bedrooms).map(f64::from);
            if bathrooms.is_some() {
                tracing::trace!("Bathrooms inferred from ensuite marker: {:?}", bathrooms);
            }
        }

        if !half_accounted && HALF_BATH.is_match(text) {
            bathrooms = Some(bathrooms.map_or(0.5, |b| b + 0.5));
        }

        RoomExtraction {
            bedrooms,
            bathrooms,
            distinct_bedrooms,
        }
    }

    /// A "(3) habitaciones" style count with its position.
    fn digit_count(&self, text: &str, caps: &Captures<'_>) -> Option<(usize, u32)> {
        let whole = caps.get(0)?;
        let n = caps.name("n")?;
        if starts_inside_number(text, n.start()) || ends_inside_word(text, whole.end()) {
            return None;
        }
        Some((whole.start(), n.as_str().parse().ok()?))
    }

    fn word_count(&self, text: &str, caps: &Captures<'_>) -> Option<(usize, u32)> {
        let whole = caps.get(0)?;
        if ends_inside_word(text, whole.end()) {
            return None;
        }
        Some((whole.start(), word_to_number(caps.name("w")?.as_str())?))
    }

    fn short_count(&self, pattern: &Regex, text: &str) -> Option<u32> {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.name("n")?.as_str().parse::<u32>().ok())
            .find(|n| *n > 0 && *n < MAX_ROOM_COUNT)
    }

    fn bath_and_half_count(&self, text: &str) -> Option<f64> {
        self.bath_and_half.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            if ends_inside_word(text, whole.end()) {
                return None;
            }
            let base = match (caps.name("n"), caps.name("w")) {
                (Some(n), _) if !starts_inside_number(text, n.start()) => n.as_str().parse().ok()?,
                (None, Some(w)) => word_to_number(w.as_str())?,
                _ => return None,
            };
            (base < MAX_ROOM_COUNT).then(|| f64::from(base) + 0.5)
        })
    }

    /// Numeric bathroom count and whether the match already carried a half.
    fn bath_numeric_count(&self, text: &str) -> Option<(f64, bool)> {
        self.bath_numeric.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            if ends_inside_word(text, whole.end()) || starts_inside_number(text, whole.start()) {
                return None;
            }
            if caps.name("solo").is_some() {
                return Some((0.5, true));
            }
            let value: f64 = caps.name("n")?.as_str().replace(',', ".").parse().ok()?;
            if value >= f64::from(MAX_ROOM_COUNT) {
                return None;
            }
            match caps.name("half") {
                Some(_) => Some((value + 0.5, true)),
                None => Some((value, false)),
            }
        })
    }

    /// "Apto 3/2": bedrooms 3, bathrooms 2, only near an apartment-like word.
    fn slash_pair(&self, text: &str) -> Option<(u32, f64)> {
        if !self.allow_slash {
            return None;
        }

        self.slash.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            if char_before(text, whole.start())
                .map_or(false, |c| c.is_ascii_digit() || matches!(c, '$' | '/' | '.' | ','))
            {
                return None;
            }
            match char_after(text, whole.end()) {
                Some(c) if c.is_ascii_digit() || c == '/' => return None,
                Some('.') | Some(',') => {
                    if text[whole.end() + 1..].starts_with(|c: char| c.is_ascii_digit()) {
                        return None;
                    }
                }
                _ => {}
            }
            if SLASH_TAIL_REJECT.is_match(text[whole.end()..].trim_start())
                || SLASH_LEAD_REJECT.is_match(&text[..whole.start()])
            {
                return None;
            }

            let before = window_before(text, whole.start(), SLASH_CONTEXT_WINDOW);
            let after = window_after(text, whole.end(), SLASH_CONTEXT_WINDOW);
            if !self
                .slash_context
                .iter()
                .any(|k| before.contains(k.as_str()) || after.contains(k.as_str()))
            {
                return None;
            }

            let bed: u32 = caps.name("bed")?.as_str().parse().ok()?;
            let bath: f64 = caps.name("bath")?.as_str().replace(',', ".").parse().ok()?;
            if bed == 0 || bed >= MAX_ROOM_COUNT || bath <= 0.0 || bath > MAX_SLASH_BATHROOMS {
                return None;
            }
            Some((bed, bath))
        })
    }
}

fn non_empty_or<'a>(configured: &'a [String], fallback: &'a [String]) -> &'a [String] {
    if configured.iter().any(|k| !k.trim().is_empty()) {
        configured
    } else {
        fallback
    }
}

fn starts_inside_number(text: &str, start: usize) -> bool {
    char_before(text, start).map_or(false, |c| c.is_ascii_digit() || c == '.' || c == ',')
}

fn ends_inside_word(text: &str, end: usize) -> bool {
    let keyword_ends_in_letter = char_before(text, end).map_or(false, |c| c.is_alphabetic());
    keyword_ends_in_letter && char_after(text, end).map_or(false, |c| c.is_alphabetic())
}

/// Lower-case and drop diacritics ("Habitación" -> "habitacion").
fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
