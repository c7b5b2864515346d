use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use super::numeric::{parse_number, round2};
use super::{char_after, char_before, compile_pattern, keyword_alternation};
use crate::config::MultiPricePolicy;
use crate::error::ConfigError;

/// A thousands-grouped figure ("1,250,000", "1.200,50") or a plain one ("650", "2,5").
pub(crate) const NUMBER_PATTERN: &str =
    r"\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?";

const MAGNITUDE_PATTERN: &str = "millones|millón|millon|mil|mm|k";

// "$ 15 /vrs²", "l. 800 x m²", "$ 20 por vara"
static UNIT_PRICE_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:/|x\b|por\b)?\s*(?:vrs²|vrs|varas?\b|v²|m²|mz\b|manzanas?\b)")
        .expect("valid unit price regex")
});

/// Words a price-only line may carry besides the figures.
const PRICE_FILLER: &[&str] = &[
    "precio", "mensual", "mensuales", "mes", "al", "negociable", "neg", "por", "venta", "renta",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PriceExtraction {
    pub price: Option<f64>,
    pub currency: Option<String>,
    /// Every accepted price mention in text order, whitespace removed ("$450").
    pub prices_found: Vec<String>,
    pub distinct_values: usize,
}

#[derive(Debug, Clone)]
struct PriceCandidate {
    span: Range<usize>,
    value: f64,
    currency: Option<String>,
    raw: String,
}

/// Currency patterns compiled from `currency_aliases`.
#[derive(Debug, Clone)]
pub struct PricePatterns {
    prefix: Regex,
    suffix: Regex,
    aliases: BTreeMap<String, String>,
    policy: MultiPricePolicy,
}

impl PricePatterns {
    pub fn compile(
        currency_aliases: &BTreeMap<String, String>,
        policy: MultiPricePolicy,
        accept_magnitudes: bool,
    ) -> Result<Self, ConfigError> {
        let mut aliases: BTreeMap<String, String> = currency_aliases
            .iter()
            .map(|(alias, code)| (alias.trim().to_lowercase(), code.trim().to_uppercase()))
            .filter(|(alias, _)| !alias.is_empty())
            .collect();
        if aliases.is_empty() {
            tracing::debug!("No currency aliases configured, using the built-in table");
            aliases = crate::config::default_currency_aliases()
                .into_iter()
                .map(|(alias, code)| (alias.to_lowercase(), code))
                .collect();
        }

        let keys: Vec<&String> = aliases.keys().collect();
        let currency = keyword_alternation(&keys);
        let magnitude = if accept_magnitudes {
            format!(r"(?:\s*(?P<mag>{})\b)?", MAGNITUDE_PATTERN)
        } else {
            String::new()
        };

        let prefix_src = format!(
            r"(?i)(?P<cur>{})\s*(?P<num>{}){}",
            currency, NUMBER_PATTERN, magnitude
        );
        let suffix_src = format!(
            r"(?i)(?P<num>{}){}\s*(?P<cur>{})",
            NUMBER_PATTERN, magnitude, currency
        );

        Ok(Self {
            prefix: compile_pattern(&prefix_src)?,
            suffix: compile_pattern(&suffix_src)?,
            aliases,
            policy,
        })
    }

    /// Find every listing price in `text` and pick one according to the
    /// configured policy (highest by default).
    pub fn extract(&self, text: &str) -> PriceExtraction {
        let candidates = self.candidates(text);

        let chosen = match self.policy {
            MultiPricePolicy::First => candidates.first(),
            MultiPricePolicy::Max => candidates.iter().fold(None, |best: Option<&PriceCandidate>, c| {
                match best {
                    Some(b) if b.value >= c.value => Some(b),
                    _ => Some(c),
                }
            }),
        };

        let distinct_values = candidates
            .iter()
            .map(|c| (c.value * 100.0).round() as i64)
            .collect::<BTreeSet<_>>()
            .len();

        PriceExtraction {
            price: chosen.map(|c| c.value),
            currency: chosen.and_then(|c| c.currency.clone()),
            prices_found: candidates.iter().map(|c| c.raw.clone()).collect(),
            distinct_values,
        }
    }

    /// The line opens with a price ("$ 1,200 negociable").
    pub fn starts_with_price(&self, text: &str) -> bool {
        let trimmed = text.trim_start();
        self.candidates(trimmed).first().map_or(false, |c| c.span.start == 0)
    }

    /// The line holds prices and nothing else worth keeping on its own
    /// ("$ 85,000", "Precio: L. 9,500 mensual").
    pub fn is_price_only(&self, text: &str) -> bool {
        let candidates = self.candidates(text);
        if candidates.is_empty() {
            return false;
        }

        let mut rest = String::with_capacity(text.len());
        let mut cursor = 0;
        for c in &candidates {
            rest.push_str(&text[cursor..c.span.start]);
            rest.push(' ');
            cursor = c.span.end;
        }
        rest.push_str(&text[cursor..]);

        rest.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .all(|w| PRICE_FILLER.contains(&w))
    }

    fn candidates(&self, text: &str) -> Vec<PriceCandidate> {
        let mut candidates: Vec<PriceCandidate> = self
            .prefix
            .captures_iter(text)
            .filter_map(|caps| self.candidate(text, &caps, true))
            .collect();

        let suffix_candidates: Vec<PriceCandidate> = self
            .suffix
            .captures_iter(text)
            .filter_map(|caps| self.candidate(text, &caps, false))
            .filter(|c| {
                !candidates
                    .iter()
                    .any(|p| c.span.start < p.span.end && p.span.start < c.span.end)
            })
            .collect();

        candidates.extend(suffix_candidates);
        candidates.sort_by_key(|c| c.span.start);
        candidates
    }

    fn candidate(&self, text: &str, caps: &Captures<'_>, prefix: bool) -> Option<PriceCandidate> {
        let whole = caps.get(0)?;
        let num = caps.name("num")?;
        let cur = caps.name("cur")?;

        // "1,2345" or "800,1000": the number keeps going, not a price
        match char_after(text, num.end()) {
            Some(c) if c.is_ascii_digit() => return None,
            Some('.') | Some(',') => {
                if text[num.end() + 1..].starts_with(|c: char| c.is_ascii_digit()) {
                    return None;
                }
            }
            _ => {}
        }

        if prefix {
            if cur.as_str().starts_with(|c: char| c.is_alphabetic())
                && char_before(text, cur.start()).map_or(false, |c| c.is_alphabetic())
            {
                return None;
            }
        } else {
            if char_before(text, num.start()).map_or(false, |c| c.is_alphanumeric() || c == '.' || c == ',') {
                return None;
            }
            if cur.as_str().ends_with(|c: char| c.is_alphabetic())
                && char_after(text, cur.end()).map_or(false, |c| c.is_alphabetic())
            {
                return None;
            }
        }

        if UNIT_PRICE_TAIL.is_match(&text[whole.end()..]) {
            tracing::debug!("Skipping unit price '{}'", whole.as_str());
            return None;
        }

        let mut value = parse_number(num.as_str())?;
        if let Some(mag) = caps.name("mag") {
            value *= match mag.as_str().to_lowercase().as_str() {
                "k" | "mil" => 1_000.0,
                _ => 1_000_000.0,
            };
        }
        if value <= 0.0 {
            return None;
        }

        let currency = self.aliases.get(&cur.as_str().to_lowercase()).cloned();

        Some(PriceCandidate {
            span: whole.start()..whole.end(),
            value: round2(value),
            currency,
            raw: whole.as_str().chars().filter(|c| !c.is_whitespace()).collect(),
        })
    }
}
