use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::numeric::parse_number;
use super::price::NUMBER_PATTERN;
use super::{char_after, char_before, compile_pattern, keyword_alternation, window_before};
use crate::config::AreaAliases;
use crate::error::ConfigError;
use crate::models::{Area, AreaUnit, MANZANA_TO_VARA2};
use crate::normalizer::normalize_line;

static LOT_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\p{L}])a\.?\s?t\.?\s*:\s*$").expect("valid lot label regex"));
static BUILT_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\p{L}])a\.?\s?c\.?\s*:\s*$").expect("valid built label regex"));
static LOT_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:terreno|lote|solar|parcela)\b").expect("valid lot words regex"));

/// How far back (in characters) a label or lot word may sit from the figure.
const CONTEXT_WINDOW: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AreaExtraction {
    pub built: Option<Area>,
    pub lot: Option<Area>,
}

#[derive(Debug, Clone)]
struct UnitPattern {
    regex: Regex,
    unit: AreaUnit,
}

/// Numeric-then-unit patterns for each area role, in configured order.
#[derive(Debug, Clone)]
pub struct AreaPatterns {
    built: Vec<UnitPattern>,
    lot: Vec<UnitPattern>,
    manzana: Vec<UnitPattern>,
    currency_tokens: Vec<String>,
}

impl AreaPatterns {
    pub fn compile(
        aliases: &AreaAliases,
        currency_aliases: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let has_built = aliases.built.iter().any(|a| !a.trim().is_empty());
        let has_lot = aliases.lot.iter().any(|a| !a.trim().is_empty());
        if !has_built && !has_lot {
            return Err(ConfigError::MissingUnitAliases);
        }

        let mut currency_tokens: Vec<String> = currency_aliases
            .keys()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if !currency_tokens.iter().any(|t| t == "$") {
            currency_tokens.push("$".to_string());
        }

        Ok(Self {
            built: compile_role(&aliases.built)?,
            lot: compile_role(&aliases.lot)?,
            manzana: compile_role(&aliases.manzana)?,
            currency_tokens,
        })
    }

    /// Extract built and lot area independently.
    ///
    /// Lot: first vara figure, else a manzana figure converted to vara², else
    /// a square-meter figure labelled "AT:" or sitting right after a lot word
    /// ("terreno de 500 m²"). Built: first remaining unit figure.
    pub fn extract(&self, text: &str) -> AreaExtraction {
        let mut built: Option<Area> = None;
        let mut lot_from_meters: Option<Area> = None;

        for pattern in &self.built {
            for (value, num_start) in self.valid_matches(pattern, text) {
                let area = Area::new(value, pattern.unit);
                if pattern.unit == AreaUnit::SquareMeters && is_lot_context(text, num_start) {
                    if lot_from_meters.is_none() {
                        tracing::trace!("Reading {} m² as lot area", value);
                        lot_from_meters = Some(area);
                    }
                } else if built.is_none() {
                    built = Some(area);
                }
            }
        }

        let lot = self
            .first_match(&self.lot, text)
            .or_else(|| {
                self.first_match(&self.manzana, text).map(|mz| {
                    Area::new(mz.value * MANZANA_TO_VARA2, AreaUnit::SquareVaras)
                })
            })
            .or(lot_from_meters);

        AreaExtraction { built, lot }
    }

    fn first_match(&self, patterns: &[UnitPattern], text: &str) -> Option<Area> {
        patterns.iter().find_map(|pattern| {
            self.valid_matches(pattern, text)
                .first()
                .map(|(value, _)| Area::new(*value, pattern.unit))
        })
    }

    fn valid_matches(&self, pattern: &UnitPattern, text: &str) -> Vec<(f64, usize)> {
        pattern
            .regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let num = caps.name("num")?;

                // "120 m²x" or "vrs²²": the unit is part of a longer token
                if char_after(text, whole.end()).map_or(false, |c| c.is_alphanumeric() || c == '²') {
                    return None;
                }
                if char_before(text, num.start())
                    .map_or(false, |c| c.is_ascii_digit() || c == '.' || c == ',')
                {
                    return None;
                }

                // A figure right after a currency sign is a price, never an area
                let before = text[..num.start()].trim_end();
                if self.currency_tokens.iter().any(|t| ends_with_token(before, t)) {
                    return None;
                }

                let value = parse_number(num.as_str())?;
                (value > 0.0).then_some((value, num.start()))
            })
            .collect()
    }
}

fn compile_role(aliases: &[String]) -> Result<Vec<UnitPattern>, ConfigError> {
    let mut seen: Vec<String> = Vec::new();
    let mut patterns = Vec::new();

    for alias in aliases {
        let trimmed = alias.trim();
        if trimmed.is_empty() {
            continue;
        }
        let unit = AreaUnit::from_token(trimmed)
            .ok_or_else(|| ConfigError::UnknownAreaUnit(trimmed.to_string()))?;

        // Match the alias the way it reads after normalization ("mts2" -> "m²")
        let canonical = normalize_line(trimmed).to_lowercase();
        if seen.contains(&canonical) {
            continue;
        }

        let src = format!(
            r"(?i)(?P<num>{})\s*(?:{})",
            NUMBER_PATTERN,
            keyword_alternation(&[canonical.as_str()])
        );
        patterns.push(UnitPattern {
            regex: compile_pattern(&src)?,
            unit,
        });
        seen.push(canonical);
    }

    Ok(patterns)
}

/// `text` ends with `token`, and a word token ("l.") is not the tail of a longer word ("col.").
fn ends_with_token(text: &str, token: &str) -> bool {
    if !text.ends_with(token) {
        return false;
    }
    let head = &text[..text.len() - token.len()];
    !token.starts_with(|c: char| c.is_alphabetic())
        || !head.ends_with(|c: char| c.is_alphabetic())
}

fn is_lot_context(text: &str, num_start: usize) -> bool {
    let window = window_before(text, num_start, CONTEXT_WINDOW);
    // Only look inside the current clause
    let clause = window.rsplit(|c: char| c == ',' || c == ';').next().unwrap_or(window);

    if BUILT_LABEL.is_match(clause) {
        return false;
    }
    LOT_LABEL.is_match(clause) || LOT_WORDS.is_match(clause)
}
