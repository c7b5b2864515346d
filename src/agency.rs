use std::collections::HashSet;

use crate::classifier::KeywordTable;
use crate::config::{AgencyConfig, ListingMarker};
use crate::error::ConfigError;
use crate::extractors::{AreaPatterns, PricePatterns, RoomPatterns, TransactionMatcher};
use crate::normalizer::TextVariant;
use crate::section::{SectionContext, SectionRules};

/// An agency configuration with every pattern compiled.
///
/// Built once per agency and shared read-only (it is `Send + Sync`) by the
/// segmenter and every extraction pass. Construction is the only place a
/// configuration can be rejected.
#[derive(Debug, Clone)]
pub struct CompiledAgency {
    config: AgencyConfig,
    pub(crate) prices: PricePatterns,
    pub(crate) areas: AreaPatterns,
    pub(crate) rooms: RoomPatterns,
    pub(crate) transactions: TransactionMatcher,
    pub(crate) keywords: KeywordTable,
    sections: SectionRules,
    start_exceptions: HashSet<String>,
    header_guards: HashSet<String>,
    bullet_leaders: Vec<String>,
}

impl CompiledAgency {
    pub fn new(config: AgencyConfig) -> Result<Self, ConfigError> {
        if config.header_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyHeaderPrefix);
        }
        if config.bullet_leader.trim().is_empty() {
            return Err(ConfigError::EmptyBulletLeader);
        }

        let keywords = KeywordTable::new(&config.type_keywords)?;
        let prices = PricePatterns::compile(
            &config.currency_aliases,
            config.multi_price_policy,
            config.price_accept_magnitudes,
        )?;
        let areas = AreaPatterns::compile(&config.area_aliases, &config.currency_aliases)?;
        let rooms = RoomPatterns::compile(&config)?;
        let transactions = TransactionMatcher::compile(&config.transaction_keywords)?;
        let sections = SectionRules::compile(config.header_prefix.trim(), &config.section_headers)?;

        let start_exceptions = config
            .start_exceptions
            .iter()
            .map(|w| start_word(w))
            .filter(|w| !w.is_empty())
            .collect();
        let header_guards = config
            .header_guards
            .iter()
            .map(|w| w.trim().to_uppercase())
            .filter(|w| !w.is_empty())
            .collect();

        // Canonical leader first, then the alternates normalized onto it
        let mut bullet_leaders = vec![config.bullet_leader.trim().to_string()];
        for alt in &config.bullet_alternates {
            let alt = alt.trim();
            if !alt.is_empty() && !bullet_leaders.iter().any(|l| l == alt) {
                bullet_leaders.push(alt.to_string());
            }
        }

        tracing::debug!(
            "Compiled agency '{}': {} marker, {} categories, {} start exceptions",
            config.name,
            config.listing_marker,
            keywords.categories().count(),
            config.start_exceptions.len()
        );

        Ok(Self {
            config,
            prices,
            areas,
            rooms,
            transactions,
            keywords,
            sections,
            start_exceptions,
            header_guards,
            bullet_leaders,
        })
    }

    pub fn config(&self) -> &AgencyConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn listing_marker(&self) -> ListingMarker {
        self.config.listing_marker
    }

    pub fn text_variant(&self) -> TextVariant {
        self.config.text_variant
    }

    pub fn header_prefix(&self) -> &str {
        self.config.header_prefix.trim()
    }

    /// Canonical leader followed by the accepted alternates.
    pub fn bullet_leaders(&self) -> &[String] {
        &self.bullet_leaders
    }

    pub fn is_header(&self, line: &str) -> bool {
        line.trim_start().starts_with(self.header_prefix())
    }

    /// Whole line is one of the guard words ("VENTA", "ALQUILER:").
    pub fn is_guard_header(&self, line: &str) -> bool {
        let word = line.trim().trim_end_matches(|c: char| c == ':' || c == '.').trim();
        word.chars().any(|c| c.is_alphabetic())
            && word == word.to_uppercase()
            && self.header_guards.contains(word)
    }

    /// The first word of `line` is in `start_exceptions` (compared upper-cased,
    /// punctuation stripped).
    pub fn is_start_exception(&self, line: &str) -> bool {
        line.split_whitespace()
            .next()
            .map(start_word)
            .map_or(false, |w| self.start_exceptions.contains(&w))
    }

    pub fn starts_with_price(&self, line: &str) -> bool {
        self.prices.starts_with_price(line)
    }

    pub fn is_price_only(&self, line: &str) -> bool {
        self.prices.is_price_only(line)
    }

    pub fn section_context(&self, header: &str) -> SectionContext {
        self.sections.detect(header)
    }
}

fn start_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase()
}
