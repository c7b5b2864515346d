use regex::Regex;

use super::{compile_pattern, keyword_alternation};
use crate::config::TransactionKeywords;
use crate::error::ConfigError;
use crate::models::Transaction;

/// Word-bounded sale/rent token matcher.
#[derive(Debug, Clone)]
pub struct TransactionMatcher {
    sale: Option<Regex>,
    rent: Option<Regex>,
    ambiguous: Option<Regex>,
}

impl TransactionMatcher {
    pub fn compile(keywords: &TransactionKeywords) -> Result<Self, ConfigError> {
        Ok(Self {
            sale: token_pattern(&keywords.sale)?,
            rent: token_pattern(&keywords.rent)?,
            ambiguous: token_pattern(&keywords.ambiguous)?,
        })
    }

    /// Listing-level transaction. Mixed signals ("venta o renta", or hits on
    /// both sides) give `None` so the section context can decide.
    pub fn detect(&self, text: &str) -> Option<Transaction> {
        if is_match(&self.ambiguous, text) {
            return None;
        }

        match (is_match(&self.sale, text), is_match(&self.rent, text)) {
            (true, false) => Some(Transaction::Sale),
            (false, true) => Some(Transaction::Rent),
            _ => None,
        }
    }
}

fn is_match(pattern: &Option<Regex>, text: &str) -> bool {
    pattern.as_ref().map_or(false, |re| re.is_match(text))
}

fn token_pattern(tokens: &[String]) -> Result<Option<Regex>, ConfigError> {
    let alternation = keyword_alternation(tokens);
    if alternation.is_empty() {
        return Ok(None);
    }
    compile_pattern(&format!(r"(?i)(?:^|\W)(?:{})(?:\W|$)", alternation)).map(Some)
}
