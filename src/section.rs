use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SectionHeaderRule;
use crate::error::ConfigError;
use crate::extractors::compile_pattern;
use crate::models::{PropertyType, Transaction};

/// Context a header line sets for the listings below it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionContext {
    pub transaction: Option<Transaction>,
    pub property_type: Option<PropertyType>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    rule: SectionHeaderRule,
}

/// Compiled `section_headers` table.
#[derive(Debug, Clone)]
pub struct SectionRules {
    prefix: String,
    rules: Vec<CompiledRule>,
}

impl SectionRules {
    pub fn compile(prefix: &str, rules: &[SectionHeaderRule]) -> Result<Self, ConfigError> {
        let compiled = rules
            .iter()
            .filter(|r| !r.pattern.trim().is_empty())
            .map(|rule| {
                Ok(CompiledRule {
                    regex: compile_pattern(&format!("(?i){}", rule.pattern))?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            prefix: prefix.to_string(),
            rules: compiled,
        })
    }

    /// Read the context out of a header line ("# APARTAMENTOS EN ALQUILER").
    ///
    /// The configured rule with the longest matching span wins; without one,
    /// keywords in the header decide.
    pub fn detect(&self, header: &str) -> SectionContext {
        let text = header.trim_start_matches('\u{feff}').trim_start();
        let title = text
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(text)
            .trim_matches(|c: char| c.is_whitespace() || c == ':');

        let best = self
            .rules
            .iter()
            .filter_map(|c| c.regex.find(text).map(|m| (m.end() - m.start(), &c.rule)))
            .fold(None, |best: Option<(usize, &SectionHeaderRule)>, (len, rule)| match best {
                Some((best_len, _)) if best_len >= len => best,
                _ => Some((len, rule)),
            });

        if let Some((_, rule)) = best {
            tracing::debug!("Header '{}' matched section rule '{}'", title, rule.pattern);
            return SectionContext {
                transaction: rule.transaction,
                property_type: rule.property_type.clone(),
                category: rule.category.clone().or_else(|| Some(title.to_string())),
            };
        }

        let upper = title.to_uppercase();
        let transaction = if upper.contains("ALQUIL") {
            Some(Transaction::Rent)
        } else if upper.contains("VENTA") {
            Some(Transaction::Sale)
        } else {
            None
        };
        let property_type = if upper.contains("APART") {
            Some(PropertyType::Apartment)
        } else if upper.contains("CASA") {
            Some(PropertyType::House)
        } else if upper.contains("BODEGA") || upper.contains("PROPIEDADES COMERCIALES") {
            Some(PropertyType::Commercial)
        } else if upper.contains("TERRENO") {
            Some(PropertyType::Land)
        } else {
            None
        };

        SectionContext {
            transaction,
            property_type,
            category: (!upper.is_empty()).then_some(upper),
        }
    }
}
