use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::models::{Classification, PropertyType};
use crate::normalizer::normalize_line;

/// Type keyword table with phrases canonicalized the way segment text is.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTable {
    categories: BTreeMap<PropertyType, Vec<String>>,
}

impl KeywordTable {
    /// Build the table from `type_keywords`. Built-in categories are always
    /// present (possibly with no phrases); a table with no phrases at all is
    /// a configuration error.
    pub fn new(type_keywords: &BTreeMap<PropertyType, Vec<String>>) -> Result<Self, ConfigError> {
        let mut categories: BTreeMap<PropertyType, Vec<String>> = PropertyType::BUILT_IN
            .iter()
            .map(|t| (t.clone(), Vec::new()))
            .collect();

        for (category, phrases) in type_keywords {
            if *category == PropertyType::Other {
                tracing::warn!("Ignoring keywords configured for the Other category");
                continue;
            }
            let entry = categories.entry(category.clone()).or_default();
            for phrase in phrases {
                let canonical = normalize_line(phrase).to_lowercase();
                if !canonical.is_empty() && !entry.contains(&canonical) {
                    entry.push(canonical);
                }
            }
        }

        if categories.values().all(|phrases| phrases.is_empty()) {
            return Err(ConfigError::MissingCategories);
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> impl Iterator<Item = &PropertyType> {
        self.categories.keys()
    }

    /// Score every category on lower-cased `text` and pick the winner.
    ///
    /// Each distinct phrase found adds one point. The strictly highest score
    /// wins; ties go to the category that sorts first (House, Apartment,
    /// Commercial, Land, then extras). No hits at all gives `Other`.
    pub fn classify(&self, text: &str) -> Classification {
        let scores: BTreeMap<PropertyType, u32> = self
            .categories
            .iter()
            .map(|(category, phrases)| {
                let hits = phrases.iter().filter(|p| text.contains(p.as_str())).count();
                (category.clone(), hits as u32)
            })
            .collect();

        let mut winner = PropertyType::Other;
        let mut best = 0;
        for (category, score) in &scores {
            if *score > best {
                best = *score;
                winner = category.clone();
            }
        }

        Classification { winner, scores }
    }
}

/// One-shot classification against an uncompiled keyword table. An unusable
/// table scores nothing and yields `Other`.
pub fn classify(text: &str, type_keywords: &BTreeMap<PropertyType, Vec<String>>) -> Classification {
    match KeywordTable::new(type_keywords) {
        Ok(table) => table.classify(&text.to_lowercase()),
        Err(_) => Classification {
            winner: PropertyType::Other,
            scores: PropertyType::BUILT_IN.iter().map(|t| (t.clone(), 0)).collect(),
        },
    }
}
