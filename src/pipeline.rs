use rayon::prelude::*;

use crate::agency::CompiledAgency;
use crate::models::{ParsedRecord, PropertyType, RawSegment, Segment};
use crate::neighborhood::{match_neighborhood, NeighborhoodDictionary};
use crate::normalizer::{normalize, TextVariant};
use crate::section::SectionContext;
use crate::segmenter::segment;

const TITLE_CHARS: usize = 140;

/// Runs the whole flow for one agency: segmentation, normalization, field
/// extraction, neighborhood matching and classification.
#[derive(Debug, Clone, Copy)]
pub struct ListingParser<'a> {
    agency: &'a CompiledAgency,
    dictionary: Option<&'a NeighborhoodDictionary>,
    variant: TextVariant,
}

impl<'a> ListingParser<'a> {
    pub fn new(agency: &'a CompiledAgency) -> Self {
        Self {
            agency,
            dictionary: None,
            variant: agency.text_variant(),
        }
    }

    pub fn with_dictionary(mut self, dictionary: &'a NeighborhoodDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn with_variant(mut self, variant: TextVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn agency(&self) -> &CompiledAgency {
        self.agency
    }

    /// Segment with the agency's own listing marker.
    pub fn segment<S: AsRef<str>>(&self, lines: &[S]) -> Vec<Segment> {
        segment(lines, self.agency.listing_marker(), self.agency, false)
    }

    /// Extract one record. Never fails: every field that cannot be found is `None`.
    pub fn parse_segment(&self, raw: &RawSegment, context: &SectionContext) -> ParsedRecord {
        let agency = self.agency;
        let text = normalize(&raw.text, self.variant);

        let prices = agency.prices.extract(&text);
        let areas = agency.areas.extract(&text);
        let rooms = agency.rooms.extract(&text);
        let classification = agency.keywords.classify(&text);

        // Header type only fills in when the text itself says nothing
        let property_type = match (&classification.winner, &context.property_type) {
            (PropertyType::Other, Some(fallback)) => fallback.clone(),
            (winner, _) => winner.clone(),
        };
        let transaction = agency.transactions.detect(&text).or(context.transaction);
        let neighborhood = match_neighborhood(
            &text,
            self.dictionary,
            &agency.config().neighborhood_marker_prefixes,
        );
        let is_multi_offer = prices.distinct_values > 1 || rooms.distinct_bedrooms > 1;

        tracing::trace!(
            "Parsed segment at lines {:?}: {} ({} pts), price {:?}",
            raw.lines,
            property_type,
            classification.winner_score(),
            prices.price
        );

        ParsedRecord {
            title: text.chars().take(TITLE_CHARS).collect(),
            text: raw.text.clone(),
            source_lines: raw.lines.clone(),
            bedrooms: rooms.bedrooms,
            bathrooms: rooms.bathrooms,
            area_built: areas.built,
            area_built_m2: areas.built.map(|a| a.square_meters()),
            area_lot: areas.lot,
            area_lot_m2: areas.lot.map(|a| a.square_meters()),
            price: prices.price,
            currency: prices.currency,
            prices_found: prices.prices_found,
            property_type,
            classification,
            neighborhood,
            transaction,
            category: context.category.clone(),
            is_multi_offer,
        }
    }

    /// Extract a record from free text outside any section.
    pub fn parse_text(&self, text: &str) -> ParsedRecord {
        let raw = RawSegment {
            text: text.to_string(),
            lines: Vec::new(),
        };
        self.parse_segment(&raw, &SectionContext::default())
    }

    /// Segment one source file's lines and parse every listing in order.
    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> Vec<ParsedRecord> {
        let records: Vec<ParsedRecord> = self
            .contextualize(lines)
            .iter()
            .map(|(raw, context)| self.parse_segment(raw, context))
            .collect();
        tracing::debug!("Parsed {} records for agency '{}'", records.len(), self.agency.name());
        records
    }

    /// Same output as [`parse_lines`](Self::parse_lines), with segments
    /// parsed on the rayon pool.
    pub fn parse_lines_parallel<S: AsRef<str>>(&self, lines: &[S]) -> Vec<ParsedRecord> {
        let records: Vec<ParsedRecord> = self
            .contextualize(lines)
            .par_iter()
            .map(|(raw, context)| self.parse_segment(raw, context))
            .collect();
        tracing::debug!(
            "Parsed {} records for agency '{}' in parallel",
            records.len(),
            self.agency.name()
        );
        records
    }

    /// Pair every listing with the context of the most recent header.
    fn contextualize<S: AsRef<str>>(&self, lines: &[S]) -> Vec<(RawSegment, SectionContext)> {
        let mut context = SectionContext::default();
        let mut listings = Vec::new();

        for seg in self.segment(lines) {
            match seg {
                Segment::Header(header) => {
                    context = self.agency.section_context(&header.text);
                    tracing::debug!("Entering section '{}' ({:?})", header.text, context);
                }
                Segment::Listing(raw) => listings.push((raw, context.clone())),
            }
        }

        listings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgencyConfig;
    use crate::models::{AreaUnit, Transaction};

    fn agency() -> CompiledAgency {
        CompiledAgency::new(AgencyConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_text_fields() {
        let agency = agency();
        let parser = ListingParser::new(&agency);
        let record = parser.parse_text("Casa en venta, 3 habitaciones 2 baños, 150 mts2 en 300 vrs2, $ 180,000");

        assert_eq!(record.property_type, PropertyType::House);
        assert_eq!(record.transaction, Some(Transaction::Sale));
        assert_eq!(record.bedrooms, Some(3));
        assert_eq!(record.bathrooms, Some(2.0));
        assert_eq!(record.area_built.map(|a| a.unit), Some(AreaUnit::SquareMeters));
        assert_eq!(record.area_built_m2, Some(150.0));
        assert_eq!(record.area_lot.map(|a| a.value), Some(300.0));
        assert!((record.area_lot_m2.unwrap() - 300.0 * 0.698896).abs() < 1e-6);
        assert_eq!(record.price, Some(180000.0));
        assert_eq!(record.currency.as_deref(), Some("USD"));
        assert!(!record.is_multi_offer);
        assert!(record.has_sufficient_info());
    }

    #[test]
    fn test_parse_text_title_is_truncated() {
        let agency = agency();
        let parser = ListingParser::new(&agency);
        let long = "Casa amplia ".repeat(30);
        let record = parser.parse_text(&long);
        assert_eq!(record.title.chars().count(), 140);
        assert!(record.title.starts_with("casa amplia"));
    }

    #[test]
    fn test_header_context_is_inherited() {
        let agency = agency();
        let parser = ListingParser::new(&agency);
        let lines = [
            "# TERRENOS EN ALQUILER",
            "* Propiedad de 2 manzanas con acceso, L. 20,000",
            "* Terreno plano en venta",
        ];
        let records = parser.parse_lines(&lines);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].property_type, PropertyType::Land);
        assert_eq!(records[0].classification.winner, PropertyType::Other);
        assert_eq!(records[0].transaction, Some(Transaction::Rent));
        assert_eq!(records[0].category.as_deref(), Some("TERRENOS EN ALQUILER"));
        assert_eq!(records[0].source_lines, vec![1]);

        // Listing-level transaction wins over the header
        assert_eq!(records[1].transaction, Some(Transaction::Sale));
    }

    #[test]
    fn test_multi_offer_from_bedroom_counts() {
        let agency = agency();
        let parser = ListingParser::new(&agency);
        let record = parser.parse_text("Aptos de 2 habitaciones y 3 habitaciones, $ 900");
        assert!(record.is_multi_offer);
        assert_eq!(record.bedrooms, Some(2));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let agency = agency();
        let parser = ListingParser::new(&agency);
        let lines: Vec<String> = (1..=40)
            .map(|i| format!("* Apto {} habitaciones en torre, $ {},000", i % 5 + 1, i * 10))
            .collect();
        let sequential = parser.parse_lines(&lines);
        let parallel = parser.parse_lines_parallel(&lines);
        assert_eq!(sequential.len(), 40);
        assert_eq!(sequential, parallel);
    }
}
