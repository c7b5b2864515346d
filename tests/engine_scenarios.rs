use listingparse::classifier::classify;
use listingparse::config::default_type_keywords;
use listingparse::models::VARA2_TO_M2;
use listingparse::{
    normalize, AgencyConfig, AreaUnit, CompiledAgency, ListingMarker, ListingParser,
    NeighborhoodDictionary, PropertyType, TextVariant, Transaction,
};

fn compile(config: AgencyConfig) -> CompiledAgency {
    CompiledAgency::new(config).unwrap()
}

#[test]
fn test_dual_currency_rent_is_multi_offer() {
    let agency = compile(AgencyConfig::default());
    let record = ListingParser::new(&agency).parse_text("Apartamento amueblado $450/$500 mensual");

    assert_eq!(record.price, Some(500.0));
    assert_eq!(record.currency.as_deref(), Some("USD"));
    assert_eq!(record.prices_found, vec!["$450".to_string(), "$500".to_string()]);
    assert!(record.is_multi_offer);
    assert_eq!(record.transaction, Some(Transaction::Rent));
}

#[test]
fn test_ensuite_bathrooms_from_hint() {
    let agency = compile(AgencyConfig {
        hint_bedrooms: Some(3),
        ..AgencyConfig::default()
    });
    let parser = ListingParser::new(&agency);

    let record = parser.parse_text("3 habitaciones cada una con su baño, sala y comedor");
    assert_eq!(record.bathrooms, Some(3.0));

    let record = parser.parse_text("3 habitaciones cada una con su baño, medio baño de visitas");
    assert_eq!(record.bathrooms, Some(3.5));
}

#[test]
fn test_slash_bedrooms_bathrooms() {
    let agency = compile(AgencyConfig::default());
    let record = ListingParser::new(&agency).parse_text("Apto 3/2 en Lomas");

    assert_eq!(record.bedrooms, Some(3));
    assert_eq!(record.bathrooms, Some(2.0));
    assert_eq!(record.property_type, PropertyType::Apartment);
    assert_eq!(record.neighborhood.as_deref(), Some("LOMAS"));
}

#[test]
fn test_studio_without_bathrooms() {
    let agency = compile(AgencyConfig::default());
    let record = ListingParser::new(&agency).parse_text("Apto estudio, cocina equipada, precio 650$");

    assert_eq!(record.bathrooms, None);
    assert_eq!(record.bedrooms, None);
    assert_eq!(record.price, Some(650.0));
    assert_eq!(record.currency.as_deref(), Some("USD"));
}

#[test]
fn test_lot_area_conversion() {
    let agency = compile(AgencyConfig::default());
    let parser = ListingParser::new(&agency);

    let record = parser.parse_text("Terreno de 350 Vrs2 en esquina");
    let lot = record.area_lot.unwrap();
    assert_eq!(lot.unit, AreaUnit::SquareVaras);
    assert!((record.area_lot_m2.unwrap() - lot.value * VARA2_TO_M2).abs() < 1e-6);

    let record = parser.parse_text("Oficina de 85 mts2");
    let built = record.area_built.unwrap();
    assert_eq!(built.unit, AreaUnit::SquareMeters);
    assert!((record.area_built_m2.unwrap() - 85.0).abs() < 1e-6);
    assert_eq!(record.area_lot, None);
    assert_eq!(record.area_lot_m2, None);
}

#[test]
fn test_exact_alias_wins_over_fallback() {
    let dictionary = NeighborhoodDictionary::from_yaml_str(
        "- name: Los Próceres\n  aliases: [\"Res. Los Proceres\"]\n",
    )
    .unwrap();
    let agency = compile(AgencyConfig::default());
    let text = "Casa en Res. Los Proceres con piscina";

    let with_dictionary = ListingParser::new(&agency).with_dictionary(&dictionary).parse_text(text);
    assert_eq!(with_dictionary.neighborhood.as_deref(), Some("Los Próceres"));

    let fallback_only = ListingParser::new(&agency).parse_text(text);
    assert_eq!(fallback_only.neighborhood.as_deref(), Some("RES. LOS PROCERES"));
}

#[test]
fn test_classification_is_deterministic_and_prioritized() {
    let keywords = default_type_keywords();
    let first = classify("Casa con terreno amplio", &keywords);
    let second = classify("Casa con terreno amplio", &keywords);
    assert_eq!(first, second);
    assert_eq!(first.winner, PropertyType::House);
    assert_eq!(first.score(&PropertyType::Land), 1);

    let nothing = classify("Excelente oportunidad", &keywords);
    assert_eq!(nothing.winner, PropertyType::Other);
    assert_eq!(nothing.winner_score(), 0);
}

#[test]
fn test_normalize_is_idempotent_on_samples() {
    let samples = [
        "* Casa   en COLONIA Palmira, 120 Mts2 / 200 Vrs, L.12,500",
        "- Apto 3/2 $.550 mensual\n• Residencial Los Álamos",
        "  ",
    ];
    for variant in [TextVariant::Generic, TextVariant::Serpecal, TextVariant::Eugenia] {
        for sample in samples {
            let once = normalize(sample, variant);
            assert_eq!(normalize(&once, variant), once);
        }
    }
}

#[test]
fn test_cue_agency_end_to_end() {
    let agency = compile(AgencyConfig {
        name: "serpecal".to_string(),
        listing_marker: ListingMarker::Cue,
        text_variant: TextVariant::Serpecal,
        ..AgencyConfig::default()
    });
    let lines = [
        "# CASAS EN VENTA",
        "Casa en Colonia Palmira,",
        "3 habitaciones, 2 baños,",
        "250 vrs2, $ 185,000",
        "Townhouse en Lomas del Guijarro",
        "con 2 habitaciones y 2.5 baños",
        "L. 4,500,000",
    ];
    let records = ListingParser::new(&agency).parse_lines(&lines);
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.property_type, PropertyType::House);
    assert_eq!(first.transaction, Some(Transaction::Sale));
    assert_eq!(first.bedrooms, Some(3));
    assert_eq!(first.bathrooms, Some(2.0));
    assert_eq!(first.price, Some(185000.0));
    assert_eq!(first.neighborhood.as_deref(), Some("COL. PALMIRA"));
    assert_eq!(first.category.as_deref(), Some("CASAS EN VENTA"));
    assert_eq!(first.source_lines, vec![1, 2, 3]);

    let second = &records[1];
    assert_eq!(second.bedrooms, Some(2));
    assert_eq!(second.bathrooms, Some(2.5));
    assert_eq!(second.price, Some(4_500_000.0));
    assert_eq!(second.currency.as_deref(), Some("HNL"));
}

#[test]
fn test_numbered_agency_end_to_end() {
    let agency = compile(AgencyConfig {
        listing_marker: ListingMarker::Numbered,
        ..AgencyConfig::default()
    });
    let lines = [
        "ALQUILER",
        "1. Apartamento amueblado en Res. El Trapiche",
        "2 habitaciones, 1 baño, $ 750",
        "2) Bodega de 400 m2 sobre anillo periferico, $ 2,500",
    ];
    let records = ListingParser::new(&agency).parse_lines(&lines);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].property_type, PropertyType::Apartment);
    assert_eq!(records[0].transaction, Some(Transaction::Rent));
    assert_eq!(records[0].bedrooms, Some(2));
    assert_eq!(records[0].price, Some(750.0));

    assert_eq!(records[1].property_type, PropertyType::Commercial);
    assert_eq!(records[1].area_built.map(|a| a.value), Some(400.0));
    assert_eq!(records[1].neighborhood.as_deref(), Some("ANILLO PERIFERICO"));
    assert!(records[1].has_sufficient_info());
}

#[test]
fn test_half_bath_fraction_is_not_a_slash_pair() {
    let agency = compile(AgencyConfig::default());
    let record = ListingParser::new(&agency).parse_text("Casa con 2 baños y 1/2");

    assert_eq!(record.bedrooms, None);
    assert_eq!(record.bathrooms, Some(2.5));
    assert_eq!(record.property_type, PropertyType::House);
}

#[test]
fn test_linear_distance_is_not_an_area() {
    let agency = compile(AgencyConfig::default());
    let record = ListingParser::new(&agency).parse_text("Casa a 200 metros de la playa, $ 150,000");

    assert_eq!(record.area_built, None);
    assert_eq!(record.area_built_m2, None);
    assert_eq!(record.area_lot, None);
    assert_eq!(record.price, Some(150000.0));
}
