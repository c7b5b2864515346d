use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One square vara expressed in square meters.
pub const VARA2_TO_M2: f64 = 0.698896;
/// One manzana expressed in square varas.
pub const MANZANA_TO_VARA2: f64 = 10_000.0;
pub const SQFT_TO_M2: f64 = 0.092_903_04;
pub const ACRE_TO_M2: f64 = 4_046.856_422_4;

/// Property category assigned by the classifier.
///
/// The derived ordering doubles as the tie-break priority: House beats
/// Apartment beats Commercial beats Land, configured extra categories come
/// next (alphabetically) and `Other` is last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    House,
    Apartment,
    Commercial,
    Land,
    Custom(String),
    Other,
}

impl PropertyType {
    /// The four categories that always receive a score.
    pub const BUILT_IN: [PropertyType; 4] = [
        PropertyType::House,
        PropertyType::Apartment,
        PropertyType::Commercial,
        PropertyType::Land,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::House => "House",
            PropertyType::Apartment => "Apartment",
            PropertyType::Commercial => "Commercial",
            PropertyType::Land => "Land",
            PropertyType::Custom(name) => name,
            PropertyType::Other => "Other",
        }
    }
}

impl From<String> for PropertyType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "house" | "casa" => PropertyType::House,
            "apartment" | "apartamento" | "apto" => PropertyType::Apartment,
            "commercial" | "comercial" => PropertyType::Commercial,
            "land" | "terreno" => PropertyType::Land,
            "other" | "" => PropertyType::Other,
            _ => PropertyType::Custom(value.trim().to_string()),
        }
    }
}

impl From<&str> for PropertyType {
    fn from(value: &str) -> Self {
        PropertyType::from(value.to_string())
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transaction {
    #[serde(alias = "SALE", alias = "sale")]
    Sale,
    #[serde(alias = "RENT", alias = "rent")]
    Rent,
}

/// Units an area figure can be quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    SquareMeters,
    SquareVaras,
    Manzanas,
    SquareFeet,
    Acres,
}

impl AreaUnit {
    /// Classify a configured unit token (e.g. "Vrs²", "mts2", "metros cuadrados").
    pub fn from_token(token: &str) -> Option<AreaUnit> {
        let t: String = token
            .to_lowercase()
            .replace('²', "2")
            .chars()
            .filter(|c| !matches!(c, ' ' | '.' | '-' | '_'))
            .collect();

        if t.is_empty() {
            return None;
        }

        match t.as_str() {
            "m2" | "mt2" | "mts2" | "mtrs2" | "mt" | "mts" | "mtrs" | "mtr" => {
                return Some(AreaUnit::SquareMeters)
            }
            "mz" | "mzs" | "mza" => return Some(AreaUnit::Manzanas),
            "ft2" | "sqft" | "pies2" => return Some(AreaUnit::SquareFeet),
            _ => {}
        }

        if t.starts_with("metro") {
            Some(AreaUnit::SquareMeters)
        } else if t.starts_with('v') {
            Some(AreaUnit::SquareVaras)
        } else if t.starts_with("manzana") {
            Some(AreaUnit::Manzanas)
        } else if t.starts_with("piescuadrado") {
            Some(AreaUnit::SquareFeet)
        } else if t.starts_with("acre") {
            Some(AreaUnit::Acres)
        } else {
            None
        }
    }

    /// Square meters in one of this unit.
    pub fn m2_factor(self) -> f64 {
        match self {
            AreaUnit::SquareMeters => 1.0,
            AreaUnit::SquareVaras => VARA2_TO_M2,
            AreaUnit::Manzanas => MANZANA_TO_VARA2 * VARA2_TO_M2,
            AreaUnit::SquareFeet => SQFT_TO_M2,
            AreaUnit::Acres => ACRE_TO_M2,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AreaUnit::SquareMeters => "m²",
            AreaUnit::SquareVaras => "vrs²",
            AreaUnit::Manzanas => "mz",
            AreaUnit::SquareFeet => "ft²",
            AreaUnit::Acres => "acres",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub value: f64,
    pub unit: AreaUnit,
}

impl Area {
    pub fn new(value: f64, unit: AreaUnit) -> Self {
        Self { value, unit }
    }

    pub fn square_meters(&self) -> f64 {
        self.value * self.unit.m2_factor()
    }
}

/// Classifier output: the winner plus one score per known category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub winner: PropertyType,
    pub scores: BTreeMap<PropertyType, u32>,
}

impl Classification {
    pub fn score(&self, category: &PropertyType) -> u32 {
        self.scores.get(category).copied().unwrap_or(0)
    }

    pub fn winner_score(&self) -> u32 {
        self.score(&self.winner)
    }
}

/// One listing's raw text after segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSegment {
    pub text: String,
    /// Zero-based indices of the source lines folded into this segment.
    pub lines: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLine {
    pub text: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Header(HeaderLine),
    Listing(RawSegment),
}

impl Segment {
    pub fn as_listing(&self) -> Option<&RawSegment> {
        match self {
            Segment::Listing(raw) => Some(raw),
            Segment::Header(_) => None,
        }
    }
}

/// Structured result for one listing segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub text: String,
    pub title: String,
    pub source_lines: Vec<usize>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub area_built: Option<Area>,
    pub area_built_m2: Option<f64>,
    pub area_lot: Option<Area>,
    pub area_lot_m2: Option<f64>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub prices_found: Vec<String>,
    pub property_type: PropertyType,
    pub classification: Classification,
    pub neighborhood: Option<String>,
    pub transaction: Option<Transaction>,
    pub category: Option<String>,
    pub is_multi_offer: bool,
}

impl ParsedRecord {
    /// Check if the record carries enough to be worth writing out
    pub fn has_sufficient_info(&self) -> bool {
        // Text alone is not a listing: we want at least a price, an area or a room count
        !self.text.trim().is_empty()
            && (self.price.is_some()
                || self.area_built.is_some()
                || self.area_lot.is_some()
                || self.bedrooms.is_some())
    }
}
