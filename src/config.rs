use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::models::{PropertyType, Transaction};
use crate::normalizer::TextVariant;

/// Lexical convention an agency uses to delimit listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListingMarker {
    #[default]
    Bullet,
    Cue,
    Uppercase,
    Numbered,
}

impl FromStr for ListingMarker {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BULLET" => Ok(ListingMarker::Bullet),
            "CUE" => Ok(ListingMarker::Cue),
            "UPPERCASE" => Ok(ListingMarker::Uppercase),
            "NUMBERED" => Ok(ListingMarker::Numbered),
            other => Err(format!(
                "unknown listing marker '{}' (expected bullet, cue, uppercase or numbered)",
                other
            )),
        }
    }
}

impl fmt::Display for ListingMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListingMarker::Bullet => "BULLET",
            ListingMarker::Cue => "CUE",
            ListingMarker::Uppercase => "UPPERCASE",
            ListingMarker::Numbered => "NUMBERED",
        };
        f.write_str(name)
    }
}

/// Which price to keep when a segment quotes several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiPricePolicy {
    #[default]
    Max,
    First,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaAliases {
    #[serde(default = "default_built_aliases", alias = "ac")]
    pub built: Vec<String>,
    #[serde(default = "default_lot_aliases", alias = "at")]
    pub lot: Vec<String>,
    #[serde(default = "default_manzana_aliases", alias = "mz")]
    pub manzana: Vec<String>,
}

impl Default for AreaAliases {
    fn default() -> Self {
        Self {
            built: default_built_aliases(),
            lot: default_lot_aliases(),
            manzana: default_manzana_aliases(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionKeywords {
    #[serde(default = "default_sale_keywords")]
    pub sale: Vec<String>,
    #[serde(default = "default_rent_keywords")]
    pub rent: Vec<String>,
    #[serde(default = "default_ambiguous_keywords")]
    pub ambiguous: Vec<String>,
}

impl Default for TransactionKeywords {
    fn default() -> Self {
        Self {
            sale: default_sale_keywords(),
            rent: default_rent_keywords(),
            ambiguous: default_ambiguous_keywords(),
        }
    }
}

/// A `section_headers` entry: header lines matching `pattern` set the
/// context inherited by the listings that follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHeaderRule {
    pub pattern: String,
    #[serde(default)]
    pub transaction: Option<Transaction>,
    #[serde(default, rename = "type")]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Per-agency rule set. Loaded once and never mutated; every field has a
/// default so a minimal YAML file only names what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub listing_marker: ListingMarker,
    #[serde(default = "default_bullet_leader")]
    pub bullet_leader: String,
    #[serde(default = "default_bullet_alternates")]
    pub bullet_alternates: Vec<String>,
    #[serde(default = "default_currency_aliases")]
    pub currency_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub area_aliases: AreaAliases,
    #[serde(default = "default_type_keywords")]
    pub type_keywords: BTreeMap<PropertyType, Vec<String>>,
    #[serde(default = "default_bedroom_keywords")]
    pub bedroom_keywords: Vec<String>,
    #[serde(default = "default_bathroom_keywords")]
    pub bathroom_keywords: Vec<String>,
    #[serde(default = "default_ensuite_markers")]
    pub bathroom_ensuite_markers: Vec<String>,
    #[serde(default)]
    pub bathroom_ensuite_regex: bool,
    #[serde(default = "default_true")]
    pub bathroom_infer_from_bedrooms: bool,
    #[serde(default)]
    pub hint_bedrooms: Option<u32>,
    #[serde(default = "default_true")]
    pub allow_slash_bed_bath: bool,
    #[serde(default = "default_slash_context_keywords")]
    pub slash_context_keywords: Vec<String>,
    #[serde(default = "default_neighborhood_prefixes")]
    pub neighborhood_marker_prefixes: Vec<String>,
    #[serde(default = "default_header_prefix")]
    pub header_prefix: String,
    #[serde(default = "default_header_guards")]
    pub header_guards: Vec<String>,
    #[serde(default = "default_start_exceptions")]
    pub start_exceptions: Vec<String>,
    #[serde(default)]
    pub section_headers: Vec<SectionHeaderRule>,
    #[serde(default)]
    pub transaction_keywords: TransactionKeywords,
    #[serde(default)]
    pub multi_price_policy: MultiPricePolicy,
    #[serde(default = "default_true")]
    pub price_accept_magnitudes: bool,
    #[serde(default)]
    pub text_variant: TextVariant,
}

fn default_name() -> String {
    "generic".to_string()
}

fn default_bullet_leader() -> String {
    "*".to_string()
}

fn default_bullet_alternates() -> Vec<String> {
    to_strings(&["-", "•", "·", "–", "—", ">"])
}

pub(crate) fn default_currency_aliases() -> BTreeMap<String, String> {
    [
        ("$", "USD"),
        ("US$", "USD"),
        ("USD", "USD"),
        ("L.", "HNL"),
        ("Lps.", "HNL"),
        ("Lps", "HNL"),
        ("HNL", "HNL"),
    ]
    .iter()
    .map(|(alias, code)| (alias.to_string(), code.to_string()))
    .collect()
}

fn default_built_aliases() -> Vec<String> {
    to_strings(&["m²", "mts2", "mtrs2", "mt2", "m2", "metros cuadrados"])
}

fn default_lot_aliases() -> Vec<String> {
    to_strings(&["vrs²", "vrs2", "vr2", "varas cuadradas", "v²"])
}

fn default_manzana_aliases() -> Vec<String> {
    to_strings(&["mz", "manzanas", "manzana"])
}

pub fn default_type_keywords() -> BTreeMap<PropertyType, Vec<String>> {
    let mut keywords = BTreeMap::new();
    keywords.insert(
        PropertyType::House,
        to_strings(&["casa", "vivienda", "townhouse", "chalet"]),
    );
    keywords.insert(
        PropertyType::Apartment,
        to_strings(&["apartamento", "apto", "depto", "departamento", "penthouse", "estudio"]),
    );
    keywords.insert(
        PropertyType::Commercial,
        to_strings(&["local comercial", "locales", "oficina", "bodega", "comercial", "edificio"]),
    );
    keywords.insert(
        PropertyType::Land,
        to_strings(&["terreno", "lote", "solar", "finca"]),
    );
    keywords
}

fn default_bedroom_keywords() -> Vec<String> {
    to_strings(&[
        "habitaciones",
        "habitación",
        "habitacion",
        "habs",
        "hab.",
        "hab",
        "cuartos",
        "cuarto",
        "dormitorios",
        "dormitorio",
        "recámaras",
        "recamaras",
        "recámara",
        "recamara",
        "alcobas",
        "dorm.",
    ])
}

fn default_bathroom_keywords() -> Vec<String> {
    to_strings(&["baños", "baño", "banos", "bano", "bafios", "baths", "bath"])
}

fn default_ensuite_markers() -> Vec<String> {
    to_strings(&[
        "cada una con su baño",
        "cada uno con su baño",
        "cada habitacion con su baño",
        "cada recamara con su baño",
        "cada cuarto con su baño",
        "todas con baño propio",
    ])
}

fn default_true() -> bool {
    true
}

fn default_slash_context_keywords() -> Vec<String> {
    to_strings(&["apto", "apartamento", "departamento", "depto", "casa", "townhouse", "hab"])
}

fn default_neighborhood_prefixes() -> Vec<String> {
    to_strings(&["col.", "res.", "barrio", "urb.", "bo."])
}

fn default_header_prefix() -> String {
    "#".to_string()
}

fn default_header_guards() -> Vec<String> {
    to_strings(&["VENTA", "ALQUILER"])
}

fn default_start_exceptions() -> Vec<String> {
    to_strings(&[
        "CON", "Y", "E", "DE", "DEL", "LA", "EL", "LOS", "LAS", "EN", "PARA", "POR", "INCLUYE",
        "CERCA", "SOBRE", "ENTRE", "PRECIO", "INFO", "INFORMACION", "INFORMACIÓN", "TEL",
        "CEL", "WHATSAPP", "LLAMAR", "CONTACTO", "NOTA", "TOTAL", "AREA", "ÁREA",
    ])
}

fn default_sale_keywords() -> Vec<String> {
    to_strings(&["venta", "se vende", "for sale"])
}

fn default_rent_keywords() -> Vec<String> {
    to_strings(&["alquiler", "renta", "se alquila", "for rent", "mensual"])
}

fn default_ambiguous_keywords() -> Vec<String> {
    to_strings(&[
        "venta o renta",
        "venta o alquiler",
        "alquiler o venta",
        "renta o venta",
        "venta y alquiler",
        "venta y renta",
    ])
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            listing_marker: ListingMarker::default(),
            bullet_leader: default_bullet_leader(),
            bullet_alternates: default_bullet_alternates(),
            currency_aliases: default_currency_aliases(),
            area_aliases: AreaAliases::default(),
            type_keywords: default_type_keywords(),
            bedroom_keywords: default_bedroom_keywords(),
            bathroom_keywords: default_bathroom_keywords(),
            bathroom_ensuite_markers: default_ensuite_markers(),
            bathroom_ensuite_regex: false,
            bathroom_infer_from_bedrooms: true,
            hint_bedrooms: None,
            allow_slash_bed_bath: true,
            slash_context_keywords: default_slash_context_keywords(),
            neighborhood_marker_prefixes: default_neighborhood_prefixes(),
            header_prefix: default_header_prefix(),
            header_guards: default_header_guards(),
            start_exceptions: default_start_exceptions(),
            section_headers: Vec::new(),
            transaction_keywords: TransactionKeywords::default(),
            multi_price_policy: MultiPricePolicy::default(),
            price_accept_magnitudes: true,
            text_variant: TextVariant::default(),
        }
    }
}

impl AgencyConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AgencyConfig = serde_yaml::from_str(yaml)?;
        tracing::debug!(
            "Loaded agency '{}' ({} marker, {} categories, {} section headers)",
            config.name,
            config.listing_marker,
            config.type_keywords.len(),
            config.section_headers.len()
        );
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)?;
        tracing::info!("Reading agency configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
