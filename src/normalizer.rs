use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Agency-specific text conventions applied before lower-casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextVariant {
    #[default]
    Generic,
    Serpecal,
    Eugenia,
}

impl FromStr for TextVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "" => Ok(TextVariant::Generic),
            "serpecal" => Ok(TextVariant::Serpecal),
            "eugenia" => Ok(TextVariant::Eugenia),
            other => Err(format!(
                "unknown text variant '{}' (expected generic, serpecal or eugenia)",
                other
            )),
        }
    }
}

impl fmt::Display for TextVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextVariant::Generic => "generic",
            TextVariant::Serpecal => "serpecal",
            TextVariant::Eugenia => "eugenia",
        };
        f.write_str(name)
    }
}

static LEADING_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[*\-•·>–—]\s*)+").expect("valid leading marker regex"));

static CURRENCY_LEADING_DOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(US\$|\$|\bLps\.|\bL\.)\s*\.\s*(\d)").expect("valid leading dot regex")
});

static CURRENCY_SPACING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(US\$|\$|\bLps\.?|\bL\.)\s*(\d)").expect("valid currency spacing regex")
});

static METER_VARIANTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:mtrs2|mts2|mt2|m2|mtrs²|mts²|mt²)").expect("valid meter unit regex")
});

static VARA_VARIANTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:varas2|vara2|vrs2|vr2|varas²|vara²|vr²|vrs|v2)").expect("valid vara unit regex")
});

static ABBREV_COLONIA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcolonia\b").expect("valid colonia regex"));
static ABBREV_RESIDENCIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bresidencial\b").expect("valid residencial regex"));
static ABBREV_URBANIZACION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\burbanizaci[oó]n\b").expect("valid urbanizacion regex"));
static ABBREV_CONDOMINIO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcondominio\b").expect("valid condominio regex"));

/// Case-preserving cleanup for one raw input line.
///
/// Applied before segmentation so that marker and uppercase detection still
/// see the original casing: NFC, whitespace collapse, currency spacing and
/// unit spelling.
pub fn normalize_line(line: &str) -> String {
    let composed: String = line.nfc().collect();
    let collapsed = collapse_whitespace(&composed);
    canonicalize_tokens(&collapsed)
}

/// Full normalization of a segment's text for the field extractors.
///
/// Strips bullet markers at the start of every line (never inside one),
/// joins the lines and lower-cases, then applies the token cleanup of
/// [`normalize_line`] and expands the variant's abbreviations.
/// `normalize(normalize(x, v), v) == normalize(x, v)`.
pub fn normalize(text: &str, variant: TextVariant) -> String {
    let composed: String = text.nfc().collect();

    let joined = composed
        .split('\n')
        .map(|line| {
            let line = collapse_whitespace(line);
            LEADING_MARKERS.replace(&line, "").into_owned()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    // Lower-casing can emit combining marks ("İ"), so it runs before units
    let lowered: String = joined.to_lowercase().nfc().collect();
    let cleaned = collapse_whitespace(&canonicalize_tokens(&lowered));
    let expanded = expand_abbreviations(&cleaned, variant);

    expanded.nfc().collect()
}

/// Collapse all whitespace runs (including non-breaking spaces) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn canonicalize_tokens(text: &str) -> String {
    let text = CURRENCY_LEADING_DOT.replace_all(text, "$1 $2");
    let text = CURRENCY_SPACING.replace_all(&text, "$1 $2");
    let text = rewrite_units(&text, &METER_VARIANTS, "m²");
    rewrite_units(&text, &VARA_VARIANTS, "vrs²")
}

/// Replace unit spellings that stand alone as a unit ("120m2", "500 Vrs"),
/// leaving words that merely contain them ("cm2", "vrs²") untouched.
fn rewrite_units(text: &str, pattern: &Regex, canonical: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in pattern.find_iter(text) {
        let before_ok = text[..m.start()]
            .chars()
            .next_back()
            .map(|c| !is_word_char(c))
            .unwrap_or(true);
        let after_ok = text[m.end()..]
            .chars()
            .next()
            .map(|c| !is_word_char(c) && !c.is_numeric() && c != '²')
            .unwrap_or(true);

        if before_ok && after_ok {
            out.push_str(&text[last..m.start()]);
            out.push_str(canonical);
            last = m.end();
        }
    }

    out.push_str(&text[last..]);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || is_combining_mark(c)
}

fn expand_abbreviations(text: &str, variant: TextVariant) -> String {
    match variant {
        TextVariant::Generic => text.to_string(),
        TextVariant::Serpecal => {
            let text = ABBREV_COLONIA.replace_all(text, "col.");
            ABBREV_RESIDENCIAL.replace_all(&text, "res.").into_owned()
        }
        TextVariant::Eugenia => {
            let text = ABBREV_COLONIA.replace_all(text, "col.");
            let text = ABBREV_RESIDENCIAL.replace_all(&text, "res.");
            let text = ABBREV_URBANIZACION.replace_all(&text, "urb.");
            ABBREV_CONDOMINIO.replace_all(&text, "cond.").into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_leading_markers_only() {
        assert_eq!(normalize("* Casa 2-3 hab", TextVariant::Generic), "casa 2-3 hab");
        assert_eq!(normalize("  - • Apto en renta", TextVariant::Generic), "apto en renta");
        assert_eq!(normalize("Casa 2-3 hab", TextVariant::Generic), "casa 2-3 hab");
    }

    #[test]
    fn test_normalize_joins_lines() {
        let text = "* Casa en venta\n- 3 habitaciones\n\n  2 baños";
        assert_eq!(
            normalize(text, TextVariant::Generic),
            "casa en venta 3 habitaciones 2 baños"
        );
    }

    #[test]
    fn test_normalize_meter_units() {
        assert_eq!(normalize("120 mts2", TextVariant::Generic), "120 m²");
        assert_eq!(normalize("120Mts2 de construccion", TextVariant::Generic), "120m² de construccion");
        assert_eq!(normalize("85 mt2, 90 m2", TextVariant::Generic), "85 m², 90 m²");
    }

    #[test]
    fn test_normalize_vara_units() {
        assert_eq!(normalize("300 Vrs2", TextVariant::Generic), "300 vrs²");
        assert_eq!(normalize("300 Vr2", TextVariant::Generic), "300 vrs²");
        assert_eq!(normalize("300 Vrs de terreno", TextVariant::Generic), "300 vrs² de terreno");
        assert_eq!(normalize("300 v2", TextVariant::Generic), "300 vrs²");
        assert_eq!(normalize("300 vrs²", TextVariant::Generic), "300 vrs²");
    }

    #[test]
    fn test_normalize_units_inside_words_untouched() {
        assert_eq!(normalize("cm2 y vrsx", TextVariant::Generic), "cm2 y vrsx");
    }

    #[test]
    fn test_normalize_currency_spacing() {
        assert_eq!(normalize("$450", TextVariant::Generic), "$ 450");
        assert_eq!(normalize("Lps.2,500,000", TextVariant::Generic), "lps. 2,500,000");
        assert_eq!(normalize("L.  800", TextVariant::Generic), "l. 800");
        assert_eq!(normalize("US$1200", TextVariant::Generic), "us$ 1200");
    }

    #[test]
    fn test_normalize_currency_leading_dot() {
        assert_eq!(normalize("$.550", TextVariant::Generic), "$ 550");
        assert_eq!(normalize("Lps. .900", TextVariant::Generic), "lps. 900");
    }

    #[test]
    fn test_normalize_non_breaking_space() {
        assert_eq!(normalize("Casa\u{00a0}\u{00a0}bonita", TextVariant::Generic), "casa bonita");
    }

    #[test]
    fn test_normalize_nfc() {
        assert_eq!(normalize("Ban\u{0303}o", TextVariant::Generic), "baño");
    }

    #[test]
    fn test_normalize_variant_abbreviations() {
        assert_eq!(
            normalize("Colonia Palmira, Residencial Plaza", TextVariant::Serpecal),
            "col. palmira, res. plaza"
        );
        assert_eq!(
            normalize("Urbanización Lomas, Condominio Vista", TextVariant::Eugenia),
            "urb. lomas, cond. vista"
        );
        assert_eq!(
            normalize("Colonia Palmira", TextVariant::Generic),
            "colonia palmira"
        );
    }

    #[test]
    fn test_normalize_line_preserves_case() {
        assert_eq!(normalize_line("* CASA  en Lps.500  120 mts2"), "* CASA en Lps. 500 120 m²");
    }

    #[test]
    fn test_normalize_dotted_capital_before_unit() {
        let once = normalize("İv2", TextVariant::Generic);
        assert_eq!(once, "i\u{307}v2");
        assert_eq!(normalize(&once, TextVariant::Generic), once);
        assert_eq!(normalize("İ v2", TextVariant::Generic), "i\u{307} vrs²");
    }

    #[test]
    fn test_text_variant_from_str() {
        assert_eq!("Serpecal".parse::<TextVariant>(), Ok(TextVariant::Serpecal));
        assert_eq!("generic".parse::<TextVariant>(), Ok(TextVariant::Generic));
        assert!("other".parse::<TextVariant>().is_err());
    }

    proptest! {
        #[test]
        fn test_normalize_is_idempotent(
            text in "[a-zA-Z0-9áéíóúñÑİÖẞ\u{0301}\u{0307}$.,:;*•\\- ²/\n]{0,60}"
        ) {
            for variant in [TextVariant::Generic, TextVariant::Serpecal, TextVariant::Eugenia] {
                let once = normalize(&text, variant);
                let twice = normalize(&once, variant);
                prop_assert_eq!(once, twice);
            }
        }

        #[test]
        fn test_normalize_line_is_idempotent(text in "[a-zA-Z0-9áéíóúñİÖ\u{0301}$.,*\\- ²]{0,40}") {
            let once = normalize_line(&text);
            prop_assert_eq!(normalize_line(&once), once.clone());
        }
    }
}
