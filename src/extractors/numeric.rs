/// Parse a numeric token written with either locale's separators
/// (e.g. "170,000", "1.200,50", "2,5", "1.200", "85.50").
///
/// Returns `None` for tokens that cannot be read as a single number, such as
/// two prices glued together ("800,1000").
pub fn parse_number(token: &str) -> Option<f64> {
    if token.is_empty() {
        return None;
    }

    let mut cleaned = String::with_capacity(token.len());
    for c in token.chars() {
        match c {
            '0'..='9' => cleaned.push(c),
            '.' | ',' => {
                // "1..200" is an OCR stutter, keep one separator
                if !cleaned.ends_with(|p: char| p == '.' || p == ',') {
                    cleaned.push(c);
                }
            }
            _ => {}
        }
    }

    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == ',');
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let has_dot = cleaned.contains('.');
    let has_comma = cleaned.contains(',');

    let canonical = match (has_dot, has_comma) {
        (false, false) => cleaned.to_string(),
        (true, true) => {
            // The separator that appears last is the decimal one
            let last_dot = cleaned.rfind('.')?;
            let last_comma = cleaned.rfind(',')?;
            let (thousands, decimal) = if last_dot > last_comma { (',', '.') } else { ('.', ',') };
            let (int_part, frac_part) = cleaned.split_at(cleaned.rfind(decimal)?);
            if int_part.contains(decimal) || !valid_thousands(int_part, thousands) {
                return None;
            }
            format!("{}.{}", int_part.replace(thousands, ""), &frac_part[1..])
        }
        (true, false) => single_separator(cleaned, '.')?,
        (false, true) => single_separator(cleaned, ',')?,
    };

    canonical.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Resolve a token that only uses one kind of separator.
fn single_separator(token: &str, sep: char) -> Option<String> {
    let groups: Vec<&str> = token.split(sep).collect();
    if groups.len() > 2 {
        // Several separators can only be thousands grouping
        if valid_thousands(token, sep) {
            return Some(token.replace(sep, ""));
        }
        return None;
    }

    let int_part = groups[0];
    let frac_part = groups.get(1).copied().unwrap_or("");
    match frac_part.len() {
        1 | 2 => Some(format!("{}.{}", int_part, frac_part)),
        3 if int_part.len() <= 3 => Some(format!("{}{}", int_part, frac_part)),
        _ => None,
    }
}

/// Check a "1.234.567" style integer part: 1-3 leading digits, then groups of three.
fn valid_thousands(int_part: &str, sep: char) -> bool {
    let mut groups = int_part.split(sep);
    let head_ok = groups
        .next()
        .map(|g| !g.is_empty() && g.len() <= 3)
        .unwrap_or(false);
    head_ok && groups.all(|g| g.len() == 3)
}

/// Spanish number words used in room counts ("tres habitaciones").
pub fn word_to_number(word: &str) -> Option<u32> {
    let n = match word.to_lowercase().as_str() {
        "un" | "uno" | "una" => 1,
        "dos" => 2,
        "tres" => 3,
        "cuatro" => 4,
        "cinco" => 5,
        "seis" => 6,
        "siete" => 7,
        "ocho" => 8,
        "nueve" => 9,
        "diez" => 10,
        _ => return None,
    };
    Some(n)
}

/// Regex alternation of the words [`word_to_number`] understands, longest first.
pub const NUMBER_WORDS: &str = "cuatro|nueve|siete|cinco|tres|seis|ocho|diez|uno|una|dos|un";

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number("650"), Some(650.0));
        assert_eq!(parse_number("170000"), Some(170000.0));
    }

    #[test]
    fn test_parse_number_comma_thousands() {
        assert_eq!(parse_number("170,000"), Some(170000.0));
        assert_eq!(parse_number("1,250,000"), Some(1250000.0));
    }

    #[test]
    fn test_parse_number_dot_thousands() {
        assert_eq!(parse_number("1.200"), Some(1200.0));
        assert_eq!(parse_number("2.500.000"), Some(2500000.0));
    }

    #[test]
    fn test_parse_number_mixed_locale() {
        assert_eq!(parse_number("1.200,50"), Some(1200.50));
        assert_eq!(parse_number("1,200.50"), Some(1200.50));
    }

    #[test]
    fn test_parse_number_decimal_comma() {
        assert_eq!(parse_number("2,5"), Some(2.5));
        assert_eq!(parse_number("85.50"), Some(85.50));
    }

    #[test]
    fn test_parse_number_rejects_glued_prices() {
        assert_eq!(parse_number("800,1000"), None);
        assert_eq!(parse_number("1.2.3"), None);
    }

    #[test]
    fn test_parse_number_cleans_repeated_separators() {
        assert_eq!(parse_number("1..200"), Some(1200.0));
        assert_eq!(parse_number(" 450 "), Some(450.0));
    }

    #[test]
    fn test_parse_number_empty_string() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number(".,"), None);
    }

    #[test]
    fn test_word_to_number() {
        assert_eq!(word_to_number("tres"), Some(3));
        assert_eq!(word_to_number("Una"), Some(1));
        assert_eq!(word_to_number("diez"), Some(10));
        assert_eq!(word_to_number("once"), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1200.456), 1200.46);
        assert_eq!(round2(650.0), 650.0);
    }
}
