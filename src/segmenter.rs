use once_cell::sync::Lazy;
use regex::Regex;

use crate::agency::CompiledAgency;
use crate::config::ListingMarker;
use crate::models::{HeaderLine, RawSegment, Segment};
use crate::normalizer::{collapse_whitespace, normalize_line};

static CONNECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:y|e|con|incluye|cerca\s+de|sobre|entre)\b").expect("valid connector regex")
});

/// Accumulates lines into segments. Continuation lines that arrive while no
/// listing is open are prelude noise and get dropped.
#[derive(Default)]
struct Builder {
    segments: Vec<Segment>,
    parts: Vec<String>,
    lines: Vec<usize>,
    open: bool,
    dropped: usize,
}

impl Builder {
    fn start(&mut self, text: &str, line: usize) {
        self.flush();
        self.open = true;
        self.push(text, line);
    }

    fn append(&mut self, text: &str, line: usize) {
        if self.open {
            self.push(text, line);
        } else {
            tracing::trace!("Dropping line {} outside any listing: {}", line, text);
            self.dropped += 1;
        }
    }

    fn header(&mut self, text: &str, line: usize) {
        self.flush();
        self.segments.push(Segment::Header(HeaderLine {
            text: text.to_string(),
            line,
        }));
    }

    fn push(&mut self, text: &str, line: usize) {
        if !text.trim().is_empty() {
            self.parts.push(text.to_string());
        }
        self.lines.push(line);
    }

    fn flush(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let text = collapse_whitespace(&self.parts.join(" "));
        let lines = std::mem::take(&mut self.lines);
        self.parts.clear();
        if !text.is_empty() {
            self.segments.push(Segment::Listing(RawSegment { text, lines }));
        }
    }

    fn finish(mut self) -> (Vec<Segment>, usize) {
        self.flush();
        (self.segments, self.dropped)
    }
}

/// Split raw input lines into headers and listing segments.
///
/// Every line goes through [`normalize_line`] first; blank lines are skipped
/// and header-prefix lines always close the open listing. How a listing
/// starts depends on `marker`:
///
/// - `Bullet`: the canonical leader, or an alternate leader not glued to a
///   digit ("-5%" is text), starts a listing; leaders are stripped.
/// - `Cue`: a line starting with an uppercase letter whose first word is not
///   a start exception, unless the previous line ended in `,`/`;` or the line
///   opens with a price or a connector word.
/// - `Uppercase`: an all-caps leading chunk (before `.`, `,` or `:`). An
///   unterminated all-caps line demotes the next qualifying line.
/// - `Numbered`: a `12.`, `3)`, `4-` or `1a)` marker, stripped unless
///   `keep_markers`; guard words ("VENTA") on their own are headers.
///
/// In every mode a price-only line is glued to the open listing.
pub fn segment<S: AsRef<str>>(
    lines: &[S],
    marker: ListingMarker,
    agency: &CompiledAgency,
    keep_markers: bool,
) -> Vec<Segment> {
    let mut builder = Builder::default();
    // Previous line ended mid-clause (CUE)
    let mut open_clause = false;
    // Previous line was an unterminated all-caps start (UPPERCASE)
    let mut open_anchor = false;

    for (idx, raw) in lines.iter().enumerate() {
        let line = normalize_line(raw.as_ref());
        if line.is_empty() {
            continue;
        }

        if agency.is_header(&line) || (marker == ListingMarker::Numbered && agency.is_guard_header(&line)) {
            builder.header(&line, idx);
            open_clause = false;
            open_anchor = false;
            continue;
        }

        match marker {
            ListingMarker::Bullet => match strip_bullet(&line, agency.bullet_leaders()) {
                Some(rest) if !(agency.is_price_only(rest) && builder.open) => builder.start(rest, idx),
                Some(rest) => builder.append(rest, idx),
                None => builder.append(&line, idx),
            },
            ListingMarker::Cue => {
                let continues = open_clause
                    || agency.is_price_only(&line)
                    || agency.starts_with_price(&line)
                    || CONNECTOR.is_match(&line)
                    || agency.is_start_exception(&line)
                    || !starts_uppercase(&line);
                if continues {
                    builder.append(&line, idx);
                } else {
                    builder.start(&line, idx);
                }
                open_clause = line.ends_with(|c: char| c == ',' || c == ';');
            }
            ListingMarker::Uppercase => {
                let anchor = if agency.is_price_only(&line) || agency.starts_with_price(&line) {
                    None
                } else {
                    uppercase_anchor(&line, agency)
                };
                match anchor {
                    Some(_) if open_anchor => {
                        builder.append(&line, idx);
                        open_anchor = false;
                    }
                    Some(terminated) => {
                        builder.start(&line, idx);
                        open_anchor = !terminated;
                    }
                    None => {
                        builder.append(&line, idx);
                        open_anchor = false;
                    }
                }
            }
            ListingMarker::Numbered => match numbered_marker(&line) {
                Some(content) => {
                    let text = if keep_markers { line.as_str() } else { &line[content..] };
                    if agency.is_price_only(&line[content..]) && builder.open {
                        builder.append(text, idx);
                    } else {
                        builder.start(text, idx);
                    }
                }
                None => builder.append(&line, idx),
            },
        }
    }

    let (segments, dropped) = builder.finish();
    let listings = segments.iter().filter(|s| s.as_listing().is_some()).count();
    tracing::debug!(
        "Segmented {} lines with {} marker: {} listings, {} headers, {} lines dropped",
        lines.len(),
        marker,
        listings,
        segments.len() - listings,
        dropped
    );
    segments
}

/// The line without its bullet leader, if it has one.
fn strip_bullet<'a>(line: &'a str, leaders: &[String]) -> Option<&'a str> {
    let trimmed = line.trim_start();
    for (i, leader) in leaders.iter().enumerate() {
        let Some(rest) = trimmed.strip_prefix(leader.as_str()) else {
            continue;
        };
        // Alternates glued to a digit are signs or ranges, not bullets
        if i > 0 && rest.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        return Some(rest.trim_start_matches(leader.as_str()).trim_start());
    }
    None
}

fn starts_uppercase(line: &str) -> bool {
    line.chars().next().map_or(false, |c| c.is_alphabetic() && c.is_uppercase())
}

/// `Some(terminated)` when the leading chunk is all caps and may start a
/// listing; `terminated` tells whether a `.`, `,` or `:` closed the chunk.
/// A bullet leader in front of the chunk is ignored.
fn uppercase_anchor(line: &str, agency: &CompiledAgency) -> Option<bool> {
    let body = strip_bullet(line, agency.bullet_leaders()).unwrap_or(line);
    let end = body.find(|c: char| c == '.' || c == ',' || c == ':');
    let chunk = &body[..end.unwrap_or(body.len())];

    let letters = chunk.chars().filter(|c| c.is_alphabetic()).count();
    if letters < 2 || chunk.chars().any(|c| c.is_lowercase()) {
        return None;
    }
    if agency.is_start_exception(chunk) {
        return None;
    }
    Some(end.is_some())
}

/// Byte offset where the content after a list marker begins.
///
/// Accepts 1-3 digits followed by `.`, `)` or `-`, optionally a single
/// letter closed by its own punctuation ("1a)", "2.b."). A number running on
/// into more digits ("1.200") is not a marker.
fn numbered_marker(line: &str) -> Option<usize> {
    let start = line.len() - line.trim_start().len();
    let digits = line[start..].chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 3 {
        return None;
    }

    let mut pos = start + digits;
    let mut punctuated = false;
    let punct_end = skip_punct(line, pos);
    if punct_end > pos {
        punctuated = true;
        pos = punct_end;
    }

    // Optional sub-letter, only when closed by punctuation
    let after_space = skip_spaces(line, pos);
    let mut letters = line[after_space..].chars();
    if let (Some(letter), next) = (letters.next(), letters.next()) {
        let glued = after_space == pos;
        if letter.is_ascii_alphabetic() && (punctuated || glued) && !next.map_or(false, char::is_alphabetic) {
            let close = skip_spaces(line, after_space + 1);
            let close_end = skip_punct(line, close);
            if close_end > close {
                pos = close_end;
                punctuated = true;
            }
        }
    }

    if !punctuated {
        return None;
    }

    let content = skip_spaces(line, pos);
    if line[content..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(content)
}

/// Past a run of `.`, `)` and `-` ("10.-").
fn skip_punct(line: &str, pos: usize) -> usize {
    pos + line[pos..].chars().take_while(|c| matches!(c, '.' | ')' | '-')).count()
}

fn skip_spaces(line: &str, pos: usize) -> usize {
    pos + (line[pos..].len() - line[pos..].trim_start().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgencyConfig;

    fn agency() -> CompiledAgency {
        CompiledAgency::new(AgencyConfig::default()).unwrap()
    }

    fn listings(segments: &[Segment]) -> Vec<String> {
        segments
            .iter()
            .filter_map(|s| s.as_listing().map(|l| l.text.clone()))
            .collect()
    }

    #[test]
    fn test_bullet_segments() {
        let lines = [
            "Lista de propiedades disponibles",
            "* Casa en col. Palmira",
            "3 habitaciones, 2 baños",
            "",
            "• Apto amueblado",
            "-5% de descuento",
            "* Terreno plano",
        ];
        let segments = segment(&lines, ListingMarker::Bullet, &agency(), false);
        assert_eq!(
            listings(&segments),
            vec![
                "Casa en col. Palmira 3 habitaciones, 2 baños".to_string(),
                "Apto amueblado -5% de descuento".to_string(),
                "Terreno plano".to_string(),
            ]
        );
        let first = segments[0].as_listing().unwrap();
        assert_eq!(first.lines, vec![1, 2]);
    }

    #[test]
    fn test_bullet_glues_price_only_line() {
        let lines = ["* Casa en venta", "* $ 85,000", "* Apto"];
        let segments = segment(&lines, ListingMarker::Bullet, &agency(), false);
        assert_eq!(
            listings(&segments),
            vec!["Casa en venta $ 85,000".to_string(), "Apto".to_string()]
        );
    }

    #[test]
    fn test_headers_split_sections() {
        let lines = ["# CASAS EN VENTA", "* Casa uno", "# APARTAMENTOS", "continuación suelta", "* Apto dos"];
        let segments = segment(&lines, ListingMarker::Bullet, &agency(), false);
        assert_eq!(segments.len(), 4);
        assert!(matches!(&segments[0], Segment::Header(h) if h.text == "# CASAS EN VENTA" && h.line == 0));
        assert!(matches!(&segments[2], Segment::Header(h) if h.line == 2));
        assert_eq!(listings(&segments), vec!["Casa uno".to_string(), "Apto dos".to_string()]);
    }

    #[test]
    fn test_cue_segments() {
        let lines = [
            "Casa en Lomas del Guijarro,",
            "Tres habitaciones",
            "Con piscina",
            "y jardín amplio",
            "$ 250,000",
            "Apartamento en Palmira",
            "cerca de la embajada",
            "Cerca de todo",
        ];
        let segments = segment(&lines, ListingMarker::Cue, &agency(), false);
        assert_eq!(
            listings(&segments),
            vec![
                "Casa en Lomas del Guijarro, Tres habitaciones Con piscina y jardín amplio $ 250,000"
                    .to_string(),
                "Apartamento en Palmira cerca de la embajada Cerca de todo".to_string(),
            ]
        );
    }

    #[test]
    fn test_uppercase_bulleted_start_exception_continues() {
        let lines = ["CASA EN VENTA.", "* CON PISCINA", "LOMAS: apto"];
        let segments = segment(&lines, ListingMarker::Uppercase, &agency(), false);
        assert_eq!(
            listings(&segments),
            vec!["CASA EN VENTA. * CON PISCINA".to_string(), "LOMAS: apto".to_string()]
        );
    }

    #[test]
    fn test_uppercase_segments() {
        let lines = [
            "notas previas",
            "COL. PALMIRA, casa de 3 habitaciones",
            "con jardín",
            "CASA EN VENTA",
            "LOMAS DEL MAYAB: 2 habitaciones",
            "RES. EL TRAPICHE. Apto amueblado",
        ];
        let segments = segment(&lines, ListingMarker::Uppercase, &agency(), false);
        assert_eq!(
            listings(&segments),
            vec![
                "COL. PALMIRA, casa de 3 habitaciones con jardín".to_string(),
                "CASA EN VENTA LOMAS DEL MAYAB: 2 habitaciones".to_string(),
                "RES. EL TRAPICHE. Apto amueblado".to_string(),
            ]
        );
    }

    #[test]
    fn test_numbered_segments() {
        let lines = [
            "VENTA",
            "1. Casa en Palmira",
            "precio a convenir",
            "2) Apto 3/2",
            "1.200 vrs2 de terreno",
            "3a) Local comercial",
            "ALQUILER",
            "10.- Bodega",
        ];
        let segments = segment(&lines, ListingMarker::Numbered, &agency(), false);
        assert!(matches!(&segments[0], Segment::Header(h) if h.text == "VENTA"));
        assert!(matches!(&segments[4], Segment::Header(h) if h.text == "ALQUILER"));
        assert_eq!(
            listings(&segments),
            vec![
                "Casa en Palmira precio a convenir".to_string(),
                "Apto 3/2 1.200 vrs² de terreno".to_string(),
                "Local comercial".to_string(),
                "Bodega".to_string(),
            ]
        );
    }

    #[test]
    fn test_numbered_keep_markers() {
        let lines = ["1. Casa", "2) Apto"];
        let segments = segment(&lines, ListingMarker::Numbered, &agency(), true);
        assert_eq!(listings(&segments), vec!["1. Casa".to_string(), "2) Apto".to_string()]);
    }

    #[test]
    fn test_numbered_marker_parsing() {
        assert_eq!(numbered_marker("1. Casa"), Some(3));
        assert_eq!(numbered_marker("  12) Apto"), Some(6));
        assert_eq!(numbered_marker("3a) Local"), Some(4));
        assert_eq!(numbered_marker("4.b. Lote"), Some(5));
        assert_eq!(numbered_marker("10.- Bodega"), Some(5));
        assert_eq!(numbered_marker("1) A la venta"), Some(3));
        assert_eq!(numbered_marker("3H 2B casa"), None);
        assert_eq!(numbered_marker("1.200 vrs²"), None);
        assert_eq!(numbered_marker("3-4 habitaciones"), None);
        assert_eq!(numbered_marker("1234. Casa"), None);
        assert_eq!(numbered_marker("Casa 1."), None);
    }

    #[test]
    fn test_empty_input() {
        let lines: [&str; 0] = [];
        assert!(segment(&lines, ListingMarker::Cue, &agency(), false).is_empty());
        assert!(segment(&["", "  "], ListingMarker::Bullet, &agency(), false).is_empty());
    }
}
