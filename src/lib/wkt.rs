//! Translation of the WKT strings found in the backend's `geometry` fields
//! into GeoJSON-shaped [`Geometry`] values.
//!
//! Not a general WKT grammar. It covers the shapes the
//! backend emits: a single outer ring per polygon (holes are ignored) and
//! multi-geometries whose members are separated by a literal `),(`.

use super::geojson::{Geometry, Pair, MIN_LINE_VERTICES, MIN_RING_VERTICES};
use itertools::Itertools;
use tracing::{debug, warn};

const MEMBER_SEPARATOR: &str = "),(";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Keyword {
    Polygon,
    MultiPolygon,
    LineString,
    MultiLineString,
    Point,
    MultiPoint,
}

// Keywords are compared as whole tokens, so the order only expresses preference.
const KEYWORDS: [(&str, Keyword); 6] = [
    ("POLYGON", Keyword::Polygon),
    ("MULTIPOLYGON", Keyword::MultiPolygon),
    ("LINESTRING", Keyword::LineString),
    ("MULTILINESTRING", Keyword::MultiLineString),
    ("POINT", Keyword::Point),
    ("MULTIPOINT", Keyword::MultiPoint),
];

fn is_delimiter(c: char) -> bool {
    c == '(' || c == ')' || c == ','
}

/// Collapses whitespace runs into single spaces and drops the spaces next to
/// parens and commas, so `POINT (1 2)` and `POINT(1 2)` read the same.
fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            if c != ' ' {
                return true;
            }
            let prev = i.checked_sub(1).and_then(|j| chars.get(j));
            let next = chars.get(i + 1);
            !prev.into_iter().chain(next).any(|&n| is_delimiter(n))
        })
        .map(|(_, &c)| c)
        .collect()
}

fn strip_srid(text: &str) -> &str {
    let is_ewkt = text
        .get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("SRID="));
    match text.find(';') {
        Some(idx) if is_ewkt => &text[idx + 1..],
        _ => text,
    }
}

/// Index of the `)` closing the paren opened at `open`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_keyword(text: &str) -> Option<(Keyword, &str)> {
    let open = text.find('(')?;
    // the outer parens must wrap the whole remainder
    if matching_close(text, open)? != text.len() - 1 {
        return None;
    }
    let token = text[..open].trim();
    let (_, keyword) = KEYWORDS
        .iter()
        .find(|(name, _)| token.eq_ignore_ascii_case(name))?;
    let body = &text[open + 1..text.len() - 1];
    Some((*keyword, body))
}

fn strip_parens(text: &str) -> &str {
    text.trim_matches(|c| c == '(' || c == ')' || c == ' ')
}

fn parse_pair(fragment: &str) -> Option<Pair> {
    let tokens: Vec<&str> = strip_parens(fragment).split_whitespace().collect();
    if tokens.len() != 2 {
        debug!(fragment, "dropping coordinate fragment without exactly two values");
        return None;
    }
    match (tokens[0].parse::<f64>(), tokens[1].parse::<f64>()) {
        (Ok(lon), Ok(lat)) if lon.is_finite() && lat.is_finite() => Some((lon, lat)),
        _ => {
            debug!(fragment, "dropping unparseable coordinate pair");
            None
        }
    }
}

fn parse_pairs(text: &str) -> Vec<Pair> {
    strip_parens(text).split(',').filter_map(parse_pair).collect()
}

fn parse_with_minimum(text: &str, minimum: usize) -> Option<Vec<Pair>> {
    let pairs = parse_pairs(text);
    if pairs.len() < minimum {
        debug!(
            found = pairs.len(),
            minimum, "not enough vertices for the geometry"
        );
        return None;
    }
    Some(pairs)
}

fn parse_point(body: &str) -> Option<Geometry> {
    let coordinates = parse_pair(body)?;
    Some(Geometry::Point { coordinates })
}

fn parse_line_string(body: &str) -> Option<Geometry> {
    let coordinates = parse_with_minimum(body, MIN_LINE_VERTICES)?;
    Some(Geometry::LineString { coordinates })
}

fn parse_polygon(body: &str) -> Option<Geometry> {
    // only the outer ring is kept
    let outer = body.split(MEMBER_SEPARATOR).next()?;
    let ring = parse_with_minimum(outer, MIN_RING_VERTICES)?;
    Some(Geometry::Polygon {
        coordinates: vec![ring],
    })
}

fn parse_multi_point(body: &str) -> Option<Geometry> {
    let coordinates = parse_with_minimum(body, 1)?;
    Some(Geometry::MultiPoint { coordinates })
}

fn parse_members(body: &str, minimum: usize) -> Option<Vec<Vec<Pair>>> {
    let members: Vec<Vec<Pair>> = body
        .split(MEMBER_SEPARATOR)
        .filter_map(|member| parse_with_minimum(member, minimum))
        .collect();
    if members.is_empty() {
        None
    } else {
        Some(members)
    }
}

fn parse_multi_line_string(body: &str) -> Option<Geometry> {
    let coordinates = parse_members(body, MIN_LINE_VERTICES)?;
    Some(Geometry::MultiLineString { coordinates })
}

fn parse_multi_polygon(body: &str) -> Option<Geometry> {
    let rings = parse_members(body, MIN_RING_VERTICES)?;
    let coordinates = rings.into_iter().map(|ring| vec![ring]).collect();
    Some(Geometry::MultiPolygon { coordinates })
}

/// Parse a WKT string into a [`Geometry`].
///
/// Malformed input never panics: unknown keywords, unbalanced parens and
/// shapes with too few vertices all yield `None`. Individual coordinate pairs
/// that fail to parse are dropped without discarding the rest of the shape.
///
/// # Example
///
/// ```
/// use capture360::geojson::Geometry;
/// use capture360::wkt::parse;
///
/// let geometry = parse("POINT(-76.5225 3.4516)");
/// assert_eq!(geometry, Some(Geometry::Point { coordinates: (-76.5225, 3.4516) }));
/// assert_eq!(parse("FOOBAR(1 2)"), None);
/// ```
pub fn parse(text: &str) -> Option<Geometry> {
    let normalized = normalize(text);
    let geometry = split_keyword(strip_srid(&normalized)).and_then(|(keyword, body)| {
        match keyword {
            Keyword::Polygon => parse_polygon(body),
            Keyword::MultiPolygon => parse_multi_polygon(body),
            Keyword::LineString => parse_line_string(body),
            Keyword::MultiLineString => parse_multi_line_string(body),
            Keyword::Point => parse_point(body),
            Keyword::MultiPoint => parse_multi_point(body),
        }
    });
    if geometry.is_none() {
        warn!(wkt = %normalized, "could not parse WKT geometry");
    }
    geometry
}
