//! `Accept` header parsing and representation selection.
//!
//! The grammar follows RFC 7231 media ranges: a comma separated list of types, each with
//! optional parameters. A `q` parameter sets the quality, everything else stays part of the
//! media range.

use http::header::ACCEPT;
use http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;

static ACCEPT_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (                                   # media range
            [^\s;,]+
            (?:[\x20\t]*;[\x20\t]*                # parameters other than q
                (?:[^\s;,q][^\s;,]*|q[^\s;,=][^\s;,]*)
            )*
        )
        (?:[\x20\t]*;[\x20\t]*q=                  # quality
            (\d*(?:\.\d+)?)
            [^,]*                           # accept extensions
        )?",
    )
    .ok()
});

/// Parses an `Accept` header value into `(media range, quality)` pairs, in header order.
///
/// A missing or empty `q` means 1; any other value is clamped to `[0, 1]`.
pub fn parse_accept_header(value: &str) -> Vec<(String, f32)> {
    let Some(re) = ACCEPT_RE.as_ref() else {
        return vec![];
    };

    re.captures_iter(value)
        .filter_map(|captures| {
            let media_range = captures.get(1)?.as_str().to_string();
            let quality = match captures.get(2).map(|q| q.as_str()) {
                None | Some("") => 1.0,
                Some(q) => q.parse::<f32>().unwrap_or(1.0).clamp(0.0, 1.0),
            };
            Some((media_range, quality))
        })
        .collect()
}

/// The parsed `Accept` header of a request, empty when the header is missing.
pub fn accept_mimetypes(headers: &HeaderMap) -> Vec<(String, f32)> {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_accept_header)
        .collect()
}

/// Picks the offered mimetype the client prefers.
///
/// Exact matches are considered first, then matches ignoring media type parameters; wildcards
/// only count when nothing else matched and then select `default`. Among the candidates the
/// highest quality wins, the first one found on ties. `None` means nothing offered is
/// acceptable.
pub fn best_match<S: AsRef<str>>(accept: &[(String, f32)], offered: &[S], default: Option<&str>) -> Option<String> {
    if offered.is_empty() || accept.is_empty() {
        return default.map(str::to_string);
    }

    let mut found: Vec<(f32, Option<String>)> = vec![];

    for (media_range, quality) in accept {
        if let Some(offer) = offered.iter().find(|offer| offer.as_ref() == media_range) {
            found.push((*quality, Some(offer.as_ref().to_string())));
        }
    }

    for (media_range, quality) in accept {
        let requested = essence(media_range);
        for offer in offered {
            let offer = offer.as_ref();
            let already_found = found.iter().any(|(q, mimetype)| *q == *quality && mimetype.as_deref() == Some(offer));
            if !already_found && requested == essence(offer) {
                found.push((*quality, Some(offer.to_string())));
            }
        }
    }

    if found.is_empty() {
        for (media_range, quality) in accept {
            if matches!(media_range.as_str(), "*" | "*/*" | "*.*") {
                found.push((*quality, default.map(str::to_string)));
            }
        }
    }

    let Some(first) = found.first().cloned() else {
        return default.map(str::to_string);
    };

    let (quality, mimetype) = found.into_iter().fold(first, |best, candidate| if candidate.0 > best.0 { candidate } else { best });

    if quality <= 0.0 { None } else { mimetype }
}

/// Accepted mimetypes ordered by descending quality, header order among equals.
pub fn mediatypes(headers: &HeaderMap) -> Vec<String> {
    let mut accepted = accept_mimetypes(headers);
    accepted.sort_by(|a, b| b.1.total_cmp(&a.1));
    accepted.into_iter().map(|(media_range, _)| media_range).collect()
}

fn essence(media_range: &str) -> &str {
    media_range.split(';').next().unwrap_or(media_range).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const JSON: &str = "application/json";
    const TEXT: &str = "text/plain";

    #[test]
    fn test_parse_accept_header() {
        let parsed = parse_accept_header("text/html, application/xml;q=0.9, */*;q=0.8");
        assert_eq!(
            parsed,
            vec![("text/html".to_string(), 1.0), ("application/xml".to_string(), 0.9), ("*/*".to_string(), 0.8),]
        );
    }

    #[test]
    fn test_parse_keeps_parameters_and_clamps() {
        let parsed = parse_accept_header("text/plain; charset=utf-8; q=3, application/json;q=");
        assert_eq!(parsed, vec![("text/plain; charset=utf-8".to_string(), 1.0), ("application/json".to_string(), 1.0)]);
    }

    #[test]
    fn test_missing_header_returns_default() {
        assert_eq!(best_match(&[], &[JSON], Some(JSON)), Some(JSON.to_string()));
        assert_eq!(best_match(&[], &[JSON], None), None);
    }

    #[test]
    fn test_quality_zero_everywhere_is_not_acceptable() {
        let accept = parse_accept_header("application/json;q=0, text/plain;q=0");
        assert_eq!(best_match(&accept, &[JSON, TEXT], Some(JSON)), None);
    }

    #[test]
    fn test_highest_quality_wins() {
        let accept = parse_accept_header("text/plain;q=1.0, application/json;q=0.1");
        assert_eq!(best_match(&accept, &[JSON, TEXT], Some(JSON)), Some(TEXT.to_string()));

        let accept = parse_accept_header("text/plain;q=0.5, application/json;q=0.9");
        assert_eq!(best_match(&accept, &[TEXT, JSON], None), Some(JSON.to_string()));
    }

    #[test]
    fn test_ties_resolve_to_header_order() {
        let accept = parse_accept_header("text/plain, application/json");
        assert_eq!(best_match(&accept, &[JSON, TEXT], Some(JSON)), Some(TEXT.to_string()));
    }

    #[test]
    fn test_partial_match_ignores_parameters() {
        let accept = parse_accept_header("application/json; charset=utf-8");
        assert_eq!(best_match(&accept, &[JSON], None), Some(JSON.to_string()));
    }

    #[test]
    fn test_parameterised_variant_with_higher_quality_wins() {
        let accept = parse_accept_header("text/plain;q=0.5, application/json;q=0.1, application/json;charset=utf-8;q=1.0");
        assert_eq!(best_match(&accept, &[JSON, TEXT], Some(JSON)), Some(JSON.to_string()));
    }

    #[test]
    fn test_wildcard_selects_default() {
        let accept = parse_accept_header("*/*");
        assert_eq!(best_match(&accept, &[JSON, TEXT], Some(JSON)), Some(JSON.to_string()));
        assert_eq!(best_match(&accept, &[JSON, TEXT], None), None);
    }

    #[test]
    fn test_unmatched_falls_back_to_default() {
        let accept = parse_accept_header("application/xml");
        assert_eq!(best_match(&accept, &[JSON], Some(JSON)), Some(JSON.to_string()));
        assert_eq!(best_match(&accept, &[JSON], None), None);
    }

    #[test]
    fn test_mediatypes_orders_by_quality() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain;q=0.5, application/json, text/html;q=0.5"));
        assert_eq!(mediatypes(&headers), vec![JSON, "text/plain", "text/html"]);
    }
}
