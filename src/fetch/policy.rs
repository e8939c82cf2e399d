//! Freshness and revalidation rules.

use super::{Headers, HttpResponse};

pub const IF_NONE_MATCH: &str = "If-None-Match";
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";

const WEAK_VALIDATOR_PREFIX: &str = "W/";

/// Conditional request headers replaying the validators of a cached
/// response.
pub fn validator_headers(cached: &HttpResponse) -> Headers {
    let mut headers = Headers::new();
    if let Some(etag) = cached.headers.get("etag") {
        let etag = etag.strip_prefix(WEAK_VALIDATOR_PREFIX).unwrap_or(etag);
        headers.insert(IF_NONE_MATCH, etag);
    }
    if let Some(modified) = cached.headers.get("last-modified") {
        headers.insert(IF_MODIFIED_SINCE, modified);
    }
    headers
}

/// Integer `max-age` directive of a `cache-control` value, if any.
pub fn max_age(cache_control: &str) -> Option<i64> {
    cache_control.split(',').find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        value.trim().trim_matches('"').parse::<u32>().ok().map(i64::from)
    })
}

/// TTL to persist a response with.
///
/// The server's `max-age` caps the store default; with the "never expire"
/// default the server value is used as-is; without `max-age` the default
/// applies.
pub fn resolve_ttl(server_max_age: Option<i64>, default_ttl: i64) -> i64 {
    match server_max_age {
        None => default_ttl,
        Some(max_age) if default_ttl < 0 => max_age,
        Some(max_age) => max_age.min(default_ttl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached_with(headers: &[(&str, &str)]) -> HttpResponse {
        HttpResponse::new(200, headers.iter().copied().collect(), "cached")
    }

    #[test]
    fn test_validators_from_etag_and_last_modified() {
        let cached = cached_with(&[
            ("ETag", "\"v1\""),
            ("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
        ]);

        let headers = validator_headers(&cached);
        assert_eq!(headers.get(IF_NONE_MATCH), Some("\"v1\""));
        assert_eq!(
            headers.get(IF_MODIFIED_SINCE),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[test]
    fn test_weak_etag_prefix_is_stripped() {
        let cached = cached_with(&[("etag", "W/\"weak\"")]);

        let headers = validator_headers(&cached);
        assert_eq!(headers.get(IF_NONE_MATCH), Some("\"weak\""));
        assert!(!headers.contains(IF_MODIFIED_SINCE));
    }

    #[test]
    fn test_only_leading_weak_marker_is_stripped() {
        let cached = cached_with(&[("etag", "W/W/x")]);

        assert_eq!(validator_headers(&cached).get(IF_NONE_MATCH), Some("W/x"));
    }

    #[test]
    fn test_no_validators() {
        let cached = cached_with(&[("content-type", "text/xml")]);

        assert!(validator_headers(&cached).is_empty());
    }

    #[test]
    fn test_max_age_parsing() {
        assert_eq!(max_age("max-age=10"), Some(10));
        assert_eq!(max_age("public, max-age=3600, must-revalidate"), Some(3600));
        assert_eq!(max_age("Max-Age = \"60\""), Some(60));
        assert_eq!(max_age("s-maxage=30, max-age=5"), Some(5));
        assert_eq!(max_age("no-cache"), None);
        assert_eq!(max_age("max-age=None"), None);
        assert_eq!(max_age("max-age=-5"), None);
        assert_eq!(max_age(""), None);
    }

    #[test]
    fn test_resolve_ttl_min_rule() {
        assert_eq!(resolve_ttl(Some(10), 1200), 10);
        assert_eq!(resolve_ttl(Some(5000), 1200), 1200);
    }

    #[test]
    fn test_resolve_ttl_never_expire_default() {
        assert_eq!(resolve_ttl(Some(10), -1), 10);
    }

    #[test]
    fn test_resolve_ttl_without_max_age() {
        assert_eq!(resolve_ttl(None, 1200), 1200);
        assert_eq!(resolve_ttl(None, -1), -1);
    }
}
