//! CORS origin matching.

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    request::Parts,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Matches request origins against configured entries. An entry may contain
/// `*`, which stands for one or more characters of a single host label (it
/// never spans `.`, `/` or `:`).
#[derive(Debug, Clone, Default)]
pub struct OriginMatcher {
    allowed: Vec<String>,
}

impl OriginMatcher {
    /// Creates a matcher for the given entries.
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    /// Returns true if `origin` matches any entry.
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed
            .iter()
            .any(|pattern| wildcard_match(pattern, origin))
    }

    /// Builds the CORS layer for this matcher.
    pub fn layer(&self) -> CorsLayer {
        let matcher = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin.to_str().is_ok_and(|origin| matcher.allows(origin))
                },
            ))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION, ORIGIN, ACCEPT])
            .allow_credentials(true)
    }
}

fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let Some((prefix, rest)) = pattern.split_once('*') else {
        return pattern == candidate;
    };
    let Some(tail) = candidate.strip_prefix(prefix) else {
        return false;
    };

    tail.char_indices()
        .take_while(|(_, c)| !matches!(c, '.' | '/' | ':'))
        .any(|(i, c)| wildcard_match(rest, &tail[i + c.len_utf8()..]))
}
