//! # Content Negotiation
//!
//! Picks the response media type from the `Accept` header and checks the
//! `Content-Type` of request bodies.
//!
//! The protocol media type may only carry the `ext` parameter. A client
//! that lists it exclusively with other parameters is refused.

use super::errors::{RequestError, RequestResult};

/// The protocol media type
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Served when the client accepts JSON but not the protocol type
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// One entry of an `Accept` or `Content-Type` header
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    /// `type/subtype`, lowercased
    pub essence: String,
    /// Parameters other than `q`, names lowercased
    pub params: Vec<(String, String)>,
    pub q: f32,
}

impl MediaRange {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();
        if !essence.contains('/') {
            return None;
        }

        let mut params = Vec::new();
        let mut q = 1.0;
        for part in parts {
            let (name, value) = match part.split_once('=') {
                Some((n, v)) => (n.trim().to_ascii_lowercase(), v.trim().trim_matches('"')),
                None => continue,
            };
            if name == "q" {
                q = value.parse().unwrap_or(0.0);
            } else {
                params.push((name, value.to_string()));
            }
        }

        Some(Self { essence, params, q })
    }

    fn matches(&self, media_type: &str) -> bool {
        if self.essence == "*/*" || self.essence == media_type {
            return true;
        }
        match (self.essence.split_once('/'), media_type.split_once('/')) {
            (Some((range_type, "*")), Some((type_, _))) => range_type == type_,
            _ => false,
        }
    }

    /// Values of `ext`, split on commas
    pub fn extensions(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|(name, _)| name == "ext")
            .flat_map(|(_, value)| value.split(',').map(|e| e.trim().to_string()))
            .filter(|e| !e.is_empty())
            .collect()
    }
}

/// Parse an `Accept` header into accepted ranges and `q=0` refusals
pub fn parse_accept(header: &str) -> (Vec<MediaRange>, Vec<MediaRange>) {
    header
        .split(',')
        .filter_map(MediaRange::parse)
        .partition(|range| range.q > 0.0)
}

/// Choose the response media type
pub fn negotiate(accept: Option<&str>, json_fallback: bool) -> RequestResult<&'static str> {
    let header = match accept.map(str::trim) {
        None | Some("") => return Ok(JSON_API_MEDIA_TYPE),
        Some(h) => h,
    };
    let (ranges, refusals) = parse_accept(header);
    // a wildcard never brings back a type the client refused by name
    let refused = |media_type: &str| {
        refusals
            .iter()
            .any(|r| r.essence == media_type && r.params.is_empty())
    };

    let explicit: Vec<&MediaRange> = ranges
        .iter()
        .filter(|r| r.essence == JSON_API_MEDIA_TYPE)
        .collect();

    if explicit.iter().any(|r| r.params.iter().all(|(n, _)| n == "ext")) {
        return Ok(JSON_API_MEDIA_TYPE);
    }
    if !explicit.is_empty() {
        return Err(RequestError::NotAcceptable(format!(
            "{} was only listed with unsupported media type parameters",
            JSON_API_MEDIA_TYPE
        )));
    }

    if !refused(JSON_API_MEDIA_TYPE)
        && ranges.iter().any(|r| r.essence != JSON_MEDIA_TYPE && r.matches(JSON_API_MEDIA_TYPE))
    {
        return Ok(JSON_API_MEDIA_TYPE);
    }
    if json_fallback
        && !refused(JSON_MEDIA_TYPE)
        && ranges.iter().any(|r| r.essence == JSON_MEDIA_TYPE)
    {
        return Ok(JSON_MEDIA_TYPE);
    }

    Err(RequestError::NotAcceptable(format!(
        "This endpoint only responds with {}",
        JSON_API_MEDIA_TYPE
    )))
}

/// Check a request body's `Content-Type`
pub fn check_content_type(content_type: Option<&str>, supported_extensions: &[String]) -> RequestResult<()> {
    let range = content_type
        .and_then(MediaRange::parse)
        .filter(|r| r.essence == JSON_API_MEDIA_TYPE)
        .ok_or_else(|| {
            RequestError::UnsupportedMediaType(format!(
                "Request bodies must be sent as {}",
                JSON_API_MEDIA_TYPE
            ))
        })?;

    if let Some((name, _)) = range.params.iter().find(|(name, _)| name != "ext") {
        return Err(RequestError::UnsupportedMediaType(format!(
            "The media type parameter `{}` is not supported",
            name
        )));
    }

    for ext in range.extensions() {
        if !supported_extensions.iter().any(|s| *s == ext) {
            return Err(RequestError::UnsupportedExtension(ext));
        }
    }
    Ok(())
}
