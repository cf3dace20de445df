// URL validation and normalization for analysis requests
// Runs before any collector is touched; the normalized form is the cache key

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

pub const MAX_URL_LENGTH: usize = 2048;

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("URL must not be empty")]
    Empty,

    #[error("URL too long (max {max}, current {current})")]
    TooLong { max: usize, current: usize },

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported scheme: {0}. Only HTTP and HTTPS are supported")]
    UnsupportedScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

// =============================================================================
// DATA STRUCTURES
// =============================================================================

/// A validated URL together with the pieces the collectors need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUrl {
    /// Input after trimming
    pub original: String,
    /// Canonical form, used as the cache key and sent to reputation vendors
    pub normalized: String,
    /// Host without brackets or port, e.g. `example.com` or `2001:db8::1`
    pub domain: String,
    pub scheme: String,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate a caller-supplied URL and produce its canonical form.
///
/// Canonical form: lower-case scheme and host, default port removed, fragment
/// dropped. Path, query and user-visible casing of the path are preserved.
pub fn validate_and_normalize(raw: &str) -> Result<NormalizedUrl, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_URL_LENGTH,
            current: trimmed.len(),
        });
    }

    let mut url = Url::parse(trimmed).map_err(|e| ValidationError::InvalidFormat(e.to_string()))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
    }

    let domain = extract_domain(&url).ok_or(ValidationError::MissingHost)?;

    // The url crate already lower-cases scheme and host and strips default
    // ports for http/https; only the fragment needs removing
    url.set_fragment(None);

    Ok(NormalizedUrl {
        original: trimmed.to_string(),
        normalized: url.to_string(),
        domain,
        scheme: url.scheme().to_string(),
    })
}

/// Host of the URL as collectors expect it
pub fn extract_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) if !domain.is_empty() => Some(domain.to_lowercase()),
        Host::Domain(_) => None,
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}
