//! Endpoint sanitizer.
//!
//! Validates and normalizes a user-supplied backend URL. The function is
//! pure, total, deterministic, and idempotent: unusable input is replaced by
//! the (normalized) default endpoint and the replacement is reported as a
//! [`SanitizeReason`] for the caller to surface as a warning.
//!
//! # Rules (in order)
//!
//! 1. Missing or blank input → default, [`SanitizeReason::Empty`].
//! 2. Root-relative path (`/x`, but not protocol-relative `//host`) →
//!    trailing slashes and whitespace stripped, accepted without scheme
//!    checks (blank after stripping → rule 1).
//! 3. Unparseable → default, [`SanitizeReason::Invalid`].
//! 4. `mongodb:` / `mongodb+srv:` → default, [`SanitizeReason::MongoProtocol`].
//! 5. Scheme other than `http:` / `https:` → default, [`SanitizeReason::Protocol`].
//! 6. Port 27017–27019 → default, [`SanitizeReason::MongoPort`].
//! 7. Otherwise trailing slashes are stripped from the path and from the
//!    serialized URL.

use reqwest::Url;

/// Default database ports that must never be used as an API endpoint.
pub const RESERVED_PORTS: [u16; 3] = [27017, 27018, 27019];

/// Why input was replaced by the default endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeReason {
    Empty,
    Invalid,
    Protocol,
    MongoPort,
    MongoProtocol,
}

impl SanitizeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanitizeReason::Empty => "empty",
            SanitizeReason::Invalid => "invalid",
            SanitizeReason::Protocol => "protocol",
            SanitizeReason::MongoPort => "mongo-port",
            SanitizeReason::MongoProtocol => "mongo-protocol",
        }
    }

    /// User-facing warning text.
    pub fn warning(&self) -> &'static str {
        match self {
            SanitizeReason::Empty => "API URL was blank, so it fell back to the default backend.",
            SanitizeReason::Invalid => {
                "Could not parse the API URL. Reverted to the default backend."
            }
            SanitizeReason::Protocol => {
                "Only HTTP/HTTPS endpoints are supported. Reverted to the default backend."
            }
            SanitizeReason::MongoPort => {
                "Detected a MongoDB port (27017/27018/27019); switched back to the API gateway."
            }
            SanitizeReason::MongoProtocol => {
                "MongoDB connection strings are not valid API endpoints. Reverted to the default backend."
            }
        }
    }
}

impl std::fmt::Display for SanitizeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub value: String,
    pub reason: Option<SanitizeReason>,
}

/// Sanitize `raw`, falling back to `default` when it is unusable.
pub fn sanitize(raw: Option<&str>, default: &str) -> Sanitized {
    match normalize(raw) {
        Ok(value) => Sanitized {
            value,
            reason: None,
        },
        Err(reason) => Sanitized {
            // the fallback is normalized too, so a second pass is a no-op
            value: normalize(Some(default)).unwrap_or_else(|_| default.to_string()),
            reason: Some(reason),
        },
    }
}

fn normalize(raw: Option<&str>) -> Result<String, SanitizeReason> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(SanitizeReason::Empty);
    }

    // `//host` is protocol-relative, not a path on this origin
    if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        let normalized = trimmed.trim_end_matches(|c: char| c == '/' || c.is_whitespace());
        if normalized.is_empty() {
            return Err(SanitizeReason::Empty);
        }
        return Ok(normalized.to_string());
    }

    let mut parsed = Url::parse(trimmed).map_err(|_| SanitizeReason::Invalid)?;

    match parsed.scheme() {
        "mongodb" | "mongodb+srv" => return Err(SanitizeReason::MongoProtocol),
        "http" | "https" => {}
        _ => return Err(SanitizeReason::Protocol),
    }

    if parsed
        .port()
        .is_some_and(|port| RESERVED_PORTS.contains(&port))
    {
        return Err(SanitizeReason::MongoPort);
    }

    if parsed.path().len() > 1 {
        let path = parsed.path().trim_end_matches('/').to_string();
        parsed.set_path(&path);
    }

    let normalized = parsed.as_str().trim_end_matches('/');
    if normalized.is_empty() {
        return Err(SanitizeReason::Empty);
    }
    Ok(normalized.to_string())
}
