#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// Derives the stable tenant key for a bearer credential: the SHA-256 of
/// the raw token as 64 lowercase hex characters. Deterministic, fixed
/// width, and filesystem-safe by construction, so it doubles as the
/// rate-limit namespace and the on-disk filename stem.
pub fn token_to_key(token: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(token.as_bytes());
    let mut key = String::with_capacity(64);
    for byte in digest {
        let _ = write!(key, "{byte:02x}");
    }
    key
}

/// Extracts the bearer credential from the Authorization header.
/// Case-insensitive scheme match, surrounding whitespace trimmed; fails
/// open to `None` on anything malformed.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, rest) = raw.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Splits a comma-separated configuration string into a token set. Empty
/// entries are dropped; an empty result means "no allow-list configured",
/// not "allow-list of nothing".
pub fn parse_allowed_auth_tokens(raw: &str) -> Option<BTreeSet<String>> {
    let tokens: BTreeSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

/// With no allow-list every credential is authorized and defines its own
/// isolated tenant; with one, membership is required.
pub fn is_authorized_token(token: &str, allow_list: Option<&BTreeSet<String>>) -> bool {
    match allow_list {
        None => true,
        Some(allowed) => allowed.contains(token),
    }
}
