//! String format predicates shared by the schema validator and the handlers.
//!
//! Each predicate is a small hand-written matcher for a fixed pattern, evaluated over ASCII bytes.

use std::net::IpAddr;

/// Length of a compressed secp256k1 public key in hex.
pub const PUBLIC_KEY_HEX_LENGTH: usize = 66;

/// Length of a transaction id (sha256) in hex.
pub const TRANSACTION_ID_HEX_LENGTH: usize = 64;

/// Returns true when `value` is non-empty lowercase-or-uppercase hex.
pub fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Lowercase hex of exactly `len` characters.
pub fn is_lower_hex_of_length(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

pub fn is_transaction_id(value: &str) -> bool {
    is_lower_hex_of_length(value, TRANSACTION_ID_HEX_LENGTH)
}

/// Compressed public key: `02`/`03` prefix and 33 bytes of hex.
pub fn is_public_key(value: &str) -> bool {
    value.len() == PUBLIC_KEY_HEX_LENGTH
        && (value.starts_with("02") || value.starts_with("03"))
        && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Absolute URI: `scheme ":" rest`, scheme `[a-zA-Z][a-zA-Z0-9+.-]*`, rest non-empty without whitespace.
pub fn is_uri(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let mut scheme_bytes = scheme.bytes();
    let starts_alpha = scheme_bytes.next().map_or(false, |b| b.is_ascii_alphabetic());
    starts_alpha
        && scheme_bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'))
        && !rest.is_empty()
        && !rest.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// IPv4 or IPv6 address that is neither loopback nor unspecified.
pub fn is_public_ip(value: &str) -> bool {
    match value.parse::<IpAddr>() {
        Ok(ip) => !ip.is_loopback() && !ip.is_unspecified(),
        Err(_) => false,
    }
}

/// npm-style package name: `(@scope/)?name`, lowercase.
///
/// Scope and name start with `[a-z0-9-~]`, continue with `[a-z0-9-._~]`; the scope start
/// additionally allows `*`.
pub fn is_valid_package_name(value: &str) -> bool {
    fn first(b: u8, allow_star: bool) -> bool {
        b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'~') || (allow_star && b == b'*')
    }
    fn rest(b: u8, allow_star: bool) -> bool {
        first(b, allow_star) || matches!(b, b'.' | b'_')
    }
    fn segment(s: &str, allow_star: bool) -> bool {
        let mut bytes = s.bytes();
        match bytes.next() {
            Some(b) if first(b, allow_star) => bytes.all(|b| rest(b, allow_star)),
            _ => false,
        }
    }

    match value.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, name)) => segment(scope, true) && segment(name, false),
            None => false,
        },
        None => segment(value, false),
    }
}

/// Human readable name: alphanumeric words joined by a single `' '`, `'.'`, `'_'`, `'-'`
/// or by `" - "`, optionally ending with one `'.'`.
pub fn is_generic_name(value: &str) -> bool {
    let body = value.strip_suffix('.').unwrap_or(value);
    let bytes = body.as_bytes();
    let mut i = 0;
    let mut expecting_word = true;

    while i < bytes.len() {
        if expecting_word {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            if i == start {
                return false;
            }
            expecting_word = false;
        } else if bytes[i..].starts_with(b" - ") {
            i += 3;
            expecting_word = true;
        } else if matches!(bytes[i], b' ' | b'.' | b'_' | b'-') {
            i += 1;
            expecting_word = true;
        } else {
            return false;
        }
    }
    !bytes.is_empty() && !expecting_word
}

/// `^[a-zA-Z0-9]+$`
pub fn is_alphanumeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// `^[a-zA-Z0-9_-]+$`
pub fn is_entity_name(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-'))
}
