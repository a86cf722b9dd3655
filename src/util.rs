use std::str::FromStr;

use tracing::warn;

/// Read a value from `lookup`, parse it, and fall back to `default` when the
/// key is missing or does not parse.
pub fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid value for {key}: {raw:?}");
            default
        }),
        None => default,
    }
}

/// Read a string value; empty strings count as unset.
pub fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
