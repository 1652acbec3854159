//! Lenient value parsing shared by the assemblers.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse the leading integer of `value`.
///
/// Leading whitespace and a single sign are accepted and anything after the
/// digits is ignored, so `"12abc"` is 12. Values beyond the range of `i64`
/// saturate. Returns `None` when no digits lead the string.
#[must_use]
pub fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }

    let signed = if negative {
        format!("-{}", &rest[..digits_end])
    } else {
        rest[..digits_end].to_string()
    };
    Some(signed.parse().unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

/// Make `raw` absolute against the current directory.
///
/// Blank values pass through untouched.
#[must_use]
pub fn resolve_path(raw: &str) -> PathBuf {
    if raw.trim().is_empty() {
        return PathBuf::from(raw);
    }
    let path = Path::new(raw);
    match std::path::absolute(path) {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!(path = raw, error = %e, "Could not resolve path, keeping it as given");
            path.to_path_buf()
        }
    }
}

/// A fresh `<tmp>/<uuid>.txt` path. The file is not created.
#[must_use]
pub fn temp_file_path() -> PathBuf {
    std::env::temp_dir().join(format!("{}.txt", uuid::Uuid::new_v4()))
}
